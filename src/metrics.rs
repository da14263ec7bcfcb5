//! OCR quality metrics
//!
//! CER, WER and NED score a single transcription; EMR scores a corpus.
//! Only EMR can fail; the per-pair metrics turn edge cases into values.

use crate::distance::{char_distance, word_distance};
use crate::error::EvalError;

/// Round to three decimal places
///
/// Rounds on the exact binary value. Exact ties go to the even digit, so
/// `0.0625` becomes `0.062`.
pub fn round3(value: f64) -> f64 {
    let scaled = value * 1000.0;
    if (scaled - scaled.trunc()).abs() != 0.5 {
        return scaled.round() / 1000.0;
    }

    // The product landed on .5; the fused error term says which side it came from
    let error = value.mul_add(1000.0, -scaled);
    let rounded = if error == 0.0 {
        scaled.round_ties_even()
    } else if error > 0.0 {
        scaled.ceil()
    } else {
        scaled.floor()
    };
    rounded / 1000.0
}

/// Character Error Rate: edit distance / ground truth length
///
/// 0.0 is a perfect match. Values above 1.0 are possible when the
/// prediction is much longer than the ground truth.
pub fn cer(gt: &str, pred: &str) -> f64 {
    let gt_len = gt.chars().count();
    if gt_len == 0 {
        return if pred.is_empty() { 0.0 } else { f64::INFINITY };
    }
    round3(char_distance(gt, pred) as f64 / gt_len as f64)
}

/// Word Error Rate: word-level edit distance / ground truth word count
pub fn wer(gt: &str, pred: &str) -> f64 {
    let gt_words = gt.split_whitespace().count();
    round3(word_distance(gt, pred) as f64 / gt_words.max(1) as f64)
}

/// Normalized Edit Distance: edit distance / length of the longer string
///
/// Always within [0, 1].
pub fn ned(gt: &str, pred: &str) -> f64 {
    let max_len = gt.chars().count().max(pred.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    round3(char_distance(gt, pred) as f64 / max_len as f64)
}

/// Exact Match Rate: share of predictions identical to their ground truth
///
/// Both corpora must have the same length. An empty corpus scores 0.0.
pub fn emr<G, P>(gt_list: &[G], pred_list: &[P]) -> Result<f64, EvalError>
where
    G: AsRef<str>,
    P: AsRef<str>,
{
    if gt_list.len() != pred_list.len() {
        return Err(EvalError::LengthMismatch {
            ground_truth: gt_list.len(),
            predictions: pred_list.len(),
        });
    }
    if gt_list.is_empty() {
        return Ok(0.0);
    }

    let matches = gt_list
        .iter()
        .zip(pred_list)
        .filter(|(gt, pred)| gt.as_ref() == pred.as_ref())
        .count();

    Ok(matches as f64 / gt_list.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cer_empty_ground_truth() {
        assert_eq!(cer("", ""), 0.0);
        assert_eq!(cer("", "x"), f64::INFINITY);
    }

    #[test]
    fn test_cer_kitten_sitting() {
        assert_eq!(cer("kitten", "sitting"), 0.5);
    }

    #[test]
    fn test_cer_can_exceed_one() {
        assert_eq!(cer("ab", "abcdef"), 2.0);
        assert_eq!(cer("abc", ""), 1.0);
    }

    #[test]
    fn test_wer_examples() {
        assert_eq!(wer("a b c", "a b c"), 0.0);
        assert_eq!(wer("a b c", "a b"), 0.333);
        assert_eq!(wer("", ""), 0.0);
        // Empty ground truth divides by one, not zero
        assert_eq!(wer("", "one two"), 2.0);
    }

    #[test]
    fn test_wer_ignores_whitespace_layout() {
        assert_eq!(wer("line one\nline two", "line  one line\ttwo"), 0.0);
    }

    #[test]
    fn test_ned_examples() {
        assert_eq!(ned("", ""), 0.0);
        assert_eq!(ned("abc", ""), 1.0);
        assert_eq!(ned("", "abc"), 1.0);
        assert_eq!(ned("kitten", "sitting"), 0.429);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.0 / 3.0), 0.333);
        assert_eq!(round3(2.0 / 3.0), 0.667);
        assert_eq!(round3(0.0), 0.0);
        assert_eq!(round3(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_round3_exact_ties_go_to_even() {
        assert_eq!(round3(0.0625), 0.062);
        assert_eq!(round3(0.1875), 0.188);
        assert_eq!(round3(0.3125), 0.312);
        assert_eq!(round3(3.0 / 48.0), 0.062);
    }

    #[test]
    fn test_one_edit_in_sixteen_rounds_to_even() {
        assert_eq!(cer("abcdefghijklmnop", "abcdefghijklmnoX"), 0.062);

        let gt = "a b c d e f g h i j k l m n o p";
        let pred = "a b c d e f g h i j k l m n o X";
        assert_eq!(wer(gt, pred), 0.062);
    }

    #[test]
    fn test_emr_counts_exact_matches() {
        let gt = ["alpha", "beta", "gamma", "delta"];
        let pred = ["alpha", "beta ", "gamma", "Delta"];
        assert_eq!(emr(&gt, &pred).unwrap(), 0.5);
    }

    #[test]
    fn test_emr_accepts_equal_lengths() {
        // The guard rejects mismatched corpora only; equal lengths must succeed
        let gt = vec!["same".to_string()];
        let pred = vec!["same".to_string()];
        assert_eq!(emr(&gt, &pred).unwrap(), 1.0);
    }

    #[test]
    fn test_emr_rejects_length_mismatch() {
        let err = emr(&["a", "b"], &["a"]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::LengthMismatch {
                ground_truth: 2,
                predictions: 1
            }
        ));
    }

    #[test]
    fn test_emr_empty_corpus() {
        let empty: [&str; 0] = [];
        assert_eq!(emr(&empty, &empty).unwrap(), 0.0);
    }

    proptest! {
        #[test]
        fn proptest_ned_in_unit_interval(gt in "\\PC{0,40}", pred in "\\PC{0,40}") {
            let score = ned(&gt, &pred);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn proptest_identical_text_scores_zero(s in "[a-z ]{1,40}") {
            prop_assert_eq!(cer(&s, &s), 0.0);
            prop_assert_eq!(wer(&s, &s), 0.0);
            prop_assert_eq!(ned(&s, &s), 0.0);
        }

        #[test]
        fn proptest_cer_non_negative(gt in "\\PC{1,30}", pred in "\\PC{0,30}") {
            prop_assert!(cer(&gt, &pred) >= 0.0);
            prop_assert!(wer(&gt, &pred) >= 0.0);
        }
    }
}
