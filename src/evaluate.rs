//! Scoring of one ground-truth / OCR output pair

use crate::error::EvalError;
use crate::extract::{read_payload, ExtractionRule};
use crate::metrics::{cer, ned, wer};
use encoding_rs::Encoding;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Scores for one ground-truth / OCR output pair
///
/// Field order is the report column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub gt_filename: String,
    pub ocr_filename: String,
    #[serde(serialize_with = "serialize_score")]
    pub cer: f64,
    #[serde(serialize_with = "serialize_score")]
    pub wer: f64,
    #[serde(serialize_with = "serialize_score")]
    pub ned: f64,
}

/// JSON has no infinity; non-finite scores are written as `"inf"`
fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if score.is_finite() {
        serializer.serialize_f64(*score)
    } else {
        serializer.collect_str(score)
    }
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gt: {} / ocr: {} - cer: {}, wer: {}, ned: {}",
            self.gt_filename, self.ocr_filename, self.cer, self.wer, self.ned
        )
    }
}

/// A scored pair together with the texts it was scored on
#[derive(Debug, Clone)]
pub struct EvaluatedPair {
    pub record: MetricRecord,
    pub ground_truth: String,
    pub prediction: String,
}

/// Score two text payloads
pub fn evaluate_texts(
    gt_filename: impl Into<String>,
    ocr_filename: impl Into<String>,
    gt_text: &str,
    ocr_text: &str,
) -> MetricRecord {
    MetricRecord {
        gt_filename: gt_filename.into(),
        ocr_filename: ocr_filename.into(),
        cer: cer(gt_text, ocr_text),
        wer: wer(gt_text, ocr_text),
        ned: ned(gt_text, ocr_text),
    }
}

/// Read, extract and score one pair of files
///
/// A JSON ground truth must be a bare JSON string; the OCR side uses the
/// tool's extraction rule.
pub fn evaluate_files(
    gt_path: &Path,
    ocr_path: &Path,
    rule: &ExtractionRule,
    encoding: &'static Encoding,
) -> Result<EvaluatedPair, EvalError> {
    let ground_truth = read_payload(gt_path, &ExtractionRule::Root, encoding)?;
    let prediction = read_payload(ocr_path, rule, encoding)?;

    let record = evaluate_texts(
        file_name(gt_path),
        file_name(ocr_path),
        &ground_truth,
        &prediction,
    );

    Ok(EvaluatedPair {
        record,
        ground_truth,
        prediction,
    })
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
