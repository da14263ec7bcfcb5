//! Batch evaluation across documents and OCR tools
//!
//! Ground-truth and OCR files are paired by position in their sorted
//! listings. A pair that cannot be read or scored is logged and skipped;
//! the rest of the batch carries on.

use crate::config::Config;
use crate::error::EvalError;
use crate::evaluate::{evaluate_files, file_name, EvaluatedPair, MetricRecord};
use crate::extract::ExtractionRule;
use crate::metrics::emr;
use crate::tools::ToolSpec;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default ground-truth directory inside the working directory
pub const GROUND_TRUTH_DIR: &str = "_pdf_copy_paste_to_txt";

/// Positionally matched ground-truth and OCR files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    pub index: usize,
    pub ground_truth: PathBuf,
    pub ocr_output: PathBuf,
}

/// A pair left out of the run and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPair {
    pub index: usize,
    pub gt_filename: String,
    pub ocr_filename: String,
    pub reason: String,
}

/// Result of evaluating a single pair
#[derive(Debug, Clone)]
pub enum PairOutcome {
    Evaluated {
        index: usize,
        pair: Box<EvaluatedPair>,
    },
    Skipped(SkippedPair),
}

impl PairOutcome {
    /// Position of the pair in the batch
    pub fn index(&self) -> usize {
        match self {
            PairOutcome::Evaluated { index, .. } => *index,
            PairOutcome::Skipped(skipped) => skipped.index,
        }
    }
}

/// All records for one tool over one batch
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub tool: String,
    /// Records in pair order, skipped pairs omitted
    pub records: Vec<MetricRecord>,
    pub skipped: Vec<SkippedPair>,
    /// Exact match rate over the evaluated pairs
    pub emr: Option<f64>,
    pub elapsed_ms: u64,
}

impl EvaluationRun {
    pub fn total_pairs(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// Outcome of one tool's batch
#[derive(Debug)]
pub enum ToolOutcome {
    Completed(EvaluationRun),
    Failed { tool: String, error: EvalError },
}

/// Regular files in `dir`, sorted by path; dotfiles are ignored
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let entries = std::fs::read_dir(dir).map_err(|e| EvalError::read(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EvalError::read(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_file() && !hidden {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Pair two sorted listings by position
pub fn pair_documents(
    tool: &str,
    ground_truth: &[PathBuf],
    ocr_outputs: &[PathBuf],
) -> Result<Vec<DocumentPair>, EvalError> {
    if ground_truth.len() != ocr_outputs.len() {
        return Err(EvalError::PairCountMismatch {
            tool: tool.to_string(),
            ground_truth: ground_truth.len(),
            ocr: ocr_outputs.len(),
        });
    }

    Ok(ground_truth
        .iter()
        .zip(ocr_outputs)
        .enumerate()
        .map(|(index, (gt, ocr))| DocumentPair {
            index,
            ground_truth: gt.clone(),
            ocr_output: ocr.clone(),
        })
        .collect())
}

/// Drives per-tool evaluation runs
pub struct BatchEvaluator<'a> {
    config: &'a Config,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    workers: usize,
}

impl<'a> BatchEvaluator<'a> {
    pub fn new(config: &'a Config, workers: usize) -> Self {
        let workers = workers.max(1);

        #[cfg(not(feature = "parallel"))]
        {
            if workers > 1 {
                tracing::warn!(
                    "Built without the `parallel` feature, ignoring --workers {}",
                    workers
                );
            }
        }

        Self { config, workers }
    }

    /// Evaluate every tool against the ground-truth directory
    ///
    /// Tool outputs are looked up in `<working_dir>/<tool output dir>`. A tool
    /// whose outputs are missing or do not pair up fails on its own.
    pub fn run_all(
        &self,
        working_dir: &Path,
        ground_truth_dir: &Path,
        tools: &[&ToolSpec],
    ) -> Result<Vec<ToolOutcome>, EvalError> {
        let gt_dir = working_dir.join(ground_truth_dir);
        let gt_files = list_documents(&gt_dir)?;
        tracing::info!(
            "Found {} ground truth files in {}",
            gt_files.len(),
            gt_dir.display()
        );

        let outcomes = tools
            .iter()
            .map(|tool| {
                let ocr_dir = working_dir.join(tool.output_dir());
                match self.run_tool(tool, &gt_files, &ocr_dir) {
                    Ok(run) => ToolOutcome::Completed(run),
                    Err(error) => {
                        tracing::error!("Evaluation of {} failed: {}", tool.name, error);
                        ToolOutcome::Failed {
                            tool: tool.name.clone(),
                            error,
                        }
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }

    /// Evaluate one tool's output directory against the ground-truth files
    pub fn run_tool(
        &self,
        tool: &ToolSpec,
        gt_files: &[PathBuf],
        ocr_dir: &Path,
    ) -> Result<EvaluationRun, EvalError> {
        tracing::info!("Evaluating OCR tool: {} ({})", tool.name, ocr_dir.display());

        let ocr_files = list_documents(ocr_dir)?;
        let pairs = pair_documents(&tool.name, gt_files, &ocr_files)?;

        Ok(self.run_pairs(tool, &pairs))
    }

    /// Score a prepared list of pairs
    pub fn run_pairs(&self, tool: &ToolSpec, pairs: &[DocumentPair]) -> EvaluationRun {
        let start = Instant::now();

        let mut outcomes = self.score_all(pairs, &tool.rule);
        // Restore pair order regardless of scheduling
        outcomes.sort_by_key(PairOutcome::index);

        let mut records = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        let mut gt_corpus = Vec::new();
        let mut pred_corpus = Vec::new();

        for outcome in outcomes {
            match outcome {
                PairOutcome::Evaluated { pair, .. } => {
                    let EvaluatedPair {
                        record,
                        ground_truth,
                        prediction,
                    } = *pair;
                    records.push(record);
                    gt_corpus.push(ground_truth);
                    pred_corpus.push(prediction);
                }
                PairOutcome::Skipped(pair) => skipped.push(pair),
            }
        }

        let exact_match_rate = if records.is_empty() {
            None
        } else {
            match emr(&gt_corpus, &pred_corpus) {
                Ok(rate) => Some(rate),
                Err(e) => {
                    tracing::warn!("EMR for {} unavailable: {}", tool.name, e);
                    None
                }
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "{}: {} evaluated, {} skipped in {}ms",
            tool.name,
            records.len(),
            skipped.len(),
            elapsed_ms
        );

        EvaluationRun {
            tool: tool.name.clone(),
            records,
            skipped,
            emr: exact_match_rate,
            elapsed_ms,
        }
    }

    fn score_all(&self, pairs: &[DocumentPair], rule: &ExtractionRule) -> Vec<PairOutcome> {
        #[cfg(feature = "parallel")]
        {
            if self.workers > 1 {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.workers)
                    .build()
                {
                    Ok(pool) => {
                        return pool.install(|| {
                            pairs
                                .par_iter()
                                .map(|pair| self.evaluate_pair(pair, rule))
                                .collect()
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Failed to start worker pool, scoring sequentially: {}", e)
                    }
                }
            }
        }

        pairs
            .iter()
            .map(|pair| self.evaluate_pair(pair, rule))
            .collect()
    }

    /// Evaluate a single pair, converting any failure into a skip
    pub fn evaluate_pair(&self, pair: &DocumentPair, rule: &ExtractionRule) -> PairOutcome {
        match evaluate_files(
            &pair.ground_truth,
            &pair.ocr_output,
            rule,
            self.config.encoding,
        ) {
            Ok(evaluated) => {
                tracing::info!("{}", evaluated.record);
                PairOutcome::Evaluated {
                    index: pair.index,
                    pair: Box::new(evaluated),
                }
            }
            Err(e) => {
                let gt_filename = file_name(&pair.ground_truth);
                let ocr_filename = file_name(&pair.ocr_output);
                tracing::warn!(
                    pair = pair.index,
                    code = e.code(),
                    "Error processing {} or {}: {}",
                    gt_filename,
                    ocr_filename,
                    e
                );
                PairOutcome::Skipped(SkippedPair {
                    index: pair.index,
                    gt_filename,
                    ocr_filename,
                    reason: e.to_string(),
                })
            }
        }
    }
}
