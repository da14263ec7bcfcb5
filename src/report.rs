//! CSV reports for evaluation runs
//!
//! One `ocr_eval_results_<tool>.csv` per tool, plus a summary comparing
//! tools side by side.

use crate::batch::EvaluationRun;
use crate::error::EvalError;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Report header, in column order
pub const COLUMNS: [&str; 5] = ["gt_filename", "ocr_filename", "cer", "wer", "ned"];

pub const SUMMARY_FILE: &str = "ocr_eval_summary.csv";

/// Per-tool aggregate of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSummary {
    pub tool: String,
    pub evaluated: usize,
    pub skipped: usize,
    pub mean_cer: Option<f64>,
    pub mean_wer: Option<f64>,
    pub mean_ned: Option<f64>,
    pub emr: Option<f64>,
}

pub fn report_path(output_dir: &Path, tool: &str) -> PathBuf {
    output_dir.join(format!("ocr_eval_results_{}.csv", tool))
}

/// Write a run's records as CSV
///
/// The header is written even when every pair was skipped.
pub fn write_run<W: Write>(run: &EvaluationRun, writer: W) -> Result<(), EvalError> {
    let mut csv = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(COLUMNS)?;
    for record in &run.records {
        csv.serialize(record)?;
    }
    csv.flush().map_err(|e| EvalError::Report(e.to_string()))
}

/// Persist a run's report into `output_dir`, keyed by tool
pub fn export_run(run: &EvaluationRun, output_dir: &Path) -> Result<PathBuf, EvalError> {
    let path = report_path(output_dir, &run.tool);
    persist(output_dir, &path, |file| write_run(run, file))?;
    tracing::info!(
        "Wrote {} rows for {} to {}",
        run.records.len(),
        run.tool,
        path.display()
    );
    Ok(path)
}

pub fn summarize(run: &EvaluationRun) -> ToolSummary {
    ToolSummary {
        tool: run.tool.clone(),
        evaluated: run.records.len(),
        skipped: run.skipped.len(),
        mean_cer: mean(run.records.iter().map(|r| r.cer)),
        mean_wer: mean(run.records.iter().map(|r| r.wer)),
        mean_ned: mean(run.records.iter().map(|r| r.ned)),
        emr: run.emr,
    }
}

pub fn write_summary<W: Write>(summaries: &[ToolSummary], writer: W) -> Result<(), EvalError> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    for summary in summaries {
        csv.serialize(summary)?;
    }
    csv.flush().map_err(|e| EvalError::Report(e.to_string()))
}

pub fn export_summary(summaries: &[ToolSummary], output_dir: &Path) -> Result<PathBuf, EvalError> {
    let path = output_dir.join(SUMMARY_FILE);
    persist(output_dir, &path, |file| write_summary(summaries, file))?;
    Ok(path)
}

/// Plain-text comparison table for the terminal
pub fn format_comparison(summaries: &[ToolSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>9} {:>8} {:>9} {:>9} {:>9} {:>9}",
        "Tool", "Evaluated", "Skipped", "CER", "WER", "NED", "EMR"
    );
    let _ = writeln!(out, "{:-<72}", "");
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<12} {:>9} {:>8} {:>9} {:>9} {:>9} {:>9}",
            s.tool,
            s.evaluated,
            s.skipped,
            fmt_score(s.mean_cer),
            fmt_score(s.mean_wer),
            fmt_score(s.mean_ned),
            fmt_score(s.emr),
        );
    }
    out
}

fn fmt_score(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Write into a temp file beside `path`, then rename over it
fn persist<F>(output_dir: &Path, path: &Path, write: F) -> Result<(), EvalError>
where
    F: FnOnce(&mut tempfile::NamedTempFile) -> Result<(), EvalError>,
{
    std::fs::create_dir_all(output_dir).map_err(|e| {
        EvalError::Report(format!("cannot create {}: {}", output_dir.display(), e))
    })?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(".ocr_eval")
        .suffix(".csv")
        .tempfile_in(output_dir)
        .map_err(|e| EvalError::Report(format!("Failed to create temp file: {}", e)))?;

    write(&mut temp_file)?;

    temp_file
        .persist(path)
        .map_err(|e| EvalError::Report(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}
