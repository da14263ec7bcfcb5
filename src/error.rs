use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Mismatched list lengths: {ground_truth} ground truth vs {predictions} predictions")]
    LengthMismatch {
        ground_truth: usize,
        predictions: usize,
    },

    #[error("Cannot pair documents for {tool}: {ground_truth} ground truth files vs {ocr} OCR files")]
    PairCountMismatch {
        tool: String,
        ground_truth: usize,
        ocr: usize,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path} as {encoding}")]
    Decode { path: String, encoding: String },

    #[error("Unknown OCR tool: {0}")]
    UnknownTool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to write report: {0}")]
    Report(String),
}

/// Machine-readable error description, printed by `pair --format json`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl EvalError {
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        EvalError::Read {
            path: path.display().to_string(),
            source,
        }
    }

    /// Stable identifier for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            EvalError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            EvalError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            EvalError::PairCountMismatch { .. } => "PAIR_COUNT_MISMATCH",
            EvalError::Read { .. } => "READ_ERROR",
            EvalError::Decode { .. } => "DECODE_ERROR",
            EvalError::UnknownTool(_) => "UNKNOWN_TOOL",
            EvalError::Config(_) => "CONFIG_ERROR",
            EvalError::Report(_) => "REPORT_ERROR",
        }
    }

    /// Process exit status used when this error ends the program
    pub fn exit_code(&self) -> u8 {
        match self {
            EvalError::UnsupportedFormat(_) => 3,
            EvalError::MalformedPayload(_) => 4,
            EvalError::Read { .. } | EvalError::Decode { .. } => 5,
            EvalError::LengthMismatch { .. } | EvalError::PairCountMismatch { .. } => 6,
            EvalError::UnknownTool(_) | EvalError::Config(_) => 2,
            EvalError::Report(_) => 7,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

impl From<csv::Error> for EvalError {
    fn from(e: csv::Error) -> Self {
        EvalError::Report(e.to_string())
    }
}
