use crate::model;
use crate::records;

/// Every failure the pipeline can surface.
///
/// All variants are terminal: nothing is retried, since re-parsing a line or
/// re-fitting a model with the same inputs cannot produce a different answer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A single line or row of an input file could not be decoded.
    #[error("{component}: malformed record in {source_name} at line {line}, field `{field}`: {reason}")]
    MalformedRecord {
        component: &'static str,
        source_name: String,
        line: usize,
        field: String,
        reason: String,
    },

    /// The two decoded series disagree on length or on a timestamp.
    ///
    /// `None` on either side means that series ended before `index`.
    #[error(
        "alignment: series diverge at index {index} (dst: {}, solar wind: {})",
        describe_time(.dst_time),
        describe_time(.imf_time)
    )]
    Alignment {
        index: usize,
        dst_time: Option<records::TimePoint>,
        imf_time: Option<records::TimePoint>,
    },

    /// The model capability failed for one (fold, capacity) pair.
    #[error("sweep: model fit failed in fold {fold} at capacity {capacity}: {source}")]
    ModelFit {
        fold: usize,
        capacity: usize,
        source: model::FitError,
    },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 text", .path.display())]
    InvalidEncoding { path: std::path::PathBuf },

    #[error("report: {0}")]
    Report(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

fn describe_time(time: &Option<records::TimePoint>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:00").to_string(),
        None => "<end of series>".to_string(),
    }
}

impl PipelineError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        PipelineError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
