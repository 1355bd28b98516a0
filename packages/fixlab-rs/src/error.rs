use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixlabError {
    #[error("Python interpreter not found: {0}")]
    PythonNotFound(String),

    #[error("Detector bridge script not found: {0}")]
    BridgeNotFound(String),

    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Fixation detection failed: {0}")]
    DetectionFailed(String),

    #[error("Failed to parse detector output: {0}")]
    ParseError(String),

    #[error("Session {session} failed: {source}")]
    SessionFailed {
        session: String,
        #[source]
        source: Box<FixlabError>,
    },

    #[error("Session label '{label}' is shared by {first} and {second}")]
    LabelCollision {
        label: String,
        first: String,
        second: String,
    },

    #[error("Failed to persist snapshot to {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FixlabError>;
