pub mod types;
pub mod error;
pub mod options;
pub mod loader;
pub mod session;
pub mod quality;
pub mod detector;
pub mod runner;
pub mod results;
pub mod snapshot;
pub mod pipeline;

pub use types::*;
pub use error::{FixlabError, Result};
pub use options::DetectorOptions;
pub use detector::FixationDetector;
pub use runner::I2mcRunner;
pub use results::ResultTable;
pub use snapshot::{SnapshotFormat, SnapshotSink, SnapshotWriter};
pub use pipeline::{FailurePolicy, Pipeline, PipelineConfig, RunReport};
