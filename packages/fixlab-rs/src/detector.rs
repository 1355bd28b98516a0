use crate::error::Result;
use crate::options::DetectorOptions;
use crate::types::{CleanedSample, Fixation};
use std::future::Future;

/// Boundary to the fixation classification algorithm.
///
/// Implementations receive one session's cleaned samples and the shared
/// option bundle, and return that session's fixations in temporal order.
/// An empty or fully missing session must be accepted; returning no
/// fixations for it is fine. Errors are reported for the whole session.
pub trait FixationDetector {
    fn detect(
        &self,
        samples: &[CleanedSample],
        options: &DetectorOptions,
    ) -> impl Future<Output = Result<Vec<Fixation>>> + Send;
}
