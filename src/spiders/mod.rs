use crate::extract::Extractor;
use crate::request::RequestSpec;

pub mod notes;

/// Source of one run's requests and of the rule for reading their responses.
pub trait Spider: Send + Sync {
    fn name(&self) -> String;
    fn start_requests(&self) -> Vec<RequestSpec>;
    fn extractor(&self) -> Extractor;
}
