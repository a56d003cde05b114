pub mod client;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod request;
pub mod settings;
pub mod sink;
pub mod spiders;

pub use crate::client::{HttpClient, ReqwestClient, Response};
pub use crate::crawler::{Crawler, CrawlerOptions, RunSummary};
pub use crate::error::{Error, FailureReason, MalformedPayload, SinkError, TransportError};
pub use crate::extract::{ExtractedRecord, Extractor};
pub use crate::request::{Attempt, RequestSpec};
pub use crate::sink::{FailureReporter, ResultSink};

// == Client ==
// Name your user agent after your app?
pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
