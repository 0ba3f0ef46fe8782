pub mod analysis;
pub mod config;
pub mod http_api;
pub mod loader;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use analysis::{run_analysis, AnalysisReport};
pub use pipeline::{Envelope, Pipeline};
