pub mod collect;
pub mod html_report;
pub mod terminal;

pub use collect::{CollectSink, Collected};
pub use html_report::HtmlReportSink;
pub use terminal::TerminalSink;

use crate::{analysis::AnalysisReport, pipeline::PipelineError};

/// Destination for a finished analysis.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &AnalysisReport) -> Result<(), PipelineError>;
}
