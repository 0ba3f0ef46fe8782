use puntorojo_domain::{InterventionCandidate, TransformerId};
use serde::Serialize;

use crate::loader::{DataOrigin, LoadIssue, TablePreview};

use super::{advisory::Advisory, filter::FlagReason};

/// A flagged transformer with the recommended field action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intervention {
    #[serde(flatten)]
    pub candidate: InterventionCandidate,
    pub reasons: Vec<FlagReason>,
    pub advisory: Advisory,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub transformer_id: TransformerId,
    pub sector: String,
    pub position: [f64; 2],
    pub popup: String,
    pub flagged: bool,
}

/// Everything the map needs: fixed viewport, heat layer points (one per
/// joined record) and point markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: u8,
    pub heat_points: Vec<[f64; 2]>,
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// At least one transformer is on the intervention list.
    Ready,
    /// Records joined but none crossed a threshold.
    NoInterventions,
    /// The join produced no rows.
    NoMatches,
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub origin: DataOrigin,
    pub status: ReportStatus,
    pub summary: String,
    pub previews: Vec<TablePreview>,
    pub issues: Vec<LoadIssue>,
    pub candidates: Vec<InterventionCandidate>,
    pub interventions: Vec<Intervention>,
    pub unmatched_infrastructure: Vec<TransformerId>,
    pub unmatched_commercial: Vec<TransformerId>,
    pub map: MapView,
}

/// `12.34%`, or `n/a` when nothing was delivered.
pub fn format_loss_pct(loss_pct: Option<f64>) -> String {
    match loss_pct {
        Some(pct) => format!("{pct:.2}%"),
        None => "n/a".to_string(),
    }
}

pub fn marker_popup(c: &InterventionCandidate) -> String {
    format!(
        "Loss: {} | Lost kWh: {} | Customers: {}",
        format_loss_pct(c.loss_pct),
        c.loss,
        c.direct_customers
    )
}
