use serde::{Deserialize, Serialize};

use super::{CommercialRecord, InfrastructureRecord, TransformerId};

/// A joined infrastructure/commercial pair with its derived loss metrics.
///
/// `loss_pct` is `None` when nothing was delivered (`delivered_kwh == 0`),
/// where the percentage has no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionCandidate {
    pub transformer_id: TransformerId,
    pub sector: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_kva: f64,
    pub delivered_kwh: f64,
    pub billed_kwh: f64,
    pub direct_customers: u32,
    pub revenue_dop: f64,
    pub loss: f64,
    pub loss_pct: Option<f64>,
}

impl InterventionCandidate {
    /// Combine a matching pair and compute `loss` and `loss_pct`.
    pub fn from_pair(infra: &InfrastructureRecord, commercial: &CommercialRecord) -> Self {
        let loss = infra.delivered_kwh - commercial.billed_kwh;

        Self {
            transformer_id: infra.transformer_id.clone(),
            sector: infra.sector.clone(),
            latitude: infra.latitude,
            longitude: infra.longitude,
            capacity_kva: infra.capacity_kva,
            delivered_kwh: infra.delivered_kwh,
            billed_kwh: commercial.billed_kwh,
            direct_customers: commercial.direct_customers,
            revenue_dop: commercial.revenue_dop,
            loss,
            loss_pct: loss_percentage(loss, infra.delivered_kwh),
        }
    }
}

/// `loss / delivered * 100`, or `None` when `delivered` is zero.
pub fn loss_percentage(loss: f64, delivered_kwh: f64) -> Option<f64> {
    if delivered_kwh == 0.0 {
        None
    } else {
        Some(loss / delivered_kwh * 100.0)
    }
}
