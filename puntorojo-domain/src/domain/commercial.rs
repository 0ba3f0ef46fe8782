use serde::{Deserialize, Serialize};

use super::TransformerId;

/// Billing totals for the customers served by one transformer.
///
/// Source columns: `ID_Trafo, kWh_Facturado, Clientes_Directos,
/// Recaudacion_DOP`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialRecord {
    pub transformer_id: TransformerId,
    pub billed_kwh: f64,
    pub direct_customers: u32,
    pub revenue_dop: f64,
}
