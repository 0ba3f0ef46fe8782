use serde::{Deserialize, Serialize};

use super::TransformerId;

/// One distribution transformer as described by the infrastructure table.
///
/// Source columns: `ID_Trafo, Sector, Latitud, Longitud, Capacidad_kVA,
/// kWh_Entregado`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureRecord {
    pub transformer_id: TransformerId,
    pub sector: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_kva: f64,
    pub delivered_kwh: f64,
}
