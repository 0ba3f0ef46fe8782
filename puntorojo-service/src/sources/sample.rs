use std::sync::Arc;

use futures::stream;
use puntorojo_domain::{CommercialRecord, InfrastructureRecord, TransformerId};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

pub const SAMPLE_INFRASTRUCTURE_TABLE: &str = "sample-infrastructure";
pub const SAMPLE_COMMERCIAL_TABLE: &str = "sample-commercial";

/// Built-in infrastructure table used when nothing was uploaded.
pub fn infrastructure() -> Vec<InfrastructureRecord> {
    [
        (1_u32, "Gazcue", 18.4691, -69.9303, 100.0, 2000.0),
        (2, "Ensanche Luperón", 18.4868, -69.9283, 150.0, 2500.0),
        (3, "San Isidro", 18.4507, -69.9085, 200.0, 3000.0),
    ]
    .into_iter()
    .map(
        |(id, sector, latitude, longitude, capacity_kva, delivered_kwh)| InfrastructureRecord {
            transformer_id: TransformerId::from(id),
            sector: sector.to_string(),
            latitude,
            longitude,
            capacity_kva,
            delivered_kwh,
        },
    )
    .collect()
}

/// Built-in commercial table matching [`infrastructure`].
pub fn commercial() -> Vec<CommercialRecord> {
    [(1_u32, 1000.0, 50, 50_000.0), (2, 1200.0, 60, 70_000.0), (3, 1500.0, 70, 90_000.0)]
        .into_iter()
        .map(|(id, billed_kwh, direct_customers, revenue_dop)| CommercialRecord {
            transformer_id: TransformerId::from(id),
            billed_kwh,
            direct_customers,
            revenue_dop,
        })
        .collect()
}

/// Replays an in-memory table as a source.
pub struct StaticSource<T> {
    table: Arc<str>,
    rows: Vec<T>,
}

impl<T> StaticSource<T> {
    pub fn new(table: impl Into<Arc<str>>, rows: Vec<T>) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync + 'static> Source<T> for StaticSource<T> {
    async fn stream(&self) -> EnvelopeStream<T> {
        let table = self.table.clone();
        let envelopes: Vec<Result<Envelope<T>, PipelineError>> = self
            .rows
            .iter()
            .cloned()
            .enumerate()
            .map(|(idx, payload)| {
                Ok(Envelope {
                    payload,
                    table: table.clone(),
                    line: idx as u64 + 2,
                })
            })
            .collect();

        Box::pin(stream::iter(envelopes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_tables_pair_up_by_id() {
        let infra = infrastructure();
        let com = commercial();
        assert_eq!(infra.len(), 3);
        assert_eq!(com.len(), 3);
        for (i, c) in infra.iter().zip(&com) {
            assert_eq!(i.transformer_id, c.transformer_id);
        }
        assert_eq!(infra[1].sector, "Ensanche Luperón");
        assert_eq!(com[2].direct_customers, 70);
    }
}
