use crate::pipeline::{Envelope, PipelineError, Transform};
use puntorojo_domain::{CommercialRecord, InfrastructureRecord, TransformerId};

fn reject(id: &TransformerId, reason: impl Into<String>) -> PipelineError {
    PipelineError::Transform {
        transformer_id: id.to_string(),
        reason: reason.into(),
    }
}

fn check_finite(id: &TransformerId, fields: &[(&str, f64)]) -> Result<(), PipelineError> {
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, _)) => Err(reject(id, format!("{name} must be a finite number"))),
        None => Ok(()),
    }
}

fn check_non_negative(id: &TransformerId, fields: &[(&str, f64)]) -> Result<(), PipelineError> {
    match fields.iter().find(|(_, v)| *v < 0.0) {
        Some((name, _)) => Err(reject(id, format!("{name} must be non-negative"))),
        None => Ok(()),
    }
}

/// Pure validation of an `InfrastructureRecord`.
///
/// Rules:
/// - transformer id must be present.
/// - all numeric fields finite; capacity and delivered kWh non-negative.
/// - coordinates within WGS84 bounds.
pub fn validate_infrastructure(
    env: Envelope<InfrastructureRecord>,
) -> Result<Envelope<InfrastructureRecord>, PipelineError> {
    let r = &env.payload;
    let id = &r.transformer_id;

    if id.is_empty() {
        return Err(reject(id, "transformer id is empty"));
    }

    check_finite(
        id,
        &[
            ("latitude", r.latitude),
            ("longitude", r.longitude),
            ("capacity_kva", r.capacity_kva),
            ("delivered_kwh", r.delivered_kwh),
        ],
    )?;
    check_non_negative(
        id,
        &[("capacity_kva", r.capacity_kva), ("delivered_kwh", r.delivered_kwh)],
    )?;

    if !(-90.0..=90.0).contains(&r.latitude) {
        return Err(reject(id, format!("latitude {} out of range", r.latitude)));
    }
    if !(-180.0..=180.0).contains(&r.longitude) {
        return Err(reject(id, format!("longitude {} out of range", r.longitude)));
    }

    Ok(env)
}

/// Pure validation of a `CommercialRecord`.
///
/// Rules:
/// - transformer id must be present.
/// - billed kWh and revenue finite; billed kWh non-negative.
pub fn validate_commercial(
    env: Envelope<CommercialRecord>,
) -> Result<Envelope<CommercialRecord>, PipelineError> {
    let r = &env.payload;
    let id = &r.transformer_id;

    if id.is_empty() {
        return Err(reject(id, "transformer id is empty"));
    }

    check_finite(id, &[("billed_kwh", r.billed_kwh), ("revenue_dop", r.revenue_dop)])?;
    check_non_negative(id, &[("billed_kwh", r.billed_kwh)])?;

    Ok(env)
}

#[derive(Clone, Default)]
pub struct InfrastructureValidation;

#[async_trait::async_trait]
impl Transform<InfrastructureRecord, InfrastructureRecord> for InfrastructureValidation {
    async fn apply(
        &self,
        input: Envelope<InfrastructureRecord>,
    ) -> Result<Envelope<InfrastructureRecord>, PipelineError> {
        match validate_infrastructure(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_rows_rejected_total", "role" => "infrastructure")
                    .increment(1);
                Err(e)
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct CommercialValidation;

#[async_trait::async_trait]
impl Transform<CommercialRecord, CommercialRecord> for CommercialValidation {
    async fn apply(
        &self,
        input: Envelope<CommercialRecord>,
    ) -> Result<Envelope<CommercialRecord>, PipelineError> {
        match validate_commercial(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_rows_rejected_total", "role" => "commercial")
                    .increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infra_env(latitude: f64, delivered_kwh: f64) -> Envelope<InfrastructureRecord> {
        Envelope {
            payload: InfrastructureRecord {
                transformer_id: "1".into(),
                sector: "Gazcue".to_string(),
                latitude,
                longitude: -69.9303,
                capacity_kva: 100.0,
                delivered_kwh,
            },
            table: "infra.csv".into(),
            line: 2,
        }
    }

    fn commercial_env(id: &str, billed_kwh: f64) -> Envelope<CommercialRecord> {
        Envelope {
            payload: CommercialRecord {
                transformer_id: id.into(),
                billed_kwh,
                direct_customers: 50,
                revenue_dop: 50_000.0,
            },
            table: "com.csv".into(),
            line: 2,
        }
    }

    #[test]
    fn infrastructure_validation_accepts_valid_record() {
        assert!(validate_infrastructure(infra_env(18.4691, 2000.0)).is_ok());
    }

    #[test]
    fn infrastructure_validation_accepts_zero_delivery() {
        assert!(validate_infrastructure(infra_env(18.4691, 0.0)).is_ok());
    }

    #[test]
    fn infrastructure_validation_rejects_out_of_range_latitude() {
        let res = validate_infrastructure(infra_env(118.4, 2000.0));
        assert!(matches!(res, Err(PipelineError::Transform { ref reason, .. }) if reason.contains("latitude")));
    }

    #[test]
    fn infrastructure_validation_rejects_nan_delivery() {
        let res = validate_infrastructure(infra_env(18.4691, f64::NAN));
        assert!(matches!(res, Err(PipelineError::Transform { .. })));
    }

    #[test]
    fn commercial_validation_rejects_negative_billing() {
        let res = validate_commercial(commercial_env("1", -5.0));
        assert!(matches!(
            res,
            Err(PipelineError::Transform { ref transformer_id, .. }) if transformer_id == "1"
        ));
    }

    #[test]
    fn commercial_validation_rejects_empty_id() {
        assert!(validate_commercial(commercial_env("  ", 10.0)).is_err());
    }
}
