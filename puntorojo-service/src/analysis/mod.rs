//! Join, derive, filter and recommend. Every stage is a plain function from
//! its inputs to a new value; nothing is shared between runs.

pub mod advisory;
pub mod filter;
pub mod join;
pub mod report;

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    config::{AppConfig, MapConfig},
    loader::{self, LoadedTables, TableUpload},
};

pub use advisory::Advisory;
pub use filter::{select_interventions, FlagReason, InterventionThresholds};
pub use join::{join_tables, JoinOutcome};
pub use report::{AnalysisReport, Intervention, MapMarker, MapView, ReportStatus};

/// Markers are flagged per joined row, so repeated ids are judged pairing by pairing.
fn build_map(join: &JoinOutcome, thresholds: &InterventionThresholds, map: &MapConfig) -> MapView {
    let heat_points = join
        .candidates
        .iter()
        .map(|c| [c.latitude, c.longitude])
        .collect();

    let markers = join
        .candidates
        .iter()
        .map(|c| MapMarker {
            transformer_id: c.transformer_id.clone(),
            sector: c.sector.clone(),
            position: [c.latitude, c.longitude],
            popup: report::marker_popup(c),
            flagged: thresholds.flags(c),
        })
        .collect();

    MapView {
        center: [map.center_lat, map.center_lon],
        zoom: map.zoom,
        heat_points,
        markers,
    }
}

fn summarize(loaded: &LoadedTables, join: &JoinOutcome, flagged: usize) -> (ReportStatus, String) {
    let joined = join.candidates.len();

    if joined == 0 {
        let detail = match (loaded.infrastructure.is_empty(), loaded.commercial.is_empty()) {
            (true, true) => "no infrastructure or commercial rows were loaded",
            (true, false) => "no infrastructure rows were loaded",
            (false, true) => "no commercial rows were loaded",
            (false, false) => "no transformer id appears in both tables",
        };
        return (
            ReportStatus::NoMatches,
            format!("Nothing to analyse: {detail}."),
        );
    }

    if flagged == 0 {
        return (
            ReportStatus::NoInterventions,
            format!("{joined} transformer(s) analysed; none exceed the intervention thresholds."),
        );
    }

    (
        ReportStatus::Ready,
        format!("{flagged} of {joined} transformer(s) flagged for field intervention."),
    )
}

/// Run the join, derive, filter and recommend stages over loaded tables.
pub fn analyze(loaded: LoadedTables, cfg: &AppConfig, generated_at: OffsetDateTime) -> AnalysisReport {
    let thresholds = &cfg.thresholds;
    let join = join_tables(&loaded.infrastructure, &loaded.commercial);

    let interventions: Vec<Intervention> = select_interventions(&join.candidates, thresholds)
        .into_iter()
        .map(|(c, reasons)| {
            let advisory = Advisory::classify(c.loss_pct, thresholds.loss_pct);
            Intervention {
                candidate: c.clone(),
                reasons,
                advisory,
                message: advisory.message(&c.sector),
            }
        })
        .collect();

    metrics::counter!("interventions_flagged_total").increment(interventions.len() as u64);

    let (status, summary) = summarize(&loaded, &join, interventions.len());
    tracing::info!(
        joined = join.candidates.len(),
        flagged = interventions.len(),
        status = ?status,
        "analysis complete"
    );

    let map = build_map(&join, thresholds, &cfg.map);

    AnalysisReport {
        generated_at: generated_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| generated_at.to_string()),
        origin: loaded.origin,
        status,
        summary,
        previews: loaded.previews,
        issues: loaded.issues,
        candidates: join.candidates,
        interventions,
        unmatched_infrastructure: join.unmatched_infrastructure,
        unmatched_commercial: join.unmatched_commercial,
        map,
    }
}

/// One full run: load the uploads (or the sample) and analyse them.
pub async fn run_analysis(uploads: Vec<TableUpload>, cfg: &AppConfig) -> AnalysisReport {
    let loaded = loader::load_tables(uploads, cfg.report.preview_rows).await;
    analyze(loaded, cfg, OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DataOrigin;
    use puntorojo_domain::{CommercialRecord, InfrastructureRecord};
    use time::macros::datetime;

    fn loaded(
        infrastructure: Vec<InfrastructureRecord>,
        commercial: Vec<CommercialRecord>,
    ) -> LoadedTables {
        LoadedTables {
            origin: DataOrigin::Uploaded {
                tables: vec!["infra.csv".to_string(), "com.csv".to_string()],
            },
            infrastructure,
            commercial,
            previews: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn infra(id: u32, sector: &str, lat: f64, lon: f64, kva: f64, delivered: f64) -> InfrastructureRecord {
        InfrastructureRecord {
            transformer_id: id.into(),
            sector: sector.to_string(),
            latitude: lat,
            longitude: lon,
            capacity_kva: kva,
            delivered_kwh: delivered,
        }
    }

    fn com(id: u32, billed: f64, customers: u32, revenue: f64) -> CommercialRecord {
        CommercialRecord {
            transformer_id: id.into(),
            billed_kwh: billed,
            direct_customers: customers,
            revenue_dop: revenue,
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00:00 UTC);

    #[test]
    fn gazcue_is_flagged_as_technical_loss() {
        let report = analyze(
            loaded(
                vec![infra(1, "Gazcue", 18.4691, -69.9303, 100.0, 2000.0)],
                vec![com(1, 1000.0, 50, 50_000.0)],
            ),
            &AppConfig::default(),
            NOW,
        );

        assert_eq!(report.status, ReportStatus::Ready);
        let i = &report.interventions[0];
        assert_eq!(i.candidate.loss, 1000.0);
        assert_eq!(i.candidate.loss_pct, Some(50.0));
        assert_eq!(i.advisory, Advisory::TechnicalLoss);
        assert!(i.message.starts_with("In Gazcue,"));
        assert_eq!(report.generated_at, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn ensanche_is_flagged_by_customer_count_as_non_technical() {
        let report = analyze(
            loaded(
                vec![infra(2, "Ensanche", 18.4868, -69.9283, 150.0, 2500.0)],
                vec![com(2, 2300.0, 60, 70_000.0)],
            ),
            &AppConfig::default(),
            NOW,
        );

        let i = &report.interventions[0];
        assert_eq!(i.candidate.loss, 200.0);
        assert_eq!(i.candidate.loss_pct, Some(8.0));
        assert_eq!(i.reasons, vec![FlagReason::CustomerCount]);
        assert_eq!(i.advisory, Advisory::NonTechnicalLoss);
    }

    #[test]
    fn unmatched_transformer_is_absent_downstream() {
        let report = analyze(
            loaded(
                vec![
                    infra(1, "Gazcue", 18.4691, -69.9303, 100.0, 2000.0),
                    infra(9, "Orphan", 18.40, -69.90, 50.0, 9000.0),
                ],
                vec![com(1, 1000.0, 50, 50_000.0)],
            ),
            &AppConfig::default(),
            NOW,
        );

        let orphan = puntorojo_domain::TransformerId::from(9_u32);
        assert!(report.candidates.iter().all(|c| c.transformer_id != orphan));
        assert!(report.interventions.iter().all(|i| i.candidate.transformer_id != orphan));
        assert!(report.map.markers.iter().all(|m| m.transformer_id != orphan));
        assert_eq!(report.map.heat_points.len(), 1);
        assert_eq!(report.unmatched_infrastructure, vec![orphan]);
    }

    #[test]
    fn empty_join_reports_no_matches() {
        let report = analyze(
            loaded(vec![infra(1, "Gazcue", 18.4691, -69.9303, 100.0, 2000.0)], Vec::new()),
            &AppConfig::default(),
            NOW,
        );

        assert_eq!(report.status, ReportStatus::NoMatches);
        assert!(report.summary.contains("no commercial rows"));
        assert!(report.map.markers.is_empty());
        assert_eq!(report.map.center, [18.4675, -69.9312]);
    }

    #[test]
    fn nothing_flagged_keeps_map_layers() {
        let report = analyze(
            loaded(
                vec![infra(4, "Piantini", 18.47, -69.94, 100.0, 1000.0)],
                vec![com(4, 950.0, 10, 20_000.0)],
            ),
            &AppConfig::default(),
            NOW,
        );

        assert_eq!(report.status, ReportStatus::NoInterventions);
        assert!(report.interventions.is_empty());
        assert_eq!(report.map.markers.len(), 1);
        assert!(!report.map.markers[0].flagged);
    }

    #[test]
    fn repeated_id_flags_only_the_pairing_over_threshold() {
        let report = analyze(
            loaded(
                vec![
                    infra(1, "Gazcue", 18.4691, -69.9303, 100.0, 2000.0),
                    infra(1, "Gazcue", 18.4695, -69.9310, 25.0, 100.0),
                ],
                vec![com(1, 90.0, 1, 5_000.0)],
            ),
            &AppConfig::default(),
            NOW,
        );

        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.interventions.len(), 1);
        let flagged: Vec<bool> = report.map.markers.iter().map(|m| m.flagged).collect();
        assert_eq!(flagged, vec![true, false]);
    }

    #[tokio::test]
    async fn sample_run_flags_every_site() {
        let report = run_analysis(Vec::new(), &AppConfig::default()).await;

        assert_eq!(report.origin, DataOrigin::Sample);
        assert_eq!(report.candidates.len(), 3);
        assert_eq!(report.interventions.len(), 3);
        assert!(report
            .interventions
            .iter()
            .all(|i| i.advisory == Advisory::TechnicalLoss));
        assert_eq!(report.previews.len(), 2);
    }
}
