use puntorojo_domain::InterventionCandidate;
use serde::{Deserialize, Serialize};

/// Limits above which a transformer is put on the intervention list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionThresholds {
    /// Loss percentage; also separates technical from non-technical advisories.
    pub loss_pct: f64,
    /// Absolute loss in kWh.
    pub loss_kwh: f64,
    pub direct_customers: u32,
}

impl Default for InterventionThresholds {
    fn default() -> Self {
        Self {
            loss_pct: 45.0,
            loss_kwh: 500.0,
            direct_customers: 50,
        }
    }
}

/// Which clause of the selection predicate a candidate satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    LossPercentage,
    AbsoluteLoss,
    CustomerCount,
}

impl FlagReason {
    pub fn label(self) -> &'static str {
        match self {
            FlagReason::LossPercentage => "loss %",
            FlagReason::AbsoluteLoss => "loss kWh",
            FlagReason::CustomerCount => "customers",
        }
    }
}

impl InterventionThresholds {
    /// Clauses of `loss_pct > t OR loss > t OR direct_customers > t` that hold.
    /// An undefined percentage never satisfies the percentage clause.
    pub fn reasons(&self, c: &InterventionCandidate) -> Vec<FlagReason> {
        let mut reasons = Vec::new();
        if c.loss_pct.is_some_and(|pct| pct > self.loss_pct) {
            reasons.push(FlagReason::LossPercentage);
        }
        if c.loss > self.loss_kwh {
            reasons.push(FlagReason::AbsoluteLoss);
        }
        if c.direct_customers > self.direct_customers {
            reasons.push(FlagReason::CustomerCount);
        }
        reasons
    }

    pub fn flags(&self, c: &InterventionCandidate) -> bool {
        !self.reasons(c).is_empty()
    }
}

/// Keep the candidates that satisfy any clause, preserving input order.
pub fn select_interventions<'a>(
    candidates: &'a [InterventionCandidate],
    thresholds: &InterventionThresholds,
) -> Vec<(&'a InterventionCandidate, Vec<FlagReason>)> {
    candidates
        .iter()
        .filter_map(|c| {
            let reasons = thresholds.reasons(c);
            (!reasons.is_empty()).then_some((c, reasons))
        })
        .collect()
}
