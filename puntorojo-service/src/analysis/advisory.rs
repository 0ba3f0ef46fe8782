use serde::Serialize;

/// Field recommendation for a flagged transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// Loss attributed to equipment overload.
    TechnicalLoss,
    /// Loss attributed to theft or metering problems.
    NonTechnicalLoss,
}

impl Advisory {
    /// Depends on `loss_pct > technical_loss_pct` alone; an undefined
    /// percentage is not above any threshold.
    pub fn classify(loss_pct: Option<f64>, technical_loss_pct: f64) -> Self {
        if loss_pct.is_some_and(|pct| pct > technical_loss_pct) {
            Advisory::TechnicalLoss
        } else {
            Advisory::NonTechnicalLoss
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Advisory::TechnicalLoss => "technical",
            Advisory::NonTechnicalLoss => "non-technical",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Advisory::TechnicalLoss => {
                "the loss is technical, from overload; recommend a transformer capacity upgrade"
            }
            Advisory::NonTechnicalLoss => {
                "the loss is non-technical; recommend a nighttime normalization operation and network hardening"
            }
        }
    }

    pub fn message(self, sector: &str) -> String {
        format!("In {sector}, {}.", self.recommendation())
    }
}
