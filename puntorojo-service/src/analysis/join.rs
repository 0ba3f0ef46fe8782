use std::collections::{HashMap, HashSet};

use puntorojo_domain::{CommercialRecord, InfrastructureRecord, InterventionCandidate, TransformerId};

/// Result of the inner join between the two tables.
#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub candidates: Vec<InterventionCandidate>,
    /// Infrastructure ids with no commercial counterpart, in input order.
    pub unmatched_infrastructure: Vec<TransformerId>,
    /// Commercial ids with no infrastructure counterpart, in input order.
    pub unmatched_commercial: Vec<TransformerId>,
    /// Ids repeated in either table; each repeat multiplies the joined rows.
    pub duplicate_ids: Vec<TransformerId>,
}

fn repeated_ids<'a>(ids: impl Iterator<Item = &'a TransformerId>) -> Vec<&'a TransformerId> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in ids {
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }
    repeated
}

/// Inner join on `transformer_id`, deriving loss metrics for every pair.
///
/// Output follows infrastructure order, then commercial order within a
/// repeated key. Repeated keys are not deduplicated: every infrastructure
/// row pairs with every commercial row of the same id.
pub fn join_tables(
    infrastructure: &[InfrastructureRecord],
    commercial: &[CommercialRecord],
) -> JoinOutcome {
    let mut by_id: HashMap<&TransformerId, Vec<&CommercialRecord>> = HashMap::new();
    for c in commercial {
        by_id.entry(&c.transformer_id).or_default().push(c);
    }

    let mut outcome = JoinOutcome::default();
    let mut matched: HashSet<&TransformerId> = HashSet::new();

    for infra in infrastructure {
        match by_id.get(&infra.transformer_id) {
            Some(rows) => {
                matched.insert(&infra.transformer_id);
                outcome
                    .candidates
                    .extend(rows.iter().map(|c| InterventionCandidate::from_pair(infra, c)));
            }
            None => outcome.unmatched_infrastructure.push(infra.transformer_id.clone()),
        }
    }

    let mut reported: HashSet<&TransformerId> = HashSet::new();
    for c in commercial {
        if !matched.contains(&c.transformer_id) && reported.insert(&c.transformer_id) {
            outcome.unmatched_commercial.push(c.transformer_id.clone());
        }
    }

    let mut duplicates = repeated_ids(infrastructure.iter().map(|r| &r.transformer_id));
    for id in repeated_ids(commercial.iter().map(|r| &r.transformer_id)) {
        if !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    outcome.duplicate_ids = duplicates.into_iter().cloned().collect();

    if !outcome.duplicate_ids.is_empty() {
        tracing::warn!(
            ids = ?outcome.duplicate_ids,
            "repeated transformer ids, joined rows are multiplied"
        );
    }
    if !outcome.unmatched_infrastructure.is_empty() || !outcome.unmatched_commercial.is_empty() {
        metrics::counter!("join_unmatched_infrastructure_total")
            .increment(outcome.unmatched_infrastructure.len() as u64);
        metrics::counter!("join_unmatched_commercial_total")
            .increment(outcome.unmatched_commercial.len() as u64);
        tracing::info!(
            unmatched_infrastructure = outcome.unmatched_infrastructure.len(),
            unmatched_commercial = outcome.unmatched_commercial.len(),
            "records without counterpart dropped from join"
        );
    }

    outcome
}
