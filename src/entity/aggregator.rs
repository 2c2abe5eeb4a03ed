use anyhow::Result;
use tracing::{debug, info};

use super::types::{Entity, EntityTree};
use super::TARGET_ENTITY;
use crate::index::{Term, TermIndex};
use crate::text::{PosLookup, TextTools};

/// What happened to one canonical term during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOutcome {
    /// Merged into at least one entity.
    Merged,
    /// Overlapped an entity instance without being an instance of any entity.
    Consumed,
    /// Kept as a standalone term.
    Remaining,
}

/// Result of reconciling article terms with entity annotations.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Entity records followed by the remaining terms, keyed by stem.
    pub terms: TermIndex,
    pub entities: Vec<Entity>,
    pub remaining_terms: Vec<Term>,
    /// Outcome of every canonical term, in canonical order.
    pub outcomes: Vec<(String, TermOutcome)>,
}

impl Aggregation {
    pub fn outcome_of(&self, stemmed_term: &str) -> Option<TermOutcome> {
        self.outcomes
            .iter()
            .find(|(stem, _)| stem == stemmed_term)
            .map(|(_, outcome)| *outcome)
    }
}

/// Merges canonical terms into the entities they refer to.
///
/// A term is merged into every entity it is an instance of. A term that only
/// overlaps an entity is dropped from the remainder but merged nowhere.
pub async fn aggregate_entities<P: PosLookup>(
    canonical: &TermIndex,
    tree: &EntityTree,
    full_text: &str,
    tools: &TextTools,
    pos_lookup: &P,
) -> Result<Aggregation> {
    let mut entities: Vec<Entity> = tree
        .flatten()
        .into_iter()
        .map(|annotation| Entity::from_annotation(annotation, tools))
        .collect();

    let mut remaining_terms = Vec::new();
    let mut outcomes = Vec::with_capacity(canonical.len());

    for term in canonical.iter() {
        let mut outcome = TermOutcome::Remaining;
        for entity in entities.iter_mut() {
            if entity.is_instance(term, tools) {
                entity.merge(term);
                outcome = TermOutcome::Merged;
            } else if entity.overlaps_with(term) && outcome == TermOutcome::Remaining {
                outcome = TermOutcome::Consumed;
            }
        }

        debug!(
            target: TARGET_ENTITY,
            "Term '{}' aggregated as {:?}", term.stemmed_term, outcome
        );
        if outcome == TermOutcome::Remaining {
            remaining_terms.push(term.clone());
        }
        outcomes.push((term.stemmed_term.clone(), outcome));
    }

    let mut terms = TermIndex::new();
    for entity in &entities {
        let record = entity.to_term(full_text, tools, pos_lookup).await?;
        if !terms.insert(record) {
            debug!(
                target: TARGET_ENTITY,
                "Entity '{}' shares its stem with an earlier entity; keeping the first", entity.name
            );
        }
    }
    for term in &remaining_terms {
        terms.insert(term.clone());
    }

    info!(
        target: TARGET_ENTITY,
        "Aggregated {} terms against {} entities: {} remaining",
        canonical.len(),
        entities.len(),
        remaining_terms.len()
    );

    Ok(Aggregation {
        terms,
        entities,
        remaining_terms,
        outcomes,
    })
}
