use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::ParagraphType;
use crate::entity::{category_index, ENTITY_CATEGORIES};
use crate::error::TermError;
use crate::index::Term;

/// A block of columns in a term's feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureGroup {
    TermFrequency,
    FirstOccurrence,
    ParagraphType,
    PartOfSpeech,
    EntityCategory,
}

impl FeatureGroup {
    pub const ALL: [FeatureGroup; 5] = [
        FeatureGroup::TermFrequency,
        FeatureGroup::FirstOccurrence,
        FeatureGroup::ParagraphType,
        FeatureGroup::PartOfSpeech,
        FeatureGroup::EntityCategory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureGroup::TermFrequency => "tf",
            FeatureGroup::FirstOccurrence => "fo",
            FeatureGroup::ParagraphType => "ptype",
            FeatureGroup::PartOfSpeech => "pos",
            FeatureGroup::EntityCategory => "calais-entity",
        }
    }

    pub fn columns(&self) -> Vec<String> {
        let names: Vec<&str> = match self {
            FeatureGroup::TermFrequency => vec!["tf"],
            FeatureGroup::FirstOccurrence => vec!["fo"],
            FeatureGroup::ParagraphType => vec!["h1", "h2", "p", "li", "other_element"],
            FeatureGroup::PartOfSpeech => vec!["nouns", "verbs", "adjectives", "adverbs", "rest"],
            FeatureGroup::EntityCategory => {
                let mut names = vec!["is_entity"];
                names.extend(ENTITY_CATEGORIES.iter().map(|(category, _)| *category));
                names.push("other_entity");
                names
            }
        };
        names.into_iter().map(str::to_string).collect()
    }

    pub fn width(&self) -> usize {
        match self {
            FeatureGroup::TermFrequency | FeatureGroup::FirstOccurrence => 1,
            FeatureGroup::ParagraphType | FeatureGroup::PartOfSpeech => 5,
            FeatureGroup::EntityCategory => ENTITY_CATEGORIES.len() + 2,
        }
    }
}

impl FromStr for FeatureGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tf" => Ok(FeatureGroup::TermFrequency),
            "fo" => Ok(FeatureGroup::FirstOccurrence),
            "ptype" => Ok(FeatureGroup::ParagraphType),
            "pos" => Ok(FeatureGroup::PartOfSpeech),
            "calais-entity" | "entity" => Ok(FeatureGroup::EntityCategory),
            other => Err(TermError::invalid_input(format!(
                "unknown feature group '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps `[0, inf)` onto `[0, 1)`.
pub fn scaled_sigmoid(x: f64) -> f64 {
    let decay = (-x).exp();
    (1.0 - decay) / (1.0 + decay)
}

fn presence(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}

/// Turns terms into classifier input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuilder {
    groups: Vec<FeatureGroup>,
    normalize: bool,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(FeatureGroup::ALL.to_vec(), true)
    }
}

impl FeatureBuilder {
    /// Repeated groups are ignored; the first position wins.
    pub fn new(groups: Vec<FeatureGroup>, normalize: bool) -> Self {
        let mut distinct = Vec::with_capacity(groups.len());
        for group in groups {
            if !distinct.contains(&group) {
                distinct.push(group);
            }
        }
        Self {
            groups: distinct,
            normalize,
        }
    }

    pub fn groups(&self) -> &[FeatureGroup] {
        &self.groups
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn width(&self) -> usize {
        self.groups.iter().map(FeatureGroup::width).sum()
    }

    pub fn columns(&self) -> Vec<String> {
        self.groups.iter().flat_map(FeatureGroup::columns).collect()
    }

    pub fn build(&self, term: &Term) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        for group in &self.groups {
            match group {
                FeatureGroup::TermFrequency => {
                    let tf = term.term_frequency as f64;
                    row.push(if self.normalize {
                        scaled_sigmoid((tf - 1.0).max(0.0))
                    } else {
                        tf
                    });
                }
                // never located counts as the end of the article
                FeatureGroup::FirstOccurrence => row.push(term.first_occurrence.unwrap_or(1.0)),
                FeatureGroup::ParagraphType => {
                    let elements = term.element_types();
                    let has = |wanted: ParagraphType| elements.contains(&wanted);
                    row.push(presence(has(ParagraphType::H1)));
                    row.push(presence(has(ParagraphType::H2)));
                    row.push(presence(has(ParagraphType::P)));
                    row.push(presence(has(ParagraphType::LI)));
                    row.push(presence(
                        elements
                            .iter()
                            .any(|e| matches!(e, ParagraphType::Other(_))),
                    ));
                }
                FeatureGroup::PartOfSpeech => {
                    row.extend(term.pos.counts().iter().map(|count| presence(*count > 0)));
                }
                FeatureGroup::EntityCategory => {
                    let mut vector = vec![0.0; group.width()];
                    if let Some(entity_type) = &term.entity_type {
                        vector[0] = 1.0;
                        match category_index(entity_type) {
                            Some(index) => vector[index + 1] = 1.0,
                            None => vector[ENTITY_CATEGORIES.len() + 1] = 1.0,
                        }
                    }
                    row.extend(vector);
                }
            }
        }
        row
    }

    pub fn build_all(&self, terms: &[Term]) -> Vec<Vec<f64>> {
        terms.iter().map(|term| self.build(term)).collect()
    }
}
