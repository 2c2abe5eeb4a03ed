use anyhow::Result;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

use super::TARGET_ENTITY;
use crate::document::ParagraphType;
use crate::index::article::stemmed_pos;
use crate::index::Term;
use crate::text::{find_overlap, is_stopword, PosLookup, TextTools};

/// One mention of an entity in the article text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInstance {
    pub exact: String,
    pub offset: usize,
}

/// A named-entity annotation as delivered by the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(rename = "_type", alias = "type")]
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub instances: Vec<EntityInstance>,
}

/// Annotations grouped under arbitrary category keys, at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityTree {
    List(Vec<EntityAnnotation>),
    Group(EntityGroups),
}

/// Category groups in the order the annotation feed listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGroups(pub Vec<(String, EntityTree)>);

impl EntityGroups {
    pub fn trees(&self) -> impl DoubleEndedIterator<Item = &EntityTree> {
        self.0.iter().map(|(_, tree)| tree)
    }
}

impl Serialize for EntityGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, tree) in &self.0 {
            map.serialize_entry(key, tree)?;
        }
        map.end()
    }
}

struct EntityGroupsVisitor;

impl<'de> Visitor<'de> for EntityGroupsVisitor {
    type Value = EntityGroups;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of entity groups")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut groups = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, tree)) = access.next_entry::<String, EntityTree>()? {
            groups.push((key, tree));
        }
        Ok(EntityGroups(groups))
    }
}

impl<'de> Deserialize<'de> for EntityGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntityGroupsVisitor)
    }
}

impl Default for EntityTree {
    fn default() -> Self {
        EntityTree::List(Vec::new())
    }
}

impl EntityTree {
    /// All annotations, regardless of grouping.
    pub fn flatten(&self) -> Vec<&EntityAnnotation> {
        let mut flat = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                EntityTree::List(annotations) => flat.extend(annotations.iter()),
                EntityTree::Group(groups) => stack.extend(groups.trees().rev()),
            }
        }
        flat
    }
}

/// Paragraph-type buckets an entity was seen in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementFlags {
    pub h1: bool,
    pub h2: bool,
    pub p: bool,
    pub li: bool,
    pub other: bool,
}

impl ElementFlags {
    pub fn set(&mut self, element: &ParagraphType) {
        match element {
            ParagraphType::H1 => self.h1 = true,
            ParagraphType::H2 => self.h2 = true,
            ParagraphType::P => self.p = true,
            ParagraphType::LI => self.li = true,
            ParagraphType::Other(_) => self.other = true,
        }
    }

    pub fn to_list(self) -> Vec<ParagraphType> {
        [
            (self.h1, ParagraphType::H1),
            (self.h2, ParagraphType::H2),
            (self.p, ParagraphType::P),
            (self.li, ParagraphType::LI),
            (self.other, ParagraphType::Other("OTHER".to_string())),
        ]
        .into_iter()
        .filter_map(|(set, element)| set.then_some(element))
        .collect()
    }
}

/// An annotated entity collecting the article terms that refer to it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub entity_type: String,
    pub name: String,
    pub exact_instances: Vec<String>,
    combined_instances: Vec<String>,
    pub min_offset: Option<usize>,
    pub frequency: usize,
    pub containing_elements: ElementFlags,
    pub merged_terms: Vec<Term>,
}

impl Entity {
    pub fn from_annotation(annotation: &EntityAnnotation, tools: &TextTools) -> Self {
        let mut exact_instances: Vec<String> = Vec::new();
        for instance in &annotation.instances {
            if !is_stopword(&instance.exact) && !exact_instances.contains(&instance.exact) {
                exact_instances.push(instance.exact.clone());
            }
        }

        let mut combined_instances = exact_instances.clone();
        combined_instances.extend(exact_instances.iter().map(|exact| tools.stem_text(exact)));
        combined_instances.push(annotation.name.clone());
        combined_instances.push(tools.stem_text(&annotation.name));

        Entity {
            entity_type: annotation.entity_type.clone(),
            name: annotation.name.clone(),
            exact_instances,
            combined_instances,
            min_offset: annotation.instances.iter().map(|i| i.offset).min(),
            frequency: annotation.instances.len(),
            containing_elements: ElementFlags::default(),
            merged_terms: Vec::new(),
        }
    }

    /// Exact instances, their stems, the name and its stem.
    pub fn combined_instances(&self) -> &[String] {
        &self.combined_instances
    }

    /// True when one of the term's forms equals or is contained in an instance.
    ///
    /// Terms with any stopword among their forms never qualify.
    pub fn is_instance(&self, term: &Term, tools: &TextTools) -> bool {
        let mut candidates: Vec<String> = Vec::with_capacity(term.original_terms.len() * 2 + 1);
        candidates.push(term.stemmed_term.clone());
        candidates.extend(term.original_terms.iter().cloned());
        candidates.extend(term.original_terms.iter().map(|t| tools.stem_text(t)));

        if candidates.iter().any(|candidate| is_stopword(candidate)) {
            return false;
        }

        candidates
            .iter()
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| {
                self.combined_instances
                    .iter()
                    .any(|instance| instance == candidate || instance.contains(candidate.as_str()))
            })
    }

    /// True when one of the term's forms shares leading or trailing tokens with an instance.
    pub fn overlaps_with(&self, term: &Term) -> bool {
        term.original_terms
            .iter()
            .chain(std::iter::once(&term.stemmed_term))
            .any(|candidate| {
                self.combined_instances
                    .iter()
                    .any(|instance| !find_overlap(instance, candidate).is_empty())
            })
    }

    pub fn merge(&mut self, term: &Term) {
        for element in &term.containing_elements {
            self.containing_elements.set(element);
        }
        self.merged_terms.push(term.clone());
    }

    /// The term record standing in for this entity in the aggregated set.
    pub async fn to_term<P: PosLookup>(
        &self,
        full_text: &str,
        tools: &TextTools,
        pos_lookup: &P,
    ) -> Result<Term> {
        let text_length = full_text.chars().count();
        let first_occurrence = match self.min_offset {
            Some(offset) if text_length > 0 && offset <= text_length => {
                Some(offset as f64 / text_length as f64)
            }
            offset => {
                warn!(
                    target: TARGET_ENTITY,
                    "Entity '{}' has no usable offset ({:?} in {} chars)", self.name, offset, text_length
                );
                None
            }
        };

        let mut original_terms = self.exact_instances.clone();
        if !original_terms.contains(&self.name) {
            original_terms.push(self.name.clone());
        }

        let pos = pos_lookup
            .pos_of(&self.name)
            .await
            .map_err(|err| crate::error::TermError::lookup(&self.name, err.to_string()))?;

        Ok(Term {
            stemmed_term: tools.stem_text(&self.name),
            original_terms,
            containing_elements: self.containing_elements.to_list(),
            term_frequency: self.frequency,
            first_occurrence,
            pos: stemmed_pos(&pos, tools),
            is_keyword: None,
            entity_type: Some(self.entity_type.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::LexiconPosLookup;

    fn obama() -> EntityAnnotation {
        EntityAnnotation {
            entity_type: "Person".to_string(),
            name: "Barack Obama".to_string(),
            instances: vec![
                EntityInstance { exact: "Barack Obama".to_string(), offset: 12 },
                EntityInstance { exact: "Obama".to_string(), offset: 40 },
                EntityInstance { exact: "he".to_string(), offset: 60 },
                EntityInstance { exact: "Obama".to_string(), offset: 80 },
            ],
        }
    }

    fn term(stem: &str, originals: &[&str], elements: &[ParagraphType]) -> Term {
        let mut term = Term::new(stem);
        term.original_terms = originals.iter().map(|s| s.to_string()).collect();
        term.containing_elements = elements.to_vec();
        term.term_frequency = elements.len();
        term
    }

    #[test]
    fn test_tree_flattens_nested_groups() {
        let json = r#"{
            "Person": [{"_type": "Person", "name": "Barack Obama", "instances": []}],
            "Places": {
                "City": [{"_type": "City", "name": "Chicago", "instances": [{"exact": "Chicago", "offset": 3}]}],
                "Country": [{"type": "Country", "name": "Kenya"}]
            }
        }"#;
        let tree: EntityTree = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = tree.flatten().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Barack Obama", "Chicago", "Kenya"]);

        let list: EntityTree = serde_json::from_str(r#"[{"_type": "City", "name": "Paris"}]"#).unwrap();
        assert_eq!(list.flatten().len(), 1);
    }

    #[test]
    fn test_tree_keeps_feed_group_order() {
        let json = r#"{
            "Zone": [{"_type": "City", "name": "Zurich"}],
            "Mixed": {
                "Persons": [{"_type": "Person", "name": "Obama"}],
                "Countries": [{"_type": "Country", "name": "Kenya"}]
            },
            "Area": [{"_type": "City", "name": "Aachen"}]
        }"#;
        let tree: EntityTree = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = tree.flatten().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zurich", "Obama", "Kenya", "Aachen"]);

        let reparsed: EntityTree = serde_json::from_str(&serde_json::to_string(&tree).unwrap()).unwrap();
        assert_eq!(reparsed, tree);
        match reparsed {
            EntityTree::Group(groups) => {
                let keys: Vec<&str> = groups.0.iter().map(|(key, _)| key.as_str()).collect();
                assert_eq!(keys, vec!["Zone", "Mixed", "Area"]);
            }
            EntityTree::List(_) => panic!("expected grouped annotations"),
        }
    }

    #[test]
    fn test_entity_from_annotation() {
        let entity = Entity::from_annotation(&obama(), &TextTools::default());
        assert_eq!(entity.exact_instances, vec!["Barack Obama", "Obama"]);
        assert_eq!(entity.min_offset, Some(12));
        assert_eq!(entity.frequency, 4);
        assert!(entity
            .combined_instances()
            .contains(&"barack obama".to_string()));
    }

    #[test]
    fn test_is_instance() {
        let tools = TextTools::default();
        let entity = Entity::from_annotation(&obama(), &tools);
        assert!(entity.is_instance(&term("obama", &["Obama"], &[]), &tools));
        assert!(entity.is_instance(&term("barack obama", &["Barack Obama"], &[]), &tools));
        assert!(!entity.is_instance(&term("presid", &["President"], &[]), &tools));
        // a stopword among the forms disqualifies the term
        assert!(!entity.is_instance(&term("the", &["the"], &[]), &tools));
    }

    #[test]
    fn test_overlaps_with() {
        let tools = TextTools::default();
        let entity = Entity::from_annotation(&obama(), &tools);
        assert!(entity.overlaps_with(&term(
            "obama administr",
            &["Obama administration"],
            &[]
        )));
        assert!(!entity.overlaps_with(&term("chicago", &["Chicago"], &[])));
    }

    #[tokio::test]
    async fn test_merge_and_materialise() {
        let tools = TextTools::default();
        let mut entity = Entity::from_annotation(&obama(), &tools);
        entity.merge(&term("obama", &["Obama"], &[ParagraphType::H1, ParagraphType::P]));
        entity.merge(&term(
            "barack obama",
            &["Barack Obama"],
            &[ParagraphType::Other("BLOCKQUOTE".to_string())],
        ));
        assert_eq!(entity.merged_terms.len(), 2);

        let record = entity
            .to_term(&"x".repeat(120), &tools, &LexiconPosLookup::new())
            .await
            .unwrap();
        assert_eq!(record.stemmed_term, "barack obama");
        assert_eq!(record.first_occurrence, Some(0.1));
        assert_eq!(record.term_frequency, 4);
        assert_eq!(record.entity_type.as_deref(), Some("Person"));
        assert_eq!(record.original_terms, vec!["Barack Obama", "Obama"]);
        assert_eq!(
            record.containing_elements,
            vec![
                ParagraphType::H1,
                ParagraphType::P,
                ParagraphType::Other("OTHER".to_string())
            ]
        );
        assert_eq!(record.pos.rest, vec!["barack", "obama"]);
    }

    #[tokio::test]
    async fn test_entity_without_instances_has_no_first_occurrence() {
        let tools = TextTools::default();
        let annotation = EntityAnnotation {
            entity_type: "City".to_string(),
            name: "Paris".to_string(),
            instances: Vec::new(),
        };
        let record = Entity::from_annotation(&annotation, &tools)
            .to_term("Paris", &tools, &LexiconPosLookup::new())
            .await
            .unwrap();
        assert_eq!(record.first_occurrence, None);
        assert_eq!(record.term_frequency, 0);
    }
}
