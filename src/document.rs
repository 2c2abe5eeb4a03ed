use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityTree;

/// Structural tag of the paragraph a term occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParagraphType {
    H1,
    H2,
    P,
    LI,
    Other(String),
}

impl fmt::Display for ParagraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParagraphType::H1 => write!(f, "H1"),
            ParagraphType::H2 => write!(f, "H2"),
            ParagraphType::P => write!(f, "P"),
            ParagraphType::LI => write!(f, "LI"),
            ParagraphType::Other(tag) => write!(f, "{}", tag),
        }
    }
}

impl From<&str> for ParagraphType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "H1" => ParagraphType::H1,
            "H2" => ParagraphType::H2,
            "P" => ParagraphType::P,
            "LI" => ParagraphType::LI,
            _ => ParagraphType::Other(s.to_string()),
        }
    }
}

impl From<String> for ParagraphType {
    fn from(s: String) -> Self {
        ParagraphType::from(s.as_str())
    }
}

impl From<ParagraphType> for String {
    fn from(p: ParagraphType) -> Self {
        p.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(rename = "type")]
    pub paragraph_type: ParagraphType,
    pub content: String,
}

impl Paragraph {
    pub fn new(paragraph_type: ParagraphType, content: &str) -> Self {
        Paragraph {
            paragraph_type,
            content: content.to_string(),
        }
    }
}

/// A keyword attached to a stock image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageKeyword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_id: Option<i64>,
    pub text: String,
    #[serde(rename = "type")]
    pub keyword_type: String,
    #[serde(default)]
    pub relevance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadImage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub keywords: Vec<ImageKeyword>,
}

/// A news article as delivered by the document store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_image: Option<LeadImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityTree>,
}

impl Article {
    pub fn new(headline: &str, paragraphs: Vec<Paragraph>) -> Self {
        Article {
            headline: headline.to_string(),
            paragraphs,
            ..Default::default()
        }
    }

    /// Paragraphs with the headline injected as a leading `H1`.
    pub fn paragraphs_with_headline(&self) -> Vec<Paragraph> {
        let mut all = Vec::with_capacity(self.paragraphs.len() + 1);
        if !self.headline.trim().is_empty() {
            all.push(Paragraph::new(ParagraphType::H1, &self.headline));
        }
        all.extend(self.paragraphs.iter().cloned());
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_type_parsing() {
        assert_eq!(ParagraphType::from("h1"), ParagraphType::H1);
        assert_eq!(ParagraphType::from("LI"), ParagraphType::LI);
        assert_eq!(
            ParagraphType::from("BLOCKQUOTE"),
            ParagraphType::Other("BLOCKQUOTE".to_string())
        );
        assert_eq!(ParagraphType::Other("TD".to_string()).to_string(), "TD");
    }

    #[test]
    fn test_article_json_shape() {
        let json = r#"{
            "headline": "Storm hits coast",
            "paragraphs": [{"type": "P", "content": "Heavy rain fell."}],
            "lead_image": {"title": "Storm", "caption": "Waves", "keywords": [
                {"keyword_id": 7, "text": "storm", "type": "Concept", "relevance": 0.9}
            ]}
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.paragraphs[0].paragraph_type, ParagraphType::P);
        let image = article.lead_image.as_ref().unwrap();
        assert_eq!(image.keywords[0].keyword_type, "Concept");

        let all = article.paragraphs_with_headline();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].paragraph_type, ParagraphType::H1);
        assert_eq!(all[0].content, "Storm hits coast");
    }
}
