pub mod config;
pub mod document;
pub mod entity;
pub mod environment;
pub mod error;
pub mod extraction;
pub mod index;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod storage;
pub mod text;
pub mod training;

pub use config::ExtractorConfig;
pub use document::{Article, ImageKeyword, LeadImage, Paragraph, ParagraphType};
pub use error::TermError;
pub use index::{ArticleIndexer, KeywordIndexer, KeywordRecord, Term, TermIndex};
pub use text::TextTools;
