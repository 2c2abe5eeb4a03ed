pub mod article;
pub mod keywords;
pub mod types;

pub use article::{canonicalize, ArticleIndexer};
pub use keywords::{KeywordIndexer, KeywordRecord, CAPTION_KEYWORD_TYPE};
pub use types::{RawTerm, Term, TermIndex};

pub const TARGET_INDEX: &str = "index";
