pub mod fuzzy;
pub mod matcher;
pub mod stats;

pub use fuzzy::{FuzzyIndex, FUZZY_MATCH_THRESHOLD};
pub use matcher::{MatchKind, TermMatch, TermMatcher, GENERIC_KEYWORD_TYPES};
pub use stats::{Distribution, MatchStats, PosStats};

pub const TARGET_MATCH: &str = "match";
