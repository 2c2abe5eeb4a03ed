pub mod aggregator;
pub mod categories;
pub mod types;

pub use aggregator::{aggregate_entities, Aggregation, TermOutcome};
pub use categories::{category_index, entity_category, ENTITY_CATEGORIES};
pub use types::*;

pub const TARGET_ENTITY: &str = "entity";
