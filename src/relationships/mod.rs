//! Parent/child relationship evaluation.
//!
//! - [`RelationshipEvaluator`] computes direct edges from structural parents and parent annotations
//! - [`ChildLookup`] the resulting read-only map, with descendant walks

mod evaluator;
mod lookup;

pub use evaluator::RelationshipEvaluator;
pub use lookup::ChildLookup;
