//! Construction-time errors.
//!
//! Everything here is fatal: a pipeline whose rule set or fixer table fails to build
//! never processes a single unit.

use fixflow_types::RuleCategory;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two enabled rules of one category claim the same order key.
    #[error(
        "duplicate order key {order} in {category} rules: `{rule_id}` collides with `{existing}`"
    )]
    DuplicateOrderKey {
        category: RuleCategory,
        order: u32,
        rule_id: String,
        existing: String,
    },

    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    /// Rule ids are unique across all categories (compared case-insensitively).
    #[error("rule id `{0}` is already registered")]
    DuplicateRuleId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("diagnostic `{diagnostic_id}` is claimed by fixers `{first}` and `{second}`")]
    DuplicateFixerMapping {
        diagnostic_id: String,
        first: String,
        second: String,
    },
}
