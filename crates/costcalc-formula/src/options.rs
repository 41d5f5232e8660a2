//! Tunable thresholds for validation and autocomplete

/// Default formula length above which validation warns
pub const DEFAULT_MAX_FORMULA_LENGTH: usize = 500;

/// Default parenthesis nesting depth above which validation warns
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 5;

/// Default cap on the number of autocomplete suggestions
pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

/// Options for formula validation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ValidatorOptions {
    /// Formulas longer than this many characters get a decomposition warning (default: 500)
    pub max_formula_length: usize,
    /// Parenthesis nesting deeper than this gets a simplification warning (default: 5)
    pub max_nesting_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            max_formula_length: DEFAULT_MAX_FORMULA_LENGTH,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Options for the autocomplete engine
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SuggestOptions {
    /// Maximum number of suggestions returned (default: 10)
    pub max_suggestions: usize,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}
