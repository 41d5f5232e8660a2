//! Autocomplete suggestions
//!
//! Suggestions depend only on the text before the cursor:
//!
//! - inside an unterminated `{`, field names containing the partial name;
//! - after an identifier prefix, function names starting with it;
//! - inside an unterminated string literal, nothing;
//! - anywhere else, every function followed by every field.
//!
//! Braces and words inside string literals are ignored.
//!
//! Results are capped at [`SuggestOptions::max_suggestions`].

use crate::functions::{FunctionRegistry, FunctionSpec};
use crate::lexer::{tokenize, LexDiagnosticKind};
use crate::options::SuggestOptions;
use costcalc_core::FieldDeclaration;
use lazy_regex::regex_find;

/// What a suggestion inserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SuggestionKind {
    Field,
    Function,
}

/// A single autocomplete candidate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub value: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub description: Option<String>,
}

impl Suggestion {
    fn field(field: &FieldDeclaration) -> Self {
        Self {
            kind: SuggestionKind::Field,
            value: field.name.clone(),
            description: Some(format!("{} field", field.field_type)),
        }
    }

    fn function(spec: &FunctionSpec) -> Self {
        Self {
            kind: SuggestionKind::Function,
            value: spec.name.to_string(),
            description: Some(spec.description.to_string()),
        }
    }
}

/// Produces suggestions from a function registry
#[derive(Debug, Clone)]
pub struct Suggester<'r> {
    registry: &'r FunctionRegistry,
    options: SuggestOptions,
}

impl Default for Suggester<'static> {
    fn default() -> Self {
        Self::new(FunctionRegistry::builtin(), SuggestOptions::default())
    }
}

/// Suggestions for the cursor position with the built-in functions
///
/// `cursor` is a character offset; offsets past the end mean the end.
pub fn suggest(formula: &str, cursor: usize, fields: &[FieldDeclaration]) -> Vec<Suggestion> {
    Suggester::default().suggest(formula, cursor, fields)
}

impl<'r> Suggester<'r> {
    pub fn new(registry: &'r FunctionRegistry, options: SuggestOptions) -> Self {
        Self { registry, options }
    }

    pub fn suggest(
        &self,
        formula: &str,
        cursor: usize,
        fields: &[FieldDeclaration],
    ) -> Vec<Suggestion> {
        let limit = self.options.max_suggestions;
        let Some(before) = structural_prefix(formula, cursor) else {
            log::trace!("cursor at offset {} is inside a string literal", cursor);
            return Vec::new();
        };

        let suggestions: Vec<Suggestion> = if let Some(partial) = open_field(&before) {
            let partial = partial.trim().to_lowercase();
            fields
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&partial))
                .take(limit)
                .map(Suggestion::field)
                .collect()
        } else if let Some(prefix) = regex_find!(r"[A-Za-z_][A-Za-z0-9_]*$", &before) {
            let prefix = prefix.to_ascii_uppercase();
            self.registry
                .iter()
                .filter(|f| f.name.to_ascii_uppercase().starts_with(&prefix))
                .take(limit)
                .map(Suggestion::function)
                .collect()
        } else {
            self.registry
                .iter()
                .map(Suggestion::function)
                .chain(fields.iter().map(Suggestion::field))
                .take(limit)
                .collect()
        };

        log::trace!(
            "{} suggestions at offset {}",
            suggestions.len(),
            before.chars().count()
        );
        suggestions
    }
}

/// Text before the cursor with string literal contents blanked out, or `None`
/// when the cursor sits inside an unterminated literal
fn structural_prefix(formula: &str, cursor: usize) -> Option<String> {
    let before: String = formula.chars().take(cursor).collect();
    let lexed = tokenize(&before);

    if lexed
        .diagnostics
        .iter()
        .any(|d| d.kind == LexDiagnosticKind::UnterminatedString)
    {
        return None;
    }

    let mut masked = vec![' '; lexed.source_len()];
    for (i, c) in lexed.structural_chars() {
        masked[i] = c;
    }
    Some(masked.into_iter().collect())
}

/// Text after the last `{` when no `}` follows it
fn open_field(before: &str) -> Option<&str> {
    let open = before.rfind('{')?;
    match before.rfind('}') {
        Some(close) if close > open => None,
        _ => Some(&before[open + 1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FunctionCategory, Implementation};
    use costcalc_core::FieldType;
    use pretty_assertions::assert_eq;

    fn calculator_fields() -> Vec<FieldDeclaration> {
        vec![
            FieldDeclaration::number("unitCost"),
            FieldDeclaration::number("quantity"),
            FieldDeclaration::new("dueDate", FieldType::Date),
            FieldDeclaration::number("unitWeight"),
        ]
    }

    fn values(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.value.as_str()).collect()
    }

    #[test]
    fn test_field_suggestions_inside_brace() {
        let fields = calculator_fields();
        let result = suggest("{quantity} * {UNIT", 18, &fields);
        assert_eq!(values(&result), vec!["unitCost", "unitWeight"]);
        assert_eq!(result[0].kind, SuggestionKind::Field);
        assert_eq!(result[0].description.as_deref(), Some("number field"));
    }

    #[test]
    fn test_field_suggestions_match_substring() {
        let fields = calculator_fields();
        let result = suggest("{date", 5, &fields);
        assert_eq!(values(&result), vec!["dueDate"]);
        assert_eq!(result[0].description.as_deref(), Some("date field"));
    }

    #[test]
    fn test_empty_brace_lists_all_fields() {
        let fields = calculator_fields();
        assert_eq!(suggest("1 + {", 5, &fields).len(), 4);
    }

    #[test]
    fn test_cursor_inside_closed_field() {
        let fields = calculator_fields();
        let result = suggest("{qu} + 1", 3, &fields);
        assert_eq!(values(&result), vec!["quantity"]);
    }

    #[test]
    fn test_function_prefix() {
        let result = suggest("{quantity} * ro", 15, &[]);
        assert_eq!(values(&result), vec!["ROUND"]);
        assert_eq!(result[0].kind, SuggestionKind::Function);
        assert_eq!(
            result[0].description.as_deref(),
            Some("Rounds half away from zero to the given number of decimal places")
        );

        let result = suggest("M", 1, &[]);
        assert_eq!(values(&result), vec!["MIN", "MAX", "MEDIAN", "MOD", "MONTH"]);
    }

    #[test]
    fn test_no_context_lists_functions_then_fields() {
        let fields = calculator_fields();
        let result = suggest("", 0, &fields);
        assert_eq!(result.len(), 10);
        assert!(result.iter().all(|s| s.kind == SuggestionKind::Function));

        let small = Suggester::new(
            FunctionRegistry::builtin(),
            SuggestOptions {
                max_suggestions: 100,
            },
        );
        let result = small.suggest("1 + ", 4, &fields);
        assert_eq!(result.len(), FunctionRegistry::builtin().len() + fields.len());
        assert_eq!(result.last().map(|s| s.value.as_str()), Some("unitWeight"));
    }

    #[test]
    fn test_never_more_than_cap() {
        let many: Vec<FieldDeclaration> = (0..25)
            .map(|i| FieldDeclaration::number(format!("f{}", i)))
            .collect();
        assert_eq!(suggest("{f", 2, &many).len(), 10);
        assert_eq!(suggest("(", 1, &many).len(), 10);
    }

    #[test]
    fn test_cursor_past_end_clamps() {
        let result = suggest("SQ", 99, &[]);
        assert_eq!(values(&result), vec!["SQRT"]);
    }

    #[test]
    fn test_cursor_is_char_offset() {
        let fields = calculator_fields();
        // "é" is two bytes but one character
        let result = suggest("\"é\" + {qu", 9, &fields);
        assert_eq!(values(&result), vec!["quantity"]);
    }

    #[test]
    fn test_cursor_in_middle_ignores_text_after() {
        let result = suggest("AV + 1", 2, &[]);
        assert_eq!(values(&result), vec!["AVG"]);
    }

    #[test]
    fn test_no_suggestions_inside_string_literal() {
        let fields = calculator_fields();
        assert!(suggest("CONCAT(\"{", 9, &fields).is_empty());
        assert!(suggest("CONCAT(\"ro", 10, &fields).is_empty());
    }

    #[test]
    fn test_closed_string_does_not_open_field() {
        let fields = calculator_fields();
        let result = suggest("CONCAT(\"{\", ro", 14, &fields);
        assert_eq!(values(&result), vec!["ROUND"]);

        let result = suggest("\"{qu\" + {qu", 11, &fields);
        assert_eq!(values(&result), vec!["quantity"]);
    }

    #[test]
    fn test_prefix_matches_lowercase_registration() {
        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionSpec {
            name: "markup",
            category: FunctionCategory::Math,
            min_args: 1,
            max_args: Some(1),
            description: "Adds the house margin",
            syntax: "markup(x)",
            implementation: Implementation::Eager(crate::functions::math::fn_abs),
        });
        let suggester = Suggester::new(&registry, SuggestOptions::default());
        let result = suggester.suggest("{unitCost} * mar", 16, &[]);
        assert_eq!(values(&result), vec!["markup"]);
    }
}
