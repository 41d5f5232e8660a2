//! costcalc CLI - formula checking tool for cost calculators

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use costcalc_core::{FieldDeclaration, FieldType, Value};
use costcalc_formula::options::{
    DEFAULT_MAX_FORMULA_LENGTH, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_SUGGESTIONS,
};
use costcalc_formula::{
    ErrorKind, Evaluator, FunctionCategory, FunctionRegistry, SuggestOptions, Suggester,
    SuggestionKind, Validator, ValidatorOptions,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "costcalc")]
#[command(
    author,
    version,
    about = "Validate, evaluate and autocomplete cost calculator formulas"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a formula against the declared fields
    Validate {
        /// Formula text, e.g. "ROUND({unitCost} * {quantity}, 2)"
        formula: String,

        /// Declared field as NAME:TYPE (number, text, boolean, date); repeatable
        #[arg(short = 'f', long = "field", value_name = "NAME:TYPE")]
        fields: Vec<FieldDeclaration>,

        /// Warn when the formula is longer than this many characters
        #[arg(long, default_value_t = DEFAULT_MAX_FORMULA_LENGTH)]
        max_length: usize,

        /// Warn when parentheses nest deeper than this
        #[arg(long, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
        max_depth: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a formula against field values
    Eval {
        /// Formula text
        formula: String,

        /// Declared field as NAME:TYPE; used to read string values such as dates
        #[arg(short = 'f', long = "field", value_name = "NAME:TYPE")]
        fields: Vec<FieldDeclaration>,

        /// Field values as a JSON object, e.g. '{"quantity": 3}'
        #[arg(long, conflicts_with = "values_file")]
        values: Option<String>,

        /// File containing the field values as a JSON object
        #[arg(long, value_name = "PATH")]
        values_file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Autocomplete suggestions at a cursor position
    Suggest {
        /// Formula text
        formula: String,

        /// Cursor position as a character offset
        #[arg(short, long)]
        cursor: usize,

        /// Declared field as NAME:TYPE; repeatable
        #[arg(short = 'f', long = "field", value_name = "NAME:TYPE")]
        fields: Vec<FieldDeclaration>,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = DEFAULT_MAX_SUGGESTIONS)]
        limit: usize,
    },

    /// List the built-in functions
    Functions {
        /// Only this category (math, statistical, logical, text, date)
        #[arg(short, long)]
        category: Option<FunctionCategory>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            formula,
            fields,
            max_length,
            max_depth,
            json,
        } => validate(
            &formula,
            &fields,
            ValidatorOptions {
                max_formula_length: max_length,
                max_nesting_depth: max_depth,
            },
            json,
        ),
        Commands::Eval {
            formula,
            fields,
            values,
            values_file,
            json,
        } => {
            let values = read_values(values.as_deref(), values_file.as_deref(), &fields)?;
            eval(&formula, &values, json)
        }
        Commands::Suggest {
            formula,
            cursor,
            fields,
            limit,
        } => suggest(&formula, cursor, &fields, limit),
        Commands::Functions { category } => list_functions(category),
    }
}

fn validate(
    formula: &str,
    fields: &[FieldDeclaration],
    options: ValidatorOptions,
    json: bool,
) -> Result<ExitCode> {
    let validator = Validator::new(FunctionRegistry::builtin(), options);
    let result = validator.validate(formula, fields);

    if json {
        let text = serde_json::to_string_pretty(&result).context("Failed to encode report")?;
        println!("{}", text);
    } else {
        println!("{}", if result.is_valid { "valid" } else { "invalid" });
        for error in &result.errors {
            println!("error[{}]: {}", kind_label(error.kind), error);
        }
        for warning in &result.warnings {
            println!("warning: {}", warning);
        }
        if !result.fields.is_empty() {
            println!("fields: {}", join(&result.fields));
        }
        if !result.functions.is_empty() {
            println!("functions: {}", join(&result.functions));
        }
    }

    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn eval(formula: &str, values: &HashMap<String, Value>, json: bool) -> Result<ExitCode> {
    let result = Evaluator::new(FunctionRegistry::builtin()).evaluate(formula, values);

    match result {
        Ok(value) if json => {
            let text = serde_json::to_string(&value).context("Failed to encode result")?;
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if json => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn suggest(
    formula: &str,
    cursor: usize,
    fields: &[FieldDeclaration],
    limit: usize,
) -> Result<ExitCode> {
    let suggester = Suggester::new(
        FunctionRegistry::builtin(),
        SuggestOptions {
            max_suggestions: limit,
        },
    );

    for suggestion in suggester.suggest(formula, cursor, fields) {
        let kind = match suggestion.kind {
            SuggestionKind::Field => "field",
            SuggestionKind::Function => "function",
        };
        match suggestion.description {
            Some(description) => println!("{}\t{}\t{}", suggestion.value, kind, description),
            None => println!("{}\t{}", suggestion.value, kind),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn list_functions(category: Option<FunctionCategory>) -> Result<ExitCode> {
    let registry = FunctionRegistry::builtin();
    let categories = match category {
        Some(c) => vec![c],
        None => FunctionCategory::ALL.to_vec(),
    };

    for category in categories {
        println!("[{}]", category);
        for spec in registry.by_category(category) {
            println!(
                "  {:<28} {} (arguments: {})",
                spec.syntax,
                spec.description,
                spec.arity_description()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read field values from inline JSON or a file
fn read_values(
    inline: Option<&str>,
    file: Option<&Path>,
    fields: &[FieldDeclaration],
) -> Result<HashMap<String, Value>> {
    let text = match (inline, file) {
        (Some(json), _) => json.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        (None, None) => return Ok(HashMap::new()),
    };

    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).context("Field values must be a JSON object")?;

    object
        .into_iter()
        .map(|(name, raw)| {
            let declaration = fields.iter().find(|f| f.name == name);
            let value = json_to_value(&name, raw, declaration)?;
            Ok((name, value))
        })
        .collect()
}

/// Convert a JSON value, honouring the field's declared type when there is one.
/// Strings bound to non-text fields are parsed, so dates can be given as
/// `"2024-03-31"`.
fn json_to_value(
    name: &str,
    raw: serde_json::Value,
    declaration: Option<&FieldDeclaration>,
) -> Result<Value> {
    use serde_json::Value as Json;

    let declared_type = declaration.map(|d| d.field_type);
    let value = match raw {
        Json::String(s) => match declared_type {
            Some(field_type) if field_type != FieldType::Text => {
                Value::parse_as(field_type, &s)
                    .with_context(|| format!("Invalid value for field '{}'", name))?
            }
            _ => Value::Text(s),
        },
        Json::Number(n) => Value::Number(
            n.as_f64()
                .with_context(|| format!("Field '{}' is not a representable number", name))?,
        ),
        Json::Bool(b) => Value::Boolean(b),
        other => bail!("Unsupported value for field '{}': {}", name, other),
    };

    if let Some(declaration) = declaration {
        if !declaration.accepts(&value) {
            bail!(
                "Field '{}' is declared {} but the value is {}",
                name,
                declaration.field_type,
                value.type_name()
            );
        }
    }

    Ok(value)
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Syntax => "syntax",
        ErrorKind::UnknownField => "unknown-field",
        ErrorKind::UnknownFunction => "unknown-function",
        ErrorKind::Arity => "arity",
    }
}

fn join(items: &std::collections::BTreeSet<String>) -> String {
    items.iter().cloned().collect::<Vec<_>>().join(", ")
}
