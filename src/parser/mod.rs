//! Parsing the textual signature syntax.
//!
//! The syntax is a comma-separated parameter list, checked against
//! `grammar.pest`:
//!
//! ```text
//! count: int = 3, verbose: bool = false, ...files: path
//! ```
//!
//! Parsing produces the same [`Signature`] descriptors the constructors in
//! [`crate::signature`] assemble by hand; everything downstream (the
//! compiler, the invocation mapper) is agnostic about which way a signature
//! was written. The parser checks shape, plus one value rule: integer
//! literals must fit `i64`. Which defaults are allowed for which annotation
//! belongs to the compiler.

pub mod error;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::signature::{Annotation, Param, Signature};
use crate::value::Value;

pub use error::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SignatureParser;

/// Parse the signature syntax into a [`Signature`].
///
/// # Errors
///
/// Returns a [`ParseError`] with position, source context, and hint when
/// the input does not match the grammar.
pub fn parse_signature(input: &str) -> Result<Signature, ParseError> {
    let pairs = SignatureParser::parse(Rule::signature, input)
        .map_err(|e| ParseError::from_pest(&e, input))?;

    let mut params = Vec::new();
    for pair in pairs {
        if pair.as_rule() == Rule::signature {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::param_list {
                    for param_pair in inner.into_inner() {
                        if param_pair.as_rule() == Rule::param {
                            if let Some(param) = parse_param(param_pair)? {
                                params.push(param);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(Signature::new(params))
}

fn parse_param(pair: Pair<Rule>) -> Result<Option<Param>, ParseError> {
    let Some(inner) = pair.into_inner().next() else {
        return Ok(None);
    };
    match inner.as_rule() {
        Rule::rest_param => {
            let mut parts = inner.into_inner();
            let (Some(name), Some(annotation)) = (parts.next(), parts.next()) else {
                return Ok(None);
            };
            let annotation = parse_annotation(annotation)?;
            Ok(Some(Param::variadic(name.as_str().to_string(), annotation)))
        }
        Rule::regular_param => {
            let mut parts = inner.into_inner();
            let (Some(name), Some(annotation)) = (parts.next(), parts.next()) else {
                return Ok(None);
            };
            let param = Param::plain(name.as_str().to_string(), parse_annotation(annotation)?);
            let param = match parts.next() {
                Some(default) => match parse_default(default)? {
                    Some(value) => param.with_default(value),
                    None => param,
                },
                None => param,
            };
            Ok(Some(param))
        }
        _ => Ok(None),
    }
}

fn parse_annotation(pair: Pair<Rule>) -> Result<Annotation, ParseError> {
    let Some(expr) = pair.into_inner().next() else {
        return Ok(Annotation::Other(String::new()));
    };
    let Some(inner) = expr.into_inner().next() else {
        return Ok(Annotation::Other(String::new()));
    };
    Ok(match inner.as_rule() {
        Rule::literal_set => {
            let values = inner
                .into_inner()
                .map(parse_literal_value)
                .collect::<Result<_, _>>()?;
            Annotation::Literal(values)
        }
        Rule::type_name => annotation_from_name(inner.as_str()),
        _ => Annotation::Other(inner.as_str().to_string()),
    })
}

fn annotation_from_name(name: &str) -> Annotation {
    match name {
        "bool" => Annotation::Bool,
        "bool?" => Annotation::OptBool,
        "int" => Annotation::Int,
        "int?" => Annotation::OptInt,
        "float" => Annotation::Float,
        "float?" => Annotation::OptFloat,
        "str" => Annotation::Str,
        "str?" => Annotation::OptStr,
        "path" => Annotation::Path,
        other => Annotation::Other(other.to_string()),
    }
}

fn parse_literal_value(pair: Pair<Rule>) -> Result<Value, ParseError> {
    let Some(inner) = pair.into_inner().next() else {
        return Ok(Value::Str(String::new()));
    };
    Ok(match inner.as_rule() {
        Rule::int_literal => int_value(&inner)?,
        Rule::quoted_string => Value::Str(inner.as_str().trim_matches('"').to_string()),
        _ => Value::Str(inner.as_str().to_string()),
    })
}

fn parse_default(pair: Pair<Rule>) -> Result<Option<Value>, ParseError> {
    let Some(value) = pair.into_inner().next() else {
        return Ok(None);
    };
    let Some(inner) = value.into_inner().next() else {
        return Ok(None);
    };
    Ok(Some(match inner.as_rule() {
        Rule::keyword_none => Value::Null,
        Rule::bool_literal => Value::Bool(inner.as_str() == "true"),
        Rule::float_literal => inner.as_str().parse().map_or(Value::Null, Value::Float),
        Rule::int_literal => int_value(&inner)?,
        Rule::quoted_string => Value::Str(inner.as_str().trim_matches('"').to_string()),
        _ => Value::Str(inner.as_str().to_string()),
    }))
}

/// Integer literals are signed 64-bit; anything outside that range is a
/// parse error.
fn int_value(pair: &Pair<Rule>) -> Result<Value, ParseError> {
    let text = pair.as_str();
    text.parse().map(Value::Int).map_err(|_| {
        ParseError::at_span(
            pair.as_span(),
            format!("integer `{text}` is out of range"),
            Some("Integers must fit a signed 64-bit value.".to_string()),
        )
    })
}
