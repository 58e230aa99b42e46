//! Compiling a [`Signature`] into a clap command.
//!
//! Each parameter maps onto command-line arguments through a closed dispatch
//! table over its kind, annotation, and default:
//!
//! * `bool = false` becomes an affirmative flag (`-v/--verbose`), `bool =
//!   true` a negative one (`-V/--no-verbose`).
//! * `bool? = none` becomes a flag pair where the last occurrence wins;
//!   with a concrete default it degrades to the plain `bool` mapping.
//! * `int`/`float`/`str` without a default become required typed
//!   positionals; with a matching default they become value flags.
//! * `int?`/`float?`/`str?` always become value flags, defaulted only when
//!   the descriptor says so.
//! * `{a|b|c}` restricts a positional (or, with a default, a flag) to the
//!   listed constants.
//! * `...rest: path` (or `str`) becomes a trailing variadic positional.
//!
//! Anything else is refused with a typed [`CompileError`] rather than built
//! approximately.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command, value_parser};
use thiserror::Error;
use tracing::debug;

use crate::options::{OptionError, OptionPair, OptionRegistry, Polarity};
use crate::signature::{Annotation, Param, ParamKind, Signature};
use crate::value::Value;

/// Why a single parameter has no command-line mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Unsupported {
    /// The default value matches no rule for the parameter's annotation.
    Default(Option<Value>),
    /// The annotation is outside the supported set for the parameter's kind.
    Annotation(Annotation),
    /// Keyword-only and var-keyword calling conventions are not compiled.
    Kind(ParamKind),
    /// Empty literal set, or literal values of mixed or non-constant type.
    Literal,
    /// Two parameters share a name.
    DuplicateParam(String),
    /// A parameter is named like the negative flag of an optional boolean.
    NegativeClash { param: String, positive: String },
    /// A parameter was declared after the variadic one.
    VariadicNotLast(String),
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::Default(Some(value)) => write!(f, "unsupported default `{value}`"),
            Unsupported::Default(None) => write!(f, "a default is required but none was given"),
            Unsupported::Annotation(annotation) => {
                write!(f, "unsupported annotation `{annotation}`")
            }
            Unsupported::Kind(kind) => write!(f, "unsupported parameter kind ({kind})"),
            Unsupported::Literal => write!(f, "unsupported literal set"),
            Unsupported::DuplicateParam(name) => write!(f, "duplicate parameter `{name}`"),
            Unsupported::NegativeClash { param, positive } => {
                write!(f, "parameter `{param}` collides with the negative flag of `{positive}`")
            }
            Unsupported::VariadicNotLast(name) => {
                write!(f, "parameter declared after the variadic `...{name}`")
            }
        }
    }
}

impl std::error::Error for Unsupported {}

/// Signature compilation failures.
#[derive(Debug, PartialEq, Error)]
pub enum CompileError {
    /// A parameter shape the compiler refuses. Carries the whole signature
    /// so frontends can show one coherent diagnostic.
    #[error("unsupported signature `{signature}`")]
    UnsupportedSignature {
        signature: Signature,
        #[source]
        reason: Unsupported,
    },
    /// Short/long option allocation failed.
    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Per-parameter failure, aggregated to [`CompileError`] at the signature
/// level.
enum ParamError {
    Unsupported(Unsupported),
    Option(OptionError),
}

impl From<Unsupported> for ParamError {
    fn from(reason: Unsupported) -> Self {
        ParamError::Unsupported(reason)
    }
}

impl From<OptionError> for ParamError {
    fn from(error: OptionError) -> Self {
        ParamError::Option(error)
    }
}

/// Argument id of the negative half of an optional-boolean flag pair.
pub(crate) fn negate_id(name: &str) -> String {
    format!("no_{name}")
}

/// Compile `signature` onto `command`, adding one argument per parameter
/// (two for optional-boolean flag pairs).
///
/// The same descriptor always compiles to the same parser: option letters
/// come from a deterministic scan of each parameter name, never from what
/// happens to be free in some global state.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedSignature`] when a parameter's kind,
/// annotation, and default have no mapping, and [`CompileError::Option`]
/// when option allocation fails.
pub fn build_parser(command: Command, signature: &Signature) -> Result<Command, CompileError> {
    let mut builder = ParserBuilder::new();
    for param in &signature.params {
        builder.add_param(param).map_err(|e| match e {
            ParamError::Unsupported(reason) => CompileError::UnsupportedSignature {
                signature: signature.clone(),
                reason,
            },
            ParamError::Option(error) => CompileError::Option(error),
        })?;
    }
    debug!(signature = %signature, args = builder.args.len(), "compiled signature");
    let command = command.allow_negative_numbers(true);
    Ok(builder.args.into_iter().fold(command, |cmd, arg| cmd.arg(arg)))
}

struct ParserBuilder {
    options: OptionRegistry,
    args: Vec<Arg>,
    seen: HashSet<String>,
    /// Ids synthesized for the negative halves of `bool?` pairs. Positionals
    /// bypass the option registry, so id collisions are tracked here.
    negatives: HashSet<String>,
    /// Name of the variadic parameter once one has been added.
    rest: Option<String>,
}

impl ParserBuilder {
    fn new() -> Self {
        ParserBuilder {
            options: OptionRegistry::new(),
            args: Vec::new(),
            seen: HashSet::new(),
            negatives: HashSet::new(),
            rest: None,
        }
    }

    fn add_param(&mut self, param: &Param) -> Result<(), ParamError> {
        if let Some(rest) = &self.rest {
            return Err(Unsupported::VariadicNotLast(rest.clone()).into());
        }
        if !self.seen.insert(param.name.clone()) {
            return Err(Unsupported::DuplicateParam(param.name.clone()).into());
        }
        if self.negatives.contains(&param.name) {
            // Synthesized ids are always `no_` + the positive name.
            let positive = param.name.strip_prefix("no_").unwrap_or(&param.name);
            return Err(Unsupported::NegativeClash {
                param: param.name.clone(),
                positive: positive.to_string(),
            }
            .into());
        }
        match param.kind {
            ParamKind::Plain => self.plain(param),
            ParamKind::Variadic => {
                self.rest = Some(param.name.clone());
                self.variadic(param)
            }
            kind @ (ParamKind::KeywordOnly | ParamKind::VarKeyword) => {
                Err(Unsupported::Kind(kind).into())
            }
        }
    }

    fn plain(&mut self, param: &Param) -> Result<(), ParamError> {
        match &param.annotation {
            Annotation::Bool => self.plain_bool(param),
            Annotation::OptBool => self.plain_opt_bool(param),
            Annotation::Int | Annotation::Float | Annotation::Str => self.plain_value(param),
            Annotation::OptInt | Annotation::OptFloat | Annotation::OptStr => {
                self.plain_opt_value(param)
            }
            Annotation::Literal(values) => self.plain_literal(param, values),
            Annotation::Path | Annotation::Other(_) => {
                Err(Unsupported::Annotation(param.annotation.clone()).into())
            }
        }
    }

    /// `bool = false` compiles to an affirmative flag, `bool = true` to a
    /// negative flag that stores false. Any other default is refused: a
    /// boolean with no default would be a required flag, which is not a
    /// command-line shape.
    fn plain_bool(&mut self, param: &Param) -> Result<(), ParamError> {
        match param.default {
            Some(Value::Bool(false)) => {
                let pair = self.options.assign(Polarity::Yes, &param.name)?;
                self.args
                    .push(flag_arg(&param.name, &pair).action(ArgAction::SetTrue));
                Ok(())
            }
            Some(Value::Bool(true)) => {
                let pair = self.options.assign(Polarity::No, &param.name)?;
                self.args
                    .push(flag_arg(&param.name, &pair).action(ArgAction::SetFalse));
                Ok(())
            }
            _ => Err(Unsupported::Default(param.default.clone()).into()),
        }
    }

    /// `bool? = none` compiles to a yes/no flag pair; a concrete boolean
    /// default degrades to the plain `bool` mapping.
    fn plain_opt_bool(&mut self, param: &Param) -> Result<(), ParamError> {
        match param.default {
            Some(Value::Null) => self.opt_bool_pair(&param.name),
            Some(Value::Bool(_)) => self.plain_bool(param),
            _ => Err(Unsupported::Default(param.default.clone()).into()),
        }
    }

    fn opt_bool_pair(&mut self, name: &str) -> Result<(), ParamError> {
        let no_id = negate_id(name);
        if self.seen.contains(&no_id) {
            return Err(Unsupported::NegativeClash {
                param: no_id,
                positive: name.to_string(),
            }
            .into());
        }
        self.negatives.insert(no_id.clone());
        let positive = self.options.find_free(Polarity::Yes, name)?;
        let negative = self.options.find_free(Polarity::No, name)?;
        self.options.reserve(&positive)?;
        self.options.reserve(&negative)?;
        self.args.push(
            flag_arg(name, &positive)
                .action(ArgAction::SetTrue)
                .overrides_with(no_id.clone()),
        );
        self.args.push(
            Arg::new(no_id)
                .short(negative.short)
                .long(negative.long_name().to_string())
                .action(ArgAction::SetTrue)
                .overrides_with(name.to_string()),
        );
        Ok(())
    }

    /// `int`, `float`, and `str`: a required positional without a default,
    /// a value flag with a type-matching one.
    fn plain_value(&mut self, param: &Param) -> Result<(), ParamError> {
        match &param.default {
            None => {
                self.args
                    .push(typed(Arg::new(param.name.clone()).required(true), &param.annotation));
                Ok(())
            }
            Some(default) if default_matches(&param.annotation, default) => {
                let pair = self.options.assign_yes(&param.name)?;
                self.args.push(
                    typed(flag_arg(&param.name, &pair), &param.annotation)
                        .default_value(default.to_string()),
                );
                Ok(())
            }
            Some(_) => Err(Unsupported::Default(param.default.clone()).into()),
        }
    }

    /// `int?`, `float?`, and `str?` always compile to a value flag, since
    /// the parameter is optional even without a default. A `none` default
    /// means the flag simply has no default value.
    fn plain_opt_value(&mut self, param: &Param) -> Result<(), ParamError> {
        let default = match &param.default {
            None | Some(Value::Null) => None,
            Some(value) if opt_default_matches(&param.annotation, value) => Some(value.to_string()),
            Some(_) => return Err(Unsupported::Default(param.default.clone()).into()),
        };
        let pair = self.options.assign_yes(&param.name)?;
        let mut arg = typed(flag_arg(&param.name, &pair), &param.annotation);
        if let Some(default) = default {
            arg = arg.default_value(default);
        }
        self.args.push(arg);
        Ok(())
    }

    /// A choice default must itself be a member of the set: clap routes an
    /// argument's default through its value parser, so an out-of-set
    /// default has to be refused before the argument is built.
    fn plain_literal(&mut self, param: &Param, values: &[Value]) -> Result<(), ParamError> {
        let choices = literal_choices(values)?;
        match &param.default {
            None => {
                self.args.push(
                    Arg::new(param.name.clone())
                        .required(true)
                        .value_parser(PossibleValuesParser::new(choices)),
                );
                Ok(())
            }
            Some(default) if values.contains(default) => {
                let pair = self.options.assign_yes(&param.name)?;
                self.args.push(
                    flag_arg(&param.name, &pair)
                        .value_parser(PossibleValuesParser::new(choices))
                        .default_value(default.to_string()),
                );
                Ok(())
            }
            Some(_) => Err(Unsupported::Default(param.default.clone()).into()),
        }
    }

    /// `...rest: path` / `...rest: str` compile to a trailing positional
    /// that accepts zero or more tokens. Defaults make no sense here.
    fn variadic(&mut self, param: &Param) -> Result<(), ParamError> {
        if param.default.is_some() {
            return Err(Unsupported::Default(param.default.clone()).into());
        }
        let arg = Arg::new(param.name.clone()).num_args(0..);
        let arg = match &param.annotation {
            Annotation::Path => arg.value_parser(value_parser!(PathBuf)),
            Annotation::Str => arg,
            other => return Err(Unsupported::Annotation(other.clone()).into()),
        };
        self.args.push(arg);
        Ok(())
    }
}

// clap's `Id`/`Str` only convert from `&'static str` or owned strings, and
// every name here is runtime data.
fn flag_arg(name: &str, pair: &OptionPair) -> Arg {
    Arg::new(name.to_string())
        .short(pair.short)
        .long(pair.long_name().to_string())
}

fn typed(arg: Arg, annotation: &Annotation) -> Arg {
    match annotation {
        Annotation::Int | Annotation::OptInt => arg.value_parser(value_parser!(i64)),
        Annotation::Float | Annotation::OptFloat => arg.value_parser(value_parser!(f64)),
        _ => arg,
    }
}

fn default_matches(annotation: &Annotation, default: &Value) -> bool {
    matches!(
        (annotation, default),
        (Annotation::Int, Value::Int(_))
            | (Annotation::Float, Value::Float(_))
            | (Annotation::Str, Value::Str(_))
    )
}

fn opt_default_matches(annotation: &Annotation, default: &Value) -> bool {
    matches!(
        (annotation, default),
        (Annotation::OptInt, Value::Int(_))
            | (Annotation::OptFloat, Value::Float(_))
            | (Annotation::OptStr, Value::Str(_))
    )
}

/// A literal set compiles only when every value is an integer or every
/// value is a string; the first value decides which, mirroring how parsed
/// tokens are converted back in [`crate::invoke`].
fn literal_choices(values: &[Value]) -> Result<Vec<String>, Unsupported> {
    let uniform = match values.first() {
        Some(Value::Int(_)) => values.iter().all(|value| matches!(value, Value::Int(_))),
        Some(Value::Str(_)) => values.iter().all(|value| matches!(value, Value::Str(_))),
        _ => false,
    };
    if !uniform {
        return Err(Unsupported::Literal);
    }
    Ok(values.iter().map(ToString::to_string).collect())
}
