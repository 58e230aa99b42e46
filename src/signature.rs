//! Typed parameter descriptors.
//!
//! A [`Signature`] describes a task's parameter list declaratively. The
//! compiler in [`crate::builder`] turns it into a command-line parser, and
//! the invocation layer in [`crate::invoke`] uses it again to rebuild the
//! call arguments. Descriptors can be assembled directly or parsed from the
//! signature syntax (see [`crate::parser`]):
//!
//! ```
//! use clk::Signature;
//!
//! let signature = Signature::parse("count: int = 3, ...files: path")?;
//! assert_eq!(signature.params.len(), 2);
//! # Ok::<(), clk::ParseError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::parser::{self, ParseError};
use crate::value::Value;

/// Calling convention of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A named parameter, bound positionally or through a generated flag.
    Plain,
    /// A trailing parameter collecting all remaining positional tokens.
    Variadic,
    /// Keyword-only calling convention. Representable, but rejected by the
    /// compiler.
    KeywordOnly,
    /// Var-keyword calling convention. Representable, but rejected by the
    /// compiler.
    VarKeyword,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParamKind::Plain => "plain",
            ParamKind::Variadic => "variadic",
            ParamKind::KeywordOnly => "keyword-only",
            ParamKind::VarKeyword => "var-keyword",
        };
        write!(f, "{label}")
    }
}

/// Declared type of a parameter.
///
/// The `Opt*` variants are the optional forms written with a trailing `?` in
/// signature syntax (`int?`, `bool?`, ...): they admit the declared type or
/// the absent value [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Bool,
    OptBool,
    Int,
    OptInt,
    Float,
    OptFloat,
    Str,
    OptStr,
    /// Filesystem path. Compiles on variadic parameters only.
    Path,
    /// A closed set of literal constants, `{1|2|3}` or `{fast|slow}`.
    Literal(Vec<Value>),
    /// Any other annotation. Carried verbatim for diagnostics; rejected by
    /// the compiler.
    Other(String),
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Bool => write!(f, "bool"),
            Annotation::OptBool => write!(f, "bool?"),
            Annotation::Int => write!(f, "int"),
            Annotation::OptInt => write!(f, "int?"),
            Annotation::Float => write!(f, "float"),
            Annotation::OptFloat => write!(f, "float?"),
            Annotation::Str => write!(f, "str"),
            Annotation::OptStr => write!(f, "str?"),
            Annotation::Path => write!(f, "path"),
            Annotation::Literal(values) => {
                write!(f, "{{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}}")
            }
            Annotation::Other(name) => write!(f, "{name}"),
        }
    }
}

/// One parameter of a task signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Annotation,
    pub default: Option<Value>,
}

impl Param {
    pub fn plain(name: impl Into<String>, annotation: Annotation) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Plain,
            annotation,
            default: None,
        }
    }

    pub fn variadic(name: impl Into<String>, annotation: Annotation) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Variadic,
            annotation,
            default: None,
        }
    }

    pub fn keyword_only(name: impl Into<String>, annotation: Annotation) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::KeywordOnly,
            annotation,
            default: None,
        }
    }

    pub fn var_keyword(name: impl Into<String>, annotation: Annotation) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::VarKeyword,
            annotation,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Variadic => write!(f, "...")?,
            ParamKind::VarKeyword => write!(f, "**")?,
            ParamKind::Plain | ParamKind::KeywordOnly => {}
        }
        write!(f, "{}: {}", self.name, self.annotation)?;
        if let Some(default) = &self.default {
            match default {
                Value::Str(s) => write!(f, " = {s:?}")?,
                other => write!(f, " = {other}")?,
            }
        }
        Ok(())
    }
}

/// A task's complete parameter list, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
}

impl Signature {
    #[must_use]
    pub fn new(params: Vec<Param>) -> Self {
        Signature { params }
    }

    /// Parse the textual signature syntax, e.g. `"count: int = 3"`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] with position and hint when the input does
    /// not match the grammar.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parser::parse_signature(input)
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        Ok(())
    }
}
