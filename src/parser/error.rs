//! User-friendly parse error types and formatting.
//!
//! Converts raw pest parser errors into structured, human-readable
//! diagnostics with source context, precise column indicators, and
//! actionable hints.

use std::fmt;

use super::Rule;

/// A structured, user-friendly signature parse error.
///
/// Produced by converting a raw `pest::error::Error` and enriching it with
/// source context, translated rule names, and optional hints.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// What went wrong, phrased without raw grammar rule names.
    pub message: String,
    /// Line number (1-indexed). Signatures are usually a single line, but
    /// the syntax permits newlines between parameters.
    pub line: usize,
    /// Column number (1-indexed) where the error begins.
    pub col: usize,
    /// End column when the error covers a same-line span; sizes the caret.
    pub col_end: Option<usize>,
    /// The text of the line the error points into.
    pub source_line: Option<String>,
    /// Optional suggestion to help the user fix the signature.
    pub hint: Option<String>,
}

impl ParseError {
    /// Build a `ParseError` from a pest error, enriching it with source
    /// context.
    ///
    /// * `error`  – the raw pest error
    /// * `source` – the full signature text that was being parsed
    #[must_use]
    pub fn from_pest(error: &pest::error::Error<Rule>, source: &str) -> Self {
        let (line, col, col_end) = position_of(error);

        let source_line = source
            .lines()
            .nth(line.saturating_sub(1))
            .map(str::to_string);

        let (message, hint) = match &error.variant {
            pest::error::ErrorVariant::ParsingError {
                positives,
                negatives,
            } => (friendly_message(positives, negatives), friendly_hint(positives)),
            pest::error::ErrorVariant::CustomError { message } => (message.clone(), None),
        };

        ParseError {
            message,
            line,
            col,
            col_end,
            source_line,
            hint,
        }
    }

    /// Build a `ParseError` at a span the grammar accepted but the tree
    /// walk refused, such as an integer literal outside the 64-bit range.
    ///
    /// * `span`    – the offending slice of the signature text
    /// * `message` – what is wrong with it
    /// * `hint`    – optional fix suggestion
    #[must_use]
    pub(crate) fn at_span(span: pest::Span<'_>, message: String, hint: Option<String>) -> Self {
        let (line, col) = span.start_pos().line_col();
        let (end_line, end_col) = span.end_pos().line_col();
        ParseError {
            message,
            line,
            col,
            col_end: (line == end_line).then_some(end_col),
            source_line: Some(span.start_pos().line_of().trim_end().to_string()),
            hint,
        }
    }

    /// The caret row, aligned under the offending columns.
    fn underline(&self) -> String {
        let width = self
            .col_end
            .map_or(1, |end| end.saturating_sub(self.col).max(1));
        format!("{}{}", " ".repeat(self.col.saturating_sub(1)), "^".repeat(width))
    }
}

/// Line, start column, and end column (same-line spans only) of a pest
/// error, all 1-indexed.
fn position_of(error: &pest::error::Error<Rule>) -> (usize, usize, Option<usize>) {
    match error.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col, None),
        pest::error::LineColLocation::Span((line, col), (end_line, end_col)) => {
            (line, col, (line == end_line).then_some(end_col))
        }
    }
}

/// Return a short, user-facing label for a grammar rule, or `None` to omit
/// it.
///
/// Returning `None` suppresses the rule from user-visible messages (`EOI`
/// and internal atomic rules are not useful to show).
fn rule_label(rule: Rule) -> Option<&'static str> {
    match rule {
        Rule::param_list | Rule::param | Rule::regular_param => Some("a parameter"),
        Rule::rest_param => Some("`...name` (variadic parameter)"),
        Rule::param_identifier => Some("a parameter name"),
        Rule::type_annotation => Some("a type annotation (`: type`)"),
        Rule::type_expr | Rule::type_name => Some("a type name"),
        Rule::literal_set => Some("a choice set (`{a|b|c}`)"),
        Rule::literal_value => Some("a choice value"),
        Rule::param_default => Some("a default (`= value`)"),
        Rule::default_value => Some("a default value"),
        Rule::quoted_string => Some("a quoted string"),
        Rule::int_literal => Some("an integer"),
        Rule::float_literal => Some("a number"),
        Rule::bool_literal => Some("`true` or `false`"),
        Rule::keyword_none => Some("`none`"),
        Rule::bare_word => Some("a word"),
        // EOI and all silent/atomic helper rules are suppressed.
        _ => None,
    }
}

/// Compose a human-readable message from the expected/unexpected rule sets.
fn friendly_message(positives: &[Rule], _negatives: &[Rule]) -> String {
    // Several rules share a label; keep the first occurrence of each.
    let mut named: Vec<&str> = Vec::new();
    for label in positives.iter().copied().filter_map(rule_label) {
        if !named.contains(&label) {
            named.push(label);
        }
    }

    let Some((last, rest)) = named.split_last() else {
        return "unexpected token".to_string();
    };
    if rest.is_empty() {
        format!("expected {last}")
    } else {
        format!("expected {} or {last}", rest.join(", "))
    }
}

/// Return an actionable hint based on the set of expected rules.
///
/// Pest reports the alternatives it tried at the failure point, not their
/// parent rule, so each case keys on rules that only occur in one context:
/// `bare_word` only inside choice sets, `keyword_none` only in defaults.
fn friendly_hint(positives: &[Rule]) -> Option<String> {
    let has = |r: Rule| positives.contains(&r);

    // Broken choice set.
    if has(Rule::literal_value) || has(Rule::bare_word) {
        return Some(
            "Choice sets look like `{fast|slow}` or `{1|2|3}`; quote values \
             that aren't simple words."
                .to_string(),
        );
    }

    // Broken default value.
    if has(Rule::default_value) || has(Rule::keyword_none) || has(Rule::bool_literal) {
        return Some(
            "Defaults can be `true`, `false`, `none`, a number, or a \
             \"quoted string\"."
                .to_string(),
        );
    }

    // Missing or malformed type annotation.
    if has(Rule::type_annotation) || has(Rule::type_name) || has(Rule::type_expr) {
        return Some(
            "Every parameter needs a type annotation, like `name: str` or \
             `count: int`. Optional types take a trailing `?`: `count: int?`."
                .to_string(),
        );
    }

    // Parameter expected but something else found.
    if has(Rule::param_identifier) || has(Rule::rest_param) || has(Rule::regular_param) {
        return Some(
            "Parameters look like `name: type`, optionally with `= default`. \
             Separate multiple parameters with commas; `...rest: path` \
             collects the remaining arguments."
                .to_string(),
        );
    }

    None
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Rendered in the rustc style:
        //   error: <message>
        //     --> <line>:<col>
        //      |
        //    N | <signature text>
        //      | <caret>
        //    = hint: <hint>
        writeln!(f, "error: {}", self.message)?;
        writeln!(f, "  --> {}:{}", self.line, self.col)?;

        if let Some(src) = &self.source_line {
            let num = self.line.to_string();
            let gutter = " ".repeat(num.len());
            writeln!(f, "   {gutter} |")?;
            writeln!(f, "   {num} | {src}")?;
            writeln!(f, "   {gutter} | {}", self.underline())?;
        }

        if let Some(hint) = &self.hint {
            writeln!(f)?;
            write!(f, "   = hint: {hint}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use pest::Parser;

    use super::{super::SignatureParser, *};

    /// Drive a real pest parse failure and convert it to `ParseError`.
    fn parse_err(input: &str) -> ParseError {
        let err = SignatureParser::parse(Rule::signature, input)
            .expect_err("expected a parse failure for this input");
        ParseError::from_pest(&err, input)
    }

    #[test]
    fn test_display_has_header_and_location() {
        let err = parse_err("count int");
        let rendered = err.to_string();
        assert!(
            rendered.contains("error:"),
            "'error:' prefix missing in:\n{rendered}"
        );
        assert!(rendered.contains("-->"), "location arrow missing in:\n{rendered}");
    }

    #[test]
    fn test_source_line_and_caret_present() {
        let input = "count int";
        let err = parse_err(input);
        let rendered = err.to_string();
        assert!(
            rendered.contains("count int"),
            "source line missing in:\n{rendered}"
        );
        assert!(rendered.contains('^'), "caret missing in:\n{rendered}");
    }

    #[test]
    fn test_missing_annotation_gets_a_hint() {
        let err = parse_err("count");
        let hint = err.hint.unwrap_or_default();
        assert!(
            hint.contains("type annotation"),
            "expected annotation hint, got: {hint}"
        );
    }

    #[test]
    fn test_bad_default_gets_a_hint() {
        let err = parse_err("name: str = hello");
        let hint = err.hint.unwrap_or_default();
        assert!(
            hint.contains("quoted string"),
            "expected default hint, got: {hint}"
        );
    }

    #[test]
    fn test_no_raw_rule_names_in_message() {
        let inputs = ["count int", "x:", "a: {._.}", "n: str =", "5x: int"];
        for input in inputs {
            let err = parse_err(input);
            assert!(
                !err.message.contains("Rule::"),
                "raw rule name in message for `{input}`: {}",
                err.message
            );
        }
    }

    #[test]
    fn test_multiline_error_points_to_correct_line() {
        let input = "count: int,\nname str";
        let err = parse_err(input);
        assert_eq!(err.line, 2, "error should point to second line");
        assert!(
            err.source_line.as_deref().unwrap_or("").contains("name str"),
            "source_line should show the bad line; got: {:?}",
            err.source_line
        );
    }

    #[test]
    fn test_pos_location_is_one_indexed() {
        let err = parse_err("count int");
        assert!(err.line > 0, "line should be positive");
        assert!(err.col > 0, "col should be positive");
    }

    #[test]
    fn test_at_span_points_at_the_slice() {
        let input = "n: int = 99999999999999999999999";
        let span = pest::Span::new(input, 9, input.len()).unwrap();
        let err = ParseError::at_span(span, "integer out of range".to_string(), None);
        assert_eq!(err.line, 1);
        assert_eq!(err.col, 10);
        assert_eq!(err.col_end, Some(input.len() + 1));
        assert_eq!(err.source_line.as_deref(), Some(input));
        let rendered = err.to_string();
        assert!(rendered.contains('^'), "caret missing in:\n{rendered}");
    }
}
