//! Typed argument parsing.
//!
//! A command declares positional [`ArgSpec`]s, named [`OptionSpec`]s and an
//! optional variadic "rest" parameter.  [`parse_args`] walks the argument
//! tokens once:
//!
//! - `--name` / `-n` tokens are options.  A bool option is a flag; any other
//!   kind consumes the following token as its value.
//! - A token that starts with `-` but parses as a number (`-5`, `-0.25`) is a
//!   positional argument, not an option.
//! - Everything else is positional and is matched to the declared parameters
//!   in order.  Extra tokens go to the rest parameter, or are an error when
//!   the command has none.
//!
//! Commands whose arguments are themselves command lines (`bind f1 -jump`)
//! use [`parse_positional`], which skips option recognition entirely.
//!
//! Errors carry the 1-based position of the offending token (0 when the
//! problem is a missing value rather than a bad token).

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Declared type of an argument or option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Float,
    Bool,
    Str,
}

impl ArgKind {
    /// Converts a token to a value of this kind.
    pub fn parse(self, token: &str) -> Result<ArgValue, String> {
        match self {
            ArgKind::Int => token
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|_| format!("expected an integer but found '{token}'")),
            ArgKind::Float => token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ArgValue::Float)
                .ok_or_else(|| format!("expected a number but found '{token}'")),
            ArgKind::Bool => match token.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(ArgValue::Bool(true)),
                "0" | "false" | "no" | "off" => Ok(ArgValue::Bool(false)),
                _ => Err(format!("expected a boolean but found '{token}'")),
            },
            ArgKind::Str => Ok(ArgValue::Str(token.to_string())),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArgKind::Int => "int",
            ArgKind::Float => "float",
            ArgKind::Bool => "bool",
            ArgKind::Str => "string",
        }
    }
}

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

/// A positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    /// Value used when the argument is omitted; `None` makes it required.
    pub default: Option<ArgValue>,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ArgKind, default: ArgValue) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default),
        }
    }
}

/// A named `--option` (with optional `-o` short form).
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub short: Option<char>,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<ArgValue>,
}

impl OptionSpec {
    /// A boolean flag, `false` unless present.
    pub fn flag(name: impl Into<String>, short: Option<char>) -> Self {
        Self {
            name: name.into(),
            short,
            kind: ArgKind::Bool,
            required: false,
            default: Some(ArgValue::Bool(false)),
        }
    }

    pub fn value(name: impl Into<String>, short: Option<char>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            short,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: ArgValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Usage fragment, e.g. `--count <int>` or `[-v]`.
    pub fn usage(&self) -> String {
        let mut name = format!("--{}", self.name);
        if let Some(short) = self.short {
            name = format!("-{short}|{name}");
        }
        let body = match self.kind {
            ArgKind::Bool => name,
            kind => format!("{name} <{}>", kind.label()),
        };
        if self.required {
            body
        } else {
            format!("[{body}]")
        }
    }
}

/// Usage fragment for a positional parameter.
pub fn arg_usage(spec: &ArgSpec) -> String {
    match spec.default {
        None => format!("<{}>", spec.name),
        Some(_) => format!("[{}]", spec.name),
    }
}

/// Argument parse failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("argument {position}: {detail}")]
pub struct ArgParseError {
    pub position: usize,
    pub detail: String,
}

impl ArgParseError {
    fn new(position: usize, detail: impl Into<String>) -> Self {
        Self {
            position,
            detail: detail.into(),
        }
    }
}

/// Arguments after parsing, looked up by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    values: HashMap<String, ArgValue>,
    rest: Vec<String>,
}

impl ParsedArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ArgValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// `true` if a flag option was given.
    pub fn flag(&self, name: &str) -> bool {
        self.bool(name).unwrap_or(false)
    }

    /// Tokens collected by the variadic parameter.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }
}

fn is_option_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

/// Parses `tokens` against the declared parameters.
///
/// # Errors
///
/// [`ArgParseError`] for an unknown option, a missing option value, a
/// missing required option or argument, a type mismatch or surplus tokens.
pub fn parse_args(
    args: &[ArgSpec],
    options: &[OptionSpec],
    rest: Option<&str>,
    tokens: &[String],
) -> Result<ParsedArgs, ArgParseError> {
    parse_tokens(args, options, rest, tokens, true)
}

/// Like [`parse_args`] with no options: every token is positional, including
/// ones that start with `-`.
///
/// # Errors
///
/// [`ArgParseError`] for a missing required argument, a type mismatch or
/// surplus tokens.
pub fn parse_positional(
    args: &[ArgSpec],
    rest: Option<&str>,
    tokens: &[String],
) -> Result<ParsedArgs, ArgParseError> {
    parse_tokens(args, &[], rest, tokens, false)
}

fn parse_tokens(
    args: &[ArgSpec],
    options: &[OptionSpec],
    rest: Option<&str>,
    tokens: &[String],
    recognise_options: bool,
) -> Result<ParsedArgs, ArgParseError> {
    let mut parsed = ParsedArgs::default();
    let mut positional: Vec<(usize, &str)> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let position = i + 1;
        if !recognise_options || !is_option_token(token) {
            positional.push((position, token));
            i += 1;
            continue;
        }

        let spec = match token.strip_prefix("--") {
            Some(long) => options.iter().find(|o| o.name == long),
            None => {
                let mut short = token[1..].chars();
                match (short.next(), short.next()) {
                    (Some(c), None) => options.iter().find(|o| o.short == Some(c)),
                    _ => None,
                }
            }
        }
        .ok_or_else(|| ArgParseError::new(position, format!("unknown option '{token}'")))?;

        let value = if spec.kind == ArgKind::Bool {
            ArgValue::Bool(true)
        } else {
            i += 1;
            let raw = tokens.get(i).ok_or_else(|| {
                ArgParseError::new(position, format!("missing value for option '{token}'"))
            })?;
            spec.kind
                .parse(raw)
                .map_err(|detail| ArgParseError::new(i + 1, detail))?
        };
        parsed.values.insert(spec.name.clone(), value);
        i += 1;
    }

    for spec in options {
        if parsed.values.contains_key(&spec.name) {
            continue;
        }
        if spec.required {
            return Err(ArgParseError::new(
                0,
                format!("missing required option '--{}'", spec.name),
            ));
        }
        if let Some(default) = &spec.default {
            parsed.values.insert(spec.name.clone(), default.clone());
        }
    }

    let mut supplied = positional.into_iter();
    for spec in args {
        match supplied.next() {
            Some((position, token)) => {
                let value = spec
                    .kind
                    .parse(token)
                    .map_err(|detail| ArgParseError::new(position, detail))?;
                parsed.values.insert(spec.name.clone(), value);
            }
            None => match &spec.default {
                Some(default) => {
                    parsed.values.insert(spec.name.clone(), default.clone());
                }
                None => {
                    return Err(ArgParseError::new(
                        0,
                        format!("missing required argument <{}>", spec.name),
                    ))
                }
            },
        }
    }

    let surplus: Vec<(usize, &str)> = supplied.collect();
    match (rest, surplus.first()) {
        (_, None) => {}
        (Some(_), Some(_)) => parsed.rest = surplus.iter().map(|(_, t)| t.to_string()).collect(),
        (None, Some((position, token))) => {
            return Err(ArgParseError::new(
                *position,
                format!("unexpected argument '{token}'"),
            ))
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_arguments_are_typed() {
        // Arrange
        let args = [
            ArgSpec::required("count", ArgKind::Int),
            ArgSpec::required("scale", ArgKind::Float),
            ArgSpec::required("enabled", ArgKind::Bool),
            ArgSpec::required("label", ArgKind::Str),
        ];

        // Act
        let parsed = parse_args(&args, &[], None, &strings(&["3", "0.5", "yes", "hi"])).unwrap();

        // Assert
        assert_eq!(parsed.int("count"), Some(3));
        assert_eq!(parsed.float("scale"), Some(0.5));
        assert_eq!(parsed.bool("enabled"), Some(true));
        assert_eq!(parsed.str("label"), Some("hi"));
    }

    #[test]
    fn test_type_mismatch_reports_position() {
        let args = [
            ArgSpec::required("a", ArgKind::Int),
            ArgSpec::required("b", ArgKind::Int),
        ];
        let err = parse_args(&args, &[], None, &strings(&["1", "two"])).unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.detail.contains("integer"), "{}", err.detail);
    }

    #[test]
    fn test_missing_required_argument_and_default() {
        let args = [
            ArgSpec::required("name", ArgKind::Str),
            ArgSpec::optional("times", ArgKind::Int, ArgValue::Int(1)),
        ];

        let parsed = parse_args(&args, &[], None, &strings(&["x"])).unwrap();
        assert_eq!(parsed.int("times"), Some(1));

        let err = parse_args(&args, &[], None, &[]).unwrap_err();
        assert!(err.detail.contains("<name>"));
    }

    #[test]
    fn test_surplus_tokens_error_without_rest_and_collect_with_rest() {
        let args = [ArgSpec::required("first", ArgKind::Str)];
        let tokens = strings(&["a", "b", "c"]);

        let err = parse_args(&args, &[], None, &tokens).unwrap_err();
        assert_eq!(err.position, 2);

        let parsed = parse_args(&args, &[], Some("more"), &tokens).unwrap();
        assert_eq!(parsed.rest(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_long_and_short_options() {
        // Arrange
        let options = [
            OptionSpec::flag("all", Some('a')),
            OptionSpec::value("depth", Some('d'), ArgKind::Int),
        ];

        // Act
        let parsed = parse_args(&[], &options, None, &strings(&["-a", "--depth", "4"])).unwrap();

        // Assert
        assert!(parsed.flag("all"));
        assert_eq!(parsed.int("depth"), Some(4));
    }

    #[test]
    fn test_flag_defaults_to_false() {
        let options = [OptionSpec::flag("verbose", Some('v'))];
        let parsed = parse_args(&[], &options, None, &[]).unwrap();
        assert!(!parsed.flag("verbose"));
    }

    #[test]
    fn test_negative_number_is_an_argument() {
        let args = [ArgSpec::required("offset", ArgKind::Int)];
        let options = [OptionSpec::flag("x", None)];
        let parsed = parse_args(&args, &options, None, &strings(&["-5"])).unwrap();
        assert_eq!(parsed.int("offset"), Some(-5));
    }

    #[test]
    fn test_positional_mode_keeps_dash_tokens_as_arguments() {
        // Arrange
        let args = [
            ArgSpec::required("key", ArgKind::Str),
            ArgSpec::required("line", ArgKind::Str),
        ];

        // Act
        let parsed = parse_positional(&args, None, &strings(&["f1", "-jump"])).unwrap();

        // Assert
        assert_eq!(parsed.str("line"), Some("-jump"));
        assert!(parse_args(&args, &[], None, &strings(&["f1", "-jump"])).is_err());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = parse_args(&[], &[], None, &strings(&["--nope"])).unwrap_err();
        assert_eq!(err.position, 1);
        assert!(err.detail.contains("--nope"));
    }

    #[test]
    fn test_required_option_must_be_present() {
        let options = [OptionSpec::value("target", Some('t'), ArgKind::Str).required()];
        let err = parse_args(&[], &options, None, &[]).unwrap_err();
        assert!(err.detail.contains("--target"));
    }

    #[test]
    fn test_option_missing_value() {
        let options = [OptionSpec::value("depth", None, ArgKind::Int)];
        let err = parse_args(&[], &options, None, &strings(&["--depth"])).unwrap_err();
        assert!(err.detail.contains("missing value"));
    }

    #[test]
    fn test_option_usage_strings() {
        assert_eq!(OptionSpec::flag("all", Some('a')).usage(), "[-a|--all]");
        assert_eq!(
            OptionSpec::value("depth", None, ArgKind::Int).required().usage(),
            "--depth <int>"
        );
    }
}
