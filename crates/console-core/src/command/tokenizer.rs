//! Command-line tokenizer.
//!
//! # Rules (for beginners)
//!
//! - Tokens are separated by whitespace.
//! - A single or double quote at the *start* of a token groups everything up
//!   to the matching quote into one token, whitespace included.  The quotes
//!   are not part of the token, and `""` yields an empty token.
//! - Inside a quoted token a backslash before the matching quote escapes it.
//!   The other kind of quote needs no escaping.
//! - A quote in the *middle* of a token is kept literally but still groups:
//!   `--name="a b"` is the single token `--name="a b"`.
//! - A quote that is never closed is a syntax error.
//!
//! [`split_commands`] runs first and splits a line on `&&` outside quotes, so
//! `a "x && y" && b` is two commands.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("missing closing {quote} quote")]
    UnterminatedQuote { quote: char },

    #[error("empty command line")]
    EmptyCommand,
}

const DOUBLE_QUOTE: char = '"';
const SINGLE_QUOTE: char = '\'';
const ESCAPE: char = '\\';

/// Splits `line` into its `&&`-separated commands, each trimmed.
///
/// Quoted text is copied through untouched; empty segments are dropped.
pub fn split_commands(line: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == ESCAPE && chars.peek() == Some(&q) {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '&' && chars.peek() == Some(&'&') {
                    chars.next();
                    push_trimmed(&mut commands, &current);
                    current.clear();
                    continue;
                }
                if ch == DOUBLE_QUOTE || ch == SINGLE_QUOTE {
                    quote = Some(ch);
                }
                current.push(ch);
            }
        }
    }
    push_trimmed(&mut commands, &current);
    commands
}

fn push_trimmed(commands: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        commands.push(trimmed.to_string());
    }
}

/// Splits a single command into tokens.
///
/// # Errors
///
/// Returns [`TokenizeError::UnterminatedQuote`] when a quote is left open.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    // Quote currently open, and whether it opened at a token start.
    let mut quote: Option<(char, bool)> = None;
    let mut prev: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some((q, grouped)) => {
                if ch == ESCAPE && chars.peek() == Some(&q) {
                    if let Some(escaped) = chars.next() {
                        buffer.push(escaped);
                    }
                } else if ch == q {
                    if grouped {
                        tokens.push(std::mem::take(&mut buffer));
                    } else {
                        buffer.push(ch);
                    }
                    quote = None;
                } else {
                    buffer.push(ch);
                }
            }
            None if ch.is_whitespace() => {
                if !buffer.is_empty() {
                    tokens.push(std::mem::take(&mut buffer));
                }
            }
            None if ch == DOUBLE_QUOTE || ch == SINGLE_QUOTE => {
                let at_token_start = prev.map_or(true, char::is_whitespace);
                if !at_token_start {
                    buffer.push(ch);
                }
                quote = Some((ch, at_token_start));
            }
            None => buffer.push(ch),
        }
        prev = Some(ch);
    }

    if let Some((q, _)) = quote {
        return Err(TokenizeError::UnterminatedQuote { quote: q });
    }
    if !buffer.is_empty() {
        tokens.push(buffer);
    }
    Ok(tokens)
}

/// Tokenizes a single command and separates the command name.
///
/// # Errors
///
/// [`TokenizeError::EmptyCommand`] for a blank line, or a quoting error.
pub fn parse_command(line: &str) -> Result<(String, Vec<String>), TokenizeError> {
    let mut tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Err(TokenizeError::EmptyCommand);
    }
    let name = tokens.remove(0);
    Ok((name, tokens))
}

/// The token under the cursor for completion: everything after the last
/// whitespace character of `line`.
pub fn completion_token(line: &str) -> &str {
    match line.rfind(char::is_whitespace) {
        Some(index) => {
            let ws_len = line[index..].chars().next().map_or(1, char::len_utf8);
            &line[index + ws_len..]
        }
        None => line,
    }
}

/// Quotes `arg` so that [`tokenize`] reads it back as one token.
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &str) -> Vec<String> {
        tokenize(line).unwrap()
    }

    #[test]
    fn test_tokenize_splits_on_whitespace() {
        assert_eq!(toks("  a  b\tc "), vec!["a", "b", "c"]);
        assert!(toks("").is_empty());
    }

    #[test]
    fn test_tokenize_groups_double_and_single_quotes() {
        // Arrange / Act
        let tokens = toks(r#"echo "hello world" 'one two'"#);

        // Assert
        assert_eq!(tokens, vec!["echo", "hello world", "one two"]);
    }

    #[test]
    fn test_tokenize_empty_quotes_yield_empty_token() {
        assert_eq!(toks(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn test_tokenize_escaped_quote_inside_quotes() {
        assert_eq!(toks(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_tokenize_other_quote_kind_is_literal() {
        assert_eq!(toks(r#""it's" 'a "b"'"#), vec!["it's", r#"a "b""#]);
    }

    #[test]
    fn test_tokenize_mid_token_quote_is_literal_but_groups() {
        assert_eq!(toks(r#"--name="a b" x"#), vec![r#"--name="a b""#, "x"]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_is_error() {
        assert_eq!(
            tokenize(r#"echo "oops"#),
            Err(TokenizeError::UnterminatedQuote { quote: '"' })
        );
        assert_eq!(
            tokenize("echo 'oops"),
            Err(TokenizeError::UnterminatedQuote { quote: '\'' })
        );
    }

    #[test]
    fn test_split_commands_on_double_ampersand() {
        assert_eq!(split_commands("test1 --arg1 && test2 --arg2"), vec!["test1 --arg1", "test2 --arg2"]);
        assert_eq!(split_commands("test"), vec!["test"]);
    }

    #[test]
    fn test_split_commands_ignores_ampersands_in_quotes() {
        // Arrange
        let line = r#"test1 --arg1 "a1 && a2" && test2 'b1 && b2'"#;

        // Act
        let commands = split_commands(line);

        // Assert
        assert_eq!(commands, vec![r#"test1 --arg1 "a1 && a2""#, "test2 'b1 && b2'"]);
    }

    #[test]
    fn test_split_commands_handles_escaped_quote() {
        let line = r#"test --arg1 "argument \"&&\" quotes""#;
        assert_eq!(split_commands(line), vec![line]);
    }

    #[test]
    fn test_parse_command_rejects_blank_line() {
        assert_eq!(parse_command("   "), Err(TokenizeError::EmptyCommand));
        let (name, args) = parse_command("man echo").unwrap();
        assert_eq!(name, "man");
        assert_eq!(args, vec!["echo"]);
    }

    #[test]
    fn test_completion_token() {
        assert_eq!(completion_token(""), "");
        assert_eq!(completion_token("test"), "test");
        assert_eq!(completion_token("test "), "");
        assert_eq!(completion_token("man ec"), "ec");
    }

    #[test]
    fn test_quote_arg_round_trips_through_tokenize() {
        for arg in ["plain", "two words", "", r#"has "quotes""#] {
            let quoted = quote_arg(arg);
            assert_eq!(toks(&quoted), vec![arg.to_string()]);
        }
    }
}
