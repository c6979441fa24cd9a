//! Tab completion.
//!
//! Only the token under the cursor is completed.  The first token of a
//! command is matched against visible command names; later tokens are handed
//! to the command's argument completer, if it has one.
//!
//! | matches | single tab                         | double tab                          |
//! |---------|------------------------------------|-------------------------------------|
//! | none    | nothing                            | nothing                             |
//! | one     | `candidate ` (with trailing space) | same                                |
//! | many    | longest common prefix, if longer   | same, and a table of the candidates |

use crate::command::tokenizer::{completion_token, tokenize};
use crate::output::{OutputFrame, OutputSink};

use super::Shell;

impl Shell {
    /// Completes `line` at byte offset `cursor`.
    ///
    /// Returns the whole new line (text after the cursor is kept), or `None`
    /// when nothing can be completed.  A `cursor` past the end or inside a
    /// multi-byte character is clamped to the nearest preceding boundary.
    pub fn complete(
        &self,
        line: &str,
        cursor: usize,
        double_tab: bool,
        out: &mut dyn OutputSink,
    ) -> Option<String> {
        let mut cursor = cursor.min(line.len());
        while !line.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let (before, after) = line.split_at(cursor);

        let token = completion_token(before);
        let head = &before[..before.len() - token.len()];
        let segment = head.rsplit("&&").next().unwrap_or(head);

        let mut candidates = if segment.trim().is_empty() {
            self.registry.names(token)
        } else {
            let tokens = tokenize(segment).ok()?;
            let command = self.registry.find(tokens.first()?)?;
            let completer = command.arg_completer()?;
            completer(&self.registry, token)
        };
        candidates.sort();
        candidates.dedup();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(format!("{head}{only} {after}")),
            many => {
                if double_tab {
                    out.emit(OutputFrame::Table(many.to_vec()));
                }
                let prefix = common_prefix(many);
                (prefix.len() > token.len()).then(|| format!("{head}{prefix}{after}"))
            }
        }
    }
}

fn common_prefix(words: &[String]) -> &str {
    let Some(first) = words.first() else {
        return "";
    };
    let mut len = first.len();
    for word in &words[1..] {
        len = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    &first[..len]
}
