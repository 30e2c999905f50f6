//! The `Notes:` block sub-parser.
//!
//! A note header is ` author> text` or ` author| text`. With `|` later
//! lines of the same note fold onto one line separated by spaces; with `>`
//! the line structure is preserved with newlines. Switching author or
//! separator closes out the current note.

use crate::record::Note;
use regex::Regex;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+([A-Za-z0-9-]+)([>|]) *(.*)$").expect("note header regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Separator {
    /// `|`: fold continuations with a space.
    Fold,
    /// `>`: fold continuations with a newline.
    Block,
}

impl Separator {
    fn from_char(c: &str) -> Separator {
        match c {
            ">" => Separator::Block,
            _ => Separator::Fold,
        }
    }

    fn glue(self) -> char {
        match self {
            Separator::Fold => ' ',
            Separator::Block => '\n',
        }
    }
}

#[derive(Debug, Default)]
pub struct NotesParser {
    author: Option<String>,
    separator: Option<Separator>,
    buffer: String,
    notes: Vec<Note>,
}

impl NotesParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line from a `Notes:` block.
    ///
    /// Malformed continuations are reported as `Err` but handled
    /// best-effort: when a note is open the text is still attached.
    pub fn feed(&mut self, line: &str) -> Result<(), String> {
        if let Some(captures) = HEADER.captures(line) {
            let author = &captures[1];
            let separator = Separator::from_char(&captures[2]);
            let text = &captures[3];

            if self.author.as_deref() != Some(author) || self.separator != Some(separator) {
                self.flush();
                self.author = Some(author.to_string());
                self.separator = Some(separator);
            }
            self.append(text);
            return Ok(());
        }

        // Continuation: exactly two spaces of indentation, and only ever
        // inside an open note.
        let continuation = line.strip_prefix("  ").filter(|rest| !rest.starts_with(' '));
        match (continuation, self.author.is_some()) {
            (Some(text), true) => {
                self.append(text);
                Ok(())
            }
            (Some(text), false) => Err(format!("continuation with no author: '{}'", text.trim())),
            (None, has_author) => {
                if has_author {
                    self.append(line.trim_start());
                }
                Err(format!("malformed note line: '{}'", line.trim()))
            }
        }
    }

    fn append(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            let glue = self.separator.unwrap_or(Separator::Fold).glue();
            self.buffer.push(glue);
        }
        self.buffer.push_str(text);
    }

    fn flush(&mut self) {
        if let Some(author) = self.author.take() {
            self.notes.push(Note {
                author,
                text: std::mem::take(&mut self.buffer),
            });
        }
        self.separator = None;
        self.buffer.clear();
    }

    /// Close the pending note and return everything collected. Safe to call
    /// on a parser that never saw input.
    pub fn finalize(&mut self) -> Vec<Note> {
        self.flush();
        std::mem::take(&mut self.notes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn note(author: &str, text: &str) -> Note {
        Note {
            author: author.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn author_switch_closes_the_note() {
        let mut parser = NotesParser::new();
        parser.feed(" joe> first note").unwrap();
        parser.feed(" ann> second note").unwrap();

        assert_eq!(
            parser.finalize(),
            [note("joe", "first note"), note("ann", "second note")]
        );
    }

    #[test]
    fn fold_separator_joins_with_spaces() {
        let mut parser = NotesParser::new();
        parser.feed(" joe| this wraps").unwrap();
        parser.feed("  onto one line").unwrap();

        assert_eq!(parser.finalize(), [note("joe", "this wraps onto one line")]);
    }

    #[test]
    fn block_separator_preserves_lines() {
        let mut parser = NotesParser::new();
        parser.feed(" joe> step one").unwrap();
        parser.feed("  step two").unwrap();

        assert_eq!(parser.finalize(), [note("joe", "step one\nstep two")]);
    }

    #[test]
    fn separator_switch_closes_the_note() {
        let mut parser = NotesParser::new();
        parser.feed(" joe| quick remark").unwrap();
        parser.feed(" joe> long form").unwrap();

        assert_eq!(
            parser.finalize(),
            [note("joe", "quick remark"), note("joe", "long form")]
        );
    }

    #[test]
    fn continuation_without_author_is_an_error() {
        let mut parser = NotesParser::new();
        assert!(parser.feed("  orphan text").is_err());
        assert_eq!(parser.finalize(), []);
    }

    #[test]
    fn over_indented_continuation_is_flagged_but_kept() {
        let mut parser = NotesParser::new();
        parser.feed(" joe> head").unwrap();
        assert!(parser.feed("      deep indent").is_err());

        assert_eq!(parser.finalize(), [note("joe", "head\ndeep indent")]);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut parser = NotesParser::new();
        assert_eq!(parser.finalize(), []);

        parser.feed(" joe> hello").unwrap();
        assert_eq!(parser.finalize(), [note("joe", "hello")]);
        assert_eq!(parser.finalize(), []);
    }
}
