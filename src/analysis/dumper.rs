//! Text rendering of statements and structured nodes.
//!
//! Rendering goes through a [`Dumper`], which tracks indentation so that
//! nested structured nodes can print their bodies without knowing where they
//! sit. Expressions render through `Display` directly; anything that spans
//! lines implements [`Dumpable`].

use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Indentation-aware text sink.
#[derive(Debug, Default)]
pub struct Dumper {
    out: String,
    depth: usize,
    at_line_start: bool,
}

impl Dumper {
    /// Creates an empty dumper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
            at_line_start: true,
        }
    }

    /// Appends `text`, indenting it if it starts a line.
    pub fn print(&mut self, text: impl fmt::Display) -> &mut Self {
        if self.at_line_start {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.at_line_start = false;
        }
        // Writing into a String cannot fail.
        let _ = write!(self.out, "{text}");
        self
    }

    /// Ends the current line.
    pub fn newline(&mut self) -> &mut Self {
        self.out.push('\n');
        self.at_line_start = true;
        self
    }

    /// Increases the indentation of following lines.
    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    /// Decreases the indentation of following lines.
    pub fn outdent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Renders `item` at the current position.
    pub fn dump(&mut self, item: &impl Dumpable) -> &mut Self {
        item.dump(self);
        self
    }

    /// The text rendered so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consumes the dumper, returning the rendered text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }
}

/// Anything that renders to one or more lines of source text.
pub trait Dumpable {
    /// Renders `self` into `dumper`.
    fn dump(&self, dumper: &mut Dumper);

    /// Renders `self` into a fresh string.
    fn dump_to_string(&self) -> String {
        let mut dumper = Dumper::new();
        self.dump(&mut dumper);
        dumper.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let mut dumper = Dumper::new();
        dumper.print("if (x) {").newline().indent();
        dumper.print("a").print("();").newline().outdent();
        dumper.print("}").newline();
        assert_eq!(dumper.as_str(), "if (x) {\n    a();\n}\n");
    }

    #[test]
    fn test_outdent_saturates() {
        let mut dumper = Dumper::new();
        dumper.outdent().print("x");
        assert_eq!(dumper.into_string(), "x");
    }
}
