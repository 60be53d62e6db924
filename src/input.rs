// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character sources for the tokenizer.

use tendril::StrTendril;

use crate::error::Position;

/// A decoded stream of characters with push-back.
///
/// Implementations hand out characters with `\r\n` and `\r` already
/// collapsed to `\n`, and NUL already replaced by U+FFFD.
pub trait CharSource {
    /// Consume the next character, or `None` at end of input.
    fn next_char(&mut self) -> Option<char>;

    /// Return a character to the stream. It will be the next one
    /// `next_char` hands out; pushing several behaves like a stack.
    fn push_back(&mut self, c: char);

    /// Position of the furthest character read from the underlying input.
    fn position(&self) -> Position;
}

/// An in-memory `CharSource` over a string.
pub struct StringInput {
    /// Input not yet read.
    buf: StrTendril,

    /// Characters handed back by the tokenizer, last one on top.
    pushed: Vec<char>,

    /// Skip a `\n` that follows a `\r`.
    ignore_lf: bool,

    line: u64,
    column: u64,
}

impl StringInput {
    pub fn new(buf: StrTendril) -> StringInput {
        StringInput {
            buf,
            pushed: Vec::new(),
            ignore_lf: false,
            line: 1,
            column: 0,
        }
    }

    fn next_raw_char(&mut self) -> Option<char> {
        loop {
            let c = self.buf.pop_front_char()?;
            if self.ignore_lf {
                self.ignore_lf = false;
                if c == '\n' {
                    continue;
                }
            }

            let c = match c {
                '\r' => {
                    self.ignore_lf = true;
                    '\n'
                },
                '\0' => '\u{fffd}',
                c => c,
            };

            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            return Some(c);
        }
    }
}

impl<'a> From<&'a str> for StringInput {
    fn from(s: &'a str) -> StringInput {
        StringInput::new(StrTendril::from_slice(s))
    }
}

impl From<StrTendril> for StringInput {
    fn from(buf: StrTendril) -> StringInput {
        StringInput::new(buf)
    }
}

impl CharSource for StringInput {
    fn next_char(&mut self) -> Option<char> {
        match self.pushed.pop() {
            Some(c) => Some(c),
            None => self.next_raw_char(),
        }
    }

    fn push_back(&mut self, c: char) {
        self.pushed.push(c);
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::{CharSource, StringInput};
    use crate::error::Position;

    fn drain(input: &mut StringInput) -> String {
        let mut out = String::new();
        while let Some(c) = input.next_char() {
            out.push(c);
        }
        out
    }

    #[test]
    fn newlines_are_normalized() {
        let mut input = StringInput::from("a\r\nb\rc\n\rd");
        assert_eq!(drain(&mut input), "a\nb\nc\n\nd");
    }

    #[test]
    fn nul_is_replaced() {
        let mut input = StringInput::from("a\0b");
        assert_eq!(drain(&mut input), "a\u{fffd}b");
    }

    #[test]
    fn push_back_is_last_in_first_out() {
        let mut input = StringInput::from("xyz");
        assert_eq!(input.next_char(), Some('x'));
        assert_eq!(input.next_char(), Some('y'));
        input.push_back('y');
        input.push_back('x');
        assert_eq!(drain(&mut input), "xyz");
    }

    #[test]
    fn position_tracks_lines_and_ignores_push_back() {
        let mut input = StringInput::from("ab\ncd");
        assert_eq!(input.position(), Position::new(1, 0));
        input.next_char();
        input.next_char();
        assert_eq!(input.position(), Position::new(1, 2));
        input.push_back('b');
        assert_eq!(input.position(), Position::new(1, 2));
        input.next_char();
        input.next_char();
        input.next_char();
        assert_eq!(input.position(), Position::new(2, 1));
    }
}
