// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::Tokenizer;
use crate::input::CharSource;

use tendril::StrTendril;

use std::borrow::Cow::Borrowed;
use std::char::from_u32;

use self::State::*;
pub use self::Status::*;

mod data;

pub struct CharRef {
    /// The resulting character(s)
    pub chars: [char; 2],

    /// How many slots in `chars` are valid?
    pub num_chars: u8,
}

pub enum Status {
    Progress,
    Done(CharRef),
}

#[derive(Debug)]
enum State {
    Begin,
    Octothorpe,
    Numeric(u32), // base
    NumericSemicolon,
    Named,
}

/// Consumes one character reference after its `&`.
///
/// Input is pulled from the tokenizer's source, so the sub-tokenizer never
/// has to wait for more text. It runs to completion from a single loop in
/// `Tokenizer::consume_char_ref`.
pub struct CharRefTokenizer {
    state: State,

    num: u32,
    num_too_big: bool,

    name_buf: StrTendril,
    name_match: Option<((u32, u32), usize)>,
}

impl CharRefTokenizer {
    pub fn new() -> CharRefTokenizer {
        CharRefTokenizer {
            state: Begin,
            num: 0,
            num_too_big: false,
            name_buf: StrTendril::new(),
            name_match: None,
        }
    }

    fn finish_none(&mut self) -> Status {
        Done(CharRef {
            chars: ['\0', '\0'],
            num_chars: 0,
        })
    }

    fn finish_one(&mut self, c: char) -> Status {
        Done(CharRef {
            chars: [c, '\0'],
            num_chars: 1,
        })
    }
}

impl CharRefTokenizer {
    pub fn step<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        trace!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            Begin => self.do_begin(tokenizer),
            Octothorpe => self.do_octothorpe(tokenizer),
            Numeric(base) => self.do_numeric(tokenizer, base),
            NumericSemicolon => self.do_numeric_semicolon(tokenizer),
            Named => self.do_named(tokenizer),
        }
    }

    fn do_begin<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        match tokenizer.peek() {
            None | Some('\t' | '\n' | '\x0C' | ' ' | '<' | '&') => self.finish_none(),

            Some('#') => {
                tokenizer.discard_char();
                self.state = Octothorpe;
                Progress
            },

            Some(_) => {
                self.state = Named;
                Progress
            },
        }
    }

    // A numeric reference needs a digit right away: `&#` plus a decimal
    // digit, or `&#x` plus a hex digit. Anything else puts back what was
    // read and resolves to a bare `&`.
    fn do_octothorpe<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        match tokenizer.peek() {
            Some(c @ ('x' | 'X')) => {
                tokenizer.discard_char();
                match tokenizer.peek() {
                    Some(d) if d.is_ascii_hexdigit() => {
                        self.state = Numeric(16);
                        Progress
                    },
                    _ => self.unconsume_numeric(tokenizer, Some(c)),
                }
            },

            Some(d) if d.is_ascii_digit() => {
                self.state = Numeric(10);
                Progress
            },

            _ => self.unconsume_numeric(tokenizer, None),
        }
    }

    fn do_numeric<Source: CharSource>(
        &mut self,
        tokenizer: &mut Tokenizer<Source>,
        base: u32,
    ) -> Status {
        match tokenizer.peek().and_then(|c| c.to_digit(base)) {
            Some(n) => {
                tokenizer.discard_char();
                self.num = self.num.wrapping_mul(base);
                if self.num > 0x10FFFF {
                    // We might overflow, and the character is definitely invalid.
                    // We still parse digits and semicolon, but don't use the result.
                    self.num_too_big = true;
                }
                self.num = self.num.wrapping_add(n);
                Progress
            },

            None => {
                self.state = NumericSemicolon;
                Progress
            },
        }
    }

    fn do_numeric_semicolon<Source: CharSource>(
        &mut self,
        tokenizer: &mut Tokenizer<Source>,
    ) -> Status {
        match tokenizer.peek() {
            Some(';') => tokenizer.discard_char(),
            _ => tokenizer.emit_error(Borrowed(
                "Semicolon missing after numeric character reference",
            )),
        };
        self.finish_numeric(tokenizer)
    }

    fn unconsume_numeric<Source: CharSource>(
        &mut self,
        tokenizer: &mut Tokenizer<Source>,
        hex_marker: Option<char>,
    ) -> Status {
        if let Some(c) = hex_marker {
            tokenizer.unconsume(c);
        }
        tokenizer.unconsume('#');
        tokenizer.emit_error(Borrowed("Numeric character reference without digits"));
        self.finish_none()
    }

    fn finish_numeric<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        let (c, error) = match self.num {
            n if (n > 0x10FFFF) || self.num_too_big => ('\u{fffd}', true),
            0x00 | 0xD800..=0xDFFF => ('\u{fffd}', true),

            0x80..=0x9F => (data::C1_REPLACEMENTS[(self.num - 0x80) as usize], false),

            n => (from_u32(n).unwrap_or('\u{fffd}'), false),
        };

        if error {
            let msg = format_if!(
                tokenizer.opts.exact_errors,
                "Invalid numeric character reference",
                "Invalid numeric character reference value 0x{:06X}",
                self.num
            );
            tokenizer.emit_error(msg);
        }

        self.finish_one(c)
    }

    fn do_named<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        let c = unwrap_or_return!(tokenizer.get_char(), self.finish_named(tokenizer));
        self.name_buf.push_char(c);
        match data::NAMED_ENTITIES.get(&*self.name_buf) {
            // We have either a full match or a prefix of one.
            Some(&m) => {
                if m.0 != 0 {
                    // We have a full match, but there might be a longer one to come.
                    self.name_match = Some((m, self.name_buf.len()));
                }
                // Otherwise we just have a prefix match.
                Progress
            },

            // Can't continue the match.
            None => self.finish_named(tokenizer),
        }
    }

    fn unconsume_name<Source: CharSource>(&self, tokenizer: &mut Tokenizer<Source>, from: usize) {
        for c in self.name_buf[from..].chars().rev() {
            tokenizer.unconsume(c);
        }
    }

    // The name buffer holds the longest prefix of some entity name that we
    // saw, plus the character that broke the match (unless input ended).
    fn finish_named<Source: CharSource>(&mut self, tokenizer: &mut Tokenizer<Source>) -> Status {
        match self.name_match.take() {
            None => {
                let msg = format_if!(
                    tokenizer.opts.exact_errors,
                    "Invalid character reference",
                    "Invalid character reference &{}",
                    self.name_buf
                );
                tokenizer.emit_error(msg);
                self.unconsume_name(tokenizer, 0);
                self.finish_none()
            },

            Some(((c1, c2), len)) => {
                // We have a complete match, but we may have consumed
                // additional characters into self.name_buf, as in
                //
                //     &not    => match for U+00AC
                //     &noti   => valid prefix for &notin
                //     &notit  => can't continue match
                self.unconsume_name(tokenizer, len);
                if !self.name_buf[..len].ends_with(';') {
                    tokenizer.emit_error(Borrowed("Character reference does not end with semicolon"));
                }

                trace!("resolved named character reference &{}", &self.name_buf[..len]);
                let c1 = from_u32(c1).unwrap_or('\u{fffd}');
                match from_u32(c2) {
                    Some(c2) if c2 != '\0' => Done(CharRef {
                        chars: [c1, c2],
                        num_chars: 2,
                    }),
                    _ => self.finish_one(c1),
                }
            },
        }
    }
}
