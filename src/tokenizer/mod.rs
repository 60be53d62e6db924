// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML tokenizer.

pub use self::interface::{Attribute, Doctype, EndTag, StartTag, Tag, TagKind};
pub use self::interface::{CharacterTokens, CommentToken, DoctypeToken, ParseError, TagToken};
pub use self::interface::Token;

use self::states::{ContentModel, ContentModelFlag, DoctypeIdKind, Public, System};
use self::states::{Cdata, Pcdata, Rcdata};
use self::states::{DoubleQuoted, SingleQuoted, Unquoted};

use self::char_ref::{CharRef, CharRefTokenizer};

use crate::error::Position;
use crate::input::CharSource;
use crate::tree_builder::tag_sets::void_elements;
use crate::util::str::{is_ascii_whitespace, lower_ascii_letter};
use crate::LocalName;

use std::borrow::Cow::{self, Borrowed};
use std::collections::VecDeque;
use std::mem;

use tendril::StrTendril;

pub mod states;
mod interface;
mod char_ref;

pub enum ProcessResult {
    Continue,
    Done,
}

fn option_push(opt_str: &mut Option<StrTendril>, c: char) {
    match *opt_str {
        Some(ref mut s) => s.push_char(c),
        None => *opt_str = Some(StrTendril::from_char(c)),
    }
}

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    /// Produce detailed error messages, at some performance penalty?
    /// Default: false
    pub exact_errors: bool,

    /// Initial content model. Only the test runner should use a
    /// non-`None` value!
    pub initial_content_model: Option<ContentModel>,

    /// Last start tag.  Only the test runner should use a
    /// non-`None` value!
    pub last_start_tag_name: Option<String>,
}

impl Default for TokenizerOpts {
    fn default() -> TokenizerOpts {
        TokenizerOpts {
            exact_errors: false,
            initial_content_model: None,
            last_start_tag_name: None,
        }
    }
}

/// The HTML tokenizer.
///
/// Tokens are pulled one at a time with [`next_token`](Tokenizer::next_token)
/// or through the `Iterator` impl. The tokenizer never reads past the end
/// of a tag before that tag has been handed out, so a change to the content
/// model flag made in response to a tag applies to the text that follows it.
pub struct Tokenizer<Source> {
    /// Options controlling the behavior of the tokenizer.
    opts: TokenizerOpts,

    /// Where characters come from.
    input: Source,

    /// Content model, shared with whoever drives the tokenizer.
    content_model: ContentModelFlag,

    /// Current state of the state machine.
    state: states::State,

    /// Tokens ready to be handed out, with the position they were produced at.
    pending: VecDeque<(Token, Position)>,

    /// Text not yet turned into a token.
    pending_text: StrTendril,

    /// Position of the start of `pending_text`.
    pending_text_position: Position,

    /// Position of the token most recently handed out.
    position: Position,

    /// Reached the end of input in the data state?
    finished: bool,

    /// The most recently consumed character.
    current_char: char,

    /// Current tag kind.
    current_tag_kind: TagKind,

    /// Current tag name.
    current_tag_name: StrTendril,

    /// Current tag attributes.
    current_tag_attrs: Vec<Attribute>,

    /// Current attribute name.
    current_attr_name: StrTendril,

    /// Current attribute value.
    current_attr_value: StrTendril,

    /// Current comment.
    current_comment: StrTendril,

    /// Current doctype token.
    current_doctype: Doctype,

    /// Last start tag name, for use in checking "appropriate end tag".
    last_start_tag_name: Option<LocalName>,
}

impl<Source: CharSource> Tokenizer<Source> {
    /// Create a new tokenizer reading from `input`.
    pub fn new(input: Source, opts: TokenizerOpts) -> Tokenizer<Source> {
        let content_model =
            ContentModelFlag::new(opts.initial_content_model.unwrap_or(Pcdata));
        let last_start_tag_name = opts.last_start_tag_name.as_deref().map(LocalName::from);
        Tokenizer {
            opts,
            input,
            content_model,
            state: states::Data,
            pending: VecDeque::new(),
            pending_text: StrTendril::new(),
            pending_text_position: Position::default(),
            position: Position::default(),
            finished: false,
            current_char: '\0',
            current_tag_kind: StartTag,
            current_tag_name: StrTendril::new(),
            current_tag_attrs: vec![],
            current_attr_name: StrTendril::new(),
            current_attr_value: StrTendril::new(),
            current_comment: StrTendril::new(),
            current_doctype: Doctype::default(),
            last_start_tag_name,
        }
    }

    /// A handle to the content model flag. Setting it through the handle
    /// affects the next character the tokenizer reads.
    pub fn content_model(&self) -> ContentModelFlag {
        self.content_model.clone()
    }

    /// Position of the token most recently returned by `next_token`.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Produce the next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some((token, position)) = self.pending.pop_front() {
                self.position = position;
                return Some(token);
            }
            if self.finished {
                return None;
            }
            if let ProcessResult::Done = self.step() {
                debug!("tokenizer reached end of input");
                self.finished = true;
                self.flush_text();
            }
        }
    }

    //§ preprocessing-the-input-stream
    fn get_char(&mut self) -> Option<char> {
        let c = self.input.next_char()?;
        self.current_char = c;
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        let c = self.input.next_char()?;
        self.input.push_back(c);
        Some(c)
    }

    fn discard_char(&mut self) {
        let _ = self.input.next_char();
    }

    fn unconsume(&mut self, c: char) {
        self.input.push_back(c);
    }

    // Check if the next characters are an ASCII case-insensitive match for
    // `pat`, which must be non-empty. On a mismatch nothing is consumed.
    fn eat(&mut self, pat: &str) -> bool {
        let mut consumed = Vec::with_capacity(pat.len());
        for expected in pat.chars() {
            match self.input.next_char() {
                Some(c) => {
                    consumed.push(c);
                    if !c.eq_ignore_ascii_case(&expected) {
                        break;
                    }
                },
                None => break,
            }
        }

        if consumed.len() == pat.len() && consumed.iter().zip(pat.chars()).all(|(c, p)| c.eq_ignore_ascii_case(&p)) {
            return true;
        }
        for &c in consumed.iter().rev() {
            self.input.push_back(c);
        }
        false
    }
    //§ END

    fn bad_char_error(&mut self) {
        let msg = format_if!(
            self.opts.exact_errors,
            "Bad character",
            "Saw {} in state {:?}",
            self.current_char,
            self.state
        );
        self.emit_error(msg);
    }

    fn bad_eof_error(&mut self) {
        let msg = format_if!(
            self.opts.exact_errors,
            "Unexpected EOF",
            "Saw EOF in state {:?}",
            self.state
        );
        self.emit_error(msg);
    }

    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            let text = mem::replace(&mut self.pending_text, StrTendril::new());
            self.pending
                .push_back((CharacterTokens(text), self.pending_text_position));
        }
    }

    fn queue(&mut self, token: Token) {
        self.flush_text();
        let position = self.input.position();
        self.pending.push_back((token, position));
    }

    fn emit_char(&mut self, c: char) {
        if self.pending_text.is_empty() {
            self.pending_text_position = self.input.position();
        }
        self.pending_text.push_char(c);
    }

    fn emit_current_tag(&mut self) {
        self.finish_attribute();

        let name = LocalName::from(&*self.current_tag_name);
        self.current_tag_name.clear();

        match self.current_tag_kind {
            StartTag => {
                self.last_start_tag_name = Some(name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.is_empty() {
                    self.emit_error(Borrowed("Attributes on an end tag"));
                    self.current_tag_attrs.clear();
                }
            },
        }

        let token = TagToken(Tag {
            kind: self.current_tag_kind,
            name,
            attrs: mem::take(&mut self.current_tag_attrs),
        });
        self.queue(token);
    }

    fn emit_current_comment(&mut self) {
        let comment = mem::replace(&mut self.current_comment, StrTendril::new());
        self.queue(CommentToken(comment));
    }

    fn discard_tag(&mut self) {
        self.current_tag_name.clear();
        self.current_tag_attrs = vec![];
        self.current_attr_name.clear();
        self.current_attr_value.clear();
    }

    fn create_tag(&mut self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_name.push_char(c);
        self.current_tag_kind = kind;
    }

    // In RCDATA and CDATA, `</` only starts an end tag when the next
    // characters spell the last start tag's name followed by a character
    // that can end a tag name. Nothing is consumed either way.
    fn have_appropriate_end_tag(&mut self) -> bool {
        let name = match self.last_start_tag_name {
            Some(ref name) => name.clone(),
            None => return false,
        };
        let len = name.chars().count();

        let mut consumed = Vec::with_capacity(len + 1);
        while consumed.len() <= len {
            match self.input.next_char() {
                Some(c) => consumed.push(c),
                None => break,
            }
        }
        for &c in consumed.iter().rev() {
            self.input.push_back(c);
        }

        if consumed.len() < len {
            return false;
        }
        let name_matches = consumed[..len]
            .iter()
            .zip(name.chars())
            .all(|(c, n)| c.to_ascii_lowercase() == n);
        let terminated = match consumed.get(len) {
            None => true,
            Some(&c) => is_ascii_whitespace(c) || matches!(c, '>' | '/' | '<'),
        };
        name_matches && terminated
    }

    fn create_attribute(&mut self, c: char) {
        self.finish_attribute();
        self.current_attr_name.push_char(c);
    }

    // Called when leaving the attribute name state. A repeated name is
    // reported here; its value is dropped later in `finish_attribute`.
    fn finish_attribute_name(&mut self) {
        let dup = {
            let name = &*self.current_attr_name;
            self.current_tag_attrs.iter().any(|a| &*a.name == name)
        };
        if dup {
            let msg = format_if!(
                self.opts.exact_errors,
                "Duplicate attribute",
                "Duplicate attribute {}",
                self.current_attr_name
            );
            self.emit_error(msg);
        }
    }

    fn finish_attribute(&mut self) {
        if self.current_attr_name.is_empty() {
            return;
        }

        let name = LocalName::from(&*self.current_attr_name);
        self.current_attr_name.clear();
        let value = mem::replace(&mut self.current_attr_value, StrTendril::new());

        // The first occurrence of a name wins.
        if !self.current_tag_attrs.iter().any(|a| a.name == name) {
            self.current_tag_attrs.push(Attribute { name, value });
        }
    }

    fn process_solidus_in_tag(&mut self) {
        let next = self.peek();
        let name = LocalName::from(&*self.current_tag_name);
        if next == Some('>') && void_elements(&name) {
            trace!("permitted solidus in <{}>", name);
        } else {
            self.bad_char_error();
        }
    }

    fn emit_current_doctype(&mut self) {
        let mut doctype = mem::take(&mut self.current_doctype);
        if doctype.name.as_deref() != Some("HTML") {
            doctype.force_quirks = true;
        }
        self.queue(DoctypeToken(doctype));
    }

    fn doctype_id(&mut self, kind: DoctypeIdKind) -> &mut Option<StrTendril> {
        match kind {
            Public => &mut self.current_doctype.public_id,
            System => &mut self.current_doctype.system_id,
        }
    }

    fn clear_doctype_id(&mut self, kind: DoctypeIdKind) {
        let id = self.doctype_id(kind);
        match *id {
            Some(ref mut s) => s.clear(),
            None => *id = Some(StrTendril::new()),
        }
    }

    fn consume_char_ref(&mut self) {
        let mut tok = CharRefTokenizer::new();
        let char_ref = loop {
            match tok.step(self) {
                char_ref::Progress => (),
                char_ref::Done(char_ref) => break char_ref,
            }
        };
        self.process_char_ref(char_ref);
    }

    fn process_char_ref(&mut self, char_ref: CharRef) {
        let CharRef {
            mut chars,
            mut num_chars,
        } = char_ref;

        if num_chars == 0 {
            chars[0] = '&';
            num_chars = 1;
        }

        for &c in chars.iter().take(num_chars as usize) {
            match self.state {
                states::AttributeValue(_) => self.current_attr_value.push_char(c),
                _ => self.emit_char(c),
            }
        }
    }

    fn emit_error(&mut self, error: Cow<'static, str>) {
        self.queue(ParseError(error));
    }
}
//§ END

// Shorthand for common state machine behaviors.
macro_rules! shorthand (
    ( $me:ident : emit $c:expr                     ) => ( $me.emit_char($c)                                  );
    ( $me:ident : create_tag $kind:ident $c:expr   ) => ( $me.create_tag($kind, $c)                          );
    ( $me:ident : push_tag $c:expr                 ) => ( $me.current_tag_name.push_char($c)                 );
    ( $me:ident : flush_tag                        ) => ( $me.emit_current_tag()                             );
    ( $me:ident : create_attr $c:expr              ) => ( $me.create_attribute($c)                           );
    ( $me:ident : push_name $c:expr                ) => ( $me.current_attr_name.push_char($c)                );
    ( $me:ident : finish_name                      ) => ( $me.finish_attribute_name()                        );
    ( $me:ident : push_value $c:expr               ) => ( $me.current_attr_value.push_char($c)               );
    ( $me:ident : solidus                          ) => ( $me.process_solidus_in_tag()                       );
    ( $me:ident : push_comment $c:expr             ) => ( $me.current_comment.push_char($c)                  );
    ( $me:ident : append_comment $c:expr           ) => ( $me.current_comment.push_slice($c)                 );
    ( $me:ident : emit_comment                     ) => ( $me.emit_current_comment()                         );
    ( $me:ident : clear_comment                    ) => ( $me.current_comment.clear()                        );
    ( $me:ident : create_doctype                   ) => ( $me.current_doctype = Doctype::default()           );
    ( $me:ident : push_doctype_name $c:expr        ) => ( option_push(&mut $me.current_doctype.name, $c)     );
    ( $me:ident : push_doctype_id $k:ident $c:expr ) => ( option_push($me.doctype_id($k), $c)                );
    ( $me:ident : clear_doctype_id $k:ident        ) => ( $me.clear_doctype_id($k)                           );
    ( $me:ident : force_quirks                     ) => ( $me.current_doctype.force_quirks = true            );
    ( $me:ident : emit_doctype                     ) => ( $me.emit_current_doctype()                         );
    ( $me:ident : error                            ) => ( $me.bad_char_error()                               );
    ( $me:ident : error_eof                        ) => ( $me.bad_eof_error()                                );
);

// A little DSL for sequencing shorthand actions.
macro_rules! go (
    // A pattern like $($cmd:tt)* ; $($rest:tt)* causes parse ambiguity.
    // We have to tell the parser how much lookahead we need.

    ( $me:ident : $a:tt                   ; $($rest:tt)* ) => ({ shorthand!($me: $a);          go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt             ; $($rest:tt)* ) => ({ shorthand!($me: $a $b);       go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt       ; $($rest:tt)* ) => ({ shorthand!($me: $a $b $c);    go!($me: $($rest)*); });

    // These can only come at the end.

    ( $me:ident : to $s:ident                    ) => ({ $me.state = states::$s; return ProcessResult::Continue;      });
    ( $me:ident : to $s:ident $k1:expr           ) => ({ $me.state = states::$s($k1); return ProcessResult::Continue; });

    ( $me:ident : reconsume $s:ident             ) => ({ $me.unconsume($me.current_char); go!($me: to $s);            });
    ( $me:ident : reconsume $s:ident $k1:expr    ) => ({ $me.unconsume($me.current_char); go!($me: to $s $k1);        });

    ( $me:ident : consume_char_ref               ) => ({ $me.consume_char_ref(); return ProcessResult::Continue;      });

    ( $me:ident : emit_tag $s:ident ) => ({
        $me.state = states::$s;
        $me.emit_current_tag();
        return ProcessResult::Continue;
    });

    ( $me:ident : eof ) => ({ return ProcessResult::Done; });

    // If nothing else matched, it's a single command
    ( $me:ident : $($cmd:tt)+ ) => ( shorthand!($me: $($cmd)+) );

    // or nothing.
    ( $me:ident : ) => (());
);

// This is a macro because it can cause early return
// from the function where it is used.
macro_rules! get_char ( ($me:expr) => (
    unwrap_or_return!($me.get_char(), $me.eof_step())
));

impl<Source: CharSource> Tokenizer<Source> {
    // Run the state machine for one transition.
    fn step(&mut self) -> ProcessResult {
        match self.state {
            //§ data-state
            states::Data => {
                let c = get_char!(self);
                match (c, self.content_model.get()) {
                    ('&', Pcdata | Rcdata) => go!(self: consume_char_ref),
                    ('<', Pcdata | Rcdata | Cdata) => go!(self: to TagOpen),
                    (c, _) => go!(self: emit c; to Data),
                }
            },

            //§ tag-open-state
            states::TagOpen => {
                let c = get_char!(self);
                match self.content_model.get() {
                    Rcdata | Cdata => match c {
                        '/' => go!(self: to CloseTagOpen),
                        _ => go!(self: emit '<'; reconsume Data),
                    },
                    _ => match c {
                        '!' => go!(self: to MarkupDeclarationOpen),
                        '/' => go!(self: to CloseTagOpen),
                        '>' => go!(self: error; emit '<'; emit '>'; to Data),
                        '?' => go!(self: error; clear_comment; reconsume BogusComment),
                        c => match lower_ascii_letter(c) {
                            Some(cl) => go!(self: create_tag StartTag cl; to TagName),
                            None => go!(self: error; emit '<'; reconsume Data),
                        },
                    },
                }
            },

            //§ close-tag-open-state
            states::CloseTagOpen => {
                if matches!(self.content_model.get(), Rcdata | Cdata) {
                    if !self.have_appropriate_end_tag() {
                        go!(self: error; emit '<'; emit '/'; to Data);
                    }
                    debug!("end tag closes the raw text element; back to PCDATA");
                    self.content_model.set(Pcdata);
                }

                let c = get_char!(self);
                match c {
                    '>' => go!(self: error; to Data),
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag EndTag cl; to TagName),
                        None => go!(self: error; clear_comment; reconsume BogusComment),
                    },
                }
            },

            //§ tag-name-state
            states::TagName => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    '/' => go!(self: solidus; to BeforeAttributeName),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeAttributeName),
                    c => go!(self: push_tag (c.to_ascii_lowercase()); to TagName),
                }
            },

            //§ before-attribute-name-state
            states::BeforeAttributeName => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    '/' => go!(self: solidus; to BeforeAttributeName),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeAttributeName),
                    c => go!(self: create_attr (c.to_ascii_lowercase()); to AttributeName),
                }
            },

            //§ attribute-name-state
            states::AttributeName => {
                let c = get_char!(self);
                match c {
                    '=' => go!(self: finish_name; to BeforeAttributeValue),
                    '>' => go!(self: finish_name; emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    '/' => go!(self: solidus; finish_name; to BeforeAttributeName),
                    c if is_ascii_whitespace(c) => go!(self: finish_name; to AfterAttributeName),
                    c => go!(self: push_name (c.to_ascii_lowercase()); to AttributeName),
                }
            },

            //§ after-attribute-name-state
            states::AfterAttributeName => {
                let c = get_char!(self);
                match c {
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    '/' => go!(self: solidus; to BeforeAttributeName),
                    c if is_ascii_whitespace(c) => go!(self: to AfterAttributeName),
                    c => go!(self: create_attr (c.to_ascii_lowercase()); to AttributeName),
                }
            },

            //§ before-attribute-value-state
            states::BeforeAttributeValue => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: to AttributeValue DoubleQuoted),
                    '\'' => go!(self: to AttributeValue SingleQuoted),
                    '&' => go!(self: reconsume AttributeValue Unquoted),
                    '>' => go!(self: emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeAttributeValue),
                    c => go!(self: push_value c; to AttributeValue Unquoted),
                }
            },

            //§ attribute-value-(double-quoted)-state
            states::AttributeValue(DoubleQuoted) => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: to BeforeAttributeName),
                    '&' => go!(self: consume_char_ref),
                    c => go!(self: push_value c; to AttributeValue DoubleQuoted),
                }
            },

            //§ attribute-value-(single-quoted)-state
            states::AttributeValue(SingleQuoted) => {
                let c = get_char!(self);
                match c {
                    '\'' => go!(self: to BeforeAttributeName),
                    '&' => go!(self: consume_char_ref),
                    c => go!(self: push_value c; to AttributeValue SingleQuoted),
                }
            },

            //§ attribute-value-(unquoted)-state
            states::AttributeValue(Unquoted) => {
                let c = get_char!(self);
                match c {
                    '&' => go!(self: consume_char_ref),
                    '>' => go!(self: emit_tag Data),
                    '<' => go!(self: flush_tag; error; reconsume Data),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeAttributeName),
                    c => go!(self: push_value c; to AttributeValue Unquoted),
                }
            },

            //§ bogus-comment-state
            states::BogusComment => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_comment; to Data),
                    c => go!(self: push_comment c; to BogusComment),
                }
            },

            //§ markup-declaration-open-state
            states::MarkupDeclarationOpen => {
                if self.eat("--") {
                    go!(self: clear_comment; to Comment);
                } else if self.eat("doctype") {
                    go!(self: create_doctype; to Doctype);
                } else {
                    self.emit_error(Borrowed("Expected comment or DOCTYPE"));
                    go!(self: clear_comment; to BogusComment);
                }
            },

            //§ comment-state
            states::Comment => {
                let c = get_char!(self);
                match c {
                    '-' => go!(self: to CommentDash),
                    c => go!(self: push_comment c; to Comment),
                }
            },

            //§ comment-dash-state
            states::CommentDash => {
                let c = get_char!(self);
                match c {
                    '-' => go!(self: to CommentEnd),
                    c => go!(self: push_comment '-'; push_comment c; to Comment),
                }
            },

            //§ comment-end-state
            states::CommentEnd => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_comment; to Data),
                    '-' => go!(self: error; push_comment '-'; to CommentEnd),
                    c => go!(self: error; append_comment "--"; push_comment c; to Comment),
                }
            },

            //§ doctype-state
            states::Doctype => {
                let c = get_char!(self);
                match c {
                    c if is_ascii_whitespace(c) => go!(self: to BeforeDoctypeName),
                    _ => go!(self: error; reconsume BeforeDoctypeName),
                }
            },

            //§ before-doctype-name-state
            states::BeforeDoctypeName => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: error; emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeDoctypeName),
                    c => go!(self: push_doctype_name (c.to_ascii_uppercase()); to DoctypeName),
                }
            },

            //§ doctype-name-state
            states::DoctypeName => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to AfterDoctypeName),
                    c => go!(self: push_doctype_name (c.to_ascii_uppercase()); to DoctypeName),
                }
            },

            //§ after-doctype-name-state
            states::AfterDoctypeName => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to AfterDoctypeName),
                    c => {
                        self.unconsume(c);
                        if self.eat("public") {
                            go!(self: to BeforeDoctypeIdentifier Public);
                        } else if self.eat("system") {
                            go!(self: to BeforeDoctypeIdentifier System);
                        } else {
                            go!(self: error; force_quirks; to BogusDoctype);
                        }
                    },
                }
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            states::BeforeDoctypeIdentifier(kind) => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: clear_doctype_id kind; to DoctypeIdentifierDoubleQuoted kind),
                    '\'' => go!(self: clear_doctype_id kind; to DoctypeIdentifierSingleQuoted kind),
                    '>' => go!(self: error; force_quirks; emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to BeforeDoctypeIdentifier kind),
                    _ => go!(self: error; force_quirks; to BogusDoctype),
                }
            },

            //§ doctype-public-identifier-(double-quoted)-state doctype-system-identifier-(double-quoted)-state
            states::DoctypeIdentifierDoubleQuoted(kind) => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: to AfterDoctypeIdentifier kind),
                    '>' => go!(self: error; force_quirks; emit_doctype; to Data),
                    c => go!(self: push_doctype_id kind c; to DoctypeIdentifierDoubleQuoted kind),
                }
            },

            //§ doctype-public-identifier-(single-quoted)-state doctype-system-identifier-(single-quoted)-state
            states::DoctypeIdentifierSingleQuoted(kind) => {
                let c = get_char!(self);
                match c {
                    '\'' => go!(self: to AfterDoctypeIdentifier kind),
                    '>' => go!(self: error; force_quirks; emit_doctype; to Data),
                    c => go!(self: push_doctype_id kind c; to DoctypeIdentifierSingleQuoted kind),
                }
            },

            //§ after-doctype-public-identifier-state
            states::AfterDoctypeIdentifier(Public) => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: clear_doctype_id System; to DoctypeIdentifierDoubleQuoted System),
                    '\'' => go!(self: clear_doctype_id System; to DoctypeIdentifierSingleQuoted System),
                    '>' => go!(self: emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to AfterDoctypeIdentifier Public),
                    _ => go!(self: error; force_quirks; to BogusDoctype),
                }
            },

            //§ after-doctype-system-identifier-state
            states::AfterDoctypeIdentifier(System) => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_doctype; to Data),
                    c if is_ascii_whitespace(c) => go!(self: to AfterDoctypeIdentifier System),
                    _ => go!(self: error; to BogusDoctype),
                }
            },

            //§ bogus-doctype-state
            states::BogusDoctype => {
                let c = get_char!(self);
                match c {
                    '>' => go!(self: emit_doctype; to Data),
                    _ => go!(self: to BogusDoctype),
                }
            },
            //§ END
        }
    }

    // Handle end of input in the current state. Constructs in progress are
    // emitted as they stand, usually with an error.
    fn eof_step(&mut self) -> ProcessResult {
        debug!("processing EOF in state {:?}", self.state);
        match self.state {
            states::Data => go!(self: eof),

            states::TagOpen => {
                if self.content_model.get() == Pcdata {
                    go!(self: error_eof);
                }
                go!(self: emit '<'; to Data);
            },

            states::CloseTagOpen => go!(self: error_eof; emit '<'; emit '/'; to Data),

            states::TagName
            | states::BeforeAttributeName
            | states::AttributeName
            | states::AfterAttributeName
            | states::BeforeAttributeValue
            | states::AttributeValue(_) => go!(self: flush_tag; error_eof; to Data),

            states::BogusComment => go!(self: emit_comment; to Data),

            states::MarkupDeclarationOpen => go!(self: error_eof; to BogusComment),

            states::Comment | states::CommentDash | states::CommentEnd => {
                go!(self: emit_comment; error_eof; to Data)
            },

            states::Doctype | states::BeforeDoctypeName => {
                go!(self: force_quirks; emit_doctype; error_eof; to Data)
            },

            states::DoctypeName
            | states::AfterDoctypeName
            | states::BeforeDoctypeIdentifier(_)
            | states::DoctypeIdentifierDoubleQuoted(_)
            | states::DoctypeIdentifierSingleQuoted(_)
            | states::AfterDoctypeIdentifier(_)
            | states::BogusDoctype => go!(self: force_quirks; emit_doctype; error_eof; to Data),
        }
    }
}

impl<Source: CharSource> Iterator for Tokenizer<Source> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::states::{Cdata, Rcdata};
    use super::{Attribute, Doctype, EndTag, StartTag, Tag, Token, Tokenizer, TokenizerOpts};
    use super::{CharacterTokens, CommentToken, DoctypeToken, ParseError, TagToken};
    use crate::error::Position;
    use crate::input::StringInput;
    use crate::LocalName;

    use tendril::StrTendril;

    fn tokenize_with(input: &str, opts: TokenizerOpts) -> Vec<Token> {
        Tokenizer::new(StringInput::from(input), opts).collect()
    }

    fn tokenize(input: &str) -> Vec<Token> {
        tokenize_with(input, TokenizerOpts::default())
    }

    fn chars(s: &str) -> Token {
        CharacterTokens(StrTendril::from_slice(s))
    }

    fn tag(kind: super::TagKind, name: &str, attrs: &[(&str, &str)]) -> Token {
        TagToken(Tag {
            kind,
            name: LocalName::from(name),
            attrs: attrs
                .iter()
                .map(|&(n, v)| Attribute {
                    name: LocalName::from(n),
                    value: StrTendril::from_slice(v),
                })
                .collect(),
        })
    }

    fn is_error(token: &Token) -> bool {
        matches!(*token, ParseError(_))
    }

    // Drop errors and join the character runs they split.
    fn without_errors(tokens: Vec<Token>) -> Vec<Token> {
        let mut out: Vec<Token> = vec![];
        for token in tokens.into_iter().filter(|t| !is_error(t)) {
            if let (Some(CharacterTokens(prev)), CharacterTokens(s)) = (out.last_mut(), &token) {
                prev.push_tendril(s);
                continue;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn simple_tags_and_text() {
        assert_eq!(
            tokenize("<p class=x>Hi</P>"),
            vec![
                tag(StartTag, "p", &[("class", "x")]),
                chars("Hi"),
                tag(EndTag, "p", &[]),
            ]
        );
    }

    #[test]
    fn duplicate_attribute_keeps_first_value() {
        let tokens = tokenize("<a href=1 href=2>");
        assert_eq!(tokens.len(), 2);
        assert!(is_error(&tokens[0]));
        assert_eq!(tokens[1], tag(StartTag, "a", &[("href", "1")]));
    }

    #[test]
    fn invalid_hex_reference_is_literal() {
        let tokens = tokenize("&#xzz;");
        assert_eq!(tokens.iter().filter(|t| is_error(t)).count(), 1);
        assert_eq!(without_errors(tokens), vec![chars("&#xzz;")]);
    }

    #[test]
    fn numeric_references() {
        assert_eq!(tokenize("&#65;&#x42;"), vec![chars("AB")]);
        assert_eq!(tokenize("&#128;"), vec![chars("\u{20ac}")]);

        let tokens = tokenize("&#0;");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1], chars("\u{fffd}"));

        let tokens = tokenize("&#65x");
        assert!(is_error(&tokens[0]));
        assert_eq!(without_errors(tokens), vec![chars("Ax")]);
    }

    #[test]
    fn named_references_take_longest_match() {
        assert_eq!(tokenize("&amp;&lt;"), vec![chars("&<")]);
        assert_eq!(tokenize("&notin;"), vec![chars("\u{2209}")]);

        let tokens = tokenize("&notit;");
        assert_eq!(tokens.iter().filter(|t| is_error(t)).count(), 1);
        assert_eq!(without_errors(tokens), vec![chars("\u{ac}it;")]);
    }

    #[test]
    fn unknown_named_reference_is_literal() {
        let tokens = tokenize("&bogus;");
        assert_eq!(tokens.iter().filter(|t| is_error(t)).count(), 1);
        assert_eq!(without_errors(tokens), vec![chars("&bogus;")]);
    }

    #[test]
    fn bare_ampersand_is_not_an_error() {
        assert_eq!(tokenize("a & b"), vec![chars("a & b")]);
    }

    #[test]
    fn reference_in_attribute_value() {
        assert_eq!(
            tokenize("<a title='x&amp;y'>"),
            vec![tag(StartTag, "a", &[("title", "x&y")])]
        );
    }

    #[test]
    fn end_tag_attributes_are_dropped() {
        let tokens = tokenize("</p class=x>");
        assert!(is_error(&tokens[0]));
        assert_eq!(tokens[1], tag(EndTag, "p", &[]));
    }

    #[test]
    fn solidus_allowed_only_in_void_elements() {
        assert_eq!(tokenize("<br/>"), vec![tag(StartTag, "br", &[])]);

        let tokens = tokenize("<div/>");
        assert!(is_error(&tokens[0]));
        assert_eq!(tokens[1], tag(StartTag, "div", &[]));
    }

    #[test]
    fn eof_inside_tag_flushes_it() {
        let tokens = tokenize("<div id=a");
        assert_eq!(tokens[0], tag(StartTag, "div", &[("id", "a")]));
        assert!(is_error(&tokens[1]));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn lone_less_than() {
        let tokens = tokenize("a <3");
        assert_eq!(without_errors(tokens), vec![chars("a <3")]);
    }

    #[test]
    fn comments() {
        assert_eq!(
            tokenize("<!-- hi -->"),
            vec![CommentToken(StrTendril::from_slice(" hi "))]
        );

        let tokens = tokenize("<!-- a -- b -->");
        assert_eq!(tokens.iter().filter(|t| is_error(t)).count(), 1);
        assert_eq!(
            without_errors(tokens),
            vec![CommentToken(StrTendril::from_slice(" a -- b "))]
        );

        let tokens = tokenize("<?php x ?>");
        assert_eq!(
            without_errors(tokens),
            vec![CommentToken(StrTendril::from_slice("?php x ?"))]
        );
    }

    #[test]
    fn doctype() {
        assert_eq!(
            tokenize("<!DOCTYPE html>"),
            vec![DoctypeToken(Doctype {
                name: Some(StrTendril::from_slice("HTML")),
                public_id: None,
                system_id: None,
                force_quirks: false,
            })]
        );

        assert_eq!(
            tokenize(r#"<!doctype html public "-//W3C//DTD HTML 4.01//EN" 'x.dtd'>"#),
            vec![DoctypeToken(Doctype {
                name: Some(StrTendril::from_slice("HTML")),
                public_id: Some(StrTendril::from_slice("-//W3C//DTD HTML 4.01//EN")),
                system_id: Some(StrTendril::from_slice("x.dtd")),
                force_quirks: false,
            })]
        );

        match tokenize("<!DOCTYPE foo>").pop() {
            Some(DoctypeToken(d)) => assert!(d.force_quirks),
            t => panic!("expected a doctype, got {:?}", t),
        }
    }

    #[test]
    fn rcdata_ends_only_at_matching_tag() {
        let opts = TokenizerOpts {
            initial_content_model: Some(Rcdata),
            last_start_tag_name: Some("title".to_string()),
            ..Default::default()
        };
        let tokens = tokenize_with("a<b>&amp;</tit</title>", opts);
        assert_eq!(tokens.iter().filter(|t| is_error(t)).count(), 1);
        assert_eq!(
            without_errors(tokens),
            vec![chars("a<b>&</tit"), tag(EndTag, "title", &[])]
        );
    }

    #[test]
    fn cdata_does_not_expand_references() {
        let opts = TokenizerOpts {
            initial_content_model: Some(Cdata),
            last_start_tag_name: Some("style".to_string()),
            ..Default::default()
        };
        assert_eq!(
            tokenize_with("&amp;</STYLE >", opts),
            vec![chars("&amp;"), tag(EndTag, "style", &[])]
        );
    }

    #[test]
    fn character_tokens_reassemble_text() {
        let input = "one\r\ntwo\rthree <b>four</b>";
        let text: String = tokenize(input)
            .into_iter()
            .filter_map(|t| match t {
                CharacterTokens(s) => Some(s.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "one\ntwo\nthree four");
    }

    #[test]
    fn tokens_carry_positions() {
        let mut tok = Tokenizer::new(StringInput::from("ab\n<p>"), TokenizerOpts::default());
        assert_eq!(tok.next_token(), Some(chars("ab\n")));
        assert_eq!(tok.position(), Position::new(1, 1));
        assert_eq!(tok.next_token(), Some(tag(StartTag, "p", &[])));
        assert_eq!(tok.position(), Position::new(2, 3));
        assert_eq!(tok.next_token(), None);
    }
}
