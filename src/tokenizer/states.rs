// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tokenizer states and the content model flag.
//!
//! This is public for use by the tokenizer tests.  Other library
//! users should not have to care about the states.

use std::cell::Cell;
use std::rc::Rc;

pub use self::AttrValueKind::*;
pub use self::ContentModel::*;
pub use self::DoctypeIdKind::*;
pub use self::State::*;

/// How the tokenizer treats `<` and `&` in text.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum ContentModel {
    /// Ordinary markup.
    Pcdata,
    /// Character references but no tags, except the matching end tag.
    Rcdata,
    /// Neither references nor tags, except the matching end tag.
    Cdata,
    /// Everything up to end of input is text.
    Plaintext,
}

/// The content model flag, shared between the tokenizer and the tree
/// builder. A write from either side is seen by the next read.
#[derive(Clone, Debug)]
pub struct ContentModelFlag(Rc<Cell<ContentModel>>);

impl ContentModelFlag {
    pub fn new(model: ContentModel) -> ContentModelFlag {
        ContentModelFlag(Rc::new(Cell::new(model)))
    }

    pub fn get(&self) -> ContentModel {
        self.0.get()
    }

    pub fn set(&self, model: ContentModel) {
        self.0.set(model)
    }
}

impl Default for ContentModelFlag {
    fn default() -> ContentModelFlag {
        ContentModelFlag::new(Pcdata)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum DoctypeIdKind {
    Public,
    System,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum AttrValueKind {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum State {
    Data,
    TagOpen,
    CloseTagOpen,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValue(AttrValueKind),
    BogusComment,
    MarkupDeclarationOpen,
    Comment,
    CommentDash,
    CommentEnd,
    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    BeforeDoctypeIdentifier(DoctypeIdKind),
    DoctypeIdentifierDoubleQuoted(DoctypeIdKind),
    DoctypeIdentifierSingleQuoted(DoctypeIdKind),
    AfterDoctypeIdentifier(DoctypeIdKind),
    BogusDoctype,
}
