// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML tree builder.

pub use self::interface::{AppendNode, AppendText, NodeOrText, TreeSink};

use self::types::*;

use crate::error::{ParseError, Position};
use crate::tokenizer;
use crate::tokenizer::states::{Cdata, ContentModel, ContentModelFlag, Pcdata, Plaintext, Rcdata};
use crate::tokenizer::{Attribute, Doctype, Tag};
use crate::util::str::is_ascii_whitespace;
use crate::LocalName;

use std::borrow::Cow::{self, Borrowed};
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::iter::{Enumerate, Rev};
use std::{fmt, slice};

use tendril::StrTendril;

use self::tag_sets::*;

#[macro_use]
pub mod tag_sets;

mod interface;
mod rules;
mod types;

/// Tree builder options, with an impl for Default.
#[derive(Copy, Clone, Debug, Default)]
pub struct TreeBuilderOpts {
    /// Format parse error messages with the offending token and the
    /// insertion mode? Default: false
    pub exact_errors: bool,

    /// Treat the first parse error as fatal? The error is still reported
    /// to the sink, and kept for [`TreeBuilder::take_fatal_error`].
    /// Default: false
    pub strict: bool,
}

/// The HTML tree builder.
pub struct TreeBuilder<Handle, Sink> {
    /// Options controlling the behavior of the tree builder.
    opts: TreeBuilderOpts,

    /// Consumer of tree modifications.
    pub sink: Sink,

    /// Insertion mode.
    mode: Cell<InsertionMode>,

    /// The mode that saw `</html>`, resumed when content follows it.
    last_mode: Cell<InsertionMode>,

    /// The document node, which is created by the sink.
    doc_handle: Handle,

    /// Stack of open elements, most recently added at end.
    open_elems: RefCell<Vec<Handle>>,

    /// List of active formatting elements.
    active_formatting: RefCell<Vec<FormatEntry<Handle>>>,

    /// Head element pointer.
    head_elem: RefCell<Option<Handle>>,

    /// Form element pointer.
    form_elem: RefCell<Option<Handle>>,

    /// Is foster parenting enabled?
    foster_parenting: Cell<bool>,

    /// Name of the context element for the fragment parsing algorithm.
    context_elem: Option<LocalName>,

    /// Content model flag, shared with the tokenizer.
    content_model: ContentModelFlag,

    /// Position of the token being processed.
    current_position: Cell<Position>,

    /// First parse error, kept in strict mode.
    fatal_error: RefCell<Option<ParseError>>,
}

/// The content model the tokenizer starts in when parsing a fragment
/// inside an element with this name.
pub fn content_model_for_context(name: &LocalName) -> ContentModel {
    match *name {
        local_name!("title") | local_name!("textarea") => Rcdata,
        local_name!("style")
        | local_name!("script")
        | local_name!("xmp")
        | local_name!("iframe")
        | local_name!("noembed")
        | local_name!("noframes") => Cdata,
        local_name!("plaintext") => Plaintext,
        _ => Pcdata,
    }
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Create a new tree builder which sends tree modifications to a particular `TreeSink`.
    ///
    /// `content_model` is the tokenizer's flag; start tags for raw text
    /// elements switch it.
    pub fn new(
        sink: Sink,
        content_model: ContentModelFlag,
        opts: TreeBuilderOpts,
    ) -> TreeBuilder<Handle, Sink> {
        let doc_handle = sink.get_document();
        TreeBuilder {
            opts,
            sink,
            mode: Cell::new(InsertionMode::Initial),
            last_mode: Cell::new(InsertionMode::AfterBody),
            doc_handle,
            open_elems: Default::default(),
            active_formatting: Default::default(),
            head_elem: Default::default(),
            form_elem: Default::default(),
            foster_parenting: Default::default(),
            context_elem: None,
            content_model,
            current_position: Cell::new(Position::default()),
            fatal_error: Default::default(),
        }
    }

    /// Create a new tree builder which sends tree modifications to a particular `TreeSink`.
    /// This is for parsing fragments inside an element named `context`.
    ///
    /// The root `html` element is created right away, and the content model
    /// is set from the context element.
    pub fn new_for_fragment(
        sink: Sink,
        context: LocalName,
        content_model: ContentModelFlag,
        opts: TreeBuilderOpts,
    ) -> TreeBuilder<Handle, Sink> {
        let mut tb = TreeBuilder::new(sink, content_model, opts);
        tb.context_elem = Some(context);

        tb.create_root(vec![]);
        tb.mode.set(tb.reset_insertion_mode());
        if let Some(ref context) = tb.context_elem {
            tb.content_model.set(content_model_for_context(context));
        }

        tb
    }

    /// Are we parsing a HTML fragment?
    pub fn is_fragment(&self) -> bool {
        self.context_elem.is_some()
    }

    /// The first parse error, if strict mode is on and an error was seen.
    pub fn take_fatal_error(&self) -> Option<ParseError> {
        self.fatal_error.borrow_mut().take()
    }

    /// Process one token from the tokenizer. `position` is where the
    /// tokenizer produced it, and stamps any parse error it causes.
    pub fn process_token(&self, token: tokenizer::Token, position: Position) {
        self.current_position.set(position);

        // Handle `ParseError` and `DoctypeToken`; convert everything else to the local `Token` type.
        let token = match token {
            tokenizer::ParseError(e) => {
                self.parse_error(e);
                return;
            },

            tokenizer::DoctypeToken(dt) => {
                if self.mode.get() == InsertionMode::Initial {
                    let Doctype {
                        name,
                        public_id,
                        system_id,
                        force_quirks,
                    } = dt;
                    self.sink.append_doctype_to_document(
                        name.unwrap_or_default(),
                        public_id.unwrap_or_default(),
                        system_id.unwrap_or_default(),
                        force_quirks,
                    );
                    self.mode.set(InsertionMode::BeforeHtml);
                } else {
                    let msg = format_if!(
                        self.opts.exact_errors,
                        "DOCTYPE in body",
                        "DOCTYPE in insertion mode {:?}",
                        self.mode.get()
                    );
                    self.parse_error(msg);
                }
                return;
            },

            tokenizer::TagToken(x) => Token::Tag(x),
            tokenizer::CommentToken(x) => Token::Comment(x),

            tokenizer::CharacterTokens(x) => {
                if x.is_empty() {
                    return;
                }
                Token::Characters(SplitStatus::NotSplit, x)
            },
        };

        self.process_to_completion(token);
    }

    /// Signal the end of input. `position` is where the input ended.
    pub fn end(&self, position: Position) {
        self.current_position.set(position);
        self.process_to_completion(Token::Eof);
    }

    fn debug_step(&self, mode: InsertionMode, token: &Token) {
        debug!("processing {:?} in insertion mode {:?}", token, mode);
    }

    fn process_to_completion(&self, mut token: Token) {
        // Queue of additional tokens yet to be processed.
        // This stays empty in the common case where we don't split whitespace.
        let mut more_tokens = VecDeque::new();

        loop {
            let mode = self.mode.get();
            match self.step(mode, token) {
                ProcessResult::Done => {
                    let Some(new_token) = more_tokens.pop_front() else {
                        return;
                    };
                    token = new_token;
                },
                ProcessResult::Reprocess(m, t) => {
                    self.mode.set(m);
                    token = t;
                },
                ProcessResult::SplitWhitespace(mut buf) => {
                    let Some((first, is_ws)) = buf.pop_front_char_run(is_ascii_whitespace) else {
                        let Some(new_token) = more_tokens.pop_front() else {
                            return;
                        };
                        token = new_token;
                        continue;
                    };
                    let status = if is_ws {
                        SplitStatus::Whitespace
                    } else {
                        SplitStatus::NotWhitespace
                    };
                    token = Token::Characters(status, first);

                    if buf.len32() > 0 {
                        more_tokens.push_back(Token::Characters(SplitStatus::NotSplit, buf));
                    }
                },
            }
        }
    }

    fn parse_error(&self, message: Cow<'static, str>) {
        let error = ParseError::new(self.current_position.get(), message);
        if self.opts.strict {
            let mut fatal = self.fatal_error.borrow_mut();
            if fatal.is_none() {
                *fatal = Some(error.clone());
            }
        }
        self.sink.parse_error(error);
    }

    /// The appropriate place for inserting a node: the current node, unless
    /// foster parenting applies.
    fn appropriate_place_for_insertion(&self) -> InsertionPoint<Handle> {
        let target = self.current_node();
        if !(self.foster_parenting.get() && self.elem_in(&target, table_outer)) {
            return InsertionPoint::LastChild(target);
        }

        // Foster parenting
        let open_elems = self.open_elems.borrow();
        let mut iter = open_elems.iter().rev().peekable();
        while let Some(elem) = iter.next() {
            if self.html_elem_named(elem, local_name!("table")) {
                trace!("foster parenting around the innermost open table");
                let prev_element = (*iter.peek().expect("table is the root element")).clone();
                return InsertionPoint::TableFosterParenting {
                    element: elem.clone(),
                    prev_element,
                };
            }
        }
        trace!("foster parenting without an open table");
        InsertionPoint::LastChild(open_elems[0].clone())
    }

    fn insert_at(&self, insertion_point: InsertionPoint<Handle>, child: NodeOrText<Handle>) {
        match insertion_point {
            InsertionPoint::LastChild(parent) => self.sink.append(&parent, child),
            InsertionPoint::TableFosterParenting {
                element,
                prev_element,
            } => self
                .sink
                .append_based_on_parent_node(&element, &prev_element, child),
        }
    }
}

struct ActiveFormattingView<'a, Handle: 'a> {
    data: Ref<'a, Vec<FormatEntry<Handle>>>,
}

impl<'a, Handle: 'a> ActiveFormattingView<'a, Handle> {
    fn iter(&'a self) -> impl Iterator<Item = (usize, &'a Handle, &'a Tag)> + 'a {
        ActiveFormattingIter {
            iter: self.data.iter().enumerate().rev(),
        }
    }
}

struct ActiveFormattingIter<'a, Handle: 'a> {
    iter: Rev<Enumerate<slice::Iter<'a, FormatEntry<Handle>>>>,
}

impl<'a, Handle> Iterator for ActiveFormattingIter<'a, Handle> {
    type Item = (usize, &'a Handle, &'a Tag);
    fn next(&mut self) -> Option<(usize, &'a Handle, &'a Tag)> {
        match self.iter.next() {
            None | Some((_, &FormatEntry::Marker)) => None,
            Some((i, FormatEntry::Element(h, t))) => Some((i, h, t)),
        }
    }
}

enum PushFlag {
    Push,
    NoPush,
}

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    fn unexpected<T: fmt::Debug>(&self, thing: &T) -> ProcessResult {
        let msg = format_if!(
            self.opts.exact_errors,
            "Unexpected token",
            "Unexpected token {:?} in insertion mode {:?}",
            thing,
            self.mode.get()
        );
        self.parse_error(msg);
        ProcessResult::Done
    }

    fn set_content_model(&self, model: ContentModel) {
        debug!("switching content model to {:?}", model);
        self.content_model.set(model);
    }

    /// Iterate over the active formatting elements (with index in the list) from the end
    /// to the last marker, or the beginning if there are no markers.
    fn active_formatting_end_to_marker(&self) -> ActiveFormattingView<'_, Handle> {
        ActiveFormattingView {
            data: self.active_formatting.borrow(),
        }
    }

    fn position_in_active_formatting(&self, element: &Handle) -> Option<usize> {
        self.active_formatting
            .borrow()
            .iter()
            .position(|n| match n {
                FormatEntry::Marker => false,
                FormatEntry::Element(ref handle, _) => self.sink.same_node(handle, element),
            })
    }

    fn current_node(&self) -> Handle {
        self.open_elems
            .borrow()
            .last()
            .expect("no current element")
            .clone()
    }

    fn current_node_in<TagSet>(&self, set: TagSet) -> bool
    where
        TagSet: Fn(&LocalName) -> bool,
    {
        set(&self.sink.elem_name(&self.current_node()))
    }

    fn current_node_named(&self, name: LocalName) -> bool {
        self.html_elem_named(&self.current_node(), name)
    }

    fn elem_in<TagSet>(&self, elem: &Handle, set: TagSet) -> bool
    where
        TagSet: Fn(&LocalName) -> bool,
    {
        set(&self.sink.elem_name(elem))
    }

    fn html_elem_named(&self, elem: &Handle, name: LocalName) -> bool {
        self.sink.elem_name(elem) == name
    }

    // Insert at the "appropriate place for inserting a node".
    fn insert_appropriately(&self, child: NodeOrText<Handle>) {
        let insertion_point = self.appropriate_place_for_insertion();
        self.insert_at(insertion_point, child);
    }

    /// Close the formatting element named `subject`, moving the blocks
    /// opened inside it out from under it. Repeats until the element is
    /// gone from the list of active formatting elements or out of scope.
    fn adoption_agency(&self, subject: LocalName) {
        loop {
            // We clone the Handle and Tag so they don't cause an immutable borrow of self.
            let maybe_fmt_entry = self
                .active_formatting_end_to_marker()
                .iter()
                .find(|&(_, _, tag)| tag.name == subject)
                .map(|(i, h, t)| (i, h.clone(), t.clone()));

            let Some((fmt_elem_index, fmt_elem, fmt_elem_tag)) = maybe_fmt_entry else {
                let msg = format_if!(
                    self.opts.exact_errors,
                    "No formatting element to close",
                    "No formatting element to close for </{}>",
                    subject
                );
                self.parse_error(msg);
                return;
            };

            let Some(fmt_elem_stack_index) = self
                .open_elems
                .borrow()
                .iter()
                .rposition(|n| self.sink.same_node(n, &fmt_elem))
            else {
                self.parse_error(Borrowed("Formatting element not open"));
                self.active_formatting.borrow_mut().remove(fmt_elem_index);
                return;
            };

            if !self.element_in_scope(&fmt_elem_tag.name, false) {
                self.parse_error(Borrowed("Formatting element not in scope"));
                return;
            }

            if !self.sink.same_node(&self.current_node(), &fmt_elem) {
                self.parse_error(Borrowed("Formatting element not current node"));
            }

            let maybe_furthest_block = self
                .open_elems
                .borrow()
                .iter()
                .enumerate()
                .skip(fmt_elem_stack_index)
                .find(|&(_, open_element)| self.elem_in(open_element, special_or_scoping))
                .map(|(i, h)| (i, h.clone()));

            let Some((furthest_block_index, furthest_block)) = maybe_furthest_block else {
                self.open_elems.borrow_mut().truncate(fmt_elem_stack_index);
                self.active_formatting.borrow_mut().remove(fmt_elem_index);
                return;
            };

            let common_ancestor = self.open_elems.borrow()[fmt_elem_stack_index - 1].clone();
            self.sink.remove_from_parent(&furthest_block);

            // Where the clone of the formatting element goes in the list of
            // active formatting elements, counted before the original is removed.
            let mut bookmark = fmt_elem_index;

            let mut node_index = furthest_block_index;
            let mut last_node = furthest_block.clone();
            loop {
                node_index -= 1;
                let mut node = self.open_elems.borrow()[node_index].clone();

                // Anything between here and the next formatting element leaves the stack.
                let node_formatting_index = loop {
                    if let Some(index) = self.position_in_active_formatting(&node) {
                        break index;
                    }
                    self.open_elems.borrow_mut().remove(node_index);
                    node_index -= 1;
                    node = self.open_elems.borrow()[node_index].clone();
                };

                if self.sink.same_node(&node, &fmt_elem) {
                    break;
                }

                if self.sink.same_node(&last_node, &furthest_block) {
                    bookmark = node_formatting_index + 1;
                }

                if self.sink.has_child_nodes(&node) {
                    let tag = match self.active_formatting.borrow()[node_formatting_index] {
                        FormatEntry::Element(_, ref t) => t.clone(),
                        FormatEntry::Marker => panic!("Found marker during adoption agency"),
                    };
                    let clone = self.sink.create_element(tag.name.clone(), tag.attrs.clone());
                    self.open_elems.borrow_mut()[node_index] = clone.clone();
                    self.active_formatting.borrow_mut()[node_formatting_index] =
                        FormatEntry::Element(clone.clone(), tag);
                    node = clone;
                }

                self.sink.remove_from_parent(&last_node);
                self.sink.append(&node, AppendNode(last_node));
                last_node = node;
            }

            self.sink.remove_from_parent(&last_node);
            self.sink.append(&common_ancestor, AppendNode(last_node));

            let new_element = self
                .sink
                .create_element(fmt_elem_tag.name.clone(), fmt_elem_tag.attrs.clone());
            self.sink.reparent_children(&furthest_block, &new_element);
            self.sink
                .append(&furthest_block, AppendNode(new_element.clone()));

            let old_index = self
                .position_in_active_formatting(&fmt_elem)
                .expect("formatting element not found in active formatting elements");
            {
                let mut active_formatting = self.active_formatting.borrow_mut();
                active_formatting.remove(old_index);
                let index = bookmark.min(active_formatting.len());
                active_formatting.insert(
                    index,
                    FormatEntry::Element(new_element.clone(), fmt_elem_tag),
                );
            }

            self.remove_from_stack(&fmt_elem);
            let new_furthest_block_index = self
                .open_elems
                .borrow()
                .iter()
                .position(|n| self.sink.same_node(n, &furthest_block))
                .expect("furthest block missing from open element stack");
            self.open_elems
                .borrow_mut()
                .insert(new_furthest_block_index + 1, new_element);
        }
    }

    fn push(&self, elem: &Handle) {
        self.open_elems.borrow_mut().push(elem.clone());
    }

    fn pop(&self) -> Handle {
        self.open_elems
            .borrow_mut()
            .pop()
            .expect("no current element")
    }

    fn remove_from_stack(&self, elem: &Handle) {
        let position = self
            .open_elems
            .borrow()
            .iter()
            .rposition(|x| self.sink.same_node(elem, x));
        if let Some(position) = position {
            self.open_elems.borrow_mut().remove(position);
        }
    }

    fn remove_from_active_formatting(&self, elem: &Handle) {
        if let Some(position) = self.position_in_active_formatting(elem) {
            self.active_formatting.borrow_mut().remove(position);
        }
    }

    fn is_marker_or_open(&self, entry: &FormatEntry<Handle>) -> bool {
        match *entry {
            FormatEntry::Marker => true,
            FormatEntry::Element(ref node, _) => self
                .open_elems
                .borrow()
                .iter()
                .rev()
                .any(|n| self.sink.same_node(n, node)),
        }
    }

    fn reconstruct_active_formatting_elements(&self) {
        {
            let active_formatting = self.active_formatting.borrow();

            // Nothing to reconstruct if the list is empty, or if its last
            // entry is a marker or still open.
            let Some(last) = active_formatting.last() else {
                return;
            };
            if self.is_marker_or_open(last) {
                return;
            }
        }

        // Rewind to the entry after the last marker or open element.
        let mut entry_index = self.active_formatting.borrow().len() - 1;
        loop {
            if entry_index == 0 {
                break;
            }
            entry_index -= 1;
            if self.is_marker_or_open(&self.active_formatting.borrow()[entry_index]) {
                entry_index += 1;
                break;
            }
        }

        // Then re-create every entry from there to the end of the list.
        loop {
            let tag = match self.active_formatting.borrow()[entry_index] {
                FormatEntry::Element(_, ref t) => t.clone(),
                FormatEntry::Marker => {
                    panic!("Found marker during formatting element reconstruction")
                },
            };

            let new_element =
                self.insert_element(PushFlag::Push, tag.name.clone(), tag.attrs.clone());

            self.active_formatting.borrow_mut()[entry_index] =
                FormatEntry::Element(new_element, tag);

            if entry_index == self.active_formatting.borrow().len() - 1 {
                break;
            }
            entry_index += 1;
        }
    }

    /// Is an element with this name in scope?
    ///
    /// The search stops at `table` and `html`, and also at any scoping
    /// element unless `table_variant` is set.
    fn element_in_scope(&self, name: &LocalName, table_variant: bool) -> bool {
        let open_elems = self.open_elems.borrow();
        let Some(last) = open_elems.last() else {
            return false;
        };
        if self.sink.elem_name(last) == *name {
            return true;
        }

        for node in open_elems.iter().rev() {
            let node_name = self.sink.elem_name(node);
            if node_name == *name {
                return true;
            }
            if node_name == local_name!("table") || node_name == local_name!("html") {
                return false;
            }
            if !table_variant && scoping_tag(&node_name) {
                return false;
            }
        }

        false
    }

    fn in_scope_named(&self, name: LocalName) -> bool {
        self.element_in_scope(&name, false)
    }

    fn in_table_scope_named(&self, name: LocalName) -> bool {
        self.element_in_scope(&name, true)
    }

    /// Pop elements while the current node implies its own end tag,
    /// leaving an element named `except` in place.
    fn generate_implied_end_tags(&self, except: Option<LocalName>) {
        loop {
            {
                let open_elems = self.open_elems.borrow();
                let Some(elem) = open_elems.last() else {
                    return;
                };
                let name = self.sink.elem_name(elem);
                if !implied_end_tag(&name) || Some(&name) == except.as_ref() {
                    return;
                }
            }
            self.pop();
        }
    }

    // Pop elements until an element from the set has been popped.  Returns the
    // number of elements popped.
    fn pop_until<P>(&self, pred: P) -> usize
    where
        P: Fn(&LocalName) -> bool,
    {
        let mut n = 0;
        loop {
            n += 1;
            match self.open_elems.borrow_mut().pop() {
                None => break,
                Some(elem) => {
                    if pred(&self.sink.elem_name(&elem)) {
                        break;
                    }
                },
            }
        }
        n
    }

    fn pop_until_named(&self, name: LocalName) -> usize {
        self.pop_until(|p| *p == name)
    }

    /// Pop elements until the current node is in the set, with a parse
    /// error for each one popped.
    fn clear_stack_back_to<TagSet>(&self, tag_set: TagSet)
    where
        TagSet: Fn(&LocalName) -> bool,
    {
        while !self.current_node_in(&tag_set) {
            let elem = self.pop();
            let msg = format_if!(
                self.opts.exact_errors,
                "Unexpected open element",
                "Unexpected open element {:?} while clearing the stack",
                self.sink.elem_name(&elem)
            );
            self.parse_error(msg);
        }
    }

    /// Handle a `</p>`, whether real or implied.
    fn close_p_element(&self) {
        self.generate_implied_end_tags(Some(local_name!("p")));
        if !self.current_node_named(local_name!("p")) {
            self.parse_error(Borrowed("Unexpected open element while closing p"));
        }
        while self.in_scope_named(local_name!("p")) {
            self.pop();
        }
    }

    fn close_p_element_in_scope(&self) {
        if self.in_scope_named(local_name!("p")) {
            self.close_p_element();
        }
    }

    fn foster_parent_in_body(&self, token: Token) -> ProcessResult {
        self.foster_parenting.set(true);
        let res = self.step(InsertionMode::InBody, token);
        self.foster_parenting.set(false);
        res
    }

    fn reset_insertion_mode(&self) -> InsertionMode {
        let open_elems = self.open_elems.borrow();
        for (i, node) in open_elems.iter().enumerate().rev() {
            let last = i == 0usize;
            let name = match (last, self.context_elem.as_ref()) {
                (true, Some(ctx)) => ctx.clone(),
                _ => self.sink.elem_name(node),
            };
            match name {
                local_name!("select") => return InsertionMode::InSelect,
                local_name!("td") | local_name!("th") => {
                    if !last {
                        return InsertionMode::InCell;
                    }
                },
                local_name!("tr") => return InsertionMode::InRow,
                local_name!("tbody") | local_name!("thead") | local_name!("tfoot") => {
                    return InsertionMode::InTableBody;
                },
                local_name!("caption") => return InsertionMode::InCaption,
                local_name!("colgroup") => return InsertionMode::InColumnGroup,
                local_name!("table") => return InsertionMode::InTable,
                local_name!("head") | local_name!("body") => return InsertionMode::InBody,
                local_name!("frameset") => return InsertionMode::InFrameset,
                local_name!("html") => match *self.head_elem.borrow() {
                    None => return InsertionMode::BeforeHead,
                    Some(_) => return InsertionMode::AfterHead,
                },

                _ => (),
            }
        }
        InsertionMode::InBody
    }

    fn append_text(&self, text: StrTendril) -> ProcessResult {
        self.insert_appropriately(AppendText(text));
        ProcessResult::Done
    }

    fn append_text_to_doc(&self, text: StrTendril) -> ProcessResult {
        self.sink.append(&self.doc_handle, AppendText(text));
        ProcessResult::Done
    }

    fn append_comment(&self, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(text);
        self.sink.append(&self.current_node(), AppendNode(comment));
        ProcessResult::Done
    }

    fn append_comment_to_doc(&self, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(text);
        self.sink.append(&self.doc_handle, AppendNode(comment));
        ProcessResult::Done
    }

    fn append_comment_to_html(&self, text: StrTendril) -> ProcessResult {
        let target = self.html_elem();
        let comment = self.sink.create_comment(text);
        self.sink.append(&target, AppendNode(comment));
        ProcessResult::Done
    }

    /// Get the first element on the stack, which will be the <html> element.
    fn html_elem(&self) -> Handle {
        self.open_elems.borrow()[0].clone()
    }

    /// Get the second element on the stack, if it's a HTML body element.
    fn body_elem(&self) -> Option<Handle> {
        let open_elems = self.open_elems.borrow();
        let node = open_elems.get(1)?;
        if self.html_elem_named(node, local_name!("body")) {
            Some(node.clone())
        } else {
            None
        }
    }

    fn merge_html_attrs(&self, attrs: Vec<Attribute>) -> ProcessResult {
        self.sink.add_attrs_if_missing(&self.html_elem(), attrs);
        ProcessResult::Done
    }

    fn create_root(&self, attrs: Vec<Attribute>) {
        let elem = self.sink.create_element(local_name!("html"), attrs);
        self.push(&elem);
        self.sink.append(&self.doc_handle, AppendNode(elem));
    }

    fn insert_element(&self, push: PushFlag, name: LocalName, attrs: Vec<Attribute>) -> Handle {
        let elem = self.sink.create_element(name, attrs);
        self.insert_appropriately(AppendNode(elem.clone()));
        match push {
            PushFlag::Push => self.push(&elem),
            PushFlag::NoPush => (),
        }
        elem
    }

    fn insert_element_for(&self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::Push, tag.name, tag.attrs)
    }

    fn insert_and_pop_element_for(&self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::NoPush, tag.name, tag.attrs)
    }

    fn insert_phantom(&self, name: LocalName) -> Handle {
        self.insert_element(PushFlag::Push, name, vec![])
    }

    fn create_formatting_element_for(&self, tag: Tag) -> Handle {
        let elem = self.insert_element(PushFlag::Push, tag.name.clone(), tag.attrs.clone());
        self.active_formatting
            .borrow_mut()
            .push(FormatEntry::Element(elem.clone(), tag));
        elem
    }

    fn clear_active_formatting_to_marker(&self) {
        loop {
            match self.active_formatting.borrow_mut().pop() {
                None | Some(FormatEntry::Marker) => break,
                _ => (),
            }
        }
    }

    /// An end tag in body with no handler of its own: close the nearest
    /// open element with this name, unless a special or scoping element
    /// comes first.
    fn process_end_tag_in_body(&self, tag: Tag) {
        let mut match_idx = None;
        for (i, elem) in self.open_elems.borrow().iter().enumerate().rev() {
            if self.html_elem_named(elem, tag.name.clone()) {
                match_idx = Some(i);
                break;
            }

            if self.elem_in(elem, special_or_scoping) {
                self.parse_error(Borrowed("Found special tag while closing generic tag"));
                return;
            }
        }

        let Some(match_idx) = match_idx else {
            self.unexpected(&tag);
            return;
        };

        self.generate_implied_end_tags(None);

        if !self.current_node_named(tag.name.clone()) {
            self.unexpected(&tag);
        }
        self.open_elems.borrow_mut().truncate(match_idx);
    }

    fn handle_misnested_a_tags(&self) {
        let Some(node) = self
            .active_formatting_end_to_marker()
            .iter()
            .find(|&(_, _, t)| t.name == local_name!("a"))
            .map(|(_, n, _)| n.clone())
        else {
            return;
        };

        self.parse_error(Borrowed("Nested <a> element"));
        self.adoption_agency(local_name!("a"));
        self.remove_from_active_formatting(&node);
        self.remove_from_stack(&node);
    }

    fn any_heading_in_scope(&self) -> bool {
        [
            local_name!("h1"),
            local_name!("h2"),
            local_name!("h3"),
            local_name!("h4"),
            local_name!("h5"),
            local_name!("h6"),
        ]
        .iter()
        .any(|h| self.element_in_scope(h, false))
    }

    /// Append to the head element, or to the current node when there is
    /// no head (as in a fragment).
    fn append_to_head(&self, elem: Handle) {
        let target = self
            .head_elem
            .borrow()
            .clone()
            .unwrap_or_else(|| self.current_node());
        self.sink.append(&target, AppendNode(elem));
    }
}

#[cfg(test)]
mod tests {
    use super::{TreeBuilder, TreeBuilderOpts, TreeSink};
    use crate::dom::{Dom, NodeData, NodeId};
    use crate::error::Position;
    use crate::tokenizer::states::ContentModelFlag;
    use crate::tokenizer::{Attribute, EndTag, StartTag, Tag, TagKind};
    use crate::tokenizer::{CharacterTokens, TagToken};
    use crate::LocalName;

    use std::iter;

    fn tag(kind: TagKind, name: &str) -> Tag {
        Tag {
            kind,
            name: LocalName::from(name),
            attrs: vec![],
        }
    }

    fn builder() -> TreeBuilder<NodeId, Dom> {
        TreeBuilder::new(Dom::default(), ContentModelFlag::default(), TreeBuilderOpts::default())
    }

    fn feed(tb: &TreeBuilder<NodeId, Dom>, html: &[(TagKind, &str)]) {
        for &(kind, name) in html {
            tb.process_token(TagToken(tag(kind, name)), Position::default());
        }
    }

    fn stack_names(tb: &TreeBuilder<NodeId, Dom>) -> Vec<String> {
        tb.open_elems
            .borrow()
            .iter()
            .map(|n| tb.sink.elem_name(n).to_string())
            .collect()
    }

    fn child_names(tb: &TreeBuilder<NodeId, Dom>, id: NodeId) -> Vec<String> {
        tb.sink
            .node(id)
            .children
            .iter()
            .map(|&c| match tb.sink.node(c).data {
                NodeData::Element { ref name, .. } => name.to_string(),
                NodeData::Text { ref contents } => format!("\"{}\"", contents),
                _ => "#other".to_owned(),
            })
            .collect()
    }

    #[test]
    fn scope_stops_at_scoping_elements() {
        let tb = builder();
        feed(
            &tb,
            &[
                (StartTag, "div"),
                (StartTag, "table"),
                (StartTag, "tbody"),
                (StartTag, "tr"),
                (StartTag, "td"),
            ],
        );
        assert_eq!(stack_names(&tb), ["html", "body", "div", "table", "tbody", "tr", "td"]);
        assert!(tb.element_in_scope(&local_name!("td"), false));
        assert!(!tb.element_in_scope(&local_name!("div"), false));
        assert!(tb.element_in_scope(&local_name!("tr"), true));
        assert!(!tb.element_in_scope(&local_name!("tr"), false));
        assert!(!tb.element_in_scope(&local_name!("div"), true));
    }

    #[test]
    fn implied_end_tags_stop_and_are_idempotent() {
        let tb = builder();
        feed(&tb, &[(StartTag, "div"), (StartTag, "dl"), (StartTag, "dd"), (StartTag, "p")]);
        tb.generate_implied_end_tags(Some(local_name!("dd")));
        assert_eq!(stack_names(&tb), ["html", "body", "div", "dl", "dd"]);
        tb.generate_implied_end_tags(None);
        assert_eq!(stack_names(&tb), ["html", "body", "div", "dl"]);
        tb.generate_implied_end_tags(None);
        assert_eq!(stack_names(&tb), ["html", "body", "div", "dl"]);
    }

    #[test]
    fn adoption_agency_runs_until_formatting_element_is_closed() {
        let tb = builder();
        let mut tags = vec![(StartTag, "b")];
        tags.extend(iter::repeat((StartTag, "div")).take(10));
        feed(&tb, &tags);
        tb.process_token(CharacterTokens("x".into()), Position::default());
        feed(&tb, &[(EndTag, "b")]);

        let mut expected = vec!["html", "body"];
        expected.extend(iter::repeat("div").take(10));
        assert_eq!(stack_names(&tb), expected);
        assert!(tb.active_formatting.borrow().is_empty());
        assert_eq!(tb.sink.errors.borrow().len(), 10);
    }

    #[test]
    fn empty_intermediate_formatting_element_is_reused() {
        let tb = builder();
        feed(&tb, &[(StartTag, "b"), (StartTag, "i"), (StartTag, "div")]);
        tb.process_token(CharacterTokens("x".into()), Position::default());
        let i = tb.open_elems.borrow()[3];
        feed(&tb, &[(EndTag, "b")]);

        assert_eq!(stack_names(&tb), ["html", "body", "i", "div", "b"]);
        assert_eq!(tb.open_elems.borrow()[2], i);
        let body = tb.body_elem().expect("no body");
        assert_eq!(child_names(&tb, body), ["b", "i"]);
        assert_eq!(child_names(&tb, i), ["div"]);
        assert_eq!(tb.active_formatting.borrow().len(), 2);
        assert_eq!(tb.sink.errors.borrow().len(), 1);
    }

    #[test]
    fn intermediate_formatting_element_with_children_is_cloned() {
        let tb = builder();
        feed(&tb, &[(StartTag, "b"), (StartTag, "i")]);
        tb.process_token(CharacterTokens("y".into()), Position::default());
        feed(&tb, &[(StartTag, "div")]);
        tb.process_token(CharacterTokens("x".into()), Position::default());
        let b = tb.open_elems.borrow()[2];
        let i = tb.open_elems.borrow()[3];
        feed(&tb, &[(EndTag, "b")]);

        assert_eq!(stack_names(&tb), ["html", "body", "i", "div", "b"]);
        let i_clone = tb.open_elems.borrow()[2];
        assert_ne!(i_clone, i);
        let body = tb.body_elem().expect("no body");
        assert_eq!(child_names(&tb, body), ["b", "i"]);
        assert_eq!(child_names(&tb, b), ["i"]);
        assert_eq!(child_names(&tb, i), ["\"y\""]);
        assert_eq!(child_names(&tb, i_clone), ["div"]);
    }

    #[test]
    fn adoption_agency_in_table_appends_to_common_ancestor() {
        let tb = builder();
        feed(&tb, &[(StartTag, "table"), (StartTag, "b"), (StartTag, "div")]);
        tb.process_token(CharacterTokens("x".into()), Position::default());
        let table = tb.open_elems.borrow()[2];
        feed(&tb, &[(EndTag, "b")]);

        let body = tb.body_elem().expect("no body");
        assert_eq!(child_names(&tb, body), ["b", "table"]);
        assert_eq!(child_names(&tb, table), ["div"]);
    }

    #[test]
    fn html_attrs_merge_without_overwriting() {
        let tb = builder();
        let mut html = tag(StartTag, "html");
        html.attrs.push(Attribute {
            name: local_name!("name"),
            value: "first".into(),
        });
        tb.process_token(TagToken(html.clone()), Position::default());
        html.attrs[0].value = "second".into();
        html.attrs.push(Attribute {
            name: LocalName::from("lang"),
            value: "en".into(),
        });
        feed(&tb, &[(StartTag, "p")]);
        tb.process_token(TagToken(html), Position::default());

        let root = tb.html_elem();
        match tb.sink.node(root).data {
            NodeData::Element { ref attrs, .. } => {
                assert_eq!(attrs.len(), 2);
                assert_eq!(&*attrs[0].value, "first");
                assert_eq!(&*attrs[1].value, "en");
            },
            _ => panic!("root is not an element"),
        }
        assert!(tb.sink.errors.borrow().is_empty());
    }

    #[test]
    fn strict_mode_keeps_first_error() {
        let tb = TreeBuilder::new(
            Dom::default(),
            ContentModelFlag::default(),
            TreeBuilderOpts {
                strict: true,
                ..Default::default()
            },
        );
        feed(&tb, &[(StartTag, "html"), (EndTag, "span"), (EndTag, "div")]);
        let err = tb.take_fatal_error().expect("no fatal error");
        assert_eq!(err.message, "Unexpected token");
        assert_eq!(tb.sink.errors.borrow().len(), 2);
        assert!(tb.take_fatal_error().is_none());
    }
}
