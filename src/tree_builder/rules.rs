// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tree builder rules, as a single, enormous nested match expression.

use crate::tokenizer::states::{Cdata, Plaintext, Rcdata};
use crate::tokenizer::{Attribute, EndTag, StartTag, Tag, TagKind};
use crate::tree_builder::tag_sets::*;
use crate::tree_builder::types::*;
use crate::tree_builder::{AppendNode, TreeBuilder, TreeSink};
use crate::LocalName;

use std::borrow::Cow::Borrowed;

use tendril::StrTendril;

#[rustfmt::skip]
macro_rules! tag {
    // Any start tag
    (<>) => {
        crate::tokenizer::Tag { kind: crate::tokenizer::StartTag, .. }
    };
    (<>|$($tail:tt)*) => {
        tag!(<>) | tag!($($tail)*)
    };

    // Any end tag
    (</>) => {
        crate::tokenizer::Tag { kind: crate::tokenizer::EndTag, .. }
    };
    (</>|$($tail:tt)*) => {
        tag!(</>) | tag!($($tail)*)
    };

    // Named start tag
    (<$tag:tt>) => {
        crate::tokenizer::Tag { kind: crate::tokenizer::StartTag, name: local_name!($tag), .. }
    };
    (<$tag:tt>|$($tail:tt)*) => {
        tag!(<$tag>) | tag!($($tail)*)
    };

    // Named end tag
    (</$tag:tt>) => {
        crate::tokenizer::Tag { kind: crate::tokenizer::EndTag, name: local_name!($tag), .. }
    };
    (</$tag:tt>|$($tail:tt)*) => {
        tag!(</$tag>) | tag!($($tail)*)
    };
}

declare_tag_set!(head_raw_text = "title" "style" "script");
declare_tag_set!(definition_item = "dd" "dt");
declare_tag_set!(list_item = "li");

fn synthetic_tag(kind: TagKind, name: LocalName) -> Token {
    Token::Tag(Tag {
        kind,
        name,
        attrs: vec![],
    })
}

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    pub(crate) fn step(&self, mode: InsertionMode, token: Token) -> ProcessResult {
        self.debug_step(mode, &token);

        let token = match token {
            Token::Characters(SplitStatus::NotSplit, text) => {
                return ProcessResult::SplitWhitespace(text);
            },
            token => token,
        };

        match mode {
            InsertionMode::Initial => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text_to_doc(text),
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Characters(..) => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::BeforeHtml, token)
                },
                token => ProcessResult::Reprocess(InsertionMode::BeforeHtml, token),
            },

            InsertionMode::BeforeHtml => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text_to_doc(text),
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag @ tag!(<"html">)) => {
                    self.create_root(tag.attrs);
                    self.mode.set(InsertionMode::BeforeHead);
                    ProcessResult::Done
                },

                token => {
                    self.create_root(vec![]);
                    ProcessResult::Reprocess(InsertionMode::BeforeHead, token)
                },
            },

            InsertionMode::BeforeHead => {
                let anything_else = |token: Token| {
                    *self.head_elem.borrow_mut() = Some(self.insert_phantom(local_name!("head")));
                    ProcessResult::Reprocess(InsertionMode::InHead, token)
                };

                match token {
                    Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                    Token::Comment(text) => self.append_comment(text),

                    Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                    Token::Tag(tag @ tag!(<"head">)) => {
                        *self.head_elem.borrow_mut() = Some(self.insert_element_for(tag));
                        self.mode.set(InsertionMode::InHead);
                        ProcessResult::Done
                    },

                    Token::Tag(tag!(</"html">)) => anything_else(token),

                    Token::Tag(tag @ tag!(</>)) => self.unexpected(&tag),

                    token => anything_else(token),
                }
            },

            InsertionMode::InHead => {
                let anything_else = |token: Token| {
                    if self.current_node_named(local_name!("head")) {
                        self.pop();
                    }
                    self.mode.set(InsertionMode::AfterHead);
                    ProcessResult::Reprocess(InsertionMode::AfterHead, token)
                };

                match token {
                    Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                    Token::Characters(_, text) if self.current_node_in(head_raw_text) => {
                        self.append_text(text)
                    },
                    Token::Comment(text) => self.append_comment(text),

                    Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                    Token::Tag(tag @ tag!(<"title"> | <"style">)) => {
                        let model = if tag.name == local_name!("title") {
                            Rcdata
                        } else {
                            Cdata
                        };
                        let elem = self.sink.create_element(tag.name, tag.attrs);
                        self.append_to_head(elem.clone());
                        self.push(&elem);
                        self.set_content_model(model);
                        ProcessResult::Done
                    },

                    Token::Tag(tag @ tag!(<"script">)) => {
                        let elem = self.sink.create_element(tag.name, tag.attrs);
                        self.sink.append(&self.current_node(), AppendNode(elem.clone()));
                        self.push(&elem);
                        self.set_content_model(Cdata);
                        ProcessResult::Done
                    },

                    Token::Tag(tag @ tag!(<"base"> | <"link"> | <"meta">)) => {
                        let elem = self.sink.create_element(tag.name, tag.attrs);
                        self.append_to_head(elem);
                        ProcessResult::Done
                    },

                    Token::Tag(tag!(<"head">)) => self.unexpected(&token),

                    Token::Tag(tag!(</"head">)) => {
                        if self.current_node_named(local_name!("head")) {
                            self.pop();
                        } else {
                            self.unexpected(&token);
                        }
                        self.mode.set(InsertionMode::AfterHead);
                        ProcessResult::Done
                    },

                    Token::Tag(tag!(</"html">)) => anything_else(token),

                    Token::Tag(tag @ tag!(</"title"> | </"style"> | </"script">)) => {
                        if self.current_node_named(tag.name.clone()) {
                            self.pop();
                            ProcessResult::Done
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    Token::Tag(tag @ tag!(</>)) => self.unexpected(&tag),

                    Token::Eof => {
                        if self.current_node_in(head_raw_text) {
                            self.pop();
                        }
                        anything_else(token)
                    },

                    token => anything_else(token),
                }
            },

            InsertionMode::AfterHead => {
                let anything_else = |token: Token| {
                    self.insert_phantom(local_name!("body"));
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                };

                match token {
                    Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                    Token::Comment(text) => self.append_comment(text),

                    Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                    Token::Tag(tag @ tag!(<"body">)) => {
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InBody);
                        ProcessResult::Done
                    },

                    Token::Tag(tag @ tag!(<"frameset">)) => {
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InFrameset);
                        ProcessResult::Done
                    },

                    Token::Tag(tag!(<"base"> | <"link"> | <"meta"> | <"script"> | <"style"> | <"title">)) => {
                        self.unexpected(&token);
                        ProcessResult::Reprocess(InsertionMode::InHead, token)
                    },

                    token => anything_else(token),
                }
            },

            InsertionMode::InBody => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(_, text) => {
                    self.reconstruct_active_formatting_elements();
                    self.append_text(text)
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag!(<"script">)) => self.step(InsertionMode::InHead, token),

                Token::Tag(tag!(<"base"> | <"link"> | <"meta"> | <"style"> | <"title">)) => {
                    self.unexpected(&token);
                    self.step(InsertionMode::InHead, token)
                },

                Token::Tag(tag @ tag!(<"body">)) => {
                    self.unexpected(&tag);
                    if let Some(body) = self.body_elem() {
                        self.sink.add_attrs_if_missing(&body, tag.attrs);
                    }
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"address"> | <"blockquote"> | <"center"> | <"dir"> | <"div"> |
                    <"dl"> | <"fieldset"> | <"listing"> | <"menu"> | <"ol"> | <"p"> | <"pre"> | <"ul"> |
                    <"section"> | <"nav"> | <"article"> | <"aside"> | <"header"> | <"footer"> |
                    <"datagrid"> | <"command"> | <"event-source">)) => {
                    self.close_p_element_in_scope();
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"form">)) => {
                    if self.form_elem.borrow().is_some() {
                        return self.unexpected(&tag);
                    }
                    self.close_p_element_in_scope();
                    let elem = self.insert_element_for(tag);
                    *self.form_elem.borrow_mut() = Some(elem);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"li"> | <"dd"> | <"dt">)) => {
                    self.close_p_element_in_scope();

                    let stop: fn(&LocalName) -> bool = if tag.name == local_name!("li") {
                        list_item
                    } else {
                        definition_item
                    };

                    let mut to_close = None;
                    for node in self.open_elems.borrow().iter().rev() {
                        let name = self.sink.elem_name(node);
                        if stop(&name) {
                            to_close = Some(name);
                            break;
                        }
                        if special_or_scoping(&name) &&
                            name != local_name!("address") &&
                            name != local_name!("div")
                        {
                            break;
                        }
                    }

                    if let Some(name) = to_close {
                        self.pop_until_named(name);
                    }
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"plaintext">)) => {
                    self.close_p_element_in_scope();
                    self.insert_element_for(tag);
                    self.set_content_model(Plaintext);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"h1"> | <"h2"> | <"h3"> | <"h4"> | <"h5"> | <"h6">)) => {
                    self.close_p_element_in_scope();
                    if self.any_heading_in_scope() {
                        self.unexpected(&tag);
                        self.pop_until(heading_tag);
                    }
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"a">)) => {
                    self.handle_misnested_a_tags();
                    self.reconstruct_active_formatting_elements();
                    self.create_formatting_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"b"> | <"big"> | <"em"> | <"font"> | <"i"> | <"nobr"> |
                    <"s"> | <"small"> | <"strike"> | <"strong"> | <"tt"> | <"u">)) => {
                    self.reconstruct_active_formatting_elements();
                    self.create_formatting_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"button">)) => {
                    if self.in_scope_named(local_name!("button")) {
                        self.unexpected(&tag);
                        self.step(
                            InsertionMode::InBody,
                            synthetic_tag(EndTag, local_name!("button")),
                        );
                        ProcessResult::Reprocess(self.mode.get(), Token::Tag(tag))
                    } else {
                        self.reconstruct_active_formatting_elements();
                        self.insert_element_for(tag);
                        self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag @ tag!(<"marquee"> | <"object">)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"xmp">)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.set_content_model(Cdata);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"table">)) => {
                    self.close_p_element_in_scope();
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InTable);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"area"> | <"basefont"> | <"bgsound"> | <"br"> | <"embed"> |
                    <"img"> | <"input"> | <"param"> | <"spacer"> | <"wbr">)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_and_pop_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"hr">)) => {
                    self.close_p_element_in_scope();
                    self.insert_and_pop_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"image">)) => {
                    self.unexpected(&tag);
                    self.step(
                        InsertionMode::InBody,
                        Token::Tag(Tag {
                            name: local_name!("img"),
                            ..tag
                        }),
                    )
                },

                Token::Tag(tag @ tag!(<"isindex">)) => {
                    self.unexpected(&tag);
                    if self.form_elem.borrow().is_some() {
                        return ProcessResult::Done;
                    }
                    self.isindex(tag.attrs);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"textarea">)) => {
                    self.insert_element_for(tag);
                    self.set_content_model(Rcdata);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"iframe"> | <"noembed"> | <"noframes"> | <"noscript">)) => {
                    self.insert_element_for(tag);
                    self.set_content_model(Cdata);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"select">)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InSelect);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"caption"> | <"col"> | <"colgroup"> | <"frame"> | <"frameset"> |
                    <"head"> | <"option"> | <"optgroup"> | <"tbody"> | <"td"> | <"tfoot"> |
                    <"th"> | <"thead"> | <"tr">)) => self.unexpected(&token),

                Token::Tag(tag @ tag!(<>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"p">)) => {
                    self.close_p_element();
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"body">)) => {
                    self.close_body(&token);
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"html">)) => {
                    if self.close_body(&token) && !self.is_fragment() {
                        ProcessResult::Reprocess(InsertionMode::AfterBody, token)
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag @ tag!(</"address"> | </"blockquote"> | </"center"> | </"div"> |
                    </"dl"> | </"fieldset"> | </"listing"> | </"menu"> | </"ol"> | </"pre"> |
                    </"ul"> | </"section"> | </"nav"> | </"article"> | </"aside"> | </"header"> |
                    </"footer"> | </"datagrid"> | </"command"> | </"event-source">)) => {
                    self.close_block(tag.name);
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"form">)) => {
                    self.close_block(local_name!("form"));
                    *self.form_elem.borrow_mut() = None;
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"dd"> | </"dt"> | </"li">)) => {
                    if !self.in_scope_named(tag.name.clone()) {
                        return self.unexpected(&tag);
                    }
                    self.generate_implied_end_tags(Some(tag.name.clone()));
                    if !self.current_node_named(tag.name.clone()) {
                        self.unexpected(&tag);
                    }
                    self.pop_until_named(tag.name);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"h1"> | </"h2"> | </"h3"> | </"h4"> | </"h5"> | </"h6">)) => {
                    let in_scope = self.any_heading_in_scope();
                    if in_scope {
                        self.generate_implied_end_tags(None);
                    }
                    if !self.current_node_named(tag.name.clone()) {
                        self.unexpected(&tag);
                    }
                    if in_scope {
                        self.pop_until(heading_tag);
                    }
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"a"> | </"b"> | </"big"> | </"em"> | </"font"> | </"i"> |
                    </"nobr"> | </"s"> | </"small"> | </"strike"> | </"strong"> | </"tt"> | </"u">)) => {
                    self.adoption_agency(tag.name);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"button"> | </"marquee"> | </"object">)) => {
                    if self.close_block(tag.name) {
                        self.clear_active_formatting_to_marker();
                    }
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"caption"> | </"col"> | </"colgroup"> | </"frame"> | </"frameset"> |
                    </"head"> | </"option"> | </"optgroup"> | </"tbody"> | </"td"> | </"tfoot"> |
                    </"th"> | </"thead"> | </"tr"> | </"area"> | </"basefont"> | </"bgsound"> |
                    </"br"> | </"embed"> | </"hr"> | </"image"> | </"img"> | </"input"> |
                    </"isindex"> | </"param"> | </"select"> | </"spacer"> | </"table"> |
                    </"wbr">)) => self.unexpected(&token),

                Token::Tag(tag @ tag!(</"noframes"> | </"noscript"> | </"noembed"> | </"textarea"> |
                    </"xmp"> | </"iframe">)) => {
                    if self.current_node_named(tag.name.clone()) {
                        self.pop();
                        ProcessResult::Done
                    } else {
                        self.unexpected(&tag)
                    }
                },

                Token::Tag(tag @ tag!(</>)) => {
                    self.process_end_tag_in_body(tag);
                    ProcessResult::Done
                },
            },

            InsertionMode::InTable => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(..) => {
                    self.unexpected(&token);
                    self.foster_parent_in_body(token)
                },
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"caption">)) => {
                    self.clear_stack_back_to(table_context);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InCaption);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"colgroup">)) => {
                    self.clear_stack_back_to(table_context);
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InColumnGroup);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"col">)) => {
                    self.clear_stack_back_to(table_context);
                    self.insert_phantom(local_name!("colgroup"));
                    ProcessResult::Reprocess(InsertionMode::InColumnGroup, token)
                },

                Token::Tag(tag @ tag!(<"tbody"> | <"tfoot"> | <"thead">)) => {
                    self.clear_stack_back_to(table_context);
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InTableBody);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"td"> | <"th"> | <"tr">)) => {
                    self.clear_stack_back_to(table_context);
                    self.insert_phantom(local_name!("tbody"));
                    ProcessResult::Reprocess(InsertionMode::InTableBody, token)
                },

                Token::Tag(tag!(<"table">)) => {
                    self.unexpected(&token);
                    if self.close_table() {
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag!(<>)) => {
                    self.unexpected(&token);
                    self.foster_parent_in_body(token)
                },

                Token::Tag(tag!(</"table">)) => {
                    self.close_table();
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"body"> | </"caption"> | </"col"> | </"colgroup"> | </"html"> |
                    </"tbody"> | </"td"> | </"tfoot"> | </"th"> | </"thead"> | </"tr">)) => {
                    self.unexpected(&token)
                },

                Token::Tag(tag!(</>)) => self.foster_parent_in_body(token),
            },

            InsertionMode::InCaption => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(..) => self.step(InsertionMode::InBody, token),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag!(<"caption"> | <"col"> | <"colgroup"> | <"tbody"> | <"td"> |
                    <"tfoot"> | <"th"> | <"thead"> | <"tr">)) => {
                    self.unexpected(&token);
                    if self.close_caption() {
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag!(<>)) => self.step(InsertionMode::InBody, token),

                Token::Tag(tag!(</"caption">)) => {
                    self.close_caption();
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"table">)) => {
                    self.unexpected(&token);
                    if self.close_caption() {
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag!(</"body"> | </"col"> | </"colgroup"> | </"html"> | </"tbody"> |
                    </"td"> | </"tfoot"> | </"th"> | </"thead"> | </"tr">)) => self.unexpected(&token),

                Token::Tag(tag!(</>)) => self.step(InsertionMode::InBody, token),
            },

            InsertionMode::InColumnGroup => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"col">)) => {
                    self.insert_and_pop_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"colgroup">)) => {
                    self.close_colgroup();
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"col">)) => self.unexpected(&token),

                token => {
                    if self.close_colgroup() {
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        ProcessResult::Done
                    }
                },
            },

            InsertionMode::InTableBody => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(..) => self.step(InsertionMode::InTable, token),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"tr">)) => {
                    self.clear_stack_back_to(table_body_context);
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InRow);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"td"> | <"th">)) => {
                    self.unexpected(&token);
                    self.clear_stack_back_to(table_body_context);
                    self.insert_phantom(local_name!("tr"));
                    ProcessResult::Reprocess(InsertionMode::InRow, token)
                },

                Token::Tag(tag!(<"caption"> | <"col"> | <"colgroup"> | <"tbody"> | <"tfoot"> |
                    <"thead"> | </"table">)) => {
                    let open_section = self.in_table_scope_named(local_name!("tbody")) ||
                        self.in_table_scope_named(local_name!("thead")) ||
                        self.in_table_scope_named(local_name!("tfoot"));
                    if open_section {
                        self.clear_stack_back_to(table_body_context);
                        self.pop();
                        self.mode.set(InsertionMode::InTable);
                        ProcessResult::Reprocess(InsertionMode::InTable, token)
                    } else {
                        self.unexpected(&token)
                    }
                },

                Token::Tag(tag @ tag!(</"tbody"> | </"tfoot"> | </"thead">)) => {
                    if self.in_table_scope_named(tag.name.clone()) {
                        self.clear_stack_back_to(table_body_context);
                        self.pop();
                        self.mode.set(InsertionMode::InTable);
                        ProcessResult::Done
                    } else {
                        self.unexpected(&tag)
                    }
                },

                Token::Tag(tag!(</"body"> | </"caption"> | </"col"> | </"colgroup"> | </"html"> |
                    </"td"> | </"th"> | </"tr">)) => self.unexpected(&token),

                token => self.step(InsertionMode::InTable, token),
            },

            InsertionMode::InRow => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(..) => self.step(InsertionMode::InTable, token),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"td"> | <"th">)) => {
                    self.clear_stack_back_to(table_row_context);
                    self.insert_element_for(tag);
                    self.mode.set(InsertionMode::InCell);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"caption"> | <"col"> | <"colgroup"> | <"tbody"> | <"tfoot"> |
                    <"thead"> | <"tr"> | </"table">)) => {
                    if self.close_row() {
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag!(</"tr">)) => {
                    self.close_row();
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"tbody"> | </"tfoot"> | </"thead">)) => {
                    if !self.in_table_scope_named(tag.name.clone()) {
                        self.unexpected(&tag)
                    } else if self.close_row() {
                        ProcessResult::Reprocess(self.mode.get(), Token::Tag(tag))
                    } else {
                        ProcessResult::Done
                    }
                },

                Token::Tag(tag!(</"body"> | </"caption"> | </"col"> | </"colgroup"> | </"html"> |
                    </"td"> | </"th">)) => self.unexpected(&token),

                token => self.step(InsertionMode::InTable, token),
            },

            InsertionMode::InCell => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(..) => self.step(InsertionMode::InBody, token),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag!(<"caption"> | <"col"> | <"colgroup"> | <"tbody"> | <"td"> |
                    <"tfoot"> | <"th"> | <"thead"> | <"tr">)) => {
                    if self.in_table_scope_named(local_name!("td")) ||
                        self.in_table_scope_named(local_name!("th"))
                    {
                        self.close_the_cell();
                        ProcessResult::Reprocess(self.mode.get(), token)
                    } else {
                        self.unexpected(&token)
                    }
                },

                Token::Tag(tag!(<>)) => self.step(InsertionMode::InBody, token),

                Token::Tag(tag @ tag!(</"td"> | </"th">)) => {
                    self.end_cell(tag.name);
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"body"> | </"caption"> | </"col"> | </"colgroup"> | </"html">)) => {
                    self.unexpected(&token)
                },

                Token::Tag(tag @ tag!(</"table"> | </"tbody"> | </"tfoot"> | </"thead"> | </"tr">)) => {
                    if self.in_table_scope_named(tag.name.clone()) {
                        self.close_the_cell();
                        ProcessResult::Reprocess(self.mode.get(), Token::Tag(tag))
                    } else {
                        self.unexpected(&tag)
                    }
                },

                Token::Tag(tag!(</>)) => self.step(InsertionMode::InBody, token),
            },

            InsertionMode::InSelect => match token {
                Token::Characters(_, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"option">)) => {
                    if self.current_node_named(local_name!("option")) {
                        self.pop();
                    }
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"optgroup">)) => {
                    if self.current_node_named(local_name!("option")) {
                        self.pop();
                    }
                    if self.current_node_named(local_name!("optgroup")) {
                        self.pop();
                    }
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"select">)) => {
                    self.unexpected(&token);
                    self.close_select();
                    ProcessResult::Done
                },

                Token::Tag(tag!(</"option">)) => {
                    if self.current_node_named(local_name!("option")) {
                        self.pop();
                        ProcessResult::Done
                    } else {
                        self.unexpected(&token)
                    }
                },

                Token::Tag(tag!(</"optgroup">)) => {
                    let option_in_group = {
                        let open_elems = self.open_elems.borrow();
                        open_elems.len() >= 2 &&
                            self.html_elem_named(&open_elems[open_elems.len() - 1], local_name!("option")) &&
                            self.html_elem_named(&open_elems[open_elems.len() - 2], local_name!("optgroup"))
                    };
                    if option_in_group {
                        self.pop();
                    }
                    if self.current_node_named(local_name!("optgroup")) {
                        self.pop();
                        ProcessResult::Done
                    } else {
                        self.unexpected(&token)
                    }
                },

                Token::Tag(tag!(</"select">)) => {
                    self.close_select();
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(</"caption"> | </"table"> | </"tbody"> | </"tfoot"> |
                    </"thead"> | </"tr"> | </"td"> | </"th">)) => {
                    self.unexpected(&tag);
                    if self.in_table_scope_named(tag.name.clone()) && self.close_select() {
                        ProcessResult::Reprocess(self.mode.get(), Token::Tag(tag))
                    } else {
                        ProcessResult::Done
                    }
                },

                token => self.unexpected(&token),
            },

            InsertionMode::AfterBody => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment_to_html(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag!(</"html">)) => {
                    if self.is_fragment() {
                        self.unexpected(&token)
                    } else {
                        self.last_mode.set(InsertionMode::AfterBody);
                        self.mode.set(InsertionMode::TrailingEnd);
                        ProcessResult::Done
                    }
                },

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            InsertionMode::InFrameset => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(_, text) => self.noframes_text(text),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag @ tag!(<"frameset">)) => {
                    self.insert_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag @ tag!(<"frame">)) => {
                    self.insert_and_pop_element_for(tag);
                    ProcessResult::Done
                },

                Token::Tag(tag!(<"noframes"> | </"noframes">)) => {
                    self.step(InsertionMode::InBody, token)
                },

                Token::Tag(tag!(</"frameset">)) => {
                    if self.current_node_named(local_name!("html")) {
                        self.unexpected(&token);
                    } else {
                        self.pop();
                    }
                    if !self.is_fragment() && !self.current_node_named(local_name!("frameset")) {
                        self.mode.set(InsertionMode::AfterFrameset);
                    }
                    ProcessResult::Done
                },

                token => self.unexpected(&token),
            },

            InsertionMode::AfterFrameset => match token {
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Characters(_, text) => self.noframes_text(text),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.unexpected_eof(),

                Token::Tag(tag @ tag!(<"html">)) => self.merge_html_attrs(tag.attrs),

                Token::Tag(tag!(<"noframes"> | </"noframes">)) => {
                    self.step(InsertionMode::InBody, token)
                },

                Token::Tag(tag!(</"html">)) => {
                    self.last_mode.set(InsertionMode::AfterFrameset);
                    self.mode.set(InsertionMode::TrailingEnd);
                    ProcessResult::Done
                },

                token => self.unexpected(&token),
            },

            InsertionMode::TrailingEnd => match token {
                Token::Characters(SplitStatus::Whitespace, _) => self.step(self.last_mode.get(), token),
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Eof => ProcessResult::Done,

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(self.last_mode.get(), token)
                },
            },
        }
    }

    /// End of file in any mode that has no rule of its own for it.
    fn unexpected_eof(&self) -> ProcessResult {
        self.generate_implied_end_tags(None);
        if !self.is_fragment() || self.open_elems.borrow().len() > 1 {
            self.parse_error(Borrowed("Unexpected end of file"));
        }
        ProcessResult::Done
    }

    /// Text inside `noframes` is kept; any other text in a frameset is an error.
    fn noframes_text(&self, text: StrTendril) -> ProcessResult {
        if self.current_node_named(local_name!("noframes")) {
            self.append_text(text)
        } else {
            self.unexpected(&text)
        }
    }

    /// Switch to the after body mode. Returns false if there is no body to close.
    fn close_body(&self, token: &Token) -> bool {
        if self.body_elem().is_none() {
            self.unexpected(token);
            return false;
        }
        if !self.current_node_named(local_name!("body")) {
            self.parse_error(Borrowed("Unexpected open element at end of body"));
        }
        self.mode.set(InsertionMode::AfterBody);
        true
    }

    /// Close a block-level element if it is in scope. Returns whether it was.
    fn close_block(&self, name: LocalName) -> bool {
        let in_scope = self.in_scope_named(name.clone());
        if in_scope {
            self.generate_implied_end_tags(None);
        }
        if !self.current_node_named(name.clone()) {
            let msg = format_if!(
                self.opts.exact_errors,
                "Unexpected open element",
                "Unexpected open element while closing {}",
                name
            );
            self.parse_error(msg);
        }
        if in_scope {
            self.pop_until_named(name);
        }
        in_scope
    }

    fn isindex(&self, attrs: Vec<Attribute>) {
        let start = |name| synthetic_tag(StartTag, name);
        let end = |name| synthetic_tag(EndTag, name);

        self.step(InsertionMode::InBody, start(local_name!("form")));
        self.step(InsertionMode::InBody, start(local_name!("hr")));
        self.step(InsertionMode::InBody, start(local_name!("p")));
        self.step(InsertionMode::InBody, start(local_name!("label")));

        self.step(
            InsertionMode::InBody,
            Token::Characters(
                SplitStatus::NotWhitespace,
                StrTendril::from_slice(
                    "This is a searchable index. Insert your search keywords here:",
                ),
            ),
        );

        let mut attrs: Vec<Attribute> = attrs
            .into_iter()
            .filter(|attr| attr.name != local_name!("name"))
            .collect();
        attrs.push(Attribute {
            name: local_name!("name"),
            value: StrTendril::from_slice("isindex"),
        });
        self.step(
            InsertionMode::InBody,
            Token::Tag(Tag {
                kind: StartTag,
                name: local_name!("input"),
                attrs,
            }),
        );

        self.step(InsertionMode::InBody, end(local_name!("label")));
        self.step(InsertionMode::InBody, end(local_name!("p")));
        self.step(InsertionMode::InBody, start(local_name!("hr")));
        self.step(InsertionMode::InBody, end(local_name!("form")));
    }

    /// Handle a `</table>`. Returns false if there is no table in table scope.
    fn close_table(&self) -> bool {
        if !self.in_table_scope_named(local_name!("table")) {
            self.parse_error(Borrowed("No table to close"));
            return false;
        }
        self.generate_implied_end_tags(None);
        if !self.current_node_named(local_name!("table")) {
            self.parse_error(Borrowed("Unexpected open element while closing table"));
        }
        self.pop_until_named(local_name!("table"));
        self.mode.set(self.reset_insertion_mode());
        true
    }

    fn close_caption(&self) -> bool {
        if !self.in_table_scope_named(local_name!("caption")) {
            self.parse_error(Borrowed("No caption to close"));
            return false;
        }
        self.generate_implied_end_tags(None);
        if !self.current_node_named(local_name!("caption")) {
            self.parse_error(Borrowed("Unexpected open element while closing caption"));
        }
        self.pop_until_named(local_name!("caption"));
        self.clear_active_formatting_to_marker();
        self.mode.set(InsertionMode::InTable);
        true
    }

    fn close_colgroup(&self) -> bool {
        if self.current_node_named(local_name!("html")) {
            self.parse_error(Borrowed("No column group to close"));
            return false;
        }
        self.pop();
        self.mode.set(InsertionMode::InTable);
        true
    }

    fn close_row(&self) -> bool {
        if !self.in_table_scope_named(local_name!("tr")) {
            self.parse_error(Borrowed("No table row to close"));
            return false;
        }
        self.clear_stack_back_to(table_row_context);
        self.pop();
        self.mode.set(InsertionMode::InTableBody);
        true
    }

    fn close_the_cell(&self) {
        if self.in_table_scope_named(local_name!("td")) {
            self.end_cell(local_name!("td"));
        } else {
            self.end_cell(local_name!("th"));
        }
    }

    fn end_cell(&self, name: LocalName) {
        if !self.in_table_scope_named(name.clone()) {
            let msg = format_if!(
                self.opts.exact_errors,
                "No cell to close",
                "No {} cell to close",
                name
            );
            self.parse_error(msg);
            return;
        }
        self.generate_implied_end_tags(Some(name.clone()));
        if self.current_node_named(name.clone()) {
            self.pop();
        } else {
            self.parse_error(Borrowed("Unexpected open element while closing cell"));
            self.pop_until_named(name);
        }
        self.clear_active_formatting_to_marker();
        self.mode.set(InsertionMode::InRow);
    }

    fn close_select(&self) -> bool {
        if !self.in_table_scope_named(local_name!("select")) {
            self.parse_error(Borrowed("No select to close"));
            return false;
        }
        self.pop_until_named(local_name!("select"));
        self.mode.set(self.reset_insertion_mode());
        true
    }
}
