// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Various sets of HTML tag names, and macros for declaring them.

use crate::LocalName;

macro_rules! declare_tag_set_impl ( ($param:ident, $b:ident, $supr:ident, $($tag:tt)+) => (
    match *$param {
        $( local_name!($tag) )|+ => $b,
        _ => $supr($param),
    }
));

macro_rules! declare_tag_set_body (
    ($param:ident = [$supr:ident] - $($tag:tt)+)
        => ( declare_tag_set_impl!($param, false, $supr, $($tag)+) );

    ($param:ident = [$supr:ident] + $($tag:tt)+)
        => ( declare_tag_set_impl!($param, true, $supr, $($tag)+) );

    ($param:ident = $($tag:tt)+)
        => ( declare_tag_set_impl!($param, true, empty_set, $($tag)+) );
);

macro_rules! declare_tag_set (
    (pub $name:ident = $($toks:tt)+) => (
        pub fn $name(p: &$crate::LocalName) -> bool {
            declare_tag_set_body!(p = $($toks)+)
        }
    );

    ($name:ident = $($toks:tt)+) => (
        fn $name(p: &$crate::LocalName) -> bool {
            declare_tag_set_body!(p = $($toks)+)
        }
    );
);

#[inline(always)]
pub fn empty_set(_: &LocalName) -> bool {
    false
}

// Elements that bound a scope search unless the search is the table variant.
declare_tag_set!(pub scoping_tag =
    "applet" "button" "caption" "html" "marquee" "object" "table" "td" "th");

declare_tag_set!(pub sectioning_tag =
    "section" "nav" "article" "aside" "header" "footer" "datagrid" "command" "event-source");

declare_tag_set!(pub special_tag = [sectioning_tag] +
    "address" "area" "base" "basefont" "bgsound" "blockquote" "body" "br" "center"
    "col" "colgroup" "dd" "dir" "div" "dl" "dt" "embed" "fieldset" "form" "frame"
    "frameset" "h1" "h2" "h3" "h4" "h5" "h6" "head" "hr" "iframe" "image" "img"
    "input" "isindex" "li" "link" "listing" "menu" "meta" "noembed" "noframes"
    "noscript" "ol" "optgroup" "option" "p" "param" "plaintext" "pre" "script"
    "select" "spacer" "style" "tbody" "textarea" "tfoot" "thead" "title" "tr" "ul"
    "wbr");

/// Elements that are not formatting elements, for the adoption agency's
/// furthest block and the list item stop search.
pub fn special_or_scoping(p: &LocalName) -> bool {
    special_tag(p) || scoping_tag(p)
}

declare_tag_set!(pub implied_end_tag = "dd" "dt" "li" "p" "td" "th" "tr");

declare_tag_set!(pub heading_tag = "h1" "h2" "h3" "h4" "h5" "h6");

declare_tag_set!(pub table_outer = "table" "tbody" "tfoot" "thead" "tr");

declare_tag_set!(pub table_body_context = "tbody" "tfoot" "thead" "html");

declare_tag_set!(pub table_row_context = "tr" "html");

declare_tag_set!(pub table_context = "table" "html");

// Start tags the tokenizer accepts with a trailing `/`.
declare_tag_set!(pub void_elements =
    "base" "link" "meta" "hr" "br" "img" "embed" "param" "area" "col" "input");
