// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! High-level interface to the parser.

use crate::error::ParseError;
use crate::input::{CharSource, StringInput};
use crate::tokenizer::{Tokenizer, TokenizerOpts};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts, TreeSink};
use crate::LocalName;

use tendril::StrTendril;

/// All-encompassing options struct for the parser.
#[derive(Clone, Debug, Default)]
pub struct ParseOpts {
    /// Tokenizer options.
    pub tokenizer: TokenizerOpts,

    /// Tree builder options.
    pub tree_builder: TreeBuilderOpts,
}

/// Parse an HTML document.
///
/// The returned `Parser` takes the input.
///
/// ## Example
///
/// ```rust,no_run
/// use html5parse::dom::Dom;
/// use html5parse::{parse_document, ParseError};
///
/// fn main() -> Result<(), ParseError> {
///     let dom = parse_document(Dom::default(), Default::default()).one("<p>Hello")?;
///     assert_eq!(dom.node(dom.document()).children.len(), 1);
///     Ok(())
/// }
/// ```
pub fn parse_document<Sink>(sink: Sink, opts: ParseOpts) -> Parser<Sink>
where
    Sink: TreeSink,
{
    Parser {
        sink,
        opts,
        context: None,
    }
}

/// Parse an HTML fragment as if it were the contents of an element named
/// `context`.
///
/// The fragment's nodes end up as the children of the root `html` element.
pub fn parse_fragment<Sink>(sink: Sink, mut opts: ParseOpts, context: LocalName) -> Parser<Sink>
where
    Sink: TreeSink,
{
    if opts.tokenizer.last_start_tag_name.is_none() {
        opts.tokenizer.last_start_tag_name = Some(context.to_string());
    }
    Parser {
        sink,
        opts,
        context: Some(context),
    }
}

/// An HTML parser, ready to receive its input.
pub struct Parser<Sink> {
    sink: Sink,
    opts: ParseOpts,
    context: Option<LocalName>,
}

impl<Sink: TreeSink> Parser<Sink> {
    /// Parse a complete string.
    pub fn one<T>(self, input: T) -> Result<Sink::Output, ParseError>
    where
        T: Into<StrTendril>,
    {
        self.from_source(StringInput::new(input.into()))
    }

    /// Parse everything `input` produces.
    ///
    /// In strict mode the first parse error stops the parse and is
    /// returned. Otherwise the sink's output is always returned, and
    /// errors are only reported to the sink.
    pub fn from_source<Source>(self, input: Source) -> Result<Sink::Output, ParseError>
    where
        Source: CharSource,
    {
        let mut tokenizer = Tokenizer::new(input, self.opts.tokenizer);
        let content_model = tokenizer.content_model();
        let tb = match self.context {
            None => TreeBuilder::new(self.sink, content_model, self.opts.tree_builder),
            Some(context) => TreeBuilder::new_for_fragment(
                self.sink,
                context,
                content_model,
                self.opts.tree_builder,
            ),
        };

        while let Some(token) = tokenizer.next_token() {
            tb.process_token(token, tokenizer.position());
            if let Some(error) = tb.take_fatal_error() {
                debug!("stopping at fatal parse error {}", error);
                return Err(error);
            }
        }

        tb.end(tokenizer.position());
        if let Some(error) = tb.take_fatal_error() {
            return Err(error);
        }
        Ok(tb.sink.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_document, parse_fragment, ParseOpts};
    use crate::dom::{Dom, NodeData, NodeId};
    use crate::tree_builder::TreeBuilderOpts;

    fn names(dom: &Dom, id: NodeId) -> Vec<String> {
        dom.node(id)
            .children
            .iter()
            .map(|&c| match dom.node(c).data {
                NodeData::Element { ref name, .. } => name.to_string(),
                NodeData::Text { ref contents } => format!("\"{}\"", contents),
                NodeData::Comment { .. } => "<!-- -->".to_owned(),
                NodeData::Doctype { .. } => "<!DOCTYPE>".to_owned(),
                NodeData::Document => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn document_gets_implied_structure() {
        let dom = parse_document(Dom::default(), ParseOpts::default())
            .one("<!DOCTYPE html><title>t</title><p>Hello")
            .unwrap();
        let doc = dom.document();
        assert_eq!(names(&dom, doc), ["<!DOCTYPE>", "html"]);

        let html = dom.node(doc).children[1];
        assert_eq!(names(&dom, html), ["head", "body"]);
        let body = dom.node(html).children[1];
        assert_eq!(names(&dom, body), ["p"]);
        let p = dom.node(body).children[0];
        assert_eq!(names(&dom, p), ["\"Hello\""]);
    }

    #[test]
    fn fragment_children_hang_off_root() {
        let dom = parse_fragment(Dom::default(), ParseOpts::default(), local_name!("td"))
            .one("<b>x</b>y")
            .unwrap();
        let html = dom.node(dom.document()).children[0];
        assert_eq!(names(&dom, html), ["b", "\"y\""]);
        assert!(dom.errors.borrow().is_empty());
    }

    #[test]
    fn fragment_in_raw_text_context() {
        let dom = parse_fragment(Dom::default(), ParseOpts::default(), local_name!("title"))
            .one("<b>&amp;")
            .unwrap();
        let html = dom.node(dom.document()).children[0];
        assert_eq!(names(&dom, html), ["\"<b>&\""]);
        assert!(dom.errors.borrow().is_empty());
    }

    #[test]
    fn strict_mode_returns_first_error() {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                strict: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = parse_document(Dom::default(), opts)
            .one("<!DOCTYPE html>\n<p>a</span>b")
            .err()
            .expect("strict parse should fail");
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn lenient_mode_records_errors() {
        let dom = parse_document(Dom::default(), ParseOpts::default())
            .one("<!DOCTYPE html><p>a</span>b")
            .unwrap();
        assert!(!dom.errors.borrow().is_empty());
    }
}
