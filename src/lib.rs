// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![crate_name = "html5parse"]

//! An error-tolerant HTML tokenizer and tree builder.
//!
//! Text flows from a [`CharSource`](input::CharSource) through the
//! [`Tokenizer`](tokenizer::Tokenizer) into the
//! [`TreeBuilder`](tree_builder::TreeBuilder), which drives a
//! [`TreeSink`](tree_builder::TreeSink). The [`driver`] module wires the
//! pieces together; [`dom::Dom`] is the default sink.

#[macro_use]
extern crate log;
#[macro_use]
extern crate mac;

pub use tendril;

include!(concat!(env!("OUT_DIR"), "/local_names.rs"));

pub use driver::{parse_document, parse_fragment, ParseOpts, Parser};
pub use error::{ParseError, Position};

mod util {
    pub mod str;
}

pub mod dom;
pub mod driver;
pub mod error;
pub mod input;
pub mod tokenizer;
pub mod tree_builder;
