// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Data that is known at compile-time and hard-coded into the binary.

/// Numeric references in U+0080 through U+009F name characters from the
/// Windows-1252 code page. The five slots it leaves undefined become
/// U+FFFD.
pub static C1_REPLACEMENTS: [char; 32] = [
    '\u{20ac}', '\u{fffd}', '\u{201a}', '\u{0192}',
    '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02c6}', '\u{2030}', '\u{0160}', '\u{2039}',
    '\u{0152}', '\u{fffd}', '\u{017d}', '\u{fffd}',
    '\u{fffd}', '\u{2018}', '\u{2019}', '\u{201c}',
    '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02dc}', '\u{2122}', '\u{0161}', '\u{203a}',
    '\u{0153}', '\u{fffd}', '\u{017e}', '\u{0178}',
];

include!(concat!(env!("OUT_DIR"), "/named_entities.rs"));
