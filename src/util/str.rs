// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// If `c` is an ASCII letter, return the corresponding lowercase
/// letter, otherwise None.
pub fn lower_ascii_letter(c: char) -> Option<char> {
    match c {
        'a'..='z' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

/// The characters both the tokenizer and the tree builder treat as
/// space. Vertical tab is included.
pub fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0B' | '\x0C' | '\r' | ' ')
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::{is_ascii_whitespace, lower_ascii_letter};

    test_eq!(lower_letter_a_is_a, lower_ascii_letter('a'), Some('a'));
    test_eq!(lower_letter_A_is_a, lower_ascii_letter('A'), Some('a'));
    test_eq!(lower_letter_symbol_is_None, lower_ascii_letter('!'), None);
    test_eq!(lower_letter_nonascii_is_None, lower_ascii_letter('\u{a66e}'), None);

    test_eq!(space_is_whitespace, is_ascii_whitespace(' '), true);
    test_eq!(vertical_tab_is_whitespace, is_ascii_whitespace('\x0B'), true);
    test_eq!(nbsp_is_not_whitespace, is_ascii_whitespace('\u{a0}'), false);
}
