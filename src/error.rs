// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parse errors and source positions.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// A 1-based line and column in the normalized input.
///
/// Line 1, column 0 means nothing has been consumed yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u64,
    pub column: u64,
}

impl Position {
    pub fn new(line: u64, column: u64) -> Position {
        Position { line, column }
    }
}

impl Default for Position {
    fn default() -> Position {
        Position { line: 1, column: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A recoverable error in the input, with the position at which it was
/// noticed.
///
/// Every parse error is recorded through the tree sink. In strict mode the
/// first one also ends the parse and is returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: Cow<'static, str>,
}

impl ParseError {
    pub fn new(position: Position, message: Cow<'static, str>) -> ParseError {
        ParseError { position, message }
    }
}
