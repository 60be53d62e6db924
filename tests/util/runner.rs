// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::ffi::OsStr;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process;

/// Simple container for storing tests for later execution
pub struct Test {
    pub name: String,
    pub skip: bool,
    pub test: Box<dyn Fn()>,
}

impl Test {
    /// Invoke the stored test function
    ///
    /// A status message is printed if the wrapped closure completes
    /// or is marked as skipped. The test should panic to report
    /// failure.
    pub fn run(&self) {
        print!("test {} ...", self.name);
        if self.skip {
            println!(" SKIPPED");
        } else {
            (self.test)();
            println!(" ok");
        }
    }
}

/// Run every test, then exit with a failure status if any of them panicked.
pub fn run_all(tests: Vec<Test>) {
    let mut failed = vec![];
    for test in tests.iter() {
        if panic::catch_unwind(AssertUnwindSafe(|| test.run())).is_err() {
            println!(" FAILED");
            failed.push(test.name.clone());
        }
    }

    println!("\n{} tests, {} failed", tests.len(), failed.len());
    if !failed.is_empty() {
        for name in failed.iter() {
            println!("    {}", name);
        }
        process::exit(1);
    }
}

/// Call `mk` for every fixture file with extension `ext` under
/// `tests/data/<subdir>`, in name order.
pub fn foreach_fixture<Mk>(src_dir: &Path, subdir: &str, ext: &OsStr, mut mk: Mk)
where
    Mk: FnMut(&Path, fs::File),
{
    let dir = src_dir.join("tests").join("data").join(subdir);
    let mut paths: Vec<_> = fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("can't read fixtures in {}: {}", dir.display(), e))
        .map(|entry| entry.expect("bad directory entry").path())
        .filter(|path| path.extension() == Some(ext))
        .collect();
    paths.sort();

    for path in paths {
        let file = fs::File::open(&path).expect("can't open fixture");
        mk(&path, file);
    }
}
