// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use html5parse::dom::{Dom, NodeData, NodeId};
use html5parse::{parse_document, parse_fragment, LocalName, ParseOpts};

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, BufRead};
use std::mem;
use std::path::Path;

use util::runner::{foreach_fixture, run_all, Test};

mod util {
    pub mod runner;
}

fn parse_tests<It: Iterator<Item = String>>(mut lines: It) -> Vec<HashMap<String, String>> {
    let mut tests = vec![];
    let mut test = HashMap::new();
    let mut key: Option<String> = None;
    let mut val = String::new();

    macro_rules! finish_val ( () => (
        match key.take() {
            None => (),
            Some(key) => {
                assert!(test.insert(key, mem::take(&mut val)).is_none());
            }
        }
    ));

    macro_rules! finish_test ( () => (
        if !test.is_empty() {
            tests.push(mem::take(&mut test));
        }
    ));

    loop {
        match lines.next() {
            None => break,
            Some(line) => {
                if let Some(rest) = line.strip_prefix('#') {
                    finish_val!();
                    if line == "#data" {
                        finish_test!();
                    }
                    key = Some(rest.to_owned());
                } else {
                    val.push_str(&line);
                    val.push('\n');
                }
            },
        }
    }

    finish_val!();
    finish_test!();
    tests
}

fn serialize(buf: &mut String, indent: usize, dom: &Dom, id: NodeId) {
    buf.push('|');
    buf.push_str(&" ".repeat(indent));

    let node = dom.node(id);
    match node.data {
        NodeData::Document => panic!("should not reach Document"),

        NodeData::Doctype {
            ref name,
            ref public_id,
            ref system_id,
            ..
        } => {
            buf.push_str("<!DOCTYPE ");
            buf.push_str(name);
            if !public_id.is_empty() || !system_id.is_empty() {
                buf.push_str(&format!(" \"{}\" \"{}\"", public_id, system_id));
            }
            buf.push_str(">\n");
        },

        NodeData::Text { ref contents } => {
            buf.push('"');
            buf.push_str(contents);
            buf.push_str("\"\n");
        },

        NodeData::Comment { ref contents } => {
            buf.push_str("<!-- ");
            buf.push_str(contents);
            buf.push_str(" -->\n");
        },

        NodeData::Element {
            ref name,
            ref attrs,
        } => {
            buf.push('<');
            buf.push_str(name);
            buf.push_str(">\n");

            let mut attrs = attrs.clone();
            attrs.sort_by(|x, y| x.name.cmp(&y.name));

            for attr in attrs.into_iter() {
                buf.push('|');
                buf.push_str(&" ".repeat(indent + 2));
                buf.push_str(&format!("{}=\"{}\"\n", attr.name, attr.value));
            }
        },
    }

    for &child in node.children.iter() {
        serialize(buf, indent + 2, dom, child);
    }
}

fn make_test(tests: &mut Vec<Test>, filename: &str, idx: usize, fields: HashMap<String, String>) {
    let get_field = |key| {
        let field = fields.get(key).expect("missing field");
        field.trim_end_matches('\n').to_string()
    };

    let data = get_field("data");
    let expected = get_field("document");
    let num_errors = fields
        .get("errors")
        .map(|errors| errors.lines().filter(|l| !l.trim().is_empty()).count());
    let context = fields
        .get("document-fragment")
        .map(|field| LocalName::from(field.trim_end_matches('\n')));
    let name = format!("tb: {}-{}", filename, idx);

    tests.push(Test {
        name,
        skip: false,
        test: Box::new(move || {
            let mut result = String::new();
            let dom = match context {
                None => {
                    let dom = parse_document(Dom::default(), ParseOpts::default())
                        .one(&*data)
                        .expect("lenient parse failed");
                    let children = dom.node(dom.document()).children.clone();
                    for child in children {
                        serialize(&mut result, 1, &dom, child);
                    }
                    dom
                },
                Some(ref context) => {
                    let dom = parse_fragment(Dom::default(), ParseOpts::default(), context.clone())
                        .one(&*data)
                        .expect("lenient parse failed");
                    // fragment case: serialize children of the html element
                    // rather than children of the document
                    let root = dom.node(dom.document()).children[0];
                    let children = dom.node(root).children.clone();
                    for child in children {
                        serialize(&mut result, 1, &dom, child);
                    }
                    dom
                },
            };
            result.pop(); // drop the trailing newline

            if result != expected {
                panic!(
                    "\ninput: {}\ngot:\n{}\nexpected:\n{}\n",
                    data, result, expected
                );
            }

            if let Some(num_errors) = num_errors {
                let errors = dom.errors.borrow();
                if errors.len() != num_errors {
                    panic!(
                        "\ninput: {}\ngot {} errors, expected {}:\n{:#?}\n",
                        data,
                        errors.len(),
                        num_errors,
                        *errors
                    );
                }
            }
        }),
    });
}

fn tests(src_dir: &Path) -> Vec<Test> {
    let mut tests = vec![];

    foreach_fixture(src_dir, "tree-construction", OsStr::new("dat"), |path, file| {
        let buf = io::BufReader::new(file);
        let lines = buf.lines().map(|res| res.expect("couldn't read"));
        let data = parse_tests(lines);
        let filename = path.file_name().and_then(|n| n.to_str()).expect("bad file name");

        for (i, test) in data.into_iter().enumerate() {
            make_test(&mut tests, filename, i, test);
        }
    });

    tests
}

fn main() {
    run_all(tests(Path::new(env!("CARGO_MANIFEST_DIR"))));
}
