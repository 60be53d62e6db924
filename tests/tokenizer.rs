// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use html5parse::input::StringInput;
use html5parse::tendril::StrTendril;
use html5parse::tokenizer::states::{Cdata, ContentModel, Pcdata, Plaintext, Rcdata};
use html5parse::tokenizer::{Attribute, Doctype, EndTag, StartTag, Tag};
use html5parse::tokenizer::{CharacterTokens, CommentToken, DoctypeToken, ParseError, TagToken};
use html5parse::tokenizer::{Token, Tokenizer, TokenizerOpts};
use html5parse::LocalName;

use serde_json::{Map, Value};
use std::borrow::Cow::Borrowed;
use std::ffi::OsStr;
use std::io::Read;
use std::mem;
use std::path::Path;

use util::runner::{foreach_fixture, run_all, Test};

mod util {
    pub mod runner;
}

/// Collects tokens in a normalized form: adjacent character tokens merged,
/// attributes sorted, and error messages blanked (or dropped entirely
/// unless errors are being compared).
struct TokenLogger {
    tokens: Vec<Token>,
    current_str: StrTendril,
    exact_errors: bool,
}

impl TokenLogger {
    fn new(exact_errors: bool) -> TokenLogger {
        TokenLogger {
            tokens: vec![],
            current_str: StrTendril::new(),
            exact_errors,
        }
    }

    // Push anything other than character tokens
    fn push(&mut self, token: Token) {
        self.finish_str();
        self.tokens.push(token);
    }

    fn finish_str(&mut self) {
        if !self.current_str.is_empty() {
            let s = mem::replace(&mut self.current_str, StrTendril::new());
            self.tokens.push(CharacterTokens(s));
        }
    }

    fn process_token(&mut self, token: Token) {
        match token {
            CharacterTokens(b) => self.current_str.push_slice(&b),

            ParseError(_) => {
                if self.exact_errors {
                    self.push(ParseError(Borrowed("")));
                }
            },

            TagToken(mut t) => {
                t.attrs.sort_by(|a1, a2| a1.name.cmp(&a2.name));
                self.push(TagToken(t));
            },

            _ => self.push(token),
        }
    }

    fn get_tokens(mut self) -> Vec<Token> {
        self.finish_str();
        self.tokens
    }
}

fn tokenize(input: &str, opts: TokenizerOpts) -> Vec<Token> {
    let mut logger = TokenLogger::new(opts.exact_errors);
    for token in Tokenizer::new(StringInput::from(input), opts) {
        logger.process_token(token);
    }
    logger.get_tokens()
}

trait JsonExt: Sized {
    fn get_str(&self) -> String;
    fn get_tendril(&self) -> StrTendril;
    fn get_nullable_tendril(&self) -> Option<StrTendril>;
    fn get_bool(&self) -> bool;
    fn get_obj(&self) -> &Map<String, Self>;
    fn get_list(&self) -> &Vec<Self>;
    fn find(&self, key: &str) -> &Self;
}

impl JsonExt for Value {
    fn get_str(&self) -> String {
        match *self {
            Value::String(ref s) => s.to_string(),
            _ => panic!("Value::get_str: not a String"),
        }
    }

    fn get_tendril(&self) -> StrTendril {
        match *self {
            Value::String(ref s) => StrTendril::from_slice(s),
            _ => panic!("Value::get_tendril: not a String"),
        }
    }

    fn get_nullable_tendril(&self) -> Option<StrTendril> {
        match *self {
            Value::Null => None,
            Value::String(ref s) => Some(StrTendril::from_slice(s)),
            _ => panic!("Value::get_nullable_tendril: not a String"),
        }
    }

    fn get_bool(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            _ => panic!("Value::get_bool: not a Bool"),
        }
    }

    fn get_obj(&self) -> &Map<String, Value> {
        match *self {
            Value::Object(ref m) => m,
            _ => panic!("Value::get_obj: not an Object"),
        }
    }

    fn get_list(&self) -> &Vec<Value> {
        match *self {
            Value::Array(ref m) => m,
            _ => panic!("Value::get_list: not an Array"),
        }
    }

    fn find(&self, key: &str) -> &Value {
        self.get_obj().get(key).unwrap()
    }
}

// Parse a JSON object (other than "ParseError") to a token.
fn json_to_token(js: &Value) -> Token {
    let parts = js.get_list();
    // Collect refs here so we don't have to use "ref" in all the patterns below.
    let args: Vec<&Value> = parts[1..].iter().collect();
    match &*parts[0].get_str() {
        "DOCTYPE" => DoctypeToken(Doctype {
            name: args[0].get_nullable_tendril(),
            public_id: args[1].get_nullable_tendril(),
            system_id: args[2].get_nullable_tendril(),
            force_quirks: !args[3].get_bool(),
        }),

        "StartTag" => TagToken(Tag {
            kind: StartTag,
            name: LocalName::from(&*args[0].get_str()),
            attrs: args[1]
                .get_obj()
                .iter()
                .map(|(k, v)| Attribute {
                    name: LocalName::from(&**k),
                    value: v.get_tendril(),
                })
                .collect(),
        }),

        "EndTag" => TagToken(Tag {
            kind: EndTag,
            name: LocalName::from(&*args[0].get_str()),
            attrs: vec![],
        }),

        "Comment" => CommentToken(args[0].get_tendril()),

        "Character" => CharacterTokens(args[0].get_tendril()),

        _ => panic!("don't understand token {:?}", parts),
    }
}

// Parse the "output" field of the test case into a vector of tokens.
fn json_to_tokens(js: &Value, exact_errors: bool) -> Vec<Token> {
    // Use a TokenLogger so that we combine character tokens separated
    // by an ignored error.
    let mut logger = TokenLogger::new(exact_errors);
    for tok in js.get_list().iter() {
        match *tok {
            Value::String(ref s) if s == "ParseError" => {
                logger.process_token(ParseError(Borrowed("")))
            },
            _ => logger.process_token(json_to_token(tok)),
        }
    }
    logger.get_tokens()
}

fn content_model(name: &str) -> ContentModel {
    match name {
        "PCDATA" => Pcdata,
        "RCDATA" => Rcdata,
        "CDATA" => Cdata,
        "PLAINTEXT" => Plaintext,
        s => panic!("don't know content model {}", s),
    }
}

fn mk_test(name: String, input: String, expect: Value, opts: TokenizerOpts) -> Test {
    Test {
        name,
        skip: false,
        test: Box::new(move || {
            let output = tokenize(&input, opts.clone());
            let expect_toks = json_to_tokens(&expect, opts.exact_errors);
            if output != expect_toks {
                panic!(
                    "\ninput: {:?}\ngot: {:?}\nexpected: {:?}",
                    input, output, expect_toks
                );
            }
        }),
    }
}

fn mk_tests(tests: &mut Vec<Test>, filename: &str, js: &Value) {
    let obj = js.get_obj();
    let input = js.find("input").get_str();
    let expect = js.find("output").clone();
    let desc = format!("tok: {}: {}", filename, js.find("description").get_str());

    // Some tests have a last start tag name.
    let start_tag = obj.get("lastStartTag").map(|s| s.get_str());

    // Some tests want to start in a content model other than PCDATA.
    let models: Vec<Option<ContentModel>> = match obj.get("contentModelFlags") {
        Some(Value::Array(xs)) => xs.iter().map(|s| Some(content_model(&s.get_str()))).collect(),
        None => vec![None],
        _ => panic!("don't understand contentModelFlags value"),
    };

    for model in models.into_iter() {
        for &exact_errors in [false, true].iter() {
            let mut name = desc.clone();
            if let Some(m) = model {
                name = format!("{} (in content model {:?})", name, m);
            }
            if exact_errors {
                name = format!("{} (exact errors)", name);
            }

            tests.push(mk_test(
                name,
                input.clone(),
                expect.clone(),
                TokenizerOpts {
                    exact_errors,
                    initial_content_model: model,
                    last_start_tag_name: start_tag.clone(),
                },
            ));
        }
    }
}

fn tests(src_dir: &Path) -> Vec<Test> {
    let mut tests = vec![];

    foreach_fixture(src_dir, "tokenizer", OsStr::new("test"), |path, mut file| {
        let mut s = String::new();
        file.read_to_string(&mut s).expect("file reading error");
        let js: Value = serde_json::from_str(&s).expect("json parse error");
        let filename = path.file_name().and_then(|n| n.to_str()).expect("bad file name");

        if let Some(Value::Array(lst)) = js.get_obj().get("tests") {
            for test in lst.iter() {
                mk_tests(&mut tests, filename, test);
            }
        }
    });

    tests
}

fn main() {
    run_all(tests(Path::new(env!("CARGO_MANIFEST_DIR"))));
}
