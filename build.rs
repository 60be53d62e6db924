// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

extern crate phf_codegen;
extern crate serde_json;
extern crate string_cache_codegen;

use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let out_dir = env::var("OUT_DIR").unwrap();

    named_entities(Path::new(&manifest_dir), Path::new(&out_dir));
    local_names(Path::new(&manifest_dir), Path::new(&out_dir));

    println!("cargo:rerun-if-changed=data/entities.json");
    println!("cargo:rerun-if-changed=data/local_names.txt");
}

fn named_entities(manifest_dir: &Path, out_dir: &Path) {
    let path = manifest_dir.join("data").join("entities.json");
    let json_file = File::open(&path).expect("can't open JSON file");
    let js: Value = serde_json::from_reader(BufReader::new(json_file)).expect("can't parse JSON file");
    let map = build_map(js).expect("JSON file does not match entities.json format");

    let mut phf_map = phf_codegen::Map::new();
    for (key, value) in map.iter() {
        phf_map.entry(&**key, &format!("{:?}", value));
    }

    let path = out_dir.join("named_entities.rs");
    let mut file = BufWriter::new(File::create(&path).unwrap());
    writeln!(
        &mut file,
        "/// Entity names (without the leading `&`) and every proper prefix of one.\n\
         /// Prefixes map to `(0, 0)`."
    )
    .unwrap();
    write!(
        &mut file,
        "pub static NAMED_ENTITIES: phf::Map<&'static str, (u32, u32)> = {}",
        phf_map.build()
    )
    .unwrap();
    writeln!(&mut file, ";").unwrap();
}

// Build the map from entity names (and their prefixes) to code points.
fn build_map(js: Value) -> Option<HashMap<String, (u32, u32)>> {
    let mut map = HashMap::new();
    let json_map = match js {
        Value::Object(m) => m,
        _ => return None,
    };

    for (k, v) in json_map.into_iter() {
        let codepoints: Vec<u32> = v
            .get("codepoints")?
            .as_array()?
            .iter()
            .map(|n| n.as_u64().map(|n| n as u32))
            .collect::<Option<_>>()?;

        assert!(!codepoints.is_empty() && codepoints.len() <= 2);
        let codepoint_pair = (codepoints[0], codepoints.get(1).cloned().unwrap_or(0));

        // Slice off the initial '&'
        assert!(k.starts_with('&'));
        map.insert(k[1..].to_string(), codepoint_pair);
    }

    // Add every missing prefix of those keys, mapping to NULL characters.
    map.insert("".to_string(), (0, 0));
    let keys: Vec<String> = map.keys().cloned().collect();
    for k in keys.into_iter() {
        for n in 1..k.len() {
            let pfx = k[..n].to_string();
            map.entry(pfx).or_insert((0, 0));
        }
    }

    Some(map)
}

fn local_names(manifest_dir: &Path, out_dir: &Path) {
    let generated = out_dir.join("local_names.rs");
    let mut generated = BufWriter::new(File::create(generated).unwrap());

    let local_names = manifest_dir.join("data").join("local_names.txt");
    let mut local_names_atom = string_cache_codegen::AtomType::new("LocalName", "local_name!");
    for line in BufReader::new(File::open(local_names).unwrap()).lines() {
        let local_name = line.unwrap();
        let local_name = local_name.trim();
        if !local_name.is_empty() {
            local_names_atom.atom(local_name);
        }
    }
    local_names_atom
        .with_macro_doc("Takes a local name as a string and returns its key in the string cache.")
        .write_to(&mut generated)
        .unwrap();
}
