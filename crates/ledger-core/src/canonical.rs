//! Canonical byte encoding of a block, the input to its digest.
//!
//! The encoding is a JSON object with the five block fields in lexicographic
//! key order:
//!
//! ```text
//! {"data": "...", "index": 1, "previous_hash": "...", "proof": "...", "timestamp": 1600000000000}
//! ```
//!
//! Members are separated by `", "` and keys from values by `": "`. Every
//! character outside printable ASCII is written as a `\uXXXX` escape (lowercase
//! hex, UTF-16 surrogate pairs above U+FFFF), so the output is pure ASCII and an
//! external verifier can rebuild it byte for byte.

use crate::Block;
use serde::Serialize;
use serde_json::{ser::Formatter, Value};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// JSON formatter producing the spaced separators and ASCII-only strings of
/// the canonical encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    // Quotes, backslashes and control characters never reach this method;
    // serde_json routes them through `write_char_escape`.
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Encode `block` in its canonical form.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    let fields: BTreeMap<&str, Value> = BTreeMap::from([
        ("data", Value::from(block.data.as_str())),
        ("index", Value::from(block.index)),
        ("previous_hash", Value::from(block.previous_hash.as_str())),
        ("proof", Value::from(block.proof.as_str())),
        ("timestamp", Value::from(block.timestamp)),
    ]);

    let mut out = Vec::with_capacity(128 + block.data.len());
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    fields
        .serialize(&mut ser)
        .expect("string-keyed map always serializes into a Vec");
    out
}
