//! Encoder from the object graph to the binary stream.
//!
//! Object numbering mirrors the reader exactly: a tree the reader produced
//! keeps its `Ref` ids meaningful when written back out.

use std::collections::HashMap;

use rgss_core::value::{is_fixnum, BigInt, Encoding, Hash, Object, RString, Value};
use rgss_core::Leaf;

use crate::tags;

#[derive(Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
    symbols: HashMap<String, usize>,
    /// Ids of the name strings written for named encodings.
    encodings: HashMap<String, usize>,
    next_id: usize,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn header(&mut self) {
        self.buf.push(tags::MAJOR_VERSION);
        self.buf.push(tags::MINOR_VERSION);
    }

    fn byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    fn remember(&mut self) -> usize {
        self.next_id += 1;
        self.next_id - 1
    }

    /// Packed variable-length integer.
    fn long(&mut self, x: i64) {
        if x == 0 {
            self.byte(0);
        } else if 0 < x && x < 123 {
            self.byte((x + 5) as u8);
        } else if -124 < x && x < 0 {
            self.byte(((x - 5) & 0xff) as u8);
        } else {
            let mut rest = x;
            let mut out = Vec::with_capacity(8);
            for i in 1..=8i8 {
                out.push((rest & 0xff) as u8);
                rest >>= 8;
                if rest == 0 {
                    self.byte(i as u8);
                    break;
                }
                if rest == -1 {
                    self.byte((-i) as u8);
                    break;
                }
            }
            self.buf.extend_from_slice(&out);
        }
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.long(bytes.len() as i64);
        self.buf.extend_from_slice(bytes);
    }

    fn symbol(&mut self, name: &str) {
        if let Some(&index) = self.symbols.get(name) {
            self.byte(tags::SYMLINK);
            self.long(index as i64);
            return;
        }
        let utf8 = !name.is_ascii();
        if utf8 {
            self.byte(tags::IVAR);
        }
        self.byte(tags::SYMBOL);
        self.bytes(name.as_bytes());
        self.symbols.insert(name.to_string(), self.symbols.len());
        if utf8 {
            self.long(1);
            self.symbol(tags::ENCODING_SHORT);
            self.byte(tags::TRUE);
        }
    }

    /// Write the encoding ivars of a string or blob. Binary has none.
    fn encoding(&mut self, encoding: &Encoding) {
        match encoding {
            Encoding::Binary => {}
            Encoding::Utf8 | Encoding::UsAscii => {
                self.long(1);
                self.symbol(tags::ENCODING_SHORT);
                self.byte(if *encoding == Encoding::Utf8 {
                    tags::TRUE
                } else {
                    tags::FALSE
                });
            }
            Encoding::Named(name) => {
                self.long(1);
                self.symbol(tags::ENCODING_LONG);
                if let Some(&id) = self.encodings.get(name) {
                    self.byte(tags::LINK);
                    self.long(id as i64);
                } else {
                    self.byte(tags::STRING);
                    self.bytes(name.as_bytes());
                    let id = self.remember();
                    self.encodings.insert(name.clone(), id);
                }
            }
        }
    }

    pub(crate) fn value(&mut self, value: &Value) {
        match value {
            Value::Nil => self.byte(tags::NIL),
            Value::Bool(true) => self.byte(tags::TRUE),
            Value::Bool(false) => self.byte(tags::FALSE),
            Value::Int(i) if is_fixnum(*i) => {
                self.byte(tags::FIXNUM);
                self.long(*i);
            }
            Value::Int(i) => self.bignum(&BigInt::from_i64(*i)),
            Value::BigInt(big) => self.bignum(big),
            Value::Float(f) => {
                self.remember();
                self.byte(tags::FLOAT);
                self.bytes(format_float(*f).as_bytes());
            }
            Value::String(s) => self.string(s),
            Value::Symbol(name) => self.symbol(name),
            Value::Array(items) => {
                self.remember();
                self.byte(tags::ARRAY);
                self.long(items.len() as i64);
                for item in items {
                    self.value(item);
                }
            }
            Value::Hash(hash) => self.hash(hash),
            Value::Object(object) => self.object(object),
            Value::UserMarshal(user) => {
                self.remember();
                self.byte(tags::USER_MARSHAL);
                self.symbol(&user.class);
                self.value(&user.data);
            }
            Value::Leaf(leaf) => self.leaf(leaf),
            Value::Ref(id) => {
                self.byte(tags::LINK);
                self.long(id.0 as i64);
            }
        }
    }

    fn bignum(&mut self, big: &BigInt) {
        self.remember();
        self.byte(tags::BIGNUM);
        self.byte(if big.negative { b'-' } else { b'+' });
        self.long((big.magnitude.len() / 2) as i64);
        self.buf.extend_from_slice(&big.magnitude);
    }

    fn string(&mut self, s: &RString) {
        self.remember();
        if s.encoding == Encoding::Binary {
            self.byte(tags::STRING);
            self.bytes(&s.bytes);
        } else {
            self.byte(tags::IVAR);
            self.byte(tags::STRING);
            self.bytes(&s.bytes);
            self.encoding(&s.encoding);
        }
    }

    fn hash(&mut self, hash: &Hash) {
        self.remember();
        self.byte(if hash.default.is_some() {
            tags::HASH_DEFAULT
        } else {
            tags::HASH
        });
        self.long(hash.entries.len() as i64);
        for (key, value) in &hash.entries {
            self.value(key);
            self.value(value);
        }
        if let Some(default) = &hash.default {
            self.value(default);
        }
    }

    fn object(&mut self, object: &Object) {
        self.remember();
        self.byte(tags::OBJECT);
        self.symbol(&object.class);
        self.long(object.fields.len() as i64);
        for (name, value) in &object.fields {
            self.symbol(&format!("@{name}"));
            self.value(value);
        }
    }

    fn leaf(&mut self, leaf: &Leaf) {
        let encoding = match leaf {
            Leaf::Opaque { data, .. } => data.encoding.clone(),
            _ => Encoding::Binary,
        };
        let has_ivars = encoding != Encoding::Binary;
        if has_ivars {
            self.byte(tags::IVAR);
        }
        self.byte(tags::USER_DEF);
        self.symbol(leaf.class_name());
        self.bytes(&leaf.to_bytes());
        if has_ivars {
            self.encoding(&encoding);
        }
        // Numbered only once the payload and its marker are out.
        self.remember();
    }
}

/// Shortest decimal that reads back as the same double, in the engine's
/// spelling: `1`, `1.5`, `1.5e2`, `0.001`, `1e-5`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits as `d.ddde±x`.
    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let decpt = exponent.parse::<i32>().unwrap_or(0) + 1;
    let digs = digits.len() as i32;

    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
    }
    if decpt < -3 || decpt > digs {
        out.push_str(&digits[..1]);
        if digs > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push_str(&format!("e{}", decpt - 1));
    } else if decpt > 0 {
        let split = decpt as usize;
        out.push_str(&digits[..split]);
        if digs > decpt {
            out.push('.');
            out.push_str(&digits[split..]);
        }
    } else {
        out.push_str("0.");
        out.push_str(&"0".repeat((-decpt) as usize));
        out.push_str(&digits);
    }
    out
}
