//! Single-pass decoder from the binary stream to the object graph.

use rgss_core::value::{BigInt, Encoding, Hash, Object, ObjectId, RString, UserMarshal, Value};
use rgss_core::{Leaf, Registry};

use crate::error::{MarshalError, Result};
use crate::tags;

/// What the reader remembers about each object-table slot. Only string
/// contents are kept, for resolving encoding names written as links.
enum Slot {
    Text(String),
    Other,
}

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    registry: &'a Registry,
    symbols: Vec<String>,
    objects: Vec<Slot>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], registry: &'a Registry) -> Self {
        Self {
            data,
            pos: 0,
            registry,
            symbols: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read the two-byte format header.
    pub(crate) fn read_header(&mut self) -> Result<(u8, u8)> {
        let major = self.byte()?;
        let minor = self.byte()?;
        if major != tags::MAJOR_VERSION || minor > tags::MINOR_VERSION {
            return Err(MarshalError::UnsupportedVersion { major, minor });
        }
        Ok((major, minor))
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(MarshalError::UnexpectedEndOfInput { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(MarshalError::UnexpectedEndOfInput {
                offset: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Packed variable-length integer.
    fn long(&mut self) -> Result<i64> {
        let c = self.byte()? as i8 as i64;
        if c == 0 {
            return Ok(0);
        }
        if c > 0 {
            if c > 4 {
                return Ok(c - 5);
            }
            let mut x: i64 = 0;
            for i in 0..c {
                x |= i64::from(self.byte()?) << (8 * i);
            }
            Ok(x)
        } else {
            if c < -4 {
                return Ok(c + 5);
            }
            let mut x: i64 = -1;
            for i in 0..-c {
                x &= !(0xff << (8 * i));
                x |= i64::from(self.byte()?) << (8 * i);
            }
            Ok(x)
        }
    }

    fn length(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.long()?;
        usize::try_from(len).map_err(|_| MarshalError::UnexpectedEndOfInput { offset })
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.length()?;
        self.take(len)
    }

    fn reserve(&mut self) -> usize {
        self.objects.push(Slot::Other);
        self.objects.len() - 1
    }

    fn remember(&mut self, slot: Slot) {
        self.objects.push(slot);
    }

    /// Read a symbol in a position that requires one (class and ivar names).
    fn symbol(&mut self) -> Result<String> {
        let offset = self.pos;
        match self.byte()? {
            tags::SYMBOL => self.symbol_body(false),
            tags::SYMLINK => self.symbol_link(),
            tags::IVAR => match self.byte()? {
                tags::SYMBOL => self.symbol_body(true),
                tag => Err(MarshalError::UnsupportedIvar {
                    detail: format!("on wire tag 0x{tag:02x} in symbol position"),
                    offset,
                }),
            },
            tag => Err(MarshalError::InvalidSymbol {
                detail: format!("expected a symbol, found wire tag 0x{tag:02x}"),
                offset,
            }),
        }
    }

    fn symbol_body(&mut self, has_ivars: bool) -> Result<String> {
        let offset = self.pos;
        let raw = self.bytes()?;
        let name = std::str::from_utf8(raw)
            .map_err(|e| MarshalError::InvalidSymbol {
                detail: e.to_string(),
                offset,
            })?
            .to_string();
        self.symbols.push(name.clone());
        if has_ivars {
            // Symbol encodings carry no information the graph keeps.
            let count = self.length()?;
            for _ in 0..count {
                self.symbol()?;
                self.value()?;
            }
        }
        Ok(name)
    }

    fn symbol_link(&mut self) -> Result<String> {
        let offset = self.pos;
        let index = self.long()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .cloned()
            .ok_or(MarshalError::InvalidLink {
                table: "symbol",
                index,
                offset,
            })
    }

    fn ivar_name(&mut self) -> Result<String> {
        let name = self.symbol()?;
        Ok(name.strip_prefix('@').map(str::to_string).unwrap_or(name))
    }

    /// Read the encoding ivars that follow a string or blob.
    fn encoding(&mut self) -> Result<Encoding> {
        let offset = self.pos;
        let count = self.length()?;
        let mut encoding = Encoding::Binary;
        for _ in 0..count {
            let name = self.symbol()?;
            let value = self.value()?;
            encoding = match (name.as_str(), value) {
                (tags::ENCODING_SHORT, Value::Bool(true)) => Encoding::Utf8,
                (tags::ENCODING_SHORT, Value::Bool(false)) => Encoding::UsAscii,
                (tags::ENCODING_LONG, Value::String(s)) => {
                    Encoding::Named(String::from_utf8_lossy(&s.bytes).into_owned())
                }
                (tags::ENCODING_LONG, Value::Ref(id)) => match self.objects.get(id.0) {
                    Some(Slot::Text(text)) => Encoding::Named(text.clone()),
                    _ => {
                        return Err(MarshalError::UnsupportedIvar {
                            detail: format!("encoding link {id} does not name a string"),
                            offset,
                        })
                    }
                },
                (other, value) => {
                    return Err(MarshalError::UnsupportedIvar {
                        detail: format!("'{other}' = {}", value.kind()),
                        offset,
                    })
                }
            };
        }
        Ok(encoding)
    }

    pub(crate) fn value(&mut self) -> Result<Value> {
        let offset = self.pos;
        let tag = self.byte()?;
        match tag {
            tags::NIL => Ok(Value::Nil),
            tags::TRUE => Ok(Value::Bool(true)),
            tags::FALSE => Ok(Value::Bool(false)),
            tags::FIXNUM => Ok(Value::Int(self.long()?)),
            tags::BIGNUM => self.bignum(),
            tags::FLOAT => self.float(),
            tags::STRING => self.string(false),
            tags::SYMBOL => Ok(Value::Symbol(self.symbol_body(false)?)),
            tags::SYMLINK => Ok(Value::Symbol(self.symbol_link()?)),
            tags::ARRAY => {
                self.reserve();
                let len = self.length()?;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.value()?);
                }
                Ok(Value::Array(items))
            }
            tags::HASH | tags::HASH_DEFAULT => {
                self.reserve();
                let len = self.length()?;
                let mut entries = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    let key = self.value()?;
                    let value = self.value()?;
                    entries.push((key, value));
                }
                let default = if tag == tags::HASH_DEFAULT {
                    Some(Box::new(self.value()?))
                } else {
                    None
                };
                Ok(Value::Hash(Hash { entries, default }))
            }
            tags::OBJECT => {
                self.reserve();
                let class = self.symbol()?;
                self.registry.resolve(&class);
                let count = self.length()?;
                let mut fields = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let name = self.ivar_name()?;
                    fields.push((name, self.value()?));
                }
                Ok(Value::Object(Object::new(class, fields)))
            }
            tags::USER_MARSHAL => {
                self.reserve();
                let class = self.symbol()?;
                self.registry.resolve(&class);
                let data = self.value()?;
                Ok(Value::UserMarshal(UserMarshal {
                    class,
                    data: Box::new(data),
                }))
            }
            tags::USER_DEF => self.user_def(false),
            tags::IVAR => {
                let inner_offset = self.pos;
                match self.byte()? {
                    tags::STRING => self.string(true),
                    tags::USER_DEF => self.user_def(true),
                    tags::SYMBOL => Ok(Value::Symbol(self.symbol_body(true)?)),
                    inner => Err(MarshalError::UnsupportedIvar {
                        detail: format!("on wire tag 0x{inner:02x}"),
                        offset: inner_offset,
                    }),
                }
            }
            tags::LINK => {
                let index = self.long()?;
                match usize::try_from(index) {
                    Ok(i) if i < self.objects.len() => Ok(Value::Ref(ObjectId(i))),
                    _ => Err(MarshalError::InvalidLink {
                        table: "object",
                        index,
                        offset,
                    }),
                }
            }
            tag => Err(MarshalError::UnknownWireTag { tag, offset }),
        }
    }

    fn bignum(&mut self) -> Result<Value> {
        let offset = self.pos;
        let negative = match self.byte()? {
            b'-' => true,
            b'+' => false,
            tag => return Err(MarshalError::UnknownWireTag { tag, offset }),
        };
        let shorts = self.length()?;
        let len = shorts
            .checked_mul(2)
            .ok_or(MarshalError::UnexpectedEndOfInput { offset })?;
        let magnitude = self.take(len)?;
        let big = BigInt::new(negative, magnitude.to_vec());
        self.reserve();
        Ok(match big.to_i64() {
            Some(i) => Value::Int(i),
            None => Value::BigInt(big),
        })
    }

    fn float(&mut self) -> Result<Value> {
        let offset = self.pos;
        let raw = self.bytes()?;
        // Older writers append mantissa bytes after a NUL.
        let raw = raw.split(|&b| b == 0).next().unwrap_or_default();
        let text = String::from_utf8_lossy(raw);
        let value = match text.as_ref() {
            "nan" => f64::NAN,
            "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            other => other.parse::<f64>().map_err(|_| MarshalError::InvalidFloat {
                text: other.to_string(),
                offset,
            })?,
        };
        self.reserve();
        Ok(Value::Float(value))
    }

    fn string(&mut self, has_ivars: bool) -> Result<Value> {
        let bytes = self.bytes()?.to_vec();
        let index = self.objects.len();
        self.remember(Slot::Other);
        let encoding = if has_ivars {
            self.encoding()?
        } else {
            Encoding::Binary
        };
        if let Ok(text) = std::str::from_utf8(&bytes) {
            self.objects[index] = Slot::Text(text.to_string());
        }
        Ok(Value::String(RString::new(bytes, encoding)))
    }

    fn user_def(&mut self, has_ivars: bool) -> Result<Value> {
        let class = self.symbol()?;
        let offset = self.pos;
        let bytes = self.bytes()?.to_vec();
        let encoding = if has_ivars {
            self.encoding()?
        } else {
            Encoding::Binary
        };
        let leaf = match self.registry.leaf_kind(&class) {
            Some(kind) => Leaf::decode(kind, &bytes)?,
            None => {
                self.registry.resolve(&class);
                log::debug!(
                    "keeping {} bytes of {class} at offset {offset} as an opaque blob",
                    bytes.len()
                );
                Leaf::Opaque {
                    class,
                    data: RString::new(bytes, encoding),
                }
            }
        };
        self.reserve();
        Ok(Value::Leaf(leaf))
    }
}
