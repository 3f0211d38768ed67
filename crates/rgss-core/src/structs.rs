//! Fixed-layout binary codecs for the engine's small value types.
//!
//! These types are stored on the wire as opaque byte blobs produced by the
//! engine's own dump hooks. All multi-byte fields are little-endian and there
//! is no padding.
//!
//! ```text
//! Table:  dim:u32 x:u32 y:u32 z:u32 cell_count:u32 cells:[u16; cell_count]
//! Color:  red:f64 green:f64 blue:f64 alpha:f64
//! Tone:   red:f64 green:f64 blue:f64 gray:f64
//! Rect:   x:i32 y:i32 width:i32 height:i32
//! ```

use crate::error::{CoreError, Result};
use crate::value::RString;

const TABLE_HEADER_SIZE: usize = 20;

/// Which fixed layout a custom leaf class uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Table,
    Color,
    Tone,
    Rect,
}

/// A grid of 16-bit cells, up to three dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Kept verbatim; some data sets it inconsistently with `x`, `y`, `z`.
    pub dim: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub cells: Vec<u16>,
}

impl Table {
    /// Build a table, checking that `x * y * z` matches the cell count.
    pub fn new(dim: u32, x: u32, y: u32, z: u32, cells: Vec<u16>) -> Result<Self> {
        let expected = volume(x, y, z);
        if expected != cells.len() as u64 {
            return Err(CoreError::SizeMismatch {
                what: "Table",
                expected: expected as usize,
                actual: cells.len(),
            });
        }
        Ok(Self {
            dim,
            x,
            y,
            z,
            cells,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < TABLE_HEADER_SIZE {
            return Err(CoreError::SizeMismatch {
                what: "Table header",
                expected: TABLE_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let header: Vec<u32> = data[..TABLE_HEADER_SIZE]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let (dim, x, y, z, count) = (header[0], header[1], header[2], header[3], header[4]);

        let body = &data[TABLE_HEADER_SIZE..];
        if body.len() % 2 != 0 || body.len() / 2 != count as usize {
            return Err(CoreError::SizeMismatch {
                what: "Table",
                expected: count as usize,
                actual: body.len() / 2,
            });
        }
        let cells = body
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Self::new(dim, x, y, z, cells)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TABLE_HEADER_SIZE + self.cells.len() * 2);
        for field in [self.dim, self.x, self.y, self.z, self.cells.len() as u32] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        for cell in &self.cells {
            buf.extend_from_slice(&cell.to_le_bytes());
        }
        buf
    }

    /// Number of cells in one presentation row: the first dimension that is
    /// at least 2, falling back to `z`.
    pub fn stride(&self) -> usize {
        if self.x >= 2 {
            self.x as usize
        } else if self.y >= 2 {
            self.y as usize
        } else {
            self.z as usize
        }
    }
}

fn volume(x: u32, y: u32, z: u32) -> u64 {
    u64::from(x) * u64::from(y) * u64::from(z)
}

/// An RGBA color with unchecked double components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

/// A screen tone: RGB shift plus gray level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub gray: f64,
}

/// An integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

fn read_f64x4(what: &'static str, data: &[u8]) -> Result<[f64; 4]> {
    if data.len() != 32 {
        return Err(CoreError::SizeMismatch {
            what,
            expected: 32,
            actual: data.len(),
        });
    }
    let mut out = [0.0; 4];
    for (slot, chunk) in out.iter_mut().zip(data.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *slot = f64::from_le_bytes(raw);
    }
    Ok(out)
}

fn write_f64x4(values: [f64; 4]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

impl Color {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let [red, green, blue, alpha] = read_f64x4("Color", data)?;
        Ok(Self {
            red,
            green,
            blue,
            alpha,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        write_f64x4([self.red, self.green, self.blue, self.alpha])
    }
}

impl Tone {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let [red, green, blue, gray] = read_f64x4("Tone", data)?;
        Ok(Self {
            red,
            green,
            blue,
            gray,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        write_f64x4([self.red, self.green, self.blue, self.gray])
    }
}

impl Rect {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != 16 {
            return Err(CoreError::SizeMismatch {
                what: "Rect",
                expected: 16,
                actual: data.len(),
            });
        }
        let v: Vec<i32> = data
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self {
            x: v[0],
            y: v[1],
            width: v[2],
            height: v[3],
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [self.x, self.y, self.width, self.height]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}

/// A custom binary leaf: a class whose instances are a byte blob on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Table(Table),
    Color(Color),
    Tone(Tone),
    Rect(Rect),
    /// A blob of a class outside the catalog, carried through untouched.
    Opaque { class: String, data: RString },
}

impl Leaf {
    /// Decode a blob with the given layout.
    pub fn decode(kind: LeafKind, data: &[u8]) -> Result<Self> {
        Ok(match kind {
            LeafKind::Table => Leaf::Table(Table::from_bytes(data)?),
            LeafKind::Color => Leaf::Color(Color::from_bytes(data)?),
            LeafKind::Tone => Leaf::Tone(Tone::from_bytes(data)?),
            LeafKind::Rect => Leaf::Rect(Rect::from_bytes(data)?),
        })
    }

    /// The blob bytes exactly as the engine expects them.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Leaf::Table(t) => t.to_bytes(),
            Leaf::Color(c) => c.to_bytes(),
            Leaf::Tone(t) => t.to_bytes(),
            Leaf::Rect(r) => r.to_bytes(),
            Leaf::Opaque { data, .. } => data.bytes.clone(),
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            Leaf::Table(_) => "Table",
            Leaf::Color(_) => "Color",
            Leaf::Tone(_) => "Tone",
            Leaf::Rect(_) => "Rect",
            Leaf::Opaque { class, .. } => class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table_bytes(header: [u32; 5], cells: &[u16]) -> Vec<u8> {
        let mut buf: Vec<u8> = header.iter().flat_map(|v| v.to_le_bytes()).collect();
        buf.extend(cells.iter().flat_map(|c| c.to_le_bytes()));
        buf
    }

    #[test]
    fn table_decodes_header_and_cells() {
        let bytes = table_bytes([2, 3, 2, 1, 6], &[1, 2, 3, 4, 5, 6]);
        let table = Table::from_bytes(&bytes).unwrap();
        assert_eq!((table.dim, table.x, table.y, table.z), (2, 3, 2, 1));
        assert_eq!(table.cells, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(table.to_bytes(), bytes);
    }

    #[test]
    fn table_keeps_inconsistent_dim() {
        let bytes = table_bytes([3, 4, 1, 1, 4], &[9, 9, 9, 9]);
        let table = Table::from_bytes(&bytes).unwrap();
        assert_eq!(table.dim, 3);
        assert_eq!(table.to_bytes(), bytes);
    }

    #[test]
    fn table_rejects_count_not_matching_cells() {
        let bytes = table_bytes([1, 2, 1, 1, 3], &[1, 2]);
        assert!(matches!(
            Table::from_bytes(&bytes),
            Err(CoreError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn table_rejects_volume_not_matching_count() {
        let bytes = table_bytes([1, 2, 2, 1, 3], &[1, 2, 3]);
        assert!(matches!(
            Table::from_bytes(&bytes),
            Err(CoreError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn table_rejects_short_header_and_odd_tail() {
        assert!(Table::from_bytes(&[0; 12]).is_err());
        let mut bytes = table_bytes([1, 1, 1, 1, 1], &[7]);
        bytes.push(0);
        assert!(Table::from_bytes(&bytes).is_err());
    }

    #[test]
    fn empty_table() {
        let bytes = table_bytes([1, 0, 0, 0, 0], &[]);
        let table = Table::from_bytes(&bytes).unwrap();
        assert!(table.cells.is_empty());
        assert_eq!(table.to_bytes(), bytes);
    }

    #[test]
    fn stride_prefers_first_wide_dimension() {
        let t = |x, y, z| Table::new(1, x, y, z, vec![0; (x * y * z) as usize]).unwrap();
        assert_eq!(t(3, 2, 1).stride(), 3);
        assert_eq!(t(1, 4, 2).stride(), 4);
        assert_eq!(t(1, 1, 5).stride(), 5);
        assert_eq!(t(1, 1, 1).stride(), 1);
    }

    #[test]
    fn color_passes_nan_and_out_of_range() {
        let color = Color {
            red: 300.0,
            green: -1.0,
            blue: f64::NAN,
            alpha: 255.0,
        };
        let back = Color::from_bytes(&color.to_bytes()).unwrap();
        assert_eq!(back.red, 300.0);
        assert_eq!(back.green, -1.0);
        assert!(back.blue.is_nan());
        assert_eq!(color.to_bytes(), back.to_bytes());
    }

    #[test]
    fn tone_and_rect_layouts() {
        let tone = Tone {
            red: -68.0,
            green: 0.0,
            blue: 68.0,
            gray: 0.0,
        };
        assert_eq!(tone.to_bytes().len(), 32);
        assert_eq!(&tone.to_bytes()[..8], &(-68.0f64).to_le_bytes());

        let rect = Rect {
            x: -1,
            y: 2,
            width: 640,
            height: 480,
        };
        let bytes = rect.to_bytes();
        assert_eq!(&bytes[..4], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(Rect::from_bytes(&bytes).unwrap(), rect);
        assert!(Rect::from_bytes(&bytes[..15]).is_err());
    }

    proptest! {
        #[test]
        fn table_bytes_preserve_header_and_cells(
            (x, y, z, cells) in (1u32..6, 1u32..6, 1u32..4).prop_flat_map(|(x, y, z)| {
                (Just(x), Just(y), Just(z),
                 prop::collection::vec(any::<u16>(), (x * y * z) as usize))
            }),
            dim in 0u32..4,
        ) {
            let table = Table::new(dim, x, y, z, cells.clone()).unwrap();
            let back = Table::from_bytes(&table.to_bytes()).unwrap();
            prop_assert_eq!(back.cells, cells);
            prop_assert_eq!((back.dim, back.x, back.y, back.z), (dim, x, y, z));
        }
    }
}
