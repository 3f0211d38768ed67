//! Row grouping for `Table` cells.
//!
//! Cells render as four lowercase hex digits joined by single spaces, one
//! string per row. A row is `stride` cells wide; with a maximum width set,
//! wider rows are split evenly into sub-rows. Grouping never affects the flat
//! cell order.

use rgss_core::Table;

use crate::error::{Result, YamlError};

/// Render a table's cells as row strings.
pub fn table_rows(table: &Table, max_width: Option<usize>) -> Vec<String> {
    let stride = table.stride();
    if stride == 0 || table.cells.is_empty() {
        return Vec::new();
    }
    let row_len = match max_width {
        Some(max) if max > 0 && stride > max => {
            let blocks = stride.div_ceil(max);
            stride.div_ceil(blocks)
        }
        _ => stride,
    };

    let mut rows = Vec::with_capacity(table.cells.len() / row_len + 1);
    for row in table.cells.chunks(stride) {
        for sub in row.chunks(row_len) {
            let cells: Vec<String> = sub.iter().map(|c| format!("{c:04x}")).collect();
            rows.push(cells.join(" "));
        }
    }
    rows
}

/// Parse row strings back into the flat cell sequence.
pub fn parse_rows<S: AsRef<str>>(rows: &[S]) -> Result<Vec<u16>> {
    let mut cells = Vec::new();
    for row in rows {
        for token in row.as_ref().split_whitespace() {
            let invalid = || YamlError::InvalidTableCell {
                cell: token.to_string(),
            };
            if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let cell = u16::from_str_radix(token, 16).map_err(|_| invalid())?;
            cells.push(cell);
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(x: u32, y: u32, z: u32) -> Table {
        let cells = (1..=x * y * z).map(|c| c as u16).collect();
        Table::new(2, x, y, z, cells).unwrap()
    }

    #[test]
    fn rows_follow_stride() {
        let t = table(3, 2, 1);
        assert_eq!(table_rows(&t, None), vec!["0001 0002 0003", "0004 0005 0006"]);
        assert_eq!(table_rows(&t, Some(3)), vec!["0001 0002 0003", "0004 0005 0006"]);
    }

    #[test]
    fn wide_rows_split_evenly() {
        let t = table(5, 1, 1);
        // 5 cells, width 2 -> 3 blocks of ceil(5/3) = 2
        assert_eq!(table_rows(&t, Some(2)), vec!["0001 0002", "0003 0004", "0005"]);
        assert_eq!(table_rows(&t, Some(4)), vec!["0001 0002 0003", "0004 0005"]);
    }

    #[test]
    fn stride_falls_back_to_later_dimensions() {
        let t = table(1, 1, 3);
        assert_eq!(table_rows(&t, None), vec!["0001 0002 0003"]);
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        let t = Table::new(1, 2, 1, 1, vec![0xabcd, 7]).unwrap();
        assert_eq!(table_rows(&t, None), vec!["abcd 0007"]);
    }

    #[test]
    fn bad_cells() {
        assert!(matches!(
            parse_rows(&["0001 zz"]),
            Err(YamlError::InvalidTableCell { .. })
        ));
        assert!(parse_rows(&["10000"]).is_err());
        assert!(matches!(
            parse_rows(&["0001 +0f"]),
            Err(YamlError::InvalidTableCell { cell }) if cell == "+0f"
        ));
        assert!(parse_rows(&["-1"]).is_err());
        assert_eq!(parse_rows::<&str>(&[]).unwrap(), Vec::<u16>::new());
    }

    proptest! {
        #[test]
        fn grouping_never_changes_cell_order(
            (x, y, z, cells) in (1u32..9, 1u32..5, 1u32..3).prop_flat_map(|(x, y, z)| {
                (Just(x), Just(y), Just(z),
                 prop::collection::vec(any::<u16>(), (x * y * z) as usize))
            }),
            width in prop::option::of(1usize..10),
        ) {
            let t = Table::new(1, x, y, z, cells.clone()).unwrap();
            prop_assert_eq!(parse_rows(&table_rows(&t, width)).unwrap(), cells);
        }
    }
}
