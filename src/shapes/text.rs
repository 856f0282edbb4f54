//! A 5x7 pixel font for die labels.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::warn;

use crate::geometry::{Point, Rect};
use crate::layout::error::{ensure_positive, LayoutResult};
use crate::layout::{Cell, Layer};

const GLYPH_ROWS: usize = 7;
const GLYPH_COLS: usize = 5;
/// Horizontal advance per character, in pixels.
const ADVANCE: usize = 6;
/// Vertical advance per line, in pixels.
const LINE_ADVANCE: usize = 9;

lazy_static! {
    /// Glyph bitmaps, top row first. Bit 4 is the leftmost pixel.
    static ref GLYPHS: HashMap<char, [u8; GLYPH_ROWS]> = HashMap::from([
        ('0', [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E]),
        ('1', [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E]),
        ('2', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F]),
        ('3', [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E]),
        ('4', [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02]),
        ('5', [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E]),
        ('6', [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E]),
        ('7', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08]),
        ('8', [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E]),
        ('9', [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C]),
        ('A', [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
        ('B', [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E]),
        ('C', [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E]),
        ('D', [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C]),
        ('E', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F]),
        ('F', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10]),
        ('G', [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F]),
        ('H', [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
        ('I', [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E]),
        ('J', [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C]),
        ('K', [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11]),
        ('L', [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F]),
        ('M', [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11]),
        ('N', [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11]),
        ('O', [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
        ('P', [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10]),
        ('Q', [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D]),
        ('R', [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11]),
        ('S', [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E]),
        ('T', [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
        ('U', [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
        ('V', [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04]),
        ('W', [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A]),
        ('X', [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11]),
        ('Y', [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04]),
        ('Z', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F]),
        ('-', [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00]),
        ('_', [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F]),
        ('.', [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C]),
        (',', [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08]),
        ('(', [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02]),
        (')', [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08]),
        ('/', [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00]),
        ('=', [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00]),
        (':', [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00]),
        ('+', [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00]),
        (' ', [0x00; GLYPH_ROWS]),
    ]);
}

/// Horizontal runs of set pixels in one glyph row, as `(start, len)`.
fn runs(bits: u8) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for col in 0..=GLYPH_COLS {
        let set = col < GLYPH_COLS && bits & (1 << (GLYPH_COLS - 1 - col)) != 0;
        match (set, start) {
            (true, None) => start = Some(col),
            (false, Some(s)) => {
                out.push((s, col - s));
                start = None;
            }
            _ => {}
        }
    }
    out
}

/// Renders `string` with characters `size` microns tall.
///
/// The first line's baseline starts at the origin; further lines go
/// downward. Lowercase letters are drawn as uppercase. Characters without a
/// glyph are drawn as spaces.
pub fn text(string: &str, size: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("size", size)])?;
    let px = size / GLYPH_ROWS as f64;
    let mut cell = Cell::new("text");

    for (line_no, line) in string.lines().enumerate() {
        let base_y = -((line_no * LINE_ADVANCE) as f64) * px;
        for (i, c) in line.chars().enumerate() {
            let c = c.to_ascii_uppercase();
            let Some(glyph) = GLYPHS.get(&c) else {
                warn!("no glyph for character {c:?} in label {string:?}");
                continue;
            };
            let x0 = (i * ADVANCE) as f64 * px;
            for (row, bits) in glyph.iter().enumerate() {
                let y = base_y + (GLYPH_ROWS - 1 - row) as f64 * px;
                for (start, len) in runs(*bits) {
                    let x = x0 + start as f64 * px;
                    cell.add_rect(
                        layer,
                        Rect::new(Point::new(x, y), Point::new(x + len as f64 * px, y + px)),
                    );
                }
            }
        }
    }
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const L: Layer = Layer::new(5, 0);

    #[test]
    fn row_runs() {
        assert_eq!(runs(0x11), vec![(0, 1), (4, 1)]);
        assert_eq!(runs(0x1F), vec![(0, 5)]);
        assert_eq!(runs(0x0E), vec![(1, 3)]);
        assert!(runs(0).is_empty());
    }

    #[test]
    fn glyph_metrics() -> LayoutResult<()> {
        let t = text("I", 7.0, L)?;
        let bbox = t.bbox().unwrap();
        assert_relative_eq!(bbox.height(), 7.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.bottom(), 0.0, epsilon = 1e-6);
        // Three-wide caps plus five stem pixels.
        assert_relative_eq!(t.region(L).area(), 11.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn lowercase_and_unknown_characters() -> LayoutResult<()> {
        let upper = text("AB", 7.0, L)?;
        let lower = text("ab", 7.0, L)?;
        assert_eq!(upper.elems().len(), lower.elems().len());
        let odd = text("A~B", 7.0, L)?;
        assert_eq!(odd.elems().len(), upper.elems().len());
        Ok(())
    }

    #[test]
    fn multiline_goes_down() -> LayoutResult<()> {
        let t = text("1\n2", 7.0, L)?;
        let bbox = t.bbox().unwrap();
        assert_relative_eq!(bbox.bottom(), -9.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.top(), 7.0, epsilon = 1e-6);
        Ok(())
    }
}
