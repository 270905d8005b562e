//! Wall layout generation
//!
//! A wall segment is `rows × cols` brick cells, centred on its anchor in x
//! and stacked upward from the anchor height. Alternate cells are nudged
//! forward to interlock, and even rows shift sideways for a running bond.
//! Output is row-major; brick instantiation consumes it in this order.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::tuning::WallSegment;

/// Forward (z) nudge for interlocking cells
pub const INTERLOCK_NUDGE: f32 = 0.05;
/// Sideways (x) shift applied to even rows
pub const RUNNING_BOND_SHIFT: f32 = -0.1;

/// Centre position of one brick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutCell {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LayoutCell {
    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Column offsets `-(cols-1)/2 ..= (cols-1)/2` in unit steps
///
/// Offsets are fractional when `cols` is even.
pub fn column_offsets(cols: u32) -> impl Iterator<Item = f32> {
    let start = -(cols.saturating_sub(1) as f32) / 2.0;
    (0..cols).map(move |k| start + k as f32)
}

/// Cells of one wall segment, row by row from the bottom
pub fn generate_wall_layout(rows: u32, cols: u32, anchor: Vec3, cell: Vec3) -> Vec<LayoutCell> {
    let mut cells = Vec::with_capacity((rows * cols) as usize);

    for i in 0..rows {
        let even_row = i % 2 == 0;
        let shift = if even_row { RUNNING_BOND_SHIFT } else { 0.0 };

        for j in column_offsets(cols) {
            // Fractional offsets count as odd columns
            let even_col = j % 2.0 == 0.0;
            let nudge = if even_row == even_col {
                INTERLOCK_NUDGE
            } else {
                0.0
            };

            cells.push(LayoutCell {
                x: j * cell.x + anchor.x + shift,
                y: anchor.y + cell.y * 0.5 + cell.y * i as f32,
                z: anchor.z + nudge,
            });
        }
    }

    cells
}

/// All segments accumulated in order into one layout
pub fn generate_layout(segments: &[WallSegment], cell: Vec3) -> Vec<LayoutCell> {
    segments
        .iter()
        .flat_map(|s| generate_wall_layout(s.rows, s.cols, s.anchor, cell))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: Vec3 = Vec3::splat(0.5);

    #[test]
    fn test_column_offsets_odd_and_even() {
        let odd: Vec<f32> = column_offsets(5).collect();
        assert_eq!(odd, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);

        let even: Vec<f32> = column_offsets(4).collect();
        assert_eq!(even, vec![-1.5, -0.5, 0.5, 1.5]);

        let single: Vec<f32> = column_offsets(1).collect();
        assert_eq!(single, vec![0.0]);
    }

    #[test]
    fn test_first_row_is_shifted_and_interlocked() {
        let cells = generate_wall_layout(2, 3, Vec3::ZERO, CELL);
        assert_eq!(cells.len(), 6);

        // Row 0 (even): shifted left, even columns (-1 is odd, 0 is even) nudged
        assert!((cells[0].x - (-0.5 - 0.1)).abs() < 1e-6);
        assert_eq!(cells[0].z, 0.0);
        assert!((cells[1].x - (-0.1)).abs() < 1e-6);
        assert_eq!(cells[1].z, INTERLOCK_NUDGE);
        assert_eq!(cells[0].y, 0.25);

        // Row 1 (odd): no shift, odd columns nudged
        assert_eq!(cells[3].x, -0.5);
        assert_eq!(cells[3].z, INTERLOCK_NUDGE);
        assert_eq!(cells[4].x, 0.0);
        assert_eq!(cells[4].z, 0.0);
        assert_eq!(cells[3].y, 0.75);
    }

    #[test]
    fn test_anchor_offsets_every_cell() {
        let anchor = Vec3::new(1.0, 0.5, -1.5);
        let base = generate_wall_layout(3, 2, Vec3::ZERO, CELL);
        let moved = generate_wall_layout(3, 2, anchor, CELL);
        for (a, b) in base.iter().zip(&moved) {
            assert!((b.position() - a.position() - anchor).length() < 1e-6);
        }
    }

    #[test]
    fn test_fractional_columns_follow_odd_rule() {
        let cells = generate_wall_layout(2, 2, Vec3::ZERO, CELL);
        // Even row: no column is even, so nothing nudged
        assert!(cells[..2].iter().all(|c| c.z == 0.0));
        // Odd row: every column counts as odd, so all nudged
        assert!(cells[2..].iter().all(|c| c.z == INTERLOCK_NUDGE));
    }

    #[test]
    fn test_segments_accumulate_in_order() {
        let segments = [
            WallSegment::new(4, 5, Vec3::ZERO),
            WallSegment::new(4, 1, Vec3::new(-1.0, 0.0, -0.5)),
        ];
        let cells = generate_layout(&segments, CELL);
        assert_eq!(cells.len(), 24);
        assert_eq!(&cells[..20], &generate_wall_layout(4, 5, Vec3::ZERO, CELL)[..]);
        assert!((cells[20].x - (-1.1)).abs() < 1e-6);
        assert_eq!(cells[20].z, -0.5 + INTERLOCK_NUDGE);
    }
}
