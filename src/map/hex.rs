//! Hex coordinate system for tactical maps (offset coordinates)
//!
//! Flat-topped hexes addressed by `(x, y)` column/row pairs. Odd columns sit
//! half a tile lower than even columns, so four of the six neighbour offsets
//! depend on the parity of `x`. Distances and lines go through axial/cube
//! coordinates internally.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Offset hex coordinate (odd columns shoved down)
///
/// Ordering is lexicographic on `(x, y)`; it is the tie-break used wherever
/// two tiles are otherwise equivalent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub x: i32,
    pub y: i32,
}

impl HexCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn is_odd_column(&self) -> bool {
        self.x & 1 == 1
    }

    /// Convert to axial `(q, r)`
    pub fn to_axial(&self) -> (i32, i32) {
        let q = self.x;
        let r = self.y - (self.x - (self.x & 1)) / 2;
        (q, r)
    }

    /// Convert from axial `(q, r)`
    pub fn from_axial(q: i32, r: i32) -> Self {
        Self::new(q, r + (q - (q & 1)) / 2)
    }

    /// The adjacent tile in the given direction
    pub fn neighbor(&self, direction: HexDirection) -> HexCoord {
        let (dx, dy) = direction.offset(self.is_odd_column());
        HexCoord::new(self.x + dx, self.y + dy)
    }

    /// All 6 neighbouring coordinates, in `HexDirection::all()` order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HexDirection::all().map(|direction| self.neighbor(direction))
    }

    /// Hex distance (number of steps)
    pub fn distance(&self, other: &Self) -> i32 {
        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        let dq = q1 - q2;
        let dr = r1 - r2;
        (dq.abs() + dr.abs() + (dq + dr).abs()) / 2
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// Tiles on the straight line from self to other (inclusive)
    pub fn line_to(&self, other: &Self) -> Vec<HexCoord> {
        let n = self.distance(other);
        if n == 0 {
            return vec![*self];
        }

        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        // Nudge off exact edges so ties between two tiles resolve consistently
        let (q1, r1) = (q1 as f64 + 1e-6, r1 as f64 + 2e-6);
        let (q2, r2) = (q2 as f64 + 1e-6, r2 as f64 + 2e-6);

        let mut results = Vec::with_capacity(n as usize + 1);
        for i in 0..=n {
            let t = i as f64 / n as f64;
            let q = q1 + (q2 - q1) * t;
            let r = r1 + (r2 - r1) * t;
            let (rq, rr) = axial_round(q, r);
            results.push(HexCoord::from_axial(rq, rr));
        }
        results
    }

    /// Pixel centre of this hex for a given hex size (centre to corner)
    pub fn to_pixel(&self, size: f32) -> Vec2 {
        let column_shift = if self.is_odd_column() { 0.5 } else { 0.0 };
        Vec2::new(
            size * 1.5 * self.x as f32,
            size * 3.0_f32.sqrt() * (self.y as f32 + column_shift),
        )
    }

    /// Pixel centre rounded to whole pixels
    pub fn pixel_position(&self, size: f32) -> IVec2 {
        self.to_pixel(size).round().as_ivec2()
    }

    /// Hex containing the given pixel position
    pub fn from_pixel(pos: Vec2, size: f32) -> HexCoord {
        let q = (2.0 / 3.0 * pos.x) / size;
        let r = (-1.0 / 3.0 * pos.x + 3.0_f32.sqrt() / 3.0 * pos.y) / size;
        let (rq, rr) = axial_round(q as f64, r as f64);
        HexCoord::from_axial(rq, rr)
    }
}

/// Round fractional axial coordinates to the nearest hex
fn axial_round(q: f64, r: f64) -> (i32, i32) {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    }

    (rq as i32, rr as i32)
}

/// The six neighbour directions of a flat-topped hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl HexDirection {
    /// `(dx, dy)` step for this direction from an even or odd column
    pub fn offset(&self, odd_column: bool) -> (i32, i32) {
        match (self, odd_column) {
            (HexDirection::North, _) => (0, -1),
            (HexDirection::South, _) => (0, 1),
            (HexDirection::NorthEast, false) => (1, -1),
            (HexDirection::NorthEast, true) => (1, 0),
            (HexDirection::SouthEast, false) => (1, 0),
            (HexDirection::SouthEast, true) => (1, 1),
            (HexDirection::SouthWest, false) => (-1, 0),
            (HexDirection::SouthWest, true) => (-1, 1),
            (HexDirection::NorthWest, false) => (-1, -1),
            (HexDirection::NorthWest, true) => (-1, 0),
        }
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            HexDirection::North => HexDirection::South,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::SouthEast => HexDirection::NorthWest,
            HexDirection::South => HexDirection::North,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::NorthWest => HexDirection::SouthEast,
        }
    }

    /// All directions, clockwise from north
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::North,
            HexDirection::NorthEast,
            HexDirection::SouthEast,
            HexDirection::South,
            HexDirection::SouthWest,
            HexDirection::NorthWest,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_column_neighbors() {
        let c = HexCoord::new(4, 4);
        assert_eq!(c.neighbor(HexDirection::North), HexCoord::new(4, 3));
        assert_eq!(c.neighbor(HexDirection::NorthEast), HexCoord::new(5, 3));
        assert_eq!(c.neighbor(HexDirection::SouthEast), HexCoord::new(5, 4));
        assert_eq!(c.neighbor(HexDirection::South), HexCoord::new(4, 5));
        assert_eq!(c.neighbor(HexDirection::SouthWest), HexCoord::new(3, 4));
        assert_eq!(c.neighbor(HexDirection::NorthWest), HexCoord::new(3, 3));
    }

    #[test]
    fn test_odd_column_neighbors() {
        let c = HexCoord::new(5, 5);
        assert_eq!(c.neighbor(HexDirection::North), HexCoord::new(5, 4));
        assert_eq!(c.neighbor(HexDirection::NorthEast), HexCoord::new(6, 5));
        assert_eq!(c.neighbor(HexDirection::SouthEast), HexCoord::new(6, 6));
        assert_eq!(c.neighbor(HexDirection::South), HexCoord::new(5, 6));
        assert_eq!(c.neighbor(HexDirection::SouthWest), HexCoord::new(4, 6));
        assert_eq!(c.neighbor(HexDirection::NorthWest), HexCoord::new(4, 5));
    }

    #[test]
    fn test_neighbor_then_opposite_returns() {
        for c in [HexCoord::new(0, 0), HexCoord::new(3, 7), HexCoord::new(-3, -2)] {
            for d in HexDirection::all() {
                assert_eq!(c.neighbor(d).neighbor(d.opposite()), c);
            }
        }
    }

    #[test]
    fn test_neighbors_are_distance_one() {
        let c = HexCoord::new(7, 2);
        for n in c.neighbors() {
            assert_eq!(c.distance(&n), 1);
        }
    }

    #[test]
    fn test_distance() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&HexCoord::new(0, 3)), 3);
        assert_eq!(a.distance(&HexCoord::new(3, 0)), 3);
        // Diagonal travel gains half a row per column
        assert_eq!(a.distance(&HexCoord::new(2, 1)), 2);
        assert_eq!(a.distance(&HexCoord::new(4, 2)), 4);
    }

    #[test]
    fn test_axial_roundtrip() {
        for x in -4..4 {
            for y in -4..4 {
                let c = HexCoord::new(x, y);
                let (q, r) = c.to_axial();
                assert_eq!(HexCoord::from_axial(q, r), c);
            }
        }
    }

    #[test]
    fn test_line_endpoints_and_length() {
        let a = HexCoord::new(1, 1);
        let b = HexCoord::new(6, 3);
        let line = a.line_to(&b);
        assert_eq!(line.len() as i32, a.distance(&b) + 1);
        assert_eq!(line.first(), Some(&a));
        assert_eq!(line.last(), Some(&b));
        for pair in line.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]));
        }
    }

    #[test]
    fn test_line_to_self() {
        let a = HexCoord::new(2, 2);
        assert_eq!(a.line_to(&a), vec![a]);
    }

    #[test]
    fn test_vertical_line() {
        let line = HexCoord::new(4, 1).line_to(&HexCoord::new(4, 4));
        assert_eq!(
            line,
            vec![
                HexCoord::new(4, 1),
                HexCoord::new(4, 2),
                HexCoord::new(4, 3),
                HexCoord::new(4, 4)
            ]
        );
    }

    #[test]
    fn test_odd_column_sits_lower() {
        let even = HexCoord::new(0, 0).to_pixel(10.0);
        let odd = HexCoord::new(1, 0).to_pixel(10.0);
        assert!(odd.y > even.y);
    }

    #[test]
    fn test_pixel_roundtrip() {
        for x in 0..6 {
            for y in 0..6 {
                let c = HexCoord::new(x, y);
                assert_eq!(HexCoord::from_pixel(c.to_pixel(24.0), 24.0), c);
            }
        }
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(HexDirection::North.opposite(), HexDirection::South);
        assert_eq!(HexDirection::NorthEast.opposite(), HexDirection::SouthWest);
    }
}
