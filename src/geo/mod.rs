pub mod geo_distance;
pub mod geo_kdtree;

pub use geo_distance::*;
pub use geo_kdtree::*;

use crate::PositionRecord;

/// Размерность пространства индекса: широта и долгота.
pub const DIMENSIONS: usize = 2;

/// Точка `[latitude, longitude]` в градусах.
pub type Point = [f64; DIMENSIONS];

/// Строит k-d индекс последовательной вставкой записей.
pub fn build_index(records: impl IntoIterator<Item = PositionRecord>) -> KdTree {
    KdTree::build(records)
}
