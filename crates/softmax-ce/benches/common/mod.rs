use std::fmt;

/// Benchmark id component for a batch shape.
pub fn shape_id(rows: usize, classes: usize) -> ShapeId {
	ShapeId { rows, classes }
}

#[derive(Clone, Copy)]
pub struct ShapeId {
	pub rows: usize,
	pub classes: usize,
}

impl fmt::Display for ShapeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "rows={} classes={}", self.rows, self.classes)
	}
}
