//! Trajectory log
//!
//! Append-only record of the Cartesian positions the model passed through.

use rppkit_core::{CartesianPosition, Error, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Ordered positions, one per applied command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryLog {
    points: Vec<CartesianPosition>,
}

impl TrajectoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position
    pub fn push(&mut self, position: CartesianPosition) {
        self.points.push(position);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All recorded positions in order
    pub fn points(&self) -> &[CartesianPosition] {
        &self.points
    }

    /// Most recent position
    pub fn last(&self) -> Option<&CartesianPosition> {
        self.points.last()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Total path length through every recorded point
    pub fn path_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    /// Render as CSV with an `X,Y,Z` header and 3-decimal rows
    pub fn to_csv(&self) -> String {
        let mut out = String::from("X,Y,Z\n");
        for p in &self.points {
            let _ = writeln!(out, "{:.3},{:.3},{:.3}", p.x, p.y, p.z);
        }
        out
    }

    /// Write the CSV rendering to a file
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_csv()).map_err(|e| Error::file_access(path, e))?;
        tracing::info!(
            "Saved trajectory with {} points to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}
