//! Distance matrices with explicit per-cell outcomes.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, DistanceResult};

/// One cell of a distance matrix.
///
/// Failures are first-class values so a bad pair never silently vanishes
/// from a batch; callers decide how to degrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatrixCell {
    /// The pair resolved.
    Ok(DistanceResult),
    /// The provider answered but found no route for this pair.
    Unreachable,
    /// The call covering this cell failed; the message names the cause.
    Failed(String),
}

impl MatrixCell {
    /// The resolved result, if any.
    #[must_use]
    pub const fn as_result(&self) -> Option<&DistanceResult> {
        match self {
            Self::Ok(result) => Some(result),
            Self::Unreachable | Self::Failed(_) => None,
        }
    }

    /// Whether the cell carries a resolved result.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// A 2D table of distance outcomes indexed by origin row and destination
/// column, in the caller's original order.
///
/// # Examples
/// ```
/// use fieldroute_core::{Coordinate, DistanceMatrix, MatrixCell};
///
/// let a = Coordinate::new(0.0, 0.0)?;
/// let b = Coordinate::new(1.0, 1.0)?;
/// let matrix = DistanceMatrix::empty(vec![a], vec![a, b]);
/// assert_eq!(matrix.cells.len(), 1);
/// assert_eq!(matrix.cells[0].len(), 2);
/// assert!(matrix.cell(0, 1).is_some());
/// # Ok::<(), fieldroute_core::DistanceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    /// Origin coordinates, one per row.
    pub origins: Vec<Coordinate>,
    /// Destination coordinates, one per column.
    pub destinations: Vec<Coordinate>,
    /// Row-major cells; `cells[i][j]` is origin `i` to destination `j`.
    pub cells: Vec<Vec<MatrixCell>>,
}

impl DistanceMatrix {
    /// Build a matrix with every cell marked failed-pending.
    ///
    /// The orchestrator overwrites cells as sub-grid responses arrive, so
    /// any cell left untouched reports its sub-grid's failure rather than a
    /// fabricated distance.
    #[must_use]
    pub fn empty(origins: Vec<Coordinate>, destinations: Vec<Coordinate>) -> Self {
        let cells = origins
            .iter()
            .map(|_| vec![MatrixCell::Failed("not computed".to_owned()); destinations.len()])
            .collect();
        Self {
            origins,
            destinations,
            cells,
        }
    }

    /// Cell at `(row, column)`, if in range.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&MatrixCell> {
        self.cells.get(row).and_then(|cells| cells.get(column))
    }

    /// Overwrite the cell at `(row, column)`; out-of-range writes are
    /// ignored.
    pub fn set_cell(&mut self, row: usize, column: usize, cell: MatrixCell) {
        if let Some(slot) = self
            .cells
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
        {
            *slot = cell;
        }
    }

    /// Count of cells carrying a resolved result.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_ok())
            .count()
    }
}
