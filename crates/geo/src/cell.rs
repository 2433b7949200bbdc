use crate::RasterSize;

/// Represents a pixel in the raster using row, col coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn from_row_col(row: usize, col: usize) -> Self {
        Cell { row, col }
    }

    pub fn increment(&mut self, cols_in_grid: usize) {
        self.col += 1;
        if self.col >= cols_in_grid {
            self.col = 0;
            self.row += 1;
        }
    }

    /// Row-major offset of the cell in a raster with `cols_in_grid` columns
    pub fn index_in_raster(&self, cols_in_grid: usize) -> usize {
        self.row * cols_in_grid + self.col
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}

/// Iterator over the cells in a raster
/// Iteration occurs from the top-left cell to the bottom-right cell in row-major order.
pub struct CellIterator {
    rows: usize,
    cols: usize,
    current: Cell,
}

impl CellIterator {
    pub fn for_raster_with_size(size: RasterSize) -> Self {
        CellIterator {
            rows: if size.cols == 0 { 0 } else { size.rows },
            cols: size.cols,
            current: Cell::from_row_col(0, 0),
        }
    }

    /// Iterates the cells of the rows in `row_range`
    pub fn for_rows(size: RasterSize, row_range: std::ops::Range<usize>) -> Self {
        let end = row_range.end.min(size.rows);
        CellIterator {
            rows: if size.cols == 0 { 0 } else { end },
            cols: size.cols,
            current: Cell::from_row_col(row_range.start.min(end), 0),
        }
    }
}

impl Iterator for CellIterator {
    type Item = Cell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.row >= self.rows {
            return None;
        }

        let current = self.current;
        self.current.increment(self.cols);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.rows.saturating_sub(self.current.row) * self.cols).saturating_sub(self.current.col);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellIterator {}
