//! Row-major grid indexing and ring-expanding neighbor search.

/// Row of a linear cell index on a grid `columns` wide.
#[inline(always)]
pub fn row_of(index: usize, columns: usize) -> usize {
    index / columns
}

/// Column of a linear cell index on a grid `columns` wide.
#[inline(always)]
pub fn column_of(index: usize, columns: usize) -> usize {
    index % columns
}

/// Linear index of the cell at (`row`, `column`). No bounds check against the population.
#[inline(always)]
pub fn index_at(row: usize, column: usize, columns: usize) -> usize {
    row * columns + column
}

/// Collects up to `max_candidates` cells around `index` by expanding square rings of
/// Chebyshev distance 1, 2, 3, ... until enough candidates are found or the farthest
/// grid edge has been passed.
///
/// Ring bounds are clamped to the grid, so cells near a border see fewer candidates.
/// The origin, indices outside `[0, total_count)` and duplicates are never returned.
/// `row_count` is taken as given: an origin lying outside `0..row_count` is tolerated
/// and only ever yields in-range indices.
pub fn neighbors_of(
    index: usize,
    max_candidates: usize,
    columns: usize,
    row_count: usize,
    total_count: usize,
) -> Vec<usize> {
    let mut neighbors = Vec::with_capacity(max_candidates.min(total_count));
    if max_candidates == 0 || columns == 0 {
        return neighbors;
    }

    let columns_i = columns as isize;
    let rows_i = row_count as isize;
    let row = row_of(index, columns) as isize;
    let column = column_of(index, columns) as isize;

    // Farthest any grid edge can be from the origin.
    let max_distance = row
        .max(rows_i - row - 1)
        .max(column)
        .max(columns_i - column - 1);

    'rings: for distance in 1..=max_distance {
        let clamped_min_row = (row - distance).max(0);
        let clamped_max_row = (row + distance).min(rows_i - 1);
        let min_row = clamped_min_row.min(clamped_max_row);
        let max_row = clamped_min_row.max(clamped_max_row);
        let min_column = (column - distance).max(0);
        let max_column = (column + distance).min(columns_i - 1);

        for r in min_row..=max_row {
            for c in min_column..=max_column {
                let on_ring = r == min_row || r == max_row || c == min_column || c == max_column;
                if !on_ring {
                    continue;
                }
                let candidate = r * columns_i + c;
                if candidate < 0 || candidate as usize >= total_count || candidate as usize == index
                {
                    continue;
                }
                let candidate = candidate as usize;
                if neighbors.contains(&candidate) {
                    continue;
                }
                neighbors.push(candidate);
                if neighbors.len() >= max_candidates {
                    break 'rings;
                }
            }
        }
    }

    neighbors
}

/// Fixed-width layout of a population of `total` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    columns: usize,
    total: usize,
}

impl GridLayout {
    /// `columns` must be non-zero; validated parameters guarantee it.
    pub fn new(columns: usize, total: usize) -> Self {
        debug_assert!(columns > 0, "grid layout needs at least one column");
        Self { columns, total }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows, counting a partially filled last row.
    pub fn rows(&self) -> usize {
        self.total.div_ceil(self.columns)
    }

    pub fn row_of(&self, index: usize) -> usize {
        row_of(index, self.columns)
    }

    pub fn column_of(&self, index: usize) -> usize {
        column_of(index, self.columns)
    }

    /// Index at (`row`, `column`), or `None` when the position holds no cell.
    pub fn index_at(&self, row: usize, column: usize) -> Option<usize> {
        if column >= self.columns {
            return None;
        }
        let index = index_at(row, column, self.columns);
        (index < self.total).then_some(index)
    }

    pub fn neighbors_of(&self, index: usize, max_candidates: usize) -> Vec<usize> {
        neighbors_of(index, max_candidates, self.columns, self.rows(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn row_and_column_round_trip() {
        for columns in [1, 2, 3, 10] {
            for total in [1, 7, 10, 23, 100] {
                let layout = GridLayout::new(columns, total);
                for index in 0..total {
                    let (row, column) = (layout.row_of(index), layout.column_of(index));
                    assert_eq!(row, index / columns);
                    assert_eq!(column, index % columns);
                    assert_eq!(layout.index_at(row, column), Some(index));
                }
            }
        }
    }

    #[test]
    fn index_at_rejects_empty_positions() {
        let layout = GridLayout::new(10, 15);
        assert_eq!(layout.rows(), 2);
        assert_eq!(layout.index_at(1, 4), Some(14));
        assert_eq!(layout.index_at(1, 5), None);
        assert_eq!(layout.index_at(0, 10), None);
    }

    #[test]
    fn neighbor_candidates_respect_bounds() {
        for (columns, total) in [(10, 100), (10, 15), (10, 3), (2, 4), (1, 6), (7, 50)] {
            let layout = GridLayout::new(columns, total);
            for index in 0..total {
                for max_candidates in [0, 1, 3, 8, 20, 200] {
                    let found = layout.neighbors_of(index, max_candidates);
                    assert!(found.len() <= max_candidates);
                    assert!(!found.contains(&index));
                    assert!(found.iter().all(|&n| n < total));
                    let unique: HashSet<_> = found.iter().collect();
                    assert_eq!(unique.len(), found.len(), "duplicates for {index}");
                }
            }
        }
    }

    #[test]
    fn unbounded_search_reaches_every_other_cell() {
        let layout = GridLayout::new(10, 37);
        for index in [0, 9, 18, 36] {
            let mut found = layout.neighbors_of(index, usize::MAX);
            found.sort_unstable();
            let expected: Vec<usize> = (0..37).filter(|&i| i != index).collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn zero_candidates_yields_nothing() {
        assert!(neighbors_of(55, 0, 10, 10, 100).is_empty());
    }

    #[test]
    fn center_cell_takes_the_first_ring() {
        assert_eq!(
            neighbors_of(55, 8, 10, 10, 100),
            vec![44, 45, 46, 54, 56, 64, 65, 66]
        );
    }

    #[test]
    fn corner_cell_expands_past_the_first_ring() {
        assert_eq!(neighbors_of(0, 5, 10, 10, 100), vec![1, 10, 11, 2, 12]);
    }

    #[test]
    fn two_by_two_grid() {
        assert_eq!(neighbors_of(0, 4, 2, 2, 4), vec![1, 2, 3]);
        assert_eq!(neighbors_of(3, 4, 2, 2, 4), vec![0, 1, 2]);
    }

    #[test]
    fn single_cell_has_no_neighbors() {
        assert!(GridLayout::new(10, 1).neighbors_of(0, 4).is_empty());
    }

    #[test]
    fn truncated_row_count_is_tolerated() {
        // 15 cells with a floor row count of 1 leaves the origin below the last row.
        let found = neighbors_of(12, 10, 10, 1, 15);
        assert!(!found.is_empty());
        assert!(found.iter().all(|&n| n < 15 && n != 12));
    }
}
