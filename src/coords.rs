//! Axial hex coordinate math for a hexagon-shaped grid.
//!
//! Cells live in axial coordinates `(q, r)` with `distance_from_center <= size`
//! and are stored in one dense array. Rows are laid out top to bottom
//! (`r = -size ..= size`); the mapping between `(q, r)` and the linear index is
//! closed-form in both directions, so no lookup tables are needed even for
//! multi-million-cell grids.

/// The six axial direction vectors, in fixed traversal order.
///
/// Growth and reachability walks depend on this order for reproducibility.
pub const NEIGHBOR_DIRECTIONS: [(i32, i32); 6] =
    [(0, 1), (-1, 1), (1, 0), (-1, 0), (1, -1), (0, -1)];

/// Exact cell count of a hexagon of radius `size`.
pub fn capacity(size: i32) -> usize {
    (size as i64 * (size as i64 + 1) * 3 + 1) as usize
}

/// First (leftmost) q of row `r`.
fn first_column(r: i32, size: i32) -> i32 {
    -size - r.min(0)
}

/// Linear index of the first cell of row `r`.
///
/// Rows `-size..=0` form an upper trapezoid whose row lengths grow by one per
/// row; rows `1..=size` form a lower trapezoid that shrinks again. Both starts
/// are arithmetic series; the factor pairs always differ in parity, so the
/// halving divisions are exact.
fn start_index_of_row(r: i32, size: i32) -> i64 {
    let r = r as i64;
    let size = size as i64;
    if r <= 0 {
        (3 * size + 1 + r) * (r + size) / 2
    } else {
        (3 * size + 2) * (size + 1) / 2 + (4 * size + 2 - r) * (r - 1) / 2
    }
}

/// Dense linear index of axial `(q, r)`.
///
/// `(q, r)` must lie within radius `size`; out-of-range coordinates are the
/// caller's bug.
pub fn linear_index(q: i32, r: i32, size: i32) -> usize {
    debug_assert!(distance_from_center(q, r) <= size, "({}, {}) outside radius {}", q, r, size);
    (start_index_of_row(r, size) + (q - first_column(r, size)) as i64) as usize
}

/// Row containing `index`, recovered by inverting the row-start series.
///
/// The quadratics are solved in f64: row starts stay below 2^53 for any
/// realistic radius, so floor of the positive root is exact.
fn row_from_index(index: usize, size: i32) -> i32 {
    let index = index as f64;
    let size = size as f64;
    let crossover = (3.0 / 2.0 * size + 1.0) * (1.0 + size);
    if index < crossover {
        // Upper trapezoid
        let a = 1.0 / 2.0;
        let b = 2.0 * size + 1.0 / 2.0;
        let c = 3.0 / 2.0 * size * size + 1.0 / 2.0 * size - index;
        ((-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a)).floor() as i32
    } else {
        // Lower trapezoid
        let a = -1.0 / 2.0;
        let b = 2.0 * size + 3.0 / 2.0;
        let c = 3.0 / 2.0 * size * size + 1.0 / 2.0 * size - index;
        ((-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a)).floor() as i32
    }
}

/// Axial `(q, r)` of a linear index. Exact inverse of [`linear_index`].
pub fn coord_from_index(index: usize, size: i32) -> (i32, i32) {
    debug_assert!(index < capacity(size), "index {} outside capacity {}", index, capacity(size));
    let r = row_from_index(index, size);
    let q = (index as i64 - start_index_of_row(r, size)) as i32 + first_column(r, size);
    (q, r)
}

/// Hex distance between two axial coordinates.
pub fn distance(q1: i32, r1: i32, q2: i32, r2: i32) -> i32 {
    let dq = q1 - q2;
    let dr = r1 - r2;
    (dq.abs() + (dq + dr).abs() + dr.abs()) / 2
}

/// Hex distance from `(q, r)` to the origin cell.
pub fn distance_from_center(q: i32, r: i32) -> i32 {
    distance(q, r, 0, 0)
}

/// Linear index of `index`'s neighbor in `direction` (0..6), or `None` if the
/// neighbor falls outside the hexagon.
pub fn neighbor_offset(index: usize, direction: usize, size: i32) -> Option<usize> {
    let (dq, dr) = NEIGHBOR_DIRECTIONS[direction];
    let (q, r) = coord_from_index(index, size);

    if distance_from_center(q + dq, r + dr) > size {
        return None;
    }
    Some(linear_index(q + dq, r + dr, size))
}
