//! Peak detection and flood-fill centroid integration.
//!
//! Turns a populated [`Matrix`] into up to [`MAX_TOUCH`] candidate
//! touches. Each candidate is seeded at a local maximum and grown by an
//! explicit-stack flood fill rather than recursion, per the panel's
//! pathological-input concern: a fully saturated 30x40 grid is only 1200
//! cells, but an explicit stack keeps that bound obvious.

use crate::config::{
    Orientation, GRID_COLS, GRID_ROWS, LARGE_AREA_FRINGE, LARGE_AREA_UNPRESS, MAX_TOUCH,
    PINCH_THRESHOLD, PIXELS_PER_POINT, TOUCH_THRESHOLD,
};
use crate::decoder::Matrix;

/// A peak found during extraction, before tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub i: f64,
    pub j: f64,
    pub pw: i64,
    pub touch_major: i32,
    pub x: i32,
    pub y: i32,
}

/// Marks which touch (if any) has claimed a cell during flood fill.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    Unclaimed,
    /// Claimed as a core cell; permanently owned by this touch region.
    Core,
    /// Visited as a fringe cell of touch index `n`; not reusable by the
    /// same touch but, matching the original implementation, still
    /// revisitable by a different touch's flood fill.
    Fringe(usize),
}

struct Neighbors {
    grid: [[Claim; GRID_COLS]; GRID_ROWS],
}

impl Neighbors {
    fn new() -> Self {
        Self { grid: [[Claim::Unclaimed; GRID_COLS]; GRID_ROWS] }
    }
}

fn weight(v: u8) -> f64 {
    (v as f64).powf(1.5)
}

/// Locate up to [`MAX_TOUCH`] candidate touches in raster-scan order of
/// their seed cell.
pub fn extract(matrix: &Matrix, orientation: Orientation) -> Vec<Candidate> {
    let mut claims = Neighbors::new();
    let mut candidates = Vec::with_capacity(MAX_TOUCH);

    'scan: for i in 0..GRID_ROWS {
        for j in 0..GRID_COLS {
            if candidates.len() >= MAX_TOUCH {
                break 'scan;
            }
            if claims.grid[i][j] != Claim::Unclaimed {
                continue;
            }
            let v = matrix.get(i, j);
            if v <= TOUCH_THRESHOLD {
                continue;
            }
            if !is_local_max(matrix, i, j) {
                continue;
            }

            let touch_id = candidates.len();
            let region = flood_fill(matrix, &mut claims, i, j, touch_id);
            let avgi = region.isum / region.weight;
            let avgj = region.jsum / region.weight;
            let touch_major =
                (region.maxi - region.mini).max(region.maxj - region.minj) * PIXELS_PER_POINT;
            let (x, y) = orientation.transform(avgi, avgj);

            candidates.push(Candidate {
                i: avgi,
                j: avgj,
                pw: region.weight as i64,
                touch_major,
                x,
                y,
            });
        }
    }

    candidates
}

fn is_local_max(matrix: &Matrix, i: usize, j: usize) -> bool {
    let v = matrix.get(i, j);
    for (di, dj) in NEIGHBOR_OFFSETS {
        if let Some((ni, nj)) = offset(i, j, di, dj) {
            if matrix.get(ni, nj) > v {
                return false;
            }
        }
    }
    true
}

const NEIGHBOR_OFFSETS: [(i32, i32); 8] =
    [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (1, -1), (-1, 1), (1, 1)];
const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn offset(i: usize, j: usize, di: i32, dj: i32) -> Option<(usize, usize)> {
    let ni = i as i32 + di;
    let nj = j as i32 + dj;
    if ni < 0 || nj < 0 || ni as usize >= GRID_ROWS || nj as usize >= GRID_COLS {
        return None;
    }
    Some((ni as usize, nj as usize))
}

struct Region {
    isum: f64,
    jsum: f64,
    weight: f64,
    mini: i32,
    maxi: i32,
    minj: i32,
    maxj: i32,
}

/// Region-grows from `(seed_i, seed_j)`, categorizing 4-connected
/// neighbors as core or fringe cells as described in the module docs.
/// Uses an explicit work stack in place of recursion.
fn flood_fill(
    matrix: &Matrix,
    claims: &mut Neighbors,
    seed_i: usize,
    seed_j: usize,
    touch_id: usize,
) -> Region {
    let mut region = Region {
        isum: 0.0,
        jsum: 0.0,
        weight: 0.0,
        mini: seed_i as i32,
        maxi: seed_i as i32,
        minj: seed_j as i32,
        maxj: seed_j as i32,
    };

    let mut core_stack = vec![(seed_i, seed_j)];
    claims.grid[seed_i][seed_j] = Claim::Core;

    while let Some((i, j)) = core_stack.pop() {
        let v = matrix.get(i, j);
        let w = weight(v);
        region.weight += w;
        region.isum += w * i as f64;
        region.jsum += w * j as f64;
        region.mini = region.mini.min(i as i32);
        region.maxi = region.maxi.max(i as i32);
        region.minj = region.minj.min(j as i32);
        region.maxj = region.maxj.max(j as i32);

        for (di, dj) in ORTHOGONAL_OFFSETS {
            let Some((ni, nj)) = offset(i, j, di, dj) else { continue };
            let nv = matrix.get(ni, nj);
            if nv == 0 {
                continue;
            }
            match claims.grid[ni][nj] {
                Claim::Core => continue,
                Claim::Fringe(id) if id == touch_id => continue,
                _ => {}
            }
            if nv >= LARGE_AREA_UNPRESS && nv < v.saturating_add(PINCH_THRESHOLD) {
                claims.grid[ni][nj] = Claim::Core;
                core_stack.push((ni, nj));
            } else if nv >= LARGE_AREA_FRINGE && nv < v {
                flood_fill_fringe(matrix, claims, &mut region, ni, nj, touch_id);
            }
        }
    }

    region
}

fn flood_fill_fringe(
    matrix: &Matrix,
    claims: &mut Neighbors,
    region: &mut Region,
    seed_i: usize,
    seed_j: usize,
    touch_id: usize,
) {
    let mut stack = vec![(seed_i, seed_j)];
    claims.grid[seed_i][seed_j] = Claim::Fringe(touch_id);

    while let Some((i, j)) = stack.pop() {
        let v = matrix.get(i, j);
        let w = weight(v);
        region.weight += w;
        region.isum += w * i as f64;
        region.jsum += w * j as f64;

        for (di, dj) in ORTHOGONAL_OFFSETS {
            let Some((ni, nj)) = offset(i, j, di, dj) else { continue };
            let nv = matrix.get(ni, nj);
            match claims.grid[ni][nj] {
                Claim::Core => continue,
                Claim::Fringe(id) if id == touch_id => continue,
                _ => {}
            }
            if nv >= LARGE_AREA_FRINGE && nv < v {
                claims.grid[ni][nj] = Claim::Fringe(touch_id);
                stack.push((ni, nj));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::FrameDecoder;

    fn matrix_from(cells: &[(usize, usize, u8)]) -> Matrix {
        let mut d = FrameDecoder::new();
        let mut row_bufs = [[0u8; GRID_COLS]; GRID_ROWS];
        for &(i, j, v) in cells {
            row_bufs[i][j] = v;
        }
        for (row, samples) in row_bufs.iter().enumerate() {
            let mut bytes = vec![0xFF, 0x43, if row == 0 { 0x80 } else { row as u8 }];
            bytes.extend_from_slice(samples);
            bytes.push(0);
            d.put_bytes(&bytes);
        }
        d.matrix().clone()
    }

    #[test]
    fn single_touchdown_reports_expected_pixel_position() {
        // x = 1024 - 20*1024/39 = 498 (float division then truncation);
        // y = 768 - 15*768/29 = 370, matching the original driver's
        // single-truncation arithmetic.
        let m = matrix_from(&[(15, 20, 80)]);
        let cands = extract(&m, Orientation::Normal);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].x, 498);
        assert_eq!(cands[0].y, 370);
    }

    #[test]
    fn two_fingers_spread_yield_two_candidates() {
        let m = matrix_from(&[(10, 10, 80), (10, 30, 80)]);
        let cands = extract(&m, Orientation::Normal);
        assert_eq!(cands.len(), 2);
    }

    #[test]
    fn pinch_with_touching_shoulders_still_separates_into_two() {
        // Saddle is adjacent to both peaks; the climb back up from the
        // saddle to the second peak exceeds PINCH_THRESHOLD, so the flood
        // fill from the first peak halts there instead of merging regions.
        let m = matrix_from(&[(15, 18, 90), (15, 19, 70), (15, 20, 90)]);
        let cands = extract(&m, Orientation::Normal);
        assert_eq!(cands.len(), 2);
    }

    #[test]
    fn capacity_is_capped_at_max_touch() {
        let cells: Vec<_> = (0..GRID_ROWS)
            .step_by(2)
            .take(MAX_TOUCH + 3)
            .map(|i| (i, 5, 80u8))
            .collect();
        let m = matrix_from(&cells);
        let cands = extract(&m, Orientation::Normal);
        assert!(cands.len() <= MAX_TOUCH);
    }

    #[test]
    fn boundary_cells_do_not_panic() {
        let m = matrix_from(&[(0, 0, 80), (29, 39, 80)]);
        let cands = extract(&m, Orientation::Normal);
        assert_eq!(cands.len(), 2);
    }
}
