/*
This file is part of the Topographic Layer Generator
Copyright (C) 2025 Relief Labs

The Topographic Layer Generator is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use std::collections::VecDeque;

use bitvec::prelude::*;
use float_cmp::{ApproxEq, F32Margin, F64Margin};

use crate::error::{TopoError, TopoResult};
use crate::raster::HeightGrid;

#[inline]
pub fn is_nodata(val: f32, no_data_value: f32) -> bool {
    //upstream tile readers can hand us nodata as NaN
    if !val.is_finite() {
        return true;
    }

    if !no_data_value.is_finite() {
        return false;
    }

    no_data_value.approx_eq(
        val,
        F32Margin {
            ulps: 5,
            epsilon: f32::EPSILON * 5.0,
        },
    )
}

#[inline]
pub fn is_nodata_f64(val: f64, no_data_value: f64) -> bool {
    if !val.is_finite() {
        return true;
    }

    if !no_data_value.is_finite() {
        return false;
    }

    no_data_value.approx_eq(
        val,
        F64Margin {
            ulps: 5,
            epsilon: f64::EPSILON * 5.0,
        },
    )
}

/// Replaces every no-data sample with the value of its nearest valid
/// neighbor (multi source breadth first fill, 4-connected).  Returns the
/// number of repaired cells, fails when the whole grid is no-data.
pub fn repair_nodata(grid: &mut HeightGrid) -> TopoResult<usize> {
    let rows = grid.stats.num_rows as usize;
    let cols = grid.stats.num_cols as usize;
    let nodata = grid.stats.no_data_value as f32;

    let mut valid: BitVec = bitvec![0; rows * cols];
    let mut queue = VecDeque::new();

    for r in 0..rows {
        for c in 0..cols {
            if !is_nodata(grid.data[(r, c)], nodata) {
                valid.set(r * cols + c, true);
                queue.push_back((r, c));
            }
        }
    }

    if queue.is_empty() {
        return Err(TopoError::NoElevationData);
    }

    let num_invalid = rows * cols - queue.len();
    if num_invalid == 0 {
        return Ok(0);
    }

    while let Some((r, c)) = queue.pop_front() {
        let fill = grid.data[(r, c)];

        let neighbors = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];

        for (nr, nc) in neighbors {
            if nr >= rows || nc >= cols {
                continue;
            }
            let idx = nr * cols + nc;
            if valid[idx] {
                continue;
            }
            valid.set(idx, true);
            grid.data[(nr, nc)] = fill;
            queue.push_back((nr, nc));
        }
    }

    Ok(num_invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridStats;

    #[test]
    fn test_is_nodata() {
        let nodata = f32::MIN;

        assert!(is_nodata(nodata + 10000., nodata));
        assert!(is_nodata(f32::NAN, nodata));
        assert!(is_nodata(f32::INFINITY, nodata));

        assert!(!is_nodata(nodata + 1e34, nodata));

        let nodata = f32::NAN;
        assert!(is_nodata(f32::NAN, nodata));
        assert!(!is_nodata(1e30, nodata));
    }

    #[test]
    fn test_is_nodata_f64() {
        let nodata = -9999.0f64;

        assert!(is_nodata_f64(-9999.0, nodata));
        assert!(is_nodata_f64(f64::NAN, nodata));
        assert!(!is_nodata_f64(120.5, nodata));
    }

    #[test]
    fn test_repair_fills_nearest() {
        let stats = GridStats::from_bounds(0.0, 0.0, 1.0, 1.0, 3, 3, -9999.0);
        let data = vec![
            10.0, -9999.0, -9999.0, //
            -9999.0, -9999.0, -9999.0, //
            -9999.0, -9999.0, 50.0,
        ];
        let mut grid = HeightGrid::from_vec(data, stats).unwrap();

        let repaired = repair_nodata(&mut grid).unwrap();
        assert_eq!(repaired, 7);

        //everything adjacent to a seed takes its value
        assert_eq!(grid.data[(0, 1)], 10.0);
        assert_eq!(grid.data[(1, 0)], 10.0);
        assert_eq!(grid.data[(2, 1)], 50.0);
        assert_eq!(grid.data[(1, 2)], 50.0);

        //no cell left invalid
        for v in grid.data.iter() {
            assert!(!is_nodata(*v, -9999.0));
        }
    }

    #[test]
    fn test_repair_all_nodata_fails() {
        let stats = GridStats::from_bounds(0.0, 0.0, 1.0, 1.0, 2, 2, -9999.0);
        let mut grid = HeightGrid::from_vec(vec![-9999.0; 4], stats).unwrap();

        assert!(matches!(
            repair_nodata(&mut grid),
            Err(TopoError::NoElevationData)
        ));
    }
}
