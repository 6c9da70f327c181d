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
use ndarray::Array2;

mod nodata;
mod stats;

pub use nodata::*;
pub use stats::*;

use crate::error::{TopoError, TopoResult};

/// An elevation grid plus its georeferencing.  Row 0 is the northern edge
/// when pixel_height is negative, which is the only layout we accept.
#[derive(Debug, Clone)]
pub struct HeightGrid {
    pub stats: GridStats,
    /// (row, col) indexed
    pub data: Array2<f32>,
}

impl HeightGrid {
    /// Takes row-major samples as handed over by the host
    pub fn from_vec(data: Vec<f32>, stats: GridStats) -> TopoResult<Self> {
        let rows = stats.num_rows as usize;
        let cols = stats.num_cols as usize;

        if rows == 0 || cols == 0 {
            return Err(TopoError::NoElevationData);
        }

        let data = Array2::from_shape_vec((rows, cols), data).map_err(|e| {
            TopoError::Configuration(format!(
                "elevation buffer does not match {}x{} grid: {}",
                cols, rows, e
            ))
        })?;

        Ok(HeightGrid { stats, data })
    }

    pub fn num_cols(&self) -> usize {
        self.stats.num_cols as usize
    }

    pub fn num_rows(&self) -> usize {
        self.stats.num_rows as usize
    }

    /// Min and max over all samples.  Only meaningful after no-data repair.
    pub fn min_max(&self) -> TopoResult<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in self.data.iter() {
            let v = *v as f64;
            if !v.is_finite() {
                continue;
            }
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }

        if min > max {
            return Err(TopoError::NoElevationData);
        }

        Ok((min, max))
    }

    /// Bilinear sample at a fractional grid position, clamped to the edges.
    /// Used by the terrain-following mesh builder.
    pub fn sample_bilinear(&self, grid_x: f64, grid_y: f64) -> f64 {
        let max_x = (self.num_cols() - 1) as f64;
        let max_y = (self.num_rows() - 1) as f64;

        let gx = grid_x.clamp(0.0, max_x);
        let gy = grid_y.clamp(0.0, max_y);

        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.num_cols() - 1);
        let y1 = (y0 + 1).min(self.num_rows() - 1);

        let dx = gx - x0 as f64;
        let dy = gy - y0 as f64;

        let v00 = self.data[(y0, x0)] as f64;
        let v10 = self.data[(y0, x1)] as f64;
        let v01 = self.data[(y1, x0)] as f64;
        let v11 = self.data[(y1, x1)] as f64;

        let v0 = v00 * (1.0 - dx) + v10 * dx;
        let v1 = v01 * (1.0 - dx) + v11 * dx;

        v0 * (1.0 - dy) + v1 * dy
    }
}
