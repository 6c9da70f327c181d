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
use core::fmt;

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::error::TopoError;

pub const MEDIUM_EPSILON: f64 = 1e-10;

// In lat/lon this is less than a meter
pub const LARGE_EPSILON: f64 = 1e-6;

/// Helper struct to hold the georeferencing of an elevation grid
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GridStats {
    pub origin_y: f64,
    pub origin_x: f64,
    pub pixel_height: f64,
    pub pixel_width: f64,
    pub num_rows: u32,
    pub num_cols: u32,
    pub no_data_value: f64,
}

impl fmt::Display for GridStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Origin X,Y: {}, {}\nRight/Bottom: {},{}\nPixel Width/Height: {},{}\nRows: {} Cols: {}\nNo data value: {}",
            self.origin_x,
            self.origin_y,
            self.right_x_coord(),
            self.bottom_y_coord(),
            self.pixel_width,
            self.pixel_height,
            self.num_rows,
            self.num_cols,
            self.no_data_value,
        )
    }
}

impl GridStats {
    /// Builds stats from a 6 element affine geotransform.  Rotation terms
    /// (gt2, gt4) are not supported, the grids we consume are north up.
    pub fn from_geotransform(
        geotransform: &[f64; 6],
        num_cols: u32,
        num_rows: u32,
        no_data_value: f64,
    ) -> Result<Self, TopoError> {
        if geotransform[2] != 0.0 || geotransform[4] != 0.0 {
            return Err(TopoError::Configuration(
                "rotated geotransforms are not supported".to_string(),
            ));
        }

        if geotransform[1] == 0.0 || geotransform[5] == 0.0 {
            return Err(TopoError::Configuration(
                "geotransform has zero pixel size".to_string(),
            ));
        }

        Ok(GridStats {
            origin_x: geotransform[0],
            origin_y: geotransform[3],
            pixel_width: geotransform[1],
            pixel_height: geotransform[5],
            num_cols,
            num_rows,
            no_data_value,
        })
    }

    /// North up grid covering the given WGS84 bounds
    pub fn from_bounds(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
        num_cols: u32,
        num_rows: u32,
        no_data_value: f64,
    ) -> Self {
        GridStats {
            origin_x: min_lon,
            origin_y: max_lat,
            pixel_width: (max_lon - min_lon) / num_cols as f64,
            pixel_height: -(max_lat - min_lat) / num_rows as f64,
            num_cols,
            num_rows,
            no_data_value,
        }
    }

    pub fn geotransform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    /// Calculates the left side of the pixel column
    pub fn calc_x_coord(&self, grid_x: u32) -> f64 {
        self.origin_x + self.pixel_width * grid_x as f64
    }

    pub fn right_x_coord(&self) -> f64 {
        self.calc_x_coord(self.num_cols)
    }

    /// Calculates the top side, note pixel height is negative
    pub fn calc_y_coord(&self, grid_y: u32) -> f64 {
        self.origin_y + self.pixel_height * grid_y as f64
    }

    pub fn bottom_y_coord(&self) -> f64 {
        self.calc_y_coord(self.num_rows)
    }

    /// Maps a fractional grid position to geographic coordinates, measured
    /// from pixel centers the way the contour tracer emits vertices
    pub fn grid_to_geo(&self, grid_x: f64, grid_y: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + self.pixel_width * (grid_x + 0.5),
            y: self.origin_y + self.pixel_height * (grid_y + 0.5),
        }
    }

    //Converts geographic coordinate to grid column
    pub fn calc_x(&self, x_coord: f64) -> i32 {
        ((x_coord - self.origin_x) / self.pixel_width).floor() as _
    }

    pub fn calc_y(&self, y_coord: f64) -> i32 {
        ((y_coord - self.origin_y) / self.pixel_height).floor() as _
    }

    pub fn bounds_x(&self, grid_x: i32) -> i32 {
        if grid_x < 0 {
            return 0;
        }

        if grid_x >= self.num_cols as i32 {
            return self.num_cols as i32 - 1;
        }

        grid_x
    }

    pub fn bounds_y(&self, grid_y: i32) -> i32 {
        if grid_y < 0 {
            return 0;
        }

        if grid_y >= self.num_rows as i32 {
            return self.num_rows as i32 - 1;
        }

        grid_y
    }

    pub fn geo_bounds(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.origin_x,
                y: self.bottom_y_coord(),
            },
            Coord {
                x: self.right_x_coord(),
                y: self.origin_y,
            },
        )
    }

    pub fn width_coords(&self) -> f64 {
        self.pixel_width.abs() * self.num_cols as f64
    }

    pub fn height_coords(&self) -> f64 {
        self.pixel_height.abs() * self.num_rows as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coords() {
        let s = GridStats {
            origin_x: 4.0,
            origin_y: 5.0,
            pixel_height: -2.0,
            pixel_width: 1.0,
            num_rows: 4,
            num_cols: 5,
            no_data_value: -9999.0,
        };

        assert_eq!(s.calc_x(4.0), 0);
        assert_eq!(s.calc_x(4.999), 0);
        assert_eq!(s.calc_x(5.0), 1);

        assert_eq!(s.calc_y(5.0), 0);
        assert_eq!(s.calc_y(2.9), 1);

        assert_eq!(s.right_x_coord(), 9.0);
        assert_eq!(s.bottom_y_coord(), -3.0);

        assert_eq!(s.bounds_x(-3), 0);
        assert_eq!(s.bounds_x(7), 4);
    }

    #[test]
    fn test_geotransform_round_trip() {
        let gt = [-151.1, 0.001, 0.0, 63.1, 0.0, -0.001];
        let s = GridStats::from_geotransform(&gt, 100, 100, f64::MIN).unwrap();

        assert_eq!(s.geotransform(), gt);

        let c = s.grid_to_geo(0.0, 0.0);
        assert!((c.x - (-151.1 + 0.0005)).abs() < 1e-12);
        assert!((c.y - (63.1 - 0.0005)).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_rejected() {
        let gt = [0.0, 1.0, 0.1, 0.0, 0.0, -1.0];
        assert!(GridStats::from_geotransform(&gt, 10, 10, 0.0).is_err());
    }

    #[test]
    fn test_from_bounds() {
        let s = GridStats::from_bounds(-151.1, 63.0, -151.0, 63.1, 100, 50, f64::MIN);

        assert!((s.pixel_width - 0.001).abs() < 1e-12);
        assert!((s.pixel_height + 0.002).abs() < 1e-12);
        assert_eq!(s.origin_y, 63.1);

        let b = s.geo_bounds();
        assert!((b.min().y - 63.0).abs() < 1e-9);
        assert!((b.max().x - -151.0).abs() < 1e-9);
    }
}
