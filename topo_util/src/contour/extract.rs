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
use geo::LineString;
use rayon::prelude::*;

use crate::contour::{march, polygonize, Field};
use crate::error::{Diagnostics, TopoError, TopoResult};
use crate::layers::ContourLayer;
use crate::raster::HeightGrid;

impl Field for HeightGrid {
    fn dimensions(&self) -> (usize, usize) {
        (self.num_cols(), self.num_rows())
    }

    fn z_at(&self, x: usize, y: usize) -> f64 {
        self.data[(y, x)] as f64
    }
}

/// Runs the tracer for every planned level and wraps the results as layers
/// in increasing elevation order.  Layers are independent, so the levels run
/// in parallel.
pub fn extract_layers(
    grid: &HeightGrid,
    levels: &[f64],
    diag: &Diagnostics,
) -> TopoResult<Vec<ContourLayer>> {
    if levels.is_empty() {
        return Err(TopoError::ExtractionFailed("no levels planned".to_string()));
    }

    let mut layers: Vec<ContourLayer> = levels
        .par_iter()
        .enumerate()
        .map(|(level_index, &level)| {
            let rings = march(grid, level);

            let geo_rings: Vec<LineString<f64>> = rings
                .into_iter()
                .map(|ring| {
                    LineString::from(
                        ring.into_iter()
                            .map(|(gx, gy)| {
                                let c = grid.stats.grid_to_geo(gx, gy);
                                (c.x, c.y)
                            })
                            .collect::<Vec<_>>(),
                    )
                })
                .collect();

            let polygons = polygonize(geo_rings);
            ContourLayer::new(level, level_index, polygons)
        })
        .collect();

    layers.sort_by(|a, b| a.elevation.partial_cmp(&b.elevation).unwrap());

    let total_polygons: usize = layers.iter().map(|l| l.polygons.len()).sum();
    if total_polygons == 0 {
        return Err(TopoError::ExtractionFailed(format!(
            "tracer produced no geometry for {} levels",
            levels.len()
        )));
    }

    for layer in layers.iter() {
        if layer.is_empty() {
            diag.info(
                "extract",
                format!("level {:.1} has no polygons", layer.elevation),
            );
        }
    }

    diag.info(
        "extract",
        format!(
            "{} layers extracted, {} polygons total",
            layers.len(),
            total_polygons
        ),
    );

    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridStats;
    use crate::vector::ring_signed_area;
    use geo::{Contains, Point};

    /// Radial cone, 500m at the center falling to 0 at the corners
    fn cone_grid(n: u32) -> HeightGrid {
        let stats = GridStats::from_bounds(0.0, 0.0, 1.0, 1.0, n, n, -9999.0);

        let center = (n - 1) as f64 / 2.0;
        let max_r = (center * center * 2.0).sqrt();

        let mut data = Vec::with_capacity((n * n) as usize);
        for r in 0..n {
            for c in 0..n {
                let dr = r as f64 - center;
                let dc = c as f64 - center;
                let dist = (dr * dr + dc * dc).sqrt();
                data.push((500.0 * (1.0 - dist / max_r)).max(0.0) as f32);
            }
        }

        HeightGrid::from_vec(data, stats).unwrap()
    }

    #[test]
    fn test_cone_layers_shrink() {
        let grid = cone_grid(101);
        let diag = Diagnostics::new();

        let levels = vec![0.0, 100.0, 200.0, 300.0, 400.0];
        let layers = extract_layers(&grid, &levels, &diag).unwrap();

        assert_eq!(layers.len(), 5);

        for w in layers.windows(2) {
            assert!(
                w[0].area > w[1].area,
                "areas must strictly decrease up the cone"
            );
        }

        //each upper layer sits inside the one below
        for w in layers.windows(2) {
            let below = w[0].largest_polygon().unwrap();
            let above = w[1].largest_polygon().unwrap();
            let probe = Point::from(above.exterior().0[0]);
            assert!(below.contains(&probe));
        }
    }

    #[test]
    fn test_interior_samples_at_or_above_level() {
        let grid = cone_grid(41);
        let diag = Diagnostics::new();

        let layers = extract_layers(&grid, &[250.0], &diag).unwrap();
        let poly = layers[0].largest_polygon().unwrap();

        //probe grid samples that fall inside the polygon
        let mut checked = 0;
        for r in 0..41u32 {
            for c in 0..41u32 {
                let p = grid.stats.grid_to_geo(c as f64, r as f64);
                if poly.contains(&Point::from((p.x, p.y))) {
                    let z = grid.data[(r as usize, c as usize)] as f64;
                    //half a band of slack for interpolation at the boundary
                    assert!(z >= 250.0 - 26.0, "sample {} at ({}, {})", z, c, r);
                    checked += 1;
                }
            }
        }
        assert!(checked > 50);
    }

    #[test]
    fn test_empty_levels_rejected() {
        let grid = cone_grid(11);
        let diag = Diagnostics::new();
        assert!(extract_layers(&grid, &[], &diag).is_err());
    }

    #[test]
    fn test_all_levels_above_terrain() {
        let grid = cone_grid(11);
        let diag = Diagnostics::new();

        let err = extract_layers(&grid, &[9000.0], &diag);
        assert!(matches!(err, Err(TopoError::ExtractionFailed(_))));
    }

    #[test]
    fn test_layer_orientation() {
        let grid = cone_grid(41);
        let diag = Diagnostics::new();

        let layers = extract_layers(&grid, &[100.0, 300.0], &diag).unwrap();
        for layer in layers.iter() {
            for poly in layer.polygons.iter() {
                assert!(ring_signed_area(poly.exterior()) > 0.0, "exterior must be CCW");
            }
        }
    }
}
