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
use geo::{Area, Coord, LineString, Polygon};
use log::debug;

use crate::config::MeshQuality;
use crate::error::{TopoError, TopoResult};
use crate::layers::ContourLayer;
use crate::mesh::{triangulate_polygon, Mesh, MeshBuilderBuffer};
use crate::raster::HeightGrid;
use crate::scale::LocalProjection;
use crate::vector::simplify_polygon;

/// Concrete knobs behind the quality presets.  Monotone: higher quality
/// means a denser lattice, a tighter tolerance and smaller kept features.
#[derive(Debug, Clone, Copy)]
pub struct QualityParams {
    /// Samples along the longer axis of the terrain lattice
    pub lattice_limit: usize,
    pub simplify_tolerance_m: f64,
    pub min_feature_area_m2: f64,
}

pub fn quality_params(quality: MeshQuality) -> QualityParams {
    match quality {
        MeshQuality::Draft => QualityParams {
            lattice_limit: 64,
            simplify_tolerance_m: 20.0,
            min_feature_area_m2: 400.0,
        },
        MeshQuality::Medium => QualityParams {
            lattice_limit: 128,
            simplify_tolerance_m: 10.0,
            min_feature_area_m2: 100.0,
        },
        MeshQuality::High => QualityParams {
            lattice_limit: 256,
            simplify_tolerance_m: 5.0,
            min_feature_area_m2: 25.0,
        },
        MeshQuality::Ultra => QualityParams {
            lattice_limit: 512,
            simplify_tolerance_m: 2.0,
            min_feature_area_m2: 4.0,
        },
    }
}

/// Extrudes one layer into a closed prism between z_low and z_high
/// (meters).  Caps are ear-clipped with holes, walls connect the cap rings,
/// and shared ring vertices are welded so each layer mesh is watertight on
/// its own.
pub fn build_prism_mesh(
    layer: &ContourLayer,
    projection: &LocalProjection,
    z_low: f64,
    z_high: f64,
    quality: &QualityParams,
) -> TopoResult<Mesh> {
    if z_high <= z_low {
        return Err(TopoError::MeshInvalid(format!(
            "empty z band [{}, {}]",
            z_low, z_high
        )));
    }

    let mut buffer = MeshBuilderBuffer::new();
    let mut kept = 0;

    for polygon in layer.polygons.iter() {
        let projected = project_polygon(polygon, projection);

        let projected = match simplify_polygon(&projected, quality.simplify_tolerance_m) {
            Some(p) => p,
            None => continue,
        };

        if projected.unsigned_area() < quality.min_feature_area_m2 {
            continue;
        }

        let (vertices, triangles) = triangulate_polygon(&projected)?;

        //top cap, CCW up
        for t in triangles.iter() {
            buffer.add_triangle(
                lift(vertices[t[0]], z_high),
                lift(vertices[t[1]], z_high),
                lift(vertices[t[2]], z_high),
            );
        }

        //bottom cap, flipped
        for t in triangles.iter() {
            buffer.add_triangle(
                lift(vertices[t[0]], z_low),
                lift(vertices[t[2]], z_low),
                lift(vertices[t[1]], z_low),
            );
        }

        //walls for the exterior and every hole, the stored winding keeps
        //the outward side on the right of travel
        add_ring_walls(&mut buffer, projected.exterior(), z_low, z_high);
        for hole in projected.interiors() {
            add_ring_walls(&mut buffer, hole, z_low, z_high);
        }

        kept += 1;
    }

    let mesh = buffer.into_mesh();
    if kept == 0 || mesh.triangles.is_empty() {
        return Err(TopoError::MeshInvalid(format!(
            "layer {} produced no mesh geometry",
            layer.layer_number
        )));
    }

    debug!(
        "layer {} prism: {} vertices {} triangles",
        layer.layer_number,
        mesh.vertices.len(),
        mesh.triangles.len()
    );

    Ok(mesh)
}

fn project_polygon(polygon: &Polygon<f64>, projection: &LocalProjection) -> Polygon<f64> {
    let map = |ring: &LineString<f64>| -> LineString<f64> {
        LineString::from(
            ring.0
                .iter()
                .map(|c| projection.to_meters(*c))
                .collect::<Vec<_>>(),
        )
    };

    Polygon::new(
        map(polygon.exterior()),
        polygon.interiors().iter().map(map).collect(),
    )
}

fn lift(c: Coord<f64>, z: f64) -> [f64; 3] {
    [c.x, c.y, z]
}

//two triangles per edge, (a_low, b_low, b_high) and (a_low, b_high, a_high)
//put the outward normal on the right-hand side of a->b
fn add_ring_walls(buffer: &mut MeshBuilderBuffer, ring: &LineString<f64>, z_low: f64, z_high: f64) {
    for w in ring.0.windows(2) {
        let (a, b) = (w[0], w[1]);
        if a == b {
            continue;
        }

        buffer.add_triangle(lift(a, z_low), lift(b, z_low), lift(b, z_high));
        buffer.add_triangle(lift(a, z_low), lift(b, z_high), lift(a, z_high));
    }
}

/// Samples the grid on a regular lattice and builds a terrain-following
/// solid: relief surface on top, optional flat floor at z = 0 with skirt
/// walls around the border.
pub fn build_terrain_mesh(
    grid: &HeightGrid,
    projection: &LocalProjection,
    quality: &QualityParams,
    base_height_m: f64,
    close_bottom: bool,
) -> TopoResult<Mesh> {
    let (min_elev, _) = grid.min_max()?;

    let cols = grid.num_cols();
    let rows = grid.num_rows();

    let limit = quality.lattice_limit.max(2);
    let longer = cols.max(rows);
    let nx;
    let ny;
    if cols >= rows {
        nx = limit.min(longer).max(2);
        ny = ((nx as f64 * rows as f64 / cols as f64).round() as usize).max(2);
    } else {
        ny = limit.min(longer).max(2);
        nx = ((ny as f64 * cols as f64 / rows as f64).round() as usize).max(2);
    }

    //lattice vertices in meters, row major
    let mut top = vec![[0.0f64; 3]; nx * ny];
    for j in 0..ny {
        for i in 0..nx {
            let gx = i as f64 * (cols - 1) as f64 / (nx - 1) as f64;
            let gy = j as f64 * (rows - 1) as f64 / (ny - 1) as f64;

            let geo = grid.stats.grid_to_geo(gx, gy);
            let m = projection.to_meters(geo);
            let z = grid.sample_bilinear(gx, gy) - min_elev + base_height_m;

            top[j * nx + i] = [m.x, m.y, z.max(0.0)];
        }
    }

    let mut buffer = MeshBuilderBuffer::new();

    //two triangles per cell, normals up
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let v00 = top[j * nx + i];
            let v10 = top[j * nx + i + 1];
            let v01 = top[(j + 1) * nx + i];
            let v11 = top[(j + 1) * nx + i + 1];

            buffer.add_triangle(v00, v01, v11);
            buffer.add_triangle(v00, v11, v10);
        }
    }

    if close_bottom {
        let floor = |v: [f64; 3]| [v[0], v[1], 0.0];

        //floor, normals down
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let v00 = floor(top[j * nx + i]);
                let v10 = floor(top[j * nx + i + 1]);
                let v01 = floor(top[(j + 1) * nx + i]);
                let v11 = floor(top[(j + 1) * nx + i + 1]);

                buffer.add_triangle(v00, v11, v01);
                buffer.add_triangle(v00, v10, v11);
            }
        }

        //border loop, counterclockwise in meters so walls face outward.
        //row 0 is the northern edge, so the southern row is j = ny-1
        let mut border: Vec<usize> = Vec::new();
        for i in 0..nx {
            border.push((ny - 1) * nx + i);
        }
        for j in (0..ny - 1).rev() {
            border.push(j * nx + (nx - 1));
        }
        for i in (0..nx - 1).rev() {
            border.push(i);
        }
        for j in 1..ny - 1 {
            border.push(j * nx);
        }
        border.push((ny - 1) * nx);

        for w in border.windows(2) {
            let a = top[w[0]];
            let b = top[w[1]];

            buffer.add_triangle(floor(a), floor(b), b);
            buffer.add_triangle(floor(a), b, a);
        }
    }

    let mesh = buffer.into_mesh();
    debug!(
        "terrain mesh: {}x{} lattice, {} triangles",
        nx,
        ny,
        mesh.triangles.len()
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridStats;
    use geo::Rect;

    fn quality() -> QualityParams {
        QualityParams {
            lattice_limit: 16,
            simplify_tolerance_m: 0.0,
            min_feature_area_m2: 0.0,
        }
    }

    fn square_layer() -> ContourLayer {
        //roughly 1.1km square in degrees at the equator
        ContourLayer::new(
            100.0,
            0,
            vec![Polygon::new(
                LineString::from(vec![
                    (0.0, 0.0),
                    (0.01, 0.0),
                    (0.01, 0.01),
                    (0.0, 0.01),
                    (0.0, 0.0),
                ]),
                vec![],
            )],
        )
    }

    fn projection() -> LocalProjection {
        LocalProjection::new(&Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.01, y: 0.01 },
        ))
    }

    #[test]
    fn test_prism_watertight() {
        let mesh = build_prism_mesh(&square_layer(), &projection(), 0.0, 200.0, &quality()).unwrap();

        let report = mesh.validate();
        assert!(report.is_manifold, "{:?}", report);
        assert!(report.is_watertight, "{:?}", report);

        //every vertex z is on one of the two planes
        for v in mesh.vertices.iter() {
            assert!(v[2] == 0.0 || v[2] == 200.0);
        }

        //every top vertex has a bottom twin
        for v in mesh.vertices.iter().filter(|v| v[2] == 200.0) {
            assert!(mesh
                .vertices
                .iter()
                .any(|u| u[2] == 0.0 && u[0] == v[0] && u[1] == v[1]));
        }
    }

    #[test]
    fn test_prism_with_hole_watertight() {
        let mut layer = square_layer();
        let poly = Polygon::new(
            layer.polygons[0].exterior().clone(),
            vec![LineString::from(vec![
                (0.004, 0.004),
                (0.004, 0.006),
                (0.006, 0.006),
                (0.006, 0.004),
                (0.004, 0.004),
            ])],
        );
        layer.polygons = vec![poly];

        let mesh = build_prism_mesh(&layer, &projection(), 0.0, 100.0, &quality()).unwrap();
        let report = mesh.validate();
        assert!(report.is_watertight, "{:?}", report);
    }

    #[test]
    fn test_prism_empty_band_rejected() {
        assert!(build_prism_mesh(&square_layer(), &projection(), 100.0, 100.0, &quality()).is_err());
    }

    #[test]
    fn test_terrain_open_surface() {
        let stats = GridStats::from_bounds(0.0, 0.0, 0.01, 0.01, 8, 8, -9999.0);
        let grid = HeightGrid::from_vec(vec![100.0; 64], stats).unwrap();

        let mesh = build_terrain_mesh(&grid, &projection(), &quality(), 0.0, false).unwrap();
        let report = mesh.validate();

        //open sheet: manifold but not closed
        assert!(report.is_manifold);
        assert!(!report.is_watertight);
    }

    #[test]
    fn test_terrain_solid_watertight() {
        let stats = GridStats::from_bounds(0.0, 0.0, 0.01, 0.01, 8, 8, -9999.0);
        let mut data = vec![100.0f32; 64];
        //put a bump in the middle
        data[3 * 8 + 3] = 180.0;
        data[3 * 8 + 4] = 160.0;
        let grid = HeightGrid::from_vec(data, stats).unwrap();

        let mesh = build_terrain_mesh(&grid, &projection(), &quality(), 10.0, true).unwrap();
        let report = mesh.validate();

        assert!(report.is_manifold, "{:?}", report);
        assert!(report.is_watertight, "{:?}", report);

        //floor at zero, surface at base + relief
        assert!(mesh.vertices.iter().any(|v| v[2] == 0.0));
        assert!(mesh.vertices.iter().any(|v| v[2] > 10.0));
    }
}
