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
use geo::{Coord, Polygon};

use crate::error::{TopoError, TopoResult};

/// Ear clipping with hole bridging over a polygon.  Returns the flattened
/// vertex list (exterior then holes, closing vertices stripped) and CCW
/// triangles indexing into it.
pub fn triangulate_polygon(
    polygon: &Polygon<f64>,
) -> TopoResult<(Vec<Coord<f64>>, Vec<[usize; 3]>)> {
    let mut vertices: Vec<Coord<f64>> = Vec::new();
    let mut flat: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    push_ring(polygon.exterior().0.as_slice(), &mut vertices, &mut flat);

    for hole in polygon.interiors() {
        hole_indices.push(vertices.len());
        push_ring(hole.0.as_slice(), &mut vertices, &mut flat);
    }

    if vertices.len() < 3 {
        return Err(TopoError::InconsistentGeometry(
            "polygon has fewer than 3 unique vertices".to_string(),
        ));
    }

    let indices = earcutr::earcut(&flat, &hole_indices, 2)
        .map_err(|e| TopoError::InconsistentGeometry(format!("ear clipping failed: {:?}", e)))?;

    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for t in indices.chunks_exact(3) {
        let (a, b, c) = (t[0], t[1], t[2]);

        //normalize to CCW so the caller can orient caps by flipping
        if triangle_signed_area(vertices[a], vertices[b], vertices[c]) < 0.0 {
            triangles.push([a, c, b]);
        } else {
            triangles.push([a, b, c]);
        }
    }

    if triangles.is_empty() {
        return Err(TopoError::InconsistentGeometry(
            "ear clipping produced no triangles".to_string(),
        ));
    }

    Ok((vertices, triangles))
}

fn push_ring(ring: &[Coord<f64>], vertices: &mut Vec<Coord<f64>>, flat: &mut Vec<f64>) {
    //strip the closing vertex
    let n = if ring.len() > 1 && ring[0] == ring[ring.len() - 1] {
        ring.len() - 1
    } else {
        ring.len()
    };

    for c in &ring[..n] {
        vertices.push(*c);
        flat.push(c.x);
        flat.push(c.y);
    }
}

fn triangle_signed_area(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)) / 2.0
}
