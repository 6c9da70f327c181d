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
use std::collections::HashMap;

use itertools::Itertools;

mod builder;
mod triangulate;

pub use builder::*;
pub use triangulate::*;

//triangles thinner than this are dropped as degenerate
const DEGENERATE_AREA: f64 = 1e-12;

/// Indexed triangle mesh, coordinates in meters before output scaling
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

/// Welds vertices by exact bit pattern while building, so caps and walls
/// emitted from the same ring share indices
#[derive(Debug, Default)]
pub struct MeshBuilderBuffer {
    mesh: Mesh,
    index: HashMap<[u64; 3], u32>,
    pub duplicate_hits: usize,
}

impl MeshBuilderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, v: [f64; 3]) -> u32 {
        let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];

        if let Some(&idx) = self.index.get(&key) {
            self.duplicate_hits += 1;
            return idx;
        }

        let idx = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(v);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_triangle(&mut self, a: [f64; 3], b: [f64; 3], c: [f64; 3]) {
        if triangle_area(a, b, c) < DEGENERATE_AREA {
            return;
        }

        let ia = self.add_vertex(a);
        let ib = self.add_vertex(b);
        let ic = self.add_vertex(c);

        if ia == ib || ib == ic || ia == ic {
            return;
        }

        self.mesh.triangles.push([ia, ib, ic]);
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}

fn triangle_area(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];

    let cx = ab[1] * ac[2] - ab[2] * ac[1];
    let cy = ab[2] * ac[0] - ab[0] * ac[2];
    let cz = ab[0] * ac[1] - ab[1] * ac[0];

    (cx * cx + cy * cy + cz * cz).sqrt() / 2.0
}

/// Validation summary per spec: edge incidence decides manifoldness and
/// watertightness, a failing mesh is reported, never fatal
#[derive(Debug, Clone, Default)]
pub struct MeshReport {
    pub is_manifold: bool,
    pub is_watertight: bool,
    pub num_vertices: usize,
    pub num_triangles: usize,
    pub non_manifold_edges: usize,
    pub boundary_edges: usize,
    pub degenerate_triangles: usize,
    pub duplicate_vertices: usize,
}

impl Mesh {
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    /// Applies (scale_xy, scale_xy, scale_z) in place
    pub fn scale(&mut self, scale_xy: f64, scale_z: f64) {
        for v in self.vertices.iter_mut() {
            v[0] *= scale_xy;
            v[1] *= scale_xy;
            v[2] *= scale_z;
        }
    }

    pub fn normal(&self, tri: [u32; 3]) -> [f32; 3] {
        let a = self.vertices[tri[0] as usize];
        let b = self.vertices[tri[1] as usize];
        let c = self.vertices[tri[2] as usize];

        let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];

        let nx = ab[1] * ac[2] - ab[2] * ac[1];
        let ny = ab[2] * ac[0] - ab[0] * ac[2];
        let nz = ab[0] * ac[1] - ab[1] * ac[0];

        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        if len == 0.0 {
            return [0.0, 0.0, 0.0];
        }

        [(nx / len) as f32, (ny / len) as f32, (nz / len) as f32]
    }

    pub fn validate(&self) -> MeshReport {
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        let mut degenerate = 0;

        for t in self.triangles.iter() {
            let a = self.vertices[t[0] as usize];
            let b = self.vertices[t[1] as usize];
            let c = self.vertices[t[2] as usize];

            if triangle_area(a, b, c) < DEGENERATE_AREA {
                degenerate += 1;
            }

            for (u, v) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = if u < v { (u, v) } else { (v, u) };
                *edges.entry(key).or_insert(0) += 1;
            }
        }

        let non_manifold = edges.values().filter(|&&n| n > 2).count();
        let boundary = edges.values().filter(|&&n| n == 1).count();

        //positional duplicates that slipped past welding
        let duplicates = self
            .vertices
            .iter()
            .map(|v| [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()])
            .counts()
            .values()
            .filter(|&&n| n > 1)
            .map(|n| n - 1)
            .sum();

        MeshReport {
            is_manifold: non_manifold == 0,
            is_watertight: non_manifold == 0 && boundary == 0 && !self.triangles.is_empty(),
            num_vertices: self.vertices.len(),
            num_triangles: self.triangles.len(),
            non_manifold_edges: non_manifold,
            boundary_edges: boundary,
            degenerate_triangles: degenerate,
            duplicate_vertices: duplicates,
        }
    }
}
