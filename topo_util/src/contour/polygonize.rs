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
use geo::{Area, BoundingRect, Contains, LineString, Point, Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

//degenerate slivers below this are noise from the tracer
const MIN_RING_AREA: f64 = 1e-12;

struct RingInfo {
    ring: LineString<f64>,
    //hole-free polygon used for the containment tests
    shell: Polygon<f64>,
    bbox: Rect<f64>,
    area_abs: f64,
    probe: Point<f64>,
}

struct RingEntry {
    idx: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for RingEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// Groups closed rings into polygons with holes by containment depth.
/// Even nesting depth makes an exterior, odd depth a hole of its
/// immediate (smallest containing) exterior.  Exteriors come out CCW,
/// holes CW.
pub fn polygonize(rings: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let mut infos: Vec<RingInfo> = Vec::with_capacity(rings.len());

    for mut ring in rings {
        ring.close();
        //closed triangle = 4 points
        if ring.0.len() < 4 {
            continue;
        }

        let shell = Polygon::new(ring.clone(), vec![]);
        let area = shell.signed_area();
        if area.abs() < MIN_RING_AREA {
            continue;
        }

        let bbox = match ring.bounding_rect() {
            Some(b) => b,
            None => continue,
        };

        let probe = Point::from(ring.0[0]);

        infos.push(RingInfo {
            ring,
            shell,
            bbox,
            area_abs: area.abs(),
            probe,
        });
    }

    if infos.is_empty() {
        return Vec::new();
    }

    let tree = RTree::bulk_load(
        infos
            .iter()
            .enumerate()
            .map(|(idx, info)| RingEntry {
                idx,
                env: AABB::from_corners(
                    [info.bbox.min().x, info.bbox.min().y],
                    [info.bbox.max().x, info.bbox.max().y],
                ),
            })
            .collect(),
    );

    //for each ring, every strictly larger ring that contains it
    let mut depth = vec![0usize; infos.len()];
    let mut parent: Vec<Option<usize>> = vec![None; infos.len()];

    for i in 0..infos.len() {
        let env = AABB::from_corners(
            [infos[i].bbox.min().x, infos[i].bbox.min().y],
            [infos[i].bbox.max().x, infos[i].bbox.max().y],
        );

        let mut best: Option<usize> = None;

        for entry in tree.locate_in_envelope_intersecting(&env) {
            let j = entry.idx;
            if j == i || infos[j].area_abs <= infos[i].area_abs {
                continue;
            }
            if !infos[j].shell.contains(&infos[i].probe) {
                continue;
            }

            depth[i] += 1;

            let better = match best {
                None => true,
                Some(b) => infos[j].area_abs < infos[b].area_abs,
            };
            if better {
                best = Some(j);
            }
        }

        parent[i] = best;
    }

    //holes attach to their immediate parent, which has even depth
    let mut holes_by_parent: Vec<Vec<LineString<f64>>> = vec![Vec::new(); infos.len()];

    for (i, info) in infos.iter().enumerate() {
        if depth[i] % 2 == 1 {
            let p = parent[i].expect("odd depth ring must have a parent");
            debug_assert_eq!(depth[p] % 2, 0);

            let mut ring = info.ring.clone();
            if info.shell.signed_area() > 0.0 {
                ring.0.reverse();
            }
            holes_by_parent[p].push(ring);
        }
    }

    let mut polygons = Vec::new();
    for (i, info) in infos.iter().enumerate() {
        if depth[i] % 2 != 0 {
            continue;
        }

        let mut exterior = info.ring.clone();
        if info.shell.signed_area() < 0.0 {
            exterior.0.reverse();
        }

        polygons.push(Polygon::new(exterior, std::mem::take(&mut holes_by_parent[i])));
    }

    polygons
}
