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
use geo::{Contains, Coord, LineString, Point, Polygon};
use log::debug;

use crate::layers::ContourLayer;
use crate::vector::{ring_self_intersects, ring_signed_area};

//miter joints longer than this many offsets get clamped to a bevel
const MITER_LIMIT: f64 = 4.0;

/// Offsets a closed CCW ring toward its interior by `distance` (negative
/// distance grows the ring outward).  Each edge is displaced along its
/// inward normal, adjacent displaced edges are intersected to form the new
/// vertex.  Returns None when the ring collapses or self intersects.
pub fn inset_ring(ring: &LineString<f64>, distance: f64) -> Option<LineString<f64>> {
    let pts = &ring.0;
    if pts.len() < 4 {
        return None;
    }

    //unique vertices, ring arrives closed
    let n = pts.len() - 1;

    let mut out: Vec<Coord<f64>> = Vec::with_capacity(n + 1);

    for i in 0..n {
        let prev = pts[(i + n - 1) % n];
        let curr = pts[i];
        let next = pts[(i + 1) % n];

        //edges into and out of the current vertex, displaced inward.
        //for a CCW ring the interior is on the left, left normal of
        //direction (dx, dy) is (-dy, dx)
        let d_in = displace_edge(prev, curr, distance)?;
        let d_out = displace_edge(curr, next, distance)?;

        let vertex = match intersect_lines(d_in.0, d_in.1, d_out.0, d_out.1) {
            Some(p) => {
                let miter = ((p.x - curr.x).powi(2) + (p.y - curr.y).powi(2)).sqrt();
                if miter > MITER_LIMIT * distance.abs().max(1e-12) {
                    //spike joint, fall back to the midpoint of the two
                    //displaced endpoints
                    Coord {
                        x: (d_in.1.x + d_out.0.x) / 2.0,
                        y: (d_in.1.y + d_out.0.y) / 2.0,
                    }
                } else {
                    p
                }
            }
            //parallel edges, both displacements agree
            None => d_in.1,
        };

        out.push(vertex);
    }

    if out.len() < 3 {
        return None;
    }
    out.push(out[0]);

    let result = LineString::from(out);

    //an inset that flipped or collapsed has non-positive area
    let area = ring_signed_area(&result);
    if distance > 0.0 && area <= 0.0 {
        return None;
    }
    if area.abs() < 1e-12 {
        return None;
    }

    if ring_self_intersects(&result) {
        debug!("inset ring self intersects, dropping");
        return None;
    }

    Some(result)
}

//displaces the edge a->b along its inward (left) normal, returns the two
//displaced endpoints
fn displace_edge(
    a: Coord<f64>,
    b: Coord<f64>,
    distance: f64,
) -> Option<(Coord<f64>, Coord<f64>)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }

    let nx = -dy / len * distance;
    let ny = dx / len * distance;

    Some((
        Coord {
            x: a.x + nx,
            y: a.y + ny,
        },
        Coord {
            x: b.x + nx,
            y: b.y + ny,
        },
    ))
}

//infinite line intersection, None when parallel
fn intersect_lines(
    a1: Coord<f64>,
    a2: Coord<f64>,
    b1: Coord<f64>,
    b2: Coord<f64>,
) -> Option<Coord<f64>> {
    let d1x = a2.x - a1.x;
    let d1y = a2.y - a1.y;
    let d2x = b2.x - b1.x;
    let d2y = b2.y - b1.y;

    let denom = d1x * d2y - d1y * d2x;
    if denom.abs() < 1e-12 {
        return None;
    }

    let t = ((b1.x - a1.x) * d2y - (b1.y - a1.y) * d2x) / denom;

    Some(Coord {
        x: a1.x + t * d1x,
        y: a1.y + t * d1y,
    })
}

/// Insets a polygon's exterior toward its interior.  Holes do not survive
/// the inset, the callers (nesting lips, text paths) only need the shrunk
/// outline.  Returns None when the polygon collapses.
pub fn inset_polygon(polygon: &Polygon<f64>, distance: f64) -> Option<Polygon<f64>> {
    let exterior = inset_ring(polygon.exterior(), distance)?;
    Some(Polygon::new(exterior, vec![]))
}

/// Punches nesting cavities: each polygon of layer k+1 has its exterior
/// offset outward by `offset_m` and cut as a hole into the polygon of layer
/// k that contains it.  Creates the lip the upper layer seats into.
pub fn punch_nesting_insets(layers: &mut [ContourLayer], offset_m: f64) -> usize {
    if layers.len() < 2 {
        return 0;
    }

    let mut punched = 0;

    for k in 0..layers.len() - 1 {
        let mut cavities: Vec<LineString<f64>> = Vec::new();

        for upper in layers[k + 1].polygons.iter() {
            //negative distance grows the ring outward by the lip tolerance
            let grown = match inset_ring(upper.exterior(), -offset_m) {
                Some(r) => r,
                None => continue,
            };
            cavities.push(grown);
        }

        for mut cavity in cavities {
            let probe = Point::from(cavity.0[0]);

            if let Some(target) = layers[k]
                .polygons
                .iter_mut()
                .find(|p| p.contains(&probe))
            {
                //holes run clockwise
                if ring_signed_area(&cavity) > 0.0 {
                    cavity.0.reverse();
                }

                target.interiors_push(cavity);
                punched += 1;
            }
        }

        layers[k].recalculate_area();
    }

    punched
}
