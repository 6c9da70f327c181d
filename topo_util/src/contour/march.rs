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

/// A sampled scalar field the tracer walks over.  Keeping this as a trait
/// lets an external contour backend stand in for the in-tree tracer.
pub trait Field {
    /// (num_cols, num_rows)
    fn dimensions(&self) -> (usize, usize);

    fn z_at(&self, x: usize, y: usize) -> f64;
}

/// Closed polylines in grid coordinates, first point repeated at the end
pub type Contours = Vec<Vec<(f64, f64)>>;

//cell edge identity: (x, y) of the lower-index sample plus axis, 0 =
//horizontal edge to (x+1, y), 1 = vertical edge to (x, y+1)
type EdgeKey = (i32, i32, u8);

/// Traces the iso-level `level` over the field with marching squares.
///
/// Samples outside the grid are treated as negative infinity, so every
/// contour closes, walking along the grid border where the level set would
/// exit.  The enclosed side of each ring is the region with z >= level.
pub fn march<F: Field + ?Sized>(field: &F, level: f64) -> Contours {
    let (num_cols, num_rows) = field.dimensions();
    if num_cols == 0 || num_rows == 0 {
        return Vec::new();
    }

    //exact hits on the level would put crossings on cell corners and break
    //the two-segments-per-edge property, nudge them inside
    let nudge = 1e-9 * level.abs().max(1.0);

    let sample = |x: i32, y: i32| -> f64 {
        if x < 0 || y < 0 || x >= num_cols as i32 || y >= num_rows as i32 {
            return f64::NEG_INFINITY;
        }
        let z = field.z_at(x as usize, y as usize);
        if z == level {
            level + nudge
        } else {
            z
        }
    };

    //crossing position along a cell edge, canonical sample order so both
    //cells sharing the edge compute bit-identical coordinates
    let crossing = |key: EdgeKey| -> (f64, f64) {
        let (x, y, axis) = key;
        let (ax, ay) = (x, y);
        let (bx, by) = if axis == 0 { (x + 1, y) } else { (x, y + 1) };

        let za = sample(ax, ay);
        let zb = sample(bx, by);

        if za == f64::NEG_INFINITY {
            return (bx as f64, by as f64);
        }
        if zb == f64::NEG_INFINITY {
            return (ax as f64, ay as f64);
        }

        let t = (level - za) / (zb - za);
        (
            ax as f64 + (bx - ax) as f64 * t,
            ay as f64 + (by - ay) as f64 * t,
        )
    };

    let mut segments: Vec<(EdgeKey, EdgeKey)> = Vec::new();

    //cells of the padded grid, corner (dx, dy) is sample (cx-1+dx, cy-1+dy)
    for cy in 0..=(num_rows as i32) {
        for cx in 0..=(num_cols as i32) {
            let tl = sample(cx - 1, cy - 1);
            let tr = sample(cx, cy - 1);
            let br = sample(cx, cy);
            let bl = sample(cx - 1, cy);

            let mut mask = 0u8;
            if tl >= level {
                mask |= 1;
            }
            if tr >= level {
                mask |= 2;
            }
            if br >= level {
                mask |= 4;
            }
            if bl >= level {
                mask |= 8;
            }

            if mask == 0 || mask == 15 {
                continue;
            }

            let top: EdgeKey = (cx - 1, cy - 1, 0);
            let right: EdgeKey = (cx, cy - 1, 1);
            let bottom: EdgeKey = (cx - 1, cy, 0);
            let left: EdgeKey = (cx - 1, cy - 1, 1);

            match mask {
                1 => segments.push((left, top)),
                2 => segments.push((top, right)),
                3 => segments.push((left, right)),
                4 => segments.push((right, bottom)),
                6 => segments.push((top, bottom)),
                7 => segments.push((left, bottom)),
                8 => segments.push((left, bottom)),
                9 => segments.push((top, bottom)),
                11 => segments.push((bottom, right)),
                12 => segments.push((left, right)),
                13 => segments.push((top, right)),
                14 => segments.push((left, top)),
                5 => {
                    //saddle, disambiguate with the cell center
                    let center_inside = saddle_center_inside(tl, tr, br, bl, level);
                    if center_inside {
                        segments.push((top, right));
                        segments.push((left, bottom));
                    } else {
                        segments.push((left, top));
                        segments.push((right, bottom));
                    }
                }
                10 => {
                    let center_inside = saddle_center_inside(tl, tr, br, bl, level);
                    if center_inside {
                        segments.push((top, left));
                        segments.push((right, bottom));
                    } else {
                        segments.push((top, right));
                        segments.push((left, bottom));
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    assemble_rings(&segments, crossing)
}

fn saddle_center_inside(tl: f64, tr: f64, br: f64, bl: f64, level: f64) -> bool {
    //any padded corner drags the center outside
    if tl == f64::NEG_INFINITY
        || tr == f64::NEG_INFINITY
        || br == f64::NEG_INFINITY
        || bl == f64::NEG_INFINITY
    {
        return false;
    }
    (tl + tr + br + bl) / 4.0 >= level
}

/// Stitches edge-to-edge segments into closed rings.  Every crossed edge is
/// shared by exactly two cells, so each endpoint joins exactly two segments.
fn assemble_rings<C>(segments: &[(EdgeKey, EdgeKey)], crossing: C) -> Contours
where
    C: Fn(EdgeKey) -> (f64, f64),
{
    let mut by_edge: HashMap<EdgeKey, Vec<usize>> = HashMap::new();

    for (idx, (a, b)) in segments.iter().enumerate() {
        by_edge.entry(*a).or_default().push(idx);
        by_edge.entry(*b).or_default().push(idx);
    }

    let mut visited = vec![false; segments.len()];
    let mut rings = Vec::new();

    for start in 0..segments.len() {
        if visited[start] {
            continue;
        }

        let mut ring_edges: Vec<EdgeKey> = Vec::new();
        let mut current = start;
        let mut entry_edge = segments[start].0;

        loop {
            visited[current] = true;
            let (a, b) = segments[current];
            let exit_edge = if a == entry_edge { b } else { a };

            ring_edges.push(exit_edge);

            //find the one other segment touching the exit edge
            let next = by_edge[&exit_edge]
                .iter()
                .copied()
                .find(|&i| i != current && !visited[i]);

            match next {
                Some(n) => {
                    entry_edge = exit_edge;
                    current = n;
                }
                None => break,
            }
        }

        if ring_edges.len() < 3 {
            continue;
        }

        let mut points: Vec<(f64, f64)> = ring_edges.into_iter().map(&crossing).collect();
        points.push(points[0]);
        rings.push(points);
    }

    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecField {
        num_cols: usize,
        num_rows: usize,
        data: Vec<f64>,
    }

    impl Field for VecField {
        fn dimensions(&self) -> (usize, usize) {
            (self.num_cols, self.num_rows)
        }

        fn z_at(&self, x: usize, y: usize) -> f64 {
            self.data[y * self.num_cols + x]
        }
    }

    fn ring_area(ring: &[(f64, f64)]) -> f64 {
        let mut a = 0.0;
        for w in ring.windows(2) {
            a += w[0].0 * w[1].1 - w[1].0 * w[0].1;
        }
        a.abs() / 2.0
    }

    #[test]
    fn test_flat_grid_single_ring() {
        let f = VecField {
            num_cols: 4,
            num_rows: 4,
            data: vec![100.0; 16],
        };

        let rings = march(&f, 50.0);
        assert_eq!(rings.len(), 1);

        let ring = &rings[0];
        assert_eq!(ring.first(), ring.last());

        //the whole grid is inside, the ring follows the outer samples
        assert!((ring_area(ring) - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_level_above_everything() {
        let f = VecField {
            num_cols: 4,
            num_rows: 4,
            data: vec![100.0; 16],
        };

        assert!(march(&f, 200.0).is_empty());
    }

    #[test]
    fn test_single_peak() {
        //one hot sample in the middle
        let mut data = vec![0.0; 25];
        data[12] = 100.0;
        let f = VecField {
            num_cols: 5,
            num_rows: 5,
            data,
        };

        let rings = march(&f, 50.0);
        assert_eq!(rings.len(), 1);

        //crossings sit halfway between the peak and its neighbors
        let ring = &rings[0];
        for p in ring.iter() {
            let d = ((p.0 - 2.0).abs()).max((p.1 - 2.0).abs());
            assert!((d - 0.5).abs() < 1e-9, "point {:?}", p);
        }
    }

    #[test]
    fn test_two_separate_peaks() {
        let mut data = vec![0.0; 49];
        data[7 + 1] = 100.0;
        data[5 * 7 + 5] = 100.0;
        let f = VecField {
            num_cols: 7,
            num_rows: 7,
            data,
        };

        let rings = march(&f, 50.0);
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn test_hole_in_plateau() {
        //high plateau with a low center produces an outer ring and a hole
        let mut data = vec![100.0; 25];
        data[12] = 0.0;
        let f = VecField {
            num_cols: 5,
            num_rows: 5,
            data,
        };

        let rings = march(&f, 50.0);
        assert_eq!(rings.len(), 2);

        let mut areas: Vec<f64> = rings.iter().map(|r| ring_area(r)).collect();
        areas.sort_by(|a, b| a.partial_cmp(b).unwrap());

        //small ring around the dip, big ring around the plateau
        assert!(areas[0] < 2.0);
        assert!(areas[1] > 10.0);
    }

    #[test]
    fn test_exact_level_hit_is_inside() {
        let f = VecField {
            num_cols: 3,
            num_rows: 3,
            data: vec![50.0; 9],
        };

        let rings = march(&f, 50.0);
        assert_eq!(rings.len(), 1);
    }
}
