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
use geo::{Intersects, Line, LineString, Polygon};

use crate::vector::ring_signed_area;

/// Fuses consecutive vertices closer than the tolerance.  The ring stays
/// closed, the first vertex wins ties with the last.
pub fn dedupe_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let pts = &ring.0;
    if pts.len() < 2 {
        return ring.clone();
    }

    let tol2 = tolerance * tolerance;
    let mut out = Vec::with_capacity(pts.len());
    out.push(pts[0]);

    for p in pts.iter().skip(1) {
        let last = out[out.len() - 1];
        let d2 = (p.x - last.x).powi(2) + (p.y - last.y).powi(2);
        if d2 > tol2 {
            out.push(*p);
        }
    }

    //re-close, the closing vertex may have been fused away
    if out[0] != out[out.len() - 1] {
        //drop a last point that crept inside the tolerance of the start
        let last = out[out.len() - 1];
        let d2 = (out[0].x - last.x).powi(2) + (out[0].y - last.y).powi(2);
        if d2 <= tol2 && out.len() > 1 {
            out.pop();
        }
        out.push(out[0]);
    }

    LineString::from(out)
}

pub fn dedupe_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    Polygon::new(
        dedupe_ring(polygon.exterior(), tolerance),
        polygon
            .interiors()
            .iter()
            .map(|h| dedupe_ring(h, tolerance))
            .collect(),
    )
}

/// Forces exterior CCW, holes CW by reversing rings whose signed area
/// disagrees
pub fn orient_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    let mut exterior = polygon.exterior().clone();
    if ring_signed_area(&exterior) < 0.0 {
        exterior.0.reverse();
    }

    let holes = polygon
        .interiors()
        .iter()
        .map(|h| {
            let mut hole = h.clone();
            if ring_signed_area(&hole) > 0.0 {
                hole.0.reverse();
            }
            hole
        })
        .collect();

    Polygon::new(exterior, holes)
}

/// Drops hole rings, keeping exteriors only.  Idempotent.
pub fn remove_holes(polygon: &Polygon<f64>) -> Polygon<f64> {
    Polygon::new(polygon.exterior().clone(), vec![])
}

/// Segment-pair self intersection test, adjacent segments excluded.
/// Quadratic, only run on rings that already went through simplification.
pub fn ring_self_intersects(ring: &LineString<f64>) -> bool {
    let pts = &ring.0;
    if pts.len() < 5 {
        //a closed triangle cannot self intersect
        return false;
    }

    let n = pts.len() - 1;
    for i in 0..n {
        let a = Line::new(pts[i], pts[i + 1]);

        for j in (i + 2)..n {
            //first and last segment of a closed ring are adjacent too
            if i == 0 && j == n - 1 {
                continue;
            }

            let b = Line::new(pts[j], pts[j + 1]);
            if a.intersects(&b) {
                return true;
            }
        }
    }

    false
}

/// Invariant repair after processing: self intersecting holes are dropped,
/// a self intersecting exterior drops the whole polygon (fail safe, never
/// silently corrected).
pub fn repair_polygon(polygon: Polygon<f64>) -> Option<Polygon<f64>> {
    if ring_self_intersects(polygon.exterior()) {
        return None;
    }

    let (exterior, holes) = polygon.into_inner();
    let holes = holes
        .into_iter()
        .filter(|h| !ring_self_intersects(h))
        .collect();

    Some(Polygon::new(exterior, holes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe() {
        let ring = LineString::from(vec![
            (0.0, 0.0),
            (0.0, 1e-9),
            (5.0, 0.0),
            (5.0, 5.0),
            (5.0, 5.0),
            (0.0, 5.0),
            (0.0, 0.0),
        ]);

        let out = dedupe_ring(&ring, 1e-6);
        assert_eq!(out.0.len(), 5);
        assert_eq!(out.0.first(), out.0.last());
    }

    #[test]
    fn test_dedupe_closing_vertex() {
        //last distinct point is within tolerance of the start
        let ring = LineString::from(vec![
            (0.0, 0.0),
            (5.0, 0.0),
            (5.0, 5.0),
            (0.0, 5.0),
            (1e-9, 1e-9),
            (0.0, 0.0),
        ]);

        let out = dedupe_ring(&ring, 1e-6);
        assert_eq!(out.0.len(), 5);
        assert_eq!(out.0.first(), out.0.last());
    }

    #[test]
    fn test_orient() {
        let cw_exterior = LineString::from(vec![
            (0.0, 0.0),
            (0.0, 5.0),
            (5.0, 5.0),
            (5.0, 0.0),
            (0.0, 0.0),
        ]);
        let ccw_hole = LineString::from(vec![
            (1.0, 1.0),
            (2.0, 1.0),
            (2.0, 2.0),
            (1.0, 2.0),
            (1.0, 1.0),
        ]);

        let fixed = orient_polygon(&Polygon::new(cw_exterior, vec![ccw_hole]));

        assert!(ring_signed_area(fixed.exterior()) > 0.0);
        assert!(ring_signed_area(&fixed.interiors()[0]) < 0.0);
    }

    #[test]
    fn test_remove_holes_idempotent() {
        let poly = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (5.0, 0.0),
                (5.0, 5.0),
                (0.0, 5.0),
                (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (1.0, 1.0),
                (1.0, 2.0),
                (2.0, 2.0),
                (1.0, 1.0),
            ])],
        );

        let once = remove_holes(&poly);
        assert!(once.interiors().is_empty());

        let twice = remove_holes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_self_intersection() {
        let bowtie = LineString::from(vec![
            (0.0, 0.0),
            (4.0, 4.0),
            (4.0, 0.0),
            (0.0, 4.0),
            (0.0, 0.0),
        ]);
        assert!(ring_self_intersects(&bowtie));

        let square = LineString::from(vec![
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (0.0, 4.0),
            (0.0, 0.0),
        ]);
        assert!(!ring_self_intersects(&square));
    }

    #[test]
    fn test_repair_drops_bowtie() {
        let bowtie = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (4.0, 4.0),
                (4.0, 0.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        assert!(repair_polygon(bowtie).is_none());
    }
}
