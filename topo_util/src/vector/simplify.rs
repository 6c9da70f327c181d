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
use geo::{ChaikinSmoothing, LineString, Polygon, Simplify};

/// Ring-wise Douglas-Peucker.  Rings that fall under 4 points are dropped;
/// a polygon losing its exterior is dropped entirely.
pub fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Option<Polygon<f64>> {
    if tolerance <= 0.0 {
        return Some(polygon.clone());
    }

    let exterior = simplify_ring(polygon.exterior(), tolerance)?;

    let holes = polygon
        .interiors()
        .iter()
        .filter_map(|h| simplify_ring(h, tolerance))
        .collect();

    Some(Polygon::new(exterior, holes))
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> Option<LineString<f64>> {
    let mut simplified = ring.simplify(&tolerance);
    simplified.close();

    if simplified.0.len() < 4 {
        return None;
    }

    Some(simplified)
}

/// Chaikin corner cutting, applied before simplification when configured.
/// Zero iterations is the identity.
pub fn smooth_polygon(polygon: &Polygon<f64>, iterations: u32) -> Polygon<f64> {
    if iterations == 0 {
        return polygon.clone();
    }

    polygon.chaikin_smoothing(iterations as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::dist_point_segment;

    fn noisy_square() -> Polygon<f64> {
        //a square with a redundant midpoint on each side, slightly off axis
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (5.0, 0.001),
                (10.0, 0.0),
                (10.0, 5.0),
                (10.0, 10.0),
                (5.0, 10.001),
                (0.0, 10.0),
                (0.0, 5.0),
                (0.0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_simplify_removes_redundant_points() {
        let p = simplify_polygon(&noisy_square(), 0.01).unwrap();
        assert_eq!(p.exterior().0.len(), 5);
    }

    #[test]
    fn test_simplified_vertices_near_input_edges() {
        let input = noisy_square();
        let tol = 0.01;
        let p = simplify_polygon(&input, tol).unwrap();

        //every surviving vertex lies on some input edge
        for v in p.exterior().0.iter() {
            let mut best = f64::INFINITY;
            for w in input.exterior().0.windows(2) {
                best = best.min(dist_point_segment(*v, w[0], w[1]));
            }
            assert!(best <= tol);
        }
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let input = noisy_square();
        let p = simplify_polygon(&input, 0.0).unwrap();
        assert_eq!(p.exterior().0.len(), input.exterior().0.len());
    }

    #[test]
    fn test_collapsing_ring_drops_polygon() {
        //nearly collinear sliver collapses below 4 points
        let sliver = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (10.0, 0.0001),
                (20.0, 0.0),
                (0.0, 0.0),
            ]),
            vec![],
        );

        assert!(simplify_polygon(&sliver, 1.0).is_none());
    }

    #[test]
    fn test_hole_dropped_exterior_kept() {
        let mut p = noisy_square();
        let hole_sliver = LineString::from(vec![
            (4.0, 4.0),
            (5.0, 4.0001),
            (6.0, 4.0),
            (4.0, 4.0),
        ]);
        p = Polygon::new(p.exterior().clone(), vec![hole_sliver]);

        let out = simplify_polygon(&p, 0.01).unwrap();
        assert!(out.interiors().is_empty());
    }

    #[test]
    fn test_smoothing_rounds_corners() {
        let p = smooth_polygon(&noisy_square(), 1);

        //chaikin doubles the corner count
        assert!(p.exterior().0.len() > noisy_square().exterior().0.len());

        //smoothed ring stays closed
        let pts = &p.exterior().0;
        assert_eq!(pts.first(), pts.last());
    }
}
