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
use geo::{Coord, LineString};

mod clean;
mod inset;
mod process;
mod simplify;

pub use clean::*;
pub use inset::*;
pub use process::*;
pub use simplify::*;

/// Shoelace area of a closed ring, positive for CCW
pub fn ring_signed_area(ring: &LineString<f64>) -> f64 {
    let pts = &ring.0;
    if pts.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for w in pts.windows(2) {
        area += w[0].x * w[1].y - w[1].x * w[0].y;
    }

    //tolerate an unclosed ring
    if pts[0] != pts[pts.len() - 1] {
        let a = pts[pts.len() - 1];
        let b = pts[0];
        area += a.x * b.y - b.x * a.y;
    }

    area / 2.0
}

/// Length of the ring perimeter
pub fn ring_length(ring: &LineString<f64>) -> f64 {
    ring.0
        .windows(2)
        .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
        .sum()
}

/// Distance from a point to the segment a-b
pub fn dist_point_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len2 = abx * abx + aby * aby;

    if len2 == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }

    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0);
    let cx = a.x + t * abx;
    let cy = a.y + t * aby;

    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
