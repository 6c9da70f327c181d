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
use geo::{Area, Coord, Polygon};
use log::debug;

use crate::config::LabelOptions;
use crate::vector::inset_ring;

/// Sampled spline a curved label rides on
#[derive(Debug, Clone)]
pub struct TextPath {
    pub control_points: Vec<Coord<f64>>,
    pub sample_points: Vec<Coord<f64>>,
    /// Tangent at each sample, degrees
    pub tangent_angles: Vec<f64>,
    pub total_length: f64,
    pub svg_path_d: String,
}

impl TextPath {
    /// Position and rotation for each of `num_chars` characters, spread
    /// evenly over the samples
    pub fn char_placements(&self, num_chars: usize) -> Vec<(Coord<f64>, f64)> {
        if num_chars == 0 || self.sample_points.is_empty() {
            return Vec::new();
        }

        let n = self.sample_points.len();
        (0..num_chars)
            .map(|i| {
                let idx = (i * n / num_chars.max(1)).min(n - 1);
                (self.sample_points[idx], self.tangent_angles[idx])
            })
            .collect()
    }
}

/// Builds curved text paths along the inset outline of the largest polygon
/// of the next layer up
pub struct TextPathGenerator<'a> {
    options: &'a LabelOptions,
}

impl<'a> TextPathGenerator<'a> {
    pub fn new(options: &'a LabelOptions) -> Self {
        TextPathGenerator { options }
    }

    pub fn generate_path_from_polygons(
        &self,
        polygons: &[Polygon<f64>],
        text_width: f64,
        font_height: f64,
        center: Coord<f64>,
    ) -> Option<TextPath> {
        let largest = polygons
            .iter()
            .max_by(|a, b| a.unsigned_area().partial_cmp(&b.unsigned_area()).unwrap())?;

        //page space flips y and with it the winding, the inset needs CCW
        let mut exterior = largest.exterior().clone();
        if crate::vector::ring_signed_area(&exterior) < 0.0 {
            exterior.0.reverse();
        }

        //pull the path inside so glyphs stay within the outline
        let inset = self.options.text_path_inset_ratio * font_height;
        let ring = match inset_ring(&exterior, inset) {
            Some(r) => r,
            None => {
                debug!("text path inset collapsed, retrying at half");
                inset_ring(&exterior, inset / 2.0)?
            }
        };

        let vertices = &ring.0[..ring.0.len() - 1];
        if vertices.len() < 3 {
            return None;
        }

        let min_length = self.options.min_path_length_ratio * text_width;
        let (start, len) = self.extract_best_segment(vertices, min_length, center)?;

        let control: Vec<Coord<f64>> = (0..len)
            .map(|k| vertices[(start + k) % vertices.len()])
            .collect();

        let (samples, angles) = sample_catmull_rom(&control, self.options.spline_sample_points);
        if samples.len() < 2 {
            return None;
        }

        let total_length = samples
            .windows(2)
            .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
            .sum();

        let svg_path_d = svg_path_d(&samples);

        Some(TextPath {
            control_points: control,
            sample_points: samples,
            tangent_angles: angles,
            total_length,
            svg_path_d,
        })
    }

    /// Longest run of vertices whose accumulated turning stays under the
    /// threshold and whose arc length reaches `min_length`.  Ties lean
    /// toward the segment closest to `center`.
    fn extract_best_segment(
        &self,
        vertices: &[Coord<f64>],
        min_length: f64,
        center: Coord<f64>,
    ) -> Option<(usize, usize)> {
        let n = vertices.len();
        let threshold = self.options.segment_angle_threshold_deg.to_radians();

        let mut best: Option<(usize, usize, f64)> = None;

        for start in 0..n {
            let mut turn = 0.0;
            let mut length = 0.0;
            let mut count = 2;

            //grow the run until the turning budget is spent
            while count < n {
                let a = vertices[(start + count - 2) % n];
                let b = vertices[(start + count - 1) % n];
                let c = vertices[(start + count) % n];

                let ang1 = (b.y - a.y).atan2(b.x - a.x);
                let ang2 = (c.y - b.y).atan2(c.x - b.x);
                let mut d = (ang2 - ang1).abs();
                if d > std::f64::consts::PI {
                    d = 2.0 * std::f64::consts::PI - d;
                }

                if turn + d > threshold {
                    break;
                }
                turn += d;
                count += 1;
            }

            for k in 0..count - 1 {
                let a = vertices[(start + k) % n];
                let b = vertices[(start + k + 1) % n];
                length += ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            }

            if length < min_length {
                continue;
            }

            //distance-weighted score, closer to the center wins ties
            let mid = vertices[(start + count / 2) % n];
            let dist = ((mid.x - center.x).powi(2) + (mid.y - center.y).powi(2)).sqrt();
            let score = length - 0.25 * dist;

            let better = match best {
                None => true,
                Some((_, _, s)) => score > s,
            };
            if better {
                best = Some((start, count, score));
            }
        }

        best.map(|(start, count, _)| (start, count))
    }
}

/// Samples a Catmull-Rom spline through the control points, returning
/// positions and tangent angles in degrees
pub fn sample_catmull_rom(control: &[Coord<f64>], num_samples: usize) -> (Vec<Coord<f64>>, Vec<f64>) {
    if control.len() < 2 || num_samples < 2 {
        return (Vec::new(), Vec::new());
    }

    let n = control.len();
    let pick = |i: i64| -> Coord<f64> {
        let idx = i.clamp(0, n as i64 - 1) as usize;
        control[idx]
    };

    let mut samples = Vec::with_capacity(num_samples);
    let mut angles = Vec::with_capacity(num_samples);

    let segments = (n - 1) as f64;

    for s in 0..num_samples {
        let u = s as f64 / (num_samples - 1) as f64 * segments;
        let seg = (u.floor() as i64).min(n as i64 - 2);
        let t = u - seg as f64;

        let p0 = pick(seg - 1);
        let p1 = pick(seg);
        let p2 = pick(seg + 1);
        let p3 = pick(seg + 2);

        samples.push(catmull_rom(p0, p1, p2, p3, t));

        let tan = catmull_rom_tangent(p0, p1, p2, p3, t);
        angles.push(tan.y.atan2(tan.x).to_degrees());
    }

    (samples, angles)
}

fn catmull_rom(p0: Coord<f64>, p1: Coord<f64>, p2: Coord<f64>, p3: Coord<f64>, t: f64) -> Coord<f64> {
    let t2 = t * t;
    let t3 = t2 * t;

    Coord {
        x: 0.5
            * (2.0 * p1.x
                + (p2.x - p0.x) * t
                + (2.0 * p0.x - 5.0 * p1.x + 4.0 * p2.x - p3.x) * t2
                + (3.0 * p1.x - p0.x - 3.0 * p2.x + p3.x) * t3),
        y: 0.5
            * (2.0 * p1.y
                + (p2.y - p0.y) * t
                + (2.0 * p0.y - 5.0 * p1.y + 4.0 * p2.y - p3.y) * t2
                + (3.0 * p1.y - p0.y - 3.0 * p2.y + p3.y) * t3),
    }
}

fn catmull_rom_tangent(
    p0: Coord<f64>,
    p1: Coord<f64>,
    p2: Coord<f64>,
    p3: Coord<f64>,
    t: f64,
) -> Coord<f64> {
    let t2 = t * t;

    Coord {
        x: 0.5
            * ((p2.x - p0.x)
                + 2.0 * (2.0 * p0.x - 5.0 * p1.x + 4.0 * p2.x - p3.x) * t
                + 3.0 * (3.0 * p1.x - p0.x - 3.0 * p2.x + p3.x) * t2),
        y: 0.5
            * ((p2.y - p0.y)
                + 2.0 * (2.0 * p0.y - 5.0 * p1.y + 4.0 * p2.y - p3.y) * t
                + 3.0 * (3.0 * p1.y - p0.y - 3.0 * p2.y + p3.y) * t2),
    }
}

fn svg_path_d(samples: &[Coord<f64>]) -> String {
    let mut d = String::new();

    for (i, p) in samples.iter().enumerate() {
        if i == 0 {
            d.push_str(&format!("M {:.3} {:.3}", p.x, p.y));
        } else {
            d.push_str(&format!(" L {:.3} {:.3}", p.x, p.y));
        }
    }

    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn regular_polygon(sides: usize, radius: f64) -> Polygon<f64> {
        let pts: Vec<(f64, f64)> = (0..=sides)
            .map(|i| {
                let a = i as f64 / sides as f64 * std::f64::consts::TAU;
                (radius * a.cos(), radius * a.sin())
            })
            .collect();
        Polygon::new(LineString::from(pts), vec![])
    }

    #[test]
    fn test_catmull_rom_interpolates_controls() {
        let control = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 5.0 },
            Coord { x: 20.0, y: 0.0 },
        ];

        let (samples, angles) = sample_catmull_rom(&control, 21);
        assert_eq!(samples.len(), 21);
        assert_eq!(angles.len(), 21);

        //endpoints and midpoint hit the control points
        assert!((samples[0].x - 0.0).abs() < 1e-9);
        assert!((samples[10].x - 10.0).abs() < 1e-9);
        assert!((samples[10].y - 5.0).abs() < 1e-9);
        assert!((samples[20].x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_curved_selection_on_regular_polygon() {
        //spec scenario: 20-gon of radius 50, 20 chars at 3mm
        let opts = LabelOptions::default();
        let gen = TextPathGenerator::new(&opts);

        let poly = regular_polygon(20, 50.0);
        let text_width = 20.0 * 0.6 * 3.0;

        let path = gen
            .generate_path_from_polygons(&[poly], text_width, 3.0, Coord { x: 0.0, y: 0.0 })
            .unwrap();

        assert_eq!(path.sample_points.len(), 50);

        //the default turning budget lets the segment ride about half the
        //outline: 11 of 20 edges is a 198 degree arc
        let arc_deg = (path.control_points.len() - 1) as f64 / 20.0 * 360.0;
        assert!(arc_deg >= 150.0 && arc_deg <= 210.0, "arc {}", arc_deg);

        assert!(path.total_length >= 0.8 * text_width);

        //tangent angles progress monotonically along the arc modulo wrap
        let mut increasing = 0;
        for w in path.tangent_angles.windows(2) {
            let mut d = w[1] - w[0];
            if d < -180.0 {
                d += 360.0;
            }
            if d >= -1e-6 {
                increasing += 1;
            }
        }
        assert!(increasing >= path.tangent_angles.len() - 2);
    }

    #[test]
    fn test_char_placements() {
        let control = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 50.0, y: 0.0 },
        ];
        let (samples, angles) = sample_catmull_rom(&control, 50);
        let path = TextPath {
            control_points: control,
            sample_points: samples,
            tangent_angles: angles,
            total_length: 50.0,
            svg_path_d: String::new(),
        };

        let placements = path.char_placements(10);
        assert_eq!(placements.len(), 10);
        assert!(placements[0].0.x < placements[9].0.x);
        assert!((placements[0].1 - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_collapsed_inset_gives_up() {
        let opts = LabelOptions::default();
        let gen = TextPathGenerator::new(&opts);

        //tiny polygon, inset eats it even at half
        let poly = regular_polygon(8, 0.5);
        let path = gen.generate_path_from_polygons(&[poly], 30.0, 3.0, Coord { x: 0.0, y: 0.0 });

        assert!(path.is_none());
    }
}
