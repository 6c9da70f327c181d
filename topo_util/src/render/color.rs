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
use crate::config::ColorScheme;
use crate::util::lerp;

const TERRAIN_STOPS: &[(f64, [u8; 3])] = &[
    (0.0, [46, 139, 87]),
    (0.35, [222, 184, 135]),
    (0.7, [139, 90, 43]),
    (1.0, [255, 255, 255]),
];

const TOPOGRAPHIC_STOPS: &[(f64, [u8; 3])] = &[
    (0.0, [172, 208, 165]),
    (0.25, [148, 191, 139]),
    (0.5, [243, 225, 190]),
    (0.75, [202, 175, 120]),
    (1.0, [130, 90, 44]),
];

const HYPSOMETRIC_STOPS: &[(f64, [u8; 3])] = &[
    (0.0, [84, 158, 94]),
    (0.5, [222, 196, 125]),
    (0.8, [160, 108, 70]),
    (1.0, [245, 245, 245]),
];

/// Elevation to fill color.  The domain [min, max] must be the global
/// range of the whole stack so per-layer rasters stay consistent.
pub fn map_elevation_color(
    scheme: ColorScheme,
    elevation: f64,
    min_elev: f64,
    max_elev: f64,
    bands: u32,
    custom_low: [u8; 3],
    custom_high: [u8; 3],
) -> [u8; 3] {
    let range = max_elev - min_elev;
    let mut t = if range <= 0.0 {
        0.0
    } else {
        ((elevation - min_elev) / range).clamp(0.0, 1.0)
    };

    //quantize into discrete elevation bands
    if bands > 1 {
        let idx = ((t * bands as f64).floor() as u32).min(bands - 1);
        t = idx as f64 / (bands - 1) as f64;
    }

    match scheme {
        ColorScheme::Terrain => ramp(TERRAIN_STOPS, t),
        ColorScheme::Grayscale => {
            let v = (lerp(40.0, 255.0, t)) as u8;
            [v, v, v]
        }
        ColorScheme::Rainbow => rainbow(t),
        ColorScheme::Topographic => ramp(TOPOGRAPHIC_STOPS, t),
        ColorScheme::Hypsometric => ramp(HYPSOMETRIC_STOPS, t),
        ColorScheme::Custom => [
            lerp(custom_low[0] as f64, custom_high[0] as f64, t) as u8,
            lerp(custom_low[1] as f64, custom_high[1] as f64, t) as u8,
            lerp(custom_low[2] as f64, custom_high[2] as f64, t) as u8,
        ],
    }
}

fn ramp(stops: &[(f64, [u8; 3])], t: f64) -> [u8; 3] {
    if t <= stops[0].0 {
        return stops[0].1;
    }

    for w in stops.windows(2) {
        let (t0, c0) = w[0];
        let (t1, c1) = w[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return [
                lerp(c0[0] as f64, c1[0] as f64, f) as u8,
                lerp(c0[1] as f64, c1[1] as f64, f) as u8,
                lerp(c0[2] as f64, c1[2] as f64, f) as u8,
            ];
        }
    }

    stops[stops.len() - 1].1
}

//hue sweep from blue (low) to red (high), full saturation
fn rainbow(t: f64) -> [u8; 3] {
    let hue = lerp(240.0, 0.0, t);
    let h = hue / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();

    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        _ => (x, 0.0, 1.0),
    };

    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Per-vertex color for mesh emitters that carry color
pub fn map_mesh_color(scheme: ColorScheme, z: f64, min_z: f64, max_z: f64) -> [u8; 3] {
    map_elevation_color(scheme, z, min_z, max_z, 0, [0, 0, 0], [255, 255, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_monotone() {
        let lo = map_elevation_color(ColorScheme::Grayscale, 0.0, 0.0, 100.0, 0, [0; 3], [0; 3]);
        let mid = map_elevation_color(ColorScheme::Grayscale, 50.0, 0.0, 100.0, 0, [0; 3], [0; 3]);
        let hi = map_elevation_color(ColorScheme::Grayscale, 100.0, 0.0, 100.0, 0, [0; 3], [0; 3]);

        assert!(lo[0] < mid[0]);
        assert!(mid[0] < hi[0]);
        assert_eq!(hi, [255, 255, 255]);
    }

    #[test]
    fn test_banding_quantizes() {
        let a = map_elevation_color(ColorScheme::Grayscale, 10.0, 0.0, 100.0, 5, [0; 3], [0; 3]);
        let b = map_elevation_color(ColorScheme::Grayscale, 19.0, 0.0, 100.0, 5, [0; 3], [0; 3]);
        let c = map_elevation_color(ColorScheme::Grayscale, 21.0, 0.0, 100.0, 5, [0; 3], [0; 3]);

        //same band, same color; next band differs
        assert_eq!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_rainbow_ends() {
        let lo = map_elevation_color(ColorScheme::Rainbow, 0.0, 0.0, 1.0, 0, [0; 3], [0; 3]);
        let hi = map_elevation_color(ColorScheme::Rainbow, 1.0, 0.0, 1.0, 0, [0; 3], [0; 3]);

        //blue at the bottom, red at the top
        assert!(lo[2] > 200 && lo[0] < 50);
        assert!(hi[0] > 200 && hi[2] < 50);
    }

    #[test]
    fn test_custom_endpoints() {
        let low = [10, 20, 30];
        let high = [200, 100, 50];

        let a = map_elevation_color(ColorScheme::Custom, 0.0, 0.0, 1.0, 0, low, high);
        let b = map_elevation_color(ColorScheme::Custom, 1.0, 0.0, 1.0, 0, low, high);

        assert_eq!(a, low);
        assert_eq!(b, high);
    }

    #[test]
    fn test_degenerate_range() {
        let c = map_elevation_color(ColorScheme::Terrain, 5.0, 5.0, 5.0, 0, [0; 3], [0; 3]);
        assert_eq!(c, TERRAIN_STOPS[0].1);
    }
}
