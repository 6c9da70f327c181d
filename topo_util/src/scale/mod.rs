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
use geo::{Coord, Rect};

use crate::config::{ScalingMethod, TopographicConfig};
use crate::error::{TopoError, TopoResult};

pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Equirectangular projection about the center latitude of the bounds.
/// Good enough over the few-km extents this tool works with, and it is the
/// same aspect correction the raster output applies.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: Coord<f64>,
    m_per_deg_x: f64,
    m_per_deg_y: f64,
}

impl LocalProjection {
    pub fn new(bounds: &Rect<f64>) -> Self {
        let center_lat = (bounds.min().y + bounds.max().y) / 2.0;

        LocalProjection {
            origin: bounds.min(),
            m_per_deg_x: METERS_PER_DEGREE * center_lat.to_radians().cos(),
            m_per_deg_y: METERS_PER_DEGREE,
        }
    }

    /// Meters relative to the lower-left corner of the bounds
    pub fn to_meters(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.origin.x) * self.m_per_deg_x,
            y: (c.y - self.origin.y) * self.m_per_deg_y,
        }
    }

    /// Degrees per meter, for converting metric tolerances into coordinate
    /// units
    pub fn degrees_per_meter_y(&self) -> f64 {
        1.0 / self.m_per_deg_y
    }

    pub fn degrees_per_meter_x(&self) -> f64 {
        1.0 / self.m_per_deg_x
    }

    pub fn extent_meters(&self, bounds: &Rect<f64>) -> (f64, f64) {
        (
            bounds.width() * self.m_per_deg_x,
            bounds.height() * self.m_per_deg_y,
        )
    }
}

/// Everything the calculator needs to know about the model
#[derive(Debug, Clone)]
pub struct ScaleInput {
    pub extent_x_m: f64,
    pub extent_y_m: f64,
    pub elevation_range_m: f64,
    pub band_height_m: f64,
    pub num_layers: u32,
}

/// Millimeters per meter for both output families, with the reasoning
#[derive(Debug, Clone)]
pub struct ScaleResult {
    pub scale_2d_xy: f64,
    pub scale_3d_xy: f64,
    pub scale_z: f64,
    pub explanation: String,
}

/// Resolves the physical scale per the configured strategies.  All factors
/// are mm per meter of terrain.
pub fn compute_scaling(config: &TopographicConfig, input: &ScaleInput) -> TopoResult<ScaleResult> {
    if input.extent_x_m <= 0.0 || input.extent_y_m <= 0.0 {
        return Err(TopoError::Configuration(
            "degenerate geographic extent".to_string(),
        ));
    }

    let max_extent = input.extent_x_m.max(input.extent_y_m);

    let mut notes: Vec<String> = Vec::new();

    let (mut scale_2d_xy, why_2d) = resolve_2d(config, input, max_extent)?;
    let (mut scale_3d_xy, mut scale_z, why_3d) = resolve_3d(config, input, max_extent)?;

    notes.push(format!("2d: {}", why_2d));
    notes.push(format!("3d: {}", why_3d));

    if config.scaling.use_2d_scaling_for_3d {
        scale_3d_xy = scale_2d_xy;
        notes.push("3d xy forced to the 2d scale".to_string());
    }
    if config.scaling.use_3d_scaling_for_2d {
        scale_2d_xy = scale_3d_xy;
        notes.push("2d xy forced to the 3d scale".to_string());
    }

    if scale_2d_xy <= 0.0 || scale_3d_xy <= 0.0 || scale_z <= 0.0 {
        return Err(TopoError::Configuration(format!(
            "scale factors must be positive, got xy2d {} xy3d {} z {}",
            scale_2d_xy, scale_3d_xy, scale_z
        )));
    }

    //guard against z growing without bound on flat terrain
    if !scale_z.is_finite() {
        scale_z = 1.0;
        notes.push("flat terrain, z scale pinned to 1".to_string());
    }

    Ok(ScaleResult {
        scale_2d_xy,
        scale_3d_xy,
        scale_z,
        explanation: notes.join("; "),
    })
}

fn bed_fit(config: &TopographicConfig, max_extent: f64) -> Option<(f64, String)> {
    match (config.cutting_bed_x_mm, config.cutting_bed_y_mm) {
        (Some(bx), Some(by)) => {
            let s = bx.min(by) / max_extent;
            Some((
                s,
                format!("bed {}x{}mm over {:.0}m extent", bx, by, max_extent),
            ))
        }
        (Some(b), None) | (None, Some(b)) => {
            let s = b / max_extent;
            Some((s, format!("bed {}mm over {:.0}m extent", b, max_extent)))
        }
        (None, None) => None,
    }
}

fn substrate_fit(config: &TopographicConfig, max_extent: f64) -> (f64, String) {
    (
        config.substrate_size_mm / max_extent,
        format!(
            "substrate {}mm over {:.0}m extent",
            config.substrate_size_mm, max_extent
        ),
    )
}

fn thickness_fit(config: &TopographicConfig, input: &ScaleInput) -> (f64, String) {
    //one elevation band reads as one material thickness
    let band = input.band_height_m.max(1e-9);
    (
        config.layer_thickness_mm / band,
        format!(
            "material thickness {}mm per {:.0}m band",
            config.layer_thickness_mm, band
        ),
    )
}

fn resolve_2d(
    config: &TopographicConfig,
    input: &ScaleInput,
    max_extent: f64,
) -> TopoResult<(f64, String)> {
    let method = config.scaling.method_2d;

    let resolved = match method {
        ScalingMethod::Auto => {
            if let Some(r) = bed_fit(config, max_extent) {
                r
            } else {
                substrate_fit(config, max_extent)
            }
        }
        ScalingMethod::BedSize => bed_fit(config, max_extent).ok_or_else(|| {
            TopoError::Configuration("bed-size scaling needs a cutting bed size".to_string())
        })?,
        ScalingMethod::MaterialThickness => thickness_fit(config, input),
        ScalingMethod::Layers => substrate_fit(config, max_extent),
        ScalingMethod::Explicit => {
            let s = config.scaling.explicit_xy.ok_or_else(|| {
                TopoError::Configuration("explicit scaling needs --scale-xy".to_string())
            })?;
            (s, format!("explicit xy {} mm/m", s))
        }
        ScalingMethod::PrintHeight | ScalingMethod::UniformXyz => {
            return Err(TopoError::Configuration(format!(
                "{:?} is a 3d-only scaling method",
                method
            )));
        }
    };

    Ok(resolved)
}

fn resolve_3d(
    config: &TopographicConfig,
    input: &ScaleInput,
    max_extent: f64,
) -> TopoResult<(f64, f64, String)> {
    let method = config.scaling.method_3d;

    //each band maps onto one physical layer unless a method overrides z
    let default_z = config.layer_thickness_mm / input.band_height_m.max(1e-9);

    let resolved = match method {
        ScalingMethod::Auto => {
            if let Some((s, why)) = bed_fit(config, max_extent) {
                (s, default_z, why)
            } else if let Some(h) = config.scaling.print_height_mm {
                let z = h / input.elevation_range_m.max(1e-9);
                (z, z, format!("print height {}mm, xy follows z", h))
            } else {
                let (s, why) = substrate_fit(config, max_extent);
                (s, default_z, why)
            }
        }
        ScalingMethod::BedSize => {
            let (s, why) = bed_fit(config, max_extent).ok_or_else(|| {
                TopoError::Configuration("bed-size scaling needs a cutting bed size".to_string())
            })?;
            (s, default_z, why)
        }
        ScalingMethod::Layers => {
            let (s, why) = substrate_fit(config, max_extent);
            (s, default_z, why)
        }
        ScalingMethod::PrintHeight => {
            let h = config.scaling.print_height_mm.ok_or_else(|| {
                TopoError::Configuration("print-height scaling needs --print-height".to_string())
            })?;
            let z = h / input.elevation_range_m.max(1e-9);
            (z, z, format!("print height {}mm, xy follows z", h))
        }
        ScalingMethod::UniformXyz => {
            let (xy, _) = substrate_fit(config, max_extent);
            let z = match config.scaling.print_height_mm {
                Some(h) => h / input.elevation_range_m.max(1e-9),
                None => f64::INFINITY,
            };
            let s = xy.min(z);
            (s, s, format!("uniform xyz from the tighter axis, {:.4} mm/m", s))
        }
        ScalingMethod::Explicit => {
            let xy = config.scaling.explicit_xy.ok_or_else(|| {
                TopoError::Configuration("explicit scaling needs --scale-xy".to_string())
            })?;
            let z = config.scaling.explicit_z.unwrap_or(xy);
            (xy, z, format!("explicit xy {} z {} mm/m", xy, z))
        }
        ScalingMethod::MaterialThickness => {
            return Err(TopoError::Configuration(
                "material-thickness is a 2d-only scaling method".to_string(),
            ));
        }
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ScaleInput {
        ScaleInput {
            extent_x_m: 10_000.0,
            extent_y_m: 5_000.0,
            elevation_range_m: 1_000.0,
            band_height_m: 200.0,
            num_layers: 5,
        }
    }

    fn config() -> TopographicConfig {
        TopographicConfig {
            min_lat: 63.0,
            max_lat: 63.1,
            min_lon: -151.1,
            max_lon: -151.0,
            num_layers: 5,
            substrate_size_mm: 200.0,
            layer_thickness_mm: 3.0,
            ..TopographicConfig::default()
        }
    }

    #[test]
    fn test_auto_prefers_bed() {
        let mut c = config();
        c.cutting_bed_x_mm = Some(600.0);
        c.cutting_bed_y_mm = Some(400.0);

        let r = compute_scaling(&c, &input()).unwrap();
        //min(600, 400) / 10000
        assert!((r.scale_2d_xy - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_auto_falls_back_to_substrate() {
        let r = compute_scaling(&config(), &input()).unwrap();
        //200mm / 10000m
        assert!((r.scale_2d_xy - 0.02).abs() < 1e-12);
        //3mm per 200m band
        assert!((r.scale_z - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_print_height() {
        let mut c = config();
        c.scaling.method_3d = ScalingMethod::PrintHeight;
        c.scaling.print_height_mm = Some(50.0);

        let r = compute_scaling(&c, &input()).unwrap();
        assert!((r.scale_z - 0.05).abs() < 1e-12);
        assert_eq!(r.scale_3d_xy, r.scale_z);
    }

    #[test]
    fn test_uniform_xyz_takes_tighter_axis() {
        let mut c = config();
        c.scaling.method_3d = ScalingMethod::UniformXyz;
        c.scaling.print_height_mm = Some(10.0);

        let r = compute_scaling(&c, &input()).unwrap();
        //z fit 10/1000 = 0.01 is tighter than xy fit 0.02
        assert!((r.scale_3d_xy - 0.01).abs() < 1e-12);
        assert!((r.scale_z - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_explicit() {
        let mut c = config();
        c.scaling.method_2d = ScalingMethod::Explicit;
        c.scaling.method_3d = ScalingMethod::Explicit;
        c.scaling.explicit_xy = Some(0.5);
        c.scaling.explicit_z = Some(0.25);

        let r = compute_scaling(&c, &input()).unwrap();
        assert_eq!(r.scale_2d_xy, 0.5);
        assert_eq!(r.scale_3d_xy, 0.5);
        assert_eq!(r.scale_z, 0.25);
    }

    #[test]
    fn test_force_2d_onto_3d() {
        let mut c = config();
        c.scaling.use_2d_scaling_for_3d = true;
        c.cutting_bed_x_mm = Some(300.0);
        c.cutting_bed_y_mm = Some(300.0);

        let r = compute_scaling(&c, &input()).unwrap();
        assert_eq!(r.scale_2d_xy, r.scale_3d_xy);
    }

    #[test]
    fn test_bed_method_without_bed_fails() {
        let mut c = config();
        c.scaling.method_2d = ScalingMethod::BedSize;
        assert!(compute_scaling(&c, &input()).is_err());
    }

    #[test]
    fn test_projection_extent() {
        let bounds = Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.01, y: 0.01 },
        );
        let proj = LocalProjection::new(&bounds);
        let (w, h) = proj.extent_meters(&bounds);

        //at the equator a hundredth of a degree is about 1.1km both ways
        assert!((w - 1113.2).abs() < 1.0);
        assert!((h - 1113.2).abs() < 1.0);

        let c = proj.to_meters(Coord { x: 0.005, y: 0.0 });
        assert!((c.x - 556.6).abs() < 1.0);
        assert_eq!(c.y, 0.0);
    }
}
