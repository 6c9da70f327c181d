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
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopoError;

/// How contour levels are chosen from the elevation range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContourStrategy {
    /// Equal width bands between min and max elevation
    Uniform,
    /// Fixed interval in meters, first level snapped to a multiple of it
    Interval,
    /// Caller supplies the level values directly
    Explicit,
    /// Uniform bands, then min/max/threshold filters applied
    Filtered,
}

impl Default for ContourStrategy {
    fn default() -> Self {
        ContourStrategy::Uniform
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMethod {
    Auto,
    BedSize,
    //2d only
    MaterialThickness,
    Layers,
    //3d only
    PrintHeight,
    //3d only
    UniformXyz,
    Explicit,
}

impl Default for ScalingMethod {
    fn default() -> Self {
        ScalingMethod::Auto
    }
}

impl FromStr for ScalingMethod {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ScalingMethod::Auto),
            "bed-size" | "bedsize" => Ok(ScalingMethod::BedSize),
            "material-thickness" => Ok(ScalingMethod::MaterialThickness),
            "layers" => Ok(ScalingMethod::Layers),
            "print-height" => Ok(ScalingMethod::PrintHeight),
            "uniform-xyz" => Ok(ScalingMethod::UniformXyz),
            "explicit" => Ok(ScalingMethod::Explicit),
            other => Err(TopoError::Configuration(format!(
                "unknown scaling method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorScheme {
    Terrain,
    Grayscale,
    Rainbow,
    Topographic,
    Hypsometric,
    /// Interpolates between two user supplied RGB endpoints
    Custom,
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme::Terrain
    }
}

impl FromStr for ColorScheme {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terrain" => Ok(ColorScheme::Terrain),
            "grayscale" | "greyscale" => Ok(ColorScheme::Grayscale),
            "rainbow" => Ok(ColorScheme::Rainbow),
            "topographic" => Ok(ColorScheme::Topographic),
            "hypsometric" => Ok(ColorScheme::Hypsometric),
            "custom" => Ok(ColorScheme::Custom),
            other => Err(TopoError::Configuration(format!(
                "unknown color scheme '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    FullColor,
    Grayscale,
    /// No fills, outline only
    Monochrome,
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::FullColor
    }
}

impl FromStr for RenderMode {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full-color" | "fullcolor" | "color" => Ok(RenderMode::FullColor),
            "grayscale" | "greyscale" => Ok(RenderMode::Grayscale),
            "monochrome" | "mono" => Ok(RenderMode::Monochrome),
            other => Err(TopoError::Configuration(format!(
                "unknown render mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeshQuality {
    Draft,
    Medium,
    High,
    Ultra,
}

impl Default for MeshQuality {
    fn default() -> Self {
        MeshQuality::Medium
    }
}

impl FromStr for MeshQuality {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(MeshQuality::Draft),
            "medium" => Ok(MeshQuality::Medium),
            "high" => Ok(MeshQuality::High),
            "ultra" => Ok(MeshQuality::Ultra),
            other => Err(TopoError::Configuration(format!(
                "unknown mesh quality '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Svg,
    Png,
    GeoTiff,
    GeoJson,
    Shapefile,
    Stl,
    Obj,
    Ply,
}

impl OutputFormat {
    pub fn is_mesh(self) -> bool {
        matches!(
            self,
            OutputFormat::Stl | OutputFormat::Obj | OutputFormat::Ply
        )
    }

    pub fn is_raster(self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::GeoTiff)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::GeoTiff => "tif",
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Shapefile => "shp",
            OutputFormat::Stl => "stl",
            OutputFormat::Obj => "obj",
            OutputFormat::Ply => "ply",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::GeoTiff => "geotiff",
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Shapefile => "shapefile",
            OutputFormat::Stl => "stl",
            OutputFormat::Obj => "obj",
            OutputFormat::Ply => "ply",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "geotiff" | "tif" | "tiff" => Ok(OutputFormat::GeoTiff),
            "geojson" | "json" => Ok(OutputFormat::GeoJson),
            "shapefile" | "shp" => Ok(OutputFormat::Shapefile),
            "stl" => Ok(OutputFormat::Stl),
            "obj" => Ok(OutputFormat::Obj),
            "ply" => Ok(OutputFormat::Ply),
            other => Err(TopoError::Configuration(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelUnits {
    Metric,
    Imperial,
}

impl Default for LabelUnits {
    fn default() -> Self {
        LabelUnits::Metric
    }
}

/// Label text patterns and fitting limits.  Empty pattern means no label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelOptions {
    pub base_label_visible: String,
    pub base_label_hidden: String,
    pub layer_label_visible: String,
    pub layer_label_hidden: String,

    pub units: LabelUnits,

    pub visible_label_color: String,
    pub hidden_label_color: String,
    pub base_font_size_mm: f64,
    pub layer_font_size_mm: f64,

    pub max_bend_angle_deg: f64,
    pub min_scale_factor: f64,
    pub max_split_parts: usize,
    pub min_legible_size_mm: f64,

    pub enable_curved_text: bool,
    pub text_path_inset_ratio: f64,
    pub min_path_length_ratio: f64,
    pub spline_sample_points: usize,
    pub segment_angle_threshold_deg: f64,
}

impl Default for LabelOptions {
    fn default() -> Self {
        LabelOptions {
            base_label_visible: String::new(),
            base_label_hidden: String::new(),
            layer_label_visible: String::new(),
            layer_label_hidden: String::new(),
            units: LabelUnits::Metric,
            visible_label_color: "#000000".to_string(),
            hidden_label_color: "#666666".to_string(),
            base_font_size_mm: 4.0,
            layer_font_size_mm: 3.0,
            max_bend_angle_deg: 15.0,
            min_scale_factor: 0.5,
            max_split_parts: 3,
            min_legible_size_mm: 1.5,
            enable_curved_text: true,
            text_path_inset_ratio: 0.75,
            min_path_length_ratio: 0.8,
            spline_sample_points: 50,
            segment_angle_threshold_deg: 180.0,
        }
    }
}

/// Raster output settings shared by the PNG and GeoTIFF emitters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterOptions {
    pub width_px: u32,
    /// 0 means derive from the aspect ratio of the bounds
    pub height_px: u32,
    pub margin_px: u32,
    pub color_scheme: ColorScheme,
    pub render_mode: RenderMode,
    pub elevation_bands: u32,
    pub background_color: [u8; 4],
    pub add_terrain_outline: bool,
    pub outline_color: [u8; 4],
    pub outline_width_px: f64,
    pub alignment_color: [u8; 4],
    /// Endpoints for ColorScheme::Custom
    pub custom_color_low: [u8; 3],
    pub custom_color_high: [u8; 3],
    /// Optional TrueType face for annotations; system fallbacks tried when unset
    pub font_path: Option<PathBuf>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        RasterOptions {
            width_px: 2048,
            height_px: 0,
            //10mm at 600 dpi
            margin_px: 236,
            color_scheme: ColorScheme::Terrain,
            render_mode: RenderMode::FullColor,
            elevation_bands: 10,
            background_color: [255, 255, 255, 255],
            add_terrain_outline: true,
            outline_color: [255, 0, 0, 255],
            outline_width_px: 5.0,
            alignment_color: [0, 0, 255, 255],
            custom_color_low: [240, 240, 220],
            custom_color_high: [90, 60, 30],
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingOptions {
    pub method_2d: ScalingMethod,
    pub method_3d: ScalingMethod,
    pub use_2d_scaling_for_3d: bool,
    pub use_3d_scaling_for_2d: bool,
    /// mm per meter, used by ScalingMethod::Explicit
    pub explicit_xy: Option<f64>,
    pub explicit_z: Option<f64>,
    /// Target total print height for ScalingMethod::PrintHeight
    pub print_height_mm: Option<f64>,
}

impl Default for ScalingOptions {
    fn default() -> Self {
        ScalingOptions {
            method_2d: ScalingMethod::Auto,
            method_3d: ScalingMethod::Auto,
            use_2d_scaling_for_3d: false,
            use_3d_scaling_for_2d: false,
            explicit_xy: None,
            explicit_z: None,
            print_height_mm: None,
        }
    }
}

/// The populated configuration record the host hands to the pipeline.
/// Bounds are WGS84 degrees, distances meters unless the field name says mm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopographicConfig {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,

    /// Takes precedence over contour_interval when > 0
    pub num_layers: u32,
    pub contour_interval: f64,
    pub strategy: ContourStrategy,
    pub explicit_levels: Vec<f64>,

    pub substrate_size_mm: f64,
    pub layer_thickness_mm: f64,
    pub cutting_bed_x_mm: Option<f64>,
    pub cutting_bed_y_mm: Option<f64>,

    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub elevation_threshold: f64,

    pub simplification_tolerance: f64,
    pub smoothing_iterations: u32,
    pub min_feature_area: f64,
    pub min_feature_width_mm: f64,
    pub vertex_dedup_tolerance: f64,
    pub print_resolution_dpi: f64,

    pub vertical_contour_relief: bool,
    pub terrain_following: bool,
    pub outer_boundaries_only: bool,
    pub remove_holes: bool,
    pub force_all_layers: bool,
    pub inset_upper_layers: bool,
    pub inset_offset_mm: f64,
    pub add_registration_marks: bool,
    pub include_layer_numbers: bool,
    pub output_layers: bool,
    pub output_stacked: bool,

    pub mesh_quality: MeshQuality,

    pub labels: LabelOptions,
    pub raster: RasterOptions,
    pub scaling: ScalingOptions,

    pub output_formats: Vec<OutputFormat>,
    pub output_directory: PathBuf,
    pub base_name: String,
    pub filename_pattern: String,

    /// 0 silent .. 6 trace, mapped onto the log facade by the host
    pub log_level: u8,
}

impl Default for TopographicConfig {
    fn default() -> Self {
        TopographicConfig {
            min_lat: 0.0,
            min_lon: 0.0,
            max_lat: 0.0,
            max_lon: 0.0,
            num_layers: 0,
            contour_interval: 100.0,
            strategy: ContourStrategy::Uniform,
            explicit_levels: Vec::new(),
            substrate_size_mm: 200.0,
            layer_thickness_mm: 3.0,
            cutting_bed_x_mm: None,
            cutting_bed_y_mm: None,
            min_elevation: None,
            max_elevation: None,
            elevation_threshold: 0.0,
            simplification_tolerance: 0.0,
            smoothing_iterations: 0,
            min_feature_area: 0.0,
            min_feature_width_mm: 0.0,
            vertex_dedup_tolerance: 1e-6,
            print_resolution_dpi: 600.0,
            vertical_contour_relief: true,
            terrain_following: false,
            outer_boundaries_only: false,
            remove_holes: true,
            force_all_layers: false,
            inset_upper_layers: false,
            inset_offset_mm: 1.0,
            add_registration_marks: false,
            include_layer_numbers: false,
            output_layers: true,
            output_stacked: false,
            mesh_quality: MeshQuality::Medium,
            labels: LabelOptions::default(),
            raster: RasterOptions::default(),
            scaling: ScalingOptions::default(),
            output_formats: vec![OutputFormat::Svg],
            output_directory: PathBuf::from("output"),
            base_name: "terrain".to_string(),
            filename_pattern: "%{b}-layer%{l}-%{e}m".to_string(),
            log_level: 3,
        }
    }
}

impl TopographicConfig {
    /// Upfront consistency checks, run before any work starts
    pub fn validate(&self) -> Result<(), TopoError> {
        if self.max_lat <= self.min_lat || self.max_lon <= self.min_lon {
            return Err(TopoError::Configuration(format!(
                "upper-left must be northwest of lower-right, got lat [{}, {}] lon [{}, {}]",
                self.min_lat, self.max_lat, self.min_lon, self.max_lon
            )));
        }

        if self.num_layers == 0
            && self.contour_interval <= 0.0
            && self.strategy != ContourStrategy::Explicit
        {
            return Err(TopoError::Configuration(
                "either num_layers or a positive contour_interval is required".to_string(),
            ));
        }

        if self.strategy == ContourStrategy::Explicit && self.explicit_levels.is_empty() {
            return Err(TopoError::Configuration(
                "explicit strategy requires at least one level".to_string(),
            ));
        }

        if let (Some(lo), Some(hi)) = (self.min_elevation, self.max_elevation) {
            if hi < lo {
                return Err(TopoError::Configuration(format!(
                    "max_elevation {} below min_elevation {}",
                    hi, lo
                )));
            }
        }

        if self.output_formats.is_empty() {
            return Err(TopoError::Configuration(
                "no output formats requested".to_string(),
            ));
        }

        if !self.output_layers && !self.output_stacked {
            return Err(TopoError::Configuration(
                "neither per-layer nor stacked output enabled".to_string(),
            ));
        }

        if self.substrate_size_mm <= 0.0 || self.layer_thickness_mm <= 0.0 {
            return Err(TopoError::Configuration(
                "substrate size and layer thickness must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn wants_mesh(&self) -> bool {
        self.output_formats.iter().any(|f| f.is_mesh())
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}
