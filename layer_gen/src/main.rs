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

use anyhow::{bail, Result};
use format_num::NumberFormat;
use itertools::Itertools;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use structopt::StructOpt;

use topo_util::config::{
    ColorScheme, ContourStrategy, MeshQuality, OutputFormat, RenderMode, ScalingMethod,
    TopographicConfig,
};
use topo_util::pipeline::generate;

mod input;
mod units;

use crate::input::{demo_grid, load_geotiff};
use crate::units::{parse_distance_m, parse_distance_mm, parse_lat_lon};

fn parse_land(s: &str) -> Result<f64> {
    parse_distance_m(s, "m")
}

fn parse_print(s: &str) -> Result<f64> {
    parse_distance_mm(s)
}

#[derive(StructOpt)]
#[structopt(
    name = "layer_gen",
    about = "Generates stacked contour layers from elevation data"
)]
struct Cli {
    /// 0 silent .. 6 trace
    #[structopt(long, default_value = "3")]
    log_level: u8,

    /// Northwest corner as lat,lon (decimal or DMS)
    #[structopt(long, parse(try_from_str = parse_lat_lon))]
    upper_left: (f64, f64),

    /// Southeast corner as lat,lon (decimal or DMS)
    #[structopt(long, parse(try_from_str = parse_lat_lon))]
    lower_right: (f64, f64),

    /// Single band GeoTIFF DEM covering the bounds
    #[structopt(long, parse(from_os_str))]
    input_dem: Option<PathBuf>,

    /// Synthetic terrain instead of a DEM: cone, peaks or flat
    #[structopt(long)]
    demo: Option<String>,

    /// Number of layers, takes precedence over the interval when set
    #[structopt(long, default_value = "0")]
    num_layers: u32,

    /// Contour interval, accepts unit suffixes (m, km, mi, ft)
    #[structopt(long, default_value = "100", parse(try_from_str = parse_land))]
    contour_interval: f64,

    /// Explicit contour levels in meters, comma separated
    #[structopt(long, use_delimiter = true)]
    levels: Vec<f64>,

    #[structopt(long, default_value = "200", parse(try_from_str = parse_print))]
    substrate_size: f64,

    #[structopt(long, default_value = "3", parse(try_from_str = parse_print))]
    layer_thickness: f64,

    #[structopt(long, parse(try_from_str = parse_print))]
    bed_x: Option<f64>,

    #[structopt(long, parse(try_from_str = parse_print))]
    bed_y: Option<f64>,

    #[structopt(long, parse(try_from_str = parse_land))]
    min_elevation: Option<f64>,

    #[structopt(long, parse(try_from_str = parse_land))]
    max_elevation: Option<f64>,

    #[structopt(long, default_value = "0", parse(try_from_str = parse_land))]
    elevation_threshold: f64,

    /// Douglas-Peucker tolerance in meters
    #[structopt(long, default_value = "0", parse(try_from_str = parse_land))]
    simplify: f64,

    #[structopt(long, default_value = "0")]
    smoothing_iterations: u32,

    /// Minimum kept feature area in square meters
    #[structopt(long, default_value = "0")]
    min_feature_area: f64,

    /// Minimum feature width on the cut sheet
    #[structopt(long, default_value = "0", parse(try_from_str = parse_print))]
    min_feature_width: f64,

    #[structopt(long, default_value = "600")]
    dpi: f64,

    /// Terrain-following surface instead of stacked prisms
    #[structopt(long)]
    terrain_following: bool,

    #[structopt(long)]
    outer_boundaries_only: bool,

    /// Keep polygon holes in 2D outputs
    #[structopt(long)]
    keep_holes: bool,

    #[structopt(long)]
    force_all_layers: bool,

    #[structopt(long)]
    inset_upper_layers: bool,

    #[structopt(long, default_value = "1", parse(try_from_str = parse_print))]
    inset_offset: f64,

    #[structopt(long)]
    registration_marks: bool,

    /// Stamp the layer number onto each output
    #[structopt(long)]
    layer_numbers: bool,

    /// One combined file instead of one file per layer
    #[structopt(long)]
    combined: bool,

    /// Also emit one stacked mesh file (3D formats)
    #[structopt(long)]
    stacked: bool,

    #[structopt(long, default_value = "medium")]
    mesh_quality: MeshQuality,

    #[structopt(long, default_value = "svg", use_delimiter = true)]
    formats: Vec<OutputFormat>,

    #[structopt(long, default_value = "terrain")]
    color_scheme: ColorScheme,

    #[structopt(long, default_value = "full-color")]
    render_mode: RenderMode,

    #[structopt(long, default_value = "10")]
    elevation_bands: u32,

    #[structopt(long, default_value = "2048")]
    width_px: u32,

    #[structopt(long, default_value = "236")]
    margin_px: u32,

    #[structopt(long)]
    no_outline: bool,

    #[structopt(long, default_value = "auto")]
    scaling_2d: ScalingMethod,

    #[structopt(long, default_value = "auto")]
    scaling_3d: ScalingMethod,

    #[structopt(long)]
    use_2d_scaling_for_3d: bool,

    #[structopt(long)]
    use_3d_scaling_for_2d: bool,

    /// Explicit xy scale in mm per meter
    #[structopt(long)]
    scale_xy: Option<f64>,

    /// Explicit z scale in mm per meter
    #[structopt(long)]
    scale_z: Option<f64>,

    #[structopt(long, parse(try_from_str = parse_print))]
    print_height: Option<f64>,

    #[structopt(long, default_value = "")]
    base_label: String,

    #[structopt(long, default_value = "")]
    base_label_hidden: String,

    #[structopt(long, default_value = "")]
    layer_label: String,

    #[structopt(long, default_value = "")]
    layer_label_hidden: String,

    #[structopt(long)]
    imperial_labels: bool,

    /// TrueType face for raster text
    #[structopt(long, parse(from_os_str))]
    font: Option<PathBuf>,

    #[structopt(long, default_value = "output", parse(from_os_str))]
    output_dir: PathBuf,

    #[structopt(long, default_value = "terrain")]
    base_name: String,

    #[structopt(long, default_value = "%{b}-layer%{l}-%{e}m")]
    filename_pattern: String,
}

fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn build_config(args: &Cli) -> Result<TopographicConfig> {
    let (max_lat, min_lon) = args.upper_left;
    let (min_lat, max_lon) = args.lower_right;

    let mut config = TopographicConfig {
        min_lat,
        min_lon,
        max_lat,
        max_lon,
        num_layers: args.num_layers,
        contour_interval: args.contour_interval,
        strategy: if args.levels.is_empty() {
            ContourStrategy::Uniform
        } else {
            ContourStrategy::Explicit
        },
        explicit_levels: args.levels.clone(),
        substrate_size_mm: args.substrate_size,
        layer_thickness_mm: args.layer_thickness,
        cutting_bed_x_mm: args.bed_x,
        cutting_bed_y_mm: args.bed_y,
        min_elevation: args.min_elevation,
        max_elevation: args.max_elevation,
        elevation_threshold: args.elevation_threshold,
        simplification_tolerance: args.simplify,
        smoothing_iterations: args.smoothing_iterations,
        min_feature_area: args.min_feature_area,
        min_feature_width_mm: args.min_feature_width,
        print_resolution_dpi: args.dpi,
        vertical_contour_relief: !args.terrain_following,
        terrain_following: args.terrain_following,
        outer_boundaries_only: args.outer_boundaries_only,
        remove_holes: !args.keep_holes,
        force_all_layers: args.force_all_layers,
        inset_upper_layers: args.inset_upper_layers,
        inset_offset_mm: args.inset_offset,
        add_registration_marks: args.registration_marks,
        include_layer_numbers: args.layer_numbers,
        output_layers: !args.combined,
        output_stacked: args.stacked,
        mesh_quality: args.mesh_quality,
        output_formats: args.formats.clone(),
        output_directory: args.output_dir.clone(),
        base_name: args.base_name.clone(),
        filename_pattern: args.filename_pattern.clone(),
        log_level: args.log_level,
        ..TopographicConfig::default()
    };

    config.labels.base_label_visible = args.base_label.clone();
    config.labels.base_label_hidden = args.base_label_hidden.clone();
    config.labels.layer_label_visible = args.layer_label.clone();
    config.labels.layer_label_hidden = args.layer_label_hidden.clone();
    config.labels.units = if args.imperial_labels {
        topo_util::config::LabelUnits::Imperial
    } else {
        topo_util::config::LabelUnits::Metric
    };

    config.raster.width_px = args.width_px;
    config.raster.margin_px = args.margin_px;
    config.raster.color_scheme = args.color_scheme;
    config.raster.render_mode = args.render_mode;
    config.raster.elevation_bands = args.elevation_bands;
    config.raster.add_terrain_outline = !args.no_outline;
    config.raster.font_path = args.font.clone();

    config.scaling.method_2d = args.scaling_2d;
    config.scaling.method_3d = args.scaling_3d;
    config.scaling.use_2d_scaling_for_3d = args.use_2d_scaling_for_3d;
    config.scaling.use_3d_scaling_for_2d = args.use_3d_scaling_for_2d;
    config.scaling.explicit_xy = args.scale_xy;
    config.scaling.explicit_z = args.scale_z;
    config.scaling.print_height_mm = args.print_height;

    Ok(config)
}

fn run() -> Result<bool> {
    let args = Cli::from_args();

    SimpleLogger::new()
        .with_level(level_filter(args.log_level))
        .init()?;

    let config = build_config(&args)?;

    let grid = match (&args.input_dem, &args.demo) {
        (Some(path), _) => load_geotiff(path)?,
        (None, Some(kind)) => demo_grid(
            kind,
            config.min_lat,
            config.min_lon,
            config.max_lat,
            config.max_lon,
        )?,
        (None, None) => bail!("either --input-dem or --demo is required"),
    };

    let report = generate(grid, &config)?;

    let nf = NumberFormat::new();
    println!("Layers: {}", report.num_layers);
    println!(
        "Formats: {}",
        config.output_formats.iter().map(|f| f.name()).join(", ")
    );
    println!("Scale: {}", report.scaling.explanation);

    for record in report.records.iter() {
        if record.success {
            println!(
                "  wrote {} ({} bytes)",
                record.path.display(),
                nf.format(",.0f", record.bytes as f64)
            );
        } else {
            println!("  FAILED {}", record.path.display());
        }
    }

    for (num, mesh_report) in report.mesh_reports.iter() {
        println!(
            "  mesh layer {}: {} triangles, watertight {}",
            num, mesh_report.num_triangles, mesh_report.is_watertight
        );
    }

    let warnings = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == topo_util::error::Severity::Warning)
        .count();
    if warnings > 0 {
        println!("{} warnings, re-run with --log-level 4 for detail", warnings);
    }

    Ok(report.success)
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("finished with errors");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
