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
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geo::Rect;
use log::info;

mod geojson_emit;
mod geotiff;
mod obj;
mod ply;
mod png_emit;
mod shape;
mod stl;
mod svg;

pub use geojson_emit::*;
pub use geotiff::*;
pub use obj::*;
pub use ply::*;
pub use png_emit::*;
pub use shape::*;
pub use stl::*;
pub use svg::*;

use crate::config::{OutputFormat, TopographicConfig};
use crate::error::Diagnostics;
use crate::label::substitute_filename_pattern;
use crate::layers::ContourLayer;
use crate::mesh::{Mesh, MeshReport};
use crate::scale::{LocalProjection, ScaleResult};

/// One file the dispatcher wrote (or failed to write)
#[derive(Debug, Clone)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// None for combined or stacked outputs
    pub layer_number: Option<u32>,
    pub bytes: u64,
    pub written_at: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub records: Vec<ExportRecord>,
    pub success: bool,
}

/// Shared read-only view every emitter gets.  The layer stack is the
/// canonical truth; emitters transform local copies only.
pub struct ExportContext<'a> {
    pub config: &'a TopographicConfig,
    pub layers: &'a [ContourLayer],
    /// (layer_number, mesh) pairs for per-layer 3D outputs
    pub meshes: &'a [(u32, Mesh)],
    pub combined_mesh: Option<&'a Mesh>,
    pub bounds: Rect<f64>,
    pub projection: LocalProjection,
    pub scaling: &'a ScaleResult,
    pub min_elev: f64,
    pub max_elev: f64,
    pub band_height_m: f64,
    pub mesh_reports: &'a [(u32, MeshReport)],
    pub diag: &'a Diagnostics,
}

impl<'a> ExportContext<'a> {
    /// Filename (no extension) for a per-layer output
    pub fn layer_stem(&self, layer: &ContourLayer) -> String {
        substitute_filename_pattern(
            &self.config.filename_pattern,
            &self.config.base_name,
            layer.layer_number,
            layer.elevation,
        )
    }

    pub fn layer_path(&self, layer: &ContourLayer, extension: &str) -> PathBuf {
        self.config
            .output_directory
            .join(format!("{}.{}", self.layer_stem(layer), extension))
    }

    pub fn combined_path(&self, suffix: &str, extension: &str) -> PathBuf {
        let name = if suffix.is_empty() {
            format!("{}.{}", self.config.base_name, extension)
        } else {
            format!("{}-{}.{}", self.config.base_name, suffix, extension)
        };
        self.config.output_directory.join(name)
    }

    /// 1 : denominator for the 2D outputs
    pub fn scale_denominator(&self) -> f64 {
        1000.0 / self.scaling.scale_2d_xy
    }

    /// Values for `%{...}` label tokens on one layer
    pub fn pattern_context(&self, layer: &ContourLayer) -> crate::label::PatternContext {
        let (ext_x, ext_y) = self.projection.extent_meters(&self.bounds);

        crate::label::PatternContext {
            scale_denominator: self.scale_denominator(),
            contour_height_m: self.band_height_m,
            layer_number: layer.layer_number,
            elevation_m: layer.elevation,
            bounds: self.bounds,
            geo_width_m: ext_x,
            geo_height_m: ext_y,
            substrate_w_mm: self.config.substrate_size_mm,
            substrate_h_mm: self.config.substrate_size_mm,
            units: self.config.labels.units,
        }
    }

    /// The layer that stacks directly on top of the given one
    pub fn next_layer(&self, layer: &ContourLayer) -> Option<&ContourLayer> {
        self.layers
            .iter()
            .find(|l| l.layer_number == layer.layer_number + 1)
    }
}

/// Writes through a `.partial` temp file and renames on success, so an
/// interrupted run never leaves a torn file under the final name.
pub fn write_atomic<F>(path: &Path, write_fn: F) -> anyhow::Result<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let partial = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.partial", ext.to_string_lossy()),
        None => "partial".to_string(),
    });

    let file = File::create(&partial)?;
    let mut writer = BufWriter::new(file);

    let result = write_fn(&mut writer).and_then(|_| {
        writer.flush()?;
        Ok(())
    });

    match result {
        Ok(()) => {
            drop(writer);
            fs::rename(&partial, path)?;
            Ok(fs::metadata(path)?.len())
        }
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

/// Fans the layer stack out to every requested format.  A failing file is
/// recorded and reported, siblings keep going; overall success is the
/// logical AND.
pub fn export_all(ctx: &ExportContext) -> ExportReport {
    let mut report = ExportReport {
        records: Vec::new(),
        success: true,
    };

    let mut progress = crate::util::Progress::new(
        "emit",
        (ctx.config.output_formats.len() * ctx.layers.len().max(1)) as u32,
    );

    for &format in ctx.config.output_formats.iter() {
        let records = match format {
            OutputFormat::Svg => emit_svg(ctx),
            OutputFormat::GeoJson => emit_geojson(ctx),
            OutputFormat::Shapefile => emit_shapefile(ctx),
            OutputFormat::Png => emit_png(ctx),
            OutputFormat::GeoTiff => emit_geotiff(ctx),
            OutputFormat::Stl => emit_stl(ctx),
            OutputFormat::Obj => emit_obj(ctx),
            OutputFormat::Ply => emit_ply(ctx),
        };

        for record in records {
            if !record.success {
                report.success = false;
            }
            report.records.push(record);
        }

        progress.update(report.records.len() as u32);
    }

    let written = report.records.iter().filter(|r| r.success).count();
    info!(
        "export finished: {} of {} files written",
        written,
        report.records.len()
    );

    report
}

/// Shared helper: run one emitter write, log failures, produce the record
pub fn run_emitter<F>(
    ctx: &ExportContext,
    format: OutputFormat,
    path: PathBuf,
    layer_number: Option<u32>,
    write_fn: F,
) -> ExportRecord
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    match write_atomic(&path, write_fn) {
        Ok(bytes) => ExportRecord {
            path,
            format,
            layer_number,
            bytes,
            written_at: Utc::now(),
            success: true,
        },
        Err(e) => {
            ctx.diag.error(
                "emit",
                format!("{} emitter failed for {:?}: {:#}", format.name(), path, e),
            );
            ExportRecord {
                path,
                format,
                layer_number,
                bytes: 0,
                written_at: Utc::now(),
                success: false,
            }
        }
    }
}
