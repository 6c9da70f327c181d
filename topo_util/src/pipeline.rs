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
use log::info;
use rayon::prelude::*;

use crate::config::TopographicConfig;
use crate::contour::extract_layers;
use crate::error::{Diagnostic, Diagnostics, TopoResult};
use crate::export::{export_all, ExportContext, ExportRecord};
use crate::layers::{assign_layer_numbers, plan_levels, ContourLayer};
use crate::mesh::{build_prism_mesh, build_terrain_mesh, quality_params, Mesh, MeshReport};
use crate::raster::{repair_nodata, HeightGrid};
use crate::scale::{compute_scaling, LocalProjection, ScaleInput, ScaleResult};
use crate::vector::{process_layers, ProcessOptions};

/// What the host gets back: per-file results, mesh validation, the scale
/// decision and the full diagnostic log.  Fatal problems surface as Err
/// from `generate` instead.
#[derive(Debug)]
pub struct GenerationReport {
    pub success: bool,
    pub num_layers: usize,
    pub records: Vec<ExportRecord>,
    pub mesh_reports: Vec<(u32, MeshReport)>,
    pub scaling: ScaleResult,
    pub diagnostics: Vec<Diagnostic>,
}

/// The core entry point: plan, extract, process, mesh, scale, emit.
/// Already-written files stay on disk when a later stage fails.
pub fn generate(mut grid: HeightGrid, config: &TopographicConfig) -> TopoResult<GenerationReport> {
    config.validate()?;

    let diag = Diagnostics::new();

    //repair no-data before anything samples the grid
    let repaired = repair_nodata(&mut grid)?;
    if repaired > 0 {
        diag.warn(
            "extract",
            format!("{} no-data cells repaired from nearest neighbors", repaired),
        );
    }

    let (grid_min, grid_max) = grid.min_max()?;

    //explicit elevation filters override the data-driven planning range
    let range_min = config.min_elevation.unwrap_or(grid_min);
    let range_max = config.max_elevation.unwrap_or(grid_max);

    let levels = plan_levels(config, range_min, range_max)?;
    diag.info("plan", format!("{} levels planned", levels.len()));

    let mut layers = extract_layers(&grid, &levels, &diag)?;
    assign_layer_numbers(&mut layers, config.force_all_layers);

    let bounds = grid.stats.geo_bounds();
    let projection = LocalProjection::new(&bounds);
    let (extent_x_m, extent_y_m) = projection.extent_meters(&bounds);

    let band_height_m = if range_max > range_min {
        (range_max - range_min) / levels.len() as f64
    } else {
        //flat terrain still gets a physical band
        1.0
    };

    let scaling = compute_scaling(
        config,
        &ScaleInput {
            extent_x_m,
            extent_y_m,
            elevation_range_m: range_max - range_min,
            band_height_m,
            num_layers: layers.len() as u32,
        },
    )?;
    diag.info("scale", scaling.explanation.clone());

    //tolerances arrive in meters, the stack lives in degrees
    let dpm_x = projection.degrees_per_meter_x();
    let dpm_y = projection.degrees_per_meter_y();

    let inset_offset = if config.inset_upper_layers {
        //lip size in mm of output, converted through the 2d scale
        Some(config.inset_offset_mm / scaling.scale_2d_xy * dpm_y)
    } else {
        None
    };

    let options = ProcessOptions {
        smoothing_iterations: config.smoothing_iterations,
        simplify_tolerance: config.simplification_tolerance * dpm_y,
        dedupe_tolerance: config.vertex_dedup_tolerance * dpm_y,
        min_feature_area: config.min_feature_area * dpm_x * dpm_y,
        min_feature_width: config.min_feature_width_mm / scaling.scale_2d_xy * dpm_y,
        remove_holes: config.remove_holes || config.outer_boundaries_only,
        inset_offset,
    };

    process_layers(&mut layers, &options, &diag)?;

    let (meshes, combined_mesh, mesh_reports) = if config.wants_mesh() {
        build_meshes(&grid, &layers, config, &projection, band_height_m, &diag)
    } else {
        (Vec::new(), None, Vec::new())
    };

    let ctx = ExportContext {
        config,
        layers: &layers,
        meshes: &meshes,
        combined_mesh: combined_mesh.as_ref(),
        bounds,
        projection,
        scaling: &scaling,
        min_elev: range_min,
        max_elev: range_max,
        band_height_m,
        mesh_reports: &mesh_reports,
        diag: &diag,
    };

    let export = export_all(&ctx);

    info!(
        "pipeline finished: {} layers, {} files, success {}",
        layers.len(),
        export.records.len(),
        export.success
    );

    Ok(GenerationReport {
        success: export.success,
        num_layers: layers.len(),
        records: export.records,
        mesh_reports,
        scaling,
        diagnostics: diag.entries(),
    })
}

/// Vertical relief extrudes each layer into its own prism; terrain mode
/// drapes the sampled surface into one solid.  Mesh validation findings
/// are diagnostics, never fatal.
fn build_meshes(
    grid: &HeightGrid,
    layers: &[ContourLayer],
    config: &TopographicConfig,
    projection: &LocalProjection,
    band_height_m: f64,
    diag: &Diagnostics,
) -> (Vec<(u32, Mesh)>, Option<Mesh>, Vec<(u32, MeshReport)>) {
    let quality = quality_params(config.mesh_quality);

    if !config.terrain_following && !config.vertical_contour_relief {
        diag.warn(
            "mesh",
            "3d formats requested but both relief modes are disabled",
        );
        return (Vec::new(), None, Vec::new());
    }

    if config.terrain_following {
        match build_terrain_mesh(grid, projection, &quality, band_height_m, true) {
            Ok(mesh) => {
                let report = mesh.validate();
                if !report.is_watertight {
                    diag.warn(
                        "mesh",
                        format!(
                            "terrain mesh not watertight: {} boundary edges, {} non-manifold",
                            report.boundary_edges, report.non_manifold_edges
                        ),
                    );
                }
                if !config.output_stacked {
                    diag.warn(
                        "mesh",
                        "terrain-following mode only emits the combined mesh, enable output_stacked",
                    );
                }
                return (Vec::new(), Some(mesh), vec![(0, report)]);
            }
            Err(e) => {
                diag.error("mesh", format!("terrain mesh build failed: {}", e));
                return (Vec::new(), None, Vec::new());
            }
        }
    }

    let meshes: Vec<(u32, Mesh)> = layers
        .par_iter()
        .filter_map(|layer| {
            if layer.is_empty() {
                return None;
            }

            let z_low = (layer.layer_number.saturating_sub(1)) as f64 * band_height_m;
            let z_high = z_low + band_height_m;

            match build_prism_mesh(layer, projection, z_low, z_high, &quality) {
                Ok(mesh) => Some((layer.layer_number, mesh)),
                Err(e) => {
                    diag.error(
                        "mesh",
                        format!("layer {} mesh build failed: {}", layer.layer_number, e),
                    );
                    None
                }
            }
        })
        .collect();

    let mut mesh_reports = Vec::with_capacity(meshes.len());
    for (num, mesh) in meshes.iter() {
        let report = mesh.validate();
        if !report.is_watertight {
            diag.warn(
                "mesh",
                format!(
                    "layer {} mesh not watertight: {} boundary edges",
                    num, report.boundary_edges
                ),
            );
        }
        mesh_reports.push((*num, report));
    }

    let combined = if config.output_stacked && !meshes.is_empty() {
        let mut all = Mesh::default();
        for (_, mesh) in meshes.iter() {
            all.merge(mesh);
        }
        Some(all)
    } else {
        None
    };

    (meshes, combined, mesh_reports)
}
