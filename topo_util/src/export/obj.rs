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
use std::io::Write;

use crate::config::{ColorScheme, OutputFormat};
use crate::export::{layer_by_number, run_emitter, ExportContext, ExportRecord};
use crate::mesh::Mesh;
use crate::render::map_mesh_color;

/// Wavefront OBJ with the common vertex-color extension (r g b after the
/// position), colored by elevation
pub fn emit_obj(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    if ctx.config.output_layers {
        for (layer_number, mesh) in ctx.meshes.iter() {
            let path = match layer_by_number(ctx, *layer_number) {
                Some(layer) => ctx.layer_path(layer, OutputFormat::Obj.extension()),
                None => continue,
            };

            records.push(run_emitter(
                ctx,
                OutputFormat::Obj,
                path,
                Some(*layer_number),
                |w| write_obj(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z, ctx.config.raster.color_scheme),
            ));
        }
    }

    if ctx.config.output_stacked {
        if let Some(mesh) = ctx.combined_mesh {
            let path = ctx.combined_path("stacked", OutputFormat::Obj.extension());
            records.push(run_emitter(ctx, OutputFormat::Obj, path, None, |w| {
                write_obj(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z, ctx.config.raster.color_scheme)
            }));
        }
    }

    records
}

pub fn write_obj(
    w: &mut impl Write,
    mesh: &Mesh,
    scale_xy: f64,
    scale_z: f64,
    scheme: ColorScheme,
) -> anyhow::Result<()> {
    writeln!(w, "# layered terrain model, millimeters")?;
    writeln!(w, "o terrain")?;

    let (min_z, max_z) = z_range(mesh);

    for v in mesh.vertices.iter() {
        let rgb = map_mesh_color(scheme, v[2], min_z, max_z);
        writeln!(
            w,
            "v {:.4} {:.4} {:.4} {:.3} {:.3} {:.3}",
            v[0] * scale_xy,
            v[1] * scale_xy,
            v[2] * scale_z,
            rgb[0] as f64 / 255.0,
            rgb[1] as f64 / 255.0,
            rgb[2] as f64 / 255.0,
        )?;
    }

    for t in mesh.triangles.iter() {
        writeln!(w, "f {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
    }

    Ok(())
}

pub(crate) fn z_range(mesh: &Mesh) -> (f64, f64) {
    let mut min_z = f64::INFINITY;
    let mut max_z = f64::NEG_INFINITY;
    for v in mesh.vertices.iter() {
        min_z = min_z.min(v[2]);
        max_z = max_z.max(v[2]);
    }
    if min_z > max_z {
        (0.0, 1.0)
    } else {
        (min_z, max_z)
    }
}
