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

use crate::config::OutputFormat;
use crate::export::{run_emitter, ExportContext, ExportRecord};
use crate::mesh::Mesh;

/// Binary STL, triangles in millimeters after the 3D scale factors
pub fn emit_stl(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    if ctx.config.output_layers {
        for (layer_number, mesh) in ctx.meshes.iter() {
            let path = match layer_by_number(ctx, *layer_number) {
                Some(layer) => ctx.layer_path(layer, OutputFormat::Stl.extension()),
                None => continue,
            };

            records.push(run_emitter(
                ctx,
                OutputFormat::Stl,
                path,
                Some(*layer_number),
                |w| write_stl(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z),
            ));
        }
    }

    if ctx.config.output_stacked {
        if let Some(mesh) = ctx.combined_mesh {
            let path = ctx.combined_path("stacked", OutputFormat::Stl.extension());
            records.push(run_emitter(ctx, OutputFormat::Stl, path, None, |w| {
                write_stl(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z)
            }));
        }
    }

    records
}

pub(crate) fn layer_by_number<'a>(
    ctx: &'a ExportContext,
    layer_number: u32,
) -> Option<&'a crate::layers::ContourLayer> {
    ctx.layers.iter().find(|l| l.layer_number == layer_number)
}

pub fn write_stl(
    w: &mut impl Write,
    mesh: &Mesh,
    scale_xy: f64,
    scale_z: f64,
) -> anyhow::Result<()> {
    let mut header = [0u8; 80];
    let tag = b"topo_util layered terrain model";
    header[..tag.len()].copy_from_slice(tag);
    w.write_all(&header)?;

    w.write_all(&(mesh.triangles.len() as u32).to_le_bytes())?;

    let scale = |v: [f64; 3]| {
        [
            (v[0] * scale_xy) as f32,
            (v[1] * scale_xy) as f32,
            (v[2] * scale_z) as f32,
        ]
    };

    for tri in mesh.triangles.iter() {
        let n = mesh.normal(*tri);
        for c in n {
            w.write_all(&c.to_le_bytes())?;
        }

        for &idx in tri.iter() {
            let v = scale(mesh.vertices[idx as usize]);
            for c in v {
                w.write_all(&c.to_le_bytes())?;
            }
        }

        w.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}
