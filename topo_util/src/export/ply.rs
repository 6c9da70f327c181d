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
use crate::export::{layer_by_number, run_emitter, z_range, ExportContext, ExportRecord};
use crate::mesh::Mesh;
use crate::render::map_mesh_color;

/// ASCII PLY with per-vertex color from the elevation color map
pub fn emit_ply(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    if ctx.config.output_layers {
        for (layer_number, mesh) in ctx.meshes.iter() {
            let path = match layer_by_number(ctx, *layer_number) {
                Some(layer) => ctx.layer_path(layer, OutputFormat::Ply.extension()),
                None => continue,
            };

            records.push(run_emitter(
                ctx,
                OutputFormat::Ply,
                path,
                Some(*layer_number),
                |w| write_ply(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z, ctx.config.raster.color_scheme),
            ));
        }
    }

    if ctx.config.output_stacked {
        if let Some(mesh) = ctx.combined_mesh {
            let path = ctx.combined_path("stacked", OutputFormat::Ply.extension());
            records.push(run_emitter(ctx, OutputFormat::Ply, path, None, |w| {
                write_ply(w, mesh, ctx.scaling.scale_3d_xy, ctx.scaling.scale_z, ctx.config.raster.color_scheme)
            }));
        }
    }

    records
}

pub fn write_ply(
    w: &mut impl Write,
    mesh: &Mesh,
    scale_xy: f64,
    scale_z: f64,
    scheme: ColorScheme,
) -> anyhow::Result<()> {
    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "comment layered terrain model, millimeters")?;
    writeln!(w, "element vertex {}", mesh.vertices.len())?;
    writeln!(w, "property float x")?;
    writeln!(w, "property float y")?;
    writeln!(w, "property float z")?;
    writeln!(w, "property uchar red")?;
    writeln!(w, "property uchar green")?;
    writeln!(w, "property uchar blue")?;
    writeln!(w, "element face {}", mesh.triangles.len())?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")?;

    let (min_z, max_z) = z_range(mesh);

    for v in mesh.vertices.iter() {
        let rgb = map_mesh_color(scheme, v[2], min_z, max_z);
        writeln!(
            w,
            "{:.4} {:.4} {:.4} {} {} {}",
            v[0] * scale_xy,
            v[1] * scale_xy,
            v[2] * scale_z,
            rgb[0],
            rgb[1],
            rgb[2],
        )?;
    }

    for t in mesh.triangles.iter() {
        writeln!(w, "3 {} {} {}", t[0], t[1], t[2])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshBuilderBuffer;

    #[test]
    fn test_ply_structure() {
        let mut b = MeshBuilderBuffer::new();
        b.add_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 3.0]);
        b.add_triangle([0.0, 0.0, 0.0], [0.0, 1.0, 3.0], [1.0, 1.0, 0.0]);
        let mesh = b.into_mesh();

        let mut buf = Vec::new();
        write_ply(&mut buf, &mesh, 1.0, 1.0, ColorScheme::Terrain).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0"));
        assert!(text.contains("element vertex 4"));
        assert!(text.contains("element face 2"));

        let body: Vec<&str> = text
            .split("end_header\n")
            .nth(1)
            .unwrap()
            .lines()
            .collect();
        assert_eq!(body.len(), 6);

        //face rows lead with their vertex count
        assert!(body[4].starts_with("3 "));
        assert!(body[5].starts_with("3 "));
    }
}
