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
use std::io::{Seek, Write};

use tiff::encoder::colortype::RGBA8;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::config::OutputFormat;
use crate::export::{build_canvas, run_emitter, ExportContext, ExportRecord};
use crate::render::{Canvas, CanvasLayout};

pub fn emit_geotiff(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();
    let layout = CanvasLayout::compute(&ctx.bounds, &ctx.config.raster);

    if ctx.config.output_layers {
        for layer in ctx.layers.iter() {
            let path = ctx.layer_path(layer, OutputFormat::GeoTiff.extension());

            records.push(run_emitter(
                ctx,
                OutputFormat::GeoTiff,
                path,
                Some(layer.layer_number),
                |w| {
                    let canvas = build_canvas(ctx, &layout, std::slice::from_ref(layer));
                    encode_geotiff(w, &canvas, &layout)
                },
            ));
        }
    } else {
        let path = ctx.combined_path("", OutputFormat::GeoTiff.extension());
        records.push(run_emitter(ctx, OutputFormat::GeoTiff, path, None, |w| {
            let canvas = build_canvas(ctx, &layout, ctx.layers);
            encode_geotiff(w, &canvas, &layout)
        }));
    }

    records
}

/// Four band RGBA with the georeferencing carried in ModelPixelScale and
/// ModelTiepoint plus a minimal WGS84 geo key directory
pub fn encode_geotiff<W: Write + Seek>(
    w: &mut W,
    canvas: &Canvas,
    layout: &CanvasLayout,
) -> anyhow::Result<()> {
    let mut encoder = TiffEncoder::new(w)?;

    let mut image = encoder.new_image::<RGBA8>(canvas.width, canvas.height)?;

    let gt = layout.geotransform();

    let pixel_scale: [f64; 3] = [gt[1], -gt[5], 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;

    //raster (0, 0) pins to the geographic origin
    let tie_points: [f64; 6] = [0.0, 0.0, 0.0, gt[0], gt[3], 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tie_points[..])?;

    //GTModelType = geographic, GTRasterType = pixel-is-area,
    //GeographicType = EPSG 4326
    let geo_keys: [u16; 16] = [
        1, 1, 0, 3, //
        1024, 0, 1, 2, //
        1025, 0, 1, 1, //
        2048, 0, 1, 4326,
    ];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;

    image
        .encoder()
        .write_tag(Tag::GeoAsciiParamsTag, "WGS 84|")?;

    image.write_data(&canvas.pixels)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterOptions;
    use geo::{Coord, Rect};
    use std::io::Cursor;

    #[test]
    fn test_encode_and_decode() {
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.01, y: 0.01 });
        let options = RasterOptions {
            width_px: 64,
            margin_px: 4,
            ..RasterOptions::default()
        };
        let layout = CanvasLayout::compute(&bounds, &options);

        let canvas = Canvas::new(layout.width_px, layout.height_px, [1, 2, 3, 255]);

        let mut cursor = Cursor::new(Vec::new());
        encode_geotiff(&mut cursor, &canvas, &layout).unwrap();

        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(cursor.into_inner())).unwrap();
        let (w, h) = decoder.dimensions().unwrap();
        assert_eq!(w, layout.width_px);
        assert_eq!(h, layout.height_px);

        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .unwrap();
        assert!((scale[0] - layout.deg_per_px_x).abs() < 1e-12);
        assert!((scale[1] - layout.deg_per_px_y).abs() < 1e-12);

        let tie = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .unwrap();
        assert!((tie[3] - layout.origin_x).abs() < 1e-12);
        assert!((tie[4] - layout.origin_y).abs() < 1e-12);
    }
}
