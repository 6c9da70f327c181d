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
use crate::label::{LabelContext, LabelRenderer, PlacedLabel, TextAnchor};
use crate::layers::ContourLayer;
use crate::render::{
    draw_border, draw_labels, draw_plain_text, draw_registration_marks, render_layers, Canvas,
    CanvasLayout,
};

pub fn emit_png(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();
    let layout = CanvasLayout::compute(&ctx.bounds, &ctx.config.raster);

    if ctx.config.output_layers {
        for layer in ctx.layers.iter() {
            let path = ctx.layer_path(layer, OutputFormat::Png.extension());

            records.push(run_emitter(
                ctx,
                OutputFormat::Png,
                path,
                Some(layer.layer_number),
                |w| {
                    let canvas = build_canvas(ctx, &layout, std::slice::from_ref(layer));
                    encode_png(w, &canvas)
                },
            ));
        }
    } else {
        let path = ctx.combined_path("", OutputFormat::Png.extension());
        records.push(run_emitter(ctx, OutputFormat::Png, path, None, |w| {
            let canvas = build_canvas(ctx, &layout, ctx.layers);
            encode_png(w, &canvas)
        }));
    }

    records
}

/// Rasterizes layers and composites annotations.  Every per-layer canvas
/// maps colors over the same global elevation domain.
pub fn build_canvas(ctx: &ExportContext, layout: &CanvasLayout, layers: &[ContourLayer]) -> Canvas {
    let mut canvas = render_layers(
        layers,
        layout,
        &ctx.config.raster,
        ctx.min_elev,
        ctx.max_elev,
    );

    if ctx.config.add_registration_marks {
        draw_registration_marks(
            &mut canvas,
            layout.margin_px,
            ctx.config.raster.alignment_color,
        );
        draw_border(&mut canvas, layout.margin_px, ctx.config.raster.alignment_color, 1.0);
    }

    if ctx.config.include_layer_numbers {
        if let [layer] = layers {
            let size_px = (layout.margin_px as f32 * 0.6).max(12.0);
            let canvas_height = canvas.height;
            draw_plain_text(
                &mut canvas,
                &format!("{:02}", layer.layer_number),
                layout.margin_px as f32 * 0.25,
                canvas_height as f32 - layout.margin_px as f32 * 0.25,
                size_px,
                [0, 0, 0, 255],
                TextAnchor::Start,
                ctx.config.raster.font_path.as_deref(),
            );
        }
    }

    for layer in layers {
        let labels = canvas_labels(ctx, layout, layer);
        draw_labels(&mut canvas, &labels, &ctx.config.raster, 1.0);
    }

    canvas
}

/// Label placement in pixel space.  The fitter is unit agnostic, so the
/// millimeter font sizes are pre-scaled into pixels and the placed labels
/// draw one to one.
fn canvas_labels(
    ctx: &ExportContext,
    layout: &CanvasLayout,
    layer: &ContourLayer,
) -> Vec<PlacedLabel> {
    let (ext_x_m, _) = ctx.projection.extent_meters(&ctx.bounds);
    let content_w_px = layout.width_px.saturating_sub(2 * layout.margin_px) as f64;
    let page_w_mm = ext_x_m * ctx.scaling.scale_2d_xy;
    if page_w_mm <= 0.0 {
        return Vec::new();
    }
    let px_per_mm = content_w_px / page_w_mm;

    let mut options = ctx.config.labels.clone();
    options.base_font_size_mm *= px_per_mm;
    options.layer_font_size_mm *= px_per_mm;
    options.min_legible_size_mm *= px_per_mm;

    let bbox_px = |b: &geo::Rect<f64>| {
        let (x0, y0) = layout.geo_to_px(b.min().x, b.max().y);
        let (x1, y1) = layout.geo_to_px(b.max().x, b.min().y);
        geo::Rect::new(geo::Coord { x: x0, y: y0 }, geo::Coord { x: x1, y: y1 })
    };

    let content_bbox = match layer.bounding_rect() {
        Some(b) => bbox_px(&b),
        None => return Vec::new(),
    };

    let next = ctx.next_layer(layer);
    let hidden_bbox = next.and_then(|n| n.bounding_rect()).map(|b| bbox_px(&b));

    let next_polygons: Option<Vec<geo::Polygon<f64>>> = next.map(|n| {
        n.polygons
            .iter()
            .map(|p| {
                let map_ring = |ring: &geo::LineString<f64>| {
                    geo::LineString::from(
                        ring.0
                            .iter()
                            .map(|c| {
                                let (x, y) = layout.geo_to_px(c.x, c.y);
                                (x, y)
                            })
                            .collect::<Vec<_>>(),
                    )
                };
                geo::Polygon::new(
                    map_ring(p.exterior()),
                    p.interiors().iter().map(map_ring).collect(),
                )
            })
            .collect()
    });

    let renderer = LabelRenderer::new(&options);
    let label_ctx = LabelContext {
        layer_number: layer.layer_number,
        pattern: ctx.pattern_context(layer),
        content_bbox,
        hidden_bbox,
        next_layer_polygons: next_polygons.as_deref(),
    };

    renderer.generate_labels(&label_ctx)
}

pub fn encode_png(w: &mut impl Write, canvas: &Canvas) -> anyhow::Result<()> {
    let mut encoder = png::Encoder::new(w, canvas.width, canvas.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&canvas.pixels)?;
    writer.finish()?;

    Ok(())
}
