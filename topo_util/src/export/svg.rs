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

use geo::{Coord, LineString, Polygon, Rect};

use crate::config::{OutputFormat, RenderMode};
use crate::export::{run_emitter, ExportContext, ExportRecord};
use crate::label::{LabelContext, LabelRenderer, PlacedLabel, TextAnchor};
use crate::layers::ContourLayer;
use crate::render::map_elevation_color;

//laser cutters key on stroke width, keep it hairline
const CUT_STROKE_MM: f64 = 0.1;

/// Millimeter page mapping shared by every SVG element: y flipped so north
/// is up on the page, content centered inside the margin
struct PageTransform {
    scale: f64,
    margin_mm: f64,
    extent_y_m: f64,
    page_w: f64,
    page_h: f64,
    projection: crate::scale::LocalProjection,
}

impl PageTransform {
    fn new(ctx: &ExportContext) -> Self {
        let scale = ctx.scaling.scale_2d_xy;
        let (ext_x, ext_y) = ctx.projection.extent_meters(&ctx.bounds);
        let margin_mm =
            ctx.config.raster.margin_px as f64 / ctx.config.print_resolution_dpi * 25.4;

        PageTransform {
            scale,
            margin_mm,
            extent_y_m: ext_y,
            page_w: ext_x * scale + 2.0 * margin_mm,
            page_h: ext_y * scale + 2.0 * margin_mm,
            projection: ctx.projection,
        }
    }

    fn to_page(&self, c: Coord<f64>) -> (f64, f64) {
        let m = self.projection.to_meters(c);
        (
            self.margin_mm + m.x * self.scale,
            self.margin_mm + (self.extent_y_m - m.y) * self.scale,
        )
    }

    fn ring_to_page(&self, ring: &LineString<f64>) -> LineString<f64> {
        LineString::from(
            ring.0
                .iter()
                .map(|c| {
                    let (x, y) = self.to_page(*c);
                    (x, y)
                })
                .collect::<Vec<_>>(),
        )
    }

    fn polygon_to_page(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.ring_to_page(polygon.exterior()),
            polygon
                .interiors()
                .iter()
                .map(|h| self.ring_to_page(h))
                .collect(),
        )
    }

    fn bbox_to_page(&self, b: &Rect<f64>) -> Rect<f64> {
        let (x0, y0) = self.to_page(Coord {
            x: b.min().x,
            y: b.max().y,
        });
        let (x1, y1) = self.to_page(Coord {
            x: b.max().x,
            y: b.min().y,
        });
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }
}

pub fn emit_svg(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();
    let page = PageTransform::new(ctx);

    if ctx.config.output_layers {
        for (i, layer) in ctx.layers.iter().enumerate() {
            let path = ctx.layer_path(layer, OutputFormat::Svg.extension());
            let next = ctx.layers.get(i + 1);

            records.push(run_emitter(
                ctx,
                OutputFormat::Svg,
                path,
                Some(layer.layer_number),
                |w| write_svg_document(w, ctx, &page, std::slice::from_ref(layer), next),
            ));
        }
    } else {
        let path = ctx.combined_path("", OutputFormat::Svg.extension());
        records.push(run_emitter(ctx, OutputFormat::Svg, path, None, |w| {
            write_svg_document(w, ctx, &page, ctx.layers, None)
        }));
    }

    records
}

fn write_svg_document(
    w: &mut impl Write,
    ctx: &ExportContext,
    page: &PageTransform,
    layers: &[ContourLayer],
    next_layer: Option<&ContourLayer>,
) -> anyhow::Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        w,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.2}mm" height="{:.2}mm" viewBox="0 0 {:.2} {:.2}">"#,
        page.page_w, page.page_h, page.page_w, page.page_h
    )?;

    //collect labels first so curved paths can go into <defs>
    let mut all_labels: Vec<(u32, Vec<PlacedLabel>)> = Vec::new();
    let renderer = LabelRenderer::new(&ctx.config.labels);

    for (i, layer) in layers.iter().enumerate() {
        let next = if layers.len() > 1 {
            layers.get(i + 1)
        } else {
            next_layer
        };
        let labels = layer_labels(ctx, page, &renderer, layer, next);
        all_labels.push((layer.layer_number, labels));
    }

    let curved: Vec<&PlacedLabel> = all_labels
        .iter()
        .flat_map(|(_, ls)| ls.iter())
        .filter(|l| l.curved.is_some())
        .collect();

    if !curved.is_empty() {
        writeln!(w, "  <defs>")?;
        for label in curved {
            let c = label.curved.as_ref().unwrap();
            writeln!(
                w,
                r#"    <path id="{}" d="{}" fill="none"/>"#,
                c.svg_path_id, c.path.svg_path_d
            )?;
        }
        writeln!(w, "  </defs>")?;
    }

    let outline = &ctx.config.raster.outline_color;
    let stroke = format!("#{:02x}{:02x}{:02x}", outline[0], outline[1], outline[2]);

    for layer in layers {
        let fill = match ctx.config.raster.render_mode {
            RenderMode::Monochrome => "none".to_string(),
            _ => {
                let rgb = map_elevation_color(
                    ctx.config.raster.color_scheme,
                    layer.elevation,
                    ctx.min_elev,
                    ctx.max_elev,
                    ctx.config.raster.elevation_bands,
                    ctx.config.raster.custom_color_low,
                    ctx.config.raster.custom_color_high,
                );
                format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
            }
        };

        writeln!(
            w,
            r#"  <g id="layer-{:02}" fill="{}" fill-rule="evenodd" stroke="{}" stroke-width="{:.2}">"#,
            layer.layer_number, fill, stroke, CUT_STROKE_MM
        )?;

        for polygon in layer.polygons.iter() {
            let paged = page.polygon_to_page(polygon);
            writeln!(w, r#"    <path d="{}"/>"#, path_d(&paged))?;
        }

        writeln!(w, "  </g>")?;
    }

    if ctx.config.add_registration_marks {
        write_registration_marks(w, ctx, page)?;
    }

    if ctx.config.include_layer_numbers {
        for layer in layers {
            writeln!(
                w,
                r#"  <text x="{:.2}" y="{:.2}" font-size="4" fill="{}" text-anchor="start">{:02}</text>"#,
                page.margin_mm / 2.0,
                page.page_h - page.margin_mm / 2.0,
                ctx.config.labels.visible_label_color,
                layer.layer_number
            )?;
        }
    }

    for (_, labels) in all_labels.iter() {
        for label in labels {
            write_label(w, label)?;
        }
    }

    writeln!(w, "</svg>")?;
    Ok(())
}

fn layer_labels(
    ctx: &ExportContext,
    page: &PageTransform,
    renderer: &LabelRenderer,
    layer: &ContourLayer,
    next_layer: Option<&ContourLayer>,
) -> Vec<PlacedLabel> {
    let content_bbox = match layer.bounding_rect() {
        Some(b) => page.bbox_to_page(&b),
        None => return Vec::new(),
    };

    let next_polygons: Option<Vec<Polygon<f64>>> = next_layer
        .map(|n| n.polygons.iter().map(|p| page.polygon_to_page(p)).collect());

    let hidden_bbox = next_layer
        .and_then(|n| n.bounding_rect())
        .map(|b| page.bbox_to_page(&b));

    let pattern = ctx.pattern_context(layer);

    let label_ctx = LabelContext {
        layer_number: layer.layer_number,
        pattern,
        content_bbox,
        hidden_bbox,
        next_layer_polygons: next_polygons.as_deref(),
    };

    let labels = renderer.generate_labels(&label_ctx);

    for label in labels.iter() {
        if !label.warning.is_empty() {
            ctx.diag.warn("emit", format!("label: {}", label.warning));
        }
    }

    labels
}

fn write_registration_marks(
    w: &mut impl Write,
    ctx: &ExportContext,
    page: &PageTransform,
) -> anyhow::Result<()> {
    let c = &ctx.config.raster.alignment_color;
    let color = format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2]);

    let m = page.margin_mm / 2.0;
    let arm = (page.margin_mm / 3.0).max(1.5);

    let centers = [
        (m, m),
        (page.page_w - m, m),
        (m, page.page_h - m),
        (page.page_w - m, page.page_h - m),
    ];

    writeln!(
        w,
        r#"  <g stroke="{}" stroke-width="0.2" fill="none">"#,
        color
    )?;
    for (cx, cy) in centers {
        writeln!(
            w,
            r#"    <path d="M {:.2} {:.2} L {:.2} {:.2} M {:.2} {:.2} L {:.2} {:.2}"/>"#,
            cx - arm,
            cy,
            cx + arm,
            cy,
            cx,
            cy - arm,
            cx,
            cy + arm
        )?;
    }
    writeln!(w, "  </g>")?;

    Ok(())
}

fn write_label(w: &mut impl Write, label: &PlacedLabel) -> anyhow::Result<()> {
    let anchor = match label.anchor {
        TextAnchor::Start => "start",
        TextAnchor::Middle => "middle",
        TextAnchor::End => "end",
    };

    if let Some(curved) = &label.curved {
        writeln!(
            w,
            r##"  <text font-size="{:.2}" fill="{}"><textPath href="#{}">{}</textPath></text>"##,
            label.font_size_mm,
            label.color,
            curved.svg_path_id,
            escape_xml(&label.text)
        )?;
        return Ok(());
    }

    if label.was_split {
        for (part, (x, y)) in label.split_parts.iter().zip(label.split_positions.iter()) {
            writeln!(
                w,
                r#"  <text x="{:.2}" y="{:.2}" font-size="{:.2}" fill="{}" text-anchor="{}">{}</text>"#,
                x,
                y,
                label.font_size_mm,
                label.color,
                anchor,
                escape_xml(part)
            )?;
        }
        return Ok(());
    }

    writeln!(
        w,
        r#"  <text x="{:.2}" y="{:.2}" font-size="{:.2}" fill="{}" text-anchor="{}">{}</text>"#,
        label.x,
        label.y,
        label.font_size_mm,
        label.color,
        anchor,
        escape_xml(&label.text)
    )?;

    Ok(())
}

fn path_d(polygon: &Polygon<f64>) -> String {
    let mut d = String::new();
    ring_d(polygon.exterior(), &mut d);
    for hole in polygon.interiors() {
        ring_d(hole, &mut d);
    }
    d
}

fn ring_d(ring: &LineString<f64>, d: &mut String) {
    for (i, p) in ring.0.iter().enumerate() {
        if i == 0 {
            d.push_str(&format!("M {:.3} {:.3}", p.x, p.y));
        } else if i < ring.0.len() - 1 {
            d.push_str(&format!(" L {:.3} {:.3}", p.x, p.y));
        }
    }
    d.push_str(" Z ");
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
