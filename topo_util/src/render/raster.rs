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
use geo::{Polygon, Rect};
use log::debug;

use crate::config::{RasterOptions, RenderMode};
use crate::layers::ContourLayer;
use crate::render::{draw_thick_line, map_elevation_color, Canvas};

/// Pixel layout of a rendered raster: content area inside a margin, y
/// flipped so geographic north is pixel row 0, x corrected for latitude
#[derive(Debug, Clone, Copy)]
pub struct CanvasLayout {
    pub width_px: u32,
    pub height_px: u32,
    pub margin_px: u32,
    //degrees of geography per pixel
    pub deg_per_px_x: f64,
    pub deg_per_px_y: f64,
    //geographic coordinate of the top-left pixel corner
    pub origin_x: f64,
    pub origin_y: f64,
}

impl CanvasLayout {
    /// Sizes the canvas so the bounds fill the area inside the margin.
    /// Height, when not forced, follows the metric aspect ratio (x degrees
    /// shrink by cos of the center latitude).
    pub fn compute(bounds: &Rect<f64>, options: &RasterOptions) -> CanvasLayout {
        let margin = options.margin_px;
        let content_w = (options.width_px.saturating_sub(2 * margin)).max(16);

        let center_lat = (bounds.min().y + bounds.max().y) / 2.0;
        let meters_w = bounds.width() * center_lat.to_radians().cos();
        let meters_h = bounds.height();

        let content_h = if options.height_px > 0 {
            (options.height_px.saturating_sub(2 * margin)).max(16)
        } else {
            ((content_w as f64 * meters_h / meters_w).round() as u32).max(16)
        };

        let deg_per_px_x = bounds.width() / content_w as f64;
        let deg_per_px_y = bounds.height() / content_h as f64;

        CanvasLayout {
            width_px: content_w + 2 * margin,
            height_px: content_h + 2 * margin,
            margin_px: margin,
            deg_per_px_x,
            deg_per_px_y,
            origin_x: bounds.min().x - margin as f64 * deg_per_px_x,
            origin_y: bounds.max().y + margin as f64 * deg_per_px_y,
        }
    }

    #[inline]
    pub fn geo_to_px(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.deg_per_px_x,
            (self.origin_y - y) / self.deg_per_px_y,
        )
    }

    /// Geotransform of the produced raster for georeferenced outputs
    pub fn geotransform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.deg_per_px_x,
            0.0,
            self.origin_y,
            0.0,
            -self.deg_per_px_y,
        ]
    }
}

/// Rasterizes the layer stack onto a fresh canvas.  Fill colors map the
/// layer elevation through the configured scheme over the global domain
/// [min_elev, max_elev]; Monochrome mode skips fills entirely.
pub fn render_layers(
    layers: &[ContourLayer],
    layout: &CanvasLayout,
    options: &RasterOptions,
    min_elev: f64,
    max_elev: f64,
) -> Canvas {
    let mut canvas = Canvas::new(layout.width_px, layout.height_px, options.background_color);

    for layer in layers {
        let fill = match options.render_mode {
            RenderMode::Monochrome => None,
            RenderMode::Grayscale => Some(map_elevation_color(
                crate::config::ColorScheme::Grayscale,
                layer.elevation,
                min_elev,
                max_elev,
                options.elevation_bands,
                options.custom_color_low,
                options.custom_color_high,
            )),
            RenderMode::FullColor => Some(map_elevation_color(
                options.color_scheme,
                layer.elevation,
                min_elev,
                max_elev,
                options.elevation_bands,
                options.custom_color_low,
                options.custom_color_high,
            )),
        };

        if let Some(rgb) = fill {
            let rgba = [rgb[0], rgb[1], rgb[2], 255];
            for polygon in layer.polygons.iter() {
                fill_polygon(&mut canvas, layout, polygon, rgba);
            }
        }

        if options.add_terrain_outline {
            for polygon in layer.polygons.iter() {
                stroke_ring(
                    &mut canvas,
                    layout,
                    polygon.exterior(),
                    options.outline_color,
                    options.outline_width_px,
                );
            }
        }
    }

    debug!(
        "rendered {} layers onto {}x{} canvas",
        layers.len(),
        layout.width_px,
        layout.height_px
    );

    canvas
}

/// Scanline even-odd fill across the exterior and all hole rings, so holes
/// come out unfilled
pub fn fill_polygon(canvas: &mut Canvas, layout: &CanvasLayout, polygon: &Polygon<f64>, color: [u8; 4]) {
    //edges in pixel space
    let mut edges: Vec<(f64, f64, f64, f64)> = Vec::new();

    let mut push_ring = |ring: &geo::LineString<f64>| {
        for w in ring.0.windows(2) {
            let (x0, y0) = layout.geo_to_px(w[0].x, w[0].y);
            let (x1, y1) = layout.geo_to_px(w[1].x, w[1].y);
            if y0 != y1 {
                edges.push((x0, y0, x1, y1));
            }
        }
    };

    push_ring(polygon.exterior());
    for hole in polygon.interiors() {
        push_ring(hole);
    }

    if edges.is_empty() {
        return;
    }

    let min_y = edges
        .iter()
        .map(|e| e.1.min(e.3))
        .fold(f64::INFINITY, f64::min)
        .floor()
        .max(0.0) as i32;
    let max_y = edges
        .iter()
        .map(|e| e.1.max(e.3))
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil()
        .min(canvas.height as f64) as i32;

    for py in min_y..max_y {
        let scan_y = py as f64 + 0.5;

        let mut crossings: Vec<f64> = edges
            .iter()
            .filter_map(|&(x0, y0, x1, y1)| {
                //half-open rule keeps shared vertices from double counting
                let (lo, hi, xa, ya, xb, yb) = if y0 < y1 {
                    (y0, y1, x0, y0, x1, y1)
                } else {
                    (y1, y0, x1, y1, x0, y0)
                };

                if scan_y >= lo && scan_y < hi {
                    let t = (scan_y - ya) / (yb - ya);
                    Some(xa + t * (xb - xa))
                } else {
                    None
                }
            })
            .collect();

        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap());

        for pair in crossings.chunks_exact(2) {
            let x_start = pair[0].ceil().max(0.0) as i32;
            let x_end = pair[1].floor().min(canvas.width as f64 - 1.0) as i32;

            for px in x_start..=x_end {
                canvas.set_pixel(px, py, color);
            }
        }
    }
}

pub fn stroke_ring(
    canvas: &mut Canvas,
    layout: &CanvasLayout,
    ring: &geo::LineString<f64>,
    color: [u8; 4],
    width_px: f64,
) {
    for w in ring.0.windows(2) {
        let (x0, y0) = layout.geo_to_px(w[0].x, w[0].y);
        let (x1, y1) = layout.geo_to_px(w[1].x, w[1].y);

        draw_thick_line(
            canvas,
            x0.round() as i32,
            y0.round() as i32,
            x1.round() as i32,
            y1.round() as i32,
            width_px,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString};

    fn options() -> RasterOptions {
        RasterOptions {
            width_px: 100,
            height_px: 0,
            margin_px: 10,
            add_terrain_outline: false,
            ..RasterOptions::default()
        }
    }

    fn bounds() -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.01, y: 0.01 })
    }

    #[test]
    fn test_layout_dimensions() {
        let layout = CanvasLayout::compute(&bounds(), &options());

        assert_eq!(layout.width_px, 100);
        //square bounds at the equator stay square
        assert_eq!(layout.height_px, 100);
        assert_eq!(layout.margin_px, 10);
    }

    #[test]
    fn test_layout_aspect_at_latitude() {
        let high_lat = Rect::new(Coord { x: 0.0, y: 59.99 }, Coord { x: 0.01, y: 60.0 });
        let layout = CanvasLayout::compute(&high_lat, &options());

        //at 60 degrees north a degree of longitude is half as wide, so the
        //square degree block renders twice as tall as wide
        let content_w = layout.width_px - 2 * layout.margin_px;
        let content_h = layout.height_px - 2 * layout.margin_px;
        assert!((content_h as f64 / content_w as f64 - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_geo_to_px_corners() {
        let layout = CanvasLayout::compute(&bounds(), &options());

        //north west corner of the bounds sits at the margin
        let (px, py) = layout.geo_to_px(0.0, 0.01);
        assert!((px - 10.0).abs() < 1e-9);
        assert!((py - 10.0).abs() < 1e-9);

        //south east corner at the opposite margin
        let (px, py) = layout.geo_to_px(0.01, 0.0);
        assert!((px - 90.0).abs() < 1e-9);
        assert!((py - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_respects_holes() {
        let layout = CanvasLayout::compute(&bounds(), &options());
        let mut canvas = Canvas::new(layout.width_px, layout.height_px, [255, 255, 255, 255]);

        let poly = Polygon::new(
            LineString::from(vec![
                (0.001, 0.001),
                (0.009, 0.001),
                (0.009, 0.009),
                (0.001, 0.009),
                (0.001, 0.001),
            ]),
            vec![LineString::from(vec![
                (0.004, 0.004),
                (0.004, 0.006),
                (0.006, 0.006),
                (0.006, 0.004),
                (0.004, 0.004),
            ])],
        );

        fill_polygon(&mut canvas, &layout, &poly, [255, 0, 0, 255]);

        //center of the hole stays background
        let (hx, hy) = layout.geo_to_px(0.005, 0.005);
        assert_eq!(canvas.pixel(hx as u32, hy as u32), [255, 255, 255, 255]);

        //ring area between hole and exterior is filled
        let (fx, fy) = layout.geo_to_px(0.002, 0.005);
        assert_eq!(canvas.pixel(fx as u32, fy as u32), [255, 0, 0, 255]);

        //outside stays background
        assert_eq!(canvas.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_monochrome_no_fill() {
        let layout = CanvasLayout::compute(&bounds(), &options());

        let mut opts = options();
        opts.render_mode = RenderMode::Monochrome;

        let layer = ContourLayer::new(
            100.0,
            0,
            vec![Polygon::new(
                LineString::from(vec![
                    (0.002, 0.002),
                    (0.008, 0.002),
                    (0.008, 0.008),
                    (0.002, 0.008),
                    (0.002, 0.002),
                ]),
                vec![],
            )],
        );

        let canvas = render_layers(&[layer], &layout, &opts, 0.0, 300.0);

        let (cx, cy) = layout.geo_to_px(0.005, 0.005);
        assert_eq!(canvas.pixel(cx as u32, cy as u32), [255, 255, 255, 255]);
    }

    #[test]
    fn test_geotransform_round_trip() {
        let layout = CanvasLayout::compute(&bounds(), &options());
        let gt = layout.geotransform();

        //pixel (margin, margin) maps back to the north west corner
        let x = gt[0] + 10.0 * gt[1];
        let y = gt[3] + 10.0 * gt[5];
        assert!((x - 0.0).abs() < 1e-9);
        assert!((y - 0.01).abs() < 1e-9);
    }
}
