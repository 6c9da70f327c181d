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
use crate::config::RasterOptions;
use crate::label::{PlacedLabel, TextAnchor};
use crate::render::{Canvas, GlyphRenderer};

/// Bresenham line widened by stamping a square brush at every step
pub fn draw_thick_line(
    canvas: &mut Canvas,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    width_px: f64,
    color: [u8; 4],
) {
    let half = ((width_px.max(1.0) - 1.0) / 2.0).round() as i32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx + dy;
    let mut x = x0;
    let mut y = y0;

    loop {
        stamp(canvas, x, y, half, color);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn stamp(canvas: &mut Canvas, x: i32, y: i32, half: i32, color: [u8; 4]) {
    for oy in -half..=half {
        for ox in -half..=half {
            canvas.set_pixel(x + ox, y + oy, color);
        }
    }
}

/// Corner crosses for aligning stacked physical layers, offset from each
/// corner by half the margin
pub fn draw_registration_marks(canvas: &mut Canvas, margin_px: u32, color: [u8; 4]) {
    let m = (margin_px / 2) as i32;
    let arm = (margin_px as i32 / 3).max(4);
    let w = canvas.width as i32;
    let h = canvas.height as i32;

    let centers = [(m, m), (w - 1 - m, m), (m, h - 1 - m), (w - 1 - m, h - 1 - m)];

    for (cx, cy) in centers {
        draw_thick_line(canvas, cx - arm, cy, cx + arm, cy, 1.0, color);
        draw_thick_line(canvas, cx, cy - arm, cx, cy + arm, 1.0, color);
    }
}

/// Rectangle stroke just inside the margin
pub fn draw_border(canvas: &mut Canvas, margin_px: u32, color: [u8; 4], width_px: f64) {
    let m = margin_px as i32;
    let w = canvas.width as i32;
    let h = canvas.height as i32;

    draw_thick_line(canvas, m, m, w - 1 - m, m, width_px, color);
    draw_thick_line(canvas, w - 1 - m, m, w - 1 - m, h - 1 - m, width_px, color);
    draw_thick_line(canvas, w - 1 - m, h - 1 - m, m, h - 1 - m, width_px, color);
    draw_thick_line(canvas, m, h - 1 - m, m, m, width_px, color);
}

fn parse_hex_color(hex: &str) -> [u8; 4] {
    let s = hex.trim_start_matches('#');
    if s.len() != 6 {
        return [0, 0, 0, 255];
    }

    let parse = |r: &str| u8::from_str_radix(r, 16).unwrap_or(0);
    [parse(&s[0..2]), parse(&s[2..4]), parse(&s[4..6]), 255]
}

/// Blits placed labels onto the canvas.  `px_per_mm` converts label
/// millimeters to pixels; curved labels draw character by character with
/// their sampled rotations.  A missing font face skips drawing silently,
/// the caller has already logged the warning.
pub fn draw_labels(
    canvas: &mut Canvas,
    labels: &[PlacedLabel],
    options: &RasterOptions,
    px_per_mm: f64,
) {
    let renderer = match GlyphRenderer::shared(options.font_path.as_deref()) {
        Some(r) => r,
        None => return,
    };

    for label in labels {
        let color = parse_hex_color(&label.color);
        let size_px = (label.font_size_mm * px_per_mm) as f32;

        if let Some(curved) = &label.curved {
            for (ch, (pos, angle)) in label.text.chars().zip(curved.char_placements.iter()) {
                renderer.draw_char_rotated(
                    canvas,
                    ch,
                    (pos.x * px_per_mm) as f32,
                    (pos.y * px_per_mm) as f32,
                    size_px,
                    color,
                    *angle as f32,
                );
            }
            continue;
        }

        if label.was_split {
            for (part, (px, py)) in label.split_parts.iter().zip(label.split_positions.iter()) {
                renderer.draw_text(
                    canvas,
                    part,
                    (px * px_per_mm) as f32,
                    (py * px_per_mm) as f32,
                    size_px,
                    color,
                    label.anchor,
                );
            }
            continue;
        }

        renderer.draw_text(
            canvas,
            &label.text,
            (label.x * px_per_mm) as f32,
            (label.y * px_per_mm) as f32,
            size_px,
            color,
            label.anchor,
        );
    }
}

/// Convenience used by emitters that draw a one-off annotation string
pub fn draw_plain_text(
    canvas: &mut Canvas,
    text: &str,
    x_px: f32,
    y_px: f32,
    size_px: f32,
    color: [u8; 4],
    anchor: TextAnchor,
    font_path: Option<&std::path::Path>,
) {
    if let Some(renderer) = GlyphRenderer::shared(font_path) {
        renderer.draw_text(canvas, text, x_px, y_px, size_px, color, anchor);
    }
}
