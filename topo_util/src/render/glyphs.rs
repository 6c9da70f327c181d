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
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, warn};
use rusttype::{point, Font, Scale};

use crate::label::TextAnchor;
use crate::render::Canvas;

//tried in order when no face is configured
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loaded TrueType face.  Loading is done once per process and shared, the
/// face itself is immutable after that.
pub struct GlyphRenderer {
    font: Font<'static>,
    source: PathBuf,
}

static SHARED: OnceLock<Mutex<Option<Arc<GlyphRenderer>>>> = OnceLock::new();

impl GlyphRenderer {
    /// Process-wide face, loaded lazily from the configured path or the
    /// first usable system fallback.  None when no face can be loaded, in
    /// which case callers skip text drawing.
    pub fn shared(font_path: Option<&Path>) -> Option<Arc<GlyphRenderer>> {
        let cell = SHARED.get_or_init(|| Mutex::new(None));
        let mut guard = cell.lock().unwrap();

        if let Some(r) = guard.as_ref() {
            return Some(r.clone());
        }

        let loaded = Self::load(font_path);
        match loaded {
            Some(r) => {
                let arc = Arc::new(r);
                *guard = Some(arc.clone());
                Some(arc)
            }
            None => {
                warn!("no usable TrueType face found, text annotations skipped");
                None
            }
        }
    }

    fn load(font_path: Option<&Path>) -> Option<GlyphRenderer> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(p) = font_path {
            candidates.push(p.to_path_buf());
        }
        candidates.extend(FALLBACK_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            let data = match std::fs::read(&path) {
                Ok(d) => d,
                Err(_) => continue,
            };

            if let Some(font) = Font::try_from_vec(data) {
                debug!("loaded font face from {:?}", path);
                return Some(GlyphRenderer { font, source: path });
            }
        }

        None
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn text_width(&self, text: &str, size_px: f32) -> f32 {
        let scale = Scale::uniform(size_px);

        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Draws a text run with its baseline at (x, y) in pixels
    pub fn draw_text(
        &self,
        canvas: &mut Canvas,
        text: &str,
        x: f32,
        y: f32,
        size_px: f32,
        color: [u8; 4],
        anchor: TextAnchor,
    ) {
        let scale = Scale::uniform(size_px);

        let width = self.text_width(text, size_px);
        let start_x = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - width / 2.0,
            TextAnchor::End => x - width,
        };

        for glyph in self.font.layout(text, scale, point(start_x, y)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    canvas.blend_pixel(
                        bb.min.x + gx as i32,
                        bb.min.y + gy as i32,
                        color,
                        v,
                    );
                });
            }
        }
    }

    /// Draws one character rotated about its baseline origin, used by
    /// curved labels.  Nearest-neighbor placement of the rotated coverage.
    pub fn draw_char_rotated(
        &self,
        canvas: &mut Canvas,
        ch: char,
        x: f32,
        y: f32,
        size_px: f32,
        color: [u8; 4],
        angle_deg: f32,
    ) {
        let scale = Scale::uniform(size_px);
        let mut buf = [0u8; 4];
        let text: &str = ch.encode_utf8(&mut buf);

        let rad = angle_deg.to_radians();
        let (sin, cos) = rad.sin_cos();

        for glyph in self.font.layout(text, scale, point(0.0, 0.0)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    //coverage pixel relative to the baseline origin
                    let rx = (bb.min.x + gx as i32) as f32;
                    let ry = (bb.min.y + gy as i32) as f32;

                    let px = x + rx * cos - ry * sin;
                    let py = y + rx * sin + ry * cos;

                    canvas.blend_pixel(px.round() as i32, py.round() as i32, color, v);
                });
            }
        }
    }
}
