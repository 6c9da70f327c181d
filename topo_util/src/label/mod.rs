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
use geo::{Coord, Polygon, Rect};

mod fitter;
mod path;
mod pattern;

pub use fitter::*;
pub use path::*;
pub use pattern::*;

use crate::config::LabelOptions;

//breathing room between a label and the content edge
const PLACEMENT_PAD_MM: f64 = 2.0;

/// Everything the renderer needs to place labels for one layer.  The next
/// layer's polygons come in by reference, already in output millimeters,
/// which keeps the label subsystem free of any dependency on the layer
/// stack itself.
pub struct LabelContext<'a> {
    pub layer_number: u32,
    pub pattern: PatternContext,
    /// Visible region in output mm, not covered by the next layer
    pub content_bbox: Rect<f64>,
    /// Region the next layer will cover, in output mm
    pub hidden_bbox: Option<Rect<f64>>,
    pub next_layer_polygons: Option<&'a [Polygon<f64>]>,
}

/// A label ready for an emitter
#[derive(Debug, Clone)]
pub struct PlacedLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_mm: f64,
    pub color: String,
    pub anchor: TextAnchor,
    pub is_hidden: bool,

    pub was_bent: bool,
    pub was_scaled: bool,
    pub was_split: bool,
    pub was_truncated: bool,
    pub warning: String,

    pub split_parts: Vec<String>,
    pub split_positions: Vec<(f64, f64)>,

    /// Curved rendering data when the label follows a polygon contour
    pub curved: Option<CurvedLabel>,
}

#[derive(Debug, Clone)]
pub struct CurvedLabel {
    pub path: TextPath,
    pub char_placements: Vec<(Coord<f64>, f64)>,
    pub svg_path_id: String,
}

/// Pattern substitution plus placement and fitting for one layer's labels
pub struct LabelRenderer<'a> {
    options: &'a LabelOptions,
}

impl<'a> LabelRenderer<'a> {
    pub fn new(options: &'a LabelOptions) -> Self {
        LabelRenderer { options }
    }

    pub fn generate_labels(&self, ctx: &LabelContext) -> Vec<PlacedLabel> {
        let is_base = ctx.layer_number <= 1;

        let (visible_template, hidden_template) = if is_base {
            (
                &self.options.base_label_visible,
                &self.options.base_label_hidden,
            )
        } else {
            (
                &self.options.layer_label_visible,
                &self.options.layer_label_hidden,
            )
        };

        let font = if is_base {
            self.options.base_font_size_mm
        } else {
            self.options.layer_font_size_mm
        };

        let mut labels = Vec::new();

        if !visible_template.is_empty() {
            labels.push(self.place_visible(visible_template, ctx, is_base, font));
        }

        if !hidden_template.is_empty() {
            if let Some(label) = self.place_hidden(hidden_template, ctx, font) {
                labels.push(label);
            }
        }

        labels
    }

    /// Visible labels anchor to a corner of the uncovered region: base
    /// layer lower-left, upper layers lower-right
    fn place_visible(
        &self,
        template: &str,
        ctx: &LabelContext,
        is_base: bool,
        font: f64,
    ) -> PlacedLabel {
        let text = substitute_patterns(template, &ctx.pattern);
        let bbox = ctx.content_bbox;

        //page space runs y-down, the lower corners are at max y
        let (x, anchor) = if is_base {
            (bbox.min().x + PLACEMENT_PAD_MM, TextAnchor::Start)
        } else {
            (bbox.max().x - PLACEMENT_PAD_MM, TextAnchor::End)
        };
        let y = bbox.max().y - PLACEMENT_PAD_MM;

        let fitter = TextFitter::new(self.options);
        let fitted = fitter.fit_text(&text, x, y, font, &bbox, anchor);

        self.to_label(fitted, &self.options.visible_label_color, anchor, false)
    }

    /// Hidden labels center in the area the next layer covers.  When the
    /// next layer geometry is available and the straight text does not fit,
    /// the label follows an inset contour of that geometry instead.
    fn place_hidden(&self, template: &str, ctx: &LabelContext, font: f64) -> Option<PlacedLabel> {
        let text = substitute_patterns(template, &ctx.pattern);
        let bbox = ctx.hidden_bbox?;

        let x = (bbox.min().x + bbox.max().x) / 2.0;
        let y = (bbox.min().y + bbox.max().y) / 2.0 + font / 2.0;

        let fitter = TextFitter::new(self.options);

        let fits_straight = fitter.check_fit(&text, x, y, font, 0.0, &bbox, TextAnchor::Middle);

        if !fits_straight && self.options.enable_curved_text {
            if let Some(polygons) = ctx.next_layer_polygons {
                let generator = TextPathGenerator::new(self.options);
                let text_width = fitter.estimate_text_width(&text, font);

                if let Some(path) = generator.generate_path_from_polygons(
                    polygons,
                    text_width,
                    font,
                    Coord { x, y },
                ) {
                    let char_placements = path.char_placements(text.chars().count());
                    let svg_path_id = format!("textpath-layer{:02}", ctx.layer_number);

                    let mut label =
                        self.to_label_plain(&text, x, y, font, TextAnchor::Middle, true);
                    label.curved = Some(CurvedLabel {
                        path,
                        char_placements,
                        svg_path_id,
                    });
                    return Some(label);
                }
            }
        }

        let fitted = fitter.fit_text(&text, x, y, font, &bbox, TextAnchor::Middle);
        Some(self.to_label(fitted, &self.options.hidden_label_color, TextAnchor::Middle, true))
    }

    fn to_label(
        &self,
        fitted: FittedText,
        color: &str,
        anchor: TextAnchor,
        is_hidden: bool,
    ) -> PlacedLabel {
        PlacedLabel {
            text: fitted.text,
            x: fitted.x,
            y: fitted.y,
            font_size_mm: fitted.font_size_mm,
            color: color.to_string(),
            anchor,
            is_hidden,
            was_bent: fitted.was_bent,
            was_scaled: fitted.was_scaled,
            was_split: fitted.was_split,
            was_truncated: fitted.was_truncated,
            warning: fitted.warning,
            split_parts: fitted.split_parts,
            split_positions: fitted.split_positions,
            curved: None,
        }
    }

    fn to_label_plain(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font: f64,
        anchor: TextAnchor,
        is_hidden: bool,
    ) -> PlacedLabel {
        PlacedLabel {
            text: text.to_string(),
            x,
            y,
            font_size_mm: font,
            color: self.options.hidden_label_color.clone(),
            anchor,
            is_hidden,
            was_bent: false,
            was_scaled: false,
            was_split: false,
            was_truncated: false,
            warning: String::new(),
            split_parts: Vec::new(),
            split_positions: Vec::new(),
            curved: None,
        }
    }
}
