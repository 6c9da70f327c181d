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
use geo::{Coord, Rect};

use crate::config::LabelOptions;

//width of an average glyph as a fraction of the font size
const CHAR_WIDTH_RATIO: f64 = 0.6;
const MARGIN_MM: f64 = 0.5;
const LINE_SPACING: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// Output of the staged fit: possibly modified text plus what was done to it
#[derive(Debug, Clone)]
pub struct FittedText {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_mm: f64,
    pub bend_angle_deg: f64,
    pub split_parts: Vec<String>,
    pub split_positions: Vec<(f64, f64)>,

    pub was_bent: bool,
    pub was_scaled: bool,
    pub was_split: bool,
    pub was_truncated: bool,

    pub warning: String,
}

impl FittedText {
    fn plain(text: &str, x: f64, y: f64, font_size_mm: f64) -> Self {
        FittedText {
            text: text.to_string(),
            x,
            y,
            font_size_mm,
            bend_angle_deg: 0.0,
            split_parts: Vec::new(),
            split_positions: Vec::new(),
            was_bent: false,
            was_scaled: false,
            was_split: false,
            was_truncated: false,
            warning: String::new(),
        }
    }
}

/// Staged text fitting: straight, bend, scale, split, truncate.  Stages are
/// tried in order and the first one that fits wins.
pub struct TextFitter<'a> {
    options: &'a LabelOptions,
}

impl<'a> TextFitter<'a> {
    pub fn new(options: &'a LabelOptions) -> Self {
        TextFitter { options }
    }

    pub fn estimate_text_width(&self, text: &str, font_size_mm: f64) -> f64 {
        text.chars().count() as f64 * CHAR_WIDTH_RATIO * font_size_mm
    }

    pub fn estimate_text_bbox(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        bend_angle_deg: f64,
        anchor: TextAnchor,
    ) -> Rect<f64> {
        let w = self.estimate_text_width(text, font_size_mm);

        //a bent baseline pulls the ends in and bulges vertically
        let (w, extra_h) = if bend_angle_deg > 0.0 {
            let half = bend_angle_deg.to_radians() / 2.0;
            let chord = w * half.sin() / half.max(1e-9);
            let radius = w / bend_angle_deg.to_radians().max(1e-9);
            let sagitta = radius * (1.0 - half.cos());
            (chord, sagitta)
        } else {
            (w, 0.0)
        };

        let left = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - w / 2.0,
            TextAnchor::End => x - w,
        };

        Rect::new(
            Coord {
                x: left - MARGIN_MM,
                y: y - font_size_mm - extra_h - MARGIN_MM,
            },
            Coord {
                x: left + w + MARGIN_MM,
                y: y + MARGIN_MM,
            },
        )
    }

    pub fn check_fit(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        bend_angle_deg: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> bool {
        let bbox = self.estimate_text_bbox(text, x, y, font_size_mm, bend_angle_deg, anchor);

        bbox.min().x >= available.min().x
            && bbox.max().x <= available.max().x
            && bbox.min().y >= available.min().y
            && bbox.max().y <= available.max().y
    }

    pub fn fit_text(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> FittedText {
        //stage 1: straight
        if self.check_fit(text, x, y, font_size_mm, 0.0, available, anchor) {
            return FittedText::plain(text, x, y, font_size_mm);
        }

        //stage 2: bend
        if let Some(fitted) = self.try_bend(text, x, y, font_size_mm, available, anchor) {
            return fitted;
        }

        //stage 3: scale down
        if let Some(fitted) = self.try_scale(text, x, y, font_size_mm, available, anchor) {
            return fitted;
        }

        //stage 4: split into stacked parts
        if let Some(fitted) = self.try_split(text, x, y, font_size_mm, available, anchor) {
            return fitted;
        }

        //stage 5: truncate
        self.truncate(text, x, y, font_size_mm, available, anchor)
    }

    fn try_bend(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> Option<FittedText> {
        let max_bend = self.options.max_bend_angle_deg;
        if max_bend <= 0.0 {
            return None;
        }

        let mut angle = 5.0;
        while angle <= max_bend {
            if self.check_fit(text, x, y, font_size_mm, angle, available, anchor) {
                let mut fitted = FittedText::plain(text, x, y, font_size_mm);
                fitted.bend_angle_deg = angle;
                fitted.was_bent = true;
                fitted.warning = format!("text bent {} degrees to fit", angle);
                return Some(fitted);
            }
            angle += 5.0;
        }

        None
    }

    fn try_scale(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> Option<FittedText> {
        let floor = (font_size_mm * self.options.min_scale_factor)
            .max(self.options.min_legible_size_mm);

        let mut size = font_size_mm * 0.9;
        while size >= floor {
            if self.check_fit(text, x, y, size, 0.0, available, anchor) {
                let mut fitted = FittedText::plain(text, x, y, size);
                fitted.was_scaled = true;
                fitted.warning = format!(
                    "font scaled from {:.1}mm to {:.1}mm to fit",
                    font_size_mm, size
                );
                return Some(fitted);
            }
            size -= font_size_mm * 0.05;
        }

        None
    }

    fn try_split(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> Option<FittedText> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < 2 {
            return None;
        }

        for parts in 2..=self.options.max_split_parts.max(2) {
            if parts > words.len() {
                break;
            }

            let lines = split_words(&words, parts);

            let line_h = font_size_mm * LINE_SPACING;
            let total_h = line_h * lines.len() as f64;

            let all_fit = lines.iter().enumerate().all(|(i, line)| {
                let ly = y - total_h + line_h * (i + 1) as f64;
                self.check_fit(line, x, ly, font_size_mm, 0.0, available, anchor)
            });

            if all_fit {
                let mut fitted = FittedText::plain(text, x, y, font_size_mm);
                fitted.split_positions = lines
                    .iter()
                    .enumerate()
                    .map(|(i, _)| (x, y - total_h + line_h * (i + 1) as f64))
                    .collect();
                fitted.split_parts = lines;
                fitted.was_split = true;
                fitted.warning = format!("text split into {} lines to fit", parts);
                return Some(fitted);
            }
        }

        None
    }

    fn truncate(
        &self,
        text: &str,
        x: f64,
        y: f64,
        font_size_mm: f64,
        available: &Rect<f64>,
        anchor: TextAnchor,
    ) -> FittedText {
        let char_w = CHAR_WIDTH_RATIO * font_size_mm;
        let usable = (available.width() - 2.0 * MARGIN_MM).max(0.0);
        let max_chars = (usable / char_w).floor() as usize;

        let truncated = if max_chars > 1 {
            let kept: String = text.chars().take(max_chars - 1).collect();
            format!("{}\u{2026}", kept)
        } else {
            "\u{2026}".to_string()
        };

        let mut fitted = FittedText::plain(&truncated, x, y, font_size_mm);
        fitted.was_truncated = true;
        fitted.warning = format!(
            "text truncated from {} to {} characters",
            text.chars().count(),
            fitted.text.chars().count()
        );
        fitted
    }
}

fn split_words(words: &[&str], parts: usize) -> Vec<String> {
    let per_line = (words.len() as f64 / parts as f64).ceil() as usize;

    words
        .chunks(per_line.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> LabelOptions {
        LabelOptions::default()
    }

    fn bbox(w: f64, h: f64) -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: w, y: h })
    }

    #[test]
    fn test_straight_fit() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        //5 chars * 0.6 * 3mm = 9mm wide
        let f = fitter.fit_text("hello", 2.0, 8.0, 3.0, &bbox(50.0, 10.0), TextAnchor::Start);

        assert!(!f.was_bent && !f.was_scaled && !f.was_split && !f.was_truncated);
        assert_eq!(f.text, "hello");
        assert_eq!(f.font_size_mm, 3.0);
    }

    #[test]
    fn test_scale_stage() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        //20 chars * 0.6 * 4mm = 48mm, box only 40mm wide
        let f = fitter.fit_text(
            "abcdefghijklmnopqrst",
            1.0,
            8.0,
            4.0,
            &bbox(40.0, 10.0),
            TextAnchor::Start,
        );

        assert!(f.was_scaled);
        assert!(f.font_size_mm < 4.0);
        assert!(f.font_size_mm >= 4.0 * opts.min_scale_factor);
        assert!(!f.warning.is_empty());
    }

    #[test]
    fn test_split_stage() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        //too long even at minimum scale, but three stacked lines fit
        let f = fitter.fit_text(
            "mount mckinley national park reserve",
            1.0,
            20.0,
            4.0,
            &bbox(36.0, 40.0),
            TextAnchor::Start,
        );

        assert!(f.was_split, "warning: {}", f.warning);
        assert!(f.split_parts.len() >= 2);
        assert_eq!(f.split_parts.len(), f.split_positions.len());
    }

    #[test]
    fn test_truncate_stage() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        let f = fitter.fit_text(
            "averyverylongsinglewordlabel",
            0.5,
            3.0,
            3.0,
            &bbox(20.0, 4.5),
            TextAnchor::Start,
        );

        assert!(f.was_truncated);
        assert!(f.text.ends_with('\u{2026}'));
        assert!(f.text.chars().count() < "averyverylongsinglewordlabel".len());
    }

    #[test]
    fn test_truncate_to_ellipsis_only() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        let f = fitter.fit_text("label", 0.1, 1.0, 3.0, &bbox(1.0, 3.0), TextAnchor::Start);

        assert!(f.was_truncated);
        assert_eq!(f.text, "\u{2026}");
    }

    #[test]
    fn test_anchor_math() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        let b = fitter.estimate_text_bbox("xx", 10.0, 5.0, 2.0, 0.0, TextAnchor::Middle);
        //2 chars * 0.6 * 2 = 2.4 wide, centered on 10
        assert!((b.min().x - (10.0 - 1.2 - MARGIN_MM)).abs() < 1e-9);
        assert!((b.max().x - (10.0 + 1.2 + MARGIN_MM)).abs() < 1e-9);
    }

    #[test]
    fn test_bend_reduces_width() {
        let opts = options();
        let fitter = TextFitter::new(&opts);

        let straight = fitter.estimate_text_bbox("0123456789", 0.0, 0.0, 4.0, 0.0, TextAnchor::Start);
        let bent = fitter.estimate_text_bbox("0123456789", 0.0, 0.0, 4.0, 15.0, TextAnchor::Start);

        assert!(bent.width() < straight.width());
        assert!(bent.height() > straight.height());
    }
}
