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
use geo::Rect;

use crate::config::LabelUnits;

/// Values available to `%{...}` tokens in label templates
#[derive(Debug, Clone)]
pub struct PatternContext {
    pub scale_denominator: f64,
    pub contour_height_m: f64,
    pub layer_number: u32,
    pub elevation_m: f64,
    /// WGS84 degrees
    pub bounds: Rect<f64>,
    pub geo_width_m: f64,
    pub geo_height_m: f64,
    pub substrate_w_mm: f64,
    pub substrate_h_mm: f64,
    pub units: LabelUnits,
}

/// Single pass substitution of `%{identifier}` tokens.  `%%{id}` escapes to
/// the literal `%{id}`, unknown identifiers are left untouched.
pub fn substitute_patterns(template: &str, ctx: &PatternContext) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        //escape: %%{id} becomes the literal %{id}
        if chars[i] == '%' && i + 2 < chars.len() && chars[i + 1] == '%' && chars[i + 2] == '{' {
            out.push('%');
            i += 2;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '}' {
                    break;
                }
                i += 1;
            }
            i += 1;
            continue;
        }

        if chars[i] == '%' && i + 1 < chars.len() && chars[i + 1] == '{' {
            if let Some(close) = chars[i + 2..].iter().position(|&c| c == '}') {
                let ident: String = chars[i + 2..i + 2 + close].iter().collect();

                match expand(&ident, ctx) {
                    Some(value) => out.push_str(&value),
                    //unknown identifier stays literal
                    None => {
                        out.push_str("%{");
                        out.push_str(&ident);
                        out.push('}');
                    }
                }

                i += 2 + close + 1;
                continue;
            }
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn expand(ident: &str, ctx: &PatternContext) -> Option<String> {
    let center_lon = (ctx.bounds.min().x + ctx.bounds.max().x) / 2.0;
    let center_lat = (ctx.bounds.min().y + ctx.bounds.max().y) / 2.0;

    let value = match ident {
        "s" => format!("{}", ctx.scale_denominator.round() as i64),
        "c" => format_land_distance(ctx.contour_height_m, ctx.units),
        "n" => format!("{}", ctx.layer_number),
        "l" => format!("{:02}", ctx.layer_number),
        "e" => format!("{}", ctx.elevation_m.round() as i64),
        "x" => format!("{:.4}", center_lon),
        "y" => format!("{:.4}", center_lat),
        "w" => format_land_distance(ctx.geo_width_m, ctx.units),
        "h" => format_land_distance(ctx.geo_height_m, ctx.units),
        "W" => format_print_distance(ctx.substrate_w_mm, ctx.units),
        "H" => format_print_distance(ctx.substrate_h_mm, ctx.units),
        "C" => format_coordinate(center_lat, center_lon),
        "UL" => format_coordinate(ctx.bounds.max().y, ctx.bounds.min().x),
        "UR" => format_coordinate(ctx.bounds.max().y, ctx.bounds.max().x),
        "LL" => format_coordinate(ctx.bounds.min().y, ctx.bounds.min().x),
        "LR" => format_coordinate(ctx.bounds.min().y, ctx.bounds.max().x),
        _ => return None,
    };

    Some(value)
}

/// Filename patterns know %{b}, %{l}, %{e} and %{n} as an alias of %{l}.
/// Escapes work the same way as in label templates.
pub fn substitute_filename_pattern(
    pattern: &str,
    basename: &str,
    layer_number: u32,
    elevation_m: f64,
) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '%' && i + 2 < chars.len() && chars[i + 1] == '%' && chars[i + 2] == '{' {
            out.push('%');
            i += 2;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '}' {
                    break;
                }
                i += 1;
            }
            i += 1;
            continue;
        }

        if chars[i] == '%' && i + 1 < chars.len() && chars[i + 1] == '{' {
            if let Some(close) = chars[i + 2..].iter().position(|&c| c == '}') {
                let ident: String = chars[i + 2..i + 2 + close].iter().collect();

                let expanded = match ident.as_str() {
                    "b" => Some(basename.to_string()),
                    "l" | "n" => Some(format!("{:02}", layer_number)),
                    "e" => Some(format!("{}", elevation_m.round() as i64)),
                    _ => None,
                };

                match expanded {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("%{");
                        out.push_str(&ident);
                        out.push('}');
                    }
                }

                i += 2 + close + 1;
                continue;
            }
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn format_land_distance(meters: f64, units: LabelUnits) -> String {
    match units {
        LabelUnits::Metric => {
            if meters.abs() >= 1000.0 {
                format!("{:.1}km", meters / 1000.0)
            } else {
                format!("{:.1}m", meters)
            }
        }
        LabelUnits::Imperial => {
            let feet = meters * 3.28084;
            if feet.abs() >= 5280.0 {
                format!("{:.1}mi", feet / 5280.0)
            } else {
                format!("{:.1}ft", feet)
            }
        }
    }
}

fn format_print_distance(mm: f64, units: LabelUnits) -> String {
    match units {
        LabelUnits::Metric => format!("{:.0}mm", mm),
        LabelUnits::Imperial => format!("{:.2}in", mm / 25.4),
    }
}

fn format_coordinate(lat: f64, lon: f64) -> String {
    let (lat_d, lat_m, lat_s) = to_dms(lat.abs());
    let (lon_d, lon_m, lon_s) = to_dms(lon.abs());

    format!(
        "{}\u{00b0}{:02}'{:02.0}\"{} {}\u{00b0}{:02}'{:02.0}\"{}",
        lat_d,
        lat_m,
        lat_s,
        if lat >= 0.0 { 'N' } else { 'S' },
        lon_d,
        lon_m,
        lon_s,
        if lon >= 0.0 { 'E' } else { 'W' },
    )
}

fn to_dms(decimal: f64) -> (i32, i32, f64) {
    let degrees = decimal.trunc() as i32;
    let minutes_f = (decimal - degrees as f64) * 60.0;
    let minutes = minutes_f.trunc() as i32;
    let seconds = (minutes_f - minutes as f64) * 60.0;

    (degrees, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn ctx() -> PatternContext {
        PatternContext {
            scale_denominator: 25000.0,
            contour_height_m: 21.4,
            layer_number: 3,
            elevation_m: 1234.7,
            bounds: Rect::new(
                Coord { x: -151.1, y: 63.0 },
                Coord { x: -151.0, y: 63.1 },
            ),
            geo_width_m: 5230.0,
            geo_height_m: 11130.0,
            substrate_w_mm: 200.0,
            substrate_h_mm: 200.0,
            units: LabelUnits::Metric,
        }
    }

    #[test]
    fn test_simple_tokens() {
        let c = ctx();

        assert_eq!(substitute_patterns("1:%{s}", &c), "1:25000");
        assert_eq!(substitute_patterns("Layer %{n}", &c), "Layer 3");
        assert_eq!(substitute_patterns("%{l}", &c), "03");
        assert_eq!(substitute_patterns("%{e}m", &c), "1235m");
        assert_eq!(substitute_patterns("%{c}", &c), "21.4m");
        assert_eq!(substitute_patterns("%{w} x %{h}", &c), "5.2km x 11.1km");
        assert_eq!(substitute_patterns("%{W}", &c), "200mm");
    }

    #[test]
    fn test_center_coordinates() {
        let c = ctx();
        assert_eq!(substitute_patterns("%{x}", &c), "-151.0500");
        assert_eq!(substitute_patterns("%{y}", &c), "63.0500");
    }

    #[test]
    fn test_escape_yields_literal() {
        let c = ctx();
        assert_eq!(substitute_patterns("%%{s}", &c), "%{s}");
        assert_eq!(substitute_patterns("a %%{c} b", &c), "a %{c} b");
    }

    #[test]
    fn test_unknown_identifier_left_alone() {
        let c = ctx();
        assert_eq!(substitute_patterns("%{zzz}", &c), "%{zzz}");
        assert_eq!(substitute_patterns("50%{", &c), "50%{");
        assert_eq!(substitute_patterns("50%", &c), "50%");
    }

    #[test]
    fn test_imperial_units() {
        let mut c = ctx();
        c.units = LabelUnits::Imperial;

        assert_eq!(substitute_patterns("%{c}", &c), "70.2ft");
        assert_eq!(substitute_patterns("%{W}", &c), "7.87in");
    }

    #[test]
    fn test_corner_coordinates() {
        let c = ctx();
        let ul = substitute_patterns("%{UL}", &c);
        assert!(ul.starts_with("63\u{00b0}06'"), "{}", ul);
        assert!(ul.ends_with('W'), "{}", ul);
    }

    #[test]
    fn test_filename_pattern() {
        let name = substitute_filename_pattern("%{b}-layer%{l}-%{e}m", "denali", 3, 1234.7);
        assert_eq!(name, "denali-layer03-1235m");

        //%{n} aliases %{l}
        let name = substitute_filename_pattern("%{b}_%{n}", "x", 7, 0.0);
        assert_eq!(name, "x_07");
    }

    #[test]
    fn test_filename_distinct_per_layer() {
        let a = substitute_filename_pattern("%{b}-%{l}-%{e}", "t", 1, 100.0);
        let b = substitute_filename_pattern("%{b}-%{l}-%{e}", "t", 2, 200.0);
        assert_ne!(a, b);
    }
}
