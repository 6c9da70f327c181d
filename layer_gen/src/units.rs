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
use anyhow::{anyhow, bail, Result};

//meters per unit
const UNITS: &[(&str, f64)] = &[
    ("km", 1000.0),
    ("mm", 0.001),
    ("mi", 1609.344),
    ("ft", 0.3048),
    ("in", 0.0254),
    ("m", 1.0),
];

/// Parses a distance with an optional unit suffix into meters.  A bare
/// number takes `default_unit`.
pub fn parse_distance_m(input: &str, default_unit: &str) -> Result<f64> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty distance value");
    }

    for (suffix, factor) in UNITS {
        if let Some(number) = s.strip_suffix(suffix) {
            let v: f64 = number
                .trim()
                .parse()
                .map_err(|_| anyhow!("bad distance value '{}'", input))?;
            return Ok(v * factor);
        }
    }

    let v: f64 = s
        .parse()
        .map_err(|_| anyhow!("bad distance value '{}'", input))?;

    let factor = UNITS
        .iter()
        .find(|(u, _)| *u == default_unit)
        .map(|(_, f)| *f)
        .ok_or_else(|| anyhow!("unknown default unit '{}'", default_unit))?;

    Ok(v * factor)
}

/// Distance in output millimeters, bare numbers are mm
pub fn parse_distance_mm(input: &str) -> Result<f64> {
    Ok(parse_distance_m(input, "mm")? * 1000.0)
}

/// One coordinate, decimal degrees or DMS.  Accepted DMS forms:
/// `63°07'29"N`, `63d07m29sN`, with decimal seconds and any of NSEW.
pub fn parse_coordinate(input: &str) -> Result<f64> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty coordinate");
    }

    //hemisphere letter decides the sign and marks DMS intent
    let (body, hemi_sign) = match s.chars().last().unwrap().to_ascii_uppercase() {
        'N' | 'E' => (&s[..s.len() - 1], Some(1.0)),
        'S' | 'W' => (&s[..s.len() - 1], Some(-1.0)),
        _ => (s, None),
    };
    let body = body.trim();

    let has_dms = body.contains('\u{00b0}') || body.contains('d') || body.contains('\'');

    if !has_dms {
        let v: f64 = body
            .parse()
            .map_err(|_| anyhow!("bad coordinate '{}'", input))?;
        return Ok(v * hemi_sign.unwrap_or(1.0));
    }

    //split on the degree, minute and second markers
    let body = body
        .replace('\u{00b0}', " ")
        .replace(&['d', '\'', 'm'][..], " ")
        .replace(&['"', 's'][..], " ");

    let parts: Vec<&str> = body.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        bail!("bad DMS coordinate '{}'", input);
    }

    let degrees: f64 = parts[0]
        .parse()
        .map_err(|_| anyhow!("bad degrees in '{}'", input))?;
    let minutes: f64 = match parts.get(1) {
        Some(p) => p.parse().map_err(|_| anyhow!("bad minutes in '{}'", input))?,
        None => 0.0,
    };
    let seconds: f64 = match parts.get(2) {
        Some(p) => p.parse().map_err(|_| anyhow!("bad seconds in '{}'", input))?,
        None => 0.0,
    };

    if minutes < 0.0 || minutes >= 60.0 || seconds < 0.0 || seconds >= 60.0 {
        bail!("minutes/seconds out of range in '{}'", input);
    }

    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    let sign = if degrees < 0.0 { -1.0 } else { 1.0 };

    Ok(magnitude * sign * hemi_sign.unwrap_or(1.0))
}

/// `lat,lon` pair, each side decimal or DMS
pub fn parse_lat_lon(input: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != 2 {
        bail!("expected lat,lon but got '{}'", input);
    }

    let lat = parse_coordinate(parts[0])?;
    let lon = parse_coordinate(parts[1])?;

    if lat.abs() > 90.0 {
        bail!("latitude {} out of range", lat);
    }
    if lon.abs() > 180.0 {
        bail!("longitude {} out of range", lon);
    }

    Ok((lat, lon))
}
