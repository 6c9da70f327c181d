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
use log::debug;

use crate::config::{ContourStrategy, TopographicConfig};
use crate::error::{TopoError, TopoResult};

/// Chooses the ordered contour levels for the given elevation range.
///
/// Levels are the lower boundary of each band.  num_layers wins over the
/// interval when both are configured.  A degenerate range collapses to a
/// single layer at min_elev.
pub fn plan_levels(
    config: &TopographicConfig,
    min_elev: f64,
    max_elev: f64,
) -> TopoResult<Vec<f64>> {
    if !min_elev.is_finite() || !max_elev.is_finite() {
        return Err(TopoError::NoElevationData);
    }

    let mut levels = match config.strategy {
        ContourStrategy::Explicit => {
            let mut v = config.explicit_levels.clone();
            v.sort_by(|a, b| a.partial_cmp(b).unwrap());
            v.dedup();
            v
        }
        _ => {
            if max_elev <= min_elev {
                debug!(
                    "degenerate elevation range [{}, {}], single layer",
                    min_elev, max_elev
                );
                vec![min_elev]
            } else if config.num_layers > 0 {
                uniform_levels(min_elev, max_elev, config.num_layers)
            } else {
                interval_levels(min_elev, max_elev, config.contour_interval)?
            }
        }
    };

    //optional band filters
    if let Some(lo) = config.min_elevation {
        levels.retain(|&l| l >= lo);
    }
    if let Some(hi) = config.max_elevation {
        levels.retain(|&l| l <= hi);
    }

    if config.elevation_threshold > 0.0 {
        let t = config.elevation_threshold;
        levels.retain(|&l| l - min_elev >= t && max_elev - l >= t);
    }

    if levels.is_empty() {
        return Err(TopoError::Configuration(format!(
            "no contour levels remain in [{}, {}] after filtering",
            min_elev, max_elev
        )));
    }

    debug!(
        "planned {} levels from {:.1} to {:.1}",
        levels.len(),
        levels[0],
        levels[levels.len() - 1]
    );

    Ok(levels)
}

fn uniform_levels(min_elev: f64, max_elev: f64, num_layers: u32) -> Vec<f64> {
    let band = (max_elev - min_elev) / num_layers as f64;

    (0..num_layers)
        .map(|i| min_elev + band * i as f64)
        .collect()
}

fn interval_levels(min_elev: f64, max_elev: f64, interval: f64) -> TopoResult<Vec<f64>> {
    if interval <= 0.0 {
        return Err(TopoError::Configuration(format!(
            "contour interval must be positive, got {}",
            interval
        )));
    }

    //first level is the smallest multiple of the interval at or above min
    let first = (min_elev / interval).ceil() * interval;

    let mut levels = Vec::new();
    let mut level = first;
    while level <= max_elev {
        levels.push(level);
        level += interval;
    }

    Ok(levels)
}
