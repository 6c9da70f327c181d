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
use geo::Area;
use rayon::prelude::*;

use crate::error::{Diagnostics, TopoError, TopoResult};
use crate::layers::ContourLayer;
use crate::vector::{
    dedupe_polygon, orient_polygon, punch_nesting_insets, remove_holes, repair_polygon,
    simplify_polygon, smooth_polygon,
};

/// Processing knobs with every tolerance already converted to the
/// coordinate units of the layer stack
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub smoothing_iterations: u32,
    pub simplify_tolerance: f64,
    pub dedupe_tolerance: f64,
    pub min_feature_area: f64,
    /// Features whose mean width falls below this are too thin to cut
    pub min_feature_width: f64,
    pub remove_holes: bool,
    /// Outward lip offset for nesting cavities, None disables punching
    pub inset_offset: Option<f64>,
}

/// Runs the polygon pipeline over every layer: smooth, simplify, dedupe,
/// orient, repair, filter.  Per-polygon work is pure, layers run in
/// parallel.  Fails only when nothing at all survives.
pub fn process_layers(
    layers: &mut Vec<ContourLayer>,
    options: &ProcessOptions,
    diag: &Diagnostics,
) -> TopoResult<()> {
    let before: usize = layers.iter().map(|l| l.polygons.len()).sum();

    layers.par_iter_mut().for_each(|layer| {
        let polygons = std::mem::take(&mut layer.polygons);

        layer.polygons = polygons
            .into_iter()
            .filter_map(|poly| {
                let poly = smooth_polygon(&poly, options.smoothing_iterations);

                let poly = simplify_polygon(&poly, options.simplify_tolerance)?;

                let poly = if options.dedupe_tolerance > 0.0 {
                    dedupe_polygon(&poly, options.dedupe_tolerance)
                } else {
                    poly
                };

                if poly.exterior().0.len() < 4 {
                    return None;
                }

                let poly = orient_polygon(&poly);
                let poly = repair_polygon(poly)?;

                if options.min_feature_area > 0.0
                    && poly.unsigned_area() < options.min_feature_area
                {
                    return None;
                }

                if options.min_feature_width > 0.0 {
                    //mean width of a long feature is area over half the
                    //perimeter
                    let perimeter = crate::vector::ring_length(poly.exterior());
                    if perimeter > 0.0
                        && poly.unsigned_area() / (perimeter / 2.0) < options.min_feature_width
                    {
                        return None;
                    }
                }

                if options.remove_holes {
                    Some(remove_holes(&poly))
                } else {
                    Some(poly)
                }
            })
            .collect();

        layer.recalculate_area();
    });

    let after: usize = layers.iter().map(|l| l.polygons.len()).sum();
    if after < before {
        diag.warn(
            "process",
            format!("{} of {} polygons dropped during cleanup", before - after, before),
        );
    }

    if before > 0 && after == 0 {
        return Err(TopoError::InconsistentGeometry(
            "every polygon of every layer was dropped".to_string(),
        ));
    }

    if let Some(offset) = options.inset_offset {
        let punched = punch_nesting_insets(layers, offset);
        diag.info("process", format!("punched {} nesting cavities", punched));
    }

    Ok(())
}
