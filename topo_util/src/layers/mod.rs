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
use geo::{Area, BoundingRect, Polygon, Rect};

mod plan;

pub use plan::*;

/// All polygons at or above one elevation level.  The elevation is the lower
/// bound of the band the layer represents.
#[derive(Debug, Clone)]
pub struct ContourLayer {
    pub elevation: f64,
    /// 1-indexed after planning, 0 is reserved for the base plate
    pub layer_number: u32,
    /// Index into the planned level vector
    pub level_index: usize,
    pub polygons: Vec<Polygon<f64>>,
    /// Total unsigned area, exteriors minus holes
    pub area: f64,
    pub is_closed: bool,
}

impl ContourLayer {
    pub fn new(elevation: f64, level_index: usize, polygons: Vec<Polygon<f64>>) -> Self {
        let mut layer = ContourLayer {
            elevation,
            layer_number: 0,
            level_index,
            polygons,
            area: 0.0,
            is_closed: true,
        };
        layer.recalculate_area();
        layer
    }

    pub fn recalculate_area(&mut self) {
        self.area = self.polygons.iter().map(|p| p.unsigned_area()).sum();
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() || self.area < 1e-12
    }

    /// Bounding rect over every polygon of the layer
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let mut result: Option<Rect<f64>> = None;

        for p in self.polygons.iter() {
            let b = match p.bounding_rect() {
                Some(b) => b,
                None => continue,
            };
            result = Some(match result {
                None => b,
                Some(r) => Rect::new(
                    geo::Coord {
                        x: r.min().x.min(b.min().x),
                        y: r.min().y.min(b.min().y),
                    },
                    geo::Coord {
                        x: r.max().x.max(b.max().x),
                        y: r.max().y.max(b.max().y),
                    },
                ),
            });
        }

        result
    }

    /// Largest polygon by unsigned area, the anchor for nesting and labels
    pub fn largest_polygon(&self) -> Option<&Polygon<f64>> {
        self.polygons
            .iter()
            .max_by(|a, b| a.unsigned_area().partial_cmp(&b.unsigned_area()).unwrap())
    }
}

/// Drops empty layers (unless forced) and hands out 1-indexed layer numbers
/// in increasing elevation order.
pub fn assign_layer_numbers(layers: &mut Vec<ContourLayer>, force_all_layers: bool) {
    if !force_all_layers {
        layers.retain(|l| !l.is_empty());
    }

    for (i, layer) in layers.iter_mut().enumerate() {
        layer.layer_number = (i + 1) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn unit_square(size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (size, 0.0),
                (size, size),
                (0.0, size),
                (0.0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_area_and_empty() {
        let layer = ContourLayer::new(100.0, 0, vec![unit_square(2.0)]);
        assert_eq!(layer.area, 4.0);
        assert!(!layer.is_empty());

        let empty = ContourLayer::new(200.0, 1, vec![]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_assign_numbers_drops_empty() {
        let mut layers = vec![
            ContourLayer::new(0.0, 0, vec![unit_square(4.0)]),
            ContourLayer::new(100.0, 1, vec![]),
            ContourLayer::new(200.0, 2, vec![unit_square(1.0)]),
        ];

        assign_layer_numbers(&mut layers, false);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].layer_number, 1);
        assert_eq!(layers[1].layer_number, 2);
        assert_eq!(layers[1].level_index, 2);
    }

    #[test]
    fn test_assign_numbers_forced() {
        let mut layers = vec![
            ContourLayer::new(0.0, 0, vec![unit_square(4.0)]),
            ContourLayer::new(100.0, 1, vec![]),
        ];

        assign_layer_numbers(&mut layers, true);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].layer_number, 2);
        assert!(layers[1].polygons.is_empty());
    }
}
