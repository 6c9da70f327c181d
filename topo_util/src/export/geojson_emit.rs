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
use std::io::Write;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};

use crate::config::OutputFormat;
use crate::export::{run_emitter, ExportContext, ExportRecord};
use crate::layers::ContourLayer;

pub fn emit_geojson(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    if ctx.config.output_layers {
        for layer in ctx.layers.iter() {
            let path = ctx.layer_path(layer, OutputFormat::GeoJson.extension());

            records.push(run_emitter(
                ctx,
                OutputFormat::GeoJson,
                path,
                Some(layer.layer_number),
                |w| write_feature_collection(w, std::slice::from_ref(layer)),
            ));
        }
    } else {
        let path = ctx.combined_path("", OutputFormat::GeoJson.extension());
        records.push(run_emitter(ctx, OutputFormat::GeoJson, path, None, |w| {
            write_feature_collection(w, ctx.layers)
        }));
    }

    records
}

/// One feature per polygon, coordinates pass through in WGS84 lon/lat
/// exactly as the canonical stack stores them
fn write_feature_collection(w: &mut impl Write, layers: &[ContourLayer]) -> anyhow::Result<()> {
    let mut features = Vec::new();

    for layer in layers {
        for polygon in layer.polygons.iter() {
            let mut properties = JsonObject::new();
            properties.insert(
                "elevation".to_string(),
                JsonValue::from(layer.elevation),
            );
            properties.insert("layer".to_string(), JsonValue::from(layer.layer_number));
            properties.insert("area".to_string(), JsonValue::from(layer.area));

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let json = GeoJson::from(collection).to_string();
    w.write_all(json.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn layer() -> ContourLayer {
        let mut l = ContourLayer::new(
            150.0,
            0,
            vec![Polygon::new(
                LineString::from(vec![
                    (-151.1, 63.0),
                    (-151.0, 63.0),
                    (-151.0, 63.1),
                    (-151.1, 63.0),
                ]),
                vec![],
            )],
        );
        l.layer_number = 2;
        l
    }

    #[test]
    fn test_feature_collection_round_trip() {
        let mut buf = Vec::new();
        write_feature_collection(&mut buf, std::slice::from_ref(&layer())).unwrap();

        let parsed: GeoJson = String::from_utf8(buf).unwrap().parse().unwrap();
        let fc = match parsed {
            GeoJson::FeatureCollection(fc) => fc,
            _ => panic!("expected a feature collection"),
        };

        assert_eq!(fc.features.len(), 1);

        let feature = &fc.features[0];
        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["elevation"], JsonValue::from(150.0));
        assert_eq!(props["layer"], JsonValue::from(2));

        //coordinates survive to 6 decimal places
        match &feature.geometry.as_ref().unwrap().value {
            geojson::Value::Polygon(rings) => {
                assert!((rings[0][0][0] - -151.1).abs() < 1e-6);
                assert!((rings[0][0][1] - 63.0).abs() < 1e-6);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
