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
use std::path::Path;

use chrono::Utc;
use shapefile::dbase;

use crate::config::OutputFormat;
use crate::export::{ExportContext, ExportRecord};
use crate::layers::ContourLayer;

const WGS84_WKT: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// The shapefile writer owns its .shp/.shx/.dbf trio, so this emitter
/// writes in place rather than through the partial-rename helper
pub fn emit_shapefile(ctx: &ExportContext) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    if ctx.config.output_layers {
        for layer in ctx.layers.iter() {
            let path = ctx.layer_path(layer, OutputFormat::Shapefile.extension());
            records.push(write_one(ctx, &path, std::slice::from_ref(layer), Some(layer.layer_number)));
        }
    } else {
        let path = ctx.combined_path("", OutputFormat::Shapefile.extension());
        records.push(write_one(ctx, &path, ctx.layers, None));
    }

    records
}

fn write_one(
    ctx: &ExportContext,
    path: &Path,
    layers: &[ContourLayer],
    layer_number: Option<u32>,
) -> ExportRecord {
    match write_shapefile(path, layers) {
        Ok(bytes) => ExportRecord {
            path: path.to_path_buf(),
            format: OutputFormat::Shapefile,
            layer_number,
            bytes,
            written_at: Utc::now(),
            success: true,
        },
        Err(e) => {
            ctx.diag.error(
                "emit",
                format!("shapefile emitter failed for {:?}: {:#}", path, e),
            );
            ExportRecord {
                path: path.to_path_buf(),
                format: OutputFormat::Shapefile,
                layer_number,
                bytes: 0,
                written_at: Utc::now(),
                success: false,
            }
        }
    }
}

fn write_shapefile(path: &Path, layers: &[ContourLayer]) -> anyhow::Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let table = dbase::TableWriterBuilder::new()
        .add_numeric_field(dbase::FieldName::try_from("LAYER").unwrap(), 10, 0)
        .add_numeric_field(dbase::FieldName::try_from("ELEV").unwrap(), 18, 6);

    let mut writer = shapefile::Writer::from_path(path, table)?;

    for layer in layers {
        for polygon in layer.polygons.iter() {
            let mut rings = Vec::with_capacity(1 + polygon.interiors().len());

            rings.push(shapefile::PolygonRing::Outer(ring_points(
                polygon.exterior(),
            )));
            for hole in polygon.interiors() {
                rings.push(shapefile::PolygonRing::Inner(ring_points(hole)));
            }

            let shape = shapefile::Polygon::with_rings(rings);

            let mut record = dbase::Record::default();
            record.insert(
                "LAYER".to_string(),
                dbase::FieldValue::Numeric(Some(layer.layer_number as f64)),
            );
            record.insert(
                "ELEV".to_string(),
                dbase::FieldValue::Numeric(Some(layer.elevation)),
            );

            writer.write_shape_and_record(&shape, &record)?;
        }
    }

    drop(writer);

    //projection sidecar
    std::fs::write(path.with_extension("prj"), WGS84_WKT)?;

    Ok(std::fs::metadata(path)?.len())
}

fn ring_points(ring: &geo::LineString<f64>) -> Vec<shapefile::Point> {
    ring.0
        .iter()
        .map(|c| shapefile::Point::new(c.x, c.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.shp");

        let mut layer = ContourLayer::new(
            250.0,
            0,
            vec![Polygon::new(
                LineString::from(vec![
                    (-151.1, 63.0),
                    (-151.0, 63.0),
                    (-151.0, 63.1),
                    (-151.1, 63.1),
                    (-151.1, 63.0),
                ]),
                vec![],
            )],
        );
        layer.layer_number = 3;

        let bytes = write_shapefile(&path, std::slice::from_ref(&layer)).unwrap();
        assert!(bytes > 0);

        assert!(path.exists());
        assert!(dir.path().join("layers.dbf").exists());
        assert!(dir.path().join("layers.prj").exists());

        let mut reader = shapefile::Reader::from_path(&path).unwrap();
        let mut count = 0;
        for row in reader.iter_shapes_and_records() {
            let (shape, record) = row.unwrap();
            match shape {
                shapefile::Shape::Polygon(p) => {
                    assert!(!p.rings().is_empty());
                }
                other => panic!("expected polygon, got {}", other),
            }

            match record.get("ELEV") {
                Some(dbase::FieldValue::Numeric(Some(v))) => {
                    assert!((v - 250.0).abs() < 1e-6)
                }
                other => panic!("missing ELEV field: {:?}", other),
            }
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
