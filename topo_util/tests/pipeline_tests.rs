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

use topo_util::config::{ContourStrategy, OutputFormat, TopographicConfig};
use topo_util::pipeline::generate;
use topo_util::raster::{GridStats, HeightGrid};

fn base_config(out: &Path) -> TopographicConfig {
    TopographicConfig {
        min_lat: 0.0,
        min_lon: 0.0,
        max_lat: 0.01,
        max_lon: 0.01,
        num_layers: 3,
        output_formats: vec![OutputFormat::Svg],
        output_directory: out.to_path_buf(),
        base_name: "test".to_string(),
        ..TopographicConfig::default()
    }
}

fn flat_grid(n: u32, value: f32) -> HeightGrid {
    let stats = GridStats::from_bounds(0.0, 0.0, 0.01, 0.01, n, n, -9999.0);
    HeightGrid::from_vec(vec![value; (n * n) as usize], stats).unwrap()
}

/// Cone per the spec scenario: 500 * (1 - r) with r the radial distance
/// normalized to the half width, negative in the corners
fn cone_grid(n: u32) -> HeightGrid {
    let stats = GridStats::from_bounds(0.0, 0.0, 0.01, 0.01, n, n, -9999.0);
    let center = (n - 1) as f64 / 2.0;

    let mut data = Vec::with_capacity((n * n) as usize);
    for r in 0..n {
        for c in 0..n {
            let dr = r as f64 - center;
            let dc = c as f64 - center;
            let dist = (dr * dr + dc * dc).sqrt() / center;
            data.push((500.0 * (1.0 - dist)) as f32);
        }
    }

    HeightGrid::from_vec(data, stats).unwrap()
}

fn two_peaks_grid(n: u32) -> HeightGrid {
    let stats = GridStats::from_bounds(0.0, 0.0, 0.01, 0.01, n, n, -9999.0);
    let center = (n - 1) as f64 / 2.0;
    let sigma = n as f64 / 8.0;

    let peaks = [
        (center * 0.55, center * 0.55, 300.0),
        (center * 1.45, center * 1.45, 200.0),
    ];

    let mut data = Vec::with_capacity((n * n) as usize);
    for r in 0..n {
        for c in 0..n {
            let mut z = 0.0f64;
            for (pr, pc, h) in peaks {
                let d2 = (r as f64 - pr).powi(2) + (c as f64 - pc).powi(2);
                z += h * (-d2 / (2.0 * sigma * sigma)).exp();
            }
            data.push(z as f32);
        }
    }

    HeightGrid::from_vec(data, stats).unwrap()
}

#[test]
fn test_flat_region_three_layers() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());

    //plan over [0, 300] regardless of the flat 100m data
    config.min_elevation = Some(0.0);
    config.max_elevation = Some(300.0);

    let report = generate(flat_grid(10, 100.0), &config).unwrap();
    assert!(report.success);

    //levels 0 and 100 enclose the constant 100m terrain, 200 is empty and
    //dropped
    assert_eq!(report.num_layers, 2);
    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.success && r.path.exists()));
}

#[test]
fn test_flat_region_force_all_layers() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());

    config.min_elevation = Some(0.0);
    config.max_elevation = Some(300.0);
    config.force_all_layers = true;

    let report = generate(flat_grid(10, 100.0), &config).unwrap();

    //the empty 200m level stays in the stack
    assert_eq!(report.num_layers, 3);
}

#[test]
fn test_cone_five_layers_area_ratios() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 5;
    config.output_formats = vec![OutputFormat::GeoJson];

    let report = generate(cone_grid(101), &config).unwrap();
    assert!(report.success);
    assert_eq!(report.num_layers, 5);

    //read the per-layer areas back out of the geojson properties
    let mut areas = Vec::new();
    for record in report.records.iter() {
        let text = std::fs::read_to_string(&record.path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let area = json["features"][0]["properties"]["area"].as_f64().unwrap();
        areas.push(area);
    }

    areas.sort_by(|a, b| b.partial_cmp(a).unwrap());

    assert_eq!(areas.len(), 5);
    for w in areas.windows(2) {
        assert!(w[0] > w[1]);
    }

    //concentric discs shrink as (1 - k/5)^2; the base layer hugs the
    //inscribed circle so the first ratio holds too
    for (k, w) in areas.windows(2).enumerate() {
        let expect = ((1.0 - (k as f64 + 1.0) / 5.0) / (1.0 - k as f64 / 5.0)).powi(2);
        let actual = w[1] / w[0];
        assert!(
            (actual - expect).abs() < 0.12,
            "ratio {} expected {:.3} got {:.3}",
            k,
            expect,
            actual
        );
    }
}

#[test]
fn test_two_peaks_split_and_merge() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 4;
    config.output_formats = vec![OutputFormat::GeoJson];
    //keep every sliver so polygon counts are meaningful
    config.remove_holes = false;

    let report = generate(two_peaks_grid(200), &config).unwrap();
    assert_eq!(report.num_layers, 4);

    let counts: Vec<usize> = report
        .records
        .iter()
        .map(|record| {
            let text = std::fs::read_to_string(&record.path).unwrap();
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();
            json["features"].as_array().unwrap().len()
        })
        .collect();

    //lowest layer holds both peaks in one polygon
    assert_eq!(counts[0], 1);

    //a middle elevation separates the two summits
    assert!(counts[1] == 2 || counts[2] == 2, "counts {:?}", counts);

    //only the taller peak survives at the top
    assert_eq!(counts[3], 1);
}

#[test]
fn test_single_layer_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.strategy = ContourStrategy::Explicit;
    config.explicit_levels = vec![50.0];
    config.num_layers = 0;

    let report = generate(flat_grid(10, 100.0), &config).unwrap();

    assert_eq!(report.num_layers, 1);
    assert_eq!(report.records.len(), 1);

    let name = report.records[0]
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();
    assert_eq!(name, "test-layer01-50m.svg");
}

#[test]
fn test_svg_output_structure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 2;
    config.add_registration_marks = true;

    let report = generate(cone_grid(41), &config).unwrap();
    assert!(report.success);

    let text = std::fs::read_to_string(&report.records[0].path).unwrap();

    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    assert!(text.contains("id=\"layer-01\""));
    assert!(text.contains("fill-rule=\"evenodd\""));
    assert!(text.contains(" Z "));

    //registration marks present
    assert!(text.matches("M ").count() > 4);
}

#[test]
fn test_mesh_pipeline_stl_and_stacked() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 3;
    config.output_formats = vec![OutputFormat::Stl];
    config.output_stacked = true;

    let report = generate(cone_grid(61), &config).unwrap();
    assert!(report.success, "diag: {:?}", report.diagnostics);

    //three per-layer prisms plus the stacked file
    assert_eq!(report.records.len(), 4);

    //every per-layer mesh validates watertight
    assert_eq!(report.mesh_reports.len(), 3);
    for (num, mesh_report) in report.mesh_reports.iter() {
        assert!(
            mesh_report.is_watertight,
            "layer {} not watertight: {:?}",
            num, mesh_report
        );
    }

    //sanity check the binary stl triangle counts
    for record in report.records.iter() {
        let bytes = std::fs::read(&record.path).unwrap();
        let count = u32::from_le_bytes(bytes[80..84].try_into().unwrap()) as usize;
        assert!(count > 0);
        assert_eq!(bytes.len(), 84 + count * 50);
    }
}

#[test]
fn test_geojson_coordinates_in_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 3;
    config.output_formats = vec![OutputFormat::GeoJson];

    let report = generate(cone_grid(41), &config).unwrap();

    for record in report.records.iter() {
        let text = std::fs::read_to_string(&record.path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        for feature in json["features"].as_array().unwrap() {
            assert!(feature["properties"]["elevation"].is_number());
            assert!(feature["properties"]["layer"].is_number());

            let rings = feature["geometry"]["coordinates"].as_array().unwrap();
            for ring in rings[0].as_array().unwrap() {
                let lon = ring[0].as_f64().unwrap();
                let lat = ring[1].as_f64().unwrap();
                assert!((-0.001..=0.011).contains(&lon));
                assert!((-0.001..=0.011).contains(&lat));
            }
        }
    }
}

#[test]
fn test_failed_emitter_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.num_layers = 2;
    config.output_formats = vec![OutputFormat::Svg, OutputFormat::GeoJson];

    //svg files land in an unwritable location by pointing the directory at
    //an existing file path
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"x").unwrap();
    config.output_directory = blocker.clone();

    let report = generate(cone_grid(21), &config).unwrap();

    //everything failed but the pipeline still returned a report
    assert!(!report.success);
    assert!(report.records.iter().all(|r| !r.success));
    assert!(!report.diagnostics.is_empty());
}
