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
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use topo_util::raster::{GridStats, HeightGrid};


/// Reads a single band GeoTIFF DEM into a HeightGrid.  Expects a north-up
/// raster with ModelPixelScale and ModelTiepoint georeferencing, the way
/// SRTM tiles ship.
pub fn load_geotiff(path: &Path) -> Result<HeightGrid> {
    let file = File::open(path).with_context(|| format!("cannot open {:?}", path))?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;
    debug!("dem {:?} is {}x{}", path, width, height);

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| anyhow!("{:?} has no ModelPixelScale tag", path))?;
    let tie_points = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| anyhow!("{:?} has no ModelTiepoint tag", path))?;

    if pixel_scale.len() < 2 || tie_points.len() < 6 {
        bail!("{:?} has malformed geo tags", path);
    }

    //tie point maps raster (i, j) onto geographic (x, y)
    let origin_x = tie_points[3] - tie_points[0] * pixel_scale[0];
    let origin_y = tie_points[4] + tie_points[1] * pixel_scale[1];

    let geotransform = [
        origin_x,
        pixel_scale[0],
        0.0,
        origin_y,
        0.0,
        -pixel_scale[1],
    ];

    let no_data_value = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok())
        .unwrap_or(f64::MIN);

    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => bail!("{:?} has an unsupported sample format", path),
    };

    let stats = GridStats::from_geotransform(&geotransform, width, height, no_data_value)?;

    info!(
        "loaded dem {:?}: {}x{} origin ({:.4}, {:.4})",
        path, width, height, origin_x, origin_y
    );

    Ok(HeightGrid::from_vec(data, stats)?)
}

/// Synthetic demo terrains over the configured bounds, for trying the tool
/// without downloading tiles
pub fn demo_grid(
    kind: &str,
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
) -> Result<HeightGrid> {
    const N: u32 = 200;

    let stats = GridStats::from_bounds(min_lon, min_lat, max_lon, max_lat, N, N, -9999.0);
    let mut data = Vec::with_capacity((N * N) as usize);

    let center = (N - 1) as f64 / 2.0;

    match kind {
        "cone" => {
            let max_r = (center * center * 2.0).sqrt();
            for r in 0..N {
                for c in 0..N {
                    let dr = r as f64 - center;
                    let dc = c as f64 - center;
                    let dist = (dr * dr + dc * dc).sqrt();
                    data.push((500.0 * (1.0 - dist / max_r)).max(0.0) as f32);
                }
            }
        }
        "peaks" => {
            //two gaussians, 300m and 200m
            let peaks = [
                (center * 0.55, center * 0.55, 300.0),
                (center * 1.45, center * 1.45, 200.0),
            ];
            let sigma = N as f64 / 8.0;

            for r in 0..N {
                for c in 0..N {
                    let mut z = 0.0f64;
                    for (pr, pc, h) in peaks {
                        let d2 = (r as f64 - pr).powi(2) + (c as f64 - pc).powi(2);
                        z += h * (-d2 / (2.0 * sigma * sigma)).exp();
                    }
                    data.push(z as f32);
                }
            }
        }
        "flat" => {
            data.resize((N * N) as usize, 100.0);
        }
        other => bail!("unknown demo terrain '{}', try cone, peaks or flat", other),
    }

    Ok(HeightGrid::from_vec(data, stats)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_cone() {
        let grid = demo_grid("cone", 63.0, -151.1, 63.1, -151.0).unwrap();

        let (min, max) = grid.min_max().unwrap();
        assert_eq!(min, 0.0);
        assert!(max > 450.0);

        //peak in the middle
        assert!(grid.data[(100, 100)] > grid.data[(10, 10)]);
    }

    #[test]
    fn test_demo_peaks() {
        let grid = demo_grid("peaks", 63.0, -151.1, 63.1, -151.0).unwrap();
        let (_, max) = grid.min_max().unwrap();

        //taller gaussian dominates
        assert!(max > 250.0 && max < 320.0);
    }

    #[test]
    fn test_demo_unknown() {
        assert!(demo_grid("volcano", 0.0, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_geotiff_round_trip_with_core_encoder() {
        //write a raster with the core's geotiff emitter machinery and read
        //it back through the DEM loader
        use std::io::Write;
        use tiff::encoder::colortype::Gray32Float;
        use tiff::encoder::TiffEncoder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");

        let samples: Vec<f32> = (0..16).map(|i| 100.0 + i as f32).collect();

        {
            let mut cursor = std::io::Cursor::new(Vec::new());
            {
                let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
                let mut image = encoder.new_image::<Gray32Float>(4, 4).unwrap();

                let scale: Vec<f64> = vec![0.001, 0.001, 0.0];
                image
                    .encoder()
                    .write_tag(Tag::ModelPixelScaleTag, &scale[..])
                    .unwrap();
                let tie: Vec<f64> = vec![0.0, 0.0, 0.0, -151.1, 63.1, 0.0];
                image
                    .encoder()
                    .write_tag(Tag::ModelTiepointTag, &tie[..])
                    .unwrap();

                image.write_data(&samples).unwrap();
            }

            let mut f = File::create(&path).unwrap();
            f.write_all(cursor.get_ref()).unwrap();
        }

        let grid = load_geotiff(&path).unwrap();

        assert_eq!(grid.num_cols(), 4);
        assert_eq!(grid.num_rows(), 4);
        assert_eq!(grid.data[(0, 0)], 100.0);
        assert_eq!(grid.data[(3, 3)], 115.0);

        assert!((grid.stats.origin_x - -151.1).abs() < 1e-9);
        assert!((grid.stats.origin_y - 63.1).abs() < 1e-9);
        assert!((grid.stats.pixel_height + 0.001).abs() < 1e-12);
    }
}
