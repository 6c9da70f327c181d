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
use std::time::{Duration, Instant};

use log::info;

pub fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    let hours = secs / 3600;
    secs = secs % 3600;
    let minutes = secs / 60;
    secs = secs % 60;

    let ms = d.as_millis() % 1000;

    format!("{}h {}m {}s {}ms", hours, minutes, secs, ms)
}

/// Rate limited progress reporting for the longer pipeline stages
pub struct Progress {
    label: &'static str,
    start: Instant,
    last_output: Instant,
    num_total: u32,
}

impl Progress {
    pub fn new(label: &'static str, num_total: u32) -> Self {
        let now = Instant::now();
        Progress {
            label,
            start: now,
            last_output: now,
            num_total,
        }
    }

    pub fn update(&mut self, num_processed: u32) {
        if self.last_output.elapsed().as_secs() < 3 {
            return;
        }
        self.last_output = Instant::now();

        let d = self.start.elapsed();
        let time_per_result = if num_processed == 0 {
            d / 1
        } else {
            d / num_processed
        };
        let est_remaining = time_per_result * self.num_total.saturating_sub(num_processed);

        info!(
            "{}: through {} of {}, elapsed {}, est. remaining {}",
            self.label,
            num_processed,
            self.num_total,
            format_duration(d),
            format_duration(est_remaining)
        );
    }

    pub fn finish(&self) {
        info!(
            "{}: {} done in {}",
            self.label,
            self.num_total,
            format_duration(self.start.elapsed())
        );
    }
}

/// Linear interpolation, t clamped to [0, 1]
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        let d = Duration::from_millis(3_725_250);
        assert_eq!(format_duration(d), "1h 2m 5s 250ms");

        assert_eq!(format_duration(Duration::from_secs(0)), "0h 0m 0s 0ms");
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(lerp(0.0, 10.0, -1.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 2.0), 10.0);
    }
}
