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
pub mod config;
pub mod contour;
pub mod error;
pub mod export;
pub mod label;
pub mod layers;
pub mod mesh;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod scale;
pub mod util;
pub mod vector;

pub use config::*;
pub use error::*;
