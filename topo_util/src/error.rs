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
use std::path::PathBuf;
use std::sync::Mutex;

use log::{error, info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopoError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no usable elevation samples in the input grid")]
    NoElevationData,

    #[error("contour extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("polygon invariants could not be restored: {0}")]
    InconsistentGeometry(String),

    #[error("mesh is not usable: {0}")]
    MeshInvalid(String),

    #[error("{format} emitter failed for {path:?}")]
    Emitter {
        format: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type TopoResult<T> = std::result::Result<T, TopoError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry of the structured diagnostic log.  `stage` names the pipeline
/// stage that produced it (plan, extract, process, mesh, scale, emit).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub stage: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Append only sink shared by all pipeline stages.  Entries are mirrored to
/// the `log` facade so a host that only configures a logger still sees them.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, stage: &'static str, message: impl Into<String>) {
        self.push(stage, Severity::Info, message.into());
    }

    pub fn warn(&self, stage: &'static str, message: impl Into<String>) {
        self.push(stage, Severity::Warning, message.into());
    }

    pub fn error(&self, stage: &'static str, message: impl Into<String>) {
        self.push(stage, Severity::Error, message.into());
    }

    fn push(&self, stage: &'static str, severity: Severity, message: String) {
        match severity {
            Severity::Info => info!("[{}] {}", stage, message),
            Severity::Warning => warn!("[{}] {}", stage, message),
            Severity::Error => error!("[{}] {}", stage, message),
        }

        self.entries.lock().unwrap().push(Diagnostic {
            stage,
            severity,
            message,
        });
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap().clone()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}
