//! Supplemental ("additional") targets file.
//!
//! Plain text, one device per line. Lines containing `//` are comments.
//! Names are stored lower-cased; lookups are case-insensitive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::{PipelineError, PipelineResult};

pub const EXTRA_TARGETS_FILE_NAME: &str = "additional-targets";

const COMMENT_MARKER: &str = "//";

/// Devices accepted without verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraTargets {
    devices: Vec<String>,
}

impl ExtraTargets {
    pub fn parse(text: &str) -> Self {
        let devices = text
            .lines()
            .filter(|line| !line.contains(COMMENT_MARKER))
            .map(|line| line.trim().to_ascii_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        Self { devices }
    }

    /// Load the file at `path`. A missing file yields an empty list.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PipelineError::io(path, e)),
        }
    }

    /// `additional-targets` next to the running executable.
    pub fn default_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        Some(exe.parent()?.join(EXTRA_TARGETS_FILE_NAME))
    }

    pub fn contains(&self, device: &str) -> bool {
        let device = device.to_ascii_lowercase();
        self.devices.iter().any(|d| *d == device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
