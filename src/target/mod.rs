// This module resolves the device strings a user typed into canonical target names.
// Resolution runs per device and never aborts on a bad one: the name is lower-cased,
// translated from LLVM processor format (gfx803) to the public format (fiji) when the
// target table knows it, matched against the hardware-info source (the architecture
// string must contain a supported target name; first match in sorted order wins), and
// finally checked against the supplemental-targets file, which is accepted with an
// "unverified target" warning. Devices that fail every step are reported as unknown and
// returned in `Resolution::rejected` so the orchestrator can record them as failed
// targets. An empty request resolves to the default (latest) target. The call only fails
// when nothing at all could be resolved.

//! Target resolution.

pub mod alias;
pub mod device_info;
pub mod extra;

use std::collections::BTreeSet;

use crate::core::{PipelineError, PipelineResult};

pub use alias::{CompilerNameTable, TargetTable};
pub use device_info::{BuiltinDeviceInfo, DeviceInfo};
pub use extra::ExtraTargets;

/// Outcome of resolving a list of requested devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical target names, deduplicated.
    pub targets: BTreeSet<String>,
    /// Requested devices (lower-cased) that matched nothing.
    pub rejected: Vec<String>,
    /// Targets accepted only through the supplemental file.
    pub unverified: Vec<String>,
}

/// Maps user device strings to canonical target names.
pub struct TargetResolver {
    table: TargetTable,
    device_info: Box<dyn DeviceInfo>,
    extra: ExtraTargets,
}

impl TargetResolver {
    pub fn new(table: TargetTable, device_info: Box<dyn DeviceInfo>, extra: ExtraTargets) -> Self {
        Self {
            table,
            device_info,
            extra,
        }
    }

    /// Built-in tables, no supplemental targets.
    pub fn builtin() -> Self {
        Self::new(TargetTable::builtin(), Box::new(BuiltinDeviceInfo), ExtraTargets::default())
    }

    pub fn with_extra_targets(mut self, extra: ExtraTargets) -> Self {
        self.extra = extra;
        self
    }

    pub fn supported_targets(&self) -> BTreeSet<String> {
        self.table.supported()
    }

    pub fn extra_targets(&self) -> &ExtraTargets {
        &self.extra
    }

    /// The target used when no device is requested.
    pub fn default_target(&self) -> Option<&str> {
        self.table.latest()
    }

    pub fn resolve(&self, requested: &[String]) -> PipelineResult<Resolution> {
        let mut resolution = Resolution::default();

        if requested.is_empty() {
            let default = self.default_target().ok_or(PipelineError::NoTargets)?;
            log::debug!("No device requested, using default target {}", default);
            resolution.targets.insert(default.to_string());
            return Ok(resolution);
        }

        let supported = self.supported_targets();
        for device in requested {
            match self.resolve_one(device, &supported) {
                Some(Match::Verified(target)) => {
                    log::debug!("Device {} resolved to {}", device, target);
                    resolution.targets.insert(target);
                }
                Some(Match::Unverified(target)) => {
                    log::warn!(
                        "Warning: using unknown target GPU: {}; successful compilation and analysis are not guaranteed.",
                        target
                    );
                    resolution.unverified.push(target.clone());
                    resolution.targets.insert(target);
                }
                None => {
                    let device = device.to_ascii_lowercase();
                    log::error!("{}", PipelineError::UnknownDevice { device: device.clone() });
                    resolution.rejected.push(device);
                }
            }
        }

        if resolution.targets.is_empty() {
            return Err(PipelineError::NoTargets);
        }
        Ok(resolution)
    }

    fn resolve_one(&self, device: &str, supported: &BTreeSet<String>) -> Option<Match> {
        let mut name = device.trim().to_ascii_lowercase();

        if let Some(public) = self.table.public_name(&name) {
            name = public.to_string();
        }

        if let Some(arch) = self.device_info.find_arch_name(&name) {
            let arch = arch.to_ascii_lowercase();
            if let Some(target) = supported.iter().find(|t| arch.contains(t.as_str())) {
                return Some(Match::Verified(target.clone()));
            }
        }

        if self.extra.contains(&name) {
            return Some(Match::Unverified(name));
        }

        None
    }
}

enum Match {
    Verified(String),
    Unverified(String),
}
