//! Hardware-info lookup used for fuzzy device matching.

/// Source of architecture names for device strings.
pub trait DeviceInfo {
    /// Architecture string for `device` (case-insensitive), if the device is known.
    ///
    /// The resolver accepts a device when a supported target name occurs
    /// inside the returned string.
    fn find_arch_name(&self, device: &str) -> Option<String>;
}

/// (device name, architecture family)
const DEVICES: &[(&str, &str)] = &[
    ("carrizo", "Graphics IP v8"),
    ("tonga", "Graphics IP v8"),
    ("fiji", "Graphics IP v8"),
    ("ellesmere", "Graphics IP v8"),
    ("baffin", "Graphics IP v8"),
    ("gfx804", "Graphics IP v8"),
    ("gfx900", "Vega"),
    ("gfx902", "Vega"),
    ("gfx904", "Vega"),
    ("gfx906", "Vega"),
    ("gfx908", "CDNA"),
    ("gfx90a", "CDNA2"),
    ("gfx90c", "Vega"),
    ("gfx942", "CDNA3"),
    ("gfx1010", "RDNA"),
    ("gfx1011", "RDNA"),
    ("gfx1012", "RDNA"),
    ("gfx1030", "RDNA2"),
    ("gfx1031", "RDNA2"),
    ("gfx1032", "RDNA2"),
    ("gfx1034", "RDNA2"),
    ("gfx1035", "RDNA2"),
    ("gfx1100", "RDNA3"),
    ("gfx1101", "RDNA3"),
    ("gfx1102", "RDNA3"),
    ("gfx1103", "RDNA3"),
    ("gfx1150", "RDNA3.5"),
    ("gfx1151", "RDNA3.5"),
    ("gfx1152", "RDNA3.5"),
    ("gfx1200", "RDNA4"),
    ("gfx1201", "RDNA4"),
];

/// Built-in device table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDeviceInfo;

impl DeviceInfo for BuiltinDeviceInfo {
    fn find_arch_name(&self, device: &str) -> Option<String> {
        DEVICES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(device))
            .map(|(name, family)| format!("{family} ({name})"))
    }
}
