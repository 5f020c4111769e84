// This module provides the Output Metadata Store, the run-scoped table that every stage
// of the pipeline shares. OutputStore maps a (device, kernel) key to an OutputRecord
// holding the binary path, the per-kernel ISA path, "is temporary" flags for both and a
// success flag. The compile orchestrator creates a record as soon as a target is
// processed (a failed compile still gets a record with empty paths), the disassembly
// step adds one record per kernel and then back-fills the binary path, and the
// post-processing passes only read it. Device-level records use `kernel: None`. The
// store is owned by the top-level run and passed by reference; targets can build a
// local store and merge it afterwards so that per-target work stays isolated.
// SessionStats tracks what happened during the run (targets compiled/failed, kernels
// split/reduced, temp files removed) and is logged at the end.

//! Output Metadata Store and run statistics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Key of one store entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecordKey {
    pub device: String,
    /// `None` for device-level records.
    pub kernel: Option<String>,
}

impl RecordKey {
    pub fn device(device: &str) -> Self {
        Self {
            device: device.to_string(),
            kernel: None,
        }
    }

    pub fn kernel(device: &str, kernel: &str) -> Self {
        Self {
            device: device.to_string(),
            kernel: Some(kernel.to_string()),
        }
    }
}

/// Artifacts produced for one (device, kernel) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub bin_file: Option<PathBuf>,
    pub isa_file: Option<PathBuf>,
    pub is_bin_temp: bool,
    pub is_isa_temp: bool,
    pub success: bool,
}

impl OutputRecord {
    /// A failed record: no paths, `success == false`.
    pub fn failed() -> Self {
        Self::default()
    }

    /// A successful record that only references a binary.
    pub fn binary(path: impl Into<PathBuf>, is_temp: bool) -> Self {
        Self {
            bin_file: Some(path.into()),
            is_bin_temp: is_temp,
            success: true,
            ..Self::default()
        }
    }

    /// A successful record for a per-kernel ISA file.
    pub fn isa(path: impl Into<PathBuf>, is_temp: bool) -> Self {
        Self {
            isa_file: Some(path.into()),
            is_isa_temp: is_temp,
            success: true,
            ..Self::default()
        }
    }
}

/// The run-scoped `(device, kernel) -> record` table.
#[derive(Debug, Default)]
pub struct OutputStore {
    records: BTreeMap<RecordKey, OutputRecord>,
    stats: SessionStats,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `key`.
    pub fn insert(&mut self, key: RecordKey, record: OutputRecord) {
        self.records.insert(key, record);
    }

    pub fn get(&self, key: &RecordKey) -> Option<&OutputRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &OutputRecord)> {
        self.records.iter()
    }

    /// Records of a single device.
    pub fn device_records<'s>(
        &'s self,
        device: &'s str,
    ) -> impl Iterator<Item = (&'s RecordKey, &'s OutputRecord)> + 's {
        self.records.iter().filter(move |(key, _)| key.device == device)
    }

    /// Per-kernel records that carry an ISA file and succeeded.
    pub fn kernel_isa_records(&self) -> impl Iterator<Item = (&str, &str, &OutputRecord)> {
        self.records.iter().filter_map(|(key, record)| {
            let kernel = key.kernel.as_deref()?;
            (record.success && record.isa_file.is_some()).then_some((key.device.as_str(), kernel, record))
        })
    }

    /// Distinct devices with at least one successful record that references a binary.
    pub fn compiled_binaries(&self) -> Vec<(&str, &Path)> {
        let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
        for (key, record) in &self.records {
            if let (true, Some(bin)) = (record.success, record.bin_file.as_deref()) {
                seen.entry(key.device.as_str()).or_insert(bin);
            }
        }
        seen.into_iter().collect()
    }

    /// Propagate a binary path into every record of `device`.
    pub fn set_binary_for_device(&mut self, device: &str, bin_file: &Path, is_temp: bool) {
        for (key, record) in self.records.iter_mut() {
            if key.device == device {
                record.bin_file = Some(bin_file.to_path_buf());
                record.is_bin_temp = is_temp;
            }
        }
    }

    /// Move all records of `other` into this store, replacing duplicates.
    pub fn merge(&mut self, other: OutputStore) {
        self.records.extend(other.records);
        self.stats.absorb(&other.stats);
    }

    /// Every file marked temporary, deduplicated.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for record in self.records.values() {
            if record.is_bin_temp {
                files.extend(record.bin_file.iter().cloned());
            }
            if record.is_isa_temp {
                files.extend(record.isa_file.iter().cloned());
            }
        }
        files.sort();
        files.dedup();
        files
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }
}

/// Run statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Targets whose compiler invocation succeeded.
    pub targets_compiled: usize,

    /// Targets that failed anywhere between resolution and splitting.
    pub targets_failed: usize,

    /// Kernel fragments produced by the splitter.
    pub kernels_split: usize,

    /// Kernel fragments rewritten or truncated by the reducer.
    pub kernels_reduced: usize,

    /// Temporary files removed by the cleanup step.
    pub temp_files_removed: usize,
}

impl SessionStats {
    pub fn record_target_compiled(&mut self) {
        self.targets_compiled += 1;
    }

    pub fn record_target_failed(&mut self) {
        self.targets_failed += 1;
    }

    pub fn record_kernels_split(&mut self, count: usize) {
        self.kernels_split += count;
    }

    pub fn record_kernel_reduced(&mut self) {
        self.kernels_reduced += 1;
    }

    pub fn record_temp_file_removed(&mut self) {
        self.temp_files_removed += 1;
    }

    fn absorb(&mut self, other: &SessionStats) {
        self.targets_compiled += other.targets_compiled;
        self.targets_failed += other.targets_failed;
        self.kernels_split += other.kernels_split;
        self.kernels_reduced += other.kernels_reduced;
        self.temp_files_removed += other.temp_files_removed;
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run statistics:")?;
        writeln!(f, "  Targets compiled: {}", self.targets_compiled)?;
        writeln!(f, "  Targets failed: {}", self.targets_failed)?;
        writeln!(f, "  Kernels split: {}", self.kernels_split)?;
        writeln!(f, "  Kernels reduced: {}", self.kernels_reduced)?;
        write!(f, "  Temp files removed: {}", self.temp_files_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_binary_for_device() {
        let mut store = OutputStore::new();
        store.insert(RecordKey::kernel("gfx900", "a"), OutputRecord::isa("a.isa", true));
        store.insert(RecordKey::kernel("gfx900", "b"), OutputRecord::isa("b.isa", true));
        store.insert(RecordKey::kernel("gfx906", "a"), OutputRecord::isa("c.isa", false));

        store.set_binary_for_device("gfx900", Path::new("out-gfx900.bin"), false);

        let a = store.get(&RecordKey::kernel("gfx900", "a")).unwrap();
        assert_eq!(a.bin_file.as_deref(), Some(Path::new("out-gfx900.bin")));
        let other = store.get(&RecordKey::kernel("gfx906", "a")).unwrap();
        assert!(other.bin_file.is_none());
    }

    #[test]
    fn test_temp_files_deduplicated() {
        let mut store = OutputStore::new();
        let mut rec = OutputRecord::isa("k1.isa", true);
        rec.bin_file = Some("t.bin".into());
        rec.is_bin_temp = true;
        store.insert(RecordKey::kernel("gfx900", "k1"), rec);

        let mut rec = OutputRecord::isa("k2.isa", false);
        rec.bin_file = Some("t.bin".into());
        rec.is_bin_temp = true;
        store.insert(RecordKey::kernel("gfx900", "k2"), rec);

        let files = store.temp_files();
        assert_eq!(files, vec![PathBuf::from("k1.isa"), PathBuf::from("t.bin")]);
    }

    #[test]
    fn test_merge_keeps_keys_unique() {
        let mut run = OutputStore::new();
        run.insert(RecordKey::device("gfx900"), OutputRecord::failed());

        let mut local = OutputStore::new();
        local.insert(RecordKey::device("gfx900"), OutputRecord::binary("x.bin", false));
        local.stats_mut().record_target_compiled();
        run.merge(local);

        assert_eq!(run.len(), 1);
        assert!(run.get(&RecordKey::device("gfx900")).unwrap().success);
        assert_eq!(run.stats().targets_compiled, 1);
    }
}
