use crate::api::VersionDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Running totals for one garbage collection run.
///
/// Every deletion that was attempted (or simulated, in dry-run) is counted, whether or not the
/// delete call succeeded; failed calls are additionally counted in `failed_deletes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    deleted_per_function: BTreeMap<String, usize>,
    bytes_freed: u64,
    failed_deletes: usize,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deletion(&mut self, version: &VersionDescriptor) {
        *self
            .deleted_per_function
            .entry(version.function_name.clone())
            .or_default() += 1;
        self.bytes_freed += version.code_size;
    }

    pub fn record_failed_delete(&mut self) {
        self.failed_deletes += 1;
    }

    pub fn deleted_for(&self, function_name: &str) -> usize {
        self.deleted_per_function
            .get(function_name)
            .copied()
            .unwrap_or_default()
    }

    pub fn summary(&self, dry_run: bool) -> RunSummary {
        RunSummary {
            versions_deleted: self.deleted_per_function.values().sum(),
            functions_affected: self.deleted_per_function.len(),
            bytes_freed: self.bytes_freed,
            megabytes_freed: self.bytes_freed / BYTES_PER_MB,
            failed_deletes: self.failed_deletes,
            dry_run,
        }
    }
}

/// End-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub versions_deleted: usize,
    pub functions_affected: usize,
    pub bytes_freed: u64,
    /// Truncated to whole megabytes.
    pub megabytes_freed: u64,
    pub failed_deletes: usize,
    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(10))?;
        if self.dry_run {
            writeln!(f, "Dry-Run: no versions were actually deleted")?;
        }
        writeln!(
            f,
            "Deleted {} versions from {} functions",
            self.versions_deleted, self.functions_affected
        )?;
        write!(f, "Freed {} MBs", self.megabytes_freed)?;
        if self.failed_deletes > 0 {
            write!(f, "\n{} deletions failed", self.failed_deletes)?;
        }
        Ok(())
    }
}
