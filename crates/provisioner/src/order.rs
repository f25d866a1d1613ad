//! Intra-type ordering (§4.7 tie-break).
//!
//! `gridnode_types::order::CanonicalOrder` fixes the order *across* types;
//! this module fixes the order *within* a single disk-like type, where
//! larger volumes install first so they get first pick of free extents.

use gridnode_types::workload::Workload;

/// Sorts the workloads of a single type (all of `workloads` are assumed to
/// share one `WorkloadType`) for installation: descending by declared size
/// for disk-like types, stable (original relative order preserved) for
/// everything else since `is_disk_like` is false and size carries no
/// meaning.
pub fn sorted_for_install_within_type<'a>(workloads: &[&'a Workload]) -> Vec<&'a Workload> {
    let mut sorted: Vec<&Workload> = workloads.to_vec();
    if sorted.first().map(|w| w.workload_type.is_disk_like()).unwrap_or(false) {
        sorted.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    }
    sorted
}
