//! The canonical total order over workload kinds (§4.7).
//!
//! This is its own small module, distinct from the `WorkloadType` enum
//! itself, because the order is overridable: a caller may pin a "leading"
//! prefix of types (e.g. "always bring up networking first, then whatever
//! else"), with the remaining types following in the default, deterministic
//! (but otherwise unspecified by the caller) order.

use crate::workload::WorkloadType;

/// A concrete total order over the 13 workload kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalOrder {
    order: Vec<WorkloadType>,
}

impl Default for CanonicalOrder {
    fn default() -> Self {
        Self {
            order: WorkloadType::ALL.to_vec(),
        }
    }
}

impl CanonicalOrder {
    /// Builds an order with `leading` pinned as a prefix (in the order
    /// given), followed by every remaining type in the default order.
    pub fn with_leading(leading: &[WorkloadType]) -> Self {
        let mut order = Vec::with_capacity(WorkloadType::ALL.len());
        order.extend_from_slice(leading);
        for t in WorkloadType::ALL {
            if !order.contains(&t) {
                order.push(t);
            }
        }
        Self { order }
    }

    /// Install direction: forward through the order.
    pub fn install_order(&self) -> &[WorkloadType] {
        &self.order
    }

    /// Uninstall direction: reverse of the install order.
    pub fn uninstall_order(&self) -> Vec<WorkloadType> {
        let mut v = self.order.clone();
        v.reverse();
        v
    }

    /// This type's rank (lower installs first). Panics if `t` is somehow
    /// absent, which cannot happen for a `CanonicalOrder` built from
    /// `WorkloadType::ALL`.
    pub fn rank(&self, t: WorkloadType) -> usize {
        self.order
            .iter()
            .position(|x| *x == t)
            .expect("CanonicalOrder must cover every WorkloadType")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_matches_workload_type_all() {
        let order = CanonicalOrder::default();
        assert_eq!(order.install_order(), &WorkloadType::ALL);
    }

    #[test]
    fn uninstall_is_exact_reverse_of_install() {
        let order = CanonicalOrder::default();
        let mut expected: Vec<_> = order.install_order().to_vec();
        expected.reverse();
        assert_eq!(order.uninstall_order(), expected);
    }

    #[test]
    fn leading_prefix_is_honored_and_rest_still_complete() {
        let order = CanonicalOrder::with_leading(&[WorkloadType::ZMachine, WorkloadType::Network]);
        assert_eq!(order.install_order()[0], WorkloadType::ZMachine);
        assert_eq!(order.install_order()[1], WorkloadType::Network);
        assert_eq!(order.install_order().len(), 13);
        // every type still present exactly once
        let mut seen = std::collections::HashSet::new();
        for t in order.install_order() {
            assert!(seen.insert(*t));
        }
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn rank_is_consistent_with_install_order() {
        let order = CanonicalOrder::default();
        for (i, t) in order.install_order().iter().enumerate() {
            assert_eq!(order.rank(*t), i);
        }
    }
}
