use std::collections::HashMap;
use std::sync::Arc;

use gridnode_types::workload::WorkloadType;

use crate::WorkloadManager;

/// Resolves a `WorkloadType` to the manager that handles it. Built once at
/// startup from whatever managers the binary wires in; a type with no
/// registered manager is a configuration error the engine surfaces rather
/// than silently skipping.
#[derive(Clone, Default)]
pub struct ManagerRegistry {
    managers: HashMap<WorkloadType, Arc<dyn WorkloadManager>>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self {
            managers: HashMap::new(),
        }
    }

    pub fn register(&mut self, ty: WorkloadType, manager: Arc<dyn WorkloadManager>) {
        self.managers.insert(ty, manager);
    }

    pub fn get(&self, ty: WorkloadType) -> Option<Arc<dyn WorkloadManager>> {
        self.managers.get(&ty).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_manager::NullManager;
    use std::sync::Arc;

    #[test]
    fn unregistered_type_resolves_to_none() {
        let reg = ManagerRegistry::new();
        assert!(reg.get(WorkloadType::Network).is_none());
    }

    #[test]
    fn registered_type_resolves_to_the_manager() {
        let mut reg = ManagerRegistry::new();
        reg.register(WorkloadType::Network, Arc::new(NullManager::always_ok()));
        assert!(reg.get(WorkloadType::Network).is_some());
    }
}
