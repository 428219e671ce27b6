//! Named registry of shared property managers
//!
//! Lets separately invoked operations exchange a bundle of configuration by
//! name. Entries are reference counted: a manager stays alive while either the
//! registry or any holder keeps it, and replacing an entry only drops the
//! registry's reference.
//!
//! The map sits behind one registry-wide lock. Lookups share it; inserts,
//! replacements and removals take it exclusively. The managers themselves are
//! guarded by their own lock so holders must coordinate reads and writes.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use propkit_core::PropertyManager;

use crate::error::DataServiceError;

/// Property manager shared between the registry and its holders
pub type SharedPropertyManager = Arc<RwLock<PropertyManager>>;

/// Wrap a manager for sharing
#[inline]
#[must_use]
pub fn share(manager: PropertyManager) -> SharedPropertyManager {
    Arc::new(RwLock::new(manager))
}

/// Names starting with this prefix are hidden from listings by default
pub const HIDDEN_PREFIX: &str = "__";

static GLOBAL: Lazy<PropertyManagerDataService> = Lazy::new(PropertyManagerDataService::new);

/// Registry mapping names to shared property managers
#[derive(Debug, Default)]
pub struct PropertyManagerDataService {
    managers: RwLock<HashMap<String, SharedPropertyManager>>,
}

impl PropertyManagerDataService {
    /// Create an empty registry
    ///
    /// Tests and embedders construct their own; long-running processes usually
    /// share [`global`](Self::global).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            managers: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created on first use
    ///
    /// Call [`clear`](Self::clear) at shutdown to release every entry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    fn check_name(name: &str) -> Result<(), DataServiceError> {
        if name.trim().is_empty() {
            Err(DataServiceError::EmptyName)
        } else {
            Ok(())
        }
    }

    /// Check whether a manager is registered under `name`
    #[must_use]
    pub fn does_exist(&self, name: &str) -> bool {
        self.managers.read().contains_key(name)
    }

    /// Get the manager registered under `name`
    ///
    /// # Errors
    /// `NotFound` when nothing is registered under `name`
    pub fn retrieve(&self, name: &str) -> Result<SharedPropertyManager, DataServiceError> {
        self.managers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DataServiceError::NotFound(name.to_string()))
    }

    /// Register a manager under a new name
    ///
    /// # Errors
    /// `EmptyName` for a blank name, `AlreadyExists` when the name is taken
    pub fn add(&self, name: &str, manager: SharedPropertyManager) -> Result<(), DataServiceError> {
        Self::check_name(name)?;
        let mut managers = self.managers.write();
        if managers.contains_key(name) {
            return Err(DataServiceError::AlreadyExists(name.to_string()));
        }
        tracing::debug!("Adding property manager '{}'", name);
        managers.insert(name.to_string(), manager);
        Ok(())
    }

    /// Register a manager, replacing any existing entry of the same name
    ///
    /// The previous manager is released by the registry; holders that already
    /// retrieved it keep it alive and keep seeing its state.
    ///
    /// # Errors
    /// `EmptyName` for a blank name
    pub fn add_or_replace(
        &self,
        name: &str,
        manager: SharedPropertyManager,
    ) -> Result<(), DataServiceError> {
        Self::check_name(name)?;
        let previous = self.managers.write().insert(name.to_string(), manager);
        if previous.is_some() {
            tracing::debug!("Replaced property manager '{}'", name);
        } else {
            tracing::debug!("Adding property manager '{}'", name);
        }
        Ok(())
    }

    /// Get the manager under `name`, registering `create()` first if absent
    ///
    /// The check and insert happen under one exclusive lock, so concurrent
    /// callers always end up with the same instance.
    ///
    /// # Errors
    /// `EmptyName` for a blank name
    pub fn retrieve_or_insert_with(
        &self,
        name: &str,
        create: impl FnOnce() -> PropertyManager,
    ) -> Result<SharedPropertyManager, DataServiceError> {
        Self::check_name(name)?;
        if let Some(existing) = self.managers.read().get(name) {
            return Ok(Arc::clone(existing));
        }
        let mut managers = self.managers.write();
        let entry = managers.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!("Creating property manager '{}'", name);
            share(create())
        });
        Ok(Arc::clone(entry))
    }

    /// Remove and return the manager under `name`
    pub fn remove(&self, name: &str) -> Option<SharedPropertyManager> {
        let removed = self.managers.write().remove(name);
        if removed.is_some() {
            tracing::debug!("Removed property manager '{}'", name);
        }
        removed
    }

    /// Remove the entry under `name` only if it is still `manager`
    ///
    /// Returns whether anything was removed.
    pub fn remove_if_same(&self, name: &str, manager: &SharedPropertyManager) -> bool {
        let mut managers = self.managers.write();
        if !managers.get(name).is_some_and(|current| Arc::ptr_eq(current, manager)) {
            return false;
        }
        managers.remove(name);
        tracing::debug!("Removed property manager '{}'", name);
        true
    }

    /// Release every entry
    pub fn clear(&self) {
        self.managers.write().clear();
    }

    /// Number of registered managers
    #[must_use]
    pub fn size(&self) -> usize {
        self.managers.read().len()
    }

    /// Registered names, sorted
    ///
    /// Names beginning with [`HIDDEN_PREFIX`] are listed only when
    /// `include_hidden` is set.
    #[must_use]
    pub fn names(&self, include_hidden: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .managers
            .read()
            .keys()
            .filter(|name| include_hidden || !name.starts_with(HIDDEN_PREFIX))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propkit_core::PropertyManager;

    fn manager_with_bank(bank: i32) -> SharedPropertyManager {
        let mut manager = PropertyManager::new();
        manager.declare_value("bank", bank, "").unwrap();
        share(manager)
    }

    #[test]
    fn retrieve_missing_fails() {
        let service = PropertyManagerDataService::new();
        assert!(!service.does_exist("ReductionProperties"));
        assert_eq!(
            service.retrieve("ReductionProperties").unwrap_err(),
            DataServiceError::NotFound("ReductionProperties".to_string())
        );
    }

    #[test]
    fn add_rejects_existing_and_empty() {
        let service = PropertyManagerDataService::new();
        service.add("X", manager_with_bank(1)).unwrap();
        assert_eq!(
            service.add("X", manager_with_bank(2)),
            Err(DataServiceError::AlreadyExists("X".to_string()))
        );
        assert_eq!(
            service.add("  ", manager_with_bank(2)),
            Err(DataServiceError::EmptyName)
        );
        assert_eq!(service.size(), 1);
    }

    #[test]
    fn add_or_replace_swaps_entry() {
        let service = PropertyManagerDataService::new();
        let first = manager_with_bank(1);
        service.add_or_replace("X", Arc::clone(&first)).unwrap();
        first.write().set_property("bank", 5).unwrap();

        service.add_or_replace("X", manager_with_bank(2)).unwrap();
        let current = service.retrieve("X").unwrap();
        assert_eq!(current.read().get_value::<i32>("bank").unwrap(), 2);

        // The replaced manager lives on for its holder
        assert_eq!(first.read().get_value::<i32>("bank").unwrap(), 5);
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn holders_share_mutations() {
        let service = PropertyManagerDataService::new();
        service.add("shared", manager_with_bank(1)).unwrap();
        let a = service.retrieve("shared").unwrap();
        let b = service.retrieve("shared").unwrap();
        a.write().set_property("bank", 3).unwrap();
        assert_eq!(b.read().get_value::<i32>("bank").unwrap(), 3);
    }

    #[test]
    fn retrieve_or_insert_creates_once() {
        let service = PropertyManagerDataService::new();
        let first = service
            .retrieve_or_insert_with("__pd_reduction_properties", PropertyManager::new)
            .unwrap();
        first.write().declare_value("bank", 4, "").unwrap();
        let second = service
            .retrieve_or_insert_with("__pd_reduction_properties", || {
                panic!("must not create twice")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn hidden_names_are_filtered() {
        let service = PropertyManagerDataService::new();
        service.add("visible", manager_with_bank(1)).unwrap();
        service.add("__hidden", manager_with_bank(1)).unwrap();
        service.add("another", manager_with_bank(1)).unwrap();
        assert_eq!(service.names(false), vec!["another", "visible"]);
        assert_eq!(service.names(true), vec!["__hidden", "another", "visible"]);
    }

    #[test]
    fn remove_and_clear() {
        let service = PropertyManagerDataService::new();
        service.add("a", manager_with_bank(1)).unwrap();
        service.add("b", manager_with_bank(1)).unwrap();
        assert!(service.remove("a").is_some());
        assert!(service.remove("a").is_none());
        service.clear();
        assert_eq!(service.size(), 0);
    }

    #[test]
    fn remove_if_same_spares_replacements() {
        let service = PropertyManagerDataService::new();
        let first = manager_with_bank(1);
        service.add("a", Arc::clone(&first)).unwrap();
        service.add_or_replace("a", manager_with_bank(2)).unwrap();

        assert!(!service.remove_if_same("a", &first));
        assert!(service.does_exist("a"));
        let current = service.retrieve("a").unwrap();
        assert!(service.remove_if_same("a", &current));
        assert!(!service.does_exist("a"));
    }
}
