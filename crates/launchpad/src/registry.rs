//! Authoritative table of surfaces.
//!
//! The registry enforces consistency of its own entries and nothing more: it
//! has no knowledge of native views or layout. Every mutation is synchronous
//! and completes before the next caller can observe the table.

use std::collections::{HashMap, HashSet};

use launchpad_core::logging::targets;
use launchpad_core::{Bounds, HostId, ShellError, ShellResult, SurfaceId};
use parking_lot::Mutex;

use crate::surface::{Surface, SurfaceState};

/// Where a surface was before it entered transit.
#[derive(Debug, Clone, Copy)]
struct TransitOrigin {
    host_id: HostId,
    state: SurfaceState,
}

#[derive(Default)]
struct RegistryInner {
    surfaces: HashMap<SurfaceId, Surface>,
    /// Ids that were registered once and have since been removed.
    tombstones: HashSet<SurfaceId>,
    transit: HashMap<SurfaceId, TransitOrigin>,
}

/// Map of surface id to owning host, bounds, kind and lifecycle state.
#[derive(Default)]
pub struct SurfaceRegistry {
    inner: Mutex<RegistryInner>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface. Fails with [`ShellError::DuplicateId`] if the id is live.
    pub fn register(&self, surface: Surface) -> ShellResult<()> {
        let mut inner = self.inner.lock();
        if inner.surfaces.contains_key(&surface.id) {
            return Err(ShellError::DuplicateId(surface.id));
        }
        inner.tombstones.remove(&surface.id);
        tracing::debug!(
            target: targets::REGISTRY,
            surface = %surface.id,
            kind = ?surface.kind,
            host = ?surface.host_id,
            "surface registered"
        );
        inner.surfaces.insert(surface.id.clone(), surface);
        Ok(())
    }

    /// Remove a surface.
    ///
    /// Removing an id that was already removed is a no-op; removing an id
    /// that was never registered fails with [`ShellError::SurfaceNotFound`].
    pub fn unregister(&self, id: &SurfaceId) -> ShellResult<Option<Surface>> {
        let mut inner = self.inner.lock();
        match inner.surfaces.remove(id) {
            Some(mut surface) => {
                inner.transit.remove(id);
                inner.tombstones.insert(id.clone());
                surface.state = SurfaceState::Destroyed;
                tracing::debug!(target: targets::REGISTRY, surface = %id, "surface unregistered");
                Ok(Some(surface))
            }
            None if inner.tombstones.contains(id) => Ok(None),
            None => Err(ShellError::SurfaceNotFound(id.clone())),
        }
    }

    /// A copy of the entry for `id`.
    pub fn get(&self, id: &SurfaceId) -> Option<Surface> {
        self.inner.lock().surfaces.get(id).cloned()
    }

    /// Like [`get`](Self::get), but a missing surface is an error.
    pub fn require(&self, id: &SurfaceId) -> ShellResult<Surface> {
        self.get(id).ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))
    }

    pub fn contains(&self, id: &SurfaceId) -> bool {
        self.inner.lock().surfaces.contains_key(id)
    }

    /// Surfaces owned by `host_id`, ordered by z-order.
    pub fn list_by_host(&self, host_id: HostId) -> Vec<Surface> {
        let inner = self.inner.lock();
        let mut owned: Vec<Surface> = inner
            .surfaces
            .values()
            .filter(|surface| surface.host_id == Some(host_id))
            .cloned()
            .collect();
        owned.sort_by_key(|surface| surface.z_order);
        owned
    }

    /// Atomically move a surface to another host.
    ///
    /// Rejects surfaces that are mid-migration, so a surface can never be
    /// claimed by two hosts at once.
    pub fn reassign_host(&self, id: &SurfaceId, new_host: HostId) -> ShellResult<()> {
        let mut inner = self.inner.lock();
        let surface = inner
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))?;
        if surface.is_migrating() {
            return Err(ShellError::OperationInProgress(id.clone()));
        }
        let previous = surface.host_id.replace(new_host);
        tracing::debug!(
            target: targets::REGISTRY,
            surface = %id,
            from = ?previous,
            to = %new_host,
            "surface reassigned"
        );
        Ok(())
    }

    /// Take a surface out of its host for the duration of a relocation.
    ///
    /// The surface becomes [`SurfaceState::Migrating`] with no owning host.
    /// Returns the host it left.
    pub fn begin_transit(&self, id: &SurfaceId) -> ShellResult<HostId> {
        let mut inner = self.inner.lock();
        let surface = inner
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))?;
        if surface.is_migrating() {
            return Err(ShellError::OperationInProgress(id.clone()));
        }
        let Some(host_id) = surface.host_id.take() else {
            return Err(ShellError::invariant(format!(
                "surface {id} has no host but is not migrating"
            )));
        };
        let origin = TransitOrigin {
            host_id,
            state: surface.state,
        };
        surface.state = SurfaceState::Migrating;
        inner.transit.insert(id.clone(), origin);
        tracing::trace!(target: targets::REGISTRY, surface = %id, from = %host_id, "surface in transit");
        Ok(host_id)
    }

    /// Commit a relocation: the surface now belongs to `host_id`.
    pub fn complete_transit(&self, id: &SurfaceId, host_id: HostId) -> ShellResult<()> {
        let mut inner = self.inner.lock();
        let origin = inner.transit.remove(id);
        let surface = inner
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))?;
        surface.host_id = Some(host_id);
        surface.state = match origin.map(|origin| origin.state) {
            Some(SurfaceState::Hidden) => SurfaceState::Hidden,
            _ => SurfaceState::Active,
        };
        tracing::trace!(target: targets::REGISTRY, surface = %id, to = %host_id, "transit completed");
        Ok(())
    }

    /// Roll a relocation back, restoring the previous host and state.
    pub fn abort_transit(&self, id: &SurfaceId) -> ShellResult<HostId> {
        let mut inner = self.inner.lock();
        let origin = inner
            .transit
            .remove(id)
            .ok_or_else(|| ShellError::invariant(format!("surface {id} is not in transit")))?;
        let surface = inner
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))?;
        surface.host_id = Some(origin.host_id);
        surface.state = origin.state;
        tracing::trace!(target: targets::REGISTRY, surface = %id, host = %origin.host_id, "transit aborted");
        Ok(origin.host_id)
    }

    /// Surfaces currently in transit out of `host_id`.
    pub fn in_transit_from(&self, host_id: HostId) -> Vec<SurfaceId> {
        let inner = self.inner.lock();
        let mut ids: Vec<SurfaceId> = inner
            .transit
            .iter()
            .filter(|(_, origin)| origin.host_id == host_id)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn set_bounds(&self, id: &SurfaceId, bounds: Bounds) -> ShellResult<()> {
        self.update(id, |surface| surface.bounds = bounds)
    }

    pub fn set_state(&self, id: &SurfaceId, state: SurfaceState) -> ShellResult<()> {
        self.update(id, |surface| surface.state = state)
    }

    pub fn set_z_order(&self, id: &SurfaceId, z_order: u32) -> ShellResult<()> {
        self.update(id, |surface| surface.z_order = z_order)
    }

    fn update(&self, id: &SurfaceId, f: impl FnOnce(&mut Surface)) -> ShellResult<()> {
        let mut inner = self.inner.lock();
        let surface = inner
            .surfaces
            .get_mut(id)
            .ok_or_else(|| ShellError::SurfaceNotFound(id.clone()))?;
        f(surface);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().surfaces.is_empty()
    }

    /// Ids of every live surface, sorted.
    pub fn ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.inner.lock().surfaces.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// A copy of every live entry, sorted by id.
    pub fn snapshot(&self) -> Vec<Surface> {
        let mut surfaces: Vec<Surface> = self.inner.lock().surfaces.values().cloned().collect();
        surfaces.sort_by(|a, b| a.id.cmp(&b.id));
        surfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ContentSource, SurfaceKind};
    use slotmap::SlotMap;

    fn hosts() -> (HostId, HostId) {
        let mut map: SlotMap<HostId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    fn plugin(id: &str, host: HostId) -> Surface {
        Surface::new(
            SurfaceId::from(id),
            host,
            SurfaceKind::PluginContent,
            ContentSource::local("index.html"),
        )
    }

    #[test]
    fn test_register_duplicate() {
        let (h1, _) = hosts();
        let registry = SurfaceRegistry::new();
        registry.register(plugin("plugin-content-1", h1)).unwrap();
        let err = registry.register(plugin("plugin-content-1", h1)).unwrap_err();
        assert_eq!(err, ShellError::DuplicateId(SurfaceId::from("plugin-content-1")));
    }

    #[test]
    fn test_unregister_semantics() {
        let (h1, _) = hosts();
        let registry = SurfaceRegistry::new();
        let id = SurfaceId::from("plugin-content-1");

        assert!(registry.unregister(&id).unwrap_err().is_not_found());

        registry.register(plugin("plugin-content-1", h1)).unwrap();
        let removed = registry.unregister(&id).unwrap().unwrap();
        assert_eq!(removed.state, SurfaceState::Destroyed);
        assert_eq!(registry.unregister(&id).unwrap(), None);

        // A removed id may be registered again.
        registry.register(plugin("plugin-content-1", h1)).unwrap();
        assert!(registry.contains(&id));
    }

    #[test]
    fn test_list_by_host_orders_by_z() {
        let (h1, h2) = hosts();
        let registry = SurfaceRegistry::new();
        registry.register(plugin("b", h1)).unwrap();
        registry.register(plugin("a", h1)).unwrap();
        registry.register(plugin("c", h2)).unwrap();
        registry.set_z_order(&SurfaceId::from("b"), 2).unwrap();
        registry.set_z_order(&SurfaceId::from("a"), 1).unwrap();

        let ids: Vec<_> = registry.list_by_host(h1).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SurfaceId::from("a"), SurfaceId::from("b")]);
    }

    #[test]
    fn test_reassign_rejects_migrating() {
        let (h1, h2) = hosts();
        let registry = SurfaceRegistry::new();
        let id = SurfaceId::from("p");
        registry.register(plugin("p", h1)).unwrap();

        registry.reassign_host(&id, h2).unwrap();
        assert_eq!(registry.get(&id).unwrap().host_id, Some(h2));

        registry.begin_transit(&id).unwrap();
        assert_eq!(
            registry.reassign_host(&id, h1).unwrap_err(),
            ShellError::OperationInProgress(id.clone())
        );
    }

    #[test]
    fn test_transit_commit_and_abort() {
        let (h1, h2) = hosts();
        let registry = SurfaceRegistry::new();
        let id = SurfaceId::from("p");
        registry.register(plugin("p", h1)).unwrap();
        registry.set_state(&id, SurfaceState::Active).unwrap();

        assert_eq!(registry.begin_transit(&id).unwrap(), h1);
        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.host_id, None);
        assert_eq!(entry.state, SurfaceState::Migrating);
        assert!(registry.list_by_host(h1).is_empty());

        assert_eq!(registry.abort_transit(&id).unwrap(), h1);
        assert_eq!(registry.get(&id).unwrap().host_id, Some(h1));
        assert_eq!(registry.get(&id).unwrap().state, SurfaceState::Active);

        registry.begin_transit(&id).unwrap();
        registry.complete_transit(&id, h2).unwrap();
        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.host_id, Some(h2));
        assert_eq!(entry.state, SurfaceState::Active);
    }

    #[test]
    fn test_abort_without_transit_is_invariant_violation() {
        let (h1, _) = hosts();
        let registry = SurfaceRegistry::new();
        registry.register(plugin("p", h1)).unwrap();
        assert!(matches!(
            registry.abort_transit(&SurfaceId::from("p")),
            Err(ShellError::InvariantViolation(_))
        ));
    }
}
