//! Identifiers for host windows and content surfaces.
//!
//! Hosts are keyed by a generational slotmap key: a destroyed host's id never
//! resolves again, even after its slot is reused. Surfaces are keyed by a
//! string so that well-known surfaces (the search bar, the settings panel)
//! can be addressed by name from the UI layer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slotmap::new_key_type;

new_key_type! {
    /// Opaque handle of a top-level host window.
    ///
    /// # Related
    ///
    /// - [`SurfaceId`] - Identifies the surfaces a host owns
    pub struct HostId;
}

impl HostId {
    /// Convert the id to a raw u64 value for the IPC boundary.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Rebuild an id from a raw value produced by [`HostId::as_raw`].
    ///
    /// This does not check that the host still exists.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.as_raw())
    }
}

impl Serialize for HostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for HostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(HostId::from_raw)
    }
}

/// Identifier of a content surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(String);

impl SurfaceId {
    /// Create a surface id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SurfaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_host_id_raw_round_trip() {
        let mut map: SlotMap<HostId, ()> = SlotMap::with_key();
        let id = map.insert(());
        assert_eq!(HostId::from_raw(id.as_raw()), id);
    }

    #[test]
    fn test_host_id_is_generational() {
        let mut map: SlotMap<HostId, ()> = SlotMap::with_key();
        let first = map.insert(());
        map.remove(first);
        let second = map.insert(());
        assert_ne!(first, second);
        assert!(!map.contains_key(first));
    }

    #[test]
    fn test_host_id_serializes_as_number() {
        let mut map: SlotMap<HostId, ()> = SlotMap::with_key();
        let id = map.insert(());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.as_raw().to_string());
        let back: HostId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_surface_id_display_and_serde() {
        let id = SurfaceId::from("plugin-content-1");
        assert_eq!(id.to_string(), "plugin-content-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"plugin-content-1\"");
    }
}
