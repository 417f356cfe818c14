//! Ordered registry of every live game object.

use ctf_core::{EntityId, ObjectKind};

/// Single registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Identifier allocated when the object was registered.
    pub id: EntityId,
    /// Kind of object.
    pub kind: ObjectKind,
}

/// Insertion-ordered collection of the objects alive in the world.
///
/// Removing an entry keeps the relative order of the remaining ones and
/// identifiers are never reused, so scans over the registry are stable across
/// ticks.
#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    entries: Vec<RegistryEntry>,
    next_id: u32,
}

impl ObjectRegistry {
    /// Appends a new object and returns its identifier.
    pub fn register(&mut self, kind: ObjectKind) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push(RegistryEntry { id, kind });
        id
    }

    /// Removes the object, returning its kind if it was registered.
    pub fn remove(&mut self, id: EntityId) -> Option<ObjectKind> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position).kind)
    }

    /// Whether the object is still registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
