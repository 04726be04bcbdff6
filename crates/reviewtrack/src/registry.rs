// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Entity registry: the list of monitored businesses.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::types::{Entity, TrackError, TrackResult};

/// Source of the monitored entity list.
pub trait EntityRegistry: Send + Sync {
    fn list_entities(&self) -> TrackResult<Vec<Entity>>;
    /// Replace the whole list.
    fn save(&self, entities: &[Entity]) -> TrackResult<()>;

    /// Insert `entity`, or replace the entry with the same id.
    fn upsert(&self, entity: Entity) -> TrackResult<()> {
        entity.validate()?;
        let mut entities = self.list_entities()?;
        match entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => entities.push(entity),
        }
        self.save(&entities)
    }

    /// Toggle whether an entity takes part in check cycles.
    fn set_active(&self, id: &str, active: bool) -> TrackResult<()> {
        let mut entities = self.list_entities()?;
        let entity = entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| TrackError::NotFound(id.to_string()))?;
        entity.active = active;
        self.save(&entities)
    }
}

/// Registry stored as a single pretty-printed JSON array.
pub struct JsonEntityRegistry {
    path: PathBuf,
}

impl JsonEntityRegistry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntityRegistry for JsonEntityRegistry {
    fn list_entities(&self) -> TrackResult<Vec<Entity>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, entities: &[Entity]) -> TrackResult<()> {
        for entity in entities {
            entity.validate()?;
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entities)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process registry.
#[derive(Default)]
pub struct MemoryEntityRegistry {
    entities: RwLock<Vec<Entity>>,
}

impl MemoryEntityRegistry {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: RwLock::new(entities),
        }
    }
}

impl EntityRegistry for MemoryEntityRegistry {
    fn list_entities(&self) -> TrackResult<Vec<Entity>> {
        self.entities
            .read()
            .map(|e| e.clone())
            .map_err(|_| TrackError::Io(std::io::Error::other("registry lock poisoned")))
    }

    fn save(&self, entities: &[Entity]) -> TrackResult<()> {
        let mut guard = self
            .entities
            .write()
            .map_err(|_| TrackError::Io(std::io::Error::other("registry lock poisoned")))?;
        *guard = entities.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_registry() {
        let dir = TempDir::new().unwrap();
        let reg = JsonEntityRegistry::new(dir.path().join("entities.json"));
        assert!(reg.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let dir = TempDir::new().unwrap();
        let reg = JsonEntityRegistry::new(dir.path().join("nested/entities.json"));

        reg.upsert(Entity::new("cafe", "Cafe").with_place_id("p1"))
            .unwrap();
        reg.upsert(Entity::new("bar", "Bar")).unwrap();
        reg.upsert(Entity::new("cafe", "Cafe Renamed").with_place_id("p1"))
            .unwrap();

        let all = reg.list_entities().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Cafe Renamed");
    }

    #[test]
    fn test_set_active() {
        let reg = MemoryEntityRegistry::new(vec![Entity::new("cafe", "Cafe")]);
        reg.set_active("cafe", false).unwrap();
        assert!(!reg.list_entities().unwrap()[0].active);

        let err = reg.set_active("ghost", true).unwrap_err();
        assert!(matches!(err, TrackError::NotFound(_)));
    }

    #[test]
    fn test_upsert_rejects_invalid_entity() {
        let reg = MemoryEntityRegistry::default();
        assert!(reg.upsert(Entity::new("", "nameless")).is_err());
        assert!(reg.list_entities().unwrap().is_empty());
    }
}
