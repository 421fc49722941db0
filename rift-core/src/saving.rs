//! The persistence contract, the keyed state store, and save-slot I/O.
//!
//! Any capability that survives a save/load cycle implements
//! [`Persistable`]. A [`StateStore`] holds one blob per entity key, each
//! blob keyed by capability name, plus one reserved entry for the scene the
//! save was taken in. [`SaveSystem`] moves stores to and from `<slot>.sav`
//! files: a missing file is an empty store, a corrupt file is an error that
//! must surface, and saving merges over the existing store so entities from
//! other scenes keep their state.

use crate::value::SaveValue;
use crate::world::{SceneIndex, World};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Highest store version this build can read.
pub const STORE_VERSION: u32 = 1;

/// A capability whose state survives save/load.
///
/// Restoring is expected to re-fire the capability's own change
/// notifications so dependent views update, and to tolerate malformed blobs
/// by keeping the current state.
pub trait Persistable {
    /// Stable name keying this capability inside an entity's blob.
    fn state_key(&self) -> &'static str;

    fn capture_state(&self) -> SaveValue;

    fn restore_state(&mut self, state: &SaveValue);
}

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt save file {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("save format version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },

    #[error("no per-user data directory available on this platform")]
    NoDataDir,
}

/// One entity's captured state, keyed by capability name.
pub type EntityState = BTreeMap<String, SaveValue>;

/// Everything a save slot holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStore {
    version: u32,
    #[serde(default)]
    last_scene: Option<SceneIndex>,
    #[serde(default)]
    entities: BTreeMap<String, EntityState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION,
            last_scene: None,
            entities: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The scene the most recent capture was taken in.
    pub fn last_scene(&self) -> Option<SceneIndex> {
        self.last_scene
    }

    pub fn entity(&self, key: &str) -> Option<&EntityState> {
        self.entities.get(key)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.last_scene.is_none()
    }

    /// Capture every actor's capabilities, overlaying any state already
    /// stored under the same keys. Entities captured earlier (for example in
    /// another scene) are left untouched, which is what makes save files
    /// accumulate across scene transitions.
    pub fn capture(&mut self, world: &World) {
        for actor in world.actors() {
            let mut blob = EntityState::new();
            for part in actor.persistables() {
                blob.insert(part.state_key().to_string(), part.capture_state());
            }
            self.entities.insert(actor.key().to_string(), blob);
        }
        self.last_scene = Some(world.scene());
    }

    /// Dispatch stored blobs back onto the world's actors.
    ///
    /// Actors missing from the store keep their current state; stored
    /// capabilities the actor no longer has are ignored; stored entities
    /// with no live actor are ignored. Both directions are what keep saves
    /// compatible as scenes evolve.
    pub fn restore(&self, world: &mut World) {
        for actor in world.actors_mut() {
            let Some(blob) = self.entities.get(actor.key()) else {
                continue;
            };
            for part in actor.persistables_mut() {
                if let Some(state) = blob.get(part.state_key()) {
                    part.restore_state(state);
                }
            }
            // Levels are scene-baked and re-derived from restored experience.
            actor.check_level_up();
        }
    }
}

/// Coordinates capture/restore against named save slots on disk.
#[derive(Debug, Clone)]
pub struct SaveSystem {
    save_dir: PathBuf,
}

impl SaveSystem {
    /// Use an explicit save directory. Tests point this at a temp dir.
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
        }
    }

    /// Use the platform-standard per-user data directory for `app_name`.
    pub fn for_app(app_name: &str) -> Result<Self, SaveError> {
        let dirs =
            directories::ProjectDirs::from("", "", app_name).ok_or(SaveError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join("saves")))
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// The on-disk path of a slot: `<dir>/<slot>.sav` with the slot name
    /// sanitized for the filesystem.
    pub fn path_for_slot(&self, slot: &str) -> PathBuf {
        let sanitized: String = slot
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.save_dir.join(format!("{sanitized}.sav"))
    }

    /// Capture the world over the slot's existing contents and write it
    /// back.
    pub async fn save(&self, slot: &str, world: &World) -> Result<(), SaveError> {
        let mut store = self.load_store(slot).await?;
        store.capture(world);
        self.write_store(slot, &store).await?;
        info!(slot, entities = store.entity_count(), "saved");
        Ok(())
    }

    /// Restore the slot's contents onto the world. A never-saved slot
    /// restores nothing and is not an error.
    pub async fn load(&self, slot: &str, world: &mut World) -> Result<(), SaveError> {
        let store = self.load_store(slot).await?;
        store.restore(world);
        info!(slot, entities = store.entity_count(), "loaded");
        Ok(())
    }

    /// Read just the reserved scene entry of a slot.
    pub async fn peek_scene(&self, slot: &str) -> Result<Option<SceneIndex>, SaveError> {
        Ok(self.load_store(slot).await?.last_scene())
    }

    /// Read a slot into memory. Missing file → empty store; unreadable or
    /// unparsable file → error.
    pub async fn load_store(&self, slot: &str) -> Result<StateStore, SaveError> {
        let path = self.path_for_slot(slot);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(StateStore::new());
            }
            Err(err) => return Err(err.into()),
        };

        let store: StateStore =
            serde_json::from_str(&content).map_err(|source| SaveError::Corrupt { path, source })?;

        if store.version > STORE_VERSION {
            warn!(found = store.version, "save file from a newer build");
            return Err(SaveError::Version {
                found: store.version,
                supported: STORE_VERSION,
            });
        }
        Ok(store)
    }

    /// Write a store to a slot, creating the save directory if needed.
    pub async fn write_store(&self, slot: &str, store: &StateStore) -> Result<(), SaveError> {
        fs::create_dir_all(&self.save_dir).await?;
        let content = serde_json::to_string_pretty(store)?;
        fs::write(self.path_for_slot(slot), content).await?;
        Ok(())
    }
}
