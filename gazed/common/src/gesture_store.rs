use crate::gesture::GestureProfile;
use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

const GESTURES_FILENAME: &str = "gestures.json";

/// Persisted gesture-name → profile map. The runtime loads all profiles
/// read-only at startup; training saves one profile at a time.
pub struct GestureProfileStore {
    storage_path: PathBuf,
}

impl GestureProfileStore {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_path: storage_dir.join(GESTURES_FILENAME),
        }
    }

    pub fn load_all(&self) -> Result<Vec<GestureProfile>> {
        if !self.storage_path.exists() {
            info!(
                "No gesture profiles at {:?}, starting with an empty set",
                self.storage_path
            );
            return Ok(Vec::new());
        }

        let file = File::open(&self.storage_path).context("Failed to open gesture store")?;
        let reader = BufReader::new(file);
        let map: BTreeMap<String, GestureProfile> =
            serde_json::from_reader(reader).context("Failed to deserialize gesture store")?;
        info!(
            "Loaded {} gesture profile(s) from {:?}",
            map.len(),
            self.storage_path
        );
        Ok(map.into_values().collect())
    }

    /// Insert or replace a single profile, keyed by its name.
    pub fn save(&self, profile: &GestureProfile) -> Result<()> {
        let mut map: BTreeMap<String, GestureProfile> = if self.storage_path.exists() {
            let file = File::open(&self.storage_path).context("Failed to open gesture store")?;
            serde_json::from_reader(BufReader::new(file))
                .context("Failed to deserialize gesture store")?
        } else {
            BTreeMap::new()
        };

        map.insert(profile.name.clone(), profile.clone());

        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create gesture dir: {:?}", parent))?;
            }
        }
        let file = File::create(&self.storage_path).context("Failed to create gesture store")?;
        serde_json::to_writer_pretty(file, &map).context("Failed to serialize gesture store")?;
        info!("Saved gesture profile '{}'", profile.name);
        Ok(())
    }
}
