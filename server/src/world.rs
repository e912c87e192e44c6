//! World data: the weapon catalog and the live set of breakables
//!
//! Both catalogs are read once at startup. The weapon catalog is read-only
//! afterwards; breakables lose hit points and disappear as they are destroyed.

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Breakable, BreakableId, WeaponDefinition};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const WEAPON_CATALOG: &str = "spells.json";
pub const BREAKABLE_CATALOG: &str = "breakables.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct WorldData {
    weapons: BTreeMap<String, WeaponDefinition>,
    breakables: Vec<Breakable>,
}

impl WorldData {
    /// Builds a world from already parsed catalogs.
    ///
    /// Weapons without a display name take their catalog key. Breakables that
    /// repeat an earlier id are dropped so every live id is unique.
    pub fn new(weapons: BTreeMap<String, WeaponDefinition>, breakables: Vec<Breakable>) -> Self {
        let weapons = weapons
            .into_iter()
            .map(|(key, mut weapon)| {
                if weapon.name.is_empty() {
                    weapon.name = key.clone();
                }
                (key, weapon)
            })
            .collect();

        let mut seen = HashSet::new();
        let breakables = breakables
            .into_iter()
            .filter(|breakable| {
                let fresh = seen.insert(breakable.id.clone());
                if !fresh {
                    warn!("Ignoring duplicate breakable id {}", breakable.id);
                }
                fresh
            })
            .collect();

        Self {
            weapons,
            breakables,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads both catalogs, preferring `primary` and falling back to `fallback`.
    ///
    /// Each catalog is resolved on its own. A catalog that cannot be read
    /// from either directory is replaced by an empty one; startup never fails
    /// because of missing data. Inside a readable catalog, an entry with the
    /// wrong shape is skipped and the rest are kept.
    pub fn load(primary: &Path, fallback: &Path) -> Self {
        let dirs = [primary, fallback];
        let weapons = load_catalog::<BTreeMap<String, Value>>(WEAPON_CATALOG, &dirs)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, raw)| {
                let weapon = parse_entry(WEAPON_CATALOG, &key, raw)?;
                Some((key, weapon))
            })
            .collect::<BTreeMap<_, _>>();
        let breakables = load_catalog::<Vec<Value>>(BREAKABLE_CATALOG, &dirs)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| parse_entry(BREAKABLE_CATALOG, &index, raw))
            .collect::<Vec<Breakable>>();

        info!(
            "Loaded {} weapon definitions and {} breakables",
            weapons.len(),
            breakables.len()
        );
        Self::new(weapons, breakables)
    }

    pub fn weapon(&self, key: &str) -> Option<&WeaponDefinition> {
        self.weapons.get(key)
    }

    pub fn weapons(&self) -> &BTreeMap<String, WeaponDefinition> {
        &self.weapons
    }

    /// Live breakables in catalog order.
    pub fn breakables(&self) -> &[Breakable] {
        &self.breakables
    }

    pub fn breakable(&self, id: &BreakableId) -> Option<&Breakable> {
        self.breakables.iter().find(|breakable| &breakable.id == id)
    }

    /// Subtracts `amount` from a live breakable and returns it.
    pub fn damage_breakable(&mut self, id: &BreakableId, amount: f64) -> Option<&Breakable> {
        let breakable = self
            .breakables
            .iter_mut()
            .find(|breakable| &breakable.id == id)?;
        breakable.hp -= amount;
        Some(breakable)
    }

    /// Removes the breakable with `id` from the live set.
    ///
    /// There is no respawn, so a removed id is never served again.
    pub fn remove_breakable(&mut self, id: &BreakableId) -> Option<Breakable> {
        let index = self
            .breakables
            .iter()
            .position(|breakable| &breakable.id == id)?;
        Some(self.breakables.remove(index))
    }
}

fn load_catalog<T: DeserializeOwned>(file_name: &str, dirs: &[&Path]) -> Option<T> {
    for dir in dirs {
        let path = dir.join(file_name);
        match read_catalog(&path) {
            Ok(catalog) => {
                debug!("Read catalog {}", path.display());
                return Some(catalog);
            }
            Err(e) => warn!("{}", e),
        }
    }

    warn!("No usable {} found, starting with an empty catalog", file_name);
    None
}

fn read_catalog<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_entry<T: DeserializeOwned>(file_name: &str, entry: &dyn Display, raw: Value) -> Option<T> {
    match serde_json::from_value(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Skipping entry {} in {}: {}", entry, file_name, e);
            None
        }
    }
}
