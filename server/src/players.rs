//! Authoritative registry of connected players
//!
//! This module owns the server-side copy of every player, keyed by the
//! connection that controls it:
//! - Spawning players at a random point inside the spawn rectangle
//! - Position updates coming from client movement
//! - Removal on disconnect, tolerant of duplicate or late cleanups
//! - Consistent snapshots for join-time synchronization
//!
//! Positions stored here are the only ones the combat resolver trusts.

use log::{debug, info};
use rand::Rng;
use shared::{ConnectionId, Player, SPAWN_MAX_X, SPAWN_MAX_Y, SPAWN_MIN_X, SPAWN_MIN_Y};
use std::collections::{BTreeMap, HashMap};

/// Manages every player currently present in the game
///
/// The connection id is the key, so two live players can never share an id.
/// All mutation happens from the single session context; the registry does
/// no locking of its own.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<ConnectionId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Creates a player for a new connection
    ///
    /// The player spawns uniformly inside the spawn rectangle with full
    /// health and mana. Registering an id that is already present returns
    /// the existing player untouched.
    pub fn register<R: Rng + ?Sized>(&mut self, id: ConnectionId, rng: &mut R) -> Player {
        if let Some(existing) = self.players.get(&id) {
            debug!("Player {} already registered", id);
            return existing.clone();
        }

        let x = rng.gen_range(SPAWN_MIN_X..SPAWN_MAX_X);
        let y = rng.gen_range(SPAWN_MIN_Y..SPAWN_MAX_Y);
        let player = Player::new(id, x, y);

        info!("Spawned player {} at ({:.1}, {:.1})", id, x, y);
        self.players.insert(id, player.clone());
        player
    }

    /// Removes a player, returning it if it was present
    ///
    /// Calling this for an unknown id is not an error.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Overwrites the stored position of a registered player
    ///
    /// Messages for connections that are already gone are ignored. No speed
    /// or bounds checks are applied.
    pub fn update_position(&mut self, id: ConnectionId, x: f64, y: f64) -> Option<&Player> {
        let player = self.players.get_mut(&id)?;
        player.x = x;
        player.y = y;
        Some(player)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    /// Copies every player at this instant, ordered by id
    pub fn snapshot(&self) -> BTreeMap<ConnectionId, Player> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{MAX_HP, MAX_MANA};

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_register_spawns_inside_rectangle() {
        let mut registry = PlayerRegistry::new();
        let mut rng = test_rng();

        for id in 1..=200 {
            let player = registry.register(id, &mut rng);
            assert_eq!(player.id, id);
            assert!(player.x >= SPAWN_MIN_X && player.x < SPAWN_MAX_X);
            assert!(player.y >= SPAWN_MIN_Y && player.y < SPAWN_MAX_Y);
            assert_eq!(player.hp, MAX_HP);
            assert_eq!(player.mana, MAX_MANA);
        }

        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn test_register_existing_id_keeps_player() {
        let mut registry = PlayerRegistry::new();
        let mut rng = test_rng();

        let first = registry.register(1, &mut rng);
        registry.update_position(1, 5.0, 6.0);
        let second = registry.register(1, &mut rng);

        assert_ne!(first, second);
        assert_eq!(second.x, 5.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = PlayerRegistry::new();
        let mut rng = test_rng();
        registry.register(7, &mut rng);

        assert!(registry.unregister(7).is_some());
        assert!(registry.unregister(7).is_none());
        assert!(registry.unregister(99).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_position_ignores_unknown_connection() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.update_position(3, 10.0, 10.0).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_position_has_no_bounds_checks() {
        let mut registry = PlayerRegistry::new();
        let mut rng = test_rng();
        registry.register(1, &mut rng);

        let player = registry.update_position(1, -5000.0, 90000.0).unwrap();
        assert_eq!(player.position(), (-5000.0, 90000.0));
        assert_eq!(registry.get(1).unwrap().x, -5000.0);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut registry = PlayerRegistry::new();
        let mut rng = test_rng();
        registry.register(2, &mut rng);
        registry.register(1, &mut rng);

        let snapshot = registry.snapshot();
        registry.update_position(1, 0.0, 0.0);
        registry.unregister(2);

        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_ne!(snapshot[&1].position(), (0.0, 0.0));
        assert!(registry.contains(1));
        assert!(!registry.contains(2));
    }
}
