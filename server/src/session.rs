//! One running game: players, world, randomness and the outbound queue.
//!
//! Every inbound event is handled to completion before the next one, so the
//! session needs no internal locking. Several sessions can coexist in one
//! process since nothing here is global.

use crate::broadcast::Broadcaster;
use crate::combat::{resolve_attack, AttackOutcome};
use crate::players::PlayerRegistry;
use crate::world::WorldData;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{AttackInput, ClientEvent, ConnectionId, InitPayload, MoveInput, Player, ServerEvent};

pub struct GameSession {
    players: PlayerRegistry,
    world: WorldData,
    rng: StdRng,
    broadcaster: Broadcaster,
}

impl GameSession {
    pub fn new(world: WorldData, broadcaster: Broadcaster) -> Self {
        Self::with_rng(world, broadcaster, StdRng::from_entropy())
    }

    /// Session with a fixed seed so spawns and loot rolls are reproducible.
    pub fn with_seed(world: WorldData, broadcaster: Broadcaster, seed: u64) -> Self {
        Self::with_rng(world, broadcaster, StdRng::seed_from_u64(seed))
    }

    fn with_rng(world: WorldData, broadcaster: Broadcaster, rng: StdRng) -> Self {
        Self {
            players: PlayerRegistry::new(),
            world,
            rng,
            broadcaster,
        }
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn world(&self) -> &WorldData {
        &self.world
    }

    /// Spawns a player for `id`, sends it the world snapshot and announces it to the others.
    pub fn connect(&mut self, id: ConnectionId) -> Player {
        let player = self.players.register(id, &mut self.rng);

        let init = InitPayload {
            id,
            players: self.players.snapshot(),
            breakables: self.world.breakables().to_vec(),
            weapons: self.world.weapons().clone(),
        };
        self.broadcaster.send_to(id, ServerEvent::Init(init));
        self.broadcaster
            .broadcast_except(id, ServerEvent::NewPlayer(player.clone()));

        info!(
            "Player {} joined ({} players online)",
            id,
            self.players.len()
        );
        player
    }

    /// Removes the player for `id` and tells everyone. Returns false if it was already gone.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        if self.players.unregister(id).is_none() {
            debug!("Ignoring disconnect for unknown player {}", id);
            return false;
        }

        self.broadcaster
            .broadcast(ServerEvent::PlayerDisconnected(id));
        info!(
            "Player {} left ({} players online)",
            id,
            self.players.len()
        );
        true
    }

    pub fn handle_move(&mut self, id: ConnectionId, input: &MoveInput) {
        let Some(player) = self.players.update_position(id, input.x, input.y) else {
            debug!("Ignoring move from unknown player {}", id);
            return;
        };
        let moved = player.clone();
        self.broadcaster
            .broadcast_except(id, ServerEvent::PlayerMoved(moved));
    }

    pub fn handle_attack(&mut self, id: ConnectionId, input: &AttackInput) -> Option<AttackOutcome> {
        let outcome = resolve_attack(&self.players, &mut self.world, id, input, &mut self.rng)?;
        for event in &outcome.events {
            self.broadcaster.broadcast(event.clone());
        }
        Some(outcome)
    }

    /// Dispatches one decoded client event.
    pub fn handle_event(&mut self, id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Move(input) => self.handle_move(id, &input),
            ClientEvent::WeaponAttack(input) => {
                self.handle_attack(id, &input);
            }
            ClientEvent::Disconnect => {
                self.disconnect(id);
            }
        }
    }
}
