//! Melee hit resolution against world breakables
//!
//! A swing covers a circular sector centred on the attacker's registry
//! position: radius `weapon.range`, half-angle from the weapon's swing class.
//! Every breakable inside the sector is hit; there is no early exit.

use crate::players::PlayerRegistry;
use crate::world::WorldData;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    bearing, distance, in_swing_arc, normalize_angle, AttackInput, BreakableId, ConnectionId,
    DroppedItem, ServerEvent, WeaponUsed,
};

/// Result of one resolved swing
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    /// Ids of every breakable inside the arc, in world order
    pub hits: Vec<BreakableId>,
    pub destroyed: Vec<BreakableId>,
    /// Events to broadcast to all connections, in emission order.
    /// Always ends with exactly one `weaponUsed`.
    pub events: Vec<ServerEvent>,
}

/// Whether a target at `target` falls inside a swing from `origin` facing `facing`.
pub fn swing_hits(
    origin: (f64, f64),
    facing: f64,
    target: (f64, f64),
    range: f64,
    half_angle: f64,
) -> bool {
    let delta = normalize_angle(bearing(origin, target) - facing);
    in_swing_arc(distance(origin, target), delta, range, half_angle)
}

/// Resolves a melee attack from `attacker`.
///
/// Returns `None` when the attacker is no longer registered or the weapon key
/// is unknown; nothing is mutated in that case. The client-supplied position
/// in `attack` is ignored in favour of the registry copy.
pub fn resolve_attack<R: Rng + ?Sized>(
    players: &PlayerRegistry,
    world: &mut WorldData,
    attacker: ConnectionId,
    attack: &AttackInput,
    rng: &mut R,
) -> Option<AttackOutcome> {
    let Some(player) = players.get(attacker) else {
        debug!("Dropping attack from unknown player {}", attacker);
        return None;
    };
    let Some(weapon) = world.weapon(&attack.weapon) else {
        debug!(
            "Dropping attack from player {} with unknown weapon {:?}",
            attacker, attack.weapon
        );
        return None;
    };

    let origin = player.position();
    let range = weapon.range;
    let damage = weapon.damage;
    let half_angle = weapon.swing_half_angle();
    let weapon_name = weapon.name.clone();

    let hits: Vec<BreakableId> = world
        .breakables()
        .iter()
        .filter(|breakable| {
            swing_hits(
                origin,
                attack.angle,
                (breakable.x, breakable.y),
                range,
                half_angle,
            )
        })
        .map(|breakable| breakable.id.clone())
        .collect();

    let mut destroyed = Vec::new();
    let mut events = Vec::new();

    for id in &hits {
        let Some(breakable) = world.damage_breakable(id, damage) else {
            continue;
        };
        if !breakable.is_destroyed() {
            debug!("Breakable {} hit by player {}, {} hp left", id, attacker, breakable.hp);
            continue;
        }

        let Some(breakable) = world.remove_breakable(id) else {
            continue;
        };
        if let Some(item) = breakable.drops.choose(rng) {
            events.push(ServerEvent::ItemDropped(DroppedItem {
                x: breakable.x,
                y: breakable.y,
                item: item.clone(),
            }));
        }
        info!("Breakable {} destroyed by player {}", id, attacker);
        events.push(ServerEvent::BreakableDestroyed(breakable.id));
        destroyed.push(id.clone());
    }

    events.push(ServerEvent::WeaponUsed(WeaponUsed {
        attacker_id: attacker,
        weapon_name,
        angle: attack.angle,
    }));

    Some(AttackOutcome {
        hits,
        destroyed,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{Breakable, Swing, WeaponDefinition};
    use std::collections::BTreeMap;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

    fn world_with(breakables: Vec<Breakable>) -> WorldData {
        let mut weapons = BTreeMap::new();
        weapons.insert(
            "sword".to_string(),
            WeaponDefinition::melee("Sword", Swing::Wide, 50.0, 10.0),
        );
        weapons.insert(
            "spear".to_string(),
            WeaponDefinition::melee("Spear", Swing::Long, 80.0, 4.0),
        );
        WorldData::new(weapons, breakables)
    }

    fn players_at(id: ConnectionId, x: f64, y: f64) -> PlayerRegistry {
        let mut players = PlayerRegistry::new();
        players.register(id, &mut StdRng::seed_from_u64(1));
        players.update_position(id, x, y);
        players
    }

    fn swing(weapon: &str, angle: f64) -> AttackInput {
        AttackInput {
            weapon: weapon.to_string(),
            angle,
            x: None,
            y: None,
        }
    }

    fn weapon_used_count(outcome: &AttackOutcome) -> usize {
        outcome
            .events
            .iter()
            .filter(|event| matches!(event, ServerEvent::WeaponUsed(_)))
            .count()
    }

    #[test]
    fn test_swing_hits_range_boundary_inclusive() {
        let half = Swing::Wide.half_angle();
        assert!(swing_hits((0.0, 0.0), 0.0, (50.0, 0.0), 50.0, half));
        assert!(!swing_hits((0.0, 0.0), 0.0, (50.01, 0.0), 50.0, half));
        assert!(swing_hits((10.0, 10.0), 0.0, (60.0, 10.0), 50.0, half));
    }

    #[test]
    fn test_swing_hits_angle_boundary_inclusive() {
        // Bearing to (0, 40) is exactly π/2, the half-angle of a long swing.
        let half = Swing::Long.half_angle();
        assert!(swing_hits((0.0, 0.0), 0.0, (0.0, 40.0), 50.0, half));
        assert!(swing_hits((0.0, 0.0), 0.0, (0.0, -40.0), 50.0, half));
        assert!(!swing_hits((0.0, 0.0), 0.0, (-0.01, 40.0), 50.0, half));
        assert!(!swing_hits((0.0, 0.0), 0.0, (0.0, 40.0), 50.0, FRAC_PI_3));
    }

    #[test]
    fn test_swing_hits_across_pi_boundary() {
        // Facing just below +π, target just past -π: the raw difference is ~2π.
        let half = Swing::Short.half_angle();
        assert!(swing_hits((0.0, 0.0), PI - 0.05, (-30.0, -1.0), 50.0, half));
        assert!(swing_hits((0.0, 0.0), -PI + 0.05, (-30.0, 1.0), 50.0, half));
        assert!(!swing_hits((0.0, 0.0), -PI + 0.05, (30.0, 0.0), 50.0, half));
    }

    #[test]
    fn test_destroys_breakable_and_drops_loot() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(5u64, 40.0, 0.0, 10.0).with_drops(&["coin"])]);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

        assert_eq!(outcome.hits, vec![BreakableId::Number(5)]);
        assert_eq!(outcome.destroyed, vec![BreakableId::Number(5)]);
        assert_eq!(
            outcome.events,
            vec![
                ServerEvent::ItemDropped(DroppedItem {
                    x: 40.0,
                    y: 0.0,
                    item: "coin".to_string(),
                }),
                ServerEvent::BreakableDestroyed(BreakableId::Number(5)),
                ServerEvent::WeaponUsed(WeaponUsed {
                    attacker_id: 1,
                    weapon_name: "Sword".to_string(),
                    angle: 0.0,
                }),
            ]
        );
        assert!(world.breakables().is_empty());
    }

    #[test]
    fn test_out_of_range_breakable_untouched() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(6u64, 0.0, 60.0, 10.0)]);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome =
            resolve_attack(&players, &mut world, 1, &swing("sword", FRAC_PI_2), &mut rng).unwrap();

        assert!(outcome.hits.is_empty());
        assert!(outcome.destroyed.is_empty());
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(world.breakables()[0].hp, 10.0);
    }

    #[test]
    fn test_damage_without_destruction() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(8u64, 20.0, 0.0, 25.0).with_drops(&["gem"])]);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

        assert_eq!(outcome.hits.len(), 1);
        assert!(outcome.destroyed.is_empty());
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(world.breakables()[0].hp, 15.0);
    }

    #[test]
    fn test_breakable_without_drops_emits_no_item() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(9u64, 10.0, 0.0, 5.0)]);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

        assert!(!outcome
            .events
            .iter()
            .any(|event| matches!(event, ServerEvent::ItemDropped(_))));
        assert_eq!(outcome.destroyed.len(), 1);
    }

    #[test]
    fn test_one_weapon_used_per_attack_regardless_of_hits() {
        let mut rng = StdRng::seed_from_u64(3);

        for hit_count in [0usize, 1, 3] {
            let players = players_at(1, 0.0, 0.0);
            let breakables = (0..3u64)
                .map(|i| {
                    let x = if (i as usize) < hit_count { 10.0 + i as f64 * 10.0 } else { -40.0 };
                    Breakable::new(i, x, 0.0, 10.0).with_drops(&["coin", "wood"])
                })
                .collect();
            let mut world = world_with(breakables);

            let outcome =
                resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

            assert_eq!(outcome.hits.len(), hit_count);
            assert_eq!(outcome.destroyed.len(), hit_count);
            assert_eq!(weapon_used_count(&outcome), 1);
            assert!(matches!(outcome.events.last(), Some(ServerEvent::WeaponUsed(_))));
            assert_eq!(world.breakables().len(), 3 - hit_count);
        }
    }

    #[test]
    fn test_drop_chosen_from_table() {
        let players = players_at(1, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(11);
        let table = ["coin", "wood", "gem"];

        for round in 0..20u64 {
            let mut world = world_with(vec![Breakable::new(round, 10.0, 0.0, 1.0).with_drops(&table)]);
            let outcome =
                resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

            match &outcome.events[0] {
                ServerEvent::ItemDropped(drop) => assert!(table.contains(&drop.item.as_str())),
                other => panic!("Expected itemDropped, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_destroyed_breakable_never_reappears() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(4u64, 30.0, 0.0, 10.0)]);
        let mut rng = StdRng::seed_from_u64(5);

        resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();
        let again = resolve_attack(&players, &mut world, 1, &swing("sword", 0.0), &mut rng).unwrap();

        assert!(again.hits.is_empty());
        assert!(!again
            .events
            .iter()
            .any(|event| matches!(event, ServerEvent::BreakableDestroyed(_))));
        assert!(world.breakable(&BreakableId::Number(4)).is_none());
    }

    #[test]
    fn test_unknown_attacker_aborts() {
        let players = PlayerRegistry::new();
        let mut world = world_with(vec![Breakable::new(1u64, 10.0, 0.0, 10.0)]);
        let mut rng = StdRng::seed_from_u64(5);

        assert!(resolve_attack(&players, &mut world, 42, &swing("sword", 0.0), &mut rng).is_none());
        assert_eq!(world.breakables()[0].hp, 10.0);
    }

    #[test]
    fn test_unknown_weapon_aborts() {
        let players = players_at(1, 0.0, 0.0);
        let mut world = world_with(vec![Breakable::new(1u64, 10.0, 0.0, 10.0)]);
        let mut rng = StdRng::seed_from_u64(5);

        assert!(resolve_attack(&players, &mut world, 1, &swing("banana", 0.0), &mut rng).is_none());
        assert_eq!(world.breakables()[0].hp, 10.0);
    }

    #[test]
    fn test_registry_position_beats_payload_position() {
        let players = players_at(1, 500.0, 500.0);
        let mut world = world_with(vec![Breakable::new(1u64, 10.0, 0.0, 10.0)]);
        let mut rng = StdRng::seed_from_u64(5);
        let attack = AttackInput {
            weapon: "sword".to_string(),
            angle: 0.0,
            x: Some(0.0),
            y: Some(0.0),
        };

        let outcome = resolve_attack(&players, &mut world, 1, &attack, &mut rng).unwrap();
        assert!(outcome.hits.is_empty());
        assert_eq!(world.breakables()[0].hp, 10.0);
    }

    #[test]
    fn test_long_swing_reaches_sides() {
        let players = players_at(1, 100.0, 100.0);
        let mut world = world_with(vec![
            Breakable::new(1u64, 100.0, 170.0, 4.0),
            Breakable::new(2u64, 100.0, 30.0, 4.0),
            Breakable::new(3u64, 30.0, 100.0, 4.0),
        ]);
        let mut rng = StdRng::seed_from_u64(5);

        let outcome = resolve_attack(&players, &mut world, 1, &swing("spear", 0.0), &mut rng).unwrap();

        assert_eq!(
            outcome.hits,
            vec![BreakableId::Number(1), BreakableId::Number(2)]
        );
        assert_eq!(world.breakables().len(), 1);
    }
}
