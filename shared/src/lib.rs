use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, FRAC_PI_6, PI, TAU};
use std::fmt;

pub mod protocol;

pub use protocol::{
    AttackInput, ClientEvent, InitPayload, MoveInput, ProtocolError, ServerEvent, WeaponUsed,
};

pub const SPAWN_MIN_X: f64 = 100.0;
pub const SPAWN_MAX_X: f64 = 700.0;
pub const SPAWN_MIN_Y: f64 = 100.0;
pub const SPAWN_MAX_Y: f64 = 500.0;
pub const MAX_HP: u32 = 100;
pub const MAX_MANA: u32 = 100;
pub const DEFAULT_SPRITE: &str = "/sprites/player.png";

/// Server-assigned identifier of a live connection. Doubles as the player id.
pub type ConnectionId = u32;

/// Key into the item catalog, as listed in a breakable's drop table.
pub type ItemId = String;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: ConnectionId,
    pub x: f64,
    pub y: f64,
    pub hp: u32,
    pub mana: u32,
    pub sprite: String,
}

impl Player {
    pub fn new(id: ConnectionId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            hp: MAX_HP,
            mana: MAX_MANA,
            sprite: DEFAULT_SPRITE.to_string(),
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Width class of a melee swing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Swing {
    Short,
    Wide,
    Long,
    /// Any value the catalog uses that has no dedicated arc.
    Other(String),
}

impl Swing {
    /// Half the angular width of the hit arc, in radians.
    pub fn half_angle(&self) -> f64 {
        match self {
            Swing::Short => FRAC_PI_6,
            Swing::Wide => FRAC_PI_3,
            Swing::Long => FRAC_PI_2,
            Swing::Other(_) => FRAC_PI_4,
        }
    }
}

impl From<String> for Swing {
    fn from(value: String) -> Self {
        match value.as_str() {
            "short" => Swing::Short,
            "wide" => Swing::Wide,
            "long" => Swing::Long,
            _ => Swing::Other(value),
        }
    }
}

impl From<Swing> for String {
    fn from(swing: Swing) -> Self {
        match swing {
            Swing::Short => "short".to_string(),
            Swing::Wide => "wide".to_string(),
            Swing::Long => "long".to_string(),
            Swing::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeaponKind {
    Melee,
    Staff,
    Other(String),
}

impl From<String> for WeaponKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "melee" => WeaponKind::Melee,
            "staff" => WeaponKind::Staff,
            _ => WeaponKind::Other(value),
        }
    }
}

impl From<WeaponKind> for String {
    fn from(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Melee => "melee".to_string(),
            WeaponKind::Staff => "staff".to_string(),
            WeaponKind::Other(value) => value,
        }
    }
}

/// Catalog entry for a weapon or spell.
///
/// Fields the server does not interpret (projectile speed, effect type, ...)
/// are kept in `extra` so clients receive the catalog exactly as loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<Swing>,
    #[serde(default)]
    pub range: f64,
    #[serde(default)]
    pub damage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WeaponKind>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeaponDefinition {
    pub fn melee(name: &str, swing: Swing, range: f64, damage: f64) -> Self {
        Self {
            name: name.to_string(),
            swing: Some(swing),
            range,
            damage,
            color: None,
            kind: Some(WeaponKind::Melee),
            extra: Map::new(),
        }
    }

    /// Half-angle of the swing arc. Weapons without a recognised swing use π/4.
    pub fn swing_half_angle(&self) -> f64 {
        self.swing.as_ref().map_or(FRAC_PI_4, Swing::half_angle)
    }
}

/// Breakable ids appear as numbers or strings in catalogs; both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakableId {
    Number(u64),
    Text(String),
}

impl fmt::Display for BreakableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakableId::Number(id) => write!(f, "{}", id),
            BreakableId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for BreakableId {
    fn from(id: u64) -> Self {
        BreakableId::Number(id)
    }
}

impl From<&str> for BreakableId {
    fn from(id: &str) -> Self {
        BreakableId::Text(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakable {
    pub id: BreakableId,
    pub x: f64,
    pub y: f64,
    pub hp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(default)]
    pub drops: Vec<ItemId>,
}

impl Breakable {
    pub fn new(id: impl Into<BreakableId>, x: f64, y: f64, hp: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            hp,
            max_hp: None,
            sprite: None,
            drops: Vec::new(),
        }
    }

    pub fn with_drops(mut self, drops: &[&str]) -> Self {
        self.drops = drops.iter().map(|item| item.to_string()).collect();
        self
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Loot left behind where a breakable was destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub x: f64,
    pub y: f64,
    pub item: ItemId,
}

/// Wraps an angle difference into `(-π, π]`.
///
/// Values already inside the interval are returned unchanged so boundary
/// comparisons stay exact.
pub fn normalize_angle(delta: f64) -> f64 {
    if delta > -PI && delta <= PI {
        return delta;
    }
    let wrapped = delta.sin().atan2(delta.cos());
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Bearing in radians from `from` to `to`, measured like `atan2(dy, dx)`.
pub fn bearing(from: (f64, f64), to: (f64, f64)) -> f64 {
    (to.1 - from.1).atan2(to.0 - from.0)
}

pub fn distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    (to.0 - from.0).hypot(to.1 - from.1)
}

/// Inclusive hit test for a melee arc: within `range` and within `half_angle`
/// of the facing direction.
pub fn in_swing_arc(distance: f64, delta: f64, range: f64, half_angle: f64) -> bool {
    distance <= range && delta.abs() <= half_angle
}
