//! JSON event protocol spoken over the game websocket.
//!
//! Every frame is an envelope `{"event": <name>, "data": <payload>}`. Inbound
//! frames are decoded in two steps (envelope, then the payload for the named
//! event) so unknown events can be told apart from malformed ones.

use crate::{Breakable, BreakableId, ConnectionId, DroppedItem, Player, WeaponDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
}

/// A melee swing request. `weapon` is the catalog key of the equipped item.
///
/// `x`/`y` are the client's idea of where it stands; the server resolves the
/// swing from its own copy of the player instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackInput {
    pub weapon: String,
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Move(MoveInput),
    WeaponAttack(AttackInput),
    Disconnect,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let event = match envelope.event.as_str() {
            "move" => ClientEvent::Move(serde_json::from_value(envelope.data)?),
            "weaponAttack" => ClientEvent::WeaponAttack(serde_json::from_value(envelope.data)?),
            "disconnect" => ClientEvent::Disconnect,
            _ => return Err(ProtocolError::UnknownEvent(envelope.event)),
        };
        Ok(event)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Move(_) => "move",
            ClientEvent::WeaponAttack(_) => "weaponAttack",
            ClientEvent::Disconnect => "disconnect",
        }
    }
}

/// Join-time snapshot sent only to the connecting client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitPayload {
    pub id: ConnectionId,
    pub players: BTreeMap<ConnectionId, Player>,
    pub breakables: Vec<Breakable>,
    pub weapons: BTreeMap<String, WeaponDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponUsed {
    pub attacker_id: ConnectionId,
    pub weapon_name: String,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Init(InitPayload),
    NewPlayer(Player),
    PlayerMoved(Player),
    PlayerDisconnected(ConnectionId),
    WeaponUsed(WeaponUsed),
    ItemDropped(DroppedItem),
    BreakableDestroyed(BreakableId),
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Init(_) => "init",
            ServerEvent::NewPlayer(_) => "newPlayer",
            ServerEvent::PlayerMoved(_) => "playerMoved",
            ServerEvent::PlayerDisconnected(_) => "playerDisconnected",
            ServerEvent::WeaponUsed(_) => "weaponUsed",
            ServerEvent::ItemDropped(_) => "itemDropped",
            ServerEvent::BreakableDestroyed(_) => "breakableDestroyed",
        }
    }
}
