use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;


/// Kinds of campaign entities tracked by the plugin core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Shop,
    Npc,
    Item,
    Location,
    Faction,
    Template,
    Member,
    Project,
    Txn,
}

impl EntityKind {
    /// Identifier prefix for this kind (the `npc` in `npc-3f2a…`).
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Shop => "shop",
            EntityKind::Npc => "npc",
            EntityKind::Item => "item",
            EntityKind::Location => "location",
            EntityKind::Faction => "faction",
            EntityKind::Template => "template",
            EntityKind::Member => "member",
            EntityKind::Project => "project",
            EntityKind::Txn => "txn",
        }
    }

    /// Parse a kind from its identifier prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "shop" => Some(EntityKind::Shop),
            "npc" => Some(EntityKind::Npc),
            "item" => Some(EntityKind::Item),
            "location" => Some(EntityKind::Location),
            "faction" => Some(EntityKind::Faction),
            "template" => Some(EntityKind::Template),
            "member" => Some(EntityKind::Member),
            "project" => Some(EntityKind::Project),
            "txn" => Some(EntityKind::Txn),
            _ => None,
        }
    }

    /// Kinds whose identifiers are always stamped onto the entity's durable
    /// representation, regardless of the configured identity mode.
    pub fn always_persistent(&self) -> bool {
        matches!(
            self,
            EntityKind::Npc | EntityKind::Location | EntityKind::Faction
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Stable entity identifier in `{kind}-{uuid}` format (e.g. `npc-3f2a…`).
///
/// Identifiers are immutable once assigned. The kind prefix always matches
/// the entity's kind.
///
/// # Examples
///
/// ```
/// use chronicle::entity::{EntityId, EntityKind};
///
/// let id = EntityId::generate(EntityKind::Npc);
/// assert_eq!(id.kind(), Some(EntityKind::Npc));
/// assert!(id.as_str().starts_with("npc-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

/// Entity ID parsing errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseIdError {
    /// Empty identifier string
    Empty,
    /// No `-` separator between kind prefix and uuid
    MissingSeparator(String),
    /// Prefix doesn't name a known entity kind
    UnknownKind(String),
    /// Suffix is not a valid UUID
    InvalidUuid(String),
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIdError::Empty => write!(f, "entity id cannot be empty"),
            ParseIdError::MissingSeparator(s) => {
                write!(f, "entity id '{}' missing '-' separator", s)
            }
            ParseIdError::UnknownKind(p) => {
                write!(f, "unknown entity kind prefix '{}'", p)
            }
            ParseIdError::InvalidUuid(s) => {
                write!(f, "entity id suffix '{}' is not a valid uuid", s)
            }
        }
    }
}

impl std::error::Error for ParseIdError {}

impl EntityId {
    /// Generate a fresh random identifier for the given kind.
    ///
    /// Collision probability across 128 random bits is treated as
    /// negligible and not checked.
    pub fn generate(kind: EntityKind) -> Self {
        EntityId(format!("{}-{}", kind.prefix(), Uuid::new_v4()))
    }

    /// The kind encoded in the identifier prefix.
    ///
    /// Returns `None` for identifiers built through serde from a source
    /// that bypassed `FromStr` validation.
    pub fn kind(&self) -> Option<EntityKind> {
        let prefix = self.0.split('-').next().unwrap_or_default();
        EntityKind::from_prefix(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseIdError::Empty);
        }
        let (prefix, rest) = s
            .split_once('-')
            .ok_or_else(|| ParseIdError::MissingSeparator(s.to_string()))?;
        if EntityKind::from_prefix(prefix).is_none() {
            return Err(ParseIdError::UnknownKind(prefix.to_string()));
        }
        if Uuid::parse_str(rest).is_err() {
            return Err(ParseIdError::InvalidUuid(rest.to_string()));
        }
        Ok(EntityId(s.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability shared by every registrable campaign entity: it has a stable
/// identifier and a display name. Registry code is generic over this
/// instead of over loosely-typed records.
pub trait CampaignEntity {
    fn id(&self) -> &EntityId;
    fn name(&self) -> &str;
    fn kind(&self) -> EntityKind;
}

/// Life status of an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcStatus {
    Alive,
    Dead,
    Missing,
    Unknown,
}

/// How an NPC is currently inclined toward the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Hostile,
    Unfriendly,
    Neutral,
    Friendly,
    Helpful,
}

/// A non-player character.
///
/// `party_reputation` is bounded to [-100, 100]; the registry clamps it on
/// every update. `last_interacted` drives the recently-interacted view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: EntityId,
    pub name: String,
    /// Roles this NPC plays (e.g. "villain", "merchant"); lookups test
    /// membership, not equality.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NpcStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_reputation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interacted: Option<DateTime<Utc>>,
}

impl Npc {
    /// New NPC with a generated identifier and no attributes set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Npc),
            name: name.into(),
            roles: Vec::new(),
            faction: None,
            location: None,
            status: None,
            disposition: None,
            party_reputation: None,
            last_interacted: None,
        }
    }
}

impl CampaignEntity for Npc {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Npc
    }
}

/// A shop run by some shopkeeper in the campaign world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-form shop category (e.g. "blacksmith", "apothecary").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_type: Option<String>,
}

impl Shop {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Shop),
            name: name.into(),
            location: None,
            shop_type: None,
        }
    }
}

impl CampaignEntity for Shop {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Shop
    }
}
