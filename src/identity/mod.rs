use crate::entity::{EntityId, EntityKind};
use dashmap::DashMap;
use tracing::debug;


/// Where assigned identifiers live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Identifiers exist only in process memory, keyed by source path,
    /// and are discarded on restart.
    Ephemeral,
    /// Identifiers are stamped onto the entity's own durable
    /// representation; the registry is a pass-through.
    Persistent,
}

/// Assigns and resolves stable identifiers for campaign entities.
///
/// In persistent mode the identifier lives inside the entity and this
/// registry only generates missing ones. In ephemeral mode it keeps an
/// in-memory `(kind, path)` → id map so repeat resolutions of the same
/// source file yield the same identifier for the process lifetime.
///
/// Some kinds (NPC, Location, Faction) are always handled persistently
/// even when the registry is configured ephemeral — their ids must
/// survive restarts.
///
/// All operations are total; there are no error paths.
pub struct IdentityRegistry {
    mode: IdMode,
    /// Ephemeral assignments: exactly one id per (kind, path) pair.
    ephemeral: DashMap<(EntityKind, String), EntityId>,
}

impl IdentityRegistry {
    pub fn new(mode: IdMode) -> Self {
        Self {
            mode,
            ephemeral: DashMap::new(),
        }
    }

    pub fn mode(&self) -> IdMode {
        self.mode
    }

    /// Resolve the identifier for an entity loaded from `path`.
    ///
    /// `embedded` is the identifier already stored on the entity, if any.
    /// When a fresh identifier is generated in persistent handling, the
    /// caller is responsible for writing it back onto the entity; the
    /// return value is the only signal.
    ///
    /// An embedded identifier whose kind prefix doesn't match `kind` is
    /// treated as absent and replaced.
    pub fn get_id(&self, kind: EntityKind, path: &str, embedded: Option<&EntityId>) -> EntityId {
        if self.effective_persistent(kind) {
            if let Some(id) = embedded {
                if id.kind() == Some(kind) {
                    return id.clone();
                }
                debug!(
                    id = %id,
                    kind = %kind,
                    "embedded id prefix mismatch, generating replacement"
                );
            }
            return Self::generate_id(kind);
        }

        // Ephemeral: one id per (kind, path), stable for the process lifetime.
        self.ephemeral
            .entry((kind, path.to_string()))
            .or_insert_with(|| Self::generate_id(kind))
            .value()
            .clone()
    }

    /// Record an identifier for `path`.
    ///
    /// No-op in persistent handling — the id lives on the entity, which
    /// is owned elsewhere.
    pub fn set_id(&self, kind: EntityKind, path: &str, id: EntityId) {
        if self.effective_persistent(kind) {
            return;
        }
        self.ephemeral.insert((kind, path.to_string()), id);
    }

    /// Produce a fresh `{kind}-{uuid}` identifier without recording it.
    pub fn generate_id(kind: EntityKind) -> EntityId {
        EntityId::generate(kind)
    }

    /// Purge all ephemeral assignments. Persistent identifiers live on
    /// the entities themselves and are unaffected.
    pub fn clear(&self) {
        self.ephemeral.clear();
    }

    fn effective_persistent(&self, kind: EntityKind) -> bool {
        self.mode == IdMode::Persistent || kind.always_persistent()
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(IdMode::Ephemeral)
    }
}
