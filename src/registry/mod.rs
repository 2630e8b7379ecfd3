use crate::entity::{CampaignEntity, Disposition, EntityId, Npc, NpcStatus};
use indexmap::IndexMap;
use tracing::debug;


/// In-memory cache of campaign entities with secondary indexes.
///
/// One registry instance per entity kind, owned by a single session. The
/// primary map is keyed by entity id; a secondary map resolves source
/// paths (vault file locations) to ids. Both maps preserve insertion
/// order, which is observable in every scan result.
///
/// The registry is a cache over data the host owns: lookups signal
/// absence with `Option`/empty results, never with errors.
pub struct EntityRegistry<T: CampaignEntity> {
    /// Primary storage: entity id -> entity
    entities: IndexMap<EntityId, T>,
    /// Secondary index: source path -> entity id
    paths: IndexMap<String, EntityId>,
}

impl<T: CampaignEntity> EntityRegistry<T> {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            entities: IndexMap::new(),
            paths: IndexMap::new(),
        }
    }

    /// Upsert an entity by its identifier (last-write-wins, no merge).
    ///
    /// When `path` is given the path index is upserted too.
    pub fn register(&mut self, entity: T, path: Option<&str>) {
        if let Some(path) = path {
            self.paths.insert(path.to_string(), entity.id().clone());
        }
        self.entities.insert(entity.id().clone(), entity);
    }

    /// Look up an entity by id.
    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.entities.get(id)
    }

    /// Look up an entity by source path (two-hop: path -> id -> entity).
    pub fn get_by_path(&self, path: &str) -> Option<&T> {
        let id = self.paths.get(path)?;
        self.entities.get(id)
    }

    /// First entity with the given name, in insertion order.
    ///
    /// Names are not required to be unique; this is a linear scan
    /// returning the first match.
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.entities.values().find(|e| e.name() == name)
    }

    /// Case-insensitive substring match against entity names.
    pub fn search(&self, query: &str) -> Vec<&T> {
        let needle = query.to_lowercase();
        self.entities
            .values()
            .filter(|e| e.name().to_lowercase().contains(&needle))
            .collect()
    }

    /// Remove an entity and its path-index entry, if any.
    ///
    /// The path index is not keyed by id, so this scans for the first
    /// path pointing at `id` (at most one is assumed, not enforced).
    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        let removed = self.entities.shift_remove(id);
        if removed.is_some() {
            if let Some(path) = self
                .paths
                .iter()
                .find(|(_, mapped)| *mapped == id)
                .map(|(path, _)| path.clone())
            {
                self.paths.shift_remove(&path);
            }
            debug!(id = %id, "entity removed from registry");
        }
        removed
    }

    /// Empty both maps.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.paths.clear();
    }

    /// All entities in insertion order.
    pub fn get_all(&self) -> Vec<&T> {
        self.entities.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }
}

impl<T: CampaignEntity> Default for EntityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Criteria for narrowing NPC scans. Unset fields are skipped; set
/// fields are AND-composed.
#[derive(Debug, Clone, Default)]
pub struct NpcFilter {
    pub role: Option<String>,
    pub faction: Option<String>,
    pub location: Option<String>,
    pub status: Option<NpcStatus>,
    pub disposition: Option<Disposition>,
}

/// Party reputation below which an NPC counts as an enemy.
const ENEMY_THRESHOLD: i32 = -50;
/// Party reputation at or above which an NPC counts as an ally.
const ALLY_THRESHOLD: i32 = 50;

impl EntityRegistry<Npc> {
    /// NPCs whose role set contains `role` (membership, not equality).
    pub fn get_by_role(&self, role: &str) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.roles.iter().any(|r| r == role))
            .collect()
    }

    pub fn get_by_faction(&self, faction: &str) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.faction.as_deref() == Some(faction))
            .collect()
    }

    pub fn get_by_location(&self, location: &str) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.location.as_deref() == Some(location))
            .collect()
    }

    pub fn get_by_status(&self, status: NpcStatus) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.status == Some(status))
            .collect()
    }

    pub fn get_by_disposition(&self, disposition: Disposition) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.disposition == Some(disposition))
            .collect()
    }

    /// AND-composition of all provided criteria, applied as successive
    /// narrowing passes. Insertion order is preserved throughout, so an
    /// empty filter returns every NPC in registration order.
    pub fn filter(&self, criteria: &NpcFilter) -> Vec<&Npc> {
        let mut matches: Vec<&Npc> = self.entities.values().collect();

        if let Some(ref role) = criteria.role {
            matches.retain(|npc| npc.roles.iter().any(|r| r == role));
        }
        if let Some(ref faction) = criteria.faction {
            matches.retain(|npc| npc.faction.as_deref() == Some(faction.as_str()));
        }
        if let Some(ref location) = criteria.location {
            matches.retain(|npc| npc.location.as_deref() == Some(location.as_str()));
        }
        if let Some(status) = criteria.status {
            matches.retain(|npc| npc.status == Some(status));
        }
        if let Some(disposition) = criteria.disposition {
            matches.retain(|npc| npc.disposition == Some(disposition));
        }

        matches
    }

    /// NPCs with a recorded interaction, most recent first. Ties keep
    /// insertion order (stable sort).
    pub fn get_recently_interacted(&self, limit: Option<usize>) -> Vec<&Npc> {
        let mut interacted: Vec<&Npc> = self
            .entities
            .values()
            .filter(|npc| npc.last_interacted.is_some())
            .collect();
        interacted.sort_by(|a, b| b.last_interacted.cmp(&a.last_interacted));
        if let Some(limit) = limit {
            interacted.truncate(limit);
        }
        interacted
    }

    /// NPCs with party reputation >= 50. Missing reputation counts as 0.
    pub fn get_allies(&self) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.party_reputation.unwrap_or(0) >= ALLY_THRESHOLD)
            .collect()
    }

    /// NPCs with party reputation <= -50. Missing reputation counts as 0.
    pub fn get_enemies(&self) -> Vec<&Npc> {
        self.entities
            .values()
            .filter(|npc| npc.party_reputation.unwrap_or(0) <= ENEMY_THRESHOLD)
            .collect()
    }

    /// Add `delta` to an NPC's party reputation, clamping to [-100, 100]
    /// on every update. Unknown ids are ignored.
    pub fn update_reputation(&mut self, id: &EntityId, delta: i32) {
        if let Some(npc) = self.entities.get_mut(id) {
            let current = npc.party_reputation.unwrap_or(0);
            npc.party_reputation = Some((current + delta).clamp(-100, 100));
        }
    }
}
