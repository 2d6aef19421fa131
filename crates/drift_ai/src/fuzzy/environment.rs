//! Per-tick fuzzy environment

use super::category::{BinId, CategoryId};
use std::collections::HashMap;

/// Opaque lookup key for an entity the bot reasons about
///
/// Either a player, or a player paired with one of the bot's weapons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub u64);

impl EntityKey {
    const PAIR_FLAG: u64 = 1 << 63;

    /// Key for a player
    pub fn player(player_id: u32) -> Self {
        Self(player_id as u64)
    }

    /// Key for a (player, weapon) pair
    pub fn player_weapon(player_id: u32, weapon_id: u32) -> Self {
        Self(Self::PAIR_FLAG | ((player_id as u64) << 32) | weapon_id as u64)
    }
}

/// Raw inputs and computed memberships for one tick
#[derive(Debug, Clone, Default)]
pub struct Environment {
    inputs: HashMap<CategoryId, HashMap<EntityKey, f32>>,
    memberships: HashMap<(CategoryId, EntityKey, BinId), f32>,
}

/// The slice of an [`Environment`] belonging to one category
pub struct Subenv<'a> {
    pub(crate) category: CategoryId,
    pub(crate) inputs: Option<&'a HashMap<EntityKey, f32>>,
    pub(crate) memberships: &'a mut HashMap<(CategoryId, EntityKey, BinId), f32>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every input and membership
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.memberships.clear();
    }

    /// Store the raw value of `category` for `entity`
    pub fn set_input(&mut self, category: CategoryId, entity: EntityKey, value: f32) {
        self.inputs.entry(category).or_default().insert(entity, value);
    }

    pub fn input(&self, category: CategoryId, entity: EntityKey) -> Option<f32> {
        self.inputs.get(&category)?.get(&entity).copied()
    }

    pub fn membership(&self, category: CategoryId, entity: EntityKey, bin: BinId) -> Option<f32> {
        self.memberships.get(&(category, entity, bin)).copied()
    }

    /// Number of entities with an input for `category`
    pub fn entity_count(&self, category: CategoryId) -> usize {
        self.inputs.get(&category).map_or(0, HashMap::len)
    }

    /// Borrow the inputs of `category` together with the membership table
    pub fn subenv(&mut self, category: CategoryId) -> Subenv<'_> {
        Subenv {
            category,
            inputs: self.inputs.get(&category),
            memberships: &mut self.memberships,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keys_distinct() {
        assert_ne!(EntityKey::player(7), EntityKey::player_weapon(7, 0));
        assert_ne!(EntityKey::player_weapon(1, 2), EntityKey::player_weapon(2, 1));
        assert_eq!(EntityKey::player(7), EntityKey(7));
    }

    #[test]
    fn test_inputs_and_clear() {
        let mut env = Environment::new();
        let c = CategoryId(3);
        env.set_input(c, EntityKey(1), 4.0);
        env.set_input(c, EntityKey(1), 5.0);
        env.set_input(c, EntityKey(2), 6.0);

        assert_eq!(env.input(c, EntityKey(1)), Some(5.0));
        assert_eq!(env.entity_count(c), 2);
        assert_eq!(env.entity_count(CategoryId(0)), 0);

        env.clear();
        assert_eq!(env.input(c, EntityKey(1)), None);
    }
}
