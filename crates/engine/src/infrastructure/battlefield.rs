//! In-memory battlefield used by the simulator and engine tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tactica_domain::{ActorId, BattlefieldView, GridPosition, ItemId, ItemTag};

/// An item a combatant is holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    pub id: ItemId,
    pub tag: ItemTag,
    pub name: String,
}

/// Everything the reaction core needs to know about a participant.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub name: String,
    pub position: GridPosition,
    pub team: u8,
    pub items: Vec<HeldItem>,
    pub reach: Option<u32>,
    pub can_act: bool,
    pub hp: i32,
    pub armor_class: i32,
    pub check_bonus: i32,
}

impl Combatant {
    pub fn new(name: impl Into<String>, position: GridPosition, team: u8) -> Self {
        Self {
            name: name.into(),
            position,
            team,
            items: Vec::new(),
            reach: None,
            can_act: true,
            hp: 20,
            armor_class: 15,
            check_bonus: 5,
        }
    }

    /// Wield a melee weapon with the given reach.
    pub fn with_weapon(mut self, name: impl Into<String>, reach: u32) -> Self {
        self.items.push(HeldItem {
            id: ItemId::new(),
            tag: ItemTag::Weapon,
            name: name.into(),
        });
        self.reach = Some(self.reach.map_or(reach, |r| r.max(reach)));
        self
    }

    pub fn with_shield(mut self, name: impl Into<String>) -> Self {
        self.items.push(HeldItem {
            id: ItemId::new(),
            tag: ItemTag::Shield,
            name: name.into(),
        });
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp;
        self
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    pub fn with_check_bonus(mut self, bonus: i32) -> Self {
        self.check_bonus = bonus;
        self
    }
}

#[derive(Debug, Default)]
struct FieldState {
    order: Vec<ActorId>,
    combatants: HashMap<ActorId, Combatant>,
}

/// Thread-safe battlefield state behind a synchronous view.
#[derive(Debug, Default)]
pub struct InMemoryBattlefield {
    state: RwLock<FieldState>,
}

impl InMemoryBattlefield {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FieldState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FieldState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, combatant: Combatant) -> ActorId {
        let id = ActorId::new();
        let mut state = self.write();
        state.order.push(id);
        state.combatants.insert(id, combatant);
        id
    }

    pub fn remove(&self, actor: ActorId) {
        let mut state = self.write();
        state.combatants.remove(&actor);
        state.order.retain(|a| *a != actor);
    }

    pub fn move_to(&self, actor: ActorId, position: GridPosition) {
        if let Some(c) = self.write().combatants.get_mut(&actor) {
            c.position = position;
        }
    }

    pub fn set_can_act(&self, actor: ActorId, can_act: bool) {
        if let Some(c) = self.write().combatants.get_mut(&actor) {
            c.can_act = can_act;
        }
    }

    /// Drop every held item of this tag. Reach goes with the last weapon.
    pub fn disarm(&self, actor: ActorId, tag: &ItemTag) {
        if let Some(c) = self.write().combatants.get_mut(&actor) {
            c.items.retain(|i| &i.tag != tag);
            if !c.items.iter().any(|i| i.tag == ItemTag::Weapon) {
                c.reach = None;
            }
        }
    }

    /// Apply damage. Actors at 0 HP are removed. Returns the remaining HP.
    pub fn apply_damage(&self, actor: ActorId, amount: i32) -> Option<i32> {
        let remaining = {
            let mut state = self.write();
            let c = state.combatants.get_mut(&actor)?;
            c.hp = (c.hp - amount.max(0)).max(0);
            c.hp
        };
        if remaining == 0 {
            self.remove(actor);
        }
        Some(remaining)
    }

    pub fn combatant(&self, actor: ActorId) -> Option<Combatant> {
        self.read().combatants.get(&actor).cloned()
    }

    pub fn name(&self, actor: ActorId) -> String {
        self.read()
            .combatants
            .get(&actor)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| actor.to_string())
    }

    pub fn items_of(&self, actor: ActorId, tag: &ItemTag) -> Vec<HeldItem> {
        self.read()
            .combatants
            .get(&actor)
            .map(|c| c.items.iter().filter(|i| &i.tag == tag).cloned().collect())
            .unwrap_or_default()
    }
}

impl BattlefieldView for InMemoryBattlefield {
    fn actors(&self) -> Vec<ActorId> {
        self.read().order.clone()
    }

    fn exists(&self, actor: ActorId) -> bool {
        self.read().combatants.contains_key(&actor)
    }

    fn position(&self, actor: ActorId) -> Option<GridPosition> {
        self.read().combatants.get(&actor).map(|c| c.position)
    }

    fn holds(&self, actor: ActorId, item: &ItemTag) -> bool {
        self.read()
            .combatants
            .get(&actor)
            .is_some_and(|c| c.items.iter().any(|i| &i.tag == item))
    }

    fn weapon_reach(&self, actor: ActorId) -> Option<u32> {
        self.read().combatants.get(&actor).and_then(|c| c.reach)
    }

    fn are_allies(&self, a: ActorId, b: ActorId) -> bool {
        let state = self.read();
        match (state.combatants.get(&a), state.combatants.get(&b)) {
            (Some(x), Some(y)) => x.team == y.team,
            _ => false,
        }
    }

    fn can_act(&self, actor: ActorId) -> bool {
        self.read()
            .combatants
            .get(&actor)
            .is_some_and(|c| c.can_act && c.hp > 0)
    }
}
