//! Hand-built battlefield fixture for domain tests.

use std::collections::HashMap;

use super::view::BattlefieldView;
use crate::ids::ActorId;
use crate::value_objects::{GridPosition, ItemTag};

struct TestActor {
    position: GridPosition,
    team: u8,
    items: Vec<ItemTag>,
    reach: Option<u32>,
    can_act: bool,
}

#[derive(Default)]
pub struct TestBattlefield {
    order: Vec<ActorId>,
    actors: HashMap<ActorId, TestActor>,
}

impl TestBattlefield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, position: GridPosition, team: u8) -> ActorId {
        let id = ActorId::new();
        self.order.push(id);
        self.actors.insert(
            id,
            TestActor {
                position,
                team,
                items: Vec::new(),
                reach: None,
                can_act: true,
            },
        );
        id
    }

    pub fn move_actor(&mut self, actor: ActorId, position: GridPosition) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.position = position;
        }
    }

    pub fn remove_actor(&mut self, actor: ActorId) {
        self.actors.remove(&actor);
        self.order.retain(|id| *id != actor);
    }

    pub fn give(&mut self, actor: ActorId, item: ItemTag) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.items.push(item);
        }
    }

    pub fn take(&mut self, actor: ActorId, item: &ItemTag) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.items.retain(|i| i != item);
        }
    }

    pub fn set_reach(&mut self, actor: ActorId, reach: Option<u32>) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.reach = reach;
        }
    }

    pub fn set_can_act(&mut self, actor: ActorId, can_act: bool) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.can_act = can_act;
        }
    }
}

impl BattlefieldView for TestBattlefield {
    fn actors(&self) -> Vec<ActorId> {
        self.order.clone()
    }

    fn exists(&self, actor: ActorId) -> bool {
        self.actors.contains_key(&actor)
    }

    fn position(&self, actor: ActorId) -> Option<GridPosition> {
        self.actors.get(&actor).map(|a| a.position)
    }

    fn holds(&self, actor: ActorId, item: &ItemTag) -> bool {
        self.actors
            .get(&actor)
            .is_some_and(|a| a.items.contains(item))
    }

    fn weapon_reach(&self, actor: ActorId) -> Option<u32> {
        self.actors.get(&actor).and_then(|a| a.reach)
    }

    fn are_allies(&self, a: ActorId, b: ActorId) -> bool {
        match (self.actors.get(&a), self.actors.get(&b)) {
            (Some(x), Some(y)) => x.team == y.team,
            _ => false,
        }
    }

    fn can_act(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_some_and(|a| a.can_act)
    }
}
