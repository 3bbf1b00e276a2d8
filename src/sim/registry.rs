/// Identity string -> prototype constructor.
///
/// The codec reads an identity string, asks the registry for a fresh
/// default object of that kind, then fills in direction, color and
/// custom properties from the stream. Buttons restricted to one
/// material are registered once per material and policy.

use std::collections::HashMap;

use crate::config::TimerConfig;
use crate::domain::kind::{ButtonPolicy, Item, KeyColor, ObjectKind};
use crate::domain::object::{ArenaObject, BUTTON_MATERIALS};
use super::error::{SimError, SimResult};

pub type Factory = Box<dyn Fn() -> ArenaObject>;

/// Timed kinds start counting down as soon as they are loaded; arena
/// files do not store timer state.
fn timed(kind: ObjectKind, ticks: i32) -> ArenaObject {
    let mut obj = ArenaObject::new(kind);
    obj.timer.arm(ticks);
    obj
}

pub struct Registry {
    factories: HashMap<&'static str, Factory>,
}

const STANDARD: &[fn() -> ArenaObject] = &[
    || ArenaObject::new(ObjectKind::Ground),
    || ArenaObject::new(ObjectKind::Ice),
    || ArenaObject::new(ObjectKind::Lava),
    || ArenaObject::new(ObjectKind::DeepWater),
    || ArenaObject::new(ObjectKind::Empty),
    || ArenaObject::new(ObjectKind::Wall),
    || ArenaObject::new(ObjectKind::WoodenWall),
    || ArenaObject::new(ObjectKind::IcyWall),
    || ArenaObject::new(ObjectKind::HotWall),
    || ArenaObject::new(ObjectKind::MagneticWall),
    || timed(ObjectKind::DisruptedWall, TimerConfig::default().disrupt_ticks),
    || ArenaObject::new(ObjectKind::CrystalBlock),
    || ArenaObject::new(ObjectKind::HotCrystalBlock),
    || ArenaObject::new(ObjectKind::Barrel),
    || ArenaObject::new(ObjectKind::Box),
    || ArenaObject::new(ObjectKind::WoodenBox),
    || ArenaObject::new(ObjectKind::IcyBox),
    || ArenaObject::new(ObjectKind::HotBox),
    || ArenaObject::new(ObjectKind::MetallicBox),
    || ArenaObject::new(ObjectKind::MagneticBox),
    || ArenaObject::new(ObjectKind::JumpBox { rows: 0, cols: 0 }),
    || ArenaObject::new(ObjectKind::Mirror),
    || ArenaObject::new(ObjectKind::MagneticMirror),
    || ArenaObject::new(ObjectKind::AntiTank),
    || timed(ObjectKind::StunnedAntiTank, TimerConfig::default().stun_ticks),
    || ArenaObject::new(ObjectKind::DeadAntiTank),
    || ArenaObject::new(ObjectKind::Tunnel),
    || ArenaObject::new(ObjectKind::button(ButtonPolicy::Pressure)),
    || ArenaObject::new(ObjectKind::button(ButtonPolicy::Trigger)),
    || ArenaObject::new(ObjectKind::button(ButtonPolicy::All)),
    || ArenaObject::new(ObjectKind::button_door(ButtonPolicy::Pressure)),
    || ArenaObject::new(ObjectKind::button_door(ButtonPolicy::Trigger)),
    || ArenaObject::new(ObjectKind::button_door(ButtonPolicy::All)),
    || ArenaObject::new(ObjectKind::Key(KeyColor::Red)),
    || ArenaObject::new(ObjectKind::Key(KeyColor::Green)),
    || ArenaObject::new(ObjectKind::Key(KeyColor::Blue)),
    || ArenaObject::new(ObjectKind::KeyDoor(KeyColor::Red)),
    || ArenaObject::new(ObjectKind::KeyDoor(KeyColor::Green)),
    || ArenaObject::new(ObjectKind::KeyDoor(KeyColor::Blue)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Missile)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Stunner)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Boost)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Magnet)),
    || ArenaObject::new(ObjectKind::Pickup(Item::BlueLaser)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Disruptor)),
    || ArenaObject::new(ObjectKind::Pickup(Item::RedKey)),
    || ArenaObject::new(ObjectKind::Pickup(Item::GreenKey)),
    || ArenaObject::new(ObjectKind::Pickup(Item::BlueKey)),
    || ArenaObject::new(ObjectKind::Pickup(Item::Bomb)),
    || ArenaObject::new(ObjectKind::Pickup(Item::HeatBomb)),
    || ArenaObject::new(ObjectKind::Pickup(Item::IceBomb)),
    || ArenaObject::new(ObjectKind::Tank),
    || ArenaObject::new(ObjectKind::PowerfulTank),
];

impl Registry {
    pub fn empty() -> Self {
        Registry { factories: HashMap::new() }
    }

    /// Every kind an arena file may contain. The beam trail lives only
    /// in the overlay and is never stored.
    pub fn standard() -> Self {
        let mut reg = Registry::empty();
        for &f in STANDARD {
            reg.register(f);
        }
        for policy in ButtonPolicy::ALL {
            for material in BUTTON_MATERIALS {
                reg.register(move || ArenaObject::material_button(policy, material));
            }
        }
        reg
    }

    /// Register `factory` under the identity of the object it builds.
    /// A later registration for the same identity replaces the earlier.
    pub fn register(&mut self, factory: impl Fn() -> ArenaObject + 'static) {
        let identity = factory().identity();
        if self.factories.insert(identity, Box::new(factory)).is_some() {
            log::warn!("identity '{}' registered twice", identity);
        }
    }

    pub fn create(&self, identity: &str) -> SimResult<ArenaObject> {
        self.factories
            .get(identity)
            .map(|f| f())
            .ok_or_else(|| SimError::UnknownObject { identity: identity.to_string() })
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.factories.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered identities in sorted order.
    pub fn identities(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_unique() {
        let reg = Registry::standard();
        assert_eq!(reg.len(), STANDARD.len() + ButtonPolicy::ALL.len() * BUTTON_MATERIALS.len());
        assert!(!reg.contains("BeamTrail"));
        assert!(reg.contains("StoneTriggerButton"));
    }

    #[test]
    fn create_round_trips_identity() {
        let reg = Registry::standard();
        for id in reg.identities() {
            assert_eq!(reg.create(id).unwrap().identity(), id);
        }
    }

    #[test]
    fn prototypes_are_fresh() {
        let reg = Registry::standard();
        let anti = reg.create("AntiTank").unwrap();
        assert!(anti.timer.active);
        assert!(anti.saved().is_none());
        assert_eq!(reg.create("TenBombs").unwrap().kind, ObjectKind::Pickup(Item::Bomb));
    }

    #[test]
    fn unknown_identity_is_an_error() {
        let reg = Registry::standard();
        assert!(matches!(reg.create("Teleporter"), Err(SimError::UnknownObject { .. })));
        assert!(Registry::empty().create("Wall").is_err());
    }
}
