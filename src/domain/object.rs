/// ArenaObject: the atomic simulation unit stored in every grid cell.
///
/// An object is a kind plus the per-instance state every kind shares:
/// facing, color, timer, visibility, and two wrapped objects held by value.
///
///   saved     what a movable or character is standing on; restored to
///             the cell when it moves away
///   previous  what an exposure replaced; a melted icy box becomes this
///             again instead of the kind's default
///
/// Objects are plain values. Pushing, morphing and undo snapshots clone
/// them, wrapped objects included.

use super::direction::Direction;
use super::kind::{ActionClass, ButtonPolicy, CustomFormat, Layer, ObjectKind, TypeTag};
use super::material::{Color, Material};

/// Countdown with a one-shot expiry.
///
/// `tick()` returns true exactly once, on the tick that reaches zero;
/// the timer is inactive afterwards until re-armed.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Timer {
    pub active: bool,
    pub remaining: i32,
    pub initial: i32,
}

impl Timer {
    pub fn arm(&mut self, ticks: i32) {
        self.active = true;
        self.remaining = ticks;
        self.initial = ticks;
    }

    pub fn disarm(&mut self) {
        self.active = false;
        self.remaining = 0;
        self.initial = 0;
    }

    /// Advance one tick. Returns true if the timer just expired.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining -= 1;
        if self.remaining <= 0 {
            self.disarm();
            return true;
        }
        false
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ArenaObject {
    pub kind: ObjectKind,
    pub direction: Direction,
    pub color: Option<Color>,
    pub material: Material,
    pub timer: Timer,
    /// Render gate only.
    pub enabled: bool,
    /// Parked on a tunnel with no free exit.
    pub waiting_on_tunnel: bool,
    saved: Option<Box<ArenaObject>>,
    previous: Option<Box<ArenaObject>>,
}

// ── Construction ──

impl ArenaObject {
    pub fn new(kind: ObjectKind) -> Self {
        let mut obj = ArenaObject {
            direction: kind.default_direction(),
            material: kind.default_material(),
            color: None,
            timer: Timer::default(),
            enabled: true,
            waiting_on_tunnel: false,
            saved: None,
            previous: None,
            kind,
        };
        if obj.kind.has_perpetual_timer() {
            obj.timer.arm(1);
        }
        obj
    }

    pub fn empty() -> Self {
        ArenaObject::new(ObjectKind::Empty)
    }

    /// A button that only reacts to movers made of `material`.
    pub fn material_button(policy: ButtonPolicy, material: Material) -> Self {
        let mut b = ArenaObject::new(ObjectKind::Button { policy, triggered: false, door: None, universal: false });
        b.material = material;
        b
    }

    pub fn with_direction(mut self, dir: Direction) -> Self {
        self.direction = dir;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_saved(mut self, saved: ArenaObject) -> Self {
        self.set_saved(saved);
        self
    }

    /// Replacement object for a morph into `kind`, keeping what the old
    /// object stood on.
    pub fn morph_into(&self, kind: ObjectKind) -> ArenaObject {
        let mut next = ArenaObject::new(kind);
        if next.kind.is_movable() || next.kind.is_character() {
            next.saved = self.saved.clone();
            next.direction = self.direction;
        }
        next
    }
}

// ── Capability queries ──

impl ArenaObject {
    /// Identity string. Material buttons carry their material in it.
    pub fn identity(&self) -> &'static str {
        if let ObjectKind::Button { policy, universal: false, .. } = self.kind {
            if let Some(id) = material_button_identity(policy, self.material) {
                return id;
            }
        }
        self.kind.identity()
    }

    pub fn layer(&self) -> Layer {
        self.kind.layer()
    }

    pub fn is_solid(&self) -> bool {
        self.kind.is_solid()
    }

    pub fn is_pushable(&self) -> bool {
        self.kind.is_pushable()
    }

    pub fn is_frictional(&self) -> bool {
        self.kind.is_frictional()
    }

    pub fn is_of_type(&self, tag: TypeTag) -> bool {
        self.kind.type_tags().contains(tag)
    }

    /// Movable, pushable, and not stuck waiting on a tunnel.
    pub fn can_move(&self) -> bool {
        self.kind.is_movable() && !self.waiting_on_tunnel
    }

    pub fn minimum_reaction_force(&self) -> i32 {
        self.material.minimum_reaction_force()
    }

    pub fn accepts_tick(&self, class: ActionClass) -> bool {
        self.kind.accepts_tick(class)
    }

    /// Replacement for an exposure to `exposure`, or `None` for no change.
    ///
    /// Objects that remember a previous state revert to it when the
    /// exposure undoes the one that created them.
    pub fn changes_to_on_exposure(&self, exposure: Material) -> Option<ArenaObject> {
        let next_kind = self.kind.changes_to_on_exposure(exposure)?;
        if next_kind.is_empty() {
            // burnt away: whatever it stood on shows through
            return Some(self.saved_or_empty());
        }
        if let Some(prev) = &self.previous {
            let reverts = matches!(
                (&self.kind, exposure),
                (ObjectKind::IcyBox, Material::Fire)
                    | (ObjectKind::IcyWall, Material::Fire)
                    | (ObjectKind::HotBox, Material::Ice)
                    | (ObjectKind::HotWall, Material::Ice)
            );
            if reverts {
                let mut back = (**prev).clone();
                if back.kind.is_movable() {
                    back.saved = self.saved.clone();
                    back.direction = self.direction;
                }
                return Some(back);
            }
        }
        let mut next = self.morph_into(next_kind);
        if next.kind.remembers_previous() && next.kind.layer() == self.kind.layer() {
            let mut remembered = self.clone();
            remembered.saved = None;
            next.previous = Some(Box::new(remembered));
        }
        Some(next)
    }
}

// ── Wrapped objects ──

impl ArenaObject {
    pub fn saved(&self) -> Option<&ArenaObject> {
        self.saved.as_deref()
    }

    pub fn saved_mut(&mut self) -> Option<&mut ArenaObject> {
        self.saved.as_deref_mut()
    }

    /// Object revealed when this one leaves its cell.
    pub fn saved_or_empty(&self) -> ArenaObject {
        self.saved.as_deref().cloned().unwrap_or_else(ArenaObject::empty)
    }

    pub fn set_saved(&mut self, saved: ArenaObject) {
        self.saved = if saved.kind.is_empty() { None } else { Some(Box::new(saved)) };
    }

    pub fn take_saved(&mut self) -> ArenaObject {
        self.saved.take().map(|b| *b).unwrap_or_else(ArenaObject::empty)
    }

    pub fn previous(&self) -> Option<&ArenaObject> {
        self.previous.as_deref()
    }

    pub fn set_previous(&mut self, prev: Option<ArenaObject>) {
        self.previous = prev.map(Box::new);
    }
}

// ── Custom properties (codec) ──

impl ArenaObject {
    pub fn custom_format(&self) -> CustomFormat {
        self.kind.custom_format()
    }

    /// Property `id`, indexed from 1. Unknown ids read as 0.
    pub fn custom_property(&self, id: usize) -> i32 {
        match (&self.kind, id) {
            (ObjectKind::Button { door, .. }, 1) => door.map_or(-1, |(r, _)| r),
            (ObjectKind::Button { door, .. }, 2) => door.map_or(-1, |(_, c)| c),
            (ObjectKind::Button { triggered, .. }, 3) => i32::from(*triggered),
            (ObjectKind::JumpBox { rows, .. }, 1) => *rows,
            (ObjectKind::JumpBox { cols, .. }, 2) => *cols,
            (ObjectKind::ButtonDoor { open, .. }, 1) => i32::from(*open),
            _ => 0,
        }
    }

    pub fn set_custom_property(&mut self, id: usize, value: i32) {
        match (&mut self.kind, id) {
            (ObjectKind::Button { door, .. }, 1) => {
                let col = door.map_or(-1, |(_, c)| c);
                *door = if value < 0 { None } else { Some((value, col)) };
            }
            (ObjectKind::Button { door, .. }, 2) => {
                *door = match *door {
                    Some((r, _)) if value >= 0 => Some((r, value)),
                    _ => None,
                };
            }
            (ObjectKind::Button { triggered, .. }, 3) => *triggered = value != 0,
            (ObjectKind::JumpBox { rows, .. }, 1) => *rows = value,
            (ObjectKind::JumpBox { cols, .. }, 2) => *cols = value,
            (ObjectKind::ButtonDoor { open, .. }, 1) => *open = value != 0,
            _ => {}
        }
    }

    /// Button policy and color: the class a button and its door share.
    pub fn door_class(&self) -> Option<(ButtonPolicy, Option<Color>)> {
        match &self.kind {
            ObjectKind::Button { policy, .. } | ObjectKind::ButtonDoor { policy, .. } => {
                Some((*policy, self.color))
            }
            _ => None,
        }
    }
}

/// Materials a non-universal button can be made of.
pub const BUTTON_MATERIALS: [Material; 7] = [
    Material::Fire,
    Material::Ice,
    Material::Magnetic,
    Material::Metallic,
    Material::Plastic,
    Material::Stone,
    Material::Wooden,
];

fn material_button_identity(policy: ButtonPolicy, material: Material) -> Option<&'static str> {
    use ButtonPolicy::*;
    let id = match (material, policy) {
        (Material::Fire, Pressure) => "FirePressureButton",
        (Material::Fire, Trigger) => "FireTriggerButton",
        (Material::Fire, All) => "FireAllButton",
        (Material::Ice, Pressure) => "IcePressureButton",
        (Material::Ice, Trigger) => "IceTriggerButton",
        (Material::Ice, All) => "IceAllButton",
        (Material::Magnetic, Pressure) => "MagneticPressureButton",
        (Material::Magnetic, Trigger) => "MagneticTriggerButton",
        (Material::Magnetic, All) => "MagneticAllButton",
        (Material::Metallic, Pressure) => "MetallicPressureButton",
        (Material::Metallic, Trigger) => "MetallicTriggerButton",
        (Material::Metallic, All) => "MetallicAllButton",
        (Material::Plastic, Pressure) => "PlasticPressureButton",
        (Material::Plastic, Trigger) => "PlasticTriggerButton",
        (Material::Plastic, All) => "PlasticAllButton",
        (Material::Stone, Pressure) => "StonePressureButton",
        (Material::Stone, Trigger) => "StoneTriggerButton",
        (Material::Stone, All) => "StoneAllButton",
        (Material::Wooden, Pressure) => "WoodenPressureButton",
        (Material::Wooden, Trigger) => "WoodenTriggerButton",
        (Material::Wooden, All) => "WoodenAllButton",
        _ => return None,
    };
    Some(id)
}

impl Default for ArenaObject {
    fn default() -> Self {
        ArenaObject::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_one_shot() {
        let mut t = Timer::default();
        assert!(!t.tick()); // inactive timers never fire
        t.arm(3);
        assert!(!t.tick()); // 3→2
        assert!(!t.tick()); // 2→1
        assert!(t.tick());  // 1→0, expired
        assert!(!t.active);
        assert_eq!(t.initial, 0);
        assert!(!t.tick());
    }

    #[test]
    fn movables_start_with_one_tick_timer() {
        let b = ArenaObject::new(ObjectKind::Box);
        assert!(b.timer.active);
        assert_eq!(b.timer.remaining, 1);
        let w = ArenaObject::new(ObjectKind::Wall);
        assert!(!w.timer.active);
    }

    #[test]
    fn saved_object_is_owned_value() {
        let tunnel = ArenaObject::new(ObjectKind::Tunnel).with_color(Color::Red);
        let mut b = ArenaObject::new(ObjectKind::Box).with_saved(tunnel.clone());
        let copy = b.clone();
        if let Some(s) = b.saved_mut() {
            s.color = Some(Color::Blue);
        }
        assert_eq!(copy.saved(), Some(&tunnel));
        assert_eq!(b.take_saved().color, Some(Color::Blue));
        assert!(b.saved().is_none());
        assert!(b.saved_or_empty().kind.is_empty());
    }

    #[test]
    fn empty_saved_is_not_stored() {
        let b = ArenaObject::new(ObjectKind::Box).with_saved(ArenaObject::empty());
        assert!(b.saved().is_none());
    }

    #[test]
    fn freeze_then_melt_restores_previous_state() {
        let wooden = ArenaObject::new(ObjectKind::WoodenBox).with_direction(Direction::East);
        let icy = wooden.changes_to_on_exposure(Material::Ice).unwrap();
        assert_eq!(icy.kind, ObjectKind::IcyBox);
        assert_eq!(icy.material, Material::Ice);
        let melted = icy.changes_to_on_exposure(Material::Fire).unwrap();
        assert_eq!(melted.kind, ObjectKind::WoodenBox);
        assert_eq!(melted.material, Material::Wooden);
    }

    #[test]
    fn melt_without_history_uses_default() {
        let icy = ArenaObject::new(ObjectKind::IcyBox);
        let melted = icy.changes_to_on_exposure(Material::Fire).unwrap();
        assert_eq!(melted.kind, ObjectKind::Box);
    }

    #[test]
    fn burning_reveals_saved_object() {
        let tunnel = ArenaObject::new(ObjectKind::Tunnel).with_color(Color::Green);
        let wooden = ArenaObject::new(ObjectKind::WoodenBox).with_saved(tunnel.clone());
        assert_eq!(wooden.changes_to_on_exposure(Material::Fire), Some(tunnel));
    }

    #[test]
    fn no_change_on_unrelated_exposure() {
        let m = ArenaObject::new(ObjectKind::MagneticBox);
        assert!(m.changes_to_on_exposure(Material::Ice).is_none());
    }

    #[test]
    fn button_properties() {
        let mut b = ArenaObject::new(ObjectKind::button(ButtonPolicy::Pressure));
        assert_eq!(b.custom_property(1), -1);
        b.set_custom_property(1, 4);
        b.set_custom_property(2, 7);
        b.set_custom_property(3, 1);
        assert_eq!(b.kind, ObjectKind::Button {
            policy: ButtonPolicy::Pressure,
            triggered: true,
            door: Some((4, 7)),
            universal: true,
        });
        assert_eq!(b.custom_property(2), 7);
        b.set_custom_property(1, -1);
        assert_eq!(b.custom_property(1), -1);
    }

    #[test]
    fn jump_box_properties() {
        let mut j = ArenaObject::new(ObjectKind::JumpBox { rows: 0, cols: 0 });
        j.set_custom_property(1, 2);
        j.set_custom_property(2, -1);
        assert_eq!(j.custom_property(1), 2);
        assert_eq!(j.custom_property(2), -1);
        assert_eq!(j.custom_property(9), 0);
    }
}
