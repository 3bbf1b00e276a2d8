/// Object kinds and their static properties.
///
/// Properties are queried via methods, not stored as flags, so the
/// semantics of every kind live in one place and every `match` over
/// `ObjectKind` is exhaustive.
///
/// ## Layers
///
///   layer            holds
///   LowerGround      floors: ground, ice, lava, deep water
///   UpperGround      (overlay floors; empty in the standard catalogue)
///   LowerObjects     walls, boxes, mirrors, buttons, doors, tunnels, pickups
///   UpperObjects     tanks
///
/// `Empty` is the filler for every layer. `BeamTrail` only ever lives in
/// the virtual overlay grid.

use super::material::Material;
use super::direction::Direction;

// ══════════════════════════════════════════════════════════════
// Layers
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Layer {
    LowerGround,
    UpperGround,
    LowerObjects,
    UpperObjects,
}

impl Layer {
    pub const COUNT: usize = 4;
    pub const ALL: [Layer; Layer::COUNT] = [
        Layer::LowerGround,
        Layer::UpperGround,
        Layer::LowerObjects,
        Layer::UpperObjects,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

// ══════════════════════════════════════════════════════════════
// Type tags
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeTag {
    Ground,
    Character,
    PassThrough,
    Tunnel,
    Wall,
    Movable,
    PlainWall,
    EmptySpace,
    Box,
    Anti,
    MagneticBox,
    Icy,
    Key,
    Door,
    Barrel,
    Ball,
    Button,
    ButtonDoor,
    AllButton,
    AllButtonDoor,
    PressureButton,
    PressureButtonDoor,
    TriggerButton,
    TriggerButtonDoor,
    JumpObject,
    MovableMirror,
    ReactionWall,
    Pickup,
}

/// Small bitset over `TypeTag`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct TypeTags(u64);

impl TypeTags {
    pub fn of(tags: &[TypeTag]) -> Self {
        let mut set = TypeTags::default();
        for &t in tags {
            set.insert(t);
        }
        set
    }

    pub fn insert(&mut self, tag: TypeTag) {
        self.0 |= 1 << tag as u64;
    }

    pub fn contains(self, tag: TypeTag) -> bool {
        self.0 & (1 << tag as u64) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// ══════════════════════════════════════════════════════════════
// Supporting enums
// ══════════════════════════════════════════════════════════════

/// How a button drives its door(s).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ButtonPolicy {
    /// Toggles on push-in and on push-out.
    Pressure,
    /// Latches open on the first push-in.
    Trigger,
    /// Opens every door of its class once all sibling buttons are held.
    All,
}

impl ButtonPolicy {
    pub const ALL: [ButtonPolicy; 3] = [ButtonPolicy::Pressure, ButtonPolicy::Trigger, ButtonPolicy::All];
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum KeyColor {
    Red,
    Green,
    Blue,
}

impl KeyColor {
    pub fn item(self) -> Item {
        match self {
            KeyColor::Red => Item::RedKey,
            KeyColor::Green => Item::GreenKey,
            KeyColor::Blue => Item::BlueKey,
        }
    }
}

/// Inventory categories.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Item {
    Missile,
    Stunner,
    Boost,
    Magnet,
    BlueLaser,
    Disruptor,
    RedKey,
    GreenKey,
    BlueKey,
    Bomb,
    HeatBomb,
    IceBomb,
}

impl Item {
    pub const COUNT: usize = 12;
    pub const ALL: [Item; Item::COUNT] = [
        Item::Missile, Item::Stunner, Item::Boost, Item::Magnet,
        Item::BlueLaser, Item::Disruptor, Item::RedKey, Item::GreenKey,
        Item::BlueKey, Item::Bomb, Item::HeatBomb, Item::IceBomb,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// How an object's extra state is framed by the arena codec.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CustomFormat {
    /// A fixed number of integer properties, indexed from 1.
    Props(usize),
    /// Direction, color, then the wrapped saved object, recursively.
    Manual,
}

/// Which tick class an object's timer listens to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionClass {
    Move,
    NonMove,
}

// ══════════════════════════════════════════════════════════════
// ObjectKind
// ══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ObjectKind {
    // ── Floors ──
    Ground,
    Ice,
    Lava,
    DeepWater,

    // ── Filler ──
    Empty,

    // ── Walls ──
    Wall,
    WoodenWall,
    IcyWall,
    HotWall,
    MagneticWall,
    DisruptedWall,
    CrystalBlock,
    HotCrystalBlock,
    Barrel,

    // ── Movables ──
    Box,
    WoodenBox,
    IcyBox,
    HotBox,
    MetallicBox,
    MagneticBox,
    JumpBox { rows: i32, cols: i32 },
    Mirror,
    MagneticMirror,
    AntiTank,
    StunnedAntiTank,
    DeadAntiTank,

    // ── Linkage ──
    Tunnel,
    Button {
        policy: ButtonPolicy,
        triggered: bool,
        door: Option<(i32, i32)>,
        universal: bool,
    },
    ButtonDoor { policy: ButtonPolicy, open: bool },
    Key(KeyColor),
    KeyDoor(KeyColor),
    Pickup(Item),

    // ── Characters ──
    Tank,
    PowerfulTank,

    // ── Virtual overlay ──
    BeamTrail,
}

impl ObjectKind {
    pub fn button(policy: ButtonPolicy) -> ObjectKind {
        ObjectKind::Button { policy, triggered: false, door: None, universal: true }
    }

    pub fn button_door(policy: ButtonPolicy) -> ObjectKind {
        ObjectKind::ButtonDoor { policy, open: false }
    }

    /// Kinds that turn back into the object they replaced: thawing and
    /// cooling undo a freeze or a heat, disrupted walls re-form.
    pub fn remembers_previous(&self) -> bool {
        use ObjectKind::*;
        matches!(self, IcyBox | HotBox | IcyWall | HotWall | DisruptedWall)
    }

    /// Identity string used by the registry and the codec.
    pub fn identity(&self) -> &'static str {
        use ObjectKind::*;
        match self {
            Ground => "Ground",
            Ice => "Ice",
            Lava => "Lava",
            DeepWater => "DeepWater",
            Empty => "Empty",
            Wall => "Wall",
            WoodenWall => "WoodenWall",
            IcyWall => "IcyWall",
            HotWall => "HotWall",
            MagneticWall => "MagneticWall",
            DisruptedWall => "DisruptedWall",
            CrystalBlock => "CrystalBlock",
            HotCrystalBlock => "HotCrystalBlock",
            Barrel => "Barrel",
            Box => "Box",
            WoodenBox => "WoodenBox",
            IcyBox => "IcyBox",
            HotBox => "HotBox",
            MetallicBox => "MetallicBox",
            MagneticBox => "MagneticBox",
            JumpBox { .. } => "JumpBox",
            Mirror => "Mirror",
            MagneticMirror => "MagneticMirror",
            AntiTank => "AntiTank",
            StunnedAntiTank => "StunnedAntiTank",
            DeadAntiTank => "DeadAntiTank",
            Tunnel => "Tunnel",
            Button { policy: ButtonPolicy::Pressure, .. } => "PressureButton",
            Button { policy: ButtonPolicy::Trigger, .. } => "TriggerButton",
            Button { policy: ButtonPolicy::All, .. } => "AllButton",
            ButtonDoor { policy: ButtonPolicy::Pressure, .. } => "PressureButtonDoor",
            ButtonDoor { policy: ButtonPolicy::Trigger, .. } => "TriggerButtonDoor",
            ButtonDoor { policy: ButtonPolicy::All, .. } => "AllButtonDoor",
            Key(KeyColor::Red) => "RedKey",
            Key(KeyColor::Green) => "GreenKey",
            Key(KeyColor::Blue) => "BlueKey",
            KeyDoor(KeyColor::Red) => "RedDoor",
            KeyDoor(KeyColor::Green) => "GreenDoor",
            KeyDoor(KeyColor::Blue) => "BlueDoor",
            Pickup(item) => pickup_identity(*item),
            Tank => "Tank",
            PowerfulTank => "PowerfulTank",
            BeamTrail => "BeamTrail",
        }
    }

    /// Fixed primary layer.
    pub fn layer(&self) -> Layer {
        use ObjectKind::*;
        match self {
            Ground | Ice | Lava | DeepWater => Layer::LowerGround,
            Tank | PowerfulTank => Layer::UpperObjects,
            _ => Layer::LowerObjects,
        }
    }

    /// May this kind be stored in `layer`? `Empty` fills any layer.
    pub fn fits_layer(&self, layer: Layer) -> bool {
        matches!(self, ObjectKind::Empty) || self.layer() == layer
    }

    pub fn is_solid(&self) -> bool {
        use ObjectKind::*;
        match self {
            Ground | Ice | Lava | DeepWater | Empty | Tunnel | Button { .. }
            | Key(_) | Pickup(_) | BeamTrail => false,
            ButtonDoor { open, .. } => !open,
            _ => true,
        }
    }

    /// Can a beam or a push-chain displace this kind at all?
    pub fn is_pushable(&self) -> bool {
        use ObjectKind::*;
        matches!(
            self,
            Box | WoodenBox | IcyBox | HotBox | MetallicBox | MagneticBox
                | JumpBox { .. } | Mirror | MagneticMirror
                | AntiTank | StunnedAntiTank | DeadAntiTank
        )
    }

    /// Movables and characters carry a saved object and a perpetual timer.
    pub fn is_movable(&self) -> bool {
        self.is_pushable()
    }

    pub fn is_character(&self) -> bool {
        matches!(self, ObjectKind::Tank | ObjectKind::PowerfulTank)
    }

    /// Floors without friction let pushed objects slide on.
    pub fn is_frictional(&self) -> bool {
        !matches!(self, ObjectKind::Ice)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ObjectKind::Empty)
    }

    pub fn default_material(&self) -> Material {
        use ObjectKind::*;
        match self {
            Ice | IcyWall | IcyBox => Material::Ice,
            Lava | HotWall | HotBox | HotCrystalBlock => Material::Fire,
            Wall | MetallicBox | Mirror | KeyDoor(_) | ButtonDoor { .. } => Material::Metallic,
            WoodenWall | WoodenBox | Barrel => Material::Wooden,
            MagneticWall | MagneticBox | MagneticMirror => Material::Magnetic,
            Box | JumpBox { .. } | CrystalBlock | DisruptedWall => Material::Stone,
            AntiTank | StunnedAntiTank | DeadAntiTank | Tank | PowerfulTank => Material::Metallic,
            Empty | BeamTrail => Material::NotApplicable,
            Ground | DeepWater | Tunnel | Button { .. } | Key(_) | Pickup(_) => Material::Default,
        }
    }

    pub fn default_direction(&self) -> Direction {
        use ObjectKind::*;
        match self {
            Mirror | MagneticMirror => Direction::NorthEast,
            AntiTank | StunnedAntiTank | DeadAntiTank | Tank | PowerfulTank => Direction::North,
            _ => Direction::None,
        }
    }

    pub fn type_tags(&self) -> TypeTags {
        use ObjectKind::*;
        use TypeTag as T;
        match self {
            Ground | Lava | DeepWater => TypeTags::of(&[T::Ground]),
            Ice => TypeTags::of(&[T::Ground, T::Icy]),
            Empty | BeamTrail => TypeTags::of(&[T::EmptySpace]),
            Wall | WoodenWall | MagneticWall | DisruptedWall => TypeTags::of(&[T::Wall, T::PlainWall]),
            IcyWall => TypeTags::of(&[T::Wall, T::PlainWall, T::Icy]),
            HotWall => TypeTags::of(&[T::Wall, T::PlainWall]),
            CrystalBlock | HotCrystalBlock => TypeTags::of(&[T::Wall, T::ReactionWall]),
            Barrel => TypeTags::of(&[T::Wall, T::ReactionWall, T::Barrel]),
            Box | WoodenBox | HotBox | MetallicBox => TypeTags::of(&[T::Movable, T::Box]),
            IcyBox => TypeTags::of(&[T::Movable, T::Box, T::Icy]),
            MagneticBox => TypeTags::of(&[T::Movable, T::Box, T::MagneticBox]),
            JumpBox { .. } => TypeTags::of(&[T::Movable, T::Box, T::JumpObject]),
            Mirror | MagneticMirror => TypeTags::of(&[T::Movable, T::MovableMirror]),
            AntiTank | StunnedAntiTank | DeadAntiTank => TypeTags::of(&[T::Movable, T::Anti]),
            Tunnel => TypeTags::of(&[T::Tunnel, T::PassThrough]),
            Button { policy, .. } => TypeTags::of(&[T::Button, match policy {
                ButtonPolicy::Pressure => T::PressureButton,
                ButtonPolicy::Trigger => T::TriggerButton,
                ButtonPolicy::All => T::AllButton,
            }]),
            ButtonDoor { policy, .. } => TypeTags::of(&[T::Door, T::ButtonDoor, match policy {
                ButtonPolicy::Pressure => T::PressureButtonDoor,
                ButtonPolicy::Trigger => T::TriggerButtonDoor,
                ButtonPolicy::All => T::AllButtonDoor,
            }]),
            Key(_) => TypeTags::of(&[T::Key, T::PassThrough]),
            KeyDoor(_) => TypeTags::of(&[T::Door]),
            Pickup(_) => TypeTags::of(&[T::Pickup, T::PassThrough]),
            Tank | PowerfulTank => TypeTags::of(&[T::Character]),
        }
    }

    pub fn custom_format(&self) -> CustomFormat {
        use ObjectKind::*;
        match self {
            Button { .. } => CustomFormat::Props(3),
            JumpBox { .. } => CustomFormat::Props(2),
            ButtonDoor { .. } => CustomFormat::Props(1),
            _ if self.is_movable() || self.is_character() => CustomFormat::Manual,
            _ => CustomFormat::Props(0),
        }
    }

    /// Does this kind's timer count down on a tick of `class`?
    pub fn accepts_tick(&self, class: ActionClass) -> bool {
        match self {
            ObjectKind::AntiTank | ObjectKind::StunnedAntiTank => class == ActionClass::Move,
            _ => true,
        }
    }

    /// Kinds whose timer re-arms itself for one tick on every expiry.
    pub fn has_perpetual_timer(&self) -> bool {
        self.is_movable() || self.is_character()
    }

    /// One-way replacement on exposure, ignoring any remembered previous
    /// state. `None` means the exposure changes nothing.
    pub fn changes_to_on_exposure(&self, exposure: Material) -> Option<ObjectKind> {
        use ObjectKind::*;
        match (self, exposure) {
            (WoodenBox, Material::Ice) => Some(IcyBox),
            (WoodenBox, Material::Fire) => Some(Empty),
            (Box, Material::Ice) | (JumpBox { .. }, Material::Ice) => Some(IcyBox),
            (Box, Material::Fire) | (JumpBox { .. }, Material::Fire) => Some(HotBox),
            (MetallicBox, Material::Ice) => Some(IcyBox),
            (MetallicBox, Material::Fire) => Some(HotBox),
            (IcyBox, Material::Fire) => Some(Box),
            (HotBox, Material::Ice) => Some(Box),
            (Wall, Material::Ice) => Some(IcyWall),
            (Wall, Material::Fire) => Some(HotWall),
            (WoodenWall, Material::Fire) => Some(Empty),
            (WoodenWall, Material::Ice) => Some(IcyWall),
            (IcyWall, Material::Fire) => Some(Wall),
            (HotWall, Material::Ice) => Some(Wall),
            (CrystalBlock, Material::Fire) => Some(HotCrystalBlock),
            (HotCrystalBlock, Material::Ice) => Some(CrystalBlock),
            (Ice, Material::Fire) => Some(Ground),
            (Lava, Material::Ice) => Some(Ground),
            _ => None,
        }
    }

    /// Minimum force a beam must exceed before this kind reacts.
    pub fn minimum_reaction_force(&self) -> i32 {
        self.default_material().minimum_reaction_force()
    }
}

impl Default for ObjectKind {
    fn default() -> Self {
        ObjectKind::Empty
    }
}

fn pickup_identity(item: Item) -> &'static str {
    match item {
        Item::Missile => "TenMissiles",
        Item::Stunner => "TenStunners",
        Item::Boost => "TenBoosts",
        Item::Magnet => "TenMagnets",
        Item::BlueLaser => "TenBlueLasers",
        Item::Disruptor => "TenDisruptors",
        Item::RedKey => "TenRedKeys",
        Item::GreenKey => "TenGreenKeys",
        Item::BlueKey => "TenBlueKeys",
        Item::Bomb => "TenBombs",
        Item::HeatBomb => "TenHeatBombs",
        Item::IceBomb => "TenIceBombs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_are_fixed_per_kind() {
        assert_eq!(ObjectKind::Ground.layer(), Layer::LowerGround);
        assert_eq!(ObjectKind::WoodenBox.layer(), Layer::LowerObjects);
        assert_eq!(ObjectKind::Tank.layer(), Layer::UpperObjects);
        assert!(ObjectKind::Empty.fits_layer(Layer::UpperGround));
        assert!(!ObjectKind::Tank.fits_layer(Layer::LowerObjects));
    }

    #[test]
    fn solidity() {
        assert!(ObjectKind::Wall.is_solid());
        assert!(!ObjectKind::Tunnel.is_solid());
        assert!(!ObjectKind::button(ButtonPolicy::Pressure).is_solid());
        assert!(ObjectKind::button_door(ButtonPolicy::Trigger).is_solid());
        let open = ObjectKind::ButtonDoor { policy: ButtonPolicy::Trigger, open: true };
        assert!(!open.is_solid());
    }

    #[test]
    fn pushable_kinds_are_solid() {
        let kinds = [
            ObjectKind::Box, ObjectKind::WoodenBox, ObjectKind::MagneticBox,
            ObjectKind::JumpBox { rows: 1, cols: 0 }, ObjectKind::Mirror,
            ObjectKind::AntiTank, ObjectKind::DeadAntiTank,
        ];
        for k in kinds {
            assert!(k.is_pushable(), "{:?}", k);
            assert!(k.is_solid(), "{:?}", k);
            assert_eq!(k.custom_format(), CustomFormat::Manual);
        }
        assert!(!ObjectKind::Wall.is_pushable());
        assert!(!ObjectKind::Tank.is_pushable());
    }

    #[test]
    fn tags() {
        let tags = ObjectKind::button(ButtonPolicy::All).type_tags();
        assert!(tags.contains(TypeTag::Button));
        assert!(tags.contains(TypeTag::AllButton));
        assert!(!tags.contains(TypeTag::PressureButton));
        assert!(ObjectKind::Tank.type_tags().contains(TypeTag::Character));
        assert!(TypeTags::default().is_empty());
    }

    #[test]
    fn exposure_table() {
        assert_eq!(ObjectKind::WoodenBox.changes_to_on_exposure(Material::Fire), Some(ObjectKind::Empty));
        assert_eq!(ObjectKind::WoodenBox.changes_to_on_exposure(Material::Ice), Some(ObjectKind::IcyBox));
        assert_eq!(ObjectKind::Wall.changes_to_on_exposure(Material::Fire), Some(ObjectKind::HotWall));
        assert_eq!(ObjectKind::HotBox.changes_to_on_exposure(Material::Ice), Some(ObjectKind::Box));
        assert_eq!(ObjectKind::MagneticBox.changes_to_on_exposure(Material::Fire), None);
        assert_eq!(ObjectKind::Empty.changes_to_on_exposure(Material::Ice), None);
    }

    #[test]
    fn anti_tanks_only_hear_move_ticks() {
        assert!(ObjectKind::AntiTank.accepts_tick(ActionClass::Move));
        assert!(!ObjectKind::AntiTank.accepts_tick(ActionClass::NonMove));
        assert!(ObjectKind::Box.accepts_tick(ActionClass::NonMove));
    }

    #[test]
    fn identities_distinguish_policies() {
        assert_eq!(ObjectKind::button(ButtonPolicy::Trigger).identity(), "TriggerButton");
        assert_eq!(ObjectKind::button_door(ButtonPolicy::All).identity(), "AllButtonDoor");
        assert_eq!(ObjectKind::Pickup(Item::Stunner).identity(), "TenStunners");
    }
}
