/// Materials, colors, and the beam / blast type tags.
///
/// Material drives two rules:
///   - the minimum reaction force an object needs before it moves
///   - which one-way transformation an exposure (fire / ice) causes
///
///   material    reaction force
///   plastic     0
///   metallic    2
///   others      1

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Material {
    Default,
    Metallic,
    Wooden,
    Plastic,
    Ice,
    Fire,
    Stone,
    Magnetic,
    NotApplicable,
}

impl Material {
    pub fn minimum_reaction_force(self) -> i32 {
        match self {
            Material::Plastic => 0,
            Material::Metallic => 2,
            _ => 1,
        }
    }

    /// Per-link force cost when this material moves as part of a chain.
    pub fn force_cost(self) -> i32 {
        self.minimum_reaction_force().max(1)
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Default
    }
}

/// Object color. Tunnels share a capacity flag per color; button/door pairs
/// bind by policy and color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Color {
    Gray,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
}

impl Color {
    pub const COUNT: usize = 8;

    pub const ALL: [Color; Color::COUNT] = [
        Color::Gray, Color::Red, Color::Green, Color::Blue,
        Color::Yellow, Color::Cyan, Color::Magenta, Color::White,
    ];

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Colors serialize as an ordinal, with -1 meaning "no color".
    pub fn from_ordinal(n: i32) -> Option<Color> {
        usize::try_from(n).ok().and_then(|i| Color::ALL.get(i).copied())
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Beam kind fired by a tank, an anti-tank, or an inventory item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LaserType {
    Green,
    Red,
    Power,
    Missile,
    Stunner,
    Blue,
    Disruptor,
}

impl LaserType {
    /// Material a beam exposes the objects it hits to, if any.
    pub fn exposure(self) -> Option<Material> {
        match self {
            LaserType::Missile => Some(Material::Fire),
            LaserType::Stunner => Some(Material::Ice),
            _ => None,
        }
    }

    /// Blast type the beam applies to the object behind an absorbing cell.
    pub fn range_type(self) -> RangeType {
        match self {
            LaserType::Missile => RangeType::HeatBomb,
            LaserType::Stunner => RangeType::IceBomb,
            _ => RangeType::Bomb,
        }
    }
}

/// Area effect applied to a 3x3 neighbourhood.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RangeType {
    Bomb,
    HeatBomb,
    IceBomb,
}

impl RangeType {
    pub fn material(self) -> Material {
        match self {
            RangeType::Bomb => Material::Metallic,
            RangeType::HeatBomb => Material::Fire,
            RangeType::IceBomb => Material::Ice,
        }
    }
}
