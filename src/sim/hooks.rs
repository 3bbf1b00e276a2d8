/// Object capability dispatch.
///
/// Every object kind answers the same fixed set of interaction hooks.
/// The dispatch is a single exhaustive `match` per hook over the closed
/// `ObjectKind` set; kinds that do nothing special fall through to the
/// defaults at the bottom of this file.
///
/// ## Hooks
///
///   hook             called when                              returns
///   laser_entered    a beam enters the cell                   travel direction, NONE = beam ends
///   laser_exited     a beam leaves the cell                   travel direction
///   range_action     a 3x3 blast covers the cell              -
///   push_into        a mover enters the cell                  Enter / Redirect / Consumed
///   push_out         a mover leaves the cell                  -
///   push_collide     a mover is blocked by this object        true if the way is now clear
///   post_move        the object itself finished a move        true to keep sliding
///   timer_expired    the object's timer reached zero          -
///   editor_place     the object was placed by the editor      -
///   editor_remove    the object is about to be removed        -
///
/// Hooks receive the kind by reference and the grid by `&mut`. The kind
/// is a clone taken before the call, so a hook always re-reads its own
/// cell from the grid before mutating it.

use crate::domain::direction::Direction;
use crate::domain::kind::{ActionClass, Layer, ObjectKind};
use crate::domain::material::{LaserType, Material, RangeType};
use crate::domain::object::ArenaObject;
use super::context::SimulationContext;
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};
use super::{beam, buttons, engine, push, timer, tunnel};

/// A beam in flight, as seen by the cell it is entering or leaving.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BeamState {
    pub laser: LaserType,
    /// Direction of travel.
    pub direction: Direction,
    /// Side of the current cell the beam came in through.
    pub entered_from: Direction,
    pub force: i32,
}

impl BeamState {
    pub fn new(laser: LaserType, direction: Direction, force: i32) -> Self {
        BeamState { laser, direction, entered_from: direction.opposite(), force }
    }
}

/// Result of a mover entering a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Entry {
    /// Land in the cell.
    Enter,
    /// Land somewhere else instead (tunnel exit).
    Redirect(Pos),
    /// The mover is gone (melted, sunk).
    Consumed,
}

pub trait ObjectHooks {
    fn laser_entered(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, beam: &BeamState) -> Direction;
    fn laser_exited(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, beam: &BeamState) -> Direction;
    fn range_action(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, range: RangeType, force: i32);
    fn push_into(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &mut ArenaObject) -> Entry;
    fn push_out(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject);
    fn push_collide(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject) -> bool;
    fn post_move(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, dir: Direction) -> bool;
    fn timer_expired(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, class: ActionClass);
    fn editor_place(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos);
    fn editor_remove(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos);
}

/// Kind of the object at `(at, layer)`, cloned out for hook dispatch.
pub fn hook_target(grid: &ArenaGrid, at: Pos, layer: Layer) -> Option<ObjectKind> {
    grid.cell(at, layer).map(|o| o.kind.clone())
}

// ══════════════════════════════════════════════════════════════
// Dispatch
// ══════════════════════════════════════════════════════════════

impl ObjectHooks for ObjectKind {
    fn laser_entered(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, b: &BeamState) -> Direction {
        use ObjectKind::*;
        match self {
            Mirror | MagneticMirror => beam::mirror_entered(grid, ctx, at, b),
            AntiTank => beam::anti_tank_entered(grid, ctx, at, b),
            CrystalBlock | HotCrystalBlock => beam::crystal_entered(grid, ctx, at, b),
            Barrel => beam::barrel_entered(grid, ctx, at, b),
            MagneticWall => beam::magnetic_wall_entered(grid, ctx, at, b),
            // disrupted walls let beams through until they re-form
            DisruptedWall => b.direction,
            Tank | PowerfulTank => {
                engine::kill_tank(ctx);
                Direction::None
            }
            _ => default_laser_entered(grid, ctx, at, layer, b),
        }
    }

    fn laser_exited(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
        match self {
            ObjectKind::Mirror | ObjectKind::MagneticMirror => beam::mirror_exited(grid, ctx, at, b),
            _ => b.direction,
        }
    }

    fn range_action(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, range: RangeType, force: i32) {
        match self {
            ObjectKind::Barrel => beam::explode_barrel(grid, ctx, at, force),
            ObjectKind::Tank | ObjectKind::PowerfulTank | ObjectKind::Empty | ObjectKind::BeamTrail => {}
            _ => default_range_action(grid, ctx, at, layer, range, force),
        }
    }

    fn push_into(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &mut ArenaObject) -> Entry {
        use ObjectKind::*;
        match self {
            Tunnel => tunnel::tunnel_push_into(grid, ctx, at, mover),
            Button { .. } => {
                buttons::button_push_into(grid, ctx, at, mover);
                Entry::Enter
            }
            Key(_) | Pickup(_) => {
                engine::collect_item(grid, ctx, at, mover);
                Entry::Enter
            }
            Lava | DeepWater | Ice => push::ground_push_into(grid, ctx, at, mover),
            _ => Entry::Enter,
        }
    }

    fn push_out(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject) {
        if let ObjectKind::Button { .. } = self {
            buttons::button_push_out(grid, ctx, at, mover);
        }
    }

    fn push_collide(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject) -> bool {
        match self {
            ObjectKind::KeyDoor(color) if mover.kind.is_character() => engine::unlock_door(grid, ctx, at, *color),
            _ => {
                if mover.kind.is_character() {
                    ctx.sound(SoundEffect::BumpHead);
                }
                false
            }
        }
    }

    fn post_move(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, dir: Direction) -> bool {
        if self.is_movable() || self.is_character() {
            push::keeps_sliding(grid, ctx, at, dir)
        } else {
            false
        }
    }

    fn timer_expired(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, class: ActionClass) {
        use ObjectKind::*;
        match self {
            AntiTank => timer::anti_tank_expired(grid, ctx, at, class),
            StunnedAntiTank => timer::stun_expired(grid, ctx, at),
            DisruptedWall => timer::disrupt_expired(grid, ctx, at),
            _ if self.has_perpetual_timer() => timer::rearm(grid, at, layer),
            _ => {}
        }
    }

    fn editor_place(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
        match self {
            ObjectKind::Button { .. } => buttons::place_button(grid, ctx, at),
            ObjectKind::ButtonDoor { .. } => buttons::place_door(grid, ctx, at),
            _ => {}
        }
    }

    fn editor_remove(&self, grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
        if let ObjectKind::ButtonDoor { .. } = self {
            buttons::remove_door(grid, ctx, at);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Defaults
// ══════════════════════════════════════════════════════════════

/// Beam entering an ordinary cell.
///
///   1. exposure (fire / ice beams): transform in place, beam ends
///   2. non-solid: beam passes
///   3. movable with force above its threshold: pushed, beam ends
///   4. otherwise absorbed
fn default_laser_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, b: &BeamState) -> Direction {
    if expose(grid, ctx, at, layer, b.laser.exposure()) {
        return Direction::None;
    }
    let Some(obj) = grid.cell(at, layer) else {
        return Direction::None;
    };
    if !obj.is_solid() {
        return b.direction;
    }
    if obj.can_move() && b.force > obj.minimum_reaction_force() {
        beam::push_by_beam(grid, ctx, at, b);
        return Direction::None;
    }
    absorb(ctx, at);
    Direction::None
}

fn default_range_action(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, range: RangeType, force: i32) {
    match range {
        RangeType::Bomb => {
            let crushable = grid.cell(at, layer).map_or(false, |o| o.can_move() && force > o.minimum_reaction_force());
            if crushable {
                crush(grid, ctx, at, layer);
            }
        }
        RangeType::HeatBomb | RangeType::IceBomb => {
            expose(grid, ctx, at, layer, Some(range.material()));
        }
    }
}

/// Apply an exposure to the object at `(at, layer)`. Returns true if it
/// transformed.
pub fn expose(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, exposure: Option<Material>) -> bool {
    let Some(material) = exposure else {
        return false;
    };
    let Some(obj) = grid.cell(at, layer) else {
        return false;
    };
    let Some(next) = obj.changes_to_on_exposure(material) else {
        return false;
    };
    let sound = exposure_sound(obj.material, material);
    morph(grid, ctx, at, layer, next, Some(sound));
    true
}

/// Sound of `exposure` acting on an object of `target` material.
pub fn exposure_sound(target: Material, exposure: Material) -> SoundEffect {
    match (exposure, target) {
        (Material::Fire, Material::Wooden) => SoundEffect::WoodBurn,
        (Material::Fire, Material::Ice) => SoundEffect::Defrost,
        (Material::Fire, _) => SoundEffect::Melt,
        (Material::Ice, Material::Fire) => SoundEffect::CoolOff,
        _ => SoundEffect::Frozen,
    }
}

/// Replace the object at `(at, layer)` with `next`.
pub fn morph(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer, next: ArenaObject, sound: Option<SoundEffect>) {
    let from = grid.cell(at, layer).map_or("Empty", |o| o.identity());
    let to = next.identity();
    log::debug!("morph {} -> {} at {:?}", from, to, at);
    ctx.emit(GameEvent::Morphed { at, from, to });
    if let Some(s) = sound {
        ctx.sound(s);
    }
    grid.put(at, layer, next);
}

/// Destroy the object at `(at, layer)`, revealing what it stood on.
pub fn crush(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer) {
    let Some(obj) = grid.cell(at, layer) else {
        return;
    };
    let revealed = obj.saved_or_empty();
    log::debug!("crush {} at {:?}", obj.identity(), at);
    grid.put(at, layer, revealed);
    ctx.emit(GameEvent::Crushed { at });
    ctx.sound(SoundEffect::Crush);
}

/// Beam swallowed without effect.
pub fn absorb(ctx: &mut SimulationContext, at: Pos) {
    ctx.emit(GameEvent::BeamDied { at });
    ctx.sound(SoundEffect::LaserDie);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::tests::{arena_from, kind_at};

    fn green(dir: Direction, force: i32) -> BeamState {
        BeamState::new(LaserType::Green, dir, force)
    }

    #[test]
    fn beam_state_entry_side() {
        let b = green(Direction::East, 2);
        assert_eq!(b.entered_from, Direction::West);
    }

    #[test]
    fn wooden_box_burns_in_place() {
        // fire beam with force 1 still burns: exposure comes before force
        let mut g = arena_from(&[".....", ".....", ".....", ".....", ".....", ".....o"]);
        let mut ctx = SimulationContext::default();
        let b = BeamState::new(LaserType::Missile, Direction::East, 1);
        let at = Pos::new(5, 5, 0);
        let out = ObjectKind::WoodenBox.laser_entered(&mut g, &mut ctx, at, Layer::LowerObjects, &b);
        assert_eq!(out, Direction::None);
        assert!(kind_at(&g, 5, 5).is_empty());
        assert!(kind_at(&g, 6, 5).is_empty());
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::WoodBurn)));
    }

    #[test]
    fn non_solid_passes() {
        let mut g = arena_from(&["r"]);
        let mut ctx = SimulationContext::default();
        let out = ObjectKind::Tunnel.laser_entered(&mut g, &mut ctx, Pos::new(0, 0, 0), Layer::LowerObjects, &green(Direction::South, 2));
        assert_eq!(out, Direction::South);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn wall_absorbs() {
        let mut g = arena_from(&["#"]);
        let mut ctx = SimulationContext::default();
        let out = ObjectKind::Wall.laser_entered(&mut g, &mut ctx, Pos::new(0, 0, 0), Layer::LowerObjects, &green(Direction::East, 9));
        assert_eq!(out, Direction::None);
        assert_eq!(kind_at(&g, 0, 0), ObjectKind::Wall);
        assert!(ctx.events.contains(&GameEvent::BeamDied { at: Pos::new(0, 0, 0) }));
    }

    #[test]
    fn exposure_sounds() {
        assert_eq!(exposure_sound(Material::Wooden, Material::Fire), SoundEffect::WoodBurn);
        assert_eq!(exposure_sound(Material::Metallic, Material::Ice), SoundEffect::Frozen);
        assert_eq!(exposure_sound(Material::Ice, Material::Fire), SoundEffect::Defrost);
        assert_eq!(exposure_sound(Material::Fire, Material::Ice), SoundEffect::CoolOff);
        assert_eq!(exposure_sound(Material::Metallic, Material::Fire), SoundEffect::Melt);
    }

    #[test]
    fn crush_reveals_saved() {
        let mut g = arena_from(&[]);
        let tunnel = ArenaObject::new(ObjectKind::Tunnel);
        g.put(Pos::new(1, 1, 0), Layer::LowerObjects, ArenaObject::new(ObjectKind::Box).with_saved(tunnel));
        let mut ctx = SimulationContext::default();
        crush(&mut g, &mut ctx, Pos::new(1, 1, 0), Layer::LowerObjects);
        assert_eq!(kind_at(&g, 1, 1), ObjectKind::Tunnel);
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::Crush)));
    }

    #[test]
    fn bomb_crushes_movables_only() {
        let mut g = arena_from(&["B#"]);
        let mut ctx = SimulationContext::default();
        ObjectKind::Box.range_action(&mut g, &mut ctx, Pos::new(0, 0, 0), Layer::LowerObjects, RangeType::Bomb, 2);
        ObjectKind::Wall.range_action(&mut g, &mut ctx, Pos::new(0, 1, 0), Layer::LowerObjects, RangeType::Bomb, 2);
        assert!(kind_at(&g, 0, 0).is_empty());
        assert_eq!(kind_at(&g, 0, 1), ObjectKind::Wall);
    }

    #[test]
    fn heat_bomb_melts_ice_floor() {
        let mut g = arena_from(&["~"]);
        let mut ctx = SimulationContext::default();
        let at = Pos::new(0, 0, 0);
        ObjectKind::Ice.range_action(&mut g, &mut ctx, at, Layer::LowerGround, RangeType::HeatBomb, 2);
        assert_eq!(g.cell(at, Layer::LowerGround).unwrap().kind, ObjectKind::Ground);
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::Defrost)));
    }
}
