/// Beam propagation and area effects.
///
/// ## Beam pass
///
/// A beam starts one cell ahead of its origin and walks cell by cell:
///
///   1. normalize the position (wraparound); off the arena, the beam dies
///   2. `laser_entered` on the upper objects layer, then the lower one;
///      a NONE result ends the beam
///   3. `laser_exited` on the lower object (mirrors turn the beam here)
///   4. mark the cell with a beam trail on the virtual overlay
///
/// `max_hops` bounds a pass so a beam caught between mirrors on a
/// wrapping arena still terminates.
///
/// ## Pushing
///
/// A beam that beats a movable's reaction force pushes it one cell away
/// from the source (magnetic objects hit by a blue beam are pulled one
/// cell toward it instead). If the cell behind is a wall or the arena
/// edge, the object is crushed. A movable behind it only gives way when
/// the cell beyond that is open or the beam carries more than 2 force
/// units; otherwise the object is crushed against it. A chain is
/// validated first and moves as one. When a strong beam jams a chain
/// against a wall, the far link is crushed and the rest moves up.

use std::collections::HashSet;

use crate::domain::direction::{self, Direction};
use crate::domain::kind::{Layer, ObjectKind};
use crate::domain::material::{LaserType, Material, RangeType};
use crate::domain::object::ArenaObject;
use super::context::SimulationContext;
use super::engine;
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};
use super::hooks::{self, hook_target, BeamState, ObjectHooks};
use super::push;

/// How a beam pass ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BeamEnd {
    /// Absorbed, transformed, or pushed something.
    Stopped(Pos),
    /// Left a non-wrapping arena edge.
    OffArena,
    /// Hit a tank.
    HitTank(Pos),
    /// Ran out of hops.
    Exhausted,
}

// ══════════════════════════════════════════════════════════════
// Beam pass
// ══════════════════════════════════════════════════════════════

pub fn fire_beam(
    grid: &mut ArenaGrid,
    ctx: &mut SimulationContext,
    origin: Pos,
    dir: Direction,
    laser: LaserType,
    force: i32,
) -> BeamEnd {
    let mut state = BeamState::new(laser, dir, force);
    let mut pos = origin;
    log::debug!("beam {:?} from {:?} heading {:?} force {}", laser, origin, dir, force);

    for _ in 0..ctx.beam.max_hops {
        let (dx, dy) = state.direction.unresolve();
        if (dx, dy) == (0, 0) {
            return BeamEnd::Stopped(pos);
        }
        let Some(next) = grid.normalize(pos.offset(dx, dy)) else {
            absorb_at_edge(ctx, pos);
            return BeamEnd::OffArena;
        };
        pos = next;
        state.entered_from = state.direction.opposite();

        if let Some(kind) = hook_target(grid, pos, Layer::UpperObjects) {
            if kind.is_character() {
                kind.laser_entered(grid, ctx, pos, Layer::UpperObjects, &state);
                return BeamEnd::HitTank(pos);
            }
        }
        let Some(kind) = hook_target(grid, pos, Layer::LowerObjects) else {
            return BeamEnd::OffArena;
        };
        let through = kind.laser_entered(grid, ctx, pos, Layer::LowerObjects, &state);
        if through == Direction::None {
            return BeamEnd::Stopped(pos);
        }
        state.direction = through;

        // the entered hook may have changed the cell
        let kind = hook_target(grid, pos, Layer::LowerObjects).unwrap_or_default();
        state.direction = kind.laser_exited(grid, ctx, pos, &state);

        // overlay write cannot fail: `pos` is normalized
        let _ = grid.set_virtual_cell(
            ArenaObject::new(ObjectKind::BeamTrail).with_direction(direction::resolve_relative_hv(dx, dy)),
            pos.row,
            pos.col,
            pos.floor,
        );
    }
    log::warn!("beam from {:?} exceeded {} hops", origin, ctx.beam.max_hops);
    BeamEnd::Exhausted
}

fn absorb_at_edge(ctx: &mut SimulationContext, last: Pos) {
    ctx.emit(GameEvent::BeamDied { at: last });
    ctx.sound(SoundEffect::LaserDie);
}

/// Push the movable at `at` after a beam beat its reaction force.
pub fn push_by_beam(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) {
    let Some(obj) = grid.cell(at, Layer::LowerObjects) else {
        return;
    };
    let pulled = obj.material == Material::Magnetic && b.laser == LaserType::Blue;
    let dir = if pulled { b.direction.opposite() } else { b.direction };

    if let ObjectKind::JumpBox { rows, cols } = obj.kind {
        if jump(grid, ctx, at, rows, cols, dir) {
            return;
        }
    }

    let (dx, dy) = dir.unresolve();
    let behind = grid.normalize(at.offset(dx, dy));
    let Some(next) = behind else {
        hooks::crush(grid, ctx, at, Layer::LowerObjects);
        return;
    };
    if is_backstop(grid, next) {
        hooks::crush(grid, ctx, at, Layer::LowerObjects);
        return;
    }

    // a movable in front only yields to an open cell beyond it or a strong beam
    let next_movable = upper_empty(grid, next)
        && grid.cell(next, Layer::LowerObjects).map_or(false, |o| o.is_solid() && o.can_move());
    if next_movable {
        let beyond_open = grid
            .normalize(next.offset(dx, dy))
            .and_then(|p| grid.cell(p, Layer::LowerObjects))
            .map_or(false, |o| !o.is_solid());
        if !beyond_open && b.force <= 2 {
            hooks::crush(grid, ctx, at, Layer::LowerObjects);
            return;
        }
    }

    match push::push_chain(grid, ctx, at, dir, b.force) {
        Ok(_) => {}
        Err(block) => {
            log::debug!("chain from {:?} blocked: {:?}", at, block);
            if !(next_movable && crush_far_link(grid, ctx, at, dir, b.force)) {
                hooks::absorb(ctx, at);
            }
        }
    }
}

/// A solid that will not move, with nothing standing on it.
fn is_backstop(grid: &ArenaGrid, p: Pos) -> bool {
    let lower_blocks = grid.cell(p, Layer::LowerObjects).map_or(true, |o| o.is_solid() && !o.can_move());
    lower_blocks && upper_empty(grid, p)
}

fn upper_empty(grid: &ArenaGrid, p: Pos) -> bool {
    grid.cell(p, Layer::UpperObjects).map_or(true, |o| o.kind.is_empty())
}

/// The last link of a chain jammed against a backstop or the arena edge,
/// if the force reaching it still beats its reaction force.
fn jammed_far_link(grid: &ArenaGrid, start: Pos, dir: Direction, force: i32) -> Option<Pos> {
    let (dx, dy) = dir.unresolve();
    let mut seen = HashSet::new();
    let mut current = start;
    let mut remaining = force;
    loop {
        if !seen.insert(current) {
            return None;
        }
        let obj = grid.cell(current, Layer::LowerObjects)?;
        if !obj.can_move() || remaining <= obj.minimum_reaction_force() {
            return None;
        }
        remaining -= obj.material.force_cost();
        let Some(next) = grid.normalize(current.offset(dx, dy)) else {
            return Some(current);
        };
        if is_backstop(grid, next) {
            return Some(current);
        }
        if !upper_empty(grid, next) || grid.is_free(next) {
            return None;
        }
        current = next;
    }
}

/// Crush the jammed far end of a chain and move the rest into the gap.
/// Leaves the grid untouched when that is not possible.
fn crush_far_link(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, dir: Direction, force: i32) -> bool {
    let Some(far) = jammed_far_link(grid, at, dir, force) else {
        return false;
    };
    if far == at {
        return false;
    }
    let snapshot = grid.image();
    let mark = ctx.events.len();
    hooks::crush(grid, ctx, far, Layer::LowerObjects);
    match push::push_chain(grid, ctx, at, dir, force) {
        Ok(_) => true,
        Err(block) => {
            log::debug!("chain from {:?} still blocked after crushing {:?}: {:?}", at, far, block);
            grid.restore_image(snapshot);
            ctx.events.truncate(mark);
            false
        }
    }
}

/// Jump boxes leap by their stored offset, carried in the push direction.
/// Returns false (so the box is pushed normally) if the landing cell is
/// not free.
fn jump(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, rows: i32, cols: i32, dir: Direction) -> bool {
    if rows == 0 && cols == 0 {
        return false;
    }
    let (dx, dy) = dir.unresolve();
    let reach_x = if dx == 0 { cols } else { cols.abs() * dx };
    let reach_y = if dy == 0 { rows } else { rows.abs() * dy };
    let Some(landing) = grid.normalize(at.offset(reach_x, reach_y)) else {
        return false;
    };
    if landing == at || !grid.is_free(landing) {
        return false;
    }
    ctx.sound(SoundEffect::Jumping);
    match push::relocate(grid, ctx, at, landing, Layer::LowerObjects, Direction::None) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("jump from {:?} failed: {}", at, e);
            false
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Per-kind beam reactions
// ══════════════════════════════════════════════════════════════

/// Mirrors let the beam in through a reflective face and turn it on the
/// way out. A hit on the back is an ordinary push.
pub fn mirror_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    let Some(mirror) = grid.cell(at, Layer::LowerObjects) else {
        return Direction::None;
    };
    if direction::hit_reflective_side(b.entered_from, mirror.direction) {
        ctx.sound(SoundEffect::Reflect);
        return b.direction;
    }
    if hooks::expose(grid, ctx, at, Layer::LowerObjects, b.laser.exposure()) {
        return Direction::None;
    }
    let movable = grid
        .cell(at, Layer::LowerObjects)
        .map_or(false, |o| o.can_move() && b.force > o.minimum_reaction_force());
    if movable {
        push_by_beam(grid, ctx, at, b);
    } else {
        hooks::absorb(ctx, at);
    }
    Direction::None
}

pub fn mirror_exited(grid: &mut ArenaGrid, _ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    match grid.cell(at, Layer::LowerObjects) {
        Some(mirror) if direction::hit_reflective_side(b.entered_from, mirror.direction) => {
            direction::reflect(b.entered_from, mirror.direction)
        }
        _ => b.direction,
    }
}

pub fn anti_tank_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    let Some(anti) = grid.cell(at, Layer::LowerObjects) else {
        return Direction::None;
    };
    let facing = anti.direction;
    match b.laser {
        LaserType::Missile | LaserType::Power => kill_anti_tank(grid, ctx, at),
        LaserType::Stunner => {
            let mut stunned = anti.morph_into(ObjectKind::StunnedAntiTank);
            stunned.timer.arm(ctx.timers.stun_ticks);
            hooks::morph(grid, ctx, at, Layer::LowerObjects, stunned, Some(SoundEffect::Stun));
        }
        _ if b.entered_from == facing => kill_anti_tank(grid, ctx, at),
        _ => {
            let movable = anti.can_move() && b.force > anti.minimum_reaction_force();
            if movable {
                push_by_beam(grid, ctx, at, b);
            } else {
                hooks::absorb(ctx, at);
            }
        }
    }
    Direction::None
}

fn kill_anti_tank(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
    let dead = match grid.cell(at, Layer::LowerObjects) {
        Some(anti) => anti.morph_into(ObjectKind::DeadAntiTank),
        None => return,
    };
    hooks::morph(grid, ctx, at, Layer::LowerObjects, dead, Some(SoundEffect::AntiDie));
}

/// Crystal blocks are transparent. Above their reaction force a missile
/// shatters them and a disruptor disrupts them.
pub fn crystal_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    let Some(crystal) = grid.cell(at, Layer::LowerObjects) else {
        return Direction::None;
    };
    if b.force > crystal.minimum_reaction_force() {
        match b.laser {
            LaserType::Missile => {
                hooks::crush(grid, ctx, at, Layer::LowerObjects);
                return Direction::None;
            }
            LaserType::Disruptor => {
                disrupt(grid, ctx, at);
                return Direction::None;
            }
            _ => {}
        }
    }
    if hooks::expose(grid, ctx, at, Layer::LowerObjects, b.laser.exposure()) {
        return Direction::None;
    }
    b.direction
}

pub fn barrel_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    let reacts = grid
        .cell(at, Layer::LowerObjects)
        .map_or(false, |o| b.force > o.minimum_reaction_force());
    if reacts {
        explode_barrel(grid, ctx, at, b.force);
    } else {
        hooks::absorb(ctx, at);
    }
    Direction::None
}

pub fn magnetic_wall_entered(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, b: &BeamState) -> Direction {
    if b.laser == LaserType::Disruptor {
        disrupt(grid, ctx, at);
    } else if !hooks::expose(grid, ctx, at, Layer::LowerObjects, b.laser.exposure()) {
        hooks::absorb(ctx, at);
    }
    Direction::None
}

/// Replace the wall at `at` with a disrupted wall that remembers it.
fn disrupt(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
    let Some(wall) = grid.cell(at, Layer::LowerObjects) else {
        return;
    };
    let mut disrupted = ArenaObject::new(ObjectKind::DisruptedWall);
    disrupted.set_previous(Some(wall.clone()));
    disrupted.timer.arm(ctx.timers.disrupt_ticks);
    hooks::morph(grid, ctx, at, Layer::LowerObjects, disrupted, Some(SoundEffect::Disrupted));
}

/// Remove the barrel, kill a tank next to it, and blast its 3x3
/// neighbourhood. Chained barrels are already gone when the blast
/// reaches back, so the recursion ends.
pub fn explode_barrel(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, force: i32) {
    let Some(barrel) = grid.cell(at, Layer::LowerObjects) else {
        return;
    };
    let revealed = barrel.saved_or_empty();
    grid.put(at, Layer::LowerObjects, revealed);
    log::debug!("barrel exploded at {:?}", at);
    ctx.emit(GameEvent::Exploded { at });
    ctx.sound(SoundEffect::Barrel);

    let tank_nearby = grid
        .ring(at, 1)
        .into_iter()
        .chain(std::iter::once(at))
        .any(|p| grid.cell(p, Layer::UpperObjects).map_or(false, |o| o.kind.is_character()));
    if tank_nearby {
        engine::kill_tank(ctx);
    }
    blast(grid, ctx, at, RangeType::Bomb, force);
}

// ══════════════════════════════════════════════════════════════
// Area effects
// ══════════════════════════════════════════════════════════════

/// Apply `range` to the 3x3 area centred one cell ahead of `origin`.
pub fn apply_range_effect(
    grid: &mut ArenaGrid,
    ctx: &mut SimulationContext,
    origin: Pos,
    dir: Direction,
    range: RangeType,
    force: i32,
) {
    let (dx, dy) = dir.unresolve();
    let Some(target) = grid.normalize(origin.offset(dx, dy)) else {
        log::debug!("range effect from {:?} aimed off the arena", origin);
        return;
    };
    log::debug!("{:?} at {:?}", range, target);
    blast(grid, ctx, target, range, force);
}

fn blast(grid: &mut ArenaGrid, ctx: &mut SimulationContext, center: Pos, range: RangeType, force: i32) {
    let mut area = grid.ring(center, 1);
    area.insert(0, center);
    for p in area {
        for layer in [Layer::LowerObjects, Layer::LowerGround] {
            if let Some(kind) = hook_target(grid, p, layer) {
                kind.range_action(grid, ctx, p, layer, range, force);
            }
        }
    }
}
