/// Per-object timers.
///
/// A tick of one action class runs in three passes over a floor:
///
///   1. waiting tunnel movers retry their exit scan
///   2. every timer that accepts the class counts down; the ones that
///      reach zero are collected
///   3. `timer_expired` runs for each collected object
///
/// Movables and characters re-arm a one-tick timer on every expiry,
/// which gives them a hook on every tick. A closing sweep re-arms any of
/// them whose hook never ran because something moved it mid-tick.

use crate::domain::direction::Direction;
use crate::domain::kind::{ActionClass, Layer, ObjectKind};
use crate::domain::material::LaserType;
use crate::domain::object::ArenaObject;
use super::beam;
use super::context::SimulationContext;
use super::event::SoundEffect;
use super::grid::{ArenaGrid, Pos};
use super::hooks::{self, hook_target, ObjectHooks};
use super::tunnel;

const TIMED_LAYERS: [Layer; 2] = [Layer::LowerObjects, Layer::UpperObjects];

pub fn tick_timers(grid: &mut ArenaGrid, ctx: &mut SimulationContext, floor: i32, class: ActionClass) {
    tunnel::retry_waiting(grid, ctx, floor);

    let running: Vec<(Pos, Layer)> = grid
        .positions(floor)
        .flat_map(|p| TIMED_LAYERS.map(|l| (p, l)))
        .filter(|&(p, l)| grid.cell(p, l).map_or(false, |o| o.timer.active && o.accepts_tick(class)))
        .collect();

    let mut expired = Vec::new();
    for (p, l) in running {
        if let Some(obj) = grid.cell_mut(p, l) {
            if obj.timer.tick() {
                expired.push((p, l));
            }
        }
    }

    for (p, l) in expired {
        if let Some(kind) = hook_target(grid, p, l) {
            kind.timer_expired(grid, ctx, p, l, class);
        }
    }

    let stalled: Vec<(Pos, Layer)> = grid
        .positions(floor)
        .flat_map(|p| TIMED_LAYERS.map(|l| (p, l)))
        .filter(|&(p, l)| grid.cell(p, l).map_or(false, |o| o.kind.has_perpetual_timer() && !o.timer.active))
        .collect();
    for (p, l) in stalled {
        rearm(grid, p, l);
    }
}

pub fn rearm(grid: &mut ArenaGrid, at: Pos, layer: Layer) {
    if let Some(obj) = grid.cell_mut(at, layer) {
        obj.timer.arm(1);
    }
}

/// Anti-tanks fire a red beam along their facing when the tank is in
/// plain sight.
pub fn anti_tank_expired(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, class: ActionClass) {
    rearm(grid, at, Layer::LowerObjects);
    if class != ActionClass::Move {
        return;
    }
    let Some(facing) = grid.cell(at, Layer::LowerObjects).map(|o| o.direction) else {
        return;
    };
    if tank_in_sight(grid, at, facing) {
        log::debug!("anti-tank at {:?} fires {:?}", at, facing);
        ctx.sound(SoundEffect::AntiFire);
        let force = ctx.beam.laser_force;
        beam::fire_beam(grid, ctx, at, facing, LaserType::Red, force);
    }
}

fn tank_in_sight(grid: &ArenaGrid, from: Pos, dir: Direction) -> bool {
    let (dx, dy) = dir.unresolve();
    if (dx, dy) == (0, 0) {
        return false;
    }
    let mut p = from;
    for _ in 0..grid.rows().max(grid.cols()) {
        let Some(next) = grid.normalize(p.offset(dx, dy)) else {
            return false;
        };
        if next == from {
            return false;
        }
        if grid.cell(next, Layer::UpperObjects).map_or(false, |o| o.kind.is_character()) {
            return true;
        }
        if grid.cell(next, Layer::LowerObjects).map_or(true, |o| o.is_solid()) {
            return false;
        }
        p = next;
    }
    false
}

pub fn stun_expired(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
    let Some(revived) = grid.cell(at, Layer::LowerObjects).map(|o| o.morph_into(ObjectKind::AntiTank)) else {
        return;
    };
    hooks::morph(grid, ctx, at, Layer::LowerObjects, revived, Some(SoundEffect::StunOff));
}

pub fn disrupt_expired(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
    let Some(restored) = grid
        .cell(at, Layer::LowerObjects)
        .map(|o| o.previous().cloned().unwrap_or_else(|| ArenaObject::new(ObjectKind::MagneticWall)))
    else {
        return;
    };
    hooks::morph(grid, ctx, at, Layer::LowerObjects, restored, Some(SoundEffect::DisruptEnd));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::GameEvent;
    use crate::sim::grid::tests::{arena_from, kind_at};

    fn at(row: i32, col: i32) -> Pos {
        Pos::new(row, col, 0)
    }

    #[test]
    fn movable_timers_are_perpetual() {
        let mut g = arena_from(&["B"]);
        let mut ctx = SimulationContext::default();
        for _ in 0..3 {
            tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
            let t = g.cell(at(0, 0), Layer::LowerObjects).unwrap().timer;
            assert!(t.active);
            assert_eq!(t.remaining, 1);
        }
    }

    #[test]
    fn anti_tank_ignores_non_move_ticks() {
        // anti-tank at (0,2) faces west at the tank
        let mut g = arena_from(&["@.A"]);
        let mut ctx = SimulationContext::default();
        tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
        assert!(!ctx.game_over);
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        assert!(ctx.game_over);
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::AntiFire)));
    }

    #[test]
    fn anti_tank_needs_line_of_sight() {
        let mut g = arena_from(&["@#A"]);
        let mut ctx = SimulationContext::default();
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        assert!(!ctx.game_over);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn stun_wears_off_after_move_ticks() {
        let mut g = arena_from(&[]);
        let mut stunned = ArenaObject::new(ObjectKind::StunnedAntiTank).with_direction(Direction::South);
        stunned.timer.arm(3);
        g.put(at(0, 0), Layer::LowerObjects, stunned);
        let mut ctx = SimulationContext::default();

        tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        assert_eq!(kind_at(&g, 0, 0), ObjectKind::StunnedAntiTank);
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        let anti = g.cell(at(0, 0), Layer::LowerObjects).unwrap();
        assert_eq!(anti.kind, ObjectKind::AntiTank);
        assert_eq!(anti.direction, Direction::South);
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::StunOff)));
    }

    #[test]
    fn disrupted_wall_reforms() {
        let mut g = arena_from(&["C"]);
        let mut ctx = SimulationContext::default();
        let crystal = g.cell(at(0, 0), Layer::LowerObjects).cloned().unwrap();
        let mut d = ArenaObject::new(ObjectKind::DisruptedWall);
        d.set_previous(Some(crystal));
        d.timer.arm(2);
        g.put(at(0, 0), Layer::LowerObjects, d);

        tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
        assert_eq!(kind_at(&g, 0, 0), ObjectKind::DisruptedWall);
        tick_timers(&mut g, &mut ctx, 0, ActionClass::Move);
        assert_eq!(kind_at(&g, 0, 0), ObjectKind::CrystalBlock);
    }

    #[test]
    fn tick_expires_only_once() {
        let mut g = arena_from(&[]);
        let mut d = ArenaObject::new(ObjectKind::DisruptedWall);
        d.timer.arm(1);
        g.put(at(0, 0), Layer::LowerObjects, d);
        let mut ctx = SimulationContext::default();
        tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
        assert_eq!(kind_at(&g, 0, 0), ObjectKind::MagneticWall);
        let ends = ctx.events.iter().filter(|e| **e == GameEvent::Sound(SoundEffect::DisruptEnd)).count();
        tick_timers(&mut g, &mut ctx, 0, ActionClass::NonMove);
        let ends_after = ctx.events.iter().filter(|e| **e == GameEvent::Sound(SoundEffect::DisruptEnd)).count();
        assert_eq!((ends, ends_after), (1, 1));
    }
}
