/// The engine facade: advances an arena by one player action.
///
/// Processing order of a game action:
///   1. Clear the beam-trail overlay and the action's history status
///   2. Record the pre-action image on the undo stack
///   3. Perform the action (move / turn / fire / bomb)
///   4. Tick timers of the action's class on the tank's floor
///   5. Drop the history entry if nothing changed, else tag it
///
/// Undo, redo and restart bypass all of the above. A dead tank accepts
/// nothing but those three.

use crate::config::GameConfig;
use crate::domain::direction::Direction;
use crate::domain::kind::{ActionClass, Item, KeyColor, Layer, ObjectKind};
use crate::domain::material::{LaserType, RangeType};
use crate::domain::object::ArenaObject;
use super::beam;
use super::context::SimulationContext;
use super::error::{SimError, SimResult};
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};
use super::history::{History, HistoryFlag};
use super::hooks::{hook_target, ObjectHooks};
use super::push;
use super::timer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerAction {
    /// Move one cell; facing another way only turns the tank.
    Move(Direction),
    Turn(Direction),
    Fire(LaserType),
    UseBomb(RangeType),
    Undo,
    Redo,
    Restart,
}

pub struct Engine {
    pub grid: ArenaGrid,
    pub ctx: SimulationContext,
    pub history: History,
}

impl Engine {
    /// Take over a freshly loaded grid; its current cells become the
    /// level start state.
    pub fn new(mut grid: ArenaGrid, config: &GameConfig) -> Self {
        grid.save_state();
        Engine {
            grid,
            ctx: SimulationContext::new(config),
            history: History::new(config.history.max_depth),
        }
    }

    pub fn tank(&self) -> Option<Pos> {
        self.grid.find_player()
    }
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(engine: &mut Engine, action: PlayerAction) -> Vec<GameEvent> {
    let Engine { grid, ctx, history } = engine;
    match action {
        PlayerAction::Undo => {
            if history.undo(grid, ctx) {
                grid.set_all_dirty_flags();
                ctx.emit(GameEvent::Undone);
            }
            return ctx.take_events();
        }
        PlayerAction::Redo => {
            if history.redo(grid, ctx) {
                grid.set_all_dirty_flags();
                ctx.emit(GameEvent::Redone);
            }
            return ctx.take_events();
        }
        PlayerAction::Restart => {
            if grid.restore_state() {
                log::info!("level restarted");
                history.clear();
                ctx.reset_level();
                grid.clear_virtual();
                grid.set_all_dirty_flags();
            }
            return ctx.take_events();
        }
        _ => {}
    }

    if ctx.game_over {
        return vec![];
    }
    let Some(tank) = grid.find_player() else {
        log::warn!("no tank on the arena");
        return vec![];
    };

    grid.clear_virtual();
    ctx.status.clear();
    let before = grid.image();
    let inventory_before = ctx.inventory;
    history.record(grid, ctx, ctx.status);

    let class = match perform(grid, ctx, tank, action) {
        Ok(Some(class)) => class,
        Ok(None) => {
            history.discard_last();
            return ctx.take_events();
        }
        Err(e) => {
            log::warn!("{:?} aborted: {}", action, e);
            grid.restore_image(before);
            ctx.inventory = inventory_before;
            history.discard_last();
            ctx.events.clear();
            return vec![];
        }
    };

    let floor = grid.find_player().map_or(tank.floor, |p| p.floor);
    timer::tick_timers(grid, ctx, floor, class);

    if grid.image() == before && ctx.inventory == inventory_before {
        history.discard_last();
    } else {
        history.tag_last(ctx.status);
    }
    ctx.take_events()
}

/// Run one game action. `None` means it was refused and changed nothing.
fn perform(grid: &mut ArenaGrid, ctx: &mut SimulationContext, tank: Pos, action: PlayerAction) -> SimResult<Option<ActionClass>> {
    let facing = grid.cell(tank, Layer::UpperObjects).map_or(Direction::None, |t| t.direction);
    match action {
        PlayerAction::Move(dir) if dir != facing => Ok(turn(grid, ctx, tank, dir)),
        PlayerAction::Move(dir) => move_tank(grid, ctx, tank, dir),
        PlayerAction::Turn(dir) => Ok(turn(grid, ctx, tank, dir)),
        PlayerAction::Fire(laser) => Ok(fire(grid, ctx, tank, facing, laser)),
        PlayerAction::UseBomb(range) => Ok(use_bomb(grid, ctx, tank, facing, range)),
        PlayerAction::Undo | PlayerAction::Redo | PlayerAction::Restart => Ok(None),
    }
}

// ══════════════════════════════════════════════════════════════
// Tank actions
// ══════════════════════════════════════════════════════════════

fn turn(grid: &mut ArenaGrid, ctx: &mut SimulationContext, tank: Pos, dir: Direction) -> Option<ActionClass> {
    let t = grid.cell_mut(tank, Layer::UpperObjects)?;
    if t.direction == dir || dir.unresolve() == (0, 0) {
        return None;
    }
    t.direction = dir;
    ctx.sound(SoundEffect::Turn);
    Some(ActionClass::NonMove)
}

fn move_tank(grid: &mut ArenaGrid, ctx: &mut SimulationContext, tank: Pos, dir: Direction) -> SimResult<Option<ActionClass>> {
    let (dx, dy) = dir.unresolve();
    let Some(next) = grid.normalize(tank.offset(dx, dy)) else {
        ctx.sound(SoundEffect::BumpHead);
        return Ok(None);
    };
    let mover = grid
        .cell(tank, Layer::UpperObjects)
        .cloned()
        .ok_or(SimError::OutOfBounds { row: tank.row, col: tank.col, floor: tank.floor })?;

    let blocker = grid.cell(next, Layer::LowerObjects).filter(|o| o.is_solid()).map(|o| o.kind.clone());
    if let Some(kind) = blocker {
        if !kind.push_collide(grid, ctx, next, &mover) {
            return Ok(None);
        }
    }
    if !grid.is_free(next) {
        ctx.sound(SoundEffect::BumpHead);
        return Ok(None);
    }

    ctx.sound(SoundEffect::Move);
    let landed = push::relocate(grid, ctx, tank, next, Layer::UpperObjects, dir)?;
    log::debug!("tank {:?} -> {:?}", tank, landed);
    Ok(Some(ActionClass::Move))
}

fn fire(grid: &mut ArenaGrid, ctx: &mut SimulationContext, tank: Pos, facing: Direction, laser: LaserType) -> Option<ActionClass> {
    let powerful = grid.cell(tank, Layer::UpperObjects).map_or(false, |t| t.kind == ObjectKind::PowerfulTank);
    let (ammo, flag, sound) = match laser {
        LaserType::Green => (None, HistoryFlag::Laser, SoundEffect::Fire),
        LaserType::Power if powerful => (None, HistoryFlag::Laser, SoundEffect::Fire),
        LaserType::Power => (Some(Item::Boost), HistoryFlag::Boost, SoundEffect::Fire),
        LaserType::Missile => (Some(Item::Missile), HistoryFlag::Missile, SoundEffect::Missile),
        LaserType::Stunner => (Some(Item::Stunner), HistoryFlag::Stunner, SoundEffect::Stunner),
        LaserType::Blue => (Some(Item::BlueLaser), HistoryFlag::BlueLaser, SoundEffect::Fire),
        LaserType::Disruptor => (Some(Item::Disruptor), HistoryFlag::Disruptor, SoundEffect::Disruptor),
        LaserType::Red => {
            log::warn!("tanks cannot fire red beams");
            return None;
        }
    };
    if let Some(item) = ammo {
        if !ctx.inventory.consume(item) {
            log::debug!("out of {:?}", item);
            return None;
        }
    }
    ctx.touch(flag);
    ctx.sound(sound);
    let force = ctx.force_of(laser);
    let end = beam::fire_beam(grid, ctx, tank, facing, laser, force);
    log::debug!("{:?} beam ended {:?}", laser, end);
    Some(ActionClass::NonMove)
}

fn use_bomb(grid: &mut ArenaGrid, ctx: &mut SimulationContext, tank: Pos, facing: Direction, range: RangeType) -> Option<ActionClass> {
    let (item, flag) = match range {
        RangeType::Bomb => (Item::Bomb, HistoryFlag::Bomb),
        RangeType::HeatBomb => (Item::HeatBomb, HistoryFlag::HeatBomb),
        RangeType::IceBomb => (Item::IceBomb, HistoryFlag::IceBomb),
    };
    if !ctx.inventory.consume(item) {
        return None;
    }
    ctx.touch(flag);
    let force = ctx.beam.power_force;
    beam::apply_range_effect(grid, ctx, tank, facing, range, force);
    Some(ActionClass::NonMove)
}

// ══════════════════════════════════════════════════════════════
// Side effects shared with the rule modules
// ══════════════════════════════════════════════════════════════

/// The tank is destroyed. Only the first call per life has any effect.
pub fn kill_tank(ctx: &mut SimulationContext) {
    if ctx.game_over {
        return;
    }
    log::info!("tank destroyed");
    ctx.game_over = true;
    ctx.emit(GameEvent::TankKilled);
    ctx.sound(SoundEffect::Die);
}

/// A character walked onto a key or pickup.
pub fn collect_item(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &mut ArenaObject) {
    if !mover.kind.is_character() {
        return;
    }
    let (item, amount) = match hook_target(grid, at, Layer::LowerObjects) {
        Some(ObjectKind::Key(color)) => (color.item(), 1),
        Some(ObjectKind::Pickup(item)) => (item, 10),
        _ => return,
    };
    if amount == 1 {
        ctx.inventory.add_one(item);
    } else {
        ctx.inventory.add_ten(item);
    }
    grid.put(at, Layer::LowerObjects, ArenaObject::empty());
    ctx.emit(GameEvent::ItemCollected { item, amount });
    ctx.sound(SoundEffect::Grab);
}

/// A character bumped a key door. Returns true if it opened.
pub fn unlock_door(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, color: KeyColor) -> bool {
    if !ctx.inventory.consume(color.item()) {
        ctx.sound(SoundEffect::BumpHead);
        return false;
    }
    log::info!("{:?} door unlocked at {:?}", color, at);
    grid.put(at, Layer::LowerObjects, ArenaObject::empty());
    ctx.sound(SoundEffect::Unlock);
    true
}

// ══════════════════════════════════════════════════════════════
// Editor entry points
// ══════════════════════════════════════════════════════════════

/// Place `obj` on its own layer and run its placement scan.
pub fn editor_place(grid: &mut ArenaGrid, ctx: &mut SimulationContext, obj: ArenaObject, at: Pos) -> SimResult<()> {
    let layer = obj.layer();
    let kind = obj.kind.clone();
    grid.set_cell(obj, at.row, at.col, at.floor, layer)?;
    kind.editor_place(grid, ctx, at);
    Ok(())
}

/// Clear `(at, layer)`; floors fall back to plain ground.
pub fn editor_remove(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, layer: Layer) -> SimResult<()> {
    let kind = grid.get_cell(at.row, at.col, at.floor, layer)?.kind.clone();
    kind.editor_remove(grid, ctx, at);
    let filler = if layer == Layer::LowerGround {
        ArenaObject::new(ObjectKind::Ground)
    } else {
        ArenaObject::empty()
    };
    grid.set_cell(filler, at.row, at.col, at.floor, layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::ButtonPolicy;
    use crate::sim::grid::tests::{arena_from, kind_at};

    fn engine_from(rows: &[&str]) -> Engine {
        Engine::new(arena_from(rows), &GameConfig::default())
    }

    fn at(row: i32, col: i32) -> Pos {
        Pos::new(row, col, 0)
    }

    #[test]
    fn move_then_undo_redo() {
        let mut e = engine_from(&["@.."]);
        step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(e.tank(), Some(at(0, 1)));
        assert!(e.history.can_undo());

        let events = step(&mut e, PlayerAction::Undo);
        assert!(events.contains(&GameEvent::Undone));
        assert_eq!(e.tank(), Some(at(0, 0)));

        step(&mut e, PlayerAction::Redo);
        assert_eq!(e.tank(), Some(at(0, 1)));
    }

    #[test]
    fn blocked_move_records_nothing() {
        let mut e = engine_from(&["@#"]);
        let events = step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(e.tank(), Some(at(0, 0)));
        assert!(!e.history.can_undo());
        assert!(events.contains(&GameEvent::Sound(SoundEffect::BumpHead)));
    }

    #[test]
    fn moving_another_way_turns_first() {
        let mut e = engine_from(&["@", "."]);
        step(&mut e, PlayerAction::Move(Direction::South));
        assert_eq!(e.tank(), Some(at(0, 0)));
        assert_eq!(e.grid.cell(at(0, 0), Layer::UpperObjects).unwrap().direction, Direction::South);
        step(&mut e, PlayerAction::Move(Direction::South));
        assert_eq!(e.tank(), Some(at(1, 0)));
    }

    #[test]
    fn special_ammo_is_consumed_and_tagged() {
        let mut e = engine_from(&["@.w"]);
        let events = step(&mut e, PlayerAction::Fire(LaserType::Missile));
        assert!(events.is_empty());
        assert_eq!(kind_at(&e.grid, 0, 2), ObjectKind::WoodenWall);

        e.ctx.inventory.add_one(Item::Missile);
        step(&mut e, PlayerAction::Fire(LaserType::Missile));
        assert!(kind_at(&e.grid, 0, 2).is_empty());
        assert_eq!(e.ctx.inventory.count(Item::Missile), 0);
        let status = e.history.peek_undo_status().unwrap();
        assert!(status.is_set(HistoryFlag::Missile));

        step(&mut e, PlayerAction::Undo);
        assert_eq!(e.ctx.inventory.count(Item::Missile), 1);
        assert_eq!(kind_at(&e.grid, 0, 2), ObjectKind::WoodenWall);
    }

    #[test]
    fn key_opens_key_door() {
        let mut e = engine_from(&["@kK."]);
        step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(e.ctx.inventory.count(Item::RedKey), 1);
        assert!(kind_at(&e.grid, 0, 1).is_empty());

        let events = step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(e.tank(), Some(at(0, 2)));
        assert_eq!(e.ctx.inventory.count(Item::RedKey), 0);
        assert!(events.contains(&GameEvent::Sound(SoundEffect::Unlock)));
    }

    #[test]
    fn locked_door_without_key_blocks() {
        let mut e = engine_from(&["@K"]);
        step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(e.tank(), Some(at(0, 0)));
        assert_eq!(kind_at(&e.grid, 0, 1), ObjectKind::KeyDoor(KeyColor::Red));
    }

    #[test]
    fn dead_tank_only_undoes() {
        let mut e = engine_from(&["@L."]);
        let events = step(&mut e, PlayerAction::Move(Direction::East));
        assert!(e.ctx.game_over);
        assert!(events.contains(&GameEvent::TankKilled));

        assert!(step(&mut e, PlayerAction::Move(Direction::East)).is_empty());
        assert_eq!(e.tank(), Some(at(0, 1)));

        step(&mut e, PlayerAction::Undo);
        assert!(!e.ctx.game_over);
        assert_eq!(e.tank(), Some(at(0, 0)));
    }

    #[test]
    fn redo_into_lava_stays_dead() {
        let mut e = engine_from(&["@L."]);
        step(&mut e, PlayerAction::Move(Direction::East));
        step(&mut e, PlayerAction::Undo);
        assert!(!e.ctx.game_over);

        let events = step(&mut e, PlayerAction::Redo);
        assert!(events.contains(&GameEvent::Redone));
        assert!(e.ctx.game_over);
        assert_eq!(e.tank(), Some(at(0, 1)));

        assert!(step(&mut e, PlayerAction::Move(Direction::East)).is_empty());
        assert_eq!(e.tank(), Some(at(0, 1)));
    }

    #[test]
    fn anti_tank_shoots_after_a_move() {
        // the second step down puts the tank in row 2, facing the anti-tank
        let mut e = engine_from(&["@", ".", "....A"]);
        e.grid.cell_mut(at(0, 0), Layer::UpperObjects).unwrap().direction = Direction::South;
        step(&mut e, PlayerAction::Move(Direction::South));
        assert!(!e.ctx.game_over);
        let events = step(&mut e, PlayerAction::Move(Direction::South));
        assert!(e.ctx.game_over);
        assert!(events.contains(&GameEvent::Sound(SoundEffect::AntiFire)));
    }

    #[test]
    fn restart_returns_to_start() {
        let mut e = engine_from(&["@.B."]);
        e.ctx.inventory.add_one(Item::Stunner);
        step(&mut e, PlayerAction::Fire(LaserType::Green));
        step(&mut e, PlayerAction::Move(Direction::East));
        assert_eq!(kind_at(&e.grid, 0, 3), ObjectKind::Box);

        step(&mut e, PlayerAction::Restart);
        assert_eq!(e.tank(), Some(at(0, 0)));
        assert_eq!(kind_at(&e.grid, 0, 2), ObjectKind::Box);
        assert!(!e.history.can_undo());
        assert_eq!(e.ctx.inventory.count(Item::Stunner), 0);
    }

    #[test]
    fn bomb_clears_area_ahead() {
        let mut e = engine_from(&["@.B", "..o"]);
        e.ctx.inventory.add_one(Item::Bomb);
        step(&mut e, PlayerAction::UseBomb(RangeType::Bomb));
        // centred on (0,1): both boxes are in the 3x3
        assert!(kind_at(&e.grid, 0, 2).is_empty());
        assert!(kind_at(&e.grid, 1, 2).is_empty());
        assert!(e.history.peek_undo_status().unwrap().is_set(HistoryFlag::Bomb));
    }

    #[test]
    fn editor_binds_and_unbinds() {
        let mut g = arena_from(&[]);
        let mut ctx = SimulationContext::default();
        editor_place(&mut g, &mut ctx, ArenaObject::new(ObjectKind::button_door(ButtonPolicy::Pressure)), at(2, 2)).unwrap();
        editor_place(&mut g, &mut ctx, ArenaObject::new(ObjectKind::button(ButtonPolicy::Pressure)), at(5, 5)).unwrap();
        let bound = |g: &ArenaGrid| match kind_at(g, 5, 5) {
            ObjectKind::Button { door, .. } => door,
            _ => None,
        };
        assert_eq!(bound(&g), Some((2, 2)));

        editor_remove(&mut g, &mut ctx, at(2, 2), Layer::LowerObjects).unwrap();
        assert_eq!(bound(&g), None);
        assert!(editor_place(&mut g, &mut ctx, ArenaObject::new(ObjectKind::Wall), at(30, 0)).is_err());
    }
}
