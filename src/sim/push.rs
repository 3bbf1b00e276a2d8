/// Push-chain resolver and single-object moves.
///
/// ## Two phases
///
///   plan     walk forward from the first mover with a work-list and a
///            visited set, charging each link `max(1, reaction force)`.
///            Pure: reads the grid, never writes it.
///   commit   move the links farthest-first, so every link steps into a
///            cell its successor has already vacated. A hook fault
///            mid-commit restores the snapshot taken before the first
///            move.
///
/// A link needs remaining force strictly above its own reaction force.
/// The chain is blocked by the arena edge, a cycle (wrapping arenas), a
/// solid that cannot move, or a character in the way.
///
/// ## Moving one object
///
/// `relocate()` lifts the object out of its cell, reveals what it stood
/// on, runs `push_into` on the destination's lower object and then its
/// ground, stores it, and finally runs `push_out` on what it left. While
/// `post_move` says so (ice), the move repeats one more cell.

use std::collections::HashSet;

use crate::domain::direction::Direction;
use crate::domain::kind::{Layer, ObjectKind, TypeTag};
use crate::domain::object::ArenaObject;
use super::context::SimulationContext;
use super::engine;
use super::error::{SimError, SimResult};
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};
use super::hooks::{hook_target, Entry, ObjectHooks};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushPlan {
    /// (from, to) per link, nearest first.
    pub links: Vec<(Pos, Pos)>,
    /// Force charged for the whole chain.
    pub spent: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainBlock {
    OutOfBounds,
    Cycle,
    Immovable(Pos),
    Occupied(Pos),
    Insufficient { at: Pos, remaining: i32 },
    /// A hook failed during commit; the chain was rolled back.
    Fault,
}

// ══════════════════════════════════════════════════════════════
// Phase 1: validate
// ══════════════════════════════════════════════════════════════

pub fn plan_chain(grid: &ArenaGrid, start: Pos, dir: Direction, force: i32) -> Result<PushPlan, ChainBlock> {
    let (dx, dy) = dir.unresolve();
    if (dx, dy) == (0, 0) {
        return Err(ChainBlock::Immovable(start));
    }
    let mut current = grid.normalize(start).ok_or(ChainBlock::OutOfBounds)?;
    let mut visited: HashSet<Pos> = HashSet::new();
    let mut links = Vec::new();
    let mut remaining = force;

    loop {
        if !visited.insert(current) {
            return Err(ChainBlock::Cycle);
        }
        let obj = grid.cell(current, Layer::LowerObjects).ok_or(ChainBlock::OutOfBounds)?;
        if !obj.can_move() {
            return Err(ChainBlock::Immovable(current));
        }
        if remaining <= obj.minimum_reaction_force() {
            return Err(ChainBlock::Insufficient { at: current, remaining });
        }
        remaining -= obj.material.force_cost();

        let next = grid.normalize(current.offset(dx, dy)).ok_or(ChainBlock::OutOfBounds)?;
        links.push((current, next));

        let occupied = grid.cell(next, Layer::UpperObjects).map_or(true, |o| !o.kind.is_empty());
        if occupied {
            return Err(ChainBlock::Occupied(next));
        }
        if grid.is_free(next) {
            break;
        }
        current = next;
    }

    Ok(PushPlan { links, spent: force - remaining })
}

// ══════════════════════════════════════════════════════════════
// Phase 2: commit
// ══════════════════════════════════════════════════════════════

/// Validate and move the chain starting at `start`.
pub fn push_chain(
    grid: &mut ArenaGrid,
    ctx: &mut SimulationContext,
    start: Pos,
    dir: Direction,
    force: i32,
) -> Result<PushPlan, ChainBlock> {
    let plan = plan_chain(grid, start, dir, force)?;
    commit_chain(grid, ctx, &plan, dir)?;
    log::debug!("chain of {} from {:?} moved {:?}, spent {}", plan.links.len(), start, dir, plan.spent);
    Ok(plan)
}

fn commit_chain(grid: &mut ArenaGrid, ctx: &mut SimulationContext, plan: &PushPlan, dir: Direction) -> Result<(), ChainBlock> {
    let snapshot = grid.image();
    let mark = ctx.events.len();
    for &(from, to) in plan.links.iter().rev() {
        let sound = push_sound(grid, from);
        if let Err(e) = relocate(grid, ctx, from, to, Layer::LowerObjects, dir) {
            log::warn!("push chain fault at {:?}: {}; rolling back", from, e);
            grid.restore_image(snapshot);
            ctx.events.truncate(mark);
            return Err(ChainBlock::Fault);
        }
        ctx.sound(sound);
    }
    Ok(())
}

fn push_sound(grid: &ArenaGrid, at: Pos) -> SoundEffect {
    match grid.cell(at, Layer::LowerObjects) {
        Some(o) if o.is_of_type(TypeTag::MovableMirror) => SoundEffect::PushMirror,
        Some(o) if o.is_of_type(TypeTag::Anti) => SoundEffect::PushAnti,
        _ => SoundEffect::PushBox,
    }
}

// ══════════════════════════════════════════════════════════════
// Single-object moves
// ══════════════════════════════════════════════════════════════

/// Move the object at `(from, layer)` to `to`, then keep going in `dir`
/// while `post_move` asks for it. Returns where it came to rest, or
/// `None` if it was consumed on the way.
pub fn relocate(
    grid: &mut ArenaGrid,
    ctx: &mut SimulationContext,
    from: Pos,
    to: Pos,
    layer: Layer,
    dir: Direction,
) -> SimResult<Option<Pos>> {
    let (dx, dy) = dir.unresolve();
    // a slide can never cross more cells than the floor has
    let limit = (grid.rows() * grid.cols()) as usize;
    let mut from = from;
    let mut to = to;

    for _ in 0..limit {
        let Some(landed) = step_once(grid, ctx, from, to, layer)? else {
            return Ok(None);
        };
        let kind = hook_target(grid, landed, layer).unwrap_or_default();
        if !kind.post_move(grid, ctx, landed, dir) {
            return Ok(Some(landed));
        }
        match grid.normalize(landed.offset(dx, dy)) {
            Some(next) => {
                from = landed;
                to = next;
            }
            None => return Ok(Some(landed)),
        }
    }
    Ok(Some(from))
}

fn step_once(grid: &mut ArenaGrid, ctx: &mut SimulationContext, from: Pos, to: Pos, layer: Layer) -> SimResult<Option<Pos>> {
    let mut mover = grid.take(from, layer).ok_or_else(|| out_of_bounds(from))?;
    mover.waiting_on_tunnel = false;

    let left = if layer == Layer::LowerObjects {
        let revealed = mover.take_saved();
        grid.put(from, layer, revealed.clone());
        revealed
    } else {
        grid.cell(from, Layer::LowerObjects).cloned().unwrap_or_default()
    };

    let pusher = mover.clone();
    let landed = land(grid, ctx, to, layer, mover)?;
    left.kind.push_out(grid, ctx, from, &pusher);
    if let Some(at) = landed {
        ctx.emit(GameEvent::Pushed { from, to: at });
    }
    Ok(landed)
}

fn land(grid: &mut ArenaGrid, ctx: &mut SimulationContext, to: Pos, layer: Layer, mut mover: ArenaObject) -> SimResult<Option<Pos>> {
    let mut at = grid.normalize(to).ok_or_else(|| out_of_bounds(to))?;

    let there = hook_target(grid, at, Layer::LowerObjects).unwrap_or_default();
    match there.push_into(grid, ctx, at, &mut mover) {
        Entry::Consumed => return Ok(None),
        Entry::Redirect(exit) => {
            log::debug!("{} teleported {:?} -> {:?}", mover.identity(), at, exit);
            ctx.emit(GameEvent::Teleported { from: at, to: exit });
            ctx.sound(SoundEffect::Teleport);
            at = exit;
        }
        Entry::Enter => {}
    }

    let ground = hook_target(grid, at, Layer::LowerGround).unwrap_or_default();
    if ground.push_into(grid, ctx, at, &mut mover) == Entry::Consumed {
        return Ok(None);
    }

    if layer == Layer::LowerObjects {
        let under = grid.cell(at, Layer::LowerObjects).cloned().unwrap_or_default();
        mover.set_saved(under);
    }
    grid.put(at, layer, mover);
    Ok(Some(at))
}

fn out_of_bounds(p: Pos) -> SimError {
    SimError::OutOfBounds { row: p.row, col: p.col, floor: p.floor }
}

// ══════════════════════════════════════════════════════════════
// Ground reactions
// ══════════════════════════════════════════════════════════════

/// A mover arrives on a special floor.
///
///   floor       movable                          tank
///   lava        icy box: cools the lava, is gone  dies
///               anything else: melts
///   deep water  boxes fill it, others sink        dies
///   ice         hot box defrosts it               -
pub fn ground_push_into(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &mut ArenaObject) -> Entry {
    let ground = hook_target(grid, at, Layer::LowerGround).unwrap_or_default();
    if mover.kind.is_character() {
        if matches!(ground, ObjectKind::Lava | ObjectKind::DeepWater) {
            ctx.sound(if ground == ObjectKind::Lava { SoundEffect::Melt } else { SoundEffect::Sink });
            engine::kill_tank(ctx);
        }
        return Entry::Enter;
    }
    match ground {
        ObjectKind::Lava => {
            if mover.kind == ObjectKind::IcyBox {
                replace_ground(grid, ctx, at, SoundEffect::CoolOff);
            } else {
                ctx.sound(SoundEffect::Melt);
            }
            log::debug!("{} consumed by lava at {:?}", mover.identity(), at);
            Entry::Consumed
        }
        ObjectKind::DeepWater => {
            if mover.is_of_type(TypeTag::Box) {
                replace_ground(grid, ctx, at, SoundEffect::Sink);
            } else {
                ctx.sound(SoundEffect::Sink);
            }
            log::debug!("{} sank at {:?}", mover.identity(), at);
            Entry::Consumed
        }
        ObjectKind::Ice if mover.kind == ObjectKind::HotBox => {
            replace_ground(grid, ctx, at, SoundEffect::Defrost);
            Entry::Enter
        }
        _ => Entry::Enter,
    }
}

fn replace_ground(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, sound: SoundEffect) {
    let from = grid.cell(at, Layer::LowerGround).map_or("Empty", |o| o.identity());
    ctx.emit(GameEvent::Morphed { at, from, to: "Ground" });
    ctx.sound(sound);
    grid.put(at, Layer::LowerGround, ArenaObject::new(ObjectKind::Ground));
}

/// Does a mover that just landed on `at` slide on in `dir`?
pub fn keeps_sliding(grid: &mut ArenaGrid, _ctx: &mut SimulationContext, at: Pos, dir: Direction) -> bool {
    let (dx, dy) = dir.unresolve();
    if (dx, dy) == (0, 0) {
        return false;
    }
    let on_ice = grid.cell(at, Layer::LowerGround).map_or(false, |g| !g.is_frictional());
    let waiting = [Layer::LowerObjects, Layer::UpperObjects]
        .iter()
        .any(|&l| grid.cell(at, l).map_or(false, |o| o.waiting_on_tunnel));
    on_ice && !waiting && grid.normalize(at.offset(dx, dy)).map_or(false, |n| grid.is_free(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::material::{Color, Material};
    use crate::sim::grid::tests::{arena_from, kind_at};

    fn at(row: i32, col: i32) -> Pos {
        Pos::new(row, col, 0)
    }

    #[test]
    fn force_conservation_over_chain_lengths() {
        // n stone boxes cost 1 each, and the last link still needs
        // remaining > 1, so a chain of n moves iff force > n
        for n in 1..=4usize {
            let row = format!("{}.", "B".repeat(n));
            let g = arena_from(&[row.as_str()]);
            for force in 0..=6 {
                match plan_chain(&g, at(0, 0), Direction::East, force) {
                    Ok(plan) => {
                        assert!(force > n as i32, "n={} force={}", n, force);
                        assert_eq!(plan.links.len(), n);
                        assert!(plan.spent >= n as i32);
                    }
                    Err(_) => assert!(force <= n as i32, "n={} force={}", n, force),
                }
            }
        }
    }

    #[test]
    fn plastic_links_yield_to_any_force() {
        let mut g = arena_from(&["BB."]);
        for col in 0..2 {
            g.cell_mut(at(0, col), Layer::LowerObjects).unwrap().material = Material::Plastic;
        }
        assert!(matches!(
            plan_chain(&g, at(0, 1), Direction::East, 0),
            Err(ChainBlock::Insufficient { remaining: 0, .. })
        ));
        assert_eq!(plan_chain(&g, at(0, 1), Direction::East, 1).unwrap().spent, 1);

        // each plastic link still charges one unit
        assert_eq!(
            plan_chain(&g, at(0, 0), Direction::East, 1).unwrap_err(),
            ChainBlock::Insufficient { at: at(0, 1), remaining: 0 }
        );
        let plan = plan_chain(&g, at(0, 0), Direction::East, 2).unwrap();
        assert_eq!(plan.links.len(), 2);
        assert_eq!(plan.spent, 2);
    }

    #[test]
    fn blocked_chain_changes_nothing() {
        let mut g = arena_from(&["BB#"]);
        let mut ctx = SimulationContext::default();
        let before = g.image();
        let err = push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 9).unwrap_err();
        assert_eq!(err, ChainBlock::Immovable(at(0, 2)));
        assert_eq!(g.image(), before);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn chain_to_edge_is_blocked() {
        let mut g = arena_from(&[]);
        g.put(at(0, 22), Layer::LowerObjects, ArenaObject::new(ObjectKind::Box));
        g.put(at(0, 23), Layer::LowerObjects, ArenaObject::new(ObjectKind::Box));
        assert_eq!(plan_chain(&g, at(0, 22), Direction::East, 9), Err(ChainBlock::OutOfBounds));
    }

    #[test]
    fn full_wrapped_row_is_a_cycle() {
        let row = "B".repeat(24);
        let mut g = arena_from(&[row.as_str()]);
        g.wrap.horizontal = true;
        assert_eq!(plan_chain(&g, at(0, 0), Direction::East, 100), Err(ChainBlock::Cycle));
    }

    #[test]
    fn tank_blocks_chain() {
        let g = arena_from(&["B@"]);
        assert_eq!(plan_chain(&g, at(0, 0), Direction::East, 5), Err(ChainBlock::Occupied(at(0, 1))));
    }

    #[test]
    fn chain_commits_in_order() {
        let mut g = arena_from(&["BoM."]);
        let mut ctx = SimulationContext::default();
        // stone 1 + wooden 1 + metallic 2; the metallic link needs remaining > 2
        assert!(push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 4).is_err());
        let plan = push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 5).unwrap();
        assert_eq!(plan.spent, 4);
        assert!(kind_at(&g, 0, 0).is_empty());
        assert_eq!(kind_at(&g, 0, 1), ObjectKind::Box);
        assert_eq!(kind_at(&g, 0, 2), ObjectKind::WoodenBox);
        assert_eq!(kind_at(&g, 0, 3), ObjectKind::MetallicBox);
        let pushes = ctx.events.iter().filter(|e| matches!(e, GameEvent::Pushed { .. })).count();
        assert_eq!(pushes, 3);
    }

    #[test]
    fn mover_reveals_what_it_stood_on() {
        let mut g = arena_from(&[]);
        let tunnel = ArenaObject::new(ObjectKind::Tunnel).with_color(Color::Green);
        g.put(at(2, 2), Layer::LowerObjects, ArenaObject::new(ObjectKind::Box).with_saved(tunnel));
        let mut ctx = SimulationContext::default();
        push_chain(&mut g, &mut ctx, at(2, 2), Direction::South, 2).unwrap();
        assert_eq!(kind_at(&g, 2, 2), ObjectKind::Tunnel);
        let moved = g.cell(at(3, 2), Layer::LowerObjects).unwrap();
        assert_eq!(moved.kind, ObjectKind::Box);
        assert!(moved.saved().is_none());
    }

    #[test]
    fn slides_across_ice() {
        let mut g = arena_from(&["B~~~.."]);
        let mut ctx = SimulationContext::default();
        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        assert_eq!(kind_at(&g, 0, 4), ObjectKind::Box);
        for col in 0..4 {
            assert!(kind_at(&g, 0, col).is_empty());
        }
    }

    #[test]
    fn slide_stops_at_obstacle() {
        let mut g = arena_from(&["B~~#"]);
        let mut ctx = SimulationContext::default();
        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        assert_eq!(kind_at(&g, 0, 2), ObjectKind::Box);
    }

    #[test]
    fn lava_and_water() {
        let mut g = arena_from(&["BL", "IL", "BW"]);
        let mut ctx = SimulationContext::default();

        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        assert!(kind_at(&g, 0, 1).is_empty());
        assert_eq!(g.cell(at(0, 1), Layer::LowerGround).unwrap().kind, ObjectKind::Lava);

        push_chain(&mut g, &mut ctx, at(1, 0), Direction::East, 2).unwrap();
        assert!(kind_at(&g, 1, 1).is_empty());
        assert_eq!(g.cell(at(1, 1), Layer::LowerGround).unwrap().kind, ObjectKind::Ground);
        assert!(ctx.events.contains(&GameEvent::Sound(SoundEffect::CoolOff)));

        push_chain(&mut g, &mut ctx, at(2, 0), Direction::East, 2).unwrap();
        assert!(kind_at(&g, 2, 1).is_empty());
        assert_eq!(g.cell(at(2, 1), Layer::LowerGround).unwrap().kind, ObjectKind::Ground);
    }

    #[test]
    fn hot_box_defrosts_ice_floor() {
        let mut g = arena_from(&[".~."]);
        g.put(at(0, 0), Layer::LowerObjects, ArenaObject::new(ObjectKind::HotBox));
        let mut ctx = SimulationContext::default();
        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        // the ice turned to ground before the slide check, so the box stops
        assert_eq!(kind_at(&g, 0, 1), ObjectKind::HotBox);
        assert_eq!(g.cell(at(0, 1), Layer::LowerGround).unwrap().kind, ObjectKind::Ground);
    }
}
