/// Tunnel teleports.
///
/// Entering a tunnel scans outward ring by ring (Chebyshev radius 1 up
/// to `scan_radius`) for another bare tunnel of the same color with no
/// tank on it. Found: the mover lands there and the color's network is
/// marked not full. Not found: the mover parks on the entry tunnel with
/// `waiting_on_tunnel` set, the network is marked full, and every tick
/// retries the scan until an exit frees up.

use crate::domain::kind::{Layer, ObjectKind};
use crate::domain::material::Color;
use crate::domain::object::ArenaObject;
use super::context::SimulationContext;
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};
use super::hooks::Entry;

fn network_color(tunnel: &ArenaObject) -> Color {
    tunnel.color.unwrap_or(Color::Gray)
}

fn is_open_exit(grid: &ArenaGrid, p: Pos, color: Color) -> bool {
    let bare = grid
        .cell(p, Layer::LowerObjects)
        .map_or(false, |o| o.kind == ObjectKind::Tunnel && network_color(o) == color);
    bare && grid.cell(p, Layer::UpperObjects).map_or(false, |o| o.kind.is_empty())
}

/// Nearest open same-color tunnel to `from`, ring by ring.
pub fn find_exit(grid: &ArenaGrid, from: Pos, color: Color, radius: i32) -> Option<Pos> {
    (1..=radius).find_map(|r| grid.ring(from, r).into_iter().find(|&p| is_open_exit(grid, p, color)))
}

pub fn tunnel_push_into(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &mut ArenaObject) -> Entry {
    let Some(color) = grid.cell(at, Layer::LowerObjects).map(network_color) else {
        return Entry::Enter;
    };
    match find_exit(grid, at, color, ctx.scan_radius) {
        Some(exit) => {
            ctx.set_tunnel_full(color, false);
            Entry::Redirect(exit)
        }
        None => {
            log::debug!("{:?} tunnel network full, {} waits at {:?}", color, mover.identity(), at);
            ctx.set_tunnel_full(color, true);
            mover.waiting_on_tunnel = true;
            ctx.emit(GameEvent::WaitingOnTunnel { at });
            Entry::Enter
        }
    }
}

/// Give every waiting mover on `floor` another chance at an exit.
pub fn retry_waiting(grid: &mut ArenaGrid, ctx: &mut SimulationContext, floor: i32) {
    let waiting: Vec<(Pos, Layer)> = grid
        .positions(floor)
        .flat_map(|p| [(p, Layer::LowerObjects), (p, Layer::UpperObjects)])
        .filter(|&(p, l)| grid.cell(p, l).map_or(false, |o| o.waiting_on_tunnel))
        .collect();

    for (at, layer) in waiting {
        let tunnel = if layer == Layer::LowerObjects {
            grid.cell(at, layer).and_then(|o| o.saved()).filter(|s| s.kind == ObjectKind::Tunnel).cloned()
        } else {
            grid.cell(at, Layer::LowerObjects).filter(|s| s.kind == ObjectKind::Tunnel).cloned()
        };
        let Some(tunnel) = tunnel else {
            // no longer on a tunnel
            if let Some(o) = grid.cell_mut(at, layer) {
                o.waiting_on_tunnel = false;
            }
            continue;
        };
        let color = network_color(&tunnel);
        let Some(exit) = find_exit(grid, at, color, ctx.scan_radius) else {
            ctx.set_tunnel_full(color, true);
            continue;
        };
        ctx.set_tunnel_full(color, false);
        teleport(grid, ctx, at, exit, layer);
    }
}

/// Move a parked mover straight to `exit` without running entry hooks.
fn teleport(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, exit: Pos, layer: Layer) {
    let Some(mut mover) = grid.take(at, layer) else {
        return;
    };
    mover.waiting_on_tunnel = false;
    if layer == Layer::LowerObjects {
        let revealed = mover.take_saved();
        grid.put(at, layer, revealed);
        let under = grid.cell(exit, Layer::LowerObjects).cloned().unwrap_or_default();
        mover.set_saved(under);
    }
    log::debug!("{} left waiting at {:?} for {:?}", mover.identity(), at, exit);
    grid.put(exit, layer, mover);
    ctx.emit(GameEvent::Teleported { from: at, to: exit });
    ctx.sound(SoundEffect::Teleport);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::direction::Direction;
    use crate::domain::material::Material;
    use crate::sim::grid::tests::{arena_from, kind_at};
    use crate::sim::push::push_chain;

    fn at(row: i32, col: i32) -> Pos {
        Pos::new(row, col, 0)
    }

    #[test]
    fn ring_scan_prefers_nearest() {
        let g = arena_from(&["r....r", "......", "..r..."]);
        assert_eq!(find_exit(&g, at(0, 0), Color::Red, 24), Some(at(2, 2)));
        assert_eq!(find_exit(&g, at(0, 0), Color::Red, 1), None);
        assert_eq!(find_exit(&g, at(0, 0), Color::Blue, 24), None);
    }

    #[test]
    fn tunnel_round_trip_preserves_object() {
        //  o r . . r      wooden box, facing east, pushed into the left tunnel
        let mut g = arena_from(&["or..r"]);
        if let Some(b) = g.cell_mut(at(0, 0), Layer::LowerObjects) {
            b.direction = Direction::East;
        }
        let original = g.cell(at(0, 0), Layer::LowerObjects).cloned().unwrap();
        let mut ctx = SimulationContext::default();
        ctx.set_tunnel_full(Color::Red, true);

        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        assert!(!ctx.is_tunnel_full(Color::Red));
        assert_eq!(kind_at(&g, 0, 1), ObjectKind::Tunnel);
        let there = g.cell(at(0, 4), Layer::LowerObjects).unwrap();
        assert_eq!(there.kind, ObjectKind::WoodenBox);
        assert_eq!(there.saved().map(|s| s.kind.clone()), Some(ObjectKind::Tunnel));

        // push it off its exit tunnel, then back in: it returns to the first
        push_chain(&mut g, &mut ctx, at(0, 4), Direction::West, 2).unwrap();
        assert_eq!(kind_at(&g, 0, 3), ObjectKind::WoodenBox);
        push_chain(&mut g, &mut ctx, at(0, 3), Direction::East, 2).unwrap();
        let back = g.cell(at(0, 1), Layer::LowerObjects).unwrap();
        assert_eq!(back.kind, original.kind);
        assert_eq!(back.material, Material::Wooden);
        assert_eq!(back.direction, Direction::East);
    }

    #[test]
    fn full_network_parks_then_releases() {
        // the only other red tunnel is covered by a box
        let mut g = arena_from(&["Br..r"]);
        let parked = ArenaObject::new(ObjectKind::Box).with_saved(ArenaObject::new(ObjectKind::Tunnel).with_color(Color::Red));
        g.put(at(0, 4), Layer::LowerObjects, parked);
        let mut ctx = SimulationContext::default();

        push_chain(&mut g, &mut ctx, at(0, 0), Direction::East, 2).unwrap();
        assert!(ctx.is_tunnel_full(Color::Red));
        let waiting = g.cell(at(0, 1), Layer::LowerObjects).unwrap();
        assert!(waiting.waiting_on_tunnel);
        assert!(!waiting.can_move());

        // uncover the far tunnel and retry
        push_chain(&mut g, &mut ctx, at(0, 4), Direction::South, 2).unwrap();
        retry_waiting(&mut g, &mut ctx, 0);
        assert!(!ctx.is_tunnel_full(Color::Red));
        assert_eq!(kind_at(&g, 0, 1), ObjectKind::Tunnel);
        let moved = g.cell(at(0, 4), Layer::LowerObjects).unwrap();
        assert_eq!(moved.kind, ObjectKind::Box);
        assert!(!moved.waiting_on_tunnel);
    }
}
