/// Buttons and button doors.
///
/// ## Policies
///
///   policy     push-in                         push-out
///   Pressure   toggle triggered + bound door   toggle again
///   Trigger    latch on, open bound door       -
///   All        latch on; open every door of    latch off; close every door
///              the class once all buttons of   of the class
///              the class are latched
///
/// A button reacts to any mover when universal, otherwise only to movers
/// of its own material.
///
/// ## Binding
///
/// A button stores its door's (row, col) on the same floor. Binding is
/// re-derived by floor scans whenever the editor places a button or a
/// door, and undone when a door is removed. Buttons and doors are found
/// both bare and underneath a movable parked on them.

use crate::domain::kind::{ButtonPolicy, Layer, ObjectKind};
use crate::domain::material::Color;
use crate::domain::object::ArenaObject;
use super::context::SimulationContext;
use super::engine;
use super::event::{GameEvent, SoundEffect};
use super::grid::{ArenaGrid, Pos};

type DoorClass = (ButtonPolicy, Option<Color>);

fn is_button(o: &ArenaObject) -> bool {
    matches!(o.kind, ObjectKind::Button { .. })
}

fn is_door(o: &ArenaObject) -> bool {
    matches!(o.kind, ObjectKind::ButtonDoor { .. })
}

fn is_linkage(o: &ArenaObject) -> bool {
    is_button(o) || is_door(o)
}

/// The button or door at `at`, looking under a parked movable.
fn linkage(grid: &ArenaGrid, at: Pos) -> Option<&ArenaObject> {
    let cell = grid.cell(at, Layer::LowerObjects)?;
    if is_linkage(cell) {
        return Some(cell);
    }
    cell.saved().filter(|s| is_linkage(s))
}

fn linkage_mut(grid: &mut ArenaGrid, at: Pos) -> Option<&mut ArenaObject> {
    let cell = grid.cell_mut(at, Layer::LowerObjects)?;
    if is_linkage(cell) {
        return Some(cell);
    }
    cell.saved_mut().filter(|s| is_linkage(s))
}

/// Every position on `floor` holding a button (`doors == false`) or a
/// door of `class`.
fn class_members(grid: &ArenaGrid, floor: i32, class: DoorClass, doors: bool) -> Vec<Pos> {
    grid.positions(floor)
        .filter(|&p| {
            linkage(grid, p).map_or(false, |o| is_door(o) == doors && o.door_class() == Some(class))
        })
        .collect()
}

fn set_triggered(grid: &mut ArenaGrid, at: Pos, value: bool) {
    if let Some(ArenaObject { kind: ObjectKind::Button { triggered, .. }, .. }) = linkage_mut(grid, at) {
        *triggered = value;
    }
}

fn reacts_to(button: &ArenaObject, mover: &ArenaObject) -> bool {
    match button.kind {
        ObjectKind::Button { universal, .. } => universal || button.material == mover.material,
        _ => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Push hooks
// ══════════════════════════════════════════════════════════════

pub fn button_push_into(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject) {
    let Some(button) = linkage(grid, at) else {
        return;
    };
    if !reacts_to(button, mover) {
        return;
    }
    let Some(class) = button.door_class() else {
        return;
    };
    let ObjectKind::Button { triggered, door, .. } = button.kind else {
        return;
    };
    ctx.sound(SoundEffect::Button);

    match class.0 {
        ButtonPolicy::Pressure => {
            set_triggered(grid, at, !triggered);
            if let Some((row, col)) = door {
                toggle_door(grid, ctx, Pos::new(row, col, at.floor));
            }
        }
        ButtonPolicy::Trigger => {
            if triggered {
                return;
            }
            set_triggered(grid, at, true);
            if let Some((row, col)) = door {
                set_door_open(grid, ctx, Pos::new(row, col, at.floor), true);
            }
        }
        ButtonPolicy::All => {
            if triggered {
                return;
            }
            set_triggered(grid, at, true);
            let all_held = class_members(grid, at.floor, class, false)
                .into_iter()
                .all(|p| matches!(linkage(grid, p).map(|o| &o.kind), Some(ObjectKind::Button { triggered: true, .. })));
            if all_held {
                set_class_doors(grid, ctx, at.floor, class, true);
            }
        }
    }
}

pub fn button_push_out(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, mover: &ArenaObject) {
    let Some(button) = linkage(grid, at) else {
        return;
    };
    if !reacts_to(button, mover) {
        return;
    }
    let Some(class) = button.door_class() else {
        return;
    };
    let ObjectKind::Button { triggered, door, .. } = button.kind else {
        return;
    };

    match class.0 {
        ButtonPolicy::Pressure => {
            set_triggered(grid, at, !triggered);
            if let Some((row, col)) = door {
                toggle_door(grid, ctx, Pos::new(row, col, at.floor));
            }
        }
        ButtonPolicy::Trigger => {}
        ButtonPolicy::All => {
            if triggered {
                set_triggered(grid, at, false);
                set_class_doors(grid, ctx, at.floor, class, false);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Doors
// ══════════════════════════════════════════════════════════════

fn door_is_open(grid: &ArenaGrid, at: Pos) -> Option<bool> {
    match linkage(grid, at).map(|o| &o.kind) {
        Some(ObjectKind::ButtonDoor { open, .. }) => Some(*open),
        _ => None,
    }
}

fn toggle_door(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos) {
    match door_is_open(grid, at) {
        Some(open) => set_door_open(grid, ctx, at, !open),
        None => log::warn!("button bound to {:?}, but no door is there", at),
    }
}

fn set_class_doors(grid: &mut ArenaGrid, ctx: &mut SimulationContext, floor: i32, class: DoorClass, open: bool) {
    for p in class_members(grid, floor, class, true) {
        set_door_open(grid, ctx, p, open);
    }
}

/// Open or close the door at `at`. Closing a door crushes a movable
/// parked in it and kills a tank standing in it.
pub fn set_door_open(grid: &mut ArenaGrid, ctx: &mut SimulationContext, at: Pos, open: bool) {
    match door_is_open(grid, at) {
        Some(current) if current != open => {}
        Some(_) => return,
        None => {
            log::warn!("no door at {:?}", at);
            return;
        }
    }
    if let Some(ArenaObject { kind: ObjectKind::ButtonDoor { open: flag, .. }, .. }) = linkage_mut(grid, at) {
        *flag = open;
    }

    if open {
        log::info!("door opened at {:?}", at);
        ctx.emit(GameEvent::DoorOpened { at });
        ctx.sound(SoundEffect::DoorOpens);
        return;
    }

    log::info!("door closed at {:?}", at);
    ctx.emit(GameEvent::DoorClosed { at });
    ctx.sound(SoundEffect::DoorCloses);
    let parked = grid.cell(at, Layer::LowerObjects).map_or(false, |o| !is_door(o));
    if parked {
        let door = grid.cell(at, Layer::LowerObjects).map(|o| o.saved_or_empty()).unwrap_or_default();
        grid.put(at, Layer::LowerObjects, door);
        ctx.emit(GameEvent::Crushed { at });
        ctx.sound(SoundEffect::Crush);
    }
    let tank_inside = grid.cell(at, Layer::UpperObjects).map_or(false, |o| o.kind.is_character());
    if tank_inside {
        engine::kill_tank(ctx);
    }
}

// ══════════════════════════════════════════════════════════════
// Editor binding scans
// ══════════════════════════════════════════════════════════════

pub fn place_button(grid: &mut ArenaGrid, _ctx: &mut SimulationContext, at: Pos) {
    let Some(class) = linkage(grid, at).and_then(|b| b.door_class()) else {
        return;
    };
    if class.0 != ButtonPolicy::All {
        // pressure and trigger pairs are one-to-one
        for p in class_members(grid, at.floor, class, false) {
            if p != at && grid.cell(p, Layer::LowerObjects).map_or(false, is_button) {
                log::info!("replaced {:?} button at {:?}", class.0, p);
                grid.put(p, Layer::LowerObjects, ArenaObject::empty());
            }
        }
    }
    let door = class_members(grid, at.floor, class, true).first().map(|p| (p.row, p.col));
    if door.is_none() {
        log::warn!("{:?} button at {:?} has no door to bind to", class.0, at);
    }
    if let Some(ArenaObject { kind: ObjectKind::Button { door: slot, .. }, .. }) = linkage_mut(grid, at) {
        *slot = door;
    }
}

pub fn place_door(grid: &mut ArenaGrid, _ctx: &mut SimulationContext, at: Pos) {
    let Some(class) = linkage(grid, at).and_then(|d| d.door_class()) else {
        return;
    };
    if class.0 != ButtonPolicy::All {
        for p in class_members(grid, at.floor, class, true) {
            if p != at && grid.cell(p, Layer::LowerObjects).map_or(false, is_door) {
                log::info!("replaced {:?} door at {:?}", class.0, p);
                grid.put(p, Layer::LowerObjects, ArenaObject::empty());
            }
        }
    }
    for p in class_members(grid, at.floor, class, false) {
        if let Some(ArenaObject { kind: ObjectKind::Button { door, triggered, .. }, .. }) = linkage_mut(grid, p) {
            *door = Some((at.row, at.col));
            *triggered = false;
        }
    }
}

/// The door at `at` is going away: unbind every button that pointed at it.
pub fn remove_door(grid: &mut ArenaGrid, _ctx: &mut SimulationContext, at: Pos) {
    let Some(class) = linkage(grid, at).and_then(|d| d.door_class()) else {
        return;
    };
    for p in class_members(grid, at.floor, class, false) {
        if let Some(ArenaObject { kind: ObjectKind::Button { door, .. }, .. }) = linkage_mut(grid, p) {
            if *door == Some((at.row, at.col)) {
                *door = None;
                log::warn!("button at {:?} lost its door at {:?}", p, at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::material::Material;
    use crate::sim::grid::tests::{arena_from, kind_at};

    fn at(row: i32, col: i32) -> Pos {
        Pos::new(row, col, 0)
    }

    fn door_open(g: &ArenaGrid, row: i32, col: i32) -> bool {
        door_is_open(g, at(row, col)).unwrap_or(false)
    }

    fn bound(g: &mut ArenaGrid, ctx: &mut SimulationContext, button: Pos) {
        place_button(g, ctx, button);
    }

    fn stone() -> ArenaObject {
        ArenaObject::new(ObjectKind::Box)
    }

    #[test]
    fn pressure_toggles_both_ways() {
        let mut g = arena_from(&["p..P"]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 0));
        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(door_open(&g, 0, 3));
        button_push_out(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(!door_open(&g, 0, 3));
        assert!(ctx.events.contains(&GameEvent::DoorClosed { at: at(0, 3) }));
    }

    #[test]
    fn trigger_push_in_is_idempotent() {
        let mut g = arena_from(&["t..T"]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 0));
        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(door_open(&g, 0, 3));
        let image = g.image();
        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(door_open(&g, 0, 3));
        assert_eq!(g.image(), image);
        // push-out never closes a trigger door
        button_push_out(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(door_open(&g, 0, 3));
    }

    #[test]
    fn all_buttons_need_every_sibling() {
        let mut g = arena_from(&["a.a", "...", "D.D"]);
        let mut ctx = SimulationContext::default();
        place_door(&mut g, &mut ctx, at(2, 0));

        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(!door_open(&g, 2, 0));
        button_push_into(&mut g, &mut ctx, at(0, 2), &stone());
        assert!(door_open(&g, 2, 0));
        assert!(door_open(&g, 2, 2));

        button_push_out(&mut g, &mut ctx, at(0, 2), &stone());
        assert!(!door_open(&g, 2, 0));
        assert!(!door_open(&g, 2, 2));
    }

    #[test]
    fn non_universal_button_checks_material() {
        let mut g = arena_from(&["p.P"]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 0));
        if let Some(b) = g.cell_mut(at(0, 0), Layer::LowerObjects) {
            b.material = Material::Wooden;
            if let ObjectKind::Button { universal, .. } = &mut b.kind {
                *universal = false;
            }
        }
        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
        assert!(!door_open(&g, 0, 2));
        button_push_into(&mut g, &mut ctx, at(0, 0), &ArenaObject::new(ObjectKind::WoodenBox));
        assert!(door_open(&g, 0, 2));
    }

    #[test]
    fn placing_binds_and_replaces() {
        let mut g = arena_from(&["p.p", "P.."]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 2));
        // the older pressure button of the same class is gone
        assert!(kind_at(&g, 0, 0).is_empty());
        let b = g.cell(at(0, 2), Layer::LowerObjects).unwrap();
        assert_eq!(b.custom_property(1), 1);
        assert_eq!(b.custom_property(2), 0);
    }

    #[test]
    fn button_without_door_stays_unbound() {
        let mut g = arena_from(&["t"]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 0));
        assert_eq!(g.cell(at(0, 0), Layer::LowerObjects).unwrap().custom_property(1), -1);
        // pressing it is harmless
        button_push_into(&mut g, &mut ctx, at(0, 0), &stone());
    }

    #[test]
    fn removing_door_unbinds() {
        let mut g = arena_from(&["p.P"]);
        let mut ctx = SimulationContext::default();
        bound(&mut g, &mut ctx, at(0, 0));
        remove_door(&mut g, &mut ctx, at(0, 2));
        assert_eq!(g.cell(at(0, 0), Layer::LowerObjects).unwrap().custom_property(1), -1);
    }

    #[test]
    fn closing_door_crushes_parked_box() {
        let mut g = arena_from(&["t.T"]);
        let mut ctx = SimulationContext::default();
        set_door_open(&mut g, &mut ctx, at(0, 2), true);
        let door = g.take(at(0, 2), Layer::LowerObjects).unwrap();
        g.put(at(0, 2), Layer::LowerObjects, stone().with_saved(door));
        assert_eq!(door_is_open(&g, at(0, 2)), Some(true));
        set_door_open(&mut g, &mut ctx, at(0, 2), false);
        assert!(matches!(kind_at(&g, 0, 2), ObjectKind::ButtonDoor { open: false, .. }));
        assert!(ctx.events.contains(&GameEvent::Crushed { at: at(0, 2) }));
    }
}
