/// Undo / redo history.
///
/// ## State machine
///
///   record   push the pre-action image on `undo`, clear `redo`
///   undo     pop `undo`, push the current image on `redo`, install popped
///   redo     pop `redo`, push the current image on `undo`, install popped
///
/// Both stacks hold full images (grid cells, inventory and whether the
/// tank was alive), so installing an entry is its own inverse. The undo stack is bounded; the oldest
/// entry drops off the bottom. An empty stack makes undo/redo return
/// false without touching any state.

use std::collections::VecDeque;

use super::context::SimulationContext;
use super::grid::{ArenaGrid, GridImage};
use super::inventory::Inventory;

/// Inventory categories changed by an action.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HistoryFlag {
    Laser,
    Missile,
    Stunner,
    Boost,
    Magnet,
    BlueLaser,
    Disruptor,
    Bomb,
    HeatBomb,
    IceBomb,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct HistoryStatus(u16);

impl HistoryStatus {
    pub fn set(&mut self, flag: HistoryFlag) {
        self.0 |= 1 << flag as u16;
    }

    pub fn is_set(self, flag: HistoryFlag) -> bool {
        self.0 & (1 << flag as u16) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    grid: GridImage,
    inventory: Inventory,
    game_over: bool,
    status: HistoryStatus,
}

#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the state *before* an action commits.
    pub fn record(&mut self, grid: &ArenaGrid, ctx: &SimulationContext, status: HistoryStatus) {
        self.undo.push_back(HistoryEntry {
            grid: grid.image(),
            inventory: ctx.inventory,
            game_over: ctx.game_over,
            status,
        });
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Fill in the status of the most recent entry once the action knows
    /// which inventory categories it touched.
    pub fn tag_last(&mut self, status: HistoryStatus) {
        if let Some(last) = self.undo.back_mut() {
            last.status = status;
        }
    }

    /// Drop the most recent entry (the action it guarded changed nothing).
    pub fn discard_last(&mut self) {
        self.undo.pop_back();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Status of the entry `undo()` would install next.
    pub fn peek_undo_status(&self) -> Option<HistoryStatus> {
        self.undo.back().map(|e| e.status)
    }

    pub fn undo(&mut self, grid: &mut ArenaGrid, ctx: &mut SimulationContext) -> bool {
        let Some(entry) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(current_entry(grid, ctx, entry.status));
        install(entry, grid, ctx);
        true
    }

    pub fn redo(&mut self, grid: &mut ArenaGrid, ctx: &mut SimulationContext) -> bool {
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        self.undo.push_back(current_entry(grid, ctx, entry.status));
        install(entry, grid, ctx);
        true
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn current_entry(grid: &ArenaGrid, ctx: &SimulationContext, status: HistoryStatus) -> HistoryEntry {
    HistoryEntry {
        grid: grid.image(),
        inventory: ctx.inventory,
        game_over: ctx.game_over,
        status,
    }
}

fn install(entry: HistoryEntry, grid: &mut ArenaGrid, ctx: &mut SimulationContext) {
    grid.restore_image(entry.grid);
    ctx.inventory = entry.inventory;
    ctx.game_over = entry.game_over;
}
