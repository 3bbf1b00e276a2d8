/// SimulationContext: the cross-cutting state of one running arena.
///
/// Everything the rule engine needs besides the grid travels in here:
/// tunnel capacity flags, the tank's inventory, the event sink for the
/// current action, and the tuning values copied out of `GameConfig`.
/// Every engine entry point takes it by `&mut`, so there is no hidden
/// global state shared between arenas.

use crate::config::{BeamConfig, GameConfig, TimerConfig};
use crate::domain::material::{Color, LaserType};
use super::event::{GameEvent, SoundEffect};
use super::history::{HistoryFlag, HistoryStatus};
use super::inventory::Inventory;

#[derive(Clone, Debug)]
pub struct SimulationContext {
    /// Per color: did the last scan of that tunnel network find no exit?
    pub tunnels_full: [bool; Color::COUNT],
    pub inventory: Inventory,
    pub events: Vec<GameEvent>,
    pub game_over: bool,
    pub beam: BeamConfig,
    pub timers: TimerConfig,
    pub scan_radius: i32,
    /// Inventory categories touched by the action in progress.
    pub status: HistoryStatus,
}

impl SimulationContext {
    pub fn new(config: &GameConfig) -> Self {
        SimulationContext {
            beam: config.beam,
            timers: config.timers,
            scan_radius: config.tunnel.scan_radius,
            ..SimulationContext::default()
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn sound(&mut self, effect: SoundEffect) {
        self.events.push(GameEvent::Sound(effect));
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_tunnel_full(&self, color: Color) -> bool {
        self.tunnels_full[color.index()]
    }

    pub fn set_tunnel_full(&mut self, color: Color, full: bool) {
        self.tunnels_full[color.index()] = full;
    }

    /// Initial force of a beam of `laser`.
    pub fn force_of(&self, laser: LaserType) -> i32 {
        match laser {
            LaserType::Power => self.beam.power_force,
            LaserType::Missile => self.beam.missile_force,
            _ => self.beam.laser_force,
        }
    }

    pub fn touch(&mut self, flag: HistoryFlag) {
        self.status.set(flag);
    }

    /// Forget per-level state; tuning values are kept.
    pub fn reset_level(&mut self) {
        self.tunnels_full = [false; Color::COUNT];
        self.inventory.reset();
        self.events.clear();
        self.game_over = false;
        self.status.clear();
    }
}

impl Default for SimulationContext {
    fn default() -> Self {
        SimulationContext {
            tunnels_full: [false; Color::COUNT],
            inventory: Inventory::default(),
            events: Vec::new(),
            game_over: false,
            beam: BeamConfig::default(),
            timers: TimerConfig::default(),
            scan_radius: 24,
            status: HistoryStatus::default(),
        }
    }
}
