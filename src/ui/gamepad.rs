/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move (edge triggered, one step per push)
///   A / R1                →  Fire
///   B / L1                →  Undo
///   Y                     →  Redo
///   Select                →  Quit
///
/// Produces the same `Command`s as the keyboard.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::direction::Direction;
use crate::sim::engine::PlayerAction;
use super::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

/// Pad directions in the order N, E, S, W.
const PAD_DIRECTIONS: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    fire: Vec<Btn>,
    undo: Vec<Btn>,
    redo: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            fire:   vec![Btn::A, Btn::R1],
            undo:   vec![Btn::B, Btn::L1],
            redo:   vec![Btn::Y],
            cancel: vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

fn parse_list(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| {
        let b = Btn::from_name(s);
        if b.is_none() {
            log::warn!("unknown gamepad button '{}'", s);
        }
        b
    }).collect()
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::warn!("gamepad support unavailable: {}", e);
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. An empty or unparseable list
    /// keeps the default for that action.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let map = &mut self.action_map;
        for (slot, names) in [
            (&mut map.fire, &cfg.fire),
            (&mut map.undo, &cfg.undo),
            (&mut map.redo, &cfg.redo),
            (&mut map.cancel, &cfg.cancel),
        ] {
            let parsed = parse_list(names);
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => { self.connected = true; }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // N, E, S, W
        let held = [
            self.stick_y > STICK_DEADZONE,
            self.stick_x > STICK_DEADZONE,
            self.stick_y < -STICK_DEADZONE,
            self.stick_x < -STICK_DEADZONE,
        ];
        for (state, h) in self.stick.iter_mut().zip(held) {
            state.set(h);
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let pad = match gilrs_btn {
            Button::DPadUp    => Some(0),
            Button::DPadRight => Some(1),
            Button::DPadDown  => Some(2),
            Button::DPadLeft  => Some(3),
            _ => None,
        };
        if let Some(i) = pad {
            self.dpad[i].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn_index(btn)].set(held);
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    /// The first direction pushed this frame on the D-pad or stick.
    pub fn direction_pressed(&self) -> Option<Direction> {
        (0..4)
            .find(|&i| self.dpad[i].just_pressed || self.stick[i].just_pressed)
            .map(|i| PAD_DIRECTIONS[i])
    }

    /// Commands for this frame, in the order cancel, history, move, fire.
    pub fn commands(&self) -> Vec<Command> {
        let map = &self.action_map;
        let mut out = vec![];
        if self.any_just_pressed(&map.cancel) {
            out.push(Command::Quit);
        }
        if self.any_just_pressed(&map.undo) {
            out.push(Command::Act(PlayerAction::Undo));
        }
        if self.any_just_pressed(&map.redo) {
            out.push(Command::Act(PlayerAction::Redo));
        }
        if let Some(dir) = self.direction_pressed() {
            out.push(Command::Act(PlayerAction::Move(dir)));
        }
        if self.any_just_pressed(&map.fire) {
            out.push(Command::Fire);
        }
        out
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

impl Default for GamepadState {
    fn default() -> Self {
        GamepadState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_overrides_only_parseable_lists() {
        let mut pad = GamepadState::new();
        pad.load_button_config(&GamepadConfig {
            fire: names(&["x", "rt"]),
            undo: names(&["bogus"]),
            redo: vec![],
            cancel: names(&["Back"]),
        });
        assert_eq!(pad.action_map.fire, vec![Btn::X, Btn::R2]);
        assert_eq!(pad.action_map.undo, ActionMap::default().undo);
        assert_eq!(pad.action_map.redo, vec![Btn::Y]);
        assert_eq!(pad.action_map.cancel, vec![Btn::Select]);
    }

    #[test]
    fn edge_presses_become_commands() {
        let mut pad = GamepadState::new();
        pad.buttons[btn_index(Btn::A)].set(true);
        pad.dpad[3].set(true);
        assert_eq!(
            pad.commands(),
            vec![Command::Act(PlayerAction::Move(Direction::West)), Command::Fire]
        );

        // still held next frame: no repeat
        pad.clear_just_pressed();
        pad.buttons[btn_index(Btn::A)].set(true);
        assert!(pad.commands().is_empty());
    }
}
