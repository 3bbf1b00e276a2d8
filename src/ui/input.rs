/// Keyboard input for the arena viewer.
///
/// The arena is turn based: every key press (terminal auto-repeat
/// included) becomes at most one `Command`. Release events carry no
/// meaning and are dropped.
///
/// ## Keys
///   Arrows / WASD      move (toward a new side the first press only turns)
///   Shift + arrows     turn in place
///   Space / Enter      fire the tank's own beam
///   1 2 3 4 5          missile, stunner, boost, blue laser, disruptor
///   B / H / I          bomb, heat bomb, ice bomb
///   U / Backspace      undo
///   Y                  redo
///   F2                 restart
///   F5                 save the current position as an arena file
///   Esc / Q / Ctrl+C   quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::direction::Direction;
use crate::domain::material::{LaserType, RangeType};
use crate::sim::engine::PlayerAction;

/// What the viewer should do next.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Act(PlayerAction),
    /// Fire whatever the current tank fires by default.
    Fire,
    Save,
    Quit,
}

pub struct InputState {
    /// Commands decoded during the most recent `drain_events()`.
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { commands: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.commands.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if let Some(cmd) = command_for(key) {
                    self.commands.push(cmd);
                }
            }
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn quit_requested(&self) -> bool {
        self.commands.contains(&Command::Quit)
    }
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new()
    }
}

fn arrow_direction(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::North),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::East),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::South),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::West),
        _ => None,
    }
}

/// Decode one key event.
pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')) {
        return Some(Command::Quit);
    }

    if let Some(dir) = arrow_direction(key.code) {
        // shifted letters arrive as uppercase; only shifted arrows turn
        let turn = key.modifiers.contains(KeyModifiers::SHIFT) && !matches!(key.code, KeyCode::Char(_));
        let action = if turn { PlayerAction::Turn(dir) } else { PlayerAction::Move(dir) };
        return Some(Command::Act(action));
    }

    let action = match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => return Some(Command::Fire),
        KeyCode::F(5) => return Some(Command::Save),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Quit),
        KeyCode::Char('1') => PlayerAction::Fire(LaserType::Missile),
        KeyCode::Char('2') => PlayerAction::Fire(LaserType::Stunner),
        KeyCode::Char('3') => PlayerAction::Fire(LaserType::Power),
        KeyCode::Char('4') => PlayerAction::Fire(LaserType::Blue),
        KeyCode::Char('5') => PlayerAction::Fire(LaserType::Disruptor),
        KeyCode::Char('b') | KeyCode::Char('B') => PlayerAction::UseBomb(RangeType::Bomb),
        KeyCode::Char('h') | KeyCode::Char('H') => PlayerAction::UseBomb(RangeType::HeatBomb),
        KeyCode::Char('i') | KeyCode::Char('I') => PlayerAction::UseBomb(RangeType::IceBomb),
        KeyCode::Char('u') | KeyCode::Char('U') | KeyCode::Backspace => PlayerAction::Undo,
        KeyCode::Char('y') | KeyCode::Char('Y') => PlayerAction::Redo,
        KeyCode::F(2) => PlayerAction::Restart,
        _ => return None,
    };
    Some(Command::Act(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn arrows_move_and_shifted_arrows_turn() {
        assert_eq!(
            command_for(key(KeyCode::Left, KeyModifiers::NONE)),
            Some(Command::Act(PlayerAction::Move(Direction::West)))
        );
        assert_eq!(
            command_for(key(KeyCode::Left, KeyModifiers::SHIFT)),
            Some(Command::Act(PlayerAction::Turn(Direction::West)))
        );
        // capital D is still a move
        assert_eq!(
            command_for(key(KeyCode::Char('D'), KeyModifiers::SHIFT)),
            Some(Command::Act(PlayerAction::Move(Direction::East)))
        );
    }

    #[test]
    fn ctrl_c_quits_before_anything_else() {
        assert_eq!(command_for(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Command::Quit));
        assert_eq!(command_for(key(KeyCode::Esc, KeyModifiers::NONE)), Some(Command::Quit));
    }

    #[test]
    fn ammo_and_history_keys() {
        assert_eq!(command_for(key(KeyCode::Char(' '), KeyModifiers::NONE)), Some(Command::Fire));
        assert_eq!(
            command_for(key(KeyCode::Char('1'), KeyModifiers::NONE)),
            Some(Command::Act(PlayerAction::Fire(LaserType::Missile)))
        );
        assert_eq!(
            command_for(key(KeyCode::Char('i'), KeyModifiers::NONE)),
            Some(Command::Act(PlayerAction::UseBomb(RangeType::IceBomb)))
        );
        assert_eq!(command_for(key(KeyCode::Backspace, KeyModifiers::NONE)), Some(Command::Act(PlayerAction::Undo)));
        assert_eq!(command_for(key(KeyCode::F(2), KeyModifiers::NONE)), Some(Command::Act(PlayerAction::Restart)));
        assert_eq!(command_for(key(KeyCode::Char('z'), KeyModifiers::NONE)), None);
    }
}
