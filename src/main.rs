/// Entry point and viewer loop.
///
/// Usage: `lasertank-arena [ARENA_FILE]`
///
/// Without an argument the first `.arena` file of `arenas_dir` is
/// played, or the built-in demo when there is none.

use std::path::PathBuf;
use std::time::Duration;

use lasertank_arena::config::GameConfig;
use lasertank_arena::domain::kind::{Layer, ObjectKind};
use lasertank_arena::domain::material::LaserType;
use lasertank_arena::sim::codec::{self, ArenaFile};
use lasertank_arena::sim::engine::{self, Engine, PlayerAction};
use lasertank_arena::sim::error::SimError;
use lasertank_arena::sim::event::GameEvent;
use lasertank_arena::sim::level;
use lasertank_arena::sim::registry::Registry;
use lasertank_arena::ui::gamepad::GamepadState;
use lasertank_arena::ui::input::{Command, InputState};
use lasertank_arena::ui::renderer::{Overlay, Renderer};
use lasertank_arena::ui::sound::{process_sound_events, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(10);
const QUICKSAVE_NAME: &str = "quicksave.arena";

/// Everything the loop needs besides the terminal surfaces.
struct Session {
    engine: Engine,
    title: String,
    move_shoot_allowed: bool,
    message: String,
}

fn main() {
    env_logger::init();

    let config = GameConfig::load();
    let registry = Registry::standard();
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);

    let file = match level::load_source(explicit.as_deref(), &config, &registry) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot load arena: {e}");
            std::process::exit(1);
        }
    };

    let mut session = Session {
        title: file.title.clone(),
        move_shoot_allowed: file.move_shoot_allowed,
        engine: Engine::new(file.grid, &config),
        message: String::new(),
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut sound = SoundEngine::new();

    let result = viewer_loop(&mut session, &mut renderer, &mut sound, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Viewer error: {e}");
    }
}

fn viewer_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: &mut Option<SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    loop {
        kb.drain_events();
        gp.update();
        if kb.quit_requested() {
            break;
        }

        let commands: Vec<Command> = kb.commands().iter().copied().chain(gp.commands()).collect();
        for cmd in commands {
            match cmd {
                Command::Quit => return Ok(()),
                Command::Save => save_quick(session, config),
                Command::Fire => {
                    let laser = default_laser(&session.engine);
                    run_action(session, sound, PlayerAction::Fire(laser));
                }
                Command::Act(action) => run_action(session, sound, action),
            }
        }

        renderer.render(
            &mut session.engine,
            &Overlay { title: &session.title, message: &session.message },
        )?;
        std::thread::sleep(FRAME_SLEEP);
    }
    Ok(())
}

fn run_action(session: &mut Session, sound: &mut Option<SoundEngine>, action: PlayerAction) {
    let events = engine::step(&mut session.engine, action);
    process_sound_events(sound, &events);
    if let Some(msg) = describe(&events) {
        session.message = msg;
    } else if action == PlayerAction::Restart {
        session.message = "Arena restarted".to_string();
    }
}

/// The tank's own beam: powerful tanks fire the power laser for free.
fn default_laser(engine: &Engine) -> LaserType {
    let powerful = engine
        .tank()
        .and_then(|p| engine.grid.cell(p, Layer::UpperObjects))
        .map_or(false, |t| t.kind == ObjectKind::PowerfulTank);
    if powerful { LaserType::Power } else { LaserType::Green }
}

/// Status-bar text for the most notable event of a step.
fn describe(events: &[GameEvent]) -> Option<String> {
    events.iter().rev().find_map(|e| match e {
        GameEvent::TankKilled => Some("The tank was destroyed".to_string()),
        GameEvent::ItemCollected { item, amount } => Some(format!("Picked up {} x {:?}", amount, item)),
        GameEvent::DoorOpened { .. } => Some("A door opens".to_string()),
        GameEvent::DoorClosed { .. } => Some("A door closes".to_string()),
        GameEvent::WaitingOnTunnel { .. } => Some("Tunnel network full, waiting".to_string()),
        GameEvent::Teleported { .. } => Some("Teleported".to_string()),
        GameEvent::Exploded { .. } => Some("Boom".to_string()),
        GameEvent::Undone => Some("Undone".to_string()),
        GameEvent::Redone => Some("Redone".to_string()),
        _ => None,
    })
}

fn save_quick(session: &mut Session, config: &GameConfig) {
    let path = config.arenas_dir.join(QUICKSAVE_NAME);
    let mut file = ArenaFile::new(session.engine.grid.clone());
    file.title = session.title.clone();
    file.move_shoot_allowed = session.move_shoot_allowed;

    let result = std::fs::create_dir_all(&config.arenas_dir)
        .map_err(SimError::from)
        .and_then(|_| codec::save(&path, &file));
    session.message = match result {
        Ok(()) => format!("Saved to {}", path.display()),
        Err(e) => {
            log::warn!("quicksave failed: {}", e);
            format!("Save failed: {e}")
        }
    };
}
