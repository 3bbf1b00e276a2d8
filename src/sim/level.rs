/// Arena sources.
///
/// ## Sources (priority order):
///   1. Path given on the command line
///   2. `arenas_dir` (`.arena` files, codec token streams)
///   3. Built-in demo arena
///
/// An explicit path that fails is an error. A directory file that fails
/// to decode is logged and skipped. The demo always succeeds for any
/// valid `[arena]` shape.
///
/// ## Demo legend:
///   '#' = Wall            'w' = Wooden wall     'C' = Crystal block
///   'X' = Barrel          'B' = Box             'o' = Wooden box
///   'I' = Icy box         '/' '\' = Mirrors     'A' = Anti-tank (west)
///   'r' = Red tunnel      'p' = Pressure button 'P' = Pressure door
///   'k' = Red key         'K' = Red key door    'm' = Ten missiles
///   'L' = Lava            'W' = Deep water      '~' = Ice
///   '@' = Tank (east)     '.' = Ground

use std::path::{Path, PathBuf};

use crate::config::GameConfig;
use crate::domain::direction::Direction;
use crate::domain::kind::{ButtonPolicy, Item, KeyColor, ObjectKind};
use crate::domain::material::Color;
use crate::domain::object::ArenaObject;
use super::codec::{self, ArenaFile};
use super::context::SimulationContext;
use super::engine::editor_place;
use super::error::SimResult;
use super::grid::{ArenaGrid, Pos, Wraparound, MIN_COLS, MIN_ROWS};
use super::registry::Registry;

pub const ARENA_EXTENSION: &str = "arena";

/// One arena file found on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaEntry {
    pub name: String,
    pub path: PathBuf,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Resolve the arena to play: explicit path, first file of the arenas
/// directory, then the demo.
pub fn load_source(explicit: Option<&Path>, config: &GameConfig, registry: &Registry) -> SimResult<ArenaFile> {
    if let Some(path) = explicit {
        // an explicit path that fails is the caller's problem
        let file = codec::load(path, registry)?;
        log::info!("arena '{}' loaded from {}", file.title, path.display());
        return Ok(file);
    }

    for entry in scan_arenas(config) {
        match codec::load(&entry.path, registry) {
            Ok(file) => {
                log::info!("arena '{}' loaded from {}", file.title, entry.path.display());
                return Ok(file);
            }
            Err(e) => log::warn!("skipping {}: {}", entry.path.display(), e),
        }
    }

    demo_arena(config)
}

/// `.arena` files directly under `arenas_dir`, sorted by file name.
pub fn scan_arenas(config: &GameConfig) -> Vec<ArenaEntry> {
    let mut results = load_from_directory(&config.arenas_dir);
    results.sort_by(|a, b| a.name.cmp(&b.name));
    results
}

/// The built-in demo, sized to the `[arena]` shape.
pub fn demo_arena(config: &GameConfig) -> SimResult<ArenaFile> {
    let grid = parse_diagram(DEMO, config)?;
    let mut file = ArenaFile::new(grid);
    file.title = "Demo - First Light".to_string();
    Ok(file)
}

// ══════════════════════════════════════════════════════════════
// Directory scanning
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<ArenaEntry> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == ARENA_EXTENSION))
        .map(|path| ArenaEntry {
            name: path.file_stem().unwrap_or_default().to_string_lossy().to_string(),
            path,
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Diagram parsing
// ══════════════════════════════════════════════════════════════

const DEMO: &[&str] = &[
    "########################",
    "#@....o.....#......m...#",
    "#.....#.....#..........#",
    "#..B..#..\\..w...A......#",
    "#.....#.....#..........#",
    "#~~~~~#..p..#####P######",
    "#.....#.....#..........#",
    "#..r..LLLL..#...X...k..#",
    "#...........#..........#",
    "#####K#######..WWW.....#",
    "#.....I.....C..........#",
    "#..r......./.......r...#",
    "########################",
];

fn diagram_object(ch: char) -> Option<ArenaObject> {
    let obj = match ch {
        '#' => ArenaObject::new(ObjectKind::Wall),
        'w' => ArenaObject::new(ObjectKind::WoodenWall),
        'C' => ArenaObject::new(ObjectKind::CrystalBlock),
        'X' => ArenaObject::new(ObjectKind::Barrel),
        'B' => ArenaObject::new(ObjectKind::Box),
        'o' => ArenaObject::new(ObjectKind::WoodenBox),
        'I' => ArenaObject::new(ObjectKind::IcyBox),
        '/' => ArenaObject::new(ObjectKind::Mirror).with_direction(Direction::NorthEast),
        '\\' => ArenaObject::new(ObjectKind::Mirror).with_direction(Direction::NorthWest),
        'A' => ArenaObject::new(ObjectKind::AntiTank).with_direction(Direction::West),
        'r' => ArenaObject::new(ObjectKind::Tunnel).with_color(Color::Red),
        'p' => ArenaObject::new(ObjectKind::button(ButtonPolicy::Pressure)),
        'P' => ArenaObject::new(ObjectKind::button_door(ButtonPolicy::Pressure)),
        'k' => ArenaObject::new(ObjectKind::Key(KeyColor::Red)),
        'K' => ArenaObject::new(ObjectKind::KeyDoor(KeyColor::Red)),
        'm' => ArenaObject::new(ObjectKind::Pickup(Item::Missile)),
        'L' => ArenaObject::new(ObjectKind::Lava),
        'W' => ArenaObject::new(ObjectKind::DeepWater),
        '~' => ArenaObject::new(ObjectKind::Ice),
        '@' => ArenaObject::new(ObjectKind::Tank).with_direction(Direction::East),
        _ => return None,
    };
    Some(obj)
}

/// Build a one-floor grid from character rows through the editor entry
/// point, so buttons and doors bind as they land.
fn parse_diagram(rows: &[&str], config: &GameConfig) -> SimResult<ArenaGrid> {
    let height = (rows.len() as i32).max(config.arena.rows).max(MIN_ROWS);
    let width = rows.iter().map(|r| r.chars().count() as i32).max().unwrap_or(0).max(config.arena.cols).max(MIN_COLS);
    let mut grid = ArenaGrid::new(height, width, 1)?;
    grid.wrap = Wraparound {
        horizontal: config.arena.wrap_horizontal,
        vertical: config.arena.wrap_vertical,
        floors: config.arena.wrap_floors,
    };
    grid.fill(&ArenaObject::new(ObjectKind::Ground));

    let mut ctx = SimulationContext::new(config);
    for (r, line) in rows.iter().enumerate() {
        for (c, ch) in line.chars().enumerate() {
            if let Some(obj) = diagram_object(ch) {
                editor_place(&mut grid, &mut ctx, obj, Pos::new(r as i32, c as i32, 0))?;
            }
        }
    }
    Ok(grid)
}
