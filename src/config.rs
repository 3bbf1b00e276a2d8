/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub beam: BeamConfig,
    pub history: HistoryConfig,
    pub tunnel: TunnelConfig,
    pub timers: TimerConfig,
    pub gamepad: GamepadConfig,
    pub arenas_dir: PathBuf,
}

/// Shape of a freshly created arena.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    pub rows: i32,
    pub cols: i32,
    pub floors: i32,
    pub wrap_horizontal: bool,
    pub wrap_vertical: bool,
    pub wrap_floors: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamConfig {
    pub laser_force: i32,   // green / red beams
    pub power_force: i32,   // powerful tank
    pub missile_force: i32,
    pub max_hops: u32,      // a beam trapped between mirrors dies after this many cells
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryConfig {
    pub max_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TunnelConfig {
    pub scan_radius: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerConfig {
    pub stun_ticks: i32,     // move-ticks an anti-tank stays stunned
    pub disrupt_ticks: i32,  // ticks before a disrupted wall re-forms
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub fire: Vec<String>,
    pub undo: Vec<String>,
    pub redo: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    arena: TomlArena,
    #[serde(default)]
    beam: TomlBeam,
    #[serde(default)]
    history: TomlHistory,
    #[serde(default)]
    tunnel: TomlTunnel,
    #[serde(default)]
    timers: TomlTimers,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlArena {
    #[serde(default = "default_rows")]
    rows: i32,
    #[serde(default = "default_cols")]
    cols: i32,
    #[serde(default = "default_floors")]
    floors: i32,
    #[serde(default)]
    wrap_horizontal: bool,
    #[serde(default)]
    wrap_vertical: bool,
    #[serde(default)]
    wrap_floors: bool,
}

#[derive(Deserialize, Debug)]
struct TomlBeam {
    #[serde(default = "default_laser_force")]
    laser_force: i32,
    #[serde(default = "default_power_force")]
    power_force: i32,
    #[serde(default = "default_missile_force")]
    missile_force: i32,
    #[serde(default = "default_max_hops")]
    max_hops: u32,
}

#[derive(Deserialize, Debug)]
struct TomlHistory {
    #[serde(default = "default_max_depth")]
    max_depth: usize,
}

#[derive(Deserialize, Debug)]
struct TomlTunnel {
    #[serde(default = "default_scan_radius")]
    scan_radius: i32,
}

#[derive(Deserialize, Debug)]
struct TomlTimers {
    #[serde(default = "default_stun_ticks")]
    stun_ticks: i32,
    #[serde(default = "default_disrupt_ticks")]
    disrupt_ticks: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_fire")]
    fire: Vec<String>,
    #[serde(default = "default_undo")]
    undo: Vec<String>,
    #[serde(default = "default_redo")]
    redo: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_arenas_dir")]
    arenas_dir: String,
}

// ── Defaults ──

fn default_rows() -> i32 { 24 }
fn default_cols() -> i32 { 24 }
fn default_floors() -> i32 { 1 }
fn default_laser_force() -> i32 { 2 }
fn default_power_force() -> i32 { 3 }
fn default_missile_force() -> i32 { 2 }
fn default_max_hops() -> u32 { 4096 }
fn default_max_depth() -> usize { 100 }
fn default_scan_radius() -> i32 { 24 }
fn default_stun_ticks() -> i32 { 10 }
fn default_disrupt_ticks() -> i32 { 20 }

fn default_fire() -> Vec<String> { vec!["A".into(), "R1".into()] }
fn default_undo() -> Vec<String> { vec!["B".into(), "L1".into()] }
fn default_redo() -> Vec<String> { vec!["Y".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_arenas_dir() -> String { "arenas".into() }

impl Default for TomlArena {
    fn default() -> Self {
        TomlArena {
            rows: default_rows(),
            cols: default_cols(),
            floors: default_floors(),
            wrap_horizontal: false,
            wrap_vertical: false,
            wrap_floors: false,
        }
    }
}

impl Default for TomlBeam {
    fn default() -> Self {
        TomlBeam {
            laser_force: default_laser_force(),
            power_force: default_power_force(),
            missile_force: default_missile_force(),
            max_hops: default_max_hops(),
        }
    }
}

impl Default for TomlHistory {
    fn default() -> Self {
        TomlHistory { max_depth: default_max_depth() }
    }
}

impl Default for TomlTunnel {
    fn default() -> Self {
        TomlTunnel { scan_radius: default_scan_radius() }
    }
}

impl Default for TomlTimers {
    fn default() -> Self {
        TomlTimers {
            stun_ticks: default_stun_ticks(),
            disrupt_ticks: default_disrupt_ticks(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            fire: default_fire(),
            undo: default_undo(),
            redo: default_redo(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { arenas_dir: default_arenas_dir() }
    }
}

// ── Public defaults (engine code and tests build contexts without a file) ──

impl Default for BeamConfig {
    fn default() -> Self {
        beam_from_toml(TomlBeam::default())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig { max_depth: default_max_depth() }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        TunnelConfig { scan_radius: default_scan_radius() }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        timers_from_toml(TomlTimers::default())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

fn beam_from_toml(t: TomlBeam) -> BeamConfig {
    BeamConfig {
        laser_force: t.laser_force,
        power_force: t.power_force,
        missile_force: t.missile_force,
        max_hops: t.max_hops.max(1),
    }
}

fn timers_from_toml(t: TomlTimers) -> TimerConfig {
    TimerConfig {
        stun_ticks: t.stun_ticks.max(1),
        disrupt_ticks: t.disrupt_ticks.max(1),
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/lasertank`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document. Used by `load()` and by tests.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve arenas directory
        let dir_str = &toml_cfg.general.arenas_dir;
        let arenas_dir = if PathBuf::from(dir_str).is_absolute() {
            PathBuf::from(dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(dir_str))
        };

        let a = toml_cfg.arena;
        GameConfig {
            arena: ArenaConfig {
                rows: a.rows.clamp(crate::sim::grid::MIN_ROWS, crate::sim::grid::MAX_ROWS),
                cols: a.cols.clamp(crate::sim::grid::MIN_COLS, crate::sim::grid::MAX_COLS),
                floors: a.floors.clamp(1, crate::sim::grid::MAX_FLOORS),
                wrap_horizontal: a.wrap_horizontal,
                wrap_vertical: a.wrap_vertical,
                wrap_floors: a.wrap_floors,
            },
            beam: beam_from_toml(toml_cfg.beam),
            history: HistoryConfig { max_depth: toml_cfg.history.max_depth.max(1) },
            tunnel: TunnelConfig { scan_radius: toml_cfg.tunnel.scan_radius.max(1) },
            timers: timers_from_toml(toml_cfg.timers),
            gamepad: GamepadConfig {
                fire: toml_cfg.gamepad.fire,
                undo: toml_cfg.gamepad.undo,
                redo: toml_cfg.gamepad.redo,
                cancel: toml_cfg.gamepad.cancel,
            },
            arenas_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/lasertank)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/lasertank");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        log::info!("Loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.arena.rows, 24);
        assert_eq!(cfg.beam, BeamConfig::default());
        assert_eq!(cfg.history.max_depth, 100);
        assert_eq!(cfg.tunnel.scan_radius, 24);
        assert_eq!(cfg.timers.stun_ticks, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse(
            "[beam]\nlaser_force = 5\n[arena]\nfloors = 3\nwrap_vertical = true\n",
        ).unwrap();
        assert_eq!(cfg.beam.laser_force, 5);
        assert_eq!(cfg.beam.power_force, 3);
        assert_eq!(cfg.arena.floors, 3);
        assert!(cfg.arena.wrap_vertical);
        assert!(!cfg.arena.wrap_horizontal);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = GameConfig::parse("[arena]\nrows = 5\nfloors = 40\n[history]\nmax_depth = 0\n").unwrap();
        assert_eq!(cfg.arena.rows, 24);
        assert_eq!(cfg.arena.floors, 9);
        assert_eq!(cfg.history.max_depth, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[beam\nlaser_force = ").is_err());
    }
}
