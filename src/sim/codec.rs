/// Arena file codec.
///
/// ## Stream
///
/// One token per line. The header is
///
///   version              any recognized format version
///   rows, cols, floors
///   wrap_h wrap_v wrap_f 0/1 each, format 10 and later
///   move_shoot           0/1, format 11 and later
///   title                whole line, format 17 and later
///
/// followed by one object record per cell, floors outermost, then rows,
/// columns and the four layers bottom-up.
///
/// ## Object records
///
///   identity
///   direction ordinal
///   Props(n):  color, [material], n custom properties, [remembered]
///   Manual:    [override], color, [material], saved object record,
///              [remembered]
///
/// `[override]` is an extra integer only generations 1 and 2 carry;
/// `[material]` only generation 3 carries. Both are read and dropped.
/// Colors are ordinals with -1 for none. From format 18, kinds that
/// turn back into what they replaced (icy and hot boxes and walls,
/// disrupted walls) end with a `[remembered]` object record, `Empty`
/// when there is none. Buttons limited to one material name it in
/// their identity (`StoneTriggerButton`).
///
/// ## Generations
///
///   generation   versions
///   G1           5, 6
///   G2           7, 8
///   G3           9
///   G4           10, 11
///   G5           12, 15, 16
///   G6           17, 18
///
/// The writer always emits format 18. Decoding builds a private grid and
/// hands it out only once every record has been read, so a failed load
/// never leaves a half-filled arena behind.

use std::path::Path;

use crate::domain::direction::Direction;
use crate::domain::kind::{CustomFormat, Layer};
use crate::domain::material::Color;
use crate::domain::object::ArenaObject;
use super::error::{SimError, SimResult};
use super::grid::{ArenaGrid, Pos, Wraparound};
use super::registry::Registry;

pub const LATEST_VERSION: i32 = 18;

/// Saved objects may wrap saved objects; nothing legitimate nests deeper.
const MAX_NESTING: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Generation {
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
}

impl Generation {
    pub fn of(version: i32) -> Option<Generation> {
        match version {
            5 | 6 => Some(Generation::G1),
            7 | 8 => Some(Generation::G2),
            9 => Some(Generation::G3),
            10 | 11 => Some(Generation::G4),
            12 | 15 | 16 => Some(Generation::G5),
            17 | 18 => Some(Generation::G6),
            _ => None,
        }
    }

    fn has_override_slot(self) -> bool {
        matches!(self, Generation::G1 | Generation::G2)
    }

    fn has_material_slot(self) -> bool {
        self == Generation::G3
    }
}

/// A decoded arena plus its header metadata.
#[derive(Clone, Debug)]
pub struct ArenaFile {
    pub grid: ArenaGrid,
    pub title: String,
    /// Header flag kept for saves. Every action resolves before the next
    /// is read, so the engine has no overlap for it to permit.
    pub move_shoot_allowed: bool,
}

impl ArenaFile {
    pub fn new(grid: ArenaGrid) -> Self {
        ArenaFile { grid, title: String::new(), move_shoot_allowed: false }
    }
}

// ══════════════════════════════════════════════════════════════
// Reading
// ══════════════════════════════════════════════════════════════

struct TokenReader<'a> {
    lines: std::str::Lines<'a>,
    token: usize,
}

impl<'a> TokenReader<'a> {
    fn new(text: &'a str) -> Self {
        TokenReader { lines: text.lines(), token: 0 }
    }

    fn malformed(&self, reason: impl Into<String>) -> SimError {
        SimError::Malformed { token: self.token, reason: reason.into() }
    }

    fn line(&mut self) -> SimResult<&'a str> {
        self.token += 1;
        self.lines.next().ok_or_else(|| self.malformed("unexpected end of data"))
    }

    fn int(&mut self) -> SimResult<i32> {
        let raw = self.line()?.trim();
        raw.parse().map_err(|_| self.malformed(format!("expected an integer, found '{}'", raw)))
    }

    fn flag(&mut self) -> SimResult<bool> {
        match self.int()? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(self.malformed(format!("expected 0 or 1, found {}", n))),
        }
    }

    fn color(&mut self) -> SimResult<Option<Color>> {
        let n = self.int()?;
        match Color::from_ordinal(n) {
            Some(c) => Ok(Some(c)),
            None if n == -1 => Ok(None),
            None => Err(self.malformed(format!("no color with ordinal {}", n))),
        }
    }
}

pub fn decode(text: &str, registry: &Registry) -> SimResult<ArenaFile> {
    let mut r = TokenReader::new(text);
    let version = r.int()?;
    let generation = Generation::of(version).ok_or(SimError::UnsupportedFormat { version })?;

    let rows = r.int()?;
    let cols = r.int()?;
    let floors = r.int()?;
    let mut grid = ArenaGrid::new(rows, cols, floors)?;

    if version >= 10 {
        grid.wrap = Wraparound { horizontal: r.flag()?, vertical: r.flag()?, floors: r.flag()? };
    }
    let move_shoot_allowed = if version >= 11 { r.flag()? } else { false };
    let title = if version >= 17 { r.line()?.to_string() } else { String::new() };
    let remembers = version >= 18;

    for floor in 0..floors {
        for row in 0..rows {
            for col in 0..cols {
                for layer in Layer::ALL {
                    let obj = read_object(&mut r, registry, generation, remembers, 0)?;
                    grid.set_cell(obj, row, col, floor, layer)?;
                }
            }
        }
    }
    log::info!("decoded {}x{}x{} arena (format {}, {:?})", rows, cols, floors, version, generation);
    Ok(ArenaFile { grid, title, move_shoot_allowed })
}

fn read_object(
    r: &mut TokenReader,
    registry: &Registry,
    generation: Generation,
    remembers: bool,
    depth: usize,
) -> SimResult<ArenaObject> {
    if depth > MAX_NESTING {
        return Err(r.malformed("saved objects nested too deeply"));
    }
    let identity = r.line()?.trim();
    let mut obj = registry.create(identity)?;
    let dir = r.int()?;
    obj.direction = Direction::from_ordinal(dir).ok_or_else(|| r.malformed(format!("no direction with ordinal {}", dir)))?;

    match obj.custom_format() {
        CustomFormat::Manual => {
            if generation.has_override_slot() {
                r.int()?;
            }
            obj.color = r.color()?;
            if generation.has_material_slot() {
                r.int()?;
            }
            let saved = read_object(r, registry, generation, remembers, depth + 1)?;
            obj.set_saved(saved);
        }
        CustomFormat::Props(count) => {
            obj.color = r.color()?;
            if generation.has_material_slot() {
                r.int()?;
            }
            for id in 1..=count {
                let value = r.int()?;
                obj.set_custom_property(id, value);
            }
        }
    }
    if remembers && obj.kind.remembers_previous() {
        let previous = read_object(r, registry, generation, remembers, depth + 1)?;
        obj.set_previous(Some(previous).filter(|p| !p.kind.is_empty()));
    }
    Ok(obj)
}

// ══════════════════════════════════════════════════════════════
// Writing
// ══════════════════════════════════════════════════════════════

struct TokenWriter {
    out: String,
}

impl TokenWriter {
    fn put(&mut self, token: impl std::fmt::Display) {
        self.out.push_str(&token.to_string());
        self.out.push('\n');
    }

    fn flag(&mut self, value: bool) {
        self.put(i32::from(value));
    }
}

/// Encode in the latest format.
pub fn encode(file: &ArenaFile) -> String {
    let grid = &file.grid;
    let mut w = TokenWriter { out: String::new() };
    w.put(LATEST_VERSION);
    w.put(grid.rows());
    w.put(grid.cols());
    w.put(grid.floors());
    w.flag(grid.wrap.horizontal);
    w.flag(grid.wrap.vertical);
    w.flag(grid.wrap.floors);
    w.flag(file.move_shoot_allowed);
    // the title is one line
    w.put(file.title.replace(['\r', '\n'], " "));

    for floor in 0..grid.floors() {
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                for layer in Layer::ALL {
                    let empty = ArenaObject::empty();
                    let obj = grid.cell(Pos::new(row, col, floor), layer).unwrap_or(&empty);
                    write_object(&mut w, obj);
                }
            }
        }
    }
    w.out
}

fn write_object(w: &mut TokenWriter, obj: &ArenaObject) {
    w.put(obj.identity());
    w.put(obj.direction.ordinal());
    w.put(obj.color.map_or(-1, Color::ordinal));
    match obj.custom_format() {
        CustomFormat::Manual => write_object(w, &obj.saved_or_empty()),
        CustomFormat::Props(count) => {
            for id in 1..=count {
                w.put(obj.custom_property(id));
            }
        }
    }
    if obj.kind.remembers_previous() {
        write_object(w, obj.previous().unwrap_or(&ArenaObject::empty()));
    }
}

// ══════════════════════════════════════════════════════════════
// Files
// ══════════════════════════════════════════════════════════════

pub fn load(path: &Path, registry: &Registry) -> SimResult<ArenaFile> {
    let text = std::fs::read_to_string(path)?;
    decode(&text, registry)
}

pub fn save(path: &Path, file: &ArenaFile) -> SimResult<()> {
    std::fs::write(path, encode(file))?;
    log::info!("saved arena to {}", path.display());
    Ok(())
}
