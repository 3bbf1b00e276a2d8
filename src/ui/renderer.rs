/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Arena cells flagged dirty by the engine are recomposed into a
///      persistent `map` buffer (everything, after a scroll or resize)
///   2. The map, HUD and bars are copied into the `front` buffer
///   3. Each front cell is compared with `back` (previous frame) and only
///      changed cells are emitted, batched with `queue!`, flushed once
///   4. Swap front/back
///
/// Each arena cell is two terminal columns wide. The visible floor is
/// the tank's floor.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::direction::Direction;
use crate::domain::kind::{Item, KeyColor, Layer, ObjectKind};
use crate::domain::material::Color as Tint;
use crate::domain::object::ArenaObject;
use crate::sim::engine::Engine;
use crate::sim::grid::{ArenaGrid, Pos};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every otherwise empty terminal cell,
    /// so terminals never fall back to their own default between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Differs from any real cell, so every position gets diffed.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies one column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Glyphs
// ══════════════════════════════════════════════════════════════

/// Two terminal columns per arena cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD, gap, then message, inventory and help rows under the map.
const RESERVED_ROWS: usize = MAP_ROW + 4;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const DEAD_BG: Color = Color::Rgb { r: 140, g: 20, b: 20 };

/// Two-column glyph of one object.
type Glyph = ([char; 2], Color);

fn tint(color: Option<Tint>) -> Color {
    match color.unwrap_or(Tint::Gray) {
        Tint::Gray => Color::Grey,
        Tint::Red => Color::Red,
        Tint::Green => Color::Green,
        Tint::Blue => Color::Blue,
        Tint::Yellow => Color::Yellow,
        Tint::Cyan => Color::Cyan,
        Tint::Magenta => Color::Magenta,
        Tint::White => Color::White,
    }
}

fn key_tint(key: KeyColor) -> Color {
    match key {
        KeyColor::Red => Color::Red,
        KeyColor::Green => Color::Green,
        KeyColor::Blue => Color::Blue,
    }
}

fn arrow(dir: Direction) -> char {
    match dir {
        Direction::North => '▲',
        Direction::East => '▶',
        Direction::South => '▼',
        Direction::West => '◀',
        _ => '●',
    }
}

/// Reflective corner of a diagonal mirror.
fn mirror_corner(dir: Direction) -> char {
    match dir {
        Direction::NorthEast => '◥',
        Direction::SouthEast => '◢',
        Direction::SouthWest => '◣',
        Direction::NorthWest => '◤',
        _ => '◇',
    }
}

fn pickup_letter(item: Item) -> char {
    match item {
        Item::Missile => 'M',
        Item::Stunner => 'S',
        Item::Boost => 'P',
        Item::Magnet => 'G',
        Item::BlueLaser => 'L',
        Item::Disruptor => 'D',
        Item::RedKey | Item::GreenKey | Item::BlueKey => 'K',
        Item::Bomb => 'B',
        Item::HeatBomb => 'H',
        Item::IceBomb => 'I',
    }
}

/// Glyph of an object on the lower-objects or upper-objects layer.
/// `None` for empty cells.
fn object_glyph(obj: &ArenaObject) -> Option<Glyph> {
    use ObjectKind::*;
    let g = match &obj.kind {
        Empty | Ground | Ice | Lava | DeepWater | BeamTrail => return None,
        Wall => (['█', '█'], Color::Grey),
        WoodenWall => (['▓', '▓'], Color::DarkYellow),
        IcyWall => (['▓', '▓'], Color::Cyan),
        HotWall => (['▓', '▓'], Color::Red),
        MagneticWall => (['▓', '▓'], Color::Magenta),
        DisruptedWall => (['░', '░'], Color::Magenta),
        CrystalBlock => (['◆', ' '], Color::Cyan),
        HotCrystalBlock => (['◆', ' '], Color::Red),
        Barrel => (['(', ')'], Color::DarkRed),
        Box => (['[', ']'], Color::Grey),
        WoodenBox => (['[', ']'], Color::DarkYellow),
        IcyBox => (['[', ']'], Color::Cyan),
        HotBox => (['[', ']'], Color::Red),
        MetallicBox => (['[', ']'], Color::White),
        MagneticBox => (['[', ']'], Color::Magenta),
        JumpBox { .. } => (['{', '}'], Color::Yellow),
        Mirror => ([mirror_corner(obj.direction), ' '], Color::White),
        MagneticMirror => ([mirror_corner(obj.direction), ' '], Color::Magenta),
        AntiTank => ([arrow(obj.direction), 'A'], Color::Red),
        StunnedAntiTank => ([arrow(obj.direction), 'z'], Color::Cyan),
        DeadAntiTank => (['x', 'A'], Color::DarkGrey),
        Tunnel => (['◎', ' '], tint(obj.color)),
        Button { triggered, .. } => ([if *triggered { '◉' } else { '○' }, ' '], tint(obj.color)),
        ButtonDoor { open: true, .. } => (['·', '·'], tint(obj.color)),
        ButtonDoor { open: false, .. } => (['▒', '▒'], tint(obj.color)),
        Key(k) => (['⚷', ' '], key_tint(*k)),
        KeyDoor(k) => (['▐', '▌'], key_tint(*k)),
        Pickup(item) => (['+', pickup_letter(*item)], Color::Yellow),
        Tank => ([arrow(obj.direction), ' '], Color::Green),
        PowerfulTank => ([arrow(obj.direction), '!'], Color::Green),
    };
    Some(g)
}

fn ground_bg(obj: Option<&ArenaObject>) -> Color {
    match obj.map(|o| &o.kind) {
        Some(ObjectKind::Ice) => Color::Rgb { r: 120, g: 170, b: 200 },
        Some(ObjectKind::Lava) => Color::Rgb { r: 150, g: 40, b: 10 },
        Some(ObjectKind::DeepWater) => Color::Rgb { r: 20, g: 40, b: 120 },
        Some(ObjectKind::Ground) => Color::Rgb { r: 40, g: 40, b: 50 },
        _ => Cell::BASE_BG,
    }
}

fn beam_glyph(grid: &ArenaGrid, p: Pos) -> Option<Glyph> {
    let trail = grid.get_virtual_cell(p.row, p.col, p.floor).ok()?;
    if trail.kind != ObjectKind::BeamTrail {
        return None;
    }
    let ch = if trail.direction == Direction::Horizontal { '═' } else { '║' };
    Some(([ch, ch], Color::Red))
}

/// Compose one arena cell: tank over beam over lower object, all over
/// the floor tint.
fn compose_arena_cell(grid: &ArenaGrid, p: Pos) -> [Cell; 2] {
    let bg = ground_bg(grid.cell(p, Layer::LowerGround));
    let glyph = grid
        .cell(p, Layer::UpperObjects)
        .and_then(object_glyph)
        .or_else(|| beam_glyph(grid, p))
        .or_else(|| grid.cell(p, Layer::LowerObjects).and_then(object_glyph))
        .unwrap_or(([' ', ' '], Color::White));
    let (chars, fg) = glyph;
    [Cell::from_char(chars[0], fg, bg), Cell::from_char(chars[1], fg, bg)]
}

/// First visible index along one axis, keeping `center` in view.
fn viewport_origin(center: i32, extent: i32, view: i32) -> i32 {
    if view >= extent {
        return 0;
    }
    (center - view / 2).clamp(0, extent - view)
}

// ══════════════════════════════════════════════════════════════
// Renderer
// ══════════════════════════════════════════════════════════════

/// Extra text the viewer shows around the arena.
pub struct Overlay<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    /// Composed arena cells of the current viewport.
    map: FrameBuffer,
    /// (row, col, floor) of the viewport's top-left cell when `map` was built.
    map_origin: Option<(i32, i32, i32)>,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            map: FrameBuffer::new(0, 0),
            map_origin: None,
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.resize()
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        self.map_origin = None;
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    pub fn render(&mut self, engine: &mut Engine, overlay: &Overlay) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize()?;
        }

        self.front.clear();
        let view = self.compose_map(&mut engine.grid);
        self.compose_hud(engine, overlay);
        self.compose_bars(engine, overlay, view.1);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Map ──

    /// Recompose dirty cells of the viewport, blit the map into `front`.
    /// Returns the viewport size in arena cells (cols, rows).
    fn compose_map(&mut self, grid: &mut ArenaGrid) -> (usize, usize) {
        let focus = grid.find_player().unwrap_or(Pos::new(0, 0, 0));
        let view_cols = (self.term_w / CELL_W).min(grid.cols() as usize);
        let view_rows = self.term_h.saturating_sub(RESERVED_ROWS).max(1).min(grid.rows() as usize);

        let origin = (
            viewport_origin(focus.row, grid.rows(), view_rows as i32),
            viewport_origin(focus.col, grid.cols(), view_cols as i32),
            focus.floor,
        );
        let full = self.map_origin != Some(origin) || self.map.width != view_cols * CELL_W || self.map.height != view_rows;
        if full {
            self.map.resize(view_cols * CELL_W, view_rows);
            self.map_origin = Some(origin);
        }

        for vy in 0..view_rows {
            for vx in 0..view_cols {
                let p = Pos::new(origin.0 + vy as i32, origin.1 + vx as i32, origin.2);
                if !full && !grid.is_cell_dirty(p.row, p.col, p.floor) {
                    continue;
                }
                let [left, right] = compose_arena_cell(grid, p);
                self.map.set(vx * CELL_W, vy, left);
                self.map.set(vx * CELL_W + 1, vy, right);
            }
        }
        grid.clear_dirty_flags(focus.floor);

        for y in 0..self.map.height {
            for x in 0..self.map.width {
                self.front.set(x, MAP_ROW + y, self.map.get(x, y));
            }
        }
        (view_cols, view_rows)
    }

    // ── HUD and bars ──

    fn compose_hud(&mut self, engine: &Engine, overlay: &Overlay) {
        let floor = engine.tank().map_or(0, |p| p.floor);
        let hud = format!(
            " {}  Floor {}/{}  Undo:{}  Redo:{} ",
            overlay.title,
            floor + 1,
            engine.grid.floors(),
            if engine.history.can_undo() { "yes" } else { "-" },
            if engine.history.can_redo() { "yes" } else { "-" },
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_bars(&mut self, engine: &Engine, overlay: &Overlay, view_rows: usize) {
        let msg_row = MAP_ROW + view_rows + 1;
        if engine.ctx.game_over {
            let msg = " Tank destroyed.  U: undo   F2: restart ";
            self.front.fill_row(msg_row, DEAD_BG);
            self.front.put_str(0, msg_row, msg, Color::White, DEAD_BG);
        } else if !overlay.message.is_empty() {
            let msg = format!(" ◈ {} ", overlay.message);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        let inventory = inventory_line(engine);
        self.front.put_str(0, msg_row + 1, &inventory, Color::Yellow, Color::Reset);

        let help = " Arrows:Move  Shift:Turn  Space:Fire  1-5:Ammo  B/H/I:Bombs  U/Y:Undo/Redo  F2:Restart  F5:Save  Esc:Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // explicit base colors; ResetColor would fall back to the terminal default
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.as_str()))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

/// Non-zero inventory counters, e.g. `M:3 K(r):1`.
fn inventory_line(engine: &Engine) -> String {
    let inv = &engine.ctx.inventory;
    let parts: Vec<String> = Item::ALL
        .iter()
        .filter(|&&item| inv.count(item) > 0)
        .map(|&item| {
            let label = match item {
                Item::RedKey => "K(r)".to_string(),
                Item::GreenKey => "K(g)".to_string(),
                Item::BlueKey => "K(b)".to_string(),
                other => pickup_letter(other).to_string(),
            };
            format!("{}:{}", label, inv.count(item))
        })
        .collect();
    if parts.is_empty() {
        " Inventory: empty".to_string()
    } else {
        format!(" Inventory: {}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::tests::arena_from;

    #[test]
    fn viewport_keeps_focus_inside() {
        assert_eq!(viewport_origin(5, 24, 30), 0);
        assert_eq!(viewport_origin(2, 40, 10), 0);
        assert_eq!(viewport_origin(20, 40, 10), 15);
        assert_eq!(viewport_origin(39, 40, 10), 30);
    }

    #[test]
    fn tank_draws_over_floor_tint() {
        let g = arena_from(&["@~"]);
        let [left, _] = compose_arena_cell(&g, Pos::new(0, 0, 0));
        assert_eq!(left.as_str(), "▶");
        assert_eq!(left.fg, Color::Green);

        let [ice, _] = compose_arena_cell(&g, Pos::new(0, 1, 0));
        assert_eq!(ice.as_str(), " ");
        assert_eq!(ice.bg, ground_bg(g.cell(Pos::new(0, 1, 0), Layer::LowerGround)));
    }

    #[test]
    fn beam_trail_overlays_empty_cells() {
        let mut g = arena_from(&["...."]);
        let trail = ArenaObject::new(ObjectKind::BeamTrail).with_direction(Direction::Horizontal);
        g.set_virtual_cell(trail, 0, 2, 0).unwrap();
        let [left, right] = compose_arena_cell(&g, Pos::new(0, 2, 0));
        assert_eq!((left.as_str(), right.as_str()), ("═", "═"));
    }

    #[test]
    fn inventory_lists_only_held_items() {
        let mut engine = Engine::new(arena_from(&["@"]), &crate::config::GameConfig::default());
        assert_eq!(inventory_line(&engine), " Inventory: empty");
        engine.ctx.inventory.add_ten(Item::Missile);
        engine.ctx.inventory.add_one(Item::RedKey);
        assert_eq!(inventory_line(&engine), " Inventory: M:10 K(r):1");
    }
}
