/// ArenaGrid: the 4-dimensional cell store of one level.
///
/// ## Addressing
///
/// Cells are addressed by (row, col, floor, layer). Each position holds
/// exactly one object per layer; `Empty` fills unused layers.
///
///   - `get_cell()` / `set_cell()` are the checked external API
///   - `cell()` / `put()` are the engine's internal accessors: they
///     normalize the position first and treat an unmappable position
///     as absent
///
/// ## Wraparound
///
/// Each axis (horizontal, vertical, floors) wraps independently. A
/// coordinate past the edge of a non-wrapping axis is out of bounds.
///
/// ## Overlay and dirty tracking
///
///   - `virtual_cells`: one layer of composited appearance (beam trails).
///     Never consulted by the simulation.
///   - `dirty`: per (row, col, floor) redraw flags, set by every mutation.

use crate::domain::kind::{Layer, ObjectKind};
use crate::domain::object::ArenaObject;
use super::error::{SimError, SimResult};

pub const MIN_ROWS: i32 = 24;
pub const MIN_COLS: i32 = 24;
pub const MAX_ROWS: i32 = 256;
pub const MAX_COLS: i32 = 256;
pub const MAX_FLOORS: i32 = 9;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
    pub floor: i32,
}

impl Pos {
    pub fn new(row: i32, col: i32, floor: i32) -> Self {
        Pos { row, col, floor }
    }

    /// Step by a direction delta: `dx` moves columns, `dy` moves rows.
    pub fn offset(self, dx: i32, dy: i32) -> Pos {
        Pos { row: self.row + dy, col: self.col + dx, floor: self.floor }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Wraparound {
    pub horizontal: bool,
    pub vertical: bool,
    pub floors: bool,
}

/// Cell contents of a grid without overlay or dirty state.
/// Used for undo history and the level start state.
#[derive(Clone, PartialEq, Debug)]
pub struct GridImage {
    rows: i32,
    cols: i32,
    floors: i32,
    cells: Vec<ArenaObject>,
}

#[derive(Clone, Debug)]
pub struct ArenaGrid {
    rows: i32,
    cols: i32,
    floors: i32,
    pub wrap: Wraparound,
    cells: Vec<ArenaObject>,
    virtual_cells: Vec<ArenaObject>,
    dirty: Vec<bool>,
    start_state: Option<GridImage>,
}

// ── Construction ──

impl ArenaGrid {
    pub fn new(rows: i32, cols: i32, floors: i32) -> SimResult<Self> {
        let invalid = SimError::InvalidDimensions { rows, cols, floors };
        if !(MIN_ROWS..=MAX_ROWS).contains(&rows) || !(MIN_COLS..=MAX_COLS).contains(&cols) || !(1..=MAX_FLOORS).contains(&floors) {
            return Err(invalid);
        }
        let positions = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(floors))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(invalid)?;
        Ok(ArenaGrid {
            rows,
            cols,
            floors,
            wrap: Wraparound::default(),
            cells: vec![ArenaObject::empty(); positions * Layer::COUNT],
            virtual_cells: vec![ArenaObject::empty(); positions],
            dirty: vec![true; positions],
            start_state: None,
        })
    }

    pub fn rows(&self) -> i32 { self.rows }
    pub fn cols(&self) -> i32 { self.cols }
    pub fn floors(&self) -> i32 { self.floors }

    /// Reset every position: `ground` on the lower ground layer, `Empty` elsewhere.
    pub fn fill(&mut self, ground: &ArenaObject) {
        for (i, cell) in self.cells.iter_mut().enumerate() {
            *cell = if i % Layer::COUNT == Layer::LowerGround.index() {
                ground.clone()
            } else {
                ArenaObject::empty()
            };
        }
        self.clear_virtual();
        self.set_all_dirty_flags();
    }
}

// ── Addressing ──

impl ArenaGrid {
    /// Map a position into the grid, applying wraparound per axis.
    pub fn normalize(&self, pos: Pos) -> Option<Pos> {
        let row = wrap_axis(pos.row, self.rows, self.wrap.vertical)?;
        let col = wrap_axis(pos.col, self.cols, self.wrap.horizontal)?;
        let floor = wrap_axis(pos.floor, self.floors, self.wrap.floors)?;
        Some(Pos { row, col, floor })
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        self.normalize(pos).is_some()
    }

    fn position_index(&self, p: Pos) -> usize {
        ((p.floor * self.rows + p.row) * self.cols + p.col) as usize
    }

    fn cell_index(&self, p: Pos, layer: Layer) -> usize {
        self.position_index(p) * Layer::COUNT + layer.index()
    }

    /// Every position on a floor, row-major.
    pub fn positions(&self, floor: i32) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Pos { row, col, floor }))
    }

    /// Positions at Chebyshev distance exactly `radius` from `center`,
    /// normalized and deduplicated (small wrapped grids fold onto themselves).
    pub fn ring(&self, center: Pos, radius: i32) -> Vec<Pos> {
        let mut out: Vec<Pos> = Vec::new();
        if radius == 0 {
            out.extend(self.normalize(center));
            return out;
        }
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                if let Some(p) = self.normalize(center.offset(dx, dy)) {
                    if p != center && !out.contains(&p) {
                        out.push(p);
                    }
                }
            }
        }
        out
    }
}

fn wrap_axis(v: i32, len: i32, wraps: bool) -> Option<i32> {
    if (0..len).contains(&v) {
        Some(v)
    } else if wraps {
        Some(v.rem_euclid(len))
    } else {
        None
    }
}

// ── Cell query / mutation API ──

impl ArenaGrid {
    /// Checked read for external collaborators.
    pub fn get_cell(&self, row: i32, col: i32, floor: i32, layer: Layer) -> SimResult<&ArenaObject> {
        let pos = Pos { row, col, floor };
        self.cell(pos, layer).ok_or(SimError::OutOfBounds { row, col, floor })
    }

    /// Checked write for external collaborators. Enforces the fixed layer
    /// of each kind.
    pub fn set_cell(&mut self, obj: ArenaObject, row: i32, col: i32, floor: i32, layer: Layer) -> SimResult<()> {
        if !obj.kind.fits_layer(layer) {
            return Err(SimError::WrongLayer { identity: obj.identity().to_string(), layer: layer.index() });
        }
        let pos = Pos { row, col, floor };
        if self.put(pos, layer, obj) {
            Ok(())
        } else {
            Err(SimError::OutOfBounds { row, col, floor })
        }
    }

    #[inline]
    pub fn cell(&self, pos: Pos, layer: Layer) -> Option<&ArenaObject> {
        let p = self.normalize(pos)?;
        Some(&self.cells[self.cell_index(p, layer)])
    }

    /// Mutable access. Marks the position dirty.
    pub fn cell_mut(&mut self, pos: Pos, layer: Layer) -> Option<&mut ArenaObject> {
        let p = self.normalize(pos)?;
        let pi = self.position_index(p);
        self.dirty[pi] = true;
        let ci = self.cell_index(p, layer);
        Some(&mut self.cells[ci])
    }

    /// Store `obj`; returns false if `pos` is outside the arena.
    pub fn put(&mut self, pos: Pos, layer: Layer, obj: ArenaObject) -> bool {
        match self.cell_mut(pos, layer) {
            Some(cell) => {
                *cell = obj;
                true
            }
            None => false,
        }
    }

    /// Remove and return the object, leaving `Empty` behind.
    pub fn take(&mut self, pos: Pos, layer: Layer) -> Option<ArenaObject> {
        self.cell_mut(pos, layer).map(std::mem::take)
    }

    /// Is the position free for a movable to enter? Both object layers
    /// must be passable.
    pub fn is_free(&self, pos: Pos) -> bool {
        match (self.cell(pos, Layer::LowerObjects), self.cell(pos, Layer::UpperObjects)) {
            (Some(lower), Some(upper)) => !lower.is_solid() && upper.kind.is_empty(),
            _ => false,
        }
    }

    /// First position on `floor` whose `layer` object satisfies `pred`.
    pub fn find_object<F>(&self, floor: i32, layer: Layer, pred: F) -> Option<Pos>
    where
        F: Fn(&ArenaObject) -> bool,
    {
        self.positions(floor).find(|&p| self.cell(p, layer).map_or(false, &pred))
    }

    pub fn find_all<F>(&self, floor: i32, layer: Layer, pred: F) -> Vec<Pos>
    where
        F: Fn(&ArenaObject) -> bool,
    {
        self.positions(floor).filter(|&p| self.cell(p, layer).map_or(false, &pred)).collect()
    }

    /// Position of the first character on any floor.
    pub fn find_player(&self) -> Option<Pos> {
        (0..self.floors).find_map(|f| self.find_object(f, Layer::UpperObjects, |o| o.kind.is_character()))
    }
}

// ── Virtual overlay ──

impl ArenaGrid {
    pub fn get_virtual_cell(&self, row: i32, col: i32, floor: i32) -> SimResult<&ArenaObject> {
        let p = self.normalize(Pos { row, col, floor }).ok_or(SimError::OutOfBounds { row, col, floor })?;
        Ok(&self.virtual_cells[self.position_index(p)])
    }

    pub fn set_virtual_cell(&mut self, obj: ArenaObject, row: i32, col: i32, floor: i32) -> SimResult<()> {
        let p = self.normalize(Pos { row, col, floor }).ok_or(SimError::OutOfBounds { row, col, floor })?;
        let i = self.position_index(p);
        self.virtual_cells[i] = obj;
        self.dirty[i] = true;
        Ok(())
    }

    pub fn clear_virtual(&mut self) {
        for (i, v) in self.virtual_cells.iter_mut().enumerate() {
            if !v.kind.is_empty() {
                *v = ArenaObject::empty();
                self.dirty[i] = true;
            }
        }
    }

    pub fn has_beam_trail(&self, pos: Pos) -> bool {
        self.normalize(pos)
            .map(|p| self.virtual_cells[self.position_index(p)].kind == ObjectKind::BeamTrail)
            .unwrap_or(false)
    }
}

// ── Dirty tracking ──

impl ArenaGrid {
    pub fn mark_dirty(&mut self, row: i32, col: i32, floor: i32) {
        if let Some(p) = self.normalize(Pos { row, col, floor }) {
            let i = self.position_index(p);
            self.dirty[i] = true;
        }
    }

    pub fn is_cell_dirty(&self, row: i32, col: i32, floor: i32) -> bool {
        self.normalize(Pos { row, col, floor })
            .map(|p| self.dirty[self.position_index(p)])
            .unwrap_or(false)
    }

    pub fn clear_dirty_flags(&mut self, floor: i32) {
        if !(0..self.floors).contains(&floor) {
            return;
        }
        let per_floor = (self.rows * self.cols) as usize;
        let start = floor as usize * per_floor;
        for d in &mut self.dirty[start..start + per_floor] {
            *d = false;
        }
    }

    pub fn set_all_dirty_flags(&mut self) {
        for d in &mut self.dirty {
            *d = true;
        }
    }
}

// ── Images: undo snapshots and the level start state ──

impl ArenaGrid {
    pub fn image(&self) -> GridImage {
        GridImage {
            rows: self.rows,
            cols: self.cols,
            floors: self.floors,
            cells: self.cells.clone(),
        }
    }

    /// Replace all cells with `image`. The overlay is cleared and every
    /// position is marked dirty.
    pub fn restore_image(&mut self, image: GridImage) {
        if image.rows != self.rows || image.cols != self.cols || image.floors != self.floors {
            self.rows = image.rows;
            self.cols = image.cols;
            self.floors = image.floors;
            let positions = (self.rows * self.cols * self.floors) as usize;
            self.virtual_cells = vec![ArenaObject::empty(); positions];
            self.dirty = vec![true; positions];
        }
        self.cells = image.cells;
        self.clear_virtual();
        self.set_all_dirty_flags();
    }

    /// Remember the current cells as the level start state.
    pub fn save_state(&mut self) {
        self.start_state = Some(self.image());
    }

    /// Return to the saved start state. Returns false if none was saved.
    pub fn restore_state(&mut self) -> bool {
        match self.start_state.clone() {
            Some(image) => {
                self.restore_image(image);
                true
            }
            None => false,
        }
    }
}
