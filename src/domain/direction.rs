/// Directions and the small algebra over them.
///
/// ## Ordinal order
///
///   0 Invalid   1 None
///   2 North     3 NorthEast   4 East    5 SouthEast
///   6 South     7 SouthWest   8 West    9 NorthWest
///  10 Horizontal   11 Vertical
///
/// The ordinal is what the arena codec writes, so the order is fixed.
///
/// ## Deltas
///
/// `dx` grows toward the east (columns), `dy` grows toward the south (rows).
///
/// ```text
///        NW (-1,-1)   N (0,-1)   NE (1,-1)
///        W  (-1, 0)   None       E  (1, 0)
///        SW (-1, 1)   S (0, 1)   SE (1, 1)
/// ```

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Invalid,
    None,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Horizontal,
    Vertical,
}

/// The eight compass directions, clockwise from north.
const COMPASS: [Direction; 8] = [
    Direction::North,
    Direction::NorthEast,
    Direction::East,
    Direction::SouthEast,
    Direction::South,
    Direction::SouthWest,
    Direction::West,
    Direction::NorthWest,
];

const ORTHOGONAL: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

impl Direction {
    pub const COUNT: usize = 12;

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(n: i32) -> Option<Direction> {
        use Direction::*;
        let all = [
            Invalid, None, North, NorthEast, East, SouthEast,
            South, SouthWest, West, NorthWest, Horizontal, Vertical,
        ];
        usize::try_from(n).ok().and_then(|i| all.get(i).copied())
    }

    /// One of the eight compass points.
    pub fn is_compass(self) -> bool {
        COMPASS.contains(&self)
    }

    pub fn is_orthogonal(self) -> bool {
        ORTHOGONAL.contains(&self)
    }

    pub fn is_diagonal(self) -> bool {
        self.is_compass() && !self.is_orthogonal()
    }

    /// Clockwise neighbour on the 8-way rose. Non-compass values map to themselves.
    pub fn next(self) -> Direction {
        match COMPASS.iter().position(|&d| d == self) {
            Some(i) => COMPASS[(i + 1) % 8],
            None => self,
        }
    }

    /// Counter-clockwise neighbour on the 8-way rose.
    pub fn previous(self) -> Direction {
        match COMPASS.iter().position(|&d| d == self) {
            Some(i) => COMPASS[(i + 7) % 8],
            None => self,
        }
    }

    /// Clockwise quarter turn. Diagonals snap to the next orthogonal.
    pub fn next_orthogonal(self) -> Direction {
        if self.is_diagonal() {
            return self.next();
        }
        match ORTHOGONAL.iter().position(|&d| d == self) {
            Some(i) => ORTHOGONAL[(i + 1) % 4],
            None => self,
        }
    }

    /// Counter-clockwise quarter turn. Diagonals snap to the previous orthogonal.
    pub fn previous_orthogonal(self) -> Direction {
        if self.is_diagonal() {
            return self.previous();
        }
        match ORTHOGONAL.iter().position(|&d| d == self) {
            Some(i) => ORTHOGONAL[(i + 3) % 4],
            None => self,
        }
    }

    pub fn opposite(self) -> Direction {
        let (dx, dy) = self.unresolve();
        match self {
            Direction::Horizontal | Direction::Vertical | Direction::Invalid => self,
            _ => resolve_relative(-dx, -dy),
        }
    }

    /// Unit delta for a compass direction; `(0, 0)` for everything else.
    pub fn unresolve(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
            _ => (0, 0),
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::None
    }
}

/// Direction of travel for a delta. Only the sign of each component matters.
pub fn resolve_relative(dx: i32, dy: i32) -> Direction {
    match (dx.signum(), dy.signum()) {
        (0, 0) => Direction::None,
        (0, -1) => Direction::North,
        (1, -1) => Direction::NorthEast,
        (1, 0) => Direction::East,
        (1, 1) => Direction::SouthEast,
        (0, 1) => Direction::South,
        (-1, 1) => Direction::SouthWest,
        (-1, 0) => Direction::West,
        (-1, -1) => Direction::NorthWest,
        _ => Direction::Invalid,
    }
}

/// Direction a delta came *from*: the side of the cell a beam entered through.
pub fn resolve_relative_invert(dx: i32, dy: i32) -> Direction {
    resolve_relative(-dx, -dy)
}

/// Like `resolve_relative`, but orthogonal deltas collapse to an axis.
pub fn resolve_relative_hv(dx: i32, dy: i32) -> Direction {
    match (dx.signum(), dy.signum()) {
        (0, -1) | (0, 1) => Direction::Vertical,
        (-1, 0) | (1, 0) => Direction::Horizontal,
        _ => resolve_relative(dx, dy),
    }
}

/// Does a beam arriving from side `from` strike a reflective face of a
/// diagonal mirror facing `mirror`?
///
/// A mirror facing NE has its reflective faces on N and E, i.e. the two
/// compass neighbours of its own facing.
pub fn hit_reflective_side(from: Direction, mirror: Direction) -> bool {
    mirror.is_diagonal() && (from == mirror.previous() || from == mirror.next())
}

/// Exit direction of a beam reflected by a diagonal mirror.
///
/// `from` is the face the beam entered through. The beam leaves through
/// the other reflective face.
///
///   mirror  from N  from E  from S  from W
///   NE      E       N       -       -
///   SE      -       S       E       -
///   SW      -       -       W       S
///   NW      W       -       -       N
pub fn reflect(from: Direction, mirror: Direction) -> Direction {
    if !hit_reflective_side(from, mirror) {
        return Direction::None;
    }
    if from == mirror.previous() {
        mirror.next()
    } else {
        mirror.previous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip_in_codec_order() {
        assert_eq!(Direction::Invalid.ordinal(), 0);
        assert_eq!(Direction::North.ordinal(), 2);
        assert_eq!(Direction::Vertical.ordinal(), 11);
        for n in 0..Direction::COUNT as i32 {
            assert_eq!(Direction::from_ordinal(n).map(|d| d.ordinal()), Some(n));
        }
        assert_eq!(Direction::from_ordinal(12), None);
        assert_eq!(Direction::from_ordinal(-1), None);
    }

    #[test]
    fn resolve_uses_signum() {
        assert_eq!(resolve_relative(0, -5), Direction::North);
        assert_eq!(resolve_relative(3, 3), Direction::SouthEast);
        assert_eq!(resolve_relative(0, 0), Direction::None);
        assert_eq!(resolve_relative_invert(1, 0), Direction::West);
        assert_eq!(resolve_relative_hv(0, 1), Direction::Vertical);
        assert_eq!(resolve_relative_hv(-1, 0), Direction::Horizontal);
        assert_eq!(resolve_relative_hv(-1, -1), Direction::NorthWest);
    }

    #[test]
    fn unresolve_inverts_resolve() {
        for d in COMPASS {
            let (dx, dy) = d.unresolve();
            assert_eq!(resolve_relative(dx, dy), d);
        }
        assert_eq!(Direction::Horizontal.unresolve(), (0, 0));
    }

    #[test]
    fn rose_rotation_wraps() {
        assert_eq!(Direction::NorthWest.next(), Direction::North);
        assert_eq!(Direction::North.previous(), Direction::NorthWest);
        assert_eq!(Direction::West.next_orthogonal(), Direction::North);
        assert_eq!(Direction::North.previous_orthogonal(), Direction::West);
        // diagonals snap onto the orthogonal ring
        assert_eq!(Direction::NorthEast.next_orthogonal(), Direction::East);
        assert_eq!(Direction::NorthEast.previous_orthogonal(), Direction::North);
        assert_eq!(Direction::None.next(), Direction::None);
    }

    #[test]
    fn opposite_of_compass() {
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::SouthWest.opposite(), Direction::NorthEast);
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn mirror_faces() {
        assert!(hit_reflective_side(Direction::North, Direction::NorthEast));
        assert!(hit_reflective_side(Direction::East, Direction::NorthEast));
        assert!(!hit_reflective_side(Direction::South, Direction::NorthEast));
        assert!(!hit_reflective_side(Direction::North, Direction::North));
    }

    #[test]
    fn mirror_reflection_table() {
        assert_eq!(reflect(Direction::North, Direction::NorthEast), Direction::East);
        assert_eq!(reflect(Direction::East, Direction::NorthEast), Direction::North);
        assert_eq!(reflect(Direction::South, Direction::SouthEast), Direction::East);
        assert_eq!(reflect(Direction::West, Direction::SouthWest), Direction::South);
        assert_eq!(reflect(Direction::North, Direction::NorthWest), Direction::West);
        assert_eq!(reflect(Direction::South, Direction::NorthWest), Direction::None);
    }
}
