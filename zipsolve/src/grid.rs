use crate::find::{MapStorage, MapTrait, NodeReference};
use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

/// A cell address, `x` is the column and `y` the row
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: Coordinate) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl NodeReference for Coordinate {}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(usize, usize)> for Coordinate {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CellKind {
    Empty,
    Blocked,
    /// A waypoint, `order` starts at 1
    Numbered { order: u32 },
}

impl Default for CellKind {
    fn default() -> Self {
        Self::Empty
    }
}

impl Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellKind::Empty => write!(f, "."),
            CellKind::Blocked => write!(f, "#"),
            CellKind::Numbered { order } => write!(f, "{}", order),
        }
    }
}

impl FromStr for CellKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "." => Ok(CellKind::Empty),
            "#" => Ok(CellKind::Blocked),
            _ => match s.parse::<u32>() {
                Ok(0) => Err(anyhow!("cell order must start at 1, got 0")),
                Ok(order) => Ok(CellKind::Numbered { order }),
                Err(_) => Err(anyhow!("invalid cell token: {:?}", s)),
            },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
    #[serde(flatten)]
    pub kind: CellKind,
}

impl GridCell {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }

    /// The waypoint order, present only for numbered cells
    pub fn order(&self) -> Option<u32> {
        match self.kind {
            CellKind::Numbered { order } => Some(order),
            _ => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.kind == CellKind::Blocked
    }
}

/// Pixel space bounding box of a blocked cell, only used for drawing
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockedRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// A dense rectangular board, one [`GridCell`] per coordinate stored in row-major order
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
    blocked_regions: Vec<BlockedRegion>,
}

impl Grid {
    /// Build a grid from row-major cell kinds
    pub fn new(rows: usize, cols: usize, kinds: Vec<CellKind>) -> Result<Self, anyhow::Error> {
        if rows == 0 || cols == 0 {
            bail!("grid must have at least one row and column, got {}x{}", rows, cols);
        }
        if kinds.len() != rows * cols {
            bail!(
                "a {}x{} grid needs {} cells, got {}",
                rows,
                cols,
                rows * cols,
                kinds.len()
            );
        }

        let cells = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| GridCell {
                x: i % cols,
                y: i / cols,
                kind,
            })
            .collect();

        Ok(Self {
            rows,
            cols,
            cells,
            blocked_regions: Vec::new(),
        })
    }

    pub(crate) fn with_blocked_regions(mut self, blocked_regions: Vec<BlockedRegion>) -> Self {
        self.blocked_regions = blocked_regions;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn blocked_regions(&self) -> &[BlockedRegion] {
        &self.blocked_regions
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.x < self.cols && c.y < self.rows
    }

    pub fn cell(&self, c: Coordinate) -> Option<&GridCell> {
        if self.contains(c) {
            Some(&self.cells[c.y * self.cols + c.x])
        } else {
            None
        }
    }

    pub fn is_blocked(&self, c: Coordinate) -> bool {
        self.cell(c).is_some_and(GridCell::is_blocked)
    }

    /// The numbered cells sorted by ascending order, cells sharing an order stay row-major
    pub fn numbered_cells(&self) -> Vec<&GridCell> {
        let mut numbered: Vec<&GridCell> = self
            .cells
            .iter()
            .filter(|cell| cell.order().is_some())
            .collect();
        numbered.sort_by_key(|cell| cell.order());
        numbered
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .cells
            .iter()
            .map(|cell| cell.kind.to_string().len())
            .max()
            .unwrap_or(1);

        for row in self.cells.chunks(self.cols) {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>width$}", cell.kind.to_string(), width = width)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Parses the text form printed by `Display`: one line per row, whitespace separated tokens,
/// `.` for empty, `#` for blocked and the order for numbered cells. Blank lines are ignored.
impl FromStr for Grid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kinds = Vec::new();
        let mut rows = 0;
        let mut cols = None;

        for (line_no, line) in s.lines().enumerate() {
            let row = line
                .split_whitespace()
                .map(CellKind::from_str)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.context(format!("line {}", line_no + 1)))?;

            if row.is_empty() {
                continue;
            }

            match cols {
                None => cols = Some(row.len()),
                Some(c) if c != row.len() => bail!(
                    "line {}: expected {} cells, got {}",
                    line_no + 1,
                    c,
                    row.len()
                ),
                Some(_) => {}
            }

            rows += 1;
            kinds.extend(row);
        }

        Grid::new(rows, cols.unwrap_or(0), kinds)
    }
}

/// The four axis aligned moves
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Order in which the search explores neighbors. Among several shortest paths this picks
    /// the one that is returned, so changing it changes solutions.
    pub const EXPLORATION_ORDER: [Direction; 4] = [
        Direction::Down,
        Direction::Right,
        Direction::Up,
        Direction::Left,
    ];

    /// The neighbor in this direction, if it is inside a `cols` x `rows` board
    pub fn step(self, from: Coordinate, cols: usize, rows: usize) -> Option<Coordinate> {
        let next = match self {
            Direction::Up => Coordinate::new(from.x, from.y.checked_sub(1)?),
            Direction::Down => Coordinate::new(from.x, from.y + 1),
            Direction::Left => Coordinate::new(from.x.checked_sub(1)?, from.y),
            Direction::Right => Coordinate::new(from.x + 1, from.y),
        };

        (next.x < cols && next.y < rows).then_some(next)
    }
}

/// A MapStorage with one value per grid cell, row-major
#[derive(Debug)]
pub struct CellStorage<T> {
    cols: usize,
    values: Vec<T>,
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Coordinate;

    fn is_valid(&self, node: Self::Reference) -> bool {
        node.x < self.cols && node.y * self.cols + node.x < self.values.len()
    }

    fn get(&self, node: Self::Reference) -> T {
        self.values[node.y * self.cols + node.x]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.values[node.y * self.cols + node.x]
    }
}

impl<T: Display> Display for CellStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.values.chunks(self.cols.max(1)) {
            for value in row {
                write!(f, "{}", value)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl MapTrait for Grid {
    type Reference = Coordinate;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        self.contains(node)
    }

    /// In-bounds, non-blocked neighbors in [`Direction::EXPLORATION_ORDER`]
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        Direction::EXPLORATION_ORDER
            .into_iter()
            .filter_map(move |d| d.step(node, self.cols, self.rows))
            .filter(move |&p| !self.is_blocked(p))
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage {
            cols: self.cols,
            values: vec![Default::default(); self.rows * self.cols],
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::find::{PathFinder, PathFinderState, PathResult};

    fn create_basic_grid() -> Grid {
        "# # # # # # #
         # 1 # # # 2 #
         # . # # # . #
         # . # . . . #
         # . # . # # #
         # . . . . . .
         # # # # # # #"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let grid: Grid = "1 . #\n. 12 .\n".parse().unwrap();

        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.cells().len(), 6);
        assert_eq!(
            grid.cell(Coordinate::new(1, 1)).unwrap().kind,
            CellKind::Numbered { order: 12 }
        );
        assert!(grid.is_blocked(Coordinate::new(2, 0)));
        assert_eq!(grid.to_string(), " 1  .  #\n . 12  .\n");
        assert_eq!(grid.to_string().parse::<Grid>().unwrap(), grid);
    }

    #[test]
    fn test_parse_errors() {
        assert!("1 .\n. . .".parse::<Grid>().is_err());
        assert!("1 x".parse::<Grid>().is_err());
        assert!("0 .".parse::<Grid>().is_err());
        assert!("\n\n".parse::<Grid>().is_err());
    }

    #[test]
    fn test_new_checks_size() {
        assert!(Grid::new(2, 2, vec![CellKind::Empty; 3]).is_err());
        assert!(Grid::new(0, 2, vec![]).is_err());

        let grid = Grid::new(2, 3, vec![CellKind::Empty; 6]).unwrap();
        let coords: Vec<_> = grid.cells().iter().map(GridCell::coordinate).collect();
        assert_eq!(coords[4], Coordinate::new(1, 1));
        assert!(grid.cell(Coordinate::new(3, 0)).is_none());
    }

    #[test]
    fn test_numbered_cells_sorted_by_order() {
        let grid: Grid = "3 . 1\n. 2 #".parse().unwrap();
        let orders: Vec<_> = grid
            .numbered_cells()
            .iter()
            .map(|c| (c.order(), c.coordinate()))
            .collect();

        assert_eq!(
            orders,
            vec![
                (Some(1), Coordinate::new(2, 0)),
                (Some(2), Coordinate::new(1, 1)),
                (Some(3), Coordinate::new(0, 0)),
            ]
        );
    }

    #[test]
    fn test_neighbor_order() {
        let grid: Grid = ". . .\n. . .\n. . .".parse().unwrap();
        let neighbors: Vec<_> = grid.neighbors_of(Coordinate::new(1, 1)).collect();

        assert_eq!(
            neighbors,
            vec![
                Coordinate::new(1, 2),
                Coordinate::new(2, 1),
                Coordinate::new(1, 0),
                Coordinate::new(0, 1),
            ]
        );

        // corners only have two in-bounds neighbors
        let corner: Vec<_> = grid.neighbors_of(Coordinate::new(0, 0)).collect();
        assert_eq!(corner, vec![Coordinate::new(0, 1), Coordinate::new(1, 0)]);
    }

    #[test]
    fn test_neighbors_skip_blocked() {
        let grid: Grid = ". # .\n# . .\n. . .".parse().unwrap();
        let neighbors: Vec<_> = grid.neighbors_of(Coordinate::new(1, 1)).collect();

        assert_eq!(
            neighbors,
            vec![Coordinate::new(1, 2), Coordinate::new(2, 1)]
        );
        assert_eq!(grid.neighbors_of(Coordinate::new(0, 0)).count(), 0);
    }

    #[test]
    fn test_basic_route() {
        let grid = create_basic_grid();

        let finder = PathFinder::new(
            Coordinate::new(1, 1),
            Coordinate::new(5, 1),
            grid.create_storage(),
        );

        assert!(matches!(
            finder.finish(&grid).0,
            PathFinderState::PathFound(PathResult { hops: 12, .. })
        ));
    }

    #[test]
    fn test_basic_no_route() {
        let grid = create_basic_grid();

        let finder = PathFinder::new(
            Coordinate::new(1, 1),
            Coordinate::new(5, 0),
            grid.create_storage(),
        );
        // no route to target
        assert!(matches!(
            finder.finish(&grid).0,
            PathFinderState::NoPathFound
        ));
    }

    #[test]
    fn test_storage_display() {
        let grid: Grid = "1 . 2".parse().unwrap();
        let (_, visited) = PathFinder::new(
            Coordinate::new(0, 0),
            Coordinate::new(2, 0),
            grid.create_storage(),
        )
        .finish(&grid);

        assert_eq!(visited.to_string(), "000 001 002 \n");
        assert!(visited.is_valid(Coordinate::new(2, 0)));
        assert!(!visited.is_valid(Coordinate::new(3, 0)));
    }
}
