// Read-only view over one snapshot's map
//
// A Grid is rebuilt from every snapshot and dropped once the tick's decision
// has been made. Nothing here mutates after construction.

use log::warn;

use crate::types::{CellDescriptor, Position, Snapshot};

pub const GOAL_TYPE: &str = "apple";
pub const HEAD_TYPE: &str = "snake-head";
pub const BODY_TYPE: &str = "snake-body";
pub const BORDER_TYPE: &str = "border";

/// What occupies a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Goal,
    Head(String),
    Body(String),
    Border,
    /// Power-ups and anything else the server places that we don't model
    Item(String),
}

impl CellKind {
    /// Classifies a raw cell descriptor
    pub fn from_descriptor(descriptor: Option<&CellDescriptor>) -> CellKind {
        let Some(cell) = descriptor else {
            return CellKind::Empty;
        };
        let owner = || cell.player.clone().unwrap_or_default();

        match cell.kind.as_str() {
            GOAL_TYPE => CellKind::Goal,
            HEAD_TYPE => CellKind::Head(owner()),
            BODY_TYPE => CellKind::Body(owner()),
            BORDER_TYPE => CellKind::Border,
            other => CellKind::Item(other.to_string()),
        }
    }

    /// Heads, bodies and borders block movement
    pub fn is_traversable(&self) -> bool {
        matches!(self, CellKind::Empty | CellKind::Goal | CellKind::Item(_))
    }

    pub fn is_goal(&self) -> bool {
        matches!(self, CellKind::Goal)
    }
}

/// Fixed-size grid of classified cells, stored row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Builds a grid from the raw nested map
    ///
    /// # Returns
    /// * `Err` when the map is empty or its rows differ in length
    pub fn from_rows(map: &[Vec<Option<CellDescriptor>>]) -> Result<Grid, String> {
        let rows = map.len();
        let cols = map.first().map(Vec::len).unwrap_or(0);

        if rows == 0 || cols == 0 {
            return Err("Map has no cells".to_string());
        }

        if let Some((row, bad)) = map.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(format!(
                "Row {} has {} cells, expected {}",
                row,
                bad.len(),
                cols
            ));
        }

        let cells = map
            .iter()
            .flat_map(|row| row.iter().map(|cell| CellKind::from_descriptor(cell.as_ref())))
            .collect();

        Ok(Grid { rows, cols, cells })
    }

    /// Builds a grid from a decoded snapshot
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Grid, String> {
        match &snapshot.map {
            Some(map) => Self::from_rows(map),
            None => Err("Snapshot has no map".to_string()),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.rows && (pos.y as usize) < self.cols
    }

    /// Row-major index of an in-bounds position
    pub fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.x as usize * self.cols + pos.y as usize)
        } else {
            None
        }
    }

    /// Occupant of a cell, or `None` when the position is out of bounds
    pub fn occupant_at(&self, pos: Position) -> Option<&CellKind> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// In bounds and not blocked by a head, body or border
    pub fn is_traversable(&self, pos: Position) -> bool {
        self.occupant_at(pos).is_some_and(CellKind::is_traversable)
    }

    pub fn is_goal(&self, pos: Position) -> bool {
        self.occupant_at(pos).is_some_and(CellKind::is_goal)
    }

    /// Iterates all cells with their positions in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &CellKind)> + '_ {
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let pos = Position::new((i / self.cols) as i32, (i % self.cols) as i32);
            (pos, cell)
        })
    }

    /// First head owned by `owner` (case-insensitive)
    pub fn find_head(&self, owner: &str) -> Option<Position> {
        self.iter().find_map(|(pos, cell)| match cell {
            CellKind::Head(id) if id.eq_ignore_ascii_case(owner) => Some(pos),
            _ => None,
        })
    }

    /// First head owned by anyone other than `owner`
    pub fn find_other_head(&self, owner: &str) -> Option<(String, Position)> {
        self.iter().find_map(|(pos, cell)| match cell {
            CellKind::Head(id) if !id.eq_ignore_ascii_case(owner) => Some((id.clone(), pos)),
            _ => None,
        })
    }

    /// Number of goal cells left on the board
    pub fn goal_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_goal()).count()
    }
}

/// Everything a tick needs to know about one snapshot, located once
#[derive(Debug, Clone)]
pub struct Bearings {
    pub grid: Option<Grid>,
    pub head: Option<Position>,
    pub opponent_head: Option<Position>,
}

impl Bearings {
    /// Wraps the snapshot and finds our head and the opponent's head
    ///
    /// # Arguments
    /// * `player` - identifier tagging our cells on the map
    /// * `opponent` - identifier of the opponent; when `None` the first head
    ///   belonging to anyone else is used
    pub fn locate(snapshot: &Snapshot, player: &str, opponent: Option<&str>) -> Bearings {
        let grid = match Grid::from_snapshot(snapshot) {
            Ok(grid) => Some(grid),
            Err(e) => {
                warn!("Malformed snapshot: {}", e);
                None
            }
        };

        let head = grid.as_ref().and_then(|g| g.find_head(player));
        if grid.is_some() && head.is_none() {
            warn!("Head of player '{}' not found on the map", player);
        }

        let opponent_head = grid.as_ref().and_then(|g| match opponent {
            Some(id) => g.find_head(id),
            None => g.find_other_head(player).map(|(_, pos)| pos),
        });

        Bearings {
            grid,
            head,
            opponent_head,
        }
    }
}
