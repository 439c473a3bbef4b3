// Breadth-first search toward the nearest goal cell
//
// Neighbor order is fixed (up, down, left, right) so equal-length ties always
// resolve the same way for the same board. Goal cells are entered but never
// expanded: reaching one ends the search.

use log::debug;
use std::collections::VecDeque;

use crate::grid::Grid;
use crate::types::{Direction, Position};

/// Shortest route found by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// First move of the path, the only part a tick commits to
    pub first_step: Direction,
    /// Number of moves from the start to the goal
    pub distance: usize,
    pub goal: Position,
}

/// Queue entry: where we are plus the partial path that led here
#[derive(Debug, Clone, Copy)]
struct Frontier {
    pos: Position,
    first_step: Direction,
    distance: usize,
}

pub struct PathFinder;

impl PathFinder {
    /// Finds the nearest reachable goal from `from`
    ///
    /// Edges exist between adjacent cells when the destination is traversable.
    /// The start cell itself never counts as a goal. Worst case visits every
    /// cell once.
    ///
    /// # Returns
    /// * `None` when no goal is reachable (or `from` is off the grid)
    pub fn nearest_goal(grid: &Grid, from: Position) -> Option<Route> {
        let start = grid.index(from)?;

        let mut visited = vec![false; grid.rows() * grid.cols()];
        visited[start] = true;

        let mut queue = VecDeque::new();
        for dir in Direction::all() {
            let frontier = Frontier {
                pos: dir.apply(from),
                first_step: dir,
                distance: 1,
            };
            if let Some(route) = Self::visit(grid, &mut visited, &mut queue, frontier) {
                return Some(route);
            }
        }

        while let Some(current) = queue.pop_front() {
            for dir in Direction::all() {
                let frontier = Frontier {
                    pos: dir.apply(current.pos),
                    first_step: current.first_step,
                    distance: current.distance + 1,
                };
                if let Some(route) = Self::visit(grid, &mut visited, &mut queue, frontier) {
                    return Some(route);
                }
            }
        }

        debug!("No reachable goal from {}", from);
        None
    }

    /// First step toward the nearest goal, if any goal is reachable
    pub fn nearest_goal_first_step(grid: &Grid, from: Position) -> Option<Direction> {
        Self::nearest_goal(grid, from).map(|route| route.first_step)
    }

    /// Marks and enqueues a frontier cell; returns the route when it is a goal
    fn visit(
        grid: &Grid,
        visited: &mut [bool],
        queue: &mut VecDeque<Frontier>,
        frontier: Frontier,
    ) -> Option<Route> {
        let idx = grid.index(frontier.pos)?;
        if visited[idx] || !grid.is_traversable(frontier.pos) {
            return None;
        }
        visited[idx] = true;

        if grid.is_goal(frontier.pos) {
            return Some(Route {
                first_step: frontier.first_step,
                distance: frontier.distance,
                goal: frontier.pos,
            });
        }

        queue.push_back(frontier);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellDescriptor;

    /// Builds a grid from ASCII rows: `.` empty, `A` apple, `H` our head,
    /// `h` opponent head, `#` body, `X` border
    fn grid(rows: &[&str]) -> (Grid, Position) {
        let mut start = Position::new(0, 0);
        let map: Vec<Vec<Option<CellDescriptor>>> = rows
            .iter()
            .enumerate()
            .map(|(x, row)| {
                row.chars()
                    .enumerate()
                    .map(|(y, c)| {
                        let (kind, player) = match c {
                            'A' => ("apple", None),
                            'H' => {
                                start = Position::new(x as i32, y as i32);
                                ("snake-head", Some("k"))
                            }
                            'h' => ("snake-head", Some("l")),
                            '#' => ("snake-body", Some("k")),
                            'X' => ("border", None),
                            _ => return None,
                        };
                        Some(CellDescriptor {
                            kind: kind.to_string(),
                            player: player.map(str::to_string),
                        })
                    })
                    .collect()
            })
            .collect();
        (Grid::from_rows(&map).unwrap(), start)
    }

    #[test]
    fn test_straight_line_to_goal() {
        let (g, start) = grid(&[".....", ".....", "..H.A", ".....", "....."]);
        let route = PathFinder::nearest_goal(&g, start).unwrap();
        assert_eq!(route.first_step, Direction::Right);
        assert_eq!(route.distance, 2);
        assert_eq!(route.goal, Position::new(2, 4));
    }

    #[test]
    fn test_routes_around_bodies() {
        let (g, start) = grid(&["....", "H#.A", "..#."]);
        let route = PathFinder::nearest_goal(&g, start).unwrap();
        assert_eq!(route.first_step, Direction::Up);
        assert_eq!(route.distance, 5);
    }

    #[test]
    fn test_unreachable_goal_returns_none() {
        let (g, start) = grid(&["H#.", "##.", "..A"]);
        assert_eq!(PathFinder::nearest_goal_first_step(&g, start), None);

        let (g, start) = grid(&["...", ".H.", "..."]);
        assert_eq!(PathFinder::nearest_goal(&g, start), None);
    }

    #[test]
    fn test_ties_resolve_in_neighbor_order() {
        // Goals equally far above and below: up is enumerated first
        let (g, start) = grid(&["A..", "...", "H..", "...", "A.."]);
        assert_eq!(PathFinder::nearest_goal_first_step(&g, start), Some(Direction::Up));

        // Goal diagonally away: up-first paths are discovered before left-first
        let (g, start) = grid(&["A..", ".H.", "..."]);
        assert_eq!(PathFinder::nearest_goal_first_step(&g, start), Some(Direction::Up));
    }

    #[test]
    fn test_goal_cells_are_not_expanded() {
        // The only way to the far apple is through the near one; the near one wins
        let (g, start) = grid(&["H.A.A", "#####"]);
        let route = PathFinder::nearest_goal(&g, start).unwrap();
        assert_eq!(route.goal, Position::new(0, 2));
    }

    #[test]
    fn test_start_cell_and_off_grid() {
        let (g, _) = grid(&["A.", ".."]);
        assert_eq!(PathFinder::nearest_goal(&g, Position::new(5, 5)), None);
        // Starting on the apple itself looks for another one
        assert_eq!(PathFinder::nearest_goal(&g, Position::new(0, 0)), None);
    }

    #[test]
    fn test_adding_obstacles_never_shortens_route() {
        let (open, start) = grid(&["......", "H....A", "......"]);
        let before = PathFinder::nearest_goal(&open, start).unwrap().distance;

        let (blocked, start) = grid(&["......", "H.#..A", "......"]);
        let after = PathFinder::nearest_goal(&blocked, start).unwrap().distance;
        assert!(after >= before);

        let (walled, start) = grid(&["..#...", "H.#..A", "..#..."]);
        assert_eq!(PathFinder::nearest_goal(&walled, start), None);
    }

    #[test]
    fn test_finds_goal_iff_reachable_on_every_start() {
        let (g, _) = grid(&["..#..", "..#.A", "###..", "....."]);
        for (pos, cell) in g.iter() {
            if !cell.is_traversable() || cell.is_goal() {
                continue;
            }
            let reachable = pos.x >= 2 || pos.y >= 3;
            assert_eq!(
                PathFinder::nearest_goal(&g, pos).is_some(),
                reachable,
                "start {}",
                pos
            );
        }
    }
}
