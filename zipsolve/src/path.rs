//! Path synthesis: visit every numbered cell in ascending order, connecting consecutive
//! waypoints with a shortest 4-connected route around blocked cells.

use crate::{
    find::{MapTrait, PathFinder, PathFinderState},
    grid::{Coordinate, Grid},
    trace::{NoTrace, TraceEvent, TraceSink},
};

/// A route between two consecutive waypoints
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Shortest route, both ends included
    Route(Vec<Coordinate>),
    /// No route exists, the two ends are joined directly and the join may cross blocked cells
    Direct([Coordinate; 2]),
}

impl Segment {
    pub fn points(&self) -> &[Coordinate] {
        match self {
            Segment::Route(points) => points,
            Segment::Direct(points) => points,
        }
    }
}

/// Breadth-first search from `from` to `to`, exploring neighbors down, right, up, left
pub fn find_segment(grid: &Grid, from: Coordinate, to: Coordinate) -> Segment {
    if !grid.is_valid(from) || !grid.is_valid(to) {
        return Segment::Direct([from, to]);
    }

    let (state, _) = PathFinder::new(from, to, grid.create_storage()).finish(grid);

    match state {
        PathFinderState::PathFound(result) => Segment::Route(result.path),
        _ => Segment::Direct([from, to]),
    }
}

pub fn synthesize(grid: &Grid) -> Vec<Coordinate> {
    synthesize_traced(grid, NoTrace)
}

/// Build the full path through all numbered cells of `grid`.
///
/// - Without numbered cells the path runs from the top left to the bottom right corner.
/// - A single numbered cell gives a single point path.
/// - Segments share their end points, every waypoint appears once at the joint.
pub fn synthesize_traced(grid: &Grid, mut trace: impl TraceSink) -> Vec<Coordinate> {
    let waypoints: Vec<Coordinate> = grid
        .numbered_cells()
        .into_iter()
        .map(|cell| cell.coordinate())
        .collect();

    let Some(&last) = waypoints.last() else {
        trace.record(TraceEvent::NoNumberedCells {
            cols: grid.cols(),
            rows: grid.rows(),
        });
        return vec![
            Coordinate::new(0, 0),
            Coordinate::new(grid.cols() - 1, grid.rows() - 1),
        ];
    };

    let mut path = Vec::new();

    for pair in waypoints.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let segment = find_segment(grid, from, to);

        trace.record(match &segment {
            Segment::Route(points) => TraceEvent::SegmentFound {
                from,
                to,
                hops: points.len() - 1,
            },
            Segment::Direct(_) => TraceEvent::SegmentUnreachable { from, to },
        });

        // drop the end, it is the start of the next segment
        let points = segment.points();
        path.extend_from_slice(&points[..points.len() - 1]);
    }

    path.push(last);

    trace.record(TraceEvent::PathAssembled { points: path.len() });
    path
}

#[cfg(test)]
mod test {
    use super::*;

    fn coords(points: &[(usize, usize)]) -> Vec<Coordinate> {
        points.iter().copied().map(Coordinate::from).collect()
    }

    fn assert_connected(grid: &Grid, path: &[Coordinate]) {
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1, "{} -> {}", pair[0], pair[1]);
        }
        assert!(path.iter().all(|&c| !grid.is_blocked(c)));
    }

    #[test]
    fn test_no_numbered_cells() {
        let grid: Grid = ". . . .\n. # . .\n. . . .".parse().unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();

        assert_eq!(
            synthesize_traced(&grid, &mut events),
            coords(&[(0, 0), (3, 2)])
        );
        assert_eq!(events, vec![TraceEvent::NoNumberedCells { cols: 4, rows: 3 }]);
    }

    #[test]
    fn test_single_numbered_cell() {
        let grid: Grid = ". . .\n. . 1\n# . .".parse().unwrap();
        assert_eq!(synthesize(&grid), coords(&[(2, 1)]));
    }

    #[test]
    fn test_open_board_scenario() {
        let grid: Grid = "1 . 2 . .
                          . . . . .
                          . . . . 3
                          . . . . .
                          . . . . 4"
            .parse()
            .unwrap();

        let path = synthesize(&grid);

        // the search goes down before right, so the middle segment turns late
        assert_eq!(
            path,
            coords(&[
                (0, 0),
                (1, 0),
                (2, 0),
                (2, 1),
                (2, 2),
                (3, 2),
                (4, 2),
                (4, 3),
                (4, 4),
            ])
        );
        assert_eq!(path.len() - 1, 2 + 4 + 2);
        assert_connected(&grid, &path);
    }

    #[test]
    fn test_enclosed_waypoint_falls_back() {
        let grid: Grid = "1 . . . .
                          . . # . .
                          . # 2 # .
                          . . # . .
                          . . . . ."
            .parse()
            .unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();

        let path = synthesize_traced(&grid, &mut events);

        assert_eq!(path, coords(&[(0, 0), (2, 2)]));
        assert_eq!(
            events[0],
            TraceEvent::SegmentUnreachable {
                from: Coordinate::new(0, 0),
                to: Coordinate::new(2, 2),
            }
        );
    }

    #[test]
    fn test_unreachable_middle_keeps_going() {
        let grid: Grid = "1 # 3\n# 2 #\n. . .".parse().unwrap();

        // 1 and 3 are cut off from everything, each join is direct
        assert_eq!(synthesize(&grid), coords(&[(0, 0), (1, 1), (2, 0)]));
    }

    #[test]
    fn test_detour_around_wall() {
        let grid: Grid = "1 # 2
                          . # .
                          . . ."
            .parse()
            .unwrap();

        let path = synthesize(&grid);

        assert_eq!(
            path,
            coords(&[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (2, 1), (2, 0)])
        );
        assert_connected(&grid, &path);
    }

    #[test]
    fn test_waypoints_visited_by_order_not_position() {
        let grid: Grid = "2 . 1\n. . .\n. . 3".parse().unwrap();
        let path = synthesize(&grid);

        assert_eq!(path.first(), Some(&Coordinate::new(2, 0)));
        assert_eq!(path.last(), Some(&Coordinate::new(2, 2)));
        assert!(path.contains(&Coordinate::new(0, 0)));
        assert_eq!(path.len() - 1, 2 + 4);
        assert_connected(&grid, &path);
    }

    #[test]
    fn test_segments_on_open_board_are_manhattan() {
        let grid: Grid = ". . . .\n. . . .\n. . . .\n. . . .".parse().unwrap();

        for a in grid.cells() {
            for b in grid.cells() {
                let (from, to) = (a.coordinate(), b.coordinate());
                match find_segment(&grid, from, to) {
                    Segment::Route(points) => {
                        assert_eq!(points.len() - 1, from.manhattan(to));
                        assert_eq!(points.first(), Some(&from));
                        assert_eq!(points.last(), Some(&to));
                    }
                    Segment::Direct(_) => panic!("{} -> {} should be reachable", from, to),
                }
            }
        }
    }

    #[test]
    fn test_segment_outside_grid_is_direct() {
        let grid: Grid = ". .\n. .".parse().unwrap();
        let (from, to) = (Coordinate::new(0, 0), Coordinate::new(5, 1));

        assert_eq!(find_segment(&grid, from, to), Segment::Direct([from, to]));
    }

    #[test]
    fn test_trace_reports_segments() {
        let grid: Grid = "1 . 2\n# # .\n3 . .".parse().unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();

        let path = synthesize_traced(&grid, &mut events);

        assert_eq!(
            events,
            vec![
                TraceEvent::SegmentFound {
                    from: Coordinate::new(0, 0),
                    to: Coordinate::new(2, 0),
                    hops: 2,
                },
                TraceEvent::SegmentFound {
                    from: Coordinate::new(2, 0),
                    to: Coordinate::new(0, 2),
                    hops: 4,
                },
                TraceEvent::PathAssembled { points: 7 },
            ]
        );
        assert_eq!(path.len(), 7);
    }
}
