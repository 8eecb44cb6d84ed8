use std::{
    collections::VecDeque,
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference is valid
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the traversable neighbors of the provided node.
    ///
    /// The iteration order is the exploration order of the search, so it decides which of
    /// several equally short paths is returned.
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference>;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn is_valid(&self, node: Self::Reference) -> bool;
    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// The objects that we store in the frontier
#[derive(Debug)]
struct ToVisit<R> {
    hops: usize,
    point: R,
    from: Option<R>,
}

#[derive(Clone, Copy, Debug)]
pub struct VisitedItem<R> {
    pub hops: usize,
    pub from: Option<R>,
}

#[derive(Clone, Copy, Debug)]
pub struct Visited<R>(Option<VisitedItem<R>>);

impl<R> Default for Visited<R> {
    fn default() -> Self {
        Visited(None)
    }
}
impl<R> Deref for Visited<R> {
    type Target = Option<VisitedItem<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<R> DerefMut for Visited<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
impl<R> Display for Visited<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(item) => write!(f, "{:03} ", item.hops),
            None => write!(f, "{:>3} ", "-"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct PathResult<R> {
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub hops: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// Breadth-first search between two nodes of a [`MapTrait`].
///
/// Each node is marked as visited when it is dequeued, and a node that is already visited is
/// never enqueued again. Since the frontier is first-in-first-out the first time the goal is
/// dequeued it has been reached with the fewest possible hops.
#[derive(Debug)]
pub struct PathFinder<
    R: NodeReference,
    S: MapStorage<Visited<R>, Reference = R>,
    M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
> {
    start: R,
    goal: R,
    visited: S,
    visit_list: VecDeque<ToVisit<R>>,
    state: PathFinderState<R>,
    _map: std::marker::PhantomData<M>,
}

impl<
        R: NodeReference,
        S: MapStorage<Visited<R>, Reference = R>,
        M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
    > PathFinder<R, S, M>
{
    pub fn new(start: R, goal: R, visited: S) -> Self {
        Self {
            start,
            goal,
            visited,
            visit_list: VecDeque::from([ToVisit {
                hops: 0,
                point: start,
                from: None,
            }]),
            state: PathFinderState::Computing,
            _map: std::marker::PhantomData,
        }
    }

    pub fn finish(mut self, map: &M) -> (PathFinderState<R>, S) {
        loop {
            match self.step(map) {
                PathFinderState::Computing => {}
                s => return (s, self.visited),
            }
        }
    }

    pub fn step(&mut self, map: &M) -> PathFinderState<R> {
        if self.state.is_done() {
            return self.state.clone();
        }

        let Some(visit) = self.visit_list.pop_front() else {
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        };

        // the same node can be queued by several neighbors, only the first dequeue counts
        if self.visited.get(visit.point).is_some() {
            return self.state.clone();
        }

        *self.visited.get_mut(visit.point) = Visited(Some(VisitedItem {
            hops: visit.hops,
            from: visit.from,
        }));

        if visit.point == self.goal {
            self.state = PathFinderState::PathFound(PathResult {
                path: self.backtrack(),
                hops: visit.hops,
                start: self.start,
                goal: self.goal,
            });

            return self.state.clone();
        }

        for point in map.neighbors_of(visit.point) {
            if self.visited.get(point).is_none() {
                self.visit_list.push_back(ToVisit {
                    hops: visit.hops + 1,
                    point,
                    from: Some(visit.point),
                });
            }
        }

        self.state.clone()
    }

    /// Walk the `from` links back from the goal and return the path in start-to-goal order
    fn backtrack(&self) -> Vec<R> {
        let mut path: Vec<R> = vec![self.goal];
        let mut previous_visit = self.visited.get(self.goal);

        loop {
            previous_visit = match previous_visit {
                Visited(Some(VisitedItem { from: None, .. })) => {
                    // we found the starting point, we are done
                    break;
                }
                Visited(Some(VisitedItem {
                    from: Some(from), ..
                })) => {
                    path.push(from);
                    self.visited.get(from)
                }
                Visited(None) => {
                    unreachable!("backtracking lead to a node that was never visited")
                }
            }
        }

        path.reverse();
        path
    }

    pub fn state(&self) -> &PathFinderState<R> {
        &self.state
    }

    pub fn get_visited(&self) -> &S {
        &self.visited
    }

    pub fn start(&self) -> R {
        self.start
    }

    pub fn goal(&self) -> R {
        self.goal
    }
}
