//! Navigation state machine: current chapter index and prev/next availability
//!
//! The index is mutated only through [`NavigationState::select_index`] and
//! [`NavigationState::step`]; the loader never touches it directly. Boundary
//! policy is no wraparound: stepping past either end leaves the state
//! unchanged.

/// Direction for [`NavigationState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    fn delta(self) -> isize {
        match self {
            Direction::Prev => -1,
            Direction::Next => 1,
        }
    }
}

/// In-memory record of which chapter is active.
///
/// Invariant: `current` is `None` (nothing loaded) or a valid index into the
/// catalog whose length was given at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current: Option<usize>,
    len: usize,
}

impl NavigationState {
    /// Initial state: nothing selected, prev/next both unavailable.
    pub fn new(len: usize) -> Self {
        Self { current: None, len }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Select a chapter by index. Returns `false` (and leaves the state
    /// unchanged) when the index is out of range.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index < self.len {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// Move one chapter forward or backward. At either boundary, or before
    /// anything is selected, the state is unchanged and `None` is returned.
    pub fn step(&mut self, direction: Direction) -> Option<usize> {
        let current = self.current?;
        let target = current.checked_add_signed(direction.delta())?;
        if self.select_index(target) {
            Some(target)
        } else {
            None
        }
    }

    pub fn can_go_prev(&self) -> bool {
        matches!(self.current, Some(i) if i > 0)
    }

    pub fn can_go_next(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 < self.len)
    }
}
