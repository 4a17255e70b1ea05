//! Forward-progress tracking for the planner

/// Detects iterations that add no completed step
///
/// The first observation always counts as progress. After that, an
/// observation that does not strictly exceed the best count so far is a
/// stall; reaching `limit` consecutive stalls reports a deadlock.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    best: Option<usize>,
    stalled: usize,
    limit: usize,
}

impl ProgressTracker {
    /// Create tracker with a stall limit
    #[inline]
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            best: None,
            stalled: 0,
            limit,
        }
    }

    /// Record the completed-step count of one iteration
    ///
    /// # Returns
    /// `true` once the stall limit is reached
    pub fn observe(&mut self, completed: usize) -> bool {
        match self.best {
            Some(best) if completed <= best => {
                self.stalled += 1;
            }
            _ => {
                self.best = Some(completed);
                self.stalled = 0;
            }
        }
        self.stalled >= self.limit
    }

    /// Consecutive stalls so far
    #[inline]
    #[must_use]
    pub fn stalled(&self) -> usize {
        self.stalled
    }
}
