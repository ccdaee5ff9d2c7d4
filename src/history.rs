//! Snapshot-based linear undo/redo.
//!
//! [`TimeTraveller`] stores full copies of the tracked state. The owner
//! calls [`TimeTraveller::record_now`] after every mutation and applies the
//! snapshots returned by [`TimeTraveller::undo`], [`TimeTraveller::redo`]
//! and [`TimeTraveller::reset`] verbatim. Applying a snapshot is itself a
//! mutation; the skip latch keeps that one notification from being
//! recorded.

/// Linear history of snapshots.
#[derive(Clone, Debug)]
pub struct TimeTraveller<T> {
    history: Vec<T>,
    idx: usize,
    /// Snapshot taken at attach time; `reset` returns here.
    initial: Option<T>,
    skip_next: bool,
    frozen: usize,
    limit: Option<usize>,
}

impl<T: Clone + PartialEq> Default for TimeTraveller<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T: Clone + PartialEq> TimeTraveller<T> {
    /// A history keeping at most `limit` snapshots (unbounded when `None`).
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            history: Vec::new(),
            idx: 0,
            initial: None,
            skip_next: false,
            frozen: 0,
            limit: limit.map(|l| l.max(1)),
        }
    }

    /// Starts tracking from `snapshot`, discarding any previous history.
    pub fn attach(&mut self, snapshot: T) {
        self.history = vec![snapshot.clone()];
        self.initial = Some(snapshot);
        self.idx = 0;
        self.skip_next = false;
        self.frozen = 0;
    }

    /// Records `snapshot` as the newest state.
    ///
    /// Future states are dropped when the cursor is not at the end. Returns
    /// false if nothing was recorded: right after a snapshot was applied,
    /// while frozen, or when the state did not change.
    pub fn record_now(&mut self, snapshot: T) -> bool {
        if self.skip_next {
            self.skip_next = false;
            return false;
        }
        if self.frozen > 0 {
            return false;
        }
        if self.history.is_empty() {
            self.attach(snapshot);
            return true;
        }
        if self.history.get(self.idx) == Some(&snapshot) {
            return false;
        }

        self.history.truncate(self.idx + 1);
        self.history.push(snapshot);

        if let Some(limit) = self.limit {
            let overflow = self.history.len().saturating_sub(limit);
            if overflow > 0 {
                self.history.drain(..overflow);
            }
        }
        self.idx = self.history.len() - 1;
        true
    }

    /// Steps back; returns the snapshot to apply.
    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        self.idx -= 1;
        self.skip_next = true;
        self.history.get(self.idx).cloned()
    }

    /// Steps forward; returns the snapshot to apply.
    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.idx += 1;
        self.skip_next = true;
        self.history.get(self.idx).cloned()
    }

    /// Returns to the attach-time snapshot and restarts the history there.
    pub fn reset(&mut self) -> Option<T> {
        let initial = self.initial.clone()?;
        self.history = vec![initial.clone()];
        self.idx = 0;
        self.skip_next = true;
        Some(initial)
    }

    /// Suspends recording until the matching [`TimeTraveller::unfreeze`].
    pub fn freeze(&mut self) {
        self.frozen += 1;
    }

    /// Ends one freeze level; the outermost one records `snapshot`.
    pub fn unfreeze(&mut self, snapshot: T) -> bool {
        self.frozen = self.frozen.saturating_sub(1);
        if self.frozen == 0 {
            self.record_now(snapshot)
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.idx > 0
    }

    pub fn can_redo(&self) -> bool {
        self.idx + 1 < self.history.len()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Cursor position.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn current(&self) -> Option<&T> {
        self.history.get(self.idx)
    }
}
