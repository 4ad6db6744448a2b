//! Rolling window buffer.
//!
//! Holds the most recent feature rows of a dataset, evicting the oldest rows once
//! the configured capacity is exceeded.

use crate::models::FeatureRow;
use serde::Serialize;
use std::collections::VecDeque;

/// Bounded FIFO of feature rows.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    rows: VecDeque<FeatureRow>,
    capacity: usize,
}

impl RollingWindow {
    /// Creates an empty window holding at most `capacity` rows.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a row and evicts the oldest rows beyond capacity.
    ///
    /// Returns the number of evicted rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::models::FeatureRow;
    /// use shared::monitoring::RollingWindow;
    ///
    /// let mut window = RollingWindow::new(2);
    /// assert_eq!(window.push(FeatureRow::new().with_value("x", 1.0)), 0);
    /// assert_eq!(window.push(FeatureRow::new().with_value("x", 2.0)), 0);
    /// assert_eq!(window.push(FeatureRow::new().with_value("x", 3.0)), 1);
    /// assert_eq!(window.len(), 2);
    /// ```
    pub fn push(&mut self, row: FeatureRow) -> usize {
        self.rows.push_back(row);
        let excess = self.rows.len().saturating_sub(self.capacity);
        self.rows.drain(..excess);
        excess
    }

    /// Number of rows currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the window holds no row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Maximum number of rows.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once the window holds `capacity` rows.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    /// Iterates over the rows, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureRow> {
        self.rows.iter()
    }

    /// Copies the rows out, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FeatureRow> {
        self.rows.iter().cloned().collect()
    }

    /// Returns a snapshot of the window with its size information.
    #[must_use]
    pub fn state(&self) -> WindowState {
        WindowState {
            len: self.len(),
            capacity: self.capacity,
            rows: self.snapshot(),
        }
    }
}

/// Point-in-time copy of a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowState {
    /// Number of rows held.
    pub len: usize,
    /// Maximum number of rows.
    pub capacity: usize,
    /// The rows, oldest first.
    pub rows: Vec<FeatureRow>,
}

impl WindowState {
    /// Returns true if the window was full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }
}
