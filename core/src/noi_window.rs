//! Fixed-size trailing-NOI window.
//!
//! A ring buffer over the last `capacity` months. Pushing a month past
//! capacity overwrites the oldest entry; the buffer never grows.

#[derive(Debug, Clone)]
pub struct NoiWindow {
    slots: Box<[f64]>,
    next: usize,
    filled: usize,
}

impl NoiWindow {
    /// `capacity` must be at least one; config validation guarantees it.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)].into_boxed_slice(),
            next: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Drop the oldest month (once full) and record the current one.
    pub fn push(&mut self, noi: f64) {
        self.slots[self.next] = noi;
        self.next = (self.next + 1) % self.slots.len();
        self.filled = (self.filled + 1).min(self.slots.len());
    }

    /// Mean over the months recorded so far, up to the window size.
    /// Zero before the first month.
    pub fn average(&self) -> f64 {
        if self.filled == 0 {
            return 0.0;
        }
        let sum: f64 = if self.filled == self.slots.len() {
            self.slots.iter().sum()
        } else {
            self.slots[..self.filled].iter().sum()
        };
        sum / self.filled as f64
    }
}
