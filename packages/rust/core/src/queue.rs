//! Deduplicated, insertion-ordered queue of URLs awaiting analysis.

use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct PendingQueue {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `url` unless already queued. Returns whether it was added.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if !self.members.insert(url.clone()) {
            return false;
        }
        self.order.push_back(url);
        true
    }

    /// Remove and return the oldest entry.
    pub fn pop_front(&mut self) -> Option<String> {
        let url = self.order.pop_front()?;
        self.members.remove(&url);
        Some(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}
