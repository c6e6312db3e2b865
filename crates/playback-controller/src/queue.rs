//! Ordered playback queue with a cursor.
//!
//! The cursor is an index so that duplicate identifiers stay unambiguous. Every
//! mutation keeps it pointing at an element that exists, or clears it.

use crate::resource::ResourceId;

#[derive(Clone, Debug, Default)]
pub(crate) struct PlayQueue {
    items: Vec<ResourceId>,
    cursor: Option<usize>,
}

/// Outcome of removing one element.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Removed {
    pub resource: ResourceId,
    /// The element was under the cursor. The cursor now points at its successor, if any.
    pub was_current: bool,
}

impl PlayQueue {
    pub fn from_items(items: Vec<ResourceId>) -> Self {
        Self {
            items,
            cursor: None,
        }
    }

    pub fn items(&self) -> &[ResourceId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&ResourceId> {
        self.cursor.and_then(|i| self.items.get(i))
    }

    /// Index of the first element equal to `resource`.
    pub fn position(&self, resource: &ResourceId) -> Option<usize> {
        self.items.iter().position(|r| r == resource)
    }

    pub fn push(&mut self, resource: ResourceId) {
        self.items.push(resource);
    }

    pub fn extend(&mut self, resources: Vec<ResourceId>) {
        self.items.extend(resources);
    }

    /// Make `resource` the only element and select it.
    pub fn replace_with(&mut self, resource: ResourceId) {
        self.items.clear();
        self.items.push(resource);
        self.cursor = Some(0);
    }

    /// Select the element at `index`. Out-of-range indices leave the cursor untouched.
    pub fn select(&mut self, index: usize) -> Option<&ResourceId> {
        if index < self.items.len() {
            self.cursor = Some(index);
        }
        self.current()
    }

    /// Move the cursor one element forward.
    ///
    /// Returns the new current element, or clears the cursor and returns `None` when
    /// the cursor was on the last element (or unset).
    pub fn advance(&mut self) -> Option<&ResourceId> {
        let next = self.cursor.map(|i| i + 1).filter(|&i| i < self.items.len());
        self.cursor = next;
        self.current()
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Remove the element at `index`, keeping the cursor on the same logical item.
    pub fn remove_at(&mut self, index: usize) -> Option<Removed> {
        if index >= self.items.len() {
            return None;
        }
        let resource = self.items.remove(index);
        let was_current = self.cursor == Some(index);
        self.cursor = match self.cursor {
            Some(c) if c > index => Some(c - 1),
            Some(c) if c == index => Some(c).filter(|&c| c < self.items.len()),
            other => other,
        };
        Some(Removed {
            resource,
            was_current,
        })
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }
}
