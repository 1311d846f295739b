//! Fixed-capacity LIFO stack.

/// Why a stack operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackFault {
    /// Push onto a full stack.
    Overflow,
    /// Pop or peek below the bottom.
    Underflow,
}

/// A last-in-first-out sequence with a capacity fixed at construction.
///
/// Every operation is checked; none of them allocate after `new`.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy> Stack<T> {
    /// Create an empty stack holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Push `value` on top.
    pub fn push(&mut self, value: T) -> Result<(), StackFault> {
        if self.items.len() >= self.capacity {
            return Err(StackFault::Overflow);
        }
        self.items.push(value);
        Ok(())
    }

    /// Remove and return the top item.
    pub fn pop(&mut self) -> Result<T, StackFault> {
        self.items.pop().ok_or(StackFault::Underflow)
    }

    /// The top item.
    pub fn peek(&self) -> Result<T, StackFault> {
        self.peek_n(0)
    }

    /// The item `n` below the top; `peek_n(0)` is the top.
    pub fn peek_n(&self, n: usize) -> Result<T, StackFault> {
        n.checked_add(1)
            .and_then(|depth| self.items.len().checked_sub(depth))
            .map(|i| self.items[i])
            .ok_or(StackFault::Underflow)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items from bottom to top.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}
