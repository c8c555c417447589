//! VM Stack Implementation
//!
//! Ordered container that pops from either end. The engine uses it LIFO as
//! the evaluation stack and FIFO as the operand-index queue.
//! No execution semantics.

use std::collections::VecDeque;

use crate::error::{DriftError, DriftResult, Resource};

/// Which end `pop` removes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Newest element first
    Lifo,
    /// Oldest element first
    Fifo,
}

#[derive(Debug, Clone)]
pub struct Stack<T> {
    values: VecDeque<T>,
    max_size: Option<usize>,
}

impl<T> Stack<T> {
    /// Create an unbounded stack
    pub fn new() -> Self {
        Stack {
            values: VecDeque::new(),
            max_size: None,
        }
    }

    /// Create a stack that refuses to grow past `max_size` elements
    pub fn bounded(max_size: usize) -> Self {
        Stack {
            values: VecDeque::new(),
            max_size: Some(max_size),
        }
    }

    /// Push value onto stack
    pub fn push(&mut self, value: T) -> DriftResult<()> {
        if let Some(limit) = self.max_size {
            if self.values.len() >= limit {
                return Err(DriftError::ResourceExhaustion {
                    resource: Resource::EvaluationStack,
                    limit,
                });
            }
        }
        self.values.push_back(value);
        Ok(())
    }

    /// Remove the newest or the oldest element; `None` when empty
    pub fn pop(&mut self, discipline: Discipline) -> Option<T> {
        match discipline {
            Discipline::Lifo => self.values.pop_back(),
            Discipline::Fifo => self.values.pop_front(),
        }
    }

    pub fn pop_lifo(&mut self) -> Option<T> {
        self.pop(Discipline::Lifo)
    }

    pub fn pop_fifo(&mut self) -> Option<T> {
        self.pop(Discipline::Fifo)
    }

    /// Peek at the newest element without removing it
    pub fn peek(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Live elements, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.values.iter()
    }
}

impl<T: Clone> Stack<T> {
    /// Append a copy of `items`, oldest first, leaving the source untouched.
    ///
    /// Capacity limits do not apply: the copy is a snapshot, not a sequence
    /// of pushes.
    pub fn copy_from<'a>(&mut self, items: impl IntoIterator<Item = &'a T>)
    where
        T: 'a,
    {
        self.values.extend(items.into_iter().cloned());
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for Stack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Stack {
            values: iter.into_iter().collect(),
            max_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_pops_newest() {
        let mut stack: Stack<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(stack.pop(Discipline::Lifo), Some(3));
        assert_eq!(stack.pop(Discipline::Lifo), Some(2));
        assert_eq!(stack.peek(), Some(&1));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn fifo_pops_oldest() {
        let mut queue: Stack<usize> = [4, 5, 6].into_iter().collect();
        assert_eq!(queue.pop(Discipline::Fifo), Some(4));
        assert_eq!(queue.pop(Discipline::Fifo), Some(5));
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn disciplines_can_mix() {
        let mut stack: Stack<char> = ['a', 'b', 'c', 'd'].into_iter().collect();
        assert_eq!(stack.pop_fifo(), Some('a'));
        assert_eq!(stack.pop_lifo(), Some('d'));
        assert_eq!(stack.pop_fifo(), Some('b'));
        assert_eq!(stack.pop_lifo(), Some('c'));
        assert!(stack.is_empty());
    }

    #[test]
    fn empty_signals_none() {
        let mut stack: Stack<u8> = Stack::new();
        assert_eq!(stack.pop_lifo(), None);
        assert_eq!(stack.pop_fifo(), None);
        assert_eq!(stack.peek(), None);
    }

    #[test]
    fn copy_from_appends_without_draining_source() {
        let template = vec![1usize, 0, 2];
        let mut first: Stack<usize> = Stack::new();
        first.copy_from(&template);
        while first.pop_fifo().is_some() {}

        let mut second: Stack<usize> = [9].into_iter().collect();
        second.copy_from(&template);
        assert_eq!(template, vec![1, 0, 2]);
        assert_eq!(second.iter().copied().collect::<Vec<_>>(), vec![9, 1, 0, 2]);

        let mut third: Stack<usize> = Stack::new();
        third.copy_from(second.iter());
        assert_eq!(third.len(), 4);
        assert_eq!(second.len(), 4);
    }

    #[test]
    fn bounded_stack_rejects_overflow() {
        let mut stack = Stack::bounded(2);
        stack.push(1).expect("first push");
        stack.push(2).expect("second push");
        assert_eq!(
            stack.push(3),
            Err(DriftError::ResourceExhaustion {
                resource: Resource::EvaluationStack,
                limit: 2,
            })
        );
        assert_eq!(stack.len(), 2);
    }
}
