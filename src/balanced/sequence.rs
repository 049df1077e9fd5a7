//! Persistent ordered sequence, indexed by in-order rank.

use std::rc::Rc;

use super::{Retain, Tree};
use crate::{Error, Result};

// -------------------------------------------------------------------------------------------------

/// Sequence payload: a single shared element plus the element count of the whole subtree.
#[derive(Debug)]
pub struct Item<T> {
    value: Rc<T>,
    length: usize,
}

impl<T> Item<T> {
    fn new(value: Rc<T>) -> Self {
        Self { value, length: 1 }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Clone for Item<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            length: self.length,
        }
    }
}

impl<T> Retain for Item<T> {
    fn retain(&self, left: Tree<Self>, right: Tree<Self>) -> Tree<Self> {
        let length = 1 + length(&left) + length(&right);
        let value = Rc::clone(&self.value);
        Tree::node(Item { value, length }, left, right)
    }
}

fn length<T>(tree: &Tree<Item<T>>) -> usize {
    tree.get().map_or(0, |node| node.payload().length)
}

// -------------------------------------------------------------------------------------------------

/// A persistent ordered container with O(log n) positional access, insertion and removal.
#[derive(Debug)]
pub struct Sequence<T> {
    root: Tree<Item<T>>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self {
            root: Tree::empty(),
        }
    }
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        length(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Access to the underlying balanced tree.
    pub fn tree(&self) -> &Tree<Item<T>> {
        &self.root
    }

    /// Element at the given position.
    pub fn get(&self, index: usize) -> Option<&T> {
        let mut tree = &self.root;
        let mut index = index;
        while let Some(node) = tree.get() {
            let left_len = length(node.left());
            if index < left_len {
                tree = node.left();
            } else if index == left_len {
                return Some(node.payload().value());
            } else {
                index -= left_len + 1;
                tree = node.right();
            }
        }
        None
    }

    /// Iterate over all elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.root.iter().map(Item::value)
    }

    /// Insert an element before the given position. `index == len` appends.
    pub fn insert(&self, index: usize, value: T) -> Result<Self> {
        if index > self.len() {
            return Err(Error::index_range(index, self.len()));
        }
        let root = Self::insert_at(&self.root, index, Rc::new(value));
        Ok(Self { root })
    }

    fn insert_at(tree: &Tree<Item<T>>, index: usize, value: Rc<T>) -> Tree<Item<T>> {
        match tree.get() {
            None => Item::new(value).retain(Tree::empty(), Tree::empty()),
            Some(node) => {
                let left_len = length(node.left());
                if index <= left_len {
                    let left = Self::insert_at(node.left(), index, value);
                    node.payload().retain(left, node.right().clone()).rebalance()
                } else {
                    let right = Self::insert_at(node.right(), index - left_len - 1, value);
                    node.payload().retain(node.left().clone(), right).rebalance()
                }
            }
        }
    }

    /// Append an element.
    #[must_use]
    pub fn push(&self, value: T) -> Self {
        let root = Self::insert_at(&self.root, self.len(), Rc::new(value));
        Self { root }
    }

    /// Remove the element at the given position.
    pub fn remove(&self, index: usize) -> Result<Self> {
        if index >= self.len() {
            return Err(Error::index_range(index, self.len()));
        }
        self.erase(index, index + 1)
    }

    /// Remove all elements in `[start, stop)`.
    pub fn erase(&self, start: usize, stop: usize) -> Result<Self> {
        if stop > self.len() {
            return Err(Error::index_range(stop, self.len()));
        }
        if start > stop {
            return Err(Error::index_range(start, stop));
        }
        let root = Self::erase_in(&self.root, start, stop);
        Ok(Self { root })
    }

    fn erase_in(tree: &Tree<Item<T>>, start: usize, stop: usize) -> Tree<Item<T>> {
        let Some(node) = tree.get() else {
            return tree.clone();
        };
        if start >= stop || start >= node.payload().length {
            return tree.clone();
        }
        let left_len = length(node.left());
        let left = if start < left_len {
            Self::erase_in(node.left(), start, stop.min(left_len))
        } else {
            node.left().clone()
        };
        let right = if stop > left_len + 1 {
            Self::erase_in(
                node.right(),
                start.saturating_sub(left_len + 1),
                stop - left_len - 1,
            )
        } else {
            node.right().clone()
        };
        if start <= left_len && left_len < stop {
            Tree::pluck(&left, &right)
        } else {
            Tree::join(left, node.payload(), right)
        }
    }

    /// Replace the element at the given position.
    pub fn replace(&self, index: usize, value: T) -> Result<Self> {
        if index >= self.len() {
            return Err(Error::index_range(index, self.len()));
        }
        let root = Self::replace_at(&self.root, index, Rc::new(value));
        Ok(Self { root })
    }

    fn replace_at(tree: &Tree<Item<T>>, index: usize, value: Rc<T>) -> Tree<Item<T>> {
        match tree.get() {
            None => tree.clone(),
            Some(node) => {
                let left_len = length(node.left());
                if index < left_len {
                    let left = Self::replace_at(node.left(), index, value);
                    node.payload().retain(left, node.right().clone())
                } else if index == left_len {
                    Item::new(value).retain(node.left().clone(), node.right().clone())
                } else {
                    let right = Self::replace_at(node.right(), index - left_len - 1, value);
                    node.payload().retain(node.left().clone(), right)
                }
            }
        }
    }
}

impl<T: Clone> Sequence<T> {
    /// Clone all elements into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let root = Tree::from_payloads(iter.into_iter().map(|value| Item::new(Rc::new(value))));
        Self { root }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn access() {
        let sequence = (0..10).collect::<Sequence<_>>();
        assert_eq!(sequence.len(), 10);
        assert_eq!(sequence.get(0), Some(&0));
        assert_eq!(sequence.get(9), Some(&9));
        assert_eq!(sequence.get(10), None);
        assert_eq!(sequence.to_vec(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn edits() {
        let sequence = Sequence::new().push("b").push("d");
        let sequence = sequence.insert(0, "a").unwrap().insert(2, "c").unwrap();
        assert_eq!(sequence.to_vec(), vec!["a", "b", "c", "d"]);
        assert_eq!(sequence.remove(1).unwrap().to_vec(), vec!["a", "c", "d"]);
        assert_eq!(sequence.replace(3, "e").unwrap().to_vec(), vec!["a", "b", "c", "e"]);
        assert_eq!(sequence.erase(1, 3).unwrap().to_vec(), vec!["a", "d"]);
        assert_eq!(sequence.to_vec(), vec!["a", "b", "c", "d"]);
        assert!(sequence.insert(5, "x").is_err());
        assert!(sequence.remove(4).is_err());
        assert!(sequence.erase(3, 2).is_err());
    }

    #[test]
    fn random_edits() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut sequence = Sequence::new();
        let mut reference = Vec::new();
        for step in 0..3000 {
            if !reference.is_empty() && rng.random_bool(0.45) {
                let start = rng.random_range(0..reference.len());
                let stop = rng.random_range(start..=reference.len().min(start + 8));
                sequence = sequence.erase(start, stop).unwrap();
                reference.drain(start..stop);
            } else {
                let index = rng.random_range(0..=reference.len());
                sequence = sequence.insert(index, step).unwrap();
                reference.insert(index, step);
            }
            assert!(sequence.tree().is_balanced());
            assert_eq!(sequence.len(), reference.len());
        }
        assert_eq!(sequence.to_vec(), reference);
    }
}
