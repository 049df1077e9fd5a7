//! Persistent ordered map, the key-ordered instantiation of the balanced tree.

use std::{cmp::Ordering, rc::Rc};

use super::{Retain, Tree};

// -------------------------------------------------------------------------------------------------

/// Map payload: a shared key/value pair plus the entry count of the whole subtree.
#[derive(Debug)]
pub struct Entry<K, V> {
    key: Rc<K>,
    value: Rc<V>,
    count: usize,
}

impl<K, V> Entry<K, V> {
    fn new(key: Rc<K>, value: Rc<V>) -> Self {
        Self {
            key,
            value,
            count: 1,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V> Retain for Entry<K, V> {
    fn retain(&self, left: Tree<Self>, right: Tree<Self>) -> Tree<Self> {
        let entry = Entry {
            key: Rc::clone(&self.key),
            value: Rc::clone(&self.value),
            count: 1 + count(&left) + count(&right),
        };
        Tree::node(entry, left, right)
    }
}

fn count<K, V>(tree: &Tree<Entry<K, V>>) -> usize {
    tree.get().map_or(0, |node| node.payload().count)
}

// -------------------------------------------------------------------------------------------------

/// A persistent map with keys kept in ascending order.
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    root: Tree<Entry<K, V>>,
}

impl<K, V> Clone for OrderedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            root: Tree::empty(),
        }
    }
}

impl<K: Ord, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Access to the underlying balanced tree.
    pub fn tree(&self) -> &Tree<Entry<K, V>> {
        &self.root
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let mut tree = &self.root;
        while let Some(node) = tree.get() {
            match key.cmp(node.payload().key()) {
                Ordering::Less => tree = node.left(),
                Ordering::Greater => tree = node.right(),
                Ordering::Equal => return Some(node.payload().value()),
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// In-order rank of the given key, if present.
    pub fn rank(&self, key: &K) -> Option<usize> {
        let mut tree = &self.root;
        let mut rank = 0;
        while let Some(node) = tree.get() {
            match key.cmp(node.payload().key()) {
                Ordering::Less => tree = node.left(),
                Ordering::Greater => {
                    rank += count(node.left()) + 1;
                    tree = node.right();
                }
                Ordering::Equal => return Some(rank + count(node.left())),
            }
        }
        None
    }

    /// Iterate over all entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.root.iter().map(|entry| (entry.key(), entry.value()))
    }

    /// Insert or replace the value of the given key.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let root = Self::insert_at(&self.root, Rc::new(key), Rc::new(value));
        Self { root }
    }

    fn insert_at(tree: &Tree<Entry<K, V>>, key: Rc<K>, value: Rc<V>) -> Tree<Entry<K, V>> {
        let Some(node) = tree.get() else {
            return Entry::new(key, value).retain(Tree::empty(), Tree::empty());
        };
        match key.as_ref().cmp(node.payload().key()) {
            Ordering::Less => {
                let left = Self::insert_at(node.left(), key, value);
                node.payload().retain(left, node.right().clone()).rebalance()
            }
            Ordering::Greater => {
                let right = Self::insert_at(node.right(), key, value);
                node.payload().retain(node.left().clone(), right).rebalance()
            }
            Ordering::Equal => {
                Entry::new(key, value).retain(node.left().clone(), node.right().clone())
            }
        }
    }

    /// Remove the given key, if present.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        let root = Self::remove_at(&self.root, key);
        Self { root }
    }

    fn remove_at(tree: &Tree<Entry<K, V>>, key: &K) -> Tree<Entry<K, V>> {
        let Some(node) = tree.get() else {
            return tree.clone();
        };
        match key.cmp(node.payload().key()) {
            Ordering::Less => {
                let left = Self::remove_at(node.left(), key);
                node.payload().retain(left, node.right().clone()).rebalance()
            }
            Ordering::Greater => {
                let right = Self::remove_at(node.right(), key);
                node.payload().retain(node.left().clone(), right).rebalance()
            }
            Ordering::Equal => Tree::pluck(node.left(), node.right()),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, (key, value)| map.insert(key, value))
    }
}

// -------------------------------------------------------------------------------------------------
