//! Generic persistent, self-balancing (AVL) binary tree, shared by the rope, sequence and
//! ordered map containers.
//!
//! Trees are never mutated in place: every structural operation returns a new root which shares
//! all untouched subtrees with the old one. Payloads recompute their derived aggregates (lengths,
//! counts) through the [`Retain`] hook whenever a node is rebuilt with new children.

use std::rc::Rc;

pub mod map;
pub mod rope;
pub mod sequence;

// -------------------------------------------------------------------------------------------------

/// Payload of a [`Tree`] node.
///
/// The generic tree layer never creates payload nodes on its own: rotations, merges and rebuilds
/// all go through `retain`, so payload specific aggregates stay consistent.
pub trait Retain: Sized {
    /// Rebuild a node holding this payload with the given children, recomputing all fields which
    /// are derived from the children.
    fn retain(&self, left: Tree<Self>, right: Tree<Self>) -> Tree<Self>;
}

// -------------------------------------------------------------------------------------------------

/// A single, immutable tree node.
#[derive(Debug)]
pub struct Node<P> {
    left: Tree<P>,
    right: Tree<P>,
    height: usize,
    payload: P,
}

impl<P> Node<P> {
    pub fn left(&self) -> &Tree<P> {
        &self.left
    }

    pub fn right(&self) -> &Tree<P> {
        &self.right
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

// -------------------------------------------------------------------------------------------------

/// A persistent AVL tree, or the empty sentinel.
#[derive(Debug)]
pub struct Tree<P>(Option<Rc<Node<P>>>);

impl<P> Clone for Tree<P> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<P> Default for Tree<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P> Tree<P> {
    /// The empty sentinel tree.
    pub fn empty() -> Self {
        Self(None)
    }

    /// Create a new node from the given payload and children. Only meant to be called from
    /// [`Retain::retain`] impls, after the payload's aggregates got recomputed.
    pub fn node(payload: P, left: Tree<P>, right: Tree<P>) -> Self {
        let height = 1 + left.height().max(right.height());
        Self(Some(Rc::new(Node {
            left,
            right,
            height,
            payload,
        })))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Access the root node, if any.
    pub fn get(&self) -> Option<&Node<P>> {
        self.0.as_deref()
    }

    /// Height of the tree. 0 for the empty sentinel.
    pub fn height(&self) -> usize {
        self.get().map_or(0, |node| node.height)
    }

    /// Height difference between the left and right subtree. 0 for the empty sentinel.
    pub fn balance(&self) -> isize {
        self.get().map_or(0, |node| {
            node.left.height() as isize - node.right.height() as isize
        })
    }

    /// Returns true if the tree is a valid AVL tree: stored heights are consistent and no node
    /// has a balance outside of `[-1, 1]`.
    pub fn is_balanced(&self) -> bool {
        match self.get() {
            None => true,
            Some(node) => {
                node.height == 1 + node.left.height().max(node.right.height())
                    && self.balance().abs() <= 1
                    && node.left.is_balanced()
                    && node.right.is_balanced()
            }
        }
    }

    /// In-order iterator over all payloads.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter::new(self)
    }
}

impl<P: Retain> Tree<P> {
    /// Build a balanced tree from payloads in in-order sequence.
    pub fn from_payloads<I: IntoIterator<Item = P>>(payloads: I) -> Self {
        fn build<P: Retain>(payloads: &mut impl Iterator<Item = P>, count: usize) -> Tree<P> {
            if count == 0 {
                return Tree::empty();
            }
            let left_count = count / 2;
            let left = build(payloads, left_count);
            match payloads.next() {
                Some(payload) => {
                    let right = build(payloads, count - left_count - 1);
                    payload.retain(left, right)
                }
                None => left,
            }
        }
        let payloads = payloads.into_iter().collect::<Vec<_>>();
        let count = payloads.len();
        build(&mut payloads.into_iter(), count)
    }

    /// Rotate the tree to the left: the right child becomes the new root.
    #[must_use]
    pub fn left_rotate(&self) -> Self {
        match self.get() {
            Some(node) => match node.right.get() {
                Some(right) => right.payload.retain(
                    node.payload.retain(node.left.clone(), right.left.clone()),
                    right.right.clone(),
                ),
                None => self.clone(),
            },
            None => self.clone(),
        }
    }

    /// Rotate the tree to the right: the left child becomes the new root.
    #[must_use]
    pub fn right_rotate(&self) -> Self {
        match self.get() {
            Some(node) => match node.left.get() {
                Some(left) => left.payload.retain(
                    left.left.clone(),
                    node.payload.retain(left.right.clone(), node.right.clone()),
                ),
                None => self.clone(),
            },
            None => self.clone(),
        }
    }

    /// Restore the AVL balance of a node whose children differ in height by at most 2.
    #[must_use]
    pub fn rebalance(&self) -> Self {
        let Some(node) = self.get() else {
            return self.clone();
        };
        let balance = self.balance();
        if balance > 1 {
            if node.left.balance() < 0 {
                node.payload
                    .retain(node.left.left_rotate(), node.right.clone())
                    .right_rotate()
            } else {
                self.right_rotate()
            }
        } else if balance < -1 {
            if node.right.balance() > 0 {
                node.payload
                    .retain(node.left.clone(), node.right.right_rotate())
                    .left_rotate()
            } else {
                self.left_rotate()
            }
        } else {
            self.clone()
        }
    }

    /// Join two trees with the given payload in between them. All payloads in `left` must
    /// precede the payloads in `right`. Heights of `left` and `right` may differ arbitrarily.
    pub fn join(left: Tree<P>, payload: &P, right: Tree<P>) -> Self {
        let (left_height, right_height) = (left.height(), right.height());
        let left_heavy = left.0.clone().filter(|_| left_height > right_height + 1);
        let right_heavy = right.0.clone().filter(|_| right_height > left_height + 1);
        match (left_heavy, right_heavy) {
            (Some(node), _) => {
                let joined = Self::join(node.right.clone(), payload, right);
                node.payload.retain(node.left.clone(), joined).rebalance()
            }
            (_, Some(node)) => {
                let joined = Self::join(left, payload, node.left.clone());
                node.payload.retain(joined, node.right.clone()).rebalance()
            }
            _ => payload.retain(left, right),
        }
    }

    /// Remove the leftmost node, returning it along with the rebalanced remaining tree.
    pub fn pop_first(&self) -> Option<(Rc<Node<P>>, Tree<P>)> {
        let node = self.0.as_ref()?;
        match node.left.pop_first() {
            None => Some((Rc::clone(node), node.right.clone())),
            Some((first, rest)) => Some((
                first,
                node.payload.retain(rest, node.right.clone()).rebalance(),
            )),
        }
    }

    /// Merge two subtrees after the node between them got deleted. The successor of the deleted
    /// node (the leftmost node of `right`) becomes the new root of the merge.
    pub fn pluck(left: &Tree<P>, right: &Tree<P>) -> Self {
        if left.is_empty() {
            return right.clone();
        }
        if right.is_empty() {
            return left.clone();
        }
        match right.pop_first() {
            Some((successor, rest)) => Self::join(left.clone(), &successor.payload, rest),
            None => left.clone(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// In-order iterator over the payloads of a [`Tree`].
pub struct Iter<'a, P> {
    stack: Vec<&'a Node<P>>,
}

impl<'a, P> Iter<'a, P> {
    fn new(tree: &'a Tree<P>) -> Self {
        let mut iter = Self { stack: Vec::new() };
        iter.push_left_spine(tree);
        iter
    }

    fn push_left_spine(&mut self, mut tree: &'a Tree<P>) {
        while let Some(node) = tree.get() {
            self.stack.push(node);
            tree = &node.left;
        }
    }
}

impl<'a, P> Iterator for Iter<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(&node.right);
        Some(&node.payload)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    // Minimal payload which counts the nodes below it.
    #[derive(Clone, Debug)]
    struct Counted {
        value: u32,
        count: usize,
    }

    fn count(tree: &Tree<Counted>) -> usize {
        tree.get().map_or(0, |node| node.payload().count)
    }

    impl Retain for Counted {
        fn retain(&self, left: Tree<Self>, right: Tree<Self>) -> Tree<Self> {
            let count = 1 + count(&left) + count(&right);
            let value = self.value;
            Tree::node(Counted { value, count }, left, right)
        }
    }

    fn leaf(value: u32) -> Counted {
        Counted { value, count: 1 }
    }

    fn values(tree: &Tree<Counted>) -> Vec<u32> {
        tree.iter().map(|payload| payload.value).collect()
    }

    #[test]
    fn empty() {
        let tree = Tree::<Counted>::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.balance(), 0);
        assert!(tree.is_balanced());
        assert!(tree.pop_first().is_none());
    }

    #[test]
    fn rotations() {
        // left leaning chain: 1 <- 2 <- 3
        let chain = leaf(3).retain(
            leaf(2).retain(leaf(1).retain(Tree::empty(), Tree::empty()), Tree::empty()),
            Tree::empty(),
        );
        assert_eq!(chain.balance(), 2);
        let rotated = chain.rebalance();
        assert!(rotated.is_balanced());
        assert_eq!(rotated.height(), 2);
        assert_eq!(values(&rotated), vec![1, 2, 3]);
        assert_eq!(count(&rotated), 3);

        // left-right case needs a double rotation
        let zigzag = leaf(3).retain(
            leaf(1).retain(Tree::empty(), leaf(2).retain(Tree::empty(), Tree::empty())),
            Tree::empty(),
        );
        let rotated = zigzag.rebalance();
        assert!(rotated.is_balanced());
        assert_eq!(rotated.get().map(|n| n.payload().value), Some(2));
        assert_eq!(values(&rotated), vec![1, 2, 3]);

        // rotations are inverse to each other
        let tree = Tree::from_payloads((0..7).map(leaf));
        assert_eq!(values(&tree.left_rotate().right_rotate()), values(&tree));
    }

    #[test]
    fn from_payloads() {
        let tree = Tree::from_payloads((0..100).map(leaf));
        assert!(tree.is_balanced());
        assert_eq!(count(&tree), 100);
        assert_eq!(values(&tree), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn join_and_pluck() {
        let small = Tree::from_payloads((0..3).map(leaf));
        let large = Tree::from_payloads((4..200).map(leaf));
        let joined = Tree::join(small.clone(), &leaf(3), large.clone());
        assert!(joined.is_balanced());
        assert_eq!(values(&joined), (0..200).collect::<Vec<_>>());

        let plucked = Tree::pluck(&small, &large);
        assert!(plucked.is_balanced());
        assert_eq!(
            values(&plucked),
            (0..3).chain(4..200).collect::<Vec<_>>()
        );
        assert_eq!(count(&plucked), 199);

        // plucking with the empty sentinel returns the other side unchanged
        assert_eq!(values(&Tree::pluck(&Tree::empty(), &small)), vec![0, 1, 2]);
        assert_eq!(values(&Tree::pluck(&small, &Tree::empty())), vec![0, 1, 2]);
    }

    #[test]
    fn pop_first() {
        let tree = Tree::from_payloads((0..20).map(leaf));
        let (first, rest) = tree.pop_first().expect("non empty tree");
        assert_eq!(first.payload().value, 0);
        assert!(rest.is_balanced());
        assert_eq!(values(&rest), (1..20).collect::<Vec<_>>());
        // original tree is untouched
        assert_eq!(values(&tree), (0..20).collect::<Vec<_>>());
    }
}
