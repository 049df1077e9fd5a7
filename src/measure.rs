//! Measure trees: nested prime subdivisions of a duration with note, rest, slur and chain leaves.
//!
//! A measure tree is stored as an arena of nodes with parent back-references, so editors can
//! mutate labels and children in place and navigation can walk upwards to find cousins.
//! Mutations don't validate the tree: callers must check [`Tree::is_valid`] before trusting an
//! edited or rewritten tree.

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};

use derive_more::{Display, From, Into};
use num_traits::{One, Zero};

use crate::time::{Event, Fraction};

pub mod rewrite;
pub mod simplify;

// -------------------------------------------------------------------------------------------------

/// Valid child counts of internal nodes.
pub const ARITIES: [usize; 5] = [2, 3, 5, 7, 11];

/// Returns true if the given child count is a valid subdivision.
pub fn is_valid_arity(arity: usize) -> bool {
    ARITIES.contains(&arity)
}

// -------------------------------------------------------------------------------------------------

/// Leaf label of a measure tree or dtree.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Starts a new note.
    #[display("n")]
    Note,
    /// Starts a rest.
    #[display("r")]
    Rest,
    /// Extends the previous note or rest (a tie).
    #[display("s")]
    Slur,
    /// Placeholder which hands its duration to the next cousin.
    #[display("o")]
    Chain,
}

impl Label {
    pub fn to_char(self) -> char {
        match self {
            Label::Note => 'n',
            Label::Rest => 'r',
            Label::Slur => 's',
            Label::Chain => 'o',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' => Some(Label::Note),
            'r' => Some(Label::Rest),
            's' => Some(Label::Slur),
            'o' => Some(Label::Chain),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Index of a node within a [`Tree`]'s arena.
#[derive(Copy, Clone, Debug, Display, From, Into, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
struct Node {
    label: Option<Label>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

// -------------------------------------------------------------------------------------------------

/// A measure tree.
///
/// Internal nodes carry no label and split their duration into `arity` equal parts. Leaves carry
/// one of the [`Label`]s. The canonical string form writes internal nodes as their arity code
/// (`2`, `3`, `5`, `7` or `b` for 11) followed by their children, and leaves as their label char:
/// e.g. `"2n3nrn"` is a note on the first half and a triplet on the second half.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Create a tree which consists of a single leaf.
    pub fn leaf(label: Label) -> Self {
        let root = Node {
            label: Some(label),
            children: Vec::new(),
            parent: None,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Parse a tree from its canonical string form without validating it.
    pub fn parse(string: &str) -> Option<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let mut chars = string.chars();
        let root = tree.parse_node(&mut chars)?;
        if chars.next().is_some() {
            return None;
        }
        tree.root = root;
        Some(tree)
    }

    fn parse_node(&mut self, chars: &mut std::str::Chars) -> Option<NodeId> {
        let c = chars.next()?;
        if let Some(label) = Label::from_char(c) {
            return Some(self.add_node(Some(label)));
        }
        let arity = match c {
            '2' | '3' | '5' | '7' | 'b' => c.to_digit(36)? as usize,
            _ => return None,
        };
        let mut children = Vec::with_capacity(arity);
        for _ in 0..arity {
            children.push(self.parse_node(chars)?);
        }
        let node = self.add_node(None);
        self.set_children(node, children);
        Some(node)
    }

    /// Parse a tree from its canonical string form. Returns `None` for malformed strings and for
    /// trees which are not [valid](Self::is_valid).
    pub fn from_string(string: &str) -> Option<Self> {
        Self::parse(string).filter(Tree::is_valid)
    }

    // ---------------------------------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn label(&self, id: NodeId) -> Option<Label> {
        self.node(id).label
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).children.is_empty()
    }

    /// Number of children: the number of equal parts the node splits its duration into.
    pub fn arity(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    /// Distance to the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut node = id;
        while let Some(parent) = self.parent(node) {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// Position of the node within its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Subdivision duration: `1 / product of all ancestor arities`.
    pub fn sdur(&self, id: NodeId) -> Fraction {
        let mut sdur = Fraction::one();
        let mut node = id;
        while let Some(parent) = self.parent(node) {
            sdur /= Fraction::from(self.arity(parent) as i64);
            node = parent;
        }
        sdur
    }

    /// All nodes reachable from the root in pre-order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// The given node and all its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        result
    }

    /// All leaves below the root, left to right.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|id| self.is_leaf(*id))
            .collect()
    }

    // ---------------------------------------------------------------------------------------------

    /// Add a detached node to the arena.
    pub fn add_node(&mut self, label: Option<Label>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            label,
            children: Vec::new(),
            parent: None,
        });
        id
    }

    /// Set or clear the label of a node.
    pub fn set_label(&mut self, id: NodeId, label: Option<Label>) {
        self.node_mut(id).label = label;
    }

    /// Replace the children of a node, re-parenting the new children.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for child in &children {
            self.node_mut(*child).parent = Some(id);
        }
        self.node_mut(id).children = children;
    }

    /// Turn the node into a leaf with the given label.
    pub fn set_leaf(&mut self, id: NodeId, label: Label) {
        self.set_children(id, Vec::new());
        self.set_label(id, Some(label));
    }

    /// Copy all nodes of another tree into this arena as a detached subtree.
    pub fn graft(&mut self, other: &Tree) -> NodeId {
        self.graft_node(other, other.root)
    }

    fn graft_node(&mut self, other: &Tree, id: NodeId) -> NodeId {
        let children = other
            .children(id)
            .iter()
            .map(|child| self.graft_node(other, *child))
            .collect::<Vec<_>>();
        let node = self.add_node(other.label(id));
        self.set_children(node, children);
        node
    }

    /// Replace the content of the given node with a copy of another tree. The node keeps its
    /// position in its parent.
    pub fn replace(&mut self, id: NodeId, other: &Tree) {
        let grafted = self.graft(other);
        let label = self.label(grafted);
        let children = self.children(grafted).to_vec();
        self.set_label(id, label);
        self.set_children(id, children);
    }

    /// A copy of the subtree at the given node as a new tree.
    pub fn subtree(&self, id: NodeId) -> Tree {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.graft_node(self, id);
        tree
    }

    /// A copy of this tree without unreachable arena nodes.
    #[must_use]
    pub fn compact(&self) -> Tree {
        self.subtree(self.root)
    }

    // ---------------------------------------------------------------------------------------------

    /// Next node on the same depth: the next sibling, or else the first child of the parent's
    /// next cousin.
    pub fn next_cousin(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|child| *child == id)?;
        if let Some(sibling) = siblings.get(index + 1) {
            return Some(*sibling);
        }
        let uncle = self.next_cousin(parent)?;
        self.children(uncle).first().copied()
    }

    /// Previous node on the same depth: the previous sibling, or else the last child of the
    /// parent's previous cousin.
    pub fn prev_cousin(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|child| *child == id)?;
        if index > 0 {
            return Some(siblings[index - 1]);
        }
        let uncle = self.prev_cousin(parent)?;
        self.children(uncle).last().copied()
    }

    fn is_chain(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.is_leaf(id) && self.label(id) == Some(Label::Chain))
    }

    /// Returns true if changing this node's arity would break a chain: either a chain from a
    /// preceding cousin ends in the node's leftmost descent, or the node's rightmost descent ends
    /// in a chain leaf.
    pub fn shear(&self, id: NodeId) -> bool {
        let mut node = id;
        while let Some(first) = self.children(node).first().copied() {
            if self.is_chain(self.prev_cousin(first)) {
                return true;
            }
            node = first;
        }
        let mut node = id;
        while let Some(last) = self.children(node).last().copied() {
            node = last;
        }
        node != id && self.is_chain(Some(node))
    }

    /// Checks the structural invariants of the tree:
    /// - the first leaf is not a slur,
    /// - leaves are labeled and internal nodes are not,
    /// - internal nodes have a prime arity from [`ARITIES`],
    /// - every chain leaf has a next cousin with the same subdivision duration.
    pub fn is_valid(&self) -> bool {
        let nodes = self.nodes();
        let first_leaf = nodes.iter().find(|id| self.is_leaf(**id));
        if first_leaf.is_some_and(|id| self.label(*id) == Some(Label::Slur)) {
            return false;
        }
        nodes.iter().all(|id| {
            if self.is_leaf(*id) {
                match self.label(*id) {
                    None => false,
                    Some(Label::Chain) => self
                        .next_cousin(*id)
                        .is_some_and(|cousin| self.sdur(cousin) == self.sdur(*id)),
                    Some(_) => true,
                }
            } else {
                self.label(*id).is_none() && is_valid_arity(self.arity(*id))
            }
        })
    }

    // ---------------------------------------------------------------------------------------------

    /// Absolute durations of all reachable nodes, when the root lasts `total`.
    ///
    /// A node lasts its parent's duration divided by the parent's arity, plus the duration of an
    /// immediately preceding chain cousin.
    pub fn durations(&self, total: Fraction) -> HashMap<NodeId, Fraction> {
        let mut durations = HashMap::new();
        durations.insert(self.root, total);
        // breadth first, so previous cousins are always resolved first
        let mut level = vec![self.root];
        while !level.is_empty() {
            let mut next_level = Vec::new();
            for parent in &level {
                let parent_duration = durations[parent];
                let arity = Fraction::from(self.arity(*parent).max(1) as i64);
                for child in self.children(*parent) {
                    let mut duration = parent_duration / arity;
                    if let Some(cousin) = self.prev_cousin(*child) {
                        if self.is_chain(Some(cousin)) {
                            duration += durations.get(&cousin).copied().unwrap_or_default();
                        }
                    }
                    durations.insert(*child, duration);
                    next_level.push(*child);
                }
            }
            level = next_level;
        }
        durations
    }

    /// Flatten the tree into `(duration, label)` entries. Slurs extend the previous entry,
    /// consecutive rests coalesce and chain leaves are never emitted.
    pub fn sequence(&self, duration: Fraction) -> Vec<(Fraction, Label)> {
        let durations = self.durations(duration);
        let mut sequence: Vec<(Fraction, Label)> = Vec::new();
        for leaf in self.leaves() {
            let duration = durations[&leaf];
            match self.label(leaf) {
                Some(Label::Note) => sequence.push((duration, Label::Note)),
                Some(Label::Rest) => match sequence.last_mut() {
                    Some((last, Label::Rest)) => *last += duration,
                    _ => sequence.push((duration, Label::Rest)),
                },
                // a leading slur has nothing to extend and becomes a rest
                Some(Label::Slur) => match sequence.last_mut() {
                    Some((last, _)) => *last += duration,
                    None => sequence.push((duration, Label::Rest)),
                },
                Some(Label::Chain) | None => (),
            }
        }
        sequence
    }

    /// Note events as `(onset, length)`, with the tree spanning `duration` from `start` on.
    pub fn to_events(&self, start: Fraction, duration: Fraction) -> Vec<Event> {
        let mut onset = start;
        let mut events = Vec::new();
        for (length, label) in self.sequence(duration) {
            if label == Label::Note {
                events.push((onset, length));
            }
            onset += length;
        }
        events
    }

    /// Total duration covered by emitted entries of [`Self::sequence`]. Equals `duration` for
    /// valid trees.
    pub fn emitted_duration(&self, duration: Fraction) -> Fraction {
        self.sequence(duration)
            .iter()
            .fold(Fraction::zero(), |sum, (length, _)| sum + length)
    }

    fn write_node(&self, f: &mut Formatter<'_>, id: NodeId) -> std::fmt::Result {
        let node = self.node(id);
        if node.children.is_empty() {
            let c = node.label.map_or('?', Label::to_char);
            write!(f, "{}", c)
        } else {
            let arity = node.children.len() as u32;
            write!(f, "{}", char::from_digit(arity, 36).unwrap_or('?'))?;
            for child in &node.children {
                self.write_node(f, *child)?;
            }
            Ok(())
        }
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_node(f, self.root)
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        fn equal(a: &Tree, a_id: NodeId, b: &Tree, b_id: NodeId) -> bool {
            a.label(a_id) == b.label(b_id)
                && a.arity(a_id) == b.arity(b_id)
                && a.children(a_id)
                    .iter()
                    .zip(b.children(b_id))
                    .all(|(a_child, b_child)| equal(a, *a_child, b, *b_child))
        }
        equal(self, self.root, other, other.root)
    }
}

impl Eq for Tree {}

// -------------------------------------------------------------------------------------------------
