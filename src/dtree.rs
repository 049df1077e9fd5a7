//! Weighted derivation trees, the flat output form of measure trees and quantization results.

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use num_integer::Integer;
use num_traits::{One, Zero};

use crate::{
    measure::{Label, NodeId, Tree},
    quantize::grammar::{parse_template, Symbol},
    time::{Event, Fraction},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// A tree whose children split their parent's duration proportionally to their weights.
///
/// Weight 0 leaves are grace notes: they take no time. A node's [`span`](Self::span) is the
/// sum of its children's weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DTree<L = Label> {
    pub weight: u32,
    pub label: Option<L>,
    pub children: Vec<DTree<L>>,
}

impl<L> DTree<L> {
    pub fn leaf(weight: u32, label: L) -> Self {
        Self {
            weight,
            label: Some(label),
            children: Vec::new(),
        }
    }

    pub fn branch(weight: u32, children: Vec<Self>) -> Self {
        Self {
            weight,
            label: None,
            children,
        }
    }

    #[must_use]
    pub fn with_weight(self, weight: u32) -> Self {
        Self { weight, ..self }
    }

    /// Sum of the children's weights.
    pub fn span(&self) -> u32 {
        self.children.iter().map(|child| child.weight).sum()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// All leaves, left to right.
    pub fn leaves(&self) -> Vec<&Self> {
        if self.is_leaf() {
            vec![self]
        } else {
            self.children.iter().flat_map(DTree::leaves).collect()
        }
    }

    /// Convert all labels, keeping weights and structure.
    pub fn map<M, F>(&self, f: &F) -> DTree<M>
    where
        F: Fn(&L) -> M,
    {
        DTree {
            weight: self.weight,
            label: self.label.as_ref().map(f),
            children: self.children.iter().map(|child| child.map(f)).collect(),
        }
    }

    /// Convert all labels with a fallible function.
    pub fn try_map<M, E, F>(&self, f: &F) -> Result<DTree<M>, E>
    where
        F: Fn(&L) -> Result<M, E>,
    {
        Ok(DTree {
            weight: self.weight,
            label: self.label.as_ref().map(f).transpose()?,
            children: self
                .children
                .iter()
                .map(|child| child.try_map(f))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Leaves with their absolute durations, when this tree lasts `duration`.
    pub fn timed_leaves(&self, duration: Fraction) -> Vec<(Fraction, &Self)> {
        let mut leaves = Vec::new();
        self.collect_timed_leaves(duration, &mut leaves);
        leaves
    }

    fn collect_timed_leaves<'a>(
        &'a self,
        duration: Fraction,
        leaves: &mut Vec<(Fraction, &'a Self)>,
    ) {
        if self.is_leaf() {
            leaves.push((duration, self));
            return;
        }
        let span = self.span();
        for child in &self.children {
            let length = if span == 0 {
                Fraction::zero()
            } else {
                duration * Fraction::new(child.weight as i64, span as i64)
            };
            child.collect_timed_leaves(length, leaves);
        }
    }
}

impl DTree<Label> {
    /// Flatten into `(duration, label)` entries with the same rules as measure trees: slurs
    /// extend the previous entry, consecutive rests coalesce. Grace notes are skipped.
    pub fn sequence(&self, duration: Fraction) -> Vec<(Fraction, Label)> {
        let mut sequence: Vec<(Fraction, Label)> = Vec::new();
        for (length, leaf) in self.timed_leaves(duration) {
            if length.is_zero() {
                continue;
            }
            match leaf.label {
                Some(Label::Note) => sequence.push((length, Label::Note)),
                Some(Label::Rest) => match sequence.last_mut() {
                    Some((last, Label::Rest)) => *last += length,
                    _ => sequence.push((length, Label::Rest)),
                },
                Some(Label::Slur) => match sequence.last_mut() {
                    Some((last, _)) => *last += length,
                    None => sequence.push((length, Label::Rest)),
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

    /// Drop all weight 0 leaves. Branches which are left with a single child collapse into
    /// that child, which takes over the branch's weight.
    #[must_use]
    pub fn remove_grace_notes(&self) -> Self {
        if self.is_leaf() {
            return self.clone();
        }
        let mut children = self
            .children
            .iter()
            .filter(|child| !(child.is_leaf() && child.weight == 0))
            .map(DTree::remove_grace_notes)
            .collect::<Vec<_>>();
        if children.len() == 1 && self.label.is_none() {
            let child = children.remove(0);
            return child.with_weight(self.weight);
        }
        Self {
            weight: self.weight,
            label: self.label,
            children,
        }
    }

    /// Fold branches which only consist of slurs into a single slur leaf.
    #[must_use]
    pub fn reconnect_slurs(&self) -> Self {
        if self.is_leaf() {
            return self.clone();
        }
        let children = self
            .children
            .iter()
            .map(DTree::reconnect_slurs)
            .collect::<Vec<_>>();
        let all_slurs = children
            .iter()
            .all(|child| child.is_leaf() && child.label == Some(Label::Slur));
        if all_slurs && self.label.is_none() {
            return Self::leaf(self.weight, Label::Slur);
        }
        Self {
            weight: self.weight,
            label: self.label,
            children,
        }
    }
}

// -------------------------------------------------------------------------------------------------

impl<L: Display> Display for DTree<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.weight != 1 {
            write!(f, "{}", self.weight)?;
        }
        if let Some(label) = &self.label {
            write!(f, "{}", label)?;
        }
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (index, child) in self.children.iter().enumerate() {
                if index > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl FromStr for DTree<Label> {
    type Err = Error;

    /// Parse the pretty-printed form, e.g. `"(2n n 0r (n s))"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_template(s)?.try_map(&|symbol: &Symbol| match symbol {
            Symbol::Terminal(label) => Ok(*label),
            Symbol::Nonterminal(name) => Err(Error::grammar(
                1,
                format!("unexpected nonterminal '{}' in tree", name),
            )),
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// Emitted time and shape of a measure subtree, before weights are made integral.
struct Timed {
    time: Fraction,
    label: Option<Label>,
    children: Vec<Timed>,
}

fn timed(tree: &Tree, id: NodeId, durations: &HashMap<NodeId, Fraction>) -> Option<Timed> {
    if tree.is_leaf(id) {
        return match tree.label(id) {
            Some(Label::Chain) | None => None,
            label => Some(Timed {
                time: durations[&id],
                label,
                children: Vec::new(),
            }),
        };
    }
    let children = tree
        .children(id)
        .iter()
        .filter_map(|child| timed(tree, *child, durations))
        .collect::<Vec<_>>();
    if children.is_empty() {
        return None;
    }
    let time = children
        .iter()
        .fold(Fraction::zero(), |sum, child| sum + child.time);
    Some(Timed {
        time,
        label: None,
        children,
    })
}

fn weighted(mut timed: Timed, weight: u32) -> DTree<Label> {
    if timed.children.len() == 1 {
        if let Some(child) = timed.children.pop() {
            return weighted(child, weight);
        }
    }
    // smallest integral weights with the same proportions as the children's times
    let denom = timed
        .children
        .iter()
        .fold(1i64, |lcm, child| lcm.lcm(child.time.denom()));
    let numers = timed
        .children
        .iter()
        .map(|child| (child.time * Fraction::from(denom)).to_integer())
        .collect::<Vec<_>>();
    let gcd = numers.iter().fold(0i64, |gcd, numer| gcd.gcd(numer)).max(1);
    DTree {
        weight,
        label: timed.label,
        children: timed
            .children
            .into_iter()
            .zip(numers)
            .map(|(child, numer)| weighted(child, (numer / gcd) as u32))
            .collect(),
    }
}

impl From<&Tree> for DTree<Label> {
    /// Flatten a measure tree: chain leaves disappear and every node is weighted by the time it
    /// actually emits, so chained durations end up in the weights.
    fn from(tree: &Tree) -> Self {
        let durations = tree.durations(Fraction::one());
        match timed(tree, tree.root(), &durations) {
            Some(timed) => weighted(timed, 1),
            None => DTree::leaf(1, Label::Rest),
        }
    }
}

// -------------------------------------------------------------------------------------------------
