//! Cost driven local search over measure tree rewrites.
//!
//! The search walks the rewrite neighbourhood from [`expansions`] and only ever accepts strict
//! improvements. All costs are positive, so every walk terminates.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{rewrite::expansions, Label, NodeId, Tree, ARITIES};
use crate::time::fraction_to_f64;

// -------------------------------------------------------------------------------------------------

/// Minimum cost decrease a rewrite must achieve to count as an improvement.
const EPSILON: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------

/// Per-label and per-arity node costs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostTable {
    pub note: f64,
    pub rest: f64,
    pub slur: f64,
    pub chain: f64,
    /// Costs for the arities 2, 3, 5, 7 and 11.
    pub arities: [f64; 5],
    /// When set, leaf costs are scaled by the leaf's subdivision duration, which makes
    /// subdividing long leaves pay off.
    pub per_duration: bool,
}

/// Prefers flat trees with few nodes.
pub const COLLAPSE: CostTable = CostTable {
    note: 1.0,
    rest: 1.0,
    slur: 1.0,
    chain: 1.0,
    arities: [1.0, 1.5, 3.0, 4.0, 6.0],
    per_duration: false,
};

/// Prefers using the available subdivision granularity.
pub const EXPAND: CostTable = CostTable {
    note: 1.0,
    rest: 0.5,
    slur: 0.25,
    chain: 2.0,
    arities: [0.1, 0.15, 0.3, 0.4, 0.6],
    per_duration: true,
};

impl CostTable {
    pub fn label_cost(&self, label: Label) -> f64 {
        match label {
            Label::Note => self.note,
            Label::Rest => self.rest,
            Label::Slur => self.slur,
            Label::Chain => self.chain,
        }
    }

    /// Cost of an internal node with the given arity. Invalid arities are never worth it.
    pub fn arity_cost(&self, arity: usize) -> f64 {
        ARITIES
            .iter()
            .position(|valid| *valid == arity)
            .map_or(f64::INFINITY, |index| self.arities[index])
    }
}

impl Default for CostTable {
    fn default() -> Self {
        COLLAPSE
    }
}

// -------------------------------------------------------------------------------------------------

/// Cost of a single node.
pub fn penalty(tree: &Tree, id: NodeId, table: &CostTable) -> f64 {
    if tree.is_leaf(id) {
        let cost = tree.label(id).map_or(f64::INFINITY, |l| table.label_cost(l));
        if table.per_duration {
            cost * fraction_to_f64(tree.sdur(id))
        } else {
            cost
        }
    } else {
        table.arity_cost(tree.arity(id))
    }
}

/// Total cost of a tree: the sum of all node penalties.
pub fn score(tree: &Tree, table: &CostTable) -> f64 {
    tree.nodes()
        .into_iter()
        .map(|id| penalty(tree, id, table))
        .sum()
}

fn improvements(tree: &Tree, table: &CostTable) -> Vec<(f64, Tree)> {
    let current = score(tree, table);
    expansions(tree)
        .into_iter()
        .filter_map(|candidate| {
            let gain = current - score(&candidate, table);
            (gain > EPSILON).then_some((gain, candidate))
        })
        .collect()
}

/// Pick one of the strictly improving neighbours at random, weighted by their improvement.
/// Returns `None` when the tree is a local minimum.
pub fn random_step<R: Rng>(tree: &Tree, table: &CostTable, rng: &mut R) -> Option<Tree> {
    let mut candidates = improvements(tree, table);
    let total = candidates.iter().map(|(gain, _)| gain).sum::<f64>();
    if candidates.is_empty() {
        return None;
    }
    let mut pick = rng.random::<f64>() * total;
    let index = candidates
        .iter()
        .position(|(gain, _)| {
            pick -= gain;
            pick <= 0.0
        })
        .unwrap_or(candidates.len() - 1);
    Some(candidates.swap_remove(index).1)
}

/// Steepest descent: repeatedly apply the best improving rewrite. Ties go to the first candidate
/// in generation order, so the walk is deterministic.
pub fn walk_down(tree: &Tree, table: &CostTable) -> Tree {
    let mut tree = tree.clone();
    let mut steps = 0;
    loop {
        let best = improvements(&tree, table)
            .into_iter()
            .fold(None, |best: Option<(f64, Tree)>, (gain, candidate)| match best {
                Some((best_gain, _)) if best_gain >= gain => best,
                _ => Some((gain, candidate)),
            });
        match best {
            Some((_, candidate)) => {
                tree = candidate;
                steps += 1;
            }
            None => break,
        }
    }
    log::trace!("walked down to '{}' in {} steps", tree, steps);
    tree
}

/// Randomized simplification with the [`COLLAPSE`] costs until no improving rewrite is left.
/// The result is a local minimum, so simplifying it again returns it unchanged.
pub fn simplify_with_rng<R: Rng>(tree: &Tree, rng: &mut R) -> Tree {
    let mut tree = tree.clone();
    while let Some(next) = random_step(&tree, &COLLAPSE, rng) {
        tree = next;
    }
    tree
}

/// Randomized simplification, seeded with the given seed or randomly when `None`.
pub fn simplify(tree: &Tree, seed: Option<u64>) -> Tree {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    simplify_with_rng(tree, &mut rng)
}

/// Deterministic canonical form: steepest descent with the [`COLLAPSE`] costs.
pub fn normalize(tree: &Tree) -> Tree {
    walk_down(tree, &COLLAPSE)
}

/// Spread the tree over finer subdivisions with the [`EXPAND`] costs, then normalize it.
pub fn bump(tree: &Tree) -> Tree {
    normalize(&walk_down(tree, &EXPAND))
}

// -------------------------------------------------------------------------------------------------
