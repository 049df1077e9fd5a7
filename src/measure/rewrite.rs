//! One-step, rhythm preserving rewrites of measure trees.

use std::collections::HashSet;

use super::{Label, NodeId, Tree, ARITIES};

// -------------------------------------------------------------------------------------------------

/// All valid trees which can be reached from the given tree with a single rewrite, in generation
/// order and without duplicates. Every rewrite keeps the tree's note events unchanged:
///
/// - leaf splits: `n` into `n s..s`, `r` into `r..r`, `s` into `s..s`,
/// - arity expansions: an arity `p` branch into a `q` way split of `q - 1` chains and the branch,
/// - rechaining: a branch preceded by a run of sibling chains is lifted into its parent,
/// - leaf patterns with the next cousin: `rs -> rr`, `or -> rr`, `os -> ss`, `on -> ns`,
/// - folds: `r..r -> r`, `s..s -> s` and `ns..s -> n`.
///
/// Branches whose arity change would break a chain (see [`Tree::shear`]) are not rewritten.
pub fn expansions(tree: &Tree) -> Vec<Tree> {
    let mut candidates = Vec::new();
    for id in tree.nodes() {
        if tree.is_leaf(id) {
            split_leaf(tree, id, &mut candidates);
            replace_leaf_pattern(tree, id, &mut candidates);
        } else if !tree.shear(id) {
            expand_arity(tree, id, &mut candidates);
            rechain(tree, id, &mut candidates);
            fold(tree, id, &mut candidates);
        }
    }
    let original = tree.to_string();
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(Tree::is_valid)
        .map(|candidate| candidate.compact())
        .filter(|candidate| {
            let string = candidate.to_string();
            string != original && seen.insert(string)
        })
        .collect()
}

// -------------------------------------------------------------------------------------------------

fn is_chain_leaf(tree: &Tree, id: NodeId) -> bool {
    tree.is_leaf(id) && tree.label(id) == Some(Label::Chain)
}

fn split_leaf(tree: &Tree, id: NodeId, candidates: &mut Vec<Tree>) {
    let label = match tree.label(id) {
        Some(Label::Chain) | None => return,
        Some(label) => label,
    };
    for arity in ARITIES {
        let mut candidate = tree.clone();
        let children = (0..arity)
            .map(|index| {
                let child_label = match (label, index) {
                    (Label::Note, 0) => Label::Note,
                    (Label::Note, _) => Label::Slur,
                    (other, _) => other,
                };
                candidate.add_node(Some(child_label))
            })
            .collect();
        candidate.set_label(id, None);
        candidate.set_children(id, children);
        candidates.push(candidate);
    }
}

fn replace_leaf_pattern(tree: &Tree, id: NodeId, candidates: &mut Vec<Tree>) {
    let Some(cousin) = tree.next_cousin(id) else {
        return;
    };
    if !tree.is_leaf(cousin) {
        return;
    }
    let (first, second) = match (tree.label(id), tree.label(cousin)) {
        (Some(Label::Rest), Some(Label::Slur)) => (Label::Rest, Label::Rest),
        (Some(Label::Chain), Some(Label::Rest)) => (Label::Rest, Label::Rest),
        (Some(Label::Chain), Some(Label::Slur)) => (Label::Slur, Label::Slur),
        (Some(Label::Chain), Some(Label::Note)) => (Label::Note, Label::Slur),
        _ => return,
    };
    let mut candidate = tree.clone();
    candidate.set_label(id, Some(first));
    candidate.set_label(cousin, Some(second));
    candidates.push(candidate);
}

fn expand_arity(tree: &Tree, id: NodeId, candidates: &mut Vec<Tree>) {
    let arity = tree.arity(id);
    for new_arity in ARITIES.into_iter().filter(|new_arity| *new_arity != arity) {
        let mut candidate = tree.clone();
        let inner = candidate.add_node(None);
        let children = candidate.children(id).to_vec();
        candidate.set_children(inner, children);
        let mut outer = (1..new_arity)
            .map(|_| candidate.add_node(Some(Label::Chain)))
            .collect::<Vec<_>>();
        outer.push(inner);
        candidate.set_children(id, outer);
        candidates.push(candidate);
    }
}

fn rechain(tree: &Tree, id: NodeId, candidates: &mut Vec<Tree>) {
    let (Some(parent), Some(index)) = (tree.parent(id), tree.index_in_parent(id)) else {
        return;
    };
    let arity = tree.arity(id);
    let siblings = tree.children(parent);
    let chains = siblings[..index]
        .iter()
        .rev()
        .take_while(|sibling| is_chain_leaf(tree, **sibling))
        .count();
    if chains == 0 || (chains + 1) % arity != 0 {
        return;
    }
    // the whole run must be lifted, including chains flowing into it from a previous cousin
    let first = siblings[index - chains];
    if index == chains
        && tree
            .prev_cousin(first)
            .is_some_and(|cousin| is_chain_leaf(tree, cousin))
    {
        return;
    }
    let slots = (chains + 1) / arity;
    let mut candidate = tree.clone();
    let mut children = siblings[..index - chains].to_vec();
    for child in tree.children(id) {
        for _ in 1..slots {
            children.push(candidate.add_node(Some(Label::Chain)));
        }
        children.push(*child);
    }
    children.extend_from_slice(&siblings[index + 1..]);
    candidate.set_children(parent, children);
    candidates.push(candidate);
}

fn fold(tree: &Tree, id: NodeId, candidates: &mut Vec<Tree>) {
    let children = tree.children(id);
    if !children.iter().all(|child| tree.is_leaf(*child)) {
        return;
    }
    let labels = children
        .iter()
        .map(|child| tree.label(*child))
        .collect::<Vec<_>>();
    let all = |label: Label, labels: &[Option<Label>]| labels.iter().all(|l| *l == Some(label));
    let folded = if all(Label::Rest, &labels) {
        Label::Rest
    } else if all(Label::Slur, &labels) {
        Label::Slur
    } else if labels[0] == Some(Label::Note) && all(Label::Slur, &labels[1..]) {
        Label::Note
    } else {
        return;
    };
    let mut candidate = tree.clone();
    candidate.set_leaf(id, folded);
    candidates.push(candidate);
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use num_traits::{One, Zero};

    use crate::time::Fraction;

    fn tree(string: &str) -> Tree {
        Tree::from_string(string).unwrap_or_else(|| panic!("invalid tree '{}'", string))
    }

    fn expanded(string: &str) -> Vec<String> {
        expansions(&tree(string))
            .iter()
            .map(Tree::to_string)
            .collect()
    }

    /// All trees reachable within the given number of rewrite steps.
    fn closure(seed: &str, depth: usize) -> Vec<Tree> {
        let mut seen = HashSet::from([seed.to_string()]);
        let mut all = vec![tree(seed)];
        let mut frontier = all.clone();
        for _ in 0..depth {
            let mut next = Vec::new();
            for candidate in &frontier {
                for expansion in expansions(candidate) {
                    if seen.insert(expansion.to_string()) {
                        next.push(expansion);
                    }
                }
            }
            all.extend(next.iter().cloned());
            frontier = next;
        }
        all
    }

    #[test]
    fn leaf_splits() {
        let splits = expanded("n");
        for string in ["2ns", "3nss", "5nssss", "7nssssss", "bnssssssssss"] {
            assert!(splits.contains(&string.to_string()), "missing {}", string);
        }
        assert!(expanded("r").contains(&"3rrr".to_string()));
        assert!(expanded("2ns").contains(&"22nss".to_string()));
    }

    #[test]
    fn folds() {
        assert!(expanded("2ns").contains(&"n".to_string()));
        assert!(expanded("3rrr").contains(&"r".to_string()));
        assert!(expanded("2n3sss").contains(&"2ns".to_string()));
        assert!(!expanded("2nn").contains(&"n".to_string()));
    }

    #[test]
    fn arity_expansions() {
        let wrapped = expanded("2nn");
        assert!(wrapped.contains(&"3oo2nn".to_string()));
        assert!(wrapped.contains(&"5oooo2nn".to_string()));
        assert!(!wrapped.contains(&"2o2nn".to_string()));
    }

    #[test]
    fn rechaining() {
        assert!(expanded("3oo3nnn").contains(&"3nnn".to_string()));
        assert!(expanded("5oooo5nnnnn").contains(&"5nnnnn".to_string()));
        // lifting a binary branch over three chains spreads each child over two slots
        assert!(expanded("5ooo2nnr").contains(&"5ononr".to_string()));
        // a partial run would move the first note
        assert!(!expanded("5ooo2nnr").contains(&"5oonnr".to_string()));
    }

    #[test]
    fn leaf_patterns() {
        assert!(expanded("2rs").contains(&"2rr".to_string()));
        assert!(expanded("3nor").contains(&"3nrr".to_string()));
        assert!(expanded("3nos").contains(&"3nss".to_string()));
        assert!(expanded("2on").contains(&"2ns".to_string()));
    }

    #[test]
    fn sheared_branches_stay() {
        // the inner branch receives a chain, so it must not be wrapped or folded
        let rewrites = expanded("22no2ns");
        assert!(!rewrites.iter().any(|string| string.starts_with("22no3oo")));
        assert!(!rewrites.contains(&"22non".to_string()));
    }

    #[test]
    fn closure_is_valid() {
        for seed in ["n", "3nnn", "2n2nn"] {
            for candidate in closure(seed, 3) {
                assert!(candidate.is_valid(), "invalid rewrite '{}'", candidate);
                assert_eq!(
                    Tree::from_string(&candidate.to_string()).as_ref(),
                    Some(&candidate),
                    "'{}' doesn't survive its string form",
                    candidate
                );
            }
        }
    }

    #[test]
    fn closure_keeps_rhythm() {
        for seed in ["n", "3nrn", "2n2nn", "22rn3nsn"] {
            let events = tree(seed).to_events(Fraction::zero(), Fraction::one());
            for candidate in closure(seed, 2) {
                assert_eq!(
                    candidate.to_events(Fraction::zero(), Fraction::one()),
                    events,
                    "'{}' changed the rhythm of '{}'",
                    candidate,
                    seed
                );
            }
        }
    }
}
