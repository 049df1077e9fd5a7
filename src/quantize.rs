//! Grammar driven quantization of performed onsets into weighted derivation trees.
//!
//! Quantization runs in three steps:
//! - **specialization** binds every reachable nonterminal to an [`Interval`] and a run of the
//!   sorted points, dividing each production's interval proportionally to its template weights.
//!   Terminal leaves are matched against their points: one point claims the leaf's onset, all
//!   other points become zero weight grace notes, and the normalized snapping distance is added
//!   to the production's weight.
//! - a lazy **k-best search** enumerates derivations of the specialized root in order of
//!   increasing cost.
//! - **realization** rebuilds a [`DTree`] from a derivation's ranks, removes grace notes,
//!   reconnects slurs and reports which input point each surviving leaf stands for.
//!
//! When a node splits into children, every point goes to the child whose onset it snaps to:
//! points in the right half of a child move on to the next one. A leaf claims the last point
//! which snaps to its onset, else the first point of its right half.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    ops::Range,
};

use crate::{dtree::DTree, measure::Label};

pub mod grammar;

pub use grammar::{default_grammar, Grammar, Production, Symbol};

// -------------------------------------------------------------------------------------------------

/// Default weight of snapping distances relative to production weights.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Intervals narrower than this share of the quantized interval are not derived any further,
/// which bounds the search for recursive grammars.
const MIN_WIDTH_RATIO: f64 = 1.0 / 65536.0;

// -------------------------------------------------------------------------------------------------

/// Half open time span `[start, stop)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub stop: f64,
}

impl Interval {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    pub fn width(&self) -> f64 {
        self.stop - self.start
    }

    pub fn contains(&self, point: f64) -> bool {
        point >= self.start && point < self.stop
    }

    /// 0 if the point is closer to the start (ties included), else 1.
    pub fn index(&self, point: f64) -> usize {
        if (point - self.start).abs() <= (self.stop - point).abs() {
            0
        } else {
            1
        }
    }

    /// The interval boundary nearest to the point.
    pub fn snap(&self, point: f64) -> f64 {
        if self.index(point) == 0 {
            self.start
        } else {
            self.stop
        }
    }

    /// Index range of the sorted `points` which fall into this interval.
    pub fn select(&self, points: &[f64]) -> Range<usize> {
        let start = points.partition_point(|point| *point < self.start);
        let stop = points.partition_point(|point| *point < self.stop);
        start..stop.max(start)
    }

    /// Split into consecutive intervals with widths proportional to the given weights.
    pub fn split(&self, weights: &[u32]) -> Vec<Interval> {
        let total = weights.iter().sum::<u32>().max(1) as f64;
        let mut offset = 0;
        let mut start = self.start;
        weights
            .iter()
            .enumerate()
            .map(|(index, weight)| {
                offset += weight;
                let stop = if index + 1 == weights.len() {
                    self.stop
                } else {
                    self.start + self.width() * offset as f64 / total
                };
                let interval = Interval::new(start, stop);
                start = stop;
                interval
            })
            .collect()
    }

    /// Whole units covering all points, starting at 0 unless points lie before it.
    pub fn covering(points: &[f64]) -> Self {
        if points.is_empty() {
            return Self::new(0.0, 1.0);
        }
        let lowest = points.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self::new(lowest.floor().min(0.0), highest.floor() + 1.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// A named set of productions, optionally specialized to a segment of time.
///
/// Two nonterminals are equal when they have the same name and segment.
#[derive(Clone, Debug)]
pub struct Nonterminal {
    pub name: String,
    pub segment: Option<Interval>,
    pub prod: Vec<Production>,
}

impl Nonterminal {
    pub fn new(name: &str, prod: Vec<Production>) -> Self {
        Self {
            name: name.to_string(),
            segment: None,
            prod,
        }
    }

    #[must_use]
    pub fn with_segment(self, segment: Interval) -> Self {
        Self {
            segment: Some(segment),
            ..self
        }
    }
}

impl PartialEq for Nonterminal {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.segment == other.segment
    }
}

// -------------------------------------------------------------------------------------------------

/// A single quantization result.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantization {
    /// Production weights plus weighted snapping distances.
    pub cost: f64,
    /// The derived tree, without grace notes.
    pub tree: DTree<Label>,
    /// Input point index of every point claiming leaf, in leaf order.
    pub indices: Vec<usize>,
}

// -------------------------------------------------------------------------------------------------

type CellId = usize;

#[derive(Clone, Debug)]
enum Slot {
    /// A terminal leaf and the input point claiming its onset.
    Leaf { label: Label, point: Option<usize> },
    /// An unclaimed point.
    Grace(Label),
    /// Derivations of a specialized nonterminal.
    Cell(CellId),
}

/// A specialized production: its cost without child cells, its shape and its child cells in
/// leaf order.
#[derive(Clone, Debug)]
struct Derivation {
    cost: f64,
    tree: DTree<Slot>,
    cells: Vec<CellId>,
}

/// A derivation with a rank per child cell. Inexact candidates carry a lower bound.
#[derive(Clone, Debug)]
struct Candidate {
    cost: f64,
    derivation: usize,
    ranks: Vec<usize>,
    exact: bool,
}

#[derive(Debug)]
struct Cell {
    /// The nonterminal bound to the cell's segment, with all productions which matched.
    nonterminal: Nonterminal,
    derivations: Vec<Derivation>,
    candidates: VecDeque<Candidate>,
    solved: Vec<Candidate>,
    seen: HashSet<(usize, Vec<usize>)>,
}

impl Cell {
    fn new(nonterminal: Nonterminal, derivations: Vec<Derivation>) -> Self {
        let mut cell = Self {
            nonterminal,
            derivations,
            candidates: VecDeque::new(),
            solved: Vec::new(),
            seen: HashSet::new(),
        };
        for index in 0..cell.derivations.len() {
            let derivation = &cell.derivations[index];
            let ranks = vec![0; derivation.cells.len()];
            // child costs are never negative, so the production's own cost is a lower bound
            let candidate = Candidate {
                cost: derivation.cost,
                derivation: index,
                exact: ranks.is_empty(),
                ranks,
            };
            cell.seen.insert((index, candidate.ranks.clone()));
            cell.enqueue(candidate);
        }
        cell
    }

    /// Insert sorted by cost, after all candidates with the same cost.
    fn enqueue(&mut self, candidate: Candidate) {
        let index = self
            .candidates
            .partition_point(|other| other.cost <= candidate.cost);
        self.candidates.insert(index, candidate);
    }
}

type Matched = (f64, DTree<Slot>, Vec<CellId>);

/// Specialization cache and search state of a single quantization call.
struct Search<'a> {
    grammar: &'a Grammar,
    points: Vec<f64>,
    labels: Vec<Label>,
    order: Vec<usize>,
    alpha: f64,
    min_width: f64,
    cells: Vec<Cell>,
    memo: HashMap<(&'a str, u64, u64, usize, usize), Option<CellId>>,
}

impl<'a> Search<'a> {
    fn new(grammar: &'a Grammar, points: &[f64], notes: &[Label], alpha: f64, interval: Interval) -> Self {
        let mut order = (0..points.len()).collect::<Vec<_>>();
        order.sort_by(|a, b| points[*a].total_cmp(&points[*b]));
        let labels = order
            .iter()
            .map(|index| notes.get(*index).copied().unwrap_or(Label::Note))
            .collect();
        let points = order.iter().map(|index| points[*index]).collect();
        Self {
            grammar,
            points,
            labels,
            order,
            alpha,
            min_width: interval.width() * MIN_WIDTH_RATIO,
            cells: Vec::new(),
            memo: HashMap::new(),
        }
    }

    /// Cell of the given nonterminal, bound to an interval and a run of points. `None` when
    /// the nonterminal can't derive these points at all.
    fn specialize(&mut self, name: &'a str, interval: Interval, window: Range<usize>) -> Option<CellId> {
        let key = (
            name,
            interval.start.to_bits(),
            interval.stop.to_bits(),
            window.start,
            window.end,
        );
        if let Some(cell) = self.memo.get(&key) {
            return *cell;
        }
        self.memo.insert(key, None);
        let cell = self.build_cell(name, interval, window);
        self.memo.insert(key, cell);
        cell
    }

    fn build_cell(&mut self, name: &'a str, interval: Interval, window: Range<usize>) -> Option<CellId> {
        if interval.width() < self.min_width {
            return None;
        }
        let grammar = self.grammar;
        let nonterminal = grammar.nonterminal(name)?;
        let mut derivations = Vec::new();
        let mut matched = Vec::new();
        for production in &nonterminal.prod {
            if let Some((penalty, tree, cells)) =
                self.match_template(&production.template, interval, window.clone())
            {
                derivations.push(Derivation {
                    cost: production.weight + penalty,
                    tree,
                    cells,
                });
                matched.push(production.clone());
            }
        }
        if derivations.is_empty() {
            return None;
        }
        let specialized = Nonterminal::new(name, matched).with_segment(interval);
        log::trace!(
            "specialized '{}' on [{}, {}) with {} of {} productions",
            name,
            interval.start,
            interval.stop,
            specialized.prod.len(),
            nonterminal.prod.len()
        );
        self.cells.push(Cell::new(specialized, derivations));
        Some(self.cells.len() - 1)
    }

    /// Match the template against the points in the window, or `None` if it can't explain them.
    fn match_template(
        &mut self,
        template: &'a DTree<Symbol>,
        interval: Interval,
        window: Range<usize>,
    ) -> Option<Matched> {
        if template.is_leaf() {
            return match template.label.as_ref()? {
                Symbol::Terminal(label) => self.match_leaf(*label, template.weight, interval, window),
                Symbol::Nonterminal(name) => {
                    let cell = self.specialize(name, interval, window)?;
                    Some((0.0, DTree::leaf(template.weight, Slot::Cell(cell)), vec![cell]))
                }
            };
        }
        let weights = template
            .children
            .iter()
            .map(|child| child.weight)
            .collect::<Vec<_>>();
        let intervals = interval.split(&weights);
        let mut cost = 0.0;
        let mut trees = Vec::with_capacity(intervals.len());
        let mut cells = Vec::new();
        let mut start = window.start;
        for (index, (child, child_interval)) in template.children.iter().zip(&intervals).enumerate() {
            let end = if index + 1 < intervals.len() {
                // points in the right half snap to the next child's onset
                start
                    + self.points[start..window.end]
                        .partition_point(|point| child_interval.index(*point) == 0)
            } else {
                window.end
            };
            let (child_cost, tree, child_cells) = self.match_template(child, *child_interval, start..end)?;
            cost += child_cost;
            trees.push(tree);
            cells.extend(child_cells);
            start = end;
        }
        Some((cost, DTree::branch(template.weight, trees), cells))
    }

    /// Match a terminal leaf. Without points only slurs match. Else the last point which snaps to
    /// the onset claims the leaf, or the first one in the right half when no point does.
    fn match_leaf(
        &self,
        label: Label,
        weight: u32,
        interval: Interval,
        window: Range<usize>,
    ) -> Option<Matched> {
        if window.is_empty() {
            return (label == Label::Slur).then(|| {
                let leaf = Slot::Leaf { label, point: None };
                (0.0, DTree::leaf(weight, leaf), Vec::new())
            });
        }
        let onset = interval.start;
        let points = &self.points[window.clone()];
        let left = points.partition_point(|point| interval.index(*point) == 0);
        let claimed = window.start + left.saturating_sub(1);
        if self.labels[claimed] != label {
            return None;
        }
        let distance = points
            .iter()
            .map(|point| (point - onset).abs())
            .sum::<f64>();
        let penalty = self.alpha * distance / interval.width();
        let leaf = |index: usize| {
            if index == claimed {
                let point = Some(self.order[index]);
                DTree::leaf(1, Slot::Leaf { label, point })
            } else {
                DTree::leaf(0, Slot::Grace(self.labels[index]))
            }
        };
        let tree = if window.len() == 1 {
            leaf(claimed).with_weight(weight)
        } else {
            DTree::branch(weight, window.map(leaf).collect())
        };
        Some((penalty, tree, Vec::new()))
    }

    // ---------------------------------------------------------------------------------------------

    /// Cost of the given rank of a cell's derivations, or `None` when the cell is exhausted.
    fn best(&mut self, cell: CellId, rank: usize) -> Option<f64> {
        loop {
            if let Some(solved) = self.cells[cell].solved.get(rank) {
                return Some(solved.cost);
            }
            let candidate = self.cells[cell].candidates.pop_front()?;
            if !candidate.exact {
                if let Some(cost) = self.evaluate(cell, candidate.derivation, &candidate.ranks) {
                    self.cells[cell].enqueue(Candidate {
                        cost,
                        exact: true,
                        ..candidate
                    });
                }
                continue;
            }
            // successors advance a single child's rank
            for index in 0..candidate.ranks.len() {
                let mut ranks = candidate.ranks.clone();
                ranks[index] += 1;
                if self.cells[cell]
                    .seen
                    .insert((candidate.derivation, ranks.clone()))
                {
                    if let Some(cost) = self.evaluate(cell, candidate.derivation, &ranks) {
                        self.cells[cell].enqueue(Candidate {
                            cost,
                            derivation: candidate.derivation,
                            ranks,
                            exact: true,
                        });
                    }
                }
            }
            self.cells[cell].solved.push(candidate);
        }
    }

    fn evaluate(&mut self, cell: CellId, derivation: usize, ranks: &[usize]) -> Option<f64> {
        let (mut cost, children) = {
            let derivation = &self.cells[cell].derivations[derivation];
            (derivation.cost, derivation.cells.clone())
        };
        for (child, rank) in children.into_iter().zip(ranks) {
            cost += self.best(child, *rank)?;
        }
        Some(cost)
    }

    /// Build the tree of an already solved rank, collecting claimed point indices.
    fn realize(&self, cell: CellId, rank: usize, indices: &mut Vec<usize>) -> DTree<Label> {
        let cell = &self.cells[cell];
        let candidate = &cell.solved[rank];
        let derivation = &cell.derivations[candidate.derivation];
        self.realize_slots(&derivation.tree, &mut candidate.ranks.iter(), indices)
    }

    fn realize_slots(
        &self,
        tree: &DTree<Slot>,
        ranks: &mut std::slice::Iter<'_, usize>,
        indices: &mut Vec<usize>,
    ) -> DTree<Label> {
        match &tree.label {
            Some(Slot::Leaf { label, point }) => {
                indices.extend(point);
                DTree::leaf(tree.weight, *label)
            }
            Some(Slot::Grace(label)) => DTree::leaf(0, *label),
            Some(Slot::Cell(cell)) => {
                let rank = ranks.next().copied().unwrap_or(0);
                self.realize(*cell, rank, indices).with_weight(tree.weight)
            }
            None => DTree::branch(
                tree.weight,
                tree.children
                    .iter()
                    .map(|child| self.realize_slots(child, ranks, indices))
                    .collect(),
            ),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Lazy sequence of distinct quantization results in order of increasing cost.
pub struct Quantizations<'a> {
    search: Search<'a>,
    root: Option<CellId>,
    rank: usize,
    count: usize,
    emitted: HashSet<(String, Vec<usize>)>,
}

impl Quantizations<'_> {
    /// Nonterminals the search bound to segments, with the productions which matched there.
    pub fn specializations(&self) -> impl Iterator<Item = &Nonterminal> {
        self.search.cells.iter().map(|cell| &cell.nonterminal)
    }
}

impl Iterator for Quantizations<'_> {
    type Item = Quantization;

    fn next(&mut self) -> Option<Self::Item> {
        let root = self.root?;
        while self.emitted.len() < self.count {
            let Some(cost) = self.search.best(root, self.rank) else {
                // exhausted: no further derivations
                self.count = self.emitted.len();
                return None;
            };
            let mut indices = Vec::new();
            let tree = self
                .search
                .realize(root, self.rank, &mut indices)
                .remove_grace_notes()
                .reconnect_slurs();
            let rank = self.rank;
            self.rank += 1;
            // derivations which only differ in slurs or grace notes realize the same result
            if !self.emitted.insert((tree.to_string(), indices.clone())) {
                log::trace!("rank {}: '{}' repeats an earlier result", rank, tree);
                continue;
            }
            log::trace!("rank {}: '{}' with cost {:.4}", rank, tree, cost);
            return Some(Quantization {
                cost,
                tree,
                indices,
            });
        }
        None
    }
}

// -------------------------------------------------------------------------------------------------

/// Quantization settings.
#[derive(Clone, Debug)]
pub struct Quantizer<'a> {
    grammar: &'a Grammar,
    interval: Option<Interval>,
    alpha: f64,
    count: usize,
}

impl<'a> Quantizer<'a> {
    pub fn new(grammar: &'a Grammar) -> Self {
        Self {
            grammar,
            interval: None,
            alpha: DEFAULT_ALPHA,
            count: 1,
        }
    }

    /// Time span the grammar's root explains. By default whole units covering all points.
    #[must_use]
    pub fn with_interval(self, interval: Interval) -> Self {
        Self {
            interval: Some(interval),
            ..self
        }
    }

    /// Weight of snapping distances. 0 ignores timing and picks the simplest derivation.
    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    /// Maximum number of results.
    #[must_use]
    pub fn with_count(self, count: usize) -> Self {
        Self { count, ..self }
    }

    /// Quantize the given onsets. `notes` labels each point, missing labels count as notes.
    pub fn quantize(&self, points: &[f64], notes: &[Label]) -> Quantizations<'a> {
        let interval = self.interval.unwrap_or_else(|| Interval::covering(points));
        let mut search = Search::new(self.grammar, points, notes, self.alpha, interval);
        let root = search.specialize(self.grammar.root(), interval, 0..points.len());
        log::debug!(
            "specialized {} cells for {} points in [{}, {})",
            search.cells.len(),
            points.len(),
            interval.start,
            interval.stop
        );
        Quantizations {
            search,
            root,
            rank: 0,
            count: self.count,
            emitted: HashSet::new(),
        }
    }
}

impl Default for Quantizer<'static> {
    fn default() -> Self {
        Self::new(default_grammar())
    }
}

/// Lazily enumerate the `k` best quantizations of the points with the given grammar, over
/// whole units covering all points.
pub fn quantize<'a>(
    points: &[f64],
    notes: &[Label],
    grammar: &'a Grammar,
    alpha: f64,
    k: usize,
) -> Quantizations<'a> {
    Quantizer::new(grammar)
        .with_alpha(alpha)
        .with_count(k)
        .quantize(points, notes)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use num_traits::{One, Zero};
    use pretty_assertions::assert_eq;

    use crate::time::{Event, Fraction};

    fn notes(count: usize) -> Vec<Label> {
        vec![Label::Note; count]
    }

    fn events(quantization: &Quantization, duration: i64) -> Vec<Event> {
        quantization
            .tree
            .to_events(Fraction::zero(), Fraction::from(duration))
    }

    fn quarters() -> Vec<Event> {
        (0..4).map(|i| (Fraction::from(i), Fraction::one())).collect()
    }

    fn first(points: &[f64], notes: &[Label]) -> Quantization {
        quantize(points, notes, default_grammar(), DEFAULT_ALPHA, 1)
            .next()
            .expect("a quantization result")
    }

    #[test]
    fn intervals() {
        let interval = Interval::new(1.0, 3.0);
        assert_eq!(interval.width(), 2.0);
        assert!(interval.contains(1.0) && !interval.contains(3.0));
        assert_eq!(interval.index(1.9), 0);
        assert_eq!(interval.index(2.0), 0);
        assert_eq!(interval.index(2.1), 1);
        assert_eq!(interval.snap(2.6), 3.0);
        assert_eq!(interval.select(&[0.0, 1.0, 2.5, 3.0, 4.0]), 1..3);
        assert_eq!(
            Interval::new(0.0, 4.0).split(&[1, 3]),
            vec![Interval::new(0.0, 1.0), Interval::new(1.0, 4.0)]
        );
        assert_eq!(
            Interval::covering(&[0.0, 0.97, 2.0, 3.0]),
            Interval::new(0.0, 4.0)
        );
        assert_eq!(Interval::covering(&[]), Interval::new(0.0, 1.0));
    }

    #[test]
    fn nonterminal_identity() {
        let a = Nonterminal::new("q", vec![]);
        let b = Nonterminal::new("q", default_grammar().nonterminals()[0].prod.clone());
        assert_eq!(a, b);
        assert_ne!(a.clone(), a.with_segment(Interval::new(0.0, 1.0)));
    }

    #[test]
    fn specializations() {
        let mut results = Quantizer::default().quantize(&[0.0, 1.0, 2.0, 3.0], &notes(4));
        assert!(results.next().is_some());
        let specialized = results.specializations().collect::<Vec<_>>();
        assert!(specialized.iter().all(|n| n.segment.is_some() && !n.prod.is_empty()));
        let root = Nonterminal::new("q0", vec![]).with_segment(Interval::new(0.0, 4.0));
        let bound = specialized.iter().find(|n| **n == &root).unwrap();
        // slurs can't match points, so the plain slur production is dropped
        assert!(bound.prod.len() < default_grammar().nonterminal("q0").unwrap().prod.len());
        let beat = Nonterminal::new("q1", vec![]).with_segment(Interval::new(1.0, 2.0));
        assert!(specialized.iter().any(|n| **n == beat));
    }

    #[test]
    fn grid() {
        let result = first(&[0.0, 1.0, 2.0, 3.0], &notes(4));
        assert!((result.cost - 0.9).abs() < 1e-9, "cost {}", result.cost);
        assert_eq!(result.tree.to_string(), "(n n n n)");
        assert_eq!(events(&result, 4), quarters());
        assert_eq!(result.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn off_grid() {
        let result = first(&[0.0, 0.97, 2.0, 3.0], &notes(4));
        assert!((result.cost - 0.93).abs() < 1e-9, "cost {}", result.cost);
        assert_eq!(events(&result, 4), quarters());
        assert_eq!(result.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unsorted_points() {
        let result = first(&[2.0, 0.0, 3.0, 1.0], &notes(4));
        assert_eq!(events(&result, 4), quarters());
        assert_eq!(result.indices, vec![1, 3, 0, 2]);
    }

    #[test]
    fn grace_notes() {
        let result = first(&[0.0, 0.02, 1.0, 2.0, 3.0], &notes(5));
        assert!((result.cost - 0.92).abs() < 1e-9, "cost {}", result.cost);
        assert_eq!(result.tree.to_string(), "(n n n n)");
        // the later of the two points snapping to the first onset claims it
        assert_eq!(result.indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn claims_snap_to_onsets() {
        let grammar = Grammar::parse("bar -> 0.3 (n n)\n").unwrap();
        let results = quantize(&[0.0, 0.4, 0.52], &notes(3), &grammar, 1.0, 10).collect::<Vec<_>>();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tree.to_string(), "(n n)");
        // 0.4 snaps to the second onset, but 0.52 lies in its left half
        assert_eq!(results[0].indices, vec![0, 2]);
        assert!((results[0].cost - 0.54).abs() < 1e-9, "cost {}", results[0].cost);

        let points = [0.0, 0.45, 0.55, 0.6, 0.9];
        let result = quantize(&points, &notes(5), &grammar, 1.0, 1).next().unwrap();
        assert_eq!(result.indices, vec![0, 3]);
        assert!(Interval::new(0.5, 0.75).contains(points[result.indices[1]]));
    }

    #[test]
    fn distinct_results() {
        let points = [0.0, 0.45, 0.6, 1.1, 2.3, 2.9];
        let results = quantize(&points, &notes(6), default_grammar(), DEFAULT_ALPHA, 60)
            .map(|q| (q.cost, q.tree.to_string(), q.indices))
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 60);
        let mut seen = HashSet::new();
        for (cost, tree, indices) in &results {
            assert!(
                seen.insert((tree.clone(), indices.clone())),
                "'{}' {:?} at cost {} repeats an earlier result",
                tree,
                indices,
                cost
            );
        }
        for pair in results.windows(2) {
            assert!(pair[0].0 <= pair[1].0 + 1e-12);
        }
    }

    #[test]
    fn rests() {
        let labels = [Label::Note, Label::Rest, Label::Note, Label::Note];
        let result = first(&[0.0, 1.0, 2.0, 3.0], &labels);
        assert_eq!(result.tree.to_string(), "(n r n n)");
        assert_eq!(
            events(&result, 4),
            vec![
                (Fraction::from(0), Fraction::one()),
                (Fraction::from(2), Fraction::one()),
                (Fraction::from(3), Fraction::one())
            ]
        );
    }

    #[test]
    fn no_points() {
        let result = first(&[], &[]);
        assert!((result.cost - 0.1).abs() < 1e-9);
        assert_eq!(result.tree.to_string(), "s");
        assert!(result.indices.is_empty());
        assert!(events(&result, 1).is_empty());
    }

    #[test]
    fn k_best() {
        let points = [0.0, 1.0, 2.0, 3.0];
        let results = quantize(&points, &notes(4), default_grammar(), DEFAULT_ALPHA, 25)
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 25);
        assert!((results[0].cost - 0.9).abs() < 1e-9);
        for pair in results.windows(2) {
            assert!(pair[0].cost <= pair[1].cost + 1e-12);
        }
        for result in &results {
            assert!(result.indices.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(events(result, 4).len(), result.indices.len());
        }
    }

    #[test]
    fn deterministic() {
        let points = [0.0, 0.6, 1.1, 2.3, 2.9];
        let run = || {
            quantize(&points, &notes(5), default_grammar(), 0.5, 10)
                .map(|q| (q.cost, q.tree.to_string(), q.indices))
                .collect::<Vec<_>>()
        };
        let results = run();
        assert_eq!(results.len(), 10);
        assert_eq!(results, run());
    }

    #[test]
    fn exhaustion() {
        let grammar = Grammar::parse("bar -> 0.1 n | 0.3 (n n)\n").unwrap();
        let results = quantize(&[0.0, 0.5], &notes(2), &grammar, 1.0, 10).collect::<Vec<_>>();
        // the single note with a grace note, and the even split
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tree.to_string(), "(n n)");
        assert!((results[0].cost - 0.3).abs() < 1e-9);
        assert_eq!(results[1].tree.to_string(), "n");
        assert!((results[1].cost - 0.6).abs() < 1e-9);
        assert_eq!(results[1].indices, vec![1]);
    }

    #[test]
    fn builder() {
        // without snapping costs, a single note explains everything
        let result = Quantizer::default()
            .with_alpha(0.0)
            .quantize(&[0.0, 1.0, 2.0, 3.0], &notes(4))
            .next()
            .unwrap();
        assert_eq!(result.tree.to_string(), "n");
        assert_eq!(result.indices, vec![2]);

        let grammar = default_grammar().bars(2);
        let result = Quantizer::new(&grammar)
            .with_interval(Interval::new(0.0, 4.0))
            .quantize(&[0.0, 1.0, 2.0, 3.0], &notes(4))
            .next()
            .unwrap();
        assert!((result.cost - 1.1).abs() < 1e-9, "cost {}", result.cost);
        assert_eq!(events(&result, 4), quarters());

        let grammar = Grammar::parse("bar -> 0.2 (beat beat beat)\nbeat -> 0.1 n | 0.1 r | 0.1 s\n")
            .unwrap();
        let results = Quantizer::new(&grammar)
            .with_count(3)
            .quantize(&[0.0, 1.0, 2.0], &notes(3))
            .collect::<Vec<_>>();
        assert_eq!(results[0].tree.to_string(), "(n n n)");
        assert!((results[0].cost - 0.5).abs() < 1e-9);
        assert!(results.len() <= 3);
    }
}
