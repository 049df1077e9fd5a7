//! Weighted quantization grammars: named nonterminals with template productions.

use std::{
    fmt::{Display, Formatter},
    path::Path,
};

use anyhow::Context;
use lazy_static::lazy_static;
use pest::{error::LineColLocation, iterators::Pair, Parser};
use pest_derive::Parser;

use super::Nonterminal;
use crate::{dtree::DTree, measure::Label, Error, Result};

// -------------------------------------------------------------------------------------------------

/// Template label: either a leaf label or a reference to another nonterminal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(Label),
    Nonterminal(String),
}

impl Symbol {
    /// `n`, `r` and `s` are terminals, every other name refers to a nonterminal.
    pub fn from_name(name: &str) -> Self {
        match name {
            "n" => Symbol::Terminal(Label::Note),
            "r" => Symbol::Terminal(Label::Rest),
            "s" => Symbol::Terminal(Label::Slur),
            _ => Symbol::Nonterminal(name.to_string()),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Terminal(label) => write!(f, "{}", label),
            Symbol::Nonterminal(name) => write!(f, "{}", name),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A weighted alternative of a nonterminal. Lower weights are preferred.
#[derive(Clone, Debug, PartialEq)]
pub struct Production {
    pub weight: f64,
    pub template: DTree<Symbol>,
}

impl Production {
    pub fn new(weight: f64, template: DTree<Symbol>) -> Self {
        Self { weight, template }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "quantize/grammar.pest"]
struct GrammarParser {}

fn parse_error(err: pest::error::Error<Rule>) -> Error {
    let line = match err.line_col {
        LineColLocation::Pos((line, _)) => line,
        LineColLocation::Span((line, _), _) => line,
    };
    Error::grammar(line, err.variant.message().to_string())
}

// errors here should be unreachable unless there is a bug in the pest grammar
fn parse_node(pair: Pair<Rule>) -> Result<DTree<Symbol>> {
    let line = pair.line_col().0;
    let mut tree = DTree {
        weight: 1,
        label: None,
        children: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::count => {
                tree.weight = inner.as_str().parse::<u32>().map_err(|err| {
                    Error::grammar(line, format!("invalid weight '{}': {}", inner.as_str(), err))
                })?;
            }
            Rule::name => tree.label = Some(Symbol::from_name(inner.as_str())),
            Rule::children => {
                tree.children = inner
                    .into_inner()
                    .map(parse_node)
                    .collect::<Result<Vec<_>>>()?;
            }
            other => return Err(Error::grammar(line, format!("unexpected {:?}", other))),
        }
    }
    Ok(tree)
}

/// Parse a single template in the dtree pretty form, e.g. `"(2q1 q1)"` or `"(n 0n (r s))"`.
pub(crate) fn parse_template(input: &str) -> Result<DTree<Symbol>> {
    let mut pairs = GrammarParser::parse(Rule::template, input).map_err(parse_error)?;
    let node = pairs
        .next()
        .and_then(|template| template.into_inner().find(|p| p.as_rule() == Rule::node))
        .ok_or_else(|| Error::grammar(1, "missing tree"))?;
    parse_node(node)
}

/// Check that a production template can't make the search cyclic or emit invalid nodes.
fn validate_template(template: &DTree<Symbol>, line: usize, is_root: bool) -> Result<()> {
    if !is_root && template.weight == 0 {
        return Err(Error::grammar(line, "template weights must be positive"));
    }
    if template.is_leaf() {
        return match &template.label {
            Some(Symbol::Nonterminal(name)) if is_root => Err(Error::grammar(
                line,
                format!("bare nonterminal '{}' would make the search cyclic", name),
            )),
            Some(_) => Ok(()),
            None => Err(Error::grammar(line, "empty template")),
        };
    }
    if template.label.is_some() {
        return Err(Error::grammar(line, "only leaves can carry labels"));
    }
    if template.children.len() < 2 {
        return Err(Error::grammar(
            line,
            "single child subdivisions would make the search cyclic",
        ));
    }
    for child in &template.children {
        validate_template(child, line, false)?;
    }
    Ok(())
}

fn referenced_names<'a>(template: &'a DTree<Symbol>, names: &mut Vec<&'a str>) {
    if let Some(Symbol::Nonterminal(name)) = &template.label {
        names.push(name);
    }
    for child in &template.children {
        referenced_names(child, names);
    }
}

// -------------------------------------------------------------------------------------------------

/// A set of named nonterminals with weighted template productions.
///
/// The text form has one rule per line. Rules with the same name add alternatives:
/// ```text
/// # whole measures
/// q0 -> 0.1 n | 0.1 r | 0.1 s | 0.35 (q1 q1)
/// q1 -> 0.1 n | 0.1 r | 0.1 s
/// ```
/// The first rule's nonterminal is the root.
#[derive(Clone, Debug, PartialEq)]
pub struct Grammar {
    root: String,
    nonterminals: Vec<Nonterminal>,
}

impl Grammar {
    /// Parse a grammar from its text form. Errors carry the line number of the offending rule.
    pub fn parse(text: &str) -> Result<Self> {
        let mut pairs = GrammarParser::parse(Rule::grammar, text).map_err(parse_error)?;
        let grammar = pairs
            .next()
            .ok_or_else(|| Error::grammar(1, "empty grammar"))?;

        let mut nonterminals: Vec<Nonterminal> = Vec::new();
        let mut references = Vec::new();
        for rule in grammar.into_inner().filter(|p| p.as_rule() == Rule::rule) {
            let line = rule.line_col().0;
            let mut inner = rule.into_inner();
            let name = inner
                .next()
                .map(|name| name.as_str().to_string())
                .ok_or_else(|| Error::grammar(line, "missing rule name"))?;
            if let Symbol::Terminal(_) = Symbol::from_name(&name) {
                return Err(Error::grammar(
                    line,
                    format!("terminal '{}' can't be redefined", name),
                ));
            }
            let mut productions = Vec::new();
            for alternative in inner {
                let mut parts = alternative.into_inner();
                let (Some(weight), Some(node)) = (parts.next(), parts.next()) else {
                    return Err(Error::grammar(line, "incomplete alternative"));
                };
                let weight = weight.as_str().parse::<f64>().map_err(|err| {
                    Error::grammar(line, format!("invalid weight '{}': {}", weight.as_str(), err))
                })?;
                let template = parse_node(node)?;
                validate_template(&template, line, true)?;
                let mut names = Vec::new();
                referenced_names(&template, &mut names);
                references.extend(names.into_iter().map(|name| (line, name.to_string())));
                productions.push(Production::new(weight, template));
            }
            match nonterminals.iter().position(|n| n.name == name) {
                Some(index) => nonterminals[index].prod.extend(productions),
                None => nonterminals.push(Nonterminal::new(&name, productions)),
            }
        }

        let root = nonterminals
            .first()
            .map(|nonterminal| nonterminal.name.clone())
            .ok_or_else(|| Error::grammar(1, "grammar has no rules"))?;
        for (line, name) in references {
            if !nonterminals.iter().any(|n| n.name == name) {
                return Err(Error::grammar(
                    line,
                    format!("undefined nonterminal '{}'", name),
                ));
            }
        }
        log::debug!(
            "parsed grammar with {} nonterminals, root '{}'",
            nonterminals.len(),
            root
        );
        Ok(Self { root, nonterminals })
    }

    /// Load and parse a grammar file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read grammar file '{}'", path.display()))?;
        let grammar = Self::parse(&text)
            .with_context(|| format!("failed to parse grammar file '{}'", path.display()))?;
        log::info!("loaded grammar from '{}'", path.display());
        Ok(grammar)
    }

    /// Name of the root nonterminal.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn nonterminal(&self, name: &str) -> Option<&Nonterminal> {
        self.nonterminals.iter().find(|n| n.name == name)
    }

    pub fn nonterminals(&self) -> &[Nonterminal] {
        &self.nonterminals
    }

    /// A grammar whose root splits into `count` equal bars, each derived from this grammar's
    /// root. Counts below 2 return the grammar unchanged.
    #[must_use]
    pub fn bars(&self, count: usize) -> Self {
        if count < 2 {
            return self.clone();
        }
        let mut name = format!("{}_bars", self.root);
        while self.nonterminal(&name).is_some() {
            name.push('_');
        }
        let bar = DTree::leaf(1, Symbol::Nonterminal(self.root.clone()));
        let template = DTree::branch(1, vec![bar; count]);
        let mut nonterminals = vec![Nonterminal::new(&name, vec![Production::new(0.0, template)])];
        nonterminals.extend(self.nonterminals.iter().cloned());
        Self {
            root: name,
            nonterminals,
        }
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for nonterminal in &self.nonterminals {
            write!(f, "{} ->", nonterminal.name)?;
            for (index, production) in nonterminal.prod.iter().enumerate() {
                if index > 0 {
                    write!(f, " |")?;
                }
                write!(f, " {} {}", production.weight, production.template)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Default for Grammar {
    fn default() -> Self {
        default_grammar().clone()
    }
}

// -------------------------------------------------------------------------------------------------

const DEFAULT_GRAMMAR: &str = "\
# whole measures: plain leaves, even subdivisions and dotted figures
q0 -> 0.1 n | 0.1 r | 0.1 s
q0 -> 0.35 (q1 q1) | 0.45 (q1 q1 q1) | 0.5 (q1 q1 q1 q1) | 0.6 (q2 q2 q2 q2 q2)
q0 -> 0.65 (q1 q1 q1 q1 q1 q1) | 0.8 (q2 q2 q2 q2 q2 q2 q2) | 0.75 (q2 q2 q2 q2 q2 q2 q2 q2)
q0 -> 0.9 (q2 q2 q2 q2 q2 q2 q2 q2 q2) | 1.1 (q2 q2 q2 q2 q2 q2 q2 q2 q2 q2 q2)
q0 -> 0.5 (3q1 q1) | 0.5 (q1 3q1) | 0.55 (2q1 q1) | 0.55 (q1 2q1)
# finer refinements
q1 -> 0.1 n | 0.1 r | 0.1 s | 0.35 (q2 q2) | 0.45 (q2 q2 q2) | 0.7 (q3 q3 q3 q3 q3)
q2 -> 0.1 n | 0.1 r | 0.1 s | 0.35 (q3 q3) | 0.45 (q3 q3 q3)
q3 -> 0.1 n | 0.1 r | 0.1 s | 0.35 (q4 q4) | 0.45 (q4 q4 q4)
q4 -> 0.1 n | 0.1 r | 0.1 s
";

lazy_static! {
    static ref DEFAULT: Grammar =
        Grammar::parse(DEFAULT_GRAMMAR).expect("the default grammar should be valid");
}

/// The built-in grammar: `q0` for whole measures with 1 to 11 way subdivisions and dotted
/// figures, `q1` to `q4` for binary, ternary and quintary refinements.
pub fn default_grammar() -> &'static Grammar {
    &DEFAULT
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn templates() {
        let template = parse_template("(2q1 q1)").unwrap();
        assert_eq!(template.span(), 3);
        assert_eq!(template.children[0].weight, 2);
        assert_eq!(
            template.children[1].label,
            Some(Symbol::Nonterminal("q1".to_string()))
        );
        assert_eq!(template.to_string(), "(2q1 q1)");
        assert_eq!(
            parse_template("n").unwrap(),
            DTree::leaf(1, Symbol::Terminal(Label::Note))
        );
        assert!(parse_template("(n").is_err());
        assert!(parse_template("").is_err());
    }

    #[test]
    fn parse_rules() {
        let grammar = Grammar::parse(
            "# comment\n\
             bar -> 0.1 n | 0.5 (beat beat) # trailing comment\n\
             \n\
             beat -> 0.1 n | 0.1 s\n\
             bar -> 1 (beat beat beat)\n",
        )
        .unwrap();
        assert_eq!(grammar.root(), "bar");
        assert_eq!(grammar.nonterminals().len(), 2);
        assert_eq!(grammar.nonterminal("bar").map(|n| n.prod.len()), Some(3));
        assert_eq!(grammar.nonterminal("beat").map(|n| n.prod.len()), Some(2));
        // text form round trip
        assert_eq!(Grammar::parse(&grammar.to_string()).unwrap(), grammar);
    }

    #[test]
    fn errors_carry_lines() {
        let line = |text: &str| match Grammar::parse(text) {
            Err(Error::Grammar { line, .. }) => line,
            other => panic!("expected a grammar error, got {:?}", other),
        };
        assert_eq!(line("q -> 0.1 n\nq -> 0.1 (n n\n"), 2);
        assert_eq!(line("q -> 0.1 n\n\nq -> 0.5 (n x)\n"), 3);
        assert_eq!(line("q -> 0.1 n\nq -> 0.5 p\np -> 0.1 n\n"), 2);
        assert_eq!(line("q -> 0.1 n\nq -> 0.5 ((n n))\n"), 2);
        assert_eq!(line("q -> 0.1 n\nn -> 0.5 (q q)\n"), 2);
        assert_eq!(line("q -> 0.1 n | 0.2 (0n n)\n"), 1);
        assert_eq!(line(""), 1);
    }

    #[test]
    fn default_and_bars() {
        let grammar = default_grammar();
        assert_eq!(grammar.root(), "q0");
        assert_eq!(grammar.nonterminals().len(), 5);
        let arities = grammar
            .nonterminal("q0")
            .unwrap()
            .prod
            .iter()
            .map(|p| p.template.children.len())
            .collect::<Vec<_>>();
        for arity in [0, 2, 3, 4, 5, 6, 7, 8, 9, 11] {
            assert!(arities.contains(&arity), "missing {} way split", arity);
        }
        let bars = grammar.bars(3);
        assert_eq!(bars.root(), "q0_bars");
        let root = bars.nonterminal(bars.root()).unwrap();
        assert_eq!(root.prod.len(), 1);
        assert_eq!(root.prod[0].weight, 0.0);
        assert_eq!(root.prod[0].template.to_string(), "(q0 q0 q0)");
        assert_eq!(&grammar.bars(1), grammar);
    }

    #[test]
    fn from_file() {
        let path = std::env::temp_dir().join("rhythmtree_grammar_test.txt");
        std::fs::write(&path, "q -> 0.1 n | 0.3 (q q)\n").unwrap();
        let grammar = Grammar::from_file(&path).unwrap();
        assert_eq!(grammar.root(), "q");
        std::fs::remove_file(&path).unwrap();
        assert!(Grammar::from_file(&path).is_err());
    }
}
