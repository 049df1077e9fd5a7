//! The rhythmtree prelude.
//!
//! The purpose of this module is to alleviate imports of commonly used types:
//!
//! ```
//! # #![allow(unused_imports)]
//! use rhythmtree::prelude::*;
//! ```

pub use super::{
    // persistent containers
    balanced::{map::OrderedMap, rope::Rope, sequence::Sequence},
    // measure trees and their rewrites
    measure::{
        rewrite::expansions,
        simplify::{bump, normalize, simplify, CostTable, COLLAPSE, EXPAND},
    },
    // quantization
    quantize::{default_grammar, Nonterminal, Production, Quantizations, Symbol, DEFAULT_ALPHA},
    // rhythms
    rhythm::{parse_rhythm, EuclideanRhythm, StepRhythm},
    // all public basic types
    DTree,
    Error,
    Event,
    Fraction,
    Grammar,
    Interval,
    Label,
    Quantization,
    Quantizer,
    Result,
    Rhythm,
    Tree,
};
