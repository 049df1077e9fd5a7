//! Rhythm quantization into prime-subdivision measure trees.
//!
//! - [`quantize`] finds the k cheapest derivations of performed onsets in a weighted grammar.
//! - [`measure`] holds canonical measure trees, their rewrite closure and the cost driven
//!   simplifier.
//! - [`dtree`] holds weighted derivation trees and their conversion into timed events.
//! - [`rhythm`] generates euclidean and step rhythms.
//! - [`balanced`] holds persistent AVL trees: a text rope, an indexed sequence and an ordered map.

pub mod balanced;
pub mod dtree;
pub mod error;
pub mod measure;
pub mod prelude;
pub mod quantize;
pub mod rhythm;
pub mod time;

pub use dtree::DTree;
pub use error::{Error, Result};
pub use measure::{Label, Tree};
pub use quantize::{quantize, Grammar, Interval, Quantization, Quantizer};
pub use rhythm::Rhythm;
pub use time::{Event, Fraction};
