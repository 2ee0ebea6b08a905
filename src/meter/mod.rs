//! Metric structure and rhythmic indispensability.
//!
//! The pipeline runs expression string → [`MeterArithmeticGroup`] →
//! [`MetricStructure`] → nested [`BeatTree`] → backward beat priorities →
//! [`IndispensabilityArray`]. Every stage is a plain value; nothing here does
//! I/O or keeps global state. Repeated work can be memoized explicitly with
//! an [`IndispensabilityCache`].

mod beat_tree;
mod cache;
mod coherence;
mod error;
mod indispensability;
mod options;
mod parser;
mod structure;

pub use beat_tree::{backward_beat_priorities, flatten_beat_groups, normalize_depth, BeatTree};
pub use cache::IndispensabilityCache;
pub use coherence::{metric_coherence, metric_similarity};
pub use error::{InvalidGroupError, InvalidStrataError, MeterError, ParseError};
pub use indispensability::{
    barlow_style_indispensability_array, indispensability_array_from_expression,
    indispensability_array_from_strata, indispensability_from_priorities, strata_to_expression,
    IndispensabilityArray, Stratum,
};
pub use options::IndispensabilityOptions;
pub use parser::{MeterArithmeticGroup, MAX_NESTING_DEPTH};
pub use structure::{decompose_to_twos_and_threes, MetricGroup, MetricStructure};
