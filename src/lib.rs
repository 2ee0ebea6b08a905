//! meterkit - rhythmic indispensability for arbitrary meters.
//!
//! Parses meter expressions such as `"(2 + 3 + 2) * 3"`, builds nested metric
//! structures from them, and ranks every pulse of the bar by how essential it
//! is to conveying the meter (Clarence Barlow's indispensability, generalized
//! to nested additive meters).
//!
//! ```
//! use meterkit::{indispensability_array_from_expression, IndispensabilityOptions};
//!
//! let array = indispensability_array_from_expression("3+2", &IndispensabilityOptions::default()).unwrap();
//! assert_eq!(array.get(0), Some(4.0));
//! ```

pub mod meter;

// Re-export commonly used types
pub use meter::{
    barlow_style_indispensability_array, indispensability_array_from_expression,
    indispensability_array_from_strata, IndispensabilityArray, IndispensabilityCache,
    IndispensabilityOptions, MeterArithmeticGroup, MeterError, MetricGroup, MetricStructure,
    Stratum,
};
