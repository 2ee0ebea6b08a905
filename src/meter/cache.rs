//! Caller-owned memoization for indispensability arrays.
//!
//! The cache is keyed by structural equality of the metric structure, so
//! `"2+3"`, `"(2)+(3)"` and `"2 + 3"` share one entry. Only unnormalized ranks
//! are stored; normalization is applied on the way out.

use super::error::MeterError;
use super::indispensability::IndispensabilityArray;
use super::options::IndispensabilityOptions;
use super::parser::MeterArithmeticGroup;
use super::structure::MetricStructure;
use std::collections::HashMap;
use tracing::trace;

/// Remembers computed indispensability ranks for repeated structures.
#[derive(Debug, Clone, Default)]
pub struct IndispensabilityCache {
    /// Key: structure and the `upbeats_before_group_length` setting.
    entries: HashMap<(MetricStructure, bool), Vec<usize>>,
    hits: u64,
    misses: u64,
}

impl IndispensabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the array for `structure`, computing it on first request.
    pub fn array_for_structure(
        &mut self,
        structure: &MetricStructure,
        upbeats_before_group_length: bool,
        normalize: bool,
    ) -> IndispensabilityArray {
        let key = (structure.clone(), upbeats_before_group_length);
        let ranks = match self.entries.get(&key) {
            Some(ranks) => {
                self.hits += 1;
                trace!(structure = %structure, "indispensability cache hit");
                ranks.clone()
            }
            None => {
                self.misses += 1;
                trace!(structure = %structure, "indispensability cache miss");
                let array = structure.get_indispensability_array(upbeats_before_group_length, false);
                let ranks = array.ranks().map(<[usize]>::to_vec).unwrap_or_default();
                self.entries.insert(key, ranks.clone());
                ranks
            }
        };

        let array = IndispensabilityArray::Ranks(ranks);
        if normalize {
            array.normalized()
        } else {
            array
        }
    }

    /// Parses `expression` and returns its (possibly cached) array.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::Parse`] for a malformed expression. Failed
    /// expressions are not cached.
    pub fn array_from_expression(
        &mut self,
        expression: &str,
        options: &IndispensabilityOptions,
    ) -> Result<IndispensabilityArray, MeterError> {
        let structure = MeterArithmeticGroup::parse(expression)?
            .to_metric_structure(options.break_up_large_numbers)?;
        Ok(self.array_for_structure(
            &structure,
            options.upbeats_before_group_length,
            options.normalize,
        ))
    }

    /// Number of cached structures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drops all entries and resets the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::indispensability_array_from_expression;

    #[test]
    fn test_structurally_equal_expressions_share_an_entry() {
        let mut cache = IndispensabilityCache::new();
        let options = IndispensabilityOptions::default();

        let first = cache.array_from_expression("2+3", &options).unwrap();
        let second = cache.array_from_expression("(2) + (3)", &options).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_cached_result_matches_direct_computation() {
        let mut cache = IndispensabilityCache::new();
        for expression in ["(2+3+2)*3", "(2+2)+3", "7"] {
            for options in [
                IndispensabilityOptions::default(),
                IndispensabilityOptions::barlow(),
                IndispensabilityOptions::default().with_normalize(true),
            ] {
                let cached = cache.array_from_expression(expression, &options).unwrap();
                let direct = indispensability_array_from_expression(expression, &options).unwrap();
                assert_eq!(cached, direct, "{expression} with {options:?}");
            }
        }
    }

    #[test]
    fn test_upbeat_setting_is_part_of_the_key() {
        let mut cache = IndispensabilityCache::new();
        let structure = MetricStructure::from_pulses(&[2, 3]).unwrap();

        let with_upbeats = cache.array_for_structure(&structure, true, false);
        let literal = cache.array_for_structure(&structure, false, false);

        assert_ne!(with_upbeats, literal);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached_and_clear_resets() {
        let mut cache = IndispensabilityCache::new();
        assert!(cache
            .array_from_expression("2++3", &IndispensabilityOptions::default())
            .is_err());
        assert!(cache.is_empty());

        cache
            .array_from_expression("3", &IndispensabilityOptions::default())
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }
}
