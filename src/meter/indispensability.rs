//! Indispensability arrays.
//!
//! Clarence Barlow's rhythmic indispensability, extended to nested additive
//! meters. An indispensability array gives each pulse of a bar a unique rank:
//! the downbeat gets the highest, the most dispensable pulse gets 0.

use super::error::{InvalidStrataError, MeterError};
use super::options::IndispensabilityOptions;
use super::parser::MeterArithmeticGroup;
use super::structure::MetricStructure;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Ranks or normalized weights for every pulse of a bar, downbeat first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndispensabilityArray {
    /// A permutation of `0..len`, downbeat at `len - 1`.
    Ranks(Vec<usize>),
    /// Ranks divided by their maximum, downbeat at exactly 1.0.
    Normalized(Vec<f64>),
}

impl IndispensabilityArray {
    pub fn len(&self) -> usize {
        match self {
            IndispensabilityArray::Ranks(ranks) => ranks.len(),
            IndispensabilityArray::Normalized(weights) => weights.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at pulse `index`, as a float.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            IndispensabilityArray::Ranks(ranks) => ranks.get(index).map(|&rank| rank as f64),
            IndispensabilityArray::Normalized(weights) => weights.get(index).copied(),
        }
    }

    /// The integer ranks, if this array is not normalized.
    pub fn ranks(&self) -> Option<&[usize]> {
        match self {
            IndispensabilityArray::Ranks(ranks) => Some(ranks),
            IndispensabilityArray::Normalized(_) => None,
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            IndispensabilityArray::Ranks(ranks) => ranks.iter().map(|&rank| rank as f64).collect(),
            IndispensabilityArray::Normalized(weights) => weights.clone(),
        }
    }

    /// Returns the normalized form of this array.
    pub fn normalized(&self) -> Self {
        match self {
            IndispensabilityArray::Ranks(ranks) => {
                IndispensabilityArray::Normalized(normalize_ranks(ranks))
            }
            normalized => normalized.clone(),
        }
    }
}

impl fmt::Display for IndispensabilityArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for i in 0..self.len() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self {
                IndispensabilityArray::Ranks(ranks) => write!(f, "{}", ranks[i])?,
                IndispensabilityArray::Normalized(weights) => write!(f, "{:.3}", weights[i])?,
            }
        }
        f.write_str("]")
    }
}

/// Divides every rank by the largest. A single-pulse bar normalizes to `[1.0]`.
fn normalize_ranks(ranks: &[usize]) -> Vec<f64> {
    let max = ranks.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![1.0; ranks.len()];
    }
    ranks.iter().map(|&rank| rank as f64 / max as f64).collect()
}

/// Converts a backward beat priority list into forward indispensability ranks.
///
/// The beat listed first gets rank `N - 1`, the one listed last gets 0. The
/// result is then rotated by one and reversed, which undoes the backward
/// numbering so that index 0 is the downbeat.
///
/// `priorities` must be a permutation of `0..N`; out-of-range entries are ignored.
pub fn indispensability_from_priorities(priorities: &[usize]) -> Vec<usize> {
    let length = priorities.len();
    if length == 0 {
        return Vec::new();
    }

    let mut ranks = vec![0; length];
    for (position, &beat) in priorities.iter().enumerate() {
        debug_assert!(beat < length, "beat {beat} outside a bar of {length} pulses");
        if let Some(rank) = ranks.get_mut(beat) {
            *rank = length - 1 - position;
        }
    }
    ranks.rotate_left(1);
    ranks.reverse();
    ranks
}

impl MetricStructure {
    /// Resolves this structure to its indispensability array.
    ///
    /// # Examples
    ///
    /// ```
    /// use meterkit::meter::MetricStructure;
    ///
    /// let five = MetricStructure::from_pulses(&[2, 3]).unwrap();
    /// let array = five.get_indispensability_array(true, false);
    /// assert_eq!(array.ranks(), Some(&[4, 1, 3, 0, 2][..]));
    /// ```
    pub fn get_indispensability_array(
        &self,
        upbeats_before_group_length: bool,
        normalize: bool,
    ) -> IndispensabilityArray {
        let priorities = self.get_backward_beat_priorities(upbeats_before_group_length);
        let ranks = IndispensabilityArray::Ranks(indispensability_from_priorities(&priorities));
        debug!(structure = %self, pulses = ranks.len(), "computed indispensability");
        if normalize {
            ranks.normalized()
        } else {
            ranks
        }
    }
}

/// Computes the indispensability array for a meter arithmetic expression.
///
/// # Errors
///
/// Returns [`MeterError::Parse`] for a malformed expression.
///
/// # Examples
///
/// ```
/// use meterkit::meter::{indispensability_array_from_expression, IndispensabilityOptions};
///
/// let array = indispensability_array_from_expression("2+3", &IndispensabilityOptions::default()).unwrap();
/// assert_eq!(array.ranks(), Some(&[4, 1, 3, 0, 2][..]));
/// ```
pub fn indispensability_array_from_expression(
    expression: &str,
    options: &IndispensabilityOptions,
) -> Result<IndispensabilityArray, MeterError> {
    let tree = MeterArithmeticGroup::parse(expression)?;
    debug!(%expression, parsed = %tree, "parsed meter expression");
    let structure = tree.to_metric_structure(options.break_up_large_numbers)?;
    Ok(structure.get_indispensability_array(options.upbeats_before_group_length, options.normalize))
}

/// One level of rhythmic subdivision.
///
/// Serializes untagged: `3` or `[2, 3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stratum {
    /// Even division into this many parts.
    Even(u32),
    /// Additive division into unequal groups, e.g. `[2, 3]` for 2+3.
    Additive(Vec<u32>),
}

impl Stratum {
    /// Pulses this stratum divides each unit of the level above into.
    pub fn num_pulses(&self) -> u64 {
        match self {
            Stratum::Even(count) => u64::from(*count),
            Stratum::Additive(groups) => groups.iter().copied().map(u64::from).sum(),
        }
    }
}

impl From<u32> for Stratum {
    fn from(count: u32) -> Self {
        Stratum::Even(count)
    }
}

impl From<Vec<u32>> for Stratum {
    fn from(groups: Vec<u32>) -> Self {
        Stratum::Additive(groups)
    }
}

impl<const N: usize> From<[u32; N]> for Stratum {
    fn from(groups: [u32; N]) -> Self {
        Stratum::Additive(groups.to_vec())
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stratum::Even(count) => write!(f, "{}", count),
            Stratum::Additive(groups) => {
                let groups: Vec<String> = groups.iter().map(u32::to_string).collect();
                write!(f, "({})", groups.join("+"))
            }
        }
    }
}

/// Joins strata into a multiplicative expression, e.g. `[(2,3), 2]` becomes `(2+3)*2`.
pub fn strata_to_expression(strata: &[Stratum]) -> String {
    strata
        .iter()
        .map(Stratum::to_string)
        .collect::<Vec<_>>()
        .join("*")
}

fn collect_strata<I, S>(strata: I) -> Result<Vec<Stratum>, InvalidStrataError>
where
    I: IntoIterator<Item = S>,
    S: Into<Stratum>,
{
    let strata: Vec<Stratum> = strata.into_iter().map(Into::into).collect();
    if strata.is_empty() {
        return Err(InvalidStrataError::NoStrata);
    }
    if let Some(index) = strata
        .iter()
        .position(|stratum| matches!(stratum, Stratum::Additive(groups) if groups.is_empty()))
    {
        return Err(InvalidStrataError::EmptyAdditiveStratum { index });
    }
    Ok(strata)
}

/// Computes the indispensability array for a list of rhythmic strata.
///
/// The strata are turned into the equivalent multiplicative expression (see
/// [`strata_to_expression`]) and evaluated with
/// [`indispensability_array_from_expression`].
pub fn indispensability_array_from_strata<I, S>(
    strata: I,
    options: &IndispensabilityOptions,
) -> Result<IndispensabilityArray, MeterError>
where
    I: IntoIterator<Item = S>,
    S: Into<Stratum>,
{
    let strata = collect_strata(strata)?;
    indispensability_array_from_expression(&strata_to_expression(&strata), options)
}

/// Barlow's original indispensability for evenly divided strata.
///
/// Large strata are broken up into 2s and 3s and pulses are ranked purely by
/// group length, which reproduces the published values.
///
/// # Errors
///
/// Returns [`InvalidStrataError::AdditiveStratum`] if any stratum is additive.
///
/// # Examples
///
/// ```
/// use meterkit::meter::barlow_style_indispensability_array;
///
/// let array = barlow_style_indispensability_array([4u32], false).unwrap();
/// assert_eq!(array.ranks(), Some(&[3, 0, 2, 1][..]));
/// ```
pub fn barlow_style_indispensability_array<I, S>(
    strata: I,
    normalize: bool,
) -> Result<IndispensabilityArray, MeterError>
where
    I: IntoIterator<Item = S>,
    S: Into<Stratum>,
{
    let strata = collect_strata(strata)?;
    if let Some(index) = strata
        .iter()
        .position(|stratum| matches!(stratum, Stratum::Additive(_)))
    {
        return Err(InvalidStrataError::AdditiveStratum { index }.into());
    }
    let options = IndispensabilityOptions::barlow().with_normalize(normalize);
    indispensability_array_from_expression(&strata_to_expression(&strata), &options)
}
