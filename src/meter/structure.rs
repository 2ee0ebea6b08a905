//! Nested additive metric structures.
//!
//! A [`MetricStructure`] is an ordered list of groups, each either a flat run
//! of pulses or another structure. Structures are immutable values: every
//! operation returns a new structure, and every structure is kept in normal
//! form (no single-child wrappers around another structure, no nested
//! structures that hold a single flat group).

use super::beat_tree::BeatTree;
use super::error::{InvalidGroupError, MeterError};
use super::parser::MeterArithmeticGroup;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};

/// One group within a [`MetricStructure`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricGroup {
    /// A flat group of this many pulses.
    Pulses(u32),
    /// A nested grouping.
    Nested(MetricStructure),
}

impl MetricGroup {
    /// Total number of pulses in this group.
    pub fn num_pulses(&self) -> usize {
        match self {
            MetricGroup::Pulses(count) => *count as usize,
            MetricGroup::Nested(structure) => structure.num_pulses(),
        }
    }

    fn broken_up(self) -> Self {
        match self {
            MetricGroup::Pulses(count) if count > 3 => MetricGroup::Nested(MetricStructure::from_parts(
                decompose_to_twos_and_threes(count)
                    .into_iter()
                    .map(MetricGroup::Pulses)
                    .collect(),
            )),
            MetricGroup::Nested(structure) => MetricGroup::Nested(structure.break_up_large_numbers()),
            other => other,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricGroup::Pulses(count) => write!(f, "{}", count),
            MetricGroup::Nested(structure) => write!(f, "({})", structure),
        }
    }
}

impl From<u32> for MetricGroup {
    fn from(count: u32) -> Self {
        MetricGroup::Pulses(count)
    }
}

impl From<MetricStructure> for MetricGroup {
    fn from(structure: MetricStructure) -> Self {
        MetricGroup::Nested(structure)
    }
}

/// Splits `n` into 2s followed by at most one 3, smaller groups first.
///
/// This is Barlow's reduction of large groups to primitive ones. Values of 3
/// or less are returned unchanged as a single group (and 0 as no groups).
///
/// # Examples
///
/// ```
/// use meterkit::meter::decompose_to_twos_and_threes;
///
/// assert_eq!(decompose_to_twos_and_threes(7), vec![2, 2, 3]);
/// assert_eq!(decompose_to_twos_and_threes(4), vec![2, 2]);
/// ```
pub fn decompose_to_twos_and_threes(n: u32) -> Vec<u32> {
    if n <= 3 {
        return if n == 0 { Vec::new() } else { vec![n] };
    }

    let mut remaining = n;
    let mut groups = Vec::new();
    if remaining % 2 == 1 {
        remaining -= 3;
        groups.push(3);
    }
    while remaining > 0 {
        remaining -= 2;
        groups.push(2);
    }
    groups.reverse();
    groups
}

/// Collapses redundant nesting until a fixed point.
///
/// Children are already in normal form, so only this level needs work:
/// a lone nested child is replaced by its groups, and nested children
/// holding a single flat group are replaced by that group.
fn remove_redundant_nesting(mut groups: Vec<MetricGroup>) -> Vec<MetricGroup> {
    while groups.len() == 1 {
        match groups.pop() {
            Some(MetricGroup::Nested(inner)) => groups = inner.groups,
            Some(flat) => {
                groups.push(flat);
                break;
            }
            None => break,
        }
    }

    groups
        .into_iter()
        .map(|group| match group {
            MetricGroup::Nested(mut inner) if inner.groups.len() == 1 => inner.groups.remove(0),
            other => other,
        })
        .collect()
}

/// A nested additive grouping of pulses.
///
/// Serializes as a nested array, e.g. `[[2, 2], 3]` for `(2+2)+3`, and is
/// validated again on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<MetricGroup>", into = "Vec<MetricGroup>")]
pub struct MetricStructure {
    groups: Vec<MetricGroup>,
}

impl MetricStructure {
    /// Creates a structure from its additive groups.
    ///
    /// # Errors
    ///
    /// Fails if `groups` is empty or any flat group has zero pulses.
    pub fn new(groups: Vec<MetricGroup>) -> Result<Self, InvalidGroupError> {
        Self::with_break_up(groups, false)
    }

    /// Like [`new`](Self::new), optionally replacing every group larger than 3
    /// with its [`decompose_to_twos_and_threes`] split.
    pub fn with_break_up(
        groups: Vec<MetricGroup>,
        break_up_large_numbers: bool,
    ) -> Result<Self, InvalidGroupError> {
        if groups.is_empty() {
            return Err(InvalidGroupError::Empty);
        }
        if groups.iter().any(|group| matches!(group, MetricGroup::Pulses(0))) {
            return Err(InvalidGroupError::Zero);
        }

        let structure = Self::from_parts(groups);
        Ok(if break_up_large_numbers {
            structure.break_up_large_numbers()
        } else {
            structure
        })
    }

    /// Creates a flat structure, e.g. `from_pulses(&[2, 3, 2])` for 2+3+2.
    pub fn from_pulses(pulses: &[u32]) -> Result<Self, InvalidGroupError> {
        Self::new(pulses.iter().copied().map(MetricGroup::Pulses).collect())
    }

    /// Parses a meter arithmetic expression straight into a structure.
    ///
    /// # Examples
    ///
    /// ```
    /// use meterkit::meter::MetricStructure;
    ///
    /// let structure = MetricStructure::from_string("(2 + 3 + 2) * 3", false).unwrap();
    /// assert_eq!(structure.num_pulses(), 21);
    /// ```
    pub fn from_string(expression: &str, break_up_large_numbers: bool) -> Result<Self, MeterError> {
        let tree = MeterArithmeticGroup::parse(expression)?;
        Ok(tree.to_metric_structure(break_up_large_numbers)?)
    }

    /// Builds from groups already known to be valid and non-empty.
    pub(crate) fn from_parts(groups: Vec<MetricGroup>) -> Self {
        Self {
            groups: remove_redundant_nesting(groups),
        }
    }

    /// The additive groups at this level.
    pub fn groups(&self) -> &[MetricGroup] {
        &self.groups
    }

    /// Total number of pulses (beats at the finest level).
    pub fn num_pulses(&self) -> usize {
        self.groups.iter().map(MetricGroup::num_pulses).sum()
    }

    /// Number of structure levels, 1 for a flat structure.
    pub fn depth(&self) -> usize {
        1 + self
            .groups
            .iter()
            .map(|group| match group {
                MetricGroup::Pulses(_) => 0,
                MetricGroup::Nested(structure) => structure.depth(),
            })
            .max()
            .unwrap_or(0)
    }

    /// Returns a copy with every group larger than 3 split into 2s and 3s.
    pub fn break_up_large_numbers(&self) -> Self {
        Self::from_parts(self.groups.iter().cloned().map(MetricGroup::broken_up).collect())
    }

    /// Concatenates the groups of `other` onto this level.
    pub fn extend(&self, other: &MetricStructure) -> Self {
        let mut groups = self.groups.clone();
        groups.extend(other.groups.iter().cloned());
        Self::from_parts(groups)
    }

    /// Adds a single group at the end of this level.
    pub fn append(&self, group: impl Into<MetricGroup>) -> Result<Self, InvalidGroupError> {
        let mut groups = self.groups.clone();
        groups.push(group.into());
        Self::new(groups)
    }

    /// Places this structure and `other` side by side as two groups (same as `+`).
    pub fn join(&self, other: &MetricStructure) -> Self {
        self.clone() + other.clone()
    }

    /// Subdivides every pulse into `count` pulses (the fallible form of `* count`).
    pub fn subdivide(&self, count: u32) -> Result<Self, InvalidGroupError> {
        if count == 0 {
            return Err(InvalidGroupError::Zero);
        }
        Ok(self.multiply(&Self::from_parts(vec![MetricGroup::Pulses(count)])))
    }

    /// Replaces every pulse-group `n` with `n` copies of `rhs`, recursively.
    fn multiply(&self, rhs: &MetricStructure) -> Self {
        Self::from_parts(
            self.groups
                .iter()
                .map(|group| match group {
                    MetricGroup::Pulses(1) => MetricGroup::Nested(rhs.clone()),
                    MetricGroup::Pulses(count) => MetricGroup::Nested(rhs.repeated(*count)),
                    MetricGroup::Nested(structure) => MetricGroup::Nested(structure.multiply(rhs)),
                })
                .collect(),
        )
    }

    fn repeated(&self, count: u32) -> Self {
        Self::from_parts(vec![MetricGroup::Nested(self.clone()); count as usize])
    }

    /// Numbers every pulse and arranges the numbers in this structure's shape.
    ///
    /// Groups are numbered last to first, so beat 0 starts the last group and
    /// numbering continues backward through earlier groups. Flat groups become
    /// increasing runs; nested groups recurse with a running offset.
    pub fn get_nested_beat_groups(&self) -> BeatTree {
        self.nested_beat_groups_from(0)
    }

    fn nested_beat_groups_from(&self, first_beat: usize) -> BeatTree {
        let mut beat = first_beat;
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in self.groups.iter().rev() {
            let numbered = match group {
                MetricGroup::Pulses(count) => {
                    BeatTree::Group((beat..beat + *count as usize).map(BeatTree::Beat).collect())
                }
                MetricGroup::Nested(structure) => structure.nested_beat_groups_from(beat),
            };
            beat += group.num_pulses();
            groups.push(numbered);
        }
        BeatTree::Group(groups)
    }
}

impl TryFrom<Vec<MetricGroup>> for MetricStructure {
    type Error = InvalidGroupError;

    fn try_from(groups: Vec<MetricGroup>) -> Result<Self, Self::Error> {
        Self::new(groups)
    }
}

impl From<MetricStructure> for Vec<MetricGroup> {
    fn from(structure: MetricStructure) -> Self {
        structure.groups
    }
}

impl fmt::Display for MetricStructure {
    /// Renders as a meter expression that parses back to an equal structure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            group.fmt_operand(f)?;
        }
        Ok(())
    }
}

impl Add for MetricStructure {
    type Output = MetricStructure;

    /// Nests both operands as two groups, so `(a + b) + c` keeps `a + b` together.
    fn add(self, rhs: MetricStructure) -> MetricStructure {
        MetricStructure::from_parts(vec![MetricGroup::Nested(self), MetricGroup::Nested(rhs)])
    }
}

impl Mul for MetricStructure {
    type Output = MetricStructure;

    /// Subdivides every pulse of `self` by the whole of `rhs`.
    fn mul(self, rhs: MetricStructure) -> MetricStructure {
        self.multiply(&rhs)
    }
}

impl Mul<u32> for MetricStructure {
    type Output = MetricStructure;

    /// # Panics
    ///
    /// Panics if `rhs` is zero. Use [`MetricStructure::subdivide`] to get an error instead.
    fn mul(self, rhs: u32) -> MetricStructure {
        assert!(rhs > 0, "cannot subdivide a metric structure into 0 parts");
        self.multiply(&MetricStructure::from_parts(vec![MetricGroup::Pulses(rhs)]))
    }
}

impl Mul<MetricStructure> for u32 {
    type Output = MetricStructure;

    /// `n * s` is `n` copies of `s` as sibling groups.
    ///
    /// # Panics
    ///
    /// Panics if `self` is zero.
    fn mul(self, rhs: MetricStructure) -> MetricStructure {
        assert!(self > 0, "cannot repeat a metric structure 0 times");
        if self == 1 {
            rhs
        } else {
            rhs.repeated(self)
        }
    }
}
