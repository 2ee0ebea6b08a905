//! Error types for meter parsing, structure construction, and strata handling.
//!
//! Every failure in this crate is an input error reported synchronously.
//! Nothing here is retried or recovered from; callers see the error as-is.

use thiserror::Error;

/// Errors produced while parsing a meter arithmetic expression.
///
/// Positions are byte offsets into the string the caller passed in,
/// before any whitespace was stripped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The expression was empty or contained only whitespace.
    #[error("cannot parse an empty meter expression")]
    Empty,

    /// A character outside digits, `+`, `*`, parentheses and whitespace.
    #[error("invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },

    /// An operator or `)` appeared where a number or `(` was required.
    /// Covers leading operators and adjacent operators.
    #[error("expected a number or '(' at position {position}, found '{found}'")]
    ExpectedOperand { found: char, position: usize },

    /// A complete operand was followed by something that cannot continue it,
    /// such as `2(3)` or `(2)(3)`.
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// The expression ended where an operand was still required
    /// (trailing operator, or an empty pair of parentheses at the end).
    #[error("unexpected end of expression: expected a number or '('")]
    UnexpectedEnd,

    /// An opening parenthesis was never closed.
    #[error("unclosed '(' at position {position}")]
    UnclosedParenthesis { position: usize },

    /// A closing parenthesis had no matching opening parenthesis.
    #[error("unmatched ')' at position {position}")]
    UnmatchedCloseParenthesis { position: usize },

    /// A group of zero pulses.
    #[error("group sizes must be positive, found 0 at position {position}")]
    ZeroGroup { position: usize },

    /// A number that does not fit in a `u32`.
    #[error("number '{digits}' at position {position} is too large")]
    NumberTooLarge { digits: String, position: usize },

    /// Parentheses nested deeper than [`MAX_NESTING_DEPTH`](super::MAX_NESTING_DEPTH).
    #[error("parentheses nested too deeply at position {position}")]
    TooDeeplyNested { position: usize },
}

/// Errors produced when building a [`MetricStructure`](super::MetricStructure).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGroupError {
    /// A group of zero pulses.
    #[error("metric groups must contain a positive number of pulses, found 0")]
    Zero,

    /// A structure with no groups at all.
    #[error("a metric structure needs at least one group")]
    Empty,
}

/// Errors produced when rhythmic strata cannot be used as requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStrataError {
    /// Barlow-style arrays only accept evenly divided strata.
    #[error("Barlow-style indispensability needs integer strata, but stratum {index} is additive")]
    AdditiveStratum { index: usize },

    /// An additive stratum with no groups, e.g. `()`.
    #[error("stratum {index} is an additive stratum with no groups")]
    EmptyAdditiveStratum { index: usize },

    /// No strata were given.
    #[error("at least one rhythmic stratum is required")]
    NoStrata,

    /// Metric coherence needs a positive number of bars per minute.
    #[error("bar tempo must be positive")]
    ZeroBarTempo,

    /// Reaching a shared pulse needs a subdivision too large for one stratum.
    #[error("cannot subdivide by {factor} to reach a shared pulse")]
    SubdivisionTooFine { factor: u64 },

    /// The pulse rates of the two meters, or their common multiple, overflow a `u64`.
    #[error("pulse rates are too large to find a shared pulse")]
    PulseRateOverflow,
}

/// Umbrella error for the full expression-to-array pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    InvalidGroup(#[from] InvalidGroupError),

    #[error(transparent)]
    InvalidStrata(#[from] InvalidStrataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_position() {
        let err = ParseError::ExpectedOperand {
            found: '+',
            position: 2,
        };
        assert_eq!(
            err.to_string(),
            "expected a number or '(' at position 2, found '+'"
        );
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: MeterError = InvalidGroupError::Empty.into();
        assert_eq!(err.to_string(), "a metric structure needs at least one group");
        assert!(matches!(err, MeterError::InvalidGroup(InvalidGroupError::Empty)));
    }
}
