//! Meter arithmetic expression parser.
//!
//! Parses expressions such as `"(2 + 3 + 2) * 3"` into a [`MeterArithmeticGroup`]
//! tree. Unlike ordinary arithmetic, addition is not associative here:
//! `(4+2)+3`, `4+(2+3)` and `4+2+3` are three different meters, because
//! every parenthesized sum becomes its own level of metric grouping.
//!
//! Grammar (whitespace is ignored everywhere, including inside numbers):
//!
//! ```text
//! expr   := term ('+' term)*
//! term   := factor ('*' factor)*
//! factor := INTEGER | '(' expr ')'
//! ```

use super::error::{InvalidGroupError, ParseError};
use super::structure::{MetricGroup, MetricStructure};
use std::fmt;
use std::str::FromStr;

/// Deepest parenthesis nesting [`MeterArithmeticGroup::parse`] accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parsed form of a meter arithmetic expression.
///
/// A run of `+` or `*` at the same syntactic level is gathered into one node,
/// so `2*3*4` is a single three-factor [`Product`](Self::Product). Child order
/// is significant in both cases: sums list groups in time order, products
/// list strata from the top level down.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeterArithmeticGroup {
    /// A flat group of this many pulses. Always positive when produced by the parser.
    Number(u32),
    /// Additive grouping; at least two children when produced by the parser.
    Sum(Vec<MeterArithmeticGroup>),
    /// Multiplicative subdivision; each factor subdivides every pulse of the ones before it.
    Product(Vec<MeterArithmeticGroup>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Number(u32),
    Plus,
    Star,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    position: usize,
}

impl TokenKind {
    fn symbol(&self) -> char {
        match self {
            TokenKind::Number(_) => '#',
            TokenKind::Plus => '+',
            TokenKind::Star => '*',
            TokenKind::Open => '(',
            TokenKind::Close => ')',
        }
    }
}

/// Splits the input into tokens, dropping whitespace first so that digits
/// separated only by whitespace form a single number.
fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<(usize, char)> = input
        .char_indices()
        .filter(|(_, c)| !c.is_whitespace())
        .collect();

    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (position, c) = chars[i];
        let kind = match c {
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '(' => TokenKind::Open,
            ')' => TokenKind::Close,
            '0'..='9' => {
                let mut digits = String::new();
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    digits.push(chars[i].1);
                    i += 1;
                }
                let value: u32 = digits.parse().map_err(|_| ParseError::NumberTooLarge {
                    digits: digits.clone(),
                    position,
                })?;
                if value == 0 {
                    return Err(ParseError::ZeroGroup { position });
                }
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position,
                });
                continue;
            }
            character => {
                return Err(ParseError::InvalidCharacter {
                    character,
                    position,
                })
            }
        };
        tokens.push(Token { kind, position });
        i += 1;
    }
    Ok(tokens)
}

/// Recursive descent over the token stream.
struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.cursor).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<MeterArithmeticGroup, ParseError> {
        let mut terms = vec![self.parse_term()?];
        while matches!(self.peek(), Some(Token { kind: TokenKind::Plus, .. })) {
            self.advance();
            terms.push(self.parse_term()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            MeterArithmeticGroup::Sum(terms)
        })
    }

    fn parse_term(&mut self) -> Result<MeterArithmeticGroup, ParseError> {
        let mut factors = vec![self.parse_factor()?];
        while matches!(self.peek(), Some(Token { kind: TokenKind::Star, .. })) {
            self.advance();
            factors.push(self.parse_factor()?);
        }
        Ok(if factors.len() == 1 {
            factors.remove(0)
        } else {
            MeterArithmeticGroup::Product(factors)
        })
    }

    fn parse_factor(&mut self) -> Result<MeterArithmeticGroup, ParseError> {
        let token = self.advance().ok_or(ParseError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(value) => Ok(MeterArithmeticGroup::Number(value)),
            TokenKind::Open => {
                if self.depth == MAX_NESTING_DEPTH {
                    return Err(ParseError::TooDeeplyNested {
                        position: token.position,
                    });
                }
                self.depth += 1;
                let inner = self.parse_expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::Close,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(unexpected(other)),
                    None => Err(ParseError::UnclosedParenthesis {
                        position: token.position,
                    }),
                }
            }
            other => Err(ParseError::ExpectedOperand {
                found: other.symbol(),
                position: token.position,
            }),
        }
    }
}

fn unexpected(token: Token) -> ParseError {
    let found = match token.kind {
        TokenKind::Number(value) => value.to_string(),
        other => other.symbol().to_string(),
    };
    ParseError::UnexpectedToken {
        found,
        position: token.position,
    }
}

impl MeterArithmeticGroup {
    /// Parses a meter arithmetic expression.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for empty input, characters other than digits,
    /// `+`, `*`, parentheses and whitespace, leading/trailing/adjacent
    /// operators, unbalanced parentheses, zero or oversized numbers, and
    /// parentheses nested deeper than [`MAX_NESTING_DEPTH`].
    ///
    /// # Examples
    ///
    /// ```
    /// use meterkit::meter::MeterArithmeticGroup;
    ///
    /// let tree = MeterArithmeticGroup::parse("(2 + 3 + 2) * 3").unwrap();
    /// assert_eq!(tree.to_string(), "(2 + 3 + 2) * 3");
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut parser = Parser {
            tokens,
            cursor: 0,
            depth: 0,
        };
        let tree = parser.parse_expr()?;

        match parser.peek() {
            None => Ok(tree),
            Some(Token {
                kind: TokenKind::Close,
                position,
            }) => Err(ParseError::UnmatchedCloseParenthesis { position }),
            Some(token) => Err(unexpected(token)),
        }
    }

    /// Converts the parsed tree into a [`MetricStructure`].
    ///
    /// Sums become additive groupings, products are folded left to right with
    /// structure multiplication. With `break_up_large_numbers`, every number
    /// above 3 is replaced by its decomposition into 2s and a trailing 3.
    pub fn to_metric_structure(
        &self,
        break_up_large_numbers: bool,
    ) -> Result<MetricStructure, InvalidGroupError> {
        match self {
            MeterArithmeticGroup::Number(value) => MetricStructure::with_break_up(
                vec![MetricGroup::Pulses(*value)],
                break_up_large_numbers,
            ),
            MeterArithmeticGroup::Sum(terms) => {
                let groups = terms
                    .iter()
                    .map(|term| {
                        term.to_metric_structure(break_up_large_numbers)
                            .map(MetricGroup::Nested)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                MetricStructure::with_break_up(groups, break_up_large_numbers)
            }
            MeterArithmeticGroup::Product(factors) => {
                let mut factors = factors
                    .iter()
                    .map(|factor| factor.to_metric_structure(break_up_large_numbers));
                let first = factors.next().ok_or(InvalidGroupError::Empty)??;
                factors.try_fold(first, |product, factor| -> Result<_, InvalidGroupError> {
                    Ok(product * factor?)
                })
            }
        }
    }

    /// Number of pulses the expression describes.
    pub fn num_pulses(&self) -> u64 {
        match self {
            MeterArithmeticGroup::Number(value) => u64::from(*value),
            MeterArithmeticGroup::Sum(terms) => terms.iter().map(Self::num_pulses).sum(),
            MeterArithmeticGroup::Product(factors) => factors.iter().map(Self::num_pulses).product(),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parenthesize_products: bool) -> fmt::Result {
        let needs_parens = match self {
            MeterArithmeticGroup::Number(_) => false,
            MeterArithmeticGroup::Sum(_) => true,
            MeterArithmeticGroup::Product(_) => parenthesize_products,
        };
        if needs_parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for MeterArithmeticGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeterArithmeticGroup::Number(value) => write!(f, "{}", value),
            MeterArithmeticGroup::Sum(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    term.fmt_operand(f, false)?;
                }
                Ok(())
            }
            MeterArithmeticGroup::Product(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" * ")?;
                    }
                    factor.fmt_operand(f, true)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for MeterArithmeticGroup {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MeterArithmeticGroup::{Number, Product, Sum};

    #[test]
    fn test_parse_single_number() {
        assert_eq!(MeterArithmeticGroup::parse("7").unwrap(), Number(7));
        assert_eq!(MeterArithmeticGroup::parse(" ((7)) ").unwrap(), Number(7));
    }

    #[test]
    fn test_whitespace_is_stripped_before_parsing() {
        assert_eq!(MeterArithmeticGroup::parse("1 2").unwrap(), Number(12));
        assert_eq!(
            MeterArithmeticGroup::parse(" 2 +\t3 ").unwrap(),
            Sum(vec![Number(2), Number(3)])
        );
    }

    #[test]
    fn test_sum_grouping_is_not_associative() {
        let left = MeterArithmeticGroup::parse("(4+2)+3").unwrap();
        let right = MeterArithmeticGroup::parse("4+(2+3)").unwrap();
        let flat = MeterArithmeticGroup::parse("4+2+3").unwrap();

        assert_eq!(left, Sum(vec![Sum(vec![Number(4), Number(2)]), Number(3)]));
        assert_eq!(right, Sum(vec![Number(4), Sum(vec![Number(2), Number(3)])]));
        assert_eq!(flat, Sum(vec![Number(4), Number(2), Number(3)]));
        assert_ne!(left, right);
        assert_ne!(left, flat);
        assert_ne!(right, flat);
    }

    fn nested(depth: usize, inner: &str) -> String {
        format!("{}{}{}", "(".repeat(depth), inner, ")".repeat(depth))
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        assert_eq!(
            MeterArithmeticGroup::parse(&nested(MAX_NESTING_DEPTH, "2")).unwrap(),
            Number(2)
        );
        assert_eq!(
            MeterArithmeticGroup::parse(&nested(MAX_NESTING_DEPTH + 1, "2")),
            Err(ParseError::TooDeeplyNested {
                position: MAX_NESTING_DEPTH
            })
        );
        assert_eq!(
            MeterArithmeticGroup::parse(&nested(10_000, "2")),
            Err(ParseError::TooDeeplyNested {
                position: MAX_NESTING_DEPTH
            })
        );
    }

    #[test]
    fn test_deeply_nested_sums_convert() {
        // 2+(2+(2+...)) one level per parenthesis
        let mut expression = String::from("2");
        for _ in 0..MAX_NESTING_DEPTH {
            expression = format!("2+({})", expression);
        }
        let tree = MeterArithmeticGroup::parse(&expression).unwrap();
        let structure = tree.to_metric_structure(false).unwrap();
        assert_eq!(structure.num_pulses(), 2 * (MAX_NESTING_DEPTH + 1));
    }

    #[test]
    fn test_multiplication_run_is_one_node() {
        assert_eq!(
            MeterArithmeticGroup::parse("2*3*4").unwrap(),
            Product(vec![Number(2), Number(3), Number(4)])
        );
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            MeterArithmeticGroup::parse("2*3+2").unwrap(),
            Sum(vec![Product(vec![Number(2), Number(3)]), Number(2)])
        );
        assert_eq!(
            MeterArithmeticGroup::parse("(2+3+2)*3").unwrap(),
            Product(vec![Sum(vec![Number(2), Number(3), Number(2)]), Number(3)])
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(MeterArithmeticGroup::parse(""), Err(ParseError::Empty));
        assert_eq!(MeterArithmeticGroup::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            MeterArithmeticGroup::parse("+2+3"),
            Err(ParseError::ExpectedOperand {
                found: '+',
                position: 0
            })
        );
        assert_eq!(
            MeterArithmeticGroup::parse("2++3"),
            Err(ParseError::ExpectedOperand {
                found: '+',
                position: 2
            })
        );
        assert_eq!(
            MeterArithmeticGroup::parse("2*+3"),
            Err(ParseError::ExpectedOperand {
                found: '+',
                position: 2
            })
        );
        assert_eq!(MeterArithmeticGroup::parse("2+3+"), Err(ParseError::UnexpectedEnd));
        assert_eq!(
            MeterArithmeticGroup::parse("(2+3"),
            Err(ParseError::UnclosedParenthesis { position: 0 })
        );
        assert_eq!(
            MeterArithmeticGroup::parse("2+3)"),
            Err(ParseError::UnmatchedCloseParenthesis { position: 3 })
        );
        assert_eq!(
            MeterArithmeticGroup::parse("2 - 3"),
            Err(ParseError::InvalidCharacter {
                character: '-',
                position: 2
            })
        );
        assert_eq!(
            MeterArithmeticGroup::parse("(2)(3)"),
            Err(ParseError::UnexpectedToken {
                found: "(".to_string(),
                position: 3
            })
        );
        assert!(matches!(
            MeterArithmeticGroup::parse("()"),
            Err(ParseError::ExpectedOperand { found: ')', .. })
        ));
    }

    #[test]
    fn test_zero_and_overflow_are_rejected() {
        assert_eq!(
            MeterArithmeticGroup::parse("2+0"),
            Err(ParseError::ZeroGroup { position: 2 })
        );
        assert!(matches!(
            MeterArithmeticGroup::parse("99999999999"),
            Err(ParseError::NumberTooLarge { position: 0, .. })
        ));
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        for input in ["(4+2)+3", "4+(2+3)", "4+2+3", "(2+3+2)*3", "(2*3)*4", "2*(3+2)*2"] {
            let tree = MeterArithmeticGroup::parse(input).unwrap();
            let reparsed = MeterArithmeticGroup::parse(&tree.to_string()).unwrap();
            assert_eq!(tree, reparsed, "display of {input} was {tree}");
        }
    }

    #[test]
    fn test_to_metric_structure_pulse_count() {
        let tree = MeterArithmeticGroup::parse("2*3*4").unwrap();
        assert_eq!(tree.num_pulses(), 24);
        assert_eq!(tree.to_metric_structure(false).unwrap().num_pulses(), 24);

        let additive = MeterArithmeticGroup::parse("(2+3+2)*3").unwrap();
        assert_eq!(additive.to_metric_structure(true).unwrap().num_pulses(), 21);
    }

    #[test]
    fn test_from_str() {
        let tree: MeterArithmeticGroup = "3*2".parse().unwrap();
        assert_eq!(tree, Product(vec![Number(3), Number(2)]));
    }
}
