//! Filter chain parser.
//!
//! Grammar (keywords case-insensitive, whitespace free-form):
//!
//! ```text
//! chain      := <empty> | filter (connective filter)*
//! connective := "AND" | "OR"
//! filter     := pos<N> | neg<N> | liquidity | runup_bounded | quality_exclude
//!             | market_cap | operating_income | quality
//!             | value_cond | price_cond | spc
//! ```
//!
//! The first filter carries no connective and is stored as AND.

use crate::domain::error::ParseError;
use crate::domain::filter_engine::{FilterSpec, Logic};
use crate::domain::predicate::{FilterKind, Thresholds};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.peek().is_none()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn take_word(&mut self) -> &'a str {
        let rest = self.remaining();
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{c}'"))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_filter(&mut self) -> Result<FilterKind, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.take_word();
        if word.is_empty() {
            return Err(ParseError {
                message: format!("expected filter name, found {}", self.found()),
                position: start,
            });
        }
        FilterKind::from_name(word).ok_or_else(|| ParseError {
            message: format!("unknown filter '{word}'"),
            position: start,
        })
    }

    fn parse_connective(&mut self) -> Result<Logic, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.take_word();
        if word.is_empty() {
            return Err(ParseError {
                message: format!("expected AND or OR, found {}", self.found()),
                position: start,
            });
        }
        word.parse::<Logic>().map_err(|_| ParseError {
            message: format!("expected AND or OR, found '{word}'"),
            position: start,
        })
    }

    fn parse_chain(&mut self) -> Result<Vec<(FilterKind, Logic)>, ParseError> {
        let mut chain = Vec::new();
        if self.at_end() {
            return Ok(chain);
        }
        chain.push((self.parse_filter()?, Logic::And));
        while !self.at_end() {
            let logic = self.parse_connective()?;
            let kind = self.parse_filter()?;
            chain.push((kind, logic));
        }
        Ok(chain)
    }
}

/// Parse a chain of filter names and connectives into labelled specs.
pub fn parse(input: &str, thresholds: &Thresholds) -> Result<Vec<FilterSpec>, ParseError> {
    let chain = Parser::new(input).parse_chain()?;
    Ok(chain
        .into_iter()
        .map(|(kind, logic)| FilterSpec::new(kind, logic, thresholds))
        .collect())
}
