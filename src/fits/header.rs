//! FITS header card structures and methods
//!
//! This module implements the 80-character card image model and the ordered
//! header that stores them. A header is a sequence of cards, each card a
//! keyword with an optional value and comment. Card order is significant and
//! is preserved through read, cut and write, so lookups go through a cached
//! index while mutation keeps the underlying vector authoritative.

use std::collections::HashMap;
use std::fmt;
use log::{debug, trace};

use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::keywords::{layout, names};

/// A typed FITS card value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Logical constant, written as T or F
    Logical(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Real(f64),
    /// Quoted character string, stored unescaped
    Str(String),
    /// No value (commentary cards, undefined values)
    Undefined,
}

impl Value {
    /// Integer view of this value, accepting integral reals
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Floating point view of this value
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of this value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Logical view of this value
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Value::Logical(v) => Some(*v),
            _ => None,
        }
    }
}

/// Represents a single header card
///
/// A card pairs a keyword (8 characters at most) with a value and an
/// optional comment. Commentary keywords (COMMENT, HISTORY and the blank
/// keyword) carry free text in the comment field and no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword, uppercase, trailing blanks trimmed
    pub keyword: String,
    /// Typed value, Undefined for commentary cards
    pub value: Value,
    /// Comment text after the value, or the full text of commentary cards
    pub comment: Option<String>,
}

impl Card {
    /// Creates a card with a value and no comment
    pub fn new(keyword: &str, value: Value) -> Self {
        Card {
            keyword: keyword.trim().to_uppercase(),
            value,
            comment: None,
        }
    }

    /// Creates a card with a value and a comment
    pub fn with_comment(keyword: &str, value: Value, comment: &str) -> Self {
        Card {
            keyword: keyword.trim().to_uppercase(),
            value,
            comment: Some(comment.to_string()),
        }
    }

    /// Creates a commentary card (COMMENT, HISTORY or blank keyword)
    pub fn commentary(keyword: &str, text: &str) -> Self {
        Card {
            keyword: keyword.trim().to_uppercase(),
            value: Value::Undefined,
            comment: Some(text.to_string()),
        }
    }

    /// Whether this card's keyword is a commentary keyword
    pub fn is_commentary(&self) -> bool {
        names::is_commentary(&self.keyword)
    }

    /// Parses one 80-byte card image
    ///
    /// # Arguments
    /// * `raw` - Exactly 80 bytes from a header block
    ///
    /// # Returns
    /// The parsed card, or an error when the bytes are not a valid card
    pub fn from_bytes(raw: &[u8]) -> CutoutResult<Card> {
        if raw.len() != layout::CARD_SIZE {
            return Err(CutoutError::InvalidCard(format!(
                "card image is {} bytes, expected {}", raw.len(), layout::CARD_SIZE)));
        }
        let text: String = raw.iter().map(|&b| b as char).collect();
        let keyword = text[..8].trim_end().to_uppercase();

        if names::is_commentary(&keyword) || &text[8..10] != "= " {
            // Commentary card or a keyword without a value indicator
            let body = text[8..].trim_end().to_string();
            return Ok(Card {
                keyword,
                value: Value::Undefined,
                comment: if body.is_empty() { None } else { Some(body) },
            });
        }

        let (value, comment) = parse_value_field(text[10..].trim_end())
            .map_err(|msg| CutoutError::InvalidCard(format!("{}: {:?}", msg, text.trim_end())))?;
        Ok(Card { keyword, value, comment })
    }

    /// Formats this card as an 80-byte card image
    pub fn to_bytes(&self) -> [u8; layout::CARD_SIZE] {
        let mut text = String::with_capacity(layout::CARD_SIZE);
        text.push_str(&format!("{:<8}", self.keyword));

        if self.is_commentary() || self.value == Value::Undefined {
            if let Some(comment) = &self.comment {
                text.push_str(comment);
            }
        } else {
            text.push_str("= ");
            text.push_str(&format_value(&self.value));
            if let Some(comment) = &self.comment {
                text.push_str(" / ");
                text.push_str(comment);
            }
        }

        let mut image = [b' '; layout::CARD_SIZE];
        for (i, b) in text.bytes().take(layout::CARD_SIZE).enumerate() {
            image[i] = b;
        }
        image
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let image = self.to_bytes();
        let text: String = image.iter().map(|&b| b as char).collect();
        write!(f, "{}", text.trim_end())
    }
}

/// Parses the value field of a card, returning the value and trailing comment
///
/// The field starts right after the value indicator. Strings are quoted with
/// single quotes, doubled to escape; the comment follows a slash.
fn parse_value_field(field: &str) -> Result<(Value, Option<String>), String> {
    let trimmed = field.trim_start();
    if trimmed.is_empty() {
        return Ok((Value::Undefined, None));
    }

    if let Some(rest) = trimmed.strip_prefix('\'') {
        return parse_string_value(rest);
    }

    // Unquoted value runs until a slash introduces the comment
    let (token_part, comment) = match trimmed.find('/') {
        Some(pos) => (trimmed[..pos].trim(), extract_comment(&trimmed[pos..])),
        None => (trimmed.trim(), None),
    };

    let value = match token_part {
        "" => Value::Undefined,
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        token => parse_number(token)?,
    };
    Ok((value, comment))
}

/// Parses a quoted string value, `rest` starting just after the open quote
fn parse_string_value(rest: &str) -> Result<(Value, Option<String>), String> {
    let chars: Vec<char> = rest.chars().collect();
    let mut content = String::new();
    let mut i = 0;
    let mut closed = false;
    while i < chars.len() {
        if chars[i] == '\'' {
            if i + 1 < chars.len() && chars[i + 1] == '\'' {
                content.push('\'');
                i += 2;
                continue;
            }
            closed = true;
            i += 1;
            break;
        }
        content.push(chars[i]);
        i += 1;
    }
    if !closed {
        return Err("unterminated string value".to_string());
    }
    let tail: String = chars[i..].iter().collect();
    let comment = tail.find('/').and_then(|pos| extract_comment(&tail[pos..]));
    // Trailing blanks inside the quotes are not significant
    Ok((Value::Str(content.trim_end().to_string()), comment))
}

/// Pulls the comment text out of a `/ ...` tail
fn extract_comment(tail: &str) -> Option<String> {
    let text = tail.trim_start_matches('/').trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Parses an unquoted numeric token, accepting Fortran D exponents
fn parse_number(token: &str) -> Result<Value, String> {
    if let Ok(v) = token.parse::<i64>() {
        return Ok(Value::Integer(v));
    }
    let normalized = token.replace(['D', 'd'], "E");
    normalized
        .parse::<f64>()
        .map(Value::Real)
        .map_err(|_| format!("unparseable value token '{}'", token))
}

/// Formats a value for the fixed-format value field (columns 11-30)
fn format_value(value: &Value) -> String {
    match value {
        Value::Logical(true) => format!("{:>20}", "T"),
        Value::Logical(false) => format!("{:>20}", "F"),
        Value::Integer(v) => format!("{:>20}", v),
        Value::Real(v) => format!("{:>20}", format_real(*v)),
        Value::Str(s) => {
            let escaped = s.replace('\'', "''");
            // Minimum eight characters between the quotes
            format!("'{:<8}'", escaped)
        }
        Value::Undefined => String::new(),
    }
}

/// Formats a real so it always carries a decimal point or exponent
fn format_real(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e16 || v.abs() < 1e-6) {
        return format!("{:E}", v);
    }
    let text = format!("{}", v);
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// An ordered FITS header
///
/// Cards are kept in insertion order. A keyword index caches the first
/// occurrence of each keyword for fast lookup; commentary keywords may
/// repeat and are only reachable by iteration.
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// Cards in file order, END excluded
    cards: Vec<Card>,
    /// First occurrence of each keyword
    index: HashMap<String, usize>,
}

impl Header {
    /// Creates an empty header
    pub fn new() -> Self {
        Header { cards: Vec::new(), index: HashMap::new() }
    }

    /// Number of cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the header holds no cards
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// All cards in order
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Appends a card at the end
    pub fn push(&mut self, card: Card) {
        trace!("Appending header card {}", card.keyword);
        if !card.is_commentary() {
            self.index.entry(card.keyword.clone()).or_insert(self.cards.len());
        }
        self.cards.push(card);
    }

    /// Whether a keyword is present
    pub fn contains(&self, keyword: &str) -> bool {
        self.index.contains_key(keyword)
    }

    /// First card with the given keyword
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        self.index.get(keyword).map(|&i| &self.cards[i])
    }

    /// Position of the first card with the given keyword
    pub fn position(&self, keyword: &str) -> Option<usize> {
        self.index.get(keyword).copied()
    }

    /// Value of the first card with the given keyword
    pub fn value(&self, keyword: &str) -> Option<&Value> {
        self.get(keyword).map(|card| &card.value)
    }

    /// Integer value for a keyword, if present and integral
    pub fn integer(&self, keyword: &str) -> Option<i64> {
        self.value(keyword).and_then(Value::as_integer)
    }

    /// Floating point value for a keyword
    pub fn real(&self, keyword: &str) -> Option<f64> {
        self.value(keyword).and_then(Value::as_real)
    }

    /// String value for a keyword, trimmed
    pub fn string(&self, keyword: &str) -> Option<String> {
        self.value(keyword)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    }

    /// Logical value for a keyword
    pub fn logical(&self, keyword: &str) -> Option<bool> {
        self.value(keyword).and_then(Value::as_logical)
    }

    /// Integer value that must be present, for structural keywords
    pub fn required_integer(&self, keyword: &str) -> CutoutResult<i64> {
        self.integer(keyword).ok_or_else(|| {
            CutoutError::SourceAccessError(format!("missing or non-integer {} card", keyword))
        })
    }

    /// Updates the value of the first matching card in place, keeping its
    /// position and comment, or appends a new card when absent
    pub fn set_value(&mut self, keyword: &str, value: Value) {
        match self.index.get(keyword).copied() {
            Some(i) => {
                debug!("Rewriting header card {} in place", keyword);
                self.cards[i].value = value;
            }
            None => self.push(Card::new(keyword, value)),
        }
    }

    /// Inserts a card right after the first occurrence of an anchor keyword,
    /// or appends when the anchor is absent
    pub fn insert_after(&mut self, anchor: &str, card: Card) {
        match self.index.get(anchor).copied() {
            Some(i) => {
                self.cards.insert(i + 1, card);
                self.rebuild_index();
            }
            None => self.push(card),
        }
    }

    /// Removes every card with the given keyword
    ///
    /// # Returns
    /// The number of cards removed
    pub fn remove_all(&mut self, keyword: &str) -> usize {
        let before = self.cards.len();
        self.cards.retain(|card| card.keyword != keyword);
        let removed = before - self.cards.len();
        if removed > 0 {
            debug!("Removed {} {} card(s)", removed, keyword);
            self.rebuild_index();
        }
        removed
    }

    /// Removes every card whose keyword satisfies a predicate, preserving
    /// the order of the survivors
    ///
    /// # Returns
    /// The removed cards in their original order
    pub fn drain_matching<F>(&mut self, mut predicate: F) -> Vec<Card>
    where
        F: FnMut(&str) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.cards.len());
        for card in self.cards.drain(..) {
            if predicate(&card.keyword) {
                removed.push(card);
            } else {
                kept.push(card);
            }
        }
        self.cards = kept;
        self.rebuild_index();
        removed
    }

    /// Inserts a run of cards starting right after the anchor keyword,
    /// preserving their given order
    pub fn insert_all_after(&mut self, anchor: &str, cards: Vec<Card>) {
        match self.index.get(anchor).copied() {
            Some(i) => {
                let mut at = i + 1;
                for card in cards {
                    self.cards.insert(at, card);
                    at += 1;
                }
                self.rebuild_index();
            }
            None => {
                for card in cards {
                    self.push(card);
                }
            }
        }
    }

    /// Axis lengths declared by NAXIS/NAXISn, in axis order (axis 1 first)
    pub fn axis_lengths(&self) -> CutoutResult<Vec<usize>> {
        let naxis = self.required_integer(names::NAXIS)?;
        if !(0..=999).contains(&naxis) {
            return Err(CutoutError::SourceAccessError(format!(
                "NAXIS value {} outside the valid range", naxis)));
        }
        let mut lengths = Vec::with_capacity(naxis as usize);
        for axis in 1..=naxis {
            let key = format!("{}{}", names::NAXIS, axis);
            let len = self.required_integer(&key)?;
            if len < 0 {
                return Err(CutoutError::SourceAccessError(format!(
                    "negative {} value {}", key, len)));
            }
            lengths.push(len as usize);
        }
        Ok(lengths)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, card) in self.cards.iter().enumerate() {
            if !card.is_commentary() {
                self.index.entry(card.keyword.clone()).or_insert(i);
            }
        }
    }
}
