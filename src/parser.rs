//! Pattern parsing with integrated automaton construction.
//!
//! Recursive descent over four precedence levels, lowest first:
//!
//! - alternation: `E2 ('|' E2)*`
//! - sequence: `E1 E1*`
//! - piece: `E0` with an optional quantifier (`*`, `+`, `?`, `{m,n}`)
//! - atom: literal byte, `.`, escape, character class, or `( ... )`
//!
//! Every production returns a [`ScratchNfa`] with freshly allocated states;
//! the parser owns the identifier counter, so pieces composed together never
//! collide. Quantifier repetition is the only place that renumbers: each
//! extra copy of a piece gets fresh identifiers before being chained on.

use std::collections::BTreeMap;

use crate::automaton::{EdgeTable, ScratchNfa, StateId, EPSILON};
use crate::CompileError;

/// Upper bound for `{m,n}` quantifier counts.
const QUANTIFIER_MAX: u32 = 1000;

/// Parse `pattern` into a scratch automaton, consuming the whole input.
pub(crate) fn parse(pattern: &[u8]) -> Result<ScratchNfa, CompileError> {
    let mut parser = Parser::new(pattern);
    let nfa = parser.parse_alternation()?;
    if !parser.at_end() {
        // A stray `)` or `]` leaves a suffix behind; never accept it silently.
        return Err(CompileError::invalid_argument("expected end of string"));
    }
    Ok(nfa)
}

/// A single escape resolves to either one byte or a set of bytes.
enum EscapeItem {
    Byte(u8),
    Class(Vec<u8>),
}

struct Parser<'a> {
    pattern: &'a [u8],
    pos: usize,
    next_state: StateId,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a [u8]) -> Self {
        Self {
            pattern,
            pos: 0,
            next_state: 0,
        }
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.pattern.get(self.pos + offset).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume `wanted` if it is next.
    #[inline]
    fn eat(&mut self, wanted: u8) -> bool {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn fresh_state(&mut self) -> StateId {
        let state = self.next_state;
        self.next_state += 1;
        state
    }

    /// A one-state piece accepting only the empty string.
    fn empty_piece(&mut self) -> ScratchNfa {
        let state = self.fresh_state();
        ScratchNfa::new(BTreeMap::from([(state, EdgeTable::new())]), state, state)
    }

    /// A two-state piece accepting exactly one byte drawn from `bytes`.
    fn byte_atom<I>(&mut self, bytes: I) -> ScratchNfa
    where
        I: IntoIterator<Item = u8>,
    {
        let start = self.fresh_state();
        let stop = self.fresh_state();
        let mut table = EdgeTable::new();
        for byte in bytes {
            table.push(byte, stop);
        }
        ScratchNfa::new(
            BTreeMap::from([(start, table), (stop, EdgeTable::new())]),
            start,
            stop,
        )
    }

    /// Alternation: `E2 ('|' E2)*`.
    fn parse_alternation(&mut self) -> Result<ScratchNfa, CompileError> {
        let mut nfa = self.parse_sequence()?;
        while self.eat(b'|') {
            let rhs = self.parse_sequence()?;
            let initial_state = self.fresh_state();
            let final_state = self.fresh_state();
            nfa.merge(rhs, initial_state, final_state);
        }
        Ok(nfa)
    }

    /// Sequence: chain pieces until the alternative ends.
    fn parse_sequence(&mut self) -> Result<ScratchNfa, CompileError> {
        let mut nfa = self.parse_piece()?;
        loop {
            match self.peek() {
                None | Some(b')') | Some(b'|') => return Ok(nfa),
                Some(_) => {
                    let next = self.parse_piece()?;
                    nfa.chain(next);
                }
            }
        }
    }

    /// Piece: an atom with at most one quantifier. A second quantifier in a
    /// row lands back in [`Parser::parse_atom`], which rejects it.
    fn parse_piece(&mut self) -> Result<ScratchNfa, CompileError> {
        let mut piece = self.parse_atom()?;
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(self.starred(piece))
            }
            Some(b'+') => {
                self.pos += 1;
                piece.add_edge(EPSILON, piece.final_state(), piece.initial_state());
                Ok(piece)
            }
            Some(b'?') => {
                self.pos += 1;
                piece.add_edge(EPSILON, piece.initial_state(), piece.final_state());
                Ok(piece)
            }
            Some(b'{') => {
                self.pos += 1;
                self.parse_repeat(piece)
            }
            _ => Ok(piece),
        }
    }

    fn parse_atom(&mut self) -> Result<ScratchNfa, CompileError> {
        let Some(next) = self.peek() else {
            return Ok(self.empty_piece());
        };
        match next {
            // An alternative may be empty; leave the delimiter for the caller.
            b')' | b'|' => Ok(self.empty_piece()),
            b'(' => {
                self.pos += 1;
                let group = self.parse_alternation()?;
                if !self.eat(b')') {
                    return Err(CompileError::invalid_argument("unmatched parens"));
                }
                Ok(group)
            }
            b'.' => {
                self.pos += 1;
                // Everything except byte 0, which is the epsilon label.
                Ok(self.byte_atom(1..=255))
            }
            b'[' => {
                self.pos += 1;
                self.parse_character_class()
            }
            b']' => Err(CompileError::invalid_argument("unmatched square bracket")),
            b'*' | b'+' => Err(CompileError::invalid_argument(
                "Kleene operator in invalid position",
            )),
            b'?' => Err(CompileError::invalid_argument(
                "question mark operator in invalid position",
            )),
            b'{' => Err(CompileError::invalid_argument(
                "curly brackets in invalid position",
            )),
            b'^' | b'$' => Err(CompileError::invalid_argument(
                "anchors are disallowed in this position",
            )),
            b'\\' => {
                self.pos += 1;
                match self.parse_escape(false)? {
                    EscapeItem::Byte(byte) => Ok(self.byte_atom([byte])),
                    EscapeItem::Class(bytes) => Ok(self.byte_atom(bytes)),
                }
            }
            byte => {
                self.pos += 1;
                Ok(self.byte_atom([byte]))
            }
        }
    }

    /// Character class, after the opening `[` has been consumed.
    ///
    /// A negated class starts with an edge for every byte `1..=255` and
    /// removes the listed ones; a plain class starts empty and adds them.
    fn parse_character_class(&mut self) -> Result<ScratchNfa, CompileError> {
        let start = self.fresh_state();
        let stop = self.fresh_state();
        let mut table = EdgeTable::new();

        let negated = self.eat(b'^');
        if negated {
            for byte in 1..=255u8 {
                table.push(byte, stop);
            }
        }

        loop {
            match self.peek() {
                None => return Err(CompileError::invalid_argument("unmatched square bracket")),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }

            let item = match self.bump() {
                Some(b'\\') => self.parse_escape(true)?,
                Some(byte) => EscapeItem::Byte(byte),
                None => return Err(CompileError::invalid_argument("unmatched square bracket")),
            };

            // `c-d` ranges are recognised but not supported; a trailing `-`
            // is an ordinary member.
            if self.peek() == Some(b'-') && self.peek_at(1).is_some_and(|byte| byte != b']') {
                return Err(CompileError::unimplemented("ranges in character classes"));
            }

            let apply = |table: &mut EdgeTable, byte: u8| {
                if negated {
                    table.clear_label(byte);
                } else {
                    table.push(byte, stop);
                }
            };
            match item {
                EscapeItem::Byte(byte) => apply(&mut table, byte),
                EscapeItem::Class(bytes) => {
                    for byte in bytes {
                        apply(&mut table, byte);
                    }
                }
            }
        }

        Ok(ScratchNfa::new(
            BTreeMap::from([(start, table), (stop, EdgeTable::new())]),
            start,
            stop,
        ))
    }

    /// Escape, after the backslash has been consumed. Inside classes `\b`
    /// (backspace) is additionally allowed, and class escapes contribute
    /// their whole byte set.
    fn parse_escape(&mut self, in_class: bool) -> Result<EscapeItem, CompileError> {
        let Some(code) = self.bump() else {
            return Err(CompileError::invalid_argument("invalid escape code"));
        };
        let item = match code {
            b'\\' | b'^' | b'$' | b'.' | b'(' | b')' | b'[' | b']' | b'{' | b'}' | b'|' => {
                EscapeItem::Byte(code)
            }
            b't' => EscapeItem::Byte(b'\t'),
            b'r' => EscapeItem::Byte(b'\r'),
            b'n' => EscapeItem::Byte(b'\n'),
            b'v' => EscapeItem::Byte(0x0B),
            b'f' => EscapeItem::Byte(0x0C),
            b'b' if in_class => EscapeItem::Byte(0x08),
            b'd' => EscapeItem::Class(digit_bytes()),
            b'D' => EscapeItem::Class(negated_bytes(&digit_bytes())),
            b'w' => EscapeItem::Class(word_bytes()),
            b'W' => EscapeItem::Class(negated_bytes(&word_bytes())),
            b's' => EscapeItem::Class(space_bytes().to_vec()),
            b'S' => EscapeItem::Class(negated_bytes(&space_bytes())),
            b'x' => EscapeItem::Byte(self.parse_hex_escape()?),
            b'0'..=b'9' => {
                return Err(CompileError::invalid_argument(
                    "backreferences are not supported",
                ))
            }
            _ => return Err(CompileError::invalid_argument("invalid escape code")),
        };
        Ok(item)
    }

    /// `\xHH`, both digits required, case-insensitive.
    fn parse_hex_escape(&mut self) -> Result<u8, CompileError> {
        let high = self.hex_digit()?;
        let low = self.hex_digit()?;
        let value = (high << 4) | low;
        if value == 0 {
            // Byte 0 is the epsilon label and can never be a literal edge.
            return Err(CompileError::invalid_argument("invalid escape code"));
        }
        Ok(value)
    }

    fn hex_digit(&mut self) -> Result<u8, CompileError> {
        match self.bump() {
            Some(byte @ b'0'..=b'9') => Ok(byte - b'0'),
            Some(byte @ b'a'..=b'f') => Ok(byte - b'a' + 10),
            Some(byte @ b'A'..=b'F') => Ok(byte - b'A' + 10),
            _ => Err(CompileError::invalid_argument("invalid hex digit")),
        }
    }

    /// Kleene star: rename the piece's initial state to its final state,
    /// collapsing entry and exit into one looping state.
    fn starred(&mut self, mut piece: ScratchNfa) -> ScratchNfa {
        let initial_state = piece.initial_state();
        let final_state = piece.final_state();
        piece.rename_state(initial_state, final_state);
        piece
    }

    /// `{m,n}` quantifier, after the opening `{` has been consumed.
    fn parse_repeat(&mut self, piece: ScratchNfa) -> Result<ScratchNfa, CompileError> {
        let min = self.parse_repeat_count()?;
        let has_comma = self.eat(b',');
        let max = if has_comma {
            self.parse_repeat_count()?
        } else {
            None
        };
        if !self.eat(b'}') {
            return Err(CompileError::invalid_argument("invalid quantifier"));
        }
        match (min, has_comma, max) {
            // `{}` and `{,}` both mean star.
            (None, _, None) => Ok(self.starred(piece)),
            (Some(min), false, None) => Ok(self.repeat_bounded(piece, min, min)),
            (Some(min), true, None) => Ok(self.repeat_unbounded(piece, min)),
            (Some(min), true, Some(max)) if max >= min => {
                Ok(self.repeat_bounded(piece, min, max))
            }
            _ => Err(CompileError::invalid_argument("invalid quantifier")),
        }
    }

    /// A run of decimal digits, or `None` if there are none. Anything else
    /// inside the braces (whitespace included) fails at the `}` check.
    fn parse_repeat_count(&mut self) -> Result<Option<u32>, CompileError> {
        let mut seen_digit = false;
        let mut value: u32 = 0;
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_digit() {
                break;
            }
            self.pos += 1;
            seen_digit = true;
            value = value * 10 + u32::from(byte - b'0');
            if value > QUANTIFIER_MAX {
                return Err(CompileError::invalid_argument(
                    "numeric quantifiers greater than 1000 are not supported",
                ));
            }
        }
        Ok(seen_digit.then_some(value))
    }

    /// `min..=max` copies of `piece` chained together: `min` mandatory
    /// copies followed by optional ones, each optional copy skippable via an
    /// initial→final epsilon.
    fn repeat_bounded(&mut self, piece: ScratchNfa, min: u32, max: u32) -> ScratchNfa {
        if max == 0 {
            return self.empty_piece();
        }
        let mut result = piece.clone();
        if min == 0 {
            result.add_edge(EPSILON, result.initial_state(), result.final_state());
        }
        for index in 1..max {
            let mut copy = piece.clone();
            copy.rename_all_states(&mut self.next_state);
            if index >= min {
                copy.add_edge(EPSILON, copy.initial_state(), copy.final_state());
            }
            result.chain(copy);
        }
        result
    }

    /// `{min,}`: `min` mandatory copies with a starred copy appended.
    fn repeat_unbounded(&mut self, piece: ScratchNfa, min: u32) -> ScratchNfa {
        if min == 0 {
            return self.starred(piece);
        }
        let mut result = piece.clone();
        for _ in 1..min {
            let mut copy = piece.clone();
            copy.rename_all_states(&mut self.next_state);
            result.chain(copy);
        }
        let mut tail = piece;
        tail.rename_all_states(&mut self.next_state);
        let tail = self.starred(tail);
        result.chain(tail);
        result
    }
}

fn digit_bytes() -> Vec<u8> {
    (b'0'..=b'9').collect()
}

fn word_bytes() -> Vec<u8> {
    (b'A'..=b'Z')
        .chain(b'a'..=b'z')
        .chain(b'0'..=b'9')
        .chain([b'_'])
        .collect()
}

/// `\s`: form feed, line feed, carriage return, tab, vertical tab.
fn space_bytes() -> [u8; 5] {
    [0x0C, 0x0A, 0x0D, 0x09, 0x0B]
}

/// Every byte `1..=255` not in `set`. Byte 0 stays excluded: it is the
/// epsilon label, not a matchable byte.
fn negated_bytes(set: &[u8]) -> Vec<u8> {
    let mut member = [false; 256];
    for &byte in set {
        member[byte as usize] = true;
    }
    (1..=255u8).filter(|&byte| !member[byte as usize]).collect()
}
