//! Parsers for elements and sequences and combinators building larger parsers from smaller ones.
//!
//! Combinators that try alternatives ([`optional`], the array family, [`disjunction`], [`union`]
//! and the lookaheads) run them in lookahead contexts and only recover from
//! [`ParserError::ParsingFailed`][crate::ParserError::ParsingFailed]. All other errors are passed
//! on unchanged.
mod array;
mod disjunction;
mod element;
mod lookahead;
mod object;
mod optional;
mod slice;
mod terminated;
mod union;

pub use array::{
    array, non_empty_array, separated_array, separated_non_empty_array, Array, NoSeparator,
};
pub use disjunction::{disjunction, Disjunction};
pub use element::{
    element, element_matching, exact_element, exact_sequence, predicate, AnyElement,
    ElementMatching, ExactElement, ExactSequence, Predicate,
};
pub use lookahead::{lookahead, negative_lookahead, Lookahead, NegativeLookahead};
pub use object::{object, Object};
pub use optional::{optional, Optional};
pub use slice::{
    end_of_input, fixed_length, skip, slice_bounded, EndOfInput, FixedLength, Skip,
    SliceBounded,
};
pub use terminated::{
    terminated_array, terminated_array_reference, terminated_sequence, Step, TerminatedArray,
    TerminatedArrayReference, TerminatedSequence,
};
pub use union::{union, Union};
