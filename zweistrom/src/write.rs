//! Unparsers for producing common formats.
pub mod text;
