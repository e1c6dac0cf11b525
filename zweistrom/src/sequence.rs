//! Abstraction over the concrete kind of data being parsed or produced.
use std::fmt::Debug;

/// Primitive operations on an ordered collection of elements.
///
/// Parsers and unparsers are generic over the sequence type, so the same combinators work for text
/// (`String`, with `char` elements) and for binary data (`Vec<u8>`, with `u8` elements). The engine
/// never inspects a sequence other than through this trait.
///
/// All indices are element indices, not byte offsets. For `String` this means indexing is linear
/// in the length of the string. Buffered input is therefore kept as a vector of elements, see
/// [`into_elements`][Self::into_elements].
pub trait Sequence: Clone + Debug + 'static {
    /// The type of a single element.
    type Element: Copy + PartialEq + Debug + 'static;

    /// Number of elements in the sequence.
    fn len(&self) -> usize;

    /// Returns `true` if the sequence contains no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index` or `None` if `index` is out of range.
    fn at(&self, index: usize) -> Option<Self::Element>;

    /// Returns the elements in the half-open range `start..end`.
    ///
    /// The range is clamped to the length of the sequence.
    fn subsequence(&self, start: usize, end: usize) -> Self;

    /// Concatenates a list of sequences.
    fn concat(parts: &[Self]) -> Self;

    /// Builds a sequence from individual elements.
    fn from_elements(elements: &[Self::Element]) -> Self;

    /// Returns all elements as a vector.
    fn elements(&self) -> Vec<Self::Element> {
        (0..self.len()).filter_map(|index| self.at(index)).collect()
    }

    /// Returns an empty sequence.
    #[inline]
    fn empty() -> Self {
        Self::from_elements(&[])
    }

    /// Converts the sequence into a vector of its elements.
    fn into_elements(self) -> Vec<Self::Element> {
        self.elements()
    }

    /// Builds a sequence from a vector of elements, reusing its allocation where possible.
    fn from_element_vec(elements: Vec<Self::Element>) -> Self {
        Self::from_elements(&elements)
    }
}

impl Sequence for Vec<u8> {
    type Element = u8;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn at(&self, index: usize) -> Option<u8> {
        self.get(index).copied()
    }

    fn subsequence(&self, start: usize, end: usize) -> Self {
        let end = end.min(Vec::len(self));
        let start = start.min(end);
        self[start..end].to_vec()
    }

    fn concat(parts: &[Self]) -> Self {
        parts.concat()
    }

    fn from_elements(elements: &[u8]) -> Self {
        elements.to_vec()
    }

    fn elements(&self) -> Vec<u8> {
        self.clone()
    }

    #[inline]
    fn into_elements(self) -> Vec<u8> {
        self
    }

    #[inline]
    fn from_element_vec(elements: Vec<u8>) -> Self {
        elements
    }
}

impl Sequence for String {
    type Element = char;

    #[inline]
    fn len(&self) -> usize {
        if self.is_ascii() {
            String::len(self)
        } else {
            self.chars().count()
        }
    }

    #[inline]
    fn at(&self, index: usize) -> Option<char> {
        self.chars().nth(index)
    }

    fn subsequence(&self, start: usize, end: usize) -> Self {
        self.chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    fn concat(parts: &[Self]) -> Self {
        parts.concat()
    }

    fn from_elements(elements: &[char]) -> Self {
        elements.iter().collect()
    }

    fn elements(&self) -> Vec<char> {
        self.chars().collect()
    }

    fn from_element_vec(elements: Vec<char>) -> Self {
        elements.into_iter().collect()
    }
}

/// A piece of output produced by an unparser: either a whole sequence or a single element.
#[derive(Clone, Debug, PartialEq)]
pub enum Chunk<S: Sequence> {
    /// A sequence of elements.
    Sequence(S),
    /// A single element.
    Element(S::Element),
}

impl<S: Sequence> Chunk<S> {
    /// Number of elements contained in this chunk.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Chunk::Sequence(sequence) => sequence.len(),
            Chunk::Element(_) => 1,
        }
    }

    /// Returns `true` if this chunk contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts this chunk into a sequence.
    pub fn into_sequence(self) -> S {
        match self {
            Chunk::Sequence(sequence) => sequence,
            Chunk::Element(element) => S::from_elements(&[element]),
        }
    }

    /// Concatenates a list of chunks into a single sequence.
    pub fn concat(chunks: impl IntoIterator<Item = Self>) -> S {
        let parts: Vec<S> = chunks.into_iter().map(Chunk::into_sequence).collect();
        S::concat(&parts)
    }
}

impl<S: Sequence> From<S> for Chunk<S> {
    fn from(sequence: S) -> Self {
        Chunk::Sequence(sequence)
    }
}
