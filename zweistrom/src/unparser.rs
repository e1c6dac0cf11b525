//! Producing output, including back-patching of previously reserved output.
use std::collections::VecDeque;

use tracing::trace;

use crate::{Chunk, Sequence, UnparserError};

/// Converts a value of type `I` back into a sequence of type `S`.
///
/// Unparsers write their output into an [`UnparserContext`]. Any closure with a matching signature
/// is an unparser.
pub trait Unparser<S: Sequence, I: ?Sized> {
    /// Writes the output for `input` into `ctx`.
    fn unparse(&self, input: &I, ctx: &mut UnparserContext<'_, S>) -> Result<(), UnparserError>;
}

impl<S, I, F> Unparser<S, I> for F
where
    S: Sequence,
    I: ?Sized,
    F: Fn(&I, &mut UnparserContext<'_, S>) -> Result<(), UnparserError>,
{
    #[inline]
    fn unparse(&self, input: &I, ctx: &mut UnparserContext<'_, S>) -> Result<(), UnparserError> {
        self(input, ctx)
    }
}

/// Output reserved using [`UnparserContext::write_later`], to be filled using
/// [`UnparserContext::write_earlier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    id: usize,
    position: usize,
    position_end: usize,
}

impl Slot {
    /// Output position of the first reserved element.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Output position after the last reserved element.
    pub fn position_end(&self) -> usize {
        self.position_end
    }

    /// Number of reserved elements.
    pub fn len(&self) -> usize {
        self.position_end - self.position
    }

    /// Returns `true` if no elements were reserved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Segment<S: Sequence> {
    Chunk(Chunk<S>),
    Slot(usize),
}

enum Fill<S: Sequence> {
    Empty,
    Filling(Vec<Segment<S>>),
    Filled(Vec<Segment<S>>),
}

struct SlotState<S: Sequence> {
    slot: Slot,
    fill: Fill<S>,
}

/// Output that cannot be passed on yet, as it follows a slot that is not filled.
struct OutputBuffer<S: Sequence> {
    // Invariant: starts with an unfilled slot or is empty after each drain
    pending: VecDeque<Segment<S>>,
    slots: Vec<SlotState<S>>,
}

impl<S: Sequence> OutputBuffer<S> {
    fn new() -> Self {
        OutputBuffer {
            pending: VecDeque::new(),
            slots: vec![],
        }
    }

    fn push_segment(&mut self, target: Option<usize>, segment: Segment<S>) {
        if let Some(id) = target {
            // Only the context filling a slot targets it
            if let Fill::Filling(segments) = &mut self.slots[id].fill {
                segments.push(segment);
                return;
            }
        }
        self.pending.push_back(segment);
    }

    fn is_ready(&self, segment: &Segment<S>) -> bool {
        match segment {
            Segment::Chunk(_) => true,
            Segment::Slot(id) => match &self.slots[*id].fill {
                Fill::Filled(segments) => segments.iter().all(|segment| self.is_ready(segment)),
                Fill::Empty | Fill::Filling(_) => false,
            },
        }
    }

    fn first_unfilled(&self, segments: &[Segment<S>]) -> Option<usize> {
        segments.iter().find_map(|segment| match segment {
            Segment::Chunk(_) => None,
            Segment::Slot(id) => match &self.slots[*id].fill {
                Fill::Filled(segments) => self.first_unfilled(segments),
                Fill::Empty | Fill::Filling(_) => Some(self.slots[*id].slot.position),
            },
        })
    }

    fn emit(&mut self, segment: Segment<S>, sink: &mut dyn FnMut(Chunk<S>)) {
        match segment {
            Segment::Chunk(chunk) => {
                if !chunk.is_empty() {
                    sink(chunk)
                }
            }
            Segment::Slot(id) => {
                let fill = std::mem::replace(&mut self.slots[id].fill, Fill::Filled(vec![]));
                if let Fill::Filled(segments) = fill {
                    for segment in segments {
                        self.emit(segment, sink);
                    }
                }
            }
        }
    }

    /// Passes on all output up to the first slot that is not completely filled.
    fn drain(&mut self, sink: &mut dyn FnMut(Chunk<S>)) {
        while let Some(segment) = self.pending.front() {
            if !self.is_ready(segment) {
                break;
            }
            if let Some(segment) = self.pending.pop_front() {
                self.emit(segment, sink);
            }
        }
    }
}

/// Tracks the output position of an unparser and collects its output.
///
/// Besides writing output in order, an unparser can reserve output using
/// [`write_later`][Self::write_later], e.g. for a length prefix, and fill it once its content is
/// known using [`write_earlier`][Self::write_earlier]. Output is passed on to the sink as soon as
/// it no longer follows a slot that is still empty.
pub struct UnparserContext<'a, S: Sequence> {
    output: &'a mut OutputBuffer<S>,
    sink: &'a mut dyn FnMut(Chunk<S>),
    target: Option<usize>,
    position: usize,
    end: Option<usize>,
}

impl<'a, S: Sequence> UnparserContext<'a, S> {
    /// Output position of the next element written.
    ///
    /// While filling a slot, this is the position within the complete output, i.e. it starts at
    /// the slot's position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    fn advance(&mut self, len: usize) -> Result<(), UnparserError> {
        let position = self.position + len;
        if let (Some(end), Some(id)) = (self.end, self.target) {
            if position > end {
                let slot = self.output.slots[id].slot;
                return Err(UnparserError::SlotLengthMismatch {
                    position: slot.position,
                    expected: slot.len(),
                    actual: position - slot.position,
                });
            }
        }
        self.position = position;
        Ok(())
    }

    /// Writes a chunk of output.
    pub fn write(&mut self, chunk: Chunk<S>) -> Result<(), UnparserError> {
        self.advance(chunk.len())?;
        self.output
            .push_segment(self.target, Segment::Chunk(chunk));
        if self.target.is_none() {
            self.output.drain(self.sink);
        }
        Ok(())
    }

    /// Writes a sequence of elements.
    #[inline]
    pub fn write_sequence(&mut self, sequence: S) -> Result<(), UnparserError> {
        self.write(Chunk::Sequence(sequence))
    }

    /// Writes a single element.
    #[inline]
    pub fn write_element(&mut self, element: S::Element) -> Result<(), UnparserError> {
        self.write(Chunk::Element(element))
    }

    /// Reserves `len` elements of output to be filled later using
    /// [`write_earlier`][Self::write_earlier].
    pub fn write_later(&mut self, len: usize) -> Result<Slot, UnparserError> {
        let position = self.position;
        self.advance(len)?;
        let slot = Slot {
            id: self.output.slots.len(),
            position,
            position_end: position + len,
        };
        trace!(position, len, "reserved slot");
        self.output.slots.push(SlotState {
            slot,
            fill: Fill::Empty,
        });
        self.output
            .push_segment(self.target, Segment::Slot(slot.id));
        Ok(slot)
    }

    /// Fills a slot reserved using [`write_later`][Self::write_later] with the output of
    /// `unparser`.
    ///
    /// The unparser must write exactly as much output as was reserved. It may itself reserve and
    /// fill further slots, including filling slots reserved outside of this slot.
    pub fn write_earlier<I, U>(
        &mut self,
        slot: Slot,
        unparser: U,
        input: &I,
    ) -> Result<(), UnparserError>
    where
        I: ?Sized,
        U: Unparser<S, I>,
    {
        let state = &mut self.output.slots[slot.id];
        if !matches!(state.fill, Fill::Empty) {
            return Err(UnparserError::SlotAlreadyFilled {
                position: slot.position,
            });
        }
        state.fill = Fill::Filling(vec![]);
        trace!(position = slot.position, len = slot.len(), "filling slot");

        let mut nested = UnparserContext {
            output: &mut *self.output,
            sink: &mut *self.sink,
            target: Some(slot.id),
            position: slot.position,
            end: Some(slot.position_end),
        };
        unparser.unparse(input, &mut nested)?;
        let written = nested.position - slot.position;
        if written != slot.len() {
            return Err(UnparserError::SlotLengthMismatch {
                position: slot.position,
                expected: slot.len(),
                actual: written,
            });
        }

        let state = &mut self.output.slots[slot.id];
        if let Fill::Filling(segments) = std::mem::replace(&mut state.fill, Fill::Empty) {
            state.fill = Fill::Filled(segments);
        }
        self.output.drain(self.sink);
        Ok(())
    }

    /// Creates an error for input that cannot be unparsed at the current position.
    #[cold]
    #[inline(never)]
    pub fn invalid(&self, message: impl Into<String>) -> UnparserError {
        UnparserError::Invalid {
            position: self.position,
            message: message.into(),
        }
    }
}

/// Runs `unparser` on `input`, passing the output to `sink` as soon as it is final.
pub fn run_unparser_with_sink<S, I, U>(
    unparser: U,
    input: &I,
    mut sink: impl FnMut(Chunk<S>),
) -> Result<(), UnparserError>
where
    S: Sequence,
    I: ?Sized,
    U: Unparser<S, I>,
{
    let mut output = OutputBuffer::new();
    let mut ctx = UnparserContext {
        output: &mut output,
        sink: &mut sink,
        target: None,
        position: 0,
        end: None,
    };
    unparser.unparse(input, &mut ctx)?;
    ctx.output.drain(ctx.sink);

    let pending = Vec::from(std::mem::take(&mut output.pending));
    if let Some(position) = output.first_unfilled(&pending) {
        return Err(UnparserError::UnfilledSlot { position });
    }
    Ok(())
}

/// Runs `unparser` on `input`, returning the complete output.
pub fn run_unparser<S, I, U>(unparser: U, input: &I) -> Result<Vec<S>, UnparserError>
where
    S: Sequence,
    I: ?Sized,
    U: Unparser<S, I>,
{
    let mut output = vec![];
    run_unparser_with_sink(unparser, input, |chunk: Chunk<S>| {
        output.push(chunk.into_sequence())
    })?;
    Ok(output)
}
