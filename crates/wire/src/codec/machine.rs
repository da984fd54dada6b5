//! The decoding state machine engine.
//!
//! A decode graph is a closed enum implementing [`DecodingState`]. Each call
//! to [`DecodingState::step`] consumes what it can from the source buffer and
//! says whether it needs more bytes, moves to another state, or has finished
//! its sub-machine. [`StateMachine`] drives one graph across invocations,
//! keeping the state that was waiting for bytes and the artifacts produced
//! so far.

use std::task::Poll;
use std::{fmt, mem};

use bytes::BytesMut;

use crate::protocol::ParseError;

/// Outcome of one state step.
#[derive(Debug)]
pub(crate) enum Step<S> {
    /// Not enough bytes, resume from this state on the next delivery
    Pending(S),
    /// Continue immediately with this state
    Next(S),
    /// The sub-machine is finished
    Done,
}

pub(crate) trait DecodingState: Sized {
    type Artifact;
    type Context;

    /// Advances the graph by one transition, pushing artifacts to `out` in
    /// production order.
    fn step(self, src: &mut BytesMut, ctx: &mut Self::Context, out: &mut Vec<Self::Artifact>) -> Result<Step<Self>, ParseError>;
}

pub(crate) struct StateMachine<S: DecodingState> {
    state: Option<S>,
    artifacts: Vec<S::Artifact>,
}

impl<S: DecodingState + fmt::Debug> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine").field("state", &self.state).field("artifacts", &self.artifacts.len()).finish()
    }
}

impl<S: DecodingState> StateMachine<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self { state: Some(initial), artifacts: Vec::new() }
    }

    pub(crate) fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }

    pub(crate) fn artifacts(&self) -> &[S::Artifact] {
        &self.artifacts
    }

    /// Runs transitions until the graph waits for bytes or finishes.
    ///
    /// Returns `Ready` with every artifact collected since the machine was
    /// created once the graph finishes, `Pending` otherwise. A failed step
    /// leaves the machine without a state, later runs report
    /// [`ParseError::Poisoned`].
    pub(crate) fn run(&mut self, src: &mut BytesMut, ctx: &mut S::Context) -> Result<Poll<Vec<S::Artifact>>, ParseError> {
        let mut state = self.state.take().ok_or(ParseError::Poisoned)?;
        loop {
            match state.step(src, ctx, &mut self.artifacts)? {
                Step::Pending(next) => {
                    self.state = Some(next);
                    return Ok(Poll::Pending);
                }
                Step::Next(next) => state = next,
                Step::Done => return Ok(Poll::Ready(mem::take(&mut self.artifacts))),
            }
        }
    }

    /// Takes the artifacts produced so far, the machine keeps running.
    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, S::Artifact> {
        self.artifacts.drain(..)
    }

    /// Moves the artifacts produced so far into `out`, the machine keeps running.
    pub(crate) fn drain_into<T: From<S::Artifact>>(&mut self, out: &mut Vec<T>) {
        out.extend(self.artifacts.drain(..).map(T::from));
    }
}
