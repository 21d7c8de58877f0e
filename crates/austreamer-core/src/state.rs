//! Lifecycle states and transitions shared by elements and pipelines.
//!
//! ```text
//!   Idle ──IdleToReady──▶ Ready ──ReadyToPause──▶ Pause ──PauseToPlay──▶ Play
//!   Idle ◀──ReadyToIdle── Ready ◀──PauseToReady── Pause ◀──PlayToPause── Play
//! ```
//!
//! A pipeline only ever moves one step at a time. [`Transition::step`]
//! computes the next step from the current state toward a target.

/// Lifecycle state of an element or pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    /// Constructed, no resources held.
    Idle,
    /// Resources allocated, configuration loaded.
    Ready,
    /// Prepared to stream, clock stopped.
    Pause,
    /// Streaming.
    Play,
}

impl State {
    /// All states in ascending order.
    pub const ALL: [State; 4] = [State::Idle, State::Ready, State::Pause, State::Play];
}

/// Direction a transition walks the state ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward Play.
    Up,
    /// Toward Idle.
    Down,
}

/// A single step between adjacent states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Idle → Ready.
    IdleToReady,
    /// Ready → Pause.
    ReadyToPause,
    /// Pause → Play.
    PauseToPlay,
    /// Play → Pause.
    PlayToPause,
    /// Pause → Ready.
    PauseToReady,
    /// Ready → Idle.
    ReadyToIdle,
}

impl Transition {
    /// State the transition leaves.
    pub fn from(self) -> State {
        match self {
            Self::IdleToReady => State::Idle,
            Self::ReadyToPause | Self::ReadyToIdle => State::Ready,
            Self::PauseToPlay | Self::PauseToReady => State::Pause,
            Self::PlayToPause => State::Play,
        }
    }

    /// State the transition reaches.
    pub fn to(self) -> State {
        match self {
            Self::ReadyToIdle => State::Idle,
            Self::IdleToReady | Self::PauseToReady => State::Ready,
            Self::ReadyToPause | Self::PlayToPause => State::Pause,
            Self::PauseToPlay => State::Play,
        }
    }

    /// Whether the transition walks up or down.
    pub fn direction(self) -> Direction {
        match self {
            Self::IdleToReady | Self::ReadyToPause | Self::PauseToPlay => Direction::Up,
            Self::PlayToPause | Self::PauseToReady | Self::ReadyToIdle => Direction::Down,
        }
    }

    /// The transition that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::IdleToReady => Self::ReadyToIdle,
            Self::ReadyToPause => Self::PauseToReady,
            Self::PauseToPlay => Self::PlayToPause,
            Self::PlayToPause => Self::PauseToPlay,
            Self::PauseToReady => Self::ReadyToPause,
            Self::ReadyToIdle => Self::IdleToReady,
        }
    }

    /// Next single step from `current` toward `target`, or `None` when equal.
    pub fn step(current: State, target: State) -> Option<Self> {
        use core::cmp::Ordering;
        match current.cmp(&target) {
            Ordering::Equal => None,
            Ordering::Less => Some(match current {
                State::Idle => Self::IdleToReady,
                State::Ready => Self::ReadyToPause,
                State::Pause | State::Play => Self::PauseToPlay,
            }),
            Ordering::Greater => Some(match current {
                State::Play => Self::PlayToPause,
                State::Pause => Self::PauseToReady,
                State::Ready | State::Idle => Self::ReadyToIdle,
            }),
        }
    }
}

/// Result an element reports for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// The element reached the new state.
    Success,
    /// Completion is pending on an external event (e.g. DMA ready).
    Async,
    /// The element cannot make the transition.
    Fail,
}

/// Lifecycle position of one element inside a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementState {
    /// Resting in a state.
    Settled(State),
    /// Accepted a transition that has not completed yet.
    Pending(Transition),
}

impl ElementState {
    /// The settled state, if any.
    pub fn settled(self) -> Option<State> {
        match self {
            Self::Settled(state) => Some(state),
            Self::Pending(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_walks_one_state_at_a_time() {
        assert_eq!(Transition::step(State::Idle, State::Play), Some(Transition::IdleToReady));
        assert_eq!(Transition::step(State::Pause, State::Play), Some(Transition::PauseToPlay));
        assert_eq!(Transition::step(State::Play, State::Idle), Some(Transition::PlayToPause));
        assert_eq!(Transition::step(State::Ready, State::Ready), None);
    }

    #[test]
    fn inverse_round_trips() {
        for from in State::ALL {
            for to in State::ALL {
                if let Some(t) = Transition::step(from, to) {
                    assert_eq!(t.from(), from);
                    assert_eq!(t.inverse().inverse(), t);
                    assert_eq!(t.inverse().to(), from);
                    assert_ne!(t.direction(), t.inverse().direction());
                }
            }
        }
    }
}
