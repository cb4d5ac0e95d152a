use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of the search index: `NotStarted → Indexing → Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    NotStarted,
    Indexing,
    Ready,
}

impl ReadinessState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Indexing => 1,
            Self::Ready => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Indexing,
            _ => Self::Ready,
        }
    }
}

impl fmt::Display for ReadinessState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::Indexing => "indexing",
            Self::Ready => "ready",
        };
        f.write_str(label)
    }
}

/// Atomic holder for [`ReadinessState`]. Transitions only move forward, one step at a time.
#[derive(Debug)]
pub struct Readiness {
    state: AtomicU8,
}

impl Default for Readiness {
    #[inline]
    fn default() -> Self {
        Self {
            state: AtomicU8::new(ReadinessState::NotStarted.as_u8()),
        }
    }
}

impl Readiness {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> ReadinessState {
        ReadinessState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.get() == ReadinessState::Ready
    }

    /// Move `from → to`. Returns the state actually observed when the transition is refused.
    #[inline]
    pub fn transition(
        &self,
        from: ReadinessState,
        to: ReadinessState,
    ) -> Result<(), ReadinessState> {
        if to.as_u8() != from.as_u8() + 1 {
            return Err(self.get());
        }

        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ReadinessState::from_u8)
    }
}
