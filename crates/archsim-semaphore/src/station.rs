//! The [`SemaphoreStation`].

use std::collections::VecDeque;

use archsim_core::{ClientId, SemaphoreError, StationId};
use tracing::debug;

/// Default number of semaphores per station.
pub const DEFAULT_SEMAPHORE_COUNT: usize = 32;

/// Station configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationConfig {
    /// Number of semaphores. Must be > 0. Default: 32.
    pub count: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SEMAPHORE_COUNT,
        }
    }
}

/// Result of [`SemaphoreStation::signal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The earliest waiter was granted; the value did not change.
    Granted(ClientId),
    /// Nobody was waiting; the value went up.
    Incremented {
        /// The value after the increment.
        value: u64,
    },
}

/// Result of [`SemaphoreStation::wait`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The value was positive and has been decremented.
    Granted,
    /// The client joined the wait queue.
    Queued {
        /// Zero-based position in the queue.
        position: usize,
    },
}

#[derive(Clone, Debug, Default)]
struct Semaphore {
    value: u64,
    waiters: VecDeque<ClientId>,
}

/// A bank of counting semaphores, all starting at zero.
///
/// For every index, a positive value and a non-empty wait queue never
/// coexist.
#[derive(Clone, Debug)]
pub struct SemaphoreStation {
    id: StationId,
    semaphores: Vec<Semaphore>,
}

impl SemaphoreStation {
    /// Create a station with `config.count` semaphores at value 0.
    pub fn new(id: impl Into<StationId>, config: StationConfig) -> Result<Self, SemaphoreError> {
        let id = id.into();
        if config.count == 0 {
            return Err(SemaphoreError::ZeroCount { station: id });
        }
        Ok(Self {
            id,
            semaphores: vec![Semaphore::default(); config.count],
        })
    }

    /// The station's name.
    pub fn id(&self) -> &StationId {
        &self.id
    }

    /// Number of semaphores.
    pub fn count(&self) -> usize {
        self.semaphores.len()
    }

    /// Check that `index` addresses a semaphore.
    pub fn check_index(&self, index: usize) -> Result<(), SemaphoreError> {
        self.slot(index).map(|_| ())
    }

    /// Current value of `semaphores[index]`.
    pub fn value(&self, index: usize) -> Result<u64, SemaphoreError> {
        self.slot(index).map(|s| s.value)
    }

    /// Clients waiting on `index`, earliest first.
    pub fn waiters(&self, index: usize) -> Result<impl Iterator<Item = &ClientId>, SemaphoreError> {
        self.slot(index).map(|s| s.waiters.iter())
    }

    /// Total clients waiting across all indices.
    pub fn total_waiters(&self) -> usize {
        self.semaphores.iter().map(|s| s.waiters.len()).sum()
    }

    /// Grant the earliest waiter on `index`, or increment its value.
    pub fn signal(&mut self, index: usize) -> Result<SignalOutcome, SemaphoreError> {
        let station = self.id.clone();
        let sem = self.slot_mut(index)?;
        let outcome = match sem.waiters.pop_front() {
            Some(client) => {
                debug!(station = %station, index, client = %client, "signal granted waiter");
                SignalOutcome::Granted(client)
            }
            None => {
                sem.value += 1;
                debug!(station = %station, index, value = sem.value, "signal incremented");
                SignalOutcome::Incremented { value: sem.value }
            }
        };
        debug_assert!(sem.value == 0 || sem.waiters.is_empty());
        Ok(outcome)
    }

    /// Take one unit from `index` if available, else queue `client`.
    pub fn wait(&mut self, client: ClientId, index: usize) -> Result<WaitOutcome, SemaphoreError> {
        let station = self.id.clone();
        let sem = self.slot_mut(index)?;
        let outcome = if sem.value > 0 {
            sem.value -= 1;
            debug!(station = %station, index, client = %client, "wait granted");
            WaitOutcome::Granted
        } else {
            debug!(station = %station, index, client = %client, "wait queued");
            sem.waiters.push_back(client);
            WaitOutcome::Queued {
                position: sem.waiters.len() - 1,
            }
        };
        debug_assert!(sem.value == 0 || sem.waiters.is_empty());
        Ok(outcome)
    }

    fn slot(&self, index: usize) -> Result<&Semaphore, SemaphoreError> {
        let count = self.semaphores.len();
        self.semaphores
            .get(index)
            .ok_or_else(|| SemaphoreError::IndexOutOfRange {
                station: self.id.clone(),
                index,
                count,
            })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Semaphore, SemaphoreError> {
        let count = self.semaphores.len();
        let station = &self.id;
        self.semaphores
            .get_mut(index)
            .ok_or_else(|| SemaphoreError::IndexOutOfRange {
                station: station.clone(),
                index,
                count,
            })
    }
}
