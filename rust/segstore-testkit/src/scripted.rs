//! A storage provider whose acquisitions succeed or fail on command.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use segstore_provider::{Segment, StorageProvider};

use crate::CallLog;

const DEFAULT_SEGMENT_SIZE: usize = 4096;

/// Decides the outcome of each `acquire` call.
#[derive(Debug, Clone)]
pub enum Outcomes {
    AlwaysSucceed,
    AlwaysFail,
    /// `true` means success. Calls past the end of the sequence succeed.
    Sequence(Vec<bool>),
    /// Each call fails with probability `failure_rate`, drawn from a seeded RNG.
    Random { seed: u64, failure_rate: f64 },
}

struct ScriptState {
    calls: usize,
    rng: fastrand::Rng,
    live: HashMap<usize, Box<[u8]>>,
}

/// Hands out distinct heap-backed segments, failing the calls selected by its
/// [`Outcomes`].
///
/// Releasing a segment this provider did not hand out (or already took back)
/// panics, which turns caller contract violations into test failures.
pub struct ScriptedStorageProvider {
    outcomes: Outcomes,
    segment_size: usize,
    log: CallLog,
    state: Mutex<ScriptState>,
}

impl ScriptedStorageProvider {
    pub fn new(outcomes: Outcomes) -> ScriptedStorageProvider {
        let seed = match outcomes {
            Outcomes::Random { seed, .. } => seed,
            _ => 0,
        };
        ScriptedStorageProvider {
            outcomes,
            segment_size: DEFAULT_SEGMENT_SIZE,
            log: CallLog::new(),
            state: Mutex::new(ScriptState {
                calls: 0,
                rng: fastrand::Rng::with_seed(seed),
                live: HashMap::new(),
            }),
        }
    }

    pub fn always_succeed() -> ScriptedStorageProvider {
        Self::new(Outcomes::AlwaysSucceed)
    }

    pub fn always_fail() -> ScriptedStorageProvider {
        Self::new(Outcomes::AlwaysFail)
    }

    pub fn sequence(outcomes: impl IntoIterator<Item = bool>) -> ScriptedStorageProvider {
        Self::new(Outcomes::Sequence(outcomes.into_iter().collect()))
    }

    pub fn random(seed: u64, failure_rate: f64) -> ScriptedStorageProvider {
        Self::new(Outcomes::Random { seed, failure_rate })
    }

    /// Sets the size of the segments handed out (4096 by default).
    pub fn with_segment_size(mut self, segment_size: usize) -> ScriptedStorageProvider {
        assert!(segment_size > 0);
        self.segment_size = segment_size;
        self
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Handle to the call history, still usable after the provider is moved.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Number of segments handed out and not yet released.
    pub fn live_segments(&self) -> usize {
        self.lock().live.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageProvider for ScriptedStorageProvider {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let mut state = self.lock();
        let call = state.calls;
        state.calls += 1;
        let succeed = match &self.outcomes {
            Outcomes::AlwaysSucceed => true,
            Outcomes::AlwaysFail => false,
            Outcomes::Sequence(seq) => seq.get(call).copied().unwrap_or(true),
            Outcomes::Random { failure_rate, .. } => state.rng.f64() >= *failure_rate,
        };

        let segment = if succeed {
            let mut storage = vec![0u8; self.segment_size].into_boxed_slice();
            // SAFETY: the buffer is fresh and stays in `live` until released.
            let segment = unsafe { Segment::from_ptr(storage.as_mut_ptr()) };
            state.live.insert(storage.as_ptr() as usize, storage);
            segment
        } else {
            None
        };
        self.log
            .record_acquire(name, segment.as_ref().map(Segment::addr));
        segment
    }

    fn release(&self, segment: Segment) {
        let addr = segment.addr();
        self.log.record_release(addr);
        let removed = self.lock().live.remove(&addr);
        assert!(
            removed.is_some(),
            "released a segment not owned by this provider: {segment:?}"
        );
    }
}
