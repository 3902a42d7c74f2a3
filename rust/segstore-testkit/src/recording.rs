//! A forwarding provider that records every call it sees.

use segstore_provider::{Segment, StorageProvider};

use crate::CallLog;

/// Forwards to `P` and records names, acquire results and released addresses.
pub struct RecordingStorageProvider<P> {
    inner: P,
    log: CallLog,
}

impl<P: StorageProvider> RecordingStorageProvider<P> {
    pub fn new(inner: P) -> RecordingStorageProvider<P> {
        RecordingStorageProvider {
            inner,
            log: CallLog::new(),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: StorageProvider> StorageProvider for RecordingStorageProvider<P> {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let segment = self.inner.acquire(name);
        self.log
            .record_acquire(name, segment.as_ref().map(Segment::addr));
        segment
    }

    fn release(&self, segment: Segment) {
        self.log.record_release(segment.addr());
        self.inner.release(segment);
    }
}
