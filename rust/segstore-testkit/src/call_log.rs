//! A shared record of the calls made to a storage provider double.

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Calls {
    names: Vec<String>,
    acquired: Vec<Option<usize>>,
    released: Vec<usize>,
}

/// Cloneable handle to the call history of one provider double.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Calls>>);

impl CallLog {
    pub fn new() -> CallLog {
        Default::default()
    }

    pub fn record_acquire(&self, name: &str, addr: Option<usize>) {
        let mut calls = self.lock();
        calls.names.push(name.to_string());
        calls.acquired.push(addr);
    }

    pub fn record_release(&self, addr: usize) {
        self.lock().released.push(addr);
    }

    /// Names passed to `acquire`, in call order.
    pub fn names(&self) -> Vec<String> {
        self.lock().names.clone()
    }

    /// Result of every `acquire` call, in call order: the segment address or
    /// `None` for a failure.
    pub fn acquired(&self) -> Vec<Option<usize>> {
        self.lock().acquired.clone()
    }

    /// Addresses passed to `release`, in call order.
    pub fn released(&self) -> Vec<usize> {
        self.lock().released.clone()
    }

    pub fn acquire_calls(&self) -> usize {
        self.lock().acquired.len()
    }

    pub fn failed_acquires(&self) -> usize {
        self.lock().acquired.iter().filter(|a| a.is_none()).count()
    }

    pub fn release_calls(&self) -> usize {
        self.lock().released.len()
    }

    fn lock(&self) -> MutexGuard<'_, Calls> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
