//! In-memory transport that records requests and replays scripted replies.
//!
//! Useful for exercising a calibration sequence without a running
//! calibration service.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::service::{ServiceError, ServiceTransport};

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub request: Value,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    replies: HashMap<String, Result<Value, String>>,
    /// Number of availability probes each service still fails.
    unavailable: HashMap<String, u32>,
    probes: HashMap<String, u32>,
}

/// Transport stub for tests and dry runs.
///
/// Every service replies with `{}` unless a reply or failure was scripted
/// for it. All calls are recorded in order.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reply to every call of `service` with `reply`.
    pub fn set_reply(&self, service: &str, reply: Value) {
        self.state().replies.insert(service.to_string(), Ok(reply));
    }

    /// Fail every call of `service` with `message`.
    pub fn set_failure(&self, service: &str, message: impl Into<String>) {
        self.state()
            .replies
            .insert(service.to_string(), Err(message.into()));
    }

    /// Report `service` as unreachable for the next `probes` availability checks.
    pub fn set_unavailable_for(&self, service: &str, probes: u32) {
        self.state().unavailable.insert(service.to_string(), probes);
    }

    /// Report `service` as permanently unreachable.
    pub fn set_unavailable(&self, service: &str) {
        self.set_unavailable_for(service, u32::MAX);
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Requests sent to `service`, in order.
    pub fn requests_to(&self, service: &str) -> Vec<Value> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.service == service)
            .map(|call| call.request.clone())
            .collect()
    }

    /// Number of availability checks made for `service`.
    pub fn probe_count(&self, service: &str) -> u32 {
        self.state().probes.get(service).copied().unwrap_or(0)
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl ServiceTransport for MockTransport {
    async fn call(&self, service: &str, request: Value) -> Result<Value, ServiceError> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            service: service.to_string(),
            request,
        });

        match state.replies.get(service) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(message)) => Err(ServiceError::new(service, message.clone())),
            None => Ok(Value::Object(Map::new())),
        }
    }

    async fn is_available(&self, service: &str) -> bool {
        let mut state = self.state();
        *state.probes.entry(service.to_string()).or_insert(0) += 1;

        match state.unavailable.get_mut(service) {
            Some(0) | None => true,
            Some(remaining) => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                false
            }
        }
    }
}
