//! Typed service handles on top of an untyped JSON transport.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Failure of a single remote call.
///
/// Transport failures (service unreachable) and failures reported by the
/// service itself are not distinguished; `message` carries the text the
/// transport or service produced, unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("service '{service}' failed: {message}")]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }

    /// The failure description as produced by the transport or service.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A request/response channel to named remote services.
///
/// Requests and responses are JSON values; typing happens in
/// [`ServiceClient`].
#[async_trait]
pub trait ServiceTransport: Send + Sync {
    /// Call `service` with `request` and wait for its reply.
    async fn call(&self, service: &str, request: Value) -> Result<Value, ServiceError>;

    /// Check whether `service` is currently reachable.
    async fn is_available(&self, service: &str) -> bool;
}

/// Handle to one remote service with a fixed request and response type.
pub struct ServiceClient<Req, Resp> {
    name: String,
    transport: Arc<dyn ServiceTransport>,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> ServiceClient<Req, Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    pub fn new(transport: Arc<dyn ServiceTransport>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport,
            _types: PhantomData,
        }
    }

    /// Name of the service this handle calls.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the service.
    pub async fn call(&self, request: &Req) -> Result<Resp, ServiceError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ServiceError::new(&self.name, format!("failed to encode request: {}", e)))?;

        tracing::debug!(service = %self.name, "calling service");
        let reply = self.transport.call(&self.name, body).await?;

        // Services without response fields may reply with nothing at all.
        let reply = match reply {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        serde_json::from_value(reply)
            .map_err(|e| ServiceError::new(&self.name, format!("failed to decode response: {}", e)))
    }
}

/// Poll `transport` until `service` becomes reachable.
///
/// Returns `false` if `deadline` passes first. Without a deadline this waits
/// indefinitely.
pub async fn wait_for_service(
    transport: &dyn ServiceTransport,
    service: &str,
    deadline: Option<Instant>,
    poll_interval: Duration,
) -> bool {
    let mut logged = false;
    loop {
        if transport.is_available(service).await {
            return true;
        }
        if !logged {
            tracing::info!(service, "waiting for service to become available");
            logged = true;
        }
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                sleep(poll_interval.min(deadline - now)).await;
            }
            None => sleep(poll_interval).await,
        }
    }
}

impl<Req, Resp> std::fmt::Debug for ServiceClient<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient").field("name", &self.name).finish()
    }
}
