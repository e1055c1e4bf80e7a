//! Politeness primitives: the host concurrency gate and the per-host pacer.
//!
//! The gate layers two semaphores, a global in-flight cap and a lazily
//! created per-host cap. Acquisition takes the global slot first and rolls
//! it back if the host wait is cancelled, so a cancelled caller never leaks
//! capacity. The pacer spaces successive requests to one host by a minimum
//! delay, sleeping outside its lock.

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Two-level in-flight request limiter.
pub struct HostGate {
    global: Arc<Semaphore>,
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// Held capacity for one request. Dropping releases the host slot, then
/// the global slot.
#[derive(Debug)]
pub struct HostPermit {
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl HostGate {
    /// Creates a gate with the given global and per-host caps. Zero caps
    /// are clamped to one.
    #[must_use]
    pub fn new(global_cap: usize, per_host_cap: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_cap.max(1))),
            per_host: per_host_cap.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = match self.hosts.lock() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host))),
        )
    }

    /// Acquires a global slot, then a slot for `host`, honoring
    /// cancellation at both waits. A cancellation during the host wait
    /// releases the already-held global slot.
    pub async fn acquire(&self, host: &str, ctx: &CancellationToken) -> Result<HostPermit> {
        let global = tokio::select! {
            () = ctx.cancelled() => return Err(Error::Cancelled),
            permit = Arc::clone(&self.global).acquire_owned() => {
                permit.map_err(|_| Error::Unknown("concurrency gate closed".into()))?
            },
        };

        let host_sem = self.host_semaphore(host);
        let host = tokio::select! {
            // Dropping `global` here rolls the partial acquisition back.
            () = ctx.cancelled() => return Err(Error::Cancelled),
            permit = host_sem.acquire_owned() => {
                permit.map_err(|_| Error::Unknown("concurrency gate closed".into()))?
            },
        };

        Ok(HostPermit {
            _host: host,
            _global: global,
        })
    }
}

/// Minimum inter-request delay enforcement per host.
pub struct HostPacer {
    delay: Duration,
    last_access: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    /// Creates a pacer with the given minimum delay. A zero delay turns
    /// the pacer into pure bookkeeping.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_access: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until at least the configured delay has passed since the
    /// previous call for `host`, then records the access.
    pub async fn wait(&self, host: &str) {
        if self.delay.is_zero() {
            return;
        }

        let remainder = {
            let mut last = match self.last_access.lock() {
                Ok(last) => last,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            match last.get(host) {
                Some(&prev) if now.duration_since(prev) < self.delay => {
                    Some(self.delay - now.duration_since(prev))
                },
                _ => {
                    last.insert(host.to_string(), now);
                    None
                },
            }
        };

        if let Some(remainder) = remainder {
            // The lock is released while sleeping.
            tokio::time::sleep(remainder).await;
            let mut last = match self.last_access.lock() {
                Ok(last) => last,
                Err(poisoned) => poisoned.into_inner(),
            };
            last.insert(host.to_string(), Instant::now());
        }
    }
}
