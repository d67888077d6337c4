// Copyright 2020 Joyent, Inc.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use slog::Logger;

use crate::comm::EventHandler;
use crate::endpoint::Endpoint;

/// The configuration options for a connection manager. This is required to
/// instantiate a new manager.
#[derive(Debug, Default)]
pub struct ConnectionManagerOptions {
    /// An optional `slog` logger instance. If none is provided then the
    /// logging will fall back to using the
    /// [`slog-stdlog`](https://docs.rs/slog-stdlog) drain which is
    /// essentially the same as using the rust standard
    /// [`log`](https://docs.rs/log) crate.
    pub log: Option<Logger>,
    /// Optionally start with quiet mode enabled. In quiet mode disconnect
    /// and error events are not logged. The default is false.
    pub quiet_mode: Option<bool>,
}

// Mutable per-endpoint state, guarded by the record mutex.
#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub struct ConnState {
    // True when the comm layer holds a live socket to the endpoint.
    pub connected: bool,
    // The monotonic instant at which the next reconnect becomes eligible.
    pub next_retry: Instant,
}

// The per-endpoint connection record. A record is shared between the
// registry, any number of retry schedule entries, and in-flight event
// deliveries; the last holder drops it.
#[doc(hidden)]
pub struct ConnectionState {
    pub addr: Endpoint,
    pub local_addr: Option<Endpoint>,
    pub timeout_ms: u64,
    pub service_name: Option<String>,
    pub handler: Option<Arc<dyn EventHandler>>,
    pub state: Mutex<ConnState>,
    pub cond: Condvar,
}

impl ConnectionState {
    #[doc(hidden)]
    pub fn new(
        addr: Endpoint,
        local_addr: Option<Endpoint>,
        timeout_ms: u64,
        service_name: Option<&str>,
        handler: Option<Arc<dyn EventHandler>>,
    ) -> Self {
        ConnectionState {
            addr,
            local_addr,
            timeout_ms,
            service_name: service_name.map(String::from),
            handler,
            state: Mutex::new(ConnState {
                connected: false,
                next_retry: Instant::now(),
            }),
            cond: Condvar::new(),
        }
    }

    // The label used in log messages: the service name when one was given,
    // otherwise the endpoint address.
    pub fn label(&self) -> String {
        match &self.service_name {
            Some(name) => name.clone(),
            None => self.addr.to_string(),
        }
    }
}

// An entry in the retry schedule. `when` is the record's `next_retry` at the
// time the entry was pushed. The worker consults the record's live state
// before acting, so duplicate and stale entries drain as no-ops.
#[doc(hidden)]
pub struct RetryEntry {
    pub when: Instant,
    pub state: Arc<ConnectionState>,
}

impl PartialEq for RetryEntry {
    fn eq(&self, other: &RetryEntry) -> bool {
        self.when == other.when
    }
}

impl Eq for RetryEntry {}

impl Ord for RetryEntry {
    // Reversed so that BinaryHeap yields the earliest deadline first.
    fn cmp(&self, other: &RetryEntry) -> Ordering {
        other.when.cmp(&self.when)
    }
}

impl PartialOrd for RetryEntry {
    fn partial_cmp(&self, other: &RetryEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// The cross-endpoint structures guarded by the manager mutex.
#[doc(hidden)]
pub struct ManagerData {
    pub conns: HashMap<Endpoint, Arc<ConnectionState>>,
    pub retry_queue: BinaryHeap<RetryEntry>,
    pub shutdown: bool,
    pub quiet_mode: bool,
}

impl ManagerData {
    #[doc(hidden)]
    pub fn new(quiet_mode: bool) -> Self {
        ManagerData {
            conns: HashMap::new(),
            retry_queue: BinaryHeap::new(),
            shutdown: false,
            quiet_mode,
        }
    }
}
