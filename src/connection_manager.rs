// Copyright 2020 Joyent, Inc.

pub mod types;

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use slog::{debug, error, info, o, warn, Drain, Logger};

use crate::comm::{Comm, Event, EventHandler, EventKind};
use crate::connection_manager::types::{
    ConnState, ConnectionManagerOptions, ConnectionState, ManagerData, RetryEntry,
};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::timer::Timer;

// Width of the randomization window applied to retries scheduled after a
// synchronous connect failure, in milliseconds.
const RETRY_JITTER_WINDOW_MS: u64 = 2000;

/// Maintains a set of outbound connections to named peer endpoints.
///
/// Endpoints are registered with [`add`](#method.add). The manager issues
/// the initial connect through the comm layer, listens to the comm layer's
/// lifecycle events, and retries failed or dropped connections on each
/// endpoint's retry interval until the endpoint is removed or the manager
/// shuts down. Callers may block until an endpoint is reachable with
/// [`wait_for_connection`](#method.wait_for_connection).
///
/// The manager is `Clone`; clones share all state. Only the original
/// instance carries the retry worker's join handle and may invoke
/// [`shutdown`](#method.shutdown).
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
    retry_thread: Option<thread::JoinHandle<()>>,
}

struct ManagerInner {
    comm: Arc<dyn Comm>,
    data: Mutex<ManagerData>,
    retry_cond: Condvar,
    log: Logger,
}

impl ConnectionManager {
    /// Create a manager on top of the given comm layer and start the retry
    /// worker thread.
    pub fn new(comm: Arc<dyn Comm>, options: ConnectionManagerOptions) -> Self {
        let log = options
            .log
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
        let quiet_mode = options.quiet_mode.unwrap_or(false);

        let inner = Arc::new(ManagerInner {
            comm,
            data: Mutex::new(ManagerData::new(quiet_mode)),
            retry_cond: Condvar::new(),
            log,
        });

        let worker_inner = Arc::clone(&inner);
        let retry_thread = thread::spawn(move || retry_loop(worker_inner));

        ConnectionManager {
            inner,
            retry_thread: Some(retry_thread),
        }
    }

    /// Register a peer endpoint and immediately attempt to connect to it.
    ///
    /// `timeout_ms` is the endpoint's retry interval. `service_name` is an
    /// optional human-readable label used in log messages. `handler` is an
    /// optional downstream sink that receives every comm layer event for the
    /// endpoint after the manager has processed it.
    ///
    /// Registration is idempotent: adding an address that is already
    /// registered returns silently. Connect failures are never surfaced to
    /// the caller; they are logged and retried.
    pub fn add(
        &self,
        addr: Endpoint,
        timeout_ms: u64,
        service_name: Option<&str>,
        handler: Option<Arc<dyn EventHandler>>,
    ) {
        self.add_impl(addr, None, timeout_ms, service_name, handler)
    }

    /// As [`add`](#method.add), with the local end of the connection bound
    /// to `local_addr` rather than letting the operating system choose.
    pub fn add_with_local_addr(
        &self,
        addr: Endpoint,
        local_addr: Endpoint,
        timeout_ms: u64,
        service_name: Option<&str>,
        handler: Option<Arc<dyn EventHandler>>,
    ) {
        self.add_impl(addr, Some(local_addr), timeout_ms, service_name, handler)
    }

    fn add_impl(
        &self,
        addr: Endpoint,
        local_addr: Option<Endpoint>,
        timeout_ms: u64,
        service_name: Option<&str>,
        handler: Option<Arc<dyn EventHandler>>,
    ) {
        let mut data = self.inner.data.lock().unwrap();

        if data.conns.contains_key(&addr) {
            return;
        }

        let conn_state = Arc::new(ConnectionState::new(
            addr,
            local_addr,
            timeout_ms,
            service_name,
            handler,
        ));
        data.conns.insert(addr, Arc::clone(&conn_state));
        debug!(self.inner.log, "added connection for {}", conn_state.label());

        let mut state = conn_state.state.lock().unwrap();
        send_connect_request(&self.inner, &mut data, &conn_state, &mut state);
    }

    /// Remove a peer endpoint from the manager.
    ///
    /// Pending retry entries for the endpoint are neutralized. If the peer
    /// was connected the comm layer is asked to close the socket and the
    /// status of that close is returned. Removing an address that was never
    /// registered returns `Ok(())`.
    pub fn remove(&self, addr: Endpoint) -> Result<(), Error> {
        let mut do_close = false;

        {
            let mut data = self.inner.data.lock().unwrap();
            if let Some(conn_state) = data.conns.remove(&addr) {
                let mut state = conn_state.state.lock().unwrap();
                if state.connected {
                    do_close = true;
                } else {
                    // Mark the record connected so stale retry entries are
                    // discarded when popped.
                    state.connected = true;
                }
            }
        }

        if do_close {
            self.inner.comm.close_socket(addr)
        } else {
            Ok(())
        }
    }

    /// Block until a connection to `addr` is established or `max_wait_ms`
    /// milliseconds have elapsed. Returns true when the endpoint is
    /// connected, false on deadline expiry or when the address is not
    /// registered.
    pub fn wait_for_connection(&self, addr: Endpoint, max_wait_ms: u64) -> bool {
        let timer = Timer::new(max_wait_ms);
        self.wait_for_connection_timer(addr, &timer)
    }

    /// As [`wait_for_connection`](#method.wait_for_connection), with the
    /// deadline supplied by an existing [`Timer`](../timer/struct.Timer.html)
    /// so one deadline may be spread over waits on several endpoints.
    pub fn wait_for_connection_timer(&self, addr: Endpoint, timer: &Timer) -> bool {
        let conn_state = {
            let data = self.inner.data.lock().unwrap();
            match data.conns.get(&addr) {
                Some(conn_state) => Arc::clone(conn_state),
                None => return false,
            }
        };

        // The manager lock is released before waiting on the record
        // condition; the event handler path needs it to mark the record
        // connected.
        let mut state = conn_state.state.lock().unwrap();
        while !state.connected {
            if timer.expired() {
                return false;
            }
            let (guard, wait_result) = conn_state
                .cond
                .wait_timeout(state, timer.remaining())
                .unwrap();
            state = guard;
            // A record poisoned by `remove` flips to connected without a
            // signal; deadline expiry reports false either way.
            if wait_result.timed_out() {
                return false;
            }
        }

        true
    }

    /// True when the comm layer currently holds a live socket to `addr`.
    pub fn is_connected(&self, addr: Endpoint) -> bool {
        let conn_state = {
            let data = self.inner.data.lock().unwrap();
            data.conns.get(&addr).cloned()
        };

        match conn_state {
            Some(conn_state) => conn_state.state.lock().unwrap().connected,
            None => false,
        }
    }

    /// Enable or disable quiet mode. In quiet mode disconnect and error
    /// events are not logged.
    pub fn set_quiet_mode(&self, quiet_mode: bool) {
        self.inner.data.lock().unwrap().quiet_mode = quiet_mode;
    }

    /// Stop the retry worker and drop every registered endpoint, closing
    /// the sockets that are still connected. This function may only be
    /// called on the original manager instance; invocation on a clone
    /// returns `Error::ShutdownByClone`.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        if self.retry_thread.is_none() {
            return Err(Error::ShutdownByClone);
        }

        {
            let mut data = self.inner.data.lock().unwrap();
            data.shutdown = true;
            self.inner.retry_cond.notify_all();
        }

        let retry_thread = self.retry_thread.take().unwrap();
        let _ = retry_thread.join();

        let drained: Vec<(Endpoint, Arc<ConnectionState>)> = {
            let mut data = self.inner.data.lock().unwrap();
            data.retry_queue.clear();
            data.conns.drain().collect()
        };

        for (addr, conn_state) in drained {
            let connected = conn_state.state.lock().unwrap().connected;
            if connected {
                if let Err(e) = self.inner.comm.close_socket(addr) {
                    warn!(
                        self.inner.log,
                        "Failed to close socket to {}: {}",
                        conn_state.label(),
                        e
                    );
                }
            }
        }

        debug!(self.inner.log, "connection manager shut down");
        Ok(())
    }
}

impl Clone for ConnectionManager {
    fn clone(&self) -> ConnectionManager {
        ConnectionManager {
            inner: Arc::clone(&self.inner),
            retry_thread: None,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Shutdown is rejected for clones; ignore the result.
        let _ = self.shutdown();
    }
}

impl EventHandler for ConnectionManager {
    fn handle(&self, event: &Event) {
        self.inner.handle(event)
    }
}

impl EventHandler for ManagerInner {
    // The comm layer dispatch entry point. Connection established events
    // flip the record to connected and wake any waiters. Error and
    // disconnect events mark the record disconnected and schedule a retry
    // at the endpoint's interval. Every event is then chained to the
    // downstream handler registered for the endpoint; events for
    // unregistered addresses are dropped.
    fn handle(&self, event: &Event) {
        let downstream = {
            let mut data = self.data.lock().unwrap();
            let found = data.conns.get(&event.addr).cloned();

            match found {
                Some(conn_state) => {
                    let mut state = conn_state.state.lock().unwrap();
                    match event.kind {
                        EventKind::ConnectionEstablished => {
                            state.connected = true;
                            conn_state.cond.notify_all();
                        }
                        EventKind::Error | EventKind::Disconnect => {
                            if !data.quiet_mode {
                                info!(
                                    self.log,
                                    "{}; problem connecting to {}, will retry in {} milliseconds...",
                                    event,
                                    conn_state.label(),
                                    conn_state.timeout_ms
                                );
                            }
                            state.connected = false;
                            state.next_retry =
                                Instant::now() + Duration::from_millis(conn_state.timeout_ms);
                            data.retry_queue.push(RetryEntry {
                                when: state.next_retry,
                                state: Arc::clone(&conn_state),
                            });
                            self.retry_cond.notify_one();
                        }
                        EventKind::Message => (),
                    }
                    conn_state.handler.clone()
                }
                None => {
                    warn!(
                        self.log,
                        "Unable to find connection for {} in registry.", event.addr
                    );
                    None
                }
            }
        };

        // Chain the event to the downstream handler with both locks
        // released; a downstream handler is free to call back into the
        // manager.
        if let Some(downstream) = downstream {
            downstream.handle(event);
        }
    }
}

/// Attempt to establish a connection for the given record. If the comm
/// layer reports an existing live socket the record transitions straight to
/// connected. Any other failure is logged and a retry is scheduled by
/// updating the record's `next_retry` and pushing an entry onto the retry
/// schedule.
///
/// Called with the manager lock and the record lock both held.
fn send_connect_request(
    inner: &Arc<ManagerInner>,
    data: &mut ManagerData,
    conn_state: &Arc<ConnectionState>,
    state: &mut ConnState,
) {
    let handler: Arc<dyn EventHandler> = Arc::clone(inner) as Arc<dyn EventHandler>;

    let result = match conn_state.local_addr {
        Some(local_addr) => inner
            .comm
            .connect_from(conn_state.addr, local_addr, handler),
        None => inner.comm.connect(conn_state.addr, handler),
    };

    match result {
        Ok(()) => (),
        Err(Error::AlreadyConnected) => {
            state.connected = true;
            conn_state.cond.notify_all();
        }
        Err(e) => {
            match &conn_state.service_name {
                Some(service_name) => error!(
                    inner.log,
                    "Connection attempt to {} at {} failed - {}. Will retry \
                     again in {} milliseconds...",
                    service_name,
                    conn_state.addr,
                    e,
                    conn_state.timeout_ms
                ),
                None => error!(
                    inner.log,
                    "Connection attempt to service at {} failed - {}. Will \
                     retry again in {} milliseconds...",
                    conn_state.addr,
                    e,
                    conn_state.timeout_ms
                ),
            }

            // Reschedule, with a little randomness thrown in.
            let now = Instant::now();
            let base = now + Duration::from_millis(conn_state.timeout_ms);
            let mut rng = rand::thread_rng();
            let jitter = Duration::from_millis(rng.gen_range(0, RETRY_JITTER_WINDOW_MS));
            state.next_retry = if rng.gen::<bool>() {
                base + jitter
            } else {
                base.checked_sub(jitter).unwrap_or(now)
            };

            data.retry_queue.push(RetryEntry {
                when: state.next_retry,
                state: Arc::clone(conn_state),
            });
            inner.retry_cond.notify_one();
        }
    }
}

/// The retry worker loop. Sleeps until the head of the retry schedule is
/// due, then re-issues the connect request for the head record. Records
/// that reconnected through another path, and records poisoned by `remove`,
/// are popped and discarded.
fn retry_loop(inner: Arc<ManagerInner>) {
    let mut data = inner.data.lock().unwrap();

    while !data.shutdown {
        while data.retry_queue.is_empty() {
            data = inner.retry_cond.wait(data).unwrap();
            if data.shutdown {
                return;
            }
        }

        let conn_state = Arc::clone(&data.retry_queue.peek().unwrap().state);
        let mut state = conn_state.state.lock().unwrap();

        if state.connected {
            drop(state);
            data.retry_queue.pop();
            continue;
        }

        let now = Instant::now();
        if state.next_retry <= now {
            data.retry_queue.pop();
            send_connect_request(&inner, &mut data, &conn_state, &mut state);
            continue;
        }

        let wait = state.next_retry - now;
        drop(state);
        let (guard, _) = inner.retry_cond.wait_timeout(data, wait).unwrap();
        data = guard;
    }
}
