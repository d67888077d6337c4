//
// Copyright 2020 Joyent, Inc.
//

//! Keep remote peers on a tether
//!
//! Tether maintains a set of outbound connections to named peer endpoints,
//! re-establishing them automatically when they drop. It sits above a
//! non-blocking communication layer (the [`Comm`]: comm/trait.Comm.html trait)
//! that owns the sockets and delivers connection lifecycle events from its own
//! dispatch thread. The
//! [`ConnectionManager`]: connection_manager/struct.ConnectionManager.html
//! keeps one record per registered endpoint, schedules reconnect attempts on
//! each endpoint's retry interval, and lets callers block until an endpoint
//! becomes reachable.
//!
//! ## Retry pacing
//!
//! Every endpoint is registered with a retry interval. When a connect attempt
//! fails immediately, the next attempt is scheduled at the interval plus or
//! minus up to two seconds of random jitter; the jitter keeps a fleet of
//! processes that started together from retrying in lockstep. When an
//! established connection drops, the next attempt is scheduled at exactly the
//! interval, since event-driven failures already arrive de-correlated. Retries
//! continue until the endpoint is removed or the manager is shut down; there
//! is no attempt cap.
//!
//! ## Waiting for connections
//!
//! [`wait_for_connection`]: connection_manager/struct.ConnectionManager.html#method.wait_for_connection
//! blocks the caller until the endpoint is connected or a deadline elapses.
//! The deadline may also be carried in a [`Timer`]: timer/struct.Timer.html so
//! that one overall deadline covers waits on several endpoints.
//!
//! # Example
//!
//! Register an endpoint against a comm layer implementation and wait for it
//! to come up:
//!
//! ```rust,ignore
//! use std::net::Ipv4Addr;
//! use std::sync::{Arc, Mutex};
//!
//! use slog::{o, Drain, Logger};
//!
//! use tether::comm::Comm;
//! use tether::connection_manager::types::ConnectionManagerOptions;
//! use tether::connection_manager::ConnectionManager;
//! use tether::endpoint::Endpoint;
//!
//! let plain = slog_term::PlainSyncDecorator::new(std::io::stdout());
//! let log = Logger::root(
//!     Mutex::new(slog_term::FullFormat::new(plain).build()).fuse(),
//!     o!("build-id" => "0.1.0"),
//! );
//!
//! let comm: Arc<dyn Comm> = Arc::new(SocketComm::new());
//!
//! let mut manager = ConnectionManager::new(
//!     comm,
//!     ConnectionManagerOptions {
//!         log: Some(log),
//!         quiet_mode: None,
//!     },
//! );
//!
//! let master = Endpoint::new(Ipv4Addr::new(10, 0, 0, 5), 38050);
//! manager.add(master, 10_000, Some("master"), None);
//!
//! if manager.wait_for_connection(master, 30_000) {
//!     // The master is reachable; issue requests through the comm layer.
//! }
//!
//! manager.shutdown().unwrap();
//! ```

#![allow(missing_docs)]

pub mod comm;
pub mod connection_manager;
pub mod endpoint;
pub mod error;
pub mod timer;
