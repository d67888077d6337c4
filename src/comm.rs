/*
 * Copyright 2020 Joyent, Inc.
 */

use std::fmt;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::Error;

/// The kind of an asynchronous comm layer event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// A connect request completed and a live socket now exists.
    ConnectionEstablished,
    /// A live socket was torn down.
    Disconnect,
    /// A connect attempt or a live socket failed.
    Error,
    /// An application payload arrived on a live socket.
    Message,
}

impl fmt::Display for EventKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKind::ConnectionEstablished => "CONNECTION_ESTABLISHED".fmt(fmt),
            EventKind::Disconnect => "DISCONNECT".fmt(fmt),
            EventKind::Error => "ERROR".fmt(fmt),
            EventKind::Message => "MESSAGE".fmt(fmt),
        }
    }
}

/// An asynchronous notification delivered by the comm layer.
///
/// The connection manager acts on the connection lifecycle kinds
/// (`ConnectionEstablished`, `Disconnect`, `Error`) and chains every event,
/// whatever its kind, to the downstream handler registered for the
/// endpoint. Downstream handlers must therefore be prepared for every
/// `EventKind` the comm layer can emit.
#[derive(Clone, Debug)]
pub struct Event {
    /// The kind of the event.
    pub kind: EventKind,
    /// The peer endpoint the event pertains to.
    pub addr: Endpoint,
    /// Application payload. Empty for connection lifecycle events.
    pub payload: Vec<u8>,
}

impl Event {
    /// Return a new payload-free `Event` of the given kind.
    pub fn new(kind: EventKind, addr: Endpoint) -> Self {
        Event {
            kind,
            addr,
            payload: Vec::new(),
        }
    }

    /// Return a new `Event` carrying an application payload.
    pub fn with_payload(kind: EventKind, addr: Endpoint, payload: Vec<u8>) -> Self {
        Event {
            kind,
            addr,
            payload,
        }
    }

    /// A `ConnectionEstablished` event for `addr`.
    pub fn established(addr: Endpoint) -> Self {
        Event::new(EventKind::ConnectionEstablished, addr)
    }

    /// A `Disconnect` event for `addr`.
    pub fn disconnect(addr: Endpoint) -> Self {
        Event::new(EventKind::Disconnect, addr)
    }

    /// An `Error` event for `addr`.
    pub fn error(addr: Endpoint) -> Self {
        Event::new(EventKind::Error, addr)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} event from {}", self.kind, self.addr)
    }
}

/// A sink for comm layer events.
///
/// The comm layer invokes `handle` from its own dispatch thread for each
/// event destined for a registered endpoint. No guarantee is made about
/// which thread performs the invocation beyond that it belongs to the comm
/// layer.
pub trait EventHandler: Send + Sync {
    /// Process a single event.
    fn handle(&self, event: &Event);
}

/// The non-blocking communication layer the connection manager drives.
///
/// `connect` and `connect_from` dispatch a connect request and return
/// immediately. `Ok(())` means the request was dispatched and the final
/// result will arrive as an event on the supplied handler.
/// `Err(Error::AlreadyConnected)` means a live socket to the endpoint
/// already exists. Any other error is an immediate failure; no event will
/// follow.
pub trait Comm: Send + Sync + 'static {
    /// Dispatch a connect request to `addr`, letting the operating system
    /// choose the local bind address.
    fn connect(&self, addr: Endpoint, handler: Arc<dyn EventHandler>) -> Result<(), Error>;

    /// Dispatch a connect request to `addr` with the local end bound to
    /// `local_addr`.
    fn connect_from(
        &self,
        addr: Endpoint,
        local_addr: Endpoint,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), Error>;

    /// Close the socket to `addr` if one exists.
    fn close_socket(&self, addr: Endpoint) -> Result<(), Error>;
}
