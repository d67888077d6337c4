/*
 * Copyright 2020 Joyent, Inc.
 */

use std::error;
use std::fmt;
use std::io;

/// Status codes surfaced by the comm layer and by the connection manager.
#[derive(Debug)]
pub enum Error {
    /// The comm layer already holds a live socket for the endpoint. The
    /// connection manager treats this result as a successful connect.
    AlreadyConnected,
    /// The connect or close attempt failed at the socket layer.
    Io(io::Error),
    /// Any other comm layer failure. The connection manager treats these as
    /// transient and schedules a retry.
    Comm(String),
    /// `shutdown` was invoked on a clone of the manager rather than on the
    /// original instance.
    ShutdownByClone,
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AlreadyConnected => "already connected".fmt(fmt),
            Error::Io(io_err) => io_err.fmt(fmt),
            Error::Comm(err_str) => err_str.fmt(fmt),
            Error::ShutdownByClone => {
                "shutdown may only be called on the original manager".fmt(fmt)
            }
        }
    }
}

impl error::Error for Error {}
