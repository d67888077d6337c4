// Copyright 2020 Joyent, Inc.

use std::net::{Ipv4Addr, SocketAddrV4};

use derive_more::Display;

/// The port number of a peer endpoint. This is a type alias for u16.
pub type EndpointPort = u16;
/// The IPv4 address of a peer endpoint. This is a type alias for
/// std::net::Ipv4Addr.
pub type EndpointAddress = Ipv4Addr;

/// A peer endpoint: an IPv4 address and port pair.
///
/// Equality and hashing are byte-wise over the (address, port) tuple, so an
/// `Endpoint` serves as the registry key identifying one managed peer.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display(fmt = "{}:{}", address, port)]
pub struct Endpoint {
    /// The IPv4 address of the peer.
    pub address: EndpointAddress,
    /// The port of the peer.
    pub port: EndpointPort,
}

impl Endpoint {
    /// Return a new instance of `Endpoint` given an `EndpointAddress` and
    /// `EndpointPort`.
    pub fn new(address: EndpointAddress, port: EndpointPort) -> Self {
        Endpoint { address, port }
    }
}

impl From<(Ipv4Addr, u16)> for Endpoint {
    fn from(pair: (Ipv4Addr, u16)) -> Self {
        Endpoint::new(pair.0, pair.1)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Endpoint::new(*addr.ip(), addr.port())
    }
}
