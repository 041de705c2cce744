// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transport layer: the collaborator seam a Producer/Consumer sends and
//! receives datagrams through (spec §4.I).
//!
//! This crate does not mandate any particular socket implementation -
//! [`SocketAdapter`] is the seam, and [`udp::UdpSocketAdapter`] is the
//! default `socket2`-backed implementation, grounded in the teacher's
//! `transport/udp.rs`/`transport/multicast.rs`. Host applications may supply
//! their own adapter (e.g. for simulation/testing, or a transport that
//! multiplexes several interfaces).

pub mod multicast;
pub mod udp;

pub use udp::UdpSocketAdapter;

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// One datagram received off the wire, with its arrival metadata
/// (spec §4.I: "deliver received datagrams with (bytes, sender, destination,
/// arrival-time)").
#[derive(Clone, Debug)]
pub struct IncomingDatagram {
    pub bytes: Vec<u8>,
    pub sender: SocketAddr,
    pub destination: IpAddr,
    pub arrived_at: Instant,
}

/// The minimal contract a Producer/Consumer role needs from a socket: bind,
/// join/leave multicast groups, send, and receive. It does not parse
/// anything and it does not retry (spec §4.I).
pub trait SocketAdapter: Send + Sync {
    /// Bind to the given interface (by name, platform-defined resolution)
    /// and address family, on the fixed OTP port.
    fn bind(&mut self, interface: Option<&str>, bind_address: Option<IpAddr>) -> io::Result<()>;

    /// Join a multicast group so datagrams sent to it are delivered locally.
    fn join_multicast(&mut self, group: IpAddr) -> io::Result<()>;

    /// Leave a previously joined multicast group.
    fn leave_multicast(&mut self, group: IpAddr) -> io::Result<()>;

    /// Send one datagram to `destination` (unicast or multicast).
    fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> io::Result<usize>;

    /// Block until one datagram arrives, or return an error. Implementations
    /// MUST NOT block forever without a way to be interrupted by socket
    /// shutdown (e.g. OS-level read timeout), since periodic roles share a
    /// receive thread with their shutdown signal.
    fn recv(&self) -> io::Result<IncomingDatagram>;

    /// The local unicast address this adapter sends Request replies from.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}
