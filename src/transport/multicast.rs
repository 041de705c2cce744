// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multicast group joining and interface discovery, grounded in the
//! teacher's `transport/multicast.rs`.

use std::io;
use std::net::{Ipv4Addr, UdpSocket};

/// Join an IPv4 multicast `group` on every non-loopback interface discovered
/// on this host, falling back to `UNSPECIFIED` if none are found.
pub fn join_multicast_v4(socket: &UdpSocket, group: Ipv4Addr) -> io::Result<Ipv4Addr> {
    let interfaces = discover_interfaces()?;

    if interfaces.is_empty() {
        socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        #[cfg(feature = "logging")]
        log::debug!("[otp] join_multicast_v4({group}) on UNSPECIFIED (no interfaces found)");
        return Ok(Ipv4Addr::UNSPECIFIED);
    }

    for iface in &interfaces {
        match socket.join_multicast_v4(&group, iface) {
            Ok(()) => {
                #[cfg(feature = "logging")]
                log::debug!("[otp] join_multicast_v4({group}) on interface {iface}");
            }
            Err(e) if e.raw_os_error() == Some(98) => {
                // EADDRINUSE: already joined on this physical NIC, not fatal.
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                log::debug!("[otp] join_multicast_v4({group}) on {iface} failed (non-fatal): {e}");
            }
        }
    }

    socket.set_multicast_loop_v4(true)?;
    Ok(interfaces[0])
}

/// Leave a previously joined IPv4 multicast group on every known interface.
pub fn leave_multicast_v4(socket: &UdpSocket, group: Ipv4Addr) -> io::Result<()> {
    for iface in discover_interfaces()? {
        let _ = socket.leave_multicast_v4(&group, &iface);
    }
    Ok(())
}

/// Discover non-loopback IPv4 interfaces suitable for multicast, via the
/// portable `local_ip_address` crate (the teacher additionally parses `ip
/// addr show` on Linux; this crate only needs the portable path).
pub fn discover_interfaces() -> io::Result<Vec<Ipv4Addr>> {
    use std::net::IpAddr;

    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(ifs) => ifs,
        Err(_) => return Ok(Vec::new()),
    };

    let mut addrs = Vec::new();
    for (_name, ip) in interfaces {
        if let IpAddr::V4(ipv4) = ip {
            if !ipv4.is_loopback() {
                addrs.push(ipv4);
            }
        }
    }
    Ok(addrs)
}
