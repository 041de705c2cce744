// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constructor-argument configuration for the Producer and Consumer roles
//! (spec §4.L). Plain data, no file or CLI-flag loading: a host application
//! builds one of these and passes it to [`crate::producer::Producer::new`] or
//! [`crate::consumer::Consumer::new`].

use std::net::IpAddr;
use std::time::Duration;

use crate::core::ids::{Cid, Name};
use crate::protocol::constants::TRANSFORM_INTERVAL_DEFAULT;

/// Which IP address family a role should bind and multicast on.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AddressFamily {
    V4,
    V6,
}

impl Default for AddressFamily {
    fn default() -> Self {
        Self::V4
    }
}

/// Tunables for a [`crate::producer::Producer`] (spec §4.H, §4.L).
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Name of the local network interface to bind and send from, e.g.
    /// `"eth0"`. `None` lets the socket adapter pick a default.
    pub interface: Option<String>,
    pub address_family: AddressFamily,
    pub local_cid: Cid,
    pub local_name: Name,
    /// Per-system Transform emission interval. Clamped to
    /// `[TRANSFORM_INTERVAL_MIN, TRANSFORM_INTERVAL_MAX]` at construction.
    pub transform_interval: Duration,
    /// Bind address for the local unicast socket used for Request replies.
    pub bind_address: Option<IpAddr>,
}

impl ProducerConfig {
    pub fn new(local_cid: Cid, local_name: impl Into<String>) -> Self {
        Self {
            interface: None,
            address_family: AddressFamily::default(),
            local_cid,
            local_name: Name::new(local_name),
            transform_interval: TRANSFORM_INTERVAL_DEFAULT,
            bind_address: None,
        }
    }

    pub fn with_transform_interval(mut self, interval: Duration) -> Self {
        use crate::protocol::constants::{TRANSFORM_INTERVAL_MAX, TRANSFORM_INTERVAL_MIN};
        self.transform_interval = interval.clamp(TRANSFORM_INTERVAL_MIN, TRANSFORM_INTERVAL_MAX);
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }
}

/// Tunables for a [`crate::consumer::Consumer`] (spec §4.G, §4.L).
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub interface: Option<String>,
    pub address_family: AddressFamily,
    pub local_cid: Cid,
    pub local_name: Name,
    pub bind_address: Option<IpAddr>,
}

impl ConsumerConfig {
    pub fn new(local_cid: Cid, local_name: impl Into<String>) -> Self {
        Self {
            interface: None,
            address_family: AddressFamily::default(),
            local_cid,
            local_name: Name::new(local_name),
            bind_address: None,
        }
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_interval_clamps_to_bounds() {
        let cfg = ProducerConfig::new(Cid::new_v4(), "Fixture")
            .with_transform_interval(Duration::from_millis(500));
        assert_eq!(cfg.transform_interval, Duration::from_millis(50));

        let cfg = ProducerConfig::new(Cid::new_v4(), "Fixture")
            .with_transform_interval(Duration::from_micros(1));
        assert_eq!(cfg.transform_interval, Duration::from_millis(1));
    }

    #[test]
    fn default_transform_interval_is_30ms() {
        let cfg = ProducerConfig::new(Cid::new_v4(), "Fixture");
        assert_eq!(cfg.transform_interval, Duration::from_millis(30));
    }
}
