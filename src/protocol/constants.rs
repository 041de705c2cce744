// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire constants: preamble, vectors, UDP port, multicast groups, and the
//! timing constants from spec §3/§4.H, pinned against
//! `examples/original_source/src/const.hpp`.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Fixed 12-octet preamble: "OTP-E1.59" + NUL padding (spec §4.B.1).
pub const PREAMBLE: [u8; 12] = *b"OTP-E1.59\0\0\0";

/// Root (OTP) layer vectors.
pub const VECTOR_OTP_TRANSFORM_MESSAGE: u16 = 0x0001;
pub const VECTOR_OTP_ADVERTISEMENT_MESSAGE: u16 = 0x0002;

/// Transform layer vector.
pub const VECTOR_OTP_POINT: u16 = 0x0001;
/// Point layer vector.
pub const VECTOR_OTP_MODULE: u16 = 0x0001;

/// Advertisement inner-layer selectors.
pub const VECTOR_OTP_ADVERTISEMENT_MODULE: u16 = 0x0001;
pub const VECTOR_OTP_ADVERTISEMENT_NAME: u16 = 0x0002;
pub const VECTOR_OTP_ADVERTISEMENT_SYSTEM: u16 = 0x0003;

/// List-payload vectors inside each advertisement inner layer.
pub const VECTOR_OTP_MODULE_ADVERTISEMENT_LIST: u16 = 0x0001;
pub const VECTOR_OTP_NAME_ADVERTISEMENT_LIST: u16 = 0x0001;
pub const VECTOR_OTP_SYSTEM_ADVERTISEMENT_LIST: u16 = 0x0001;

/// ESTA (standard module) manufacturer ID.
pub const MANUFACTURER_ESTA: u16 = 0x0000;

/// Standard module numbers (spec §4.B.4).
pub const MODULE_POSITION: u16 = 0x0001;
pub const MODULE_POSITION_VEL_ACC: u16 = 0x0002;
pub const MODULE_ROTATION: u16 = 0x0003;
pub const MODULE_ROTATION_VEL_ACC: u16 = 0x0004;
pub const MODULE_SCALE: u16 = 0x0005;
pub const MODULE_REFERENCE_FRAME: u16 = 0x0006;

/// UDP port for every OTP datagram (spec §4.H).
pub const OTP_PORT: u16 = 5568;

/// Advertisement multicast groups (spec §4.H).
pub const ADVERTISEMENT_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(239, 159, 2, 1);
pub const ADVERTISEMENT_MULTICAST_V6: Ipv6Addr =
    Ipv6Addr::new(0xff18, 0, 0, 0, 0, 0x9f, 0, 0x0201);

/// Transform multicast group for a given System, IPv4: `239.159.1.S`.
pub fn transform_multicast_v4(system: u8) -> Ipv4Addr {
    Ipv4Addr::new(239, 159, 1, system)
}

/// Transform multicast group for a given System, IPv6: `ff18::9f:0:1:S`.
pub fn transform_multicast_v6(system: u8) -> Ipv6Addr {
    Ipv6Addr::new(0xff18, 0, 0, 0, 0x9f, 0, 1, system as u16)
}

/// Datagram size bounds, entire message including the Root layer (spec §6).
pub mod size_bounds {
    pub const TRANSFORM_MIN: usize = 134;
    pub const TRANSFORM_MAX: usize = 1472;
    pub const MODULE_ADV_MIN: usize = 96;
    pub const MODULE_ADV_MAX: usize = 1471;
    pub const NAME_ADV_MIN: usize = 96;
    pub const NAME_ADV_MAX: usize = 1461;
    pub const SYSTEM_ADV_MIN: usize = 96;
    pub const SYSTEM_ADV_MAX: usize = 296;
}

/// List-payload bounds for each advertisement's inner list (spec §4.B.5).
pub mod list_bounds {
    pub const MODULE_LIST_MIN: usize = 4;
    pub const MODULE_LIST_MAX: usize = 1376;
    pub const NAME_LIST_MAX: usize = 1365;
    pub const SYSTEM_LIST_MAX: usize = 200;
}

/// Producer transmission timing (spec §4.H, §3, and the upstream
/// `OTP_TRANSFORM_*`/`OTP_ADVERTISEMENT_*` constants in `const.hpp`).
pub const TRANSFORM_INTERVAL_MIN: Duration = Duration::from_millis(1);
pub const TRANSFORM_INTERVAL_MAX: Duration = Duration::from_millis(50);
pub const TRANSFORM_INTERVAL_DEFAULT: Duration = Duration::from_millis(30);
pub const FULL_POINT_SET_TIMING_MIN: Duration = Duration::from_millis(2800);
pub const FULL_POINT_SET_TIMING_MAX: Duration = Duration::from_millis(3000);
pub const TRANSFORM_DATA_LOSS_TIMEOUT: Duration = Duration::from_millis(7500);
pub const ADVERTISEMENT_TIMING: Duration = Duration::from_secs(10);
pub const ADVERTISEMENT_STARTUP_WAIT: Duration = Duration::from_secs(12);
pub const ADVERTISEMENT_TIMEOUT: Duration = Duration::from_secs(30);
pub const COMPONENT_TIMEOUT: Duration = ADVERTISEMENT_TIMEOUT;
pub const NAME_ADVERTISEMENT_MAX_BACKOFF: Duration = Duration::from_secs(5);
pub const SYSTEM_ADVERTISEMENT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Merger wake interval when no dirty signal has arrived (spec §4.F).
pub const MERGER_MAX_WAIT: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_is_literal_otp_e1_59() {
        assert_eq!(&PREAMBLE, b"OTP-E1.59\0\0\0");
        assert_eq!(PREAMBLE.len(), 12);
    }

    #[test]
    fn transform_multicast_address_embeds_system() {
        assert_eq!(transform_multicast_v4(5), Ipv4Addr::new(239, 159, 1, 5));
    }
}
