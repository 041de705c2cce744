// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validated wire-domain identifier newtypes (spec §3, "Identifiers and
//! address space").
//!
//! Each range-restricted field on the wire gets its own type so an invalid
//! value cannot silently flow between layers; construction from a raw wire
//! integer always goes through a `try_from`/`validate` that enforces the
//! declared range.

use std::fmt;

use crate::error::CodecError;

/// 128-bit RFC-4122 UUID identifying a component persistently.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Cid(pub [u8; 16]);

impl Cid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 16] {
        self.0
    }

    pub fn zero() -> Self {
        Self([0; 16])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Generate a random v4 CID, suitable for a freshly-booted component.
    pub fn new_v4() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", uuid::Uuid::from_bytes(self.0))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0))
    }
}

/// System number. Valid range 1..=200; 0 and 201..=255 are reserved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct System(u8);

impl System {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 200;

    pub fn new(value: u8) -> Result<Self, CodecError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CodecError::FieldOutOfRange { layer: "Transform", field: "System" })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Group number. Valid range 1..=60000; 0 and 60001..=65535 are reserved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Group(u16);

impl Group {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 60_000;

    pub fn new(value: u16) -> Result<Self, CodecError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CodecError::FieldOutOfRange { layer: "Point", field: "Group" })
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

/// Point number. Valid range 1..=4_000_000_000; outside is reserved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Point(u32);

impl Point {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 4_000_000_000;

    pub fn new(value: u32) -> Result<Self, CodecError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CodecError::FieldOutOfRange { layer: "Point", field: "Point" })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", self.0)
    }
}

/// Producer priority. Valid range 0..=200; 201..=255 are reserved and MUST
/// cause the surrounding message to be discarded (spec §3, §7).
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 200;

    pub fn new(value: u8) -> Result<Self, CodecError> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(CodecError::ReservedPriority { priority: value })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(100)
    }
}

/// The triple that names a Point uniquely within a component's scope.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct Address {
    pub system: System,
    pub group: Group,
    pub point: Point,
}

impl Address {
    pub fn new(system: System, group: Group, point: Point) -> Self {
        Self { system, group, point }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.system.get(), self.group.get(), self.point.get())
    }
}

/// A fixed-width (usually 32-octet) component or point name.
///
/// Stored as an owned `String`; wire encoding/decoding truncation and
/// null-padding happens at the cursor (core::ser::cursor).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Name(pub String);

impl Name {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_boundaries() {
        assert!(System::new(0).is_err());
        assert!(System::new(1).is_ok());
        assert!(System::new(200).is_ok());
        assert!(System::new(201).is_err());
    }

    #[test]
    fn group_boundaries() {
        assert!(Group::new(0).is_err());
        assert!(Group::new(1).is_ok());
        assert!(Group::new(60_000).is_ok());
        assert!(Group::new(60_001).is_err());
    }

    #[test]
    fn point_boundaries() {
        assert!(Point::new(0).is_err());
        assert!(Point::new(1).is_ok());
        assert!(Point::new(4_000_000_000).is_ok());
        assert!(Point::new(4_000_000_001).is_err());
    }

    #[test]
    fn priority_boundaries() {
        assert!(Priority::new(0).is_ok());
        assert!(Priority::new(200).is_ok());
        assert!(Priority::new(201).is_err());
    }

    #[test]
    fn cid_zero_roundtrip() {
        let cid = Cid::zero();
        assert!(cid.is_zero());
        assert_eq!(cid.as_bytes(), [0u8; 16]);
    }
}
