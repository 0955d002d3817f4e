//! SDK version triple.
//!
//! Versions are compared as `(major, minor, patch)` integers. Missing trailing
//! components count as zero, so `"1.2"` equals `"1.2.0"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{FrameBridgeError, Result};

/// Version announced by this library in the handshake when no override is configured.
pub const DEFAULT_SDK_VERSION: &str = "2.0.0";

/// Version assumed for a host that does not report one.
pub const DEFAULT_CLIENT_SUPPORTED_SDK_VERSION: SdkVersion = SdkVersion::new(2, 0, 1);

/// Latest runtime descriptor api version this library understands.
pub const LATEST_RUNTIME_API_VERSION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SdkVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SdkVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse `major[.minor[.patch]]`. Every component must be all digits.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = [0u32; 3];
        let mut count = 0usize;
        for raw in s.split('.') {
            if count == parts.len() {
                return Err(FrameBridgeError::BadRequest(format!(
                    "version has more than three components: {s}"
                )));
            }
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FrameBridgeError::BadRequest(format!("invalid version: {s}")));
            }
            parts[count] = raw
                .parse()
                .map_err(|_| FrameBridgeError::BadRequest(format!("version component overflow: {s}")))?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl FromStr for SdkVersion {
    type Err = FrameBridgeError;

    fn from_str(s: &str) -> Result<Self> {
        SdkVersion::parse(s)
    }
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
