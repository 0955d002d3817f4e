//! Runtime capability registry: the negotiated descriptor and the static
//! compatibility tables used to synthesize one for older hosts.

pub mod descriptor;
pub mod legacy;

pub use descriptor::{CapabilitySet, RuntimeDescriptor};
pub use legacy::{legacy_descriptor, synthesize, VersionFragment, VERSION_CAPABILITY_TABLE};
