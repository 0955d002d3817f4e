use std::sync::Arc;

use framebridge_core::protocol::context::{FrameContext, HostClientType};
use framebridge_core::version::SdkVersion;

use crate::runtime::RuntimeDescriptor;

/// Immutable outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub frame_context: FrameContext,
    pub host_client_type: HostClientType,
    /// Host-reported version, or the compatibility default when none was sent.
    pub client_supported_sdk_version: SdkVersion,
    pub runtime: Arc<RuntimeDescriptor>,
}

impl FrameInfo {
    pub fn supports(&self, name: &str) -> bool {
        self.runtime.supports().contains(name)
    }

    pub fn supports_path(&self, path: &[&str]) -> bool {
        self.runtime.supports().contains_path(path)
    }

    pub fn is_host_client_mobile(&self) -> bool {
        self.host_client_type.is_mobile()
    }

    pub fn is_sdk_version_at_least(&self, required: SdkVersion) -> bool {
        self.client_supported_sdk_version >= required
    }
}
