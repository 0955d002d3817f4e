//! Compatibility data for hosts that predate self-reported runtime descriptors.
//!
//! Both tables are static data. A synthesized descriptor is the legacy
//! capability set plus every fragment whose version is at or below the host's
//! highest supported SDK version and whose client list names the host.

use framebridge_core::protocol::context::HostClientType;
use framebridge_core::version::SdkVersion;

use super::descriptor::{CapabilitySet, RuntimeDescriptor};

/// Capabilities every legacy host has, as dotted paths.
pub const LEGACY_CAPABILITIES: &[&str] = &[
    "appInstallDialog",
    "appEntity",
    "call",
    "chat",
    "conversations",
    "dialog.bot",
    "dialog.update",
    "logs",
    "meetingRoom",
    "menus",
    "monetization",
    "notifications",
    "pages.appButton",
    "pages.tabs",
    "pages.config",
    "pages.backStack",
    "pages.fullTrust",
    "remoteCamera",
    "sharing",
    "stageView",
    "teams.fullTrust",
    "teamsCore",
    "video",
];

/// Client types of the first host generation.
pub const V1_HOST_CLIENT_TYPES: &[&str] = &[
    "desktop",
    "web",
    "android",
    "ios",
    "rigel",
    "surfaceHub",
    "teamsRoomsWindows",
    "teamsRoomsAndroid",
    "teamsPhones",
    "teamsDisplays",
];

/// One row of the version table.
#[derive(Debug, Clone, Copy)]
pub struct VersionFragment {
    pub version: SdkVersion,
    /// Dotted capability path added by this row.
    pub capability: &'static str,
    pub host_client_types: &'static [&'static str],
}

impl VersionFragment {
    pub fn applies_to(&self, client: &HostClientType) -> bool {
        self.host_client_types.iter().any(|t| *t == client.as_str())
    }
}

/// Capabilities gained per SDK version, ordered by version.
pub const VERSION_CAPABILITY_TABLE: &[VersionFragment] = &[
    VersionFragment {
        version: SdkVersion::new(1, 9, 0),
        capability: "location",
        host_client_types: V1_HOST_CLIENT_TYPES,
    },
    VersionFragment {
        version: SdkVersion::new(2, 0, 0),
        capability: "people",
        host_client_types: V1_HOST_CLIENT_TYPES,
    },
    VersionFragment {
        version: SdkVersion::new(2, 0, 1),
        capability: "teams.fullTrust.joinedTeams",
        host_client_types: &[
            "android",
            "desktop",
            "ios",
            "teamsRoomsAndroid",
            "teamsPhones",
            "teamsDisplays",
            "web",
        ],
    },
    VersionFragment {
        version: SdkVersion::new(2, 0, 1),
        capability: "webStorage",
        host_client_types: &["desktop"],
    },
    VersionFragment {
        version: SdkVersion::new(2, 0, 5),
        capability: "webStorage",
        host_client_types: &["android", "desktop", "ios"],
    },
];

const LEGACY_API_VERSION: u32 = 1;

/// The plain legacy descriptor.
pub fn legacy_descriptor() -> RuntimeDescriptor {
    RuntimeDescriptor::new(
        LEGACY_API_VERSION,
        true,
        CapabilitySet::from_paths(LEGACY_CAPABILITIES.iter().copied()),
    )
}

/// Legacy descriptor widened by the version table for this host.
pub fn synthesize(highest_supported: SdkVersion, client: &HostClientType) -> RuntimeDescriptor {
    let mut supports = CapabilitySet::from_paths(LEGACY_CAPABILITIES.iter().copied());
    for fragment in VERSION_CAPABILITY_TABLE
        .iter()
        .filter(|f| f.version <= highest_supported && f.applies_to(client))
    {
        supports.insert_path(fragment.capability);
    }
    RuntimeDescriptor::new(LEGACY_API_VERSION, true, supports)
}
