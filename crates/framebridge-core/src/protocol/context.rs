//! Frame context and host client tags carried by the handshake reply.

use std::fmt;

/// The embedding surface the app is currently running in.
///
/// Tags this library does not know are kept as `Other`; no context allow-list
/// names them, so context-restricted calls fail with `WrongContext`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameContext {
    Settings,
    Content,
    Authentication,
    Remove,
    Task,
    SidePanel,
    Stage,
    MeetingStage,
    Other(String),
}

impl FrameContext {
    /// Every context with a known wire tag.
    pub const KNOWN: [FrameContext; 8] = [
        FrameContext::Settings,
        FrameContext::Content,
        FrameContext::Authentication,
        FrameContext::Remove,
        FrameContext::Task,
        FrameContext::SidePanel,
        FrameContext::Stage,
        FrameContext::MeetingStage,
    ];

    /// Wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            FrameContext::Settings => "settings",
            FrameContext::Content => "content",
            FrameContext::Authentication => "authentication",
            FrameContext::Remove => "remove",
            FrameContext::Task => "task",
            FrameContext::SidePanel => "sidePanel",
            FrameContext::Stage => "stage",
            FrameContext::MeetingStage => "meetingStage",
            FrameContext::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "settings" => FrameContext::Settings,
            "content" => FrameContext::Content,
            "authentication" => FrameContext::Authentication,
            "remove" => FrameContext::Remove,
            "task" => FrameContext::Task,
            "sidePanel" => FrameContext::SidePanel,
            "stage" => FrameContext::Stage,
            "meetingStage" => FrameContext::MeetingStage,
            other => FrameContext::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FrameContext::Other(_))
    }
}

impl fmt::Display for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client platform the host runs on.
///
/// Unknown tags are preserved so that newer hosts do not break the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostClientType {
    Desktop,
    Web,
    Android,
    Ios,
    Ipados,
    Rigel,
    SurfaceHub,
    TeamsRoomsWindows,
    TeamsRoomsAndroid,
    TeamsPhones,
    TeamsDisplays,
    Other(String),
}

impl HostClientType {
    pub fn as_str(&self) -> &str {
        match self {
            HostClientType::Desktop => "desktop",
            HostClientType::Web => "web",
            HostClientType::Android => "android",
            HostClientType::Ios => "ios",
            HostClientType::Ipados => "ipados",
            HostClientType::Rigel => "rigel",
            HostClientType::SurfaceHub => "surfaceHub",
            HostClientType::TeamsRoomsWindows => "teamsRoomsWindows",
            HostClientType::TeamsRoomsAndroid => "teamsRoomsAndroid",
            HostClientType::TeamsPhones => "teamsPhones",
            HostClientType::TeamsDisplays => "teamsDisplays",
            HostClientType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "desktop" => HostClientType::Desktop,
            "web" => HostClientType::Web,
            "android" => HostClientType::Android,
            "ios" => HostClientType::Ios,
            "ipados" => HostClientType::Ipados,
            "rigel" => HostClientType::Rigel,
            "surfaceHub" => HostClientType::SurfaceHub,
            "teamsRoomsWindows" => HostClientType::TeamsRoomsWindows,
            "teamsRoomsAndroid" => HostClientType::TeamsRoomsAndroid,
            "teamsPhones" => HostClientType::TeamsPhones,
            "teamsDisplays" => HostClientType::TeamsDisplays,
            other => HostClientType::Other(other.to_string()),
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(
            self,
            HostClientType::Android | HostClientType::Ios | HostClientType::Ipados
        )
    }
}

impl fmt::Display for HostClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
