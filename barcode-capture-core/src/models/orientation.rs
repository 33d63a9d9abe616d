use serde::{Deserialize, Serialize};

/// Orientation of the user interface, as reported by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl InterfaceOrientation {
    /// Decode the platform's raw interface orientation value.
    ///
    /// Landscape raw values are swapped relative to device orientation on the
    /// platform: interface landscape-right is 3, landscape-left is 4.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Portrait,
            2 => Self::PortraitUpsideDown,
            3 => Self::LandscapeRight,
            4 => Self::LandscapeLeft,
            _ => Self::Unknown,
        }
    }
}

/// Orientation applied to capture connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl VideoOrientation {
    pub fn raw(&self) -> i64 {
        match self {
            Self::Portrait => 1,
            Self::PortraitUpsideDown => 2,
            Self::LandscapeRight => 3,
            Self::LandscapeLeft => 4,
        }
    }
}

impl From<InterfaceOrientation> for VideoOrientation {
    fn from(orientation: InterfaceOrientation) -> Self {
        match orientation {
            InterfaceOrientation::Portrait => Self::Portrait,
            InterfaceOrientation::PortraitUpsideDown => Self::PortraitUpsideDown,
            InterfaceOrientation::LandscapeLeft => Self::LandscapeLeft,
            InterfaceOrientation::LandscapeRight => Self::LandscapeRight,
            InterfaceOrientation::Unknown => Self::Portrait,
        }
    }
}
