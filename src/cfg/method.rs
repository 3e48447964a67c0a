use crate::cfg::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Positioning method
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Method {
    /// Precise Point Positioning: code and phase navigation using
    /// precise orbit and clock corrections. Ambiguities are kept float.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "ppp"))]
    PPP,

    /// PPP-RTK: [Method::PPP] with satellite phase biases, allowing
    /// integer ambiguity resolution once the filter has converged.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "ppp-rtk", alias = "PPP-RTK", alias = "ppprtk")
    )]
    PPPRTK,
}

impl Method {
    /// True if this [Method] attempts integer ambiguity resolution
    pub fn resolves_ambiguities(&self) -> bool {
        *self == Self::PPPRTK
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PPP => write!(fmt, "PPP"),
            Self::PPPRTK => write!(fmt, "PPP-RTK"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ppp" => Ok(Self::PPP),
            "ppp-rtk" | "ppprtk" | "ppp_rtk" => Ok(Self::PPPRTK),
            _ => Err(Error::UnknownNavigationMethod),
        }
    }
}
