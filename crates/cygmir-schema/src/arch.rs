//! Target architecture of the mirrored distribution.
//!
//! The architecture selects which per-arch catalogue (`<arch>/setup.xz`) is
//! fetched and under which subdirectory of the mirror the packages land.
//!
//! # Example
//!
//! ```
//! use cygmir_schema::Arch;
//!
//! let arch: Arch = "x86_64".parse().unwrap();
//! assert_eq!(arch.to_string(), "x86_64");
//! ```

/// A distribution architecture recognised by the upstream repository.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86 (the only architecture still published upstream).
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,
    /// Legacy 32-bit x86, kept for mirroring archived release trees.
    X86,
}

impl Arch {
    /// Convert to the directory/catalogue name used by the repository.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "x86" | "i686" => Ok(Self::X86),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("i686".parse::<Arch>().unwrap(), Arch::X86);
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn default_is_x86_64() {
        assert_eq!(Arch::default(), Arch::X86_64);
    }
}
