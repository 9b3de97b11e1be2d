//! Release-age tags ("epochs") within a package catalogue.
//!
//! A catalogue may list several concurrent versions of one package's
//! metadata, distinguished by an epoch marker line such as `[prev]` or
//! `[test]`. Fields that appear before any marker belong to the current
//! epoch. Records with no epoch at all (such as the stored stanza text) are
//! modelled as `Option<Epoch>::None` by the catalogue layer.

/// A named release-age tag inside a package catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Epoch {
    /// The current release of a package (the default after a `@` marker).
    Curr,
    /// The previous release, retained for downgrades.
    Prev,
    /// An experimental release.
    Test,
    /// Any other tag found in the catalogue; preserved verbatim.
    Other(String),
}

impl Epoch {
    /// The tag as it appears between brackets in the catalogue.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Curr => "curr",
            Self::Prev => "prev",
            Self::Test => "test",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Epoch {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "curr" => Self::Curr,
            "prev" => Self::Prev,
            "test" => Self::Test,
            other => Self::Other(other.to_string()),
        })
    }
}
