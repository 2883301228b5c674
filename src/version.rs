//! Three-component version numbers.
//!
//! The manifest records a `major.minor.revision` version string; this module
//! parses it and implements the increment rules used by the branch
//! operations.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

/// Errors produced while parsing a version string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The string is not a dot-separated triple of non-negative integers
    #[error("version \"{0}\" is not a major.minor.revision triple")]
    Malformed(String),
}

/// Which component of the version to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BumpPart {
    /// First component; zeroes minor and revision
    Major,
    /// Second component; zeroes revision
    Minor,
    /// Third component only
    Revision,
}

impl fmt::Display for BumpPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Revision => write!(f, "revision"),
        }
    }
}

/// A `major.minor.revision` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub revision: u64,
}

impl Version {
    /// Create a version from its components.
    pub fn new(major: u64, minor: u64, revision: u64) -> Self {
        Self { major, minor, revision }
    }

    /// Return the version with the given part incremented.
    ///
    /// Bumping a part zeroes everything after it: `1.4.7` bumped minor is
    /// `1.5.0`, bumped major is `2.0.0`, bumped revision is `1.4.8`.
    #[must_use]
    pub fn bump(self, part: BumpPart) -> Self {
        match part {
            BumpPart::Major => Self::new(self.major + 1, 0, 0),
            BumpPart::Minor => Self::new(self.major, self.minor + 1, 0),
            BumpPart::Revision => Self::new(self.major, self.minor, self.revision + 1),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::Malformed(s.to_string());

        let mut parts = s.trim().splitn(3, '.');
        let mut next = || {
            parts
                .next()
                // u64::from_str tolerates a leading '+'; components must be
                // plain digits.
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(malformed)
        };

        let version = Self::new(next()?, next()?, next()?);
        Ok(version)
    }
}
