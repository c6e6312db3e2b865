//! Resource identifiers.
//!
//! A [`ResourceId`] is an immutable, already-validated URL. Everything that enters the
//! queue goes through [`IntoResource`], so the queue never holds an empty or unparsable
//! locator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::ControllerError;

/// Locator of one playable audio item, compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Url);

impl ResourceId {
    /// Parse a URL or an absolute filesystem path.
    ///
    /// Absolute paths become `file://` URLs. Empty input, relative paths and strings
    /// that are not URLs are rejected.
    pub fn parse(input: &str) -> Result<Self, ControllerError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ControllerError::invalid(input, "empty identifier"));
        }
        let as_path = Path::new(trimmed);
        if as_path.is_absolute() {
            return Self::from_path(as_path);
        }
        match Url::parse(trimmed) {
            Ok(url) => Self::from_url(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(ControllerError::invalid(input, "relative locator"))
            }
            Err(e) => Err(ControllerError::invalid(input, e.to_string())),
        }
    }

    /// Wrap an already parsed URL.
    pub fn from_url(url: Url) -> Result<Self, ControllerError> {
        if url.cannot_be_a_base() && url.path().is_empty() {
            return Err(ControllerError::invalid(url.as_str(), "missing location"));
        }
        Ok(Self(url))
    }

    /// Build a `file://` identifier from an absolute path.
    pub fn from_path(path: &Path) -> Result<Self, ControllerError> {
        let display = path.display().to_string();
        if !path.is_absolute() {
            return Err(ControllerError::invalid(display, "relative path"));
        }
        Url::from_file_path(path)
            .map(Self)
            .map_err(|_| ControllerError::invalid(display, "not representable as file url"))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Lowercase URL scheme (`file`, `http`, ...).
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Local path for `file://` identifiers.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.scheme() != "file" {
            return None;
        }
        self.0.to_file_path().ok()
    }

    /// Last non-empty path segment, used as a short label in logs and the CLI.
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Conversion into a validated [`ResourceId`].
///
/// Implemented for identifiers, URLs, strings and paths so that controller operations
/// accept whatever the caller already holds.
pub trait IntoResource {
    fn into_resource(self) -> Result<ResourceId, ControllerError>;
}

impl IntoResource for ResourceId {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        Ok(self)
    }
}

impl IntoResource for &ResourceId {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        Ok(self.clone())
    }
}

impl IntoResource for &str {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::parse(self)
    }
}

impl IntoResource for String {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::parse(&self)
    }
}

impl IntoResource for &String {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::parse(self)
    }
}

impl IntoResource for Url {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::from_url(self)
    }
}

impl IntoResource for &Path {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::from_path(self)
    }
}

impl IntoResource for PathBuf {
    fn into_resource(self) -> Result<ResourceId, ControllerError> {
        ResourceId::from_path(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_urls() {
        let id = ResourceId::parse("https://example.com/music/track.flac").unwrap();
        assert_eq!(id.scheme(), "https");
        assert_eq!(id.file_name(), Some("track.flac"));
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = ResourceId::parse("  http://example.com/a.mp3 \n").unwrap();
        assert_eq!(id.as_str(), "http://example.com/a.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn parse_converts_absolute_paths() {
        let id = ResourceId::parse("/music/album/01 intro.flac").unwrap();
        assert_eq!(id.scheme(), "file");
        assert_eq!(id.as_str(), "file:///music/album/01%20intro.flac");
        assert_eq!(
            id.to_file_path(),
            Some(PathBuf::from("/music/album/01 intro.flac"))
        );
    }

    #[test]
    fn parse_rejects_empty_and_relative() {
        assert!(matches!(
            ResourceId::parse(""),
            Err(ControllerError::InvalidResource { .. })
        ));
        assert!(matches!(
            ResourceId::parse("   "),
            Err(ControllerError::InvalidResource { .. })
        ));
        assert!(matches!(
            ResourceId::parse("music/track.flac"),
            Err(ControllerError::InvalidResource { .. })
        ));
    }

    #[test]
    fn parse_rejects_malformed_urls() {
        let err = ResourceId::parse("http://").unwrap_err();
        match err {
            ControllerError::InvalidResource { input, .. } => assert_eq!(input, "http://"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn relative_path_is_rejected() {
        assert!(ResourceId::from_path(Path::new("track.flac")).is_err());
    }

    #[test]
    fn equality_is_by_value() {
        let a = ResourceId::parse("http://example.com/a.mp3").unwrap();
        let b: ResourceId = "http://example.com/a.mp3".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ResourceId::parse("http://example.com/b.mp3").unwrap());
    }

    #[test]
    fn file_name_skips_trailing_slash() {
        let id = ResourceId::parse("http://example.com/radio/").unwrap();
        assert_eq!(id.file_name(), Some("radio"));
        assert_eq!(id.to_file_path(), None);
    }
}
