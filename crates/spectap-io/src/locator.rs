//! Logical source locators and asset resolution.

use crate::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

const ASSET_SCHEME: &str = "asset://";
const FILE_SCHEME: &str = "file://";

/// Where a player should load its audio from.
///
/// | Form | Variant |
/// |------|---------|
/// | `asset://<path>` | [`SourceLocator::Asset`], resolved against an [`AssetResolver`] |
/// | `file://<path>` | [`SourceLocator::File`] |
/// | `<scheme>://...` | [`SourceLocator::Remote`] |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Path relative to the application's asset root.
    Asset(String),
    /// Local filesystem path.
    File(PathBuf),
    /// Any other URL.
    Remote(String),
}

impl SourceLocator {
    /// Parses a locator string.
    ///
    /// Anything that is neither an asset nor a file locator must look like a
    /// URL (`scheme://rest` with a non-empty alphanumeric scheme), otherwise
    /// [`Error::InvalidLocator`] is returned.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(ASSET_SCHEME) {
            if path.is_empty() {
                return Err(Error::InvalidLocator(s.to_string()));
            }
            return Ok(SourceLocator::Asset(path.to_string()));
        }
        if let Some(path) = s.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(Error::InvalidLocator(s.to_string()));
            }
            return Ok(SourceLocator::File(PathBuf::from(path)));
        }

        match s.split_once("://") {
            Some((scheme, rest))
                if !scheme.is_empty()
                    && !rest.is_empty()
                    && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                Ok(SourceLocator::Remote(s.to_string()))
            }
            _ => Err(Error::InvalidLocator(s.to_string())),
        }
    }

    /// Builds a file locator from a local path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceLocator::File(path.into())
    }
}

impl FromStr for SourceLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Asset(path) => write!(f, "{ASSET_SCHEME}{path}"),
            SourceLocator::File(path) => write!(f, "{FILE_SCHEME}{}", path.display()),
            SourceLocator::Remote(url) => f.write_str(url),
        }
    }
}

/// Maps `asset://` paths onto a directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    /// Resolves assets under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path of `asset`, which must exist.
    ///
    /// Assets never leave the root: paths with `..` or a drive prefix are
    /// rejected as invalid locators.
    pub fn resolve(&self, asset: &str) -> Result<PathBuf> {
        let relative = Path::new(asset.trim_start_matches('/'));
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::InvalidLocator(format!("{ASSET_SCHEME}{asset}")));
        }
        let path = self.root.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::AssetNotFound(path))
        }
    }

    /// Resolves any locator to a local path; remote sources are rejected.
    pub fn local_path(&self, locator: &SourceLocator) -> Result<PathBuf> {
        match locator {
            SourceLocator::Asset(asset) => self.resolve(asset),
            SourceLocator::File(path) => Ok(path.clone()),
            SourceLocator::Remote(url) => Err(Error::UnsupportedSource(url.clone())),
        }
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::new(".")
    }
}
