//! Open targets - a local path or a remote URI

use crate::opener::{Error, Result};
use path_clean::PathClean;
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// A local file path or a remote URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOrUri {
    /// A local file path
    Path(PathBuf),
    /// A URI of some kind
    Uri(Url),
}

impl PathOrUri {
    /// Returns whether the contained value is a path.
    pub fn is_path(&self) -> bool {
        matches!(self, PathOrUri::Path(_))
    }

    /// Returns whether the contained value is a URI.
    ///
    /// A `file://` URI is converted to a path on construction, so for those
    /// this returns `false`.
    pub fn is_uri(&self) -> bool {
        matches!(self, PathOrUri::Uri(_))
    }

    /// Returns the contained value as a URI.
    ///
    /// Relative paths are resolved against the current directory and cleaned
    /// lexically (`.` and `..` removed) before conversion.
    ///
    /// # Errors
    /// - [`Error::Io`] if the current directory cannot be read
    /// - [`Error::FileToUri`] if the cleaned path is not absolute
    pub fn uri(&self) -> Result<Url> {
        match self {
            PathOrUri::Uri(url) => Ok(url.clone()),
            PathOrUri::Path(path) => {
                let absolute = std::env::current_dir()?.join(path).clean();
                Url::from_file_path(absolute).map_err(|()| Error::FileToUri(path.clone()))
            }
        }
    }
}

impl FromStr for PathOrUri {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.parse::<Url>() {
            // A single-letter scheme is a drive letter (C:\...), not a URI
            Ok(url) if url.scheme().len() > 1 => Ok(Self::from(url)),
            _ => Ok(Self::from(PathBuf::from(s))),
        }
    }
}

impl From<PathBuf> for PathOrUri {
    fn from(value: PathBuf) -> Self {
        PathOrUri::Path(value)
    }
}

impl From<&Path> for PathOrUri {
    fn from(value: &Path) -> Self {
        PathOrUri::Path(value.to_path_buf())
    }
}

impl From<Url> for PathOrUri {
    fn from(value: Url) -> Self {
        if value.scheme() == "file" {
            let path = value
                .to_file_path()
                .unwrap_or_else(|()| PathBuf::from(value.path()));
            PathOrUri::Path(path)
        } else {
            PathOrUri::Uri(value)
        }
    }
}

impl From<&str> for PathOrUri {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(target) => target,
            Err(never) => match never {},
        }
    }
}

impl From<String> for PathOrUri {
    fn from(value: String) -> Self {
        PathOrUri::from(value.as_str())
    }
}

impl From<&PathOrUri> for PathOrUri {
    fn from(value: &PathOrUri) -> Self {
        value.clone()
    }
}

impl Display for PathOrUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathOrUri::Path(path) => write!(f, "{}", path.display()),
            PathOrUri::Uri(uri) => write!(f, "{}", uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let path = PathBuf::from("/test/path/dir/");
        assert_eq!(PathOrUri::from(path.clone()), PathOrUri::Path(path));
    }

    #[test]
    fn test_from_web_uri() {
        let url: Url = "https://example.com/subdir/".parse().unwrap();
        assert_eq!(PathOrUri::from(url.clone()), PathOrUri::Uri(url));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_file_uri() {
        let url: Url = "file:///test/path".parse().unwrap();
        assert_eq!(
            PathOrUri::from(url),
            PathOrUri::Path(PathBuf::from("/test/path"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_uri_is_percent_decoded() {
        let url: Url = "file:///tmp/with%20space.txt".parse().unwrap();
        assert_eq!(
            PathOrUri::from(url),
            PathOrUri::Path(PathBuf::from("/tmp/with space.txt"))
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            PathOrUri::from_str("/test/path").unwrap(),
            PathOrUri::Path(PathBuf::from("/test/path"))
        );

        assert_eq!(
            PathOrUri::from_str("https://example.com").unwrap(),
            PathOrUri::Uri("https://example.com".parse().unwrap())
        );

        assert_eq!(
            PathOrUri::from_str("relative/file.txt").unwrap(),
            PathOrUri::Path(PathBuf::from("relative/file.txt"))
        );
    }

    #[test]
    fn test_drive_letter_is_a_path() {
        let target = PathOrUri::from(r"C:\Users\me\notes.txt");
        assert!(target.is_path());
        assert_eq!(
            target,
            PathOrUri::Path(PathBuf::from(r"C:\Users\me\notes.txt"))
        );
    }

    #[test]
    fn test_mailto_is_a_uri() {
        assert!(PathOrUri::from("mailto:someone@example.com").is_uri());
    }

    #[test]
    fn test_is_uri_and_is_path() {
        let uri = PathOrUri::Uri("https://example.com".parse().unwrap());
        let path = PathOrUri::Path(PathBuf::from("/test/path"));
        assert!(uri.is_uri());
        assert!(!uri.is_path());
        assert!(path.is_path());
        assert!(!path.is_uri());
    }

    #[test]
    fn test_to_uri() {
        let uri: Url = "https://example.com/test/path".parse().unwrap();
        assert_eq!(uri.clone(), PathOrUri::Uri(uri).uri().unwrap());

        let path = PathBuf::from("./test/next/../file.txt");
        let cwd = std::env::current_dir().unwrap();
        let expected = Url::from_file_path(cwd.join("test/file.txt")).unwrap();
        assert_eq!(expected, PathOrUri::Path(path).uri().unwrap());
    }

    #[test]
    fn test_display() {
        let uri = PathOrUri::from("https://example.com/a");
        assert_eq!(uri.to_string(), "https://example.com/a");
        let path = PathOrUri::from("docs/readme.md");
        assert_eq!(path.to_string(), "docs/readme.md");
    }
}
