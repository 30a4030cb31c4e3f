use std::{fmt, path::PathBuf, str::FromStr};

use url::Url;

/// Where publication data can be read from, which can either be
///
/// - a remote `http(s)` resource, or
/// - a file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Url(Url),
    Path(PathBuf),
}

impl Location {
    /// Resolve `rel` against this location, treating it as a directory (or URL base).
    pub fn join(&self, rel: &str) -> Location {
        match self {
            Location::Url(base) => {
                let mut base = base.clone();
                // `Url::join` replaces the last segment unless the base ends in a slash.
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                match base.join(rel) {
                    Ok(url) => Location::Url(url),
                    Err(_) => Location::Url(base),
                }
            }
            Location::Path(dir) => Location::Path(dir.join(rel)),
        }
    }

    /// File extension of the final path segment, lowercased.
    pub fn extension(&self) -> Option<String> {
        let last = match self {
            Location::Url(url) => url.path_segments()?.next_back()?.to_string(),
            Location::Path(path) => path.file_name()?.to_string_lossy().into_owned(),
        };
        let (_, ext) = last.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

impl FromStr for Location {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty location".to_string());
        }
        // Anything that is not an http(s) URL is a path, relative paths included.
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Location::Url(url)),
            _ => Ok(Location::Path(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => write!(f, "{url}"),
            Location::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_recognises_http_urls() {
        let loc = Location::from_str("https://example.org/site/").expect("parse");
        assert!(matches!(loc, Location::Url(_)));
    }

    #[test]
    fn from_str_falls_back_to_path() {
        proptest::proptest!(|(s in "[A-Za-z0-9._-]{1,32}")| {
            let loc = Location::from_str(&s).expect("parse");
            match loc {
                Location::Path(p) => proptest::prop_assert_eq!(p, PathBuf::from(&s)),
                Location::Url(_) => proptest::prop_assert!(false, "should not be a URL"),
            }
        })
    }

    #[test]
    fn join_keeps_url_base_directory() {
        let base = Location::from_str("https://example.org/site").expect("parse");
        let joined = base.join("data/publications.bib");
        assert_eq!(
            joined.to_string(),
            "https://example.org/site/data/publications.bib"
        );
    }

    #[test]
    fn join_paths() {
        let base = Location::Path(PathBuf::from("www"));
        assert_eq!(
            base.join("publications.bib"),
            Location::Path(PathBuf::from("www/publications.bib"))
        );
    }

    #[test]
    fn extension_is_lowercased() {
        let loc = Location::from_str("refs/Publications.BIB").expect("parse");
        assert_eq!(loc.extension().as_deref(), Some("bib"));
        let url = Location::from_str("https://example.org/data/publications.json?x=1").expect("parse");
        assert_eq!(url.extension().as_deref(), Some("json"));
    }
}
