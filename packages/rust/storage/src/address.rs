//! Store connection strings and SQL identifier checks.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use pdfqa_shared::{PdfQaError, Result};
use regex::Regex;
use url::Url;

/// Where the libSQL database lives.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreAddress {
    /// A database file on this machine.
    Local(PathBuf),
    /// A throwaway in-process database.
    Memory,
    /// A libSQL server (`libsql://`, `https://`, `http://`).
    Remote { url: String, auth_token: String },
}

impl StoreAddress {
    /// Parse a connection string.
    ///
    /// Accepts `:memory:`, `file:<path>`, bare paths, and remote libSQL URLs
    /// with an optional `authToken` query parameter. Anything else is a
    /// configuration error.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PdfQaError::config("database URL is empty"));
        }
        if raw == ":memory:" {
            return Ok(Self::Memory);
        }
        if let Some(path) = raw.strip_prefix("file:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            if path.is_empty() {
                return Err(PdfQaError::config("file: database URL has no path"));
            }
            return Ok(Self::Local(PathBuf::from(path)));
        }

        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "libsql" | "https" | "http" => {
                    if url.host_str().is_none_or(str::is_empty) {
                        return Err(PdfQaError::config(format!(
                            "database URL '{}' has no host",
                            redact(&url)
                        )));
                    }
                    let auth_token = url
                        .query_pairs()
                        .find(|(k, _)| k == "authToken")
                        .map(|(_, v)| v.into_owned())
                        .unwrap_or_default();
                    let mut bare = url.clone();
                    bare.set_query(None);
                    Ok(Self::Remote {
                        url: bare.to_string(),
                        auth_token,
                    })
                }
                // Windows drive letters parse as one-letter schemes.
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(raw))),
                scheme => Err(PdfQaError::config(format!(
                    "unsupported database scheme '{scheme}': expected libsql://, https://, file: or a path"
                ))),
            },
            Err(_) => Ok(Self::Local(PathBuf::from(raw))),
        }
    }
}

impl std::str::FromStr for StoreAddress {
    type Err = PdfQaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, ":memory:"),
            Self::Remote { url, .. } => write!(f, "{url}"),
        }
    }
}

impl fmt::Debug for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => f.debug_tuple("Local").field(path).finish(),
            Self::Memory => f.write_str("Memory"),
            Self::Remote { url, auth_token } => f
                .debug_struct("Remote")
                .field("url", url)
                .field("auth_token", &if auth_token.is_empty() { "" } else { "****" })
                .finish(),
        }
    }
}

fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    let _ = shown.set_password(None);
    shown.to_string()
}

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
});

/// Check that a collection or table name is safe to splice into DDL.
pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(PdfQaError::config(format!(
            "'{name}' is not a valid table name: use letters, digits and '_' (max 63)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_forms() {
        assert_eq!(
            StoreAddress::parse("file:data/pdfqa.db").unwrap(),
            StoreAddress::Local(PathBuf::from("data/pdfqa.db"))
        );
        assert_eq!(
            StoreAddress::parse("file:///tmp/pdfqa.db").unwrap(),
            StoreAddress::Local(PathBuf::from("/tmp/pdfqa.db"))
        );
        assert_eq!(
            StoreAddress::parse("./pdfqa.db").unwrap(),
            StoreAddress::Local(PathBuf::from("./pdfqa.db"))
        );
        assert_eq!(StoreAddress::parse(" :memory: ").unwrap(), StoreAddress::Memory);
    }

    #[test]
    fn parses_remote_with_token() {
        let addr = StoreAddress::parse("libsql://pdfqa-acme.turso.io?authToken=abc.def").unwrap();
        assert_eq!(
            addr,
            StoreAddress::Remote {
                url: "libsql://pdfqa-acme.turso.io".into(),
                auth_token: "abc.def".into(),
            }
        );
        assert!(!format!("{addr:?}").contains("abc.def"));
        assert!(!addr.to_string().contains("abc.def"));
    }

    #[test]
    fn rejects_unsupported_schemes() {
        let err = StoreAddress::parse("postgresql+psycopg://u:p@h:5432/db").unwrap_err();
        assert!(matches!(err, PdfQaError::Configuration { .. }));
        assert!(err.to_string().contains("postgresql+psycopg"));

        assert!(StoreAddress::parse("").is_err());
        assert!(StoreAddress::parse("file:").is_err());
    }

    #[test]
    fn identifier_rules() {
        assert!(validate_identifier("pdf_documents").is_ok());
        assert!(validate_identifier("_t1").is_ok());
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("docs; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }
}
