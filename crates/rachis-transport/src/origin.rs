use std::fmt;

use url::Url;

use crate::error::{Result, TransportError};

/// A web origin (scheme, host, port).
///
/// Only tuple origins are representable. There is deliberately no wildcard
/// value, so a message can never be addressed to "any origin".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Origin(url::Origin);

impl Origin {
    /// Origin of an already parsed URL.
    pub fn from_url(url: &Url) -> Result<Self> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(TransportError::InvalidOrigin {
                input: url.to_string(),
                reason: "opaque origin".to_string(),
            });
        }
        Ok(Self(origin))
    }

    /// Parse a URL string and take its origin.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|err| TransportError::InvalidOrigin {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_url(&url)
    }

    /// Serialization as used on the wire, e.g. `https://view.qiime2.org`.
    pub fn ascii_serialization(&self) -> String {
        self.0.ascii_serialization()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ascii_serialization())
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Origin")
            .field(&self.ascii_serialization())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query_do_not_affect_origin() {
        let a = Origin::parse("https://view.qiime2.org/?src=local").unwrap();
        let b = Origin::parse("https://view.qiime2.org").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "https://view.qiime2.org");
    }

    #[test]
    fn default_port_is_elided() {
        let origin = Origin::parse("https://view.qiime2.org:443/index.html").unwrap();
        assert_eq!(origin.ascii_serialization(), "https://view.qiime2.org");

        let custom = Origin::parse("http://localhost:8080/").unwrap();
        assert_eq!(custom.ascii_serialization(), "http://localhost:8080");
    }

    #[test]
    fn different_hosts_are_different_origins() {
        let a = Origin::parse("https://view.qiime2.org").unwrap();
        let b = Origin::parse("https://evil.example").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn opaque_origin_rejected() {
        let err = Origin::parse("data:text/html,hello").unwrap_err();
        assert!(matches!(err, TransportError::InvalidOrigin { .. }));
    }

    #[test]
    fn unparseable_url_rejected() {
        assert!(matches!(
            Origin::parse("not a url"),
            Err(TransportError::InvalidOrigin { .. })
        ));
    }
}
