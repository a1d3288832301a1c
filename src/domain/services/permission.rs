// src/domain/services/permission.rs
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use url::Url;

use crate::domain::error::{DomainError, DomainResult};

/// Host match pattern such as `https://9gag.com/*` or `*://*.example.org/feed/*`
#[derive(Debug, Clone)]
pub struct OriginPattern {
    raw: String,
    scheme: Option<String>,
    host: HostPattern,
    path: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Exact(String),
    /// `*.example.org`: the domain itself and all of its subdomains
    Subdomains(String),
}

impl OriginPattern {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parse a list of patterns, failing on the first invalid one
    pub fn parse_all<I, S>(patterns: I) -> DomainResult<Vec<OriginPattern>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns.into_iter().map(|p| p.as_ref().parse()).collect()
    }

    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            None => matches!(url.scheme(), "http" | "https"),
            Some(scheme) => url.scheme() == scheme,
        };
        if !scheme_ok {
            return false;
        }

        let host = url.host_str().unwrap_or_default().to_lowercase();
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(expected) => &host == expected,
            HostPattern::Subdomains(domain) => {
                &host == domain || host.ends_with(&format!(".{}", domain))
            }
        };

        host_ok && self.path.is_match(url.path())
    }

    /// True when every url this pattern matches is also matched by `other`
    pub fn is_covered_by(&self, other: &OriginPattern) -> bool {
        if self.raw == other.raw {
            return true;
        }
        let scheme_ok = match (&other.scheme, &self.scheme) {
            (None, Some(s)) => s == "http" || s == "https",
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => false,
        };
        let host_ok = match (&other.host, &self.host) {
            (HostPattern::Any, _) => true,
            (HostPattern::Exact(a), HostPattern::Exact(b)) => a == b,
            (HostPattern::Subdomains(a), HostPattern::Exact(b)) => {
                b == a || b.ends_with(&format!(".{}", a))
            }
            (HostPattern::Subdomains(a), HostPattern::Subdomains(b)) => {
                b == a || b.ends_with(&format!(".{}", a))
            }
            _ => false,
        };
        // Path containment is only decided for the common "everything" path
        let path_ok = other.path.as_str() == "^/.*$" || other.path.as_str() == self.path.as_str();
        scheme_ok && host_ok && path_ok
    }
}

impl FromStr for OriginPattern {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |why: &str| DomainError::InvalidOrigin(format!("'{}': {}", raw, why));

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme separator"))?;
        let scheme = match scheme {
            "*" => None,
            "http" | "https" | "file" | "ftp" => Some(scheme.to_string()),
            _ => return Err(invalid("unsupported scheme")),
        };

        let slash = rest.find('/').ok_or_else(|| invalid("missing path"))?;
        let (host, path) = rest.split_at(slash);
        let host = host.to_lowercase();
        let host = if host == "*" {
            HostPattern::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.is_empty() || domain.contains('*') {
                return Err(invalid("malformed wildcard host"));
            }
            HostPattern::Subdomains(domain.to_string())
        } else if host.contains('*') {
            return Err(invalid("wildcard must be the leading label of the host"));
        } else if host.is_empty() && scheme.as_deref() != Some("file") {
            return Err(invalid("missing host"));
        } else {
            HostPattern::Exact(host)
        };

        let path_regex = format!(
            "^{}$",
            path.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );
        let path = Regex::new(&path_regex).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            host,
            path,
        })
    }
}

impl fmt::Display for OriginPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for OriginPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for OriginPattern {}

/// Boundary to the host's permission system.
///
/// The blocking engine assumes access was granted before it runs; only the
/// bootstrap consults this gate.
pub trait PermissionGate: std::fmt::Debug + Send + Sync {
    /// Whether all `origins` are currently granted
    fn contains(&self, origins: &[OriginPattern]) -> DomainResult<bool>;

    /// Ask for `origins`; returns whether they are granted afterwards
    fn request(&self, origins: &[OriginPattern]) -> DomainResult<bool>;

    /// Drop previously granted `origins`; returns whether anything was removed
    fn revoke(&self, origins: &[OriginPattern]) -> DomainResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case("https://9gag.com/*", "https://9gag.com/", true)]
    #[case("https://9gag.com/*", "https://9gag.com/hot", true)]
    #[case("https://9gag.com/*", "http://9gag.com/hot", false)]
    #[case("https://9gag.com/*", "https://m.9gag.com/hot", false)]
    #[case("*://*.9gag.com/*", "http://m.9gag.com/hot", true)]
    #[case("*://*.9gag.com/*", "https://9gag.com/", true)]
    #[case("*://*.9gag.com/*", "https://not9gag.com/", false)]
    #[case("https://9gag.com/tag/*", "https://9gag.com/hot", false)]
    #[case("https://*/*", "https://example.org/a/b", true)]
    fn given_pattern_when_match_url_then_honors_scheme_host_and_path(
        #[case] pattern: &str,
        #[case] target: &str,
        #[case] expected: bool,
    ) {
        let pattern: OriginPattern = pattern.parse().unwrap();
        assert_eq!(pattern.matches(&url(target)), expected);
    }

    #[rstest]
    #[case("9gag.com")]
    #[case("gopher://9gag.com/*")]
    #[case("https://9gag.com")]
    #[case("https://9g*g.com/*")]
    #[case("https:///*")]
    fn given_malformed_pattern_when_parse_then_returns_error(#[case] pattern: &str) {
        assert!(pattern.parse::<OriginPattern>().is_err());
    }

    #[test]
    fn given_broad_grant_when_is_covered_by_then_narrow_pattern_is_covered() {
        let narrow: OriginPattern = "https://9gag.com/*".parse().unwrap();
        let broad: OriginPattern = "*://*.9gag.com/*".parse().unwrap();
        assert!(narrow.is_covered_by(&broad));
        assert!(!broad.is_covered_by(&narrow));
        assert!(narrow.is_covered_by(&narrow));
    }
}
