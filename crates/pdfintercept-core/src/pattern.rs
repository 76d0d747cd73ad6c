//! URL match patterns used to scope listeners.
//!
//! Supports the browser's match-pattern shape `<scheme>://<host>/<path>`:
//! - `<all_urls>`
//! - scheme `*` (http or https), or one of `http`, `https`, `ftp`, `file`
//! - host `*`, `*.example.com`, or an exact host (optionally with `:port`)
//! - path glob where `*` matches any run of characters, tested against path and query

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InterceptError;

const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "file"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlPattern {
    source: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    AllUrls,
    /// One specific resource; compared without its fragment.
    Exact(String),
    Match {
        scheme: SchemeMatch,
        host: HostMatch,
        port: Option<u16>,
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatch {
    HttpOrHttps,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
    Any,
    Subdomains(String),
    Exact(String),
}

impl UrlPattern {
    pub fn all_urls() -> Self {
        Self {
            source: "<all_urls>".to_string(),
            kind: PatternKind::AllUrls,
        }
    }

    /// Pattern matching exactly `url`, ignoring any fragment.
    pub fn exact(url: &str) -> Self {
        let base = strip_fragment(url).to_string();
        Self {
            source: base.clone(),
            kind: PatternKind::Exact(base),
        }
    }

    pub fn parse(pattern: &str) -> Result<Self, InterceptError> {
        let invalid = |reason| InterceptError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern == "<all_urls>" {
            return Ok(Self::all_urls());
        }

        let (scheme, rest) = pattern
            .split_once("://")
            .ok_or_else(|| invalid("missing `://`"))?;
        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "*" => SchemeMatch::HttpOrHttps,
            s if SUPPORTED_SCHEMES.contains(&s) => SchemeMatch::Exact(s.to_string()),
            _ => return Err(invalid("unsupported scheme")),
        };

        let slash = rest.find('/').ok_or_else(|| invalid("missing path"))?;
        let (authority, path) = rest.split_at(slash);

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        let host = host.to_ascii_lowercase();
        let host = if host == "*" || host.is_empty() {
            HostMatch::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            HostMatch::Subdomains(domain.to_string())
        } else if host.contains('*') {
            return Err(invalid("`*` is only allowed as the leading host label"));
        } else {
            HostMatch::Exact(host)
        };

        Ok(Self {
            source: pattern.to_string(),
            kind: PatternKind::Match {
                scheme,
                host,
                port,
                path: path.to_string(),
            },
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, url: &str) -> bool {
        match &self.kind {
            PatternKind::Exact(expected) => strip_fragment(url) == expected,
            PatternKind::AllUrls => url::Url::parse(url)
                .is_ok_and(|parsed| SUPPORTED_SCHEMES.contains(&parsed.scheme())),
            PatternKind::Match {
                scheme,
                host,
                port,
                path,
            } => {
                let Ok(parsed) = url::Url::parse(url) else {
                    return false;
                };
                let scheme_ok = match scheme {
                    SchemeMatch::HttpOrHttps => matches!(parsed.scheme(), "http" | "https"),
                    SchemeMatch::Exact(s) => parsed.scheme() == s,
                };
                if !scheme_ok {
                    return false;
                }

                let actual_host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
                let host_ok = match host {
                    HostMatch::Any => true,
                    HostMatch::Subdomains(domain) => {
                        actual_host == *domain || actual_host.ends_with(&format!(".{domain}"))
                    }
                    HostMatch::Exact(expected) => actual_host == *expected,
                };
                if !host_ok {
                    return false;
                }
                if port.is_some() && parsed.port_or_known_default() != *port {
                    return false;
                }

                let mut target = parsed.path().to_string();
                if let Some(query) = parsed.query() {
                    target.push('?');
                    target.push_str(query);
                }
                glob_match(path, &target)
            }
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for UrlPattern {
    type Error = InterceptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UrlPattern> for String {
    fn from(value: UrlPattern) -> Self {
        value.source
    }
}

pub(crate) fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or_default()
}

/// Glob match where `*` matches any (possibly empty) run of bytes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}
