//! Cookie core types.
//!
//! This module defines the serializable [`Cookie`] record, the [`SameSite`]
//! policy enum, and the change-notification types ([`ChangeCause`],
//! [`CookieChange`]) delivered by the host's cookie store.
//!
//! # Validation
//! [`Cookie::validate`] enforces the host's write-time rules and must be
//! called before any write reaches the host API:
//! - `SameSite=None` cookies must be `Secure`.
//! - Cookies named with a `__Host-` or `__Secure-` prefix must be `Secure`.
//! - `__Host-` cookies must additionally use `path == "/"`.
//!
//! Prefix matching is ASCII-case-insensitive, matching host behavior.
//!
//! ```rust
//! use cookie_mirror::cookies::{Cookie, SameSite};
//!
//! let c = Cookie {
//!     name: "session".into(),
//!     value: "abc123".into(),
//!     domain: ".example.com".into(),
//!     path: "/".into(),
//!     secure: true,
//!     http_only: true,
//!     same_site: SameSite::Lax,
//!     expiration_date: Some(1735689599.0),
//!     host_only: false,
//!     store_id: None,
//! };
//! assert!(c.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

/// SameSite policy as reported by the host cookie store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    /// No policy set on the cookie.
    #[default]
    Unspecified,
    /// `SameSite=None`; cross-site sends allowed, requires `Secure`.
    NoRestriction,
    /// `SameSite=Lax`.
    Lax,
    /// `SameSite=Strict`.
    Strict,
}

impl SameSite {
    /// Header attribute value, or `None` for [`SameSite::Unspecified`]
    /// which is serialized by omitting the attribute entirely.
    pub fn as_attribute(&self) -> Option<&'static str> {
        match self {
            SameSite::Unspecified => None,
            SameSite::NoRestriction => Some("None"),
            SameSite::Lax => Some("Lax"),
            SameSite::Strict => Some("Strict"),
        }
    }
}

/// A cookie as reported and accepted by the host cookie store.
///
/// Conceptually keyed by `(domain, name, path, store_id)`. Serialization
/// uses the host's camelCase field names so records round-trip through the
/// host API and the key-value store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain scoping. A leading dot marks a domain cookie that matches
    /// subdomains; without it the cookie is host-only.
    pub domain: String,

    /// Path scoping (e.g. `"/"`).
    pub path: String,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// If `true`, cookie is hidden from client-side scripts.
    pub http_only: bool,

    /// SameSite policy.
    #[serde(default)]
    pub same_site: SameSite,

    /// Expiration as seconds since the epoch. `None` marks a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,

    /// Derived by the host from whether a domain was explicitly supplied.
    #[serde(default)]
    pub host_only: bool,

    /// Host cookie store this record lives in, if the host reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

impl Cookie {
    /// A session cookie has no expiration timestamp.
    pub fn is_session(&self) -> bool {
        self.expiration_date.is_none()
    }

    /// Returns a copy scoped to `domain`, all other fields preserved.
    pub fn with_domain(&self, domain: &str) -> Cookie {
        Cookie {
            domain: domain.to_string(),
            ..self.clone()
        }
    }

    /// Returns a copy carrying an already-elapsed expiration timestamp.
    ///
    /// Writing this copy is how the engine deletes a single domain variant;
    /// the host's native remove would also delete sibling variants.
    pub fn expired(&self) -> Cookie {
        Cookie {
            expiration_date: Some(0.0),
            ..self.clone()
        }
    }

    /// Checks the host's write-time invariants. Must pass before any
    /// [`set`](crate::cookies::set_cookie) call.
    pub fn validate(&self) -> Result<(), CookieError> {
        let lower = self.name.to_ascii_lowercase();
        let prefixed = lower.starts_with("__host-") || lower.starts_with("__secure-");

        if !self.secure {
            if self.same_site == SameSite::NoRestriction {
                return Err(CookieError::InsecureSameSiteNone {
                    name: self.name.clone(),
                });
            }
            if prefixed {
                return Err(CookieError::InsecurePrefix {
                    name: self.name.clone(),
                });
            }
        }

        if lower.starts_with("__host-") && self.path != "/" {
            return Err(CookieError::HostPrefixPath {
                name: self.name.clone(),
                path: self.path.clone(),
            });
        }

        Ok(())
    }
}

/// Why the host emitted a cookie-change notification.
///
/// The first three causes always mean the store discarded a cookie; for
/// `explicit` and `overwrite` the notification's `removed` flag tells
/// deletion apart from insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Discarded by garbage collection.
    Evicted,
    /// Expired and removed automatically.
    Expired,
    /// Removed because an overwrite carried an already-expired timestamp.
    ExpiredOverwrite,
    /// Inserted, or deleted through an explicit remove call.
    Explicit,
    /// Overwritten by a set call for the same key.
    Overwrite,
}

/// One cookie-change notification from the host. Ephemeral; delivered once
/// per underlying store mutation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieChange {
    /// The affected cookie, as it was at mutation time.
    pub cookie: Cookie,
    /// Mutation cause.
    pub cause: ChangeCause,
    /// Whether the host flagged this notification as a deletion.
    pub removed: bool,
}

/// Errors raised by cookie validation, text parsing, and the write API.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("cookie {name:?}: SameSite=None requires the Secure attribute")]
    InsecureSameSiteNone { name: String },

    #[error("cookie {name:?}: __Host-/__Secure- prefixed names require the Secure attribute")]
    InsecurePrefix { name: String },

    #[error("cookie {name:?}: __Host- prefixed names require path \"/\", got {path:?}")]
    HostPrefixPath { name: String, path: String },

    #[error("host rejected cookie {name:?} for {domain:?}: {reason}")]
    Rejected {
        name: String,
        domain: String,
        reason: String,
    },
}
