//! Cookie write API seam.
//!
//! The host environment owns the real cookie store; this module defines the
//! trait the engine writes through, plus the helpers that carry the
//! collaborator's contract:
//!
//! - [`set_cookie`] validates before every write ([`Cookie::validate`]).
//! - [`remove_cookie`] is a *set with an already-expired timestamp*, not a
//!   native delete. The host's delete affects a domain and all its
//!   subdomain variants at once, which would over-delete; the expired set
//!   targets exactly one `(domain, name, path, store_id)` record.
//!
//! [`InMemoryCookieApi`] is a first-class in-memory backend that mirrors
//! that behavior and journals every write, used by the engine's tests and
//! by ephemeral/private profiles.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cookies::cookie::{Cookie, CookieError};

/// A handle to a type-erased cookie write API.
///
/// Implementations must be `Send + Sync` and internally synchronized; the
/// trait methods take `&self`.
pub type CookieApiHandle = Arc<dyn CookieApi + Send + Sync>;

/// Filter for [`CookieApi::get_all`]. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieFilter {
    /// Match cookies scoped to this domain or a subdomain of it.
    pub domain: Option<String>,
    /// Match cookies with exactly this name.
    pub name: Option<String>,
}

impl CookieFilter {
    /// Filter on a domain and its subdomains.
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            name: None,
        }
    }

    pub fn matches(&self, cookie: &Cookie) -> bool {
        if let Some(name) = &self.name {
            if &cookie.name != name {
                return false;
            }
        }
        if let Some(domain) = &self.domain {
            if !domain_matches(&cookie.domain, domain) {
                return false;
            }
        }
        true
    }
}

/// `true` when `cookie_domain` (leading dot ignored) is `filter` or a
/// subdomain of it.
fn domain_matches(cookie_domain: &str, filter: &str) -> bool {
    let host = cookie_domain.trim_start_matches('.');
    let filter = filter.trim_start_matches('.');
    host == filter || host.ends_with(&format!(".{filter}"))
}

/// The host cookie store surface the engine writes through.
#[async_trait::async_trait]
pub trait CookieApi: Send + Sync {
    /// Returns all cookies matching `filter`.
    async fn get_all(&self, filter: &CookieFilter) -> Result<Vec<Cookie>, CookieError>;

    /// Writes `cookie`, replacing any record with the same
    /// `(domain, name, path, store_id)` key. A cookie carrying an
    /// already-elapsed expiration deletes that record instead.
    ///
    /// Callers go through [`set_cookie`] so validation happens first.
    async fn set(&self, cookie: &Cookie) -> Result<(), CookieError>;
}

/// Validates `cookie`, then writes it through `api`.
///
/// # Errors
/// Returns the validation error without attempting the write when the
/// `__Host-`/`__Secure-`/`SameSite=None` invariants are violated, or the
/// host's rejection otherwise.
pub async fn set_cookie(api: &CookieApiHandle, cookie: &Cookie) -> Result<(), CookieError> {
    cookie.validate()?;
    api.set(cookie).await
}

/// Removes `cookie` by writing it back with an expired timestamp.
pub async fn remove_cookie(api: &CookieApiHandle, cookie: &Cookie) -> Result<(), CookieError> {
    set_cookie(api, &cookie.expired()).await
}

/// Reconstructs the URL a cookie belongs to
/// (`http{s}://{domain minus leading dot}{path}`).
pub fn cookie_url(cookie: &Cookie) -> String {
    let scheme = if cookie.secure { "https" } else { "http" };
    let host = cookie.domain.trim_start_matches('.');
    format!("{scheme}://{host}{path}", path = cookie.path)
}

/// Record key inside the host store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CookieKey {
    domain: String,
    name: String,
    path: String,
    store_id: Option<String>,
}

impl CookieKey {
    fn of(cookie: &Cookie) -> Self {
        Self {
            domain: cookie.domain.clone(),
            name: cookie.name.clone(),
            path: cookie.path.clone(),
            store_id: cookie.store_id.clone(),
        }
    }
}

/// In-memory cookie store with host-like set/expire semantics.
///
/// Every accepted `set` call is journaled in order, so tests can assert on
/// the exact writes a scenario produced.
#[derive(Default)]
pub struct InMemoryCookieApi {
    records: RwLock<HashMap<CookieKey, Cookie>>,
    writes: RwLock<Vec<Cookie>>,
}

impl InMemoryCookieApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All `set` calls accepted so far, oldest first.
    pub fn journal(&self) -> Vec<Cookie> {
        self.writes.read().expect("journal lock poisoned").clone()
    }

    /// Current live records, in no particular order.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.records
            .read()
            .expect("records lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn now() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[async_trait::async_trait]
impl CookieApi for InMemoryCookieApi {
    async fn get_all(&self, filter: &CookieFilter) -> Result<Vec<Cookie>, CookieError> {
        let records = self.records.read().expect("records lock poisoned");
        Ok(records.values().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn set(&self, cookie: &Cookie) -> Result<(), CookieError> {
        self.writes
            .write()
            .expect("journal lock poisoned")
            .push(cookie.clone());

        let mut records = self.records.write().expect("records lock poisoned");
        let key = CookieKey::of(cookie);
        match cookie.expiration_date {
            Some(ts) if ts <= Self::now() => {
                records.remove(&key);
            }
            _ => {
                records.insert(key, cookie.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::cookie::SameSite;

    fn cookie(domain: &str, name: &str) -> Cookie {
        Cookie {
            name: name.into(),
            value: "v".into(),
            domain: domain.into(),
            path: "/".into(),
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
            expiration_date: Some(4102444800.0),
            host_only: false,
            store_id: None,
        }
    }

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let api = InMemoryCookieApi::new();
        let handle: CookieApiHandle = api.clone();

        set_cookie(&handle, &cookie("a.com", "sid")).await.unwrap();
        set_cookie(&handle, &cookie("b.com", "sid")).await.unwrap();

        let all = handle.get_all(&CookieFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_a = handle.get_all(&CookieFilter::domain("a.com")).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].domain, "a.com");
    }

    #[tokio::test]
    async fn domain_filter_matches_subdomains_and_dot_prefix() {
        let api = InMemoryCookieApi::new();
        let handle: CookieApiHandle = api.clone();

        set_cookie(&handle, &cookie(".example.com", "a")).await.unwrap();
        set_cookie(&handle, &cookie("shop.example.com", "b")).await.unwrap();
        set_cookie(&handle, &cookie("example.org", "c")).await.unwrap();

        let hits = handle
            .get_all(&CookieFilter::domain("example.com"))
            .await
            .unwrap();
        let mut names: Vec<_> = hits.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn expired_set_deletes_exactly_one_record() {
        let api = InMemoryCookieApi::new();
        let handle: CookieApiHandle = api.clone();

        set_cookie(&handle, &cookie(".a.com", "sid")).await.unwrap();
        set_cookie(&handle, &cookie("a.com", "sid")).await.unwrap();

        // Removing the dotted variant must leave the host-only one alone.
        remove_cookie(&handle, &cookie(".a.com", "sid")).await.unwrap();

        let left = api.cookies();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].domain, "a.com");

        // The journal saw all three writes, the last one expired.
        let journal = api.journal();
        assert_eq!(journal.len(), 3);
        assert_eq!(journal[2].expiration_date, Some(0.0));
    }

    #[tokio::test]
    async fn invalid_cookie_never_reaches_the_host() {
        let api = InMemoryCookieApi::new();
        let handle: CookieApiHandle = api.clone();

        let mut bad = cookie("a.com", "sid");
        bad.same_site = SameSite::NoRestriction; // without Secure

        assert!(set_cookie(&handle, &bad).await.is_err());
        assert!(api.journal().is_empty());
    }

    #[test]
    fn cookie_url_strips_leading_dot_and_uses_scheme() {
        let mut c = cookie(".example.com", "sid");
        c.path = "/app".into();
        assert_eq!(cookie_url(&c), "http://example.com/app");
        c.secure = true;
        assert_eq!(cookie_url(&c), "https://example.com/app");
    }
}
