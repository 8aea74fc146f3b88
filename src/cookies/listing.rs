//! Domain-grouped cookie listing.
//!
//! [`CookieIndex`] is the read model behind cookie inspection: every cookie
//! known to the host, bucketed by domain, each bucket sorted by name. It is
//! a plain snapshot; callers rebuild it via [`CookieIndex::refresh`] when a
//! change notification arrives.

use std::collections::BTreeMap;

use crate::cookies::api::{CookieApiHandle, CookieFilter};
use crate::cookies::cookie::{Cookie, CookieError};

/// Snapshot of all cookies, grouped by their verbatim domain string.
#[derive(Debug, Clone, Default)]
pub struct CookieIndex {
    by_domain: BTreeMap<String, Vec<Cookie>>,
}

impl CookieIndex {
    /// Groups `cookies` by domain and sorts each group by name,
    /// ASCII-case-insensitively.
    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        let mut by_domain: BTreeMap<String, Vec<Cookie>> = BTreeMap::new();
        for cookie in cookies {
            by_domain.entry(cookie.domain.clone()).or_default().push(cookie);
        }
        for bucket in by_domain.values_mut() {
            bucket.sort_by(|a, b| {
                a.name
                    .to_ascii_uppercase()
                    .cmp(&b.name.to_ascii_uppercase())
            });
        }
        Self { by_domain }
    }

    /// Loads the full cookie set from the host and builds a fresh index.
    pub async fn refresh(api: &CookieApiHandle) -> Result<Self, CookieError> {
        let cookies = api.get_all(&CookieFilter::default()).await?;
        Ok(Self::from_cookies(cookies))
    }

    /// Domains present in the snapshot, in sorted order.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.by_domain.keys().map(String::as_str)
    }

    /// Cookies for `domain` (verbatim match), name-sorted.
    pub fn cookies_for(&self, domain: &str) -> &[Cookie] {
        self.by_domain.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of cookies across all domains.
    pub fn len(&self) -> usize {
        self.by_domain.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::api::{set_cookie, InMemoryCookieApi};
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
            expiration_date: None,
            host_only: false,
            store_id: None,
        }
    }

    #[test]
    fn groups_by_verbatim_domain() {
        let index = CookieIndex::from_cookies(vec![
            cookie("a.com", "x"),
            cookie(".a.com", "y"),
            cookie("b.com", "z"),
        ]);
        // ".a.com" and "a.com" are distinct buckets
        let domains: Vec<_> = index.domains().collect();
        assert_eq!(domains, [".a.com", "a.com", "b.com"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn buckets_sort_by_name_ignoring_case() {
        let index = CookieIndex::from_cookies(vec![
            cookie("a.com", "zeta"),
            cookie("a.com", "Alpha"),
            cookie("a.com", "beta"),
        ]);
        let names: Vec<_> = index
            .cookies_for("a.com")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn missing_domain_yields_empty_slice() {
        let index = CookieIndex::default();
        assert!(index.cookies_for("nope.com").is_empty());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn refresh_reads_the_full_host_store() {
        let api = InMemoryCookieApi::new();
        let handle: CookieApiHandle = api.clone();
        set_cookie(&handle, &cookie("a.com", "sid")).await.unwrap();
        set_cookie(&handle, &cookie("b.com", "sid")).await.unwrap();

        let index = CookieIndex::refresh(&handle).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.cookies_for("a.com").len(), 1);
    }
}
