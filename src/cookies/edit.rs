//! Single-field cookie editing and bulk import.
//!
//! Editing `name` or `path` inserts a *new* record in the host store rather
//! than overwriting the old one, and flipping `secure` off can make the
//! rewrite fail outright. Edits therefore always run as
//! remove-old → set-new, restoring the old cookie when the new write is
//! rejected.

use futures::future::join_all;

use crate::cookies::api::{remove_cookie, set_cookie, CookieApiHandle};
use crate::cookies::cookie::{Cookie, CookieError, SameSite};
use crate::tabs::url_domain;

/// One editable cookie attribute with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieEdit {
    Name(String),
    Value(String),
    Domain(String),
    Path(String),
    Secure(bool),
    HttpOnly(bool),
    SameSite(SameSite),
    ExpirationDate(Option<f64>),
}

impl CookieEdit {
    /// Returns `cookie` with this edit applied, or `None` when the new
    /// value equals the old one (string values compared trimmed).
    fn applied_to(&self, cookie: &Cookie) -> Option<Cookie> {
        fn replace(old: &str, new: &str) -> Option<String> {
            let new = new.trim();
            (new != old.trim()).then(|| new.to_string())
        }

        let mut next = cookie.clone();
        match self {
            CookieEdit::Name(v) => next.name = replace(&cookie.name, v)?,
            CookieEdit::Value(v) => next.value = replace(&cookie.value, v)?,
            CookieEdit::Domain(v) => next.domain = replace(&cookie.domain, v)?,
            CookieEdit::Path(v) => next.path = replace(&cookie.path, v)?,
            CookieEdit::Secure(v) => {
                if cookie.secure == *v {
                    return None;
                }
                next.secure = *v;
            }
            CookieEdit::HttpOnly(v) => {
                if cookie.http_only == *v {
                    return None;
                }
                next.http_only = *v;
            }
            CookieEdit::SameSite(v) => {
                if cookie.same_site == *v {
                    return None;
                }
                next.same_site = *v;
            }
            CookieEdit::ExpirationDate(v) => {
                if cookie.expiration_date == *v {
                    return None;
                }
                next.expiration_date = *v;
            }
        }
        Some(next)
    }
}

/// Applies `edit` to `cookie` as remove-old → set-new.
///
/// Returns the rewritten cookie, or `None` when the edit was a no-op.
/// When the new write fails, the old cookie is restored (best-effort) and
/// the failure is returned.
///
/// # Errors
/// Validation or host rejection of the rewritten cookie.
pub async fn apply_edit(
    api: &CookieApiHandle,
    cookie: &Cookie,
    edit: CookieEdit,
) -> Result<Option<Cookie>, CookieError> {
    let Some(next) = edit.applied_to(cookie) else {
        return Ok(None);
    };

    remove_cookie(api, cookie).await?;

    match set_cookie(api, &next).await {
        Ok(()) => Ok(Some(next)),
        Err(err) => {
            if let Err(restore_err) = set_cookie(api, cookie).await {
                log::warn!(
                    "could not restore cookie {:?} on {:?} after failed edit: {}",
                    cookie.name,
                    cookie.domain,
                    restore_err
                );
            }
            Err(err)
        }
    }
}

/// Imports `cookies` onto the domain of `url`, rewriting each record's
/// domain before writing it.
///
/// Writes run concurrently and are collected without short-circuiting; one
/// rejected cookie does not stop the rest. Returns one result per input
/// cookie, in input order. An unusable `url` yields no writes at all.
pub async fn import_for_url(
    api: &CookieApiHandle,
    url: &str,
    cookies: &[Cookie],
) -> Vec<Result<(), CookieError>> {
    let Some(domain) = url_domain(url) else {
        log::warn!("cookie import skipped: no domain in url {url:?}");
        return Vec::new();
    };

    join_all(cookies.iter().map(|cookie| {
        let rewritten = cookie.with_domain(&domain);
        async move { set_cookie(api, &rewritten).await }
    }))
    .await
}
