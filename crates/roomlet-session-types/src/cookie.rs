//! Cookie builder for the session token.
//!
//! A remember-me sign-in gets a persistent cookie (Max-Age 14 days); a plain
//! sign-in gets a browser-session cookie with no Max-Age at all, so the
//! browser drops it when the window closes.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the session token.
pub const ROOMLET_SESSION: &str = "roomlet_session";

/// Session JWT lifetime for a browser-session sign-in, in seconds (4 hours).
pub const SESSION_TOKEN_EXP: u64 = 14400;

/// Cookie Max-Age and JWT lifetime for remember-me sign-ins, in seconds (14 days).
pub const REMEMBER_ME_EXP: u64 = 1209600;

/// Set the session cookie on the jar.
///
/// With `remember = true` the cookie persists for [`REMEMBER_ME_EXP`] seconds;
/// otherwise no Max-Age is set and the cookie lives only as long as the browser
/// session.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use roomlet_session_types::cookie::{set_session_cookie, ROOMLET_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "token_value".to_string(), "example.com".to_string(), true);
/// let cookie = jar.get(ROOMLET_SESSION).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(1209600)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use roomlet_session_types::cookie::{set_session_cookie, ROOMLET_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "token_value".to_string(), "example.com".to_string(), false);
/// let cookie = jar.get(ROOMLET_SESSION).unwrap();
/// assert_eq!(cookie.max_age(), None);
/// ```
pub fn set_session_cookie(jar: CookieJar, value: String, domain: String, remember: bool) -> CookieJar {
    let mut builder = Cookie::build((ROOMLET_SESSION, value))
        .path("/")
        .domain(domain)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax);
    if remember {
        builder = builder.max_age(Duration::seconds(REMEMBER_ME_EXP as i64));
    }
    jar.add(builder.build())
}

/// Clear the session cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use roomlet_session_types::cookie::{
///     clear_session_cookie, set_session_cookie, ROOMLET_SESSION,
/// };
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "a".to_string(), "example.com".to_string(), true);
/// let jar = clear_session_cookie(jar, "example.com".to_string());
/// let cookie = jar.get(ROOMLET_SESSION).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((ROOMLET_SESSION, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
