//! One-shot confirmation notices carried in a cookie between a mutating
//! request and the next rendered page.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

const NOTICE_COOKIE: &str = "notice";

pub fn set_notice(jar: CookieJar, message: impl AsRef<str>) -> CookieJar {
    let value = urlencoding::encode(message.as_ref()).into_owned();
    jar.add(
        Cookie::build((NOTICE_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Reads the pending notice and queues its removal, so it is shown once.
pub fn take_notice(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(NOTICE_COOKIE).map(|cookie| {
        urlencoding::decode(cookie.value())
            .map(|m| m.into_owned())
            .unwrap_or_else(|_| cookie.value().to_string())
    });

    match message {
        Some(message) => {
            let jar = jar.remove(Cookie::build(NOTICE_COOKIE).path("/"));
            (jar, Some(message))
        }
        None => (jar, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_round_trips_through_the_cookie() {
        let jar = set_notice(CookieJar::new(), "Post 'Hello; world' added.");
        let stored = jar.get(NOTICE_COOKIE).unwrap().value().to_string();
        assert!(!stored.contains(';'));
        assert!(!stored.contains(' '));

        let (jar, notice) = take_notice(jar);
        assert_eq!(notice.as_deref(), Some("Post 'Hello; world' added."));
        assert!(jar.get(NOTICE_COOKIE).is_none());
    }

    #[test]
    fn notice_is_read_only_once() {
        let jar = set_notice(CookieJar::new(), "Tag 'rust' deleted.");
        let (jar, first) = take_notice(jar);
        let (_, second) = take_notice(jar);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn no_cookie_means_no_notice() {
        let (_, notice) = take_notice(CookieJar::new());
        assert!(notice.is_none());
    }
}
