//! Auth cookies and request token lookup

/// Session cookie name
pub const SESSION_COOKIE: &str = "token";
/// Password-reset cookie name
pub const RESET_COOKIE: &str = "resetToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes applied to an auth cookie
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: Option<i64>,
}

impl CookieConfig {
    /// The `token` session cookie
    pub fn session(max_age: i64, secure: bool) -> Self {
        Self {
            name: SESSION_COOKIE.to_string(),
            path: "/".to_string(),
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Some(max_age),
        }
    }

    /// The `resetToken` cookie
    pub fn reset(max_age: i64, secure: bool) -> Self {
        Self {
            name: RESET_COOKIE.to_string(),
            same_site: SameSite::Strict,
            ..Self::session(max_age, secure)
        }
    }

    /// Build `Set-Cookie` header value
    pub fn build_cookie(&self, value: &str) -> String {
        let mut parts = vec![format!("{}={}", self.name, value), format!("Path={}", self.path)];

        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.push(
            match self.same_site {
                SameSite::Strict => "SameSite=Strict",
                SameSite::Lax => "SameSite=Lax",
                SameSite::None => "SameSite=None",
            }
            .to_string(),
        );
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }

        parts.join("; ")
    }

    /// Build `Set-Cookie` header value that clears the cookie
    pub fn build_clear_cookie(&self) -> String {
        format!("{}=; Path={}; Max-Age=0; HttpOnly", self.name, self.path)
    }
}

/// Value of `name` in a `Cookie` header
pub fn extract_cookie(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from the `token` cookie, else from `Authorization: Bearer`
pub fn extract_request_token(cookie_header: Option<&str>, authorization: Option<&str>) -> Option<String> {
    cookie_header
        .and_then(|header| extract_cookie(header, SESSION_COOKIE))
        .or_else(|| {
            authorization
                .and_then(crate::jwt::extract_bearer_token)
                .map(str::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let cookie = CookieConfig::session(86_400, false).build_cookie("abc");
        assert_eq!(cookie, "token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400");

        let secure = CookieConfig::reset(600, true).build_cookie("r");
        assert!(secure.starts_with("resetToken=r"));
        assert!(secure.contains("Secure"));
        assert!(secure.contains("SameSite=Strict"));
    }

    #[test]
    fn test_clear_cookie() {
        assert_eq!(
            CookieConfig::session(1, false).build_clear_cookie(),
            "token=; Path=/; Max-Age=0; HttpOnly"
        );
    }

    #[test]
    fn test_extract_cookie() {
        let header = "theme=dark; token=abc123; resetToken=";
        assert_eq!(extract_cookie(header, "token").as_deref(), Some("abc123"));
        assert_eq!(extract_cookie(header, "resetToken"), None);
        assert_eq!(extract_cookie(header, "missing"), None);
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        assert_eq!(
            extract_request_token(Some("token=fromcookie"), Some("Bearer fromheader")).as_deref(),
            Some("fromcookie")
        );
        assert_eq!(
            extract_request_token(Some("other=1"), Some("Bearer fromheader")).as_deref(),
            Some("fromheader")
        );
        assert_eq!(extract_request_token(None, None), None);
    }
}
