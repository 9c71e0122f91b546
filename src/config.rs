use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub session_cookie: String,
    pub session_ttl_minutes: i64,
    pub content_path: String,
    pub default_redirect: String,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(38322);

        let sqlite_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/guestbook.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let session_cookie = env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "guestbook_session".to_string());
        let session_ttl_minutes = env::var("SESSION_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(120);

        let content_path = env::var("CONTENT_PATH").unwrap_or_else(|_| "./content".to_string());
        let default_redirect = env::var("DEFAULT_REDIRECT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "/".to_string());

        // bcrypt rejects costs outside 4..=31
        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| (4..=31).contains(v))
            .unwrap_or(10);

        Self {
            server_port,
            sqlite_path,
            database_url,
            session_cookie,
            session_ttl_minutes,
            content_path,
            default_redirect,
            bcrypt_cost,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}", path)
    }

    /// Picks the caller-supplied redirect target, falling back to the
    /// configured default when the form left it blank.
    pub fn redirect_or_default(&self, target: Option<&str>) -> String {
        target
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_redirect.clone())
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            sqlite_path: String::new(),
            database_url: Some("sqlite::memory:".to_string()),
            session_cookie: "guestbook_session".to_string(),
            session_ttl_minutes: 120,
            content_path: "./content".to_string(),
            default_redirect: "/".to_string(),
            bcrypt_cost: 4,
        }
    }
}
