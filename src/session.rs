//! Server-side session state.
//!
//! Each visitor gets an opaque id in an HTTP-only cookie; everything else
//! (session comments, remembered form state) lives in [`SessionStore`] and
//! disappears once the session has been idle longer than the configured TTL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use actix_web::{
    body::MessageBody,
    cookie::{Cookie, SameSite},
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::{ready, Ready};
use log::debug;
use rand::RngCore;

use crate::comment::Comment;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::form::FormMemory;

const DEFAULT_COOKIE: &str = "guestbook_session";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Default)]
pub struct SessionData {
    /// Comments per page key, in insertion order.
    pub comments: HashMap<String, Vec<Comment>>,
    /// Form state remembered after a failed submission, keyed by form path.
    pub forms: HashMap<String, FormMemory>,
    last_seen: Option<DateTime<Utc>>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self::with_ttl(Duration::minutes(ttl_minutes))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionData>> {
        // session data stays usable even if a holder panicked
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Runs `f` against the session's data, creating it on first use.
    pub fn with<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut sessions = self.lock();
        let data = sessions.entry(id.as_str().to_string()).or_default();
        data.last_seen = Some(Utc::now());
        f(data)
    }

    /// Like [`with`](Self::with) but never creates a session; `None` when the
    /// id is unknown.
    pub fn existing<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let mut sessions = self.lock();
        let data = sessions.get_mut(id.as_str())?;
        data.last_seen = Some(Utc::now());
        Some(f(data))
    }

    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, data| data.last_seen.map_or(false, |seen| seen > cutoff));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Drops idle sessions once a minute.
pub fn spawn_purge(store: web::Data<SessionStore>) {
    actix_rt::spawn(async move {
        let mut interval = actix_rt::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!("purged {} idle sessions, {} left", purged, store.len());
            }
        }
    });
}

pub async fn session_handler<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody,
{
    let cookie_name = req
        .app_data::<web::Data<AppConfig>>()
        .map(|c| c.session_cookie.clone())
        .unwrap_or_else(|| DEFAULT_COOKIE.to_string());
    let store = req.app_data::<web::Data<SessionStore>>().cloned();

    let known = req
        .cookie(&cookie_name)
        .map(|cookie| SessionId(cookie.value().to_string()))
        .filter(|id| {
            store
                .as_ref()
                .is_some_and(|store| store.existing(id, |_| ()).is_some())
        });
    let fresh = known.is_none();
    let id = known.unwrap_or_else(SessionId::generate);
    req.extensions_mut().insert(id.clone());

    let mut res = next.call(req).await?;
    // a fresh id only becomes a session once a handler stored data under it
    let stored = store.as_ref().is_some_and(|store| store.contains(id.as_str()));
    if fresh && stored {
        let cookie = Cookie::build(cookie_name, id.0)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();
        res.response_mut()
            .add_cookie(&cookie)
            .map_err(|_| AppError::system_exception())?;
    }
    Ok(res)
}

impl FromRequest for SessionId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req.extensions().get::<SessionId>().cloned();
        ready(id.ok_or_else(|| AppError::system_exception().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::{App, HttpResponse};

    async fn echo(id: SessionId) -> HttpResponse {
        HttpResponse::Ok().body(id.0)
    }

    async fn remember(store: web::Data<SessionStore>, id: SessionId) -> HttpResponse {
        store.with(&id, |data| data.comments.insert("p".to_string(), Vec::new()));
        HttpResponse::Ok().body(id.0)
    }

    fn issued_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
        res.response()
            .cookies()
            .find(|c| c.name() == "guestbook_session")
            .map(|c| c.into_owned())
    }

    #[test]
    fn generated_ids_are_distinct_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn with_creates_and_existing_does_not() {
        let store = SessionStore::new(10);
        let id = SessionId("abc".to_string());
        assert_eq!(store.existing(&id, |data| data.comments.len()), None);
        assert!(!store.contains("abc"));

        store.with(&id, |data| data.comments.insert("p".to_string(), Vec::new()));
        assert!(store.contains("abc"));
        assert_eq!(store.existing(&id, |data| data.comments.len()), Some(1));
    }

    #[test]
    fn purge_drops_idle_sessions_only() {
        let idle = SessionStore::with_ttl(Duration::seconds(-1));
        idle.with(&SessionId("a".to_string()), |_| ());
        idle.with(&SessionId("b".to_string()), |_| ());
        assert_eq!(idle.purge_expired(), 2);
        assert_eq!(idle.len(), 0);

        let live = SessionStore::new(10);
        live.with(&SessionId("a".to_string()), |_| ());
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[actix_web::test]
    async fn cookie_is_issued_once_data_is_stored() {
        let store = web::Data::new(SessionStore::new(10));
        let app = init_service(
            App::new()
                .app_data(web::Data::new(AppConfig::for_tests()))
                .app_data(store.clone())
                .wrap(actix_web::middleware::from_fn(session_handler))
                .route("/", web::get().to(echo))
                .route("/remember", web::post().to(remember)),
        )
        .await;

        let res = call_service(&app, TestRequest::get().uri("/").to_request()).await;
        assert!(issued_cookie(&res).is_none());
        assert_eq!(store.len(), 0);

        let res = call_service(&app, TestRequest::post().uri("/remember").to_request()).await;
        let cookie = issued_cookie(&res).expect("session cookie");
        let body = read_body(res).await;
        assert_eq!(body, cookie.value().as_bytes());
        assert!(store.contains(cookie.value()));

        let req = TestRequest::get().uri("/").cookie(cookie.clone()).to_request();
        let res = call_service(&app, req).await;
        assert!(issued_cookie(&res).is_none());
        let body = read_body(res).await;
        assert_eq!(body, cookie.value().as_bytes());
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn unknown_cookie_gets_replaced() {
        let store = web::Data::new(SessionStore::new(10));
        let app = init_service(
            App::new()
                .app_data(web::Data::new(AppConfig::for_tests()))
                .app_data(store.clone())
                .wrap(actix_web::middleware::from_fn(session_handler))
                .route("/remember", web::post().to(remember)),
        )
        .await;

        let req = TestRequest::post()
            .uri("/remember")
            .cookie(Cookie::new("guestbook_session", "forged"))
            .to_request();
        let res = call_service(&app, req).await;
        let issued = issued_cookie(&res).map(|c| c.value().to_string());
        assert!(matches!(issued, Some(ref v) if v != "forged"));
        assert!(!store.contains("forged"));
    }
}
