//! End-to-end tests for the login flow.
//!
//! Most tests drive the router in-process with `oneshot`, carrying cookies
//! between requests by hand. One test binds a real listener and walks the flow
//! with an HTTP client that follows redirects and keeps a cookie jar.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use gatehouse::{
    api::{self, ApiConfig, AppState},
    auth::{Authenticator, SessionId, SessionState, SessionStore},
    hashing::{Argon2Hasher, Argon2Params},
    store::memory::{MemoryCredentialStore, MemorySessionStore},
};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use tower::ServiceExt;

// Cheap cost parameters keep the suite fast while still exercising Argon2.
const TEST_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 64,
    iterations: 1,
    parallelism: 1,
};

fn app() -> Result<Router> {
    app_with_sessions(Arc::new(MemorySessionStore::new(Duration::from_secs(600))))
}

fn app_with_sessions(sessions: Arc<dyn SessionStore>) -> Result<Router> {
    let hasher = Arc::new(Argon2Hasher::new(TEST_PARAMS)?);
    let auth = Authenticator::new(Arc::new(MemoryCredentialStore::new()), hasher, sessions);
    let config = ApiConfig::new().with_session_ttl_seconds(600);
    Ok(api::router(Arc::new(AppState::new(auth, config))))
}

/// Session store that works until a session has to be destroyed.
struct UndeletableSessions(MemorySessionStore);

#[async_trait]
impl SessionStore for UndeletableSessions {
    async fn create(&self) -> Result<SessionId> {
        self.0.create().await
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>> {
        self.0.get(id).await
    }

    async fn set(&self, id: &SessionId, state: SessionState) -> Result<bool> {
        self.0.set(id, state).await
    }

    async fn destroy(&self, _id: &SessionId) -> Result<()> {
        Err(anyhow!("session backend unavailable"))
    }

    async fn purge_expired(&self) -> Result<u64> {
        self.0.purge_expired().await
    }
}

/// Minimal browser: remembers cookies and reads flash messages.
struct Browser {
    app: Router,
    cookies: BTreeMap<String, String>,
}

struct Page {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Page {
    fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

impl Browser {
    fn new(app: Router) -> Self {
        Self {
            app,
            cookies: BTreeMap::new(),
        }
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    async fn get(&mut self, uri: &str) -> Result<Page> {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Result<Page> {
        self.send(Method::POST, uri, Some(form.to_string())).await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> Result<Page> {
        let mut request = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie);
        }
        let request = match form {
            Some(form) => request
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))?,
            None => request.body(Body::empty())?,
        };

        let response = self.app.clone().oneshot(request).await?;
        self.absorb(response).await
    }

    async fn absorb(&mut self, response: Response) -> Result<Page> {
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let set_cookie = set_cookie.to_str()?;
            let pair = set_cookie.split(';').next().context("empty Set-Cookie")?;
            let (name, value) = pair.split_once('=').context("malformed Set-Cookie")?;
            if value.is_empty() || set_cookie.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(Page {
            status,
            headers,
            body: String::from_utf8(body.to_vec())?,
        })
    }
}

#[tokio::test]
async fn register_login_dashboard_logout() -> Result<()> {
    let mut browser = Browser::new(app()?);

    let page = browser.get("/").await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));

    let page = browser
        .post(
            "/register",
            "username=alice&password=s3cret&confirmPassword=s3cret",
        )
        .await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));
    assert!(browser.cookie("gatehouse_session").is_none());

    let page = browser.get("/login").await?;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("You are now registered"));

    // The flash is consumed by the render above.
    let page = browser.get("/login").await?;
    assert!(!page.body.contains("You are now registered"));

    let page = browser
        .post("/login", "username=alice&password=s3cret")
        .await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/dashboard"));
    assert!(browser.cookie("gatehouse_session").is_some());

    let page = browser.get("/dashboard").await?;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome, alice"));
    assert!(page.body.contains("Logged in successfully"));

    let page = browser.get("/logout").await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));
    assert!(browser.cookie("gatehouse_session").is_none());

    let page = browser.get("/dashboard").await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));

    let page = browser.get("/login").await?;
    assert!(page.body.contains("Please log in to view this page"));
    Ok(())
}

#[tokio::test]
async fn mismatched_confirmation_creates_no_account() -> Result<()> {
    let mut browser = Browser::new(app()?);

    let page = browser
        .post("/register", "username=bob&password=a&confirmPassword=b")
        .await?;
    assert_eq!(page.location(), Some("/register"));

    let page = browser.get("/register").await?;
    assert!(page.body.contains("Passwords do not match"));

    let page = browser.post("/login", "username=bob&password=a").await?;
    assert_eq!(page.location(), Some("/login"));
    assert!(browser.cookie("gatehouse_session").is_none());

    let page = browser.get("/login").await?;
    assert!(page.body.contains("Invalid credentials"));
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_rejected() -> Result<()> {
    let mut browser = Browser::new(app()?);

    browser
        .post("/register", "username=carol&password=one&confirmPassword=one")
        .await?;
    let page = browser
        .post("/register", "username=carol&password=two&confirmPassword=two")
        .await?;
    assert_eq!(page.location(), Some("/register"));

    let page = browser.get("/register").await?;
    assert!(page.body.contains("Username already exists"));

    // The first password still works.
    let page = browser.post("/login", "username=carol&password=one").await?;
    assert_eq!(page.location(), Some("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn empty_fields_are_rejected() -> Result<()> {
    let mut browser = Browser::new(app()?);

    let page = browser
        .post("/register", "username=&password=x&confirmPassword=x")
        .await?;
    assert_eq!(page.location(), Some("/register"));

    let page = browser.get("/register").await?;
    assert!(page.body.contains("Username and password are required"));
    Ok(())
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() -> Result<()> {
    let app = app()?;

    let mut setup = Browser::new(app.clone());
    setup
        .post("/register", "username=dave&password=right&confirmPassword=right")
        .await?;

    let mut unknown = Browser::new(app.clone());
    let unknown_page = unknown
        .post("/login", "username=nobody&password=right")
        .await?;

    let mut wrong = Browser::new(app);
    let wrong_page = wrong.post("/login", "username=dave&password=wrong").await?;

    assert_eq!(unknown_page.status, wrong_page.status);
    assert_eq!(unknown_page.location(), wrong_page.location());
    assert_eq!(
        unknown.cookie("gatehouse_flash"),
        wrong.cookie("gatehouse_flash")
    );
    assert!(unknown.cookie("gatehouse_session").is_none());
    assert!(wrong.cookie("gatehouse_session").is_none());
    Ok(())
}

#[tokio::test]
async fn logout_reports_store_failure_and_still_clears_cookie() -> Result<()> {
    let sessions = UndeletableSessions(MemorySessionStore::new(Duration::from_secs(600)));
    let mut browser = Browser::new(app_with_sessions(Arc::new(sessions))?);

    browser
        .post("/register", "username=frank&password=pw&confirmPassword=pw")
        .await?;
    let page = browser.post("/login", "username=frank&password=pw").await?;
    assert_eq!(page.location(), Some("/dashboard"));
    assert!(browser.cookie("gatehouse_session").is_some());

    let page = browser.get("/logout").await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));
    let set_cookies = page
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str())
        .collect::<Result<Vec<_>, _>>()?;
    assert!(set_cookies
        .iter()
        .any(|c| c.starts_with("gatehouse_session=") && c.contains("Max-Age=0")));
    assert!(set_cookies
        .iter()
        .any(|c| c.starts_with("gatehouse_flash=kind=error")));
    assert!(browser.cookie("gatehouse_session").is_none());

    let page = browser.get("/login").await?;
    assert!(page.body.contains("Something went wrong, please try again"));
    Ok(())
}

#[tokio::test]
async fn forged_session_cookie_is_denied() -> Result<()> {
    let mut browser = Browser::new(app()?);
    browser
        .cookies
        .insert("gatehouse_session".to_string(), "not-a-real-session".to_string());

    let page = browser.get("/dashboard").await?;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));
    Ok(())
}

#[tokio::test]
async fn health_reports_stores_and_version() -> Result<()> {
    let app = app()?;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let x_app = response
        .headers()
        .get("X-App")
        .context("missing X-App header")?
        .to_str()?
        .to_string();
    assert!(x_app.starts_with("gatehouse:"));

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["name"], "gatehouse");
    assert_eq!(json["credentials"], "ok");
    assert_eq!(json["sessions"], "ok");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/health")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn request_id_is_assigned_and_propagated() -> Result<()> {
    let app = app()?;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/login").body(Body::empty())?)
        .await?;
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/login")
                .header("x-request-id", "req-123")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .map(|value| value.to_str())
            .transpose()?,
        Some("req-123")
    );
    Ok(())
}

#[tokio::test]
async fn full_flow_over_tcp() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(api::serve(listener, app()?, async move {
        let _ = rx.await;
    }));

    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let base = format!("http://{addr}");

    let page = client
        .post(format!("{base}/register"))
        .form(&[
            ("username", "erin"),
            ("password", "hunter2"),
            ("confirmPassword", "hunter2"),
        ])
        .send()
        .await?;
    assert_eq!(page.url().path(), "/login");
    assert!(page.text().await?.contains("You are now registered"));

    let page = client
        .post(format!("{base}/login"))
        .form(&[("username", "erin"), ("password", "hunter2")])
        .send()
        .await?;
    assert_eq!(page.url().path(), "/dashboard");
    assert!(page.text().await?.contains("Welcome, erin"));

    let page = client.get(format!("{base}/logout")).send().await?;
    assert_eq!(page.url().path(), "/login");

    let page = client.get(format!("{base}/dashboard")).send().await?;
    assert_eq!(page.url().path(), "/login");
    assert!(page
        .text()
        .await?
        .contains("Please log in to view this page"));

    let _ = tx.send(());
    server.await??;
    Ok(())
}
