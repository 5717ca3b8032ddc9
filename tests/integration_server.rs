//! Live-server test: serves the router on an ephemeral port and walks the
//! invitation, sign-up, sign-in and sign-out path with a cookie-keeping
//! `reqwest` client, the way a browser would.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use portier::portier::{
    auth::{password::CredentialCodec, session::MemorySessionStore, AuthConfig, AuthState},
    render::FormRender,
    router,
    store::MemoryStore,
};
use reqwest::{header::LOCATION, redirect::Policy, Client, StatusCode};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};

struct Server {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    handle: JoinHandle<()>,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Server {
    async fn start() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let state = AuthState::new(
            AuthConfig::new().with_session_ttl_seconds(300),
            store.clone(),
            Arc::new(MemorySessionStore::new(Duration::from_secs(300))),
            Arc::new(FormRender),
        )
        .with_codec(CredentialCodec::with_params(8, 1, 1)?);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::new(state));
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                eprintln!("server stopped: {err}");
            }
        });

        Ok(Self {
            addr,
            store,
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

fn client() -> Result<Client> {
    Ok(Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .timeout(Duration::from_secs(10))
        .build()?)
}

fn location(response: &reqwest::Response) -> Option<&str> {
    response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

async fn csrf_token(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if response.status() != StatusCode::OK {
        return Err(anyhow!("GET {url} returned {}", response.status()));
    }
    let html = response.text().await?;
    let marker = r#"name="csrf_token" value=""#;
    let start = html
        .find(marker)
        .map(|index| index + marker.len())
        .context("no csrf token in page")?;
    let end = html[start..].find('"').context("unterminated csrf token")?;
    Ok(html[start..start + end].to_string())
}

#[tokio::test]
async fn browser_walks_through_the_whole_lifecycle() -> Result<()> {
    let server = Server::start().await?;
    server
        .store
        .add_invitation("XYZ", Utc::now() + ChronoDuration::days(1))
        .await;
    let client = client()?;

    // Anonymous visitors are sent to sign in.
    let response = client.get(server.url("/dashboard")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/sign_in"));

    // Register with the invitation code.
    let csrf = csrf_token(&client, &server.url("/sign_up")).await?;
    let response = client
        .post(server.url("/sign_up"))
        .form(&[
            ("username", "bob"),
            ("password", "pw123456"),
            ("code", "XYZ"),
            ("csrf_token", csrf.as_str()),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/sign_in"));
    assert!(server.store.user("bob").await.is_some());

    // Still anonymous after registering.
    let response = client.get(server.url("/dashboard")).send().await?;
    assert_eq!(location(&response), Some("/sign_in"));

    // Sign in.
    let csrf = csrf_token(&client, &server.url("/sign_in")).await?;
    let response = client
        .post(server.url("/sign_in"))
        .form(&[
            ("username", "bob"),
            ("password", "pw123456"),
            ("csrf_token", csrf.as_str()),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .context("sign in did not rotate the cookie")?;
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    // The dashboard carries the sign-out form.
    let csrf = csrf_token(&client, &server.url("/dashboard")).await?;

    // Sign out.
    let response = client
        .post(server.url("/sign_out"))
        .form(&[("csrf_token", csrf.as_str())])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/sign_in"));

    let response = client.get(server.url("/dashboard")).send().await?;
    assert_eq!(location(&response), Some("/sign_in"));
    Ok(())
}

#[tokio::test]
async fn health_is_served() -> Result<()> {
    let server = Server::start().await?;

    let response = client()?.get(server.url("/health")).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-app"));
    Ok(())
}
