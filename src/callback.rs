use color_eyre::eyre::{eyre, Result};
use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, LOCATION},
    service::Service,
    Method, Request, Response, StatusCode,
};
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::{
    net::TcpListener,
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender},
        Notify,
    },
    task::JoinHandle,
};

use crate::Shared;

/// How long the server stays up for the browser to follow the redirect
const LANDING_GRACE: Duration = Duration::from_secs(2);

/// What the authorization server appended to the redirect uri
#[derive(Debug, serde::Deserialize)]
pub struct AuthResponse {
    pub code: Option<String>,
    pub error: Option<String>,
}

pub type AuthResult = std::result::Result<String, String>;

#[derive(Clone)]
pub struct Callback {
    pub path: String,
    pub tx: UnboundedSender<AuthResult>,
    received: Shared<AtomicBool>,
    landed: Shared<Notify>,
}

impl Callback {
    pub fn new(path: &str, tx: UnboundedSender<AuthResult>) -> Self {
        Self {
            path: path.to_string(),
            tx,
            received: Shared::new(AtomicBool::new(false)),
            landed: Shared::new(Notify::new()),
        }
    }

    /// Answer a request to the redirect path.
    ///
    /// A code is forwarded and the browser is sent back to the bare path so the code never
    /// stays in the address bar or history.
    pub fn handler(&self, query: Option<&str>) -> Response<Full<Bytes>> {
        let response: AuthResponse = match query.map(serde_qs::from_str).transpose() {
            Ok(response) => response.unwrap_or(AuthResponse {
                code: None,
                error: None,
            }),
            Err(err) => {
                log::error!("Invalid authorization redirect: {err}");
                return page(
                    StatusCode::BAD_REQUEST,
                    "<h1>Invalid authorization response</h1>",
                );
            }
        };

        match response {
            AuthResponse {
                error: Some(error), ..
            } => {
                let _ = self.tx.send(Err(error.clone()));
                page(
                    StatusCode::OK,
                    &format!("<h1>Authorization failed</h1>\n<h3>{}</h3>", escape(&error)),
                )
            }
            AuthResponse {
                code: Some(code), ..
            } => {
                self.received.store(true, Ordering::SeqCst);
                let _ = self.tx.send(Ok(code));
                see_other(&self.path)
            }
            _ if self.received.load(Ordering::SeqCst) => {
                self.landed.notify_one();
                page(
                    StatusCode::OK,
                    r#"<h1>Successfully logged in to <span class="green">Spotify</span></h1>
                    <h3>This tab may now be closed</h3>"#,
                )
            }
            _ => page(
                StatusCode::OK,
                "<h1>Waiting for Spotify</h1>\n<h3>No authorization code in this request</h3>",
            ),
        }
    }
}

impl Service<Request<Incoming>> for Callback {
    type Response = Response<Full<Bytes>>;
    type Error = std::convert::Infallible;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = match (req.method(), req.uri().path()) {
            (&Method::GET, path) if path == self.path.as_str() => self.handler(req.uri().query()),
            _ => page(StatusCode::NOT_FOUND, "<h1>404 Page not found</h1>"),
        };
        Box::pin(async move { Ok(response) })
    }
}

/// Local http server that receives the redirect from the authorization server
pub struct CallbackListener {
    addr: SocketAddr,
    rx: UnboundedReceiver<AuthResult>,
    landed: Shared<Notify>,
    handle: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind to the loopback port of `redirect` and start serving its path
    pub async fn bind(redirect: &str) -> Result<Self> {
        let uri = hyper::Uri::from_str(redirect)?;

        // Mini http server to serve callback and parse auth code from spotify
        let addr = SocketAddr::from(([127, 0, 0, 1], uri.port_u16().unwrap_or(80)));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        log::info!("Listening for the authorization redirect on {addr}");

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let callback = Callback::new(uri.path(), tx);
        let landed = callback.landed.clone();
        let handle = tokio::spawn(async move {
            loop {
                let stream = match listener.accept().await {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        log::warn!("Failed to accept redirect connection: {err}");
                        continue;
                    }
                };
                let io = hyper_util::rt::TokioIo::new(stream);

                let cb = callback.clone();
                tokio::spawn(async move {
                    if let Err(err) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, cb)
                        .await
                    {
                        log::error!("Error serving connection to spotify callback: {:?}", err);
                    }
                });
            }
        });

        Ok(Self {
            addr,
            rx,
            landed,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the redirect and shut the server down
    pub async fn code(mut self) -> Result<String> {
        let result = self
            .rx
            .recv()
            .await
            .ok_or_else(|| eyre!("Spotify did not send a response"));

        match result? {
            Ok(code) => {
                // Let the browser land on the bare path before the server goes away
                let _ = tokio::time::timeout(LANDING_GRACE, self.landed.notified()).await;
                Ok(code)
            }
            Err(error) => Err(eyre!("Spotify denied the authorization: {error}")),
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn see_other(location: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SEE_OTHER;
    if let Ok(location) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, location);
    }
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn page(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(layout(body))));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn layout(body: &str) -> String {
    format!(
        indoc::indoc! {r#"
            <html>
                <head>
                    <title>Scotify</title>
                    <style>
                    * {{
                        box-sizing: border-box
                    }}
                    html {{
                        font-family: Arial;
                        background-color: #191414;
                        color: #FFFFFF
                    }}
                    :is(h1, h3) {{
                        text-align: center;
                    }}
                    body {{
                        padding: 1.5rem;
                    }}
                    .green {{
                        color: #1DB954
                    }}
                    </style>
                </head>
                <body>
                    {}
                </body>
            </html>
        "#},
        body
    )
}
