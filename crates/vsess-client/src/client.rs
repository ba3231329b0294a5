//! Main client implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use tokio::sync::OnceCell;
use url::Url;

use crate::api::{InventoryApi, SearchIndexApi, ServiceInstanceApi, SessionManagerApi};
use crate::error::{Error, Fault, Result};
use crate::tls::TlsTrust;
use crate::types::{ServiceContent, UserSession};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default VI/JSON API release used in request paths.
pub const DEFAULT_RELEASE: &str = "8.0.1.0";

/// Header carrying the authenticated session id.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

// ─────────────────────────────────────────────────────────────────────────────
// Server URL
// ─────────────────────────────────────────────────────────────────────────────

/// A validated vCenter endpoint URL.
///
/// Accepts a bare host (`vc.example.com`), a `host:port`, or a full URL.
/// Bare hosts get `https://`; an empty path becomes `/sdk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl {
    url: Url,
}

impl ServerUrl {
    /// Parse and normalize a server address.
    pub fn parse(server: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidServer {
            server: server.to_string(),
            reason,
        };

        let trimmed = server.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty server address".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let mut url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "https" | "http" => {}
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid(
                "credentials must be supplied separately, not in the address".to_string(),
            ));
        }
        if url.path().is_empty() || url.path() == "/" {
            url.set_path("/sdk");
        }

        Ok(Self { url })
    }

    /// The normalized URL.
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Base URL for VI/JSON calls against `release`.
    fn api_base(&self, release: &str) -> Url {
        let mut base = self.url.clone();
        let path = format!("{}/vim25/{}/", base.path().trim_end_matches('/'), release);
        base.set_path(&path);
        base
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// VI/JSON API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// authenticated session.
///
/// # Example
///
/// ```no_run
/// use vsess_client::{ServerUrl, TlsTrust, VimClient};
///
/// # async fn example() -> vsess_client::Result<()> {
/// let server = ServerUrl::parse("vcenter.example.com")?;
/// let client = VimClient::builder()
///     .server(server)
///     .tls(TlsTrust::from_thumbprint(None)?)
///     .build()?;
///
/// client.session_manager().login("administrator@vsphere.local", "secret").await?;
/// let now = client.service_instance().current_time().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct VimClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Endpoint the client was built for.
    pub(crate) server: ServerUrl,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Value of the session header once logged in.
    pub(crate) session_id: RwLock<Option<String>>,
    /// Server-side session record once logged in.
    pub(crate) user_session: RwLock<Option<UserSession>>,
    /// Service content, fetched once.
    pub(crate) content: OnceCell<ServiceContent>,
}

impl fmt::Debug for VimClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VimClient")
            .field("server", &self.inner.server.to_string())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl VimClient {
    /// Get access to the inner client state (for API implementations).
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the endpoint this client talks to.
    pub fn server(&self) -> &ServerUrl {
        &self.inner.server
    }

    /// Get the base URL for API requests.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether a login has succeeded and not been logged out.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session_id.read().is_some()
    }

    /// The server-side record of the current session, if logged in.
    pub fn user_session(&self) -> Option<UserSession> {
        self.inner.user_session.read().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the service instance API.
    pub fn service_instance(&self) -> ServiceInstanceApi {
        ServiceInstanceApi::new(self.clone())
    }

    /// Access the session manager API.
    pub fn session_manager(&self) -> SessionManagerApi {
        SessionManagerApi::new(self.clone())
    }

    /// Access the inventory API.
    pub fn inventory(&self) -> InventoryApi {
        InventoryApi::new(self.clone())
    }

    /// Access the search index API.
    pub fn search_index(&self) -> SearchIndexApi {
        SearchIndexApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    pub(crate) fn set_session(&self, session_id: Option<String>, user: Option<UserSession>) {
        *self.inner.session_id.write() = session_id;
        *self.inner.user_session.write() = user;
    }

    /// Start a request with the session header and timeout applied.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout);
        if let Some(id) = self.inner.session_id.read().as_deref() {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self.request(Method::GET, url).send().await?;
        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.post_raw(path, Some(body)).await?;
        self.handle_response(response).await
    }

    /// Make a POST request whose result may be absent.
    pub(crate) async fn post_optional<T, B>(&self, path: &str, body: &B) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.post_raw(path, Some(body)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<T>>(&bytes)?)
    }

    /// Make a POST request and discard the body.
    pub(crate) async fn post_unit(&self, path: &str) -> Result<()> {
        self.post_raw::<()>(path, None).await?;
        Ok(())
    }

    /// Make a POST request and return the successful response untouched.
    pub(crate) async fn post_raw<B>(&self, path: &str, body: Option<&B>) -> Result<reqwest::Response>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let mut builder = self.request(Method::POST, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        Ok(response)
    }

    /// Handle a response, extracting the body or error.
    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<Fault>().await {
            Ok(fault) => {
                if status == 401 || fault.is_auth_fault() {
                    Error::Auth(fault.describe())
                } else if status == 404 || fault.type_name == "ManagedObjectNotFound" {
                    Error::NotFound(fault.describe())
                } else {
                    Error::Api {
                        status,
                        fault: fault.type_name.clone(),
                        message: fault.describe(),
                    }
                }
            }
            Err(_) => match status {
                401 => Error::Auth(format!("HTTP {status}")),
                404 => Error::NotFound(format!("HTTP {status}")),
                _ => Error::Api {
                    status,
                    fault: "unknown".to_string(),
                    message: format!("HTTP {status}"),
                },
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating a [`VimClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    server: Option<ServerUrl>,
    tls: TlsTrust,
    release: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    ///
    /// TLS defaults to [`TlsTrust::Insecure`]; callers that have a
    /// thumbprint should pass it through [`ClientBuilder::tls`].
    pub fn new() -> Self {
        Self {
            server: None,
            tls: TlsTrust::Insecure,
            release: DEFAULT_RELEASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the endpoint.
    pub fn server(mut self, server: ServerUrl) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the certificate trust mode.
    pub fn tls(mut self, tls: TlsTrust) -> Self {
        self.tls = tls;
        self
    }

    /// Set the API release used in request paths.
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<VimClient> {
        let server = self
            .server
            .ok_or_else(|| Error::Config("server is required".to_string()))?;
        if self.release.trim().is_empty() {
            return Err(Error::Config("release must not be empty".to_string()));
        }

        let base_url = server.api_base(self.release.trim());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("vsess/{}", env!("CARGO_PKG_VERSION")));

        let builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .connect_timeout(self.timeout);
        let http = self.tls.apply(builder)?.build()?;

        Ok(VimClient {
            inner: Arc::new(ClientInner {
                http,
                server,
                base_url,
                timeout: self.timeout,
                session_id: RwLock::new(None),
                user_session: RwLock::new(None),
                content: OnceCell::new(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
