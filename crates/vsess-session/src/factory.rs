//! Creating new sessions: connect, log in, bind a datacenter.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use vsess_client::ServerUrl;

use crate::error::{Error, Result};
use crate::keepalive::{InvalidationHook, KeepAlive, Liveness};
use crate::key::{CacheKey, SessionRequest};
use crate::resolver;
use crate::session::{Session, SessionParts, next_session_id};
use crate::transport::{Connector, Transport};

/// Builds logged-in sessions through a [`Connector`].
pub struct ConnectionFactory {
    connector: Arc<dyn Connector>,
    connect_timeout: Option<Duration>,
}

impl ConnectionFactory {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connect_timeout: None,
        }
    }

    /// Set the transport timeout used while connecting.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Connect, log in and bind the requested datacenter.
    ///
    /// When the request enables keepalive the monitor starts as soon as the
    /// login succeeds and reports failures to `hook`. Nothing is left logged
    /// in when a later step fails or the returned future is dropped after
    /// login.
    pub async fn create(
        &self,
        request: &SessionRequest,
        hook: Arc<dyn InvalidationHook>,
    ) -> Result<Session> {
        let key = request.key();
        let server = ServerUrl::parse(&request.server).map_err(|source| Error::InvalidServer {
            server: request.server.clone(),
            source,
        })?;
        let server_name = server.to_string();

        if request.tls.is_insecure() {
            warn!(server = %server_name, "connecting without certificate verification");
        }

        let transport = self
            .connector
            .connect(&server, &request.tls, self.connect_timeout)
            .await
            .map_err(|source| Error::Connect {
                server: server_name.clone(),
                source,
            })?;

        let id = next_session_id();
        let liveness = Arc::new(Liveness::default());
        let keepalive_config = request.features.keepalive;
        let (client, keepalive): (Arc<dyn Transport>, Option<Arc<KeepAlive>>) =
            if keepalive_config.enabled {
                let keepalive = Arc::new(KeepAlive::new(
                    transport,
                    key.clone(),
                    id,
                    keepalive_config.interval,
                    hook,
                    Arc::clone(&liveness),
                ));
                (Arc::clone(&keepalive) as Arc<dyn Transport>, Some(keepalive))
            } else {
                (transport, None)
            };

        let credentials = &request.credentials;
        client
            .login(credentials.username(), credentials.password())
            .await
            .map_err(|source| Error::Authentication {
                server: server_name.clone(),
                username: credentials.username().to_string(),
                source,
            })?;
        debug!(key = %key, session_id = id, "logged in");
        let guard = LoginGuard::new(key.clone(), Arc::clone(&client), keepalive.clone());

        let datacenter =
            match resolver::datacenter_or_default(client.as_ref(), &server_name, &request.datacenter)
                .await
            {
                Ok(datacenter) => datacenter,
                Err(e) => {
                    guard.logout().await;
                    return Err(e);
                }
            };
        guard.disarm();

        info!(
            server = %server_name,
            datacenter = %datacenter.name,
            username = credentials.username(),
            keepalive = keepalive_config.enabled,
            session_id = id,
            "new vCenter session"
        );

        Ok(Session::new(SessionParts {
            id,
            key,
            server,
            client,
            keepalive,
            datacenter,
            features: request.features,
            liveness,
        }))
    }
}

/// Logs a freshly authenticated transport out unless disarmed.
///
/// Covers the window between login and the finished [`Session`]: if the
/// creation future is dropped there (cancellation or a lookup deadline) the
/// logout runs on a spawned task.
struct LoginGuard {
    key: CacheKey,
    client: Option<Arc<dyn Transport>>,
    keepalive: Option<Arc<KeepAlive>>,
}

impl LoginGuard {
    fn new(key: CacheKey, client: Arc<dyn Transport>, keepalive: Option<Arc<KeepAlive>>) -> Self {
        Self {
            key,
            client: Some(client),
            keepalive,
        }
    }

    /// The session was handed out; keep it logged in.
    fn disarm(mut self) {
        self.client = None;
        self.keepalive = None;
    }

    /// Log out now, waiting for the server.
    async fn logout(mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.stop();
        }
        if let Some(client) = self.client.take() {
            if let Err(e) = client.logout().await {
                debug!(key = %self.key, error = %e, "logout after failed datacenter lookup");
            }
        }
    }
}

impl Drop for LoginGuard {
    fn drop(&mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.stop();
        }
        let Some(client) = self.client.take() else {
            return;
        };
        let key = self.key.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(key = %key, "session creation abandoned after login; logging out");
                runtime.spawn(async move {
                    if let Err(e) = client.logout().await {
                        warn!(key = %key, error = %e, "logout of abandoned session failed");
                    }
                });
            }
            Err(_) => {
                warn!(key = %key, "no runtime to log out abandoned session");
            }
        }
    }
}
