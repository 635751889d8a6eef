//! Zenoh session management.
//!
//! A [`Context`] wraps one Zenoh session for the duration of a command-line
//! invocation. It does not declare a node: the tool only observes the graph,
//! subscribes to raw payloads and queries services.
//!
//! # Reference
//!
//! See [rmw_zenoh design - Contexts](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#contexts)

use crate::error::{Error, Result};
use ros2cli_core::{
    GraphCache, GraphEvent,
    keyexpr::liveliness_domain_keyexpr,
};
use std::{path::PathBuf, time::Duration};
use zenoh::{Session, sample::SampleKind};

/// Environment variable for custom Zenoh session config.
pub const ZENOH_SESSION_CONFIG_URI: &str = "ZENOH_SESSION_CONFIG_URI";

/// Environment variable for ROS domain ID.
pub const ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Middleware whose wire format sessions speak.
pub const RMW_IMPLEMENTATION: &str = "rmw_zenoh_cpp";

/// Default Zenoh router endpoint.
pub const DEFAULT_ROUTER_ENDPOINT: &str = "tcp/localhost:7447";

/// How a session is opened.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// ROS domain ID
    pub domain_id: u32,
    /// Zenoh configuration file; when set, `router` is ignored
    pub config_file: Option<PathBuf>,
    /// Router endpoint to connect to
    pub router: String,
    /// How long to wait for liveliness replies when reading the graph
    pub spin_time: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            config_file: None,
            router: DEFAULT_ROUTER_ENDPOINT.to_string(),
            spin_time: Duration::from_millis(500),
        }
    }
}

impl SessionConfig {
    /// Build the Zenoh configuration: the config file as-is, or peer mode
    /// connecting to the router with multicast scouting off (rmw_zenoh's
    /// default session config).
    pub fn zenoh_config(&self) -> Result<zenoh::Config> {
        if let Some(path) = &self.config_file {
            return zenoh::Config::from_file(path).map_err(|e| {
                Error::InvalidConfig(format!("Failed to load config {}: {e}", path.display()))
            });
        }

        let mut config = zenoh::Config::default();
        let set = |config: &mut zenoh::Config, key: &str, value: &str| {
            config
                .insert_json5(key, value)
                .map_err(|e| Error::InvalidConfig(format!("Failed to set {key}: {e}")))
        };
        set(&mut config, "mode", "\"peer\"")?;
        set(
            &mut config,
            "connect/endpoints",
            &format!("[\"{}\"]", self.router),
        )?;
        set(&mut config, "scouting/multicast/enabled", "false")?;
        Ok(config)
    }
}

/// One Zenoh session bound to a ROS domain.
pub struct Context {
    session: Session,
    domain_id: u32,
    spin_time: Duration,
}

impl Context {
    /// Open a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the session cannot
    /// be opened.
    pub async fn open(config: &SessionConfig) -> Result<Self> {
        let zenoh_config = config.zenoh_config()?;
        let session = zenoh::open(zenoh_config).await?;
        tracing::debug!(zid = %session.zid(), domain_id = config.domain_id, "session opened");
        Ok(Self {
            session,
            domain_id: config.domain_id,
            spin_time: config.spin_time,
        })
    }

    /// Get the ROS domain ID.
    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Discovery wait used by [`Context::graph`].
    pub fn spin_time(&self) -> Duration {
        self.spin_time
    }

    /// Read a snapshot of the graph by querying every liveliness token of
    /// the domain.
    pub async fn graph(&self) -> Result<GraphCache> {
        let key = liveliness_domain_keyexpr(self.domain_id);
        let replies = self
            .session
            .liveliness()
            .get(&key)
            .timeout(self.spin_time)
            .await?;

        let mut cache = GraphCache::new();
        while let Ok(reply) = replies.recv_async().await {
            match reply.result() {
                Ok(sample) => {
                    let event = match sample.kind() {
                        SampleKind::Put => GraphEvent::Put,
                        SampleKind::Delete => GraphEvent::Delete,
                    };
                    cache.handle_liveliness_token(sample.key_expr().as_str(), event);
                }
                Err(err) => tracing::debug!(?err, "liveliness reply error"),
            }
        }
        tracing::debug!(entities = cache.len(), "graph snapshot");
        Ok(cache)
    }

    /// Close the session.
    pub async fn close(self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}
