//! Connection management for MongoDB
//!
//! Builds the driver client from the connection configuration and checks
//! that the server answers before any transfer starts.

use bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Connection URI
    uri: String,

    /// Hosts listed in the URI, filled on connect
    hosts: Vec<String>,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Connection failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection URI
    /// * `config` - Connection configuration
    ///
    /// # Returns
    /// * `Self` - New connection manager instance
    pub fn new(uri: String, config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            uri,
            hosts: Vec::new(),
        }
    }

    /// Establish connection to MongoDB
    ///
    /// Parses the URI, applies pool and timeout settings, then pings the
    /// server so an unreachable deployment fails here rather than mid-run.
    ///
    /// # Returns
    /// * `Result<()>` - Success or connection error
    pub async fn connect(&mut self) -> Result<()> {
        self.set_state(ConnectionState::Connecting).await;

        match self.try_connect().await {
            Ok(client) => {
                self.client = Some(client);
                self.set_state(ConnectionState::Connected).await;
                info!("Connected to {}", self.host_display());
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn try_connect(&mut self) -> Result<Client> {
        let options = Self::parse_uri(&self.uri).await?;
        self.hosts = options.hosts.iter().map(ToString::to_string).collect();

        let options = self.configure_pool(options);
        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        debug!("Pinging {}", sanitize_uri(&self.uri));
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::PingFailed(e.to_string()))?;

        Ok(client)
    }

    /// Disconnect from MongoDB
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Get a database handle
    ///
    /// # Arguments
    /// * `name` - Database name
    ///
    /// # Returns
    /// * `Result<Database>` - Database handle or error
    pub fn get_database(&self, name: &str) -> Result<Database> {
        Ok(self.get_client()?.database(name))
    }

    /// Get the MongoDB client
    ///
    /// # Returns
    /// * `Result<&Client>` - Reference to client or error
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Hosts of the deployment, comma separated, for user-facing messages
    pub fn host_display(&self) -> String {
        if self.hosts.is_empty() {
            sanitize_uri(&self.uri)
        } else {
            self.hosts.join(",")
        }
    }

    /// Get current connection state
    ///
    /// # Returns
    /// * `ConnectionState` - Current state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    ///
    /// # Returns
    /// * `bool` - True if connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Parse connection URI and create client options
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection URI
    ///
    /// # Returns
    /// * `Result<ClientOptions>` - Parsed client options or error
    async fn parse_uri(uri: &str) -> Result<ClientOptions> {
        ClientOptions::parse(uri).await.map_err(|e| {
            ConnectionError::InvalidUri(format!("{}: {}", sanitize_uri(uri), e)).into()
        })
    }

    /// Configure client options with pool settings
    ///
    /// # Arguments
    /// * `options` - Base client options
    ///
    /// # Returns
    /// * `ClientOptions` - Configured options
    fn configure_pool(&self, mut options: ClientOptions) -> ClientOptions {
        let timeout = self.config.connection_timeout();
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.max_pool_size = Some(self.config.max_pool_size);
        options.min_pool_size = Some(self.config.min_pool_size);
        if options.app_name.is_none() && !self.config.app_name.is_empty() {
            options.app_name = Some(self.config.app_name.clone());
        }
        options
    }

    /// Update connection state
    ///
    /// # Arguments
    /// * `new_state` - New connection state
    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }
}

/// Build a URI from a host and port pair
pub fn build_uri(host: &str, port: u16) -> String {
    format!("mongodb://{host}:{port}")
}

/// Database named in the URI path, if any
///
/// `mongodb://host/app?retryWrites=true` yields `Some("app")`.
pub fn extract_database_from_uri(uri: &str) -> Option<String> {
    let rest = uri
        .strip_prefix("mongodb+srv://")
        .or_else(|| uri.strip_prefix("mongodb://"))?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split('?').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

/// Hide the password of a URI before it is logged or printed
pub fn sanitize_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return uri.to_string();
    };
    let user = rest[..at].split(':').next().unwrap_or_default();
    format!("{scheme}://{user}:***@{}", &rest[at + 1..])
}
