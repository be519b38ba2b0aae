//! Cayenne client: one "thing" on one broker connection

use std::sync::Arc;

use cayenne_core::{ClientConfig, ClientIdentity};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{ConnectionListener, ConnectionRegistry, EndpointId};

/// Holds the thing identity and the shared connection its endpoints use
pub struct CayenneClient {
    id: EndpointId,
    identity: ClientIdentity,
    registry: Option<Arc<ConnectionRegistry>>,
}

impl CayenneClient {
    /// Create the client and register it with `registry`.
    ///
    /// Without a registry the client still exists, but every endpoint
    /// started from it fails with missing configuration.
    pub fn start(config: &ClientConfig, registry: Option<Arc<ConnectionRegistry>>) -> Arc<Self> {
        let client = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            identity: config.identity(),
            registry,
        });

        match &client.registry {
            Some(registry) => registry.register(&client.id, client.clone()),
            None => error!("Cayenne client {}: missing broker configuration", client.identity),
        }

        client
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn registry(&self) -> Option<&Arc<ConnectionRegistry>> {
        self.registry.as_ref()
    }

    pub fn close(&self, done: impl FnOnce()) {
        match &self.registry {
            Some(registry) => registry.deregister(&self.id, done),
            None => done(),
        }
    }
}

impl ConnectionListener for CayenneClient {
    fn connection_changed(&self, connected: bool) {
        debug!("Cayenne client {} connected: {}", self.identity, connected);
    }
}

impl std::fmt::Debug for CayenneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CayenneClient")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("has_registry", &self.registry.is_some())
            .finish()
    }
}
