// Application state module
// Read-only state shared by every connection task

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::types::Config;
use crate::handler::resolve::PathResolver;

/// Application state, built once at startup and shared through an `Arc`
pub struct AppState {
    pub config: Config,
    pub resolver: PathResolver,

    // Open connections, checked against performance.max_connections
    pub active_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config) -> std::io::Result<Self> {
        let resolver = PathResolver::new(&config.server.root_directory)?;
        Ok(Self {
            config,
            resolver,
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }
}
