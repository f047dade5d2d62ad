pub mod config;
pub mod images;
pub mod init;
pub mod latest;
pub mod push;
pub mod results;

use modelvault_core::{Config, Registry};

/// Registry over the local tree only, for commands that never reach the
/// remote store and so must not require a bucket.
pub fn local_registry(config: &Config) -> Registry {
    Registry::local(config.storage.local_root.clone())
}
