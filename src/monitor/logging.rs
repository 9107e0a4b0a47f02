use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};
use tracing::Dispatch;

use crate::adapter::{describe_chain, ComponentAdapter};
use crate::deployment::DiscoveryError;
use crate::error::DiError;
use crate::implementation::ImplementationType;
use crate::key::Key;
use crate::lifecycle::LifecycleAction;
use crate::monitor::{ComponentMonitor, DeploymentMonitor};

const NULL_ARCHIVE: &str = "[null]";
const UNREADABLE_ARCHIVE: &str = "[Error retrieving file name]";

fn current_dispatch() -> Dispatch {
    tracing::dispatcher::get_default(|dispatch| dispatch.clone())
}

/// Monitor that writes every event to `tracing`.
///
/// The subscriber active at construction time is captured and used for all
/// events, even when they fire on threads with a different default. The
/// captured dispatcher is a runtime handle: it is never serialized, and a
/// restored monitor re-acquires whichever subscriber is the default at
/// restore time.
///
/// # Examples
///
/// ```
/// use ferrous_adapters::{Container, LoggingMonitor};
/// use std::sync::Arc;
///
/// let container = Container::builder()
///     .monitor(Arc::new(LoggingMonitor::new()))
///     .build();
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct LoggingMonitor {
    prefix: String,
    #[cfg_attr(feature = "snapshot", serde(skip, default = "current_dispatch"))]
    dispatch: Dispatch,
}

impl LoggingMonitor {
    /// Creates a logging monitor with the default prefix.
    pub fn new() -> Self {
        Self::with_prefix("[ferrous-adapters]")
    }

    /// Creates a logging monitor with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            dispatch: current_dispatch(),
        }
    }

    /// Logs through an explicit dispatcher instead of the current default.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn emit(&self, f: impl FnOnce()) {
        tracing::dispatcher::with_default(&self.dispatch, f);
    }
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggingMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingMonitor")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Renders an archive location for log output.
pub(crate) fn archive_name(archive: Option<&Path>) -> String {
    match archive {
        None => NULL_ARCHIVE.to_string(),
        Some(path) => match path.to_str() {
            Some(name) => name.to_string(),
            None => {
                eprintln!(
                    "ferrous-adapters: archive path is not valid UTF-8: {}",
                    path.to_string_lossy()
                );
                UNREADABLE_ARCHIVE.to_string()
            }
        },
    }
}

impl ComponentMonitor for LoggingMonitor {
    fn new_injector(&self, adapter: Arc<dyn ComponentAdapter>) -> Arc<dyn ComponentAdapter> {
        self.emit(|| {
            tracing::debug!(
                key = %adapter.key(),
                implementation = adapter.implementation().type_name(),
                "{} Created injector",
                self.prefix
            )
        });
        adapter
    }

    fn new_behavior(&self, adapter: Arc<dyn ComponentAdapter>) -> Arc<dyn ComponentAdapter> {
        self.emit(|| {
            tracing::debug!(
                key = %adapter.key(),
                chain = %describe_chain(adapter.as_ref()),
                "{} Wrapped behavior",
                self.prefix
            )
        });
        adapter
    }

    fn instantiated(&self, key: &Key, ty: &ImplementationType, elapsed: Duration) {
        self.emit(|| {
            tracing::debug!(
                key = %key,
                implementation = ty.name(),
                elapsed_us = elapsed.as_micros() as u64,
                "{} Instantiated",
                self.prefix
            )
        });
    }

    fn instantiation_failed(&self, key: &Key, ty: &ImplementationType, error: &DiError) {
        self.emit(|| {
            tracing::warn!(
                key = %key,
                implementation = ty.name(),
                error = %error,
                "{} Instantiation failed",
                self.prefix
            )
        });
    }

    fn lifecycle_invocation_failed(&self, key: &Key, action: LifecycleAction, error: &DiError) {
        self.emit(|| {
            tracing::error!(
                key = %key,
                action = %action,
                error = %error,
                "{} Lifecycle invocation failed",
                self.prefix
            )
        });
    }
}

impl DeploymentMonitor for LoggingMonitor {
    fn deploy_success(&self, archive: Option<&Path>, description: &str, elapsed: Duration) {
        let archive = archive_name(archive);
        self.emit(|| {
            tracing::info!(
                "{} Successfully deployed archive {}. Time for deployment {} ms",
                self.prefix,
                archive,
                elapsed.as_millis()
            );
            tracing::debug!("{} Deployed container: {}", self.prefix, description);
        });
    }

    fn error_performing_deploy(&self, archive: Option<&Path>, error: &DiError) {
        let archive = archive_name(archive);
        self.emit(|| {
            tracing::error!(
                error = %error,
                "{} There was an error performing deployment in archive '{}'",
                self.prefix,
                archive
            )
        });
    }

    fn no_composition_found(&self, archive: Option<&Path>, name: &str, error: &DiscoveryError) {
        let archive = archive_name(archive);
        self.emit(|| {
            tracing::info!(
                error = %error,
                "{} Did not find composition '{}' inside archive '{}'",
                self.prefix,
                name,
                archive
            )
        });
    }

    fn composition_wrong_type(&self, archive: Option<&Path>, name: &str, expected: &str) {
        let archive = archive_name(archive);
        self.emit(|| {
            tracing::error!(
                "{} Found composition '{}' inside archive '{}', but it is not a {}",
                self.prefix,
                name,
                archive,
                expected
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn archive_names() {
        assert_eq!(archive_name(None), "[null]");
        let path = PathBuf::from("/deploy/app.war");
        assert_eq!(archive_name(Some(&path)), "/deploy/app.war");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_archive_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/deploy/\xff.war"));
        assert_eq!(archive_name(Some(path)), "[Error retrieving file name]");
    }
}
