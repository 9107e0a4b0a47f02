//! Archive deployment reporting.
//!
//! Locating and loading compositions out of archives is left to the
//! embedding system. This module gives that system one place to run a
//! composition and report how it went: discovery problems, composition
//! failures and successes (with elapsed time) all reach the
//! [`DeploymentMonitor`], and a failed deployment never takes the host down.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::internal::guard;
use crate::key::Key;
use crate::monitor::DeploymentMonitor;

/// Failure to locate a usable composition inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// No composition with the requested name exists
    #[error("No composition '{name}' found in archive {}: {cause}", display_archive(.archive))]
    NoCompositionFound {
        archive: Option<PathBuf>,
        name: String,
        cause: String,
    },
    /// A composition was found but it has the wrong type
    #[error("Composition '{name}' in archive {} is not a {expected}", display_archive(.archive))]
    WrongType {
        archive: Option<PathBuf>,
        name: String,
        expected: String,
    },
}

fn display_archive(archive: &Option<PathBuf>) -> String {
    match archive {
        Some(path) => format!("'{}'", path.display()),
        None => "[null]".to_string(),
    }
}

/// Runs `compose` for `archive` and reports the outcome to `monitor`.
///
/// Discovery errors are reported through the matching diagnostic event
/// before the generic deployment failure. The composed container is
/// returned on success; on failure (including a panicking composition) the
/// error is returned to the caller, who decides whether to skip this archive.
///
/// # Examples
///
/// ```
/// use ferrous_adapters::{deploy, Container, DiscoveryError, NullMonitor};
/// use std::path::Path;
///
/// let ok = deploy(Some(Path::new("apps/shop")), &NullMonitor, || Ok(Container::new()));
/// assert!(ok.is_ok());
///
/// let missing = deploy(None, &NullMonitor, || {
///     Err(DiscoveryError::NoCompositionFound {
///         archive: None,
///         name: "Composer".into(),
///         cause: "not present".into(),
///     }
///     .into())
/// });
/// assert!(missing.is_err());
/// ```
pub fn deploy<F>(archive: Option<&Path>, monitor: &dyn DeploymentMonitor, compose: F) -> DiResult<Container>
where
    F: FnOnce() -> DiResult<Container>,
{
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(compose)).unwrap_or_else(|payload| {
        Err(DiError::Construction {
            key: Key::named(archive.map_or_else(|| "[null]".into(), |p| p.display().to_string())),
            message: format!("composition panicked: {}", guard::panic_message(payload.as_ref())),
        })
    });

    match &result {
        Ok(container) => {
            let elapsed = started.elapsed();
            let description = format!("{:?}", container);
            tracing::debug!(archive = ?archive, elapsed_ms = elapsed.as_millis() as u64, "deployment composed");
            guard::notify("deploy_success", || {
                monitor.deploy_success(archive, &description, elapsed)
            });
        }
        Err(err) => {
            if let DiError::CompositionDiscovery(discovery) = err {
                match discovery {
                    DiscoveryError::NoCompositionFound { name, .. } => {
                        guard::notify("no_composition_found", || {
                            monitor.no_composition_found(archive, name, discovery)
                        });
                    }
                    DiscoveryError::WrongType { name, expected, .. } => {
                        guard::notify("composition_wrong_type", || {
                            monitor.composition_wrong_type(archive, name, expected)
                        });
                    }
                }
            }
            tracing::warn!(archive = ?archive, error = %err, "deployment failed");
            guard::notify("error_performing_deploy", || {
                monitor.error_performing_deploy(archive, err)
            });
        }
    }

    result
}
