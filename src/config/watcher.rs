//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Watch the directory holding the config file (editors often replace
//!   the file by rename, which a watch on the file itself would lose)
//! - Ignore events that leave the file content unchanged
//! - Report every reload attempt, accepted or rejected
//!
//! # Design Decisions
//! - The parser is injected; the binary passes `parse_config`
//! - Rejected files never reach the registry, the running config stays

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::ConfigError;
use crate::config::schema::RouterConfig;

/// Turns file content into a validated configuration.
pub type ConfigParser = fn(&str) -> Result<RouterConfig, ConfigError>;

/// Outcome of one reload attempt.
#[derive(Debug)]
pub enum ReloadEvent {
    /// The file changed and produced a valid configuration.
    Updated(Box<RouterConfig>),
    /// The file changed but could not be read, parsed or validated.
    Rejected(ConfigError),
}

/// Decides whether a new file content warrants a reload.
#[derive(Debug)]
pub struct ChangeDetector {
    parser: ConfigParser,
    last: Option<String>,
}

impl ChangeDetector {
    /// `initial` is the content the running configuration came from.
    pub fn new(parser: ConfigParser, initial: Option<String>) -> Self {
        Self {
            parser,
            last: initial,
        }
    }

    /// Returns `None` when `content` matches what was last seen.
    pub fn observe(&mut self, content: String) -> Option<ReloadEvent> {
        if self.last.as_deref() == Some(content.as_str()) {
            return None;
        }
        let event = match (self.parser)(&content) {
            Ok(config) => ReloadEvent::Updated(Box::new(config)),
            Err(e) => ReloadEvent::Rejected(e),
        };
        self.last = Some(content);
        Some(event)
    }
}

/// Watches one configuration file and emits [`ReloadEvent`]s.
pub struct ConfigWatcher {
    path: PathBuf,
    detector: ChangeDetector,
}

impl ConfigWatcher {
    /// Watch `path`, parsing changes with `parser`. The current content is
    /// taken as the baseline so the first event only fires on a real edit.
    pub fn new(path: &Path, parser: ConfigParser) -> Self {
        let initial = std::fs::read_to_string(path).ok();
        Self {
            path: path.to_path_buf(),
            detector: ChangeDetector::new(parser, initial),
        }
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(
        self,
    ) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<ReloadEvent>), notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path;
        let file_name = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let detector = Mutex::new(self.detector);
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !touches_config {
                    return;
                }

                let outcome = match std::fs::read_to_string(&watched) {
                    Ok(content) => detector
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .observe(content),
                    // Mid-rename; the create event that follows carries the content.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => Some(ReloadEvent::Rejected(ConfigError::Io(e))),
                };

                if let Some(outcome) = outcome {
                    if let ReloadEvent::Rejected(e) = &outcome {
                        tracing::error!(
                            path = ?watched,
                            error = %e,
                            "Config change rejected, keeping current configuration"
                        );
                    }
                    let _ = tx.send(outcome);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok((watcher, rx))
    }
}
