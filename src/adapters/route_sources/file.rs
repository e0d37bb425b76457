use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::ports::route_source::RouteSource;

/// Route source backed by a local XML file, optionally watched for changes.
pub struct FileRouteSource {
    path: PathBuf,
    // kept alive for as long as the source exists
    _watcher: Option<notify::RecommendedWatcher>,
    update_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileRouteSource {
    /// A source that reads `path` on demand and never signals changes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _watcher: None,
            update_rx: Mutex::new(None),
        }
    }

    /// A source that also watches `path` and signals every change.
    pub fn watching(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);
        let watcher = Self::init_watcher(&path, tx)?;

        Ok(Self {
            path,
            _watcher: Some(watcher),
            update_rx: Mutex::new(Some(rx)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_watcher(path: &Path, tx: mpsc::Sender<()>) -> Result<notify::RecommendedWatcher> {
        let file_name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid structure path: {}", path.display()))?
            .to_owned();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(&file_name))
                        {
                            tracing::debug!(kind = ?event.kind, "Structure document changed");
                            // a full channel already holds a pending reload
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => tracing::error!(error = ?e, "File watch error"),
                }
            })?;

        let watch_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .wrap_err_with(|| format!("Failed to watch {}", watch_dir.display()))?;

        Ok(watcher)
    }
}

#[async_trait]
impl RouteSource for FileRouteSource {
    async fn load_structure(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .wrap_err_with(|| format!("Failed to read structure document {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn watch(&self) -> Result<mpsc::Receiver<()>> {
        self.update_rx
            .lock()
            .map_err(|_| eyre::eyre!("Route source watch state poisoned"))?
            .take()
            .ok_or_else(|| eyre::eyre!("{} is not watched or already has a listener", self.describe()))
    }
}
