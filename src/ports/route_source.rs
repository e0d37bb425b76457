use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

/// Trait for sources of the XML structure document the route tree is parsed from.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Load the current structure document.
    async fn load_structure(&self) -> Result<String>;

    /// Human-readable origin of the document, used in logs.
    fn describe(&self) -> String;

    /// Return a channel that signals when the structure document has changed.
    /// The receiver should trigger a reload by calling `load_structure`.
    fn watch(&self) -> Result<mpsc::Receiver<()>>;
}
