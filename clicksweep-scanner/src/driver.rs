//! Browsing-context abstraction consumed by the engine.
//!
//! Everything the crawler does to a page goes through [`Driver`], so the
//! catalog builder, executor and traversal controller can be exercised
//! against a scripted driver in tests and against Chromium in production.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::time::Duration;

/// Lookup key for an element resolved in the live view.
///
/// References are only valid until the next scroll, click or navigation;
/// callers re-resolve by display text instead of holding on to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub key: String,
}

impl ElementRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
pub trait Driver: Send + Sync {
    /// Text of every element matching `selector`, in document order.
    /// `None` marks an element whose text could not be read.
    async fn query_texts(&self, selector: &str) -> Result<Vec<Option<String>>>;

    /// Find the element currently rendered with exactly this display text.
    async fn resolve_by_text(&self, text: &str) -> Result<Option<ElementRef>>;

    async fn is_visible(&self, element: &ElementRef) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Native click, subject to actionability and occlusion.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Programmatic `el.click()` that bypasses visibility and overlays.
    async fn dispatch_click(&self, element: &ElementRef) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn go_back(&self) -> Result<()>;

    /// Block until the page stops loading, or fail with
    /// [`ScanError::Timeout`] once `timeout` elapses.
    async fn wait_for_quiescence(&self, timeout: Duration) -> Result<()>;

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn is_alive(&self) -> bool;

    async fn close(&self) -> Result<()>;

    async fn scroll_height(&self) -> Result<u64> {
        let value = self.evaluate("document.body.scrollHeight").await?;
        value
            .as_f64()
            .map(|h| h.max(0.0) as u64)
            .ok_or_else(|| ScanError::Script(format!("unexpected scroll height: {}", value)))
    }

    async fn scroll_to(&self, y: u64) -> Result<()> {
        self.evaluate(&format!("window.scrollTo(0, {}); true", y))
            .await
            .map(|_| ())
    }

    /// Detach every subtree matching one of `selectors` from the document.
    async fn remove_subtrees(&self, selectors: &[String]) -> Result<()> {
        if selectors.is_empty() {
            return Ok(());
        }
        let joined = serde_json::to_string(&selectors.join(", "))
            .map_err(|e| ScanError::Script(e.to_string()))?;
        self.evaluate(&format!(
            "document.querySelectorAll({}).forEach(el => el.remove()); true",
            joined
        ))
        .await
        .map(|_| ())
    }
}
