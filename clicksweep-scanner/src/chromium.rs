//! [`Driver`] backed by a Chromium instance over CDP.
//!
//! Element references are `data-clicksweep-ref` attributes stamped onto the
//! matched node, so every operation is a fresh `querySelector` and a stale
//! reference surfaces as an ordinary error.

use crate::driver::{Driver, ElementRef};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const REF_ATTRIBUTE: &str = "data-clicksweep-ref";
const QUIESCENCE_POLL: Duration = Duration::from_millis(250);
const ALIVE_PROBE: Duration = Duration::from_secs(2);

/// Locate a Chromium binary. `CLICKSWEEP_CHROMIUM_PATH` wins over `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CLICKSWEEP_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        warn!("CLICKSWEEP_CHROMIUM_PATH points at missing file {}", p);
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

fn cdp(e: CdpError) -> ScanError {
    ScanError::Browser(e.to_string())
}

fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ScanError::Script(e.to_string()))
}

pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    next_ref: AtomicU64,
}

impl ChromiumDriver {
    pub async fn launch(headless: bool) -> Result<Self> {
        let executable = find_chromium().ok_or_else(|| {
            ScanError::Browser(
                "Chromium not found; install it or set CLICKSWEEP_CHROMIUM_PATH".to_string(),
            )
        })?;
        info!("Launching {} ({})", executable.display(), if headless { "headless" } else { "headful" });

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(1366, 900);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScanError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;

        // Drives the CDP connection; the page is unusable once this ends.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
            debug!("CDP handler finished");
        });

        let page = browser.new_page("about:blank").await.map_err(cdp)?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            next_ref: AtomicU64::new(1),
        })
    }

    /// Full-page PNG of whatever is currently rendered.
    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(cdp)?;
        tokio::fs::write(path, bytes).await?;
        info!("Screenshot saved to {}", path.display());
        Ok(())
    }

    fn ref_selector(element: &ElementRef) -> String {
        format!("[{}=\"{}\"]", REF_ATTRIBUTE, element.key)
    }

    /// Run `body` with `el` bound to the referenced node. A `null` result
    /// means the node is gone.
    async fn on_element(&self, element: &ElementRef, body: &str) -> Result<serde_json::Value> {
        let selector = js_string(&Self::ref_selector(element))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return null; {} }})()",
            selector, body
        );
        let value = self.evaluate(&script).await?;
        if value.is_null() {
            return Err(ScanError::Browser(format!("element {} detached", element.key)));
        }
        Ok(value)
    }

    async fn on_element_bool(&self, element: &ElementRef, body: &str) -> Result<bool> {
        let value = self.on_element(element, body).await?;
        value
            .as_bool()
            .ok_or_else(|| ScanError::Script(format!("expected boolean, got {}", value)))
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn query_texts(&self, selector: &str) -> Result<Vec<Option<String>>> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(el => {{ \
                try {{ return el.innerText ?? el.textContent; }} catch (e) {{ return null; }} \
            }})",
            js_string(selector)?
        );
        let value = self.evaluate(&script).await?;
        serde_json::from_value(value).map_err(|e| ScanError::Script(e.to_string()))
    }

    async fn resolve_by_text(&self, text: &str) -> Result<Option<ElementRef>> {
        let key = self.next_ref.fetch_add(1, Ordering::Relaxed).to_string();
        // Innermost match wins so wrappers sharing the text are not clicked.
        let script = format!(
            "(() => {{ \
                const wanted = {text}; \
                const matches = Array.from(document.querySelectorAll('body *')) \
                    .filter(el => (el.innerText || '').trim() === wanted); \
                const el = matches.find(m => !matches.some(o => o !== m && m.contains(o))); \
                if (!el) return null; \
                el.setAttribute({attr}, {key}); \
                return {key}; \
            }})()",
            text = js_string(text)?,
            attr = js_string(REF_ATTRIBUTE)?,
            key = js_string(&key)?,
        );
        let value = self.evaluate(&script).await?;
        Ok(value.as_str().map(ElementRef::new))
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        self.on_element_bool(
            element,
            "const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
        )
        .await
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        self.on_element_bool(
            element,
            "return !el.disabled && el.getAttribute('aria-disabled') !== 'true';",
        )
        .await
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.on_element(element, "el.scrollIntoView({ block: 'center' }); return true;")
            .await
            .map(|_| ())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let reachable = self
            .on_element_bool(
                element,
                "const r = el.getBoundingClientRect(); \
                 const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
                 return !!hit && (hit === el || el.contains(hit));",
            )
            .await?;
        if !reachable {
            return Err(ScanError::Browser("element is covered by another element".to_string()));
        }

        let node = self
            .page
            .find_element(Self::ref_selector(element))
            .await
            .map_err(cdp)?;
        node.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn dispatch_click(&self, element: &ElementRef) -> Result<()> {
        self.on_element(element, "el.click(); return true;")
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await.map_err(cdp)?.unwrap_or_default())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await.map_err(cdp)?;
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.evaluate("history.back(); true").await.map(|_| ())
    }

    async fn wait_for_quiescence(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let mut last_count: Option<u64> = None;

        while started.elapsed() < timeout {
            let probe = self
                .evaluate(
                    "({ ready: document.readyState, \
                        resources: performance.getEntriesByType('resource').length })",
                )
                .await;

            match probe {
                Ok(value) => {
                    let complete = value["ready"].as_str() == Some("complete");
                    let count = value["resources"].as_u64();
                    if complete && count.is_some() && count == last_count {
                        return Ok(());
                    }
                    last_count = if complete { count } else { None };
                }
                // Context is swapped mid-navigation; keep polling.
                Err(e) => {
                    if !self.is_alive().await {
                        return Err(ScanError::ContextLost(e.to_string()));
                    }
                    last_count = None;
                }
            }

            tokio::time::sleep(QUIESCENCE_POLL).await;
        }

        Err(ScanError::Timeout {
            what: "page quiescence".to_string(),
            ms: timeout.as_millis() as u64,
        })
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.map_err(cdp)?;
        result
            .into_value()
            .map_err(|e| ScanError::Script(format!("failed to convert JS result: {:?}", e)))
    }

    async fn is_alive(&self) -> bool {
        if self.handler.is_finished() {
            return false;
        }
        matches!(
            tokio::time::timeout(ALIVE_PROBE, self.page.evaluate("true")).await,
            Ok(Ok(_))
        )
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Error closing browser: {}", e);
        }
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_selector_targets_stamped_attribute() {
        let selector = ChromiumDriver::ref_selector(&ElementRef::new("7"));
        assert_eq!(selector, "[data-clicksweep-ref=\"7\"]");
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("Say \"hi\"").unwrap(), "\"Say \\\"hi\\\"\"");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_click_and_recover() {
        let driver = ChromiumDriver::launch(true)
            .await
            .expect("failed to launch Chromium");

        driver
            .goto("data:text/html,<button onclick=\"this.innerText='Done'\">Press</button>")
            .await
            .expect("navigation failed");
        driver
            .wait_for_quiescence(Duration::from_secs(10))
            .await
            .expect("page never settled");

        let texts = driver.query_texts("button").await.unwrap();
        assert_eq!(texts, vec![Some("Press".to_string())]);

        let element = driver
            .resolve_by_text("Press")
            .await
            .unwrap()
            .expect("button not resolved");
        assert!(driver.is_visible(&element).await.unwrap());
        assert!(driver.is_enabled(&element).await.unwrap());
        driver.click(&element).await.unwrap();

        assert!(driver.resolve_by_text("Done").await.unwrap().is_some());
        assert!(driver.is_alive().await);

        driver.close().await.unwrap();
    }
}
