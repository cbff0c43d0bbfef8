use crate::driver::Driver;
use crate::error::Result;
use crate::result::NavigationResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryStrategy {
    /// Navigate straight to the baseline URL.
    #[default]
    Reset,
    /// One step back in history, falling back to `Reset` if that misses.
    Back,
}

#[derive(Debug, Clone)]
pub struct RecoveryController {
    strategy: RecoveryStrategy,
    quiescence_timeout: Duration,
    settle: Duration,
}

/// Two locations are the same page if they only differ by fragment.
pub fn same_location(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(mut a), Ok(mut b)) => {
            a.set_fragment(None);
            b.set_fragment(None);
            a == b
        }
        _ => a == b,
    }
}

impl RecoveryController {
    pub fn new(strategy: RecoveryStrategy, quiescence_timeout: Duration, settle: Duration) -> Self {
        Self {
            strategy,
            quiescence_timeout,
            settle,
        }
    }

    /// Classify the last interaction and, if it left the baseline, bring the
    /// view back. The baseline is restored even when the new page never went
    /// quiet; that case still reports [`crate::ScanError::Timeout`].
    pub async fn recover(&self, driver: &dyn Driver, baseline: &str) -> Result<NavigationResult> {
        let current = driver.current_url().await?;
        if same_location(&current, baseline) {
            return Ok(NavigationResult::SamePage);
        }

        debug!("Navigated to {}, returning to {}", current, baseline);
        let stalled = match driver.wait_for_quiescence(self.quiescence_timeout).await {
            Ok(()) => None,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Page {} did not settle: {}", current, e);
                Some(e)
            }
        };
        driver.sleep(self.settle).await;

        self.restore(driver, baseline).await?;

        match stalled {
            None => Ok(NavigationResult::Navigated),
            Some(e) => Err(e),
        }
    }

    /// Return to `baseline` and wait for it to finish loading.
    pub async fn restore(&self, driver: &dyn Driver, baseline: &str) -> Result<()> {
        if self.strategy == RecoveryStrategy::Back {
            driver.go_back().await?;
            self.wait_quiet(driver).await?;
            let current = driver.current_url().await?;
            if same_location(&current, baseline) {
                return Ok(());
            }
            debug!("History back landed on {}, resetting to {}", current, baseline);
        }

        driver.goto(baseline).await?;
        self.wait_quiet(driver).await
    }

    /// Wait for the current page to go quiet. A timeout is logged, not raised.
    pub async fn wait_quiet(&self, driver: &dyn Driver) -> Result<()> {
        match driver.wait_for_quiescence(self.quiescence_timeout).await {
            Err(e) if e.is_timeout() => {
                warn!("Baseline did not settle within {:?}: {}", self.quiescence_timeout, e);
                Ok(())
            }
            other => other,
        }
    }
}

impl Default for RecoveryController {
    fn default() -> Self {
        Self::new(
            RecoveryStrategy::Reset,
            Duration::from_secs(15),
            Duration::from_millis(2000),
        )
    }
}
