use crate::driver::{Driver, ElementRef};
use crate::error::{Result, ScanError};
use crate::recovery::{RecoveryController, same_location};
use crate::result::{
    ClassificationLabel, InteractionOutcome, InteractionStatus, InteractionTarget,
    NavigationResult, SkipReason,
};
use crate::state::RunState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// What an element must satisfy before it is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractabilityGate {
    Visible,
    #[default]
    VisibleEnabled,
}

#[derive(Debug, Clone)]
pub struct Executor {
    click_timeout: Duration,
    settle: Duration,
    gate: InteractabilityGate,
    recovery: RecoveryController,
}

enum Precheck {
    Ready(ElementRef),
    Blocked(InteractionStatus),
}

impl Executor {
    pub fn new(recovery: RecoveryController) -> Self {
        Self {
            click_timeout: Duration::from_millis(3000),
            settle: Duration::from_millis(1500),
            gate: InteractabilityGate::VisibleEnabled,
            recovery,
        }
    }

    pub fn with_click_timeout(mut self, timeout: Duration) -> Self {
        self.click_timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_gate(mut self, gate: InteractabilityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn recovery(&self) -> &RecoveryController {
        &self.recovery
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Attempt one target and always produce an outcome; no driver error
    /// escapes this call.
    pub async fn execute(
        &self,
        driver: &dyn Driver,
        target: &InteractionTarget,
        label: &ClassificationLabel,
        baseline: &str,
        state: &mut RunState,
    ) -> InteractionOutcome {
        let text = target.text.as_str();

        match label {
            ClassificationLabel::Skip => {
                return InteractionOutcome::new(text, InteractionStatus::Skipped(SkipReason::SkipList));
            }
            ClassificationLabel::VolumeLimited(group) => {
                if !state.cover_group(group) {
                    return InteractionOutcome::new(
                        text,
                        InteractionStatus::Skipped(SkipReason::GroupCovered(group.clone())),
                    );
                }
                debug!("'{}' represents group {}", text, group);
            }
            ClassificationLabel::Testable => {}
            ClassificationLabel::Excluded => {
                // Callers filter these out; treat a stray one as a skip.
                return InteractionOutcome::new(text, InteractionStatus::Skipped(SkipReason::SkipList));
            }
        }

        let element = match self.precheck(driver, text).await {
            Ok(Precheck::Ready(element)) => element,
            Ok(Precheck::Blocked(status)) => return InteractionOutcome::new(text, status),
            Err(e) => return InteractionOutcome::new(text, InteractionStatus::Failed(e.to_string())),
        };

        if let Err(reason) = self.invoke(driver, &element).await {
            warn!("'{}' could not be clicked: {}", text, reason);
            self.return_to(driver, baseline, text).await;
            return InteractionOutcome::new(text, InteractionStatus::Failed(reason));
        }

        driver.sleep(self.settle).await;

        let status = match self.recovery.recover(driver, baseline).await {
            Ok(NavigationResult::SamePage) => InteractionStatus::ClickedSamePage,
            Ok(NavigationResult::Navigated) => InteractionStatus::ClickedNavigated,
            Err(e) if e.is_timeout() => InteractionStatus::Failed(format!("navigation timeout: {}", e)),
            Err(e) => InteractionStatus::Failed(format!("recovery failed: {}", e)),
        };
        InteractionOutcome::new(text, status)
    }

    /// Resolve and click `text` with no classification and no recovery.
    /// Used to re-enter a page the sweep already knows the target opens.
    pub async fn press(&self, driver: &dyn Driver, text: &str) -> std::result::Result<(), String> {
        let element = match self.precheck(driver, text).await {
            Ok(Precheck::Ready(element)) => element,
            Ok(Precheck::Blocked(status)) => return Err(status.to_string()),
            Err(e) => return Err(e.to_string()),
        };
        self.invoke(driver, &element).await
    }

    /// A click can fire and still report an error. Put the view back if it
    /// left the baseline so later targets resolve against the right page.
    async fn return_to(&self, driver: &dyn Driver, baseline: &str, text: &str) {
        let current = match driver.current_url().await {
            Ok(current) => current,
            Err(e) => {
                debug!("Location unknown after '{}': {}", text, e);
                return;
            }
        };
        if same_location(&current, baseline) {
            return;
        }
        debug!("Failed click on '{}' still left for {}", text, current);
        if let Err(e) = self.recovery.restore(driver, baseline).await {
            warn!("Could not return to {} after '{}': {}", baseline, text, e);
        }
    }

    async fn precheck(&self, driver: &dyn Driver, text: &str) -> Result<Precheck> {
        let Some(element) = driver.resolve_by_text(text).await? else {
            return Ok(Precheck::Blocked(InteractionStatus::NotFound));
        };

        if !driver.is_visible(&element).await? {
            return Ok(Precheck::Blocked(InteractionStatus::NotVisible));
        }

        if self.gate == InteractabilityGate::VisibleEnabled && !driver.is_enabled(&element).await? {
            return Ok(Precheck::Blocked(InteractionStatus::Disabled));
        }

        Ok(Precheck::Ready(element))
    }

    /// Native click first, then a programmatic dispatch for elements behind
    /// overlays. The error carries both failure reasons.
    async fn invoke(&self, driver: &dyn Driver, element: &ElementRef) -> std::result::Result<(), String> {
        let primary = async {
            driver.scroll_into_view(element).await?;
            match tokio::time::timeout(self.click_timeout, driver.click(element)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    what: "click".to_string(),
                    ms: self.click_timeout.as_millis() as u64,
                }),
            }
        }
        .await;

        let primary_err = match primary {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        debug!("Primary click failed ({}), dispatching", primary_err);

        driver
            .dispatch_click(element)
            .await
            .map_err(|fallback_err| format!("primary: {}; fallback: {}", primary_err, fallback_err))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(RecoveryController::default())
    }
}
