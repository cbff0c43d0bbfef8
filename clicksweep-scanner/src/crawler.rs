use crate::catalog::{Catalog, CatalogBuilder};
use crate::driver::Driver;
use crate::error::{Result, ScanError};
use crate::executor::Executor;
use crate::policy::Policy;
use crate::recovery::same_location;
use crate::result::{
    ClassificationLabel, CrawlSummary, InteractionOutcome, InteractionStatus, ReportRow, RowSink,
    ScopeKind, ScopeReport, TraversalScope,
};
use crate::state::{RunState, VolumeScope};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Called with the scope label after every recorded outcome.
pub type ProgressCallback = Arc<dyn Fn(&str, &InteractionOutcome) + Send + Sync>;

/// Which part of the DOM a scope catalogs.
#[derive(Debug, Clone)]
enum Area {
    Whole,
    Region(String),
    /// Whole page with these subtrees removed first.
    Body(Vec<String>),
}

/// How a scope's target loop ended.
enum ScopeEnd {
    Completed,
    Cancelled,
}

pub struct Crawler {
    catalog: CatalogBuilder,
    policy: Policy,
    executor: Executor,
    scroll_step: u64,
    scroll_settle: Duration,
    nav_selector: Option<String>,
    footer_selector: Option<String>,
    descend: bool,
    volume_scope: VolumeScope,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            catalog: CatalogBuilder::new(),
            policy: Policy::default(),
            executor: Executor::default(),
            scroll_step: 800,
            scroll_settle: Duration::from_millis(1000),
            nav_selector: None,
            footer_selector: None,
            descend: false,
            volume_scope: VolumeScope::Global,
            progress_callback: None,
        }
    }

    pub fn with_catalog(mut self, catalog: CatalogBuilder) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_scroll(mut self, step: u64, settle: Duration) -> Self {
        self.scroll_step = step.max(1);
        self.scroll_settle = settle;
        self
    }

    pub fn with_nav_selector(mut self, selector: Option<String>) -> Self {
        self.nav_selector = selector.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_footer_selector(mut self, selector: Option<String>) -> Self {
        self.footer_selector = selector.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_descend(mut self, descend: bool) -> Self {
        self.descend = descend;
        self
    }

    pub fn with_volume_scope(mut self, volume_scope: VolumeScope) -> Self {
        self.volume_scope = volume_scope;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Sweep one start URL. Every scope is handed to `sink` before the next
    /// one starts. On cancellation or a lost browser the finished attempts of
    /// the scope in progress are still written; only the in-flight one is lost.
    ///
    /// Returns an error only when the start page cannot be loaded or the
    /// browsing context is lost.
    pub async fn crawl(
        &self,
        driver: &dyn Driver,
        start_url: &str,
        sink: &mut dyn RowSink,
        cancel: &CancellationToken,
    ) -> Result<CrawlSummary> {
        Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;
        info!("Starting sweep of {}", start_url);

        let mut state = RunState::new(self.volume_scope);
        let mut summary = CrawlSummary::new(start_url);

        let baseline = self.load(driver, start_url).await?;
        summary.baseline = baseline.clone();

        let mut candidates = Vec::new();
        for (kind, area) in self.top_level_scopes() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let scope = TraversalScope::new(kind, baseline.clone());
            state.visit_scope(&scope.label());
            let report = self.sweep_scope(driver, &scope, &area, &mut state, sink, cancel).await?;
            if report.interrupted {
                summary.cancelled = true;
                summary.scopes.push(report);
                break;
            }
            candidates.extend(self.descent_candidates(&report));
            summary.scopes.push(report);
        }

        if self.descend && !summary.cancelled && !candidates.is_empty() {
            self.descend_into(driver, &baseline, candidates, &mut state, sink, cancel, &mut summary)
                .await?;
        }

        info!(
            "Sweep of {} finished: {} scopes, {} outcomes{}",
            start_url,
            summary.scopes_completed(),
            summary.outcomes().count(),
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }

    async fn load(&self, driver: &dyn Driver, url: &str) -> Result<String> {
        driver.goto(url).await?;
        self.executor.recovery().wait_quiet(driver).await?;
        driver.current_url().await
    }

    fn excluded_regions(&self) -> Vec<String> {
        [&self.nav_selector, &self.footer_selector]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn top_level_scopes(&self) -> Vec<(ScopeKind, Area)> {
        let regions = self.excluded_regions();
        if regions.is_empty() {
            return vec![(ScopeKind::Home, Area::Whole)];
        }

        let mut scopes = Vec::new();
        if let Some(nav) = &self.nav_selector {
            scopes.push((ScopeKind::Nav, Area::Region(nav.clone())));
        }
        if let Some(footer) = &self.footer_selector {
            scopes.push((ScopeKind::Footer, Area::Region(footer.clone())));
        }
        scopes.push((ScopeKind::Body, Area::Body(regions)));
        scopes
    }

    fn page_area(&self) -> Area {
        let regions = self.excluded_regions();
        if regions.is_empty() {
            Area::Whole
        } else {
            Area::Body(regions)
        }
    }

    /// Testable targets that left the start page, in discovery order.
    fn descent_candidates(&self, report: &ScopeReport) -> Vec<String> {
        report
            .outcomes
            .iter()
            .filter(|o| o.status == InteractionStatus::ClickedNavigated)
            .filter(|o| self.policy.classify(&o.text) == ClassificationLabel::Testable)
            .map(|o| o.text.clone())
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    async fn descend_into(
        &self,
        driver: &dyn Driver,
        baseline: &str,
        candidates: Vec<String>,
        state: &mut RunState,
        sink: &mut dyn RowSink,
        cancel: &CancellationToken,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        // Body scans strip nav/footer from the live DOM; start from a clean load.
        if let Err(e) = self.load(driver, baseline).await {
            let e = triage(driver, e).await?;
            warn!("Could not reload {} before descending: {}", baseline, e);
        }

        for text in candidates {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let kind = ScopeKind::Page(text.clone());
            if !state.visit_scope(&kind.label()) {
                debug!("Scope {} already visited", kind.label());
                continue;
            }

            match self.follow(driver, &text, baseline).await {
                Ok(landing) => {
                    let scope = TraversalScope::new(kind, landing);
                    let area = self.page_area();
                    let report = self.sweep_scope(driver, &scope, &area, state, sink, cancel).await?;
                    let interrupted = report.interrupted;
                    summary.scopes.push(report);
                    if interrupted {
                        summary.cancelled = true;
                        break;
                    }
                }
                Err(reason) => {
                    if !driver.is_alive().await {
                        return Err(ScanError::ContextLost(format!(
                            "browser went away descending into '{}': {}",
                            text, reason
                        )));
                    }
                    warn!("Could not descend into '{}': {}", text, reason);
                    let scope = TraversalScope::new(kind, baseline.to_string());
                    let outcome = InteractionOutcome::new(
                        &text,
                        InteractionStatus::Failed(format!("descent: {}", reason)),
                    );
                    sink.append(&[ReportRow::from_outcome(&scope, &outcome)])?;
                    summary.scopes.push(ScopeReport::new(&scope, vec![outcome]));
                }
            }

            if let Err(e) = self.executor.recovery().restore(driver, baseline).await {
                let e = triage(driver, e).await?;
                warn!("Could not restore {}: {}", baseline, e);
            }
        }

        Ok(())
    }

    /// Click `text` on the start page and report where it lands.
    async fn follow(
        &self,
        driver: &dyn Driver,
        text: &str,
        baseline: &str,
    ) -> std::result::Result<String, String> {
        self.executor.press(driver, text).await?;
        self.executor
            .recovery()
            .wait_quiet(driver)
            .await
            .map_err(|e| e.to_string())?;
        driver.sleep(self.executor.settle()).await;

        let landing = driver.current_url().await.map_err(|e| e.to_string())?;
        if same_location(&landing, baseline) {
            return Err(format!("'{}' no longer navigates away", text));
        }
        Ok(landing)
    }

    /// Run one scope and flush its rows. A cancelled scope comes back marked
    /// `interrupted` with the attempts that finished. On a fatal error those
    /// attempts are flushed before the error is returned.
    async fn sweep_scope(
        &self,
        driver: &dyn Driver,
        scope: &TraversalScope,
        area: &Area,
        state: &mut RunState,
        sink: &mut dyn RowSink,
        cancel: &CancellationToken,
    ) -> Result<ScopeReport> {
        let label = scope.label();
        info!("Scope {} at {}", label, scope.baseline);
        state.enter_scope();

        // Outcomes live out here so a dropped `exercise` future keeps them.
        let mut outcomes = Vec::new();
        let end = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(ScopeEnd::Cancelled),
            end = self.exercise(driver, scope, area, state, cancel, &mut outcomes) => end,
        };

        let rows: Vec<ReportRow> = outcomes
            .iter()
            .map(|o| ReportRow::from_outcome(scope, o))
            .collect();

        let end = match end {
            Ok(end) => end,
            Err(err) => {
                if !rows.is_empty()
                    && let Err(e) = sink.append(&rows)
                {
                    warn!("Could not save {} rows of scope {}: {}", rows.len(), label, e);
                }
                return Err(err);
            }
        };

        if !rows.is_empty() {
            sink.append(&rows)?;
        }

        match end {
            ScopeEnd::Completed => {
                info!("Scope {} complete with {} rows", label, rows.len());
                Ok(ScopeReport::new(scope, outcomes))
            }
            ScopeEnd::Cancelled => {
                warn!("Scope {} interrupted after {} rows", label, rows.len());
                Ok(ScopeReport::interrupted(scope, outcomes))
            }
        }
    }

    async fn exercise(
        &self,
        driver: &dyn Driver,
        scope: &TraversalScope,
        area: &Area,
        state: &mut RunState,
        cancel: &CancellationToken,
        outcomes: &mut Vec<InteractionOutcome>,
    ) -> Result<ScopeEnd> {
        let catalog = match self.scan(driver, area).await {
            Ok(catalog) => catalog,
            Err(e) => {
                let e = triage(driver, e).await?;
                warn!("Could not catalog scope {}: {}", scope.label(), e);
                Catalog::new()
            }
        };
        debug!("Scope {} has {} targets", scope.label(), catalog.len());

        let top_level = scope.kind.is_top_level();

        for target in catalog {
            if cancel.is_cancelled() {
                return Ok(ScopeEnd::Cancelled);
            }

            let seen = if top_level {
                state.is_verified(&target.text)
            } else {
                state.is_verified_top_level(&target.text)
            };
            if seen {
                debug!("'{}' already verified, skipping", target.text);
                continue;
            }

            let label = self.policy.classify(&target.text);
            if !label.is_actionable() {
                debug!("'{}' excluded by policy", target.text);
                continue;
            }

            let outcome = self
                .executor
                .execute(driver, &target, &label, &scope.baseline, state)
                .await;
            if !outcome.success && !driver.is_alive().await {
                return Err(ScanError::ContextLost(format!(
                    "browser went away at '{}': {}",
                    target.text, outcome.status
                )));
            }
            debug!("{} '{}': {}", scope.label(), outcome.text, outcome.status);

            state.mark_verified(&target.text, top_level);
            if let Some(ref callback) = self.progress_callback {
                callback(&scope.label(), &outcome);
            }
            outcomes.push(outcome);
        }

        if cancel.is_cancelled() {
            return Ok(ScopeEnd::Cancelled);
        }
        Ok(ScopeEnd::Completed)
    }

    /// Step through the page so lazily mounted content gets cataloged.
    async fn scan(&self, driver: &dyn Driver, area: &Area) -> Result<Catalog> {
        let height = driver.scroll_height().await?;
        let mut catalog = Catalog::new();

        let end = height.saturating_add(self.scroll_step);
        let mut y: u64 = 0;
        while y < end {
            driver.scroll_to(y).await?;
            driver.sleep(self.scroll_settle).await;
            let found = match area {
                Area::Whole => self.catalog.build(driver, None).await?,
                Area::Region(region) => self.catalog.build_within(driver, region).await?,
                Area::Body(exclude) => self.catalog.build(driver, Some(exclude)).await?,
            };
            catalog.merge(found);
            y = match y.checked_add(self.scroll_step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(catalog)
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pass recoverable errors back to the caller; turn anything that means the
/// browser is gone into [`ScanError::ContextLost`].
async fn triage(driver: &dyn Driver, err: ScanError) -> Result<ScanError> {
    if err.is_fatal() {
        return Err(err);
    }
    if !driver.is_alive().await {
        return Err(ScanError::ContextLost(err.to_string()));
    }
    Ok(err)
}
