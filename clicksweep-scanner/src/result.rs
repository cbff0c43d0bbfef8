use serde::{Deserialize, Serialize};
use std::fmt;

/// Display text recorded for elements whose text is empty or unreadable.
pub const PLACEHOLDER_TEXT: &str = "<no text>";

/// One discovered interaction target, keyed by its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionTarget {
    pub text: String,
    /// The heuristic selector that first surfaced this text.
    pub selector: String,
}

impl InteractionTarget {
    pub fn new(raw_text: Option<&str>, selector: &str) -> Self {
        let text = raw_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(PLACEHOLDER_TEXT)
            .to_string();

        Self {
            text,
            selector: selector.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == PLACEHOLDER_TEXT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationLabel {
    Skip,
    VolumeLimited(String),
    Testable,
    /// Shape-matched but not worth clicking (long text blocks, placeholders).
    Excluded,
}

impl ClassificationLabel {
    pub fn is_actionable(&self) -> bool {
        !matches!(self, ClassificationLabel::Excluded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    SkipList,
    GroupCovered(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionStatus {
    Skipped(SkipReason),
    NotFound,
    NotVisible,
    Disabled,
    ClickedSamePage,
    ClickedNavigated,
    Failed(String),
}

impl InteractionStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            InteractionStatus::Skipped(_)
                | InteractionStatus::ClickedSamePage
                | InteractionStatus::ClickedNavigated
        )
    }

    /// Short machine-friendly key used for summary counters.
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionStatus::Skipped(_) => "skipped",
            InteractionStatus::NotFound => "not_found",
            InteractionStatus::NotVisible => "not_visible",
            InteractionStatus::Disabled => "disabled",
            InteractionStatus::ClickedSamePage => "clicked_same_page",
            InteractionStatus::ClickedNavigated => "clicked_navigated",
            InteractionStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionStatus::Skipped(SkipReason::SkipList) => write!(f, "Skipped (skip list)"),
            InteractionStatus::Skipped(SkipReason::GroupCovered(group)) => {
                write!(f, "Skipped (group '{}' already covered)", group)
            }
            InteractionStatus::NotFound => write!(f, "Not found on re-query"),
            InteractionStatus::NotVisible => write!(f, "Not visible"),
            InteractionStatus::Disabled => write!(f, "Visible but disabled"),
            InteractionStatus::ClickedSamePage => write!(f, "Clicked (same page)"),
            InteractionStatus::ClickedNavigated => write!(f, "Clicked (navigated)"),
            InteractionStatus::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub text: String,
    pub status: InteractionStatus,
    pub success: bool,
}

impl InteractionOutcome {
    pub fn new(text: impl Into<String>, status: InteractionStatus) -> Self {
        let success = status.is_success();
        Self {
            text: text.into(),
            status,
            success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationResult {
    SamePage,
    Navigated,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Whole start page, used when no nav/footer regions are configured.
    Home,
    Body,
    Nav,
    Footer,
    /// Sub-page reached by following the named target.
    Page(String),
}

impl ScopeKind {
    pub fn label(&self) -> String {
        match self {
            ScopeKind::Home => "HOME".to_string(),
            ScopeKind::Body => "BODY".to_string(),
            ScopeKind::Nav => "NAV".to_string(),
            ScopeKind::Footer => "FOOTER".to_string(),
            ScopeKind::Page(text) => format!("PAGE:{}", text),
        }
    }

    pub fn is_top_level(&self) -> bool {
        !matches!(self, ScopeKind::Page(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalScope {
    pub kind: ScopeKind,
    pub baseline: String,
}

impl TraversalScope {
    pub fn new(kind: ScopeKind, baseline: impl Into<String>) -> Self {
        Self {
            kind,
            baseline: baseline.into(),
        }
    }

    pub fn label(&self) -> String {
        self.kind.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub scope: String,
    pub element_text: String,
    pub status: String,
    pub clickable: bool,
}

impl ReportRow {
    pub fn from_outcome(scope: &TraversalScope, outcome: &InteractionOutcome) -> Self {
        Self {
            scope: scope.label(),
            element_text: outcome.text.clone(),
            status: outcome.status.to_string(),
            clickable: outcome.success,
        }
    }
}

/// Outcomes of one scope, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    pub scope: String,
    pub baseline: String,
    pub outcomes: Vec<InteractionOutcome>,
    /// Cancelled part way; `outcomes` holds only the finished attempts.
    #[serde(default)]
    pub interrupted: bool,
}

impl ScopeReport {
    pub fn new(scope: &TraversalScope, outcomes: Vec<InteractionOutcome>) -> Self {
        Self {
            scope: scope.label(),
            baseline: scope.baseline.clone(),
            outcomes,
            interrupted: false,
        }
    }

    pub fn interrupted(scope: &TraversalScope, outcomes: Vec<InteractionOutcome>) -> Self {
        Self {
            interrupted: true,
            ..Self::new(scope, outcomes)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub start_url: String,
    /// Location the start URL settled on after redirects.
    pub baseline: String,
    pub scopes: Vec<ScopeReport>,
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            ..Self::default()
        }
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &InteractionOutcome> {
        self.scopes.iter().flat_map(|s| s.outcomes.iter())
    }

    pub fn scopes_completed(&self) -> usize {
        self.scopes.iter().filter(|s| !s.interrupted).count()
    }
}

/// Destination for completed scopes. Implementations must make every
/// appended batch durable before returning.
pub trait RowSink {
    fn append(&mut self, rows: &[ReportRow]) -> crate::error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_text_is_trimmed() {
        let target = InteractionTarget::new(Some("  Expand Filters \n"), "button");
        assert_eq!(target.text, "Expand Filters");
        assert!(!target.is_placeholder());
    }

    #[test]
    fn test_unreadable_or_blank_text_becomes_placeholder() {
        assert!(InteractionTarget::new(None, "a").is_placeholder());
        assert!(InteractionTarget::new(Some("   "), "a").is_placeholder());
    }

    #[test]
    fn test_success_follows_status() {
        assert!(InteractionOutcome::new("Login", InteractionStatus::Skipped(SkipReason::SkipList)).success);
        assert!(InteractionOutcome::new("x", InteractionStatus::ClickedNavigated).success);
        assert!(!InteractionOutcome::new("x", InteractionStatus::NotFound).success);
        assert!(!InteractionOutcome::new("x", InteractionStatus::Disabled).success);
        assert!(!InteractionOutcome::new("x", InteractionStatus::Failed("boom".into())).success);
    }

    #[test]
    fn test_scope_labels() {
        assert_eq!(ScopeKind::Home.label(), "HOME");
        assert_eq!(ScopeKind::Page("Used Cars".into()).label(), "PAGE:Used Cars");
        assert!(ScopeKind::Nav.is_top_level());
        assert!(!ScopeKind::Page("x".into()).is_top_level());
    }

    #[test]
    fn test_report_row_mirrors_outcome() {
        let scope = TraversalScope::new(ScopeKind::Body, "https://example.com/");
        let outcome = InteractionOutcome::new("Apply Now", InteractionStatus::ClickedSamePage);
        let row = ReportRow::from_outcome(&scope, &outcome);

        assert_eq!(row.scope, "BODY");
        assert_eq!(row.element_text, "Apply Now");
        assert_eq!(row.status, "Clicked (same page)");
        assert!(row.clickable);
    }
}
