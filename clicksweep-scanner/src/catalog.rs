use crate::driver::Driver;
use crate::error::Result;
use crate::result::InteractionTarget;
use std::collections::HashSet;
use tracing::debug;

/// Shapes that usually mean "something happens when you click this".
pub const DEFAULT_HEURISTICS: &[&str] = &["button", "a", "[role='button']", "[onclick]"];

/// Ordered, text-deduplicated set of interaction targets for one scope.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    targets: Vec<InteractionTarget>,
    seen: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a target with the same text is already present.
    pub fn push(&mut self, target: InteractionTarget) -> bool {
        if self.seen.contains(&target.text) {
            return false;
        }
        self.seen.insert(target.text.clone());
        self.targets.push(target);
        true
    }

    pub fn merge(&mut self, other: Catalog) {
        for target in other.targets {
            self.push(target);
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionTarget> {
        self.targets.iter()
    }
}

impl IntoIterator for Catalog {
    type Item = InteractionTarget;
    type IntoIter = std::vec::IntoIter<InteractionTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    heuristics: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::with_heuristics(DEFAULT_HEURISTICS.iter().map(|h| h.to_string()).collect())
    }

    pub fn with_heuristics(heuristics: Vec<String>) -> Self {
        Self { heuristics }
    }

    /// Scan the whole view. `exclude` subtrees are removed from the DOM
    /// before any text is read.
    pub async fn build(&self, driver: &dyn Driver, exclude: Option<&[String]>) -> Result<Catalog> {
        if let Some(regions) = exclude {
            driver.remove_subtrees(regions).await?;
        }
        self.collect(driver, None).await
    }

    /// Scan only inside the subtree(s) matching `region`.
    pub async fn build_within(&self, driver: &dyn Driver, region: &str) -> Result<Catalog> {
        self.collect(driver, Some(region)).await
    }

    async fn collect(&self, driver: &dyn Driver, region: Option<&str>) -> Result<Catalog> {
        let mut catalog = Catalog::new();

        for heuristic in &self.heuristics {
            let selector = match region {
                Some(region) => format!("{} {}", region, heuristic),
                None => heuristic.clone(),
            };

            let texts = driver.query_texts(&selector).await?;
            let mut added = 0;
            for text in texts {
                if catalog.push(InteractionTarget::new(text.as_deref(), heuristic)) {
                    added += 1;
                }
            }
            debug!("Heuristic {} contributed {} new targets", selector, added);
        }

        Ok(catalog)
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
