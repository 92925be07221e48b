//! Traversal budgets for the edit service.
//!
//! ## Environment
//!
//! - `EDGE_MAX_CYCLE_DEPTH`: hop budget of the cycle check on every edge creation (default: 50)
//! - `EDGE_DEFAULT_TREE_DEPTH`: hop budget of subtree fetches when the caller gives none (default: 99)
//! - `EDGE_MAX_TREE_DEPTH`: largest hop budget a caller may request for a subtree fetch (default: 500)

use crate::error::EdgeError;
use crate::types::{DepthBudget, DEFAULT_CYCLE_DEPTH, DEFAULT_MAX_TREE_DEPTH, DEFAULT_TREE_DEPTH};

/// Budgets used by [`crate::GraphEditService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditConfig {
    /// Budget of the cycle check run by every edge creation.
    pub max_cycle_depth: DepthBudget,
    /// Budget of subtree fetches that do not specify one.
    pub default_tree_depth: DepthBudget,
    /// Ceiling on the budget of any subtree fetch. Keeps returned trees
    /// shallow enough to serialize.
    pub max_tree_depth: DepthBudget,
}

impl EditConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing values use the defaults; unparsable or zero values are
    /// ignored with a warning.
    pub fn from_env() -> Self {
        let config = Self {
            max_cycle_depth: budget_from_env("EDGE_MAX_CYCLE_DEPTH", DEFAULT_CYCLE_DEPTH),
            default_tree_depth: budget_from_env("EDGE_DEFAULT_TREE_DEPTH", DEFAULT_TREE_DEPTH),
            max_tree_depth: budget_from_env("EDGE_MAX_TREE_DEPTH", DEFAULT_MAX_TREE_DEPTH),
        };

        if config.default_tree_depth > config.max_tree_depth {
            tracing::warn!(
                default_tree_depth = config.default_tree_depth.get(),
                max_tree_depth = config.max_tree_depth.get(),
                "Default tree depth exceeds the ceiling, clamping"
            );
        }
        config.clamped()
    }

    /// Subtree budget for a request, `None` meaning the default.
    ///
    /// Budgets above [`EditConfig::max_tree_depth`] are rejected.
    pub fn tree_depth(&self, requested: Option<DepthBudget>) -> Result<DepthBudget, EdgeError> {
        match requested {
            Some(budget) if budget > self.max_tree_depth => Err(EdgeError::Validation(format!(
                "maxDepth must not exceed [{}], got [{}]",
                self.max_tree_depth, budget
            ))),
            Some(budget) => Ok(budget),
            None => Ok(self.default_tree_depth.min(self.max_tree_depth)),
        }
    }

    fn clamped(mut self) -> Self {
        self.default_tree_depth = self.default_tree_depth.min(self.max_tree_depth);
        self
    }

    /// Override the cycle check budget.
    pub fn with_max_cycle_depth(mut self, max_cycle_depth: DepthBudget) -> Self {
        self.max_cycle_depth = max_cycle_depth;
        self
    }

    /// Override the default subtree budget.
    pub fn with_default_tree_depth(mut self, default_tree_depth: DepthBudget) -> Self {
        self.default_tree_depth = default_tree_depth;
        self
    }

    /// Override the subtree budget ceiling.
    pub fn with_max_tree_depth(mut self, max_tree_depth: DepthBudget) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_cycle_depth: DepthBudget::cycle_default(),
            default_tree_depth: DepthBudget::tree_default(),
            max_tree_depth: DepthBudget::tree_ceiling(),
        }
    }
}

fn budget_from_env(key: &str, default: u32) -> DepthBudget {
    parse_budget(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_budget(key: &str, value: Option<&str>, default: u32) -> DepthBudget {
    let fallback = || DepthBudget::new(default).unwrap_or_else(|_| DepthBudget::cycle_default());

    let Some(raw) = value else {
        return fallback();
    };

    match raw.trim().parse::<u32>().map_err(|e| e.to_string()).and_then(|hops| {
        DepthBudget::new(hops).map_err(|e| e.to_string())
    }) {
        Ok(budget) => budget,
        Err(error) => {
            tracing::warn!(key, value = raw, %error, default, "Invalid depth budget, using default");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditConfig::default();
        assert_eq!(config.max_cycle_depth.get(), 50);
        assert_eq!(config.default_tree_depth.get(), 99);
        assert_eq!(config.max_tree_depth.get(), 500);
    }

    #[test]
    fn test_tree_depth_ceiling() {
        let config = EditConfig::default().with_max_tree_depth(DepthBudget::new(200).unwrap());

        assert_eq!(config.tree_depth(None).unwrap().get(), 99);
        assert_eq!(config.tree_depth(Some(DepthBudget::new(200).unwrap())).unwrap().get(), 200);

        let err = config.tree_depth(Some(DepthBudget::new(1_000_000).unwrap())).unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)));
    }

    #[test]
    fn test_default_tree_depth_never_exceeds_ceiling() {
        let config = EditConfig::default()
            .with_default_tree_depth(DepthBudget::new(400).unwrap())
            .with_max_tree_depth(DepthBudget::new(10).unwrap());

        assert_eq!(config.tree_depth(None).unwrap().get(), 10);
        assert_eq!(config.clamped().default_tree_depth.get(), 10);
    }

    #[test]
    fn test_parse_budget() {
        assert_eq!(parse_budget("K", None, 50).get(), 50);
        assert_eq!(parse_budget("K", Some("7"), 50).get(), 7);
        assert_eq!(parse_budget("K", Some(" 12 "), 50).get(), 12);
        assert_eq!(parse_budget("K", Some("0"), 50).get(), 50);
        assert_eq!(parse_budget("K", Some("-3"), 50).get(), 50);
        assert_eq!(parse_budget("K", Some("lots"), 99).get(), 99);
    }

    #[test]
    fn test_builders() {
        let config = EditConfig::default()
            .with_max_cycle_depth(DepthBudget::new(3).unwrap())
            .with_default_tree_depth(DepthBudget::new(4).unwrap());
        assert_eq!(config.max_cycle_depth.get(), 3);
        assert_eq!(config.default_tree_depth.get(), 4);
    }
}
