//! Hierarchy bounds shared by the lifecycle engine and permission expansion.

use std::time::Duration;

use crate::error::CoreError;

/// Default maximum number of levels in the hierarchy.
pub const DEFAULT_MAX_HIERARCHY_DEPTH: i32 = 10;

/// Default maximum entity name length in characters.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 255;

/// Default upper bound on a single hierarchy traversal.
pub const DEFAULT_TRAVERSAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Validated hierarchy configuration.
///
/// Fields are private so a constructed value is always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyConfig {
    max_hierarchy_depth: i32,
    max_name_length: usize,
    traversal_timeout: Duration,
}

impl HierarchyConfig {
    /// Build a configuration, rejecting non-positive bounds.
    pub fn new(
        max_hierarchy_depth: i32,
        max_name_length: usize,
        traversal_timeout: Duration,
    ) -> Result<Self, CoreError> {
        if max_hierarchy_depth <= 0 {
            return Err(CoreError::Validation(format!(
                "max_hierarchy_depth must be greater than 0, got {max_hierarchy_depth}"
            )));
        }
        if max_name_length == 0 {
            return Err(CoreError::Validation(
                "max_name_length must be greater than 0".into(),
            ));
        }
        if traversal_timeout.is_zero() {
            return Err(CoreError::Validation(
                "traversal_timeout must be greater than 0".into(),
            ));
        }
        Ok(Self {
            max_hierarchy_depth,
            max_name_length,
            traversal_timeout,
        })
    }

    /// Maximum number of levels on any root-to-leaf path.
    pub fn max_hierarchy_depth(&self) -> i32 {
        self.max_hierarchy_depth
    }

    pub fn max_name_length(&self) -> usize {
        self.max_name_length
    }

    pub fn traversal_timeout(&self) -> Duration {
        self.traversal_timeout
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            traversal_timeout: DEFAULT_TRAVERSAL_TIMEOUT,
        }
    }
}
