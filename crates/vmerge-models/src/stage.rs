//! Merge pipeline stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a single merge request.
///
/// `Fetching → Assembling → Exporting → (Uploading) → Finalizing → Done`,
/// with `Failed` reachable from the first three stages only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStage {
    #[default]
    Fetching,
    Assembling,
    Exporting,
    Uploading,
    Finalizing,
    Done,
    Failed,
}

impl MergeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStage::Fetching => "fetching",
            MergeStage::Assembling => "assembling",
            MergeStage::Exporting => "exporting",
            MergeStage::Uploading => "uploading",
            MergeStage::Finalizing => "finalizing",
            MergeStage::Done => "done",
            MergeStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeStage::Done | MergeStage::Failed)
    }

    /// Whether a failure in this stage aborts the request.
    pub fn can_fail(&self) -> bool {
        matches!(
            self,
            MergeStage::Fetching | MergeStage::Assembling | MergeStage::Exporting
        )
    }

    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_advance_to(&self, next: MergeStage) -> bool {
        use MergeStage::*;
        match (self, next) {
            (Fetching, Assembling) | (Assembling, Exporting) => true,
            (Exporting, Uploading) | (Exporting, Finalizing) => true,
            (Uploading, Finalizing) | (Finalizing, Done) => true,
            (from, Failed) => from.can_fail(),
            _ => false,
        }
    }
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(MergeStage::Fetching.can_advance_to(MergeStage::Assembling));
        assert!(MergeStage::Exporting.can_advance_to(MergeStage::Finalizing));
        assert!(MergeStage::Exporting.can_advance_to(MergeStage::Uploading));
        assert!(!MergeStage::Fetching.can_advance_to(MergeStage::Exporting));
        assert!(!MergeStage::Done.can_advance_to(MergeStage::Fetching));
    }

    #[test]
    fn test_upload_failures_do_not_fail_the_request() {
        assert!(MergeStage::Assembling.can_advance_to(MergeStage::Failed));
        assert!(!MergeStage::Uploading.can_advance_to(MergeStage::Failed));
        assert!(!MergeStage::Finalizing.can_advance_to(MergeStage::Failed));
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&MergeStage::Assembling).unwrap(),
            "\"assembling\""
        );
        assert!(MergeStage::Failed.is_terminal());
    }
}
