// src/error.rs
use thiserror::Error;

/// Structural problems in a hand's parent/child link graph.
///
/// Any of these aborts loading the model; no partial skeleton is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("cycle in parent links reached from joint \"{joint}\"")]
    Cycle { joint: String },

    #[error("parent chain of joint \"{joint}\" exceeds depth limit {limit}")]
    DepthExceeded { joint: String, limit: usize },

    #[error("duplicate joint name \"{0}\"")]
    DuplicateJoint(String),

    #[error("child link \"{link}\" is claimed by both \"{first}\" and \"{second}\"")]
    DuplicateChildLink {
        link: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Error)]
pub enum RetargetError {
    #[error("joint \"{joint}\" not found in hand model \"{hand}\"")]
    UnknownJoint { joint: String, hand: String },

    #[error("joint \"{joint}\" rejected non-finite value {value}")]
    NonFiniteValue { joint: String, value: f64 },

    #[error("invalid skeleton: {0}")]
    Graph(#[from] GraphError),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no hand model loaded")]
    NoModelLoaded,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl RetargetError {
    pub fn unknown_joint(joint: impl Into<String>, hand: impl Into<String>) -> Self {
        Self::UnknownJoint {
            joint: joint.into(),
            hand: hand.into(),
        }
    }

    pub fn invalid_metadata(reason: impl Into<String>) -> Self {
        Self::InvalidMetadata(reason.into())
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, RetargetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_joint_names_hand_and_joint() {
        let err = RetargetError::unknown_joint("thumb_tip", "linker-l10-right");
        let msg = err.to_string();
        assert!(msg.contains("thumb_tip"));
        assert!(msg.contains("linker-l10-right"));
    }

    #[test]
    fn graph_error_converts() {
        let err: RetargetError = GraphError::Cycle {
            joint: "a".to_string(),
        }
        .into();
        assert!(matches!(err, RetargetError::Graph(GraphError::Cycle { .. })));
        assert!(err.to_string().contains("cycle"));
    }
}
