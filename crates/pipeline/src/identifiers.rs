//! Newtype domain identifiers.
//!
//! Every named concept in a pipeline definition is a distinct newtype wrapping
//! a `String`. This prevents accidentally passing a [`RoleName`] where a
//! [`StageName`] is expected even though both are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline run (one topic, one pass through every stage).
///
/// Generated fresh for every run and attached to the run's tracing span so
/// all stage, agent and tool activity from one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: string-backed (definition names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a stage within a pipeline definition (e.g. `"research"`).
    ///
    /// Stage names are unique per pipeline and are used to declare upstream
    /// dependencies between stages.
    StageName
}

string_id! {
    /// The role name of an agent persona (e.g. `"Senior Editorial Reviewer"`).
    RoleName
}

string_id! {
    /// Names a tool an agent role is permitted to call.
    ///
    /// The name is what the language model sees in the tool declaration and
    /// what it echoes back when it requests a call.
    ToolName
}

string_id! {
    /// Identifies a named pipeline definition (e.g. `"insightforge-blog"`).
    PipelineName
}

/// Key of a persisted artifact (e.g. `"final-blog-post.md"`).
///
/// Keys are relative, slash-separated paths. Absolute paths and `..`
/// components are rejected so that a store rooted at a directory can never be
/// asked to write outside it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Creates a new key, returning `None` if the value is empty, absolute,
    /// or contains an empty, `.` or `..` path segment.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() || v.starts_with('/') || v.contains('\\') {
            return None;
        }
        let valid = v
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if valid {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
