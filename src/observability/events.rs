//! Observable events
//!
//! Every event the crate logs is listed here; free-form event names are not used.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Model metadata
    /// A model's table description was registered
    ModelRegistered,
    /// An identical table was registered again
    ModelReregistered,
    /// A model declaration was rejected
    ModelRejected,
    /// Model definitions loaded from disk
    ModelsLoaded,
    /// A model definition was written to disk
    ModelSaved,

    // Unit of work
    /// Session opened against a database
    SessionOpened,
    /// Table ensured in the store
    TableEnsured,
    /// Lookup answered from the identity map
    IdentityHit,
    /// Lookup went to the store
    IdentityMiss,
    /// Dead identity map entries swept
    IdentityEvicted,
    /// Commit begins
    CommitBegin,
    /// Commit applied by the store
    CommitComplete,
    /// Commit rejected, queues kept
    CommitFailed,
    /// Pending work discarded
    Rollback,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::ModelRegistered => "MODEL_REGISTERED",
            Event::ModelReregistered => "MODEL_REREGISTERED",
            Event::ModelRejected => "MODEL_REJECTED",
            Event::ModelsLoaded => "MODELS_LOADED",
            Event::ModelSaved => "MODEL_SAVED",

            Event::SessionOpened => "SESSION_OPENED",
            Event::TableEnsured => "TABLE_ENSURED",
            Event::IdentityHit => "IDENTITY_HIT",
            Event::IdentityMiss => "IDENTITY_MISS",
            Event::IdentityEvicted => "IDENTITY_EVICTED",
            Event::CommitBegin => "COMMIT_BEGIN",
            Event::CommitComplete => "COMMIT_COMPLETE",
            Event::CommitFailed => "COMMIT_FAILED",
            Event::Rollback => "ROLLBACK",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::ModelRejected | Event::CommitFailed)
    }

    /// Returns true for high-volume events logged at trace level
    pub fn is_chatty(&self) -> bool {
        matches!(self, Event::IdentityHit | Event::IdentityMiss)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
