//! Error types for control-thread operations.
//!
//! Everything here is reported synchronously to the caller of a mutating API.
//! The audio thread never produces these: a topology problem discovered at
//! compile time is carried in [`Compilation`](crate::Compilation) instead, and
//! the affected objects simply do not run.

use thiserror::Error;

use crate::object::ObjectId;

/// Errors returned by graph, unit, and cache mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No inlet with this name exists on the object.
    #[error("object '{object}' has no inlet named '{port}'")]
    UnknownInlet {
        /// Name of the object that was searched.
        object: String,
        /// Requested inlet name.
        port: String,
    },

    /// No outlet with this name exists on the object.
    #[error("object '{object}' has no outlet named '{port}'")]
    UnknownOutlet {
        /// Name of the object that was searched.
        object: String,
        /// Requested outlet name.
        port: String,
    },

    /// No parameter with this name exists on the object.
    #[error("object '{object}' has no parameter named '{name}'")]
    UnknownParameter {
        /// Name of the object that was searched.
        object: String,
        /// Requested parameter name.
        name: String,
    },

    /// No option with this name exists on the object.
    #[error("object '{object}' has no option named '{name}'")]
    UnknownOption {
        /// Name of the object that was searched.
        object: String,
        /// Requested option name.
        name: String,
    },

    /// A unit or chain channel index is out of range.
    #[error("channel {channel} out of range for '{owner}' ({count} channels)")]
    ChannelOutOfRange {
        /// Unit or chain name.
        owner: String,
        /// Requested channel.
        channel: usize,
        /// Number of channels available.
        count: usize,
    },

    /// The object is not a member of the unit.
    #[error("object {0} is not part of this unit")]
    NotAMember(ObjectId),

    /// The object cache cannot construct another object.
    #[error("object cache '{name}' is at capacity ({capacity})")]
    CacheExhausted {
        /// Cache name.
        name: String,
        /// Configured capacity ceiling.
        capacity: usize,
    },

    /// Tying these values together would make a leader follow itself.
    #[error("tying '{follower}' to '{leader}' would create a cycle")]
    TieCycle {
        /// Name of the value that was being tied.
        follower: String,
        /// Name of the proposed leader.
        leader: String,
    },

    /// The reorder request does not contain exactly the current units.
    #[error("reorder does not match the current chain ({expected} units, got {actual})")]
    ReorderMismatch {
        /// Number of units in the chain.
        expected: usize,
        /// Number of positions supplied.
        actual: usize,
    },

    /// Engine configuration is outside the supported range.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results in this crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_inlet_display() {
        let err = Error::UnknownInlet {
            object: "gain".to_string(),
            port: "Side".to_string(),
        };
        assert_eq!(err.to_string(), "object 'gain' has no inlet named 'Side'");
    }

    #[test]
    fn cache_exhausted_display() {
        let err = Error::CacheExhausted {
            name: "probes".to_string(),
            capacity: 32,
        };
        assert_eq!(err.to_string(), "object cache 'probes' is at capacity (32)");
    }

    #[test]
    fn channel_out_of_range_display() {
        let err = Error::ChannelOutOfRange {
            owner: "delay".to_string(),
            channel: 3,
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("channel 3"), "got: {msg}");
        assert!(msg.contains("2 channels"), "got: {msg}");
    }
}
