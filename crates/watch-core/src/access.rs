//! Access modes for value store handles
//!
//! Modes form a one-directional restriction ordering
//! `ReadWrite → NoSet → ReadOnly`. A reference copy may only move along
//! that ordering, never back.

use crate::error::{WatchError, WatchResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Restriction level of a value store handle
///
/// Variants are declared from least to most restrictive, so the derived
/// `Ord` doubles as the restriction ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccessMode {
    /// Default. The watcher can be edited at any time.
    #[default]
    ReadWrite,

    /// The watcher can be read or cleared, but not set.
    NoSet,

    /// The watcher can only be read.
    ReadOnly,
}

impl AccessMode {
    /// Whether `set` is permitted
    #[inline]
    #[must_use]
    pub fn allows_set(self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    /// Whether `clear` and history clearing are permitted
    #[inline]
    #[must_use]
    pub fn allows_clear(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    /// Modes a reference copy of this mode may take
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [AccessMode] {
        use AccessMode::*;
        match self {
            ReadWrite => &[ReadWrite, NoSet, ReadOnly],
            NoSet => &[NoSet, ReadOnly],
            ReadOnly => &[ReadOnly],
        }
    }

    /// Validate deriving a `to` handle from a `self` handle
    ///
    /// # Errors
    /// Returns [`WatchError::LooserAccessMode`] when `to` is less restrictive.
    pub fn validate_transition(self, to: AccessMode) -> WatchResult<()> {
        if self.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(WatchError::LooserAccessMode {
                current: self,
                requested: to,
            })
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadWrite => "ReadWrite",
            Self::NoSet => "NoSet",
            Self::ReadOnly => "ReadOnly",
        };
        f.write_str(name)
    }
}
