//! Construction-time pipeline options.

use std::fmt;
use std::ops::BitOr;

use plinth_config::ContextConfig;
use plinth_stages::StageKind;

/// Bitmask selecting which optional stages a context creates by default.
///
/// The dispatch stage is always enabled.
///
/// # Example
///
/// ```
/// use plinth_context::PipelineOptions;
///
/// let options = PipelineOptions::SESSIONS | PipelineOptions::SECURITY;
/// assert!(options.sessions());
/// assert!(options.security());
/// assert_eq!(options.bits(), 3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineOptions(u8);

impl PipelineOptions {
    /// No optional stages.
    pub const NONE: Self = Self(0);
    /// Enable the session stage.
    pub const SESSIONS: Self = Self(1);
    /// Enable the access-control stage.
    pub const SECURITY: Self = Self(2);
    /// Alias of [`Self::NONE`] for readability at call sites.
    pub const NO_SESSIONS: Self = Self(0);
    /// Alias of [`Self::NONE`] for readability at call sites.
    pub const NO_SECURITY: Self = Self(0);

    const MASK: u8 = Self::SESSIONS.0 | Self::SECURITY.0;

    /// Builds options from a pair of flags.
    #[must_use]
    pub const fn new(sessions: bool, security: bool) -> Self {
        let mut bits = 0;
        if sessions {
            bits |= Self::SESSIONS.0;
        }
        if security {
            bits |= Self::SECURITY.0;
        }
        Self(bits)
    }

    /// Builds options from raw bits. Unknown bits are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if the session stage is enabled.
    #[must_use]
    pub const fn sessions(self) -> bool {
        self.0 & Self::SESSIONS.0 != 0
    }

    /// Returns `true` if the access-control stage is enabled.
    #[must_use]
    pub const fn security(self) -> bool {
        self.0 & Self::SECURITY.0 != 0
    }

    /// Returns `true` if stages of `kind` are created by default.
    #[must_use]
    pub const fn enables(self, kind: StageKind) -> bool {
        match kind {
            StageKind::Session => self.sessions(),
            StageKind::Security => self.security(),
            StageKind::Dispatch => true,
        }
    }
}

impl BitOr for PipelineOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<&ContextConfig> for PipelineOptions {
    fn from(config: &ContextConfig) -> Self {
        Self::new(config.sessions, config.security)
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("sessions", &self.sessions())
            .field("security", &self.security())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PipelineOptions::SESSIONS.bits(), 1);
        assert_eq!(PipelineOptions::SECURITY.bits(), 2);
        assert_eq!(PipelineOptions::NO_SESSIONS, PipelineOptions::NONE);
        assert_eq!(PipelineOptions::NO_SECURITY, PipelineOptions::NONE);
    }

    #[test]
    fn test_pair_constructor_matches_bits() {
        assert_eq!(PipelineOptions::new(false, false), PipelineOptions::NONE);
        assert_eq!(PipelineOptions::new(true, false), PipelineOptions::SESSIONS);
        assert_eq!(
            PipelineOptions::new(true, true),
            PipelineOptions::SESSIONS | PipelineOptions::SECURITY
        );
    }

    #[test]
    fn test_dispatch_always_enabled() {
        assert!(PipelineOptions::NONE.enables(StageKind::Dispatch));
        assert!(!PipelineOptions::NONE.enables(StageKind::Session));
        assert!(PipelineOptions::SECURITY.enables(StageKind::Security));
    }

    #[test]
    fn test_unknown_bits_dropped() {
        assert_eq!(PipelineOptions::from_bits(0xff).bits(), 3);
    }

    #[test]
    fn test_from_context_config() {
        let config = ContextConfig {
            security: true,
            ..ContextConfig::default()
        };
        let options = PipelineOptions::from(&config);
        assert!(options.security());
        assert!(!options.sessions());
    }

    proptest::proptest! {
        #[test]
        fn prop_flags_round_trip_through_bits(sessions: bool, security: bool) {
            let options = PipelineOptions::new(sessions, security);
            proptest::prop_assert_eq!(PipelineOptions::from_bits(options.bits()), options);
            proptest::prop_assert_eq!(options.enables(StageKind::Session), sessions);
            proptest::prop_assert_eq!(options.enables(StageKind::Security), security);
        }

        #[test]
        fn prop_union_enables_either(a in 0u8..4, b in 0u8..4) {
            let union = PipelineOptions::from_bits(a) | PipelineOptions::from_bits(b);
            proptest::prop_assert_eq!(union.bits(), a | b);
        }
    }
}
