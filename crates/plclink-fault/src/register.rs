use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::bits::{is_valid_code, FaultBits, FAULT_WORDS};
use crate::codes::INVALID_CODE;
use crate::error::{ConfigError, FaultError, Result};

/// Layout of a fault register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultConfig {
    /// Number of 16-bit words. Must equal the compiled layout (4).
    pub words: usize,
    /// Independent poll views, one per supervisory client. Default: 1.
    pub channels: usize,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            words: FAULT_WORDS,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelView {
    /// Asserted and not yet cleared.
    current: FaultBits,
    /// What the next poll on this channel reports.
    latched: FaultBits,
}

#[derive(Debug)]
struct RegisterState {
    channels: Vec<ChannelView>,
    sticky: FaultBits,
}

impl RegisterState {
    fn raise(&mut self, code: u8) {
        for view in &mut self.channels {
            view.current.set_bit(code);
            view.latched.set_bit(code);
        }
    }
}

/// Process-wide fault register, shared as `Arc<FaultRegister>`.
///
/// Every code has a `current` and a `latched` bit per poll channel.
/// Setting a fault asserts both. Resetting clears only `current`, so a
/// fault that came and went between polls is still reported once.
/// Polling returns `latched`, clears every non-sticky bit of `current`,
/// and re-latches whatever is left.
///
/// All operations run start to finish under one lock covering every word
/// of every channel. None of them block on anything else.
#[derive(Debug)]
pub struct FaultRegister {
    state: Mutex<RegisterState>,
}

impl FaultRegister {
    /// Build an all-clear, all non-sticky register.
    pub fn new(config: FaultConfig) -> std::result::Result<Self, ConfigError> {
        if config.words != FAULT_WORDS {
            return Err(ConfigError::WordCount {
                configured: config.words,
                expected: FAULT_WORDS,
            });
        }
        if config.channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        Ok(Self::with_channels(config.channels))
    }

    fn with_channels(channels: usize) -> Self {
        Self {
            state: Mutex::new(RegisterState {
                channels: vec![ChannelView::default(); channels],
                sticky: FaultBits::EMPTY,
            }),
        }
    }

    /// Number of poll channels.
    pub fn channels(&self) -> usize {
        self.exclusive(|state| state.channels.len())
    }

    /// Assert a fault on every poll channel.
    ///
    /// An out-of-range code raises [`INVALID_CODE`] instead and is reported
    /// back as [`FaultError::InvalidCode`].
    pub fn set(&self, code: u8) -> Result<()> {
        let result = self.exclusive(|state| {
            if !is_valid_code(code) {
                state.raise(INVALID_CODE);
                return Err(FaultError::InvalidCode(code));
            }
            state.raise(code);
            Ok(())
        });
        log_result("set", code, &result);
        result
    }

    /// Clear a fault from `current`. Latched views keep it until polled.
    pub fn reset(&self, code: u8) -> Result<()> {
        let result = self.exclusive(|state| {
            if !is_valid_code(code) {
                state.raise(INVALID_CODE);
                return Err(FaultError::InvalidCode(code));
            }
            for view in &mut state.channels {
                view.current.clear_bit(code);
            }
            Ok(())
        });
        log_result("reset", code, &result);
        result
    }

    /// Make a fault survive polls until an explicit [`reset`](Self::reset).
    ///
    /// Meant for start-up configuration.
    pub fn make_sticky(&self, code: u8) -> Result<()> {
        let result = self.exclusive(|state| {
            if !is_valid_code(code) {
                state.raise(INVALID_CODE);
                return Err(FaultError::InvalidCode(code));
            }
            state.sticky.set_bit(code);
            Ok(())
        });
        log_result("make_sticky", code, &result);
        result
    }

    /// Read and conditionally clear one poll channel.
    ///
    /// Returns the latched view as it was before this call. Afterwards
    /// `current` holds only sticky faults and becomes the new latched view.
    pub fn poll(&self, channel: usize) -> Result<FaultBits> {
        self.exclusive(|state| {
            let sticky = state.sticky;
            let channels = state.channels.len();
            let view = state
                .channels
                .get_mut(channel)
                .ok_or(FaultError::UnknownChannel { channel, channels })?;

            let snapshot = view.latched;
            view.current.mask_and(&sticky);
            view.latched = view.current;
            trace!(channel, %snapshot, "fault register polled");
            Ok(snapshot)
        })
    }

    /// Latched view of a channel, without clearing anything.
    pub fn peek(&self, channel: usize) -> Result<FaultBits> {
        self.exclusive(|state| {
            let channels = state.channels.len();
            state
                .channels
                .get(channel)
                .map(|view| view.latched)
                .ok_or(FaultError::UnknownChannel { channel, channels })
        })
    }

    pub fn is_sticky(&self, code: u8) -> bool {
        self.exclusive(|state| state.sticky.contains(code))
    }

    // The state is plain bitmaps, valid between any two statements, so a
    // panic in another holder leaves nothing to repair.
    fn exclusive<R>(&self, f: impl FnOnce(&mut RegisterState) -> R) -> R {
        let mut guard: MutexGuard<'_, RegisterState> =
            self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl Default for FaultRegister {
    /// Same register as `new(FaultConfig::default())`.
    fn default() -> Self {
        Self::with_channels(FaultConfig::default().channels)
    }
}

fn log_result(op: &str, code: u8, result: &Result<()>) {
    match result {
        Ok(()) => trace!(op, code, "fault register updated"),
        Err(err) => warn!(op, code, %err, "invalid fault code"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;
    use crate::codes::{CHECKSUM_MISMATCH, RECEIVE_TIMEOUT};

    fn register() -> FaultRegister {
        FaultRegister::new(FaultConfig::default()).unwrap()
    }

    #[test]
    fn default_matches_default_config() {
        let from_default = FaultRegister::default();
        let from_config = register();

        assert_eq!(from_default.channels(), from_config.channels());
        from_default.set(RECEIVE_TIMEOUT).unwrap();
        from_config.set(RECEIVE_TIMEOUT).unwrap();
        assert_eq!(from_default.poll(0).unwrap(), from_config.poll(0).unwrap());
    }

    #[test]
    fn new_register_is_clear() {
        let reg = register();
        assert_eq!(reg.channels(), 1);
        assert!(reg.poll(0).unwrap().is_empty());
        assert!(!reg.is_sticky(CHECKSUM_MISMATCH));
    }

    #[test]
    fn word_count_mismatch_is_fatal() {
        let err = FaultRegister::new(FaultConfig {
            words: 3,
            ..FaultConfig::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::WordCount {
                configured: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn zero_channels_rejected() {
        let err = FaultRegister::new(FaultConfig {
            channels: 0,
            ..FaultConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::NoChannels);
    }

    #[test]
    fn non_sticky_fault_clears_after_one_poll() {
        let reg = register();
        reg.set(CHECKSUM_MISMATCH).unwrap();

        assert!(reg.poll(0).unwrap().contains(CHECKSUM_MISMATCH));
        assert!(reg.poll(0).unwrap().is_empty());
    }

    #[test]
    fn sticky_fault_survives_polls_until_reset() {
        let reg = register();
        reg.make_sticky(RECEIVE_TIMEOUT).unwrap();
        reg.set(RECEIVE_TIMEOUT).unwrap();

        for _ in 0..3 {
            assert!(reg.poll(0).unwrap().contains(RECEIVE_TIMEOUT));
        }

        reg.reset(RECEIVE_TIMEOUT).unwrap();
        // Latched before the reset, so reported one more time.
        assert!(reg.poll(0).unwrap().contains(RECEIVE_TIMEOUT));
        assert!(reg.poll(0).unwrap().is_empty());
    }

    #[test]
    fn glitch_visible_to_next_poll_only() {
        let reg = register();
        reg.set(5).unwrap();
        reg.reset(5).unwrap();

        assert!(reg.poll(0).unwrap().contains(5));
        assert!(!reg.poll(0).unwrap().contains(5));
    }

    #[test]
    fn invalid_codes_raise_invalid_code_fault() {
        let reg = register();
        assert_eq!(reg.set(0), Err(FaultError::InvalidCode(0)));
        assert_eq!(reg.set(65), Err(FaultError::InvalidCode(65)));

        let bits = reg.poll(0).unwrap();
        assert_eq!(bits.codes().collect::<Vec<_>>(), vec![INVALID_CODE]);
        assert_eq!(bits.as_u64(), 1);
    }

    #[test]
    fn invalid_reset_and_sticky_also_raise() {
        let reg = register();
        assert!(reg.reset(200).is_err());
        assert!(reg.poll(0).unwrap().contains(INVALID_CODE));

        assert!(reg.make_sticky(0).is_err());
        assert!(reg.poll(0).unwrap().contains(INVALID_CODE));
        assert!(!reg.is_sticky(0));
    }

    #[test]
    fn poll_clears_non_sticky_bits_outside_snapshot() {
        let reg = register();
        reg.set(7).unwrap();
        // Latched holds 7. Clear current, then re-raise: latched still holds 7.
        reg.reset(7).unwrap();
        reg.set(7).unwrap();

        assert!(reg.poll(0).unwrap().contains(7));
        assert!(reg.peek(0).unwrap().is_empty());
    }

    #[test]
    fn channels_poll_independently() {
        let reg = FaultRegister::new(FaultConfig {
            channels: 2,
            ..FaultConfig::default()
        })
        .unwrap();
        reg.set(9).unwrap();

        assert!(reg.poll(0).unwrap().contains(9));
        assert!(reg.poll(0).unwrap().is_empty());
        // Channel 1 has not polled yet.
        assert!(reg.poll(1).unwrap().contains(9));
        assert!(reg.poll(1).unwrap().is_empty());
    }

    #[test]
    fn unknown_channel_rejected() {
        let reg = register();
        assert_eq!(
            reg.poll(3),
            Err(FaultError::UnknownChannel {
                channel: 3,
                channels: 1
            })
        );
        assert!(reg.peek(1).is_err());
    }

    #[test]
    fn peek_does_not_clear() {
        let reg = register();
        reg.set(2).unwrap();
        assert!(reg.peek(0).unwrap().contains(2));
        assert!(reg.peek(0).unwrap().contains(2));
        assert!(reg.poll(0).unwrap().contains(2));
    }

    #[test]
    fn concurrent_sets_are_never_lost() {
        let reg = Arc::new(register());
        let mut seen = FaultBits::EMPTY;

        let setters: Vec<_> = (20u8..=60)
            .map(|code| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || reg.set(code).unwrap())
            })
            .collect();

        for _ in 0..200 {
            seen.merge(&reg.poll(0).unwrap());
        }
        for setter in setters {
            setter.join().unwrap();
        }
        seen.merge(&reg.poll(0).unwrap());

        assert_eq!(seen.codes().collect::<Vec<_>>(), (20u8..=60).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn set_then_poll_reports_exactly_that_code(code in 1u8..=64) {
            let reg = register();
            let before = reg.poll(0).unwrap();
            reg.set(code).unwrap();
            let after = reg.poll(0).unwrap();

            let mut expected = before;
            expected.set_bit(code);
            prop_assert_eq!(after, expected);
            prop_assert_eq!(after.count(), 1);
        }

        #[test]
        fn non_sticky_codes_clear_on_second_poll(code in 1u8..=64) {
            let reg = register();
            reg.set(code).unwrap();
            prop_assert!(reg.poll(0).unwrap().contains(code));
            prop_assert!(!reg.poll(0).unwrap().contains(code));
        }

        #[test]
        fn sticky_codes_persist_until_reset(code in 1u8..=64, polls in 1usize..6) {
            let reg = register();
            reg.make_sticky(code).unwrap();
            reg.set(code).unwrap();
            for _ in 0..polls {
                prop_assert!(reg.poll(0).unwrap().contains(code));
            }
            reg.reset(code).unwrap();
            prop_assert!(reg.poll(0).unwrap().contains(code));
            prop_assert!(!reg.poll(0).unwrap().contains(code));
        }
    }
}
