//! Fishing mini-game state machine
//!
//! The remote bot answers in free text, so transitions hinge on the only
//! two reliable cues its replies offer: a fixed "already cast" sentence and
//! a "Congratulations" prefix marking a successful catch or milestone.

/// Current position in the fishing conversation
///
/// A pure value, replaced on every transition. The machine cycles forever;
/// there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FishingState {
    /// The rod is free; a cast may be issued
    CanCast,
    /// The line is in the water, waiting for a bite
    IsCast,
    /// A fish is on the hook; a catch may be issued
    CanCatch,
    /// The bot may follow a catch with a personal-record announcement
    OptionalRecord,
}

/// The exact reply the bot sends when a cast is attempted while the line
/// is already out.
pub const ALREADY_CAST: &str = "Your line is already cast! I'm sure a fish'll be along soon...";

const CONGRATS_PREFIX: &str = "Congratulations";

/// Transition relation between whisper messages and states
///
/// Pure function; anything unexpected defensively maps back to
/// [`FishingState::CanCast`] so the conversation can restart.
pub fn next(state: FishingState, message: &str) -> FishingState {
    match state {
        FishingState::CanCast => {
            if message.starts_with(CONGRATS_PREFIX) {
                FishingState::CanCast
            } else {
                FishingState::IsCast
            }
        }
        FishingState::IsCast => {
            if message == ALREADY_CAST {
                FishingState::IsCast
            } else {
                FishingState::CanCatch
            }
        }
        FishingState::CanCatch => {
            if message.starts_with(CONGRATS_PREFIX) {
                FishingState::CanCast
            } else {
                FishingState::OptionalRecord
            }
        }
        FishingState::OptionalRecord => FishingState::CanCast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FishingState::*;

    // Neither the congratulations prefix nor the already-cast sentence.
    const PLAIN: &str = "A fish bites! It feels like a big one!";

    #[test]
    fn test_plain_messages_advance_the_cycle() {
        assert_eq!(next(CanCast, PLAIN), IsCast);
        assert_eq!(next(IsCast, PLAIN), CanCatch);
        assert_eq!(next(CanCatch, PLAIN), OptionalRecord);
        assert_eq!(next(OptionalRecord, PLAIN), CanCast);
    }

    #[test]
    fn test_congratulations_keeps_can_cast() {
        assert_eq!(next(CanCast, "Congratulations!"), CanCast);
    }

    #[test]
    fn test_already_cast_sentence_holds_is_cast() {
        assert_eq!(next(IsCast, ALREADY_CAST), IsCast);
        // Anything else means a bite.
        assert_eq!(next(IsCast, "Your line is already cast!"), CanCatch);
    }

    #[test]
    fn test_successful_catch_returns_to_can_cast() {
        assert_eq!(next(CanCatch, "Congratulations, you caught one!"), CanCast);
    }

    #[test]
    fn test_optional_record_always_resets() {
        assert_eq!(next(OptionalRecord, "Congratulations, a new record!"), CanCast);
        assert_eq!(next(OptionalRecord, ALREADY_CAST), CanCast);
        assert_eq!(next(OptionalRecord, ""), CanCast);
    }

    #[test]
    fn test_full_cycle() {
        let mut state = CanCast;
        for message in [
            "You cast your line out into the water...",
            ALREADY_CAST,
            "A fish bites!",
            "Congratulations, you caught a Blegill!",
        ] {
            state = next(state, message);
        }
        assert_eq!(state, CanCast);
    }
}
