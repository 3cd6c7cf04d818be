//! Input Codec: a total bijection between [`PlayerInput`] and a 32-bit mask.
//!
//! `spec.md` §4.1 fixes bit positions as part of the wire format: builds that
//! interoperate must agree on them. They are listed here in one place so the
//! layout can never silently drift between [`encode`] and [`decode`].

use serde::{Deserialize, Serialize};

/// Bit position of each field in the wire-format `u32` mask. Order matches
/// `spec.md` §3's field listing: four directions, six attacks, three motion
/// specials.
mod bits {
    pub const UP: u32 = 0;
    pub const DOWN: u32 = 1;
    pub const LEFT: u32 = 2;
    pub const RIGHT: u32 = 3;
    pub const LIGHT_PUNCH: u32 = 4;
    pub const MEDIUM_PUNCH: u32 = 5;
    pub const HEAVY_PUNCH: u32 = 6;
    pub const LIGHT_KICK: u32 = 7;
    pub const MEDIUM_KICK: u32 = 8;
    pub const HEAVY_KICK: u32 = 9;
    pub const HADOKEN: u32 = 10;
    pub const SHORYUKEN: u32 = 11;
    pub const TATSUMAKI: u32 = 12;
}

/// Bits 0–12 are meaningful; 13–31 are reserved and must be zero on the wire.
pub const VALID_MASK: u32 = (1 << 13) - 1;

/// One frame's worth of boolean inputs for a single player.
///
/// `PlayerInput` is the fixed 13-boolean set from `spec.md` §3: four
/// directions, six attack buttons (three punches, three kicks), and three
/// motion-triggered special flags. The special flags are not raw buttons —
/// they are computed by the host's input-history layer from a buffered
/// direction sequence plus a terminal button press (`spec.md` §4.3.2) and
/// passed into the kernel as plain booleans so that [`crate::kernel::step`]
/// itself never needs to inspect input history.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Up direction held.
    pub up: bool,
    /// Down direction held.
    pub down: bool,
    /// Left direction held.
    pub left: bool,
    /// Right direction held.
    pub right: bool,
    /// Light punch pressed.
    pub light_punch: bool,
    /// Medium punch pressed.
    pub medium_punch: bool,
    /// Heavy punch pressed.
    pub heavy_punch: bool,
    /// Light kick pressed.
    pub light_kick: bool,
    /// Medium kick pressed.
    pub medium_kick: bool,
    /// Heavy kick pressed.
    pub heavy_kick: bool,
    /// Hadoken motion completed this frame.
    pub hadoken: bool,
    /// Shoryuken motion completed this frame.
    pub shoryuken: bool,
    /// Tatsumaki motion completed this frame.
    pub tatsumaki: bool,
}

impl PlayerInput {
    /// Sets bit `i` of the returned mask iff field `i` is `true`. Reserved
    /// bits 13–31 are always zero.
    #[must_use]
    pub fn encode(self) -> u32 {
        let mut mask = 0u32;
        mask |= (self.up as u32) << bits::UP;
        mask |= (self.down as u32) << bits::DOWN;
        mask |= (self.left as u32) << bits::LEFT;
        mask |= (self.right as u32) << bits::RIGHT;
        mask |= (self.light_punch as u32) << bits::LIGHT_PUNCH;
        mask |= (self.medium_punch as u32) << bits::MEDIUM_PUNCH;
        mask |= (self.heavy_punch as u32) << bits::HEAVY_PUNCH;
        mask |= (self.light_kick as u32) << bits::LIGHT_KICK;
        mask |= (self.medium_kick as u32) << bits::MEDIUM_KICK;
        mask |= (self.heavy_kick as u32) << bits::HEAVY_KICK;
        mask |= (self.hadoken as u32) << bits::HADOKEN;
        mask |= (self.shoryuken as u32) << bits::SHORYUKEN;
        mask |= (self.tatsumaki as u32) << bits::TATSUMAKI;
        mask
    }

    /// Inverse of [`PlayerInput::encode`]. Reserved bits in `mask` are ignored.
    #[must_use]
    pub fn decode(mask: u32) -> Self {
        let bit = |pos: u32| mask & (1 << pos) != 0;
        PlayerInput {
            up: bit(bits::UP),
            down: bit(bits::DOWN),
            left: bit(bits::LEFT),
            right: bit(bits::RIGHT),
            light_punch: bit(bits::LIGHT_PUNCH),
            medium_punch: bit(bits::MEDIUM_PUNCH),
            heavy_punch: bit(bits::HEAVY_PUNCH),
            light_kick: bit(bits::LIGHT_KICK),
            medium_kick: bit(bits::MEDIUM_KICK),
            heavy_kick: bit(bits::HEAVY_KICK),
            hadoken: bit(bits::HADOKEN),
            shoryuken: bit(bits::SHORYUKEN),
            tatsumaki: bit(bits::TATSUMAKI),
        }
    }

    /// `true` if any attack button (punch or kick) is pressed.
    #[must_use]
    pub fn any_attack(self) -> bool {
        self.light_punch
            || self.medium_punch
            || self.heavy_punch
            || self.light_kick
            || self.medium_kick
            || self.heavy_kick
    }

    /// `true` if any of the three motion specials triggered this frame.
    #[must_use]
    pub fn any_special(self) -> bool {
        self.hadoken || self.shoryuken || self.tatsumaki
    }
}

/// A pair of per-player inputs for one simulation frame (`spec.md` §3 `FrameInputs`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameInputs {
    /// Player 0's input for this frame.
    pub p0: PlayerInput,
    /// Player 1's input for this frame.
    pub p1: PlayerInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_blank_is_zero() {
        assert_eq!(PlayerInput::default().encode(), 0);
    }

    #[test]
    fn decode_zero_is_blank() {
        assert_eq!(PlayerInput::decode(0), PlayerInput::default());
    }

    #[test]
    fn round_trip_every_single_bit() {
        for pos in 0..13u32 {
            let mask = 1u32 << pos;
            let decoded = PlayerInput::decode(mask);
            assert_eq!(decoded.encode(), mask, "bit {pos} did not round-trip");
        }
    }

    #[test]
    fn decode_encode_masks_reserved_bits() {
        let dirty = 0xFFFF_FFFFu32;
        let decoded = PlayerInput::decode(dirty);
        assert_eq!(decoded.encode(), dirty & VALID_MASK);
    }

    #[test]
    fn encode_decode_is_identity_for_valid_inputs() {
        let input = PlayerInput {
            up: true,
            right: true,
            heavy_punch: true,
            tatsumaki: true,
            ..Default::default()
        };
        assert_eq!(PlayerInput::decode(input.encode()), input);
    }

    #[test]
    fn any_attack_and_any_special() {
        let mut input = PlayerInput::default();
        assert!(!input.any_attack());
        assert!(!input.any_special());
        input.medium_kick = true;
        assert!(input.any_attack());
        input = PlayerInput::default();
        input.shoryuken = true;
        assert!(input.any_special());
    }

    // Property-style exhaustive check: for all 8192 combinations of the 13
    // meaningful bits, decode(encode(x)) == x and encode(decode(b)) == b.
    #[test]
    fn exhaustive_bijection_over_valid_range() {
        for mask in 0..=VALID_MASK {
            let decoded = PlayerInput::decode(mask);
            assert_eq!(decoded.encode(), mask);
        }
    }
}
