//! Snapshot Codec: dense binary serialization of rollback-relevant state.
//!
//! The wire prefix (frame/hitstop/count, then per-character id/health/
//! position/meter/guardMeter/state/move) matches `spec.md` §6 byte-for-byte.
//! `spec.md` §8 invariant 3 additionally requires `load(save(S))` to be
//! step-equivalent to `S` for any future input sequence, which the minimal
//! field list in §4.2/§6 cannot satisfy on its own: an airborne character's
//! velocity, and the deferred-timer/juggle/combo counters, all feed directly
//! into `step` and are not recoverable from position alone. This codec
//! appends those fields after the spec-mandated prefix (see `DESIGN.md`)
//! rather than dropping them, so a full round trip is truly lossless.
//!
//! Encoding is hand-written little-endian field writes, not bincode: the
//! prefix layout is an external wire contract (it must stay byte-identical
//! across replay files recorded by past builds), which a derive-based
//! encoder cannot guarantee.

use crate::error::{NetcodeError, SnapshotDecodeReason};
use crate::kernel::moves::MoveId;
use crate::kernel::state::{
    Character, CharacterState, DeferredTimers, MoveInstance, MovePhase, Projectile, SimState,
};
use crate::{Frame, Side};

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1a 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// A saved, encoded snapshot of a [`SimState`].
///
/// Binary is the canonical form used for rollback and over the wire; JSON is
/// an optional human-readable fallback for tooling and debugging, gated
/// behind the `json` feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotBlob {
    /// The dense little-endian binary encoding.
    Binary(Vec<u8>),
    /// A JSON-encoded snapshot, for tooling that wants a readable form.
    #[cfg(feature = "json")]
    Json(String),
}

impl SnapshotBlob {
    /// Borrows the binary bytes, if this is a [`SnapshotBlob::Binary`].
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            SnapshotBlob::Binary(bytes) => Some(bytes),
            #[cfg(feature = "json")]
            SnapshotBlob::Json(_) => None,
        }
    }
}

/// Maps a [`CharacterState`] to its fixed wire tag (`spec.md` §6).
const fn state_tag(state: CharacterState) -> i8 {
    match state {
        CharacterState::Idle => 0,
        CharacterState::Walking => 1,
        CharacterState::Attacking => 2,
        CharacterState::Hitstun => 3,
        CharacterState::Blockstun => 4,
        CharacterState::Ko => 5,
    }
}

fn state_from_tag(tag: i8) -> Option<CharacterState> {
    match tag {
        0 => Some(CharacterState::Idle),
        1 => Some(CharacterState::Walking),
        2 => Some(CharacterState::Attacking),
        3 => Some(CharacterState::Hitstun),
        4 => Some(CharacterState::Blockstun),
        5 => Some(CharacterState::Ko),
        _ => None,
    }
}

/// Maps a [`MovePhase`] to its fixed wire tag (`spec.md` §6).
const fn phase_tag(phase: MovePhase) -> i8 {
    match phase {
        MovePhase::Startup => 0,
        MovePhase::Active => 1,
        MovePhase::Recovery => 2,
    }
}

fn phase_from_tag(tag: i8) -> Option<MovePhase> {
    match tag {
        0 => Some(MovePhase::Startup),
        1 => Some(MovePhase::Active),
        2 => Some(MovePhase::Recovery),
        _ => None,
    }
}

/// Every move the built-in roster can assign; used only for the snapshot's
/// own stable wire tag, independent of [`MoveId`]'s enum discriminant order
/// so that reordering variants in `moves.rs` never silently changes the wire
/// format.
const fn move_tag(id: MoveId) -> u8 {
    match id {
        MoveId::LightPunch => 0,
        MoveId::MediumPunch => 1,
        MoveId::HeavyPunch => 2,
        MoveId::LightKick => 3,
        MoveId::MediumKick => 4,
        MoveId::HeavyKick => 5,
        MoveId::Hadoken => 6,
        MoveId::Shoryuken => 7,
        MoveId::Tatsumaki => 8,
    }
}

fn move_from_tag(tag: u8) -> Option<MoveId> {
    match tag {
        0 => Some(MoveId::LightPunch),
        1 => Some(MoveId::MediumPunch),
        2 => Some(MoveId::HeavyPunch),
        3 => Some(MoveId::LightKick),
        4 => Some(MoveId::MediumKick),
        5 => Some(MoveId::HeavyKick),
        6 => Some(MoveId::Hadoken),
        7 => Some(MoveId::Shoryuken),
        8 => Some(MoveId::Tatsumaki),
        _ => None,
    }
}

fn write_character(out: &mut Vec<u8>, character: &Character) {
    let id_bytes = character.id.as_bytes();
    let id_len = id_bytes.len().min(u8::MAX as usize) as u8;
    out.push(id_len);
    out.extend_from_slice(&id_bytes[..id_len as usize]);
    out.extend_from_slice(&character.health.to_le_bytes());
    out.extend_from_slice(&character.x.to_le_bytes());
    out.extend_from_slice(&character.y.to_le_bytes());
    out.extend_from_slice(&character.z.to_le_bytes());
    out.extend_from_slice(&character.meter.to_le_bytes());
    out.extend_from_slice(&character.guard_meter.to_le_bytes());
    out.push(state_tag(character.state) as u8);
    match character.current_move {
        Some(mv) => {
            out.push(1);
            out.extend_from_slice(&mv.current_frame.to_le_bytes());
            out.push(phase_tag(mv.phase) as u8);
            out.push(move_tag(mv.name));
        }
        None => out.push(0),
    }
    out.extend_from_slice(&character.vx.to_le_bytes());
    out.extend_from_slice(&character.vy.to_le_bytes());
    out.push(character.facing as u8);
    out.push(u8::from(character.airborne));
    out.extend_from_slice(&character.combo_hits.to_le_bytes());
    out.extend_from_slice(&character.combo_damage.to_le_bytes());
    out.extend_from_slice(&character.juggle_points.to_le_bytes());
    out.push(character.armor_hits_remaining);
    out.push(match character.cancel_outcome {
        crate::kernel::state::CancelOutcome::None => 0,
        crate::kernel::state::CancelOutcome::Hit => 1,
        crate::kernel::state::CancelOutcome::Block => 2,
    });
    out.extend_from_slice(&character.can_cancel_until_frame.to_le_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let slice = self.bytes.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn i8(&mut self) -> Option<i8> {
        self.u8().map(|b| b as i8)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> Option<f32> {
        self.take(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn read_character(reader: &mut Reader<'_>, index: usize) -> Result<Character, NetcodeError> {
    let truncated = || {
        NetcodeError::SnapshotDecode(SnapshotDecodeReason::TruncatedCharacter { index })
    };
    let id_len = reader.u8().ok_or_else(truncated)? as usize;
    let id_bytes = reader.take(id_len).ok_or_else(truncated)?;
    let id = String::from_utf8_lossy(id_bytes).into_owned();
    let health = reader.f32().ok_or_else(truncated)?;
    let x = reader.f32().ok_or_else(truncated)?;
    let y = reader.f32().ok_or_else(truncated)?;
    let z = reader.f32().ok_or_else(truncated)?;
    let meter = reader.f32().ok_or_else(truncated)?;
    let guard_meter = reader.f32().ok_or_else(truncated)?;
    let state_byte = reader.u8().ok_or_else(truncated)?;
    let state = state_from_tag(state_byte as i8)
        .ok_or(NetcodeError::SnapshotDecode(SnapshotDecodeReason::UnknownStateTag(state_byte)))?;
    let has_move = reader.u8().ok_or_else(truncated)?;
    let current_move = if has_move != 0 {
        let current_frame = reader.u16().ok_or_else(truncated)?;
        let phase_byte = reader.u8().ok_or_else(truncated)?;
        let phase = phase_from_tag(phase_byte as i8)
            .ok_or(NetcodeError::SnapshotDecode(SnapshotDecodeReason::UnknownPhaseTag(phase_byte)))?;
        let move_byte = reader.u8().ok_or_else(truncated)?;
        let name = move_from_tag(move_byte).unwrap_or(MoveId::LightPunch);
        Some(MoveInstance { name, current_frame, phase })
    } else {
        None
    };
    let vx = reader.f32().ok_or_else(truncated)?;
    let vy = reader.f32().ok_or_else(truncated)?;
    let facing = reader.i8().ok_or_else(truncated)?;
    let airborne = reader.u8().ok_or_else(truncated)? != 0;
    let combo_hits = reader.u32().ok_or_else(truncated)?;
    let combo_damage = reader.f32().ok_or_else(truncated)?;
    let juggle_points = reader.f32().ok_or_else(truncated)?;
    let armor_hits_remaining = reader.u8().ok_or_else(truncated)?;
    let cancel_byte = reader.u8().ok_or_else(truncated)?;
    let cancel_outcome = match cancel_byte {
        1 => crate::kernel::state::CancelOutcome::Hit,
        2 => crate::kernel::state::CancelOutcome::Block,
        _ => crate::kernel::state::CancelOutcome::None,
    };
    let can_cancel_until_frame = reader.u16().ok_or_else(truncated)?;

    let mut character = Character::new(id, x, facing, 1.0);
    character.health = health;
    character.max_health = health.max(1.0);
    character.y = y;
    character.z = z;
    character.meter = meter;
    character.guard_meter = guard_meter;
    character.state = state;
    character.current_move = current_move;
    character.vx = vx;
    character.vy = vy;
    character.airborne = airborne;
    character.combo_hits = combo_hits;
    character.combo_damage = combo_damage;
    character.juggle_points = juggle_points;
    character.armor_hits_remaining = armor_hits_remaining;
    character.cancel_outcome = cancel_outcome;
    character.can_cancel_until_frame = can_cancel_until_frame;
    Ok(character)
}

fn write_timers(out: &mut Vec<u8>, timers: &DeferredTimers) {
    out.extend_from_slice(&timers.guard_regen_at_frame.as_i32().to_le_bytes());
    out.extend_from_slice(&timers.juggle_reset_at_frame.as_i32().to_le_bytes());
    out.extend_from_slice(&timers.combo_reset_at_frame.as_i32().to_le_bytes());
}

fn read_timers(reader: &mut Reader<'_>) -> Option<DeferredTimers> {
    let guard = reader.u32()? as i32;
    let juggle = reader.u32()? as i32;
    let combo = reader.u32()? as i32;
    Some(DeferredTimers {
        guard_regen_at_frame: Frame::new(guard),
        juggle_reset_at_frame: Frame::new(juggle),
        combo_reset_at_frame: Frame::new(combo),
    })
}

fn write_projectile(out: &mut Vec<u8>, projectile: &Projectile) {
    out.push(match projectile.owner {
        Side::P0 => 0,
        Side::P1 => 1,
    });
    out.extend_from_slice(&projectile.x.to_le_bytes());
    out.extend_from_slice(&projectile.y.to_le_bytes());
    out.push(projectile.dir as u8);
    out.extend_from_slice(&projectile.speed.to_le_bytes());
    out.extend_from_slice(&projectile.damage.to_le_bytes());
    out.extend_from_slice(&projectile.lifetime.to_le_bytes());
}

fn read_projectile(reader: &mut Reader<'_>) -> Option<Projectile> {
    let owner = if reader.u8()? == 0 { Side::P0 } else { Side::P1 };
    let x = reader.f32()?;
    let y = reader.f32()?;
    let dir = reader.i8()?;
    let speed = reader.f32()?;
    let damage = reader.f32()?;
    let lifetime = reader.u16()?;
    Some(Projectile { owner, x, y, dir, speed, damage, lifetime })
}

/// Encodes `state` into its dense little-endian binary form.
#[must_use]
pub fn save(state: &SimState) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    out.extend_from_slice(&state.frame.as_i32().to_le_bytes());
    out.extend_from_slice(&state.hitstop.to_le_bytes());
    out.push(2);
    write_character(&mut out, &state.p0);
    write_character(&mut out, &state.p1);
    write_timers(&mut out, &state.timers[0]);
    write_timers(&mut out, &state.timers[1]);
    let projectile_count = state.projectiles.len().min(u8::MAX as usize) as u8;
    out.push(projectile_count);
    for projectile in state.projectiles.iter().take(projectile_count as usize) {
        write_projectile(&mut out, projectile);
    }
    out
}

/// Decodes a binary blob produced by [`save`] back into a [`SimState`].
///
/// The decoded state's `timeline` is always empty: the timeline is an
/// observation channel for the frame just stepped, not part of the
/// resumable simulation state (`spec.md` §3 "optional timeline ... consumed
/// by external observers").
pub fn load(bytes: &[u8]) -> Result<SimState, NetcodeError> {
    let mut reader = Reader::new(bytes);
    let header_len = 4 + 2 + 1;
    if bytes.len() < header_len {
        return Err(NetcodeError::SnapshotDecode(SnapshotDecodeReason::TruncatedHeader {
            got: bytes.len(),
            want: header_len,
        }));
    }
    let frame = reader.u32().unwrap() as i32;
    let hitstop = reader.u16().unwrap();
    let count = reader.u8().unwrap();
    if count != 2 {
        return Err(NetcodeError::SnapshotDecode(SnapshotDecodeReason::TooManyCharacters(count)));
    }
    let p0 = read_character(&mut reader, 0)?;
    let p1 = read_character(&mut reader, 1)?;
    let truncated_timers = || {
        NetcodeError::SnapshotDecode(SnapshotDecodeReason::TruncatedCharacter { index: 2 })
    };
    let timers0 = read_timers(&mut reader).ok_or_else(truncated_timers)?;
    let timers1 = read_timers(&mut reader).ok_or_else(truncated_timers)?;
    let projectile_count = reader.u8().ok_or_else(truncated_timers)?;
    let mut projectiles = Vec::with_capacity(projectile_count as usize);
    for _ in 0..projectile_count {
        projectiles.push(read_projectile(&mut reader).ok_or_else(truncated_timers)?);
    }

    Ok(SimState {
        frame: Frame::new(frame),
        hitstop,
        p0,
        p1,
        timers: [timers0, timers1],
        projectiles,
        timeline: Vec::new(),
    })
}

/// Computes the 32-bit FNV-1a checksum of an already-encoded snapshot.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Convenience wrapper returning `(frame, checksum, bytes)` for a state, the
/// shape `spec.md` §4.2's `save` operation names.
#[must_use]
pub fn save_with_checksum(state: &SimState) -> (Frame, u32, Vec<u8>) {
    let bytes = save(state);
    let sum = checksum(&bytes);
    (state.frame, sum, bytes)
}

#[cfg(feature = "json")]
/// Encodes `state` as a JSON [`SnapshotBlob::Json`] fallback form.
pub fn save_json(state: &SimState) -> Result<SnapshotBlob, NetcodeError> {
    serde_json::to_string(state)
        .map(SnapshotBlob::Json)
        .map_err(|_| NetcodeError::SnapshotDecode(SnapshotDecodeReason::InvalidJson))
}

#[cfg(feature = "json")]
/// Decodes a [`SnapshotBlob::Json`] back into a [`SimState`].
pub fn load_json(json: &str) -> Result<SimState, NetcodeError> {
    serde_json::from_str(json)
        .map_err(|_| NetcodeError::SnapshotDecode(SnapshotDecodeReason::InvalidJson))
}
