// User ranking operations. Every positional change goes through `reorder`
// (existing players) or `insert_at` (new players).

use super::player::{Candidate, PlayerId};
use super::registry::Registry;
use crate::error::{Result, SyncError};

fn unknown(player_id: PlayerId) -> SyncError {
    SyncError::NotFound(format!("player {player_id}"))
}

/// Move a player so it holds `target_rank`, clamped to `[1, N]`.
///
/// Returns `Ok(false)` when the clamped target equals the current rank.
pub fn reorder(registry: &mut Registry, player_id: PlayerId, target_rank: u32) -> Result<bool> {
    let from = registry.index_of(player_id).ok_or_else(|| unknown(player_id))?;
    let n = registry.len() as u32;
    let target = target_rank.clamp(1, n);
    if target as usize == from + 1 {
        return Ok(false);
    }
    registry.move_index(from, target as usize - 1);
    Ok(true)
}

/// "Set rank to N" edit.
pub fn set_rank_by_typing(registry: &mut Registry, player_id: PlayerId, rank: u32) -> Result<bool> {
    reorder(registry, player_id, rank)
}

/// Drop one row onto another: the dragged player takes the target's rank.
pub fn drag_onto(registry: &mut Registry, player_id: PlayerId, target_id: PlayerId) -> Result<bool> {
    let target_rank = registry
        .get(target_id)
        .map(|p| p.rank)
        .ok_or_else(|| unknown(target_id))?;
    reorder(registry, player_id, target_rank)
}

/// Insert a new player at `desired_rank` (clamped to `[1, N + 1]`), moving
/// everyone at or below that rank down by one.
pub fn insert_at(registry: &mut Registry, candidate: Candidate, desired_rank: u32) -> PlayerId {
    let max = registry.len() as u32 + 1;
    let rank = desired_rank.clamp(1, max);
    registry.place(candidate, rank as usize - 1)
}

pub fn append(registry: &mut Registry, candidate: Candidate) -> PlayerId {
    registry.push_back(candidate)
}
