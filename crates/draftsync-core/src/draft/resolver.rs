// Maps a free-text external player name (plus optional position) onto a
// registry entry.

use super::player::{Player, PlayerId};
use super::registry::Registry;

/// Resolve an external name to a player id.
///
/// Rules, first match wins, each scanned in rank order:
/// 1. exact name (case-insensitive) and matching position
/// 2. exact name, any position
/// 3. last name token contained in the player's name, and matching position
///
/// An absent or blank position matches every player. Rule 3 may pick a
/// same-surname player when several qualify; the first in rank order wins.
pub fn resolve(registry: &Registry, full_name: &str, position: Option<&str>) -> Option<PlayerId> {
    let name = full_name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    let position = position.map(str::trim).filter(|p| !p.is_empty());
    let position_ok = |p: &Player| {
        position.map_or(true, |wanted| p.position.display_str().eq_ignore_ascii_case(wanted))
    };

    if let Some(p) = registry
        .iter()
        .find(|p| p.name.to_lowercase() == name && position_ok(p))
    {
        return Some(p.id);
    }

    if let Some(p) = registry.iter().find(|p| p.name.to_lowercase() == name) {
        return Some(p.id);
    }

    let last = name.split_whitespace().last()?;
    registry
        .iter()
        .find(|p| p.name.to_lowercase().contains(last) && position_ok(p))
        .map(|p| p.id)
}
