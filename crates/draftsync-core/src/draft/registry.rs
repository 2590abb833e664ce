// Canonical player set, kept in rank order.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::player::{Candidate, Player, PlayerId, Position, Tag};
use super::teams;

/// Serialized registry state handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub players: Vec<Player>,
    pub next_id: PlayerId,
}

/// Board-wide counters for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DraftStats {
    pub total: usize,
    pub drafted: usize,
    pub available: usize,
    pub my_man_total: usize,
    pub my_man_available: usize,
}

/// The player board.
///
/// `players[i].rank == i + 1` holds after every public operation, so
/// iteration is always ascending rank and ranks stay dense.
#[derive(Debug, Clone)]
pub struct Registry {
    players: Vec<Player>,
    next_id: PlayerId,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            players: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild from a persisted snapshot. Players are sorted by their stored
    /// rank (ties broken by id) and renumbered, so a damaged snapshot still
    /// produces a dense board. Duplicate ids keep their first occurrence.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let mut registry = Registry::new();
        registry.replace(snapshot.players, snapshot.next_id);
        registry
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            players: self.players.clone(),
            next_id: self.next_id,
        }
    }

    /// Swap in a whole new board. `next_id` never moves backwards and always
    /// clears every id on the board.
    pub fn replace(&mut self, mut players: Vec<Player>, next_id: PlayerId) {
        players.sort_by_key(|p| (p.rank, p.id));

        let mut seen = std::collections::HashSet::new();
        players.retain(|p| {
            let fresh = seen.insert(p.id);
            if !fresh {
                warn!("Dropping duplicate player id {} ({})", p.id, p.name);
            }
            fresh
        });

        let max_id = players.iter().map(|p| p.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(next_id).max(max_id + 1);
        self.players = players;
        self.renumber();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in ascending rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn next_id(&self) -> PlayerId {
        self.next_id
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// Zero-based position of `id` in rank order.
    pub fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// First player with this name (case-insensitive) at this position.
    pub fn find_identity(&self, name: &str, position: Position) -> Option<&Player> {
        self.players.iter().find(|p| p.same_identity(name, position))
    }

    /// Append at the bottom of the board.
    pub fn push_back(&mut self, candidate: Candidate) -> PlayerId {
        let index = self.players.len();
        self.place(candidate, index)
    }

    /// Insert a new player at a zero-based index, assigning the next id.
    /// Everything at or below the index moves down one rank.
    pub(crate) fn place(&mut self, candidate: Candidate, index: usize) -> PlayerId {
        let id = self.next_id;
        self.next_id += 1;
        let index = index.min(self.players.len());
        self.players.insert(index, candidate.into_player(id, 0));
        self.renumber();
        id
    }

    /// Move the player at `from` to `to` (both zero-based, `to` measured
    /// after removal) and renumber.
    pub(crate) fn move_index(&mut self, from: usize, to: usize) {
        let player = self.players.remove(from);
        let to = to.min(self.players.len());
        self.players.insert(to, player);
        self.renumber();
    }

    fn renumber(&mut self) {
        for (idx, player) in self.players.iter_mut().enumerate() {
            player.rank = idx as u32 + 1;
        }
    }

    /// True when ranks are exactly `1..=N` in iteration order.
    pub fn is_dense(&self) -> bool {
        self.players
            .iter()
            .enumerate()
            .all(|(idx, p)| p.rank as usize == idx + 1)
    }

    /// Filtered, rank-ordered view. Never mutates.
    ///
    /// The query matches name, team code, position, or the team's full name,
    /// ignoring case.
    pub fn display_list(&self, position: Option<Position>, query: Option<&str>) -> Vec<&Player> {
        let query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.players
            .iter()
            .filter(|p| position.map_or(true, |pos| p.position == pos))
            .filter(|p| match &query {
                None => true,
                Some(q) => {
                    p.name.to_lowercase().contains(q.as_str())
                        || p.team.to_lowercase().contains(q.as_str())
                        || p.position.display_str().to_lowercase().contains(q.as_str())
                        || teams::full_name(&p.team).is_some_and(|full| full.contains(q.as_str()))
                }
            })
            .collect()
    }

    /// Clear every draft result while keeping ranks and tags.
    pub fn reset_draft(&mut self) {
        for player in &mut self.players {
            player.clear_draft();
        }
    }

    pub fn stats(&self) -> DraftStats {
        let drafted = self.players.iter().filter(|p| p.is_drafted).count();
        let my_man: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.has_tag(Tag::MyMan))
            .collect();
        DraftStats {
            total: self.players.len(),
            drafted,
            available: self.players.len() - drafted,
            my_man_total: my_man.len(),
            my_man_available: my_man.iter().filter(|p| !p.is_drafted).count(),
        }
    }
}
