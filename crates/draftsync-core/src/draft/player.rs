// Player record, positions, and user tags.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::teams;

pub type PlayerId = u32;

/// Football positions tracked on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "DST")]
    Defense,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Kicker,
        Position::Defense,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Accepts the platform spellings seen in draft feeds:
    /// - "DEF", "D/ST", "DST" -> Defense
    /// - "PK", "K" -> Kicker
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DST" | "DEF" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// User-applied labels. A player carries each tag at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "My Man")]
    MyMan,
    Breakout,
    Bust,
    Sleeper,
    Value,
    #[serde(rename = "Injury Prone")]
    InjuryProne,
    Rookie,
}

impl Tag {
    pub const ALL: [Tag; 7] = [
        Tag::MyMan,
        Tag::Breakout,
        Tag::Bust,
        Tag::Sleeper,
        Tag::Value,
        Tag::InjuryProne,
        Tag::Rookie,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tag::MyMan => "My Man",
            Tag::Breakout => "Breakout",
            Tag::Bust => "Bust",
            Tag::Sleeper => "Sleeper",
            Tag::Value => "Value",
            Tag::InjuryProne => "Injury Prone",
            Tag::Rookie => "Rookie",
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Tag::MyMan => "MM",
            Tag::Breakout => "BK",
            Tag::Bust => "BS",
            Tag::Sleeper => "SLP",
            Tag::Value => "VAL",
            Tag::InjuryProne => "INJ",
            Tag::Rookie => "RK",
        }
    }

    /// Match a tag by label or short code, ignoring case and spacing.
    pub fn from_str_tag(s: &str) -> Option<Self> {
        let wanted: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Tag::ALL.into_iter().find(|tag| {
            let label: String = tag.label().chars().filter(|c| !c.is_whitespace()).collect();
            label.eq_ignore_ascii_case(&wanted) || tag.short().eq_ignore_ascii_case(&wanted)
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One draftable entity on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub rank: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub is_drafted: bool,
    #[serde(default)]
    pub draft_pick: Option<u32>,
    #[serde(default)]
    pub drafted_by: Option<String>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default)]
    pub bye_week: Option<u8>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl Player {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Add the tag if missing, remove it if present. Returns whether the
    /// player carries the tag afterwards.
    pub fn toggle_tag(&mut self, tag: Tag) -> bool {
        if let Some(idx) = self.tags.iter().position(|t| *t == tag) {
            self.tags.remove(idx);
            false
        } else {
            self.tags.push(tag);
            true
        }
    }

    /// Undo a draft: both result fields go back to `None`.
    pub fn clear_draft(&mut self) {
        self.is_drafted = false;
        self.draft_pick = None;
        self.drafted_by = None;
    }

    /// Bye week from the metadata feed, falling back to the static table.
    pub fn bye(&self) -> Option<u8> {
        self.bye_week.or_else(|| teams::bye_week(&self.team))
    }

    /// Case-insensitive name + exact position identity used by import and
    /// metadata refresh.
    pub fn same_identity(&self, name: &str, position: Position) -> bool {
        self.position == position && self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// A player that has not been placed on the board yet. The registry assigns
/// its id and the ranking engine its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub injury_status: Option<String>,
    pub bye_week: Option<u8>,
    pub external_id: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, team: impl Into<String>, position: Position) -> Self {
        Candidate {
            name: name.into(),
            team: team.into(),
            position,
            injury_status: None,
            bye_week: None,
            external_id: None,
        }
    }

    pub(crate) fn into_player(self, id: PlayerId, rank: u32) -> Player {
        Player {
            id,
            name: self.name,
            team: self.team,
            position: self.position,
            rank,
            tags: Vec::new(),
            is_drafted: false,
            draft_pick: None,
            drafted_by: None,
            injury_status: self.injury_status,
            bye_week: self.bye_week,
            external_id: self.external_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Player {
        Candidate::new("Josh Allen", "BUF", Position::Quarterback).into_player(1, 1)
    }

    #[test]
    fn position_parses_platform_spellings() {
        assert_eq!(Position::from_str_pos("qb"), Some(Position::Quarterback));
        assert_eq!(Position::from_str_pos("DEF"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos("D/ST"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos(" PK "), Some(Position::Kicker));
        assert_eq!(Position::from_str_pos("SS"), None);
        assert_eq!(Position::from_str_pos(""), None);
    }

    #[test]
    fn position_serializes_as_code() {
        let json = serde_json::to_string(&Position::Defense).unwrap();
        assert_eq!(json, "\"DST\"");
        let back: Position = serde_json::from_str("\"WR\"").unwrap();
        assert_eq!(back, Position::WideReceiver);
    }

    #[test]
    fn tag_lookup_accepts_label_or_short_code() {
        assert_eq!(Tag::from_str_tag("my man"), Some(Tag::MyMan));
        assert_eq!(Tag::from_str_tag("MyMan"), Some(Tag::MyMan));
        assert_eq!(Tag::from_str_tag("inj"), Some(Tag::InjuryProne));
        assert_eq!(Tag::from_str_tag("slp"), Some(Tag::Sleeper));
        assert_eq!(Tag::from_str_tag("legend"), None);
    }

    #[test]
    fn toggle_tag_never_duplicates() {
        let mut p = sample();
        assert!(p.toggle_tag(Tag::Value));
        assert!(!p.toggle_tag(Tag::Value));
        assert!(p.tags.is_empty());
        p.toggle_tag(Tag::Rookie);
        p.toggle_tag(Tag::Bust);
        assert_eq!(p.tags, vec![Tag::Rookie, Tag::Bust]);
    }

    #[test]
    fn clear_draft_resets_result_fields() {
        let mut p = sample();
        p.is_drafted = true;
        p.draft_pick = Some(4);
        p.drafted_by = Some("team-a".into());
        p.clear_draft();
        assert!(!p.is_drafted);
        assert_eq!(p.draft_pick, None);
        assert_eq!(p.drafted_by, None);
    }

    #[test]
    fn bye_falls_back_to_team_table() {
        let mut p = sample();
        assert_eq!(p.bye(), Some(9));
        p.bye_week = Some(7);
        assert_eq!(p.bye(), Some(7));
        p.bye_week = None;
        p.team = "FA".into();
        assert_eq!(p.bye(), None);
    }

    #[test]
    fn snapshot_missing_optional_fields_deserializes() {
        let json = r#"{"id":3,"name":"Bo Nix","team":"DEN","position":"QB","rank":2}"#;
        let p: Player = serde_json::from_str(json).unwrap();
        assert_eq!(p.position, Position::Quarterback);
        assert!(p.tags.is_empty());
        assert!(!p.is_drafted);
    }
}
