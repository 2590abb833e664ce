// Bulk row import/export of the ranking board, plus CSV file helpers.

use std::io::{Read, Write};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use super::player::{Player, Position};
use super::registry::Registry;
use super::teams::FREE_AGENT;
use crate::error::{Result, SyncError};

pub const EXPORT_HEADER: [&str; 6] = ["Rank", "Name", "Team", "Position", "Tags", "Status"];

/// Counts reported back after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Parse one row as `Name,Team,Pos` or `Rank,Name,Team,Pos`.
fn parse_row(row: &[String]) -> Option<(String, String, Position)> {
    let cells: Vec<&str> = row.iter().map(|c| c.trim()).collect();
    if cells.len() < 3 {
        return None;
    }
    let (name, team, pos) = if cells.len() >= 4 && cells[0].chars().all(|c| c.is_ascii_digit()) && !cells[0].is_empty() {
        (cells[1], cells[2], cells[3])
    } else {
        (cells[0], cells[1], cells[2])
    };
    if name.is_empty() {
        return None;
    }
    let position = Position::from_str_pos(pos)?;
    let team = if team.is_empty() {
        FREE_AGENT.to_string()
    } else {
        team.to_uppercase()
    };
    Some((name.to_string(), team, position))
}

fn is_header(row: &[String]) -> bool {
    row.iter().any(|cell| cell.to_lowercase().contains("name"))
}

/// Replace the board with the given rows, in row order.
///
/// A row whose name and position match an existing player keeps that
/// player's id, tags, draft state, and feed metadata. Rows with too few
/// cells, no name, or an unknown position are rejected. If nothing is
/// accepted the board is left untouched and a validation error returned.
pub fn import_from_rows(registry: &mut Registry, rows: &[Vec<String>]) -> Result<ImportSummary> {
    let body = match rows.first() {
        Some(first) if is_header(first) => &rows[1..],
        _ => rows,
    };

    let mut next_id = registry.next_id();
    let mut used_ids = std::collections::HashSet::new();
    let mut players: Vec<Player> = Vec::new();
    let mut rejected = 0;

    for row in body {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let Some((name, team, position)) = parse_row(row) else {
            warn!("Rejected import row: {:?}", row);
            rejected += 1;
            continue;
        };

        let rank = players.len() as u32 + 1;
        let existing = registry
            .find_identity(&name, position)
            .filter(|p| !used_ids.contains(&p.id));
        let player = match existing {
            Some(prev) => Player {
                name,
                team,
                rank,
                ..prev.clone()
            },
            None => {
                let id = next_id;
                next_id += 1;
                Player {
                    id,
                    name,
                    team,
                    position,
                    rank,
                    tags: Vec::new(),
                    is_drafted: false,
                    draft_pick: None,
                    drafted_by: None,
                    injury_status: None,
                    bye_week: None,
                    external_id: None,
                }
            }
        };
        used_ids.insert(player.id);
        players.push(player);
    }

    if players.is_empty() {
        return Err(SyncError::validation("rows", "no valid players found in import data"));
    }

    let accepted = players.len();
    registry.replace(players, next_id);
    info!("Imported {} players ({} rows rejected)", accepted, rejected);
    Ok(ImportSummary { accepted, rejected })
}

/// Header row followed by one row per player in rank order.
pub fn export_rows(registry: &Registry) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(registry.len() + 1);
    rows.push(EXPORT_HEADER.iter().map(|h| h.to_string()).collect());
    for p in registry.iter() {
        let tags: Vec<&str> = p.tags.iter().map(|t| t.label()).collect();
        rows.push(vec![
            p.rank.to_string(),
            p.name.clone(),
            p.team.clone(),
            p.position.display_str().to_string(),
            tags.join("|"),
            if p.is_drafted { "drafted" } else { "available" }.to_string(),
        ]);
    }
    rows
}

/// Read every record of a CSV source as raw rows. Ragged rows are allowed.
pub fn read_csv_rows<R: Read>(reader: R) -> anyhow::Result<Vec<Vec<String>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV record {}", idx + 1))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub fn write_csv_rows<W: Write>(writer: W, rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in rows {
        csv_writer.write_record(row).context("failed to write CSV record")?;
    }
    csv_writer.flush().context("failed to flush CSV output")?;
    Ok(())
}
