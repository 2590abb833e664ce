// Line-oriented console front end.
//
// Reads commands from stdin, translates them into UserCommand messages for
// the orchestrator, and prints every UiUpdate it receives. CSV import and
// export touch the filesystem here so the orchestrator only sees rows.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use draftsync_core::draft::player::{Player, Position, Tag};
use draftsync_core::draft::rows::{read_csv_rows, write_csv_rows};
use draftsync_core::protocol::{UiUpdate, UserCommand};
use draftsync_core::sources::{ConnectParams, Platform};
use draftsync_core::supervisor::{ConnectionState, ConnectionStatus};

pub const HELP: &str = "\
Commands:
  connect <sleeper|espn|yahoo|nfl|manual> [id] [season]
  disconnect | status
  list [POS] [search...]       show the board (POS: QB RB WR TE K DST)
  move <id> <rank>             move a player to a rank
  rank <id> <rank>             set a typed rank (clamped)
  drag <id> <target-id>        move a player onto another player's rank
  draft <id>                   toggle drafted
  tag <id> <tag>               toggle a tag (My Man, Breakout, Bust, ...)
  add <POS> <team|-> <rank|-> <name...>
  import <file.csv> | export <file.csv>
  reset                        clear draft results, keep ranks and tags
  slots | save <n> | load <n> | clear <n> | rename <n> <name...>
  refresh [force] | stats | picks | help | quit";

/// What a typed line turned into.
#[derive(Debug, PartialEq)]
pub enum Action {
    Send(UserCommand),
    /// Read rows from this CSV file and send them for import.
    Import(PathBuf),
    /// Ask for export rows and write them to this file when they arrive.
    Export(PathBuf),
    Help,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {what}"))?;
    arg.parse()
        .map_err(|_| format!("{what} must be a number, got {arg:?}"))
}

/// Slots are numbered from 1 on the console.
fn parse_slot(arg: Option<&str>) -> Result<usize, String> {
    let n: usize = parse_number(arg, "slot number")?;
    n.checked_sub(1).ok_or_else(|| "slot numbers start at 1".to_string())
}

fn rest(words: &[&str], from: usize) -> String {
    words.get(from..).unwrap_or_default().join(" ")
}

/// Parse one input line. Blank lines give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Action>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };
    let arg = |i: usize| args.get(i).copied();

    let cmd = match head.to_lowercase().as_str() {
        "connect" => {
            let platform = arg(0).ok_or("missing platform")?;
            let platform = Platform::from_str_platform(platform)
                .ok_or_else(|| format!("unknown platform {platform:?}"))?;
            let mut params = ConnectParams::new(arg(1).unwrap_or_default());
            if let Some(season) = arg(2) {
                params = params.with_season(season);
            }
            UserCommand::Connect { platform, params }
        }
        "disconnect" => UserCommand::Disconnect,
        "status" => UserCommand::GetConnectionState,
        "list" | "ls" => {
            let position = arg(0).and_then(Position::from_str_pos);
            let query_start = usize::from(position.is_some());
            let query = rest(args, query_start);
            UserCommand::DisplayList {
                position,
                query: (!query.is_empty()).then_some(query),
            }
        }
        "move" => UserCommand::Reorder {
            player_id: parse_number(arg(0), "player id")?,
            target_rank: parse_number(arg(1), "rank")?,
        },
        "rank" => UserCommand::SetRank {
            player_id: parse_number(arg(0), "player id")?,
            rank: parse_number(arg(1), "rank")?,
        },
        "drag" => UserCommand::DragOnto {
            player_id: parse_number(arg(0), "player id")?,
            target_id: parse_number(arg(1), "target id")?,
        },
        "draft" => UserCommand::ToggleDrafted(parse_number(arg(0), "player id")?),
        "tag" => {
            let player_id = parse_number(arg(0), "player id")?;
            let label = rest(args, 1);
            let tag =
                Tag::from_str_tag(&label).ok_or_else(|| format!("unknown tag {label:?}"))?;
            UserCommand::ToggleTag(player_id, tag)
        }
        "add" => {
            let position = arg(0).ok_or("missing position")?;
            let position = Position::from_str_pos(position)
                .ok_or_else(|| format!("unknown position {position:?}"))?;
            let team = match arg(1).ok_or("missing team")? {
                "-" => String::new(),
                team => team.to_string(),
            };
            let rank = match arg(2).ok_or("missing rank")? {
                "-" => None,
                r => Some(parse_number(Some(r), "rank")?),
            };
            UserCommand::AddPlayer {
                name: rest(args, 3),
                team,
                position,
                rank,
            }
        }
        "import" => {
            let path = arg(0).ok_or("missing file path")?;
            return Ok(Some(Action::Import(PathBuf::from(path))));
        }
        "export" => {
            let path = arg(0).ok_or("missing file path")?;
            return Ok(Some(Action::Export(PathBuf::from(path))));
        }
        "reset" => UserCommand::ResetDraft,
        "slots" => UserCommand::ListSlots,
        "save" => UserCommand::SaveSlot(parse_slot(arg(0))?),
        "load" => UserCommand::LoadSlot(parse_slot(arg(0))?),
        "clear" => UserCommand::ClearSlot(parse_slot(arg(0))?),
        "rename" => UserCommand::RenameSlot(parse_slot(arg(0))?, rest(args, 1)),
        "refresh" => UserCommand::RefreshPlayers {
            force: arg(0) == Some("force"),
        },
        "stats" => UserCommand::Stats,
        "picks" => UserCommand::RecentPicks,
        "help" | "?" => return Ok(Some(Action::Help)),
        "quit" | "exit" | "q" => UserCommand::Quit,
        other => return Err(format!("unknown command {other:?}; try `help`")),
    };
    Ok(Some(Action::Send(cmd)))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_player(p: &Player) -> String {
    let tags: Vec<&str> = p.tags.iter().map(|t| t.short()).collect();
    let mut line = format!(
        "{:>4}. {:<26} {:<4} {:<3} #{}",
        p.rank,
        p.name,
        p.team,
        p.position.display_str(),
        p.id
    );
    if let Some(bye) = p.bye() {
        line.push_str(&format!(" bye {bye}"));
    }
    if !tags.is_empty() {
        line.push_str(&format!(" [{}]", tags.join(",")));
    }
    if let Some(injury) = &p.injury_status {
        line.push_str(&format!(" ({injury})"));
    }
    if p.is_drafted {
        line.push_str(" DRAFTED");
        if let Some(pick) = p.draft_pick {
            line.push_str(&format!(" @{pick}"));
        }
        if let Some(by) = &p.drafted_by {
            line.push_str(&format!(" by {by}"));
        }
    }
    line
}

fn render_status(status: &ConnectionStatus) -> String {
    let state = match &status.state {
        ConnectionState::Disconnected => "disconnected".to_string(),
        ConnectionState::Connecting => "connecting".to_string(),
        ConnectionState::Polling => "polling".to_string(),
        ConnectionState::Streaming => "streaming".to_string(),
        ConnectionState::Error { reason } => format!("error: {reason}"),
    };
    let mut line = format!("Connection: {state}");
    if let Some(label) = &status.label {
        line.push_str(&format!(" | {label}"));
    }
    if status.picks_seen > 0 {
        line.push_str(&format!(" | {} picks", status.picks_seen));
    }
    if let Some(at) = status.last_updated {
        line.push_str(&format!(
            " | updated {}",
            at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ));
    }
    line
}

/// Text shown for an update. `Exported` is handled by the caller.
pub fn render(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Connection(status) => render_status(status),
        UiUpdate::DisplayList(players) if players.is_empty() => "No players match.".into(),
        UiUpdate::DisplayList(players) => players
            .iter()
            .map(render_player)
            .collect::<Vec<_>>()
            .join("\n"),
        UiUpdate::RankChanged {
            player_id,
            rank,
            moved,
        } => {
            if *moved {
                format!("Player #{player_id} is now rank {rank}")
            } else {
                format!("Player #{player_id} stays at rank {rank}")
            }
        }
        UiUpdate::DraftToggled { player_id, drafted } => {
            let verb = if *drafted { "drafted" } else { "available" };
            format!("Player #{player_id} marked {verb}")
        }
        UiUpdate::TagToggled {
            player_id,
            tag,
            active,
        } => {
            let verb = if *active { "added to" } else { "removed from" };
            format!("{tag} {verb} player #{player_id}")
        }
        UiUpdate::PlayerAdded { player_id, rank } => {
            format!("Added player #{player_id} at rank {rank}")
        }
        UiUpdate::PicksApplied { applied, matched } => {
            format!("{applied} new picks, {matched} matched to the board")
        }
        UiUpdate::RecentPicks(entries) if entries.is_empty() => "No picks yet.".into(),
        UiUpdate::RecentPicks(entries) => entries
            .iter()
            .map(|e| {
                let pick = e.pick.map(|p| format!("#{p} ")).unwrap_or_default();
                let pos = e.position.as_deref().unwrap_or("-");
                let team = e.team.as_deref().unwrap_or("-");
                let marker = if e.matched.is_some() { "" } else { " (not on board)" };
                format!("{pick}{} {pos} {team}{marker}", e.name)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        UiUpdate::Imported(summary) => format!(
            "Imported {} players ({} rows skipped)",
            summary.accepted, summary.rejected
        ),
        UiUpdate::Exported(rows) => format!("Exported {} players", rows.len().saturating_sub(1)),
        UiUpdate::Slots(slots) => slots
            .iter()
            .map(|s| match (s.player_count, s.saved_at) {
                (Some(count), Some(at)) => format!(
                    "{}. {} ({count} players, saved {})",
                    s.index + 1,
                    s.name,
                    at.with_timezone(&chrono::Local).format("%b %d %H:%M")
                ),
                _ => format!("{}. {} (empty)", s.index + 1, s.name),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        UiUpdate::Stats(stats) => format!(
            "{} players: {} drafted, {} available | My Man {}/{} available",
            stats.total,
            stats.drafted,
            stats.available,
            stats.my_man_available,
            stats.my_man_total
        ),
        UiUpdate::RefreshComplete(summary) => format!(
            "Player data refreshed ({:?}): {} updated, {} added",
            summary.source, summary.updated, summary.added
        ),
        UiUpdate::Notice(text) => text.clone(),
        UiUpdate::Error(e) => format!("Error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

fn read_import(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_csv_rows(file)
}

fn write_export(path: &Path, rows: &[Vec<String>]) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv_rows(file, rows)
}

/// File reads and writes run on the blocking pool, off the console task.
async fn load_import(path: PathBuf) -> anyhow::Result<Vec<Vec<String>>> {
    tokio::task::spawn_blocking(move || read_import(&path))
        .await
        .context("import task failed")?
}

async fn save_export(path: PathBuf, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || write_export(&path, &rows))
        .await
        .context("export task failed")?
}

/// Run the console until the user quits, stdin closes, or the orchestrator
/// stops.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_export: Option<PathBuf> = None;

    println!("draftsync ready. Type `help` for commands.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Action::Help)) => println!("{HELP}"),
                    Ok(Some(Action::Import(path))) => match load_import(path).await {
                        Ok(rows) => {
                            if cmd_tx.send(UserCommand::ImportRows(rows)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => println!("Import failed: {e:#}"),
                    },
                    Ok(Some(Action::Export(path))) => {
                        pending_export = Some(path);
                        if cmd_tx.send(UserCommand::ExportRows).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Action::Send(cmd))) => {
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }

            update = ui_rx.recv() => {
                let Some(update) = update else {
                    info!("Orchestrator stopped; closing console");
                    break;
                };
                if let UiUpdate::Exported(rows) = &update {
                    if let Some(path) = pending_export.take() {
                        if let Err(e) = save_export(path, rows.clone()).await {
                            warn!("Export failed: {e:#}");
                            println!("Export failed: {e:#}");
                            continue;
                        }
                    }
                }
                println!("{}", render(&update));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(line: &str) -> UserCommand {
        match parse_line(line) {
            Ok(Some(Action::Send(cmd))) => cmd,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn connect_with_season() {
        assert_eq!(
            send("connect espn 12345 2024"),
            UserCommand::Connect {
                platform: Platform::Espn,
                params: ConnectParams::new("12345").with_season("2024"),
            }
        );
    }

    #[test]
    fn manual_connect_needs_no_id() {
        assert_eq!(
            send("connect manual"),
            UserCommand::Connect {
                platform: Platform::Manual,
                params: ConnectParams::new(""),
            }
        );
    }

    #[test]
    fn list_with_position_and_query() {
        assert_eq!(
            send("list wr st brown"),
            UserCommand::DisplayList {
                position: Some(Position::WideReceiver),
                query: Some("st brown".into()),
            }
        );
        assert_eq!(
            send("list"),
            UserCommand::DisplayList {
                position: None,
                query: None,
            }
        );
    }

    #[test]
    fn multi_word_tag() {
        assert_eq!(send("tag 7 my man"), UserCommand::ToggleTag(7, Tag::MyMan));
        assert!(parse_line("tag 7 superstar").is_err());
    }

    #[test]
    fn add_with_defaults() {
        assert_eq!(
            send("add TE - - Colston Loveland"),
            UserCommand::AddPlayer {
                name: "Colston Loveland".into(),
                team: String::new(),
                position: Position::TightEnd,
                rank: None,
            }
        );
    }

    #[test]
    fn slots_are_one_based() {
        assert_eq!(send("save 1"), UserCommand::SaveSlot(0));
        assert_eq!(send("rename 3 Late QB"), UserCommand::RenameSlot(2, "Late QB".into()));
        assert!(parse_line("load 0").is_err());
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = parse_line("move abc 3").unwrap_err();
        assert!(err.contains("player id"));
    }

    #[test]
    fn export_defers_to_file() {
        assert_eq!(
            parse_line("export board.csv"),
            Ok(Some(Action::Export(PathBuf::from("board.csv"))))
        );
    }

    #[test]
    fn import_defers_to_file() {
        assert_eq!(
            parse_line("import ranks.csv"),
            Ok(Some(Action::Import(PathBuf::from("ranks.csv"))))
        );
        assert!(parse_line("import").is_err());
    }

    #[tokio::test]
    async fn import_and_export_files_off_the_console_task() {
        let dir = std::env::temp_dir().join("draftsync_console_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("board.csv");

        let rows = vec![
            vec!["Rank".to_string(), "Name".into(), "Team".into(), "Pos".into()],
            vec!["1".to_string(), "Josh Allen".into(), "BUF".into(), "QB".into()],
        ];
        save_export(path.clone(), rows.clone()).await.unwrap();
        assert_eq!(load_import(path).await.unwrap(), rows);

        let missing = load_import(dir.join("missing.csv")).await.unwrap_err();
        assert!(format!("{missing:#}").contains("cannot open"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn render_error_status() {
        let status = ConnectionStatus {
            state: ConnectionState::Error {
                reason: "draft not found".into(),
            },
            platform: Some(Platform::Sleeper),
            label: None,
            last_updated: None,
            updated_at: None,
            picks_seen: 0,
        };
        assert_eq!(
            render(&UiUpdate::Connection(status)),
            "Connection: error: draft not found"
        );
    }
}
