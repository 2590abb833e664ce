// Static NFL team tables: full names for search and fallback bye weeks.

/// (code, lowercase full name, bye week)
const TEAMS: &[(&str, &str, u8)] = &[
    ("ARI", "arizona cardinals", 5),
    ("ATL", "atlanta falcons", 8),
    ("BAL", "baltimore ravens", 8),
    ("BUF", "buffalo bills", 9),
    ("CAR", "carolina panthers", 10),
    ("CHI", "chicago bears", 5),
    ("CIN", "cincinnati bengals", 8),
    ("CLE", "cleveland browns", 7),
    ("DAL", "dallas cowboys", 5),
    ("DEN", "denver broncos", 5),
    ("DET", "detroit lions", 11),
    ("GB", "green bay packers", 9),
    ("HOU", "houston texans", 10),
    ("IND", "indianapolis colts", 12),
    ("JAX", "jacksonville jaguars", 9),
    ("KC", "kansas city chiefs", 11),
    ("LAC", "los angeles chargers", 6),
    ("LAR", "los angeles rams", 6),
    ("LV", "las vegas raiders", 8),
    ("MIA", "miami dolphins", 5),
    ("MIN", "minnesota vikings", 6),
    ("NE", "new england patriots", 7),
    ("NO", "new orleans saints", 7),
    ("NYG", "new york giants", 9),
    ("NYJ", "new york jets", 10),
    ("PHI", "philadelphia eagles", 6),
    ("PIT", "pittsburgh steelers", 11),
    ("SF", "san francisco 49ers", 12),
    ("SEA", "seattle seahawks", 10),
    ("TB", "tampa bay buccaneers", 12),
    ("TEN", "tennessee titans", 11),
    ("WAS", "washington commanders", 12),
];

pub const FREE_AGENT: &str = "FA";

fn lookup(code: &str) -> Option<&'static (&'static str, &'static str, u8)> {
    TEAMS.iter().find(|(c, _, _)| c.eq_ignore_ascii_case(code))
}

/// Lowercase full team name, e.g. "BUF" -> "buffalo bills".
pub fn full_name(code: &str) -> Option<&'static str> {
    if code.eq_ignore_ascii_case(FREE_AGENT) {
        return Some("free agent");
    }
    lookup(code).map(|(_, name, _)| *name)
}

pub fn bye_week(code: &str) -> Option<u8> {
    lookup(code).map(|(_, _, bye)| *bye)
}

/// Title-cased team name for defenses the feed leaves unnamed.
pub fn defense_name(code: &str) -> String {
    match lookup(code) {
        Some((_, name, _)) => name
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        None => format!("{code} Defense"),
    }
}
