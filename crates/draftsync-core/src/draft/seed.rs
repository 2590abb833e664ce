// Built-in starting board used when nothing has been saved and the player
// feed is unreachable.

use super::player::{Candidate, Position};
use super::registry::Registry;

const QB: Position = Position::Quarterback;
const RB: Position = Position::RunningBack;
const WR: Position = Position::WideReceiver;
const TE: Position = Position::TightEnd;
const K: Position = Position::Kicker;
const DST: Position = Position::Defense;

/// Default board in rank order.
const DEFAULT_PLAYERS: &[(&str, &str, Position)] = &[
    ("Josh Allen", "BUF", QB),
    ("Jayden Daniels", "WAS", QB),
    ("Drake Maye", "NE", QB),
    ("Joe Burrow", "CIN", QB),
    ("Lamar Jackson", "BAL", QB),
    ("Patrick Mahomes", "KC", QB),
    ("Jalen Hurts", "PHI", QB),
    ("Dak Prescott", "DAL", QB),
    ("Tua Tagovailoa", "MIA", QB),
    ("Trevor Lawrence", "JAX", QB),
    ("Justin Herbert", "LAC", QB),
    ("Sam Darnold", "MIN", QB),
    ("Bo Nix", "DEN", QB),
    ("Anthony Richardson", "IND", QB),
    ("Kyler Murray", "ARI", QB),
    ("Jordan Love", "GB", QB),
    ("C.J. Stroud", "HOU", QB),
    ("Caleb Williams", "CHI", QB),
    ("Geno Smith", "SEA", QB),
    ("Will Levis", "TEN", QB),
    ("Saquon Barkley", "PHI", RB),
    ("Bijan Robinson", "ATL", RB),
    ("Jahmyr Gibbs", "DET", RB),
    ("De'Von Achane", "MIA", RB),
    ("Kyren Williams", "LAR", RB),
    ("Isiah Pacheco", "KC", RB),
    ("Travis Etienne", "JAX", RB),
    ("Jonathan Taylor", "IND", RB),
    ("Tony Pollard", "TEN", RB),
    ("James Cook", "BUF", RB),
    ("Derrick Henry", "BAL", RB),
    ("Josh Jacobs", "GB", RB),
    ("Alvin Kamara", "NO", RB),
    ("Breece Hall", "NYJ", RB),
    ("Aaron Jones", "MIN", RB),
    ("David Montgomery", "DET", RB),
    ("Rachaad White", "TB", RB),
    ("Chuba Hubbard", "CAR", RB),
    ("Zach Charbonnet", "SEA", RB),
    ("Javonte Williams", "DEN", RB),
    ("Najee Harris", "PIT", RB),
    ("D'Andre Swift", "CHI", RB),
    ("Gus Edwards", "LAC", RB),
    ("Jerome Ford", "CLE", RB),
    ("Dameon Pierce", "HOU", RB),
    ("Austin Ekeler", "WAS", RB),
    ("Jonathon Brooks", "CAR", RB),
    ("Tank Bigsby", "JAX", RB),
    ("Tyjae Spears", "TEN", RB),
    ("A.J. Dillon", "GB", RB),
    ("Alexander Mattison", "LV", RB),
    ("Zamir White", "LV", RB),
    ("Cam Akers", "MIN", RB),
    ("Roschon Johnson", "CHI", RB),
    ("Justice Hill", "BAL", RB),
    ("Ja'Marr Chase", "CIN", WR),
    ("Justin Jefferson", "MIN", WR),
    ("CeeDee Lamb", "DAL", WR),
    ("Puka Nacua", "LAR", WR),
    ("Amon-Ra St. Brown", "DET", WR),
    ("DeVonta Smith", "PHI", WR),
    ("Chris Olave", "NO", WR),
    ("A.J. Brown", "PHI", WR),
    ("Tyreek Hill", "MIA", WR),
    ("Stefon Diggs", "HOU", WR),
    ("Davante Adams", "LV", WR),
    ("Tee Higgins", "CIN", WR),
    ("Jaylen Waddle", "MIA", WR),
    ("George Pickens", "PIT", WR),
    ("Calvin Ridley", "TEN", WR),
    ("Brandon Aiyuk", "SF", WR),
    ("Deebo Samuel", "SF", WR),
    ("Keenan Allen", "CHI", WR),
    ("Cooper Kupp", "LAR", WR),
    ("Mike Evans", "TB", WR),
    ("D.J. Moore", "CHI", WR),
    ("Michael Pittman Jr.", "IND", WR),
    ("Amari Cooper", "CLE", WR),
    ("Diontae Johnson", "CAR", WR),
    ("Zay Flowers", "BAL", WR),
    ("Tyler Lockett", "SEA", WR),
    ("Gabe Davis", "JAX", WR),
    ("Rashid Shaheed", "NO", WR),
    ("Christian Watson", "GB", WR),
    ("Marvin Harrison Jr.", "ARI", WR),
    ("Christian Kirk", "JAX", WR),
    ("Hollywood Brown", "KC", WR),
    ("Nathaniel Dell", "HOU", WR),
    ("Rome Odunze", "CHI", WR),
    ("Dontayvion Wicks", "GB", WR),
    ("Adam Thielen", "CAR", WR),
    ("Brian Thomas Jr.", "JAX", WR),
    ("Xavier Worthy", "KC", WR),
    ("Tank Dell", "HOU", WR),
    ("Jordan Addison", "MIN", WR),
    ("Jaxon Smith-Njigba", "SEA", WR),
    ("Josh Downs", "IND", WR),
    ("Elijah Moore", "CLE", WR),
    ("Cedric Tillman", "CLE", WR),
    ("Sam LaPorta", "DET", TE),
    ("Travis Kelce", "KC", TE),
    ("Mark Andrews", "BAL", TE),
    ("Dallas Goedert", "PHI", TE),
    ("T.J. Hockenson", "MIN", TE),
    ("David Njoku", "CLE", TE),
    ("Evan Engram", "JAX", TE),
    ("Kyle Pitts", "ATL", TE),
    ("Jake Ferguson", "DAL", TE),
    ("Trey McBride", "ARI", TE),
    ("George Kittle", "SF", TE),
    ("Pat Freiermuth", "PIT", TE),
    ("Isaiah Likely", "BAL", TE),
    ("Cade Otton", "TB", TE),
    ("Tyler Higbee", "LAR", TE),
    ("Hunter Henry", "NE", TE),
    ("Cole Kmet", "CHI", TE),
    ("Chigoziem Okonkwo", "TEN", TE),
    ("Justin Tucker", "BAL", K),
    ("Evan McPherson", "CIN", K),
    ("Tyler Bass", "BUF", K),
    ("Jake Elliott", "PHI", K),
    ("Brandon Aubrey", "DAL", K),
    ("Cameron Dicker", "LAC", K),
    ("Wil Lutz", "DEN", K),
    ("Harrison Butker", "KC", K),
    ("Matt Gay", "IND", K),
    ("Greg Joseph", "MIN", K),
    ("49ers", "SF", DST),
    ("Ravens", "BAL", DST),
    ("Eagles", "PHI", DST),
    ("Bills", "BUF", DST),
    ("Cowboys", "DAL", DST),
    ("Broncos", "DEN", DST),
    ("Jets", "NYJ", DST),
    ("Browns", "CLE", DST),
    ("Steelers", "PIT", DST),
    ("Chiefs", "KC", DST),
    ("Dolphins", "MIA", DST),
    ("Buccaneers", "TB", DST),
    ("Bears", "CHI", DST),
    ("Vikings", "MIN", DST),
    ("Texans", "HOU", DST),
];

/// Registry seeded with the default board: ids and ranks both follow list order.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    for (name, team, position) in DEFAULT_PLAYERS {
        registry.push_back(Candidate::new(*name, *team, *position));
    }
    registry
}
