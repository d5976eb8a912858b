// League settings: scoring categories and lineup slot requirements.
//
// Provider league settings arrive as loosely-typed JSON. Both the stat
// category list and the roster position list may sit a level or two below
// wrapper keys, and individual descriptors may be wrapped again
// (`{"stat": {...}}`, `{"roster_position": {...}}`). Nothing here fails on
// malformed input: unusable descriptors are skipped.

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::player::{
    canonical_position, coerce_number, coerce_stat_id, Player, GOALIE_POSITION, UTILITY_POSITION,
};

/// How deep to look for a settings list under wrapper keys.
const MAX_SETTINGS_DEPTH: usize = 4;

/// Substring (lowercased) identifying participation counters that must not be scored.
const GAMES_PLAYED_MARKER: &str = "games played";

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A single scored statistical dimension, identified by a stable stat id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub position_type: Option<String>,
}

impl Category {
    pub fn new(id: u32, name: &str) -> Self {
        Category {
            id,
            name: name.to_string(),
            position_type: None,
        }
    }
}

/// A stat descriptor with a usable numeric id, before the games-played filter.
struct StatDescriptor {
    id: u32,
    name: String,
    position_type: Option<String>,
}

impl StatDescriptor {
    fn is_games_played(&self) -> bool {
        self.name.to_lowercase().contains(GAMES_PLAYED_MARKER)
    }
}

fn stat_descriptors(settings: &Value) -> Vec<StatDescriptor> {
    let Some(entries) = find_settings_list(settings, "stat_categories") else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let desc = unwrap_descriptor(entry, "stat");
            let id = desc.get("stat_id").and_then(coerce_stat_id)?;
            let name = desc
                .get("name")
                .or_else(|| desc.get("display_name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            let position_type = desc
                .get("position_type")
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            Some(StatDescriptor {
                id,
                name,
                position_type,
            })
        })
        .collect()
}

/// Derive the ordered list of scored categories from league settings.
///
/// Descriptors without a numeric stat id are dropped, as is anything whose
/// name mentions "games played" (participation, not performance). Duplicate
/// ids keep their first occurrence. Returns an empty list when the settings
/// carry no category list at all.
pub fn extract_categories(settings: &Value) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();

    for desc in stat_descriptors(settings) {
        if desc.is_games_played() {
            debug!("excluding participation category {} ({})", desc.id, desc.name);
            continue;
        }
        if categories.iter().any(|c| c.id == desc.id) {
            warn!("duplicate stat category id {}, keeping first", desc.id);
            continue;
        }
        categories.push(Category {
            id: desc.id,
            name: desc.name,
            position_type: desc.position_type,
        });
    }

    categories
}

/// Stat ids of the "games played" descriptors that `extract_categories` excludes.
///
/// Player normalization uses these to find participation counts inside a
/// provider's stat map when no explicit games-played field is present.
pub fn games_played_stat_ids(settings: &Value) -> Vec<u32> {
    stat_descriptors(settings)
        .into_iter()
        .filter(StatDescriptor::is_games_played)
        .map(|d| d.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Slot labels
// ---------------------------------------------------------------------------

/// Roster labels that never count as lineup slots: bench, injured reserve
/// and minors.
pub const NON_LINEUP_LABELS: [&str; 4] = ["BN", "IR", "IR+", "NA"];

/// Skater positions in the order a config `[roster]` table is scanned.
const CONFIG_POSITION_ORDER: [&str; 6] = ["C", "LW", "RW", "W", "F", "D"];

/// A lineup slot label.
///
/// Util takes any skater and G any goalie. Every other label is a position
/// slot that accepts a player iff the label is among their positions, so
/// league-specific slots such as `F` or `W` need no special casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotLabel {
    Utility,
    Goalie,
    Position(String),
}

impl SlotLabel {
    /// Position slot for `label`, canonicalized the same way player
    /// positions are.
    pub fn position(label: &str) -> Self {
        SlotLabel::Position(canonical_position(label))
    }

    /// Parse a provider position label. Returns `None` for empty labels and
    /// for the non-lineup labels in [`NON_LINEUP_LABELS`].
    pub fn from_label(s: &str) -> Option<Self> {
        let label = canonical_position(s);
        if label.is_empty() || NON_LINEUP_LABELS.contains(&label.as_str()) {
            return None;
        }
        Some(match label.as_str() {
            UTILITY_POSITION => SlotLabel::Utility,
            GOALIE_POSITION => SlotLabel::Goalie,
            _ => SlotLabel::Position(label),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            SlotLabel::Utility => UTILITY_POSITION,
            SlotLabel::Goalie => GOALIE_POSITION,
            SlotLabel::Position(label) => label,
        }
    }

    /// Whether `player` may occupy this slot.
    pub fn accepts(&self, player: &Player) -> bool {
        match self {
            SlotLabel::Utility => !player.is_goalie,
            SlotLabel::Goalie => player.is_goalie,
            SlotLabel::Position(label) => player.positions.contains(label),
        }
    }

    fn config_rank(&self) -> usize {
        match self {
            SlotLabel::Position(label) => CONFIG_POSITION_ORDER
                .iter()
                .position(|p| *p == label.as_str())
                .unwrap_or(CONFIG_POSITION_ORDER.len()),
            SlotLabel::Utility => CONFIG_POSITION_ORDER.len() + 1,
            SlotLabel::Goalie => CONFIG_POSITION_ORDER.len() + 2,
        }
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SlotLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotLabel::from_label(&value).ok_or_else(|| format!("'{value}' is not a lineup slot"))
    }
}

impl From<SlotLabel> for String {
    fn from(label: SlotLabel) -> Self {
        label.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Slot requirements
// ---------------------------------------------------------------------------

/// Lineup slot counts per label, kept in declaration order. That order is
/// the scan order used when placing players.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotRequirements {
    counts: Vec<(SlotLabel, usize)>,
}

impl SlotRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter. A zero count removes the label.
    pub fn with(mut self, label: SlotLabel, count: usize) -> Self {
        self.set(label, count);
        self
    }

    /// Set the count for `label`. An existing label keeps its position; a
    /// new one is appended.
    pub fn set(&mut self, label: SlotLabel, count: usize) {
        match self.counts.iter().position(|(l, _)| *l == label) {
            Some(i) if count == 0 => {
                self.counts.remove(i);
            }
            Some(i) => self.counts[i].1 = count,
            None if count > 0 => self.counts.push((label, count)),
            None => {}
        }
    }

    /// Add `count` slots of `label`, appending the label if it is new.
    pub fn add(&mut self, label: SlotLabel, count: usize) {
        let total = self.get(&label) + count;
        self.set(label, total);
    }

    pub fn get(&self, label: &SlotLabel) -> usize {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Total number of lineup slots.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Labels with a non-zero count, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotLabel, usize)> + '_ {
        self.counts.iter().map(|(label, count)| (label, *count))
    }

    /// First label with an open slot that accepts `player`.
    pub fn first_open_for(&self, player: &Player) -> Option<&SlotLabel> {
        self.counts
            .iter()
            .find(|(label, count)| *count > 0 && label.accepts(player))
            .map(|(label, _)| label)
    }

    /// Consume one slot of `label`. Returns `false` if none was open.
    pub fn take(&mut self, label: &SlotLabel) -> bool {
        match self.counts.iter().position(|(l, _)| l == label) {
            Some(i) if self.counts[i].1 > 0 => {
                self.counts[i].1 -= 1;
                if self.counts[i].1 == 0 {
                    self.counts.remove(i);
                }
                true
            }
            _ => false,
        }
    }

    /// Build from a label -> count mapping such as a config `[roster]` table.
    ///
    /// A plain table carries no order, so labels are arranged as
    /// `C, LW, RW, W, F, D`, then any other position alphabetically, then
    /// Util and G. Non-lineup labels and zero counts are ignored.
    pub fn from_counts(counts: &HashMap<String, usize>) -> Self {
        let mut labels: Vec<(SlotLabel, usize)> = Vec::new();
        for (label, &count) in counts {
            match SlotLabel::from_label(label) {
                Some(slot) => labels.push((slot, count)),
                None => debug!("ignoring non-lineup roster label '{}'", label),
            }
        }
        labels.sort_by(|(a, _), (b, _)| {
            a.config_rank()
                .cmp(&b.config_rank())
                .then_with(|| a.as_str().cmp(b.as_str()))
        });

        let mut reqs = SlotRequirements::new();
        for (slot, count) in labels {
            reqs.add(slot, count);
        }
        reqs
    }

    /// Read the roster position list from league settings, keeping the
    /// order the league declares its positions in.
    ///
    /// Returns `None` when the settings carry no usable position entries, so
    /// callers can fall back to configured counts.
    pub fn from_league_settings(settings: &Value) -> Option<Self> {
        let entries = find_settings_list(settings, "roster_positions")?;

        let mut reqs = SlotRequirements::new();
        for entry in entries {
            let desc = unwrap_descriptor(entry, "roster_position");
            let Some(label) = desc.get("position").and_then(Value::as_str) else {
                continue;
            };
            let Some(slot) = SlotLabel::from_label(label) else {
                debug!("ignoring non-lineup roster position '{}'", label);
                continue;
            };
            let count = desc.get("count").map(coerce_number).unwrap_or(0.0);
            if count < 1.0 {
                continue;
            }
            reqs.add(slot, count as usize);
        }

        if reqs.is_empty() {
            None
        } else {
            Some(reqs)
        }
    }
}

impl Serialize for SlotRequirements {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (label, count) in &self.counts {
            map.serialize_entry(label.as_str(), count)?;
        }
        map.end()
    }
}

impl fmt::Display for SlotRequirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(label, count)| format!("{label}:{count}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Settings traversal helpers
// ---------------------------------------------------------------------------

/// Breadth-first search for `key` in the settings tree, then resolve the
/// value to a list: arrays are returned as-is, objects yield their first
/// array-valued member (e.g. `{"stats": [...]}`).
fn find_settings_list<'a>(settings: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    let mut frontier: Vec<&Value> = vec![settings];

    for _ in 0..=MAX_SETTINGS_DEPTH {
        let mut next = Vec::new();
        for node in frontier {
            match node {
                Value::Object(map) => {
                    if let Some(found) = map.get(key) {
                        if let Some(list) = as_list(found) {
                            return Some(list);
                        }
                    }
                    next.extend(map.values());
                }
                Value::Array(items) => next.extend(items.iter()),
                _ => {}
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    None
}

fn as_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.values().find_map(Value::as_array),
        _ => None,
    }
}

/// Strip a single-key wrapper object such as `{"stat": {...}}`.
fn unwrap_descriptor<'a>(entry: &'a Value, wrapper: &str) -> &'a Value {
    match entry.get(wrapper) {
        Some(inner) if inner.is_object() => inner,
        _ => entry,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn skater(positions: &[&str]) -> Player {
        Player::new("k", "Skater", positions.iter().copied(), BTreeMap::new(), 10.0)
    }

    #[test]
    fn extracts_wrapped_categories_in_order() {
        let settings = json!({
            "settings": {
                "stat_categories": {
                    "stats": [
                        {"stat": {"stat_id": 1, "name": "Goals", "position_type": "P"}},
                        {"stat": {"stat_id": "2", "name": "Assists", "position_type": "P"}},
                        {"stat": {"stat_id": 19, "name": "Wins", "position_type": "G"}}
                    ]
                }
            }
        });

        let cats = extract_categories(&settings);
        let ids: Vec<u32> = cats.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 19]);
        assert_eq!(cats[0].name, "Goals");
        assert_eq!(cats[2].position_type.as_deref(), Some("G"));
    }

    #[test]
    fn games_played_excluded_in_any_case() {
        let settings = json!({
            "stat_categories": [
                {"stat_id": 0, "name": "Games Played"},
                {"stat_id": 29, "name": "GOALIE GAMES PLAYED"},
                {"stat_id": 1, "name": "Goals"}
            ]
        });

        let cats = extract_categories(&settings);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].id, 1);
        assert!(cats.iter().all(|c| !c.name.to_lowercase().contains("games played")));

        assert_eq!(games_played_stat_ids(&settings), vec![0, 29]);
    }

    #[test]
    fn non_numeric_or_missing_ids_dropped() {
        let settings = json!({
            "stat_categories": [
                {"stat_id": "abc", "name": "Broken"},
                {"name": "No id"},
                {"stat_id": 14, "name": "Shots on Goal"}
            ]
        });
        let cats = extract_categories(&settings);
        assert_eq!(cats, vec![Category::new(14, "Shots on Goal")]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let settings = json!({
            "stat_categories": [
                {"stat_id": 1, "name": "Goals"},
                {"stat_id": 1, "name": "Goals again"}
            ]
        });
        let cats = extract_categories(&settings);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Goals");
    }

    #[test]
    fn missing_category_list_is_empty_not_error() {
        assert!(extract_categories(&json!({})).is_empty());
        assert!(extract_categories(&json!(null)).is_empty());
        assert!(extract_categories(&json!({"stat_categories": 5})).is_empty());
    }

    fn pos(label: &str) -> SlotLabel {
        SlotLabel::position(label)
    }

    #[test]
    fn slot_requirements_from_settings() {
        let settings = json!([{
            "roster_positions": [
                {"roster_position": {"position": "C", "count": 2}},
                {"roster_position": {"position": "LW", "count": "2"}},
                {"roster_position": {"position": "RW", "count": 2}},
                {"roster_position": {"position": "D", "count": 4}},
                {"roster_position": {"position": "Util", "count": 1}},
                {"roster_position": {"position": "G", "count": 2}},
                {"roster_position": {"position": "BN", "count": 4}},
                {"roster_position": {"position": "IR+", "count": 2}},
                {"roster_position": {"position": "NA", "count": 1}},
                {"roster_position": {"position": "F", "count": 0}}
            ]
        }]);

        let reqs = SlotRequirements::from_league_settings(&settings).unwrap();
        assert_eq!(reqs.get(&pos("C")), 2);
        assert_eq!(reqs.get(&pos("LW")), 2);
        assert_eq!(reqs.get(&pos("D")), 4);
        assert_eq!(reqs.get(&SlotLabel::Utility), 1);
        assert_eq!(reqs.get(&SlotLabel::Goalie), 2);
        assert_eq!(reqs.get(&pos("F")), 0);
        assert_eq!(reqs.total(), 13);
    }

    #[test]
    fn league_specific_labels_keep_settings_order() {
        let settings = json!({
            "roster_positions": [
                {"position": "G", "count": 1},
                {"position": "F", "count": 2},
                {"position": "W", "count": 1},
                {"position": "Util", "count": 1},
                {"position": "d", "count": 2},
                {"position": "F", "count": 1}
            ]
        });

        let reqs = SlotRequirements::from_league_settings(&settings).unwrap();
        let labels: Vec<&str> = reqs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["G", "F", "W", "Util", "D"]);
        assert_eq!(reqs.get(&pos("F")), 3);
        assert_eq!(reqs.to_string(), "G:1 F:3 W:1 Util:1 D:2");
    }

    #[test]
    fn slot_requirements_absent_is_none() {
        assert!(SlotRequirements::from_league_settings(&json!({"name": "x"})).is_none());
        let only_reserve = json!({"roster_positions": [
            {"position": "BN", "count": 5},
            {"position": "IR", "count": 2}
        ]});
        assert!(SlotRequirements::from_league_settings(&only_reserve).is_none());
    }

    #[test]
    fn label_parsing() {
        assert_eq!(SlotLabel::from_label("util"), Some(SlotLabel::Utility));
        assert_eq!(SlotLabel::from_label("UTIL"), Some(SlotLabel::Utility));
        assert_eq!(SlotLabel::from_label(" g "), Some(SlotLabel::Goalie));
        assert_eq!(SlotLabel::from_label("f"), Some(pos("F")));
        for reserve in ["BN", "bn", "IR", "IR+", "NA", ""] {
            assert_eq!(SlotLabel::from_label(reserve), None, "{reserve}");
        }
        assert_eq!(SlotLabel::Utility.to_string(), "Util");
    }

    #[test]
    fn serializes_in_declaration_order() {
        let reqs = SlotRequirements::new()
            .with(SlotLabel::Goalie, 2)
            .with(pos("F"), 3)
            .with(SlotLabel::Utility, 1);
        let json = serde_json::to_string(&reqs).unwrap();
        assert_eq!(json, r#"{"G":2,"F":3,"Util":1}"#);

        let label: SlotLabel = serde_json::from_value(json!("Util")).unwrap();
        assert_eq!(label, SlotLabel::Utility);
        assert!(serde_json::from_value::<SlotLabel>(json!("BN")).is_err());
    }

    #[test]
    fn set_keeps_position_of_existing_label() {
        let mut reqs = SlotRequirements::new()
            .with(pos("C"), 1)
            .with(SlotLabel::Goalie, 1);
        reqs.set(pos("C"), 3);
        reqs.set(SlotLabel::Goalie, 0);
        let labels: Vec<&SlotLabel> = reqs.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec![&pos("C")]);
        assert_eq!(reqs.total(), 3);
    }

    #[test]
    fn from_counts_orders_dedicated_slots_before_util_and_goalie() {
        let mut counts = HashMap::new();
        counts.insert("G".to_string(), 2);
        counts.insert("Util".to_string(), 1);
        counts.insert("F".to_string(), 2);
        counts.insert("C".to_string(), 2);
        counts.insert("BN".to_string(), 4);
        counts.insert("D".to_string(), 0);
        let reqs = SlotRequirements::from_counts(&counts);

        let labels: Vec<&str> = reqs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["C", "F", "Util", "G"]);
        assert_eq!(reqs.total(), 7);
        assert_eq!(reqs.get(&pos("D")), 0);
    }

    #[test]
    fn take_decrements_and_reports_exhaustion() {
        let mut reqs = SlotRequirements::new().with(pos("C"), 1);
        assert!(reqs.take(&pos("C")));
        assert!(!reqs.take(&pos("C")));
        assert!(reqs.is_empty());
    }

    #[test]
    fn eligibility_rules() {
        let center = skater(&["C", "LW"]);
        let forward = skater(&["c", "f"]);
        let goalie = skater(&["G"]);

        assert!(pos("C").accepts(&center));
        assert!(pos("LW").accepts(&center));
        assert!(!pos("D").accepts(&center));
        assert!(!pos("F").accepts(&center));
        assert!(SlotLabel::Utility.accepts(&center));
        assert!(!SlotLabel::Goalie.accepts(&center));

        assert!(pos("F").accepts(&forward));
        assert!(pos("C").accepts(&forward));

        assert!(goalie.is_goalie);
        assert!(SlotLabel::Goalie.accepts(&goalie));
        assert!(!SlotLabel::Utility.accepts(&goalie));
    }
}
