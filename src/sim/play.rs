//! Play model: one tagged union for every play the engine understands.
//!
//! Historical rows are classified into a [`PlayEvent`] once at game load. The
//! category payload ([`PlayDetail`]) decides which what-if knobs a play exposes
//! ([`ChangeableAttributes`]); that contract is fixed per category.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::db::models::HistoricalPlay;
use crate::sim::error::WhatIfError;
use crate::sim::state::{derived_clocks, FINAL_QUARTER, QUARTER_SECONDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayCategory {
    Pass,
    Interception,
    Rush,
    FieldGoal,
    ExtraPoint,
    TwoPoint,
    Punt,
    Penalty,
}

impl PlayCategory {
    /// Attribute names a caller may override on this category.
    pub fn attribute_names(self) -> &'static [&'static str] {
        match self {
            PlayCategory::Pass | PlayCategory::Interception => &["completed", "intercepted"],
            PlayCategory::FieldGoal => &["made"],
            PlayCategory::ExtraPoint | PlayCategory::TwoPoint => &["made", "is_one_point"],
            PlayCategory::Punt => &["punt_it"],
            PlayCategory::Penalty => &["was_called"],
            PlayCategory::Rush => &[],
        }
    }

    fn from_nfl(play_type: &str) -> Option<PlayCategory> {
        match play_type.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(PlayCategory::Pass),
            "INTERCEPTION" => Some(PlayCategory::Interception),
            "RUSH" => Some(PlayCategory::Rush),
            "FIELD_GOAL" => Some(PlayCategory::FieldGoal),
            "XP_KICK" => Some(PlayCategory::ExtraPoint),
            "PAT2" => Some(PlayCategory::TwoPoint),
            "PUNT" => Some(PlayCategory::Punt),
            "PENALTY" => Some(PlayCategory::Penalty),
            _ => None,
        }
    }
}

impl fmt::Display for PlayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayCategory::Pass => "pass",
            PlayCategory::Interception => "interception",
            PlayCategory::Rush => "rush",
            PlayCategory::FieldGoal => "field goal",
            PlayCategory::ExtraPoint => "extra point",
            PlayCategory::TwoPoint => "two-point",
            PlayCategory::Punt => "punt",
            PlayCategory::Penalty => "penalty",
        };
        f.write_str(s)
    }
}

/// Category payload of a [`PlayEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum PlayDetail {
    Pass {
        is_complete: bool,
    },
    Interception {
        return_yards: i32,
    },
    Rush,
    FieldGoal {
        is_good: bool,
        kick_distance: i32,
    },
    ExtraPoint {
        is_good: bool,
    },
    TwoPoint {
        is_good: bool,
    },
    Punt {
        kick_distance: Option<i32>,
    },
    Penalty {
        penalty_type: Option<String>,
        penalty_yards: i32,
    },
}

impl PlayDetail {
    pub fn category(&self) -> PlayCategory {
        match self {
            PlayDetail::Pass { .. } => PlayCategory::Pass,
            PlayDetail::Interception { .. } => PlayCategory::Interception,
            PlayDetail::Rush => PlayCategory::Rush,
            PlayDetail::FieldGoal { .. } => PlayCategory::FieldGoal,
            PlayDetail::ExtraPoint { .. } => PlayCategory::ExtraPoint,
            PlayDetail::TwoPoint { .. } => PlayCategory::TwoPoint,
            PlayDetail::Punt { .. } => PlayCategory::Punt,
            PlayDetail::Penalty { .. } => PlayCategory::Penalty,
        }
    }
}

/// One play, historical or simulated.
///
/// Historical events carry the situation at the snap. Simulated events carry the
/// situation after the play, ready for the next snap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub description: String,
    pub quarter: u8,
    pub quarter_seconds_remaining: i32,
    pub half_seconds_remaining: i32,
    pub game_seconds_remaining: i32,
    pub down: u8,
    pub distance: i32,
    pub yard_line_100: i32,
    pub yards_gained: i32,
    pub possession: Side,
    pub home_score: i32,
    pub away_score: i32,
    /// Possession team's score minus the opponent's.
    pub score_differential: i32,
    pub simulated: bool,
    #[serde(flatten)]
    pub detail: PlayDetail,
}

impl PlayEvent {
    pub fn category(&self) -> PlayCategory {
        self.detail.category()
    }

    pub fn score_for(&self, side: Side) -> i32 {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    /// Current values of this play's what-if knobs.
    pub fn changeable_attributes(&self) -> ChangeableAttributes {
        match &self.detail {
            PlayDetail::Pass { is_complete } => ChangeableAttributes::Pass {
                completed: *is_complete,
                intercepted: false,
            },
            PlayDetail::Interception { .. } => ChangeableAttributes::Pass {
                completed: false,
                intercepted: true,
            },
            PlayDetail::Rush => ChangeableAttributes::Rush,
            PlayDetail::FieldGoal { is_good, .. } => ChangeableAttributes::FieldGoal { made: *is_good },
            PlayDetail::ExtraPoint { is_good } => ChangeableAttributes::Conversion {
                made: *is_good,
                is_one_point: true,
            },
            PlayDetail::TwoPoint { is_good } => ChangeableAttributes::Conversion {
                made: *is_good,
                is_one_point: false,
            },
            PlayDetail::Punt { .. } => ChangeableAttributes::Punt { punt_it: true },
            PlayDetail::Penalty { .. } => ChangeableAttributes::Penalty { was_called: true },
        }
    }

    /// Classify one nflverse row. Rows outside the eight understood categories,
    /// rows without a possession team or spot, and overtime rows yield `None`.
    pub fn from_historical(row: &HistoricalPlay) -> Option<PlayEvent> {
        let category = PlayCategory::from_nfl(row.play_type_nfl.as_deref()?)?;

        let posteam = row.posteam.as_deref()?;
        let possession = if posteam == row.home_team {
            Side::Home
        } else if posteam == row.away_team {
            Side::Away
        } else {
            return None;
        };

        let quarter = HistoricalPlay::int(row.qtr)?;
        if !(1..=FINAL_QUARTER as i32).contains(&quarter) {
            return None;
        }
        let quarter = quarter as u8;
        let yard_line_100 = HistoricalPlay::int(row.yardline_100)?.clamp(0, 100);

        let quarter_seconds_remaining = HistoricalPlay::int(row.quarter_seconds_remaining)
            .unwrap_or(0)
            .clamp(0, QUARTER_SECONDS);
        let (half_seconds_remaining, game_seconds_remaining) =
            derived_clocks(quarter, quarter_seconds_remaining);

        let down = HistoricalPlay::int(row.down)
            .filter(|d| (1..=4).contains(d))
            .unwrap_or(1) as u8;
        let distance = HistoricalPlay::int(row.ydstogo).filter(|d| *d > 0).unwrap_or(10);

        // Pre-snap score from the possession team's point of view, falling back to
        // the running totals when the per-team columns are missing.
        let (home_score, away_score) = match (
            HistoricalPlay::int(row.posteam_score),
            HistoricalPlay::int(row.defteam_score),
        ) {
            (Some(pos), Some(def)) => match possession {
                Side::Home => (pos, def),
                Side::Away => (def, pos),
            },
            _ => (
                HistoricalPlay::int(row.total_home_score).unwrap_or(0),
                HistoricalPlay::int(row.total_away_score).unwrap_or(0),
            ),
        };
        let score_differential = match possession {
            Side::Home => home_score - away_score,
            Side::Away => away_score - home_score,
        };

        let detail = match category {
            PlayCategory::Pass if HistoricalPlay::flag(row.interception) => PlayDetail::Interception {
                return_yards: HistoricalPlay::int(row.return_yards).unwrap_or(0),
            },
            PlayCategory::Pass => PlayDetail::Pass {
                is_complete: HistoricalPlay::flag(row.complete_pass),
            },
            PlayCategory::Interception => PlayDetail::Interception {
                return_yards: HistoricalPlay::int(row.return_yards).unwrap_or(0),
            },
            PlayCategory::Rush => PlayDetail::Rush,
            PlayCategory::FieldGoal => PlayDetail::FieldGoal {
                is_good: HistoricalPlay::result_is(&row.field_goal_result, &["made", "good"]),
                kick_distance: HistoricalPlay::int(row.kick_distance).unwrap_or(yard_line_100 + 17),
            },
            PlayCategory::ExtraPoint => PlayDetail::ExtraPoint {
                is_good: HistoricalPlay::result_is(&row.extra_point_result, &["good", "made"]),
            },
            PlayCategory::TwoPoint => PlayDetail::TwoPoint {
                is_good: HistoricalPlay::result_is(&row.two_point_conv_result, &["success", "good"]),
            },
            PlayCategory::Punt => PlayDetail::Punt {
                kick_distance: HistoricalPlay::int(row.kick_distance),
            },
            PlayCategory::Penalty => PlayDetail::Penalty {
                penalty_type: row.penalty_type.clone(),
                penalty_yards: HistoricalPlay::int(row.penalty_yards).unwrap_or(0),
            },
        };

        Some(PlayEvent {
            description: row.desc.clone().unwrap_or_default(),
            quarter,
            quarter_seconds_remaining,
            half_seconds_remaining,
            game_seconds_remaining,
            down,
            distance,
            yard_line_100,
            yards_gained: HistoricalPlay::int(row.yards_gained).unwrap_or(0),
            possession,
            home_score,
            away_score,
            score_differential,
            simulated: false,
            detail,
        })
    }
}

// ── What-if knobs ───────────────────────────────────────────────────────────

/// The fixed per-category override surface.
///
/// Pass and interception plays share one knob set; extra point and two-point
/// share another, with `is_one_point` choosing between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeableAttributes {
    Pass { completed: bool, intercepted: bool },
    FieldGoal { made: bool },
    Conversion { made: bool, is_one_point: bool },
    Punt { punt_it: bool },
    Penalty { was_called: bool },
    Rush,
}

impl ChangeableAttributes {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            ChangeableAttributes::Pass { .. } => PlayCategory::Pass.attribute_names(),
            ChangeableAttributes::FieldGoal { .. } => PlayCategory::FieldGoal.attribute_names(),
            ChangeableAttributes::Conversion { .. } => PlayCategory::ExtraPoint.attribute_names(),
            ChangeableAttributes::Punt { .. } => PlayCategory::Punt.attribute_names(),
            ChangeableAttributes::Penalty { .. } => PlayCategory::Penalty.attribute_names(),
            ChangeableAttributes::Rush => PlayCategory::Rush.attribute_names(),
        }
    }

    pub fn as_map(&self) -> BTreeMap<&'static str, bool> {
        let mut map = BTreeMap::new();
        match *self {
            ChangeableAttributes::Pass { completed, intercepted } => {
                map.insert("completed", completed);
                map.insert("intercepted", intercepted);
            }
            ChangeableAttributes::FieldGoal { made } => {
                map.insert("made", made);
            }
            ChangeableAttributes::Conversion { made, is_one_point } => {
                map.insert("made", made);
                map.insert("is_one_point", is_one_point);
            }
            ChangeableAttributes::Punt { punt_it } => {
                map.insert("punt_it", punt_it);
            }
            ChangeableAttributes::Penalty { was_called } => {
                map.insert("was_called", was_called);
            }
            ChangeableAttributes::Rush => {}
        }
        map
    }

    /// Merge caller overrides into the current values.
    ///
    /// Unknown names are rejected. Names left out keep their current value. On a
    /// pass, switching one outcome on switches the other off unless both are given.
    pub fn with_overrides(self, overrides: &BTreeMap<String, bool>) -> Result<Self, WhatIfError> {
        let names = self.names();
        if let Some(unknown) = overrides.keys().find(|k| !names.contains(&k.as_str())) {
            return Err(WhatIfError::invalid(format!(
                "'{}' cannot be changed on this play (allowed: {})",
                unknown,
                if names.is_empty() { "none".to_string() } else { names.join(", ") }
            )));
        }
        let pick = |name: &str, current: bool| overrides.get(name).copied().unwrap_or(current);

        let merged = match self {
            ChangeableAttributes::Pass { completed, intercepted } => {
                match (overrides.get("completed").copied(), overrides.get("intercepted").copied()) {
                    (Some(true), Some(true)) => {
                        return Err(WhatIfError::invalid(
                            "a pass cannot be both completed and intercepted",
                        ))
                    }
                    (Some(true), None) => ChangeableAttributes::Pass {
                        completed: true,
                        intercepted: false,
                    },
                    (None, Some(true)) => ChangeableAttributes::Pass {
                        completed: false,
                        intercepted: true,
                    },
                    (c, i) => ChangeableAttributes::Pass {
                        completed: c.unwrap_or(completed),
                        intercepted: i.unwrap_or(intercepted),
                    },
                }
            }
            ChangeableAttributes::FieldGoal { made } => ChangeableAttributes::FieldGoal {
                made: pick("made", made),
            },
            ChangeableAttributes::Conversion { made, is_one_point } => ChangeableAttributes::Conversion {
                made: pick("made", made),
                is_one_point: pick("is_one_point", is_one_point),
            },
            ChangeableAttributes::Punt { punt_it } => ChangeableAttributes::Punt {
                punt_it: pick("punt_it", punt_it),
            },
            ChangeableAttributes::Penalty { was_called } => ChangeableAttributes::Penalty {
                was_called: pick("was_called", was_called),
            },
            ChangeableAttributes::Rush => ChangeableAttributes::Rush,
        };
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fixtures::row;

    fn overrides(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn attribute_contract_is_fixed_per_category() {
        assert_eq!(PlayCategory::Interception.attribute_names(), &["completed", "intercepted"]);
        assert_eq!(PlayCategory::TwoPoint.attribute_names(), &["made", "is_one_point"]);
        assert!(PlayCategory::Rush.attribute_names().is_empty());
    }

    #[test]
    fn classifies_pass_with_interception_flag_as_interception() {
        let mut r = row("PASS", "KC", 60.0);
        r.interception = Some(1.0);
        r.return_yards = Some(12.0);
        let event = PlayEvent::from_historical(&r).unwrap();
        assert_eq!(event.detail, PlayDetail::Interception { return_yards: 12 });
        assert_eq!(
            event.changeable_attributes(),
            ChangeableAttributes::Pass { completed: false, intercepted: true }
        );
    }

    #[test]
    fn drops_unknown_categories_and_rows_without_possession() {
        assert!(PlayEvent::from_historical(&row("KICK_OFF", "KC", 65.0)).is_none());
        assert!(PlayEvent::from_historical(&row("TIMEOUT", "KC", 65.0)).is_none());

        let mut no_pos = row("RUSH", "KC", 65.0);
        no_pos.posteam = None;
        assert!(PlayEvent::from_historical(&no_pos).is_none());

        let mut overtime = row("RUSH", "KC", 65.0);
        overtime.qtr = Some(5.0);
        assert!(PlayEvent::from_historical(&overtime).is_none());
    }

    #[test]
    fn pre_snap_score_is_taken_from_possession_point_of_view() {
        let mut r = row("RUSH", "DET", 40.0);
        r.posteam_score = Some(14.0);
        r.defteam_score = Some(10.0);
        let event = PlayEvent::from_historical(&r).unwrap();
        assert_eq!(event.possession, Side::Away);
        assert_eq!(event.away_score, 14);
        assert_eq!(event.home_score, 10);
        assert_eq!(event.score_differential, 4);
    }

    #[test]
    fn missing_down_and_distance_default_to_first_and_ten() {
        let mut r = row("XP_KICK", "KC", 15.0);
        r.down = None;
        r.ydstogo = None;
        r.extra_point_result = Some("good".into());
        let event = PlayEvent::from_historical(&r).unwrap();
        assert_eq!((event.down, event.distance), (1, 10));
        assert_eq!(event.detail, PlayDetail::ExtraPoint { is_good: true });
    }

    #[test]
    fn serializes_category_inline() {
        let event = PlayEvent::from_historical(&row("RUSH", "KC", 30.0)).unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "rush");
        assert_eq!(json["possession"], "home");
        let back: PlayEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn completing_a_pass_clears_the_interception() {
        let current = ChangeableAttributes::Pass { completed: false, intercepted: true };
        let merged = current.with_overrides(&overrides(&[("completed", true)])).unwrap();
        assert_eq!(merged, ChangeableAttributes::Pass { completed: true, intercepted: false });
    }

    #[test]
    fn both_pass_outcomes_at_once_is_rejected() {
        let current = ChangeableAttributes::Pass { completed: false, intercepted: false };
        let err = current
            .with_overrides(&overrides(&[("completed", true), ("intercepted", true)]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn unknown_override_names_are_rejected() {
        let current = ChangeableAttributes::FieldGoal { made: false };
        assert!(current.with_overrides(&overrides(&[("punt_it", true)])).is_err());
        assert!(ChangeableAttributes::Rush
            .with_overrides(&overrides(&[("completed", true)]))
            .is_err());
    }

    #[test]
    fn omitted_names_keep_current_values() {
        let current = ChangeableAttributes::Conversion { made: false, is_one_point: true };
        let merged = current.with_overrides(&overrides(&[("made", true)])).unwrap();
        assert_eq!(merged, ChangeableAttributes::Conversion { made: true, is_one_point: true });
        assert_eq!(merged.as_map().len(), 2);
    }
}
