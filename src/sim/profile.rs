//! Per-team season tendencies.
//!
//! Built in two steps: [`SeasonCounts::tally`] sums the raw nflverse columns for
//! one team, [`TeamProfile::from_counts`] turns those sums into ratios. Every
//! ratio is count/count with a 0.0 default for an empty denominator, so an empty
//! season yields an all-zero profile rather than an error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::models::HistoricalPlay;

/// Raw season sums for one team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonCounts {
    pub team: String,
    pub season: u16,
    /// Plays where the team was on offense.
    pub offensive_plays: u32,
    /// Plays where the team was on either side of the ball.
    pub involved_plays: u32,
    pub pass_attempts: u32,
    pub pass_completions: u32,
    pub interceptions: u32,
    pub pass_yards: f64,
    pub rush_attempts: u32,
    pub rush_yards: f64,
    pub fumbles: u32,
    pub third_down_attempts: u32,
    pub third_down_conversions: u32,
    pub fourth_down_attempts: u32,
    pub fourth_down_conversions: u32,
    pub punts: u32,
    pub extra_point_attempts: u32,
    pub extra_points_made: u32,
    pub two_point_attempts: u32,
    pub two_point_conversions: u32,
    pub field_goal_attempts: u32,
    pub field_goals_made: u32,
    pub penalties: u32,
    pub timeouts: u32,
    pub drives: u32,
    pub scoring_drives: u32,
    pub turnover_drives: u32,
    pub red_zone_plays: u32,
    pub red_zone_touchdowns: u32,
}

impl SeasonCounts {
    pub fn tally(team: &str, season: u16, rows: &[HistoricalPlay]) -> SeasonCounts {
        let mut c = SeasonCounts {
            team: team.to_string(),
            season,
            ..SeasonCounts::default()
        };
        // Drives are keyed by (game, drive number); drive numbers restart every game.
        let mut drives: HashSet<(&str, i32)> = HashSet::new();
        let mut scoring: HashSet<(&str, i32)> = HashSet::new();
        let mut turnovers: HashSet<(&str, i32)> = HashSet::new();

        let count = |v: Option<f64>| u32::from(HistoricalPlay::flag(v));

        for row in rows.iter().filter(|r| r.involves(team)) {
            c.involved_plays += 1;
            c.fumbles += count(row.fumble);
            c.penalties += count(row.penalty);
            if HistoricalPlay::flag(row.timeout) && row.timeout_team.as_deref() == Some(team) {
                c.timeouts += 1;
            }
            if !row.is_offense(team) {
                continue;
            }

            c.offensive_plays += 1;
            let pass = HistoricalPlay::flag(row.pass_attempt);
            let rush = HistoricalPlay::flag(row.rush_attempt);
            c.pass_attempts += u32::from(pass);
            c.pass_completions += count(row.complete_pass);
            c.interceptions += count(row.interception);
            if pass {
                c.pass_yards += row.passing_yards.unwrap_or(0.0);
            }
            c.rush_attempts += u32::from(rush);
            if rush {
                c.rush_yards += row.rushing_yards.unwrap_or(0.0);
            }

            match HistoricalPlay::int(row.down) {
                Some(3) => c.third_down_attempts += 1,
                Some(4) => c.fourth_down_attempts += 1,
                _ => {}
            }
            c.third_down_conversions += count(row.third_down_converted);
            c.fourth_down_conversions += count(row.fourth_down_converted);

            c.punts += count(row.punt_attempt);
            c.extra_point_attempts += count(row.extra_point_attempt);
            c.extra_points_made += u32::from(HistoricalPlay::result_is(&row.extra_point_result, &["good"]));
            c.two_point_attempts += count(row.two_point_attempt);
            c.two_point_conversions +=
                u32::from(HistoricalPlay::result_is(&row.two_point_conv_result, &["success"]));
            c.field_goal_attempts += count(row.field_goal_attempt);
            let fg_made = HistoricalPlay::result_is(&row.field_goal_result, &["made"]);
            c.field_goals_made += u32::from(fg_made);

            let touchdown = row.td_team.as_deref() == Some(team);
            if let Some(yl) = HistoricalPlay::int(row.yardline_100) {
                if yl <= 20 {
                    c.red_zone_plays += 1;
                    c.red_zone_touchdowns += u32::from(touchdown);
                }
            }

            if let Some(drive) = HistoricalPlay::int(row.drive) {
                let key = (row.game_id.as_str(), drive);
                drives.insert(key);
                if touchdown || fg_made {
                    scoring.insert(key);
                }
                if HistoricalPlay::flag(row.interception) || HistoricalPlay::flag(row.fumble_lost) {
                    turnovers.insert(key);
                }
            }
        }

        c.drives = drives.len() as u32;
        c.scoring_drives = scoring.len() as u32;
        c.turnover_drives = turnovers.len() as u32;
        c
    }
}

/// Ratio-valued tendencies the engine samples from. Read-only after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub team: String,
    pub season: u16,
    pub completion_probability: f64,
    pub interception_probability: f64,
    pub fumble_probability: f64,
    pub third_down_conversion_probability: f64,
    pub fourth_down_conversion_probability: f64,
    pub extra_point_probability: f64,
    pub two_point_probability: f64,
    pub field_goal_probability: f64,
    pub scoring_drive_probability: f64,
    pub red_zone_td_probability: f64,
    pub turnover_probability: f64,
    pub avg_yards_per_pass: f64,
    pub avg_yards_per_carry: f64,
    pub yards_per_play: f64,
    /// Pass attempts over pass + rush attempts.
    pub pass_share: f64,
    pub counts: SeasonCounts,
}

/// count / count, 0.0 on an empty denominator, clamped to [0, 1].
fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        return 0.0;
    }
    (f64::from(num) / f64::from(den)).clamp(0.0, 1.0)
}

fn average(total: f64, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        total / f64::from(den)
    }
}

impl TeamProfile {
    pub fn build(team: &str, season: u16, rows: &[HistoricalPlay]) -> TeamProfile {
        TeamProfile::from_counts(SeasonCounts::tally(team, season, rows))
    }

    pub fn from_counts(counts: SeasonCounts) -> TeamProfile {
        let c = &counts;
        TeamProfile {
            team: c.team.clone(),
            season: c.season,
            completion_probability: ratio(c.pass_completions, c.pass_attempts),
            interception_probability: ratio(c.interceptions, c.pass_attempts),
            fumble_probability: ratio(c.fumbles, c.involved_plays),
            third_down_conversion_probability: ratio(c.third_down_conversions, c.third_down_attempts),
            fourth_down_conversion_probability: ratio(c.fourth_down_conversions, c.fourth_down_attempts),
            extra_point_probability: ratio(c.extra_points_made, c.extra_point_attempts),
            two_point_probability: ratio(c.two_point_conversions, c.two_point_attempts),
            field_goal_probability: ratio(c.field_goals_made, c.field_goal_attempts),
            scoring_drive_probability: ratio(c.scoring_drives, c.drives),
            red_zone_td_probability: ratio(c.red_zone_touchdowns, c.red_zone_plays),
            turnover_probability: ratio(c.turnover_drives, c.drives),
            avg_yards_per_pass: average(c.pass_yards, c.pass_attempts),
            avg_yards_per_carry: average(c.rush_yards, c.rush_attempts),
            yards_per_play: average(c.pass_yards + c.rush_yards, c.offensive_plays),
            pass_share: ratio(c.pass_attempts, c.pass_attempts + c.rush_attempts),
            counts,
        }
    }

    pub fn probabilities(&self) -> [f64; 12] {
        [
            self.completion_probability,
            self.interception_probability,
            self.fumble_probability,
            self.third_down_conversion_probability,
            self.fourth_down_conversion_probability,
            self.extra_point_probability,
            self.two_point_probability,
            self.field_goal_probability,
            self.scoring_drive_probability,
            self.red_zone_td_probability,
            self.turnover_probability,
            self.pass_share,
        ]
    }
}
