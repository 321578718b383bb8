//! Shared test data: a small two-game season and one classified game that
//! touches every play category.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::HistoricalPlay;
use crate::pbp::PlayByPlayProvider;
use crate::sim::game::{Game, TeamProfiles};
use crate::sim::profile::{SeasonCounts, TeamProfile};

pub const GAME_ID: &str = "2023_01_DET_KC";
pub const OTHER_GAME_ID: &str = "2023_05_KC_DET";

pub const PLAY_COUNT: usize = 11;
/// DET punt, 4th-and-6 at its own 30.
pub const PUNT_INDEX: usize = 3;
pub const FIELD_GOAL_INDEX: usize = 4;
pub const PENALTY_INDEX: usize = 5;
pub const EXTRA_POINT_INDEX: usize = 7;
/// 3rd-and-7 incomplete pass at the 40, 10:00 left in the 4th.
pub const SCENARIO_INDEX: usize = 9;

pub fn season_row(game_id: &str, home: &str, away: &str, play_type: &str, posteam: &str, yard_line_100: f64) -> HistoricalPlay {
    let defteam = if posteam == home { away } else { home };
    serde_json::from_value(serde_json::json!({
        "game_id": game_id,
        "season": 2023,
        "home_team": home,
        "away_team": away,
        "posteam": posteam,
        "defteam": defteam,
        "desc": format!("{} {}", posteam, play_type),
        "play_type_nfl": play_type,
        "qtr": 1,
        "quarter_seconds_remaining": 900,
        "down": 1,
        "ydstogo": 10,
        "yardline_100": yard_line_100,
        "yards_gained": 0,
        "posteam_score": 0,
        "defteam_score": 0,
        "home_score": 17,
        "away_score": 20,
    }))
    .expect("fixture row")
}

/// A row of the fixture game (KC home, DET away).
pub fn row(play_type: &str, posteam: &str, yard_line_100: f64) -> HistoricalPlay {
    season_row(GAME_ID, "KC", "DET", play_type, posteam, yard_line_100)
}

/// Two games for tallying. KC on offense: 4 passes (2 complete, 1 picked,
/// 30 yards), 2 rushes (8 yards), 1 of 2 field goals, 1 of 1 extra points,
/// 4 drives of which 2 score and 1 turns it over.
pub fn season_rows() -> Vec<HistoricalPlay> {
    let a = |t: &str, team: &str, yl: f64| season_row(GAME_ID, "KC", "DET", t, team, yl);
    let b = |t: &str, team: &str, yl: f64| season_row(OTHER_GAME_ID, "DET", "KC", t, team, yl);

    let mut a1 = a("PASS", "KC", 75.0);
    a1.drive = Some(1.0);
    a1.pass_attempt = Some(1.0);
    a1.complete_pass = Some(1.0);
    a1.passing_yards = Some(20.0);

    let mut a2 = a("RUSH", "KC", 55.0);
    a2.drive = Some(1.0);
    a2.rush_attempt = Some(1.0);
    a2.rushing_yards = Some(5.0);

    let mut a3 = a("PASS", "KC", 50.0);
    a3.drive = Some(1.0);
    a3.down = Some(3.0);
    a3.pass_attempt = Some(1.0);
    a3.complete_pass = Some(0.0);
    a3.third_down_converted = Some(0.0);

    let mut a4 = a("FIELD_GOAL", "KC", 30.0);
    a4.drive = Some(1.0);
    a4.down = Some(4.0);
    a4.field_goal_attempt = Some(1.0);
    a4.field_goal_result = Some("made".into());

    let mut a5 = a("RUSH", "DET", 70.0);
    a5.drive = Some(2.0);
    a5.rush_attempt = Some(1.0);
    a5.rushing_yards = Some(2.0);
    a5.fumble = Some(1.0);
    a5.fumble_lost = Some(1.0);

    let mut a6 = a("PASS", "KC", 60.0);
    a6.drive = Some(3.0);
    a6.pass_attempt = Some(1.0);
    a6.interception = Some(1.0);

    let mut a7 = a("PASS", "DET", 75.0);
    a7.drive = Some(4.0);
    a7.pass_attempt = Some(1.0);
    a7.complete_pass = Some(1.0);
    a7.passing_yards = Some(15.0);

    let mut b1 = b("PASS", "KC", 8.0);
    b1.drive = Some(1.0);
    b1.pass_attempt = Some(1.0);
    b1.complete_pass = Some(1.0);
    b1.passing_yards = Some(10.0);
    b1.td_team = Some("KC".into());

    let mut b2 = b("XP_KICK", "KC", 15.0);
    b2.drive = Some(1.0);
    b2.down = None;
    b2.extra_point_attempt = Some(1.0);
    b2.extra_point_result = Some("good".into());

    let mut b3 = b("PUNT", "DET", 60.0);
    b3.drive = Some(2.0);
    b3.down = Some(4.0);
    b3.punt_attempt = Some(1.0);
    b3.kick_distance = Some(45.0);

    let mut b4 = b("RUSH", "KC", 43.0);
    b4.drive = Some(3.0);
    b4.down = Some(3.0);
    b4.rush_attempt = Some(1.0);
    b4.rushing_yards = Some(3.0);

    let mut b5 = b("FIELD_GOAL", "KC", 40.0);
    b5.drive = Some(3.0);
    b5.down = Some(4.0);
    b5.field_goal_attempt = Some(1.0);
    b5.field_goal_result = Some("missed".into());

    vec![a1, a2, a3, a4, a5, a6, a7, b1, b2, b3, b4, b5]
}

fn at(mut r: HistoricalPlay, qtr: u8, clock: i32, down: u8, to_go: i32, score: (i32, i32)) -> HistoricalPlay {
    r.qtr = Some(f64::from(qtr));
    r.quarter_seconds_remaining = Some(f64::from(clock));
    r.down = Some(f64::from(down));
    r.ydstogo = Some(f64::from(to_go));
    r.posteam_score = Some(f64::from(score.0));
    r.defteam_score = Some(f64::from(score.1));
    r
}

/// Raw rows of the fixture game, including rows that classification drops.
pub fn game_rows() -> Vec<HistoricalPlay> {
    let mut pass = at(row("PASS", "KC", 75.0), 1, 900, 1, 10, (0, 0));
    pass.complete_pass = Some(1.0);
    pass.yards_gained = Some(9.0);

    let rush = at(row("RUSH", "KC", 66.0), 1, 870, 2, 1, (0, 0));

    let mut pick = at(row("INTERCEPTION", "KC", 55.0), 1, 840, 1, 10, (0, 0));
    pick.interception = Some(1.0);

    let timeout = at(row("TIMEOUT", "DET", 45.0), 1, 830, 1, 10, (0, 0));
    let mut end_quarter = row("END_QUARTER", "KC", 45.0);
    end_quarter.posteam = None;

    let mut punt = at(row("PUNT", "DET", 70.0), 2, 700, 4, 6, (0, 0));
    punt.kick_distance = Some(48.0);

    let mut field_goal = at(row("FIELD_GOAL", "KC", 20.0), 2, 500, 4, 6, (0, 0));
    field_goal.field_goal_result = Some("missed".into());
    field_goal.kick_distance = Some(38.0);

    let mut penalty = at(row("PENALTY", "DET", 65.0), 3, 800, 1, 10, (0, 0));
    penalty.penalty_type = Some("False Start".into());
    penalty.penalty_yards = Some(5.0);

    let mut touchdown = at(row("PASS", "DET", 10.0), 3, 700, 1, 10, (0, 0));
    touchdown.complete_pass = Some(1.0);
    touchdown.yards_gained = Some(10.0);
    touchdown.td_team = Some("DET".into());

    let mut extra_point = at(row("XP_KICK", "DET", 15.0), 3, 695, 1, 10, (6, 0));
    extra_point.down = None;
    extra_point.extra_point_result = Some("good".into());

    let mut two_point = at(row("PAT2", "KC", 2.0), 3, 300, 1, 2, (6, 7));
    two_point.two_point_conv_result = Some("failure".into());

    let scenario = at(row("PASS", "KC", 40.0), 4, 600, 3, 7, (6, 7));

    let mut punt_late = at(row("PUNT", "KC", 40.0), 4, 595, 4, 7, (6, 7));
    punt_late.kick_distance = Some(41.0);

    let mut end_game = row("END_GAME", "KC", 0.0);
    end_game.posteam = None;
    end_game.qtr = Some(4.0);
    end_game.quarter_seconds_remaining = Some(0.0);

    vec![
        pass, rush, pick, timeout, end_quarter, punt, field_goal, penalty, touchdown,
        extra_point, two_point, scenario, punt_late, end_game,
    ]
}

/// A plausible team profile, independent of the tiny fixture season.
pub fn profile(team: &str) -> TeamProfile {
    TeamProfile::from_counts(SeasonCounts {
        team: team.to_string(),
        season: 2023,
        offensive_plays: 1000,
        involved_plays: 2000,
        pass_attempts: 580,
        pass_completions: 380,
        interceptions: 14,
        pass_yards: 3900.0,
        rush_attempts: 420,
        rush_yards: 1800.0,
        fumbles: 20,
        third_down_attempts: 200,
        third_down_conversions: 84,
        fourth_down_attempts: 20,
        fourth_down_conversions: 11,
        punts: 60,
        extra_point_attempts: 45,
        extra_points_made: 43,
        two_point_attempts: 4,
        two_point_conversions: 2,
        field_goal_attempts: 30,
        field_goals_made: 26,
        penalties: 100,
        timeouts: 50,
        drives: 180,
        scoring_drives: 70,
        turnover_drives: 20,
        red_zone_plays: 150,
        red_zone_touchdowns: 35,
    })
}

pub fn sample_game() -> Game {
    let profiles = TeamProfiles {
        home: profile("KC"),
        away: profile("DET"),
    };
    Game::new(GAME_ID, 2023, &game_rows(), profiles).expect("fixture game")
}

/// In-memory provider over fixed rows; counts season fetches.
pub struct StaticProvider {
    rows: Arc<Vec<HistoricalPlay>>,
    pub calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(rows: Vec<HistoricalPlay>) -> Self {
        StaticProvider {
            rows: Arc::new(rows),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlayByPlayProvider for StaticProvider {
    async fn season_plays(&self, season: u16) -> Result<Arc<Vec<HistoricalPlay>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if season != 2023 {
            anyhow::bail!("no fixture data for {}", season);
        }
        Ok(Arc::clone(&self.rows))
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

pub struct FailingProvider;

#[async_trait]
impl PlayByPlayProvider for FailingProvider {
    async fn season_plays(&self, season: u16) -> Result<Arc<Vec<HistoricalPlay>>> {
        anyhow::bail!("upstream unreachable for season {}", season)
    }

    fn name(&self) -> &str {
        "failing"
    }
}
