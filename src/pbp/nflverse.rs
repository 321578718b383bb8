use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::db::models::HistoricalPlay;
use crate::pbp::provider::PlayByPlayProvider;

/// Client for the nflverse play-by-play release files.
///
/// One CSV per season under `{base_url}/play_by_play_{season}.csv`. Parsed
/// seasons are memoised for the life of the process.
#[derive(Clone)]
pub struct NflverseClient {
    http: Client,
    base_url: String,
    seasons: Arc<RwLock<HashMap<u16, Arc<Vec<HistoricalPlay>>>>>,
}

impl NflverseClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NflverseClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            seasons: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn season_url(&self, season: u16) -> String {
        format!("{}/play_by_play_{}.csv", self.base_url, season)
    }

    async fn download(&self, season: u16) -> Result<Vec<HistoricalPlay>> {
        let url = self.season_url(season);
        info!("Downloading nflverse play-by-play for {}: {}", season, url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("nflverse request failed for season {}", season))?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("nflverse returned {} for season {}", status, season);
        }

        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read nflverse body for season {}", season))?;
        debug!("Season {} CSV is {} bytes", season, body.len());

        // Parsing a full season is CPU-bound; keep it off the async workers.
        let rows = tokio::task::spawn_blocking(move || parse_season_csv(body.as_ref()))
            .await
            .context("CSV parse task panicked")??;

        info!("Parsed {} plays for season {}", rows.len(), season);
        Ok(rows)
    }
}

/// Parse an nflverse season CSV. Unknown columns are ignored.
pub fn parse_season_csv<R: Read>(reader: R) -> Result<Vec<HistoricalPlay>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in csv_reader.deserialize::<HistoricalPlay>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                // A malformed row is dropped; a file of them is an error.
                if skipped < 5 {
                    warn!("Skipping malformed play-by-play row {}: {}", line + 2, e);
                }
                skipped += 1;
            }
        }
    }
    if rows.is_empty() && skipped > 0 {
        anyhow::bail!("no parseable rows ({} malformed)", skipped);
    }
    if skipped > 0 {
        warn!("Skipped {} malformed play-by-play rows", skipped);
    }
    Ok(rows)
}

#[async_trait]
impl PlayByPlayProvider for NflverseClient {
    async fn season_plays(&self, season: u16) -> Result<Arc<Vec<HistoricalPlay>>> {
        if let Some(rows) = self.seasons.read().await.get(&season) {
            return Ok(Arc::clone(rows));
        }
        let rows = Arc::new(self.download(season).await?);
        self.seasons.write().await.insert(season, Arc::clone(&rows));
        Ok(rows)
    }

    fn name(&self) -> &str {
        "nflverse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
play_id,game_id,season,home_team,away_team,posteam,defteam,desc,play_type_nfl,qtr,quarter_seconds_remaining,down,ydstogo,yardline_100,yards_gained,pass_attempt,complete_pass,interception,extra_point_result,home_score,away_score,old_game_id
1,2023_01_DET_KC,2023,KC,DET,NA,NA,GAME,NA,1,900,NA,0,NA,NA,0,0,0,NA,20,21,2023090700
40,2023_01_DET_KC,2023,KC,DET,KC,DET,\"(15:00) P.Mahomes pass short right to T.Kelce for 9 yards\",PASS,1,900,1,10,75,9,1,1,0,NA,20,21,2023090700
62,2023_01_DET_KC,2023,KC,DET,KC,DET,H.Butker extra point is GOOD,XP_KICK,1,421,NA,0,15,0,0,0,0,good,20,21,2023090700
";

    #[test]
    fn parses_nflverse_rows_and_na_cells() {
        let rows = parse_season_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);

        let marker = &rows[0];
        assert_eq!(marker.posteam, None);
        assert_eq!(marker.down, None);
        assert_eq!(marker.yardline_100, None);

        let pass = &rows[1];
        assert_eq!(pass.play_type_nfl.as_deref(), Some("PASS"));
        assert_eq!(pass.yardline_100, Some(75.0));
        assert!(HistoricalPlay::flag(pass.complete_pass));
        assert!(pass.desc.as_deref().unwrap_or_default().contains("T.Kelce"));

        let xp = &rows[2];
        assert_eq!(xp.extra_point_result.as_deref(), Some("good"));
        assert_eq!(HistoricalPlay::int(xp.home_score), Some(20));
    }

    #[test]
    fn all_malformed_is_an_error() {
        let bad = "game_id,home_team,away_team,down\n2023_01_DET_KC,KC,DET,third\n";
        assert!(parse_season_csv(bad.as_bytes()).is_err());
    }

    #[test]
    fn season_url_drops_trailing_slash() {
        let client = NflverseClient::new("https://example.test/pbp/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.season_url(2023),
            "https://example.test/pbp/play_by_play_2023.csv"
        );
    }
}
