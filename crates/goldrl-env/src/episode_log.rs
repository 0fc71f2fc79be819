//! Per-episode CSV log and best-episode tracking

use std::cmp::Ordering;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use goldrl_core::{Emulator, Result};
use goldrl_state::GameSnapshot;

use crate::config::GoldConfig;
use crate::env::GoldEnv;

/// Column order of the episode log
pub const HEADER: &str =
    "episode,total_steps,episode_reward,map_bank,map_id,pos_x,pos_y,party_level_sum,badges,money,events_completed";

/// One finished episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// 1-based row key, unique within a log file
    pub episode: usize,
    /// Environment steps taken across all episodes so far
    pub total_steps: usize,
    /// Summed reward of the episode
    pub episode_reward: f64,
    /// Final map bank
    pub map_bank: u8,
    /// Final map id
    pub map_id: u8,
    /// Final tile column
    pub pos_x: u8,
    /// Final tile row
    pub pos_y: u8,
    /// Sum of party levels at the end
    pub party_level_sum: u32,
    /// Johto badges held
    pub badges: u8,
    /// Money held
    pub money: u32,
    /// Event flags set
    pub events_completed: usize,
}

impl EpisodeRecord {
    /// Summarise the final snapshot of an episode
    #[must_use]
    pub fn new(episode: usize, total_steps: usize, episode_reward: f64, last: &GameSnapshot) -> Self {
        Self {
            episode,
            total_steps,
            episode_reward,
            map_bank: last.location.map_bank,
            map_id: last.location.map_id,
            pos_x: last.location.x_coord,
            pos_y: last.location.y_coord,
            party_level_sum: last.party_info.party_level_sum,
            badges: last.player_info.johto_badges_count,
            money: last.player_info.money,
            events_completed: last.events_completed(),
        }
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.episode,
            self.total_steps,
            self.episode_reward,
            self.map_bank,
            self.map_id,
            self.pos_x,
            self.pos_y,
            self.party_level_sum,
            self.badges,
            self.money,
            self.events_completed,
        )
    }
}

/// Highest `episode` value among the data rows
fn last_episode(text: &str) -> usize {
    text.lines()
        .skip(1)
        .filter_map(|line| line.split(',').next()?.trim().parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Append-only CSV of finished episodes
#[derive(Debug)]
pub struct EpisodeLog {
    path: PathBuf,
    episodes: usize,
}

impl EpisodeLog {
    /// Open `path`, writing the header first if the file does not exist yet.
    ///
    /// Numbering continues after the highest episode already in the file.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let episodes = if path.exists() {
            last_episode(&std::fs::read_to_string(&path)?)
        } else {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, format!("{HEADER}\n"))?;
            debug!(path = %path.display(), "created episode log");
            0
        };
        Ok(Self { path, episodes })
    }

    /// Open the configured `episode_log_path`
    pub fn from_config(config: &GoldConfig) -> io::Result<Self> {
        Self::open(&config.episode_log_path)
    }

    /// File the rows are appended to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of the latest episode in the file, 0 when it has none
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Append one row for an episode ending in `last`
    pub fn append(&mut self, total_steps: usize, episode_reward: f64, last: &GameSnapshot) -> io::Result<EpisodeRecord> {
        let record = EpisodeRecord::new(self.episodes + 1, total_steps, episode_reward, last);
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.csv_row())?;
        self.episodes += 1;
        Ok(record)
    }
}

/// Ranking key of an episode, compared field by field in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeScore {
    /// Event flags set
    pub events_completed: usize,
    /// Summed reward of the episode
    pub episode_reward: f64,
    /// Johto badges held
    pub badges: u8,
    /// Sum of party levels
    pub party_level_sum: u32,
    /// Money held
    pub money: u32,
}

impl EpisodeScore {
    /// Score an episode ending in `last`
    #[must_use]
    pub fn new(episode_reward: f64, last: &GameSnapshot) -> Self {
        Self {
            events_completed: last.events_completed(),
            episode_reward,
            badges: last.player_info.johto_badges_count,
            party_level_sum: last.party_info.party_level_sum,
            money: last.player_info.money,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.events_completed
            .cmp(&other.events_completed)
            .then_with(|| self.episode_reward.partial_cmp(&other.episode_reward).unwrap_or(Ordering::Equal))
            .then_with(|| self.badges.cmp(&other.badges))
            .then_with(|| self.party_level_sum.cmp(&other.party_level_sum))
            .then_with(|| self.money.cmp(&other.money))
    }
}

impl From<&EpisodeRecord> for EpisodeScore {
    fn from(record: &EpisodeRecord) -> Self {
        Self {
            events_completed: record.events_completed,
            episode_reward: record.episode_reward,
            badges: record.badges,
            party_level_sum: record.party_level_sum,
            money: record.money,
        }
    }
}

/// Best episode seen so far
#[derive(Debug, Clone, Default)]
pub struct BestRecord {
    best: Option<EpisodeScore>,
}

impl BestRecord {
    /// No episode recorded yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Score to beat
    pub fn best(&self) -> Option<&EpisodeScore> {
        self.best.as_ref()
    }

    /// Strictly better than the current best; ties are not improvements
    #[must_use]
    pub fn is_better(&self, score: &EpisodeScore) -> bool {
        self.best.as_ref().map_or(true, |best| score.compare(best) == Ordering::Greater)
    }

    /// Keep `score` if it is better, returning whether it was
    pub fn update(&mut self, score: EpisodeScore) -> bool {
        if !self.is_better(&score) {
            return false;
        }
        info!(
            events = score.events_completed,
            reward = score.episode_reward,
            badges = score.badges,
            level_sum = score.party_level_sum,
            "new best episode"
        );
        self.best = Some(score);
        true
    }

    /// Record `score` for `env` and save its state to `state_path` on improvement
    pub fn offer<E: Emulator>(&mut self, score: EpisodeScore, env: &mut GoldEnv<E>, state_path: &Path) -> Result<bool> {
        if !self.update(score) {
            return Ok(false);
        }
        env.save_state(state_path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(events: &[&str], badges: u8, level: u8, money: u32) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        for name in events {
            s.event_statuses.set(*name, true);
        }
        s.player_info.johto_badges_count = badges;
        s.player_info.money = money;
        s.party_info.party_level_sum = u32::from(level);
        s.location.map_bank = 24;
        s.location.map_id = 4;
        s.location.x_coord = 3;
        s.location.y_coord = 6;
        s
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("episodes.csv");

        let mut log = EpisodeLog::open(&path).unwrap();
        log.append(4096, 12.5, &finished(&["got_pokedex"], 0, 7, 3000)).unwrap();
        drop(log);

        let mut reopened = EpisodeLog::open(&path).unwrap();
        assert_eq!(reopened.episodes(), 1);
        let record = reopened.append(8192, -3.0, &finished(&[], 1, 9, 10)).unwrap();
        assert_eq!(record.episode, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![HEADER, "1,4096,12.5,24,4,3,6,7,0,3000,1", "2,8192,-3,24,4,3,6,9,1,10,0"]);
    }

    #[test]
    fn test_episode_numbers_stay_unique_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.csv");
        let last = finished(&[], 0, 5, 0);

        let mut log = EpisodeLog::open(&path).unwrap();
        log.append(10, 1.0, &last).unwrap();
        log.append(20, 1.0, &last).unwrap();
        drop(log);
        EpisodeLog::open(&path).unwrap().append(30, 1.0, &last).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<&str> = text.lines().skip(1).filter_map(|l| l.split(',').next()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_from_config_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = GoldConfig { episode_log_path: dir.path().join("runs").join("gold.csv"), ..GoldConfig::default() };
        let mut log = EpisodeLog::from_config(&config).unwrap();
        log.append(1, 0.0, &finished(&[], 0, 5, 0)).unwrap();
        assert_eq!(log.path(), config.episode_log_path.as_path());
        assert!(std::fs::read_to_string(&config.episode_log_path).unwrap().starts_with(HEADER));
    }

    #[test]
    fn test_priority_is_lexicographic() {
        let base = EpisodeScore::new(100.0, &finished(&["got_pokedex"], 0, 10, 500));
        let mut best = BestRecord::new();
        assert!(best.update(base));

        // more events beat any reward
        let more_events = EpisodeScore::new(-50.0, &finished(&["got_pokedex", "starter_received"], 0, 1, 0));
        assert!(best.is_better(&more_events));

        // same events, less reward loses even with more badges
        let less_reward = EpisodeScore::new(90.0, &finished(&["got_pokedex"], 3, 40, 9999));
        assert!(!best.is_better(&less_reward));

        // ties down to money are broken by money
        let richer = EpisodeScore::new(100.0, &finished(&["got_pokedex"], 0, 10, 501));
        assert!(best.is_better(&richer));
        assert!(!best.is_better(&base));
    }
}
