//! Scoreboard transitions.
//!
//! Each transition checks its preconditions before mutating anything, so an
//! `Err` leaves the state exactly as it was.

use crate::error::{GameError, GameResult};
use crate::types::*;

impl GameState {
    /// The word the teams are currently answering, if the index is in range
    pub fn current_word(&self) -> Option<&Word> {
        self.words.get(self.current_word_index)
    }

    fn require_current_word(&self) -> GameResult<&Word> {
        self.current_word().ok_or(GameError::InvalidIndex)
    }

    fn score_mut(&mut self, team: Team) -> &mut i64 {
        match team {
            Team::A => &mut self.team_a_score,
            Team::B => &mut self.team_b_score,
        }
    }

    /// Scores can be set to anything through `apply_update`, so saturate
    fn add_points(&mut self, team: Team, points: u32) {
        let score = self.score_mut(team);
        *score = score.saturating_add(i64::from(points));
    }

    pub fn steals_used(&self, team: Team) -> u32 {
        match team {
            Team::A => self.steals_used_a,
            Team::B => self.steals_used_b,
        }
    }

    fn steals_used_mut(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::A => &mut self.steals_used_a,
            Team::B => &mut self.steals_used_b,
        }
    }

    fn reset_steals(&mut self) {
        self.steals_used_a = 0;
        self.steals_used_b = 0;
    }

    /// Replace the word list and rewind to its first word.
    ///
    /// Scores, the current team and media maps are left alone.
    pub fn load_words(&mut self, words: Vec<Word>) {
        self.current_round = words.first().map(|w| w.round.clone());
        self.words = words;
        self.current_word_index = 0;
        self.reset_steals();
    }

    /// Move to another word. Out-of-range indices are accepted; transitions
    /// needing a current word reject them later.
    pub fn set_index(&mut self, index: WordIndex) {
        self.current_word_index = index;
        if let Some(word) = self.words.get(index) {
            self.current_round = Some(word.round.clone());
        }
    }

    /// Record the current team's answer.
    ///
    /// A correct answer scores the word and passes the turn. An incorrect one
    /// keeps the turn open for a steal. Any other outcome changes nothing.
    pub fn mark_result(&mut self, outcome: MarkOutcome) -> GameResult<()> {
        let points = self.require_current_word()?.points;

        match outcome {
            MarkOutcome::Correct => {
                let team = self.current_team;
                self.add_points(team, points);
                self.current_team = team.other();
            }
            MarkOutcome::Incorrect | MarkOutcome::Other => {}
        }
        Ok(())
    }

    /// Resolve a steal attempt by `team`.
    ///
    /// Only successful steals count towards the per-round limit, so a team
    /// may fail any number of times. The turn always passes to the other team.
    pub fn steal(&mut self, team: Team, success: bool) -> GameResult<()> {
        let points = self.require_current_word()?.points;
        if self.steals_used(team) >= MAX_STEALS_PER_ROUND {
            return Err(GameError::StealLimitExceeded);
        }

        if success {
            self.add_points(team, points);
            *self.steals_used_mut(team) += 1;
        }
        self.current_team = team.other();
        Ok(())
    }

    /// Begin a new round segment
    pub fn start_round(&mut self) {
        self.reset_steals();
    }

    /// Fresh scoreboard that keeps the loaded words, source URL and media
    pub fn reset(&self) -> GameState {
        GameState {
            words: self.words.clone(),
            current_round: self.words.first().map(|w| w.round.clone()),
            word_images: self.word_images.clone(),
            word_audio: self.word_audio.clone(),
            csv_url: self.csv_url.clone(),
            ..GameState::default()
        }
    }

    /// Overwrite the allow-listed fields present in `update`
    pub fn apply_update(&mut self, update: StateUpdate) {
        if let Some(score) = update.team_a_score {
            self.team_a_score = score;
        }
        if let Some(score) = update.team_b_score {
            self.team_b_score = score;
        }
        if let Some(team) = update.current_team {
            self.current_team = team;
        }
        if let Some(used) = update.steals_used_a {
            self.steals_used_a = used;
        }
        if let Some(used) = update.steals_used_b {
            self.steals_used_b = used;
        }
        if let Some(revealed) = update.word_revealed {
            self.word_revealed = revealed;
        }
        if let Some(bad_pp) = update.bad_pp_mode {
            self.bad_pp_mode = bad_pp;
        }
        if let Some(index) = update.current_word_index {
            self.set_index(index);
        }
    }

    fn media_mut(&mut self, slot: MediaSlot) -> &mut MediaMap {
        match slot {
            MediaSlot::Image => &mut self.word_images,
            MediaSlot::Audio => &mut self.word_audio,
        }
    }

    /// Attach media to the word at `index`, replacing any previous entry
    pub fn set_media(&mut self, slot: MediaSlot, index: WordIndex, media: MediaRef) -> GameResult<()> {
        self.check_index(index)?;
        self.media_mut(slot).insert(index, media);
        Ok(())
    }

    /// Fail with `InvalidIndex` unless `index` points at a loaded word
    pub fn check_index(&self, index: WordIndex) -> GameResult<()> {
        if index < self.words.len() {
            Ok(())
        } else {
            Err(GameError::InvalidIndex)
        }
    }
}
