use crate::{
    catalog::{
        AchievementId,
        FarmId,
        STREAK_LENGTH,
        daily_reward,
    },
    economy::{
        PlayerStats,
        nano_to_tokens,
    },
    minigames::{
        CLICK_REWARD,
        Minigame,
    },
};
use chrono::NaiveDate;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use std::collections::{
    BTreeMap,
    BTreeSet,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("daily reward already claimed for {0}")]
    AlreadyClaimedToday(NaiveDate),
    #[error("farm {farm} unlocks at level {required_level}")]
    FarmLocked { farm: FarmId, required_level: u8 },
}

/// Locally held player state, persisted after every mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerProgress {
    pub selected_farm: FarmId,
    #[serde(deserialize_with = "achievements_from_list_or_map")]
    pub achievements: BTreeSet<AchievementId>,
    pub total_earnings: f64,
    pub current_streak: u8,
    pub last_claim_date: Option<NaiveDate>,
    pub claimed_days: BTreeSet<u8>,
    pub games_played: BTreeSet<Minigame>,
    pub total_clicks: u64,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            selected_farm: FarmId::Earth,
            achievements: BTreeSet::new(),
            total_earnings: 0.0,
            current_streak: 1,
            last_claim_date: None,
            claimed_days: BTreeSet::new(),
            games_played: BTreeSet::new(),
            total_clicks: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyClaim {
    pub day: u8,
    pub reward: f64,
    pub next_streak: u8,
}

impl PlayerProgress {
    /// Clamps values a hand-edited or older record may carry out of range.
    pub fn normalized(mut self) -> Self {
        self.current_streak = self.current_streak.clamp(1, STREAK_LENGTH);
        self.claimed_days
            .retain(|day| (1..=STREAK_LENGTH).contains(day));
        if !self.total_earnings.is_finite() || self.total_earnings < 0.0 {
            self.total_earnings = 0.0;
        }
        self
    }

    pub fn can_claim_daily(&self, today: NaiveDate) -> bool {
        self.last_claim_date.is_none_or(|last| today > last)
    }

    pub fn claim_daily(&mut self, today: NaiveDate) -> Result<DailyClaim, ProgressError> {
        if !self.can_claim_daily(today) {
            return Err(ProgressError::AlreadyClaimedToday(today));
        }
        let missed_a_day = self
            .last_claim_date
            .is_some_and(|last| today.signed_duration_since(last).num_days() > 1);
        if missed_a_day {
            self.current_streak = 1;
        }

        let day = self.current_streak.clamp(1, STREAK_LENGTH);
        if day == 1 {
            self.claimed_days.clear();
        }
        self.claimed_days.insert(day);

        let reward = daily_reward(day);
        self.total_earnings += reward;
        self.current_streak = if day >= STREAK_LENGTH { 1 } else { day + 1 };
        self.last_claim_date = Some(today);

        Ok(DailyClaim {
            day,
            reward,
            next_streak: self.current_streak,
        })
    }

    /// Clicker results count taps; every other game reports tokens won.
    pub fn record_minigame_result(&mut self, game: Minigame, amount: f64) {
        self.games_played.insert(game);
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        match game {
            Minigame::Clicker => {
                let clicks = amount.floor() as u64;
                self.total_clicks = self.total_clicks.saturating_add(clicks);
                self.total_earnings += clicks as f64 * CLICK_REWARD;
            }
            Minigame::Slots | Minigame::Puzzle => {
                self.total_earnings += amount;
            }
        }
    }

    pub fn select_farm(
        &mut self,
        farm: FarmId,
        stats: &PlayerStats,
    ) -> Result<(), ProgressError> {
        if !stats.is_unlocked(farm) {
            return Err(ProgressError::FarmLocked {
                farm,
                required_level: farm.site().unlock_level,
            });
        }
        self.selected_farm = farm;
        Ok(())
    }

    pub fn credit_claimed_rewards(&mut self, pending_rewards: u64) {
        self.total_earnings += nano_to_tokens(pending_rewards);
    }

    /// Records the given ids and returns the ones that were not unlocked
    /// before.
    pub fn unlock_achievements(
        &mut self,
        ids: impl IntoIterator<Item = AchievementId>,
    ) -> Vec<AchievementId> {
        ids.into_iter()
            .filter(|id| self.achievements.insert(*id))
            .collect()
    }
}

fn achievements_from_list_or_map<'de, D>(
    deserializer: D,
) -> Result<BTreeSet<AchievementId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        List(Vec<AchievementId>),
        Map(BTreeMap<AchievementId, bool>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::List(ids) => ids.into_iter().collect(),
        Repr::Map(flags) => flags
            .into_iter()
            .filter_map(|(id, unlocked)| unlocked.then_some(id))
            .collect(),
    })
}
