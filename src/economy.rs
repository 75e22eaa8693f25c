//! Derived gameplay numbers computed from the latest chain snapshot and the
//! locally held progress record.

use crate::{
    catalog::{
        ACHIEVEMENTS,
        AchievementId,
        AchievementMetrics,
        FarmId,
        NANO_PER_TON,
    },
    progress::PlayerProgress,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Hash power needed for levels 2, 3 and 4.
pub const LEVEL_THRESHOLDS: [u64; 3] = [500, 2_000, 10_000];

/// Yield per unit of hash power per second before the farm multiplier.
pub const YIELD_PER_HASH: f64 = 0.0001;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub hash_power: u64,
    /// Accrued, unclaimed rewards in nanoton.
    pub pending_rewards: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerStats {
    pub level: u8,
    pub hash_power: u64,
    pub pending_rewards: u64,
    pub coins_per_second: f64,
    pub selected_farm: FarmId,
    pub unlocked_farms: Vec<FarmId>,
}

impl PlayerStats {
    pub fn is_unlocked(&self, farm: FarmId) -> bool {
        self.unlocked_farms.contains(&farm)
    }

    pub fn pending_display(&self) -> String {
        format_token_amount(self.pending_rewards)
    }
}

pub fn level_for_hash_power(hash_power: u64) -> u8 {
    let reached = LEVEL_THRESHOLDS
        .iter()
        .filter(|threshold| hash_power >= **threshold)
        .count();
    1 + reached as u8
}

pub fn unlocked_farms(level: u8) -> Vec<FarmId> {
    FarmId::ALL
        .into_iter()
        .filter(|farm| level >= farm.site().unlock_level)
        .collect()
}

/// An unavailable snapshot counts as zero hash power and zero rewards.
pub fn compute_stats(snapshot: Option<&ChainSnapshot>, selected_farm: FarmId) -> PlayerStats {
    let snapshot = snapshot.copied().unwrap_or_default();
    let level = level_for_hash_power(snapshot.hash_power);
    let coins_per_second =
        snapshot.hash_power as f64 * YIELD_PER_HASH * selected_farm.site().efficiency;
    PlayerStats {
        level,
        hash_power: snapshot.hash_power,
        pending_rewards: snapshot.pending_rewards,
        coins_per_second,
        selected_farm,
        unlocked_farms: unlocked_farms(level),
    }
}

pub fn achievement_metrics(
    snapshot: Option<&ChainSnapshot>,
    inventory_count: usize,
    progress: &PlayerProgress,
) -> AchievementMetrics {
    let hash_power = snapshot.map(|s| s.hash_power).unwrap_or_default();
    AchievementMetrics {
        inventory_count,
        hash_power,
        total_earnings: progress.total_earnings,
        unlocked_farms: unlocked_farms(level_for_hash_power(hash_power)),
        games_played_count: progress.games_played.len(),
        total_clicks: progress.total_clicks,
    }
}

/// Achievements whose predicate holds now but which `progress` has not
/// recorded yet. Already-unlocked ids are never returned, so a metric that
/// later drops cannot re-lock or re-report anything.
pub fn evaluate_achievements(
    snapshot: Option<&ChainSnapshot>,
    inventory_count: usize,
    progress: &PlayerProgress,
) -> Vec<AchievementId> {
    let metrics = achievement_metrics(snapshot, inventory_count, progress);
    ACHIEVEMENTS
        .iter()
        .filter(|a| !progress.achievements.contains(&a.id))
        .filter(|a| (a.requirement)(&metrics))
        .map(|a| a.id)
        .collect()
}

pub fn nano_to_tokens(nano: u64) -> f64 {
    nano as f64 / NANO_PER_TON as f64
}

/// Formats a nanoton amount with four decimals, e.g. `50.0000`.
pub fn format_token_amount(nano: u64) -> String {
    format!("{:.4}", nano_to_tokens(nano))
}
