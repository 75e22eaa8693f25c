//! Minigame round resolution. Results are handed to
//! [`PlayerProgress::record_minigame_result`].
//!
//! [`PlayerProgress::record_minigame_result`]: crate::progress::PlayerProgress::record_minigame_result

use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Tokens credited per clicker tap.
pub const CLICK_REWARD: f64 = 0.001;

/// Tokens a single slot spin is worth before the payout multiplier.
pub const SPIN_VALUE: f64 = 1.0;

pub const PUZZLE_BASE_REWARD: f64 = 5.0;
pub const PUZZLE_MIN_REWARD: f64 = 0.5;
const PUZZLE_MOVE_PENALTY: f64 = 0.1;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Minigame {
    Clicker,
    Slots,
    Puzzle,
}

impl Minigame {
    pub const ALL: [Minigame; 3] = [Minigame::Clicker, Minigame::Slots, Minigame::Puzzle];
}

impl fmt::Display for Minigame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Minigame::Clicker => "clicker",
            Minigame::Slots => "slots",
            Minigame::Puzzle => "puzzle",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Minigame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Minigame::ALL
            .into_iter()
            .find(|game| game.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown minigame '{s}'"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotSymbol {
    Pickaxe,
    Gpu,
    Coin,
    Gem,
    Rocket,
}

const REEL: [SlotSymbol; 5] = [
    SlotSymbol::Pickaxe,
    SlotSymbol::Gpu,
    SlotSymbol::Coin,
    SlotSymbol::Gem,
    SlotSymbol::Rocket,
];

impl SlotSymbol {
    fn triple_multiplier(self) -> f64 {
        match self {
            SlotSymbol::Pickaxe => 2.0,
            SlotSymbol::Gpu => 3.0,
            SlotSymbol::Coin => 5.0,
            SlotSymbol::Gem => 10.0,
            SlotSymbol::Rocket => 25.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpinOutcome {
    pub reels: [SlotSymbol; 3],
    pub multiplier: f64,
    pub payout: f64,
}

pub fn spin<R: Rng + ?Sized>(rng: &mut R) -> SpinOutcome {
    let reels = [
        REEL[rng.random_range(0..REEL.len())],
        REEL[rng.random_range(0..REEL.len())],
        REEL[rng.random_range(0..REEL.len())],
    ];
    settle_spin(reels)
}

/// Three of a kind pays the symbol's multiplier, any pair pays half the
/// spin back.
pub fn settle_spin(reels: [SlotSymbol; 3]) -> SpinOutcome {
    let [a, b, c] = reels;
    let multiplier = if a == b && b == c {
        a.triple_multiplier()
    } else if a == b || b == c || a == c {
        0.5
    } else {
        0.0
    };
    SpinOutcome {
        reels,
        multiplier,
        payout: multiplier * SPIN_VALUE,
    }
}

/// Fewer moves pay more; every solve pays at least the floor.
pub fn puzzle_reward(moves: u32) -> f64 {
    (PUZZLE_BASE_REWARD - moves as f64 * PUZZLE_MOVE_PENALTY).max(PUZZLE_MIN_REWARD)
}
