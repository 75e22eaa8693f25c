//! Read-only game tables: farm sites, equipment tiers, achievements and the
//! daily reward calendar.

use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub const STAKING_FARM_ADDRESS: &str = "EQC8MN1ykQZtHHHrWHGSOFyMB7tihHyL3paweoV8DFcJ7V3g";
pub const NFT_COLLECTION_ADDRESS: &str =
    "EQA1W7wNN-dwYQIcfUZXk8BEZsNGlGiWB3sskFrYLPZis36m";

/// One TON expressed in nanoton.
pub const NANO_PER_TON: u64 = 1_000_000_000;

pub const STREAK_LENGTH: u8 = 7;

/// Token reward credited for each day of the streak, indexed by `day - 1`.
pub const DAILY_REWARDS: [f64; STREAK_LENGTH as usize] =
    [10.0, 20.0, 30.0, 50.0, 75.0, 100.0, 200.0];

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FarmId {
    #[default]
    Earth,
    Arctic,
    Desert,
    Space,
}

impl FarmId {
    pub const ALL: [FarmId; 4] = [
        FarmId::Earth,
        FarmId::Arctic,
        FarmId::Desert,
        FarmId::Space,
    ];

    pub fn site(self) -> &'static FarmSite {
        match self {
            FarmId::Earth => &FARM_SITES[0],
            FarmId::Arctic => &FARM_SITES[1],
            FarmId::Desert => &FARM_SITES[2],
            FarmId::Space => &FARM_SITES[3],
        }
    }
}

impl fmt::Display for FarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FarmId::Earth => "earth",
            FarmId::Arctic => "arctic",
            FarmId::Desert => "desert",
            FarmId::Space => "space",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for FarmId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FarmId::ALL
            .into_iter()
            .find(|farm| farm.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown farm '{s}'"))
    }
}

#[derive(Debug)]
pub struct FarmSite {
    pub id: FarmId,
    pub name: &'static str,
    pub description: &'static str,
    pub efficiency: f64,
    pub unlock_level: u8,
}

pub static FARM_SITES: [FarmSite; 4] = [
    FarmSite {
        id: FarmId::Earth,
        name: "Earth Base",
        description: "Basic farm on Earth.",
        efficiency: 1.0,
        unlock_level: 1,
    },
    FarmSite {
        id: FarmId::Arctic,
        name: "Arctic Mine",
        description: "Cold mine with natural cooling.",
        efficiency: 1.2,
        unlock_level: 2,
    },
    FarmSite {
        id: FarmId::Desert,
        name: "Solar Farm",
        description: "Desert farm powered by the sun.",
        efficiency: 1.5,
        unlock_level: 3,
    },
    FarmSite {
        id: FarmId::Space,
        name: "Space Station",
        description: "Efficient mining in zero gravity.",
        efficiency: 2.0,
        unlock_level: 4,
    },
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EquipmentKind {
    Basic,
    Advanced,
    Quantum,
    Fusion,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 4] = [
        EquipmentKind::Basic,
        EquipmentKind::Advanced,
        EquipmentKind::Quantum,
        EquipmentKind::Fusion,
    ];

    pub fn spec(self) -> &'static EquipmentType {
        match self {
            EquipmentKind::Basic => &EQUIPMENT_TYPES[0],
            EquipmentKind::Advanced => &EQUIPMENT_TYPES[1],
            EquipmentKind::Quantum => &EQUIPMENT_TYPES[2],
            EquipmentKind::Fusion => &EQUIPMENT_TYPES[3],
        }
    }
}

impl std::str::FromStr for EquipmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(EquipmentKind::Basic),
            "advanced" => Ok(EquipmentKind::Advanced),
            "quantum" => Ok(EquipmentKind::Quantum),
            "fusion" => Ok(EquipmentKind::Fusion),
            other => Err(format!("unknown equipment '{other}'")),
        }
    }
}

#[derive(Debug)]
pub struct EquipmentType {
    pub kind: EquipmentKind,
    pub name: &'static str,
    pub description: &'static str,
    pub hash_power: u64,
    /// Shop price in nanoton.
    pub price: u64,
    /// Minimum player level allowed to buy this tier.
    pub level: u8,
}

pub static EQUIPMENT_TYPES: [EquipmentType; 4] = [
    EquipmentType {
        kind: EquipmentKind::Basic,
        name: "Basic GPU",
        description: "Entry-level mining hardware.",
        hash_power: 100,
        price: 100_000_000,
        level: 1,
    },
    EquipmentType {
        kind: EquipmentKind::Advanced,
        name: "Advanced ASIC",
        description: "Professional ASIC miner.",
        hash_power: 500,
        price: 500_000_000,
        level: 2,
    },
    EquipmentType {
        kind: EquipmentKind::Quantum,
        name: "Quantum Miner",
        description: "Futuristic quantum processor.",
        hash_power: 2_000,
        price: 2 * NANO_PER_TON,
        level: 3,
    },
    EquipmentType {
        kind: EquipmentKind::Fusion,
        name: "Fusion Core",
        description: "The finest hardware in the galaxy.",
        hash_power: 10_000,
        price: 10 * NANO_PER_TON,
        level: 4,
    },
];

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AchievementId {
    FirstMiner,
    PowerUser,
    Tycoon,
    Collector,
    Millionaire,
    Explorer,
    Gamer,
    ClickMaster,
}

/// Inputs every achievement predicate is evaluated against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AchievementMetrics {
    pub inventory_count: usize,
    pub hash_power: u64,
    pub total_earnings: f64,
    pub unlocked_farms: Vec<FarmId>,
    pub games_played_count: usize,
    pub total_clicks: u64,
}

pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: fn(&AchievementMetrics) -> bool,
}

impl fmt::Debug for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

pub static ACHIEVEMENTS: [Achievement; 8] = [
    Achievement {
        id: AchievementId::FirstMiner,
        name: "First Steps",
        description: "Buy your first piece of equipment.",
        requirement: |m| m.inventory_count >= 1,
    },
    Achievement {
        id: AchievementId::PowerUser,
        name: "Power User",
        description: "Reach 1000 H/s.",
        requirement: |m| m.hash_power >= 1_000,
    },
    Achievement {
        id: AchievementId::Tycoon,
        name: "Mining Tycoon",
        description: "Reach 10000 H/s.",
        requirement: |m| m.hash_power >= 10_000,
    },
    Achievement {
        id: AchievementId::Collector,
        name: "Collector",
        description: "Own 5 equipment NFTs.",
        requirement: |m| m.inventory_count >= 5,
    },
    Achievement {
        id: AchievementId::Millionaire,
        name: "Millionaire",
        description: "Earn 1000 TMT.",
        requirement: |m| m.total_earnings >= 1_000.0,
    },
    Achievement {
        id: AchievementId::Explorer,
        name: "Explorer",
        description: "Unlock the Space Station.",
        requirement: |m| m.unlocked_farms.contains(&FarmId::Space),
    },
    Achievement {
        id: AchievementId::Gamer,
        name: "Gamer",
        description: "Play every minigame.",
        requirement: |m| m.games_played_count >= 3,
    },
    Achievement {
        id: AchievementId::ClickMaster,
        name: "Click Master",
        description: "Tap the clicker 1000 times.",
        requirement: |m| m.total_clicks >= 1_000,
    },
];

pub fn achievement(id: AchievementId) -> &'static Achievement {
    match id {
        AchievementId::FirstMiner => &ACHIEVEMENTS[0],
        AchievementId::PowerUser => &ACHIEVEMENTS[1],
        AchievementId::Tycoon => &ACHIEVEMENTS[2],
        AchievementId::Collector => &ACHIEVEMENTS[3],
        AchievementId::Millionaire => &ACHIEVEMENTS[4],
        AchievementId::Explorer => &ACHIEVEMENTS[5],
        AchievementId::Gamer => &ACHIEVEMENTS[6],
        AchievementId::ClickMaster => &ACHIEVEMENTS[7],
    }
}

/// Reward credited for claiming `day` of the streak (1-based).
pub fn daily_reward(day: u8) -> f64 {
    let index = day.clamp(1, STREAK_LENGTH) as usize - 1;
    DAILY_REWARDS[index]
}
