//! Tier tables mapping cumulative minutes and streak length onto roles.
//!
//! Each table is ordered by ascending lower bound. A member earns at most one
//! tier per table: the highest entry whose bound they have reached.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::models::RoleId;

/// Tiers earned from lifetime practice minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeTier {
    #[serde(rename = "I_Star")]
    IStar,
    #[serde(rename = "II_Star")]
    IiStar,
    #[serde(rename = "III_Star")]
    IiiStar,
    #[serde(rename = "I_S_Star")]
    ISStar,
    #[serde(rename = "II_S_Star")]
    IiSStar,
    #[serde(rename = "III_S_Star")]
    IiiSStar,
    #[serde(rename = "I_M_Star")]
    IMStar,
    #[serde(rename = "II_M_Star")]
    IiMStar,
    #[serde(rename = "III_M_Star")]
    IiiMStar,
    #[serde(rename = "I_Star_S")]
    IStarS,
    #[serde(rename = "II_Star_S")]
    IiStarS,
    #[serde(rename = "III_Star_S")]
    IiiStarS,
}

impl TimeTier {
    pub fn name(self) -> &'static str {
        match self {
            TimeTier::IStar => "I_Star",
            TimeTier::IiStar => "II_Star",
            TimeTier::IiiStar => "III_Star",
            TimeTier::ISStar => "I_S_Star",
            TimeTier::IiSStar => "II_S_Star",
            TimeTier::IiiSStar => "III_S_Star",
            TimeTier::IMStar => "I_M_Star",
            TimeTier::IiMStar => "II_M_Star",
            TimeTier::IiiMStar => "III_M_Star",
            TimeTier::IStarS => "I_Star_S",
            TimeTier::IiStarS => "II_Star_S",
            TimeTier::IiiStarS => "III_Star_S",
        }
    }
}

/// Tiers earned from the current consecutive-day streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTier {
    Egg,
    HatchingChick,
    BabyChick,
    Chicken,
    Dove,
    Owl,
    Eagle,
    Dragon,
    Alien,
}

impl StreakTier {
    pub fn name(self) -> &'static str {
        match self {
            StreakTier::Egg => "egg",
            StreakTier::HatchingChick => "hatching_chick",
            StreakTier::BabyChick => "baby_chick",
            StreakTier::Chicken => "chicken",
            StreakTier::Dove => "dove",
            StreakTier::Owl => "owl",
            StreakTier::Eagle => "eagle",
            StreakTier::Dragon => "dragon",
            StreakTier::Alien => "alien",
        }
    }
}

impl fmt::Display for TimeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for StreakTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEntry<T> {
    pub tier: T,
    /// Inclusive lower bound (minutes or days).
    pub min: u64,
    pub role: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable<T> {
    entries: Vec<TierEntry<T>>,
}

impl<T> TierTable<T>
where
    T: Copy + Eq + std::hash::Hash + fmt::Display,
{
    pub fn new(entries: Vec<TierEntry<T>>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for pair in entries.windows(2) {
            if pair[1].min <= pair[0].min {
                return Err(ConfigError::InvalidTiers(format!(
                    "thresholds must ascend: {} ({}) follows {} ({})",
                    pair[1].tier, pair[1].min, pair[0].tier, pair[0].min
                )));
            }
        }
        for entry in &entries {
            if !seen.insert(entry.tier) {
                return Err(ConfigError::InvalidTiers(format!(
                    "tier {} listed twice",
                    entry.tier
                )));
            }
            if entry.role.get() == 0 {
                return Err(ConfigError::InvalidTiers(format!(
                    "tier {} has role id 0",
                    entry.tier
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Highest tier whose lower bound is at most `value`.
    pub fn select(&self, value: u64) -> Option<&TierEntry<T>> {
        let reached = self.entries.partition_point(|e| e.min <= value);
        reached.checked_sub(1).map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[TierEntry<T>] {
        &self.entries
    }

    pub fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.entries.iter().map(|e| e.role)
    }
}

/// Desired tiers and the role changes needed to reach them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePlan {
    pub time_tier: Option<TierEntry<TimeTier>>,
    pub streak_tier: Option<TierEntry<StreakTier>>,
    pub to_add: BTreeSet<RoleId>,
    pub to_remove: BTreeSet<RoleId>,
}

impl RolePlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Both tier tables, validated together so no role belongs to two tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    time: TierTable<TimeTier>,
    streak: TierTable<StreakTier>,
}

#[derive(Deserialize)]
struct TierFile {
    time: Vec<TierEntry<TimeTier>>,
    streak: Vec<TierEntry<StreakTier>>,
}

impl TierConfig {
    pub fn new(
        time: TierTable<TimeTier>,
        streak: TierTable<StreakTier>,
    ) -> Result<Self, ConfigError> {
        let mut roles = HashSet::new();
        for role in time.roles().chain(streak.roles()) {
            if !roles.insert(role) {
                return Err(ConfigError::InvalidTiers(format!(
                    "role {role} is assigned to more than one tier"
                )));
            }
        }
        Ok(Self { time, streak })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TierFile = serde_json::from_str(json)?;
        Self::new(TierTable::new(file.time)?, TierTable::new(file.streak)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Thresholds and role ids of the community server this bot was built for.
    pub fn builtin() -> Self {
        use StreakTier::*;
        use TimeTier::*;

        let time = [
            (IStar, 50, 504641899890475018),
            (IiStar, 100, 504641945596067851),
            (IiiStar, 150, 504642088760115241),
            (ISStar, 250, 504641974486302751),
            (IiSStar, 500, 504642451898630164),
            (IiiSStar, 1000, 504642479459532810),
            (IMStar, 2000, 504642975519866881),
            (IiMStar, 5000, 504643005479649280),
            (IiiMStar, 10000, 504643037515874317),
            (IStarS, 20000, 504645771464015893),
            (IiStarS, 50000, 504645799821574144),
            (IiiStarS, 100000, 504645823888621568),
        ];
        let streak = [
            (Egg, 7, 857242224390832158),
            (HatchingChick, 14, 857242222529347584),
            (BabyChick, 28, 857242220675465227),
            (Chicken, 35, 857242218695229450),
            (Dove, 56, 857242216493219862),
            (Owl, 70, 857242214588612629),
            (Eagle, 140, 857242212991762463),
            (Dragon, 365, 857242210302427186),
            (Alien, 730, 857242155784863754),
        ];

        Self {
            time: TierTable {
                entries: time
                    .into_iter()
                    .map(|(tier, min, role)| TierEntry { tier, min, role: RoleId(role) })
                    .collect(),
            },
            streak: TierTable {
                entries: streak
                    .into_iter()
                    .map(|(tier, min, role)| TierEntry { tier, min, role: RoleId(role) })
                    .collect(),
            },
        }
    }

    pub fn time(&self) -> &TierTable<TimeTier> {
        &self.time
    }

    pub fn streak(&self) -> &TierTable<StreakTier> {
        &self.streak
    }

    /// Every role either table may grant.
    pub fn relevant_roles(&self) -> BTreeSet<RoleId> {
        self.time.roles().chain(self.streak.roles()).collect()
    }

    /// Diff the tiers earned by `lifetime_minutes` and `streak` against `held`.
    ///
    /// Roles outside both tables are never touched. A role that would land in
    /// both sets is dropped from both.
    pub fn plan(&self, lifetime_minutes: i64, streak: u64, held: &BTreeSet<RoleId>) -> RolePlan {
        let time_tier = self
            .time
            .select(u64::try_from(lifetime_minutes).unwrap_or(0))
            .copied();
        let streak_tier = self.streak.select(streak).copied();

        let desired: BTreeSet<RoleId> = time_tier
            .iter()
            .map(|e| e.role)
            .chain(streak_tier.iter().map(|e| e.role))
            .collect();
        let current: BTreeSet<RoleId> = held.intersection(&self.relevant_roles()).copied().collect();

        let mut to_add: BTreeSet<RoleId> = desired.difference(&current).copied().collect();
        let mut to_remove: BTreeSet<RoleId> = current.difference(&desired).copied().collect();

        let overlap: BTreeSet<RoleId> = to_add.intersection(&to_remove).copied().collect();
        if !overlap.is_empty() {
            tracing::warn!(?overlap, "Role both added and removed; skipping it");
            to_add.retain(|r| !overlap.contains(r));
            to_remove.retain(|r| !overlap.contains(r));
        }

        RolePlan {
            time_tier,
            streak_tier,
            to_add,
            to_remove,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic() -> TierConfig {
        TierConfig::from_json(
            r#"{
                "time": [
                    {"tier": "I_Star", "min": 50, "role": 1},
                    {"tier": "II_Star", "min": 100, "role": 2},
                    {"tier": "III_Star", "min": 150, "role": 3}
                ],
                "streak": [
                    {"tier": "egg", "min": 7, "role": 11},
                    {"tier": "hatching_chick", "min": 14, "role": 12}
                ]
            }"#,
        )
        .expect("synthetic tiers should load")
    }

    fn roles(ids: &[u64]) -> BTreeSet<RoleId> {
        ids.iter().copied().map(RoleId).collect()
    }

    #[test]
    fn builtin_tables_pass_validation() {
        let builtin = TierConfig::builtin();
        let rebuilt = TierConfig::new(
            TierTable::new(builtin.time().entries().to_vec()).unwrap(),
            TierTable::new(builtin.streak().entries().to_vec()).unwrap(),
        )
        .unwrap();
        assert_eq!(rebuilt, builtin);
        assert_eq!(builtin.relevant_roles().len(), 21);
    }

    #[test]
    fn select_picks_highest_reached_threshold() {
        let tiers = TierConfig::builtin();
        let time = tiers.time();

        assert_eq!(time.select(0), None);
        assert_eq!(time.select(49), None);
        assert_eq!(time.select(50).map(|e| e.tier), Some(TimeTier::IStar));
        assert_eq!(time.select(99).map(|e| e.tier), Some(TimeTier::IStar));
        assert_eq!(time.select(100).map(|e| e.tier), Some(TimeTier::IiStar));
        assert_eq!(time.select(9_999).map(|e| e.tier), Some(TimeTier::IiMStar));
        assert_eq!(time.select(u64::MAX).map(|e| e.tier), Some(TimeTier::IiiStarS));
    }

    #[test]
    fn select_is_the_highest_bound_not_above_value() {
        let tiers = TierConfig::builtin();
        for total in (0..120_000).step_by(37) {
            let picked = tiers.time().select(total);
            let expected = tiers.time().entries().iter().filter(|e| e.min <= total).last();
            assert_eq!(picked, expected, "total {total}");
        }
    }

    #[test]
    fn streak_thresholds() {
        let tiers = TierConfig::builtin();
        assert_eq!(tiers.streak().select(6), None);
        assert_eq!(tiers.streak().select(7).map(|e| e.tier), Some(StreakTier::Egg));
        assert_eq!(
            tiers.streak().select(365).map(|e| e.tier),
            Some(StreakTier::Dragon)
        );
        assert_eq!(
            tiers.streak().select(10_000).map(|e| e.tier),
            Some(StreakTier::Alien)
        );
    }

    #[test]
    fn plan_for_first_session() {
        let plan = synthetic().plan(60, 1, &BTreeSet::new());
        assert_eq!(plan.time_tier.map(|e| e.tier), Some(TimeTier::IStar));
        assert_eq!(plan.streak_tier, None);
        assert_eq!(plan.to_add, roles(&[1]));
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn plan_swaps_time_tier_on_promotion() {
        let plan = synthetic().plan(120, 0, &roles(&[1, 500]));
        assert_eq!(plan.to_add, roles(&[2]));
        assert_eq!(plan.to_remove, roles(&[1]));
    }

    #[test]
    fn plan_leaves_unrelated_roles_alone() {
        let plan = synthetic().plan(0, 0, &roles(&[500, 501]));
        assert!(plan.is_empty());
    }

    #[test]
    fn plan_demotes_broken_streak() {
        let plan = synthetic().plan(160, 0, &roles(&[3, 12]));
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_remove, roles(&[12]));
    }

    #[test]
    fn plan_cleans_up_extra_roles_from_one_table() {
        let plan = synthetic().plan(160, 15, &roles(&[1, 2, 3, 11, 12]));
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_remove, roles(&[1, 2, 11]));
    }

    #[test]
    fn plan_never_adds_and_removes_same_role() {
        let tiers = synthetic();
        for total in [0, 50, 100, 149, 150, 1_000] {
            for streak in [0, 7, 13, 14, 40] {
                let plan = tiers.plan(total, streak, &roles(&[1, 2, 3, 11, 12]));
                assert!(plan.to_add.is_disjoint(&plan.to_remove));
            }
        }
    }

    #[test]
    fn negative_total_has_no_tier() {
        let plan = synthetic().plan(-5, 0, &BTreeSet::new());
        assert_eq!(plan.time_tier, None);
    }

    #[test]
    fn rejects_descending_thresholds() {
        let err = TierConfig::from_json(
            r#"{"time": [{"tier": "II_Star", "min": 100, "role": 2},
                         {"tier": "I_Star", "min": 50, "role": 1}],
                "streak": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTiers(_)));
    }

    #[test]
    fn rejects_role_shared_between_tables() {
        let err = TierConfig::from_json(
            r#"{"time": [{"tier": "I_Star", "min": 50, "role": 9}],
                "streak": [{"tier": "egg", "min": 7, "role": 9}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTiers(_)));
    }

    #[test]
    fn rejects_zero_role_and_unknown_tier_names() {
        let zero = TierConfig::from_json(
            r#"{"time": [{"tier": "I_Star", "min": 50, "role": 0}], "streak": []}"#,
        );
        assert!(matches!(zero, Err(ConfigError::InvalidTiers(_))));

        let unknown = TierConfig::from_json(
            r#"{"time": [{"tier": "IV_Star", "min": 50, "role": 4}], "streak": []}"#,
        );
        assert!(matches!(unknown, Err(ConfigError::TierParse(_))));
    }
}
