//! Achievement badges and their unlock rules.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{EntryKind, LedgerEntry, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Account,
    Earnings,
    Community,
}

/// What a badge pays out once unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Bonus { value: &'static str },
    Discount { value: &'static str },
    Premium { value: &'static str },
    Cashback { value: &'static str },
}

/// Unlock condition for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    FirstConfirmedDeposit,
    ProfitAtLeast(Decimal),
    /// Referrals are not tracked yet, so this never unlocks.
    Referrals(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub level: BadgeLevel,
    pub category: BadgeCategory,
    pub reward: Reward,
    #[serde(skip)]
    rule: Rule,
}

const BADGES: [Badge; 4] = [
    Badge {
        id: 1,
        name: "Monance Member",
        description: "Make your first deposit on the app",
        level: BadgeLevel::Bronze,
        category: BadgeCategory::Account,
        reward: Reward::Bonus {
            value: "$200 account credit",
        },
        rule: Rule::FirstConfirmedDeposit,
    },
    Badge {
        id: 2,
        name: "Monance Leader",
        description: "Earn $1000 from the site",
        level: BadgeLevel::Silver,
        category: BadgeCategory::Earnings,
        reward: Reward::Discount {
            value: "10% fee reduction",
        },
        rule: Rule::ProfitAtLeast(Decimal::from_parts(1000, 0, 0, false, 0)),
    },
    Badge {
        id: 3,
        name: "Monance Champion",
        description: "Earn $5000 from the site",
        level: BadgeLevel::Gold,
        category: BadgeCategory::Earnings,
        reward: Reward::Premium {
            value: "Premium membership",
        },
        rule: Rule::ProfitAtLeast(Decimal::from_parts(5000, 0, 0, false, 0)),
    },
    Badge {
        id: 4,
        name: "Community Contributor",
        description: "Refer 10 new members",
        level: BadgeLevel::Bronze,
        category: BadgeCategory::Community,
        reward: Reward::Cashback {
            value: "2% cashback",
        },
        rule: Rule::Referrals(10),
    },
];

/// A badge together with whether the user has unlocked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: Badge,
    pub unlocked: bool,
}

/// Evaluate every badge against a user's record and history.
#[must_use]
pub fn evaluate_badges(user: &User, history: &[LedgerEntry]) -> Vec<BadgeStatus> {
    BADGES
        .iter()
        .map(|badge| BadgeStatus {
            badge: *badge,
            unlocked: is_unlocked(badge.rule, user, history),
        })
        .collect()
}

fn is_unlocked(rule: Rule, user: &User, history: &[LedgerEntry]) -> bool {
    match rule {
        Rule::FirstConfirmedDeposit => history
            .iter()
            .any(|e| e.kind() == EntryKind::Credit && e.confirmed()),
        Rule::ProfitAtLeast(threshold) => user.profit() >= threshold,
        Rule::Referrals(_) => false,
    }
}
