//! Static catalogues: investment plans, achievement badges and referral levels.
//!
//! Pure data and evaluation logic; nothing here touches storage.

pub mod badges;
pub mod plans;
pub mod referrals;

pub use badges::{Badge, BadgeCategory, BadgeLevel, BadgeStatus, Reward, evaluate_badges};
pub use plans::{InvestmentPlan, PLANS, plan_for_amount};
pub use referrals::{REFERRAL_LEVELS, ReferralLevel, referral_link};
