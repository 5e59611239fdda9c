//! Catalogue handlers: deposit wallets, plans, badges and referrals.

use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use monance_core::DepositWallet;
use monance_core::catalog::{
    BadgeStatus, InvestmentPlan, PLANS, REFERRAL_LEVELS, evaluate_badges, plan_for_amount,
    referral_link,
};

use crate::db::UserStore;
use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::services::LedgerError;
use crate::state::AppState;

/// `GET /api/wallets`
pub async fn wallets<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(_identity): RequireIdentity,
) -> Result<Json<Vec<DepositWallet>>> {
    let wallets = state
        .store()
        .list_wallets()
        .await
        .map_err(LedgerError::from)?;
    Ok(Json(wallets))
}

#[derive(Debug, Deserialize)]
pub struct PlansQuery {
    /// Optional amount to match against the tier ranges.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: &'static [InvestmentPlan],
    /// Tier covering the queried amount, if any.
    pub matching: Option<&'static InvestmentPlan>,
}

/// `GET /api/plans?amount=`
pub async fn plans(
    RequireIdentity(_identity): RequireIdentity,
    Query(query): Query<PlansQuery>,
) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: &PLANS,
        matching: query.amount.and_then(plan_for_amount),
    })
}

/// `GET /api/badges`
pub async fn badges<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<Vec<BadgeStatus>>> {
    let ctx = identity.context();
    let user = state.ledger().get_or_create_user(&ctx).await?;
    let history = state.ledger().get_history(&ctx).await?;
    Ok(Json(evaluate_badges(&user, &history)))
}

#[derive(Debug, Serialize)]
pub struct ReferralLevelStatus {
    pub level: u8,
    pub commission_percent: u32,
    /// Referrals are not tracked yet.
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct ReferralsResponse {
    pub link: String,
    pub levels: Vec<ReferralLevelStatus>,
}

/// `GET /api/referrals`
pub async fn referrals<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
) -> Json<ReferralsResponse> {
    let levels = REFERRAL_LEVELS
        .iter()
        .map(|level| ReferralLevelStatus {
            level: level.level,
            commission_percent: level.commission_percent,
            count: 0,
        })
        .collect();

    Json(ReferralsResponse {
        link: referral_link(&state.config().base_url, &identity.identity_id),
        levels,
    })
}
