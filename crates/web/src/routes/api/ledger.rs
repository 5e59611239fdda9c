//! Deposit, withdrawal and KYC submission handlers.
//!
//! Each answers with a [`Submission`] body; successful ledger writes also
//! carry the new entry.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use monance_core::{LedgerEntry, VerificationState};

use super::json_body;
use crate::db::UserStore;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireIdentity;
use crate::models::Submission;
use crate::services::ledger::{DocumentType, PayoutRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    /// Content URL returned by `POST /api/uploads`.
    pub receipt_url: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub payout: Option<PayoutRequest>,
}

#[derive(Debug, Deserialize)]
pub struct KycRequest {
    pub document_url: String,
    pub document_type: DocumentType,
}

/// Submission result carrying the appended entry.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    #[serde(flatten)]
    pub submission: Submission,
    pub entry: LedgerEntry,
}

/// Submission result carrying the new verification state.
#[derive(Debug, Serialize)]
pub struct KycResponse {
    #[serde(flatten)]
    pub submission: Submission,
    pub verification: VerificationState,
}

/// `POST /api/deposits`
pub async fn deposit<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
    body: std::result::Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<EntryResponse>> {
    let request = json_body(body)?;
    let amount = request.amount.to_string();
    add_breadcrumb("ledger", "Deposit submitted", Some(&[("amount", amount.as_str())]));

    let entry = state
        .ledger()
        .record_deposit(&identity.context(), request.amount, &request.receipt_url)
        .await?;

    Ok(Json(EntryResponse {
        submission: Submission::ok("Deposit recorded and pending verification."),
        entry,
    }))
}

/// `POST /api/withdrawals`
pub async fn withdrawal<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
    body: std::result::Result<Json<WithdrawalRequest>, JsonRejection>,
) -> Result<Json<EntryResponse>> {
    let request = json_body(body)?;
    let amount = request.amount.to_string();
    add_breadcrumb("ledger", "Withdrawal submitted", Some(&[("amount", amount.as_str())]));

    let entry = state
        .ledger()
        .record_withdrawal(&identity.context(), request.amount, request.payout)
        .await?;

    Ok(Json(EntryResponse {
        submission: Submission::ok("Withdrawal recorded and pending verification."),
        entry,
    }))
}

/// `POST /api/kyc`
///
/// Answers `409` when the caller has already submitted or been verified.
pub async fn kyc<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
    body: std::result::Result<Json<KycRequest>, JsonRejection>,
) -> Result<Response> {
    let request = json_body(body)?;

    let updated = state
        .ledger()
        .submit_verification(
            &identity.context(),
            &request.document_url,
            request.document_type,
        )
        .await?;

    let response = match updated {
        Some(user) => Json(KycResponse {
            submission: Submission::ok("Verification submitted and pending review."),
            verification: user.verification,
        })
        .into_response(),
        None => (
            StatusCode::CONFLICT,
            Json(Submission::failed("Verification has already been submitted.")),
        )
            .into_response(),
    };
    Ok(response)
}
