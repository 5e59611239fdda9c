//! Account route handlers.

use axum::{Json, extract::State};

use monance_core::{LedgerEntry, User};

use crate::db::UserStore;
use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::services::ledger::Dashboard;
use crate::state::AppState;

/// `GET /api/me`
pub async fn me<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<User>> {
    let user = state.ledger().get_or_create_user(&identity.context()).await?;
    Ok(Json(user))
}

/// `GET /api/dashboard`
pub async fn dashboard<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<Dashboard>> {
    let dashboard = state.ledger().dashboard(&identity.context()).await?;
    Ok(Json(dashboard))
}

/// `GET /api/history`, oldest first.
pub async fn history<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<Vec<LedgerEntry>>> {
    let history = state.ledger().get_history(&identity.context()).await?;
    Ok(Json(history))
}
