use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

/// Public faucet description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub address: String,
    pub network: String,
    pub payout: String,
    pub symbol: String,
}

/// `GET /api/info`
pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        address: state.submitter.address().to_string(),
        network: state.config.chain.name.clone(),
        payout: state.config.faucet.payout.to_string(),
        symbol: state.config.chain.token_symbol.clone(),
    })
}
