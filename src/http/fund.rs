//! `POST /api/fund`: authenticate, rate-limit, then send the payout.
//!
//! | outcome                              | status | body                          |
//! |--------------------------------------|--------|-------------------------------|
//! | missing, malformed or invalid token  | 403    | status text                   |
//! | expired token                        | 403    | refresh hint                  |
//! | unparseable body or address          | 400    | status text                   |
//! | rate-limit store failure             | 429    | status text                   |
//! | rate limited                         | 429    | `{"message": "Too many ..."}` |
//! | submission failure                   | 200    | `{"message": "Error: ..."}`   |
//! | success                              | 200    | `{"message": "TxHash: 0x.."}` |
//!
//! The whole request runs under one context bounded by
//! `server.request_timeout_secs`; an exhausted budget is reported as a
//! submission failure.

use std::time::Duration;

use alloy::primitives::Address;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::Span;

use crate::config::schema::PayoutConfig;
use crate::http::response::{message, status_error};
use crate::http::server::AppState;
use crate::security::auth::{AuthError, FundClaims};
use crate::security::rate_limit::format_wait;

pub const EXPIRED_TOKEN_MESSAGE: &str = "Error: your api token is expired, please try refreshing the page";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FundRequest {
    address: String,
}

#[derive(Debug, Error)]
pub enum FundRequestError {
    #[error("failed to parse request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("invalid recipient address '{0}'")]
    Address(String),
}

/// Decode the request body into the recipient address.
pub fn parse_fund_request(body: &[u8]) -> Result<Address, FundRequestError> {
    let request: FundRequest = serde_json::from_slice(body)?;
    request
        .address
        .trim()
        .parse::<Address>()
        .map_err(|_| FundRequestError::Address(request.address))
}

/// Rate-limit keys of one request and the interval each one enforces.
pub fn rate_limit_keys(address: &Address, claims: &FundClaims, faucet: &PayoutConfig) -> Vec<(String, Duration)> {
    let address = address.to_string().to_lowercase();
    vec![
        (format!("address:{address}"), faucet.address_interval()),
        (
            format!("identity:{}:{}", claims.provider, claims.username),
            faucet.identity_interval(),
        ),
        (
            format!("full:{}:{}:{address}", claims.provider, claims.username),
            faucet.identity_and_address_interval(),
        ),
    ]
}

pub async fn fund_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = match state.verifier.authorize(authorization) {
        Ok(claims) => claims,
        Err(AuthError::Expired) => {
            return (StatusCode::FORBIDDEN, EXPIRED_TOKEN_MESSAGE).into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to authorise fund request");
            return status_error(StatusCode::FORBIDDEN);
        }
    };

    let address = match parse_fund_request(&body) {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse fund request");
            return status_error(StatusCode::BAD_REQUEST);
        }
    };

    let ctx = state
        .shutdown
        .context()
        .with_timeout(state.config.server.request_timeout())
        .with_span(Span::current());

    let keys = rate_limit_keys(&address, &claims, &state.config.faucet);
    match state.rate_limiter.check_and_register(&ctx, &keys).await {
        Ok(None) => {}
        Ok(Some(wait)) => {
            return message(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many requests, come back in {}", format_wait(wait)),
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to rate-limit fund request");
            return status_error(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    let payout = state.config.faucet.payout;
    match state.submitter.submit(&ctx, address, state.config.faucet.payout_wei()).await {
        Ok(tx_hash) => {
            tracing::info!(
                amount = payout,
                address_from = %state.submitter.address(),
                address_to = %address,
                identity_provider = %claims.provider,
                identity_username = %claims.username,
                tx_hash = %tx_hash,
                "Sent funds"
            );
            message(StatusCode::OK, format!("TxHash: {tx_hash}"))
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                amount = payout,
                address_from = %state.submitter.address(),
                address_to = %address,
                identity_provider = %claims.provider,
                identity_username = %claims.username,
                "Failed to send funds"
            );
            message(StatusCode::OK, format!("Error: {e}"))
        }
    }
}
