//! REST API for PetChain
//!
//! Exposes mining, chain listing and validity checks over HTTP. Mining runs
//! on a blocking worker behind the ledger handle's mining guard, so requests
//! that only read the chain are never stuck behind a proof search.

use axum::{
    extract::{Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::LedgerHandle;
use crate::placeholder::fill_payload;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e @ ChainError::ProofSearchExhausted { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::BlockchainError(
                e @ (ChainError::InvalidBlockLinkage { .. } | ChainError::InvalidProofOfWork { .. }),
            ) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MineQuery {
    pub animal_type: Option<String>,
    pub pet_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub previous_hash: String,
    pub proof: i64,
    pub animal_type: String,
    pub pet_name: String,
    pub timestamp: String,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        MineResponse {
            message: "A block is MINED".to_string(),
            index: block.index,
            previous_hash: block.previous_hash,
            proof: block.proof,
            animal_type: block.payload.animal_type,
            pet_name: block.payload.pet_name,
            timestamp: block.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidityResponse {
    pub message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    length: usize,
}

// ============================================================================
// Handlers
// ============================================================================

async fn start() -> &'static str {
    "PetChain node is up and running!"
}

async fn mine_block(
    State(ledger): State<Arc<LedgerHandle>>,
    Query(query): Query<MineQuery>,
) -> Result<Json<MineResponse>, ApiError> {
    let payload = fill_payload(query.animal_type, query.pet_name);
    let block = ledger.mine(payload).await?;
    Ok(Json(block.into()))
}

async fn display_chain(State(ledger): State<Arc<LedgerHandle>>) -> Json<ChainResponse> {
    let chain = ledger.chain().await;
    Json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

async fn valid(State(ledger): State<Arc<LedgerHandle>>) -> Json<ValidityResponse> {
    let message = if ledger.is_valid().await {
        "The Blockchain is valid."
    } else {
        "The Blockchain is not valid."
    };
    Json(ValidityResponse {
        message: message.to_string(),
    })
}

async fn health_check(State(ledger): State<Arc<LedgerHandle>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        length: ledger.len().await,
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}

// ============================================================================
// Router
// ============================================================================

pub fn build_api_router(ledger: Arc<LedgerHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(start))
        .route("/mine", get(mine_block))
        .route("/chain", get(display_chain))
        .route("/valid", get(valid))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(ledger)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let response =
            ApiError::from(ChainError::ProofSearchExhausted { attempts: 9 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = ApiError::from(ChainError::InvalidProofOfWork { index: 2 }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(ChainError::Database("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_mine_response_from_block() {
        let block = Block::new(2, "abc", 20, crate::blockchain::Payload::new("Mew", "Ana"));
        let response = MineResponse::from(block.clone());
        assert_eq!(response.message, "A block is MINED");
        assert_eq!(response.index, 2);
        assert_eq!(response.animal_type, "Mew");
        assert_eq!(response.timestamp, block.timestamp);
    }
}
