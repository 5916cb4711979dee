use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::require_admin;
use super::{
    ApiError, AppState, CreateSweetRequest, MessageResponse, PurchaseRequest, PurchaseResponse,
    RestockRequest, RestockResponse, SearchQuery, SweetDto, UpdateSweetRequest,
};
use crate::db::{NewSweet, StockOutcome, SweetFilter, SweetPatch};
use crate::services::CurrentUser;

/// POST /api/sweets (admin)
pub async fn create_sweet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateSweetRequest>,
) -> Result<Json<SweetDto>, ApiError> {
    require_admin(&user)?;

    if payload.name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if payload.price < 0.0 {
        return Err(ApiError::validation("Price must not be negative"));
    }
    if payload.quantity < 0 {
        return Err(ApiError::validation("Quantity must not be negative"));
    }

    let sweet = state
        .store()
        .create_sweet(NewSweet {
            name: payload.name,
            category: payload.category,
            price: payload.price,
            quantity: payload.quantity,
        })
        .await?;

    tracing::info!(id = sweet.id, name = %sweet.name, "created sweet");

    Ok(Json(SweetDto::from(sweet)))
}

/// GET /api/sweets (any authenticated user)
pub async fn list_sweets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SweetDto>>, ApiError> {
    let sweets = state.store().list_sweets().await?;

    Ok(Json(sweets.into_iter().map(SweetDto::from).collect()))
}

/// GET /api/sweets/search (any authenticated user)
/// All filters optional and conjunctive.
pub async fn search_sweets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SweetDto>>, ApiError> {
    let sweets = state
        .store()
        .search_sweets(SweetFilter {
            name: query.name,
            category: query.category,
            min_price: query.min_price,
            max_price: query.max_price,
        })
        .await?;

    Ok(Json(sweets.into_iter().map(SweetDto::from).collect()))
}

/// PUT /api/sweets/{id} (any authenticated user)
/// Applies only the fields present in the payload.
pub async fn update_sweet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSweetRequest>,
) -> Result<Json<SweetDto>, ApiError> {
    if payload.price.is_some_and(|p| p < 0.0) {
        return Err(ApiError::validation("Price must not be negative"));
    }
    if payload.quantity.is_some_and(|q| q < 0) {
        return Err(ApiError::validation("Quantity must not be negative"));
    }

    let updated = state
        .store()
        .update_sweet(
            id,
            SweetPatch {
                name: payload.name,
                category: payload.category,
                price: payload.price,
                quantity: payload.quantity,
            },
        )
        .await?
        .ok_or_else(|| ApiError::sweet_not_found(id))?;

    Ok(Json(SweetDto::from(updated)))
}

/// DELETE /api/sweets/{id} (admin)
pub async fn delete_sweet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&user)?;

    if !state.store().delete_sweet(id).await? {
        return Err(ApiError::sweet_not_found(id));
    }

    tracing::info!(id, "deleted sweet");

    Ok(Json(MessageResponse {
        msg: "Sweet deleted".to_string(),
    }))
}

/// POST /api/sweets/{id}/purchase (any authenticated user)
/// Rejects non-positive or stock-exceeding quantities without mutating stock.
pub async fn purchase_sweet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    if payload.quantity <= 0 {
        return Err(ApiError::validation("Invalid quantity or not enough stock"));
    }

    match state.store().purchase_sweet(id, payload.quantity).await? {
        StockOutcome::Updated(remaining) => Ok(Json(PurchaseResponse {
            msg: "Purchase successful".to_string(),
            remaining_quantity: remaining,
        })),
        StockOutcome::NotFound => Err(ApiError::sweet_not_found(id)),
        StockOutcome::InsufficientStock => {
            Err(ApiError::validation("Invalid quantity or not enough stock"))
        }
    }
}

/// POST /api/sweets/{id}/restock (admin)
pub async fn restock_sweet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<RestockRequest>,
) -> Result<Json<RestockResponse>, ApiError> {
    require_admin(&user)?;

    if payload.quantity <= 0 {
        return Err(ApiError::validation("Quantity must be greater than 0"));
    }

    match state.store().restock_sweet(id, payload.quantity).await? {
        StockOutcome::Updated(total) => Ok(Json(RestockResponse {
            msg: "Restock successful".to_string(),
            new_quantity: total,
        })),
        StockOutcome::NotFound => Err(ApiError::sweet_not_found(id)),
        StockOutcome::InsufficientStock => {
            Err(ApiError::validation("Invalid quantity or not enough stock"))
        }
    }
}
