use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    db,
    error::AppResult,
    handlers::{ValidJson, ValidPath},
    models::{CreateProduct, Product, UpdateProduct},
    AppState,
};

/// `:id` segment of `/produtos/:id`.
#[derive(Debug, Deserialize)]
pub struct ProductPath {
    pub id: i64,
}

// Every handler opens one session and commits it on success. Any early return
// drops the session, which rolls back and hands the connection back to the pool.

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Vec<Product>>)> {
    let mut session = state.db.begin().await?;
    let products = db::fetch_all_products(&mut session).await?;
    session.commit().await?;

    info!(count = products.len(), "Listed products");

    Ok((StatusCode::OK, Json(products)))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let mut session = state.db.begin().await?;
    let product = db::insert_product(&mut session, &payload).await?;
    session.commit().await?;

    info!(id = product.id, nome = %product.nome, status = %product.status, "Created product");

    Ok((StatusCode::OK, Json(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    ValidPath(ProductPath { id }): ValidPath<ProductPath>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let mut session = state.db.begin().await?;
    db::delete_product(&mut session, id).await?;
    session.commit().await?;

    info!(id = id, "Deleted product");

    Ok((StatusCode::OK, Json(json!({ "mensagem": "Produto removido!" }))))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    ValidPath(ProductPath { id }): ValidPath<ProductPath>,
    ValidJson(payload): ValidJson<UpdateProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let mut session = state.db.begin().await?;
    let product = db::update_product_quantity(&mut session, id, &payload).await?;
    session.commit().await?;

    info!(
        id = id,
        quantidade = product.quantidade,
        status = %product.status,
        "Updated product stock"
    );

    Ok((StatusCode::OK, Json(product)))
}
