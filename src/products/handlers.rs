use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{guard::AdminUser, handlers::json_body},
    error::{ApiError, ApiResult},
    products::{
        dto::{ListQuery, ProductInput},
        repo_types::Product,
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .post(create_product)
                .fallback(|| async { ApiError::MethodNotAllowed("GET, HEAD, POST") }),
        )
        .route(
            "/products/:id",
            get(get_product)
                .put(update_product)
                .delete(delete_product)
                .fallback(|| async { ApiError::MethodNotAllowed("GET, HEAD, PUT, DELETE") }),
        )
}

const NOT_FOUND: ApiError = ApiError::NotFound("Product");

/// Ids that are not UUIDs cannot name a product.
fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| NOT_FOUND)
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(q) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let rows = state.products.list(&q.into()).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let id = parse_id(&id)?;
    let product = state.products.get(id).await?.ok_or(NOT_FOUND)?;
    Ok(Json(product))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, HeaderMap, Json<Product>)> {
    let fields = json_body(payload)?.validate()?;
    let product = state.products.create(fields).await?;
    info!(product_id = %product.id, admin = %admin.email, "product created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/products/{}", product.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(product)))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let id = parse_id(&id)?;
    let fields = json_body(payload)?.validate()?;
    let product = state.products.update(id, fields).await?.ok_or(NOT_FOUND)?;
    info!(product_id = %product.id, admin = %admin.email, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state, admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if !state.products.delete(id).await? {
        return Err(NOT_FOUND);
    }
    info!(product_id = %id, admin = %admin.email, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
