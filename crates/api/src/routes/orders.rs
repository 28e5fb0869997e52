//! Order placement, payment verification, and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{CheckoutService, PaymentGateway};
use common::{OrderId, ProductId, UserId};
use domain::CartItem;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G> {
    pub checkout: CheckoutService<S, G>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: i64,
    pub items: Vec<CartItemRequest>,
    pub delivery_address: String,
    pub phone: String,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub user_id: i64,
    pub gateway_order_ref: String,
    pub gateway_payment_ref: String,
    pub signature: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct IntentResponse {
    pub intent_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: String,
    pub total_cents: i64,
    pub items: Vec<LineItemResponse>,
    pub intent: IntentResponse,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: i64,
    pub total_cents: i64,
    pub payment_status: String,
    pub order_status: String,
    pub delivery_address: String,
    pub phone: String,
    pub payment_ref: Option<String>,
    pub items: Vec<LineItemResponse>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub order_id: String,
    pub status: &'static str,
}

// -- Handlers --

/// POST /orders — place an order for the submitted cart.
#[tracing::instrument(skip(state, req))]
pub async fn place<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<PlaceOrderResponse>), ApiError>
where
    S: Store + 'static,
    G: PaymentGateway + 'static,
{
    validate_place_request(&req)?;

    let cart: Vec<CartItem> = req
        .items
        .iter()
        .map(|item| CartItem {
            product_id: ProductId::new(item.product_id),
            quantity: item.quantity,
        })
        .collect();

    let placed = state
        .checkout
        .place_order(
            UserId::new(req.user_id),
            &cart,
            &req.delivery_address,
            &req.phone,
        )
        .await?;

    let response = PlaceOrderResponse {
        order_id: placed.order_id.to_string(),
        total_cents: placed.total.cents(),
        items: placed
            .lines
            .iter()
            .map(|line| LineItemResponse {
                product_id: line.product_id.as_i64(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect(),
        intent: IntentResponse {
            intent_id: placed.intent.intent_id,
            amount_cents: placed.intent.amount.cents(),
            currency: placed.intent.currency,
        },
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id — load an order with its lines, scoped to its owner.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: Store + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;
    let (order, lines) = state
        .checkout
        .store()
        .order(order_id, UserId::new(owner.user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse {
        id: order.id.to_string(),
        user_id: order.user_id.as_i64(),
        total_cents: order.total.cents(),
        payment_status: order.payment_status.to_string(),
        order_status: order.status.to_string(),
        delivery_address: order.delivery_address,
        phone: order.phone,
        payment_ref: order.payment_ref,
        items: lines
            .iter()
            .map(|line| LineItemResponse {
                product_id: line.product_id.as_i64(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect(),
    }))
}

/// POST /orders/:id/verify-payment — finalize payment from the gateway callback.
#[tracing::instrument(skip(state, req))]
pub async fn verify_payment<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<StatusResponse>, ApiError>
where
    S: Store + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;

    state
        .checkout
        .verify_payment(
            order_id,
            UserId::new(req.user_id),
            &req.gateway_order_ref,
            &req.gateway_payment_ref,
            &req.signature,
        )
        .await?;

    Ok(Json(StatusResponse {
        order_id: order_id.to_string(),
        status: "completed",
    }))
}

/// POST /orders/:id/cancel — cancel a non-finalized order.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<StatusResponse>, ApiError>
where
    S: Store + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;

    state
        .checkout
        .cancel_order(order_id, UserId::new(req.user_id))
        .await?;

    Ok(Json(StatusResponse {
        order_id: order_id.to_string(),
        status: "cancelled",
    }))
}

fn validate_place_request(req: &PlaceOrderRequest) -> Result<(), ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::BadRequest("Cart must not be empty".to_string()));
    }
    if req.items.iter().any(|item| item.quantity == 0) {
        return Err(ApiError::BadRequest(
            "Item quantities must be positive".to_string(),
        ));
    }
    let address_len = req.delivery_address.chars().count();
    if !(10..=500).contains(&address_len) {
        return Err(ApiError::BadRequest(
            "Delivery address must be 10-500 characters".to_string(),
        ));
    }
    let digits = req.phone.trim_start_matches('+');
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid phone number".to_string()));
    }
    Ok(())
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
