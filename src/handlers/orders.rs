use super::common::{
    created_response, success_response, CreatedResult, IdPath, MessageResponse, ValidatedJson,
};
use crate::{
    errors::ErrorResponse,
    services::orders::{CreateOrderRequest, OrderResponse, UpdateOrderRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::extract::State;

pub const ORDER_DELETED_MESSAGE: &str = "Order deleted successfully";

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    summary = "Create order",
    description = "Creates a purchase order against one vendor's catalog",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data or unknown vendor / medicine", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateOrderRequest>,
) -> CreatedResult<OrderResponse> {
    let order = state.services.orders.create_order(request).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Orders",
    summary = "List orders",
    description = "Every order with its vendor name and lines",
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderResponse>>),
    )
)]
pub async fn list_orders(State(state): State<AppState>) -> ApiResult<Vec<OrderResponse>> {
    let orders = state.services.orders.list_orders().await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    IdPath(id): IdPath<i32>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Update order",
    description = "Overwrites supplied fields; a non-empty medicine list replaces all lines, a blank status or empty list is ignored",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    IdPath(id): IdPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update_order(id, request).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Delete order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    IdPath(id): IdPath<i32>,
) -> ApiResult<MessageResponse> {
    state.services.orders.delete_order(id).await?;
    Ok(success_response(MessageResponse::new(ORDER_DELETED_MESSAGE)))
}
