use super::common::{created_response, success_response, CreatedResult, ValidatedJson};
use crate::{
    errors::ErrorResponse,
    services::sales::{CreateSaleRequest, SaleReceipt, SaleResponse},
    ApiResponse, ApiResult, AppState,
};
use axum::extract::State;

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    tag = "Sales",
    summary = "Record sale",
    description = "Sells every cart line or none: stock is checked and deducted atomically",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = ApiResponse<SaleReceipt>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid cart or insufficient stock", body = ErrorResponse),
        (status = 404, description = "Medicine not found", body = ErrorResponse),
    )
)]
pub async fn create_sale(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSaleRequest>,
) -> CreatedResult<SaleReceipt> {
    let receipt = state.services.sales.process_sale(request).await?;
    Ok(created_response(receipt))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    tag = "Sales",
    summary = "List sales",
    description = "Every recorded sale line, newest first",
    responses(
        (status = 200, description = "Sales retrieved", body = ApiResponse<Vec<SaleResponse>>),
    )
)]
pub async fn list_sales(State(state): State<AppState>) -> ApiResult<Vec<SaleResponse>> {
    let sales = state.services.sales.list_sales().await?;
    Ok(success_response(sales))
}
