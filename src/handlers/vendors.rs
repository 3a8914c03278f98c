use super::common::{
    created_response, success_response, CreatedResult, IdPath, MessageResponse, ValidatedJson,
};
use crate::{
    errors::ErrorResponse,
    services::vendors::{
        CreateVendorRequest, VendorCreatedResponse, VendorMedicineSummary, VendorSummary,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::extract::State;

pub const VENDOR_DELETED_MESSAGE: &str = "Vendor deleted successfully";

#[utoipa::path(
    post,
    path = "/api/v1/vendors",
    tag = "Vendors",
    summary = "Create vendor",
    description = "Creates a vendor and one catalog entry per supplied medicine name",
    request_body = CreateVendorRequest,
    responses(
        (status = 201, description = "Vendor created", body = ApiResponse<VendorCreatedResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
    )
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateVendorRequest>,
) -> CreatedResult<VendorCreatedResponse> {
    let created = state.services.vendors.create_vendor(request).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    tag = "Vendors",
    summary = "List vendors",
    responses(
        (status = 200, description = "Vendors retrieved", body = ApiResponse<Vec<VendorSummary>>),
    )
)]
pub async fn list_vendors(State(state): State<AppState>) -> ApiResult<Vec<VendorSummary>> {
    let vendors = state.services.vendors.list_vendors().await?;
    Ok(success_response(vendors))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}/medicines",
    tag = "Vendors",
    summary = "List vendor catalog",
    params(("id" = i32, Path, description = "Vendor id")),
    responses(
        (status = 200, description = "Catalog retrieved", body = ApiResponse<Vec<VendorMedicineSummary>>),
        (status = 404, description = "Vendor not found", body = ErrorResponse),
    )
)]
pub async fn list_vendor_medicines(
    State(state): State<AppState>,
    IdPath(id): IdPath<i32>,
) -> ApiResult<Vec<VendorMedicineSummary>> {
    let medicines = state.services.vendors.list_vendor_medicines(id).await?;
    Ok(success_response(medicines))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vendors/{id}",
    tag = "Vendors",
    summary = "Delete vendor",
    description = "Removes the vendor with its catalog, its orders and their lines",
    params(("id" = i32, Path, description = "Vendor id")),
    responses(
        (status = 200, description = "Vendor deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Vendor not found", body = ErrorResponse),
    )
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    IdPath(id): IdPath<i32>,
) -> ApiResult<MessageResponse> {
    state.services.vendors.delete_vendor(id).await?;
    Ok(success_response(MessageResponse::new(VENDOR_DELETED_MESSAGE)))
}
