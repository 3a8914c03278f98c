use super::common::{
    created_response, success_response, CreatedResult, IdPath, MessageResponse, ValidatedJson,
};
use crate::{
    errors::ErrorResponse,
    services::medicines::{CreateMedicineRequest, MedicineResponse, UpdateMedicineRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::extract::State;

pub const MEDICINE_DELETED_MESSAGE: &str = "Medicine deleted successfully";

#[utoipa::path(
    post,
    path = "/api/v1/medicines",
    tag = "Medicines",
    summary = "Create medicine",
    request_body = CreateMedicineRequest,
    responses(
        (status = 201, description = "Medicine created", body = ApiResponse<MedicineResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
    )
)]
pub async fn create_medicine(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateMedicineRequest>,
) -> CreatedResult<MedicineResponse> {
    let medicine = state.services.medicines.create_medicine(request).await?;
    Ok(created_response(medicine))
}

#[utoipa::path(
    get,
    path = "/api/v1/medicines",
    tag = "Medicines",
    summary = "List medicines",
    description = "All medicines ordered by name",
    responses(
        (status = 200, description = "Medicines retrieved", body = ApiResponse<Vec<MedicineResponse>>),
    )
)]
pub async fn list_medicines(State(state): State<AppState>) -> ApiResult<Vec<MedicineResponse>> {
    let medicines = state.services.medicines.list_medicines().await?;
    Ok(success_response(medicines))
}

#[utoipa::path(
    get,
    path = "/api/v1/medicines/{id}",
    tag = "Medicines",
    summary = "Get medicine",
    params(("id" = String, Path, description = "Medicine id")),
    responses(
        (status = 200, description = "Medicine retrieved", body = ApiResponse<MedicineResponse>),
        (status = 404, description = "Medicine not found", body = ErrorResponse),
    )
)]
pub async fn get_medicine(
    State(state): State<AppState>,
    IdPath(id): IdPath<String>,
) -> ApiResult<MedicineResponse> {
    let medicine = state.services.medicines.get_medicine(&id).await?;
    Ok(success_response(medicine))
}

#[utoipa::path(
    put,
    path = "/api/v1/medicines/{id}",
    tag = "Medicines",
    summary = "Update medicine",
    description = "Partial update: only the supplied fields change",
    params(("id" = String, Path, description = "Medicine id")),
    request_body = UpdateMedicineRequest,
    responses(
        (status = 200, description = "Medicine updated", body = ApiResponse<MedicineResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 404, description = "Medicine not found", body = ErrorResponse),
    )
)]
pub async fn update_medicine(
    State(state): State<AppState>,
    IdPath(id): IdPath<String>,
    ValidatedJson(request): ValidatedJson<UpdateMedicineRequest>,
) -> ApiResult<MedicineResponse> {
    let medicine = state.services.medicines.update_medicine(&id, request).await?;
    Ok(success_response(medicine))
}

#[utoipa::path(
    delete,
    path = "/api/v1/medicines/{id}",
    tag = "Medicines",
    summary = "Delete medicine",
    description = "Removes the medicine. Recorded sales are kept.",
    params(("id" = String, Path, description = "Medicine id")),
    responses(
        (status = 200, description = "Medicine deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Medicine not found", body = ErrorResponse),
    )
)]
pub async fn delete_medicine(
    State(state): State<AppState>,
    IdPath(id): IdPath<String>,
) -> ApiResult<MessageResponse> {
    state.services.medicines.delete_medicine(&id).await?;
    Ok(success_response(MessageResponse::new(MEDICINE_DELETED_MESSAGE)))
}
