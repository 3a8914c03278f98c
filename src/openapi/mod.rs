use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pharmacy API",
        version = "1.0.0",
        description = r#"
# Pharmacy Management API

Backend for a small pharmacy: medicine stock, point-of-sale carts, and vendor purchase orders.

## Features

- **Medicines**: Register stock with price and on-hand quantity, partial updates
- **Sales**: Multi-line carts sold atomically; stock can never go negative
- **Vendors**: Vendors with their medicine catalogs
- **Orders**: Purchase orders against a vendor catalog, with full line replacement on update

## Responses

Successful calls wrap their payload:

```json
{
  "success": true,
  "data": {},
  "meta": { "request_id": "...", "timestamp": "2024-01-01T00:00:00Z" }
}
```

Errors use a flat body with the HTTP reason, a message and the request id:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock: Paracetamol (available 2, requested 3)",
  "request_id": "...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Medicines", description = "Medicine stock endpoints"),
        (name = "Sales", description = "Point-of-sale endpoints"),
        (name = "Vendors", description = "Vendor and catalog endpoints"),
        (name = "Orders", description = "Vendor purchase order endpoints")
    ),
    paths(
        // Medicines
        crate::handlers::medicines::create_medicine,
        crate::handlers::medicines::list_medicines,
        crate::handlers::medicines::get_medicine,
        crate::handlers::medicines::update_medicine,
        crate::handlers::medicines::delete_medicine,

        // Sales
        crate::handlers::sales::create_sale,
        crate::handlers::sales::list_sales,

        // Vendors
        crate::handlers::vendors::create_vendor,
        crate::handlers::vendors::list_vendors,
        crate::handlers::vendors::list_vendor_medicines,
        crate::handlers::vendors::delete_vendor,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,
            crate::handlers::common::MessageResponse,

            // Medicine types
            crate::services::medicines::CreateMedicineRequest,
            crate::services::medicines::UpdateMedicineRequest,
            crate::services::medicines::MedicineResponse,

            // Sale types
            crate::services::sales::CartItem,
            crate::services::sales::CreateSaleRequest,
            crate::services::sales::SaleReceipt,
            crate::services::sales::SaleResponse,

            // Vendor types
            crate::services::vendors::CreateVendorRequest,
            crate::services::vendors::VendorCreatedResponse,
            crate::services::vendors::VendorSummary,
            crate::services::vendors::VendorMedicineSummary,

            // Order types
            crate::services::orders::OrderLineRequest,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::UpdateOrderRequest,
            crate::services::orders::OrderLineResponse,
            crate::services::orders::OrderResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
