use crate::{
    db::DbPool,
    entities::medicine::{self, ActiveModel as MedicineActiveModel, Entity as MedicineEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::serde_helpers::explicit_null,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMedicineRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub manufacturer: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 10.5)]
    #[validate(custom = "validate_non_negative_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

/// Partial update: absent fields keep their stored value. `manufacturer` is
/// nullable, so an explicit `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMedicineRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub manufacturer: Option<Option<String>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    #[validate(custom = "validate_non_negative_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
}

impl UpdateMedicineRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.manufacturer.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicineResponse {
    pub id: String,
    pub name: String,
    pub manufacturer: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub quantity: i32,
}

impl From<medicine::Model> for MedicineResponse {
    fn from(model: medicine::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            manufacturer: model.manufacturer,
            price: model.price,
            quantity: model.quantity,
        }
    }
}

pub(crate) fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        let mut err = ValidationError::new("price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone)]
pub struct MedicineService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MedicineService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers a new medicine with a generated id
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_medicine(
        &self,
        request: CreateMedicineRequest,
    ) -> Result<MedicineResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let medicine_id = Uuid::new_v4().to_string();

        let model = MedicineActiveModel {
            id: Set(medicine_id.clone()),
            name: Set(request.name),
            manufacturer: Set(request.manufacturer),
            price: Set(request.price),
            quantity: Set(request.quantity),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, medicine_id = %medicine_id, "Failed to create medicine");
            ServiceError::DatabaseError(e)
        })?;

        info!(medicine_id = %medicine_id, "Medicine created");
        self.event_sender
            .send_or_log(Event::MedicineCreated(medicine_id))
            .await;

        Ok(model.into())
    }

    /// Lists every medicine ordered by name
    #[instrument(skip(self))]
    pub async fn list_medicines(&self) -> Result<Vec<MedicineResponse>, ServiceError> {
        let medicines = MedicineEntity::find()
            .order_by_asc(medicine::Column::Name)
            .order_by_asc(medicine::Column::Id)
            .all(&*self.db_pool)
            .await?;

        Ok(medicines.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_medicine(&self, medicine_id: &str) -> Result<MedicineResponse, ServiceError> {
        MedicineEntity::find_by_id(medicine_id.to_string())
            .one(&*self.db_pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::NotFound(format!("Medicine {} not found", medicine_id)))
    }

    /// Applies the supplied fields of `request`; everything else is preserved
    #[instrument(skip(self, request))]
    pub async fn update_medicine(
        &self,
        medicine_id: &str,
        request: UpdateMedicineRequest,
    ) -> Result<MedicineResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for medicine update");
            ServiceError::DatabaseError(e)
        })?;

        let existing = MedicineEntity::find_by_id(medicine_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Medicine {} not found", medicine_id)))?;

        if request.is_empty() {
            txn.commit().await?;
            return Ok(existing.into());
        }

        let mut active: MedicineActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(manufacturer) = request.manufacturer {
            active.manufacturer = Set(manufacturer);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, medicine_id = %medicine_id, "Failed to update medicine");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, medicine_id = %medicine_id, "Failed to commit medicine update");
            ServiceError::DatabaseError(e)
        })?;

        info!(medicine_id = %medicine_id, "Medicine updated");
        self.event_sender
            .send_or_log(Event::MedicineUpdated(medicine_id.to_string()))
            .await;

        Ok(updated.into())
    }

    /// Deletes a medicine. Its sale rows are kept.
    #[instrument(skip(self))]
    pub async fn delete_medicine(&self, medicine_id: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = MedicineEntity::find_by_id(medicine_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Medicine {} not found", medicine_id)))?;

        existing.delete(db).await.map_err(|e| {
            error!(error = %e, medicine_id = %medicine_id, "Failed to delete medicine");
            ServiceError::DatabaseError(e)
        })?;

        info!(medicine_id = %medicine_id, "Medicine deleted");
        self.event_sender
            .send_or_log(Event::MedicineDeleted(medicine_id.to_string()))
            .await;

        Ok(())
    }
}
