use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity},
        order_medicine::{self, Entity as OrderMedicineEntity},
        vendor::{self, ActiveModel as VendorActiveModel, Entity as VendorEntity},
        vendor_medicine::{self, ActiveModel as VendorMedicineActiveModel, Entity as VendorMedicineEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const VENDOR_CREATED_MESSAGE: &str = "Vendor created with medicines";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVendorRequest {
    #[validate(length(min = 1, message = "Vendor name is required"))]
    pub name: String,
    pub contact: String,
    pub address: String,
    /// Catalog entries created with the vendor, by name
    #[serde(default)]
    #[validate(custom = "validate_medicine_names")]
    pub medicines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorCreatedResponse {
    pub vendor_id: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VendorSummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VendorMedicineSummary {
    pub id: i32,
    pub name: String,
}

fn validate_medicine_names(names: &[String]) -> Result<(), ValidationError> {
    if names.iter().any(|name| name.trim().is_empty()) {
        let mut err = ValidationError::new("medicines");
        err.message = Some("Medicine names cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone)]
pub struct VendorService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl VendorService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a vendor and its catalog in one transaction
    #[instrument(skip(self, request), fields(name = %request.name, medicines = request.medicines.len()))]
    pub async fn create_vendor(
        &self,
        request: CreateVendorRequest,
    ) -> Result<VendorCreatedResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for vendor creation");
            ServiceError::DatabaseError(e)
        })?;

        let vendor = VendorActiveModel {
            name: Set(request.name),
            contact: Set(request.contact),
            address: Set(request.address),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create vendor");
            ServiceError::DatabaseError(e)
        })?;

        for name in request.medicines {
            VendorMedicineActiveModel {
                name: Set(name),
                vendor_id: Set(vendor.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, vendor_id = vendor.id, "Failed to commit vendor creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(vendor_id = vendor.id, "Vendor created");
        self.event_sender
            .send_or_log(Event::VendorCreated(vendor.id))
            .await;

        Ok(VendorCreatedResponse {
            vendor_id: vendor.id,
            message: VENDOR_CREATED_MESSAGE.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_vendors(&self) -> Result<Vec<VendorSummary>, ServiceError> {
        let vendors = VendorEntity::find()
            .order_by_asc(vendor::Column::Id)
            .all(&*self.db_pool)
            .await?;

        Ok(vendors
            .into_iter()
            .map(|v| VendorSummary {
                id: v.id,
                name: v.name,
            })
            .collect())
    }

    /// Lists a vendor's catalog
    #[instrument(skip(self))]
    pub async fn list_vendor_medicines(
        &self,
        vendor_id: i32,
    ) -> Result<Vec<VendorMedicineSummary>, ServiceError> {
        let db = &*self.db_pool;

        VendorEntity::find_by_id(vendor_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        let medicines = VendorMedicineEntity::find()
            .filter(vendor_medicine::Column::VendorId.eq(vendor_id))
            .order_by_asc(vendor_medicine::Column::Id)
            .all(db)
            .await?;

        Ok(medicines
            .into_iter()
            .map(|m| VendorMedicineSummary {
                id: m.id,
                name: m.name,
            })
            .collect())
    }

    /// Deletes a vendor together with its orders, their lines, and its catalog
    #[instrument(skip(self))]
    pub async fn delete_vendor(&self, vendor_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for vendor deletion");
            ServiceError::DatabaseError(e)
        })?;

        VendorEntity::find_by_id(vendor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        let order_ids: Vec<i32> = OrderEntity::find()
            .select_only()
            .column(order::Column::Id)
            .filter(order::Column::VendorId.eq(vendor_id))
            .into_tuple()
            .all(&txn)
            .await?;

        let catalog_ids: Vec<i32> = VendorMedicineEntity::find()
            .select_only()
            .column(vendor_medicine::Column::Id)
            .filter(vendor_medicine::Column::VendorId.eq(vendor_id))
            .into_tuple()
            .all(&txn)
            .await?;

        OrderMedicineEntity::delete_many()
            .filter(
                order_medicine::Column::OrderId
                    .is_in(order_ids.clone())
                    .or(order_medicine::Column::VendorMedicineId.is_in(catalog_ids)),
            )
            .exec(&txn)
            .await?;

        OrderEntity::delete_many()
            .filter(order::Column::VendorId.eq(vendor_id))
            .exec(&txn)
            .await?;

        VendorMedicineEntity::delete_many()
            .filter(vendor_medicine::Column::VendorId.eq(vendor_id))
            .exec(&txn)
            .await?;

        VendorEntity::delete_by_id(vendor_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, vendor_id, "Failed to commit vendor deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(vendor_id, orders_removed = order_ids.len(), "Vendor deleted");
        self.event_sender
            .send_or_log(Event::VendorDeleted(vendor_id))
            .await;

        Ok(())
    }
}
