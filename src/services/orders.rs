use crate::{
    db::DbPool,
    entities::{
        order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
        order_medicine::{self, ActiveModel as OrderMedicineActiveModel, Entity as OrderMedicineEntity},
        vendor::{self, Entity as VendorEntity},
        vendor_medicine::{self, Entity as VendorMedicineEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::serde_helpers::{flexible_datetime, option_flexible_datetime},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

fn default_status() -> String {
    order::DEFAULT_STATUS.to_string()
}

/// One requested line: a quantity of a vendor catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineRequest {
    /// Vendor medicine id
    pub medicine_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// `order_date` accepts `YYYY-MM-DD`, a naive date-time (read as UTC) or RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub vendor_id: i32,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    #[schema(value_type = String, example = "2024-03-01")]
    pub order_date: DateTime<Utc>,
    #[serde(default = "default_status")]
    #[validate(length(min = 1, message = "Status cannot be empty"))]
    pub status: String,
    #[serde(default)]
    #[validate]
    pub medicines: Vec<OrderLineRequest>,
}

/// Supplied fields overwrite. A blank `status` or an empty `medicines` list
/// counts as not supplied; a non-empty list replaces every existing line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    #[serde(default, deserialize_with = "option_flexible_datetime::deserialize")]
    #[schema(value_type = Option<String>, example = "2024-03-01")]
    pub order_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub medicines: Option<Vec<OrderLineRequest>>,
}

impl UpdateOrderRequest {
    fn supplied_status(&self) -> Option<&str> {
        self.status.as_deref().filter(|status| !status.trim().is_empty())
    }

    fn supplied_lines(&self) -> Option<&[OrderLineRequest]> {
        self.medicines.as_deref().filter(|lines| !lines.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    /// Vendor medicine id
    pub id: i32,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub vendor_id: i32,
    pub vendor_name: String,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub medicines: Vec<OrderLineResponse>,
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an order and its lines in one transaction
    #[instrument(skip(self, request), fields(vendor_id = request.vendor_id, lines = request.medicines.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let vendor = VendorEntity::find_by_id(request.vendor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Vendor {} does not exist", request.vendor_id))
            })?;

        let names = catalog_names(&txn, vendor.id, &request.medicines).await?;

        let order = OrderActiveModel {
            vendor_id: Set(vendor.id),
            order_date: Set(request.order_date),
            status: Set(request.status),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, vendor_id = vendor.id, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        insert_lines(&txn, order.id, &request.medicines).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = order.id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = order.id, vendor_id = vendor.id, "Order created");
        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;

        Ok(OrderResponse {
            id: order.id,
            vendor_id: vendor.id,
            vendor_name: vendor.name,
            order_date: order.order_date,
            status: order.status,
            medicines: request
                .medicines
                .iter()
                .map(|line| OrderLineResponse {
                    id: line.medicine_id,
                    name: names.get(&line.medicine_id).cloned().unwrap_or_default(),
                    quantity: line.quantity,
                })
                .collect(),
        })
    }

    /// Lists every order with its vendor name and lines
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = OrderEntity::find()
            .find_also_related(VendorEntity)
            .order_by_asc(order::Column::Id)
            .all(&*self.db_pool)
            .await?;

        self.with_lines(orders).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderResponse, ServiceError> {
        let found = OrderEntity::find_by_id(order_id)
            .find_also_related(VendorEntity)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        self.with_lines(vec![found])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("Order {} vanished", order_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        order_id: i32,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        let status = request.supplied_status();
        let lines = request.supplied_lines();
        for line in lines.unwrap_or_default() {
            line.validate()?;
        }

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order update");
            ServiceError::DatabaseError(e)
        })?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let vendor_id = existing.vendor_id;

        if request.order_date.is_some() || status.is_some() {
            let mut active: OrderActiveModel = existing.into();
            if let Some(order_date) = request.order_date {
                active.order_date = Set(order_date);
            }
            if let Some(status) = status {
                active.status = Set(status.to_string());
            }
            active.update(&txn).await.map_err(|e| {
                error!(error = %e, order_id, "Failed to update order");
                ServiceError::DatabaseError(e)
            })?;
        }

        if let Some(lines) = lines {
            catalog_names(&txn, vendor_id, lines).await?;

            OrderMedicineEntity::delete_many()
                .filter(order_medicine::Column::OrderId.eq(order_id))
                .exec(&txn)
                .await?;

            insert_lines(&txn, order_id, lines).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order update");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, replaced_lines = lines.is_some(), "Order updated");
        self.event_sender
            .send_or_log(Event::OrderUpdated(order_id))
            .await;

        self.get_order(order_id).await
    }

    /// Deletes an order and its lines
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order deletion");
            ServiceError::DatabaseError(e)
        })?;

        OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        OrderMedicineEntity::delete_many()
            .filter(order_medicine::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;

        OrderEntity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, "Order deleted");
        self.event_sender
            .send_or_log(Event::OrderDeleted(order_id))
            .await;

        Ok(())
    }

    /// Attaches lines to already-joined orders with one extra query.
    async fn with_lines(
        &self,
        orders: Vec<(order::Model, Option<vendor::Model>)>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = orders.iter().map(|(o, _)| o.id).collect();
        let rows = OrderMedicineEntity::find()
            .filter(order_medicine::Column::OrderId.is_in(order_ids))
            .find_also_related(VendorMedicineEntity)
            .order_by_asc(order_medicine::Column::OrderId)
            .order_by_asc(order_medicine::Column::Position)
            .all(&*self.db_pool)
            .await?;

        let mut lines_by_order: HashMap<i32, Vec<OrderLineResponse>> = HashMap::new();
        for (line, catalog_entry) in rows {
            lines_by_order
                .entry(line.order_id)
                .or_default()
                .push(OrderLineResponse {
                    id: line.vendor_medicine_id,
                    name: catalog_entry.map(|m| m.name).unwrap_or_default(),
                    quantity: line.quantity,
                });
        }

        Ok(orders
            .into_iter()
            .map(|(order, vendor)| OrderResponse {
                medicines: lines_by_order.remove(&order.id).unwrap_or_default(),
                id: order.id,
                vendor_id: order.vendor_id,
                vendor_name: vendor.map(|v| v.name).unwrap_or_default(),
                order_date: order.order_date,
                status: order.status,
            })
            .collect())
    }
}

/// Checks that every line names a distinct entry of the vendor's catalog and
/// returns the names of those entries.
async fn catalog_names(
    txn: &DatabaseTransaction,
    vendor_id: i32,
    lines: &[OrderLineRequest],
) -> Result<HashMap<i32, String>, ServiceError> {
    let mut seen = HashSet::new();
    for line in lines {
        if !seen.insert(line.medicine_id) {
            return Err(ServiceError::ValidationError(format!(
                "Vendor medicine {} appears more than once",
                line.medicine_id
            )));
        }
    }

    if lines.is_empty() {
        return Ok(HashMap::new());
    }

    let entries = VendorMedicineEntity::find()
        .filter(vendor_medicine::Column::Id.is_in(seen.iter().copied()))
        .all(txn)
        .await?;
    let entries: HashMap<i32, vendor_medicine::Model> =
        entries.into_iter().map(|m| (m.id, m)).collect();

    let mut names = HashMap::with_capacity(lines.len());
    for line in lines {
        let entry = entries.get(&line.medicine_id).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Vendor medicine {} does not exist",
                line.medicine_id
            ))
        })?;
        if entry.vendor_id != vendor_id {
            return Err(ServiceError::ValidationError(format!(
                "Vendor medicine {} is not offered by vendor {}",
                line.medicine_id, vendor_id
            )));
        }
        names.insert(entry.id, entry.name.clone());
    }

    Ok(names)
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    order_id: i32,
    lines: &[OrderLineRequest],
) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Ok(());
    }

    let models = lines
        .iter()
        .enumerate()
        .map(|(position, line)| OrderMedicineActiveModel {
            order_id: Set(order_id),
            vendor_medicine_id: Set(line.medicine_id),
            quantity: Set(line.quantity),
            position: Set(position as i32),
        });

    OrderMedicineEntity::insert_many(models)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestDb;
    use crate::services::vendors::{CreateVendorRequest, VendorService};
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use sea_orm::PaginatorTrait;

    struct Fixture {
        test_db: TestDb,
        orders: OrderService,
        vendor_id: i32,
        catalog: Vec<i32>,
    }

    async fn fixture() -> Fixture {
        let test_db = TestDb::new().await;
        let vendors = VendorService::new(test_db.pool.clone(), test_db.events.clone());
        let vendor_id = vendors
            .create_vendor(CreateVendorRequest {
                name: "Acme Pharma".into(),
                contact: "555-0100".into(),
                address: "1 Main St".into(),
                medicines: vec!["Amoxicillin".into(), "Ibuprofen".into(), "Zinc".into()],
            })
            .await
            .unwrap()
            .vendor_id;
        let catalog = vendors
            .list_vendor_medicines(vendor_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        let orders = OrderService::new(test_db.pool.clone(), test_db.events.clone());

        Fixture {
            test_db,
            orders,
            vendor_id,
            catalog,
        }
    }

    fn order_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn line(medicine_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            medicine_id,
            quantity,
        }
    }

    fn create_request(vendor_id: i32, lines: Vec<OrderLineRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            vendor_id,
            order_date: order_date(),
            status: default_status(),
            medicines: lines,
        }
    }

    #[tokio::test]
    async fn create_returns_enriched_order_in_submitted_line_order() {
        let fx = fixture().await;

        let created = fx
            .orders
            .create_order(create_request(
                fx.vendor_id,
                vec![line(fx.catalog[2], 5), line(fx.catalog[0], 1)],
            ))
            .await
            .unwrap();

        assert_eq!(created.vendor_name, "Acme Pharma");
        assert_eq!(created.status, "in_progress");
        assert_eq!(created.order_date, order_date());
        assert_eq!(
            created.medicines,
            vec![
                OrderLineResponse {
                    id: fx.catalog[2],
                    name: "Zinc".into(),
                    quantity: 5
                },
                OrderLineResponse {
                    id: fx.catalog[0],
                    name: "Amoxicillin".into(),
                    quantity: 1
                },
            ]
        );

        let fetched = fx.orders.get_order(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_unknown_vendor_unknown_medicine_and_duplicates() {
        let fx = fixture().await;

        assert_matches!(
            fx.orders.create_order(create_request(999, vec![])).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            fx.orders
                .create_order(create_request(fx.vendor_id, vec![line(999, 1)]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            fx.orders
                .create_order(create_request(
                    fx.vendor_id,
                    vec![line(fx.catalog[0], 1), line(fx.catalog[0], 2)]
                ))
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            fx.orders
                .create_order(create_request(fx.vendor_id, vec![line(fx.catalog[0], 0)]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(
            OrderEntity::find().count(&*fx.test_db.pool).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn create_rejects_medicine_from_another_vendor() {
        let fx = fixture().await;
        let other = VendorService::new(fx.test_db.pool.clone(), fx.test_db.events.clone());
        let other_id = other
            .create_vendor(CreateVendorRequest {
                name: "Other".into(),
                contact: "c".into(),
                address: "a".into(),
                medicines: vec![],
            })
            .await
            .unwrap()
            .vendor_id;

        assert_matches!(
            fx.orders
                .create_order(create_request(other_id, vec![line(fx.catalog[0], 1)]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn list_returns_every_order_with_its_own_lines() {
        let fx = fixture().await;
        let first = fx
            .orders
            .create_order(create_request(fx.vendor_id, vec![line(fx.catalog[0], 1)]))
            .await
            .unwrap();
        let second = fx
            .orders
            .create_order(create_request(
                fx.vendor_id,
                vec![line(fx.catalog[1], 2), line(fx.catalog[2], 3)],
            ))
            .await
            .unwrap();
        let empty = fx
            .orders
            .create_order(create_request(fx.vendor_id, vec![]))
            .await
            .unwrap();

        let listed = fx.orders.list_orders().await.unwrap();
        assert_eq!(listed, vec![first, second, empty]);
    }

    #[tokio::test]
    async fn update_with_new_list_replaces_lines_wholesale() {
        let fx = fixture().await;
        let created = fx
            .orders
            .create_order(create_request(
                fx.vendor_id,
                vec![line(fx.catalog[0], 1), line(fx.catalog[1], 2)],
            ))
            .await
            .unwrap();

        let updated = fx
            .orders
            .update_order(
                created.id,
                UpdateOrderRequest {
                    medicines: Some(vec![line(fx.catalog[2], 7)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            updated.medicines,
            vec![OrderLineResponse {
                id: fx.catalog[2],
                name: "Zinc".into(),
                quantity: 7
            }]
        );
        assert_eq!(updated.status, created.status);
        assert_eq!(
            OrderMedicineEntity::find()
                .count(&*fx.test_db.pool)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn update_status_only_keeps_lines_and_empty_list_is_ignored() {
        let fx = fixture().await;
        let created = fx
            .orders
            .create_order(create_request(fx.vendor_id, vec![line(fx.catalog[0], 1)]))
            .await
            .unwrap();

        let updated = fx
            .orders
            .update_order(
                created.id,
                UpdateOrderRequest {
                    status: Some("delivered".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "delivered");
        assert_eq!(updated.medicines, created.medicines);

        let unchanged = fx
            .orders
            .update_order(
                created.id,
                UpdateOrderRequest {
                    status: Some("  ".into()),
                    medicines: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unchanged.medicines, created.medicines);
        assert_eq!(unchanged.status, "delivered");
    }

    #[tokio::test]
    async fn date_only_order_dates_are_read_as_utc_midnight() {
        let fx = fixture().await;
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "vendor_id": fx.vendor_id,
            "order_date": "2024-03-01",
            "medicines": [{ "medicine_id": fx.catalog[0], "quantity": 2 }]
        }))
        .unwrap();
        let created = fx.orders.create_order(request).await.unwrap();
        assert_eq!(created.order_date, midnight);
        assert_eq!(fx.orders.get_order(created.id).await.unwrap().order_date, midnight);

        let update: UpdateOrderRequest =
            serde_json::from_value(serde_json::json!({ "order_date": "2024-04-15" })).unwrap();
        let updated = fx.orders.update_order(created.id, update).await.unwrap();
        assert_eq!(
            updated.order_date,
            Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(updated.medicines, created.medicines);

        let naive: UpdateOrderRequest =
            serde_json::from_value(serde_json::json!({ "order_date": "2024-04-15T09:30:00" }))
                .unwrap();
        assert_eq!(
            naive.order_date,
            Some(Utc.with_ymd_and_hms(2024, 4, 15, 9, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn invalid_update_changes_nothing() {
        let fx = fixture().await;
        let created = fx
            .orders
            .create_order(create_request(fx.vendor_id, vec![line(fx.catalog[0], 1)]))
            .await
            .unwrap();

        assert_matches!(
            fx.orders
                .update_order(
                    created.id,
                    UpdateOrderRequest {
                        status: Some("sent".into()),
                        medicines: Some(vec![line(999, 1)]),
                        ..Default::default()
                    },
                )
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            fx.orders
                .update_order(
                    created.id,
                    UpdateOrderRequest {
                        medicines: Some(vec![line(fx.catalog[1], 0)]),
                        ..Default::default()
                    },
                )
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            fx.orders
                .update_order(404, UpdateOrderRequest::default())
                .await,
            Err(ServiceError::NotFound(_))
        );

        assert_eq!(fx.orders.get_order(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn delete_removes_order_and_lines() {
        let mut fx = fixture().await;
        let created = fx
            .orders
            .create_order(create_request(fx.vendor_id, vec![line(fx.catalog[0], 1)]))
            .await
            .unwrap();

        fx.orders.delete_order(created.id).await.unwrap();

        assert_matches!(
            fx.orders.get_order(created.id).await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            fx.orders.delete_order(created.id).await,
            Err(ServiceError::NotFound(_))
        );
        assert_eq!(
            OrderMedicineEntity::find()
                .count(&*fx.test_db.pool)
                .await
                .unwrap(),
            0
        );
        assert!(fx
            .test_db
            .drain_events()
            .ends_with(&[Event::OrderCreated(created.id), Event::OrderDeleted(created.id)]));
    }
}
