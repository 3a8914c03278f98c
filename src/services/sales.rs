use crate::{
    db::DbPool,
    entities::{
        medicine::{self, Entity as MedicineEntity},
        sale::{self, ActiveModel as SaleActiveModel, Entity as SaleEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartItem {
    #[validate(length(min = 1, message = "Medicine id is required"))]
    pub medicine_id: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    #[validate(length(min = 1, message = "Cart cannot be empty"))]
    #[validate]
    pub cart: Vec<CartItem>,
}

/// Result of a completed sale. `id` is the sale-group id shared by every line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleReceipt {
    pub id: String,
    pub sale_date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 30.0)]
    pub total_price: Decimal,
    pub cart: Vec<CartItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub id: String,
    pub sale_group_id: String,
    pub medicine_id: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_price: Decimal,
    pub sale_date: DateTime<Utc>,
}

impl From<sale::Model> for SaleResponse {
    fn from(model: sale::Model) -> Self {
        Self {
            id: model.id,
            sale_group_id: model.sale_group_id,
            medicine_id: model.medicine_id,
            quantity: model.quantity,
            total_price: model.total_price,
            sale_date: model.sale_date,
        }
    }
}

#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Sells every line of the cart or nothing.
    ///
    /// Lines are applied in order inside one transaction, so a later line for
    /// the same medicine sees the stock left by earlier ones. Any failure rolls
    /// back every deduction and sale row of the cart.
    #[instrument(skip(self, request), fields(lines = request.cart.len()))]
    pub async fn process_sale(&self, request: CreateSaleRequest) -> Result<SaleReceipt, ServiceError> {
        request.validate()?;

        let sale_group_id = Uuid::new_v4().to_string();
        let sale_date = Utc::now();

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for sale");
            ServiceError::DatabaseError(e)
        })?;

        let total_price = match apply_cart(&txn, &request.cart, &sale_group_id, sale_date).await {
            Ok(total) => total,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, sale_group_id = %sale_group_id, "Failed to roll back sale");
                }
                warn!(error = %e, sale_group_id = %sale_group_id, "Sale rejected");
                counter!("pharmacy_sales.rejected", 1);
                return Err(e);
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_group_id = %sale_group_id, "Failed to commit sale");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            sale_group_id = %sale_group_id,
            total_price = %total_price,
            "Sale recorded"
        );
        counter!("pharmacy_sales.completed", 1);

        self.event_sender
            .send_or_log(Event::SaleRecorded {
                sale_group_id: sale_group_id.clone(),
                total_price,
                lines: request.cart.len(),
            })
            .await;

        Ok(SaleReceipt {
            id: sale_group_id,
            sale_date,
            total_price,
            cart: request.cart,
        })
    }

    /// Lists every recorded sale line, newest first
    #[instrument(skip(self))]
    pub async fn list_sales(&self) -> Result<Vec<SaleResponse>, ServiceError> {
        let sales = SaleEntity::find()
            .order_by_desc(sale::Column::SaleDate)
            .order_by_asc(sale::Column::Id)
            .all(&*self.db_pool)
            .await?;

        Ok(sales.into_iter().map(Into::into).collect())
    }
}

async fn apply_cart(
    txn: &DatabaseTransaction,
    cart: &[CartItem],
    sale_group_id: &str,
    sale_date: DateTime<Utc>,
) -> Result<Decimal, ServiceError> {
    let mut total_price = Decimal::ZERO;

    for item in cart {
        let medicine = MedicineEntity::find_by_id(item.medicine_id.clone())
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Medicine {} not found", item.medicine_id))
            })?;

        if medicine.quantity < item.quantity {
            return Err(insufficient_stock(&medicine, item.quantity));
        }

        // Guarded decrement: a concurrent sale that got there first leaves
        // no row matching `quantity >= n`.
        let deducted = MedicineEntity::update_many()
            .col_expr(
                medicine::Column::Quantity,
                Expr::col(medicine::Column::Quantity).sub(item.quantity),
            )
            .filter(medicine::Column::Id.eq(medicine.id.as_str()))
            .filter(medicine::Column::Quantity.gte(item.quantity))
            .exec(txn)
            .await?;

        if deducted.rows_affected == 0 {
            return Err(insufficient_stock(&medicine, item.quantity));
        }

        let line_total = medicine.price * Decimal::from(item.quantity);
        total_price += line_total;

        SaleActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            sale_group_id: Set(sale_group_id.to_string()),
            medicine_id: Set(medicine.id.clone()),
            quantity: Set(item.quantity),
            total_price: Set(line_total),
            sale_date: Set(sale_date),
        }
        .insert(txn)
        .await?;
    }

    Ok(total_price)
}

fn insufficient_stock(medicine: &medicine::Model, requested: i32) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "{} (available {}, requested {})",
        medicine.name, medicine.quantity, requested
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::medicine::ActiveModel as MedicineActiveModel;
    use crate::services::test_support::TestDb;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use sea_orm::PaginatorTrait;

    async fn seed_medicine(test_db: &TestDb, id: &str, price: Decimal, quantity: i32) {
        MedicineActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("Medicine {}", id)),
            manufacturer: Set(None),
            price: Set(price),
            quantity: Set(quantity),
        }
        .insert(&*test_db.pool)
        .await
        .unwrap();
    }

    async fn stock_of(test_db: &TestDb, id: &str) -> i32 {
        MedicineEntity::find_by_id(id.to_string())
            .one(&*test_db.pool)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    async fn sale_rows(test_db: &TestDb) -> u64 {
        SaleEntity::find().count(&*test_db.pool).await.unwrap()
    }

    fn cart(lines: &[(&str, i32)]) -> CreateSaleRequest {
        CreateSaleRequest {
            cart: lines
                .iter()
                .map(|(id, qty)| CartItem {
                    medicine_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn sale_within_stock_deducts_and_totals() {
        let mut test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(10.0), 5).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        let receipt = service.process_sale(cart(&[("M1", 3)])).await.unwrap();

        assert_eq!(receipt.total_price, dec!(30));
        assert_eq!(receipt.cart, cart(&[("M1", 3)]).cart);
        assert_eq!(stock_of(&test_db, "M1").await, 2);
        assert_eq!(sale_rows(&test_db).await, 1);

        let events = test_db.drain_events();
        assert_matches!(
            events.as_slice(),
            [Event::SaleRecorded { sale_group_id, lines: 1, .. }] if *sale_group_id == receipt.id
        );
    }

    #[tokio::test]
    async fn sale_above_stock_is_rejected_and_leaves_stock_untouched() {
        let mut test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(10.0), 2).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        let result = service.process_sale(cart(&[("M1", 3)])).await;

        assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
        assert_eq!(stock_of(&test_db, "M1").await, 2);
        assert_eq!(sale_rows(&test_db).await, 0);
        assert!(test_db.drain_events().is_empty());
    }

    #[tokio::test]
    async fn failing_later_line_rolls_back_earlier_lines() {
        let test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(2.5), 10).await;
        seed_medicine(&test_db, "M2", dec!(7), 1).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        let result = service.process_sale(cart(&[("M1", 4), ("M2", 5)])).await;

        assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
        assert_eq!(stock_of(&test_db, "M1").await, 10);
        assert_eq!(stock_of(&test_db, "M2").await, 1);
        assert_eq!(sale_rows(&test_db).await, 0);
    }

    #[tokio::test]
    async fn unknown_medicine_is_not_found_and_nothing_persists() {
        let test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(1), 3).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        let result = service.process_sale(cart(&[("M1", 1), ("ghost", 1)])).await;

        assert_matches!(result, Err(ServiceError::NotFound(_)));
        assert_eq!(stock_of(&test_db, "M1").await, 3);
        assert_eq!(sale_rows(&test_db).await, 0);
    }

    #[tokio::test]
    async fn repeated_lines_see_earlier_deductions() {
        let test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(10), 5).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        let result = service.process_sale(cart(&[("M1", 3), ("M1", 3)])).await;
        assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
        assert_eq!(stock_of(&test_db, "M1").await, 5);

        let receipt = service
            .process_sale(cart(&[("M1", 3), ("M1", 2)]))
            .await
            .unwrap();
        assert_eq!(receipt.total_price, dec!(50));
        assert_eq!(stock_of(&test_db, "M1").await, 0);

        let rows = service.list_sales().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].id, rows[1].id);
        assert!(rows.iter().all(|row| row.sale_group_id == receipt.id));
    }

    #[tokio::test]
    async fn empty_cart_and_zero_quantity_are_validation_errors() {
        let test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(10), 5).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());

        assert_matches!(
            service.process_sale(cart(&[])).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            service.process_sale(cart(&[("M1", 0)])).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(stock_of(&test_db, "M1").await, 5);
    }

    #[tokio::test]
    async fn sale_history_survives_medicine_delete() {
        let test_db = TestDb::new().await;
        seed_medicine(&test_db, "M1", dec!(3), 5).await;
        let service = SaleService::new(test_db.pool.clone(), test_db.events.clone());
        service.process_sale(cart(&[("M1", 1)])).await.unwrap();

        MedicineEntity::delete_by_id("M1".to_string())
            .exec(&*test_db.pool)
            .await
            .unwrap();

        let rows = service.list_sales().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].medicine_id, "M1");
        assert_eq!(rows[0].total_price, dec!(3));
    }
}
