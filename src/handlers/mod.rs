pub mod common;
pub mod medicines;
pub mod orders;
pub mod sales;
pub mod vendors;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    medicines::MedicineService, orders::OrderService, sales::SaleService, vendors::VendorService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub medicines: Arc<MedicineService>,
    pub sales: Arc<SaleService>,
    pub vendors: Arc<VendorService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            medicines: Arc::new(MedicineService::new(db_pool.clone(), event_sender.clone())),
            sales: Arc::new(SaleService::new(db_pool.clone(), event_sender.clone())),
            vendors: Arc::new(VendorService::new(db_pool.clone(), event_sender.clone())),
            orders: Arc::new(OrderService::new(db_pool, event_sender)),
        }
    }
}
