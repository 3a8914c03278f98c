use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order line item: a quantity of one vendor medicine. `position` keeps the
/// submitted line order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_medicines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub vendor_medicine_id: i32,
    pub quantity: i32,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::vendor_medicine::Entity",
        from = "Column::VendorMedicineId",
        to = "super::vendor_medicine::Column::Id"
    )]
    VendorMedicine,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::vendor_medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorMedicine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
