use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An entry of a vendor's catalog; order line items point here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_medicines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub vendor_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id"
    )]
    Vendor,
    #[sea_orm(has_many = "super::order_medicine::Entity")]
    OrderMedicine,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::order_medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderMedicine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
