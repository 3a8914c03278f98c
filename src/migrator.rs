use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_medicines_table::Migration),
            Box::new(m20250301_000002_create_sales_table::Migration),
            Box::new(m20250301_000003_create_vendors_table::Migration),
            Box::new(m20250301_000004_create_vendor_medicines_table::Migration),
            Box::new(m20250301_000005_create_orders_table::Migration),
            Box::new(m20250301_000006_create_order_medicines_table::Migration),
        ]
    }
}

mod m20250301_000001_create_medicines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_medicines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Medicines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Medicines::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Medicines::Name).string().not_null())
                        .col(ColumnDef::new(Medicines::Manufacturer).string().null())
                        .col(
                            ColumnDef::new(Medicines::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Medicines::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_medicines_name")
                        .table(Medicines::Table)
                        .col(Medicines::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Medicines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Medicines {
        Table,
        Id,
        Name,
        Manufacturer,
        Price,
        Quantity,
    }
}

mod m20250301_000002_create_sales_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // medicine_id is deliberately not a foreign key: sale history
            // outlives the medicine it refers to.
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                        .col(ColumnDef::new(Sales::SaleGroupId).string().not_null())
                        .col(ColumnDef::new(Sales::MedicineId).string().not_null())
                        .col(ColumnDef::new(Sales::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(Sales::TotalPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sales::SaleDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_sale_group_id")
                        .table(Sales::Table)
                        .col(Sales::SaleGroupId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_medicine_id")
                        .table(Sales::Table)
                        .col(Sales::MedicineId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        SaleGroupId,
        MedicineId,
        Quantity,
        TotalPrice,
        SaleDate,
    }
}

mod m20250301_000003_create_vendors_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_vendors_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vendors::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Vendors::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Vendors::Name).string().not_null())
                        .col(ColumnDef::new(Vendors::Contact).string().not_null())
                        .col(ColumnDef::new(Vendors::Address).string().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vendors::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Vendors {
        Table,
        Id,
        Name,
        Contact,
        Address,
    }
}

mod m20250301_000004_create_vendor_medicines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_vendor_medicines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(VendorMedicines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VendorMedicines::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(VendorMedicines::Name).string().not_null())
                        .col(
                            ColumnDef::new(VendorMedicines::VendorId)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vendor_medicines_vendor_id")
                                .from(VendorMedicines::Table, VendorMedicines::VendorId)
                                .to(Vendors::Table, Vendors::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_vendor_medicines_vendor_id")
                        .table(VendorMedicines::Table)
                        .col(VendorMedicines::VendorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VendorMedicines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum VendorMedicines {
        Table,
        Id,
        Name,
        VendorId,
    }

    #[derive(DeriveIden)]
    enum Vendors {
        Table,
        Id,
    }
}

mod m20250301_000005_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::VendorId).integer().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string()
                                .not_null()
                                .default("in_progress"),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_vendor_id")
                                .from(Orders::Table, Orders::VendorId)
                                .to(Vendors::Table, Vendors::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_vendor_id")
                        .table(Orders::Table)
                        .col(Orders::VendorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        VendorId,
        OrderDate,
        Status,
    }

    #[derive(DeriveIden)]
    enum Vendors {
        Table,
        Id,
    }
}

mod m20250301_000006_create_order_medicines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_order_medicines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderMedicines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderMedicines::OrderId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderMedicines::VendorMedicineId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderMedicines::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderMedicines::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .primary_key(
                            Index::create()
                                .col(OrderMedicines::OrderId)
                                .col(OrderMedicines::VendorMedicineId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_medicines_order_id")
                                .from(OrderMedicines::Table, OrderMedicines::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_medicines_vendor_medicine_id")
                                .from(OrderMedicines::Table, OrderMedicines::VendorMedicineId)
                                .to(VendorMedicines::Table, VendorMedicines::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderMedicines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderMedicines {
        Table,
        OrderId,
        VendorMedicineId,
        Quantity,
        Position,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum VendorMedicines {
        Table,
        Id,
    }
}
