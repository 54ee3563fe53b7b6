use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_inventory_tables::Migration),
            Box::new(m20240101_000003_create_accounts_tables::Migration),
        ]
    }
}

// Unique indexes on slug columns carry "slug" in their name and no other
// unique index does; conflict detection in `crate::slug` relies on it.

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Categories::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::ParentId).uuid().null())
                        .col(
                            ColumnDef::new(Categories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_categories_parent")
                                .from(Categories::Table, Categories::ParentId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_slug")
                        .table(Categories::Table)
                        .col(Categories::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_parent_name")
                        .table(Categories::Table)
                        .col(Categories::ParentId)
                        .col(Categories::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Brands::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Brands::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Brands::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Brands::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Brands::Description).text().null())
                        .col(ColumnDef::new(Brands::Website).string_len(200).null())
                        .col(
                            ColumnDef::new(Brands::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Brands::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Brands::UpdatedAt)
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
                        .name("idx_brands_slug")
                        .table(Brands::Table)
                        .col(Brands::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_brands_name")
                        .table(Brands::Table)
                        .col(Brands::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Sku).string_len(120).null())
                        .col(
                            ColumnDef::new(Products::ProductType)
                                .string_len(20)
                                .not_null()
                                .default("simple"),
                        )
                        .col(ColumnDef::new(Products::CategoryId).uuid().null())
                        .col(ColumnDef::new(Products::BrandId).uuid().null())
                        .col(ColumnDef::new(Products::ShortDescription).text().null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(
                            ColumnDef::new(Products::Status)
                                .string_len(20)
                                .not_null()
                                .default("draft"),
                        )
                        .col(ColumnDef::new(Products::WeightGrams).integer().null())
                        .col(ColumnDef::new(Products::Dimensions).json().null())
                        .col(ColumnDef::new(Products::CountryOfOrigin).string_len(2).null())
                        .col(
                            ColumnDef::new(Products::IsReturnable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::IsCodAllowed)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::SeoTitle).string_len(255).null())
                        .col(ColumnDef::new(Products::SeoDescription).text().null())
                        .col(ColumnDef::new(Products::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_brand")
                                .from(Products::Table, Products::BrandId)
                                .to(Brands::Table, Brands::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_slug")
                        .table(Products::Table)
                        .col(Products::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_status")
                        .table(Products::Table)
                        .col(Products::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Variants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Variants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Variants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Variants::Sku).string_len(120).not_null())
                        .col(ColumnDef::new(Variants::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Variants::Barcode).string_len(255).null())
                        .col(ColumnDef::new(Variants::Name).string_len(255).null())
                        .col(
                            ColumnDef::new(Variants::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Variants::CompareAtPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Variants::CostPrice).decimal_len(12, 2).null())
                        .col(ColumnDef::new(Variants::TaxCode).string_len(50).null())
                        .col(ColumnDef::new(Variants::WeightGrams).integer().null())
                        .col(
                            ColumnDef::new(Variants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Variants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Variants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_variants_product")
                                .from(Variants::Table, Variants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variants_slug")
                        .table(Variants::Table)
                        .col(Variants::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variants_sku")
                        .table(Variants::Table)
                        .col(Variants::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variants_product_id")
                        .table(Variants::Table)
                        .col(Variants::ProductId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Variants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Brands::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Categories {
        Table,
        Id,
        Name,
        Slug,
        Description,
        ParentId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Brands {
        Table,
        Id,
        Name,
        Slug,
        Description,
        Website,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        Name,
        Slug,
        Sku,
        ProductType,
        CategoryId,
        BrandId,
        ShortDescription,
        Description,
        Status,
        WeightGrams,
        Dimensions,
        CountryOfOrigin,
        IsReturnable,
        IsCodAllowed,
        SeoTitle,
        SeoDescription,
        Metadata,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Variants {
        Table,
        Id,
        ProductId,
        Sku,
        Slug,
        Barcode,
        Name,
        Price,
        CompareAtPrice,
        CostPrice,
        TaxCode,
        WeightGrams,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_inventory_tables {

    use super::m20240101_000001_create_catalog_tables::{Products, Variants};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_inventory_tables"
        }
    }

    // Unique indexes treat NULLs as distinct, so each nullable combination of
    // the (product, variant, warehouse) key gets its own partial index.
    const PARTIAL_UNIQUE_INDEXES: &[&str] = &[
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_stocks_product_warehouse_no_variant \
         ON stocks (product_id, warehouse_id) WHERE variant_id IS NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_prices_product_warehouse_no_variant \
         ON product_prices (product_id, warehouse_id) WHERE variant_id IS NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_prices_product_variant_global \
         ON product_prices (product_id, variant_id) WHERE warehouse_id IS NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_prices_product_global_no_variant \
         ON product_prices (product_id) WHERE variant_id IS NULL AND warehouse_id IS NULL",
    ];

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Warehouses::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Warehouses::Address).text().null())
                        .col(ColumnDef::new(Warehouses::City).string_len(100).null())
                        .col(ColumnDef::new(Warehouses::State).string_len(100).null())
                        .col(ColumnDef::new(Warehouses::PostalCode).string_len(20).null())
                        .col(ColumnDef::new(Warehouses::Country).string_len(100).null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
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
                        .name("idx_warehouses_slug")
                        .table(Warehouses::Table)
                        .col(Warehouses::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouses_name")
                        .table(Warehouses::Table)
                        .col(Warehouses::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Stocks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stocks::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stocks::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(Stocks::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Stocks::VariantId).uuid().null())
                        .col(ColumnDef::new(Stocks::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Stocks::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::MinQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::MaxQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Stocks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stocks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_product")
                                .from(Stocks::Table, Stocks::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_variant")
                                .from(Stocks::Table, Stocks::VariantId)
                                .to(Variants::Table, Variants::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_warehouse")
                                .from(Stocks::Table, Stocks::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stocks_slug")
                        .table(Stocks::Table)
                        .col(Stocks::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_stocks_product_variant_warehouse")
                        .table(Stocks::Table)
                        .col(Stocks::ProductId)
                        .col(Stocks::VariantId)
                        .col(Stocks::WarehouseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductPrices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductPrices::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductPrices::Slug).string_len(255).not_null())
                        .col(ColumnDef::new(ProductPrices::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductPrices::VariantId).uuid().null())
                        .col(ColumnDef::new(ProductPrices::WarehouseId).uuid().null())
                        .col(
                            ColumnDef::new(ProductPrices::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::CompareAtPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::CostPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::Currency)
                                .string_len(5)
                                .not_null()
                                .default("USD"),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_prices_product")
                                .from(ProductPrices::Table, ProductPrices::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_prices_variant")
                                .from(ProductPrices::Table, ProductPrices::VariantId)
                                .to(Variants::Table, Variants::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_prices_warehouse")
                                .from(ProductPrices::Table, ProductPrices::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_prices_slug")
                        .table(ProductPrices::Table)
                        .col(ProductPrices::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_prices_product_variant_warehouse")
                        .table(ProductPrices::Table)
                        .col(ProductPrices::ProductId)
                        .col(ProductPrices::VariantId)
                        .col(ProductPrices::WarehouseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Slug)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::StockId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::TransactionType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Note).text().null())
                        .col(
                            ColumnDef::new(StockTransactions::Reference)
                                .string_len(255)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_transactions_stock")
                                .from(StockTransactions::Table, StockTransactions::StockId)
                                .to(Stocks::Table, Stocks::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_slug")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_stock_created_at")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::StockId)
                        .col(StockTransactions::CreatedAt)
                        .to_owned(),
                )
                .await?;

            let db = manager.get_connection();
            for statement in PARTIAL_UNIQUE_INDEXES {
                db.execute_unprepared(statement).await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductPrices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stocks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Name,
        Slug,
        Address,
        City,
        State,
        PostalCode,
        Country,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Stocks {
        Table,
        Id,
        Slug,
        ProductId,
        VariantId,
        WarehouseId,
        Quantity,
        ReservedQuantity,
        MinQuantity,
        MaxQuantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductPrices {
        Table,
        Id,
        Slug,
        ProductId,
        VariantId,
        WarehouseId,
        Price,
        CompareAtPrice,
        CostPrice,
        Currency,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockTransactions {
        Table,
        Id,
        Slug,
        StockId,
        TransactionType,
        Quantity,
        Note,
        Reference,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_accounts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_accounts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string_len(254).not_null())
                        .col(
                            ColumnDef::new(Users::FullName)
                                .string_len(100)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Users::Phone)
                                .string_len(15)
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Users::Slug).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
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
                        .name("idx_users_slug")
                        .table(Users::Table)
                        .col(Users::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Addresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Addresses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Addresses::UserId).uuid().not_null())
                        .col(ColumnDef::new(Addresses::FullName).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Addresses::StreetAddress)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Addresses::City).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::State).string_len(100).not_null())
                        .col(ColumnDef::new(Addresses::PostalCode).string_len(20).not_null())
                        .col(ColumnDef::new(Addresses::Country).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Addresses::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Addresses::Slug).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Addresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Addresses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_addresses_user")
                                .from(Addresses::Table, Addresses::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_addresses_slug")
                        .table(Addresses::Table)
                        .col(Addresses::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_addresses_user_id")
                        .table(Addresses::Table)
                        .col(Addresses::UserId)
                        .to_owned(),
                )
                .await?;

            // At most one default address per user.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uq_addresses_user_default \
                     ON addresses (user_id) WHERE is_default",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Addresses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        FullName,
        Phone,
        Slug,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Addresses {
        Table,
        Id,
        UserId,
        FullName,
        StreetAddress,
        City,
        State,
        PostalCode,
        Country,
        IsDefault,
        Slug,
        CreatedAt,
        UpdatedAt,
    }
}
