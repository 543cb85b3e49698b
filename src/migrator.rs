use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_files_table::Migration),
            Box::new(m20240115_000002_create_inventory_table::Migration),
        ]
    }
}

mod m20240115_000001_create_files_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_files_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Files::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Files::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Files::Name).string().not_null())
                        .col(ColumnDef::new(Files::OriginalName).string().not_null())
                        .col(ColumnDef::new(Files::Size).big_integer().not_null())
                        .col(ColumnDef::new(Files::Type).string().not_null())
                        .col(ColumnDef::new(Files::StoragePath).string().not_null())
                        .col(ColumnDef::new(Files::Content).json().null())
                        .col(
                            ColumnDef::new(Files::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(Files::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_files_created_at")
                        .table(Files::Table)
                        .col(Files::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Files::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Files {
        Table,
        Id,
        Name,
        OriginalName,
        Size,
        Type,
        StoragePath,
        Content,
        Status,
        CreatedAt,
    }
}

mod m20240115_000002_create_inventory_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000002_create_inventory_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to files: deleting a file intentionally leaves
            // its items in place, queryable by file_id.
            manager
                .create_table(
                    Table::create()
                        .table(Inventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Inventory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Inventory::FileId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::Name).string().not_null())
                        .col(ColumnDef::new(Inventory::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(Inventory::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Inventory::InstallationDate).date().not_null())
                        .col(ColumnDef::new(Inventory::LastMaintenance).date().null())
                        .col(ColumnDef::new(Inventory::Description).string().null())
                        .col(ColumnDef::new(Inventory::Notes).string().null())
                        .col(
                            ColumnDef::new(Inventory::Status)
                                .string()
                                .not_null()
                                .default("disponible"),
                        )
                        .col(ColumnDef::new(Inventory::Condition).string().null())
                        .col(
                            ColumnDef::new(Inventory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Inventory::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_file_id")
                        .table(Inventory::Table)
                        .col(Inventory::FileId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Inventory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Inventory {
        Table,
        Id,
        FileId,
        Name,
        ItemName,
        Quantity,
        InstallationDate,
        LastMaintenance,
        Description,
        Notes,
        Status,
        Condition,
        CreatedAt,
        UpdatedAt,
    }
}
