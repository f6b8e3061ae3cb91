use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in CacheTable::ALL {
            manager.create_table(cache_table(table)).await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_owner_subject", table.name()))
                        .table(table)
                        .col(CacheColumn::UserId)
                        .col(CacheColumn::ProfileId)
                        .col(CacheColumn::GeneratedAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_expires_at", table.name()))
                        .table(table)
                        .col(CacheColumn::ExpiresAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_chart_comparisons_counterpart")
                    .table(CacheTable::ChartComparisons)
                    .col(CacheColumn::CounterpartProfileId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in CacheTable::ALL {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        Ok(())
    }
}

fn cache_table(table: CacheTable) -> TableCreateStatement {
    let mut stmt = Table::create();
    stmt.table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(CacheColumn::Id)
                .string()
                .not_null()
                .primary_key(),
        )
        // owner ids come from the identity provider; no local foreign key
        .col(ColumnDef::new(CacheColumn::UserId).string().not_null())
        .col(ColumnDef::new(CacheColumn::ProfileId).string().not_null())
        .col(
            ColumnDef::new(CacheColumn::CacheKey)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(CacheColumn::Payload).text().not_null())
        .col(ColumnDef::new(CacheColumn::AuxiliaryInputs).text().null())
        .col(ColumnDef::new(CacheColumn::GeneratedAt).string().not_null())
        .col(ColumnDef::new(CacheColumn::ExpiresAt).string().not_null())
        .col(ColumnDef::new(CacheColumn::CreatedAt).string().not_null())
        .col(ColumnDef::new(CacheColumn::UpdatedAt).string().not_null())
        .check(Expr::col(CacheColumn::ExpiresAt).gt(Expr::col(CacheColumn::GeneratedAt)))
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{}_profile_id", table.name()))
                .from(table, CacheColumn::ProfileId)
                .to(Profiles::Table, Profiles::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::NoAction),
        );

    if table.is_paired() {
        stmt.col(
            ColumnDef::new(CacheColumn::CounterpartProfileId)
                .string()
                .not_null(),
        )
        .check(
            Expr::col(CacheColumn::ProfileId).ne(Expr::col(CacheColumn::CounterpartProfileId)),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{}_counterpart_profile_id", table.name()))
                .from(table, CacheColumn::CounterpartProfileId)
                .to(Profiles::Table, Profiles::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::NoAction),
        );
    }

    stmt.to_owned()
}

#[derive(DeriveIden, Clone, Copy)]
enum CacheTable {
    LifeSnapshots,
    VarshaphalPredictions,
    ChartComparisons,
}

impl CacheTable {
    const ALL: [Self; 3] = [
        Self::LifeSnapshots,
        Self::VarshaphalPredictions,
        Self::ChartComparisons,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::LifeSnapshots => "life_snapshots",
            Self::VarshaphalPredictions => "varshaphal_predictions",
            Self::ChartComparisons => "chart_comparisons",
        }
    }

    const fn is_paired(self) -> bool {
        matches!(self, Self::ChartComparisons)
    }
}

#[derive(DeriveIden)]
enum CacheColumn {
    Id,
    UserId,
    ProfileId,
    CounterpartProfileId,
    CacheKey,
    Payload,
    AuxiliaryInputs,
    GeneratedAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
