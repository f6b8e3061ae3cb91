use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const TABLES: [&str; 4] = [
    "profiles",
    "life_snapshots",
    "varshaphal_predictions",
    "chart_comparisons",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        // Fires only when a writer left updated_at untouched.
        for table in TABLES {
            conn.execute_unprepared(&format!(
                "CREATE TRIGGER IF NOT EXISTS trg_{table}_updated_at \
                 AFTER UPDATE ON {table} FOR EACH ROW \
                 WHEN NEW.updated_at = OLD.updated_at \
                 BEGIN \
                 UPDATE {table} SET updated_at = strftime('%Y-%m-%dT%H:%M:%f000Z', 'now') \
                 WHERE id = NEW.id; \
                 END"
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        for table in TABLES {
            conn.execute_unprepared(&format!("DROP TRIGGER IF EXISTS trg_{table}_updated_at"))
                .await?;
        }

        Ok(())
    }
}
