//! Raw storage for the three cache tables.
//!
//! Nothing here checks ownership; the repository is crate-private and only
//! reachable through [`crate::db::guard::ScopedCache`].

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{
    Alias, Cond, DeleteStatement, Expr, InsertStatement, Order, Query, SelectStatement,
    SimpleExpr, UpdateStatement,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, DeriveIden, FromQueryResult, SqlErr, Statement,
    StatementBuilder,
};
use serde_json::Value;

use crate::domain::{
    CacheError, CacheFamily, CacheRecord, NewCacheRecord, Subject, format_timestamp,
    parse_timestamp,
};

#[derive(DeriveIden, Clone, Copy)]
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

#[derive(Debug, FromQueryResult)]
struct CacheRow {
    id: String,
    user_id: String,
    profile_id: String,
    counterpart_profile_id: Option<String>,
    cache_key: String,
    payload: String,
    auxiliary_inputs: Option<String>,
    generated_at: String,
    expires_at: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

impl CacheRow {
    fn into_record(self, family: CacheFamily) -> Result<CacheRecord, CacheError> {
        let subject = match self.counterpart_profile_id {
            Some(counterpart_profile_id) => Subject::Pair {
                profile_id: self.profile_id,
                counterpart_profile_id,
            },
            None => Subject::Profile {
                profile_id: self.profile_id,
            },
        };

        let auxiliary_inputs = self
            .auxiliary_inputs
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()?;

        Ok(CacheRecord {
            id: self.id,
            family,
            owner_id: self.user_id,
            subject,
            cache_key: self.cache_key,
            payload: serde_json::from_str(&self.payload)?,
            auxiliary_inputs,
            generated_at: parse_timestamp(&self.generated_at)?,
            expires_at: parse_timestamp(&self.expires_at)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub struct CacheRepository {
    conn: DatabaseConnection,
    family: CacheFamily,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, family: CacheFamily) -> Self {
        Self { conn, family }
    }

    fn table(&self) -> Alias {
        Alias::new(self.family.table_name())
    }

    fn build<S: StatementBuilder>(&self, stmt: &S) -> Statement {
        self.conn.get_database_backend().build(stmt)
    }

    fn select(&self) -> SelectStatement {
        let mut stmt = Query::select();
        stmt.columns([
            CacheColumn::Id,
            CacheColumn::UserId,
            CacheColumn::ProfileId,
            CacheColumn::CacheKey,
            CacheColumn::Payload,
            CacheColumn::AuxiliaryInputs,
            CacheColumn::GeneratedAt,
            CacheColumn::ExpiresAt,
            CacheColumn::CreatedAt,
            CacheColumn::UpdatedAt,
        ])
        .from(self.table());

        if self.family.is_paired() {
            stmt.column(CacheColumn::CounterpartProfileId);
        } else {
            stmt.expr_as(Expr::cust("NULL"), CacheColumn::CounterpartProfileId);
        }

        stmt
    }

    async fn fetch_one(&self, stmt: &SelectStatement) -> Result<Option<CacheRecord>, CacheError> {
        let row = CacheRow::find_by_statement(self.build(stmt))
            .one(&self.conn)
            .await?;

        row.map(|r| r.into_record(self.family)).transpose()
    }

    /// Inserts a new row. Uniqueness of `cache_key` is left to the unique
    /// index so concurrent writers can't both succeed.
    pub async fn insert(
        &self,
        record: NewCacheRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<CacheRecord, CacheError> {
        let id = uuid::Uuid::new_v4().to_string();
        let generated = format_timestamp(generated_at);

        let mut columns = vec![
            CacheColumn::Id,
            CacheColumn::UserId,
            CacheColumn::ProfileId,
            CacheColumn::CacheKey,
            CacheColumn::Payload,
            CacheColumn::AuxiliaryInputs,
            CacheColumn::GeneratedAt,
            CacheColumn::ExpiresAt,
            CacheColumn::CreatedAt,
            CacheColumn::UpdatedAt,
        ];
        let mut values: Vec<SimpleExpr> = vec![
            Expr::value(id.clone()),
            Expr::value(record.owner_id.clone()),
            Expr::value(record.subject.primary().to_string()),
            Expr::value(record.cache_key.clone()),
            Expr::value(serde_json::to_string(&record.payload)?),
            Expr::value(
                record
                    .auxiliary_inputs
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            ),
            Expr::value(generated.clone()),
            Expr::value(format_timestamp(record.expires_at)),
            Expr::value(generated.clone()),
            Expr::value(generated),
        ];

        if let Some(counterpart) = record.subject.counterpart() {
            columns.push(CacheColumn::CounterpartProfileId);
            values.push(Expr::value(counterpart.to_string()));
        }

        let mut insert: InsertStatement = Query::insert();
        insert
            .into_table(self.table())
            .columns(columns)
            .values(values)
            .map_err(|e| CacheError::Internal(e.to_string()))?;

        if let Err(err) = self.conn.execute(self.build(&insert)).await {
            return Err(self.map_insert_error(err, &record));
        }

        Ok(CacheRecord {
            id,
            family: self.family,
            owner_id: record.owner_id,
            subject: record.subject,
            cache_key: record.cache_key,
            payload: record.payload,
            auxiliary_inputs: record.auxiliary_inputs,
            generated_at,
            expires_at: record.expires_at,
            created_at: generated_at,
            updated_at: generated_at,
        })
    }

    fn map_insert_error(&self, err: DbErr, record: &NewCacheRecord) -> CacheError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                CacheError::DuplicateKey(record.cache_key.clone())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                CacheError::SubjectNotFound(record.subject.profile_ids().join(", "))
            }
            _ => {
                tracing::warn!(family = %self.family, error = %err, "Cache insert failed");
                err.into()
            }
        }
    }

    pub async fn find_by_key(&self, cache_key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let mut stmt = self.select();
        stmt.and_where(Expr::col(CacheColumn::CacheKey).eq(cache_key));
        self.fetch_one(&stmt).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<CacheRecord>, CacheError> {
        let mut stmt = self.select();
        stmt.and_where(Expr::col(CacheColumn::Id).eq(id));
        self.fetch_one(&stmt).await
    }

    /// Most recently generated row for the pair, expired or not.
    pub async fn latest_for_subject(
        &self,
        owner_id: &str,
        profile_id: &str,
    ) -> Result<Option<CacheRecord>, CacheError> {
        let subject_matches = if self.family.is_paired() {
            Cond::any()
                .add(Expr::col(CacheColumn::ProfileId).eq(profile_id))
                .add(Expr::col(CacheColumn::CounterpartProfileId).eq(profile_id))
        } else {
            Cond::all().add(Expr::col(CacheColumn::ProfileId).eq(profile_id))
        };

        let mut stmt = self.select();
        stmt.and_where(Expr::col(CacheColumn::UserId).eq(owner_id))
            .cond_where(subject_matches)
            .order_by(CacheColumn::GeneratedAt, Order::Desc)
            .order_by(CacheColumn::CreatedAt, Order::Desc)
            .limit(1);

        self.fetch_one(&stmt).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<bool, CacheError> {
        let mut delete: DeleteStatement = Query::delete();
        delete
            .from_table(self.table())
            .and_where(Expr::col(CacheColumn::Id).eq(id));

        let result = self.conn.execute(self.build(&delete)).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_auxiliary_inputs(
        &self,
        id: &str,
        auxiliary_inputs: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<bool, CacheError> {
        let encoded = auxiliary_inputs.map(serde_json::to_string).transpose()?;

        let mut update: UpdateStatement = Query::update();
        update
            .table(self.table())
            .values([
                (CacheColumn::AuxiliaryInputs, Expr::value(encoded)),
                (CacheColumn::UpdatedAt, Expr::value(format_timestamp(now))),
            ])
            .and_where(Expr::col(CacheColumn::Id).eq(id));

        let result = self.conn.execute(self.build(&update)).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes rows that expired before `cutoff`, across every owner.
    pub async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, CacheError> {
        let mut delete: DeleteStatement = Query::delete();
        delete
            .from_table(self.table())
            .and_where(Expr::col(CacheColumn::ExpiresAt).lt(format_timestamp(cutoff)));

        let result = self.conn.execute(self.build(&delete)).await?;
        Ok(result.rows_affected())
    }

    /// Returns `(live, expired)` row counts as of `now`.
    pub async fn counts(&self, now: DateTime<Utc>) -> Result<(u64, u64), CacheError> {
        let now = format_timestamp(now);

        let live = self
            .count_where(Expr::col(CacheColumn::ExpiresAt).gt(now.clone()))
            .await?;
        let expired = self
            .count_where(Expr::col(CacheColumn::ExpiresAt).lte(now))
            .await?;

        Ok((live, expired))
    }

    async fn count_where(&self, filter: SimpleExpr) -> Result<u64, CacheError> {
        let mut stmt = Query::select();
        stmt.expr_as(Expr::col(CacheColumn::Id).count(), Alias::new("count"))
            .from(self.table())
            .and_where(filter);

        let row = CountRow::find_by_statement(self.build(&stmt))
            .one(&self.conn)
            .await?;

        Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or(0)))
    }
}
