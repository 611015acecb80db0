use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    CustomerId, CustomerRecord, NewCustomer, Result, WriteStoreError, store::CustomerStore,
};

/// PostgreSQL-backed customer store.
#[derive(Clone)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    /// Creates a new PostgreSQL customer store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations, queue tables included.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<CustomerRecord> {
        Ok(CustomerRecord {
            id: CustomerId::new(row.try_get("cliente_id")?),
            name: row.try_get("nombre")?,
            tax_id: row.try_get("ruc")?,
            city: row.try_get("ciudad")?,
            country: row.try_get("pais")?,
        })
    }
}

#[async_trait]
impl CustomerStore for PostgresCustomerStore {
    async fn insert(&self, customer: &NewCustomer) -> Result<CustomerId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO clientes (nombre, ruc, ciudad, pais)
            VALUES ($1, $2, $3, $4)
            RETURNING cliente_id
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.tax_id)
        .bind(&customer.city)
        .bind(customer.country.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && (db_err.is_check_violation() || db_err.is_unique_violation())
            {
                tracing::warn!(constraint = db_err.constraint(), "customer row rejected");
                return WriteStoreError::Constraint(db_err.message().to_string());
            }
            WriteStoreError::Database(e)
        })?;

        tracing::debug!(cliente_id = id, "customer row inserted");
        Ok(CustomerId::new(id))
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT cliente_id, nombre, ruc, ciudad, pais
            FROM clientes
            WHERE cliente_id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }
}
