//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p write-store --test postgres_integration
//! ```

use std::sync::Arc;

use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use write_store::{
    Country, CustomerId, CustomerStore, CustomerStoreExt, NewCustomer, PostgresCustomerStore,
    WriteStoreError,
};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresCustomerStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an emptied table
async fn get_test_store() -> PostgresCustomerStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE clientes RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresCustomerStore::new(pool)
}

fn acme() -> NewCustomer {
    NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru)
}

#[tokio::test]
#[serial]
async fn insert_and_find_customer() {
    let store = get_test_store().await;

    let id = store.insert(&acme()).await.unwrap();
    assert!(id.as_i64() > 0);

    let record = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.name, "Acme SAC 42");
    assert_eq!(record.tax_id.as_deref(), Some("12345678-3"));
    assert_eq!(record.city.as_deref(), Some("Lima"));
    assert_eq!(record.country.as_deref(), Some("Peru"));
}

#[tokio::test]
#[serial]
async fn identity_increments_per_insert() {
    let store = get_test_store().await;

    let first = store.insert(&acme()).await.unwrap();
    let second = store
        .insert(&NewCustomer::new(
            "Exportadora del Norte 17",
            "87654321-0",
            "Santiago",
            Country::Chile,
        ))
        .await
        .unwrap();

    assert!(second.as_i64() > first.as_i64());
}

#[tokio::test]
#[serial]
async fn find_unknown_id_returns_none() {
    let store = get_test_store().await;

    assert!(store.find_by_id(CustomerId::new(99)).await.unwrap().is_none());
    assert!(!store.exists(CustomerId::new(99)).await.unwrap());
}

#[tokio::test]
#[serial]
async fn blank_name_is_a_constraint_violation() {
    let store = get_test_store().await;
    let mut customer = acme();
    customer.name = "   ".to_string();

    let err = store.insert(&customer).await.unwrap_err();
    assert!(matches!(err, WriteStoreError::Constraint(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
#[serial]
async fn rows_without_country_read_back_as_none() {
    let store = get_test_store().await;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO clientes (nombre, ruc, ciudad, pais) VALUES ('Sin Pais', NULL, NULL, NULL) RETURNING cliente_id",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();

    let record = store.find_by_id(CustomerId::new(id)).await.unwrap().unwrap();
    assert!(record.country.is_none());
    assert!(record.partition_key().is_none());
}

#[tokio::test]
#[serial]
async fn closed_pool_fails_transiently() {
    let store = get_test_store().await;
    store.pool().close().await;

    let err = store.find_by_id(CustomerId::new(1)).await.unwrap_err();
    assert!(err.is_transient());
}
