use std::path::Path;
use std::time::Duration;

use sea_orm::sea_query::Table;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::document;

/// Open the metadata database and make sure the `documents` table is usable.
///
/// A missing table is created. An existing table whose columns do not match
/// is a startup error unless `reset_on_schema_mismatch` is set, in which case
/// the table is dropped and recreated and all document metadata is lost.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    ensure_sqlite_parent_dir(&config.url).await?;

    let mut opt = ConnectOptions::new(config.url.to_owned());

    // Set connection pool options
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    ensure_schema(&db, config.reset_on_schema_mismatch).await?;

    Ok(db)
}

/// Create the `documents` table if absent, then verify its columns.
pub async fn ensure_schema<C: ConnectionTrait>(
    db: &C,
    reset_on_mismatch: bool,
) -> Result<(), DbErr> {
    create_documents_table(db).await?;

    match verify_schema(db).await {
        Ok(()) => info!("Database schema verified"),
        Err(e) if reset_on_mismatch => {
            warn!(error = %e, "Schema mismatch detected, recreating documents table");
            drop_documents_table(db).await?;
            create_documents_table(db).await?;
            verify_schema(db).await?;
            info!("Documents table recreated");
        }
        Err(e) => {
            return Err(DbErr::Custom(format!(
                "documents table does not match the expected schema ({}): {e}. \
                 Migrate it, or set database.reset_on_schema_mismatch = true to \
                 recreate it (all document metadata will be lost)",
                document::EXPECTED_COLUMNS.join(", ")
            )));
        }
    }

    create_indexes(db).await
}

/// Select every expected column; fails if any is missing.
pub async fn verify_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    document::Entity::find().one(db).await.map(|_| ())
}

async fn create_documents_table<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(document::Entity);
    table.if_not_exists();
    db.execute_raw(backend.build(&table)).await?;
    Ok(())
}

async fn create_indexes<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    for mut index in schema.create_index_from_entity(document::Entity) {
        index.if_not_exists();
        db.execute_raw(backend.build(&index)).await?;
    }
    Ok(())
}

async fn drop_documents_table<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let stmt = Table::drop()
        .table(document::Entity)
        .if_exists()
        .to_owned();
    db.execute_raw(backend.build(&stmt)).await?;
    Ok(())
}

/// SQLite will not create missing parent directories of its database file.
async fn ensure_sqlite_parent_dir(url: &str) -> Result<(), DbErr> {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DbErr::Custom(format!(
                "Failed to create database directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}
