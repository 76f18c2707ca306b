use async_trait::async_trait;
use common::DocumentStatus;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entity::document;

/// Persistence of document rows.
///
/// Every operation is a single statement, so concurrent callers never observe
/// a partially written row.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new row and return it.
    async fn insert(&self, doc: document::Model) -> Result<document::Model, DbErr>;

    async fn get(&self, id: &str) -> Result<Option<document::Model>, DbErr>;

    /// A page of rows in creation order, optionally restricted to one status.
    async fn list(
        &self,
        status: Option<DocumentStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<document::Model>, DbErr>;

    async fn count(&self, status: Option<DocumentStatus>) -> Result<u64, DbErr>;

    /// Delete a row. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, DbErr>;

    /// Round-trip to the database.
    async fn ping(&self) -> Result<(), DbErr>;
}

/// [`MetadataStore`] backed by a SeaORM connection pool.
#[derive(Clone)]
pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filtered(status: Option<DocumentStatus>) -> Select<document::Entity> {
        let select = document::Entity::find();
        match status {
            Some(status) => select.filter(document::Column::Status.eq(status)),
            None => select,
        }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn insert(&self, doc: document::Model) -> Result<document::Model, DbErr> {
        let active: document::ActiveModel = doc.clone().into();
        document::Entity::insert(active)
            .exec_without_returning(&self.db)
            .await?;
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<Option<document::Model>, DbErr> {
        document::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await
    }

    async fn list(
        &self,
        status: Option<DocumentStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<document::Model>, DbErr> {
        Self::filtered(status)
            .order_by_asc(document::Column::CreatedAt)
            .order_by_asc(document::Column::Id)
            .offset(Some(offset))
            .limit(Some(limit))
            .all(&self.db)
            .await
    }

    async fn count(&self, status: Option<DocumentStatus>) -> Result<u64, DbErr> {
        Self::filtered(status).count(&self.db).await
    }

    async fn delete(&self, id: &str) -> Result<bool, DbErr> {
        let result = document::Entity::delete_by_id(id.to_owned())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn ping(&self) -> Result<(), DbErr> {
        self.db.ping().await
    }
}
