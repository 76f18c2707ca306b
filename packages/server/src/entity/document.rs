use common::DocumentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// UUIDv4 in hyphenated form; also the basis of the blob path.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display label supplied by the uploader.
    #[sea_orm(indexed)]
    pub name: String,

    /// Filename supplied by the client. Absent for documents fetched from a
    /// URL without a usable path segment.
    pub original_filename: Option<String>,

    /// Location of the blob on disk. Set once at creation.
    pub local_path: String,

    pub status: DocumentStatus,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

/// Columns every compatible `documents` table must have.
pub const EXPECTED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "original_filename",
    "local_path",
    "status",
    "created_at",
    "updated_at",
];
