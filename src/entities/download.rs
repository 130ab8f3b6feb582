use sea_orm::entity::prelude::*;

/// A Deezer track that finished downloading.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "downloads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_at: i64,
}

impl ActiveModelBehavior for ActiveModel {}
