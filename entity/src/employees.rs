use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub designation: String,
    #[sea_orm(indexed)]
    pub team: String,
    #[sea_orm(indexed)]
    pub manager_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar: Option<String>,
    /// Insertion sequence; sibling order in the chart follows it.
    pub position: i64,
}

// `manager_id` is a soft reference: a removed manager leaves it dangling on
// purpose, so no foreign key is declared.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
