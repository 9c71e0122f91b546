use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "String(Some(20))", unique)]
    pub acronym: String,
    #[sea_orm(column_type = "String(Some(80))", nullable)]
    pub email: Option<String>,
    #[sea_orm(column_type = "String(Some(80))", nullable)]
    pub name: Option<String>,
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub password: Option<String>,
    #[sea_orm(column_type = "DateTime", nullable)]
    pub created: Option<DateTimeUtc>,
    #[sea_orm(column_type = "DateTime", nullable)]
    pub updated: Option<DateTimeUtc>,
    #[sea_orm(column_type = "DateTime", nullable)]
    pub deleted: Option<DateTimeUtc>,
    #[sea_orm(column_type = "DateTime", nullable)]
    pub active: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
