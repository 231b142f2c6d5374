use sea_orm::entity::prelude::*;

use super::fund;

/// A band member who can receive individual income distributions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fund_id: i32,
    pub name: String,
    /// Inactive members keep their past distributions but cannot receive new ones.
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "fund::Entity",
        from = "Column::FundId",
        to = "fund::Column::Id",
        on_delete = "Cascade"
    )]
    Fund,
}

impl Related<fund::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fund.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
