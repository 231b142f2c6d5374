use sea_orm::entity::prelude::*;

/// A category of group cost, e.g. "Rehearsal room" or "Van rental".
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_cost::Entity")]
    GroupCost,
}

impl Related<super::group_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
