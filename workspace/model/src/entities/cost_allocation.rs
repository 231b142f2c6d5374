use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::group_cost;

/// Cached settlement result for one group cost.
///
/// Derived state: rows are rewritten on every replay of the owning fund and can
/// be dropped and rebuilt from `distributions` and `group_costs` at any time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_cost_id: i32,
    pub fund_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub paid_amount: Decimal,
    pub is_paid: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "group_cost::Entity",
        from = "Column::GroupCostId",
        to = "group_cost::Column::Id",
        on_delete = "Cascade"
    )]
    GroupCost,
}

impl Related<group_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
