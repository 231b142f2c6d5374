use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{cost_type, fund};

/// A manual instruction that bypasses automatic allocation for one cost.
/// A missing value (`NULL`) means the cost is allocated automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaidOverride {
    #[sea_orm(string_value = "forced_paid")]
    ForcedPaid,
    #[sea_orm(string_value = "forced_unpaid")]
    ForcedUnpaid,
}

/// A cost incurred on behalf of the fund. These are the outflow events.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_costs")]
pub struct Model {
    /// Creation-ordered surrogate key. Breaks ties between costs on the same date.
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fund_id: i32,
    pub cost_type_id: i32,
    pub cost_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub notes: Option<String>,
    pub manual_paid_override: Option<PaidOverride>,
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
    #[sea_orm(
        belongs_to = "cost_type::Entity",
        from = "Column::CostTypeId",
        to = "cost_type::Column::Id",
        on_delete = "Restrict"
    )]
    CostType,
    #[sea_orm(has_one = "super::cost_allocation::Entity")]
    CostAllocation,
}

impl Related<fund::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fund.def()
    }
}

impl Related<cost_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostType.def()
    }
}

impl Related<super::cost_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostAllocation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
