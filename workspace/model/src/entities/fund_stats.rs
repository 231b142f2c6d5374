use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::fund;

/// Cached aggregate settlement figures for one fund. One row per fund.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fund_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub fund_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub opening_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_inflows: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_pool: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_costs: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_paid: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_unpaid: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub surplus: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub deficit: Decimal,
    /// When the replay that produced this row ran.
    pub computed_at: DateTime,
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
