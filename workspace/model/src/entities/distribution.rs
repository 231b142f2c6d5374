use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{income, member};

/// Who receives a distribution line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RecipientType {
    #[sea_orm(string_value = "individual")]
    Individual,
    #[sea_orm(string_value = "mutual_fund")]
    MutualFund,
}

/// One line of an income split.
///
/// Lines with `RecipientType::MutualFund` are the inflow events of the fund
/// the income belongs to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "distributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub income_id: i32,
    pub recipient_type: RecipientType,
    /// The receiving member. Set iff `recipient_type` is `Individual`.
    pub recipient_id: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "income::Entity",
        from = "Column::IncomeId",
        to = "income::Column::Id",
        on_delete = "Cascade"
    )]
    Income,
    #[sea_orm(
        belongs_to = "member::Entity",
        from = "Column::RecipientId",
        to = "member::Column::Id",
        on_delete = "Restrict"
    )]
    Member,
}

impl Related<income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

impl Related<member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
