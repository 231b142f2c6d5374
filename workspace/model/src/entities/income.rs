use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{distribution, fund};

/// A payment received by the band, split among members and the fund by its distributions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fund_id: i32,
    pub description: Option<String>,
    /// The full received amount. Always positive.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub currency_code: String,
    /// Timestamps every fund distribution of this income.
    pub received_date: NaiveDate,
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
    #[sea_orm(has_many = "distribution::Entity")]
    Distribution,
}

impl Related<fund::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fund.def()
    }
}

impl Related<distribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
