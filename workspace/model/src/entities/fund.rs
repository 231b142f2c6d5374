use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// A shared pot that band income flows into and group costs are paid from.
///
/// Every inflow (fund distribution) and outflow (group cost) belongs to exactly
/// one fund, and all settlement is computed per fund.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "funds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// ISO 4217 currency code, e.g., "EUR". The single settlement currency of the fund.
    pub currency_code: String,
    /// Balance carried into the fund before the first recorded event. May be negative.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub opening_balance: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::member::Entity")]
    Member,
    #[sea_orm(has_many = "super::income::Entity")]
    Income,
    #[sea_orm(has_many = "super::group_cost::Entity")]
    GroupCost,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

impl Related<super::group_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
