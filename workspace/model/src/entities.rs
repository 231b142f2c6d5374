//! Root of the SeaORM entity modules.
//!
//! Two independent event logs live here: `distributions` (fund inflows, grouped
//! under `incomes`) and `group_costs` (fund outflows). `cost_allocations` and
//! `fund_stats` hold derived settlement results and can always be rebuilt from
//! the two logs.

pub mod cost_allocation;
pub mod cost_type;
pub mod distribution;
pub mod fund;
pub mod fund_stats;
pub mod group_cost;
pub mod income;
pub mod member;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::cost_allocation::Entity as CostAllocation;
    pub use super::cost_type::Entity as CostType;
    pub use super::distribution::Entity as Distribution;
    pub use super::fund::Entity as Fund;
    pub use super::fund_stats::Entity as FundStats;
    pub use super::group_cost::Entity as GroupCost;
    pub use super::income::Entity as Income;
    pub use super::member::Entity as Member;
}
