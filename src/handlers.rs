pub mod cost_types;
pub mod costs;
pub mod errors;
pub mod funds;
pub mod health;
pub mod incomes;
pub mod members;
