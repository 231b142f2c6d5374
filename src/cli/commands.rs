pub mod initdb;
pub mod recompute;
pub mod serve;

pub use initdb::init_database;
pub use recompute::recompute;
pub use serve::{serve, ServeOptions};
