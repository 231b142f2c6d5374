//! Shared fixtures for the database backed tests of this crate.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use model::entities::distribution::RecipientType;
use model::entities::{cost_type, member};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Set};

use crate::splitter::ProposedDistribution;

/// Routes engine logs to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    }
}

/// In-memory SQLite with every migration applied.
///
/// A single pooled connection keeps every query on the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    init_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("Failed to connect to test database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

/// SQLite database file removed again when dropped.
pub struct TempDbFile {
    path: PathBuf,
}

impl TempDbFile {
    fn remove(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

impl Drop for TempDbFile {
    fn drop(&mut self) {
        self.remove();
    }
}

/// File backed SQLite in WAL mode with several pooled connections, for tests
/// where readers and writers must run on different connections.
pub async fn setup_file_db(name: &str) -> (DatabaseConnection, TempDbFile) {
    init_tracing();
    let path = std::env::temp_dir().join(format!("bandfund-{name}-{}.db", std::process::id()));
    let file = TempDbFile { path };
    // Leftovers of an aborted run
    file.remove();

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", file.path.display()));
    options.max_connections(4).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("Failed to connect to test database");
    db.execute_unprepared("PRAGMA journal_mode = WAL;")
        .await
        .expect("Failed to enable WAL");
    Migrator::up(&db, None).await.expect("Migrations failed.");
    (db, file)
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn fund_line(amount: &str) -> ProposedDistribution {
    ProposedDistribution {
        recipient_type: RecipientType::MutualFund,
        recipient_id: None,
        amount: dec(amount),
        note: None,
    }
}

pub fn member_line(member_id: i32, amount: &str) -> ProposedDistribution {
    ProposedDistribution {
        recipient_type: RecipientType::Individual,
        recipient_id: Some(member_id),
        amount: dec(amount),
        note: None,
    }
}

pub async fn new_member(db: &DatabaseConnection, fund_id: i32, name: &str) -> member::Model {
    member::ActiveModel {
        fund_id: Set(fund_id),
        name: Set(name.to_string()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert member")
}

pub async fn new_cost_type(db: &DatabaseConnection, name: &str) -> cost_type::Model {
    cost_type::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert cost type")
}
