//! Serialized, transactional mutation of fund ledgers.
//!
//! Every write that touches an inflow or an outflow of a fund goes through
//! [`RecomputeCoordinator`]. It takes the fund's ledger lock, applies the
//! mutation inside a storage transaction, replays the full event log of the
//! fund and rewrites the derived cache before committing. Readers therefore
//! only ever see allocations that match a committed event set.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use model::entities::{distribution, fund, group_cost, income};
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ComputeError, Result};
use crate::ledger::{self, CostChanges, NewCost};
use crate::lock::{InProcessLedgerLock, LedgerLock};
use crate::money::Cents;
use crate::settlement::{Settlement, settle};
use crate::splitter::{self, ProposedDistribution};

/// Time limits applied to every ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// How long a mutation waits for the fund's ledger lock.
    pub lock_timeout: Duration,
    /// Deadline for the locked part of a mutation (apply, replay, persist, commit).
    pub mutation_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            mutation_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Result of a mutation together with the replay that made it visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Replayed<T> {
    pub value: T,
    pub settlement: Settlement,
}

/// Fields of a new fund.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFund {
    pub name: String,
    pub currency_code: String,
    pub opening_balance: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundChanges {
    pub name: Option<String>,
    pub opening_balance: Option<Decimal>,
}

/// Fields of a new income with its initial distribution set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncome {
    pub amount: Decimal,
    pub currency_code: String,
    pub received_date: NaiveDate,
    pub description: Option<String>,
    pub distributions: Vec<ProposedDistribution>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeChanges {
    pub amount: Option<Decimal>,
    pub received_date: Option<NaiveDate>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// An income and its current distribution lines.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeWithDistributions {
    pub income: income::Model,
    pub distributions: Vec<distribution::Model>,
}

/// What a dashboard shows for one fund.
#[derive(Debug, Clone, PartialEq)]
pub struct FundReport {
    pub fund: fund::Model,
    pub settlement: Settlement,
    /// When the served figures were computed. `None` for an uncached replay.
    pub computed_at: Option<NaiveDateTime>,
    pub from_cache: bool,
}

/// Outcome of comparing the cache of a fund with a fresh replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCheck {
    pub fund_id: i32,
    pub cache_present: bool,
    /// Human readable differences, empty when the cache matches.
    pub drift: Vec<String>,
}

impl CacheCheck {
    pub fn is_consistent(&self) -> bool {
        self.cache_present && self.drift.is_empty()
    }
}

/// Re-derives the settlement of a fund from its stored event log.
pub async fn replay<C: ConnectionTrait>(conn: &C, fund: &fund::Model) -> Result<Settlement> {
    let opening_balance = ledger::stored_opening_balance(fund)?;
    let inflows = ledger::load_inflows(conn, fund.id).await?;
    let outflows = ledger::load_outflows(conn, fund.id).await?;
    settle(opening_balance, &inflows, &outflows)
}

async fn replay_and_persist<C: ConnectionTrait>(conn: &C, fund: &fund::Model) -> Result<Settlement> {
    let settlement = replay(conn, fund).await?;
    ledger::persist_settlement(conn, fund.id, &settlement, Utc::now().naive_utc()).await?;
    Ok(settlement)
}

fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    rusty_money::iso::find(&code)
        .map(|currency| currency.iso_alpha_code.to_string())
        .ok_or_else(|| ComputeError::invalid_amount("currency_code", format!("'{code}' is not an ISO 4217 currency")))
}

fn parse_opening_balance(value: Decimal) -> Result<Cents> {
    Cents::from_decimal(value).ok_or_else(|| {
        ComputeError::invalid_amount(
            "opening_balance",
            format!("{value} is not a whole number of cents up to {}", Cents::MAX),
        )
    })
}

fn parse_income_amount(value: Decimal) -> Result<Cents> {
    let cents = Cents::from_decimal(value).ok_or_else(|| {
        ComputeError::invalid_amount("amount", format!("{value} is not a whole number of cents up to {}", Cents::MAX))
    })?;
    if cents.is_negative() || cents.is_zero() {
        return Err(ComputeError::invalid_amount("amount", format!("{value} is not positive")));
    }
    Ok(cents)
}

/// Owner of every mutating ledger operation.
///
/// Generic over the [`LedgerLock`] so a multi-instance deployment can swap the
/// in-process lock for one backed by the database.
pub struct RecomputeCoordinator<L: LedgerLock = InProcessLedgerLock> {
    db: DatabaseConnection,
    lock: Arc<L>,
    settings: CoordinatorSettings,
}

impl RecomputeCoordinator<InProcessLedgerLock> {
    pub fn new(db: DatabaseConnection, settings: CoordinatorSettings) -> Self {
        Self::with_lock(db, Arc::new(InProcessLedgerLock::new()), settings)
    }
}

impl<L: LedgerLock> RecomputeCoordinator<L> {
    pub fn with_lock(db: DatabaseConnection, lock: Arc<L>, settings: CoordinatorSettings) -> Self {
        Self { db, lock, settings }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn ledger_lock(&self) -> &Arc<L> {
        &self.lock
    }

    pub fn settings(&self) -> CoordinatorSettings {
        self.settings
    }

    /// Opens a transaction for lock-free reads, so every row of one answer comes
    /// from the same committed state.
    async fn begin_read(&self) -> Result<DatabaseTransaction> {
        let txn = match self.db.get_database_backend() {
            // A deferred SQLite transaction already reads from one snapshot
            DatabaseBackend::Sqlite => self.db.begin().await?,
            _ => {
                self.db
                    .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
                    .await?
            }
        };
        Ok(txn)
    }

    /// Runs the locked part of a mutation under the mutation deadline.
    ///
    /// On expiry the future is dropped, which drops its open transaction
    /// without committing it.
    async fn within_deadline<T>(&self, fund_id: i32, work: impl Future<Output = Result<T>>) -> Result<T> {
        let started = Instant::now();
        match tokio::time::timeout(self.settings.mutation_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let waited_ms = started.elapsed().as_millis();
                warn!(fund_id, %waited_ms, "Ledger mutation exceeded its deadline, rolled back");
                Err(ComputeError::ConcurrencyTimeout { fund_id, waited_ms })
            }
        }
    }

    // ===================== Funds =====================

    #[instrument(skip(self, new_fund), fields(name = %new_fund.name))]
    pub async fn create_fund(&self, new_fund: NewFund) -> Result<Replayed<fund::Model>> {
        trace!("Creating fund");
        let currency_code = normalize_currency(&new_fund.currency_code)?;
        let opening_balance = parse_opening_balance(new_fund.opening_balance)?;

        let txn = self.db.begin().await?;
        let fund = fund::ActiveModel {
            name: Set(new_fund.name),
            currency_code: Set(currency_code),
            opening_balance: Set(opening_balance.to_decimal()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let settlement = replay_and_persist(&txn, &fund).await?;
        txn.commit().await?;

        info!(fund_id = fund.id, "Created fund");
        Ok(Replayed { value: fund, settlement })
    }

    #[instrument(skip(self, changes))]
    pub async fn update_fund(&self, fund_id: i32, changes: FundChanges) -> Result<Replayed<fund::Model>> {
        trace!("Updating fund");
        let opening_balance = changes.opening_balance.map(parse_opening_balance).transpose()?;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let existing = ledger::find_fund(&txn, fund_id).await?;
                let mut active: fund::ActiveModel = existing.into();
                if let Some(name) = changes.name {
                    active.name = Set(name);
                }
                if let Some(opening_balance) = opening_balance {
                    active.opening_balance = Set(opening_balance.to_decimal());
                }
                let fund = active.update(&txn).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed { value: fund, settlement })
            })
            .await?;

        info!(fund_id, balance = %replayed.settlement.stats.balance, "Updated fund");
        Ok(replayed)
    }

    // ===================== Incomes and distributions =====================

    #[instrument(skip(self, new_income), fields(num_lines = new_income.distributions.len()))]
    pub async fn create_income(
        &self,
        fund_id: i32,
        new_income: NewIncome,
    ) -> Result<Replayed<IncomeWithDistributions>> {
        trace!("Creating income");
        let amount = parse_income_amount(new_income.amount)?;
        let currency_code = normalize_currency(&new_income.currency_code)?;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let fund = ledger::find_fund(&txn, fund_id).await?;
                if fund.currency_code != currency_code {
                    return Err(ComputeError::invalid_amount(
                        "currency_code",
                        format!("fund {} settles in {}, not {}", fund.id, fund.currency_code, currency_code),
                    ));
                }

                let eligible = ledger::eligible_member_ids(&txn, fund_id).await?;
                let plan = splitter::validate_distributions(amount, &new_income.distributions, &eligible)?;

                let income = income::ActiveModel {
                    fund_id: Set(fund_id),
                    description: Set(new_income.description),
                    amount: Set(amount.to_decimal()),
                    currency_code: Set(currency_code),
                    received_date: Set(new_income.received_date),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                let distributions = ledger::replace_distributions(&txn, income.id, &plan).await?;

                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed {
                    value: IncomeWithDistributions { income, distributions },
                    settlement,
                })
            })
            .await?;

        info!(income_id = replayed.value.income.id, "Created income");
        Ok(replayed)
    }

    /// Edits an income. The existing distribution set must still fit the new amount.
    #[instrument(skip(self, changes))]
    pub async fn update_income(
        &self,
        income_id: i32,
        changes: IncomeChanges,
    ) -> Result<Replayed<IncomeWithDistributions>> {
        trace!("Updating income");
        let amount = changes.amount.map(parse_income_amount).transpose()?;
        let fund_id = ledger::find_income(&self.db, income_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let existing = ledger::find_income(&txn, income_id).await?;
                let distributions = ledger::distributions_of(&txn, income_id).await?;

                if let Some(amount) = amount {
                    let distributed = distributions.iter().try_fold(Cents::ZERO, |total, line| {
                        Cents::from_stored(line.amount)
                            .and_then(|amount| total.checked_add(amount))
                            .ok_or_else(|| {
                                ComputeError::invalid_event_data(format!(
                                    "distribution {} amount {} is out of range",
                                    line.id, line.amount
                                ))
                            })
                    })?;
                    if distributed > amount {
                        warn!(%distributed, %amount, "Income edit would over-allocate existing distributions");
                        return Err(ComputeError::OverAllocation {
                            income_amount: amount.to_decimal(),
                            distributed: distributed.to_decimal(),
                        });
                    }
                }

                let mut active: income::ActiveModel = existing.into();
                if let Some(amount) = amount {
                    active.amount = Set(amount.to_decimal());
                }
                if let Some(received_date) = changes.received_date {
                    active.received_date = Set(received_date);
                }
                if let Some(description) = changes.description {
                    active.description = Set(description);
                }
                let income = active.update(&txn).await?;

                let fund = ledger::find_fund(&txn, fund_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed {
                    value: IncomeWithDistributions { income, distributions },
                    settlement,
                })
            })
            .await?;

        info!(income_id, "Updated income");
        Ok(replayed)
    }

    #[instrument(skip(self))]
    pub async fn delete_income(&self, income_id: i32) -> Result<Replayed<income::Model>> {
        trace!("Deleting income");
        let fund_id = ledger::find_income(&self.db, income_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let existing = ledger::find_income(&txn, income_id).await?;

                let removed = distribution::Entity::delete_many()
                    .filter(distribution::Column::IncomeId.eq(income_id))
                    .exec(&txn)
                    .await?;
                debug!("Removed {} distribution lines", removed.rows_affected);
                income::Entity::delete_by_id(income_id).exec(&txn).await?;

                let fund = ledger::find_fund(&txn, fund_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed { value: existing, settlement })
            })
            .await?;

        info!(income_id, "Deleted income");
        Ok(replayed)
    }

    /// Replaces the whole distribution set of an income.
    ///
    /// Validation happens before any row is touched, so a rejected set leaves
    /// the previous one in place.
    #[instrument(skip(self, proposed), fields(num_lines = proposed.len()))]
    pub async fn replace_distributions(
        &self,
        income_id: i32,
        proposed: Vec<ProposedDistribution>,
    ) -> Result<Replayed<IncomeWithDistributions>> {
        trace!("Replacing distributions");
        let fund_id = ledger::find_income(&self.db, income_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let income = ledger::find_income(&txn, income_id).await?;
                let amount = Cents::from_stored(income.amount).ok_or_else(|| {
                    ComputeError::invalid_event_data(format!("income {} amount {} is out of range", income.id, income.amount))
                })?;

                let eligible = ledger::eligible_member_ids(&txn, fund_id).await?;
                let plan = splitter::validate_distributions(amount, &proposed, &eligible)?;
                let distributions = ledger::replace_distributions(&txn, income_id, &plan).await?;

                let fund = ledger::find_fund(&txn, fund_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed {
                    value: IncomeWithDistributions { income, distributions },
                    settlement,
                })
            })
            .await?;

        info!(income_id, "Replaced distributions");
        Ok(replayed)
    }

    /// Splits an income evenly over the fund's active members and optionally the fund.
    #[instrument(skip(self))]
    pub async fn equal_split(
        &self,
        income_id: i32,
        include_fund: bool,
    ) -> Result<Replayed<IncomeWithDistributions>> {
        trace!("Equal split");
        let fund_id = ledger::find_income(&self.db, income_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let income = ledger::find_income(&txn, income_id).await?;
                let amount = Cents::from_stored(income.amount).ok_or_else(|| {
                    ComputeError::invalid_event_data(format!("income {} amount {} is out of range", income.id, income.amount))
                })?;

                let members: Vec<i32> = ledger::eligible_member_ids(&txn, fund_id).await?.into_iter().collect();
                let plan = splitter::equal_split(amount, &members, include_fund)?;
                let distributions = ledger::replace_distributions(&txn, income_id, &plan).await?;

                let fund = ledger::find_fund(&txn, fund_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed {
                    value: IncomeWithDistributions { income, distributions },
                    settlement,
                })
            })
            .await?;

        info!(income_id, "Applied equal split");
        Ok(replayed)
    }

    // ===================== Group costs =====================

    #[instrument(skip(self, cost))]
    pub async fn create_cost(&self, fund_id: i32, cost: NewCost) -> Result<Replayed<group_cost::Model>> {
        trace!("Creating group cost");

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let fund = ledger::find_fund(&txn, fund_id).await?;
                let cost = ledger::insert_cost(&txn, fund_id, cost).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed { value: cost, settlement })
            })
            .await?;

        info!(cost_id = replayed.value.id, "Created group cost");
        Ok(replayed)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_cost(&self, cost_id: i32, changes: CostChanges) -> Result<Replayed<group_cost::Model>> {
        trace!("Updating group cost");
        let fund_id = ledger::find_cost(&self.db, cost_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let fund = ledger::find_fund(&txn, fund_id).await?;
                let cost = ledger::update_cost(&txn, cost_id, changes).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed { value: cost, settlement })
            })
            .await?;

        info!(cost_id, "Updated group cost");
        Ok(replayed)
    }

    #[instrument(skip(self))]
    pub async fn delete_cost(&self, cost_id: i32) -> Result<Replayed<group_cost::Model>> {
        trace!("Deleting group cost");
        let fund_id = ledger::find_cost(&self.db, cost_id).await?.fund_id;

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let replayed = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let fund = ledger::find_fund(&txn, fund_id).await?;
                let cost = ledger::delete_cost(&txn, cost_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(Replayed { value: cost, settlement })
            })
            .await?;

        info!(cost_id, "Deleted group cost");
        Ok(replayed)
    }

    // ===================== Cache maintenance and reads =====================

    /// Throws away the cache of a fund and rebuilds it from the event log.
    #[instrument(skip(self))]
    pub async fn recompute(&self, fund_id: i32) -> Result<Settlement> {
        trace!("Recomputing fund");

        let _guard = self.lock.acquire(fund_id, self.settings.lock_timeout).await?;
        let settlement = self
            .within_deadline(fund_id, async {
                let txn = self.db.begin().await?;
                let fund = ledger::find_fund(&txn, fund_id).await?;
                let settlement = replay_and_persist(&txn, &fund).await?;
                txn.commit().await?;
                Ok(settlement)
            })
            .await?;

        info!(fund_id, balance = %settlement.stats.balance, "Recomputed fund");
        Ok(settlement)
    }

    /// Recomputes every fund in id order. Returns the ids that were rebuilt.
    #[instrument(skip(self))]
    pub async fn recompute_all(&self) -> Result<Vec<i32>> {
        let fund_ids: Vec<i32> = fund::Entity::find()
            .order_by_asc(fund::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|fund| fund.id)
            .collect();
        debug!("Recomputing {} funds", fund_ids.len());

        for fund_id in &fund_ids {
            self.recompute(*fund_id).await?;
        }

        info!("Recomputed {} funds", fund_ids.len());
        Ok(fund_ids)
    }

    /// Serves the cached figures of a fund without taking the ledger lock.
    ///
    /// Falls back to an uncached replay when the cache is missing or partial.
    #[instrument(skip(self))]
    pub async fn report(&self, fund_id: i32) -> Result<FundReport> {
        let txn = self.begin_read().await?;
        let fund = ledger::find_fund(&txn, fund_id).await?;

        if let Some(cached) = ledger::load_cached_settlement(&txn, fund_id).await? {
            txn.commit().await?;
            trace!("Serving report from cache");
            return Ok(FundReport {
                fund,
                settlement: cached.settlement,
                computed_at: Some(cached.computed_at),
                from_cache: true,
            });
        }

        debug!(fund_id, "Cache missing, replaying for report");
        let settlement = replay(&txn, &fund).await?;
        txn.commit().await?;
        Ok(FundReport {
            fund,
            settlement,
            computed_at: None,
            from_cache: false,
        })
    }

    /// Compares the cache of a fund with a fresh replay without writing anything.
    #[instrument(skip(self))]
    pub async fn verify(&self, fund_id: i32) -> Result<CacheCheck> {
        let txn = self.begin_read().await?;
        let fund = ledger::find_fund(&txn, fund_id).await?;
        let replayed = replay(&txn, &fund).await?;
        let cached = ledger::load_cached_settlement(&txn, fund_id).await?;
        txn.commit().await?;

        let Some(cached) = cached else {
            warn!(fund_id, "Settlement cache is missing or incomplete");
            return Ok(CacheCheck {
                fund_id,
                cache_present: false,
                drift: vec!["cache is missing or incomplete".to_string()],
            });
        };

        let drift = describe_drift(&cached.settlement, &replayed);
        if drift.is_empty() {
            debug!(fund_id, "Settlement cache matches replay");
        } else {
            warn!(fund_id, num_differences = drift.len(), "Settlement cache drifted from replay");
        }

        Ok(CacheCheck {
            fund_id,
            cache_present: true,
            drift,
        })
    }
}

fn describe_drift(cached: &Settlement, replayed: &Settlement) -> Vec<String> {
    let mut drift = Vec::new();

    let stats = [
        ("opening_balance", cached.stats.opening_balance, replayed.stats.opening_balance),
        ("total_inflows", cached.stats.total_inflows, replayed.stats.total_inflows),
        ("total_pool", cached.stats.total_pool, replayed.stats.total_pool),
        ("total_costs", cached.stats.total_costs, replayed.stats.total_costs),
        ("total_paid", cached.stats.total_paid, replayed.stats.total_paid),
        ("total_unpaid", cached.stats.total_unpaid, replayed.stats.total_unpaid),
        ("balance", cached.stats.balance, replayed.stats.balance),
        ("surplus", cached.stats.surplus, replayed.stats.surplus),
        ("deficit", cached.stats.deficit, replayed.stats.deficit),
    ];
    for (name, cached_value, replayed_value) in stats {
        if cached_value != replayed_value {
            drift.push(format!("{name}: cached {cached_value}, replayed {replayed_value}"));
        }
    }

    for expected in &replayed.allocations {
        match cached.allocation(expected.cost_id) {
            None => drift.push(format!("cost {}: no cached allocation", expected.cost_id)),
            Some(actual) => {
                if actual.paid_amount != expected.paid_amount {
                    drift.push(format!(
                        "cost {}: cached paid {}, replayed paid {}",
                        expected.cost_id, actual.paid_amount, expected.paid_amount
                    ));
                }
                if actual.is_paid != expected.is_paid {
                    drift.push(format!(
                        "cost {}: cached is_paid {}, replayed is_paid {}",
                        expected.cost_id, actual.is_paid, expected.is_paid
                    ));
                }
            }
        }
    }

    drift
}
