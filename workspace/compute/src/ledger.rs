//! Storage side of settlement: fetching the event logs of a fund, writing the
//! raw event rows, and reading and writing the derived cache.
//!
//! Every function takes a generic connection so it can run either on the plain
//! pool (reads) or inside the transaction of a ledger mutation.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use model::entities::{
    cost_allocation, cost_type, distribution, fund, fund_stats, group_cost, income, member,
};
use model::entities::distribution::RecipientType;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, instrument, trace};

use crate::error::{ComputeError, Result};
use crate::money::Cents;
use crate::settlement::{Allocation, FundStats, InflowEvent, ManualOverride, OutflowEvent, Settlement};
use crate::splitter::DistributionPlan;

/// Fields of a new group cost.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCost {
    pub cost_type_id: i32,
    pub cost_date: NaiveDate,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub manual_override: ManualOverride,
}

/// Partial update of a group cost. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostChanges {
    pub cost_type_id: Option<i32>,
    pub cost_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
    /// `Some(ManualOverride::Unset)` returns the cost to automatic allocation.
    pub manual_override: Option<ManualOverride>,
}

pub async fn find_fund<C: ConnectionTrait>(conn: &C, fund_id: i32) -> Result<fund::Model> {
    fund::Entity::find_by_id(fund_id)
        .one(conn)
        .await?
        .ok_or(ComputeError::NotFound { entity: "fund", id: fund_id })
}

pub async fn find_income<C: ConnectionTrait>(conn: &C, income_id: i32) -> Result<income::Model> {
    income::Entity::find_by_id(income_id)
        .one(conn)
        .await?
        .ok_or(ComputeError::NotFound { entity: "income", id: income_id })
}

pub async fn find_cost<C: ConnectionTrait>(conn: &C, cost_id: i32) -> Result<group_cost::Model> {
    group_cost::Entity::find_by_id(cost_id)
        .one(conn)
        .await?
        .ok_or(ComputeError::NotFound { entity: "group cost", id: cost_id })
}

/// Ids of the members that may receive new distributions from the fund.
pub async fn eligible_member_ids<C: ConnectionTrait>(conn: &C, fund_id: i32) -> Result<BTreeSet<i32>> {
    let members = member::Entity::find()
        .filter(member::Column::FundId.eq(fund_id))
        .filter(member::Column::IsActive.eq(true))
        .all(conn)
        .await?;
    Ok(members.into_iter().map(|m| m.id).collect())
}

pub async fn distributions_of<C: ConnectionTrait>(
    conn: &C,
    income_id: i32,
) -> Result<Vec<distribution::Model>> {
    Ok(distribution::Entity::find()
        .filter(distribution::Column::IncomeId.eq(income_id))
        .order_by_asc(distribution::Column::Id)
        .all(conn)
        .await?)
}

/// All fund inflows: mutual-fund distributions of the fund's incomes, dated by income.
#[instrument(skip(conn))]
pub async fn load_inflows<C: ConnectionTrait>(conn: &C, fund_id: i32) -> Result<Vec<InflowEvent>> {
    let rows = distribution::Entity::find()
        .find_also_related(income::Entity)
        .filter(income::Column::FundId.eq(fund_id))
        .filter(distribution::Column::RecipientType.eq(RecipientType::MutualFund))
        .order_by_asc(income::Column::ReceivedDate)
        .order_by_asc(distribution::Column::Id)
        .all(conn)
        .await?;

    let mut inflows = Vec::with_capacity(rows.len());
    for (line, owner) in rows {
        let owner = owner.ok_or_else(|| {
            ComputeError::invalid_event_data(format!("distribution {} has no income date", line.id))
        })?;
        let amount = Cents::from_stored(line.amount).ok_or_else(|| {
            ComputeError::invalid_event_data(format!(
                "distribution {} amount {} is out of range",
                line.id, line.amount
            ))
        })?;
        inflows.push(InflowEvent {
            date: owner.received_date,
            amount,
        });
    }

    trace!("Loaded {} inflow events", inflows.len());
    Ok(inflows)
}

/// All fund outflows in FIFO order.
#[instrument(skip(conn))]
pub async fn load_outflows<C: ConnectionTrait>(conn: &C, fund_id: i32) -> Result<Vec<OutflowEvent>> {
    let costs = group_cost::Entity::find()
        .filter(group_cost::Column::FundId.eq(fund_id))
        .order_by_asc(group_cost::Column::CostDate)
        .order_by_asc(group_cost::Column::Id)
        .all(conn)
        .await?;

    let mut outflows = Vec::with_capacity(costs.len());
    for cost in costs {
        outflows.push(outflow_from_cost(&cost)?);
    }

    trace!("Loaded {} outflow events", outflows.len());
    Ok(outflows)
}

fn outflow_from_cost(cost: &group_cost::Model) -> Result<OutflowEvent> {
    let amount = Cents::from_stored(cost.amount).ok_or_else(|| {
        ComputeError::invalid_event_data(format!(
            "group cost {} amount {} is out of range",
            cost.id, cost.amount
        ))
    })?;
    Ok(OutflowEvent {
        id: cost.id,
        date: cost.cost_date,
        amount,
        manual_override: cost.manual_paid_override.into(),
    })
}

pub fn stored_opening_balance(fund: &fund::Model) -> Result<Cents> {
    Cents::from_stored(fund.opening_balance).ok_or_else(|| {
        ComputeError::invalid_event_data(format!(
            "fund {} opening balance {} is out of range",
            fund.id, fund.opening_balance
        ))
    })
}

/// Replaces the whole distribution set of an income with the plan's lines.
#[instrument(skip(conn, plan), fields(num_lines = plan.lines.len()))]
pub async fn replace_distributions<C: ConnectionTrait>(
    conn: &C,
    income_id: i32,
    plan: &DistributionPlan,
) -> Result<Vec<distribution::Model>> {
    let removed = distribution::Entity::delete_many()
        .filter(distribution::Column::IncomeId.eq(income_id))
        .exec(conn)
        .await?;
    debug!("Removed {} previous distribution lines", removed.rows_affected);

    let mut inserted = Vec::with_capacity(plan.lines.len());
    for line in &plan.lines {
        let model = distribution::ActiveModel {
            income_id: Set(income_id),
            recipient_type: Set(line.recipient.recipient_type()),
            recipient_id: Set(line.recipient.recipient_id()),
            amount: Set(line.amount.to_decimal()),
            note: Set(line.note.clone()),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        inserted.push(model);
    }

    Ok(inserted)
}

async fn ensure_cost_type<C: ConnectionTrait>(conn: &C, cost_type_id: i32) -> Result<()> {
    cost_type::Entity::find_by_id(cost_type_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(ComputeError::NotFound { entity: "cost type", id: cost_type_id })
}

/// Validates a cost amount supplied by a caller.
pub fn parse_cost_amount(amount: Decimal) -> Result<Cents> {
    let cents = Cents::from_decimal(amount).ok_or_else(|| {
        ComputeError::invalid_amount("amount", format!("{amount} is not a whole number of cents up to {}", Cents::MAX))
    })?;
    if cents.is_negative() {
        return Err(ComputeError::invalid_amount("amount", format!("{amount} is negative")));
    }
    Ok(cents)
}

#[instrument(skip(conn, cost))]
pub async fn insert_cost<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
    cost: NewCost,
) -> Result<group_cost::Model> {
    let amount = parse_cost_amount(cost.amount)?;
    ensure_cost_type(conn, cost.cost_type_id).await?;

    let model = group_cost::ActiveModel {
        fund_id: Set(fund_id),
        cost_type_id: Set(cost.cost_type_id),
        cost_date: Set(cost.cost_date),
        amount: Set(amount.to_decimal()),
        notes: Set(cost.notes),
        manual_paid_override: Set(cost.manual_override.to_paid_override()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(cost_id = model.id, "Inserted group cost");
    Ok(model)
}

#[instrument(skip(conn, changes))]
pub async fn update_cost<C: ConnectionTrait>(
    conn: &C,
    cost_id: i32,
    changes: CostChanges,
) -> Result<group_cost::Model> {
    let existing = find_cost(conn, cost_id).await?;
    let mut active: group_cost::ActiveModel = existing.into();

    if let Some(amount) = changes.amount {
        active.amount = Set(parse_cost_amount(amount)?.to_decimal());
    }
    if let Some(cost_type_id) = changes.cost_type_id {
        ensure_cost_type(conn, cost_type_id).await?;
        active.cost_type_id = Set(cost_type_id);
    }
    if let Some(cost_date) = changes.cost_date {
        active.cost_date = Set(cost_date);
    }
    if let Some(notes) = changes.notes {
        active.notes = Set(notes);
    }
    if let Some(manual_override) = changes.manual_override {
        active.manual_paid_override = Set(manual_override.to_paid_override());
    }

    let updated = active.update(conn).await?;
    debug!(cost_id, "Updated group cost");
    Ok(updated)
}

#[instrument(skip(conn))]
pub async fn delete_cost<C: ConnectionTrait>(conn: &C, cost_id: i32) -> Result<group_cost::Model> {
    let existing = find_cost(conn, cost_id).await?;

    cost_allocation::Entity::delete_by_id(cost_id).exec(conn).await?;
    group_cost::Entity::delete_by_id(cost_id).exec(conn).await?;

    debug!(cost_id, "Deleted group cost");
    Ok(existing)
}

/// Overwrites the derived cache of a fund with a settlement result.
#[instrument(skip(conn, settlement), fields(num_allocations = settlement.allocations.len()))]
pub async fn persist_settlement<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
    settlement: &Settlement,
    computed_at: NaiveDateTime,
) -> Result<()> {
    cost_allocation::Entity::delete_many()
        .filter(cost_allocation::Column::FundId.eq(fund_id))
        .exec(conn)
        .await?;

    if !settlement.allocations.is_empty() {
        let rows = settlement.allocations.iter().map(|allocation| cost_allocation::ActiveModel {
            group_cost_id: Set(allocation.cost_id),
            fund_id: Set(fund_id),
            paid_amount: Set(allocation.paid_amount.to_decimal()),
            is_paid: Set(allocation.is_paid),
        });
        cost_allocation::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    fund_stats::Entity::delete_by_id(fund_id).exec(conn).await?;

    let stats = &settlement.stats;
    fund_stats::ActiveModel {
        fund_id: Set(fund_id),
        opening_balance: Set(stats.opening_balance.to_decimal()),
        total_inflows: Set(stats.total_inflows.to_decimal()),
        total_pool: Set(stats.total_pool.to_decimal()),
        total_costs: Set(stats.total_costs.to_decimal()),
        total_paid: Set(stats.total_paid.to_decimal()),
        total_unpaid: Set(stats.total_unpaid.to_decimal()),
        balance: Set(stats.balance.to_decimal()),
        surplus: Set(stats.surplus.to_decimal()),
        deficit: Set(stats.deficit.to_decimal()),
        computed_at: Set(computed_at),
    }
    .insert(conn)
    .await?;

    debug!(fund_id, balance = %stats.balance, "Persisted settlement cache");
    Ok(())
}

/// The cached settlement of a fund as last written by a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSettlement {
    pub settlement: Settlement,
    pub computed_at: NaiveDateTime,
}

/// Reads the derived cache back into a [`Settlement`].
///
/// Returns `None` when the fund has never been replayed or when a cost has no
/// cached allocation row, since a partial cache cannot be served.
#[instrument(skip(conn))]
pub async fn load_cached_settlement<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
) -> Result<Option<CachedSettlement>> {
    let Some(stats_row) = fund_stats::Entity::find_by_id(fund_id).one(conn).await? else {
        trace!("No cached stats for fund {}", fund_id);
        return Ok(None);
    };

    let costs = group_cost::Entity::find()
        .filter(group_cost::Column::FundId.eq(fund_id))
        .order_by_asc(group_cost::Column::CostDate)
        .order_by_asc(group_cost::Column::Id)
        .all(conn)
        .await?;

    let cached: HashMap<i32, cost_allocation::Model> = cost_allocation::Entity::find()
        .filter(cost_allocation::Column::FundId.eq(fund_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| (row.group_cost_id, row))
        .collect();

    let mut allocations = Vec::with_capacity(costs.len());
    for cost in &costs {
        let Some(row) = cached.get(&cost.id) else {
            debug!(cost_id = cost.id, "Cost has no cached allocation");
            return Ok(None);
        };
        let outflow = outflow_from_cost(cost)?;
        allocations.push(Allocation {
            cost_id: outflow.id,
            cost_date: outflow.date,
            amount: outflow.amount,
            paid_amount: stored_cents(row.paid_amount, "cached paid amount")?,
            is_paid: row.is_paid,
            manual_override: outflow.manual_override,
        });
    }

    let stats = FundStats {
        opening_balance: stored_cents(stats_row.opening_balance, "cached opening balance")?,
        total_inflows: stored_cents(stats_row.total_inflows, "cached total inflows")?,
        total_pool: stored_cents(stats_row.total_pool, "cached total pool")?,
        total_costs: stored_cents(stats_row.total_costs, "cached total costs")?,
        total_paid: stored_cents(stats_row.total_paid, "cached total paid")?,
        total_unpaid: stored_cents(stats_row.total_unpaid, "cached total unpaid")?,
        balance: stored_cents(stats_row.balance, "cached balance")?,
        surplus: stored_cents(stats_row.surplus, "cached surplus")?,
        deficit: stored_cents(stats_row.deficit, "cached deficit")?,
    };

    Ok(Some(CachedSettlement {
        settlement: Settlement { allocations, stats },
        computed_at: stats_row.computed_at,
    }))
}

fn stored_cents(value: Decimal, what: &str) -> Result<Cents> {
    Cents::from_stored(value)
        .ok_or_else(|| ComputeError::invalid_event_data(format!("{what} {value} is out of range")))
}
