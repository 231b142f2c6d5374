//! FIFO settlement of a fund's outflows against its pooled inflows.
//!
//! The engine is a pure function over the whole event log: callers fetch every
//! inflow and outflow of a fund and get back the paid state of each cost along
//! with the aggregate figures. Nothing here touches storage.

use chrono::NaiveDate;
use model::entities::group_cost::PaidOverride;
use tracing::{debug, instrument, trace};

use crate::error::{ComputeError, Result};
use crate::money::Cents;

/// How a single outflow takes part in allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualOverride {
    /// Paid from available funds in FIFO order.
    #[default]
    Unset,
    /// Counted as fully paid even if that drives the balance negative.
    ForcedPaid,
    /// Never paid and never consumes funds.
    ForcedUnpaid,
}

impl From<Option<PaidOverride>> for ManualOverride {
    fn from(value: Option<PaidOverride>) -> Self {
        match value {
            None => ManualOverride::Unset,
            Some(PaidOverride::ForcedPaid) => ManualOverride::ForcedPaid,
            Some(PaidOverride::ForcedUnpaid) => ManualOverride::ForcedUnpaid,
        }
    }
}

impl ManualOverride {
    /// The nullable column representation.
    pub fn to_paid_override(self) -> Option<PaidOverride> {
        match self {
            ManualOverride::Unset => None,
            ManualOverride::ForcedPaid => Some(PaidOverride::ForcedPaid),
            ManualOverride::ForcedUnpaid => Some(PaidOverride::ForcedUnpaid),
        }
    }
}

/// Money entering the fund: a fund distribution dated by its income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflowEvent {
    pub date: NaiveDate,
    pub amount: Cents,
}

/// Money leaving the fund: one group cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutflowEvent {
    /// Stable surrogate key, used as the tie-break between costs on the same day.
    pub id: i32,
    pub date: NaiveDate,
    pub amount: Cents,
    pub manual_override: ManualOverride,
}

/// Settlement result for one outflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub cost_id: i32,
    pub cost_date: NaiveDate,
    pub amount: Cents,
    pub paid_amount: Cents,
    pub is_paid: bool,
    pub manual_override: ManualOverride,
}

impl Allocation {
    /// `paid_amount` never exceeds `amount`, so this is never negative.
    pub fn unpaid_amount(&self) -> Cents {
        Cents::new(self.amount.amount() - self.paid_amount.amount())
    }
}

/// Aggregate figures of one settlement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FundStats {
    pub opening_balance: Cents,
    pub total_inflows: Cents,
    /// `opening_balance + total_inflows`
    pub total_pool: Cents,
    pub total_costs: Cents,
    pub total_paid: Cents,
    pub total_unpaid: Cents,
    /// `total_pool - total_paid`
    pub balance: Cents,
    pub surplus: Cents,
    pub deficit: Cents,
}

impl FundStats {
    /// No money created or destroyed: `opening_balance + total_inflows == total_paid + balance`.
    pub fn is_conserved(&self) -> bool {
        let before = self.opening_balance.checked_add(self.total_inflows);
        before.is_some() && before == self.total_paid.checked_add(self.balance)
    }
}

/// Complete output of the settlement engine for one fund.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settlement {
    /// One entry per outflow, in FIFO order.
    pub allocations: Vec<Allocation>,
    pub stats: FundStats,
}

impl Settlement {
    pub fn allocation(&self, cost_id: i32) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.cost_id == cost_id)
    }
}

/// Runs FIFO allocation over the full event set of a fund.
///
/// Outflows are settled in ascending `(date, id)` order from a pool of the
/// opening balance plus every inflow, regardless of inflow dates. The input
/// order of either slice does not affect the result.
///
/// Fails only with [`ComputeError::InvalidEventData`] on negative amounts,
/// duplicate outflow ids, or totals that do not fit in `i64` cents.
#[instrument(skip_all, fields(num_inflows = inflows.len(), num_outflows = outflows.len(), opening_balance = %opening_balance))]
pub fn settle(
    opening_balance: Cents,
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
) -> Result<Settlement> {
    validate_events(inflows, outflows)?;

    let total_inflows = Cents::checked_sum(inflows.iter().map(|inflow| inflow.amount))
        .ok_or_else(|| overflow("total inflows"))?;
    let total_pool = opening_balance
        .checked_add(total_inflows)
        .ok_or_else(|| overflow("opening balance plus inflows"))?;
    let mut available = total_pool;
    debug!("Settling {} outflows from a pool of {}", outflows.len(), total_pool);

    let mut ordered: Vec<&OutflowEvent> = outflows.iter().collect();
    ordered.sort_by_key(|outflow| (outflow.date, outflow.id));

    let mut allocations = Vec::with_capacity(ordered.len());
    for outflow in ordered {
        let (paid_amount, is_paid) = match outflow.manual_override {
            ManualOverride::ForcedPaid => {
                available = available
                    .checked_sub(outflow.amount)
                    .ok_or_else(|| overflow(&format!("balance after outflow {}", outflow.id)))?;
                (outflow.amount, true)
            }
            ManualOverride::ForcedUnpaid => (Cents::ZERO, false),
            ManualOverride::Unset => {
                // paid <= max(available, 0), so the subtraction stays in range
                let paid = outflow.amount.min(available.non_negative());
                available = Cents::new(available.amount() - paid.amount());
                (paid, paid == outflow.amount)
            }
        };
        trace!(
            cost_id = outflow.id,
            date = %outflow.date,
            amount = %outflow.amount,
            paid = %paid_amount,
            available = %available,
            "Allocated outflow"
        );

        allocations.push(Allocation {
            cost_id: outflow.id,
            cost_date: outflow.date,
            amount: outflow.amount,
            paid_amount,
            is_paid,
            manual_override: outflow.manual_override,
        });
    }

    let total_costs =
        Cents::checked_sum(allocations.iter().map(|a| a.amount)).ok_or_else(|| overflow("total costs"))?;
    let total_paid =
        Cents::checked_sum(allocations.iter().map(|a| a.paid_amount)).ok_or_else(|| overflow("total paid"))?;
    let balance = available;
    let deficit = balance.checked_neg().ok_or_else(|| overflow("deficit"))?.non_negative();

    let stats = FundStats {
        opening_balance,
        total_inflows,
        total_pool,
        total_costs,
        total_paid,
        // Every paid amount is bounded by its cost amount
        total_unpaid: Cents::new(total_costs.amount() - total_paid.amount()),
        balance,
        surplus: balance.non_negative(),
        deficit,
    };
    debug!(balance = %stats.balance, total_paid = %stats.total_paid, "Settlement complete");

    Ok(Settlement { allocations, stats })
}

fn overflow(what: &str) -> ComputeError {
    ComputeError::invalid_event_data(format!("{what} out of range"))
}

fn validate_events(inflows: &[InflowEvent], outflows: &[OutflowEvent]) -> Result<()> {
    if let Some(inflow) = inflows.iter().find(|inflow| inflow.amount.is_negative()) {
        return Err(ComputeError::invalid_event_data(format!(
            "inflow dated {} has negative amount {}",
            inflow.date, inflow.amount
        )));
    }

    if let Some(outflow) = outflows.iter().find(|outflow| outflow.amount.is_negative()) {
        return Err(ComputeError::invalid_event_data(format!(
            "outflow {} has negative amount {}",
            outflow.id, outflow.amount
        )));
    }

    let mut ids: Vec<i32> = outflows.iter().map(|outflow| outflow.id).collect();
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(ComputeError::invalid_event_data(format!(
            "outflow id {} appears more than once",
            pair[0]
        )));
    }

    Ok(())
}
