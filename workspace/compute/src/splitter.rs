//! Validation and construction of income distribution sets.
//!
//! A distribution set splits one income among band members and the fund. It may
//! leave part of the income undistributed, but it may never hand out more than
//! was received.

use std::collections::BTreeSet;

use model::entities::distribution::RecipientType;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::error::{ComputeError, Result};
use crate::money::Cents;

/// Receiver of one distribution line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Recipient {
    Individual(i32),
    MutualFund,
}

impl Recipient {
    pub fn recipient_type(&self) -> RecipientType {
        match self {
            Recipient::Individual(_) => RecipientType::Individual,
            Recipient::MutualFund => RecipientType::MutualFund,
        }
    }

    pub fn recipient_id(&self) -> Option<i32> {
        match self {
            Recipient::Individual(member_id) => Some(*member_id),
            Recipient::MutualFund => None,
        }
    }
}

/// A distribution line as submitted by a caller, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedDistribution {
    pub recipient_type: RecipientType,
    pub recipient_id: Option<i32>,
    pub amount: Decimal,
    pub note: Option<String>,
}

/// A distribution line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDistribution {
    pub recipient: Recipient,
    pub amount: Cents,
    pub note: Option<String>,
}

/// A complete, accepted distribution set for one income.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    pub income_amount: Cents,
    pub lines: Vec<ValidatedDistribution>,
    distributed: Cents,
    fund_inflow: Cents,
}

impl DistributionPlan {
    /// Totals the lines, failing with `InvalidAmount` if a total overflows.
    fn new(income_amount: Cents, lines: Vec<ValidatedDistribution>) -> Result<Self> {
        let too_large = || ComputeError::invalid_amount("distributions", "total of the distribution amounts is too large");
        let distributed = Cents::checked_sum(lines.iter().map(|line| line.amount)).ok_or_else(too_large)?;
        let fund_inflow = Cents::checked_sum(
            lines
                .iter()
                .filter(|line| line.recipient == Recipient::MutualFund)
                .map(|line| line.amount),
        )
        .ok_or_else(too_large)?;

        Ok(Self {
            income_amount,
            lines,
            distributed,
            fund_inflow,
        })
    }

    pub fn distributed(&self) -> Cents {
        self.distributed
    }

    /// What is left of the income after every line. Never negative.
    pub fn undistributed(&self) -> Cents {
        self.income_amount
            .checked_sub(self.distributed)
            .unwrap_or(Cents::ZERO)
            .non_negative()
    }

    /// The part of the income that becomes a fund inflow.
    pub fn fund_inflow(&self) -> Cents {
        self.fund_inflow
    }
}

/// Validates a proposed distribution set against its income.
///
/// `eligible_members` holds the ids of members that may currently receive
/// money from this income (active members of the income's fund).
///
/// Every line is checked before the total, so field-level problems are
/// reported ahead of [`ComputeError::OverAllocation`].
#[instrument(skip_all, fields(num_lines = proposed.len(), income_amount = %income_amount))]
pub fn validate_distributions(
    income_amount: Cents,
    proposed: &[ProposedDistribution],
    eligible_members: &BTreeSet<i32>,
) -> Result<DistributionPlan> {
    let mut lines = Vec::with_capacity(proposed.len());

    for (index, line) in proposed.iter().enumerate() {
        let recipient = match (line.recipient_type, line.recipient_id) {
            (RecipientType::Individual, Some(member_id)) => {
                if !eligible_members.contains(&member_id) {
                    warn!(member_id, "Rejecting distribution to ineligible member");
                    return Err(ComputeError::invalid_recipient(
                        format!("distributions[{index}].recipient_id"),
                        format!("member {member_id} is unknown or inactive in this fund"),
                    ));
                }
                Recipient::Individual(member_id)
            }
            (RecipientType::Individual, None) => {
                return Err(ComputeError::invalid_recipient(
                    format!("distributions[{index}].recipient_id"),
                    "individual distributions require a recipient",
                ));
            }
            (RecipientType::MutualFund, None) => Recipient::MutualFund,
            (RecipientType::MutualFund, Some(_)) => {
                return Err(ComputeError::invalid_recipient(
                    format!("distributions[{index}].recipient_id"),
                    "mutual fund distributions cannot name a recipient",
                ));
            }
        };

        let amount = parse_line_amount(index, line.amount)?;
        lines.push(ValidatedDistribution {
            recipient,
            amount,
            note: line.note.clone(),
        });
    }

    let plan = DistributionPlan::new(income_amount, lines)?;

    let distributed = plan.distributed();
    if distributed > income_amount {
        warn!(%distributed, %income_amount, "Rejecting over-allocated distribution set");
        return Err(ComputeError::OverAllocation {
            income_amount: income_amount.to_decimal(),
            distributed: distributed.to_decimal(),
        });
    }

    debug!(
        %distributed,
        undistributed = %plan.undistributed(),
        fund_inflow = %plan.fund_inflow(),
        "Distribution set accepted"
    );
    Ok(plan)
}

fn parse_line_amount(index: usize, amount: Decimal) -> Result<Cents> {
    let cents = Cents::from_decimal(amount).ok_or_else(|| {
        ComputeError::invalid_amount(
            format!("distributions[{index}].amount"),
            format!("{amount} is not a whole number of cents up to {}", Cents::MAX),
        )
    })?;
    if cents.is_negative() {
        return Err(ComputeError::invalid_amount(
            format!("distributions[{index}].amount"),
            format!("{amount} is negative"),
        ));
    }
    Ok(cents)
}

/// Splits an income evenly between the given members and, optionally, the fund.
///
/// Each recipient gets `floor(amount / n)` cents. The leftover pennies go to the
/// fund when it participates, otherwise to the member with the lowest id, so the
/// lines always add up to exactly `income_amount`. Duplicate member ids are
/// counted once.
pub fn equal_split(
    income_amount: Cents,
    member_ids: &[i32],
    include_fund: bool,
) -> Result<DistributionPlan> {
    if income_amount.is_negative() {
        return Err(ComputeError::invalid_amount(
            "amount",
            format!("{income_amount} is negative"),
        ));
    }

    let members: BTreeSet<i32> = member_ids.iter().copied().collect();
    let mut recipients: Vec<Recipient> = members.into_iter().map(Recipient::Individual).collect();
    if include_fund {
        recipients.push(Recipient::MutualFund);
    }

    if recipients.is_empty() {
        return Err(ComputeError::invalid_recipient(
            "recipients",
            "an equal split needs at least one recipient",
        ));
    }

    let count = recipients.len() as i64;
    let share = Cents::new(income_amount.amount() / count);
    let remainder = Cents::new(income_amount.amount() % count);

    // Fund is last when present, otherwise the lowest member id is first
    let designated = if include_fund { recipients.len() - 1 } else { 0 };

    let lines = recipients
        .into_iter()
        .enumerate()
        .map(|(position, recipient)| ValidatedDistribution {
            recipient,
            amount: if position == designated {
                // share * count + remainder == income_amount, so this cannot overflow
                Cents::new(share.amount() + remainder.amount())
            } else {
                share
            },
            note: None,
        })
        .collect();

    let plan = DistributionPlan::new(income_amount, lines)?;
    debug!(%share, %remainder, recipients = count, "Computed equal split");
    Ok(plan)
}
