//! Conversions from settlement results into the shared transport types.

use common::{
    CacheCheckDto, CostAllocationDto, DistributionLine, FundReportDto, FundStatsDto,
    ManualOverrideDto, RecipientKind, RecomputeDto,
};
use model::entities::distribution::{self, RecipientType};

use crate::coordinator::{CacheCheck, FundReport};
use crate::money::to_cent_scale;
use crate::settlement::{Allocation, FundStats, ManualOverride, Settlement};
use crate::splitter::ProposedDistribution;

impl From<ManualOverride> for ManualOverrideDto {
    fn from(value: ManualOverride) -> Self {
        match value {
            ManualOverride::Unset => ManualOverrideDto::Unset,
            ManualOverride::ForcedPaid => ManualOverrideDto::ForcedPaid,
            ManualOverride::ForcedUnpaid => ManualOverrideDto::ForcedUnpaid,
        }
    }
}

impl From<ManualOverrideDto> for ManualOverride {
    fn from(value: ManualOverrideDto) -> Self {
        match value {
            ManualOverrideDto::Unset => ManualOverride::Unset,
            ManualOverrideDto::ForcedPaid => ManualOverride::ForcedPaid,
            ManualOverrideDto::ForcedUnpaid => ManualOverride::ForcedUnpaid,
        }
    }
}

fn recipient_kind(value: RecipientType) -> RecipientKind {
    match value {
        RecipientType::Individual => RecipientKind::Individual,
        RecipientType::MutualFund => RecipientKind::MutualFund,
    }
}

fn recipient_type(value: RecipientKind) -> RecipientType {
    match value {
        RecipientKind::Individual => RecipientType::Individual,
        RecipientKind::MutualFund => RecipientType::MutualFund,
    }
}

impl From<DistributionLine> for ProposedDistribution {
    fn from(line: DistributionLine) -> Self {
        Self {
            recipient_type: recipient_type(line.recipient_type),
            recipient_id: line.recipient_id,
            amount: line.amount,
            note: line.note,
        }
    }
}

/// Wire form of a stored distribution row.
pub fn distribution_line(model: &distribution::Model) -> DistributionLine {
    DistributionLine {
        recipient_type: recipient_kind(model.recipient_type),
        recipient_id: model.recipient_id,
        amount: to_cent_scale(model.amount),
        note: model.note.clone(),
    }
}

impl From<&FundStats> for FundStatsDto {
    fn from(stats: &FundStats) -> Self {
        Self {
            opening_balance: stats.opening_balance.to_decimal(),
            total_inflows: stats.total_inflows.to_decimal(),
            total_pool: stats.total_pool.to_decimal(),
            total_costs: stats.total_costs.to_decimal(),
            total_paid: stats.total_paid.to_decimal(),
            total_unpaid: stats.total_unpaid.to_decimal(),
            balance: stats.balance.to_decimal(),
            surplus: stats.surplus.to_decimal(),
            deficit: stats.deficit.to_decimal(),
        }
    }
}

impl From<&Allocation> for CostAllocationDto {
    fn from(allocation: &Allocation) -> Self {
        Self {
            cost_id: allocation.cost_id,
            cost_date: allocation.cost_date,
            amount: allocation.amount.to_decimal(),
            paid_amount: allocation.paid_amount.to_decimal(),
            is_paid: allocation.is_paid,
            manual_override: allocation.manual_override.into(),
        }
    }
}

impl From<FundReport> for FundReportDto {
    fn from(report: FundReport) -> Self {
        Self {
            fund_id: report.fund.id,
            fund_name: report.fund.name,
            currency_code: report.fund.currency_code,
            stats: (&report.settlement.stats).into(),
            allocations: report.settlement.allocations.iter().map(Into::into).collect(),
            computed_at: report.computed_at,
            from_cache: report.from_cache,
        }
    }
}

impl From<CacheCheck> for CacheCheckDto {
    fn from(check: CacheCheck) -> Self {
        Self {
            fund_id: check.fund_id,
            consistent: check.is_consistent(),
            cache_present: check.cache_present,
            drift: check.drift,
        }
    }
}

/// Wire form of a freshly rebuilt cache.
pub fn recompute_dto(fund_id: i32, settlement: &Settlement) -> RecomputeDto {
    RecomputeDto {
        fund_id,
        stats: (&settlement.stats).into(),
        allocations: settlement.allocations.iter().map(Into::into).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Cents;
    use crate::testing::{date, dec};

    #[test]
    fn test_allocation_dto_keeps_cents() {
        let allocation = Allocation {
            cost_id: 7,
            cost_date: date(2025, 3, 3),
            amount: Cents::new(15_000),
            paid_amount: Cents::new(12_000),
            is_paid: false,
            manual_override: ManualOverride::Unset,
        };
        let dto = CostAllocationDto::from(&allocation);
        assert_eq!(dto.paid_amount, dec("120.00"));
        assert_eq!(dto.paid_amount.to_string(), "120.00");
        assert_eq!(dto.manual_override, ManualOverrideDto::Unset);
    }

    #[test]
    fn test_line_maps_recipient() {
        let line = DistributionLine {
            recipient_type: RecipientKind::Individual,
            recipient_id: Some(3),
            amount: dec("10.00"),
            note: Some("Bass".to_string()),
        };
        let proposed = ProposedDistribution::from(line);
        assert_eq!(proposed.recipient_type, RecipientType::Individual);
        assert_eq!(proposed.recipient_id, Some(3));
    }

    #[test]
    fn test_override_round_trips_through_dto() {
        for value in [ManualOverride::Unset, ManualOverride::ForcedPaid, ManualOverride::ForcedUnpaid] {
            assert_eq!(ManualOverride::from(ManualOverrideDto::from(value)), value);
        }
    }
}
