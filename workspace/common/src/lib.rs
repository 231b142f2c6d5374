//! Transport-layer types of the settlement API.
//! These structs are what the report and recovery endpoints serialize, kept
//! apart from the backend so other clients can deserialize the same shapes.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic API response wrapper used by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

// ===================== Distributions =====================

/// Who receives a distribution line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    /// A band member, identified by `recipient_id`.
    Individual,
    /// The mutual fund itself. Carries no `recipient_id`.
    MutualFund,
}

/// A distribution line as submitted or returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DistributionLine {
    pub recipient_type: RecipientKind,
    /// Member id, present iff `recipient_type` is `individual`.
    pub recipient_id: Option<i32>,
    /// Non-negative amount with at most two decimal places.
    pub amount: Decimal,
    pub note: Option<String>,
}

// ===================== Settlement =====================

/// Tri-state paid flag of a group cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManualOverrideDto {
    /// Paid automatically in FIFO order from available funds.
    #[default]
    Unset,
    /// Always fully paid, even into a negative balance.
    ForcedPaid,
    /// Never paid and never consumes funds.
    ForcedUnpaid,
}

/// Aggregate figures of a fund.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FundStatsDto {
    pub opening_balance: Decimal,
    pub total_inflows: Decimal,
    pub total_pool: Decimal,
    pub total_costs: Decimal,
    pub total_paid: Decimal,
    pub total_unpaid: Decimal,
    pub balance: Decimal,
    pub surplus: Decimal,
    pub deficit: Decimal,
}

/// Paid state of one group cost.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CostAllocationDto {
    pub cost_id: i32,
    pub cost_date: NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub is_paid: bool,
    pub manual_override: ManualOverrideDto,
}

/// Dashboard view of a fund.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FundReportDto {
    pub fund_id: i32,
    pub fund_name: String,
    pub currency_code: String,
    pub stats: FundStatsDto,
    /// One entry per group cost, in settlement order.
    pub allocations: Vec<CostAllocationDto>,
    /// Timestamp of the replay that produced the figures, absent if they were
    /// computed on the fly because the cache was missing.
    pub computed_at: Option<NaiveDateTime>,
    pub from_cache: bool,
}

/// Result of a full cache rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RecomputeDto {
    pub fund_id: i32,
    pub stats: FundStatsDto,
    pub allocations: Vec<CostAllocationDto>,
}

/// Result of comparing the cache of a fund with a fresh replay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CacheCheckDto {
    pub fund_id: i32,
    pub consistent: bool,
    pub cache_present: bool,
    pub drift: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_recipient_kind_wire_names() {
        assert_eq!(serde_json::to_string(&RecipientKind::MutualFund).unwrap(), "\"mutual_fund\"");
        let kind: RecipientKind = serde_json::from_str("\"individual\"").unwrap();
        assert_eq!(kind, RecipientKind::Individual);
    }

    #[test]
    fn test_override_defaults_to_unset() {
        assert_eq!(ManualOverrideDto::default(), ManualOverrideDto::Unset);
        let value: ManualOverrideDto = serde_json::from_str("\"forced_unpaid\"").unwrap();
        assert_eq!(value, ManualOverrideDto::ForcedUnpaid);
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let line = DistributionLine {
            recipient_type: RecipientKind::MutualFund,
            recipient_id: None,
            amount: Decimal::from_str("40.50").unwrap(),
            note: None,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["amount"], "40.50");
        assert_eq!(json["recipient_type"], "mutual_fund");
    }
}
