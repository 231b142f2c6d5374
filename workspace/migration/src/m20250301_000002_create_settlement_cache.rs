use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_fund_tables::{Funds, GroupCosts};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Per-cost settlement cache, rebuilt on every replay
        manager
            .create_table(
                Table::create()
                    .table(CostAllocations::Table)
                    .if_not_exists()
                    .col(integer(CostAllocations::GroupCostId).primary_key())
                    .col(integer(CostAllocations::FundId))
                    .col(decimal(CostAllocations::PaidAmount).decimal_len(16, 4))
                    .col(boolean(CostAllocations::IsPaid))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cost_allocations_group_cost")
                            .from(CostAllocations::Table, CostAllocations::GroupCostId)
                            .to(GroupCosts::Table, GroupCosts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cost_allocations_fund")
                    .table(CostAllocations::Table)
                    .col(CostAllocations::FundId)
                    .to_owned(),
            )
            .await?;

        // Per-fund aggregate cache
        manager
            .create_table(
                Table::create()
                    .table(FundStats::Table)
                    .if_not_exists()
                    .col(integer(FundStats::FundId).primary_key())
                    .col(decimal(FundStats::OpeningBalance).decimal_len(16, 4))
                    .col(decimal(FundStats::TotalInflows).decimal_len(16, 4))
                    .col(decimal(FundStats::TotalPool).decimal_len(16, 4))
                    .col(decimal(FundStats::TotalCosts).decimal_len(16, 4))
                    .col(decimal(FundStats::TotalPaid).decimal_len(16, 4))
                    .col(decimal(FundStats::TotalUnpaid).decimal_len(16, 4))
                    .col(decimal(FundStats::Balance).decimal_len(16, 4))
                    .col(decimal(FundStats::Surplus).decimal_len(16, 4))
                    .col(decimal(FundStats::Deficit).decimal_len(16, 4))
                    .col(date_time(FundStats::ComputedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fund_stats_fund")
                            .from(FundStats::Table, FundStats::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FundStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CostAllocations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum CostAllocations {
    Table,
    GroupCostId,
    FundId,
    PaidAmount,
    IsPaid,
}

#[derive(DeriveIden)]
enum FundStats {
    Table,
    FundId,
    OpeningBalance,
    TotalInflows,
    TotalPool,
    TotalCosts,
    TotalPaid,
    TotalUnpaid,
    Balance,
    Surplus,
    Deficit,
    ComputedAt,
}
