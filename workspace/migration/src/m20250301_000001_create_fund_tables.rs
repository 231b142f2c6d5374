use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create funds table
        manager
            .create_table(
                Table::create()
                    .table(Funds::Table)
                    .if_not_exists()
                    .col(pk_auto(Funds::Id))
                    .col(string(Funds::Name))
                    .col(string(Funds::CurrencyCode).string_len(3))
                    .col(decimal(Funds::OpeningBalance).decimal_len(16, 4).default(0))
                    .to_owned(),
            )
            .await?;

        // Create members table
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(pk_auto(Members::Id))
                    .col(integer(Members::FundId))
                    .col(string(Members::Name))
                    .col(boolean(Members::IsActive).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_members_fund")
                            .from(Members::Table, Members::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create incomes table
        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(pk_auto(Incomes::Id))
                    .col(integer(Incomes::FundId))
                    .col(string_null(Incomes::Description))
                    .col(decimal(Incomes::Amount).decimal_len(16, 4))
                    .col(string(Incomes::CurrencyCode).string_len(3))
                    .col(date(Incomes::ReceivedDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incomes_fund")
                            .from(Incomes::Table, Incomes::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create distributions table (fund inflow rows live here)
        manager
            .create_table(
                Table::create()
                    .table(Distributions::Table)
                    .if_not_exists()
                    .col(pk_auto(Distributions::Id))
                    .col(integer(Distributions::IncomeId))
                    .col(string(Distributions::RecipientType).string_len(20))
                    .col(integer_null(Distributions::RecipientId))
                    .col(decimal(Distributions::Amount).decimal_len(16, 4))
                    .col(string_null(Distributions::Note))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_distributions_income")
                            .from(Distributions::Table, Distributions::IncomeId)
                            .to(Incomes::Table, Incomes::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_distributions_member")
                            .from(Distributions::Table, Distributions::RecipientId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributions_income")
                    .table(Distributions::Table)
                    .col(Distributions::IncomeId)
                    .to_owned(),
            )
            .await?;

        // Create cost_types table
        manager
            .create_table(
                Table::create()
                    .table(CostTypes::Table)
                    .if_not_exists()
                    .col(pk_auto(CostTypes::Id))
                    .col(string(CostTypes::Name).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create group_costs table (fund outflow rows)
        manager
            .create_table(
                Table::create()
                    .table(GroupCosts::Table)
                    .if_not_exists()
                    .col(pk_auto(GroupCosts::Id))
                    .col(integer(GroupCosts::FundId))
                    .col(integer(GroupCosts::CostTypeId))
                    .col(date(GroupCosts::CostDate))
                    .col(decimal(GroupCosts::Amount).decimal_len(16, 4))
                    .col(string_null(GroupCosts::Notes))
                    .col(string_null(GroupCosts::ManualPaidOverride).string_len(20))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_costs_fund")
                            .from(GroupCosts::Table, GroupCosts::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_costs_cost_type")
                            .from(GroupCosts::Table, GroupCosts::CostTypeId)
                            .to(CostTypes::Table, CostTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // FIFO replay reads costs in (cost_date, id) order per fund
        manager
            .create_index(
                Index::create()
                    .name("idx_group_costs_fund_date")
                    .table(GroupCosts::Table)
                    .col(GroupCosts::FundId)
                    .col(GroupCosts::CostDate)
                    .col(GroupCosts::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupCosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CostTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Distributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Funds::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Funds {
    Table,
    Id,
    Name,
    CurrencyCode,
    OpeningBalance,
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
    FundId,
    Name,
    IsActive,
}

#[derive(DeriveIden)]
enum Incomes {
    Table,
    Id,
    FundId,
    Description,
    Amount,
    CurrencyCode,
    ReceivedDate,
}

#[derive(DeriveIden)]
enum Distributions {
    Table,
    Id,
    IncomeId,
    RecipientType,
    RecipientId,
    Amount,
    Note,
}

#[derive(DeriveIden)]
enum CostTypes {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub(crate) enum GroupCosts {
    Table,
    Id,
    FundId,
    CostTypeId,
    CostDate,
    Amount,
    Notes,
    ManualPaidOverride,
}
