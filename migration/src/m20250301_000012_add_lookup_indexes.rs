use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Jobs {
    Table,
    ClientId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contracts {
    Table,
    ClientId,
    FreelancerId,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    ContractId,
    IssuedBy,
    Status,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Disputes {
    Table,
    RaisedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Index on jobs.client_id for fetching a client's postings
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_client_id")
                    .table(Jobs::Table)
                    .col(Jobs::ClientId)
                    .to_owned(),
            )
            .await?;

        // Listing filters by status and sorts by recency
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_status_created")
                    .table(Jobs::Table)
                    .col(Jobs::Status)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_client_id")
                    .table(Contracts::Table)
                    .col(Contracts::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_freelancer_id")
                    .table(Contracts::Table)
                    .col(Contracts::FreelancerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_contract_id")
                    .table(Invoices::Table)
                    .col(Invoices::ContractId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_issued_by")
                    .table(Invoices::Table)
                    .col(Invoices::IssuedBy)
                    .to_owned(),
            )
            .await?;

        // Overdue sweep scans unpaid invoices
        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_status")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_user_id")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_disputes_raised_by")
                    .table(Disputes::Table)
                    .col(Disputes::RaisedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_jobs_client_id",
            "idx_jobs_status_created",
            "idx_contracts_client_id",
            "idx_contracts_freelancer_id",
            "idx_invoices_contract_id",
            "idx_invoices_issued_by",
            "idx_invoices_status",
            "idx_transactions_user_id",
            "idx_disputes_raised_by",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
