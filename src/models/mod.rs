pub mod contracts;
pub mod disputes;
pub mod invoice_items;
pub mod invoices;
pub mod jobs;
pub mod messages;
pub mod milestones;
pub mod notifications;
pub mod organization_invites;
pub mod organization_members;
pub mod organizations;
pub mod proposals;
pub mod reviews;
pub mod transactions;
pub mod users;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

/// Number of pages needed to show `total` rows at `limit` per page.
pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 { 0 } else { total.div_ceil(limit) }
}
