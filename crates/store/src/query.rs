//! Filter types for list reads.

use common::{OrderStatus, UserId, VendorId};
use uuid::Uuid;

/// Filters for listing products. All filters are conjunctive; unset fields
/// match everything. Soft-deleted products are always excluded.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub vendor_id: Option<VendorId>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vendor(mut self, vendor_id: VendorId) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Filters for listing orders, newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}
