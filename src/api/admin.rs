use chrono::{DateTime, Utc};

use crate::client::{ApiClient, ApiRequest};
use crate::error::ClientResult;
use crate::model::{
    DashboardStats, MessageResponse, Page, PageRequest, Payment, RentalStatus, RentalSummary,
    RevenueReport, UserUpdate,
};
use crate::session::UserProfile;

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: PageRequest,
}

/// `/api/admin/*`. The server answers 403 to non-admin callers.
#[derive(Clone)]
pub struct AdminApi {
    client: ApiClient,
}

impl AdminApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardStats> {
        self.client
            .execute_json(ApiRequest::get("/api/admin/dashboard"))
            .await
    }

    pub async fn users(&self, query: &UserQuery) -> ClientResult<Vec<UserProfile>> {
        let request = ApiRequest::get("/api/admin/users")
            .query_opt("search", query.search.as_deref().filter(|s| !s.is_empty()))
            .query_opt("role", query.role.as_deref());
        self.client
            .execute_json(super::paged(request, query.page))
            .await
    }

    pub async fn update_user(&self, id: i64, changes: &UserUpdate) -> ClientResult<UserProfile> {
        let request = ApiRequest::put("/api/admin/users").segment(id).json(changes)?;
        self.client.execute_json(request).await
    }

    pub async fn block_user(&self, id: i64) -> ClientResult<MessageResponse> {
        self.user_action(id, "block").await
    }

    pub async fn unblock_user(&self, id: i64) -> ClientResult<MessageResponse> {
        self.user_action(id, "unblock").await
    }

    async fn user_action(&self, id: i64, action: &str) -> ClientResult<MessageResponse> {
        let request = ApiRequest::put("/api/admin/users").segment(id).segment(action);
        self.client.execute_json(request).await
    }

    /// Every user's rentals, optionally filtered by status.
    pub async fn rentals(
        &self,
        status: Option<RentalStatus>,
        page: PageRequest,
    ) -> ClientResult<Page<RentalSummary>> {
        let request =
            ApiRequest::get("/api/admin/rentals").query_opt("status", status.map(|s| s.as_str()));
        self.client.execute_json(super::paged(request, page)).await
    }

    /// Every user's payments. Served under `/api/payments`, not `/api/admin`.
    pub async fn all_payments(&self, page: PageRequest) -> ClientResult<Page<Payment>> {
        self.client
            .execute_json(super::paged(ApiRequest::get("/api/payments/admin/all"), page))
            .await
    }

    /// Cancel a payment that has not completed.
    pub async fn cancel_payment(&self, id: i64) -> ClientResult<MessageResponse> {
        let request = ApiRequest::post("/api/payments").segment(id).segment("cancel");
        self.client.execute_json(request).await
    }

    /// Pending and failed payments awaiting a decision.
    pub async fn pending_payments(&self, page: PageRequest) -> ClientResult<Page<Payment>> {
        self.client
            .execute_json(super::paged(ApiRequest::get("/api/admin/payments/pending"), page))
            .await
    }

    pub async fn pending_rentals(&self, page: PageRequest) -> ClientResult<Page<RentalSummary>> {
        self.client
            .execute_json(super::paged(ApiRequest::get("/api/admin/rentals/pending"), page))
            .await
    }

    /// Revenue over a period; the server defaults to the last 30 days.
    pub async fn revenue_report(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ClientResult<RevenueReport> {
        let request = ApiRequest::get("/api/admin/reports/revenue")
            .query_opt("start_date", start.map(|d| d.to_rfc3339()))
            .query_opt("end_date", end.map(|d| d.to_rfc3339()));
        self.client.execute_json(request).await
    }
}
