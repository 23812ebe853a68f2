use crate::client::{ApiClient, ApiRequest};
use crate::error::ClientResult;
use crate::model::{
    Availability, MessageResponse, NewRental, Page, PageRequest, PricingPreview, Rental,
    RentalStatus, RentalSummary, RentalUpdate, RentalWindow,
};

/// The signed-in user's rentals, plus availability and pricing queries.
#[derive(Clone)]
pub struct RentalsApi {
    client: ApiClient,
}

impl RentalsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        status: Option<RentalStatus>,
        page: PageRequest,
    ) -> ClientResult<Page<RentalSummary>> {
        let request = ApiRequest::get("/api/rentals").query_opt("status", status.map(|s| s.as_str()));
        self.client.execute_json(super::paged(request, page)).await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Rental> {
        self.client
            .execute_json(ApiRequest::get("/api/rentals").segment(id))
            .await
    }

    pub async fn create(&self, rental: &NewRental) -> ClientResult<Rental> {
        let request = ApiRequest::post("/api/rentals").json(rental)?;
        self.client.execute_json(request).await
    }

    pub async fn update(&self, id: i64, changes: &RentalUpdate) -> ClientResult<Rental> {
        let request = ApiRequest::put("/api/rentals").segment(id).json(changes)?;
        self.client.execute_json(request).await
    }

    /// Cancel a pending or confirmed rental.
    pub async fn cancel(&self, id: i64) -> ClientResult<MessageResponse> {
        self.client
            .execute_json(ApiRequest::delete("/api/rentals").segment(id))
            .await
    }

    pub async fn check_availability(&self, window: &RentalWindow) -> ClientResult<Availability> {
        self.client
            .execute_json(windowed("/api/rentals/check-availability", window))
            .await
    }

    pub async fn pricing_preview(&self, window: &RentalWindow) -> ClientResult<PricingPreview> {
        self.client
            .execute_json(windowed("/api/rentals/pricing-preview", window))
            .await
    }
}

fn windowed(path: &str, window: &RentalWindow) -> ApiRequest {
    window
        .query_pairs()
        .into_iter()
        .fold(ApiRequest::get(path), |req, (k, v)| req.query(&k, v))
}
