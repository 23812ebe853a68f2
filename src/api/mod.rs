// Typed wrappers over the backend's REST endpoints

mod admin;
mod auth;
mod equipment;
mod payments;
mod rentals;

pub use admin::{AdminApi, UserQuery};
pub use auth::{AuthApi, RegisterResponse};
pub use equipment::EquipmentApi;
pub use payments::PaymentsApi;
pub use rentals::RentalsApi;

use crate::client::ApiClient;
use crate::model::PageRequest;
use crate::client::ApiRequest;

impl ApiClient {
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn equipment(&self) -> EquipmentApi {
        EquipmentApi::new(self.clone())
    }

    pub fn rentals(&self) -> RentalsApi {
        RentalsApi::new(self.clone())
    }

    pub fn payments(&self) -> PaymentsApi {
        PaymentsApi::new(self.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.clone())
    }
}

fn paged(request: ApiRequest, page: PageRequest) -> ApiRequest {
    request
        .query_opt("page", page.page)
        .query_opt("size", page.size)
}
