use crate::client::{ApiClient, ApiRequest};
use crate::error::ClientResult;
use crate::model::{
    Equipment, EquipmentCategory, EquipmentQuery, EquipmentUpdate, MessageResponse, NewEquipment,
    Page,
};

/// Equipment catalog. Creating, editing and removing items is admin only.
#[derive(Clone)]
pub struct EquipmentApi {
    client: ApiClient,
}

impl EquipmentApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> ClientResult<Page<Equipment>> {
        let request = ApiRequest::get("/api/equipment")
            .query_opt("search", query.search.as_deref().filter(|s| !s.is_empty()))
            .query_opt("category", query.category.map(category_param))
            .query_opt("available_only", query.available_only.then_some(true));
        self.client
            .execute_json(super::paged(request, query.page))
            .await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Equipment> {
        self.client
            .execute_json(ApiRequest::get("/api/equipment").segment(id))
            .await
    }

    pub async fn create(&self, equipment: &NewEquipment) -> ClientResult<Equipment> {
        let request = ApiRequest::post("/api/equipment").json(equipment)?;
        self.client.execute_json(request).await
    }

    pub async fn update(&self, id: i64, changes: &EquipmentUpdate) -> ClientResult<Equipment> {
        let request = ApiRequest::put("/api/equipment").segment(id).json(changes)?;
        self.client.execute_json(request).await
    }

    /// Withdraw an item from the catalog. The server keeps it for rental history.
    pub async fn delete(&self, id: i64) -> ClientResult<MessageResponse> {
        self.client
            .execute_json(ApiRequest::delete("/api/equipment").segment(id))
            .await
    }
}

fn category_param(category: EquipmentCategory) -> String {
    serde_json::to_value(category)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
