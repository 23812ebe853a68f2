use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Currency, PaymentIntentId, Role};
use crate::utils::parse_timestamp;

// Paged listing shape shared by equipment, rentals and payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Pagination parameters for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    Excavation,
    Concrete,
    Lifting,
    Cutting,
    Drilling,
    PowerTools,
    HandTools,
    Safety,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    Rented,
    Maintenance,
    Damaged,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: EquipmentCategory,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub daily_rate: f64,
    #[serde(default, deserialize_with = "crate::utils::opt_amount::deserialize")]
    pub weekly_rate: Option<f64>,
    #[serde(default, deserialize_with = "crate::utils::opt_amount::deserialize")]
    pub monthly_rate: Option<f64>,
    pub status: EquipmentStatus,
    pub quantity_total: u32,
    pub quantity_available: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub requires_license: bool,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default, deserialize_with = "crate::utils::opt_timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Catalog filters for `GET /api/equipment`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentQuery {
    pub search: Option<String>,
    pub category: Option<EquipmentCategory>,
    pub available_only: bool,
    pub page: PageRequest,
}

/// Body of `POST /api/equipment` (admin).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEquipment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: EquipmentCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub daily_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_consumption: Option<String>,
    pub quantity_total: u32,
    pub requires_license: bool,
    pub min_age: u32,
}

impl NewEquipment {
    /// One unit, no licence, minimum age 18; the server's defaults.
    pub fn new(name: impl Into<String>, category: EquipmentCategory, daily_rate: f64) -> Self {
        Self {
            name: name.into(),
            description: None,
            category,
            brand: None,
            model: None,
            daily_rate,
            weekly_rate: None,
            monthly_rate: None,
            weight: None,
            dimensions: None,
            power_consumption: None,
            quantity_total: 1,
            requires_license: false,
            min_age: 18,
        }
    }
}

/// Body of `PUT /api/equipment/{id}`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EquipmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EquipmentCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EquipmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Overdue,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
        }
    }
}

/// Row in the "my rentals" history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalSummary {
    pub id: i64,
    pub equipment_name: String,
    #[serde(deserialize_with = "crate::utils::timestamp::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "crate::utils::timestamp::deserialize")]
    pub end_date: DateTime<Utc>,
    pub status: RentalStatus,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub total_price: f64,
    #[serde(default, deserialize_with = "crate::utils::opt_timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: i64,
    pub user_id: i64,
    pub equipment_id: i64,
    #[serde(deserialize_with = "crate::utils::timestamp::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "crate::utils::timestamp::deserialize")]
    pub end_date: DateTime<Utc>,
    pub quantity: u32,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub unit_price: f64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub total_price: f64,
    #[serde(default, deserialize_with = "crate::utils::opt_amount::deserialize")]
    pub deposit_amount: Option<f64>,
    pub status: RentalStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default)]
    pub return_address: Option<String>,
    #[serde(default)]
    pub delivery_required: bool,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub equipment_name: Option<String>,
}

/// Body of `POST /api/rentals`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRental {
    pub equipment_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_address: Option<String>,
    pub delivery_required: bool,
}

impl NewRental {
    pub fn new(window: &RentalWindow) -> Self {
        Self {
            equipment_id: window.equipment_id,
            start_date: window.start_date,
            end_date: window.end_date,
            quantity: window.quantity,
            notes: None,
            pickup_address: None,
            return_address: None,
            delivery_required: false,
        }
    }
}

/// Body of `PUT /api/rentals/{id}`.
///
/// Owners may only touch the notes and addresses of a pending rental; the
/// status is for administrators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RentalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RentalStatus>,
}

/// Equipment, period and quantity; the parameters of availability and
/// pricing queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentalWindow {
    pub equipment_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub quantity: u32,
}

impl RentalWindow {
    /// Calendar days become noon UTC, which is what the storefront sends.
    pub fn from_dates(equipment_id: i64, start: NaiveDate, end: NaiveDate, quantity: u32) -> Self {
        Self {
            equipment_id,
            start_date: at_noon(start),
            end_date: at_noon(end),
            quantity,
        }
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("equipment_id".to_string(), self.equipment_id.to_string()),
            ("start_date".to_string(), self.start_date.to_rfc3339()),
            ("end_date".to_string(), self.end_date.to_rfc3339()),
            ("quantity".to_string(), self.quantity.to_string()),
        ]
    }
}

fn at_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon).and_utc()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    #[serde(default)]
    pub equipment_name: Option<String>,
    #[serde(default)]
    pub total_quantity: Option<u32>,
    #[serde(default)]
    pub available_quantity: Option<u32>,
    #[serde(default)]
    pub requested_quantity: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPreview {
    pub equipment_name: String,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub equipment_daily_rate: f64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub unit_price: f64,
    pub billable_units: u32,
    pub quantity: u32,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub subtotal: f64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub deposit_amount: f64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub total_price: f64,
    pub duration_days: u32,
}

/// Body of `POST /api/payments/stripe/create-payment-intent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: PaymentIntentId,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub amount: f64,
    pub currency: Currency,
    pub payment_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeConfig {
    pub publishable_key: String,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    OfflineApproved,
}

impl PaymentStatus {
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Completed | Self::OfflineApproved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Rental,
    Deposit,
    LateFee,
    DamageFee,
}

/// Server answer to a card payment confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub message: Option<String>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub rental_id: Option<i64>,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub amount: f64,
    pub currency: Currency,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::opt_timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::opt_timestamp::deserialize")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offline_notes: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub rental_equipment_name: Option<String>,
}

/// Body of `POST /api/payments/offline-approve`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineApproval {
    pub payment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /api/payments/create-offline` (cash, bank transfer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflinePaymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PUT /api/admin/users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: UserStats,
    pub equipment: EquipmentStats,
    pub rentals: RentalStats,
    pub payments: PaymentStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    #[serde(default)]
    pub new_this_month: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentStats {
    pub total: u64,
    pub available: u64,
    pub rented: u64,
    #[serde(default)]
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalStats {
    pub total: u64,
    pub active: u64,
    pub pending: u64,
    #[serde(default)]
    pub overdue: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub total_revenue: f64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub this_month_revenue: f64,
    pub pending: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub period: ReportPeriod,
    pub summary: RevenueSummary,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethodShare>,
    #[serde(default)]
    pub top_equipment: Vec<EquipmentRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

impl ReportPeriod {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.start_date)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub total_revenue: f64,
    pub total_payments: u64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub average_payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodShare {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub amount: f64,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRevenue {
    pub name: String,
    pub rental_count: u64,
    #[serde(deserialize_with = "crate::utils::amount::deserialize")]
    pub revenue: f64,
}
