use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use crate::collection::{CollectionItem, ItemId};
use crate::pagination::PaginationMode;
use crate::present::{BookingStatus, Currency, ImageRef, OrderStatus, Price};

/// A remote collection screen: where its list lives, how its items are
/// addressed and how it pages.
pub trait Resource {
    type Item: CollectionItem + Clone + Debug + DeserializeOwned + Serialize;
    /// Value the list depends on (band id, or `()` for fixed lists).
    type Key: Clone + Debug + PartialEq;

    fn name(&self) -> &'static str;
    fn list_endpoint(&self, key: &Self::Key) -> String;
    fn item_endpoint(&self, id: &ItemId<Self::Item>) -> String;
    fn detail_route(&self, id: &ItemId<Self::Item>) -> String;
    fn empty_message(&self) -> &'static str;

    fn pagination(&self) -> PaginationMode {
        PaginationMode::Client
    }

    /// Field holding the list when the response is wrapped in an object.
    fn envelope(&self) -> Option<&'static str> {
        None
    }

    fn command_endpoint(&self, id: &ItemId<Self::Item>, command: &str) -> String {
        format!("{}/{}", self.item_endpoint(id), command.trim_matches('/'))
    }
}

// MySQL flags arrive as 0/1, booleans, or occasionally strings.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    })
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Product {
    #[serde(alias = "id")]
    pub product_id: u64,
    #[serde(default)]
    pub band_id: Option<u64>,
    #[serde(default, alias = "band_name")]
    pub band: Option<String>,
    pub name: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default, alias = "img")]
    pub image: Option<ImageRef>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_deleted: bool,
}

impl CollectionItem for Product {
    type Id = u64;

    fn id(&self) -> u64 {
        self.product_id
    }

    fn title(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AdminUser {
    pub user_id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role_type: String,
    #[serde(default)]
    pub currency_id: Option<u64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_deleted: bool,
    #[serde(default)]
    pub order_count: u64,
    #[serde(default)]
    pub booking_count: u64,
}

impl CollectionItem for AdminUser {
    type Id = u64;

    fn id(&self) -> u64 {
        self.user_id
    }

    fn title(&self) -> &str {
        &self.username
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct OrderLine {
    pub product_name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BandOrder {
    pub order_id: u64,
    pub order_date: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub contact_information: Option<String>,
    #[serde(default)]
    pub band_total: Price,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

impl BandOrder {
    pub fn recipient(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.customer_name.clone()
        } else {
            name
        }
    }

    pub fn shipping_address(&self) -> Option<String> {
        let parts = [
            self.address.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl CollectionItem for BandOrder {
    type Id = u64;

    fn id(&self) -> u64 {
        self.order_id
    }

    fn title(&self) -> &str {
        &self.customer_name
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Booking {
    pub offer_id: u64,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: String,
    pub booking_date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Price,
    pub status: BookingStatus,
    #[serde(default)]
    pub date_created: Option<String>,
}

impl CollectionItem for Booking {
    type Id = u64;

    fn id(&self) -> u64 {
        self.offer_id
    }

    fn title(&self) -> &str {
        &self.user_name
    }
}

/// An order as its customer sees it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CustomerOrder {
    pub id: u64,
    #[serde(default)]
    pub user_id: Option<u64>,
    pub order_date: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub date_fulfilled: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub offer_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CustomerOrder {
    /// Orders backed by an accepted booking offer instead of a cart.
    pub fn is_booking(&self) -> bool {
        self.offer_id.is_some()
    }
}

impl CollectionItem for CustomerOrder {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn title(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("Order")
    }
}

/// `GET /products`: every listed product.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllProducts;

impl Resource for AllProducts {
    type Item = Product;
    type Key = ();

    fn name(&self) -> &'static str {
        "products"
    }

    fn list_endpoint(&self, _: &()) -> String {
        "/products".to_string()
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/admin/products/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/band/product/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No products registered yet."
    }
}

/// `GET /bands/products/<band>`: products offered by one band.
#[derive(Clone, Copy, Debug, Default)]
pub struct BandProducts;

impl Resource for BandProducts {
    type Item = Product;
    type Key = u64;

    fn name(&self) -> &'static str {
        "band-products"
    }

    fn list_endpoint(&self, band_id: &u64) -> String {
        format!("/bands/products/{band_id}")
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/admin/products/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/band/product/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No products found for this band."
    }
}

/// `GET /admin/users?page=&limit=`: paged on the server.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdminUsers;

impl Resource for AdminUsers {
    type Item = AdminUser;
    type Key = ();

    fn name(&self) -> &'static str {
        "admin-users"
    }

    fn list_endpoint(&self, _: &()) -> String {
        "/admin/users".to_string()
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/admin/users/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/admin/users/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No users found."
    }

    fn pagination(&self) -> PaginationMode {
        PaginationMode::Server
    }

    fn envelope(&self) -> Option<&'static str> {
        Some("users")
    }
}

/// `GET /band-manager/orders`: orders containing the managed band's items.
#[derive(Clone, Copy, Debug, Default)]
pub struct BandOrders;

impl Resource for BandOrders {
    type Item = BandOrder;
    type Key = ();

    fn name(&self) -> &'static str {
        "band-orders"
    }

    fn list_endpoint(&self, _: &()) -> String {
        "/band-manager/orders".to_string()
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/orders/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/bandmanager/orders/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No orders yet."
    }
}

/// `GET /bookings/band`: offers made to the managed band.
#[derive(Clone, Copy, Debug, Default)]
pub struct BandBookings;

impl Resource for BandBookings {
    type Item = Booking;
    type Key = ();

    fn name(&self) -> &'static str {
        "band-bookings"
    }

    fn list_endpoint(&self, _: &()) -> String {
        "/bookings/band".to_string()
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/bookings/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/bandmanager/bookings/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No booking offers yet."
    }
}

/// `GET /orders/user/<currency>`: the signed-in customer's orders, priced
/// in the chosen currency.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserOrders;

impl Resource for UserOrders {
    type Item = CustomerOrder;
    type Key = Currency;

    fn name(&self) -> &'static str {
        "my-orders"
    }

    fn list_endpoint(&self, currency: &Currency) -> String {
        format!("/orders/user/{}", currency.code())
    }

    fn item_endpoint(&self, id: &u64) -> String {
        format!("/orders/{id}")
    }

    fn detail_route(&self, id: &u64) -> String {
        format!("/orders/{id}")
    }

    fn empty_message(&self) -> &'static str {
        "No orders found."
    }

    fn envelope(&self) -> Option<&'static str> {
        Some("orders")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourceKind {
    #[default]
    Products,
    BandProducts,
    AdminUsers,
    BandOrders,
    BandBookings,
    UserOrders,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Products,
        ResourceKind::BandProducts,
        ResourceKind::AdminUsers,
        ResourceKind::BandOrders,
        ResourceKind::BandBookings,
        ResourceKind::UserOrders,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "products" | "merch" => Some(Self::Products),
            "band-products" => Some(Self::BandProducts),
            "admin-users" | "users" => Some(Self::AdminUsers),
            "band-orders" | "orders" => Some(Self::BandOrders),
            "band-bookings" | "bookings" => Some(Self::BandBookings),
            "my-orders" | "user-orders" => Some(Self::UserOrders),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Products => AllProducts.name(),
            Self::BandProducts => BandProducts.name(),
            Self::AdminUsers => AdminUsers.name(),
            Self::BandOrders => BandOrders.name(),
            Self::BandBookings => BandBookings.name(),
            Self::UserOrders => UserOrders.name(),
        }
    }

    pub fn needs_band(self) -> bool {
        matches!(self, Self::BandProducts)
    }

    pub fn supports_commands(self) -> bool {
        matches!(self, Self::BandBookings)
    }
}
