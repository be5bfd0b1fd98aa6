pub mod currency;
pub mod truncate;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

pub use currency::{format_amount, format_price, format_price_str, Currency, Price, PriceDisplay};
pub use truncate::{layout_lines, Truncated};

pub const PLACEHOLDER_IMAGE: &str = "/api/placeholder/50/50";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ImageUrls {
    One(String),
    Many(Vec<String>),
}

/// Image reference as stored by the backend: a bare URL, `{ "url": "..." }`
/// or `{ "url": ["...", ...] }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object { url: Option<ImageUrls> },
}

impl ImageRef {
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url.as_str()),
            Self::Object { url: Some(ImageUrls::One(url)) } => Some(url.as_str()),
            Self::Object {
                url: Some(ImageUrls::Many(urls)),
            } => urls.first().map(String::as_str),
            Self::Object { url: None } => None,
        }
    }
}

/// First image of the reference, or the placeholder when there is none or
/// the first entry is blank.
pub fn image_src(image: Option<&ImageRef>) -> &str {
    match image.and_then(ImageRef::first) {
        Some(url) if !url.trim().is_empty() => url,
        _ => PLACEHOLDER_IMAGE,
    }
}

/// Renders a backend timestamp as `Jan 5, 2024, 03:30 PM`. Plain dates
/// drop the time part. Anything unparseable is returned as is.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.format("%b %-d, %Y, %I:%M %p").to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return dt.format("%b %-d, %Y, %I:%M %p").to_string();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return d.format("%b %-d, %Y").to_string();
    }
    raw.to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Danger,
    Primary,
    Warning,
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Ongoing,
    Fulfilled,
    Cancelled,
    Other(String),
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Self::Ongoing,
            "fulfilled" => Self::Fulfilled,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.label().to_string()
    }
}

impl OrderStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Fulfilled => "Fulfilled",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Fulfilled => Tone::Success,
            Self::Cancelled => Tone::Danger,
            Self::Ongoing => Tone::Primary,
            Self::Other(_) => Tone::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Retracted,
    Other(String),
}

impl From<String> for BookingStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "retracted" => Self::Retracted,
            _ => Self::Other(value),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(value: BookingStatus) -> Self {
        value.label().to_string()
    }
}

impl BookingStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Retracted => "Retracted",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Accepted => Tone::Success,
            Self::Rejected => Tone::Danger,
            _ => Tone::Warning,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_src_prefers_first_url() {
        let img: ImageRef = serde_json::from_str(r#"{"url": ["a.png", "b.png"]}"#).unwrap();
        assert_eq!(image_src(Some(&img)), "a.png");
        let img: ImageRef = serde_json::from_str(r#""c.png""#).unwrap();
        assert_eq!(image_src(Some(&img)), "c.png");
        let img: ImageRef = serde_json::from_str(r#"{"url": "d.png"}"#).unwrap();
        assert_eq!(image_src(Some(&img)), "d.png");
    }

    #[test]
    fn image_src_falls_back_to_placeholder() {
        assert_eq!(image_src(None), PLACEHOLDER_IMAGE);
        let empty_list: ImageRef = serde_json::from_str(r#"{"url": []}"#).unwrap();
        assert_eq!(image_src(Some(&empty_list)), PLACEHOLDER_IMAGE);
        let blank_first: ImageRef = serde_json::from_str(r#"{"url": ["", "b.png"]}"#).unwrap();
        assert_eq!(image_src(Some(&blank_first)), PLACEHOLDER_IMAGE);
        let no_url: ImageRef = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(image_src(Some(&no_url)), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn format_date_handles_backend_shapes() {
        assert_eq!(format_date("2024-01-05T15:30:00.000Z"), "Jan 5, 2024, 03:30 PM");
        assert_eq!(format_date("2024-11-20 09:05:00"), "Nov 20, 2024, 09:05 AM");
        assert_eq!(format_date("2024-02-29"), "Feb 29, 2024");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn statuses_map_to_tones() {
        assert_eq!(OrderStatus::from("Fulfilled".to_string()).tone(), Tone::Success);
        assert_eq!(OrderStatus::from("Cancelled".to_string()).tone(), Tone::Danger);
        assert_eq!(OrderStatus::from("Ongoing".to_string()).tone(), Tone::Primary);
        assert_eq!(OrderStatus::from("lost".to_string()).tone(), Tone::Default);

        assert_eq!(BookingStatus::from("Accepted".to_string()).tone(), Tone::Success);
        assert_eq!(BookingStatus::from("rejected".to_string()).tone(), Tone::Danger);
        assert_eq!(BookingStatus::from("Pending".to_string()).tone(), Tone::Warning);
        assert_eq!(BookingStatus::from("Retracted".to_string()).tone(), Tone::Warning);
    }

    #[test]
    fn unknown_status_keeps_original_label() {
        let status: OrderStatus = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(status.label(), "On Hold");
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"On Hold\"");
    }
}
