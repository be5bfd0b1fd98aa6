use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::collection::CollectionItem;
use crate::present::truncate::DEFAULT_MAX_LINES;
use crate::present::{format_date, format_price, image_src, Currency, PriceDisplay, Tone, Truncated};
use crate::resources::{AdminUser, BandOrder, Booking, CustomerOrder, Product};
use crate::view::ViewSnapshot;

pub const DEFAULT_WIDTH: usize = 72;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub currency: Currency,
    pub width: usize,
    pub max_lines: usize,
    /// Show descriptions in full instead of clamping them.
    pub expanded: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            width: DEFAULT_WIDTH,
            max_lines: DEFAULT_MAX_LINES,
            expanded: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    #[serde(skip)]
    pub tone: Option<Tone>,
}

impl Field {
    fn plain(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            tone: None,
        }
    }

    fn toned(label: &'static str, value: impl Into<String>, tone: Tone) -> Self {
        Self {
            label,
            value: value.into(),
            tone: Some(tone),
        }
    }
}

/// How one item shows up in a listing.
pub trait Row: CollectionItem {
    fn fields(&self, currency: Currency) -> Vec<Field>;

    fn description(&self) -> Option<&str> {
        None
    }
}

impl Row for Product {
    fn fields(&self, currency: Currency) -> Vec<Field> {
        let mut fields = vec![Field::plain(
            "Price",
            format_price(&self.price, currency, PriceDisplay::Symbol),
        )];
        if let Some(band) = self.band.as_deref() {
            fields.push(Field::plain("Band", band));
        }
        if let Some(category) = self.category.as_deref() {
            fields.push(Field::plain("Category", category));
        }
        if let Some(quantity) = self.quantity {
            let tone = if quantity > 0 { Tone::Success } else { Tone::Danger };
            fields.push(Field::toned("Stock", quantity.to_string(), tone));
        }
        fields.push(Field::plain("Image", image_src(self.image.as_ref())));
        if self.is_deleted {
            fields.push(Field::toned("State", "Deleted", Tone::Danger));
        }
        fields
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }
}

impl Row for AdminUser {
    fn fields(&self, _: Currency) -> Vec<Field> {
        let mut fields = vec![
            Field::plain("Email", self.email.as_str()),
            Field::plain("Role", self.role_type.as_str()),
            Field::plain("Orders", self.order_count.to_string()),
            Field::plain("Bookings", self.booking_count.to_string()),
        ];
        if self.is_deleted {
            fields.push(Field::toned("State", "Deleted", Tone::Danger));
        }
        fields
    }
}

impl Row for BandOrder {
    fn fields(&self, currency: Currency) -> Vec<Field> {
        let mut fields = vec![
            Field::plain("Date", format_date(&self.order_date)),
            Field::toned("Status", self.status.label(), self.status.tone()),
            Field::plain("Ship to", self.recipient()),
        ];
        if let Some(address) = self.shipping_address() {
            fields.push(Field::plain("Address", address));
        }
        for line in &self.items {
            fields.push(Field::plain(
                "Item",
                format!(
                    "{} x{} ({})",
                    line.product_name,
                    line.quantity,
                    format_price(&line.price, currency, PriceDisplay::Symbol)
                ),
            ));
        }
        fields.push(Field::plain(
            "Total",
            format_price(&self.band_total, currency, PriceDisplay::Symbol),
        ));
        fields
    }
}

impl Row for Booking {
    fn fields(&self, currency: Currency) -> Vec<Field> {
        let mut fields = vec![
            Field::plain("Event", format_date(&self.booking_date)),
            Field::plain(
                "Offer",
                format_price(&self.price, currency, PriceDisplay::Symbol),
            ),
            Field::toned("Status", self.status.label(), self.status.tone()),
        ];
        if let Some(created) = self.date_created.as_deref() {
            fields.push(Field::plain("Received", format_date(created)));
        }
        fields
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }
}

impl Row for CustomerOrder {
    fn fields(&self, currency: Currency) -> Vec<Field> {
        let mut fields = vec![
            Field::plain("Date", format_date(&self.order_date)),
            Field::toned("Status", self.status.label(), self.status.tone()),
            Field::plain(
                "Total",
                format_price(&self.price, currency, PriceDisplay::Symbol),
            ),
        ];
        if let Some(done) = self.date_fulfilled.as_deref() {
            fields.push(Field::plain("Fulfilled", format_date(done)));
        }
        if self.is_booking() {
            fields.push(Field::plain("Type", "Booking"));
        }
        for product in &self.products {
            fields.push(Field::plain(
                "Item",
                format!(
                    "{} ({})",
                    product.name,
                    format_price(&product.price, currency, PriceDisplay::Symbol)
                ),
            ));
        }
        fields
    }
}

fn paint(text: &str, tone: Option<Tone>) -> ColoredString {
    match tone {
        Some(Tone::Success) => text.green(),
        Some(Tone::Danger) => text.red(),
        Some(Tone::Primary) => text.blue(),
        Some(Tone::Warning) => text.yellow(),
        Some(Tone::Default) | None => text.normal(),
    }
}

/// Terminal rendering of a snapshot. Colors follow `colored`'s global
/// override, so `--no-color` is handled by the caller.
pub fn render_text<T: Row>(snapshot: &ViewSnapshot<'_, T>, opts: &RenderOptions) -> String {
    let mut out = String::new();
    match snapshot {
        ViewSnapshot::Loading => out.push_str("Loading...\n"),
        ViewSnapshot::Error(message) => {
            out.push_str(&format!("{} {}\n", "Error:".bold().red(), message));
        }
        ViewSnapshot::Empty(message) => {
            out.push_str(&format!("{}\n", message.dimmed()));
        }
        ViewSnapshot::Page(page) => {
            for (offset, item) in page.items.iter().enumerate() {
                out.push_str(&format!(
                    "{:>3}. {} {}\n",
                    page.first_index + offset,
                    item.title().bold().white(),
                    format!("#{}", item.id()).dimmed(),
                ));
                for field in item.fields(opts.currency) {
                    out.push_str(&format!(
                        "     {:<9}: {}\n",
                        field.label,
                        paint(&field.value, field.tone)
                    ));
                }
                if let Some(text) = item.description() {
                    let mut clamp = Truncated::new(text, opts.width, opts.max_lines);
                    if opts.expanded {
                        clamp.toggle();
                    }
                    for line in clamp.visible_lines() {
                        out.push_str(&format!("     {line}\n"));
                    }
                    if let Some(label) = clamp.toggle_label() {
                        out.push_str(&format!("     [{}]\n", label.cyan()));
                    }
                }
            }
            out.push_str(&pager_line(page.page, page.total_pages, page.total_items));
        }
    }
    out
}

fn pager_line(page: usize, total_pages: usize, total_items: usize) -> String {
    let prev = if page > 1 { "< Previous" } else { "          " };
    let next = if page < total_pages { "Next >" } else { "" };
    format!(
        ":: {prev} | Page {} of {} ({} items) | {next}",
        page.to_string().bold().cyan(),
        total_pages.to_string().bold().cyan(),
        total_items
    )
    .trim_end_matches([' ', '|'])
    .to_string()
        + "\n"
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SnapshotRecord<'a, T: Serialize> {
    Loading,
    Error {
        message: &'a str,
    },
    Empty {
        message: &'a str,
    },
    Loaded {
        page: usize,
        total_pages: usize,
        total_items: usize,
        items: &'a [T],
    },
}

impl<'a, T: Serialize> SnapshotRecord<'a, T> {
    pub fn from_snapshot(snapshot: &ViewSnapshot<'a, T>) -> Self {
        match snapshot {
            ViewSnapshot::Loading => Self::Loading,
            ViewSnapshot::Error(message) => Self::Error { message: *message },
            ViewSnapshot::Empty(message) => Self::Empty { message: *message },
            ViewSnapshot::Page(page) => Self::Loaded {
                page: page.page,
                total_pages: page.total_pages,
                total_items: page.total_items,
                items: page.items,
            },
        }
    }
}

pub fn render_json<T: Serialize>(snapshot: &ViewSnapshot<'_, T>) -> Vec<u8> {
    let mut out = serde_json::to_vec_pretty(&SnapshotRecord::from_snapshot(snapshot))
        .unwrap_or_else(|_| b"{\"state\": \"error\"}".to_vec());
    out.push(b'\n');
    out
}

pub fn render<T: Row + Serialize>(
    snapshot: &ViewSnapshot<'_, T>,
    format: OutputFormat,
    opts: &RenderOptions,
) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(snapshot, opts).into_bytes(),
        OutputFormat::Json => render_json(snapshot),
    }
}
