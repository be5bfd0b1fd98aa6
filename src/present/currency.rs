use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub const INVALID_PRICE: &str = "Invalid price";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Jpy,
    Usd,
    Php,
    Try,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Jpy, Currency::Usd, Currency::Php, Currency::Try];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "JPY" => Some(Self::Jpy),
            "USD" => Some(Self::Usd),
            "PHP" => Some(Self::Php),
            "TRY" => Some(Self::Try),
            _ => None,
        }
    }

    /// Unknown or missing codes fall back to yen.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Jpy => "JPY",
            Self::Usd => "USD",
            Self::Php => "PHP",
            Self::Try => "TRY",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Jpy => "¥",
            Self::Usd => "$",
            Self::Php => "₱",
            Self::Try => "₺",
        }
    }

    pub fn fraction_digits(self) -> u32 {
        match self {
            Self::Jpy => 0,
            Self::Usd | Self::Php | Self::Try => 2,
        }
    }

    // ja-JP, en-US and en-PH group with commas; tr-TR swaps the separators.
    fn separators(self) -> (char, char) {
        match self {
            Self::Try => ('.', ','),
            Self::Jpy | Self::Usd | Self::Php => (',', '.'),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PriceDisplay {
    #[default]
    Symbol,
    Code,
}

/// A price as the backend sends it: decimal columns arrive as strings,
/// computed totals as numbers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Price {
    Number(f64),
    Text(String),
}

impl Price {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => parse_amount(s),
        }
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // f64::from_str also accepts "inf" and "NaN", neither is a price.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a price in `currency`. Text that does not parse as a number is
/// returned unchanged; a non-finite number renders as "Invalid price".
pub fn format_price(price: &Price, currency: Currency, display: PriceDisplay) -> String {
    match price.amount() {
        Some(amount) => format_amount(amount, currency, display),
        None => match price {
            Price::Text(s) => s.clone(),
            Price::Number(_) => INVALID_PRICE.to_string(),
        },
    }
}

pub fn format_price_str(raw: &str, currency: Currency) -> String {
    format_price(&Price::Text(raw.to_string()), currency, PriceDisplay::Symbol)
}

pub fn format_amount(amount: f64, currency: Currency, display: PriceDisplay) -> String {
    let digits = currency.fraction_digits();
    let scale = 10u128.pow(digits);
    let (group_sep, decimal_sep) = currency.separators();

    let negative = amount < 0.0;
    // f64::round is half away from zero.
    let minor = (amount.abs() * scale as f64).round();
    let minor = if minor >= u128::MAX as f64 {
        u128::MAX
    } else {
        minor as u128
    };
    let whole = minor / scale;
    let fraction = minor % scale;

    let mut number = group_digits(whole, group_sep);
    if digits > 0 {
        number.push(decimal_sep);
        number.push_str(&format!("{:0width$}", fraction, width = digits as usize));
    }

    let sign = if negative && minor != 0 { "-" } else { "" };
    match display {
        PriceDisplay::Symbol => format!("{sign}{}{number}", currency.symbol()),
        PriceDisplay::Code => format!("{sign}{number} {}", currency.code()),
    }
}

fn group_digits(value: u128, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}
