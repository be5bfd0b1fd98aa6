use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::present::Currency;
use crate::resources::ResourceKind;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    let kind = match args.resource.as_deref() {
        Some(raw) => ResourceKind::parse(raw).ok_or_else(|| {
            let known = ResourceKind::ALL
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(", ");
            format!("invalid --resource '{raw}', expected one of: {known}")
        })?,
        None => ResourceKind::default(),
    };
    if kind.needs_band() && args.band.is_none() {
        return Err(format!("--band is required for {}", kind.name()));
    }
    if (args.accept.is_some() || args.reject.is_some()) && !kind.supports_commands() {
        return Err(format!("--accept/--reject are not available for {}", kind.name()));
    }
    if let Some(raw) = args.currency.as_deref() {
        Currency::parse(raw).ok_or_else(|| {
            format!("invalid --currency '{raw}', expected JPY, USD, PHP or TRY")
        })?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid --output-format '{raw}', expected text or json"))?;
    }
    if args.page == Some(0) {
        return Err("invalid page, pages start at 1".to_string());
    }
    if args.page_size == Some(0) {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    if args.width == Some(0) {
        return Err("invalid width, expected positive integer".to_string());
    }
    if let Some(raw) = args.set.as_deref() {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| format!("invalid --set '{raw}': {e}"))?;
        if !value.is_object() {
            return Err(format!("invalid --set '{raw}': expected a JSON object"));
        }
    }
    let actions = [
        args.open.is_some(),
        args.delete.is_some(),
        args.update.is_some(),
        args.accept.is_some(),
        args.reject.is_some(),
    ];
    if actions.iter().filter(|a| **a).count() > 1 {
        return Err("only one of --open, --delete, --update, --accept, --reject may be given".to_string());
    }
    if let Some(token) = args.token.as_deref() {
        if token.trim().is_empty() {
            return Err("invalid --token, expected a non-empty value".to_string());
        }
    }
    Ok(())
}
