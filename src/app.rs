use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::collection::CollectionItem;
use crate::config::{self, ConfigFile};
use crate::gateway::{Fetch, Gateway, GatewayOptions, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::output::{self, OutputFormat, RenderOptions, Row, DEFAULT_WIDTH};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::present::truncate::DEFAULT_MAX_LINES;
use crate::present::Currency;
use crate::resources::{
    AdminUsers, AllProducts, BandBookings, BandOrders, BandProducts, Resource, ResourceKind,
    UserOrders,
};
use crate::session::Session;
use crate::view::{ActionOutcome, ItemAction, ViewController};

fn print_banner() {
    const BANNER: &str = r#"
                         __        _
   ____ ___  ___  ____ _/ /_ _  __(_)__ _    __
  / __ `__ \/ -_)/ __/ __/ _ \ |/ / / -_) |/|/ /
 /_/ /_/ /_/\__//_/  \__/_//_/___/_/\__/|__,__/
"#;
    eprint!("{}", BANNER.bold().magenta());
    eprintln!("       v{} - paged merch store listings\n", env!("CARGO_PKG_VERSION"));
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label, value);
}

/// Help grouped by `help_heading`, one flag block per argument.
fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = format!(
        "{} {}\n",
        cmd.get_name(),
        cmd.get_version().unwrap_or_default()
    );
    if let Some(long_about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push_str(&format!("{long_about}\n"));
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n\n", cmd.get_name()));

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        match sections.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, args)) => args.push(arg),
            None => sections.push((heading, vec![arg])),
        }
    }

    for (heading, args) in sections {
        out.push_str(&format!("{heading}:\n"));
        for arg in args {
            let mut parts: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }
            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }
            for alias in arg.get_visible_aliases().unwrap_or_default() {
                let rendered = format!("--{alias}");
                if !parts.contains(&rendered) {
                    parts.push(rendered);
                }
            }
            let mut flags = parts.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                flags.push_str(&format!(" <{value_name}>"));
            }
            out.push_str(&format!("  {flags}\n"));
            if let Some(help) = arg.get_help().map(|h| h.to_string()) {
                if !help.trim().is_empty() {
                    out.push_str(&format!("          {}\n", help.trim()));
                }
            }
            out.push('\n');
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliAction {
    Open(u64),
    Delete(u64),
    Update(u64, Value),
    Accept(u64),
    Reject(u64),
}

impl CliAction {
    fn into_item_action(self) -> ItemAction<u64> {
        match self {
            Self::Open(id) => ItemAction::Open(id),
            Self::Delete(id) => ItemAction::Delete(id),
            Self::Update(id, body) => ItemAction::Update { id, body },
            Self::Accept(id) => ItemAction::Command {
                id,
                command: "accept".to_string(),
                patch: Some(json!({"status": "Accepted"})),
            },
            Self::Reject(id) => ItemAction::Command {
                id,
                command: "reject".to_string(),
                patch: Some(json!({"status": "Rejected"})),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub base_url: String,
    pub timeout: u64,
    pub proxy: Option<String>,
    pub session_path: PathBuf,
    pub token: Option<String>,
    pub logout: bool,
    pub currency: Option<Currency>,
    pub resource: ResourceKind,
    pub band: Option<u64>,
    pub page: usize,
    pub page_size: usize,
    pub all_pages: bool,
    pub action: Option<CliAction>,
    pub output: Option<String>,
    pub output_format: OutputFormat,
    pub width: usize,
    pub expand: bool,
    pub no_color: bool,
    pub verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timeout = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let session_path = match args.session_file.or(cfg.session_file) {
        Some(path) => config::expand_tilde(&path),
        None => config::default_session_path()
            .ok_or_else(|| "cannot locate home directory for the session file".to_string())?,
    };

    let currency = match args.currency.or(cfg.currency) {
        Some(raw) => Some(
            Currency::parse(&raw).ok_or_else(|| format!("invalid currency '{raw}'"))?,
        ),
        None => None,
    };

    let resource = match args.resource.as_deref() {
        Some(raw) => {
            ResourceKind::parse(raw).ok_or_else(|| format!("invalid resource '{raw}'"))?
        }
        None => ResourceKind::default(),
    };
    if resource.needs_band() && args.band.is_none() {
        return Err(format!("--band is required for {}", resource.name()));
    }

    let page_size = args
        .page_size
        .or(cfg.page_size)
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let action = if let Some(id) = args.open {
        Some(CliAction::Open(id))
    } else if let Some(id) = args.delete {
        Some(CliAction::Delete(id))
    } else if let Some(id) = args.update {
        let raw = args.set.as_deref().unwrap_or("{}");
        let body = serde_json::from_str(raw).map_err(|e| format!("invalid --set '{raw}': {e}"))?;
        Some(CliAction::Update(id, body))
    } else if let Some(id) = args.accept {
        Some(CliAction::Accept(id))
    } else {
        args.reject.map(CliAction::Reject)
    };

    let output = args.output.or(cfg.output).map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}'"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        base_url,
        timeout,
        proxy,
        session_path,
        token: args.token,
        logout: args.logout,
        currency,
        resource,
        band: args.band,
        page: args.page.unwrap_or(1),
        page_size,
        all_pages: args.all_pages,
        action,
        output,
        output_format,
        width: args.width.or(cfg.width).unwrap_or(DEFAULT_WIDTH),
        expand: args.expand,
        no_color,
        verbose: args.verbose,
    })
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "merchview=info",
        _ => "merchview=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn loading_spinner(label: &str) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed}]")
            .map_err(|e| format!("failed to build spinner style: {e}"))?,
    );
    pb.set_message(format!("Loading {label}..."));
    Ok(pb)
}

struct Sink {
    path: Option<String>,
    buf: Vec<u8>,
}

impl Sink {
    fn new(path: Option<String>) -> Self {
        Self {
            path,
            buf: Vec::new(),
        }
    }

    async fn emit(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        if self.path.is_some() {
            self.buf.extend_from_slice(&bytes);
            return Ok(());
        }
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(&bytes)
            .await
            .map_err(|e| format!("failed to write output: {e}"))?;
        stdout
            .flush()
            .await
            .map_err(|e| format!("failed to write output: {e}"))
    }

    async fn finish(self) -> Result<(), String> {
        let Some(path) = self.path else {
            return Ok(());
        };
        tokio::fs::write(&path, &self.buf)
            .await
            .map_err(|e| format!("failed to write output file '{path}': {e}"))?;
        info!("wrote {} bytes to {path}", self.buf.len());
        Ok(())
    }
}

/// Writes the current page, then every following page with `--all-pages`.
/// Stops at the first page that fails to load. Returns the pages written.
async fn emit_pages<R, F>(
    view: &mut ViewController<R, F>,
    sink: &mut Sink,
    run: &RunConfig,
    opts: &RenderOptions,
) -> Result<usize, String>
where
    R: Resource,
    R::Item: Row + Serialize,
    F: Fetch,
{
    sink.emit(output::render(&view.render(), run.output_format, opts))
        .await?;
    let mut written = 1;
    while run.all_pages
        && view.state().error().is_none()
        && view.next_page().await.map_err(|e| e.to_string())?
    {
        sink.emit(output::render(&view.render(), run.output_format, opts))
            .await?;
        written += 1;
    }
    Ok(written)
}

async fn show<R>(resource: R, key: R::Key, gateway: Gateway, run: &RunConfig, currency: Currency) -> Result<(), String>
where
    R: Resource,
    R::Item: Row + CollectionItem<Id = u64> + Serialize,
{
    let name = resource.name();
    let mut view = ViewController::new(resource, gateway, run.page_size);

    let spinner = loading_spinner(name)?;
    view.mount(key).await;
    if run.page > 1 && view.state().items().is_some() {
        view.go_to_page(run.page).await.map_err(|e| e.to_string())?;
    }
    spinner.finish_and_clear();

    let mut action_error = None;
    if let Some(action) = run.action.clone() {
        match view.dispatch(action.into_item_action()).await {
            Ok(ActionOutcome::Navigate(route)) => format_kv_line("Open", &route),
            Ok(outcome) => debug!("{name}: action finished with {outcome:?}"),
            Err(e) => action_error = Some(e.to_string()),
        }
    }

    let opts = RenderOptions {
        currency,
        width: run.width,
        max_lines: DEFAULT_MAX_LINES,
        expanded: run.expand,
    };
    let mut sink = Sink::new(run.output.clone());
    emit_pages(&mut view, &mut sink, run, &opts).await?;
    sink.finish().await?;

    match (action_error, view.state().error()) {
        (Some(e), _) => Err(e),
        (None, Some(e)) => Err(format!("failed to load {name}: {e}")),
        (None, None) => Ok(()),
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    if run.output_format == OutputFormat::Text {
        print_banner();
    }

    let session = Session::from_file(run.session_path.clone());
    if run.logout {
        session.logout().map_err(|e| e.to_string())?;
        format_kv_line("Session", "cleared");
        return Ok(());
    }
    if let Some(token) = run.token.as_deref() {
        session.login(token, None).map_err(|e| e.to_string())?;
    }
    let authenticated = session.initialize().map_err(|e| e.to_string())?;
    if let Some(currency) = run.currency {
        session.set_currency(currency).map_err(|e| e.to_string())?;
    }
    let currency = session.currency();

    let gateway = Gateway::new(
        GatewayOptions {
            base_url: run.base_url.clone(),
            timeout_seconds: run.timeout,
            proxy: run.proxy.clone(),
        },
        session,
    )
    .map_err(|e| e.to_string())?;

    format_kv_line("API", gateway.base_url());
    format_kv_line("Resource", run.resource.name());
    format_kv_line("Currency", currency.code());
    format_kv_line("Session", if authenticated { "signed in" } else { "anonymous" });
    eprintln!();

    match run.resource {
        ResourceKind::Products => show(AllProducts, (), gateway, &run, currency).await,
        ResourceKind::BandProducts => {
            let band = run
                .band
                .ok_or_else(|| "--band is required for band-products".to_string())?;
            show(BandProducts, band, gateway, &run, currency).await
        }
        ResourceKind::AdminUsers => show(AdminUsers, (), gateway, &run, currency).await,
        ResourceKind::BandOrders => show(BandOrders, (), gateway, &run, currency).await,
        ResourceKind::BandBookings => show(BandBookings, (), gateway, &run, currency).await,
        ResourceKind::UserOrders => show(UserOrders, currency, gateway, &run, currency).await,
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.clone().map(|p| config::expand_tilde(&p)) {
        Some(path) => config::load_config(&path, false)?,
        None => match config::default_config_path() {
            Some(path) => {
                config::ensure_default_config_file(&path)?;
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    init_logging(args.verbose);
    let run = build_run_config(args, cfg)?;
    debug!("run config: {run:?}");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
