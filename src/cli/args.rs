use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "merchview",
    version,
    about = "paged terminal views over the band merch store API",
    long_about = "merchview fetches a collection from the merch store backend (products, band products, users, orders, booking offers) and renders it one page at a time.\n\nExamples:\n  merchview -r products\n  merchview -r band-products --band 3 -p 2\n  merchview -r users --token <JWT> --page-size 25\n  merchview -r bookings --accept 12\n  merchview -r my-orders --currency USD -O json\n\nTip: Use --config to persist the base URL and page size and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the rendered listing to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'O',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text or json (inferred from --output when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'w',
        long = "wd",
        visible_alias = "width",
        value_name = "COLUMNS",
        help_heading = "Output",
        help = "Wrap width used when clamping descriptions."
    )]
    pub width: Option<usize>,

    #[arg(
        short = 'e',
        long = "ex",
        visible_alias = "expand",
        help_heading = "Output",
        help = "Show long descriptions in full (See more)."
    )]
    pub expand: bool,

    #[arg(
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Load settings from a YAML config file."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'B',
        long = "bu",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "Backend",
        help = "API base URL (default: http://localhost:3000)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Backend",
        help = "Request timeout in seconds (default: 10)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Backend",
        help = "Send requests through an HTTP proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "sf",
        visible_alias = "session-file",
        value_name = "FILE",
        help_heading = "Session",
        help = "Session file holding the token and preferences (default: ~/.merchview/session.yml)."
    )]
    pub session_file: Option<String>,

    #[arg(
        long = "tk",
        visible_alias = "token",
        value_name = "JWT",
        help_heading = "Session",
        help = "Store a bearer token in the session before fetching."
    )]
    pub token: Option<String>,

    #[arg(
        long = "lo",
        visible_alias = "logout",
        help_heading = "Session",
        help = "Clear the stored token and user, then exit."
    )]
    pub logout: bool,

    #[arg(
        short = 'C',
        long = "cur",
        visible_alias = "currency",
        value_name = "CODE",
        help_heading = "Session",
        help = "Display currency (JPY, USD, PHP, TRY); saved as the session preference."
    )]
    pub currency: Option<String>,

    #[arg(
        short = 'r',
        long = "rs",
        visible_alias = "resource",
        value_name = "NAME",
        help_heading = "Listing",
        help = "Collection to show: products, band-products, users, orders, bookings, my-orders."
    )]
    pub resource: Option<String>,

    #[arg(
        short = 'b',
        long = "bd",
        visible_alias = "band",
        value_name = "ID",
        help_heading = "Listing",
        help = "Band id for band-products."
    )]
    pub band: Option<u64>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Listing",
        help = "Page to show (clamped to the available range)."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 's',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Listing",
        help = "Items per page (default: 10)."
    )]
    pub page_size: Option<usize>,

    #[arg(
        short = 'a',
        long = "ap",
        visible_alias = "all-pages",
        help_heading = "Listing",
        help = "Walk every page from the current one to the last."
    )]
    pub all_pages: bool,

    #[arg(
        long = "opn",
        visible_alias = "open",
        value_name = "ID",
        help_heading = "Actions",
        help = "Print the detail route of an item."
    )]
    pub open: Option<u64>,

    #[arg(
        long = "del",
        visible_alias = "delete",
        value_name = "ID",
        help_heading = "Actions",
        help = "Delete an item, then show the updated listing."
    )]
    pub delete: Option<u64>,

    #[arg(
        long = "upd",
        visible_alias = "update",
        value_name = "ID",
        requires = "set",
        help_heading = "Actions",
        help = "Update an item with the JSON body given by --set."
    )]
    pub update: Option<u64>,

    #[arg(
        long = "set",
        value_name = "JSON",
        help_heading = "Actions",
        help = "JSON object sent with --update and merged into the local item."
    )]
    pub set: Option<String>,

    #[arg(
        long = "acc",
        visible_alias = "accept",
        value_name = "ID",
        help_heading = "Actions",
        help = "Accept a pending booking offer."
    )]
    pub accept: Option<u64>,

    #[arg(
        long = "rej",
        visible_alias = "reject",
        value_name = "ID",
        help_heading = "Actions",
        help = "Reject a pending booking offer."
    )]
    pub reject: Option<u64>,
}
