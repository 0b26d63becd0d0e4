use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mycelial-board",
    version,
    about = "read-only renderer for curated reputation banks",
    long_about = "mycelial-board loads a bank document (bankFingerprint + items), filters it by status, sorts it and renders an escaped board.\n\nExamples:\n  mycelial-board -s https://archive.example/sitemap.json -o board.html\n  mycelial-board -s ./sitemap.json --sort sr --limit 10\n  mycelial-board -s ./sitemap.json -i\n\nTip: Use --config to persist board settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

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
        help = "Write the rendered board to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (text, json, html). Inferred from the output extension when omitted."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.mycelial-board/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a default config file (at --config or the default path) and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 's',
        long = "src",
        visible_alias = "source",
        value_name = "LOCATOR",
        help_heading = "Input",
        help = "Bank document URL or path (default /sitemap.json)."
    )]
    pub src: Option<String>,

    #[arg(
        long = "base-url",
        value_name = "URL",
        help_heading = "Input",
        help = "Base URL that relative sources are resolved against."
    )]
    pub base_url: Option<String>,

    #[arg(
        long = "title",
        value_name = "TEXT",
        help_heading = "Board",
        help = "Board title."
    )]
    pub title: Option<String>,

    #[arg(
        long = "cta",
        value_name = "TEXT",
        help_heading = "Board",
        help = "Call-to-action line shown on every card."
    )]
    pub cta: Option<String>,

    #[arg(
        long = "xmr",
        visible_alias = "contribution-address",
        value_name = "ADDRESS",
        help_heading = "Board",
        help = "Contribution address shown on every card (empty hides it)."
    )]
    pub xmr: Option<String>,

    #[arg(
        short = 'f',
        long = "filter",
        value_name = "SPEC",
        help_heading = "Board",
        help = "Status filter spec (e.g. status:master,grand)."
    )]
    pub filter: Option<String>,

    #[arg(
        long = "sort",
        value_name = "KEY",
        help_heading = "Board",
        help = "Initial sort key (rep, sr, new)."
    )]
    pub sort: Option<String>,

    #[arg(
        short = 'l',
        long = "limit",
        value_name = "N",
        allow_hyphen_values = true,
        help_heading = "Board",
        help = "Maximum items shown (0 = unbounded; non-numeric counts as 0)."
    )]
    pub limit: Option<String>,

    #[arg(
        short = 'q',
        long = "query",
        visible_alias = "search",
        value_name = "TEXT",
        help_heading = "Refine",
        help = "Search title/tags/status after loading."
    )]
    pub query: Option<String>,

    #[arg(
        long = "sort-by",
        value_name = "KEY",
        help_heading = "Refine",
        help = "Re-sort after loading (rep, sr, new)."
    )]
    pub sort_by: Option<String>,

    #[arg(
        long = "status",
        value_name = "LIST",
        help_heading = "Refine",
        help = "Show only these statuses after loading (e.g. master,grand)."
    )]
    pub status: Option<String>,

    #[arg(
        short = 'i',
        long = "interactive",
        help_heading = "Refine",
        help = "Read search/sort/status commands from stdin."
    )]
    pub interactive: bool,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,
}
