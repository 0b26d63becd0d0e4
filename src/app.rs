use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task;

use crate::board::{Board, BoardConfig, LoadState, LoadTicket, ViewEvent};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::loader::{LoadFailure, Loader, LoaderOptions};
use crate::metrics::RatioBand;
use crate::model::Dataset;
use crate::output::{self, report, OutputFormat, ViewRecord};
use crate::pipeline::{SortKey, StatusSet};
use crate::shell::{self, Command};

fn print_banner() {
    println!(
        ":: {} v{} :: read-only bank renderer ::",
        "mycelial-board".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<11}: {}", label, value);
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub board: BoardConfig,
    pub loader: LoaderOptions,
    pub refine: Vec<ViewEvent>,
    pub interactive: bool,
    pub output: Option<String>,
    pub output_format: OutputFormat,
    pub no_color: bool,
    pub verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let mut settings = cfg.board_settings();
    if args.src.is_some() {
        settings.src = args.src;
    }
    if args.title.is_some() {
        settings.title = args.title;
    }
    if args.cta.is_some() {
        settings.cta = args.cta;
    }
    if args.xmr.is_some() {
        settings.xmr = args.xmr;
    }
    if args.filter.is_some() {
        settings.filter = args.filter;
    }
    if args.sort.is_some() {
        settings.sort = args.sort;
    }
    if args.limit.is_some() {
        settings.limit = args.limit;
    }
    let board = BoardConfig::from_settings(&settings);

    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout_seconds == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    let loader = LoaderOptions {
        timeout_seconds,
        proxy: args.proxy.or(cfg.proxy),
        base_url: args.base_url.or(cfg.base_url),
    };

    let mut refine = Vec::new();
    if let Some(query) = args.query {
        refine.push(ViewEvent::Search(query));
    }
    if let Some(raw) = args.sort_by.as_deref() {
        let key = SortKey::parse(raw).ok_or_else(|| format!("invalid --sort-by '{raw}'"))?;
        refine.push(ViewEvent::Sort(key));
    }
    if let Some(raw) = args.status.as_deref() {
        refine.push(ViewEvent::Status(StatusSet::parse_csv(raw)));
    }

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text, json or html"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Html),
    };

    Ok(RunConfig {
        board,
        loader,
        refine,
        interactive: args.interactive,
        output,
        output_format,
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
        verbose: args.verbose,
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("mycelial_board={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn band_colored(record: &ViewRecord) -> colored::ColoredString {
    let text = format!("{}%", record.success_percent);
    match record.band {
        RatioBand::Good => text.as_str().green(),
        RatioBand::Mid => text.as_str().yellow(),
        RatioBand::Bad => text.as_str().red(),
    }
}

fn print_view(board: &Board) {
    if let LoadState::Failed(failure) = board.load_state() {
        println!(
            "{} {}",
            "Failed to load sitemap at".red(),
            board.config().source
        );
        println!(":: {}", failure.to_string().as_str().dimmed());
        return;
    }

    format_kv_line("Fingerprint", board.fingerprint());
    let records = board.records();
    if records.is_empty() {
        println!("{}", report::EMPTY_NOTICE.dimmed());
        return;
    }
    for r in records.iter() {
        let badge = if r.badge == "Grandmaster" {
            r.badge.magenta()
        } else {
            r.badge.cyan()
        };
        let title = if r.title.is_empty() { "—" } else { r.title.as_str() };
        println!(
            "[{}] {} {} :: rep {} :: success {} :: fail {} :: {}",
            badge,
            title.bold(),
            format!("({})", r.id).as_str().dimmed(),
            r.replications,
            r.success,
            r.fail,
            band_colored(r)
        );
    }
}

fn render_output(board: &Board, format: OutputFormat) -> Vec<u8> {
    let failure = match board.load_state() {
        LoadState::Failed(failure) => Some(failure),
        _ => None,
    };
    match (format, failure) {
        (OutputFormat::Html, _) => board.render_page().into_bytes(),
        (OutputFormat::Text, Some(_)) => {
            format!("Failed to load sitemap at {}\n", board.config().source).into_bytes()
        }
        (OutputFormat::Json, Some(failure)) => serde_json::to_vec_pretty(&serde_json::json!({
            "source": board.config().source,
            "error": failure.to_string(),
        }))
        .unwrap_or_else(|_| b"{}\n".to_vec()),
        (OutputFormat::Text, None) => output::render_text(&board.records()),
        (OutputFormat::Json, None) => output::render_json(&board.records()),
    }
}

async fn write_output(board: &Board, path: &str, format: OutputFormat) -> Result<(), String> {
    let rendered = render_output(board, format);
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(&rendered)
        .await
        .map_err(|e| format!("failed to write output file: {e}"))?;
    Ok(())
}

async fn emit(board: &Board, run: &RunConfig) -> Result<(), String> {
    print_view(board);
    if let Some(path) = run.output.as_deref() {
        write_output(board, path, run.output_format).await?;
        format_kv_line("Written", path);
    }
    Ok(())
}

fn loading_spinner(source: &str) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: Loading {msg} {spinner}")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(source.to_string());
    Ok(pb)
}

type LoadOutcome = (LoadTicket, Result<Dataset, LoadFailure>);

async fn run_shell(mut board: Board, loader: Loader, run: &RunConfig) -> Result<(), String> {
    println!("{}", shell::HELP.dimmed());
    let (load_tx, mut load_rx) = mpsc::channel::<LoadOutcome>(8);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => return Err(format!("failed to read stdin: {e}")),
                };
                match shell::parse_command(&line) {
                    Ok(Command::Event(event)) => {
                        board.dispatch(event);
                        emit(&board, run).await?;
                    }
                    Ok(Command::Reload) => {
                        let ticket = board.begin_load();
                        let source = board.config().source.clone();
                        let loader = loader.clone();
                        let tx = load_tx.clone();
                        format_kv_line("Reloading", &source);
                        task::spawn(async move {
                            let outcome = loader.load(&source).await;
                            let _ = tx.send((ticket, outcome)).await;
                        });
                    }
                    Ok(Command::Show) => emit(&board, run).await?,
                    Ok(Command::Help) => println!("{}", shell::HELP),
                    Ok(Command::Quit) => break,
                    Err(e) => eprintln!("{}", e.as_str().yellow()),
                }
            }
            Some((ticket, outcome)) = load_rx.recv() => {
                if board.finish_load(ticket, outcome) {
                    emit(&board, run).await?;
                }
            }
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let source = run.board.source.clone();
    format_kv_line("Source", &source);
    format_kv_line("Statuses", &run.board.status_filter.to_string());
    format_kv_line("Sort", run.board.sort.token());
    format_kv_line("Limit", &run.board.limit.to_string());
    println!();

    let loader = Loader::new(&run.loader).map_err(|e| e.to_string())?;
    let mut board = Board::new(run.board.clone());

    let ticket = board.begin_load();
    let pb = loading_spinner(&source)?;
    let outcome = loader.load(&source).await;
    pb.finish_and_clear();
    board.finish_load(ticket, outcome);

    for event in run.refine.iter().cloned() {
        board.dispatch(event);
    }

    emit(&board, &run).await?;

    if run.interactive {
        return run_shell(board, loader, &run).await;
    }
    if let LoadState::Failed(failure) = board.load_state() {
        return Err(format!("failed to load {source}: {failure}"));
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };
    // before settings are resolved, which may warn
    init_tracing(args.verbose);

    let user_config_path = args.config.as_deref().map(config::expand_tilde);
    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine a config path".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!(":: Config: {}", path.display());
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
