use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::board::{parse_limit, Board, BoardConfig, BoardSettings, LoadState, ViewEvent};
use crate::loader::{LoadFailure, Loader, LoaderOptions, Locator};
use crate::model::{Dataset, Item, Metrics};
use crate::output::report;
use crate::pipeline::{self, filters, sort, SortKey, StatusSet, ViewQuery};

fn item(id: &str, status: &str, replications: u64, success: u64, updated: &str) -> Item {
    Item {
        id: Some(id.to_string()),
        title: Some(format!("Title {id}")),
        status: Some(status.to_string()),
        metrics: Metrics {
            replications,
            success,
            fail: 0,
        },
        updated_at: if updated.is_empty() {
            None
        } else {
            Some(updated.to_string())
        },
        ..Default::default()
    }
}

fn ids(items: &[&Item]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.id.clone().unwrap_or_default())
        .collect()
}

fn dataset(items: Vec<Item>) -> Dataset {
    Dataset {
        bank_fingerprint: "fp-test".to_string(),
        items,
    }
}

/// Collects formatted `tracing` output of everything run inside `capture`.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub(crate) fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn loaded_board(config: BoardConfig, items: Vec<Item>) -> Board {
    let mut board = Board::new(config);
    let ticket = board.begin_load();
    assert!(board.finish_load(ticket, Ok(dataset(items))));
    board
}

#[test]
fn status_filter_is_case_insensitive() {
    let items = vec![item("m", "Master", 1, 1, ""), item("g", "Grand", 1, 1, "")];
    let out = filters::filter(&items, &StatusSet::from_iter(["grand"]), "");
    assert_eq!(ids(&out), vec!["g"]);
}

#[test]
fn unknown_statuses_are_excluded_by_default_set() {
    let items = vec![
        item("a", "master", 1, 1, ""),
        item("b", "elder", 1, 1, ""),
        Item::default(),
    ];
    let out = filters::filter(&items, &StatusSet::default(), "");
    assert_eq!(ids(&out), vec!["a"]);
}

#[test]
fn empty_status_set_is_not_special_cased() {
    let items = vec![item("a", "master", 1, 1, "")];
    assert!(filters::filter(&items, &StatusSet::from_iter(Vec::<&str>::new()), "").is_empty());
}

#[test]
fn blank_filter_entry_admits_items_without_status() {
    let mut blank = item("blank", "", 1, 1, "");
    blank.status = Some(String::new());
    let items = vec![
        item("m", "master", 1, 1, ""),
        item("none", "", 1, 1, ""),
        blank,
        item("g", "grand", 1, 1, ""),
    ];
    let mut missing = items.clone();
    missing[1].status = None;

    let trailing = StatusSet::parse_filter_spec("status:master,").unwrap();
    assert_eq!(ids(&filters::filter(&missing, &trailing, "")), vec!["m", "none", "blank"]);

    let bare = StatusSet::parse_filter_spec("status:").unwrap();
    assert_eq!(ids(&filters::filter(&missing, &bare, "")), vec!["none", "blank"]);

    assert_eq!(StatusSet::parse_filter_spec("master,grand"), None);
    assert!(StatusSet::is_blank_list(" , "));
    assert!(!StatusSet::is_blank_list("master,"));
}

#[test]
fn query_searches_title_tags_and_status() {
    let mut tagged = item("t", "master", 1, 1, "");
    tagged.title = None;
    tagged.tags = vec!["Soil".to_string(), "Carbon".to_string()];
    let items = vec![item("a", "grand", 1, 1, ""), tagged];

    let all = StatusSet::default();
    assert_eq!(ids(&filters::filter(&items, &all, "soil carbon")), vec!["t"]);
    assert_eq!(ids(&filters::filter(&items, &all, "TITLE A")), vec!["a"]);
    assert_eq!(ids(&filters::filter(&items, &all, "grand")), vec!["a"]);
    assert_eq!(ids(&filters::filter(&items, &all, "")), vec!["a", "t"]);
    assert!(filters::filter(&items, &all, "nothing here").is_empty());
}

#[test]
fn filter_preserves_dataset_order() {
    let items = vec![
        item("c", "master", 9, 1, ""),
        item("a", "grand", 1, 1, ""),
        item("b", "master", 5, 1, ""),
    ];
    let out = filters::filter(&items, &StatusSet::default(), "title");
    assert_eq!(ids(&out), vec!["c", "a", "b"]);
}

#[test]
fn sort_by_replications_is_stable_and_idempotent() {
    let items = vec![
        item("a", "master", 2, 0, ""),
        item("b", "master", 7, 0, ""),
        item("c", "master", 2, 0, ""),
        item("d", "master", 7, 0, ""),
    ];
    let refs: Vec<&Item> = items.iter().collect();
    let once = sort::sort(&refs, SortKey::ByReplications);
    assert_eq!(ids(&once), vec!["b", "d", "a", "c"]);
    let twice = sort::sort(&once, SortKey::ByReplications);
    assert_eq!(ids(&twice), ids(&once));
    // input untouched
    assert_eq!(ids(&refs), vec!["a", "b", "c", "d"]);
}

#[test]
fn sort_by_success_ratio_uses_unit_denominator_for_zero_replications() {
    let items = vec![
        item("perfect", "master", 10, 10, ""),
        item("zero-rep", "master", 0, 3, ""),
        item("half", "master", 4, 2, ""),
    ];
    let refs: Vec<&Item> = items.iter().collect();
    let out = sort::sort(&refs, SortKey::BySuccessRatio);
    // 3/1 outranks 10/10 even though the displayed ratio for zero-rep is 0%
    assert_eq!(ids(&out), vec!["zero-rep", "perfect", "half"]);
    assert_eq!(crate::metrics::success_percent(out[0]), 0);
    assert_eq!(ids(&sort::sort(&out, SortKey::BySuccessRatio)), ids(&out));
}

#[test]
fn sort_by_recency_puts_missing_timestamps_last() {
    let items = vec![
        item("none-1", "master", 0, 0, ""),
        item("old", "master", 0, 0, "2023-01-01T00:00:00Z"),
        item("new", "master", 0, 0, "2024-06-01T00:00:00Z"),
        item("none-2", "master", 0, 0, ""),
    ];
    let refs: Vec<&Item> = items.iter().collect();
    let out = sort::sort(&refs, SortKey::ByRecency);
    assert_eq!(ids(&out), vec!["new", "old", "none-1", "none-2"]);
    assert_eq!(ids(&sort::sort(&out, SortKey::ByRecency)), ids(&out));
}

#[test]
fn limit_applies_after_sort() {
    let items = vec![
        item("a", "master", 1, 0, ""),
        item("b", "master", 5, 0, ""),
        item("x", "elder", 100, 0, ""),
        item("c", "master", 9, 0, ""),
    ];
    let statuses = StatusSet::default();
    fn view(statuses: &StatusSet, limit: i64) -> ViewQuery<'_> {
        ViewQuery {
            statuses,
            query: "",
            sort: SortKey::ByReplications,
            limit,
        }
    }

    // capping before sorting would give [b, a]
    assert_eq!(ids(&pipeline::derive(&items, view(&statuses, 2))), vec!["c", "b"]);
    assert_eq!(pipeline::derive(&items, view(&statuses, 10)).len(), 3);
    assert_eq!(ids(&pipeline::derive(&items, view(&statuses, 0))), vec!["c", "b", "a"]);
    assert_eq!(pipeline::derive(&items, view(&statuses, -4)).len(), 3);
}

#[test]
fn end_to_end_example_order() {
    let items = vec![
        item("a", "master", 10, 8, ""),
        item("b", "grand", 0, 0, ""),
    ];
    let statuses = StatusSet::parse_csv("master,grand");
    let mut view = ViewQuery {
        statuses: &statuses,
        query: "",
        sort: SortKey::ByReplications,
        limit: 0,
    };
    assert_eq!(ids(&pipeline::derive(&items, view)), vec!["a", "b"]);

    view.sort = SortKey::BySuccessRatio;
    let out = pipeline::derive(&items, view);
    assert_eq!(ids(&out), vec!["a", "b"]);
    assert_eq!(crate::metrics::ratio(out[0]), 0.8);
    assert_eq!(crate::metrics::ratio(out[1]), 0.0);
}

#[test]
fn parse_limit_reads_leading_integer() {
    assert_eq!(parse_limit("0"), 0);
    assert_eq!(parse_limit("12"), 12);
    assert_eq!(parse_limit("  7 items"), 7);
    assert_eq!(parse_limit("-3"), -3);
    assert_eq!(parse_limit("abc"), 0);
    assert_eq!(parse_limit(""), 0);
    assert_eq!(parse_limit("99999999999999999999"), i64::MAX);
}

#[test]
fn board_config_defaults_and_fallbacks() {
    let cfg = BoardConfig::default();
    assert_eq!(cfg.source, "/sitemap.json");
    assert_eq!(cfg.status_filter, StatusSet::from_iter(["master", "grand"]));
    assert_eq!(cfg.sort, SortKey::ByReplications);
    assert_eq!(cfg.limit, 0);
    assert_eq!(cfg.contribution_address, None);

    let cfg = BoardConfig::from_settings(&BoardSettings {
        filter: Some(" Status: Grand ".to_string()),
        sort: Some("oldest".to_string()),
        limit: Some("lots".to_string()),
        xmr: Some(String::new()),
        ..Default::default()
    });
    assert_eq!(cfg.status_filter, StatusSet::from_iter(["grand"]));
    assert_eq!(cfg.sort, SortKey::ByRecency);
    assert_eq!(cfg.limit, 0);
    assert_eq!(cfg.contribution_address, None);

    let cfg = BoardConfig::from_settings(&BoardSettings {
        filter: Some("tier:gold".to_string()),
        ..Default::default()
    });
    assert_eq!(cfg.status_filter, StatusSet::default());

    let cfg = BoardConfig::from_settings(&BoardSettings {
        filter: Some("status:grand,".to_string()),
        ..Default::default()
    });
    assert_eq!(cfg.status_filter, StatusSet::from_iter(["grand", ""]));
}

#[test]
fn sort_tokens_match_exactly() {
    assert_eq!(SortKey::parse(" rep "), Some(SortKey::ByReplications));
    assert_eq!(SortKey::parse("sr"), Some(SortKey::BySuccessRatio));
    assert_eq!(SortKey::parse("new"), Some(SortKey::ByRecency));
    assert_eq!(SortKey::parse("REP"), None);
    assert_eq!(SortKey::parse("Sr"), None);

    let cfg = BoardConfig::from_settings(&BoardSettings {
        sort: Some("REP".to_string()),
        ..Default::default()
    });
    assert_eq!(cfg.sort, SortKey::ByRecency);
}

#[test]
fn unknown_sort_token_is_logged() {
    let logs = LogCapture::default();
    let cfg = logs.capture(|| {
        BoardConfig::from_settings(&BoardSettings {
            sort: Some("bogus".to_string()),
            ..Default::default()
        })
    });
    assert_eq!(cfg.sort, SortKey::ByRecency);
    let out = logs.contents();
    assert!(out.contains("WARN"));
    assert!(out.contains("unknown sort token"));
    assert!(out.contains("bogus"));
}

#[test]
fn missing_filter_marker_is_logged() {
    let logs = LogCapture::default();
    let cfg = logs.capture(|| {
        BoardConfig::from_settings(&BoardSettings {
            filter: Some("tier:gold".to_string()),
            ..Default::default()
        })
    });
    assert_eq!(cfg.status_filter, StatusSet::default());
    assert!(logs.contents().contains("filter spec without status marker"));
}

#[test]
fn render_item_escapes_every_field() {
    let evil = Item {
        id: Some("<id>".to_string()),
        title: Some("<script>alert('x')</script>".to_string()),
        status: Some("grand".to_string()),
        tags: vec!["\"quoted\"".to_string()],
        updated_at: Some("<t>".to_string()),
        heartbeat: Some("a & b".to_string()),
        actions: Some("<b>do</b>".to_string()),
        proof: Some("'p'".to_string()),
        ..Default::default()
    };
    let html = report::render_item(&evil, "<cta>", Some("<addr>"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    assert!(html.contains("<code>&lt;id&gt;</code>"));
    assert!(html.contains("#&quot;quoted&quot;"));
    assert!(html.contains("Updated: &lt;t&gt;"));
    assert!(html.contains("a &amp; b"));
    assert!(html.contains("&lt;b&gt;do&lt;/b&gt;"));
    assert!(html.contains("&#39;p&#39;"));
    assert!(html.contains("<em>&lt;cta&gt;</em>"));
    assert!(html.contains("XMR: <code>&lt;addr&gt;</code>"));
    assert!(html.contains(">Grandmaster<"));
}

#[test]
fn render_item_omits_absent_blocks() {
    let plain = Item {
        heartbeat: Some(String::new()),
        ..item("p", "Elder", 3, 2, "")
    };
    let html = report::render_item(&plain, "cta", None);
    assert!(!html.contains("divider\"></div><p>"));
    assert!(!html.contains("Actions"));
    assert!(!html.contains("Proof Plan"));
    assert!(!html.contains("XMR"));
    assert!(html.contains(">Master<"));
    assert!(html.contains("Updated: —"));
    assert!(html.contains("pill mid\">success ratio: 67%"));
}

#[test]
fn render_list_shows_empty_notice() {
    let html = report::render_list(&[], "cta", None);
    assert!(html.contains(report::EMPTY_NOTICE));
}

#[test]
fn failure_notice_names_escaped_source() {
    let html = report::render_failure("/bank.json?a=<b>");
    assert_eq!(
        html,
        r#"<div class="muted">Failed to load sitemap at <code>/bank.json?a=&lt;b&gt;</code></div>"#
    );
}

#[test]
fn pending_board_renders_placeholder_and_notice() {
    let board = Board::new(BoardConfig::default());
    assert!(matches!(board.load_state(), LoadState::Pending));
    let html = board.render();
    assert!(html.contains("Source fingerprint: <code>—</code>"));
    assert!(html.contains(report::EMPTY_NOTICE));
    assert!(html.contains(report::FOOTER_TAGLINE));
}

#[test]
fn dispatch_rederives_without_reload() {
    let mut board = loaded_board(
        BoardConfig::default(),
        vec![
            item("a", "master", 10, 8, "2024-01-01"),
            item("b", "grand", 3, 3, "2024-05-01"),
            item("c", "master", 1, 0, ""),
        ],
    );
    assert_eq!(ids(&board.view()), vec!["a", "b", "c"]);

    let list = board.dispatch(ViewEvent::Status(StatusSet::from_iter(["grand"])));
    assert!(list.contains("Title b"));
    assert!(!list.contains("Title a"));

    board.dispatch(ViewEvent::Status(StatusSet::default()));
    board.dispatch(ViewEvent::Sort(SortKey::ByRecency));
    assert_eq!(ids(&board.view()), vec!["b", "a", "c"]);

    let list = board.dispatch(ViewEvent::Search("  NOTHING  ".to_string()));
    assert_eq!(board.state().query, "nothing");
    assert!(list.contains(report::EMPTY_NOTICE));
    assert_eq!(board.fingerprint(), "fp-test");
}

#[test]
fn view_applies_configured_limit_before_and_after_events() {
    let config = BoardConfig {
        limit: 1,
        ..BoardConfig::default()
    };
    let mut board = loaded_board(
        config,
        vec![item("a", "master", 10, 1, ""), item("b", "master", 2, 2, "")],
    );
    assert_eq!(ids(&board.view()), vec!["a"]);
    board.dispatch(ViewEvent::Sort(SortKey::BySuccessRatio));
    assert_eq!(ids(&board.view()), vec!["b"]);
}

#[test]
fn new_dataset_keeps_view_state() {
    let mut board = loaded_board(BoardConfig::default(), vec![item("a", "master", 1, 1, "")]);
    board.dispatch(ViewEvent::Search("title b".to_string()));
    let state = board.state().clone();

    let ticket = board.begin_load();
    board.finish_load(
        ticket,
        Ok(dataset(vec![
            item("a", "master", 1, 1, ""),
            item("b", "master", 1, 1, ""),
        ])),
    );
    assert_eq!(board.state(), &state);
    assert_eq!(ids(&board.view()), vec!["b"]);
}

#[test]
fn stale_load_is_discarded() {
    let mut board = Board::new(BoardConfig::default());
    let first = board.begin_load();
    let second = board.begin_load();

    assert!(board.finish_load(second, Ok(dataset(vec![item("new", "master", 1, 1, "")]))));
    assert!(!board.finish_load(first, Ok(dataset(vec![item("old", "master", 1, 1, "")]))));
    assert_eq!(ids(&board.view()), vec!["new"]);
}

#[test]
fn failed_load_collapses_whole_view() {
    let mut board = loaded_board(BoardConfig::default(), vec![item("a", "master", 1, 1, "")]);
    let ticket = board.begin_load();
    board.finish_load(
        ticket,
        Err(LoadFailure::Status {
            locator: "/sitemap.json".to_string(),
            status: 500,
        }),
    );
    let html = board.render();
    assert_eq!(html, report::render_failure("/sitemap.json"));
    assert!(!html.contains("<header>"));
    assert!(board.view().is_empty());
    assert!(board.render_page().starts_with("<!DOCTYPE html>"));
}

#[test]
fn header_reflects_view_state() {
    let mut board = loaded_board(BoardConfig::default(), vec![]);
    board.dispatch(ViewEvent::Sort(SortKey::BySuccessRatio));
    board.dispatch(ViewEvent::Status(StatusSet::from_iter(["grand"])));
    board.dispatch(ViewEvent::Search("\"x\"".to_string()));
    let html = board.render();
    assert!(html.contains(r#"<option value="sr" selected>"#));
    assert!(html.contains(r#"<option value="grand" selected>"#));
    assert!(html.contains(r#"value="&quot;x&quot;""#));
}

#[test]
fn records_expose_structured_view_items() {
    let board = loaded_board(BoardConfig::default(), vec![item("a", "grand", 4, 3, "2024")]);
    let records = board.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].badge, "Grandmaster");
    assert_eq!(records[0].success_percent, 75);
    assert_eq!(records[0].updated.as_deref(), Some("2024"));
    let json: serde_json::Value =
        serde_json::from_slice(&crate::output::render_json(&records)).unwrap();
    assert_eq!(json[0]["band"], "mid");
}

#[test]
fn resolve_locators() {
    let plain = Loader::new(&LoaderOptions::default()).unwrap();
    assert!(matches!(
        plain.resolve("https://archive.example/sitemap.json").unwrap(),
        Locator::Remote(_)
    ));
    assert_eq!(
        plain.resolve("./bank.json").unwrap(),
        Locator::Local("./bank.json".into())
    );
    assert!(plain.resolve("   ").is_err());

    let based = Loader::new(&LoaderOptions {
        base_url: Some("https://archive.example/board/".to_string()),
        ..Default::default()
    })
    .unwrap();
    match based.resolve("/sitemap.json").unwrap() {
        Locator::Remote(url) => assert_eq!(url.as_str(), "https://archive.example/sitemap.json"),
        other => panic!("unexpected locator {other:?}"),
    }
}

#[tokio::test]
async fn load_from_local_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"bankFingerprint":"abc123","items":[{{"id":"a","status":"master","metrics":{{"replications":2,"success":1}}}}]}}"#
    )
    .unwrap();
    let loader = Loader::new(&LoaderOptions::default()).unwrap();
    let ds = loader.load(&file.path().display().to_string()).await.unwrap();
    assert_eq!(ds.bank_fingerprint, "abc123");
    assert_eq!(ds.items.len(), 1);
    assert_eq!(ds.items[0].metrics.replications, 2);
}

#[tokio::test]
async fn missing_or_malformed_file_is_a_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Loader::new(&LoaderOptions::default()).unwrap();

    let missing = dir.path().join("absent.json");
    assert!(matches!(
        loader.load(&missing.display().to_string()).await,
        Err(LoadFailure::Read { .. })
    ));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ nope").unwrap();
    assert!(matches!(
        loader.load(&bad.display().to_string()).await,
        Err(LoadFailure::Malformed { .. })
    ));
}

async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        let _ = sock.shutdown().await;
    });
    format!("http://{addr}/sitemap.json")
}

#[tokio::test]
async fn load_over_http() {
    let url = serve_once(
        "200 OK",
        r#"{"items":[{"id":"a","status":"grand"},{"id":"b","status":"master"}]}"#,
    )
    .await;
    let loader = Loader::new(&LoaderOptions::default()).unwrap();
    let ds = loader.load(&url).await.unwrap();
    assert_eq!(ds.bank_fingerprint, crate::model::FINGERPRINT_PLACEHOLDER);
    assert_eq!(ds.items.len(), 2);
}

#[tokio::test]
async fn non_success_status_is_a_load_failure() {
    let url = serve_once("404 Not Found", "").await;
    let loader = Loader::new(&LoaderOptions::default()).unwrap();
    match loader.load(&url).await {
        Err(LoadFailure::Status { status, locator }) => {
            assert_eq!(status, 404);
            assert_eq!(locator, url);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}
