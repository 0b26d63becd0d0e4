use itertools::Itertools;

use super::escape::{escape_html, escape_opt};
use super::status_badge;
use crate::board::{BoardConfig, ViewState};
use crate::metrics;
use crate::model::Item;
use crate::pipeline::{SortKey, StatusSet};

pub const EMPTY_NOTICE: &str = "No items match the filter.";
pub const FOOTER_TAGLINE: &str = "“If this moved you, let it move through you.” — PRA";

const STATUS_OPTIONS: [(&str, &str); 3] = [
    ("master,grand", "Master + Grandmaster"),
    ("master", "Master only"),
    ("grand", "Grandmaster only"),
];

const CSS: &str = r#"
  body{margin:0; background:#0b0f13; font-family:Inter, system-ui, -apple-system, Segoe UI, Roboto, Arial}
  .wrap{max-width:960px; margin:0 auto; padding:22px 16px; color:#eaf3ff; background:#0b0f13}
  h1{margin:0 0 8px; font-weight:800}
  .muted{color:#9fb0c2}
  .row{display:flex; gap:8px; align-items:center; flex-wrap:wrap}
  input,select{all:unset; background:#0d1318; border:1px solid #24313c; color:#eaf3ff; padding:8px 10px; border-radius:10px}
  .pill{border:1px solid #26313b; padding:2px 8px; border-radius:999px; color:#9fb0c2; font-size:12px}
  .card{background:#10161d; border:1px solid #1b2230; border-radius:16px; padding:16px; margin:12px 0}
  .tag{background:#0a1218; border:1px solid #24323f; padding:4px 8px; border-radius:10px; color:#9fb6cc; margin-right:6px}
  .divider{height:1px; background:#1b2230; margin:12px 0}
  code{background:#0a1016; border:1px solid #1b2330; padding:2px 6px; border-radius:8px}
  .good{color:#7ae582} .mid{color:#ffd166} .bad{color:#ff6b6b}
  .grid{display:grid; grid-template-columns:1fr auto auto; gap:8px}
  @media (max-width:720px){ .grid{grid-template-columns:1fr} }
  .footer{margin-top:24px; padding:16px 0 36px; color:#9fb0c2}
"#;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn selected(on: bool) -> &'static str {
    if on {
        " selected"
    } else {
        ""
    }
}

/// One card. Every interpolated string goes through the escaper; optional
/// blocks are omitted entirely when their field is absent or empty.
pub fn render_item(item: &Item, call_to_action: &str, contribution_address: Option<&str>) -> String {
    let percent = metrics::success_percent(item);
    let band = metrics::band(item);
    let tags = item
        .tags
        .iter()
        .map(|t| format!(r#"<span class="tag">#{}</span>"#, escape_html(t)))
        .join(" ");

    let mut out = String::new();
    out.push_str("\n<article class=\"card\">\n");
    out.push_str(&format!(
        "  <div class=\"row\" style=\"justify-content:space-between\">\n    <h2 style=\"margin:0\">{}</h2>\n    <span class=\"pill\">{}</span>\n  </div>\n",
        escape_html(non_empty(item.title.as_deref()).unwrap_or("—")),
        escape_html(status_badge(item))
    ));
    out.push_str(&format!(
        "  <div class=\"muted\" style=\"margin-top:4px\">ID: <code>{}</code> • Updated: {}</div>\n",
        escape_opt(item.id.as_deref()),
        escape_html(item.display_timestamp().unwrap_or("—"))
    ));
    out.push_str(&format!("  <div style=\"margin-top:6px\">{tags}</div>\n"));
    if let Some(heartbeat) = non_empty(item.heartbeat.as_deref()) {
        out.push_str(&format!(
            "  <div class=\"divider\"></div><p>{}</p>\n",
            escape_html(heartbeat)
        ));
    }
    if let Some(actions) = non_empty(item.actions.as_deref()) {
        out.push_str(&format!(
            "  <h3 style=\"margin:10px 0 4px\">Actions</h3><pre style=\"white-space:pre-wrap\">{}</pre>\n",
            escape_html(actions)
        ));
    }
    if let Some(proof) = non_empty(item.proof.as_deref()) {
        out.push_str(&format!(
            "  <h3 style=\"margin:10px 0 4px\">Proof Plan</h3><p>{}</p>\n",
            escape_html(proof)
        ));
    }
    out.push_str(&format!(
        "  <div class=\"row\" style=\"gap:12px; margin-top:8px\">\n    <span class=\"pill\">replications: {}</span>\n    <span class=\"pill\">success: {}</span>\n    <span class=\"pill\">fail: {}</span>\n    <span class=\"pill {}\">success ratio: {}%</span>\n  </div>\n",
        item.metrics.replications,
        item.metrics.success,
        item.metrics.fail,
        band.css_class(),
        percent
    ));
    out.push_str("  <div class=\"divider\"></div>\n");
    out.push_str(&format!("  <p><em>{}</em></p>\n", escape_html(call_to_action)));
    if let Some(address) = non_empty(contribution_address) {
        out.push_str(&format!(
            "  <p class=\"muted\">XMR: <code>{}</code></p>\n",
            escape_html(address)
        ));
    }
    out.push_str("</article>\n");
    out
}

/// The list region: either the cards or the explicit empty-state notice.
pub fn render_list(items: &[&Item], call_to_action: &str, contribution_address: Option<&str>) -> String {
    if items.is_empty() {
        return format!(r#"<div class="muted" style="margin-top:12px">{EMPTY_NOTICE}</div>"#);
    }
    items
        .iter()
        .map(|item| render_item(item, call_to_action, contribution_address))
        .collect()
}

pub fn render_failure(source: &str) -> String {
    format!(
        r#"<div class="muted">Failed to load sitemap at <code>{}</code></div>"#,
        escape_html(source)
    )
}

fn render_sort_options(active: SortKey) -> String {
    SortKey::ALL
        .iter()
        .map(|key| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                key.token(),
                selected(*key == active),
                key.label()
            )
        })
        .join("\n      ")
}

fn render_status_options(active: &StatusSet) -> String {
    STATUS_OPTIONS
        .iter()
        .map(|(value, label)| {
            format!(
                r#"<option value="{value}"{}>{label}</option>"#,
                selected(StatusSet::parse_csv(value) == *active)
            )
        })
        .join("\n      ")
}

pub fn render_header(config: &BoardConfig, state: &ViewState, fingerprint: &str) -> String {
    format!(
        r#"<header>
  <h1>{title}</h1>
  <div class="muted">Source fingerprint: <code>{fingerprint}</code></div>
  <div class="grid" style="margin-top:8px">
    <input id="q" placeholder="Search title/tags/status…" value="{query}" />
    <select id="sort">
      {sort_options}
    </select>
    <select id="status">
      {status_options}
    </select>
  </div>
</header>"#,
        title = escape_html(&config.title),
        fingerprint = escape_html(fingerprint),
        query = escape_html(&state.query),
        sort_options = render_sort_options(state.sort),
        status_options = render_status_options(&state.statuses),
    )
}

/// Header, list region and footer, without the surrounding document.
pub fn render_board(config: &BoardConfig, state: &ViewState, fingerprint: &str, list: &str) -> String {
    format!(
        "{header}\n<div id=\"list\">{list}</div>\n<footer class=\"footer\">{footer}</footer>\n",
        header = render_header(config, state, fingerprint),
        footer = escape_html(FOOTER_TAGLINE),
    )
}

pub fn render_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{title}</title>
  <style>{CSS}</style>
</head>
<body>
<div class="wrap">
{body}
</div>
</body>
</html>
"#,
        title = escape_html(title),
    )
}
