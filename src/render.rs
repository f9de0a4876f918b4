//! Dashboard view model and HTML page rendering.

use serde::Serialize;

use crate::config::PageSettings;
use crate::format::{format_brl, format_datetime, format_int, format_text};
use crate::snapshot::Snapshot;

pub const UPDATED_AT_LABEL: &str = "Atualizado em :";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
}

impl MetricCard {
    fn new(label: &'static str, value: String) -> Self {
        Self { label, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Dashboard {
    Empty {
        warning: String,
    },
    Ready {
        updated_at: String,
        rows: Vec<Vec<MetricCard>>,
        footer: String,
    },
}

impl Dashboard {
    pub fn cards(&self) -> impl Iterator<Item = &MetricCard> {
        let rows: &[Vec<MetricCard>] = match self {
            Dashboard::Empty { .. } => &[],
            Dashboard::Ready { rows, .. } => rows.as_slice(),
        };
        rows.iter().flatten()
    }

    pub fn warnings(&self) -> Vec<&str> {
        match self {
            Dashboard::Empty { warning } => vec![warning.as_str()],
            Dashboard::Ready { .. } => Vec::new(),
        }
    }
}

pub fn build_dashboard(snapshot: Option<&Snapshot>, page: &PageSettings) -> Dashboard {
    let Some(snapshot) = snapshot else {
        return Dashboard::Empty {
            warning: format!("Nenhum dado encontrado na tabela {}.", page.table),
        };
    };
    let tz = page.timezone;

    let first_row = vec![
        MetricCard::new(
            "Status Campanhas",
            format_text(snapshot.campaign_status.as_ref()),
        ),
        MetricCard::new("Mailing (Qtde)", format_int(snapshot.mailing_count.as_ref())),
        MetricCard::new("Ticket Médio", format_brl(snapshot.average_ticket.as_ref())),
        MetricCard::new("Leads (Qtde)", format_int(snapshot.lead_count.as_ref())),
    ];
    let second_row = vec![
        MetricCard::new("Chamadas (Qtde)", format_int(snapshot.call_count.as_ref())),
        MetricCard::new(
            "Valor Consumido",
            format_brl(snapshot.consumed_value.as_ref()),
        ),
        MetricCard::new(
            "Último Lead (hora)",
            format_datetime(snapshot.last_lead_at.as_ref(), tz),
        ),
    ];

    Dashboard::Ready {
        updated_at: format_datetime(snapshot.created_at.as_ref(), tz),
        rows: vec![first_row, second_row],
        footer: refresh_caption(page.refresh_secs),
    }
}

pub fn refresh_caption(refresh_secs: u64) -> String {
    format!("Atualização a cada {refresh_secs}s")
}

pub fn render_page(dashboard: &Dashboard, page: &PageSettings) -> String {
    let body = match dashboard {
        Dashboard::Empty { warning } => {
            format!(
                r#"<div class="warning">⚠️ {}</div>"#,
                escape_html(warning)
            )
        }
        Dashboard::Ready {
            updated_at,
            rows,
            footer,
        } => {
            let mut out = String::new();
            out.push_str(&format!(
                r#"<div class="head"><div></div><div class="updated"><div class="updated-label">{}</div><div class="updated-value">{}</div></div></div>
<hr>
"#,
                escape_html(UPDATED_AT_LABEL),
                escape_html(updated_at)
            ));
            for row in rows {
                out.push_str(r#"<div class="cards">"#);
                for card in row {
                    out.push_str(&format!(
                        r#"<div class="card"><div class="card-label">{}</div><div class="card-value">{}</div></div>"#,
                        escape_html(card.label),
                        escape_html(&card.value)
                    ));
                }
                out.push_str("</div>\n");
            }
            out.push_str(&format!(
                r#"<p class="caption">{}</p>"#,
                escape_html(footer)
            ));
            out
        }
    };
    page_shell(page, &body)
}

/// Generic failure page; keeps the reload directive so the next cycle retries.
pub fn render_error_page(page: &PageSettings) -> String {
    page_shell(
        page,
        r#"<div class="error">Não foi possível carregar os dados agora. Nova tentativa na próxima atualização.</div>"#,
    )
}

fn page_shell(page: &PageSettings, body: &str) -> String {
    let title = escape_html(&page.title);
    format!(
        r#"<!doctype html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h3>{title}</h3>
{body}
</body>
</html>
"#,
        refresh = page.refresh_secs,
    )
}

const STYLE: &str = r#"
body{font-family:"Source Sans Pro",system-ui,sans-serif;margin:1.5rem 3rem;color:#31333f}
.head{display:grid;grid-template-columns:2fr 1fr;gap:1rem}
.updated{background:#eef6ff;border:1px solid #cfe5ff;padding:10px 12px;border-radius:10px;text-align:center}
.updated-label{font-size:12px;color:#355}
.updated-value{font-size:15px;font-weight:600}
hr{border:none;border-top:1px solid #e6e6ea;margin:1.25rem 0}
.cards{display:grid;grid-template-columns:repeat(4,1fr);gap:1rem;margin-bottom:1.5rem}
.card-label{font-size:14px}
.card-value{font-size:2.25rem;line-height:1.4}
.caption{font-size:14px;color:rgba(49,51,63,.6)}
.warning{background:#fffce7;color:#926c05;padding:16px;border-radius:8px}
.error{background:#ffecec;color:#7d353b;padding:16px;border-radius:8px}
"#;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
