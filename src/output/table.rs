use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::format::PLACEHOLDER;
use crate::render::{Dashboard, UPDATED_AT_LABEL};

pub fn render_dashboard_table(dashboard: &Dashboard) -> String {
    let Dashboard::Ready {
        updated_at,
        footer,
        ..
    } = dashboard
    else {
        return dashboard.warnings().join("\n");
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Indicador", "Valor"]);
    table.add_row(vec![UPDATED_AT_LABEL.trim_end_matches(" :"), updated_at.as_str()]);
    for card in dashboard.cards() {
        let value = if card.value == PLACEHOLDER {
            Cell::new(&card.value).fg(Color::DarkGrey)
        } else {
            Cell::new(&card.value)
        };
        table.add_row(vec![Cell::new(card.label), value]);
    }
    format!("{table}\n{footer}")
}
