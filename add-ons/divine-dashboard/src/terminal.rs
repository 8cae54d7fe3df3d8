//! Terminal rendering for `divine panel <slug>` and `divine views`.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use divine_core::views::{Block, NoticeLevel};
use divine_core::{Panel, Role, ViewId};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| {
            Cell::new(l)
                .set_alignment(CellAlignment::Center)
                .add_attribute(Attribute::Bold)
        })
        .collect()
}

/// Sidebar listing with the active view marked.
pub fn view_list(active: ViewId) -> String {
    let mut t = table();
    t.set_header(header(&["", "Section", "View", "Slug"]));
    for view in ViewId::ALL {
        let marker = if view == active {
            Cell::new("●").fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        t.add_row(vec![
            marker,
            Cell::new(view.section().label()),
            Cell::new(view.label()),
            Cell::new(view.slug()).fg(Color::DarkGrey),
        ]);
    }
    t.to_string()
}

pub fn panel(panel: &Panel) -> String {
    let mut out = format!("  ┌─ {} ─┐\n", panel.title.to_uppercase());
    if let Some(subtitle) = &panel.subtitle {
        out.push_str(&format!("  {subtitle}\n"));
    }
    out.push('\n');
    for block in &panel.blocks {
        if let Some(rendered) = block_text(block) {
            out.push_str(&rendered);
            out.push_str("\n\n");
        }
    }
    out
}

fn block_text(block: &Block) -> Option<String> {
    let rendered = match block {
        Block::Stats(stats) => {
            let mut t = table();
            t.set_header(header(&["Metric", "Value", "Trend"]));
            for s in stats {
                t.add_row(vec![
                    Cell::new(&s.label),
                    Cell::new(&s.value).set_alignment(CellAlignment::Right).fg(Color::Yellow),
                    Cell::new(&s.trend),
                ]);
            }
            t.to_string()
        }
        Block::Table { headers, rows } => {
            let mut t = table();
            let labels: Vec<&str> = headers.iter().map(String::as_str).collect();
            t.set_header(header(&labels));
            for row in rows {
                t.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
            }
            t.to_string()
        }
        Block::Cards(cards) => {
            let mut t = table();
            t.set_header(header(&["Title", "Detail", "Summary"]));
            for card in cards {
                let mut detail = card.subtitle.clone().unwrap_or_default();
                for (label, value) in &card.details {
                    detail.push_str(&format!("\n{label}: {value}"));
                }
                if let Some(badge) = &card.badge {
                    detail.push_str(&format!("\n[{badge}]"));
                }
                t.add_row(vec![
                    Cell::new(&card.title).add_attribute(Attribute::Bold),
                    Cell::new(detail.trim()),
                    Cell::new(card.body.as_deref().unwrap_or("")),
                ]);
            }
            t.to_string()
        }
        Block::Text { heading, body } => match heading {
            Some(h) if body.is_empty() => format!("  {}", h.to_uppercase()),
            Some(h) => format!("  {}\n{}", h.to_uppercase(), body),
            None => body.clone(),
        },
        Block::Form(form) => {
            let fields: Vec<&str> = form.fields.iter().map(|f| f.label.as_str()).collect();
            let status = if form.busy { form.busy_label.as_str() } else { "ready" };
            format!("  [{}] POST {} ({}) · {}", form.submit_label, form.action, fields.join(", "), status)
        }
        Block::Toggles(toggles) => {
            let mut t = table();
            t.set_header(header(&["Setting", "State", "Description"]));
            for toggle in toggles {
                let state = if toggle.on {
                    Cell::new("● ON").fg(Color::Green)
                } else {
                    Cell::new("○ OFF").fg(Color::DarkGrey)
                };
                t.add_row(vec![Cell::new(&toggle.label), state, Cell::new(&toggle.description)]);
            }
            t.to_string()
        }
        Block::Notice { level, text } => {
            let tag = match level {
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            format!("  ! [{tag}] {text}")
        }
        Block::Transcript { messages, busy } => {
            let mut lines: Vec<String> = messages
                .iter()
                .map(|m| match m.role {
                    Role::User => format!("  you ▸ {}", m.text),
                    Role::Model => format!("  oracle ▸ {}", m.text),
                })
                .collect();
            if *busy {
                lines.push("  oracle is channeling...".to_string());
            }
            if lines.is_empty() {
                return None;
            }
            lines.join("\n")
        }
        Block::Media(media) => format!("  media: {} ({})", media.caption, media.src),
        Block::Sources(sources) => sources
            .iter()
            .map(|s| format!("  ↗ {} <{}>", s.title, s.uri))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Progress(bars) => {
            let mut t = table();
            t.set_header(header(&["Mission", "Status", "Progress"]));
            for bar in bars {
                let filled = usize::from(bar.percent / 5);
                t.add_row(vec![
                    Cell::new(&bar.label),
                    Cell::new(&bar.detail),
                    Cell::new(format!("{}{} {}%", "█".repeat(filled), "░".repeat(20 - filled), bar.percent)),
                ]);
            }
            t.to_string()
        }
        Block::Links(links) => links
            .iter()
            .map(|l| format!("  → {} ({})", l.label, l.href))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_list_has_a_row_per_view() {
        let out = view_list(ViewId::Settings);
        for view in ViewId::ALL {
            assert!(out.contains(view.slug()));
        }
        assert!(out.contains('●'));
    }

    #[test]
    fn pending_panel_renders_return_link() {
        let out = panel(&Panel::pending());
        assert!(out.contains("DIMENSIONAL SHIFT PENDING"));
        assert!(out.contains("Return to Base"));
    }
}
