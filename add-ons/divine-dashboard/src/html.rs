//! Server-side HTML for panels. Every dynamic string goes through [`escape`].

use divine_core::views::{Block, Card, Field, FieldKind, Form, MediaKind, NoticeLevel, Section};
use divine_core::{ChatMessage, Panel, Role, ViewId};

const STYLE: &str = r#"
body { margin: 0; display: flex; min-height: 100vh; font-family: system-ui, sans-serif; background: #0b0716; color: #e9e4f5; }
nav { width: 240px; background: #140d26; padding: 1.5rem 1rem; border-right: 1px solid #2b1f4a; }
nav h1 { font-size: 1.1rem; color: #f4c95d; letter-spacing: .08em; text-transform: uppercase; }
nav h2 { font-size: .7rem; color: #8b7fb0; text-transform: uppercase; margin: 1.2rem 0 .4rem; }
nav a { display: block; padding: .35rem .6rem; border-radius: .4rem; color: #cfc6ea; text-decoration: none; font-size: .9rem; }
nav a.active { background: #f4c95d; color: #140d26; font-weight: 600; }
main { flex: 1; padding: 2rem 2.5rem; max-width: 1100px; }
main h2 { margin: 0; font-size: 1.8rem; }
.subtitle { color: #8b7fb0; margin-top: .3rem; }
.block { margin-top: 1.5rem; }
.stats, .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 1rem; }
.stat, .card { background: #140d26; border: 1px solid #2b1f4a; border-radius: .8rem; padding: 1rem; }
.stat .value { font-size: 1.6rem; color: #f4c95d; font-weight: 700; }
.stat .trend, .card .sub { color: #8b7fb0; font-size: .8rem; }
.card img { width: 100%; border-radius: .5rem; }
.badge { display: inline-block; background: #f4c95d; color: #140d26; font-size: .7rem; padding: .1rem .5rem; border-radius: 1rem; }
.text { white-space: pre-wrap; line-height: 1.5; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: .5rem; border-bottom: 1px solid #2b1f4a; }
th { color: #f4c95d; }
form { display: grid; gap: .6rem; background: #140d26; padding: 1rem; border-radius: .8rem; }
input, textarea, select { background: #0b0716; color: inherit; border: 1px solid #2b1f4a; border-radius: .4rem; padding: .5rem; }
button { background: #f4c95d; color: #140d26; border: 0; border-radius: .4rem; padding: .55rem 1rem; font-weight: 600; cursor: pointer; }
button[disabled] { opacity: .5; cursor: wait; }
.notice { padding: .8rem 1rem; border-radius: .6rem; }
.notice-info { background: #1d2a4a; }
.notice-warning { background: #4a3b12; }
.notice-error { background: #4a1420; }
#transcript { display: flex; flex-direction: column; gap: .5rem; max-height: 420px; overflow-y: auto; }
.msg { padding: .6rem .9rem; border-radius: .8rem; max-width: 80%; white-space: pre-wrap; }
.msg-user { align-self: flex-end; background: #2b1f4a; }
.msg-model { align-self: flex-start; background: #140d26; border: 1px solid #2b1f4a; }
.bar { height: .5rem; background: #2b1f4a; border-radius: 1rem; overflow: hidden; }
.bar span { display: block; height: 100%; background: #f4c95d; }
.toggle { display: flex; justify-content: space-between; align-items: center; }
"#;

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Full page: sidebar grouped by section plus the rendered panel.
pub fn page(app_name: &str, active: ViewId, panel: &Panel) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · {app}</title>
<style>{style}</style>
</head>
<body>
{nav}
<main>{panel}</main>
<script src="/static/divine.js"></script>
</body>
</html>"#,
        title = escape(&panel.title),
        app = escape(app_name),
        style = STYLE,
        nav = sidebar(app_name, active),
        panel = panel_html(panel),
    )
}

fn sidebar(app_name: &str, active: ViewId) -> String {
    let mut out = format!("<nav><h1>{}</h1>", escape(app_name));
    for section in Section::ALL {
        out.push_str(&format!("<h2>{}</h2>", escape(section.label())));
        for view in ViewId::ALL.iter().filter(|v| v.section() == section) {
            let class = if *view == active { r#" class="active""# } else { "" };
            out.push_str(&format!(
                r#"<a href="{}"{}>{}</a>"#,
                escape(&view.href()),
                class,
                escape(view.label())
            ));
        }
    }
    out.push_str("</nav>");
    out
}

pub fn panel_html(panel: &Panel) -> String {
    let mut out = format!("<h2>{}</h2>", escape(&panel.title));
    if let Some(subtitle) = &panel.subtitle {
        out.push_str(&format!(r#"<p class="subtitle">{}</p>"#, escape(subtitle)));
    }
    for block in &panel.blocks {
        out.push_str(r#"<section class="block">"#);
        out.push_str(&block_html(block));
        out.push_str("</section>");
    }
    out
}

fn block_html(block: &Block) -> String {
    match block {
        Block::Stats(stats) => {
            let items: String = stats
                .iter()
                .map(|s| {
                    format!(
                        r#"<div class="stat"><div class="sub">{}</div><div class="value">{}</div><div class="trend">{}</div></div>"#,
                        escape(&s.label),
                        escape(&s.value),
                        escape(&s.trend)
                    )
                })
                .collect();
            format!(r#"<div class="stats">{items}</div>"#)
        }
        Block::Table { headers, rows } => {
            let head: String = headers.iter().map(|h| format!("<th>{}</th>", escape(h))).collect();
            let body: String = rows
                .iter()
                .map(|row| {
                    let cells: String = row.iter().map(|c| format!("<td>{}</td>", escape(c))).collect();
                    format!("<tr>{cells}</tr>")
                })
                .collect();
            format!("<table><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>")
        }
        Block::Cards(cards) => {
            let items: String = cards.iter().map(card_html).collect();
            format!(r#"<div class="cards">{items}</div>"#)
        }
        Block::Text { heading, body } => {
            let heading = heading
                .as_deref()
                .map(|h| format!("<h3>{}</h3>", escape(h)))
                .unwrap_or_default();
            format!(r#"{heading}<div class="text">{}</div>"#, escape(body))
        }
        Block::Form(form) => form_html(form),
        Block::Toggles(toggles) => toggles
            .iter()
            .map(|t| {
                format!(
                    r#"<form class="toggle" method="post" action="/api/v1/settings" data-api><div><strong>{}</strong><div class="sub">{}</div></div><input type="hidden" name="toggle" value="{}"><button type="submit">{}</button></form>"#,
                    escape(&t.label),
                    escape(&t.description),
                    escape(&t.key),
                    if t.on { "ON" } else { "OFF" }
                )
            })
            .collect(),
        Block::Notice { level, text } => {
            let class = match level {
                NoticeLevel::Info => "notice-info",
                NoticeLevel::Warning => "notice-warning",
                NoticeLevel::Error => "notice-error",
            };
            format!(r#"<div class="notice {class}">{}</div>"#, escape(text))
        }
        Block::Transcript { messages, busy } => transcript_html(messages, *busy),
        Block::Media(media) => {
            let tag = match media.kind {
                MediaKind::Image => format!(r#"<img src="{}" alt="{}">"#, escape(&media.src), escape(&media.caption)),
                MediaKind::Video => format!(r#"<video src="{}" controls loop></video>"#, escape(&media.src)),
            };
            format!("<figure>{tag}<figcaption>{}</figcaption></figure>", escape(&media.caption))
        }
        Block::Sources(sources) => {
            let items: String = sources
                .iter()
                .map(|s| {
                    format!(
                        r#"<li><a href="{}" target="_blank" rel="noopener">{}</a></li>"#,
                        escape(&s.uri),
                        escape(&s.title)
                    )
                })
                .collect();
            format!("<h3>Sources</h3><ul>{items}</ul>")
        }
        Block::Progress(bars) => bars
            .iter()
            .map(|b| {
                format!(
                    r#"<div><div class="toggle"><span>{}</span><span class="sub">{} · {}%</span></div><div class="bar"><span style="width: {}%"></span></div></div>"#,
                    escape(&b.label),
                    escape(&b.detail),
                    b.percent,
                    b.percent
                )
            })
            .collect(),
        Block::Links(links) => links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a> "#, escape(&l.href), escape(&l.label)))
            .collect(),
    }
}

fn card_html(card: &Card) -> String {
    let mut out = String::from(r#"<div class="card">"#);
    if let Some(image) = &card.image {
        out.push_str(&format!(r#"<img src="{}" alt="">"#, escape(image)));
    }
    if let Some(badge) = &card.badge {
        out.push_str(&format!(r#"<span class="badge">{}</span>"#, escape(badge)));
    }
    out.push_str(&format!("<h3>{}</h3>", escape(&card.title)));
    if let Some(sub) = &card.subtitle {
        out.push_str(&format!(r#"<div class="sub">{}</div>"#, escape(sub)));
    }
    if let Some(body) = &card.body {
        out.push_str(&format!(r#"<p class="text">{}</p>"#, escape(body)));
    }
    if !card.details.is_empty() {
        out.push_str("<dl>");
        for (label, value) in &card.details {
            out.push_str(&format!("<dt>{}</dt><dd>{}</dd>", escape(label), escape(value)));
        }
        out.push_str("</dl>");
    }
    if let Some(link) = &card.link {
        out.push_str(&format!(
            r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
            escape(&link.href),
            escape(&link.label)
        ));
    }
    if let Some(action) = &card.action {
        out.push_str(&form_html(action));
    }
    out.push_str("</div>");
    out
}

fn form_html(form: &Form) -> String {
    let mut attrs = String::from(" data-api");
    if form.multipart {
        attrs.push_str(r#" data-multipart enctype="multipart/form-data""#);
    }
    if form.action.ends_with("/chat") {
        attrs.push_str(" data-stream");
    }
    if form.busy {
        attrs.push_str(" data-busy");
    }

    let fields: String = form.fields.iter().map(field_html).collect();
    let (label, disabled) = if form.busy {
        (form.busy_label.as_str(), " disabled")
    } else {
        (form.submit_label.as_str(), "")
    };
    format!(
        r#"<form method="post" action="{}"{attrs}>{fields}<button type="submit"{disabled}>{}</button></form>"#,
        escape(&form.action),
        escape(label)
    )
}

fn field_html(field: &Field) -> String {
    let name = escape(&field.name);
    let required = if field.required { " required" } else { "" };
    let placeholder = escape(&field.placeholder);
    let control = match field.kind {
        FieldKind::TextArea => format!(
            r#"<textarea name="{name}" rows="4" placeholder="{placeholder}"{required}>{}</textarea>"#,
            escape(&field.value)
        ),
        FieldKind::Select => {
            let options: String = field
                .options
                .iter()
                .map(|(value, label)| {
                    let selected = if *value == field.value { " selected" } else { "" };
                    format!(r#"<option value="{}"{selected}>{}</option>"#, escape(value), escape(label))
                })
                .collect();
            format!(r#"<select name="{name}">{options}</select>"#)
        }
        FieldKind::File => {
            let accept = field
                .accept
                .as_deref()
                .map(|a| format!(r#" accept="{}""#, escape(a)))
                .unwrap_or_default();
            format!(r#"<input type="file" name="{name}"{accept}{required}>"#)
        }
        FieldKind::Text | FieldKind::Date | FieldKind::Time => {
            let kind = match field.kind {
                FieldKind::Date => "date",
                FieldKind::Time => "time",
                _ => "text",
            };
            format!(
                r#"<input type="{kind}" name="{name}" value="{}" placeholder="{placeholder}"{required}>"#,
                escape(&field.value)
            )
        }
    };
    format!("<label>{}{control}</label>", escape(&field.label))
}

fn transcript_html(messages: &[ChatMessage], busy: bool) -> String {
    let items: String = messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Model => "model",
            };
            format!(r#"<div class="msg msg-{role}">{}</div>"#, escape(&m.text))
        })
        .collect();
    let busy = if busy { " data-busy" } else { "" };
    format!(r#"<div id="transcript"{busy}>{items}</div>"#)
}
