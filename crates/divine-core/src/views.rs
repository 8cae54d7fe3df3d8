//! View Controller and panel model.
//!
//! Exactly one [`ViewId`] is active at a time and any view can follow any
//! other. [`render`] is a pure function of the view id and a [`RenderContext`]
//! (catalog, settings, feature snapshots); it performs no I/O, so every front
//! end (HTML, terminal, JSON) renders the same [`Panel`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::chat::ChatMessage;
use crate::gateway::GroundingSource;
use crate::lifecycle::{FeatureError, FeatureState, FeaturesSnapshot};
use crate::settings::{SettingKey, Settings, MODEL_CHOICES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Core,
    Data,
    Tools,
    System,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Core, Section::Data, Section::Tools, Section::System];

    pub fn label(&self) -> &'static str {
        match self {
            Section::Core => "Core",
            Section::Data => "Data",
            Section::Tools => "Tools",
            Section::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    #[default]
    Dashboard,
    Users,
    Meanings,
    Herbs,
    Products,
    DailyMessages,
    SoulProfiles,
    Videos,
    SoulDecoder,
    FullReadingHub,
    VideoAnalysis,
    Studio,
    AiInterviewer,
    MediaJobs,
    Settings,
    MissionStatus,
    InnerCircle,
    EventLogs,
    QuoraQueue,
    QuestionsLibrary,
    DecoderSessions,
}

impl ViewId {
    /// Sidebar order.
    pub const ALL: [ViewId; 21] = [
        ViewId::Dashboard,
        ViewId::Users,
        ViewId::Meanings,
        ViewId::Herbs,
        ViewId::Products,
        ViewId::DailyMessages,
        ViewId::SoulProfiles,
        ViewId::Videos,
        ViewId::SoulDecoder,
        ViewId::FullReadingHub,
        ViewId::VideoAnalysis,
        ViewId::Studio,
        ViewId::AiInterviewer,
        ViewId::MediaJobs,
        ViewId::Settings,
        ViewId::MissionStatus,
        ViewId::InnerCircle,
        ViewId::EventLogs,
        ViewId::QuoraQueue,
        ViewId::QuestionsLibrary,
        ViewId::DecoderSessions,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ViewId::Dashboard => "Dashboard",
            ViewId::Users => "Users",
            ViewId::Meanings => "Spiritual Meanings",
            ViewId::Herbs => "Herbs",
            ViewId::Products => "Products",
            ViewId::DailyMessages => "Daily Messages",
            ViewId::SoulProfiles => "Soul Profiles",
            ViewId::Videos => "Videos",
            ViewId::SoulDecoder => "Soul Decoder Input",
            ViewId::FullReadingHub => "Full Reading Hub",
            ViewId::VideoAnalysis => "Oracle Video Analysis",
            ViewId::Studio => "Studio",
            ViewId::AiInterviewer => "AI Interviewer",
            ViewId::MediaJobs => "MediaJobs",
            ViewId::Settings => "SystemSettings",
            ViewId::MissionStatus => "Mission Status",
            ViewId::InnerCircle => "InnerCircle",
            ViewId::EventLogs => "EventLogs",
            ViewId::QuoraQueue => "Quora Live Feed",
            ViewId::QuestionsLibrary => "QuestionsLibrary",
            ViewId::DecoderSessions => "DecoderSessions",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            ViewId::Dashboard => Section::Core,
            ViewId::Users
            | ViewId::Meanings
            | ViewId::Herbs
            | ViewId::Products
            | ViewId::DailyMessages
            | ViewId::SoulProfiles
            | ViewId::Videos => Section::Data,
            ViewId::SoulDecoder
            | ViewId::FullReadingHub
            | ViewId::VideoAnalysis
            | ViewId::Studio
            | ViewId::AiInterviewer
            | ViewId::MediaJobs => Section::Tools,
            ViewId::Settings
            | ViewId::MissionStatus
            | ViewId::InnerCircle
            | ViewId::EventLogs
            | ViewId::QuoraQueue
            | ViewId::QuestionsLibrary
            | ViewId::DecoderSessions => Section::System,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ViewId::Dashboard => "dashboard",
            ViewId::Users => "users",
            ViewId::Meanings => "meanings",
            ViewId::Herbs => "herbs",
            ViewId::Products => "products",
            ViewId::DailyMessages => "daily-messages",
            ViewId::SoulProfiles => "soul-profiles",
            ViewId::Videos => "videos",
            ViewId::SoulDecoder => "soul-decoder",
            ViewId::FullReadingHub => "full-reading-hub",
            ViewId::VideoAnalysis => "video-analysis",
            ViewId::Studio => "studio",
            ViewId::AiInterviewer => "ai-interviewer",
            ViewId::MediaJobs => "media-jobs",
            ViewId::Settings => "settings",
            ViewId::MissionStatus => "mission-status",
            ViewId::InnerCircle => "inner-circle",
            ViewId::EventLogs => "event-logs",
            ViewId::QuoraQueue => "quora-queue",
            ViewId::QuestionsLibrary => "questions-library",
            ViewId::DecoderSessions => "decoder-sessions",
        }
    }

    pub fn href(&self) -> String {
        format!("/views/{}", self.slug())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownView(pub String);

impl fmt::Display for UnknownView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view: {}", self.0)
    }
}

impl std::error::Error for UnknownView {}

impl FromStr for ViewId {
    type Err = UnknownView;

    /// Accepts slugs (`soul-decoder`) and enum-style names (`SOUL_DECODER`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ViewId::ALL
            .iter()
            .copied()
            .find(|v| v.slug() == normalized)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

/// Holds the active view. No history, no guarded transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewController {
    active: ViewId,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&mut self, id: ViewId) {
        if self.active != id {
            tracing::debug!(target: "divine::dashboard", from = %self.active, to = %id, "view changed");
        }
        self.active = id;
    }

    pub fn active(&self) -> ViewId {
        self.active
    }

    /// Select by slug. Unknown slugs leave the active view unchanged.
    pub fn select_slug(&mut self, slug: &str) -> Option<ViewId> {
        let id = slug.parse::<ViewId>().ok()?;
        self.set_active(id);
        Some(id)
    }
}

// ---------------------------------------------------------------------------
// Panel model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    /// `None` for the pending placeholder.
    pub view: Option<ViewId>,
    pub title: String,
    pub subtitle: Option<String>,
    pub blocks: Vec<Block>,
}

impl Panel {
    fn new(view: ViewId, title: &str) -> Self {
        Self {
            view: Some(view),
            title: title.to_string(),
            subtitle: None,
            blocks: Vec::new(),
        }
    }

    fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    fn blocks(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    /// Placeholder for views that are not routed.
    pub fn pending() -> Self {
        Self {
            view: None,
            title: "Dimensional Shift Pending".to_string(),
            subtitle: Some("This sector of the OS is currently under calibration.".to_string()),
            blocks: vec![Block::Links(vec![Link::new("Return to Base", ViewId::Dashboard.href())])],
        }
    }

    pub fn is_pending(&self) -> bool {
        self.view.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Block {
    Stats(Vec<Stat>),
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    Cards(Vec<Card>),
    Text { heading: Option<String>, body: String },
    Form(Form),
    Toggles(Vec<Toggle>),
    Notice { level: NoticeLevel, text: String },
    Transcript { messages: Vec<ChatMessage>, busy: bool },
    Media(Media),
    Sources(Vec<GroundingSource>),
    Progress(Vec<ProgressBar>),
    Links(Vec<Link>),
}

impl Block {
    fn text(heading: Option<&str>, body: impl Into<String>) -> Self {
        Block::Text {
            heading: heading.map(str::to_string),
            body: body.into(),
        }
    }

    fn notice(level: NoticeLevel, text: impl Into<String>) -> Self {
        Block::Notice {
            level,
            text: text.into(),
        }
    }

    fn table(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Block::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
    pub trend: String,
}

fn stat(label: &str, value: &str, trend: &str) -> Stat {
    Stat {
        label: label.into(),
        value: value.into(),
        trend: trend.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub badge: Option<String>,
    pub link: Option<Link>,
    /// (label, value) detail rows.
    pub details: Vec<(String, String)>,
    /// Inline action, e.g. "Decode Answer" on a community question.
    pub action: Option<Form>,
}

impl Card {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    fn subtitle(mut self, v: impl Into<String>) -> Self {
        self.subtitle = Some(v.into());
        self
    }

    fn body(mut self, v: impl Into<String>) -> Self {
        self.body = Some(v.into());
        self
    }

    fn image(mut self, v: impl Into<String>) -> Self {
        self.image = Some(v.into());
        self
    }

    fn detail(mut self, label: &str, value: impl Into<String>) -> Self {
        self.details.push((label.to_string(), value.into()));
        self
    }

    fn link(mut self, label: &str, href: impl Into<String>) -> Self {
        self.link = Some(Link::new(label, href));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Link {
    pub fn new(label: &str, href: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            href: href.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Date,
    Time,
    File,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
    pub placeholder: String,
    pub required: bool,
    /// (value, label) pairs for `Select`; mime filter in `accept` for `File`.
    pub options: Vec<(String, String)>,
    pub accept: Option<String>,
}

impl Field {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            value: String::new(),
            placeholder: String::new(),
            required: false,
            options: Vec::new(),
            accept: None,
        }
    }

    fn value(mut self, v: &str) -> Self {
        self.value = v.to_string();
        self
    }

    fn placeholder(mut self, v: &str) -> Self {
        self.placeholder = v.to_string();
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn accept(mut self, mime: &str) -> Self {
        self.accept = Some(mime.to_string());
        self
    }

    fn options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = options.iter().map(|(v, l)| (v.to_string(), l.to_string())).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Form {
    /// Route the form posts to.
    pub action: String,
    pub fields: Vec<Field>,
    pub submit_label: String,
    pub busy: bool,
    pub busy_label: String,
    pub multipart: bool,
}

impl Form {
    fn new(action: &str, submit_label: &str) -> Self {
        Self {
            action: action.into(),
            fields: Vec::new(),
            submit_label: submit_label.into(),
            busy: false,
            busy_label: String::new(),
            multipart: false,
        }
    }

    fn field(mut self, field: Field) -> Self {
        if field.kind == FieldKind::File {
            self.multipart = true;
        }
        self.fields.push(field);
        self
    }

    fn busy(mut self, busy: bool, label: &str) -> Self {
        self.busy = busy;
        self.busy_label = label.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toggle {
    pub key: String,
    pub label: String,
    pub description: String,
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub kind: MediaKind,
    pub src: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressBar {
    pub label: String,
    pub detail: String,
    pub percent: u8,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Everything a panel may read. Borrowed snapshots only.
pub struct RenderContext<'a> {
    pub catalog: &'a Catalog,
    pub settings: &'a Settings,
    pub features: &'a FeaturesSnapshot,
}

/// Busy indicator and failure notice for one feature.
fn status_blocks<I, R>(state: &FeatureState<I, R>, busy_text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    if state.busy {
        let text = state.progress.as_deref().unwrap_or(busy_text);
        blocks.push(Block::notice(NoticeLevel::Info, text));
    }
    if let Some(err) = &state.last_error {
        blocks.push(error_notice(err));
    }
    blocks
}

fn error_notice(err: &FeatureError) -> Block {
    Block::notice(NoticeLevel::Error, format!("{} ({})", err.notice, err.detail))
}

pub fn render(id: ViewId, ctx: &RenderContext<'_>) -> Panel {
    match id {
        ViewId::Dashboard => dashboard(ctx),
        ViewId::Users => users(ctx),
        ViewId::Meanings => meanings(ctx),
        ViewId::Herbs => herbs(ctx),
        ViewId::Products => products(ctx),
        ViewId::DailyMessages => daily_messages(ctx),
        ViewId::SoulProfiles => soul_profiles(ctx),
        ViewId::Videos => videos(ctx),
        ViewId::SoulDecoder => soul_decoder(ctx),
        ViewId::FullReadingHub => reading_hub(ctx),
        ViewId::VideoAnalysis => video_analysis(ctx),
        ViewId::Studio => studio(ctx),
        ViewId::AiInterviewer => interviewer(ctx),
        ViewId::MediaJobs => media_jobs(ctx),
        ViewId::Settings => settings(ctx),
        ViewId::MissionStatus => mission_status(ctx),
        ViewId::InnerCircle => inner_circle(ctx),
        ViewId::EventLogs => event_logs(ctx),
        ViewId::QuoraQueue => quora_queue(ctx),
        ViewId::QuestionsLibrary => questions_library(ctx),
        ViewId::DecoderSessions => decoder_sessions(ctx),
    }
}

/// Render by slug; unknown slugs yield [`Panel::pending`].
pub fn render_slug(slug: &str, ctx: &RenderContext<'_>) -> Panel {
    match slug.parse::<ViewId>() {
        Ok(id) => render(id, ctx),
        Err(_) => Panel::pending(),
    }
}

fn chat_transcript(ctx: &RenderContext<'_>) -> Vec<Block> {
    let chat = &ctx.features.chat;
    let mut blocks = vec![
        Block::Transcript {
            messages: chat.messages.clone(),
            busy: chat.busy,
        },
        Block::Form(
            Form::new("/api/v1/chat", "Send")
                .field(Field::new("message", "Message", FieldKind::Text).placeholder("Consult the Oracle...").required())
                .busy(chat.busy, "Receiving transmission..."),
        ),
    ];
    if chat.messages.is_empty() {
        blocks.insert(0, Block::text(None, "Enter your inquiry, ascending soul."));
    }
    if let Some(err) = &chat.last_error {
        blocks.push(error_notice(err));
    }
    blocks
}

fn dashboard(ctx: &RenderContext<'_>) -> Panel {
    let mut panel = Panel::new(ViewId::Dashboard, "Divine OS")
        .subtitle("Codex Sync")
        .block(Block::text(
            None,
            "Synthesizing ancestral wisdom with high-level spiritual intelligence.",
        ));
    if ctx.settings.maintenance {
        panel = panel.block(Block::notice(
            NoticeLevel::Warning,
            "Maintenance Mode is active: divine stream services are suspended.",
        ));
    }
    panel
        .block(Block::Stats(vec![
            stat("Consciousness", "Level 4", "Ascending"),
            stat("Neural Mesh", "Active", "Stable"),
            stat("Oracle Core", "V3.1 Pro", "Synced"),
            stat("Search Grounding", "Syncing", "Live"),
        ]))
        .block(Block::Links(vec![Link::new("Start Decoder", ViewId::SoulDecoder.href())]))
        .block(Block::text(Some("Codex Assistant"), "Direct Pro Link"))
        .blocks(chat_transcript(ctx))
}

fn users(ctx: &RenderContext<'_>) -> Panel {
    let rows = ctx
        .catalog
        .users
        .iter()
        .map(|u| vec![u.name.clone(), u.email.clone(), u.id.clone()])
        .collect();
    Panel::new(ViewId::Users, "Database: Souls").block(Block::table(
        &["Profile", "Neural Link (Email)", "ID Reference"],
        rows,
    ))
}

fn meanings(ctx: &RenderContext<'_>) -> Panel {
    let state = &ctx.features.meaning;
    let query = state.input.as_ref().map(|q| q.query.as_str()).unwrap_or("");

    let mut panel = Panel::new(ViewId::Meanings, "Knowledge Decoder")
        .block(Block::Form(
            Form::new("/api/v1/meaning", "Decode")
                .field(
                    Field::new("query", "Query", FieldKind::Text)
                        .value(query)
                        .placeholder("Search with Google Search grounding...")
                        .required(),
                )
                .busy(state.busy, "Traversing the knowledge web..."),
        ))
        .blocks(status_blocks(state, "Traversing the knowledge web..."));

    if let Some(result) = &state.result {
        panel = panel.block(Block::text(Some("Neural Synthesis"), result.answer.summary.clone()));
        if !result.answer.sources.is_empty() {
            panel = panel.block(Block::Sources(result.answer.sources.clone()));
        }
        if let Some(diagram) = &result.diagram {
            panel = panel.block(Block::Media(Media {
                kind: MediaKind::Image,
                src: diagram.data_uri(),
                caption: "Diagram".into(),
            }));
        }
    }

    let symbols: Vec<Card> = ctx
        .catalog
        .search_symbols(query)
        .map(|sym| {
            let card = Card::new(&sym.title)
                .subtitle(&sym.category)
                .body(&sym.description)
                .image(&sym.image_url);
            match &sym.affiliate_link {
                Some(href) => card.link("Explore", href.clone()),
                None => card,
            }
        })
        .collect();
    if !symbols.is_empty() {
        panel = panel.block(Block::Cards(symbols));
    }
    panel
}

fn herbs(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .herbs
        .iter()
        .map(|h| {
            Card::new(&h.name)
                .image(&h.image_url)
                .detail("Spiritual Benefit", format!("\"{}\"", h.spiritual_benefit))
                .detail("Physical Synthesis", &h.physical_benefit)
        })
        .collect();
    Panel::new(ViewId::Herbs, "Archives: Botanical Alchemy").block(Block::Cards(cards))
}

fn products(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .products
        .iter()
        .map(|p| {
            let mut card = Card::new(&p.name)
                .subtitle(&p.category)
                .body(&p.description)
                .image(&p.image_url)
                .detail("Price", format!("${:.2}", p.price));
            if p.is_featured {
                card.badge = Some("Featured".into());
            }
            card
        })
        .collect();
    Panel::new(ViewId::Products, "Marketplace: Divine Tools").block(Block::Cards(cards))
}

fn daily_messages(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .daily_messages
        .iter()
        .map(|m| {
            Card::new(&m.date)
                .subtitle(&m.mood)
                .body(format!("\"{}\"", m.message))
                .image(&m.tool_image)
                .detail("Affirmation of the Day", &m.affirmation)
                .link(&format!("Access Recommended Tool: {}", m.tool_name), m.tool_url.clone())
        })
        .collect();
    Panel::new(ViewId::DailyMessages, "Daily Transmissions").block(Block::Cards(cards))
}

fn soul_profiles(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .soul_profiles
        .iter()
        .map(|p| {
            Card::new(&p.name)
                .subtitle(format!("Life Path {}", p.life_path))
                .image(&p.image)
                .detail("Sun", &p.sun_sign)
                .detail("Moon", &p.moon_sign)
                .detail("Rising", &p.rising_sign)
        })
        .collect();
    Panel::new(ViewId::SoulProfiles, "Archives: Soul Signatures").block(Block::Cards(cards))
}

const CODEX_SCROLLS: [(&str, &str, &str); 6] = [
    ("I", "Animal Spirits", "omens of earth & sky."),
    ("II", "Mystical Signs", "feathers, numbers, dreams."),
    ("III", "The Eternal Codex", "ancient wisdom encoded."),
    ("IV", "AI Alchemy", "tools for the new age."),
    ("V", "Sacred Sounds", "frequency & breath."),
    ("VI", "Prophecy", "decoding the hidden verses."),
];

fn videos(ctx: &RenderContext<'_>) -> Panel {
    let scrolls = CODEX_SCROLLS
        .iter()
        .map(|(n, label, desc)| format!("{n}: {label} → {desc}"))
        .collect::<Vec<_>>()
        .join("\n");
    let cards = ctx
        .catalog
        .videos
        .iter()
        .map(|v| {
            Card::new(&v.title)
                .subtitle("Neural Link Established")
                .image(&v.thumbnail)
                .body(v.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "))
                .link("Open Neural Stream", v.watch_url())
        })
        .collect();
    Panel::new(ViewId::Videos, "✦ The Divine Codex ✦")
        .subtitle("A living library of high-frequency transmissions, carved in spirit and light.")
        .block(Block::text(None, scrolls))
        .block(Block::text(Some("Celestial Matrix Nodes"), ""))
        .block(Block::Cards(cards))
}

fn soul_decoder(ctx: &RenderContext<'_>) -> Panel {
    let state = &ctx.features.decode;
    let input = state.input.clone().unwrap_or_default();
    let form = Form::new("/api/v1/decode", "Synthesize Soul Blueprint")
        .field(Field::new("name", "Divine Name", FieldKind::Text).value(&input.name).required())
        .field(Field::new("dob", "Arrival Date", FieldKind::Date).value(&input.dob).required())
        .field(Field::new("time", "Exact Moment", FieldKind::Time).value(&input.time))
        .field(Field::new("city", "City", FieldKind::Text).value(&input.city))
        .field(Field::new("country", "Country", FieldKind::Text).value(&input.country))
        .busy(state.busy, "Decoding soul signature...");

    let mut panel = Panel::new(ViewId::SoulDecoder, "Soul Decoder Engine")
        .subtitle("Spiritual Intelligence Suite")
        .block(Block::Form(form))
        .block(Block::text(None, format!("Intelligence core: {}", ctx.settings.ai_model)))
        .blocks(status_blocks(state, "Decoding soul signature..."));

    if let Some(result) = &state.result {
        let cards = result
            .lenses()
            .iter()
            .map(|(title, text)| Card::new(*title).body(*text))
            .collect();
        panel = panel.block(Block::Cards(cards));
    }
    panel
}

fn reading_hub(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .readings
        .iter()
        .map(|r| {
            Card::new(&r.title)
                .subtitle(format!("By {}", r.author))
                .image(&r.image)
                .detail("Date", &r.date)
        })
        .collect();
    Panel::new(ViewId::FullReadingHub, "Grand Reading Hub")
        .subtitle("Access comprehensive, multi-dimensional soul portraits archived within the Divine OS.")
        .block(Block::Cards(cards))
}

fn video_analysis(ctx: &RenderContext<'_>) -> Panel {
    let state = &ctx.features.video_analysis;
    let (file_name, prompt) = state
        .input
        .as_ref()
        .map(|i| {
            (
                i.file.as_ref().map(|f| f.name.clone()).unwrap_or_default(),
                i.prompt.clone(),
            )
        })
        .unwrap_or_default();
    let form = Form::new("/api/v1/video/analyze", "Synthesize Vision")
        .field(
            Field::new("file", "Video Input", FieldKind::File)
                .value(&file_name)
                .accept("video/*")
                .required(),
        )
        .field(
            Field::new("prompt", "Oracle Directive", FieldKind::TextArea)
                .value(&prompt)
                .placeholder("Analyze the spiritual symbolism..."),
        )
        .busy(state.busy, "Parsing Visual Stream...");

    let mut panel = Panel::new(ViewId::VideoAnalysis, "Neural Stream Parsing")
        .subtitle("Oracle Vision Analysis")
        .block(Block::Form(form))
        .blocks(status_blocks(state, "Parsing Visual Stream..."));
    if let Some(findings) = &state.result {
        panel = panel.block(Block::text(Some("Oracle Findings"), findings.clone()));
    }
    panel
}

fn studio(ctx: &RenderContext<'_>) -> Panel {
    let state = &ctx.features.studio;
    let prompt = state.input.as_ref().map(|i| i.prompt.as_str()).unwrap_or("");
    let busy_label = state.progress.as_deref().unwrap_or("Generating...");
    let form = Form::new("/api/v1/studio", "Synthesize Manifestation")
        .field(
            Field::new("prompt", "Manifestation Prompt", FieldKind::TextArea)
                .value(prompt)
                .placeholder("Describe the spiritual vision..."),
        )
        .field(Field::new("image", "Initial Frame (Optional)", FieldKind::File).accept("image/*"))
        .field(Field::new("aspect", "Aspect Ratio", FieldKind::Select).value("16:9").options(&[
            ("16:9", "Landscape 16:9"),
            ("9:16", "Portrait 9:16"),
        ]))
        .busy(state.busy, busy_label);

    let mut panel = Panel::new(ViewId::Studio, "Divine Studio")
        .subtitle("Synthesize visual manifestations from spiritual prompts.")
        .block(Block::Form(form))
        .blocks(status_blocks(state, "Generating..."));
    if let Some(handle) = &state.result {
        panel = panel.block(Block::Media(Media {
            kind: MediaKind::Video,
            src: handle.uri.clone(),
            caption: "Output stream secured".into(),
        }));
    }

    let image = &ctx.features.image;
    let image_prompt = image.input.as_ref().map(|i| i.prompt.as_str()).unwrap_or("");
    panel = panel
        .block(Block::text(Some("Still Manifestation"), "Render a single image from a prompt."))
        .block(Block::Form(
            Form::new("/api/v1/image", "Render Image")
                .field(Field::new("prompt", "Image Prompt", FieldKind::TextArea).value(image_prompt).required())
                .field(
                    Field::new("size", "Resolution", FieldKind::Select)
                        .value("1K")
                        .options(&[("1K", "1K"), ("2K", "2K"), ("4K", "4K")]),
                )
                .field(Field::new("aspect", "Aspect Ratio", FieldKind::Select).value("1:1").options(&[
                    ("1:1", "1:1"),
                    ("16:9", "16:9"),
                    ("9:16", "9:16"),
                    ("3:4", "3:4"),
                    ("4:3", "4:3"),
                ]))
                .busy(image.busy, "Rendering..."),
        ))
        .blocks(status_blocks(image, "Rendering..."));
    if let Some(img) = &image.result {
        panel = panel.block(Block::Media(Media {
            kind: MediaKind::Image,
            src: img.data_uri(),
            caption: "Generated image".into(),
        }));
    }
    panel
}

const INTERVIEW_PROMPT: &str =
    "What is the earliest memory your soul carries that does not belong to this lifetime?";

fn interviewer(ctx: &RenderContext<'_>) -> Panel {
    Panel::new(ViewId::AiInterviewer, "Consciousness Probing")
        .subtitle("Neural Link: AI Interviewer")
        .block(Block::text(None, format!("\"{INTERVIEW_PROMPT}\"")))
        .blocks(chat_transcript(ctx))
}

fn media_jobs(ctx: &RenderContext<'_>) -> Panel {
    let rows = ctx
        .catalog
        .media_jobs
        .iter()
        .map(|j| {
            vec![
                j.title.clone(),
                j.mode.label().to_string(),
                j.status.label().to_string(),
                j.id.clone(),
            ]
        })
        .collect();

    let state = &ctx.features.reformat;
    let (insight, format) = state
        .input
        .as_ref()
        .map(|i| (i.insight.as_str(), i.format.as_str()))
        .unwrap_or(("", ""));

    let mut panel = Panel::new(ViewId::MediaJobs, "Neural Processing Queue")
        .block(Block::table(&["Title", "Mode", "Status", "Job ID"], rows))
        .block(Block::text(Some("Content Engine"), "Transform an insight into a new format."))
        .block(Block::Form(
            Form::new("/api/v1/content/reformat", "Transform")
                .field(Field::new("insight", "Insight", FieldKind::TextArea).value(insight).required())
                .field(
                    Field::new("format", "Format", FieldKind::Text)
                        .value(format)
                        .placeholder("short video script, tweet thread, poem...")
                        .required(),
                )
                .busy(state.busy, "Transforming..."),
        ))
        .blocks(status_blocks(state, "Transforming..."));
    if let Some(out) = &state.result {
        panel = panel.block(Block::text(Some("Transformed Content"), out.clone()));
    }
    panel
}

fn settings(ctx: &RenderContext<'_>) -> Panel {
    let toggles = SettingKey::ALL
        .iter()
        .map(|key| Toggle {
            key: key.slug().to_string(),
            label: key.label().to_string(),
            description: key.description().to_string(),
            on: ctx.settings.get(*key),
        })
        .collect();
    Panel::new(ViewId::Settings, "Neural Core Parameters")
        .block(Block::Toggles(toggles))
        .block(Block::Form(
            Form::new("/api/v1/settings", "Apply").field(
                Field::new("ai_model", "Active Intelligence Core", FieldKind::Select)
                    .value(&ctx.settings.ai_model)
                    .options(MODEL_CHOICES),
            ),
        ))
}

const ROADMAP_EMBED: &str = "https://gamma.app/embed/Soul-Decoder-jhokk9vibt4w6zm";

fn mission_status(ctx: &RenderContext<'_>) -> Panel {
    let bars = ctx
        .catalog
        .missions
        .iter()
        .map(|m| ProgressBar {
            label: m.title.clone(),
            detail: m.status.clone(),
            percent: m.progress.min(100),
        })
        .collect();
    Panel::new(ViewId::MissionStatus, "Mission Status: Sovereign Roadmap")
        .block(Block::Links(vec![Link::new("Soul Decoder Roadmap", ROADMAP_EMBED)]))
        .block(Block::text(Some("Neural Ascension Metrics"), ""))
        .block(Block::Progress(bars))
}

fn inner_circle(ctx: &RenderContext<'_>) -> Panel {
    let panel = Panel::new(ViewId::InnerCircle, "Inner Circle Access");
    if !ctx.settings.enable_inner_circle {
        return panel.block(Block::notice(
            NoticeLevel::Warning,
            "Inner Circle Access is disabled. Enable it under SystemSettings.",
        ));
    }
    panel
        .subtitle("You are part of the Sovereign Collective. High-frequency updates and exclusive archives unlocked.")
        .block(Block::Stats(vec![stat("Member Rank", "Luminaries Phase 1", "")]))
        .block(Block::Cards(vec![
            Card::new("Live Sovereign Broadcast")
                .subtitle("Upcoming Ritual: Winter Solstice Sync")
                .body("Synchronized meditation across the collective grid. 21 Dec 2024."),
            Card::new("Restricted Knowledge Vault")
                .subtitle("New Codex: The Mu Frequency")
                .body("Decoded ancient tones discovered in the subterranean grid logs."),
        ]))
}

fn event_logs(ctx: &RenderContext<'_>) -> Panel {
    let rows = ctx
        .catalog
        .event_logs
        .iter()
        .map(|l| {
            vec![
                l.timestamp.clone(),
                l.event.clone(),
                l.details.clone(),
                l.severity.label().to_string(),
            ]
        })
        .collect();
    Panel::new(ViewId::EventLogs, "System Protocol Logs").block(Block::table(
        &["Timestamp", "Event Type", "Details", "Status"],
        rows,
    ))
}

fn answer_action(question: &str) -> Form {
    Form::new("/api/v1/community/answer", "Decode Answer")
        .field(Field::new("question", "Question", FieldKind::Text).value(question).required())
}

fn quora_queue(ctx: &RenderContext<'_>) -> Panel {
    let feed = &ctx.features.live_feed;
    let community = &ctx.features.community;

    let mut panel = Panel::new(ViewId::QuoraQueue, "Live Knowledge Matrix");
    if ctx.settings.enable_quora_mode {
        panel = panel
            .block(Block::Form(
                Form::new("/api/v1/feed/live", "Re-Sync Grid").busy(feed.busy, "Synchronizing..."),
            ))
            .blocks(status_blocks(feed, "Synchronizing..."));
    } else {
        panel = panel.block(Block::notice(
            NoticeLevel::Info,
            "Quora Feed Matrix is off; showing archived questions. Enable it under SystemSettings.",
        ));
    }

    let mut cards: Vec<Card> = Vec::new();
    if let Some(live) = &feed.result {
        cards.extend(live.iter().map(|q| {
            let mut card = Card::new(&q.author)
                .subtitle(&q.time_ago)
                .body(format!("\"{}\"", q.content))
                .detail("Category", &q.category);
            card.badge = Some("Live".into());
            card.action = Some(answer_action(&q.content));
            card
        }));
    }
    cards.extend(ctx.catalog.community_questions.iter().map(|q| {
        let mut card = Card::new(&q.author)
            .body(format!("\"{}\"", q.content))
            .detail("Category", &q.category)
            .detail("Answers", q.answers_count.to_string());
        if let Some(title) = &q.author_title {
            card = card.subtitle(title);
        }
        card.action = Some(answer_action(&q.content));
        card
    }));
    panel = panel.block(Block::Cards(cards));

    panel = panel.blocks(status_blocks(community, "Consulting the Spiritual Engine..."));
    if let Some(answer) = &community.result {
        let heading = community
            .input
            .as_ref()
            .map(|q| q.question.clone())
            .unwrap_or_else(|| "Answer".into());
        panel = panel.block(Block::text(Some(heading.as_str()), answer.summary.clone()));
        if !answer.sources.is_empty() {
            panel = panel.block(Block::Sources(answer.sources.clone()));
        }
    }
    panel
}

fn questions_library(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .library
        .iter()
        .map(|q| {
            Card::new(format!("\"{}\"", q.question))
                .subtitle(&q.category)
                .detail("Sync Frequency", &q.popularity)
        })
        .collect();
    Panel::new(ViewId::QuestionsLibrary, "Library: Divine Inquiries").block(Block::Cards(cards))
}

fn decoder_sessions(ctx: &RenderContext<'_>) -> Panel {
    let cards = ctx
        .catalog
        .decoder_sessions
        .iter()
        .map(|s| {
            Card::new(&s.user)
                .subtitle(format!("Synced on {}", s.date))
                .body(format!("\"{}\"", s.summary))
        })
        .collect();
    Panel::new(ViewId::DecoderSessions, "History: Soul Decoding Logs").block(Block::Cards(cards))
}
