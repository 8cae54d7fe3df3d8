//! Catalog Store: the fixed, read-only sample dataset behind the list and table views.
//!
//! Built once at startup via [`Catalog::builtin`]; nothing here is ever mutated.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiritualSymbol {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Herb {
    pub id: String,
    pub name: String,
    pub spiritual_benefit: String,
    pub physical_benefit: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
    pub description: String,
    pub category: String,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMessage {
    pub id: String,
    pub date: String,
    pub message: String,
    pub affirmation: String,
    pub tool_name: String,
    pub tool_url: String,
    pub tool_image: String,
    pub mood: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoulProfile {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub sun_sign: String,
    pub moon_sign: String,
    pub rising_sign: String,
    pub life_path: u8,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaJobMode {
    ShortRunway,
    LongPictory,
}

impl MediaJobMode {
    pub fn label(&self) -> &'static str {
        match self {
            MediaJobMode::ShortRunway => "short runway",
            MediaJobMode::LongPictory => "long pictory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaJobStatus {
    Ready,
    Processing,
    Done,
}

impl MediaJobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MediaJobStatus::Ready => "ready",
            MediaJobStatus::Processing => "processing",
            MediaJobStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaJob {
    pub id: String,
    pub title: String,
    pub mode: MediaJobMode,
    pub script: String,
    pub status: MediaJobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub tags: Vec<String>,
}

impl Video {
    /// Link to open: the stored url, or the canonical watch url for the id.
    pub fn watch_url(&self) -> String {
        if self.url.is_empty() {
            format!("https://www.youtube.com/watch?v={}", self.id)
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityQuestion {
    pub id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_title: Option<String>,
    pub content: String,
    pub date: String,
    pub answers_count: u32,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStatus {
    pub id: String,
    pub title: String,
    pub status: String,
    pub progress: u8,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub id: String,
    pub timestamp: String,
    pub event: String,
    pub details: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryQuestion {
    pub id: String,
    pub question: String,
    pub category: String,
    pub popularity: String,
}

/// An archived full reading shown in the reading hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub title: String,
    pub author: String,
    pub date: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderSession {
    pub user: String,
    pub date: String,
    pub summary: String,
}

/// Every collection the dashboard can display.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub users: Vec<User>,
    pub symbols: Vec<SpiritualSymbol>,
    pub community_questions: Vec<CommunityQuestion>,
    pub herbs: Vec<Herb>,
    pub products: Vec<Product>,
    pub daily_messages: Vec<DailyMessage>,
    pub soul_profiles: Vec<SoulProfile>,
    pub media_jobs: Vec<MediaJob>,
    pub missions: Vec<MissionStatus>,
    pub event_logs: Vec<EventLog>,
    pub library: Vec<LibraryQuestion>,
    pub videos: Vec<Video>,
    pub readings: Vec<Reading>,
    pub decoder_sessions: Vec<DecoderSession>,
}

const UNSPLASH: &str = "https://images.unsplash.com";

fn unsplash(photo: &str, width: u32) -> String {
    format!("{UNSPLASH}/{photo}?auto=format&fit=crop&w={width}&q=80")
}

fn avatar(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

fn s(v: &str) -> String {
    v.to_string()
}

impl Catalog {
    /// The built-in sample dataset.
    pub fn builtin() -> Self {
        Self {
            users: vec![
                User {
                    id: s("1"),
                    name: s("Rarstar Thirteen El Bey"),
                    email: s("yb2obelbey@gmail.com"),
                    photo: avatar("Rarstar"),
                },
                User {
                    id: s("2"),
                    name: s("Leila Cloud"),
                    email: s("leila@example.com"),
                    photo: avatar("Leila"),
                },
            ],
            symbols: vec![
                symbol("1", "Archangel Michael", "Archangels", "Protection, courage, strength.", "photo-1519810755548-39cd217da494"),
                symbol("2", "Flying", "Dreams", "Spiritual ascension, freedom.", "photo-1464822759023-fed622ff2c3b"),
                symbol("3", "Wolf", "Spirit Animals", "Intuition, instinct, freedom.", "photo-1557050543-4d5f4e07ef46"),
                symbol("4", "Lavender", "Herbs", "Calming, cleansing.", "photo-1471922694854-ff1b63b20054"),
                symbol(
                    "5",
                    "Unlocking Spiritual Growth",
                    "Growth",
                    "Techniques and insights for consistent spiritual evolution.",
                    "photo-1490730141103-6cac27aaab94",
                ),
            ],
            community_questions: vec![
                CommunityQuestion {
                    id: s("q1"),
                    author: s("Rarstar Thirteen El Bey"),
                    author_title: None,
                    content: s("When I pass and my spirit leaves my body do I meet my guardian angel and recognise her or him first or do members of my family who have passed meet me firstly."),
                    date: s("Sat"),
                    answers_count: 3,
                    category: s("Life After Death"),
                },
                CommunityQuestion {
                    id: s("q2"),
                    author: s("Tessa Lynne"),
                    author_title: Some(s("Therapist and author")),
                    content: s("Has a soul ever finished its journey?"),
                    date: s("Fri"),
                    answers_count: 1,
                    category: s("Reincarnation"),
                },
            ],
            herbs: vec![
                Herb {
                    id: s("1"),
                    name: s("Lavender"),
                    spiritual_benefit: s("calms the mind and spirit, promotes peaceful sleep"),
                    physical_benefit: s("promotes relaxation, reduces anxiety and stress"),
                    image_url: unsplash("photo-1471922694854-ff1b63b20054", 400),
                },
                Herb {
                    id: s("2"),
                    name: s("Sage"),
                    spiritual_benefit: s("brings wisdom, clarity, and mental focus"),
                    physical_benefit: s("improves cognitive function, enhances wisdom"),
                    image_url: unsplash("photo-1627933924194-e0c204558e8b", 400),
                },
            ],
            products: vec![
                Product {
                    id: s("1"),
                    name: s("Essential Aura Healing"),
                    price: 19.99,
                    image_url: unsplash("photo-1506126613408-eca07ce68773", 400),
                    description: s("Complete guide to aura cleansing and energy protection."),
                    category: s("Meditation and Mindfulness"),
                    is_featured: true,
                },
                Product {
                    id: s("2"),
                    name: s("Moonlit Energy Grid"),
                    price: 14.99,
                    image_url: unsplash("photo-1534067783941-51c9c23ecefd", 400),
                    description: s("Crystal grid layout for manifesting lunar intentions."),
                    category: s("Spiritual growth"),
                    is_featured: true,
                },
            ],
            daily_messages: vec![DailyMessage {
                id: s("1"),
                date: s("5 November 2024"),
                message: s("You are on the path to enlightenment."),
                affirmation: s("I am a being of love and light."),
                tool_name: s("Aura Cleansing"),
                tool_url: s("#"),
                tool_image: unsplash("photo-1506126613408-eca07ce68773", 50),
                mood: s("Inspired"),
            }],
            soul_profiles: vec![SoulProfile {
                id: s("1"),
                name: s("Leila Cloud"),
                dob: s("1978-12-05"),
                sun_sign: s("Sagittarius"),
                moon_sign: s("Saturn"),
                rising_sign: s("Gemini"),
                life_path: 7,
                image: avatar("Leila"),
            }],
            media_jobs: vec![MediaJob {
                id: s("1"),
                title: s("Spiritual Meaning of Michael"),
                mode: MediaJobMode::ShortRunway,
                script: s("A short punchy line about Michael..."),
                status: MediaJobStatus::Ready,
            }],
            missions: vec![
                mission("1", "Awakening Phase", "Completed", 100, "Sparkles"),
                mission("2", "Chakra Alignment", "In Progress", 65, "Activity"),
                mission("3", "Ancestral Linkage", "Pending", 12, "Link"),
            ],
            event_logs: vec![
                EventLog {
                    id: s("e1"),
                    timestamp: s("2024-11-05 14:22"),
                    event: s("Neural Link Established"),
                    details: s("Core consciousness successfully synced with Divine OS."),
                    severity: Severity::Success,
                },
                EventLog {
                    id: s("e2"),
                    timestamp: s("2024-11-05 15:45"),
                    event: s("Soul Decoding Session"),
                    details: s("User Rarstar Thirteen requested a blueprint synthesis."),
                    severity: Severity::Info,
                },
                EventLog {
                    id: s("e3"),
                    timestamp: s("2024-11-05 16:10"),
                    event: s("External Feed Interruption"),
                    details: s("Quora Live Feed briefly lost sync with matrix."),
                    severity: Severity::Warning,
                },
            ],
            library: vec![
                library("ql1", "What is the significance of the number 13?", "Numerology", "High"),
                library("ql2", "How do I distinguish between a dream and a spiritual visit?", "Dreamwork", "Medium"),
                library("ql3", "Which herb is best for grounding after meditation?", "Herbalism", "High"),
            ],
            videos: vec![
                video(
                    "yeqgx7yaGEk",
                    "The Eternal Codex Archives",
                    "https://www.youtube.com/@TheEternalCodex",
                    "photo-1503177119275-0aa32b3a9368",
                    &["wisdom", "ancient", "sandscript", "tablets"],
                ),
                video(
                    "y0RiTN0_ovE",
                    "Weaving Wisdom Journeys",
                    "https://youtu.be/y0RiTN0_ovE",
                    "photo-1618336753974-aae8e04506aa",
                    &["spirituality", "sage", "yoda-wisdom"],
                ),
                video(
                    "lpJ5f5wbX4M",
                    "Spiritual Meanings Feed",
                    "https://www.youtube.com/@Spiritualmeanings67",
                    "photo-1506126613408-eca07ce68773",
                    &["meanings", "daily"],
                ),
                video(
                    "8KIgg6bfKfg",
                    "Magic AI Tools Alchemy",
                    "https://www.youtube.com/@MagicAITools-pr2ys/playlists",
                    "photo-1677442136019-21780ecad995",
                    &["ai", "digital-magic"],
                ),
            ],
            readings: vec![
                Reading {
                    title: s("The Architect Reading"),
                    author: s("Oracle V3.1"),
                    date: s("Oct 2024"),
                    image: unsplash("photo-1518531933037-91b2f5f229cc", 800),
                },
                Reading {
                    title: s("Ancestral Blueprint"),
                    author: s("Sage Alpha"),
                    date: s("Sep 2024"),
                    image: unsplash("photo-1519751138087-5bf79df62d5b", 800),
                },
            ],
            decoder_sessions: vec![
                DecoderSession {
                    user: s("Leila Cloud"),
                    date: s("5 Nov 2024"),
                    summary: s("Life Path 7 alignment, focuses on spiritual isolation and truth seeking."),
                },
                DecoderSession {
                    user: s("Rarstar Thirteen"),
                    date: s("3 Nov 2024"),
                    summary: s("Architect consciousness, manifesting high-tier collective OS modules."),
                },
            ],
        }
    }

    pub fn community_question(&self, id: &str) -> Option<&CommunityQuestion> {
        self.community_questions.iter().find(|q| q.id == id)
    }

    pub fn featured_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_featured)
    }

    /// Case-insensitive match against symbol title, category, and description.
    pub fn search_symbols<'a>(&'a self, term: &'a str) -> impl Iterator<Item = &'a SpiritualSymbol> {
        let needle = term.trim().to_lowercase();
        self.symbols.iter().filter(move |sym| {
            needle.is_empty()
                || sym.title.to_lowercase().contains(&needle)
                || sym.category.to_lowercase().contains(&needle)
                || sym.description.to_lowercase().contains(&needle)
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn symbol(id: &str, title: &str, category: &str, description: &str, photo: &str) -> SpiritualSymbol {
    SpiritualSymbol {
        id: s(id),
        title: s(title),
        category: s(category),
        description: s(description),
        image_url: unsplash(photo, 400),
        affiliate_link: None,
    }
}

fn mission(id: &str, title: &str, status: &str, progress: u8, icon: &str) -> MissionStatus {
    MissionStatus {
        id: s(id),
        title: s(title),
        status: s(status),
        progress,
        icon: s(icon),
    }
}

fn library(id: &str, question: &str, category: &str, popularity: &str) -> LibraryQuestion {
    LibraryQuestion {
        id: s(id),
        question: s(question),
        category: s(category),
        popularity: s(popularity),
    }
}

fn video(id: &str, title: &str, url: &str, photo: &str, tags: &[&str]) -> Video {
    Video {
        id: s(id),
        title: s(title),
        url: s(url),
        thumbnail: unsplash(photo, 800),
        tags: tags.iter().map(|t| s(t)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dataset_is_populated() {
        let c = Catalog::builtin();
        assert_eq!(c.users.len(), 2);
        assert_eq!(c.symbols.len(), 5);
        assert_eq!(c.videos.len(), 4);
        assert_eq!(c.readings.len(), 2);
        assert_eq!(c.decoder_sessions[0].user, "Leila Cloud");
        assert_eq!(c.missions.iter().map(|m| m.progress).max(), Some(100));
    }

    #[test]
    fn symbol_search_is_case_insensitive() {
        let c = Catalog::builtin();
        let hits: Vec<_> = c.search_symbols("WOLF").map(|s| s.id.as_str()).collect();
        assert_eq!(hits, vec!["3"]);
        assert_eq!(c.search_symbols("  ").count(), c.symbols.len());
    }

    #[test]
    fn community_question_lookup() {
        let c = Catalog::builtin();
        assert_eq!(c.community_question("q2").map(|q| q.answers_count), Some(1));
        assert!(c.community_question("nope").is_none());
    }

    #[test]
    fn media_job_labels_drop_underscores() {
        assert_eq!(MediaJobMode::ShortRunway.label(), "short runway");
        assert_eq!(MediaJobStatus::Ready.label(), "ready");
    }
}
