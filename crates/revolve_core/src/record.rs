use serde::Deserialize;
use session_logging::session_warn;

/// Longest slice of an offending line kept in a diagnostic entry.
const DIAGNOSTIC_PREVIEW_CHARS: usize = 200;

/// Name attached to log entries produced for lines that could not be classified.
pub const MALFORMED_RECORD_NAME: &str = "malformed record";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    System,
    Workflow,
    Notification,
    Done,
    Error,
    Malformed,
}

/// A framed record after parsing and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub category: Category,
    pub name: Option<String>,
    pub text: Option<String>,
}

impl Message {
    pub fn new(category: Category, name: Option<String>, text: Option<String>) -> Self {
        Self {
            category,
            name,
            text,
        }
    }

    pub fn malformed(diagnostic: impl Into<String>) -> Self {
        Self {
            category: Category::Malformed,
            name: Some(MALFORMED_RECORD_NAME.to_string()),
            text: Some(diagnostic.into()),
        }
    }
}

/// One wire record, keyed by whichever discriminant field it carries.
///
/// The backend speaks two protocol generations: the older one tags every
/// record with `status`, the newer one with `level`. A record carrying both
/// is treated as a `status` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireRecord {
    Status {
        status: String,
        name: Option<String>,
        text: Option<String>,
    },
    Level {
        level: String,
        name: Option<String>,
        text: Option<String>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("record carries neither `status` nor `level`")]
    MissingDiscriminant,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    status: Option<String>,
    level: Option<String>,
    name: Option<String>,
    text: Option<String>,
}

impl WireRecord {
    pub fn parse(line: &str) -> Result<Self, MalformedRecord> {
        let raw: RawRecord = serde_json::from_str(line)
            .map_err(|err| MalformedRecord::InvalidJson(err.to_string()))?;

        match (raw.status, raw.level) {
            (Some(status), _) => Ok(WireRecord::Status {
                status,
                name: raw.name,
                text: raw.text,
            }),
            (None, Some(level)) => Ok(WireRecord::Level {
                level,
                name: raw.name,
                text: raw.text,
            }),
            (None, None) => Err(MalformedRecord::MissingDiscriminant),
        }
    }
}

/// Maps a parsed record onto its message category.
///
/// Unknown discriminant values classify as [`Category::Malformed`].
pub fn classify(record: WireRecord) -> Message {
    match record {
        WireRecord::Status { status, name, text } => match status.as_str() {
            "processing" => Message::new(Category::System, name, text),
            "done" => Message::new(Category::Done, name, text),
            "error" => Message::new(Category::Error, name, text),
            other => unknown_discriminant("status", other),
        },
        WireRecord::Level { level, name, text } => match level.as_str() {
            "system" => Message::new(Category::System, name, text),
            "workflow" => Message::new(Category::Workflow, name, text),
            "notification" => Message::new(Category::Notification, name, text),
            other => unknown_discriminant("level", other),
        },
    }
}

/// Parses and classifies one framed line. Never fails.
pub fn parse_record(line: &str) -> Message {
    match WireRecord::parse(line) {
        Ok(record) => classify(record),
        Err(err) => {
            let preview = preview(line);
            session_warn!("Dropping malformed record ({}): {}", err, preview);
            Message::malformed(format!("{err}; line: {preview}"))
        }
    }
}

fn unknown_discriminant(field: &str, value: &str) -> Message {
    session_warn!("Unknown {} value {:?}; record ignored", field, value);
    Message::malformed(format!("unknown {field} `{value}`"))
}

fn preview(line: &str) -> String {
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(DIAGNOSTIC_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
