use serde::Deserialize;

use crate::domain::recipient::Recipient;

/// Recipient list as uploaded: either CSV-like text or a JSON array.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RecipientsInput {
    Text(String),
    List(Vec<RecipientItem>),
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RecipientItem {
    Address(String),
    Record {
        #[serde(default)]
        name: Option<String>,
        email: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> ValidationError {
        ValidationError {
            message: message.into(),
        }
    }
}

/// One item of the uploaded list. Invalid items are kept so that they are
/// reported in the run instead of silently vanishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientEntry {
    Valid(Recipient),
    Invalid {
        input: String,
        error: ValidationError,
    },
}

impl RecipientEntry {
    /// Address used when reporting on this entry.
    pub fn address(&self) -> &str {
        match self {
            RecipientEntry::Valid(recipient) => recipient.email.as_ref(),
            RecipientEntry::Invalid { input, .. } => input,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecipientList {
    entries: Vec<RecipientEntry>,
}

impl RecipientList {
    /// Parses every item of the input, keeping the original order. Malformed
    /// items become `RecipientEntry::Invalid`; only an empty list is an error.
    pub fn load(input: RecipientsInput) -> Result<RecipientList, ValidationError> {
        let entries = match input {
            RecipientsInput::Text(text) => parse_text(&text),
            RecipientsInput::List(items) => items.into_iter().map(parse_item).collect(),
        };

        if entries.is_empty() {
            return Err(ValidationError::new("The recipient list is empty."));
        }

        Ok(RecipientList { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalid_entries(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.entries.iter().filter_map(|entry| match entry {
            RecipientEntry::Invalid { input, error } => Some((input.as_str(), error)),
            RecipientEntry::Valid(_) => None,
        })
    }

    pub fn into_entries(self) -> Vec<RecipientEntry> {
        self.entries
    }
}

fn parse_item(item: RecipientItem) -> RecipientEntry {
    let (input, parsed) = match item {
        RecipientItem::Address(email) => (email.clone(), Recipient::parse(None, email)),
        RecipientItem::Record { name, email } => {
            let input = match &name {
                Some(name) => format!("{} <{}>", name, email),
                None => email.clone(),
            };
            (input, Recipient::parse(name, email))
        }
    };

    into_entry(input, parsed)
}

fn parse_text(text: &str) -> Vec<RecipientEntry> {
    // Spreadsheet exports may start with a byte order mark.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .peekable();

    if lines.peek().map_or(false, |line| is_header(line)) {
        lines.next();
    }

    lines
        .map(|line| into_entry(line.to_string(), parse_line(line)))
        .collect()
}

fn into_entry(input: String, parsed: Result<Recipient, String>) -> RecipientEntry {
    match parsed {
        Ok(recipient) => RecipientEntry::Valid(recipient),
        Err(message) => RecipientEntry::Invalid {
            input,
            error: ValidationError::new(message),
        },
    }
}

fn is_header(line: &str) -> bool {
    let normalized: String = line
        .chars()
        .filter(|char| !char.is_whitespace() && *char != '"')
        .collect::<String>()
        .to_lowercase();

    normalized == "email" || normalized == "name,email"
}

// Accepts `email`, `name,email` and `Name <email>`.
fn parse_line(line: &str) -> Result<Recipient, String> {
    if let Some((name, rest)) = line.split_once('<') {
        let email = rest
            .trim_end()
            .strip_suffix('>')
            .ok_or_else(|| format!("{} has an unterminated address", line))?;

        return Recipient::parse(Some(unquote(name)), email.to_string());
    }

    match line.rsplit_once(',') {
        Some((name, email)) => Recipient::parse(Some(unquote(name)), unquote(email)),
        None => Recipient::parse(None, unquote(line)),
    }
}

fn unquote(field: &str) -> String {
    let field = field.trim();
    let field = field
        .strip_prefix('"')
        .and_then(|field| field.strip_suffix('"'))
        .unwrap_or(field);

    field.replace("\"\"", "\"")
}
