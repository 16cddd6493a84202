use unicode_segmentation::UnicodeSegmentation;

const MAX_CHAR_LENGHT: usize = 256;
const FORBIDDEN_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecipientName(String);

impl RecipientName {
    pub fn parse(name: String) -> Result<RecipientName, String> {
        let name = name.trim().to_string();
        let is_empty = name.is_empty();
        let is_too_long = name.graphemes(true).count() > MAX_CHAR_LENGHT;
        let contains_forbidden_chars = name.chars().any(|char| FORBIDDEN_CHARS.contains(&char));

        if is_empty || is_too_long || contains_forbidden_chars {
            return Err(format!("{} is not a valid recipient name", name));
        }

        Ok(Self(name))
    }

    /// First whitespace separated word of the name.
    pub fn first_name(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or(&self.0)
    }
}

impl AsRef<str> for RecipientName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
