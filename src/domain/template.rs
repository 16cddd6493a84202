use crate::domain::recipient::Recipient;

/// The closed set of fields a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    FirstName,
    Email,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [Placeholder::Name, Placeholder::FirstName, Placeholder::Email];

    pub fn parse(key: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|placeholder| placeholder.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Placeholder::Name => "name",
            Placeholder::FirstName => "first_name",
            Placeholder::Email => "email",
        }
    }

    fn resolve<'a>(&self, recipient: &'a Recipient) -> Option<&'a str> {
        match self {
            Placeholder::Name => recipient.name.as_ref().map(AsRef::as_ref),
            Placeholder::FirstName => recipient.name.as_ref().map(|name| name.first_name()),
            Placeholder::Email => Some(recipient.email.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{{{0}}}}}. Supported placeholders are name, first_name and email.")]
    UnknownPlaceholder(String),
    #[error("Placeholder opened at byte {0} is never closed.")]
    Unterminated(usize),
    #[error("Placeholder {{{{{placeholder}}}}} has no value for {recipient}.")]
    Unresolved {
        placeholder: &'static str,
        recipient: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Placeholder),
}

/// A template split into literal text and `{{field}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + start))?;
            let key = after_open[..end].trim();
            let placeholder = Placeholder::parse(key)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(key.to_string()))?;

            segments.push(Segment::Field(placeholder));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Template { segments })
    }

    pub fn render(&self, recipient: &Recipient) -> Result<String, TemplateError> {
        let mut rendered = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Field(placeholder) => {
                    let value =
                        placeholder
                            .resolve(recipient)
                            .ok_or_else(|| TemplateError::Unresolved {
                                placeholder: placeholder.key(),
                                recipient: recipient.email.to_string(),
                            })?;
                    rendered.push_str(value);
                }
            }
        }

        Ok(rendered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct MessageTemplate {
    subject: Template,
    body: Template,
}

impl MessageTemplate {
    pub fn parse(subject: &str, body: &str) -> Result<MessageTemplate, TemplateError> {
        Ok(MessageTemplate {
            subject: Template::parse(subject)?,
            body: Template::parse(body)?,
        })
    }

    pub fn render(&self, recipient: &Recipient) -> Result<RenderedMessage, TemplateError> {
        Ok(RenderedMessage {
            subject: self.subject.render(recipient)?,
            body: self.body.render(recipient)?,
        })
    }
}
