use crate::domain::recipient_email::RecipientEmail;
use crate::domain::recipient_name::RecipientName;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Recipient {
    pub name: Option<RecipientName>,
    pub email: RecipientEmail,
}

impl Recipient {
    pub fn parse(name: Option<String>, email: String) -> Result<Recipient, String> {
        let name = match name {
            Some(name) if !name.trim().is_empty() => Some(RecipientName::parse(name)?),
            _ => None,
        };
        let email = RecipientEmail::parse(email)?;

        Ok(Recipient { name, email })
    }
}
