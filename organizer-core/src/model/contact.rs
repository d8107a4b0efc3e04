//! Contacts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, ValidationError};

/// Platforms accepted in `social_profiles`. Entries outside this list
/// (or with invalid URLs) are dropped, not rejected.
const ALLOWED_PLATFORMS: [&str; 7] = [
    "twitter",
    "linkedin",
    "github",
    "facebook",
    "instagram",
    "youtube",
    "website",
];

/// Incoming contact fields, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactDraft {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub social_profiles: BTreeMap<String, String>,
}

/// A validated contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub social_profiles: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(draft: ContactDraft) -> Result<Self, ValidationError> {
        let name = validate::validate_text(&draft.name, "name", 1, 100, false)?;

        let email = match draft.email.as_deref() {
            Some(e) if !e.trim().is_empty() => Some(validate::validate_email(e)?),
            _ => None,
        };
        let phone = match draft.phone.as_deref() {
            Some(p) if !p.trim().is_empty() => Some(validate::validate_phone(p)?),
            _ => None,
        };
        let company = match draft.company.as_deref() {
            Some(c) if !c.trim().is_empty() => {
                Some(validate::validate_text(c, "company", 0, 100, false)?)
            }
            _ => None,
        };
        let address = match draft.address.as_deref() {
            Some(a) if !a.trim().is_empty() => {
                Some(validate::validate_text(a, "address", 0, 300, false)?)
            }
            _ => None,
        };
        let birthday = match draft.birthday.as_deref() {
            Some(b) if !b.trim().is_empty() => {
                Some(validate::validate_datetime(b, "birthday")?)
            }
            _ => None,
        };
        let notes = match draft.notes.as_deref() {
            Some(n) if !n.trim().is_empty() => {
                Some(validate::validate_text(n, "notes", 0, 1000, false)?)
            }
            _ => None,
        };

        let tags = validate::validate_tags(&draft.tags)?;

        let mut social_profiles = BTreeMap::new();
        for (platform, url) in &draft.social_profiles {
            let key = platform.trim().to_lowercase();
            if !ALLOWED_PLATFORMS.contains(&key.as_str()) {
                continue;
            }
            if let Ok(valid) = validate::validate_url(url, &key) {
                social_profiles.insert(key, valid);
            }
        }

        let now = Utc::now();
        Ok(Contact {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            company,
            address,
            birthday,
            notes,
            tags,
            social_profiles,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> ContactDraft {
        ContactDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_contact() {
        let contact = Contact::new(draft("John Smith")).unwrap();
        assert_eq!(contact.name, "John Smith");
        assert!(contact.email.is_none());
    }

    #[test]
    fn test_phone_normalized() {
        let mut d = draft("Jane");
        d.phone = Some("+1 234 567 8900".to_string());
        let contact = Contact::new(d).unwrap();
        assert_eq!(contact.phone.as_deref(), Some("+1 234 567 8900"));

        let mut bad = draft("Jane");
        bad.phone = Some("123".to_string());
        assert!(Contact::new(bad).is_err());
    }

    #[test]
    fn test_social_profiles_allow_list_drops_silently() {
        let mut d = draft("Jane");
        d.social_profiles.insert("github".to_string(), "https://github.com/jane".to_string());
        d.social_profiles.insert("myspace".to_string(), "https://myspace.com/jane".to_string());
        d.social_profiles.insert("twitter".to_string(), "not a url".to_string());
        let contact = Contact::new(d).unwrap();
        assert_eq!(contact.social_profiles.len(), 1);
        assert!(contact.social_profiles.contains_key("github"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut d = draft("Jane");
        d.email = Some("jane-at-example".to_string());
        assert!(Contact::new(d).is_err());
    }
}
