use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Lenient field deserializer: a present-but-wrong-shaped value falls back to
/// the field's default instead of failing the whole document. This is what
/// lets an old or hand-edited content file heal on load.
fn lenient<'de, T, D>(de: D) -> Result<T, D::Error>
where
    T: DeserializeOwned + Default,
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

// ── Collection records ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroSlide {
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub subtitle: String,
    /// Image URL shown behind the slide text.
    #[serde(deserialize_with = "lenient")]
    pub src: String,
    #[serde(deserialize_with = "lenient")]
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Initiative {
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub desc: String,
    #[serde(deserialize_with = "lenient")]
    pub tag: String,
    /// Fundraising target, kept as a display string (e.g. "50,000").
    #[serde(deserialize_with = "lenient")]
    pub amount: String,
    #[serde(deserialize_with = "lenient")]
    pub image: String,
    #[serde(deserialize_with = "lenient")]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Program {
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub desc: String,
    #[serde(deserialize_with = "lenient")]
    pub icon: String,
    #[serde(deserialize_with = "lenient")]
    pub image: String,
    #[serde(deserialize_with = "lenient")]
    pub link: String,
}

/// A submitted contact-form message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub email: String,
    #[serde(deserialize_with = "lenient")]
    pub message: String,
    /// Unix timestamp (seconds) when the message was submitted.
    #[serde(deserialize_with = "lenient")]
    pub created_at: i64,
}

impl Message {
    pub fn new(id: i64, name: String, email: String, message: String) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        Self {
            id,
            name,
            email,
            message,
            created_at,
        }
    }
}

// ── Singleton sections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutContent {
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactContent {
    #[serde(deserialize_with = "lenient")]
    pub phone: String,
    #[serde(deserialize_with = "lenient")]
    pub email: String,
    #[serde(deserialize_with = "lenient")]
    pub address: String,
}

/// Shared shape for the vision and mission sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionMission {
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DonateContent {
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
    /// Bank account / transfer details, free text.
    #[serde(deserialize_with = "lenient")]
    pub bank: String,
    #[serde(deserialize_with = "lenient")]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolunteerContent {
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub steps: Vec<String>,
}

// ── Credential ───────────────────────────────────────────────────────────────

/// The single administrator identity embedded in the content document.
/// Never crosses the trust boundary — see [`ContentDocument::public_view`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credential {
    #[serde(deserialize_with = "lenient")]
    pub username: String,
    /// Stored form `salt:derivedKeyHex`, see `token::hash_password`.
    #[serde(deserialize_with = "lenient")]
    pub password_hash: String,
}

// ── Document ─────────────────────────────────────────────────────────────────

/// The full persisted aggregate. Every field has a declared default and heals
/// independently on deserialization, so any JSON object loads into a
/// structurally complete document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDocument {
    #[serde(deserialize_with = "lenient")]
    pub hero_slides: Vec<HeroSlide>,
    #[serde(deserialize_with = "lenient")]
    pub initiatives: Vec<Initiative>,
    #[serde(deserialize_with = "lenient")]
    pub programs: Vec<Program>,
    #[serde(deserialize_with = "lenient")]
    pub messages: Vec<Message>,
    #[serde(deserialize_with = "lenient")]
    pub about: AboutContent,
    #[serde(deserialize_with = "lenient")]
    pub contact: ContactContent,
    #[serde(deserialize_with = "lenient")]
    pub vision: VisionMission,
    #[serde(deserialize_with = "lenient")]
    pub mission: VisionMission,
    #[serde(deserialize_with = "lenient")]
    pub donate: DonateContent,
    #[serde(deserialize_with = "lenient")]
    pub volunteer: VolunteerContent,
    #[serde(deserialize_with = "lenient")]
    pub credential: Credential,
}

/// The content document as served to unauthenticated callers — everything
/// except the credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicContent {
    pub hero_slides: Vec<HeroSlide>,
    pub initiatives: Vec<Initiative>,
    pub programs: Vec<Program>,
    pub messages: Vec<Message>,
    pub about: AboutContent,
    pub contact: ContactContent,
    pub vision: VisionMission,
    pub mission: VisionMission,
    pub donate: DonateContent,
    pub volunteer: VolunteerContent,
}

impl ContentDocument {
    /// Parse a raw JSON string into a schema-complete document.
    /// Returns `None` only when the top level is not a JSON object; every
    /// field-level mismatch heals to its default instead.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Fill in a missing or partial credential. Returns true if anything
    /// changed (callers persist the healed document in that case).
    pub fn heal_credential(&mut self, default_password: &str) -> bool {
        let mut changed = false;
        if self.credential.username.is_empty() {
            self.credential.username = "admin".to_owned();
            changed = true;
        }
        if self.credential.password_hash.is_empty() {
            self.credential.password_hash = crate::token::hash_password(default_password);
            changed = true;
        }
        changed
    }

    /// Strip the credential before data crosses the trust boundary.
    pub fn public_view(&self) -> PublicContent {
        PublicContent {
            hero_slides: self.hero_slides.clone(),
            initiatives: self.initiatives.clone(),
            programs: self.programs.clone(),
            messages: self.messages.clone(),
            about: self.about.clone(),
            contact: self.contact.clone(),
            vision: self.vision.clone(),
            mission: self.mission.clone(),
            donate: self.donate.clone(),
            volunteer: self.volunteer.clone(),
        }
    }
}

/// Allocate a collection record id: current epoch milliseconds, bumped past
/// the existing maximum on collision so ids stay unique within a collection.
pub fn allocate_id<I>(existing: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let max = existing.into_iter().max().unwrap_or(0);
    if now > max {
        now
    } else {
        max + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_loads_fully_defaulted() {
        let doc = ContentDocument::from_json("{}").unwrap();
        assert_eq!(doc, ContentDocument::default());
        assert!(doc.hero_slides.is_empty());
        assert_eq!(doc.about.title, "");
        assert_eq!(doc.volunteer.steps, Vec::<String>::new());
    }

    #[test]
    fn partial_section_keeps_parsed_fields_and_defaults_the_rest() {
        let doc = ContentDocument::from_json(r#"{"about":{"title":"X"}}"#).unwrap();
        assert_eq!(doc.about.title, "X");
        assert_eq!(doc.about.description, "");
        assert!(doc.initiatives.is_empty());
        assert_eq!(doc.donate, DonateContent::default());
    }

    #[test]
    fn wrong_shaped_fields_heal_independently() {
        let raw = r#"{
            "heroSlides": {"not": "an array"},
            "programs": [{"id": 3, "title": "T", "icon": 7}],
            "contact": {"phone": ["nope"], "email": "a@b.c"},
            "vision": 42
        }"#;
        let doc = ContentDocument::from_json(raw).unwrap();
        assert!(doc.hero_slides.is_empty());
        assert_eq!(doc.programs.len(), 1);
        assert_eq!(doc.programs[0].title, "T");
        assert_eq!(doc.programs[0].icon, "");
        assert_eq!(doc.contact.phone, "");
        assert_eq!(doc.contact.email, "a@b.c");
        assert_eq!(doc.vision, VisionMission::default());
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        assert!(ContentDocument::from_json("[1,2,3]").is_none());
        assert!(ContentDocument::from_json("not json at all").is_none());
    }

    #[test]
    fn heal_credential_fills_blanks_only() {
        let mut doc = ContentDocument::default();
        assert!(doc.heal_credential("changeme"));
        assert_eq!(doc.credential.username, "admin");
        assert!(!doc.credential.password_hash.is_empty());

        // A complete credential is left untouched.
        let hash = doc.credential.password_hash.clone();
        assert!(!doc.heal_credential("other"));
        assert_eq!(doc.credential.password_hash, hash);
    }

    #[test]
    fn public_view_never_serializes_the_password_hash() {
        let mut doc = ContentDocument::default();
        doc.heal_credential("changeme");
        doc.about.title = "جمعية عطاء".to_owned();

        let json = serde_json::to_string(&doc.public_view()).unwrap();
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("credential"));
        assert!(json.contains("جمعية عطاء"));
    }

    #[test]
    fn document_round_trips_through_camel_case_json() {
        let mut doc = ContentDocument::default();
        doc.hero_slides.push(HeroSlide {
            id: 1,
            title: "t".into(),
            ..Default::default()
        });
        doc.credential.username = "admin".into();

        let json = serde_json::to_string_pretty(&doc).unwrap();
        assert!(json.contains("heroSlides"));
        let back = ContentDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn allocate_id_bumps_past_collisions() {
        let huge = i64::MAX - 1;
        assert_eq!(allocate_id([huge]), huge + 1);
        let fresh = allocate_id(std::iter::empty());
        assert!(fresh > 1_600_000_000_000); // epoch millis, not seconds
    }
}
