use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// 12-byte document identifier, rendered as 24 lowercase hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PetId([u8; 12]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid id format: {0:?}")]
pub struct InvalidPetId(pub String);

static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

impl PetId {
    /// Seconds timestamp, per-process random bytes, then a wrapping counter.
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let unique = PROCESS_UNIQUE.get_or_init(|| rand::thread_rng().gen());
        let count = COUNTER
            .get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..0x00FF_FFFF)))
            .fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for PetId {
    type Err = InvalidPetId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPetId(s.to_string());
        if s.len() != 24 || !s.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for PetId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(rename = "_id")]
    pub id: PetId,
    pub name: String,
    pub image: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new listing.
#[derive(Clone, Debug)]
pub struct NewPet {
    pub name: String,
    pub image: String,
    pub description: String,
}

/// Request body of `POST /api/pets`. Every field is checked by [`PetDraft::validate`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PetDraft {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PetDraft {
    pub fn validate(self) -> Option<NewPet> {
        Some(NewPet {
            name: present(self.name)?,
            image: present(self.image)?,
            description: present(self.description)?,
        })
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PetPatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl PetPatch {
    /// A supplied field must still satisfy the required-field rule.
    pub fn blank_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("image", &self.image),
            ("description", &self.description),
        ]
        .into_iter()
        .find(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
    }

    pub fn apply(self, pet: &mut Pet) {
        if let Some(name) = self.name {
            pet.name = name;
        }
        if let Some(image) = self.image {
            pet.image = image;
        }
        if let Some(description) = self.description {
            pet.description = description;
        }
        pet.updated_at = Utc::now();
    }
}
