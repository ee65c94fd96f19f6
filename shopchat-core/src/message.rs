// ABOUTME: Conversation data model shared by the session store, renderer and HTTP clients
// ABOUTME: Message and Product serialize with the field names of the persisted widget snapshot

use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

/// A product attached to a bot reply, rendered as a carousel card
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_link: Option<String>,
}

impl Product {
    /// Price label, or the placeholder shown when the catalogue has none
    pub fn display_price(&self) -> &str {
        self.price.as_deref().unwrap_or("Price not available")
    }

    /// Amount saved against the original price ("Save N TK" badge).
    /// A missing price counts as zero.
    pub fn savings(&self) -> Option<i64> {
        let original = leading_integer(self.original_price.as_deref()?)?;
        let price = match self.price.as_deref() {
            Some(p) => leading_integer(p)?,
            None => 0,
        };
        Some(original - price)
    }
}

/// Parse the integer prefix of a price label such as "995TK" or " 1200 BDT"
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}

/// One entry of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    /// Hosted URL of an image the user attached
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty_vec")]
    pub products: Vec<Product>,
}

impl Message {
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            image: image.filter(|url| !url.is_empty()),
            products: Vec::new(),
        }
    }

    pub fn bot(text: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            image: None,
            products,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

// Old snapshots store `image: ""` for "no image" and may carry explicit nulls.

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_vec<'de, D>(deserializer: D) -> Result<Vec<Product>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Product>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
