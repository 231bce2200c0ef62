//! Line protocol spoken between the cart and its cloud peer.
//!
//! `verb:key=value,key=value;` where `;` terminates a message. A `message`
//! field is always last and runs to the end of the payload, so free text may
//! contain commas. Elsewhere a comma only starts a new field when `key=`
//! follows it, so item names such as `Chips, salted` survive intact.

use std::fmt;
use std::str::FromStr;

use cart_traits::{Item, Lookup};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("malformed verb {0:?}")]
    BadVerb(String),
    #[error("malformed field {0:?}")]
    BadField(String),
    #[error("unknown command {0:?}")]
    UnknownVerb(String),
    #[error("{verb}: missing field {field}")]
    MissingField { verb: String, field: &'static str },
    #[error("{verb}: bad value {value:?} for {field}")]
    BadValue {
        verb: String,
        field: &'static str,
        value: String,
    },
}

/// Untyped message: a verb and its ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub verb: String,
    pub fields: Vec<(String, String)>,
}

impl Message {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, field: &'static str) -> Result<&str, ProtocolError> {
        self.get(field).ok_or_else(|| ProtocolError::MissingField {
            verb: self.verb.clone(),
            field,
        })
    }

    fn number(&self, field: &'static str) -> Result<f64, ProtocolError> {
        let raw = self.require(field)?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| ProtocolError::BadValue {
                verb: self.verb.clone(),
                field,
                value: raw.to_string(),
            })
    }
}

/// Strip surrounding whitespace and the terminator.
pub fn strip_frame(line: &str) -> &str {
    let t = line.trim();
    t.strip_suffix(';').unwrap_or(t).trim_end()
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = strip_frame(s);
        if body.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let (verb, payload) = body.split_once(':').unwrap_or((body, ""));
        let verb_ok = !verb.is_empty()
            && verb
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !verb_ok {
            return Err(ProtocolError::BadVerb(verb.to_string()));
        }

        let mut msg = Self::new(verb);
        let mut rest = payload;
        while !rest.is_empty() {
            if let Some(text) = rest.strip_prefix("message=") {
                msg.fields.push(("message".into(), text.to_string()));
                break;
            }
            let (pair, tail) = rest.split_once(',').unwrap_or((rest, ""));
            if let Some((k, v)) = pair.split_once('=').filter(|_| starts_field(pair)) {
                msg.fields.push((k.to_string(), v.to_string()));
            } else if let Some((_, prev)) = msg.fields.last_mut() {
                prev.push(',');
                prev.push_str(pair);
            } else {
                return Err(ProtocolError::BadField(pair.to_string()));
            }
            rest = tail;
        }
        Ok(msg)
    }
}

/// `key=` with a non-empty lowercase key.
fn starts_field(segment: &str) -> bool {
    segment.split_once('=').is_some_and(|(k, _)| {
        !k.is_empty()
            && k.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    })
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            f.write_str(if i == 0 { ":" } else { "," })?;
            write!(f, "{k}={v}")?;
        }
        f.write_str(";")
    }
}

/// Typed protocol commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CartStatus { follow: bool },
    UpcAdd(Item),
    UpcDel(Item),
    UpcLookup { upc: String },
    CustAlert { message: String },
    /// Answer to a `upc_lookup`: `Found` or `NotFound`.
    LookupReply(Lookup),
    /// `re_<verb>:status=ack`
    Ack { verb: String },
    /// `no_command:status=nak,message=...`
    Nak { message: String },
}

impl Command {
    pub fn verb(&self) -> String {
        match self {
            Self::CartStatus { .. } => "cart_status".into(),
            Self::UpcAdd(_) => "upc_add".into(),
            Self::UpcDel(_) => "upc_del".into(),
            Self::UpcLookup { .. } => "upc_lookup".into(),
            Self::CustAlert { .. } => "cust_alert".into(),
            Self::LookupReply(_) => "re_upc_lookup".into(),
            Self::Ack { verb } => format!("re_{verb}"),
            Self::Nak { .. } => "no_command".into(),
        }
    }
}

fn item_fields(msg: Message, item: &Item) -> Message {
    let msg = msg
        .with("upc", &item.upc)
        .with("price", item.price)
        .with("weight", item.weight);
    match &item.name {
        Some(n) => msg.with("name", n),
        None => msg,
    }
}

fn item_from(msg: &Message, upc_required: bool) -> Result<Item, ProtocolError> {
    let upc = if upc_required {
        msg.require("upc")?.to_string()
    } else {
        msg.get("upc").unwrap_or_default().to_string()
    };
    Ok(Item {
        upc,
        name: msg.get("name").map(str::to_string),
        price: msg.number("price")?,
        weight: msg.number("weight")?,
    })
}

impl From<&Command> for Message {
    fn from(c: &Command) -> Self {
        let msg = Self::new(c.verb());
        match c {
            Command::CartStatus { follow } => {
                msg.with("follow", if *follow { "on" } else { "off" })
            }
            Command::UpcAdd(item) | Command::UpcDel(item) => item_fields(msg, item),
            Command::UpcLookup { upc } => msg.with("upc", upc),
            Command::CustAlert { message } => msg.with("message", message),
            Command::LookupReply(Lookup::Found(item)) => item_fields(msg, item),
            Command::LookupReply(_) => msg.with("status", "nak").with("message", "not found"),
            Command::Ack { .. } => msg.with("status", "ack"),
            Command::Nak { message } => msg.with("status", "nak").with("message", message),
        }
    }
}

impl TryFrom<&Message> for Command {
    type Error = ProtocolError;

    fn try_from(m: &Message) -> Result<Self, Self::Error> {
        match m.verb.as_str() {
            "cart_status" => match m.require("follow")? {
                "on" => Ok(Self::CartStatus { follow: true }),
                "off" => Ok(Self::CartStatus { follow: false }),
                other => Err(ProtocolError::BadValue {
                    verb: m.verb.clone(),
                    field: "follow",
                    value: other.to_string(),
                }),
            },
            "upc_add" => Ok(Self::UpcAdd(item_from(m, true)?)),
            "upc_del" => Ok(Self::UpcDel(item_from(m, true)?)),
            "upc_lookup" => Ok(Self::UpcLookup {
                upc: m.require("upc")?.to_string(),
            }),
            "cust_alert" => Ok(Self::CustAlert {
                message: m.require("message")?.to_string(),
            }),
            "re_upc_lookup" if m.get("status") == Some("nak") => {
                Ok(Self::LookupReply(Lookup::NotFound))
            }
            "re_upc_lookup" => Ok(Self::LookupReply(Lookup::Found(item_from(m, false)?))),
            "no_command" => Ok(Self::Nak {
                message: m.get("message").unwrap_or_default().to_string(),
            }),
            v if v.starts_with("re_") && m.get("status") == Some("ack") => Ok(Self::Ack {
                verb: v.trim_start_matches("re_").to_string(),
            }),
            v => Err(ProtocolError::UnknownVerb(v.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(&s.parse::<Message>()?)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Message::from(self).fmt(f)
    }
}

/// `re_<verb>:status=ack;`
pub fn ack(verb: &str) -> String {
    Command::Ack {
        verb: verb.to_string(),
    }
    .to_string()
}

/// `no_command:status=nak,message=<input>;` echoing the unframed input.
pub fn nak(input: &str) -> String {
    Command::Nak {
        message: strip_frame(input).to_string(),
    }
    .to_string()
}
