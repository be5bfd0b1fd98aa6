use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::gateway::FetchError;
use crate::pagination::PageInfo;

/// One record of a fetched list.
pub trait CollectionItem {
    type Id: Clone + Debug + Display + Eq + Hash;

    fn id(&self) -> Self::Id;
    fn title(&self) -> &str;
}

pub type ItemId<T> = <T as CollectionItem>::Id;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FetchState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            Self::Loaded(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Self::Loaded(items) => Some(items),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Decoded list payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub page_info: Option<PageInfo>,
    /// Text the backend sends instead of an empty list.
    pub notice: Option<String>,
}

impl<T> Listing<T> {
    pub fn empty(notice: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            page_info: None,
            notice,
        }
    }
}

/// Reads a list response: a bare array, an object whose `envelope` field
/// holds the array (plus optional `pagination`), or an object carrying only
/// a `message`/`error`, which is the backend's way of saying "nothing here".
pub fn extract_listing<T: DeserializeOwned>(
    body: Value,
    envelope: Option<&str>,
) -> Result<Listing<T>, FetchError> {
    match body {
        Value::Array(_) => Ok(Listing {
            items: decode_items(body)?,
            page_info: None,
            notice: None,
        }),
        Value::Object(mut map) => {
            if let Some(field) = envelope {
                if let Some(list @ Value::Array(_)) = map.remove(field) {
                    let page_info = match map.remove("pagination") {
                        Some(v) => Some(
                            serde_json::from_value::<PageInfo>(v)
                                .map_err(|e| FetchError::Parse(format!("pagination: {e}")))?,
                        ),
                        None => None,
                    };
                    return Ok(Listing {
                        items: decode_items(list)?,
                        page_info,
                        notice: None,
                    });
                }
            }
            let notice = ["message", "error"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_string));
            match notice {
                Some(text) => Ok(Listing::empty(Some(text))),
                None => Err(FetchError::Parse(
                    "expected a list or an object with a message".to_string(),
                )),
            }
        }
        other => Err(FetchError::Parse(format!(
            "expected a list, got {}",
            json_kind(&other)
        ))),
    }
}

fn decode_items<T: DeserializeOwned>(list: Value) -> Result<Vec<T>, FetchError> {
    serde_json::from_value(list).map_err(|e| FetchError::Parse(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Keeps the first item for every id. Returns the number of dropped
/// duplicates.
pub fn dedupe_by_id<T: CollectionItem>(items: Vec<T>) -> (Vec<T>, usize) {
    let mut seen: HashSet<T::Id> = HashSet::new();
    let before = items.len();
    let out: Vec<T> = items.into_iter().filter(|i| seen.insert(i.id())).collect();
    let dropped = before - out.len();
    if dropped > 0 {
        warn!("dropped {dropped} items with duplicate ids");
    }
    (out, dropped)
}

pub fn position_of<T: CollectionItem>(items: &[T], id: &T::Id) -> Option<usize> {
    items.iter().position(|i| &i.id() == id)
}

/// Proof that a fetch was started for `key` as request number `generation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket<K> {
    generation: u64,
    key: K,
}

impl<K> FetchTicket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Request fence. Only the most recently issued ticket, for the key that is
/// still current, may write its result.
#[derive(Clone, Debug)]
pub struct Fence<K> {
    generation: u64,
    current: Option<K>,
}

impl<K: Clone + PartialEq> Fence<K> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }

    pub fn issue(&mut self, key: K) -> FetchTicket<K> {
        self.generation += 1;
        self.current = Some(key.clone());
        FetchTicket {
            generation: self.generation,
            key,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket<K>) -> bool {
        ticket.generation == self.generation && self.current.as_ref() == Some(&ticket.key)
    }

    pub fn current_key(&self) -> Option<&K> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<K: Clone + PartialEq> Default for Fence<K> {
    fn default() -> Self {
        Self::new()
    }
}
