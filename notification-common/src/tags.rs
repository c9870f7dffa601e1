//! Request-scoped tag bag consumed by the Sentry middleware and by
//! structured log lines, following the same `FromRequest` extractor shape the
//! teacher used for its WebPush endpoints (ported to the actix-web 4 trait,
//! which dropped the associated `Config` type).
use std::collections::{BTreeMap, HashMap};
use std::future::{ready, Ready};

use actix_web::{
    dev::{Payload, RequestHead},
    Error, FromRequest, HttpRequest,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::Value;

#[derive(Clone, Debug, Default)]
pub struct Tags {
    pub tags: HashMap<String, String>,
    pub extra: HashMap<String, String>,
}

impl Serialize for Tags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_map(Some(self.tags.len()))?;
        for (k, v) in &self.tags {
            if !v.is_empty() {
                seq.serialize_entry(k, v)?;
            }
        }
        seq.end()
    }
}

impl Tags {
    pub fn from_request_head(req_head: &RequestHead) -> Tags {
        let mut tags = HashMap::new();
        tags.insert("uri.method".to_owned(), req_head.method.to_string());
        Tags {
            tags,
            extra: HashMap::new(),
        }
    }

    pub fn with_tags(tags: HashMap<String, String>) -> Tags {
        if tags.is_empty() {
            return Tags::default();
        }
        Tags {
            tags,
            extra: HashMap::new(),
        }
    }

    pub fn get(&self, label: &str) -> String {
        self.tags.get(label).cloned().unwrap_or_else(|| "None".to_owned())
    }

    pub fn extend(&mut self, tags: HashMap<String, String>) {
        self.tags.extend(tags);
    }

    pub fn tag_tree(&self) -> BTreeMap<String, String> {
        self.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn extra_tree(&self) -> BTreeMap<String, Value> {
        self.extra
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect()
    }
}

impl slog::KV for Tags {
    fn serialize(&self, _record: &slog::Record<'_>, serializer: &mut dyn slog::Serializer) -> slog::Result {
        for (key, val) in &self.tags {
            serializer.emit_str(slog::Key::from(key.clone()), val)?;
        }
        Ok(())
    }
}

impl FromRequest for Tags {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let tags = {
            let exts = req.extensions();
            match exts.get::<Tags>() {
                Some(t) => t.clone(),
                None => Tags::from_request_head(req.head()),
            }
        };
        ready(Ok(tags))
    }
}

impl From<Tags> for BTreeMap<String, String> {
    fn from(tags: Tags) -> Self {
        tags.tags.into_iter().collect()
    }
}
