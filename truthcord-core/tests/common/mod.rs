#![allow(dead_code)]

use chrono::{DateTime, Utc};
use truthcord_core::post::{Account, Attachment, MediaKind, Post};

pub const MIB: u64 = 1024 * 1024;

/// Top line for posts built by [`post`].
pub const TOP: &str = "-# :loudspeaker: [@alice](https://truthsocial.com/@alice) • <t:1704067200>\n";

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn account() -> Account {
    Account {
        id: "1".into(),
        username: "alice".into(),
        acct: "alice".into(),
        display_name: "Alice".into(),
        url: "https://truthsocial.com/@alice".into(),
    }
}

pub fn post_at(id: &str, created_at: &str, content: &str) -> Post {
    Post {
        id: id.into(),
        created_at: at(created_at),
        account: account(),
        content: content.into(),
        url: Some(format!("https://truthsocial.com/@alice/{id}")),
        reblog: None,
        quote: None,
        media_attachments: vec![],
        pulled_at: None,
    }
}

pub fn post(content: &str) -> Post {
    post_at("1", "2024-01-01T00:00:00+00:00", content)
}

pub fn media(kind: MediaKind, url: &str) -> Attachment {
    Attachment {
        kind,
        url: url.into(),
        declared_size: None,
    }
}
