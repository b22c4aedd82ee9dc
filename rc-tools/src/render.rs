//! Plain-text presentation of tool payloads. This is the only place that
//! substitutes placeholders for missing fields.

use crate::dispatch::{CreatedChannel, RoomListing, SentMessage};
use rc_client::types::{Message, Room, User};

const MISSING: &str = "N/A";

pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }
    let blocks: Vec<String> = users
        .iter()
        .map(|user| {
            format!(
                "Username: {}\nEmail: {}\nName: {}",
                or_missing(user.username.as_deref()),
                or_missing(user.primary_email()),
                or_missing(user.name.as_deref()),
            )
        })
        .collect();
    format!("Available users:\n{}", blocks.join("\n"))
}

pub fn user_info(user: &User) -> String {
    let active = user.active.map(|active| active.to_string());
    let roles = user
        .roles
        .as_deref()
        .filter(|roles| !roles.is_empty())
        .map(|roles| roles.join(", "));
    format!(
        "User Information:\nName: {}\nUsername: {}\nEmail: {}\nStatus: {}\nActive: {}\nRoles: {}",
        or_missing(user.name.as_deref()),
        or_missing(user.username.as_deref()),
        or_missing(user.primary_email()),
        or_missing(user.status.as_deref()),
        or_missing(active.as_deref()),
        or_missing(roles.as_deref()),
    )
}

pub fn channels(channels: &[Room]) -> String {
    if channels.is_empty() {
        return "No channels found".to_string();
    }
    let lines: Vec<String> = channels
        .iter()
        .map(|room| format!("- {}", room_label(room)))
        .collect();
    format!("Available channels:\n{}", lines.join("\n"))
}

pub fn rooms(listing: &RoomListing) -> String {
    let lines: Vec<String> = listing
        .channels
        .iter()
        .map(|room| format!("[Channel] {}", room_label(room)))
        .chain(
            listing
                .groups
                .iter()
                .map(|room| format!("[Group] {}", room_label(room))),
        )
        .collect();
    if lines.is_empty() {
        return "No rooms found".to_string();
    }
    format!("Available rooms:\n{}", lines.join("\n"))
}

pub fn sent_message(sent: &SentMessage) -> String {
    format!("Message sent successfully to {}", sent.channel)
}

pub fn created_channel(created: &CreatedChannel) -> String {
    format!(
        "Channel '{}' created successfully with ID: {}",
        created.name,
        or_missing(created.id.as_deref())
    )
}

pub fn messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No messages found in this channel".to_string();
    }
    let lines: Vec<String> = messages
        .iter()
        .map(|message| {
            let timestamp = message.ts.as_ref().and_then(|ts| ts.display());
            let author = message
                .author
                .as_ref()
                .and_then(|author| author.username.as_deref())
                .unwrap_or("Unknown");
            let text = message.text.as_deref().unwrap_or("No content");
            format!("[{}] {author}: {text}", or_missing(timestamp.as_deref()))
        })
        .collect();
    format!(
        "Messages from channel (last {}):\n{}",
        messages.len(),
        lines.join("\n")
    )
}

fn room_label(room: &Room) -> String {
    format!(
        "{} (ID: {})",
        or_missing(room.name.as_deref()),
        or_missing(room.id.as_deref())
    )
}

fn or_missing(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_client::types::{Email, MessageAuthor, MessageTimestamp};

    fn room(id: Option<&str>, name: Option<&str>) -> Room {
        Room {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    fn user(username: &str) -> User {
        User {
            id: None,
            username: Some(username.to_string()),
            name: None,
            emails: None,
            status: None,
            active: None,
            roles: None,
        }
    }

    #[test]
    fn users_substitutes_missing_fields() {
        let text = users(&[user("bob")]);
        assert_eq!(
            text,
            "Available users:\nUsername: bob\nEmail: N/A\nName: N/A"
        );
        assert_eq!(users(&[]), "No users found");
    }

    #[test]
    fn user_info_joins_roles_and_formats_active() {
        let info = User {
            name: Some("Alice".to_string()),
            emails: Some(vec![Email {
                address: Some("a@x.com".to_string()),
                verified: Some(true),
            }]),
            status: Some("online".to_string()),
            active: Some(true),
            roles: Some(vec!["user".to_string(), "admin".to_string()]),
            ..user("alice")
        };
        let text = user_info(&info);
        assert!(text.starts_with("User Information:\n"));
        assert!(text.contains("Email: a@x.com"));
        assert!(text.contains("Active: true"));
        assert!(text.contains("Roles: user, admin"));

        let bare = user_info(&user("carol"));
        assert!(bare.contains("Status: N/A"));
        assert!(bare.contains("Roles: N/A"));
    }

    #[test]
    fn rooms_tags_channels_and_groups() {
        let listing = RoomListing {
            channels: vec![room(Some("c1"), Some("general"))],
            groups: vec![room(None, Some("secret"))],
        };
        assert_eq!(
            rooms(&listing),
            "Available rooms:\n[Channel] general (ID: c1)\n[Group] secret (ID: N/A)"
        );
        assert_eq!(rooms(&RoomListing::default()), "No rooms found");
    }

    #[test]
    fn channels_lists_each_room() {
        let text = channels(&[room(Some("c1"), Some("general")), room(Some("c2"), None)]);
        assert_eq!(
            text,
            "Available channels:\n- general (ID: c1)\n- N/A (ID: c2)"
        );
    }

    #[test]
    fn messages_fall_back_for_missing_author_and_text() {
        let list = vec![
            Message {
                id: Some("m1".to_string()),
                ts: Some(MessageTimestamp::Iso("2024-05-01T10:00:00.000Z".to_string())),
                author: Some(MessageAuthor {
                    username: Some("alice".to_string()),
                    name: None,
                }),
                text: Some("hello".to_string()),
            },
            Message {
                id: None,
                ts: None,
                author: None,
                text: None,
            },
        ];
        assert_eq!(
            messages(&list),
            "Messages from channel (last 2):\n[2024-05-01T10:00:00.000Z] alice: hello\n[N/A] Unknown: No content"
        );
        assert_eq!(messages(&[]), "No messages found in this channel");
    }

    #[test]
    fn created_channel_without_id() {
        let created = CreatedChannel {
            name: "ops".to_string(),
            id: None,
        };
        assert_eq!(
            created_channel(&created),
            "Channel 'ops' created successfully with ID: N/A"
        );
    }
}
