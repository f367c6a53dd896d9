//! Chat groups: membership plus an append-only message log per group.

use std::collections::HashMap;
use std::sync::Arc;

use conduit_core::Reply;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::users::UserStore;
use super::{
    CREATED, GROUP_ALREADY_EXISTS, GROUP_DOES_NOT_EXIST, NOT_A_GROUP_MEMBER, USER_DOES_NOT_EXIST,
};
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

/// One message as sent and as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub body: String,
}

#[derive(Debug)]
struct ChatGroup {
    name: String,
    members: Vec<String>,
    messages: Vec<ChatMessage>,
}

impl ChatGroup {
    fn has_member(&self, identity: &str) -> bool {
        self.members.iter().any(|m| m == identity)
    }
}

/// Outcome of [`MessagingStore::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    NoSuchGroup,
    NotAMember,
}

#[derive(Debug, Default)]
struct Groups {
    /// Creation order.
    list: Vec<ChatGroup>,
    by_name: HashMap<String, usize>,
}

/// All chat groups, behind one lock.
#[derive(Debug, Default)]
pub struct MessagingStore {
    groups: RwLock<Groups>,
}

impl MessagingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group. Returns `false` if the name is taken.
    pub fn create_group(&self, name: &str, members: Vec<String>) -> bool {
        let mut groups = self.groups.write();
        if groups.by_name.contains_key(name) {
            return false;
        }
        let mut unique: Vec<String> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        let index = groups.list.len();
        groups.list.push(ChatGroup {
            name: name.to_string(),
            members: unique,
            messages: Vec::new(),
        });
        groups.by_name.insert(name.to_string(), index);
        true
    }

    /// Appends `message` to `group` if the sender belongs to it.
    pub fn send(&self, message: ChatMessage, group: &str) -> SendOutcome {
        let mut groups = self.groups.write();
        let Some(&index) = groups.by_name.get(group) else {
            return SendOutcome::NoSuchGroup;
        };
        let target = &mut groups.list[index];
        if !target.has_member(&message.from) {
            return SendOutcome::NotAMember;
        }
        target.messages.push(message);
        SendOutcome::Delivered
    }

    /// Messages of every group `identity` belongs to, by group name.
    ///
    /// Groups come in creation order, messages in arrival order.
    #[must_use]
    pub fn messages_for(&self, identity: &str) -> Vec<(String, Vec<ChatMessage>)> {
        let groups = self.groups.read();
        groups
            .list
            .iter()
            .filter(|g| g.has_member(identity))
            .map(|g| (g.name.clone(), g.messages.clone()))
            .collect()
    }
}

fn inbox_reply(inbox: Vec<(String, Vec<ChatMessage>)>) -> Reply {
    let mut map = Map::with_capacity(inbox.len());
    for (group, messages) in inbox {
        let messages = messages
            .into_iter()
            .map(|m| {
                let mut obj = Map::with_capacity(2);
                obj.insert("from".to_string(), Value::String(m.from));
                obj.insert("body".to_string(), Value::String(m.body));
                Value::Object(obj)
            })
            .collect();
        map.insert(group, Value::Array(messages));
    }
    Reply::Record(map)
}

/// `create_chat_group`, `send_message`, and `get_my_messages`.
///
/// Group members are names from `users`; a group naming an unknown user is
/// not created.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register(
    registry: &mut ProcedureRegistry,
    store: &Arc<MessagingStore>,
    users: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let (create, accounts) = (Arc::clone(store), Arc::clone(users));
    registry.register(
        "create_chat_group",
        procedure(2, move |args| {
            let name = args.str(0)?;
            let members: Vec<String> = args.parse(1)?;
            if !members.iter().all(|m| accounts.contains(m)) {
                return Ok(Reply::text(USER_DOES_NOT_EXIST));
            }
            Ok(if create.create_group(name, members) {
                Reply::text(CREATED)
            } else {
                Reply::text(GROUP_ALREADY_EXISTS)
            })
        }),
    )?;

    let send = Arc::clone(store);
    registry.register(
        "send_message",
        procedure(2, move |args| {
            let message: ChatMessage = args.parse(0)?;
            Ok(match send.send(message, args.str(1)?) {
                SendOutcome::Delivered => Reply::Unit,
                SendOutcome::NoSuchGroup => Reply::text(GROUP_DOES_NOT_EXIST),
                SendOutcome::NotAMember => Reply::text(NOT_A_GROUP_MEMBER),
            })
        }),
    )?;

    let read = Arc::clone(store);
    registry.register(
        "get_my_messages",
        procedure(1, move |args| Ok(inbox_reply(read.messages_for(args.str(0)?)))),
    )
}

#[cfg(test)]
mod tests {
    use conduit_core::Args;
    use serde_json::json;

    use super::*;
    use crate::service::credential::CredentialIssuer;

    fn msg(from: &str, body: &str) -> ChatMessage {
        ChatMessage {
            from: from.into(),
            body: body.into(),
        }
    }

    fn registry() -> (ProcedureRegistry, Arc<MessagingStore>) {
        let users = Arc::new(UserStore::new(Arc::new(CredentialIssuer::new(
            b"messaging-test-key-messaging-key",
        ))));
        assert!(users.create("someUser", None).is_some());
        let store = Arc::new(MessagingStore::new());
        let mut registry = ProcedureRegistry::new();
        register(&mut registry, &store, &users).unwrap();
        (registry, store)
    }

    fn call(registry: &ProcedureRegistry, name: &str, args: Vec<Value>) -> Reply {
        registry.resolve(name).unwrap().call(&Args::new(args)).unwrap()
    }

    #[test]
    fn send_to_missing_group_then_created_group() {
        let (registry, _) = registry();
        let message = json!({"from": "someUser", "body": "Hi self"});

        assert_eq!(
            call(&registry, "send_message", vec![message.clone(), json!("talk2self")]),
            Reply::text(GROUP_DOES_NOT_EXIST)
        );
        assert_eq!(
            call(&registry, "create_chat_group", vec![json!("talk2self"), json!(["someUser"])]),
            Reply::text(CREATED)
        );
        assert_eq!(
            call(&registry, "create_chat_group", vec![json!("talk2self"), json!(["someUser"])]),
            Reply::text(GROUP_ALREADY_EXISTS)
        );
        assert_eq!(
            call(&registry, "send_message", vec![message, json!("talk2self")]),
            Reply::Unit
        );
        assert_eq!(
            call(&registry, "get_my_messages", vec![json!("someUser")]).to_value(),
            json!({"talk2self": [{"from": "someUser", "body": "Hi self"}]})
        );
    }

    #[test]
    fn non_members_cannot_post() {
        let store = MessagingStore::new();
        store.create_group("g", vec!["a".into()]);
        assert_eq!(store.send(msg("b", "hi"), "g"), SendOutcome::NotAMember);
        assert!(store.messages_for("a")[0].1.is_empty());
    }

    #[test]
    fn every_member_sees_messages_in_arrival_order() {
        let store = MessagingStore::new();
        store.create_group("g", vec!["a".into(), "b".into()]);
        store.send(msg("a", "one"), "g");
        store.send(msg("b", "two"), "g");
        store.send(msg("a", "three"), "g");

        for member in ["a", "b"] {
            let inbox = store.messages_for(member);
            let bodies: Vec<&str> = inbox[0].1.iter().map(|m| m.body.as_str()).collect();
            assert_eq!(bodies, vec!["one", "two", "three"]);
        }
    }

    #[test]
    fn inbox_is_restricted_to_member_groups_in_creation_order() {
        let store = MessagingStore::new();
        store.create_group("zeta", vec!["a".into()]);
        store.create_group("alpha", vec!["a".into(), "b".into()]);
        store.create_group("other", vec!["c".into()]);

        let names: Vec<String> = store.messages_for("a").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(store.messages_for("nobody").is_empty());

        let encoded = String::from_utf8(inbox_reply(store.messages_for("a")).encode().unwrap())
            .unwrap();
        assert_eq!(encoded, r#"{"zeta":[],"alpha":[]}"#);
    }

    #[test]
    fn duplicate_members_collapse() {
        let store = MessagingStore::new();
        store.create_group("g", vec!["a".into(), "a".into()]);
        store.send(msg("a", "x"), "g");
        let inbox = store.messages_for("a");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].1.len(), 1);
    }

    #[test]
    fn groups_only_admit_registered_users() {
        let (registry, store) = registry();
        assert_eq!(
            call(&registry, "create_chat_group", vec![json!("g"), json!(["someUser", "ghost"])]),
            Reply::text(USER_DOES_NOT_EXIST)
        );
        assert_eq!(
            call(&registry, "send_message", vec![json!({"from": "ghost", "body": "boo"}), json!("g")]),
            Reply::text(GROUP_DOES_NOT_EXIST)
        );
        assert!(store.messages_for("someUser").is_empty());
    }

    #[test]
    fn malformed_message_is_refused() {
        let (registry, _) = registry();
        let handler = registry.resolve("send_message").unwrap();
        let err = handler
            .call(&Args::new(vec![json!({"from": "a"}), json!("g")]))
            .unwrap_err();
        assert!(matches!(err, crate::service::operation::ProcedureError::BadArgument(_)));
    }
}
