//! Tweets and the follow graph behind `get_tweets`.
//!
//! Identities are user names from the [`UserStore`]; callers authenticate
//! with the credential `create_user`/`sign_in` handed out.

use std::collections::HashMap;
use std::sync::Arc;

use conduit_core::Reply;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::users::UserStore;
use super::{INVALID_CREDENTIALS, USER_DOES_NOT_EXIST};
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

#[derive(Debug, Default)]
struct Feeds {
    /// author -> bodies, oldest first
    tweets: HashMap<String, Vec<String>>,
    /// follower -> followees, in follow order
    follows: HashMap<String, Vec<String>>,
}

/// Tweets per author and the follow relation, behind one lock.
#[derive(Debug, Default)]
pub struct FeedStore {
    feeds: RwLock<Feeds>,
}

impl FeedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tweet(&self, author: &str, body: &str) {
        self.feeds
            .write()
            .tweets
            .entry(author.to_string())
            .or_default()
            .push(body.to_string());
    }

    /// Records that `follower` follows `followee`. Following twice is a no-op.
    /// Not symmetric.
    pub fn follow(&self, follower: &str, followee: &str) {
        let mut feeds = self.feeds.write();
        let followees = feeds.follows.entry(follower.to_string()).or_default();
        if !followees.iter().any(|f| f == followee) {
            followees.push(followee.to_string());
        }
    }

    /// Tweets of everyone `follower` follows, in follow order.
    #[must_use]
    pub fn timeline(&self, follower: &str) -> Vec<(String, Vec<String>)> {
        let feeds = self.feeds.read();
        feeds
            .follows
            .get(follower)
            .map(|followees| {
                followees
                    .iter()
                    .map(|f| (f.clone(), feeds.tweets.get(f).cloned().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn timeline_reply(timeline: Vec<(String, Vec<String>)>) -> Reply {
    let mut map = Map::with_capacity(timeline.len());
    for (author, tweets) in timeline {
        map.insert(
            author,
            Value::Array(tweets.into_iter().map(Value::String).collect()),
        );
    }
    Reply::Record(map)
}

/// `tweet(credential, body)`, `follow(credential, name)`, `get_tweets(credential)`.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register(
    registry: &mut ProcedureRegistry,
    feeds: &Arc<FeedStore>,
    users: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let (store, accounts) = (Arc::clone(feeds), Arc::clone(users));
    registry.register(
        "tweet",
        procedure(2, move |args| {
            let Some(author) = accounts.authenticate(args.get(0)?) else {
                return Ok(Reply::text(INVALID_CREDENTIALS));
            };
            store.tweet(&author.name, args.str(1)?);
            Ok(Reply::Unit)
        }),
    )?;

    let (store, accounts) = (Arc::clone(feeds), Arc::clone(users));
    registry.register(
        "follow",
        procedure(2, move |args| {
            let Some(follower) = accounts.authenticate(args.get(0)?) else {
                return Ok(Reply::text(INVALID_CREDENTIALS));
            };
            let followee = args.str(1)?;
            if !accounts.contains(followee) {
                return Ok(Reply::text(USER_DOES_NOT_EXIST));
            }
            store.follow(&follower.name, followee);
            Ok(Reply::Unit)
        }),
    )?;

    let (store, accounts) = (Arc::clone(feeds), Arc::clone(users));
    registry.register(
        "get_tweets",
        procedure(1, move |args| {
            let Some(reader) = accounts.authenticate(args.get(0)?) else {
                return Ok(Reply::text(INVALID_CREDENTIALS));
            };
            Ok(timeline_reply(store.timeline(&reader.name)))
        }),
    )
}
