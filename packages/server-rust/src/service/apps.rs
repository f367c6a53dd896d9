//! Catalogue of deployable apps.
//!
//! Each app is a self-contained procedure set with its own stores. Apps reuse
//! procedure names with different contracts (`create_user` answers a
//! credential in `roles`, `"user created"` in `messenger`, and takes a
//! password in `twitter`), so a process hosts exactly one of them.

use std::fmt;
use std::sync::Arc;

use super::config::ServerConfig;
use super::credential::CredentialIssuer;
use super::domain::{admin, feed, fib, messaging, users, validators};
use super::registry::{ProcedureRegistry, RegistryError};

/// The apps a server can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AppKind {
    /// Token accounts: `create_user`, `delete_user`, `get_user`.
    Roles,
    /// Chat groups: `get_user`, `create_user`, `create_chat_group`,
    /// `send_message`, `get_my_messages`.
    Messenger,
    /// Password accounts with a follow feed: `create_user`, `sign_in`,
    /// `tweet`, `follow`, `get_tweets`.
    Twitter,
    /// Admin check: `get_admin`, `am_i_admin`.
    StatelessRoles,
    /// Webhook validators: `example_one`, `example_two`.
    Validator,
    /// Arithmetic: `try_fib`.
    Fib,
}

impl AppKind {
    pub const ALL: [AppKind; 6] = [
        Self::Roles,
        Self::Messenger,
        Self::Twitter,
        Self::StatelessRoles,
        Self::Validator,
        Self::Fib,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roles => "roles",
            Self::Messenger => "messenger",
            Self::Twitter => "twitter",
            Self::StatelessRoles => "stateless-roles",
            Self::Validator => "validator",
            Self::Fib => "fib",
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the registry for `app`, creating its stores, then hides the
/// procedures named in `config.private_procedures`.
///
/// # Errors
///
/// Returns `RegistryError` if two procedures of the app collide or a private
/// name matches nothing the app registers. Both are startup-fatal.
pub fn build_registry(app: AppKind, config: &ServerConfig) -> Result<ProcedureRegistry, RegistryError> {
    let issuer = Arc::new(CredentialIssuer::new(&config.signing_key));
    let mut registry = ProcedureRegistry::new();

    match app {
        AppKind::Roles => {
            let accounts = Arc::new(users::UserStore::new(issuer));
            users::register_token_accounts(&mut registry, &accounts)?;
            users::register_get_user(&mut registry, &accounts)?;
        }
        AppKind::Messenger => {
            let accounts = Arc::new(users::UserStore::new(issuer));
            users::register_named_accounts(&mut registry, &accounts)?;
            users::register_get_user(&mut registry, &accounts)?;
            let groups = Arc::new(messaging::MessagingStore::new());
            messaging::register(&mut registry, &groups, &accounts)?;
        }
        AppKind::Twitter => {
            let accounts = Arc::new(users::UserStore::new(issuer));
            users::register_password_accounts(&mut registry, &accounts)?;
            feed::register(&mut registry, &Arc::new(feed::FeedStore::new()), &accounts)?;
        }
        AppKind::StatelessRoles => {
            let store = Arc::new(admin::AdminStore::new(config.admin_password.clone(), &issuer)?);
            admin::register(&mut registry, &store)?;
        }
        AppKind::Validator => validators::register(&mut registry, &config.verify_token)?,
        AppKind::Fib => fib::register(&mut registry)?,
    }

    for name in &config.private_procedures {
        registry.make_private(name)?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::registry::Visibility;

    #[test]
    fn every_app_builds() {
        let config = ServerConfig::default();
        for app in AppKind::ALL {
            let registry = build_registry(app, &config).unwrap();
            assert!(!registry.is_empty(), "{app} registered nothing");
        }
    }

    #[test]
    fn apps_expose_their_procedures() {
        let config = ServerConfig::default();
        let names = |app| {
            build_registry(app, &config)
                .unwrap()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(AppKind::Roles), ["create_user", "delete_user", "get_user"]);
        assert_eq!(
            names(AppKind::Messenger),
            ["create_chat_group", "create_user", "get_my_messages", "get_user", "send_message"]
        );
        assert_eq!(
            names(AppKind::Twitter),
            ["create_user", "follow", "get_tweets", "sign_in", "tweet"]
        );
        assert_eq!(names(AppKind::StatelessRoles), ["am_i_admin", "get_admin"]);
        assert_eq!(names(AppKind::Validator), ["example_one", "example_two"]);
        assert_eq!(names(AppKind::Fib), ["try_fib"]);
    }

    #[test]
    fn configured_names_become_private() {
        let config = ServerConfig {
            private_procedures: vec!["get_user".to_string()],
            ..ServerConfig::default()
        };
        let registry = build_registry(AppKind::Roles, &config).unwrap();
        assert_eq!(registry.visibility("get_user"), Some(Visibility::Private));
        assert_eq!(registry.visibility("create_user"), Some(Visibility::Public));

        let err = build_registry(AppKind::Fib, &config).unwrap_err();
        assert!(matches!(err, RegistryError::Unknown { name } if name == "get_user"));
    }

    #[test]
    fn create_user_arity_differs_per_app() {
        let config = ServerConfig::default();
        let arity = |app| {
            build_registry(app, &config)
                .unwrap()
                .resolve("create_user")
                .unwrap()
                .arity()
        };
        assert_eq!(arity(AppKind::Roles), 1);
        assert_eq!(arity(AppKind::Messenger), 1);
        assert_eq!(arity(AppKind::Twitter), 2);
    }

    #[test]
    fn app_names_round_trip_through_clap() {
        use clap::ValueEnum;
        for app in AppKind::ALL {
            assert_eq!(AppKind::from_str(app.as_str(), false).unwrap(), app);
        }
    }
}
