//! Headless BayLink chat client: log in, print the conversation list, then
//! stay connected and report incoming-message notices until interrupted.
//!
//! Server and credentials come from the saved config plus the environment
//! (`BAYLINK_SERVER`, `BAYLINK_EMAIL`, `BAYLINK_PASSWORD`).

use std::sync::Arc;

use baylink_chat::api::models::Credentials;
use baylink_chat::config::AppConfig;
use baylink_chat::directory::ConversationDirectory;
use baylink_chat::notify::NotificationBus;
use baylink_chat::session::{Session, SessionEvent, SessionGuard};
use baylink_chat::storage::ConversationCache;
use baylink_chat::utils::{normalize_url, push_url};
use baylink_chat::{ApiClient, ChatBackend};

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut config = AppConfig::load();
    if let Ok(server) = std::env::var("BAYLINK_SERVER") {
        config.base_url = normalize_url(&server);
    }
    if config.base_url.is_empty() {
        eprintln!("no server configured; set BAYLINK_SERVER");
        std::process::exit(2);
    }

    let (guard, mut session_events) = SessionGuard::new();
    let guard = Arc::new(guard);
    let client = Arc::new(ApiClient::new(&config.base_url, Arc::clone(&guard)));

    let user_id = match establish_session(&client, &guard, &mut config).await {
        Ok(user_id) => user_id,
        Err(e) => {
            eprintln!("login failed: {e}");
            std::process::exit(1);
        }
    };

    // The one place the expiry signal is consumed.
    tokio::spawn(async move {
        if let Some(SessionEvent::Expired) = session_events.recv().await {
            let mut config = AppConfig::load();
            config.clear_session();
            let _ = config.save();
            eprintln!("session expired, please log in again");
            std::process::exit(1);
        }
    });

    let backend: Arc<dyn ChatBackend> = client;
    let directory = match ConversationCache::open_default() {
        Ok(cache) => ConversationDirectory::with_cache(Arc::clone(&backend), cache),
        Err(e) => {
            log::warn!("conversation cache unavailable: {e}");
            ConversationDirectory::new(Arc::clone(&backend))
        }
    };

    let cached = directory.cached(200);
    if !cached.is_empty() {
        println!("{} cached conversation(s):", cached.len());
        for c in &cached {
            println!("  {}  {}", c.id, c.other_user.nickname);
        }
    }

    match directory.list().await {
        Ok(conversations) => {
            println!("{} conversation(s):", conversations.len());
            for c in &conversations {
                println!(
                    "  {}  {}  {}",
                    c.id,
                    c.other_user.nickname,
                    c.last_message.as_deref().unwrap_or("")
                );
            }
        }
        Err(e) if e.is_handled() => {}
        Err(e) => eprintln!("could not list conversations: {e}"),
    }

    let ws_url = match push_url(&config.base_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("bad server url: {e}");
            std::process::exit(2);
        }
    };
    let (bus, mut notices) = NotificationBus::connect(ws_url, user_id);

    println!("listening for new messages, Ctrl-C to quit");
    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Some(notice) => println!("new message in {}", notice.conversation_id),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    bus.disconnect();
}

/// Reuse the saved session if there is one, otherwise log in with the
/// credentials from the environment and persist the result.
async fn establish_session(
    client: &ApiClient,
    guard: &SessionGuard,
    config: &mut AppConfig,
) -> Result<String, baylink_chat::ApiError> {
    if let (Some(token), Some(user_id)) = (config.token.clone(), config.user_id.clone()) {
        guard.install(Session {
            user_id: user_id.clone(),
            token,
        });
        return Ok(user_id);
    }

    let credentials = Credentials {
        email: std::env::var("BAYLINK_EMAIL").unwrap_or_default(),
        password: std::env::var("BAYLINK_PASSWORD").unwrap_or_default(),
    };
    let user = client.login(&credentials).await?;
    config.token = user.token.clone();
    config.user_id = Some(user.id.clone());
    if let Err(e) = config.save() {
        log::warn!("could not persist session: {e}");
    }
    Ok(user.id)
}
