#![deny(dead_code)]
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

mod utils;

use chatsapp::{Chat, Config, ConversationEvent, Message, MessageKind, Session};

/// Command line arguments for the chatsapp demo session
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "chatsapp: a headless, in-memory chat session driven by mock data.",
    long_about = "Loads the mock chat list, optionally filters it, opens a conversation, \
    sends a message and prints the simulated receipts, replies and typing signals."
)]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Filter chats by participant name or last message
    #[arg(long, default_value = "")]
    query: String,

    /// Chats revealed per page
    #[arg(long, value_name = "N")]
    page_size: Option<usize>,

    /// Reveal this many pages of the chat list
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Chat to open, e.g. chat-1
    #[arg(long, value_name = "CHAT_ID")]
    open: Option<String>,

    /// Text message to send into the opened chat
    #[arg(long, value_name = "TEXT", requires = "open")]
    send: Option<String>,

    /// How long to watch conversation events after sending
    #[arg(long, default_value_t = 6)]
    wait_secs: u64,

    /// Seed for the random source
    #[arg(long)]
    seed: Option<u64>,

    /// Print chats and messages as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, value_name = "PATH", default_value = "chatsapp.log")]
    log_file: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = utils::setup_logging(args.log_file.to_str(), level) {
        // Not fatal: carry on without a logger
        eprintln!("Warning: {}", e);
    }
    info!("chatsapp starting up");

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    config.validate().context("validating configuration")?;

    println!("Loading chats...");
    let (mut session, mut events) = Session::start_mock(config)
        .await
        .context("starting session")?;
    print_banners(&session);

    let mut pager = session.pager();
    pager.set_query(&args.query);
    {
        let store = session.store().lock().await;
        let mut visible = pager.visible(&store);
        for _ in 1..args.pages {
            visible.extend(pager.load_more(&store));
        }
        print_chats(&visible, args.json)?;
        if pager.has_more(&store) {
            println!("... more chats available");
        }
    }

    if let Some(chat_id) = &args.open {
        if let Err(e) = session.engine_mut().open(chat_id).await {
            let e = session.surface(e);
            print_banners(&session);
            session.shutdown().await;
            return Err(e.into());
        }

        if let Some(text) = &args.send {
            match session
                .engine_mut()
                .send_message(chat_id, text, MessageKind::Text, None)
                .await
            {
                Ok(message) => info!("Accepted message {}", message.id),
                Err(e) => {
                    session.surface(e);
                    print_banners(&session);
                }
            }
        }

        watch_events(&mut events, Duration::from_secs(args.wait_secs)).await;
        print_timeline(&session.engine().timeline(chat_id).await, args.json)?;
    }

    session.shutdown().await;
    info!("chatsapp finished");
    Ok(())
}

async fn watch_events(events: &mut mpsc::Receiver<ConversationEvent>, window: Duration) {
    let deadline = Instant::now() + window;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        match event {
            ConversationEvent::MessageAppended(m) => {
                println!("+ [{}] {}: {}", m.chat_id, m.sender_name, m.content)
            }
            ConversationEvent::StatusChanged { message_id, status, .. } => {
                println!("~ {} is now {:?}", message_id, status)
            }
            ConversationEvent::Typing { user_id, typing, .. } => {
                if typing {
                    println!("… {} is typing", user_id);
                }
            }
            ConversationEvent::UnreadChanged { chat_id, unread_count } => {
                println!("# {} unread: {}", chat_id, unread_count)
            }
        }
    }
}

fn print_chats(chats: &[Chat], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(chats)?);
        return Ok(());
    }
    if chats.is_empty() {
        println!("No chats found");
    }
    for chat in chats {
        let unread = if chat.unread_count > 0 {
            format!(" ({})", chat.unread_count)
        } else {
            String::new()
        };
        println!(
            "{:<8} {:<18}{} {} | {}",
            chat.id,
            chat.participant.name,
            unread,
            chat.timestamp.format("%H:%M"),
            chat.last_message.content
        );
    }
    Ok(())
}

fn print_timeline(messages: &[Message], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }
    for m in messages {
        println!(
            "{} {:<16} {:?} {}",
            m.timestamp.format("%H:%M:%S"),
            m.sender_name,
            m.status,
            m.content
        );
    }
    Ok(())
}

fn print_banners(session: &Session) {
    for error in session.alerts().current() {
        eprintln!("[{}] {}", error.code, error.message);
    }
}
