//! kaflow-chat: headless driver for the KaFlow chat core.
//!
//! Prints transcripts as plain text; configuration comes from `KAFLOW_*`
//! environment variables with flag overrides.

use std::io;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kaflow_chat::chat_protocol::{SortOrder, ThreadsRequest};
use kaflow_chat::config::EnvConfig;
use kaflow_chat::logging::init_logging;
use kaflow_chat::{
    ChatApiClient, ChatSession, ContentItem, FinishReason, HistoryBackfill, Message, SessionUpdate,
};

#[derive(Parser)]
#[command(name = "kaflow-chat")]
#[command(about = "Stream KaFlow chat turns and inspect history from the terminal", long_about = None)]
struct Cli {
    /// Server root (overrides KAFLOW_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and stream the reply
    Send {
        prompt: String,

        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,

        /// Agent configuration id (overrides KAFLOW_CONFIG_ID)
        #[arg(long)]
        config_id: Option<i64>,
    },

    /// Print the stored history of a thread
    History {
        thread: String,

        #[arg(long, default_value = "10")]
        page_size: u32,
    },

    /// List available agent configurations
    Configs,

    /// List conversation threads
    Threads {
        #[arg(long)]
        username: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "10")]
        page_size: u32,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let env = EnvConfig::from_env();
    init_logging(&env.log_filter);

    let cli = Cli::parse();
    let mut api_config = env.api_config();
    if let Some(base_url) = cli.base_url {
        api_config = api_config.with_base_url(base_url);
    }
    let client = Arc::new(ChatApiClient::new(api_config).map_err(io::Error::other)?);

    match cli.command {
        Commands::Send {
            prompt,
            thread,
            config_id,
        } => {
            let mut session = ChatSession::new(client, config_id.unwrap_or(env.config_id));
            if let Some(username) = env.username.clone() {
                session = session.with_username(username);
            }
            if let Some(thread) = thread {
                session = session.with_thread_id(thread);
            }
            send(&mut session, &prompt).await?;
        }

        Commands::History { thread, page_size } => {
            let mut backfill = HistoryBackfill::new(thread, page_size);
            let messages = backfill
                .load_all(&client, None)
                .await
                .map_err(io::Error::other)?;
            for message in &messages {
                print_message(message);
            }
        }

        Commands::Configs => {
            let response = client.fetch_configs(None).await.map_err(io::Error::other)?;
            for config in response.configs {
                println!("{}\t{}\t{}", config.id, config.name, config.description);
            }
        }

        Commands::Threads {
            username,
            page,
            page_size,
        } => {
            let request = ThreadsRequest {
                username: username.or(env.username),
                page: page.max(1),
                page_size: page_size.max(1),
                order: SortOrder::Desc,
            };
            let response = client
                .fetch_threads(&request, None)
                .await
                .map_err(io::Error::other)?;
            println!("page {}/{} ({} threads)", response.page, response.total_pages, response.total);
            for thread in response.threads {
                println!("{}\t{}\t{}", thread.thread_id, thread.last_updated, thread.first_message);
            }
        }
    }

    Ok(())
}

async fn send(session: &mut ChatSession, prompt: &str) -> io::Result<()> {
    session.send(prompt).map_err(io::Error::other)?;
    eprintln!("thread: {}", session.thread_id());

    let Some(abort) = session.abort_handle() else {
        return Ok(());
    };
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let outcome = loop {
        match session.next_update().await {
            SessionUpdate::Failed(error) => break Err(io::Error::other(error)),
            SessionUpdate::Cancelled => {
                eprintln!("cancelled");
                break Ok(());
            }
            update if update.is_terminal() => break Ok(()),
            SessionUpdate::Malformed(error) => eprintln!("skipped: {error}"),
            _ => {}
        }
    };
    ctrl_c.abort();

    for message in session.messages() {
        print_message(message);
    }
    outcome
}

fn print_message(message: &Message) {
    let speaker = match (&message.agent, message.is_report) {
        (_, true) => "report".to_owned(),
        (Some(agent), false) => agent.clone(),
        (None, false) => message.role.as_str().to_owned(),
    };
    println!("[{speaker}]");
    for item in &message.content_items {
        match item {
            ContentItem::Text { content } => println!("{content}"),
            ContentItem::ToolCall { tool_call } => println!(
                "  -> {}({}) [{}] {}",
                tool_call.name,
                tool_call.args,
                tool_call.status.as_str(),
                tool_call.result.as_deref().unwrap_or_default()
            ),
        }
    }
    if let Some(reason) = message.finish_reason.filter(|reason| *reason != FinishReason::Stop) {
        println!("({})", reason.as_str());
    }
    println!();
}
