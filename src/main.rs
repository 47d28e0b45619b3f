use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forgechat::client::{ConfirmOutcome, DeleteKind, DeleteTarget};
use forgechat::{Client, Config};

#[derive(Parser)]
#[command(name = "forgechat")]
#[command(author, version, about = "Terminal client for the MemoryForge RAG chat service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session
    Login {
        username: String,
    },

    /// Create an account and log in
    Register {
        username: String,
        /// Optional email address
        #[arg(long)]
        email: Option<String>,
    },

    /// Clear the local session (remote invalidation is best-effort)
    Logout,

    /// Show the active session
    Whoami,

    /// List chat threads, most recently active first
    Chats,

    /// Create a new chat thread
    NewChat {
        /// Title; defaults to the current date
        title: Option<String>,
    },

    /// Delete a chat thread
    DeleteChat {
        chat_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show the message history of a chat (most recent chat by default)
    Messages {
        chat_id: Option<String>,
    },

    /// Send a message and print the reply
    Send {
        content: String,
        /// Target chat; defaults to the most recent
        #[arg(long)]
        chat: Option<String>,
        /// Ground the answer in uploaded documents
        #[arg(long)]
        rag: bool,
    },

    /// Edit one of your own messages
    EditMessage {
        chat_id: String,
        message_id: String,
        content: String,
    },

    /// Delete a message
    DeleteMessage {
        chat_id: String,
        message_id: String,
        #[arg(long)]
        yes: bool,
    },

    /// Full-text search across all your messages
    Search {
        query: String,
    },

    /// List uploaded documents
    Docs,

    /// Upload a .txt or .md document (up to 5 MiB)
    Upload {
        path: PathBuf,
    },

    /// Delete an uploaded document
    DeleteDoc {
        document_id: String,
        #[arg(long)]
        yes: bool,
    },

    /// Show your profile
    Profile,

    /// Change your password
    Passwd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("forgechat=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    let data_dir = Config::data_dir()?;
    let client = Client::new(&config, &data_dir)?;

    let result = run(&cli.command, &client).await;
    print_notices(&client);
    result
}

async fn run(command: &Commands, client: &Client) -> Result<()> {
    match command {
        Commands::Login { username } => {
            let password = prompt_hidden("Password: ")?;
            let session = client.session.login(username, &password).await?;
            println!("Logged in as {}", session.username);
        }

        Commands::Register { username, email } => {
            let password = prompt_hidden("Password: ")?;
            let confirm = prompt_hidden("Confirm password: ")?;
            let session = client
                .session
                .register(username, &password, &confirm, email.as_deref())
                .await?;
            println!("Registered and logged in as {}", session.username);
        }

        Commands::Logout => {
            // Bounded wait so the remote invalidation can leave before
            // the process exits; local state is already cleared.
            if let Some(task) = client.session.logout() {
                let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
            }
            println!("Logged out.");
        }

        Commands::Whoami => match client.session.current() {
            Some(session) => println!("{} ({})", session.username, session.user_id),
            None => println!("Not logged in."),
        },

        Commands::Chats => {
            let chats = client.chats.refresh().await?;
            if chats.is_empty() {
                println!("No chats yet. Create one!");
            }
            for chat in chats {
                println!(
                    "{}  {}  ({} messages)",
                    chat.chat_id, chat.title, chat.message_count
                );
            }
        }

        Commands::NewChat { title } => {
            let chat_id = client.chats.create(title.as_deref()).await?;
            println!("Created chat {chat_id}");
        }

        Commands::DeleteChat { chat_id, yes } => {
            client.chats.refresh().await?;
            let name = client
                .state
                .chat_title(chat_id)
                .unwrap_or_else(|| chat_id.clone());
            confirm_delete(
                client,
                DeleteTarget::new(DeleteKind::Chat, chat_id, name),
                *yes,
            )
            .await?;
        }

        Commands::Messages { chat_id } => {
            let chat_id = resolve_chat(client, chat_id.as_deref()).await?;
            client.messages.load(&chat_id).await?;
            print_messages(client);
        }

        Commands::Send { content, chat, rag } => {
            let chat_id = resolve_chat(client, chat.as_deref()).await?;
            client.messages.load(&chat_id).await?;
            client.state.set_draft(content.clone());
            if client.messages.send(*rag).await? {
                // The reply arrives through the authoritative reload
                if let Some(last) = client.state.messages().last() {
                    if !last.is_user_message {
                        println!("{}", last.content);
                    }
                }
            }
        }

        Commands::EditMessage {
            chat_id,
            message_id,
            content,
        } => {
            client.messages.load(chat_id).await?;
            client.messages.edit(message_id, content).await?;
            println!("Message edited.");
        }

        Commands::DeleteMessage {
            chat_id,
            message_id,
            yes,
        } => {
            client.messages.load(chat_id).await?;
            confirm_delete(
                client,
                DeleteTarget::new(DeleteKind::Message, message_id, message_id),
                *yes,
            )
            .await?;
        }

        Commands::Search { query } => {
            client.messages.search(query).await?;
            let results = client.state.visible_messages();
            if results.is_empty() {
                println!("No matches.");
            }
            for message in results {
                let who = if message.is_user_message { "you" } else { "ai" };
                println!("[{who}] {}", message.content);
            }
            client.messages.clear_search();
        }

        Commands::Docs => {
            let documents = client.documents.refresh().await?;
            if documents.is_empty() {
                println!("No documents uploaded.");
            }
            for doc in documents {
                println!(
                    "{}  {}  ({} chunks, {} bytes)",
                    doc.document_id, doc.filename, doc.chunk_count, doc.file_size
                );
            }
        }

        Commands::Upload { path } => {
            let uploaded = client.documents.upload(path).await?;
            println!(
                "Uploaded {} as {} ({} chunks)",
                path.display(),
                uploaded.document_id,
                uploaded.chunk_count
            );
        }

        Commands::DeleteDoc { document_id, yes } => {
            client.documents.refresh().await?;
            let name = client
                .state
                .document_name(document_id)
                .unwrap_or_else(|| document_id.clone());
            confirm_delete(
                client,
                DeleteTarget::new(DeleteKind::Document, document_id, name),
                *yes,
            )
            .await?;
        }

        Commands::Profile => {
            let profile = client.profile.fetch().await?;
            println!("Username: {}", profile.username);
            if let Some(email) = profile.email {
                println!("Email:    {email}");
            }
        }

        Commands::Passwd => {
            let current = prompt_hidden("Current password: ")?;
            let new = prompt_hidden("New password: ")?;
            let confirm = prompt_hidden("Confirm new password: ")?;
            client.profile.change_password(&current, &new, &confirm).await?;
            println!("Password changed.");
        }
    }
    Ok(())
}

/// Pick the chat to operate on: explicit id, or the auto-selected most
/// recent chat after a refresh.
async fn resolve_chat(client: &Client, chat_id: Option<&str>) -> Result<String> {
    if let Some(id) = chat_id {
        return Ok(id.to_string());
    }
    client.chats.refresh().await?;
    client
        .state
        .selected_chat()
        .context("No chats yet; create one with `forgechat new-chat`")
}

async fn confirm_delete(client: &Client, target: DeleteTarget, yes: bool) -> Result<()> {
    let name = target.name.clone();
    if !client.confirm.request(target) {
        bail!("Another delete is already pending");
    }

    if !yes {
        let answer = prompt(&format!("Delete \"{name}\"? [y/N] "))?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            client.confirm.cancel();
            println!("Cancelled.");
            return Ok(());
        }
    }

    match client.confirm.confirm().await {
        ConfirmOutcome::Deleted => Ok(()),
        ConfirmOutcome::Failed => bail!("Delete failed"),
        ConfirmOutcome::Ignored => bail!("Nothing to confirm"),
    }
}

fn print_messages(client: &Client) {
    let messages = client.state.visible_messages();
    if messages.is_empty() {
        println!("Start a conversation - send a message to begin.");
        return;
    }
    for message in messages {
        let who = if message.is_user_message { "You" } else { "AI" };
        let edited = if message.is_edited { " (edited)" } else { "" };
        println!("{who}{edited}: {}", message.content);
    }
}

fn print_notices(client: &Client) {
    for notice in client.state.active_notices() {
        eprintln!("{}", notice.message);
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn prompt_hidden(message: &str) -> Result<String> {
    Ok(rpassword::prompt_password(message)?)
}
