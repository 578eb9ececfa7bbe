use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use redblack::config::{Cli, Command, Config};
use redblack::error::{AppError, ErrorKind};
use redblack::feed::{Feed, MediaView};
use redblack::state::{AppState, MediaUpload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

/// The message shown for a failed command. Storage failures are logged in
/// full and shown generically.
fn describe(err: &anyhow::Error) -> String {
    let Some(app) = err.downcast_ref::<AppError>() else {
        tracing::error!("{:#}", err);
        return format!("Error: {:#}", err);
    };

    match app.kind() {
        ErrorKind::Storage => {
            tracing::error!("{}", app);
            "Could not read or write local data".to_string()
        }
        ErrorKind::Unauthenticated => format!(
            "{}. Sign in first with `redblack login <username> <password>`",
            app
        ),
        _ => app.to_string(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli)?;
    tracing::debug!(
        "Records: {}, media: {}",
        config.records_path().display(),
        config.media_path().display()
    );

    let mut state = AppState::open(&config)?;

    match cli.command {
        Command::Register { username, password } => {
            let user = state.register(&username, &password)?;
            println!("Registered and signed in as @{}", user.username);
        }
        Command::Login { username, password } => {
            let user = state.login(&username, &password)?;
            println!("Signed in as @{}", user.username);
        }
        Command::Logout => {
            state.logout();
            println!("Signed out");
        }
        Command::Whoami => match state.session() {
            Some(name) => println!("@{}", name),
            None => println!("Not signed in"),
        },
        Command::Post {
            file,
            description,
            mime,
        } => {
            let upload = read_upload(&file, mime)?;
            let post = state.create_post(Some(upload), &description).await?;
            println!("Published {}", post.id);
        }
        Command::Like { post_id } => {
            let post = state.toggle_like(&post_id)?;
            let liked = state
                .session()
                .map(|name| post.is_liked_by(name))
                .unwrap_or(false);
            println!(
                "{} {} ({} likes)",
                if liked { "Liked" } else { "Unliked" },
                post.id,
                post.likes.len()
            );
        }
        Command::Comment { post_id, text } => {
            let comment = state.add_comment(&post_id, &text)?;
            println!("Commented {}", comment.id);
        }
        Command::Feed { query } => {
            let feed = state.build_feed(&query).await?;
            print_feed(&feed);
            state.release_media();
        }
        Command::ExportMedia { post_id, out } => match state.post_media(&post_id).await? {
            Some(blob) => {
                tokio::fs::write(&out, &blob.bytes).await?;
                println!(
                    "Wrote {} bytes ({}) to {}",
                    blob.bytes.len(),
                    blob.mime,
                    out.display()
                );
            }
            None => anyhow::bail!("Media for {} is no longer available", post_id),
        },
    }

    Ok(())
}

fn read_upload(file: &Path, mime: Option<String>) -> anyhow::Result<MediaUpload> {
    let bytes = std::fs::read(file)?;
    let mime = mime.unwrap_or_else(|| {
        mime_guess::from_path(file)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    Ok(MediaUpload::new(mime, bytes))
}

fn print_feed(feed: &Feed) {
    if feed.is_empty() {
        println!("No posts yet.");
        return;
    }

    for post in &feed.posts {
        println!("{}  @{}  {}", post.id, post.author, post.created_label);
        if !post.description.is_empty() {
            println!("  {}", post.description);
        }
        match &post.media {
            MediaView::Available(handle) => println!(
                "  [{} {} {} bytes]",
                post.media_kind.as_str(),
                handle.mime,
                handle.size
            ),
            MediaView::Unavailable => println!("  [media unavailable]"),
        }
        println!(
            "  {} likes{}",
            post.like_count,
            if post.liked { " (you)" } else { "" }
        );
        for comment in &post.comments {
            println!(
                "    @{}: {}  {}",
                comment.user, comment.text, comment.created_label
            );
        }
        if post.more_comments {
            println!(
                "    ... showing {} of {} comments",
                post.comments.len(),
                post.comment_count
            );
        }
        println!();
    }
}
