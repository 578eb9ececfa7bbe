use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::PasswordScheme;
use crate::feed::DEFAULT_COMMENT_DISPLAY_LIMIT;

#[derive(Parser, Debug)]
#[command(name = "redblack", about = "A local-first social feed")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account and sign in
    Register { username: String, password: String },
    /// Sign in to an existing account
    Login { username: String, password: String },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Publish an image or video
    Post {
        file: PathBuf,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Override the mime type guessed from the file extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// Like a post, or remove your like
    Like { post_id: String },
    /// Comment on a post
    Comment { post_id: String, text: String },
    /// Show the feed, newest first
    Feed {
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Write a post's media to a file
    ExportMedia { post_id: String, out: PathBuf },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub records_path: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub password_scheme: PasswordScheme,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub comment_display_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            comment_display_limit: DEFAULT_COMMENT_DISPLAY_LIMIT,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        Ok(config.with_data_dir(&data_dir))
    }

    /// Fill in any store path not set explicitly, relative to `data_dir`.
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        if self.storage.records_path.is_none() {
            self.storage.records_path = Some(data_dir.join("records.db"));
        }
        if self.storage.media_path.is_none() {
            self.storage.media_path = Some(data_dir.join("media.db"));
        }
        self
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        if let Some(ref dir) = cli.data_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".redblack"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    pub fn records_path(&self) -> &Path {
        self.storage
            .records_path
            .as_deref()
            .unwrap_or(Path::new("records.db"))
    }

    pub fn media_path(&self) -> &Path {
        self.storage
            .media_path
            .as_deref()
            .unwrap_or(Path::new("media.db"))
    }
}
