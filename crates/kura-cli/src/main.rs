//! kura command-line tool.
//!
//! Runs one filesystem operation per invocation against a disk directory or
//! a scratch in-memory tree.
//!
//! Usage:
//!   # Disk backend rooted at ./data
//!   kura --root ./data put notes/today.txt --file today.txt
//!   kura --root ./data ls --deep --dirs
//!
//!   # Backend and defaults from a settings file
//!   kura --config kura.toml stat notes/today.txt
//!
//! Logging goes to stderr; set `RUST_LOG=kura_kernel=debug` to trace calls.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, fmt};

use kura_kernel::vfs::ByteStream;
use kura_kernel::{BackendKind, FileSystem, Settings, VfsError};

const CHUNK_SIZE: usize = 64 * 1024;

/// Storage-agnostic file operations.
#[derive(Parser, Debug)]
#[command(name = "kura")]
#[command(about = "File operations over a kura filesystem")]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the disk backend rooted at this directory
    #[arg(long, conflicts_with = "memory")]
    root: Option<PathBuf>,

    /// Use a scratch in-memory tree
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exit 0 if a file exists at PATH, 1 otherwise
    Exists { path: String },
    /// Write a file to stdout
    Cat { path: String },
    /// Store stdin (or --file) at PATH
    Put {
        path: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Create a directory and its parents
    Mkdir { path: String },
    /// Remove a file
    Rm { path: String },
    /// Remove a directory recursively
    Rmdir { path: String },
    /// Move a file
    Mv { source: String, destination: String },
    /// Copy a file
    Cp { source: String, destination: String },
    /// List paths under a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
        /// Descend into sub-directories
        #[arg(long)]
        deep: bool,
        /// Include directory paths
        #[arg(long)]
        dirs: bool,
    },
    /// Show size, modification time and content type
    Stat { path: String },
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(root) = &args.root {
        settings.backend = BackendKind::Local;
        settings.root = Some(root.clone());
    } else if args.memory {
        settings.backend = BackendKind::Memory;
    }
    Ok(settings)
}

/// Chunk an async reader into a [`ByteStream`].
fn reader_stream<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        match reader.read(&mut buffer).await {
            Ok(0) => None,
            Ok(n) => {
                buffer.truncate(n);
                Some((Ok(buffer), Some(reader)))
            }
            Err(e) => Some((Err(VfsError::Io(e)), None)),
        }
    })
    .boxed()
}

async fn run(fs: &FileSystem, command: Command) -> Result<bool> {
    match command {
        Command::Exists { path } => return Ok(fs.file_exists(&path).await?),
        Command::Cat { path } => {
            let mut chunks = fs.read_stream(&path).await?;
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = chunks.try_next().await? {
                stdout.write_all(&chunk).await?;
            }
            stdout.flush().await?;
        }
        Command::Put { path, file } => {
            let content = match file {
                Some(file) => {
                    let handle = tokio::fs::File::open(&file)
                        .await
                        .with_context(|| format!("failed to open {}", file.display()))?;
                    reader_stream(handle)
                }
                None => reader_stream(tokio::io::stdin()),
            };
            fs.write_stream(&path, content, None).await?;
            tracing::info!(path = %path, "stored");
        }
        Command::Mkdir { path } => fs.create_directory(&path, None).await?,
        Command::Rm { path } => fs.delete(&path).await?,
        Command::Rmdir { path } => fs.delete_directory(&path).await?,
        Command::Mv {
            source,
            destination,
        } => fs.move_file(&source, &destination, None).await?,
        Command::Cp {
            source,
            destination,
        } => fs.copy(&source, &destination, None).await?,
        Command::Ls { path, deep, dirs } => {
            let mut entries = fs.list_contents(&path, deep, dirs);
            while let Some(entry) = entries.try_next().await? {
                println!("{}", entry);
            }
        }
        Command::Stat { path } => {
            let size = fs.file_size(&path).await?;
            let modified = fs
                .last_modified(&path)
                .await?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let mime = fs.mime_type(&path).await?;
            println!("path:     {}", path);
            println!("size:     {}", size);
            println!("modified: {}", modified);
            println!("mime:     {}", mime);
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(&args)?;
    tracing::debug!(backend = ?settings.backend, "settings resolved");

    let fs = settings
        .build_filesystem()
        .context("failed to build filesystem")?;

    if !run(&fs, args.command).await? {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_selects_local_backend() {
        let args = Args::parse_from(["kura", "--root", "/srv/data", "ls", "--deep"]);
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.backend, BackendKind::Local);
        assert_eq!(settings.root, Some(PathBuf::from("/srv/data")));
        assert!(matches!(
            args.command,
            Command::Ls {
                deep: true,
                dirs: false,
                ..
            }
        ));
    }

    #[test]
    fn test_root_conflicts_with_memory() {
        assert!(Args::try_parse_from(["kura", "--root", "x", "--memory", "ls"]).is_err());
    }

    #[tokio::test]
    async fn test_put_from_reader_and_list() {
        let fs = FileSystem::new(kura_kernel::VirtualTree::new());
        let reader: &'static [u8] = b"piped content";
        fs.write_stream("in/piped.txt", reader_stream(reader), None)
            .await
            .unwrap();

        assert_eq!(fs.read("in/piped.txt").await.unwrap(), b"piped content");
        assert!(run(&fs, Command::Exists { path: "in/piped.txt".into() }).await.unwrap());
        assert!(!run(&fs, Command::Exists { path: "in/other.txt".into() }).await.unwrap());
    }
}
