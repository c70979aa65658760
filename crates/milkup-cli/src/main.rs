// SPDX-License-Identifier: AGPL-3.0-or-later
//! Milkup command-line host
//!
//! Imports Markdown into the document tree, renders trees back to Markdown
//! and checks round trips with a transformer registry assembled from TOML.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use milkup_core::{Document, Markdown, NodeKind, TextFormat, TreeNode};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "milkup", version, about = "Convert between Markdown and the Milkup document tree")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse Markdown and print the document tree as JSON
    Import {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
        /// Print an indented outline instead of JSON
        #[arg(long)]
        outline: bool,
    },
    /// Render a JSON document tree as Markdown
    Export {
        /// JSON file, or `-` for stdin
        input: PathBuf,
    },
    /// Import Markdown and print the re-exported text
    Roundtrip {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
        /// Fail when a second pass changes the output
        #[arg(long)]
        check: bool,
    },
    /// Print word and character counts
    Stats {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
    },
    /// List the active transformers in registration order
    Transformers,
}

#[derive(Debug, Serialize)]
struct Stats {
    blocks: usize,
    word_count: usize,
    char_count: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_tracing(&config.log.filter);
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let md = config.markdown()?;
    match cli.command {
        Command::Import { input, outline } => {
            let doc = md.parse(&read_input(&input)?);
            let tree = doc.to_tree();
            if outline {
                let mut out = String::new();
                write_outline(&tree, 0, &mut out);
                print!("{out}");
            } else {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            }
        }
        Command::Export { input } => {
            let text = read_input(&input)?;
            let tree: TreeNode =
                serde_json::from_str(&text).context("input is not a JSON document tree")?;
            let doc = Document::from_tree(&tree).context("invalid document tree")?;
            println!("{}", md.export(&doc));
        }
        Command::Roundtrip { input, check } => {
            let out = roundtrip(&md, &read_input(&input)?);
            if check && roundtrip(&md, &out) != out {
                bail!("export is not stable: a second pass changed the output");
            }
            println!("{out}");
        }
        Command::Stats { input } => {
            let doc = md.parse(&read_input(&input)?);
            let stats = Stats {
                blocks: doc.children(doc.root()).len(),
                word_count: doc.word_count(),
                char_count: doc.char_count(),
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Transformers => {
            for (index, transformer) in md.registry().iter().enumerate() {
                let trigger = transformer.trigger().map(String::from).unwrap_or_default();
                println!(
                    "{:>2}  {:<24} {:<18} {}",
                    index + 1,
                    transformer.name(),
                    transformer.kind().as_str(),
                    trigger
                );
            }
        }
    }
    Ok(())
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn roundtrip(md: &Markdown, text: &str) -> String {
    md.export(&md.parse(text))
}

fn format_flags(format: TextFormat) -> String {
    let flags = [
        (format.bold, "bold"),
        (format.italic, "italic"),
        (format.strikethrough, "strikethrough"),
        (format.code, "code"),
    ];
    flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Text { content, format } if format.is_plain() => format!("text {content:?}"),
        NodeKind::Text { content, format } => {
            format!("text {content:?} [{}]", format_flags(*format))
        }
        NodeKind::Heading { level } => format!("heading level={level}"),
        NodeKind::List { kind, depth, start } => {
            format!("list {kind:?} depth={depth} start={start}")
        }
        NodeKind::ListItem {
            checked: Some(checked),
        } => format!("list_item checked={checked}"),
        NodeKind::TableCell { header: true } => "table_cell header".to_string(),
        NodeKind::Link { url, .. } => format!("link {url}"),
        NodeKind::Image { url, .. } => format!("image {url}"),
        NodeKind::Embed { kind, payload } => format!("embed {kind:?} {payload}"),
        NodeKind::CodeBlock {
            language: Some(language),
            ..
        } => format!("code_block {language}"),
        NodeKind::BlockEquation { source } | NodeKind::InlineEquation { source } => {
            format!("{} {source:?}", kind.node_type())
        }
        other => other.node_type().to_string(),
    }
}

fn write_outline(tree: &TreeNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&label(&tree.kind));
    out.push('\n');
    for child in &tree.children {
        write_outline(child, depth + 1, out);
    }
}
