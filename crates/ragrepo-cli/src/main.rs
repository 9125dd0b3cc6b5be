//! ragrepo CLI.
//!
//! A thin command-line client over `ragrepo_core::Facade`, for local/manual
//! use without standing up the `ragrepo-service` HTTP surface. Every
//! subcommand drives the facade in-process -- it is a convenience wrapper,
//! not a second source of truth for indexing/retrieval behavior.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ragrepo_core::{Config, Facade};

/// ragrepo -- RAG question-answering over a public code-forge repository
#[derive(Parser, Debug)]
#[command(name = "ragrepo", version, about = "RAG question-answering over a public code-forge repository")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Log level.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build (or rebuild) the vector index for a repository.
    Index {
        /// `owner/repo` to index.
        owner_repo: String,

        /// Branch to index; defaults to the forge's default branch.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Ask a natural-language question about an indexed repository.
    ///
    /// Indexes the repository first if it has not been indexed yet.
    Query {
        /// `owner/repo` to query.
        owner_repo: String,

        /// The question to ask.
        question: String,

        /// Branch to query; defaults to the forge's default branch.
        #[arg(long)]
        branch: Option<String>,

        /// Number of files to narrow to in stage one.
        #[arg(long)]
        top_files: Option<usize>,

        /// Number of chunks to retain after merge-ranking.
        #[arg(long)]
        top_chunks: Option<usize>,
    },

    /// Summarize a repository's purpose and architecture.
    Summarize {
        /// `owner/repo` to summarize.
        owner_repo: String,

        /// A short user-supplied description to steer the summary.
        #[arg(long, default_value = "")]
        description: String,
    },
}

/// Split `"owner/repo"` into its two path components.
fn parse_owner_repo(s: &str) -> Result<(&str, &str)> {
    match s.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok((owner, repo)),
        _ => bail!("expected `owner/repo`, got `{s}`"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(&cli.log_level).init();

    let facade = Facade::new(Config::from_env()).context("failed to initialize engine")?;

    match cli.command {
        Commands::Index { owner_repo, branch } => {
            let (owner, repo) = parse_owner_repo(&owner_repo)?;
            let report = facade.build_embeddings(owner, repo, branch.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Query { owner_repo, question, branch, top_files, top_chunks } => {
            let (owner, repo) = parse_owner_repo(&owner_repo)?;
            let answer = facade.query(owner, repo, &question, branch.as_deref(), top_files, top_chunks).await?;
            if answer.degraded {
                eprintln!("warning: answer is degraded (no LLM credential configured, or the LLM call failed)");
            }
            println!("{}", answer.text);
            if !answer.references.is_empty() {
                println!("\nReferences:");
                for r in &answer.references {
                    println!("  [{}:{}-{}] {}", r.file_path, r.start_line, r.end_line, r.url);
                }
            }
        }
        Commands::Summarize { owner_repo, description } => {
            let (owner, repo) = parse_owner_repo(&owner_repo)?;
            let (summary, indexed, branch) = facade.summarize(owner, repo, &description).await?;
            println!("branch: {branch} (was already indexed: {indexed})\n");
            println!("{}\n\n{}", summary.summary, summary.project_paper);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_slash_repo() {
        assert_eq!(parse_owner_repo("octocat/hello-world").unwrap(), ("octocat", "hello-world"));
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(parse_owner_repo("octocat").is_err());
    }

    #[test]
    fn rejects_empty_components() {
        assert!(parse_owner_repo("/hello-world").is_err());
        assert!(parse_owner_repo("octocat/").is_err());
    }
}
