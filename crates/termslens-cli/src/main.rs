mod analyze;
mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use termslens_ai::{DEFAULT_LIMIT, KnowledgeStore, RelevanceScorer, Retriever, ScoringRules};
use termslens_core::{DEFAULT_MAX_LENGTH, ReducerConfig};
use termslens_llm::GeminiClient;
use termslens_llm::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::analyze::{AnalysisOptions, AnalysisReport};

#[derive(Parser, Debug)]
#[command(name = "termslens", version, about = "Legal risk analysis for web terms and consents")]
struct Cli {
    /// Legal knowledge base (JSON array of clause records).
    #[arg(long, env = "TERMSLENS_KB", default_value = "data/law_kb.json", global = true)]
    kb: PathBuf,

    /// Clauses retrieved per terms block.
    #[arg(long, env = "TERMSLENS_LIMIT", default_value_t = DEFAULT_LIMIT, global = true)]
    limit: usize,

    /// Character bound applied to each terms block.
    #[arg(long, env = "TERMSLENS_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH, global = true)]
    max_length: usize,

    /// Replacement pattern-to-clause table (JSON).
    #[arg(long, env = "TERMSLENS_PATTERNS", global = true)]
    patterns: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze scraped terms blocks with the generative model.
    Analyze(AnalyzeArgs),
    /// Show the clauses most relevant to a text.
    Retrieve {
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the reduced form of a text file.
    Reduce {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the prompt for a terms file without calling the model.
    Prompt {
        #[arg(long)]
        terms: PathBuf,
    },
    /// Knowledge base maintenance.
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KbCommand {
    /// Strictly load the knowledge base and summarise it.
    Check,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// JSON array of terms blocks.
    #[arg(long)]
    terms: PathBuf,
    /// Page the terms were scraped from.
    #[arg(long)]
    url: Option<String>,
    /// Write the report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,
    #[arg(long, env = "TERMSLENS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "TERMSLENS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<ScoringRules> {
    let Some(path) = path else {
        return Ok(ScoringRules::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading pattern table {}", path.display()))?;
    ScoringRules::patterns_from_json(&raw)
        .with_context(|| format!("loading pattern table {}", path.display()))
}

async fn write_report(report: &AnalysisReport, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing report to {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("termslens v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let store = KnowledgeStore::from_path(cli.kb.clone()).install_global();
    let retriever = Retriever::new(
        store,
        RelevanceScorer::new(load_rules(cli.patterns.as_deref())?),
    );
    let options = AnalysisOptions {
        limit: cli.limit,
        reducer: ReducerConfig::with_max_length(cli.max_length),
    };

    match cli.command {
        Command::Analyze(args) => {
            let terms = analyze::read_terms(&args.terms).await?;
            let client = GeminiClient::new(args.base_url, args.model, args.api_key);
            match analyze::run_analysis(&retriever, &client, &options, &terms, args.url.clone())
                .await
            {
                Ok(report) => write_report(&report, args.out.as_deref()).await?,
                Err(err) => {
                    let report = AnalysisReport::failure(args.url, &terms, &err);
                    write_report(&report, args.out.as_deref()).await?;
                    return Err(err);
                }
            }
        }
        Command::Retrieve { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, None) => anyhow::bail!("either --text or --file is required"),
            };
            let text = options.reducer.reduce(&text).text;
            let hits = retriever.retrieve_scored(&text, options.limit).await;
            print!("{}", display::render_hits(retriever.scorer(), &text, &hits));
        }
        Command::Reduce { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            println!("{}", options.reducer.reduce(&text).text);
        }
        Command::Prompt { terms } => {
            let terms = analyze::read_terms(&terms).await?;
            let prepared = analyze::prepare_prompt(&retriever, &options, &terms).await;
            println!("{}", prepared.prompt);
        }
        Command::Kb {
            command: KbCommand::Check,
        } => {
            let clauses = store
                .try_load()
                .await
                .with_context(|| format!("checking knowledge base {}", store.source()))?;
            print!("{}", display::render_kb_summary(&clauses));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_args_parse() {
        let cli = Cli::try_parse_from([
            "termslens",
            "analyze",
            "--terms",
            "terms.json",
            "--url",
            "https://shop.example",
            "--api-key",
            "k",
            "--limit",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.limit, 3);
        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.terms, PathBuf::from("terms.json"));
                assert_eq!(args.url.as_deref(), Some("https://shop.example"));
                assert_eq!(args.api_key, "k");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn retrieve_needs_text_or_file() {
        assert!(Cli::try_parse_from(["termslens", "retrieve"]).is_err());
        assert!(
            Cli::try_parse_from(["termslens", "retrieve", "--text", "a", "--file", "b"]).is_err()
        );
        assert!(Cli::try_parse_from(["termslens", "retrieve", "--text", "환불"]).is_ok());
    }

    #[test]
    fn kb_check_parses() {
        let cli = Cli::try_parse_from(["termslens", "kb", "check", "--kb", "other.json"]).unwrap();
        assert_eq!(cli.kb, PathBuf::from("other.json"));
        assert!(matches!(
            cli.command,
            Command::Kb {
                command: KbCommand::Check
            }
        ));
    }

    #[test]
    fn pattern_table_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, r#"[{"pattern":"쿠키","clauseIds":["C1"]}]"#).unwrap();
        let rules = load_rules(Some(path.as_path())).unwrap();
        assert_eq!(rules.patterns.len(), 1);

        assert_eq!(load_rules(None).unwrap().patterns.len(), 5);
        assert!(load_rules(Some(dir.path().join("missing.json").as_path())).is_err());
    }
}
