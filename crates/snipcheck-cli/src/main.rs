//! snipcheck - output-prediction challenge tooling
//!
//! ## Commands
//!
//! - `function`: Print the helper function(s) a challenge shows to students
//! - `answers`: Print the output expressions an answer key lists values for
//! - `return-type`: Print the declared result type of a Java challenge
//! - `transform`: Print the instrumented script
//! - `run`: Execute a snippet and print the values it produces
//! - `verify`: Check challenge files against their answer keys
//! - `regenerate`: Execute many reference snippets concurrently

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use snipcheck_core::{
    execute_with_limits, expected_answers, extract_function, infer_return_type,
    output_expressions, regenerate_answers, transform, transform_with, verify, AdapterRegistry,
    Bindings, Challenge, Language, RecordingObserver, SnipcheckConfig, Snippet,
};

#[derive(Parser)]
#[command(name = "snipcheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Instrument, run and verify output-prediction code challenges", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file (TOML)
    #[arg(long, global = true, env = "SNIPCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the per-run timeout in milliseconds
    #[arg(long, global = true, env = "SNIPCHECK_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the function text that precedes the entry point
    Function {
        file: PathBuf,

        /// Snippet language (default: from the file extension)
        #[arg(short, long)]
        lang: Option<Language>,
    },

    /// Print the output expressions of the entry-point block
    Answers {
        file: PathBuf,

        #[arg(short, long)]
        lang: Option<Language>,
    },

    /// Print the declared return type of the first Java method
    ReturnType { file: PathBuf },

    /// Print the instrumented script
    Transform {
        file: PathBuf,

        #[arg(short, long)]
        lang: Option<Language>,

        /// Also list every rewritten line
        #[arg(long)]
        explain: bool,
    },

    /// Execute a snippet and print the collected values
    Run {
        file: PathBuf,

        #[arg(short, long)]
        lang: Option<Language>,

        /// Value visible to the script, as NAME=JSON (repeatable)
        #[arg(short, long = "binding", value_name = "NAME=JSON")]
        bindings: Vec<String>,
    },

    /// Verify challenge files against their answer keys
    Verify {
        #[arg(required = true)]
        challenges: Vec<PathBuf>,
    },

    /// Execute reference snippets concurrently and print their values
    Regenerate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        lang: Option<Language>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    snipcheck_core::init_tracing(cli.json, level);

    let mut config = match &cli.config {
        Some(path) => SnipcheckConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SnipcheckConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.execution.timeout_ms = timeout_ms;
    }
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Function { file, lang } => cmd_function(&file, lang),
        Commands::Answers { file, lang } => cmd_answers(&file, lang),
        Commands::ReturnType { file } => cmd_return_type(&file),
        Commands::Transform {
            file,
            lang,
            explain,
        } => cmd_transform(&file, lang, explain),
        Commands::Run {
            file,
            lang,
            bindings,
        } => cmd_run(&config, &file, lang, &bindings).await,
        Commands::Verify { challenges } => cmd_verify(&config, &challenges).await,
        Commands::Regenerate { files, lang } => cmd_regenerate(&config, &files, lang).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Language from the flag, else from the file extension.
fn resolve_language(path: &Path, lang: Option<Language>) -> Result<Language> {
    if let Some(lang) = lang {
        return Ok(lang);
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "java" => Ok(Language::Java),
        "js" | "mjs" | "cjs" => Ok(Language::JavaScript),
        "py" => Ok(Language::Python),
        _ => bail!(
            "Cannot infer language of {}; pass --lang",
            path.display()
        ),
    }
}

fn read_snippet(path: &Path, lang: Option<Language>) -> Result<Snippet> {
    let language = resolve_language(path, lang)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Snippet::new(id, language, &text))
}

fn parse_binding(raw: &str) -> Result<(String, Value)> {
    let (name, json) = raw
        .split_once('=')
        .with_context(|| format!("Binding `{raw}` is not NAME=JSON"))?;
    let value = serde_json::from_str(json)
        .with_context(|| format!("Binding `{name}` has invalid JSON"))?;
    Ok((name.trim().to_string(), value))
}

fn cmd_function(file: &Path, lang: Option<Language>) -> Result<()> {
    let snippet = read_snippet(file, lang)?;
    let function = extract_function(&snippet)?;
    print_json(&json!({ "snippet": snippet.id, "function": function }))
}

fn cmd_answers(file: &Path, lang: Option<Language>) -> Result<()> {
    let snippet = read_snippet(file, lang)?;
    let outputs = output_expressions(&snippet)?;
    print_json(&json!({ "snippet": snippet.id, "answers": outputs }))
}

fn cmd_return_type(file: &Path) -> Result<()> {
    let snippet = read_snippet(file, Some(Language::Java))?;
    let return_type = infer_return_type(&snippet)?;
    print_json(&json!({
        "snippet": snippet.id,
        "return_type": return_type.to_string(),
        "collection": return_type.is_collection(),
    }))
}

fn cmd_transform(file: &Path, lang: Option<Language>, explain: bool) -> Result<()> {
    let snippet = read_snippet(file, lang)?;
    if !explain {
        let script = transform(&snippet)?;
        return print_json(&script);
    }
    let observer = RecordingObserver::default();
    let script = transform_with(&snippet, &observer)?;
    print_json(&json!({ "script": script, "rewrites": observer.events() }))
}

async fn cmd_run(
    config: &SnipcheckConfig,
    file: &Path,
    lang: Option<Language>,
    raw_bindings: &[String],
) -> Result<()> {
    let snippet = read_snippet(file, lang)?;
    let bindings = raw_bindings
        .iter()
        .map(|raw| parse_binding(raw))
        .collect::<Result<Bindings>>()?;

    let script = transform(&snippet)?;
    let registry = AdapterRegistry::subprocess(&config.runtimes, &config.execution);
    let adapter = registry.adapter_for(snippet.language)?;
    let values = execute_with_limits(adapter.as_ref(), &script, &bindings, &config.execution)
        .await
        .with_context(|| format!("Failed to run {}", file.display()))?;

    print_json(&json!({ "snippet": snippet.id, "values": values }))
}

async fn cmd_verify(config: &SnipcheckConfig, paths: &[PathBuf]) -> Result<()> {
    let registry = AdapterRegistry::subprocess(&config.runtimes, &config.execution);
    let mut results = Vec::with_capacity(paths.len());
    let mut failed = 0;

    for path in paths {
        let challenge = Challenge::load(path)
            .with_context(|| format!("Failed to load challenge {}", path.display()))?;
        let adapter = registry.adapter_for(challenge.language)?;
        match verify(&challenge, adapter.as_ref(), &config.execution).await {
            Ok(report) => {
                info!(challenge = %challenge.id, "verified");
                results.push(json!({ "challenge": challenge.id, "passed": true, "report": report }));
            }
            Err(e) => {
                failed += 1;
                results.push(json!({
                    "challenge": challenge.id,
                    "passed": false,
                    "configuration_error": e.is_configuration_error(),
                    "error": e.to_string(),
                }));
            }
        }
    }

    print_json(&results)?;
    if failed > 0 {
        bail!("{failed} of {} challenge(s) failed verification", paths.len());
    }
    Ok(())
}

async fn cmd_regenerate(
    config: &SnipcheckConfig,
    files: &[PathBuf],
    lang: Option<Language>,
) -> Result<()> {
    let snippets = files
        .iter()
        .map(|f| read_snippet(f, lang))
        .collect::<Result<Vec<_>>>()?;
    let expected: Vec<Option<Vec<String>>> =
        snippets.iter().map(|s| expected_answers(s).ok()).collect();

    let registry = AdapterRegistry::subprocess(&config.runtimes, &config.execution);
    let results =
        regenerate_answers(snippets, &registry, &config.execution, config.max_concurrent).await;

    let mut failed = 0;
    let report: Vec<Value> = files
        .iter()
        .zip(results)
        .zip(expected)
        .map(|((file, result), answers)| match result {
            Ok(values) => json!({
                "file": file.display().to_string(),
                "answers": answers,
                "values": values,
            }),
            Err(e) => {
                failed += 1;
                json!({
                    "file": file.display().to_string(),
                    "error": e.to_string(),
                })
            }
        })
        .collect();

    print_json(&report)?;
    if failed > 0 {
        bail!("{failed} of {} snippet(s) failed to run", files.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_verify_with_globals() {
        let cli = Cli::try_parse_from([
            "snipcheck",
            "--json",
            "verify",
            "a.toml",
            "b.toml",
            "--timeout-ms",
            "250",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.timeout_ms, Some(250));
        match cli.command {
            Commands::Verify { challenges } => assert_eq!(challenges.len(), 2),
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn test_cli_parses_language_aliases() {
        let cli = Cli::try_parse_from(["snipcheck", "transform", "x.txt", "--lang", "py", "--explain"])
            .unwrap();
        match cli.command {
            Commands::Transform { lang, explain, .. } => {
                assert_eq!(lang, Some(Language::Python));
                assert!(explain);
            }
            _ => panic!("expected transform"),
        }
    }

    #[test]
    fn test_resolve_language_from_extension() {
        assert_eq!(
            resolve_language(Path::new("Compare.java"), None).unwrap(),
            Language::Java
        );
        assert_eq!(
            resolve_language(Path::new("a.mjs"), None).unwrap(),
            Language::JavaScript
        );
        assert!(resolve_language(Path::new("notes.txt"), None).is_err());
        assert_eq!(
            resolve_language(Path::new("notes.txt"), Some(Language::Python)).unwrap(),
            Language::Python
        );
    }

    #[test]
    fn test_parse_binding() {
        let (name, value) = parse_binding("limit=[1, 2]").unwrap();
        assert_eq!(name, "limit");
        assert_eq!(value, json!([1, 2]));
        assert!(parse_binding("novalue").is_err());
        assert!(parse_binding("x={").is_err());
    }
}
