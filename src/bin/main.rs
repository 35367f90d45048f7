use crossterm::style::Stylize;
use spell_core::persistence::FileWordStore;
use spell_core::{GenerationManager, IngestionPipeline, SpellConfig, SpellError, Verbosity};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const DICTIONARY_PATH: &str = "user_dictionary.bin";

struct Args {
    dictionary: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut dictionary = PathBuf::from(DICTIONARY_PATH);
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dictionary" | "--config" if i + 1 >= args.len() => {
                anyhow::bail!("{} needs a value", args[i]);
            }
            "--dictionary" => {
                dictionary = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--config" => {
                config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            other => {
                anyhow::bail!("Usage: {} [--dictionary <file>] [--config <spell.toml>] (got '{}')", args[0], other);
            }
        }
    }
    Ok(Args { dictionary, config })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => SpellConfig::load(path)?,
        None => SpellConfig::default(),
    };

    let store = Arc::new(FileWordStore::open(&args.dictionary)?);
    let manager = Arc::new(GenerationManager::new(store.clone(), config)?);
    manager.initialize().await?;
    if let Some(every) = manager.config().reload_interval() {
        manager.spawn_periodic_reload(every);
    }
    let pipeline = IngestionPipeline::for_manager(store, manager.clone());

    println!("{}", "Spell engine. Type 'help' for commands, 'exit' to quit.".bold());
    println!("---------------------------------------------------------------");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = parts.split_first() else {
            continue;
        };

        match command {
            "exit" => break,
            "help" => print_help(),
            "check" => {
                for word in rest {
                    match manager.contains(word) {
                        Ok(true) => println!("{} {}", "possibly present:".green(), word),
                        Ok(false) => println!("{} {}", "definitely absent:".red(), word),
                        Err(e) => println!("{} {}", "error:".red(), e),
                    }
                }
            }
            "suggest" => {
                let Some(word) = rest.first() else {
                    println!("usage: suggest <word> [distance] [top|closest|all]");
                    continue;
                };
                let distance = rest
                    .get(1)
                    .and_then(|d| d.parse::<i64>().ok())
                    .unwrap_or(manager.config().max_edit_distance as i64);
                let verbosity = match rest.get(2).copied() {
                    Some("top") => Verbosity::Top,
                    Some("closest") => Verbosity::Closest,
                    _ => Verbosity::All,
                };
                match manager.suggest(word, distance, verbosity) {
                    Ok(suggestions) if suggestions.is_empty() => println!("No suggestions found."),
                    Ok(suggestions) => {
                        for (i, s) in suggestions.iter().enumerate() {
                            println!("  :{}: {} (distance: {}, frequency: {})", i + 1, s.word, s.distance, s.frequency);
                        }
                    }
                    Err(e) => println!("{} {}", "error:".red(), e),
                }
            }
            "unknown" => match manager.filter_unknown(rest) {
                Ok(words) => println!("{}", serde_json::to_string(&words)?),
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            "add" => match pipeline.ingest_batch(rest, None).await {
                Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                Err(SpellError::PartialIngestionFailure { failed, summary }) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    for f in failed {
                        println!("{} {} ({})", "failed:".red(), f.word, f.reason);
                    }
                }
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            "remove" => match pipeline.remove_words(rest).await {
                Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            "reload" => match manager.reload().await {
                Ok(outcome) if outcome.triggered() => println!("Reloaded."),
                Ok(_) => println!("Reload already in progress."),
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            "stats" => match manager.stats() {
                Ok(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
    }

    println!("Dictionary kept at '{}'", args.dictionary.display());
    Ok(())
}

fn print_help() {
    println!("  check <word>...                          membership test");
    println!("  suggest <word> [distance] [top|closest|all]");
    println!("  unknown <word>...                        words definitely not in the dictionary");
    println!("  add <word>...                            ingest words and reload");
    println!("  remove <word>...                         delete words and reload");
    println!("  reload | stats | exit");
}
