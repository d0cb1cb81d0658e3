use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kelime_rs::{Lang, LookupOutcome, Resolver, Store, WordAdmin, WordPair};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "kelime-rs", about = "Turkish/English dictionary", version)]
pub struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "KELIME_DATABASE", default_value = "kelime.db")]
    database: PathBuf,

    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web application.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, env = "KELIME_ADDR", default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public URL of the site; `https` URLs mark the session cookie `Secure`.
        #[arg(long, env = "KELIME_BASE_URL", default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// Page styling: tailwind or bootstrap.
        #[arg(long, env = "KELIME_THEME", default_value = "tailwind")]
        theme: kelime_rs::web::WebTheme,
        /// Session lifetime in days (1 to 3650).
        #[arg(
            long,
            env = "KELIME_SESSION_DAYS",
            default_value_t = 7,
            value_parser = clap::value_parser!(u64).range(1..=3650)
        )]
        session_days: u64,
    },
    /// Translate a word the same way the search page does.
    Lookup {
        query: String,
    },
    /// Manage dictionary entries.
    #[command(subcommand)]
    Word(WordCommand),
    /// Manage example sentences.
    #[command(subcommand)]
    Example(ExampleCommand),
}

#[derive(Subcommand, Debug)]
enum WordCommand {
    /// List every word pair, newest first.
    List,
    /// Add a word pair.
    Add { tr: String, en: String },
    /// Replace both sides of an existing pair.
    Edit { id: i64, tr: String, en: String },
    /// Delete a pair and its examples.
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ExampleCommand {
    /// Attach an example sentence to a word.
    Add {
        word_id: i64,
        /// Sentence language: tr or en.
        lang: Lang,
        sentence: String,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            base_url,
            theme,
            session_days,
        } => {
            kelime_rs::web::init_tracing();
            let config = kelime_rs::web::WebConfig {
                addr,
                theme,
                base_url,
                database: cli.database,
                session_ttl: std::time::Duration::from_secs(session_days * 24 * 60 * 60),
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(kelime_rs::web::serve(config))?;
            Ok(())
        }
        Command::Lookup { query } => handle_lookup(&Store::open(&cli.database)?, &query, cli.json),
        Command::Word(command) => {
            let admin = WordAdmin::new(Store::open(&cli.database)?);
            handle_word(&admin, command, cli.json)
        }
        Command::Example(ExampleCommand::Add {
            word_id,
            lang,
            sentence,
        }) => handle_example(&Store::open(&cli.database)?, word_id, lang, &sentence, cli.json),
    }
}

fn handle_lookup(store: &Store, query: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let outcome = Resolver::new(store.clone()).resolve(query)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    match outcome {
        LookupOutcome::EmptyQuery => return Err("Search query cannot be empty".into()),
        LookupOutcome::NoMatch {
            display_query,
            suggestions,
        } => {
            println!("No entry for \"{display_query}\".");
            if !suggestions.is_empty() {
                println!("Did you mean:");
                for s in suggestions {
                    println!("  {} / {}", s.tr, s.en);
                }
            }
        }
        LookupOutcome::Matched(t) => {
            println!(
                "{} ({} -> {}): {}",
                t.display_query,
                t.input_lang,
                t.input_lang.opposite(),
                t.translation
            );
            println!("Example: {}", t.example);
        }
    }
    Ok(())
}

fn handle_word(admin: &WordAdmin, command: WordCommand, as_json: bool) -> Result<(), Box<dyn Error>> {
    match command {
        WordCommand::List => {
            let words = admin.list()?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&words)?);
            } else {
                print_word_table(&words);
            }
        }
        WordCommand::Add { tr, en } => report_word("Added", &admin.create(&tr, &en)?, as_json)?,
        WordCommand::Edit { id, tr, en } => {
            report_word("Updated", &admin.update(id, &tr, &en)?, as_json)?
        }
        WordCommand::Delete { id } => {
            admin.delete(id)?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&json!({ "deleted": id }))?);
            } else {
                println!("Deleted word #{id}.");
            }
        }
    }
    Ok(())
}

fn handle_example(
    store: &Store,
    word_id: i64,
    lang: Lang,
    sentence: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let sentence = sentence.trim();
    if sentence.is_empty() {
        return Err("Example sentence cannot be empty".into());
    }
    if store.get_word(word_id)?.is_none() {
        return Err(format!("No word found for ID {word_id}").into());
    }
    let id = store.insert_example(word_id, lang, sentence)?;
    if as_json {
        let payload = json!({ "id": id, "word_id": word_id, "lang": lang, "sentence": sentence });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Added {lang} example #{id} to word #{word_id}.");
    }
    Ok(())
}

fn report_word(verb: &str, word: &WordPair, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(word)?);
    } else {
        println!("{verb} #{}: {} / {}", word.id, word.tr, word.en);
    }
    Ok(())
}

fn print_word_table(rows: &[WordPair]) {
    if rows.is_empty() {
        println!("No words yet.");
        return;
    }
    let width = rows
        .iter()
        .map(|w| w.tr.chars().count())
        .max()
        .unwrap_or(2)
        .max("TR".len());
    println!("{:>6}  {:<width$}  {}", "ID", "TR", "EN", width = width);
    println!("{:->6}  {:-<width$}  {}", "", "", "--", width = width);
    for word in rows {
        println!("{:>6}  {:<width$}  {}", word.id, word.tr, word.en, width = width);
    }
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;

    fn session_days(args: &[&str]) -> Result<u64, clap::Error> {
        let cli = Cli::try_parse_from(args.iter().copied())?;
        match cli.command {
            Command::Serve { session_days, .. } => Ok(session_days),
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn session_days_must_stay_in_range() {
        assert_eq!(
            session_days(&["kelime-rs", "serve", "--session-days", "30"]).unwrap(),
            30
        );
        assert!(session_days(&["kelime-rs", "serve", "--session-days", "0"]).is_err());
        assert!(
            session_days(&["kelime-rs", "serve", "--session-days", "213503982334601"]).is_err()
        );
    }
}
