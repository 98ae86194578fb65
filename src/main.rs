//! DictMaker CLI Entry Point

use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use dictmaker_lib::commands::{database, duplicates, entry, exchange, history, preferences};
use dictmaker_lib::error::CommandResult;
use dictmaker_lib::exchange::ExchangeFormat;
use dictmaker_lib::models::{EntryFields, SearchField, SearchHit};
use dictmaker_lib::settings::AppPaths;
use dictmaker_lib::state::AppState;

/// DictMaker: bilingual dictionary maker backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "dictmaker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Dictionary file to open (defaults to the last opened one)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new dictionary file
    New {
        path: String,
        /// Replace an existing file with the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Open an existing dictionary file
    Open { path: String },
    /// Add a headword
    Add {
        headword: String,
        /// Meaning (repeatable)
        #[arg(short, long = "meaning", required = true)]
        meanings: Vec<String>,
        #[arg(short, long, default_value = "")]
        variation: String,
        #[arg(short, long = "pos", default_value = "")]
        part_of_speech: String,
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Edit a headword (undoable within a shell session)
    Edit {
        id: i64,
        #[arg(long)]
        headword: Option<String>,
        /// Replace all meanings (repeatable)
        #[arg(short, long = "meaning")]
        meanings: Vec<String>,
        #[arg(short, long)]
        variation: Option<String>,
        #[arg(short, long = "pos")]
        part_of_speech: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Delete headwords by id, or every headword with an exact spelling
    Delete {
        ids: Vec<i64>,
        /// Delete by exact headword instead (not undoable)
        #[arg(long, conflicts_with = "ids")]
        headword: Option<String>,
    },
    /// Show one headword with its meanings
    Show { id: i64 },
    /// List headwords alphabetically
    List {
        /// Only headwords starting with this letter
        #[arg(short, long)]
        letter: Option<String>,
    },
    /// List distinct first letters
    Letters,
    /// Search headwords
    Search {
        #[arg(default_value = "")]
        term: String,
        /// all, headword, pos, variation, meaning
        #[arg(short, long, default_value = "all")]
        field: SearchField,
        /// Similarity match instead of substring
        #[arg(long)]
        fuzzy: bool,
    },
    /// Find duplicate headwords (case and whitespace insensitive)
    Duplicates {
        /// Merge meanings into the lowest id and remove the rest
        #[arg(long, conflicts_with = "delete")]
        merge: bool,
        /// Keep the lowest id and remove the rest with their meanings
        #[arg(long)]
        delete: bool,
    },
    /// Export every headword
    Export {
        path: String,
        /// csv or json (inferred from the extension when omitted)
        #[arg(short, long)]
        format: Option<ExchangeFormat>,
    },
    /// Import headwords as new entries
    Import {
        path: String,
        #[arg(short, long)]
        format: Option<ExchangeFormat>,
    },
    /// Show dictionary statistics
    Stats,
    /// Copy the dictionary into the backup directory
    Backup,
    /// Show recently opened dictionaries
    Recent,
    /// Show or change preferences
    Prefs {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Autosave interval in seconds (30-300)
        #[arg(long)]
        autosave: Option<u64>,
    },
    /// Undo the last edit or delete
    Undo,
    /// Redo the last undone command
    Redo,
    /// Show the undo history
    History,
    /// Interactive session (keeps undo history between commands)
    Shell,
}

/// 셸 한 줄 파서
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Dict(Command),
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

fn main() -> ExitCode {
    dictmaker_lib::load_env();
    dictmaker_lib::init_logging("warn");

    let args = Args::parse();
    let mut state = AppState::new(AppPaths::from_env());

    if let Err(e) = open_initial(&mut state, args.db.as_deref(), args.command.as_ref()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match args.command {
        Some(Command::Shell) | None => run_shell(&mut state, args.json),
        Some(command) => run(&mut state, command, args.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `--db`가 있으면 그것을, 없으면 마지막 사전을 연다. new/open은 직접 연다.
fn open_initial(state: &mut AppState, db: Option<&str>, command: Option<&Command>) -> CommandResult<()> {
    if matches!(command, Some(Command::New { .. } | Command::Open { .. })) {
        return Ok(());
    }

    match db {
        Some(path) => {
            database::load_database(state, database::LoadDatabaseArgs { path: path.to_string() })?;
        }
        None => {
            if let Err(e) = database::reopen_last(state) {
                tracing::warn!("Could not reopen last database: {}", e);
            }
        }
    }
    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> CommandResult<()> {
    if json {
        let text = serde_json::to_string_pretty(value)
            .map_err(dictmaker_lib::error::DictError::from)?;
        println!("{}", text);
    } else {
        human(value);
    }
    Ok(())
}

fn print_hits(hits: &Vec<SearchHit>) {
    if hits.is_empty() {
        println!("No entries.");
        return;
    }
    for hit in hits {
        println!("{:>6}  {}", hit.id, hit.headword);
    }
}

fn run(state: &mut AppState, command: Command, json: bool) -> CommandResult<()> {
    match command {
        Command::New { path, overwrite } => {
            let info = database::create_database(
                state,
                database::CreateDatabaseArgs {
                    path,
                    overwrite: Some(overwrite),
                },
            )?;
            emit(json, &info, |i| println!("Created {}", i.path))
        }
        Command::Open { path } => {
            let info = database::load_database(state, database::LoadDatabaseArgs { path })?;
            emit(json, &info, |i| {
                println!("Opened {} ({} headwords)", i.path, i.headword_count)
            })
        }
        Command::Add {
            headword,
            meanings,
            variation,
            part_of_speech,
            notes,
        } => {
            let form = entry::EditForm::new(EntryFields {
                headword,
                variation,
                part_of_speech,
                notes,
                meanings,
            });
            let outcome = entry::save_entry(state, &form)?;
            emit(json, &outcome, |o| println!("Added entry {}", o.entry_id))
        }
        Command::Edit {
            id,
            headword,
            meanings,
            variation,
            part_of_speech,
            notes,
        } => {
            let mut fields = entry::get_entry(state, id)?.fields();
            if let Some(headword) = headword {
                fields.headword = headword;
            }
            if !meanings.is_empty() {
                fields.meanings = meanings;
            }
            if let Some(variation) = variation {
                fields.variation = variation;
            }
            if let Some(part_of_speech) = part_of_speech {
                fields.part_of_speech = part_of_speech;
            }
            if let Some(notes) = notes {
                fields.notes = notes;
            }

            let outcome = entry::save_entry(state, &entry::EditForm::editing(id, fields))?;
            emit(json, &outcome, |o| println!("Updated entry {}", o.entry_id))
        }
        Command::Delete { ids, headword } => {
            let removed = match headword {
                Some(headword) => entry::delete_by_headword(state, &headword)?,
                None => entry::delete_entries(state, &ids)?,
            };
            emit(json, &removed, |n| println!("Deleted {} entries", n))
        }
        Command::Show { id } => {
            let found = entry::get_entry(state, id)?;
            emit(json, &found, |e| {
                println!("[{}] {}", e.id, e.headword);
                if !e.part_of_speech.is_empty() {
                    println!("  pos:       {}", e.part_of_speech);
                }
                if !e.variation.is_empty() {
                    println!("  variation: {}", e.variation);
                }
                if !e.notes.is_empty() {
                    println!("  notes:     {}", e.notes);
                }
                for (i, meaning) in e.meanings.iter().enumerate() {
                    println!("  {}. {}", i + 1, meaning);
                }
            })
        }
        Command::List { letter } => {
            let hits = match letter {
                Some(letter) => entry::filter_by_letter(state, &letter)?,
                None => entry::list_headwords(state)?,
            };
            emit(json, &hits, print_hits)
        }
        Command::Letters => {
            let letters = entry::first_letters(state)?;
            emit(json, &letters, |l| println!("{}", l.join(" ")))
        }
        Command::Search { term, field, fuzzy } => {
            let hits = entry::search_entries(state, entry::SearchArgs { term, field, fuzzy })?;
            emit(json, &hits, print_hits)
        }
        Command::Duplicates { merge, delete } => {
            if merge || delete {
                let result = if merge {
                    duplicates::merge_duplicates(state)?
                } else {
                    duplicates::delete_duplicates(state)?
                };
                return emit(json, &result, |r| {
                    println!(
                        "Removed {} entries, {} duplicate groups remain",
                        r.removed, r.remaining_groups
                    )
                });
            }

            let groups = duplicates::find_duplicates(state)?;
            emit(json, &groups, |groups| {
                if groups.is_empty() {
                    println!("No duplicates.");
                }
                for group in groups {
                    println!("{:>4}  {}", group.count, group.normalized_headword);
                }
            })
        }
        Command::Export { path, format } => {
            let summary = exchange::export_entries(state, exchange::ExchangeArgs { path, format })?;
            emit(json, &summary, |s| println!("Exported {} entries to {}", s.count, s.path))
        }
        Command::Import { path, format } => {
            let summary = exchange::import_entries(state, exchange::ExchangeArgs { path, format })?;
            emit(json, &summary, |s| println!("Imported {} entries from {}", s.count, s.path))
        }
        Command::Stats => {
            let stats = database::database_statistics(state)?;
            emit(json, &stats, |s| {
                println!("Headwords:     {}", s.headword_count);
                println!("Meanings:      {}", s.meaning_count);
                println!("Duplicates:    {}", s.duplicate_count);
                if let Some(file) = &s.database_file {
                    println!("File:          {}", file);
                }
                if let Some(size) = &s.file_size {
                    println!("Size:          {}", size);
                }
                if let Some(modified) = &s.last_modified {
                    println!("Last modified: {}", modified);
                }
            })
        }
        Command::Backup => {
            let path = database::backup_database(state).map(|p| p.display().to_string());
            emit(json, &path, |p| match p {
                Some(p) => println!("Backed up to {}", p),
                None => println!("Backup skipped (see log)"),
            })
        }
        Command::Recent => {
            let files = database::list_recent_files(state);
            emit(json, &files, |files| {
                for (i, file) in files.iter().enumerate() {
                    println!("{}. {}", i + 1, file);
                }
            })
        }
        Command::Prefs {
            theme,
            language,
            autosave,
        } => {
            if let Some(theme) = theme {
                preferences::set_theme(state, &theme)?;
            }
            if let Some(language) = language {
                preferences::set_language(state, &language)?;
            }
            if let Some(secs) = autosave {
                preferences::set_autosave_interval(state, secs)?;
            }
            let prefs = preferences::get_preferences(state);
            emit(json, &prefs, |p| {
                println!("theme:     {}", p.theme);
                println!("language:  {}", p.language);
                println!("autosave:  {}s", p.autosave_interval);
            })
        }
        Command::Undo => {
            let done = history::undo(state)?;
            emit(json, &done, |d| println!("{}", if *d { "Undone" } else { "Nothing to undo" }))
        }
        Command::Redo => {
            let done = history::redo(state)?;
            emit(json, &done, |d| println!("{}", if *d { "Redone" } else { "Nothing to redo" }))
        }
        Command::History => {
            let items = history::list_history(state);
            emit(json, &items, |items| {
                if items.is_empty() {
                    println!("History is empty.");
                }
                for item in items {
                    let marker = if item.applied { "*" } else { " " };
                    println!("{} {}", marker, item.description);
                }
            })
        }
        Command::Shell => {
            println!("Already in a shell.");
            Ok(())
        }
    }
}

fn run_shell(state: &mut AppState, json: bool) -> CommandResult<()> {
    match state.db_path() {
        Some(path) => println!("DictMaker shell, database: {}", path.display()),
        None => println!("DictMaker shell, no database loaded (use `new` or `open`)"),
    }
    println!("Type `help` for commands, `quit` to leave.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("dictmaker> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(dictmaker_lib::error::DictError::from)?;

        let words = match dictmaker_lib::utils::split_args(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Quit => break,
            ShellCommand::Dict(command) => {
                if let Err(e) = run(state, command, json || parsed.json) {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }
    Ok(())
}
