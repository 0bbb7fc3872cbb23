use std::{
    path::PathBuf,
    process::ExitCode,
};

use clap::{
    Parser,
    Subcommand,
};
use tango::{
    anki::{
        AnkiConnect,
        MemoryStore,
        NoteStore,
        VOCAB_FIELDS,
    },
    core::{
        pipeline::{
            fill_existing_notes,
            sort_store,
        },
        ImportPipeline,
        ImportSummary,
        TangoError,
    },
    enrichment::{
        BunproClient,
        Enricher,
        NoEnrichment,
    },
    persistence::{
        get_app_data_dir,
        load_deck_sort_config,
        load_import_settings,
        ImportSettings,
        DECK_SORT_FILE,
        SETTINGS_FILE,
    },
    sources::{
        parse_file,
        parse_markdown_folder,
    },
};
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

/// Import Japanese vocabulary lists into Anki
#[derive(Parser)]
#[command(name = "tango")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Deck new notes are added to (overrides settings)
    #[arg(long, global = true)]
    deck: Option<String>,

    /// Note type new notes are created with (overrides settings)
    #[arg(long, global = true)]
    note_type: Option<String>,

    /// Look up every headword on Bunpro
    #[arg(long, global = true)]
    enrich: bool,

    /// Work against an empty in-memory collection instead of Anki
    #[arg(long, global = true)]
    dry_run: bool,

    /// Directory holding settings.json and deck_sort.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV or XLSX export
    ImportTable { file: PathBuf },

    /// Import every Vocabulary table from a folder of markdown notes
    ImportMarkdown { dir: PathBuf },

    /// Print the Bunpro entry for a headword as JSON
    Lookup { headword: String },

    /// Fill existing notes from Bunpro by their kanji field
    Fill {
        #[arg(required = true)]
        note_ids: Vec<u64>,
    },

    /// Move every card to the deck its tags route to
    SortDecks,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tango=debug" } else { "tango=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TangoError> {
    let config_dir = cli.config_dir.clone().unwrap_or_else(get_app_data_dir);
    let mut settings = load_import_settings(&config_dir.join(SETTINGS_FILE));
    if let Some(deck) = &cli.deck {
        settings.deck = deck.clone();
    }
    if let Some(note_type) = &cli.note_type {
        settings.note_type = note_type.clone();
    }
    settings.use_enrichment |= cli.enrich;

    let deck_sort = load_deck_sort_config(&config_dir.join(DECK_SORT_FILE))?;

    match cli.command {
        Commands::Lookup { headword } => lookup_command(&headword),
        Commands::ImportTable { file } => {
            let document = parse_file(&file)?;
            let mut store = open_store(&settings, cli.dry_run)?;
            let summary = pipeline(&settings)?.import_into(
                store.as_mut(),
                &settings,
                &[document],
                Some(&deck_sort),
            )?;
            print_summary(&summary);
            Ok(())
        }
        Commands::ImportMarkdown { dir } => {
            let folder = parse_markdown_folder(&dir)?;
            let mut store = open_store(&settings, cli.dry_run)?;
            let mut summary = pipeline(&settings)?.import_into(
                store.as_mut(),
                &settings,
                &folder.documents,
                Some(&deck_sort),
            )?;
            summary.add_parse_errors(&folder.failures);
            print_summary(&summary);
            Ok(())
        }
        Commands::Fill { note_ids } => {
            let mut store = open_store(&settings, cli.dry_run)?;
            let summary = fill_existing_notes(store.as_mut(), &BunproClient::new()?, &note_ids)?;
            println!("{}", summary);
            Ok(())
        }
        Commands::SortDecks => {
            let mut store = open_store(&settings, cli.dry_run)?;
            let moved = sort_store(store.as_mut(), &deck_sort.rule())?;
            println!("Moved {} cards", moved);
            Ok(())
        }
    }
}

fn open_store(settings: &ImportSettings, dry_run: bool) -> Result<Box<dyn NoteStore>, TangoError> {
    if dry_run {
        info!("Dry run: writing to an in-memory collection");
        return Ok(Box::new(MemoryStore::new().with_note_type(&settings.note_type, &VOCAB_FIELDS)));
    }

    let anki = AnkiConnect::new(&settings.anki_url)?;
    let version = anki.version()?;
    info!("Connected to AnkiConnect v{} at {}", version, settings.anki_url);
    Ok(Box::new(anki))
}

fn pipeline(settings: &ImportSettings) -> Result<ImportPipeline<'static>, TangoError> {
    let enricher: Box<dyn Enricher> = if settings.use_enrichment {
        Box::new(BunproClient::new()?)
    } else {
        Box::new(NoEnrichment)
    };
    Ok(ImportPipeline::new(enricher))
}

fn lookup_command(headword: &str) -> Result<(), TangoError> {
    match BunproClient::new()?.enrich(headword)? {
        Some(enrichment) => println!("{}", serde_json::to_string_pretty(&enrichment)?),
        None => println!("No entry for {}", headword),
    }
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!("{}", summary);
    for failure in &summary.parse_errors {
        println!("  {}", failure);
    }
}
