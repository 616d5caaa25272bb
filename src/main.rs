use autotranslate::mt::{MockEngine, MockMode};
use autotranslate::{AutoTranslator, Config, EditorForm, MemoryStore, RunOutcome, SaveEvent};
use clap::{Arg, ArgMatches, Command, value_parser};
use std::path::PathBuf;
use std::sync::Arc;

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .short('s')
        .help("Store document (JSON)")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

fn record_arg() -> Arg {
    Arg::new("record")
        .help("Id of the record")
        .value_parser(value_parser!(u64))
        .required(true)
        .index(1)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("autotranslate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate content records into every configured language")
        .subcommand_required(true)
        .subcommand(
            Command::new("translate")
                .about("Translate a pivot-language record, as if saved with \"translate now\"")
                .arg(record_arg())
                .arg(store_arg())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("Engine configuration (TOML)")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("mock")
                        .long("mock")
                        .short('m')
                        .help("Use the mock engine instead of a translation API")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("extract")
                .about("List the texts that would be sent for translation")
                .arg(record_arg())
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("import-fields")
                .about("Store a record's custom fields from a host field-object document")
                .arg(record_arg())
                .arg(store_arg())
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .short('f')
                        .help("Field objects (JSON array, or object keyed by field name)")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("translate", args)) => translate(args).await,
        Some(("extract", args)) => extract(args).await,
        Some(("import-fields", args)) => import_fields(args),
        _ => unreachable!("subcommand is required"),
    }
}

async fn translate(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let record = *args.get_one::<u64>("record").unwrap();
    let store_path = args.get_one::<PathBuf>("store").unwrap();
    let store = MemoryStore::load(store_path)?;

    let translator = if args.get_flag("mock") {
        AutoTranslator::with_engine(store, Arc::new(MockEngine::new(MockMode::Suffix)))
    } else {
        let config = match args.get_one::<PathBuf>("config") {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        AutoTranslator::new(store, config.with_env_overrides()?)
    };

    let outcome = translator
        .handle_save(SaveEvent::editor(record, EditorForm::translate_now()))
        .await;
    translator.store().save(store_path)?;

    match &outcome {
        RunOutcome::Succeeded(results) => {
            for result in results {
                println!(
                    "{} → record {} ({:?})",
                    result.language, result.target_id, result.action
                );
            }
            Ok(())
        }
        RunOutcome::Skipped(reason) => {
            println!("Skipped: {:?}", reason);
            Ok(())
        }
        RunOutcome::Failed { .. } => {
            let message = outcome.error_message().unwrap_or_default();
            eprintln!("{}", message);
            Err(message.into())
        }
    }
}

async fn extract(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let record = *args.get_one::<u64>("record").unwrap();
    let store = MemoryStore::load(args.get_one::<PathBuf>("store").unwrap())?;

    let translator = AutoTranslator::new(store, Config::default());
    let texts = translator.extract_record(record).await?;
    for (path, text) in texts.iter() {
        println!("{}\t{}", path, text);
    }
    Ok(())
}

fn import_fields(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let record = *args.get_one::<u64>("record").unwrap();
    let store_path = args.get_one::<PathBuf>("store").unwrap();
    let document = std::fs::read_to_string(args.get_one::<PathBuf>("fields").unwrap())?;

    let store = MemoryStore::load(store_path)?;
    let count = store.import_field_objects(record, &document)?;
    store.save(store_path)?;
    println!("Imported {} fields into record {}", count, record);
    Ok(())
}
