//! webapp-kit command-line entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use reqwest::Method;
use tracing::{debug, error};

use webapp_kit::{
    Error, Result,
    cli::{CensorKind, Cli, Command, FormatStyle, StoreCommand, ValidateRule},
    config::AppConfig,
    device::is_mobile_user_agent,
    i18n::MessageCatalog,
    json::{ParseOutcome, safe_parse},
    pipeline::{Pipeline, RequestOptions},
    setup_tracing,
    storage::{KeyValueStore, StorageKind, Store},
    text,
    transport::HttpTransport,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Censor { kind, value } => {
            let censored = match kind {
                CensorKind::Word => text::censor_word(&value),
                CensorKind::Phone => text::censor_phone(&value),
                CensorKind::Email => text::censor_email(&value),
                CensorKind::Name => text::censor_full_name(&value),
            };
            println!("{censored}");
            Ok(ExitCode::SUCCESS)
        }

        Command::Format { style, value, max } => {
            let formatted = match style {
                FormatStyle::Slug => text::slugify(&value),
                FormatStyle::Title => text::to_title_case(&value),
                FormatStyle::Snake => text::camel_to_snake(&value),
                FormatStyle::Camel => text::snake_to_camel(&value),
                FormatStyle::Capitalize => text::capitalize(&value),
                FormatStyle::Truncate => text::truncate(&value, max),
            };
            println!("{formatted}");
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate { rule, value } => {
            let valid = match rule {
                ValidateRule::Email => text::is_valid_email(&value),
                ValidateRule::Phone => text::is_valid_phone_number(&value),
                ValidateRule::Alpha => text::is_alphabetic(&value),
                ValidateRule::Alnum => text::is_alphanumeric(&value),
            };
            Ok(report(valid, "valid", "invalid"))
        }

        Command::Mobile { user_agent } => {
            Ok(report(is_mobile_user_agent(&user_agent), "mobile", "not mobile"))
        }

        Command::Message { key, lang, catalog } => {
            let mut messages = MessageCatalog::builtin();
            if let Some(path) = catalog {
                let extra = MessageCatalog::from_yaml_str(&std::fs::read_to_string(&path)?)?;
                for (language, entries) in extra.messages {
                    for (k, v) in entries {
                        messages.insert(language.clone(), k, v);
                    }
                }
            }
            // Language fallback only needs the config if no language was given
            let language = match lang {
                Some(l) => l,
                None => AppConfig::load(cli.config.as_deref())
                    .map(|c| c.default_language)
                    .unwrap_or_else(|_| messages.default_language.clone()),
            };
            println!("{}", messages.lookup(&key, &language));
            Ok(ExitCode::SUCCESS)
        }

        Command::Store(cmd) => run_store(cmd, cli.storage_path),

        Command::Request {
            target,
            method,
            body,
            headers,
        } => {
            let config = AppConfig::load(cli.config.as_deref())?;
            let store = Arc::new(Store::open_or_session(StorageKind::Durable, cli.storage_path));
            let transport = Arc::new(HttpTransport::new()?);
            let pipeline = Pipeline::from_config(&config, store, transport)?;
            debug!(pipeline = ?pipeline, "Pipeline ready");

            let method = method
                .to_uppercase()
                .parse::<Method>()
                .map_err(|e| Error::Config(format!("Invalid HTTP method '{method}': {e}")))?;
            let mut options = RequestOptions::new().method(method);
            if let Some(body) = body {
                options = options.body(serde_json::from_str(&body)?);
            }
            for header in headers {
                let (name, value) = header.split_once(':').ok_or_else(|| {
                    Error::Config(format!("Header '{header}' must look like 'Name: value'"))
                })?;
                options = options.header(name.trim(), value.trim());
            }

            let response = pipeline.request(&target, options).await?;
            eprintln!("✅ {}", response.status);
            print_outcome(&response.body)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Config => {
            let config = AppConfig::load(cli.config.as_deref())?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run storage management commands
fn run_store(cmd: StoreCommand, storage_path: Option<PathBuf>) -> Result<ExitCode> {
    let store = Store::open(cmd.kind()?, storage_path)?;

    match cmd {
        StoreCommand::Get { key, .. } => match store.get(&key) {
            Some(value) => {
                print_outcome(&value)?;
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("Key '{key}' not found");
                Ok(ExitCode::FAILURE)
            }
        },
        StoreCommand::Set { key, value, .. } => {
            match safe_parse(&value) {
                ParseOutcome::Parsed(json) => store.set_value(&key, &json),
                ParseOutcome::Unparsed(raw) => store.set(&key, &raw),
            }
            Ok(ExitCode::SUCCESS)
        }
        StoreCommand::Remove { key, .. } => {
            store.remove(&key);
            Ok(ExitCode::SUCCESS)
        }
        StoreCommand::Clear { .. } => {
            store.clear();
            Ok(ExitCode::SUCCESS)
        }
        StoreCommand::List { .. } => {
            for index in 0..store.count() {
                if let Some(key) = store.key_at(index) {
                    println!("{key}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_outcome(outcome: &ParseOutcome) -> Result<()> {
    match outcome {
        ParseOutcome::Parsed(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ParseOutcome::Unparsed(raw) => println!("{raw}"),
    }
    Ok(())
}

fn report(ok: bool, yes: &str, no: &str) -> ExitCode {
    if ok {
        println!("✅ {yes}");
        ExitCode::SUCCESS
    } else {
        println!("❌ {no}");
        ExitCode::FAILURE
    }
}
