use clap::{Parser as _, Subcommand};
use md_playground::{
    Alert, AlertSink, BlockKind, Config, DirStore, EquivalenceMode, Executor, FileStore,
    LocalRunner, Parser, RunState, Terminal, TracingAlerts, detect,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the documents
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Shell used to run code blocks, overriding the config
    #[arg(long, global = true)]
    shell: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists documents under the root
    List {
        #[arg(long)]
        json: bool,
    },
    /// Shows how each code block in a document would execute
    Detect {
        file: String,
        #[arg(long)]
        json: bool,
    },
    /// Re-serializes a document in normalized form
    Fmt {
        file: String,
        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Runs the executable code blocks of a document
    Run {
        file: String,
        /// Only run the block at this index
        #[arg(long)]
        block: Option<usize>,
        /// Also write annotated file blocks to their files
        #[arg(long)]
        save: bool,
    },
}

#[derive(Serialize)]
struct BlockReport {
    index: usize,
    #[serde(flatten)]
    detection: md_playground::Detection,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let alerts: Arc<dyn AlertSink> = Arc::new(TracingAlerts);
    let mut config = match &cli.config {
        Some(path) => Config::load_or_read_only(path, alerts.as_ref()),
        None => Config::default(),
    };
    if let Some(shell) = &cli.shell {
        config.shell = shell.clone();
    }
    let store = DirStore::new(&cli.root);

    let result = match &cli.command {
        Commands::List { json } => list_command(&store, *json).await,
        Commands::Detect { file, json } => detect_command(&store, file, *json).await,
        Commands::Fmt { file, write } => fmt_command(&store, &config, file, *write).await,
        Commands::Run { file, block, save } => {
            run_command(&cli, &store, &config, alerts, file, *block, *save).await
        }
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

type CommandResult = Result<ExitCode, String>;

async fn list_command(store: &DirStore, json: bool) -> CommandResult {
    let docs = store.list().await.map_err(|err| err.to_string())?;
    if json {
        let output = serde_json::json!({ "docs": docs });
        let text = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
        println!("{text}");
    } else {
        for doc in docs {
            println!("{}\t{}", doc.path, doc.title);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn detect_command(store: &DirStore, file: &str, json: bool) -> CommandResult {
    let text = store.load(file).await.map_err(|err| err.to_string())?;
    let doc = Parser::parse(&text);
    let reports: Vec<BlockReport> = doc
        .blocks()
        .iter()
        .enumerate()
        .filter(|(_, block)| block.kind == BlockKind::CodeBlock)
        .map(|(index, block)| BlockReport {
            index,
            detection: detect(block),
        })
        .collect();

    if json {
        let output = serde_json::json!({ "blocks": reports });
        let text = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
        println!("{text}");
    } else {
        for report in reports {
            let detection = &report.detection;
            println!(
                "{}\t{}\t{}\t{}",
                report.index,
                detection.language.map(|l| l.tag()).unwrap_or("-"),
                detection.filename.as_deref().unwrap_or("-"),
                if detection.executable { "run" } else { "save" },
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn fmt_command(store: &DirStore, config: &Config, file: &str, write: bool) -> CommandResult {
    let text = store.load(file).await.map_err(|err| err.to_string())?;
    let mut formatted = Parser::parse(&text).serialize(EquivalenceMode::Structural);
    formatted.push('\n');
    if !write {
        print!("{formatted}");
        return Ok(ExitCode::SUCCESS);
    }
    if !config.edit_enabled {
        return Err("editing is disabled".to_string());
    }
    if formatted != text {
        store
            .save(file, &formatted)
            .await
            .map_err(|err| err.to_string())?;
        println!("Formatted {file}");
    } else {
        println!("{file} is already formatted");
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_command(
    cli: &Cli,
    store: &DirStore,
    config: &Config,
    alerts: Arc<dyn AlertSink>,
    file: &str,
    only: Option<usize>,
    save: bool,
) -> CommandResult {
    let text = store.load(file).await.map_err(|err| err.to_string())?;
    let doc = Parser::parse(&text);
    if let Some(index) = only
        && doc
            .blocks()
            .get(index)
            .is_none_or(|block| block.kind != BlockKind::CodeBlock)
    {
        return Err(format!("block {index} is not a code block"));
    }

    let runner = LocalRunner::new(&cli.root).with_shell(config.shell.clone());
    let terminal = Terminal::new(config.scrollback_lines);
    let executor = Executor::new(Arc::new(runner), terminal.clone(), Arc::clone(&alerts));

    let mut failed = false;
    for (index, block) in doc.blocks().iter().enumerate() {
        if block.kind != BlockKind::CodeBlock || only.is_some_and(|only| only != index) {
            continue;
        }
        let detection = detect(block);
        let handle = if detection.executable {
            executor.run_code(block.text.clone())
        } else if let Some(filename) = detection.filename.as_deref().filter(|_| save) {
            executor.save_code(&block.text, filename)
        } else {
            alerts.alert(Alert::warning(format!(
                "block {index} skipped: not executable (use --save to write it)"
            )));
            continue;
        };

        let state = handle.wait().await;
        for line in terminal.lines() {
            println!("{line}");
        }
        terminal.clear();
        if let RunState::Failed(message) = state {
            eprintln!("block {index} failed: {message}");
            failed = true;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
