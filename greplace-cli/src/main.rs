use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use greplace::{FileMatch, SearchConfig, SearchEngine, SearchObserver, SearchParams};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// Pattern to search for
    pattern: String,

    /// Root directory to search in
    #[arg(short = 'd', long, default_value = ".")]
    root: PathBuf,

    /// Treat the pattern as literal text instead of a regular expression
    #[arg(short = 'F', long)]
    fixed_string: bool,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Match whole words only
    #[arg(short = 'w', long)]
    whole_words: bool,

    /// Let '.' match line terminators
    #[arg(long)]
    dot_all: bool,

    /// Anchor '^' and '$' at line boundaries
    #[arg(short = 'm', long)]
    multi_line: bool,

    /// Regex matched against directory names to skip
    #[arg(short = 'x', long)]
    exclude_dirs: Option<String>,

    /// File name filter: '|'-separated wildcards, '-' prefix excludes
    #[arg(short = 'f', long)]
    include_files: Option<String>,

    /// Interpret the file name filter as a regex
    #[arg(long)]
    include_files_regex: bool,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recurse: bool,

    /// Also search files detected as binary, byte-by-byte
    #[arg(short = 'b', long)]
    binary: bool,

    /// Configuration file to load before applying CLI flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a pattern in files
    Search(Box<CliSearchConfig>),

    /// Replace a pattern in files
    Replace {
        #[command(flatten)]
        search: Box<CliSearchConfig>,

        /// Text to replace matches with (may be empty to delete them)
        #[arg(short = 'r', long)]
        replacement: String,

        /// Do not write .bak copies before modifying files
        #[arg(long)]
        no_backup: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(config) => {
            let config = resolve_config(*config, None, true)?;
            run(&config, false)
        }
        Commands::Replace {
            search,
            replacement,
            no_backup,
        } => {
            let config = resolve_config(*search, Some(replacement), !no_backup)?;
            run(&config, true)
        }
    }
}

/// Builds the effective configuration: config file values first (custom path,
/// then the default locations), CLI flags on top.
fn resolve_config(
    cli: CliSearchConfig,
    replace_text: Option<String>,
    create_backups: bool,
) -> Result<SearchConfig> {
    let cli_config = SearchConfig {
        pattern: cli.pattern,
        root_path: cli.root,
        replace_text,
        regex: !cli.fixed_string,
        ignore_case: cli.ignore_case,
        whole_words: cli.whole_words,
        dot_all: cli.dot_all,
        multi_line: cli.multi_line,
        exclude_dirs: cli.exclude_dirs,
        include_files: cli.include_files,
        include_files_regex: cli.include_files_regex,
        recurse: !cli.no_recurse,
        include_binary: cli.binary,
        create_backups,
        log_level: cli.log_level,
    };

    let config = match cli.config {
        Some(path) => SearchConfig::load_from(Some(&path))
            .map_err(|e| anyhow!("failed to load config {}: {}", path.display(), e))?
            .merge_with_cli(cli_config),
        // Default locations are optional; without them the CLI flags stand
        // alone.
        None => match SearchConfig::load() {
            Ok(file_config) => file_config.merge_with_cli(cli_config),
            Err(_) => cli_config,
        },
    };
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct ConsoleObserver {
    replacing: bool,
    total_matches: AtomicUsize,
    files_with_matches: AtomicUsize,
    files_searched: AtomicUsize,
}

impl ConsoleObserver {
    fn new(replacing: bool) -> Self {
        Self {
            replacing,
            total_matches: AtomicUsize::new(0),
            files_with_matches: AtomicUsize::new(0),
            files_searched: AtomicUsize::new(0),
        }
    }
}

impl SearchObserver for ConsoleObserver {
    fn on_progress(&self, was_searched: bool) {
        if was_searched {
            self.files_searched.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_match(&self, match_count: usize, file_match: FileMatch) {
        self.total_matches.fetch_add(match_count, Ordering::Relaxed);
        self.files_with_matches.fetch_add(1, Ordering::Relaxed);

        let display = file_match.path.display().to_string();
        let relative = &display[file_match.prefix_len.min(display.len())..];
        let noun = if self.replacing {
            "replacements"
        } else {
            "matches"
        };
        println!(
            "\n{} ({} {}, {} bytes)",
            relative.blue(),
            match_count,
            noun,
            file_match.raw_size
        );
        for line in &file_match.lines {
            if file_match.encoding.is_binary() {
                println!("{}: {}", "byte".green(), line.line_number);
            } else {
                println!("{}: {}", line.line_number.to_string().green(), line.text);
            }
        }
    }
}

fn run(config: &SearchConfig, do_replace: bool) -> Result<()> {
    init_logging(&config.log_level);

    let params = SearchParams::prepare(config, do_replace)?;
    tracing::debug!(
        "starting {} run in '{}'",
        if do_replace { "replace" } else { "search" },
        params.root.display()
    );
    let observer = Arc::new(ConsoleObserver::new(do_replace));
    let engine = SearchEngine::new();
    if !engine.start(params, observer.clone()) {
        return Err(anyhow!("search engine is busy"));
    }
    while engine.is_running() {
        thread::sleep(Duration::from_millis(25));
    }

    let matches = observer.total_matches.load(Ordering::Relaxed);
    let files = observer.files_with_matches.load(Ordering::Relaxed);
    let searched = observer.files_searched.load(Ordering::Relaxed);
    if do_replace {
        println!(
            "\nReplaced {} matches in {} of {} files",
            matches, files, searched
        );
    } else {
        println!(
            "\nFound {} matches in {} of {} files",
            matches, files, searched
        );
    }
    Ok(())
}
