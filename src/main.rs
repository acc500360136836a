use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    error::Error,
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;
use typecode::{
    analytics::{AnalyticsStore, OverallStats, SummaryStats, Timeframe},
    clock::{Clock, ManualClock},
    config::{Config, ConfigStore, FileConfigStore, StorageBackend},
    engine::SessionEngine,
    metrics::{format_duration, AccuracyRating, CpmRating, MetricsRecord},
    session::{Difficulty, SessionRecord, SessionStatus, Snippet},
    storage,
    typing_policy::AssistedInput,
};

/// code-typing practice with live scoring and historical analytics
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Type code snippets, get scored on characters per minute and accuracy, and track your progress, streaks and per-language breakdowns over time."
)]
pub struct Cli {
    /// config file to use instead of the platform default
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// analytics file (or database) to use instead of the configured one
    #[clap(long, global = true)]
    data: Option<PathBuf>,

    /// store analytics in SQLite instead of JSON
    #[clap(long, global = true)]
    sqlite: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// type the snippet in FILE; the attempt is read from stdin line by line
    Practice {
        file: PathBuf,

        /// snippet language (guessed from the file extension by default)
        #[clap(short = 'l', long)]
        language: Option<String>,

        #[clap(short = 'd', long, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,

        #[clap(long)]
        title: Option<String>,

        #[clap(long, default_value = "general")]
        category: String,

        /// fill in each line's indentation from the snippet
        #[clap(long)]
        auto_indent: bool,
    },
    /// overall statistics and breakdowns
    Stats {
        /// 1d, 7d, 30d, 6m or all
        #[clap(short = 't', long, default_value_t = Timeframe::All)]
        timeframe: Timeframe,
    },
    /// most recent sessions
    Recent {
        #[clap(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// sessions between two dates (inclusive)
    Range { from: NaiveDate, to: NaiveDate },
    /// daily activity for the last N days
    Activity {
        #[clap(long, default_value_t = 30)]
        days: u32,
    },
    /// write all analytics to stdout or a file
    Export {
        #[clap(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// replace analytics with a previously exported JSON file, totals included
    Import { file: PathBuf },
    /// delete all analytics
    Clear {
        /// confirm the wipe
        #[clap(long)]
        yes: bool,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = config_store.load();
    if cli.sqlite {
        config.storage = StorageBackend::Sqlite;
    }
    if cli.data.is_some() {
        config.data_path = cli.data.clone();
    }

    let mut storage = storage::open(&config)?;
    let mut store =
        AnalyticsStore::from_data(storage.load()?).with_retention_limit(config.retention_limit);

    match cli.command {
        Command::Practice {
            file,
            language,
            difficulty,
            title,
            category,
            auto_indent,
        } => {
            let snippet = load_snippet(&file, &config, language, difficulty, title, category)?;
            let stdin = io::stdin();
            let record = practice(snippet, stdin.lock(), auto_indent)?;
            print_result(&record);
            store.record(record);
            storage.save(store.data())?;
        }
        Command::Stats { timeframe } => {
            print_overall(store.overall());
            println!();
            println!("{timeframe} summary");
            print_summary(&store.summary(timeframe, Local::now()));
        }
        Command::Recent { count } => {
            for session in store.recent(count) {
                print_session(session);
            }
        }
        Command::Range { from, to } => {
            let start = local_instant(from, NaiveTime::MIN)?;
            let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or("invalid time")?;
            let end = local_instant(to, end_of_day)?;
            let sessions = store.in_range(start, end);
            for session in &sessions {
                print_session(session);
            }
            let summary: SummaryStats = sessions.into_iter().collect();
            println!();
            print_summary(&summary);
        }
        Command::Activity { days } => {
            const SHADES: [char; 5] = ['·', '░', '▒', '▓', '█'];
            for day in store.activity(days, Local::now().date_naive()) {
                println!(
                    "{}  {}  {}",
                    day.date,
                    SHADES[day.level as usize % SHADES.len()],
                    day.count
                );
            }
        }
        Command::Export { format, output } => {
            let mut out: Box<dyn Write> = match output {
                Some(path) => Box::new(fs::File::create(path)?),
                None => Box::new(io::stdout()),
            };
            match format {
                ExportFormat::Json => writeln!(out, "{}", storage::export_json(store.data())?)?,
                ExportFormat::Csv => storage::export_csv(store.sessions(), &mut out)?,
            }
        }
        Command::Import { file } => {
            let data = storage::import_json(&fs::read_to_string(file)?)?;
            storage.clear()?;
            storage.save(&data)?;
            println!("imported {} sessions", data.sessions.len());
        }
        Command::Clear { yes } => {
            if !yes {
                return Err("refusing to delete analytics without --yes".into());
            }
            store.clear();
            storage.clear()?;
            println!("analytics cleared");
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TYPECODE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn language_from_extension(path: &Path) -> Option<&'static str> {
    let language = match path.extension()?.to_str()? {
        "java" => "java",
        "py" => "python",
        "cpp" | "cc" | "hpp" => "cpp",
        "c" | "h" => "c",
        "js" => "javascript",
        "ts" => "typescript",
        "go" => "go",
        "rs" => "rust",
        "cs" => "csharp",
        "kt" => "kotlin",
        _ => return None,
    };
    Some(language)
}

fn load_snippet(
    file: &Path,
    config: &Config,
    language: Option<String>,
    difficulty: Difficulty,
    title: Option<String>,
    category: String,
) -> io::Result<Snippet> {
    let code = fs::read_to_string(file)?
        .trim_end_matches(['\n', '\r'])
        .replace("\r\n", "\n");
    let id = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snippet".to_string());

    Ok(Snippet {
        title: title.unwrap_or_else(|| id.clone()),
        id,
        code,
        difficulty,
        category,
        language: language
            .or_else(|| language_from_extension(file).map(str::to_string))
            .unwrap_or_else(|| config.default_language.clone()),
    })
}

/// Run one attempt from line-oriented input.
///
/// Lines arrive whole, so the attempt is replayed through a manual clock: it
/// starts when the snippet is shown and each line lands at its arrival time.
/// Running out of input abandons the attempt.
fn practice<R: BufRead>(
    snippet: Snippet,
    input: R,
    auto_indent: bool,
) -> Result<SessionRecord, Box<dyn Error>> {
    let clock = ManualClock::at(Local::now());
    let shown_at = clock.now_ms();
    let target = snippet.code.clone();
    let mut engine = SessionEngine::with_clock(clock.clone());
    engine.load(snippet);

    println!("{target}");
    println!("{}", "-".repeat(40));
    io::stdout().flush()?;

    let mut typed = AssistedInput::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let arrived_at = Local::now().timestamp_millis();

        match (idx, auto_indent) {
            (0, true) => typed.indent(&target),
            (0, false) => {}
            (_, true) => typed.enter(&target),
            (_, false) => typed.type_char('\n'),
        }
        typed.type_str(if auto_indent { line.trim_start() } else { &line });

        if engine.status() == SessionStatus::Idle && !typed.text().is_empty() {
            let first: String = typed.text().chars().take(1).collect();
            clock.set(shown_at);
            if let Some(record) = engine.update(&first, Some(1)) {
                return Ok(record);
            }
        }

        clock.set(arrived_at);
        if let Some(record) = engine.update(typed.text(), Some(typed.manual_chars())) {
            return Ok(record);
        }
    }

    clock.set(Local::now().timestamp_millis());
    engine
        .reset()
        .ok_or_else(|| "no input received, nothing recorded".into())
}

fn local_instant(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>, Box<dyn Error>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| format!("{date} {time} does not exist in the local timezone").into())
}

fn print_metrics(m: &MetricsRecord) {
    println!(
        "{} | {} cpm ({}) | {} wpm | {:.2}% accuracy ({}) | {} errors",
        format_duration(m.time_in_seconds),
        m.cpm,
        CpmRating::from_cpm(m.cpm),
        m.wpm,
        m.accuracy,
        AccuracyRating::from_accuracy(m.accuracy),
        m.error_count,
    );
}

fn print_result(record: &SessionRecord) {
    if record.completed {
        println!("completed '{}'", record.snippet_title);
    } else {
        println!("abandoned '{}'", record.snippet_title);
    }
    print_metrics(&record.metrics);
}

fn print_session(s: &SessionRecord) {
    println!(
        "{}  {:<10} {:<6} {:<24} {:>5} cpm {:>6.2}%  {}",
        s.timestamp.format("%Y-%m-%d %H:%M"),
        s.language,
        s.difficulty,
        s.snippet_title,
        s.metrics.cpm,
        s.metrics.accuracy,
        if s.completed { "done" } else { "abandoned" },
    );
}

fn print_summary(s: &SummaryStats) {
    println!(
        "sessions {} ({} completed) | time {} | avg {:.0} cpm, {:.2}% | best {} cpm, {:.2}%",
        s.total_sessions,
        s.completed_sessions,
        format_duration(s.total_time_seconds),
        s.average_cpm,
        s.average_accuracy,
        s.best_cpm,
        s.best_accuracy,
    );
}

fn print_overall(stats: &OverallStats) {
    println!(
        "sessions {} ({} completed), practiced {}",
        stats.total_sessions,
        stats.total_completed_sessions,
        format_duration(stats.total_time_seconds)
    );
    println!(
        "average {:.0} cpm, {:.2}% | best {} cpm, {:.2}%",
        stats.average_cpm, stats.average_accuracy, stats.best_cpm, stats.best_accuracy
    );
    println!(
        "streak {} day(s), longest {} | favorite language {}",
        stats.current_streak,
        stats.longest_streak,
        stats.favorite_language.as_deref().unwrap_or("-")
    );

    if !stats.language_stats.is_empty() {
        println!();
        println!("{:<12} {:>8} {:>8} {:>9} {:>8}", "language", "sessions", "avg cpm", "accuracy", "best");
        for lang in &stats.language_stats {
            println!(
                "{:<12} {:>8} {:>8.0} {:>8.2}% {:>8}",
                lang.language, lang.sessions, lang.average_cpm, lang.average_accuracy, lang.best_cpm
            );
        }
    }

    if !stats.difficulty_stats.is_empty() {
        println!();
        println!("{:<12} {:>8} {:>8} {:>9} {:>9}", "difficulty", "sessions", "avg cpm", "accuracy", "complete");
        for (difficulty, diff) in &stats.difficulty_stats {
            println!(
                "{:<12} {:>8} {:>8.0} {:>8.2}% {:>8.0}%",
                difficulty.to_string(),
                diff.sessions,
                diff.average_cpm,
                diff.average_accuracy,
                diff.completion_rate
            );
        }
    }
}
