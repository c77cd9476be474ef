//! Livros - command-line catalog manager for a book-lending API.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

use livros_catalog::{
    config::{AppConfig, LoggingConfig},
    error::AppResult,
    models::{Book, BookFilter, BookId, BookInput, LoanStatus, SortDirection, SortField, SortState},
    services::{
        catalog::{CatalogService, Outcome},
        export, query, Services,
    },
    view::{self, LoanPrompt},
};

#[derive(Parser)]
#[command(name = "livros", version, about = "Book-lending catalog manager")]
struct Cli {
    /// Backend base URL (the collection lives under /livros)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Work from the local snapshot, without a backend
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show one page of the catalog
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Add a book
    Add(BookArgs),
    /// Edit a book; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete a book
    Delete {
        id: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Lend an available book or take back a lent one
    Loan {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Write the filtered catalog to livros.json and livros.csv
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Target directory (defaults to export.dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the genre and year filter choices
    Filters,
}

#[derive(Args)]
struct FilterArgs {
    /// Substring of title or author
    #[arg(long, default_value = "")]
    text: String,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    /// disponivel|available or emprestado|on_loan
    #[arg(long)]
    status: Option<LoanStatus>,
}

impl From<FilterArgs> for BookFilter {
    fn from(args: FilterArgs) -> Self {
        BookFilter {
            text: args.text,
            genre: args.genre,
            year: args.year,
            status: args.status,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    Title,
    Year,
}

#[derive(Args)]
struct SortArgs {
    /// Change the saved sort key
    #[arg(long, value_enum)]
    sort: Option<SortKey>,
    /// Descending order (with --sort)
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl SortArgs {
    fn requested(&self) -> Option<SortState> {
        self.sort.map(|key| SortState {
            field: match key {
                SortKey::Title => SortField::Title,
                SortKey::Year => SortField::Year,
            },
            direction: if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        })
    }
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    year: i32,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long, default_value = "disponivel")]
    status: LoanStatus,
}

impl From<BookArgs> for BookInput {
    fn from(args: BookArgs) -> Self {
        BookInput {
            title: args.title,
            author: args.author,
            year: args.year,
            genre: args.genre,
            isbn: args.isbn,
            status: args.status,
        }
    }
}

#[derive(Args)]
struct EditArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    status: Option<LoanStatus>,
}

impl EditArgs {
    fn apply(self, book: &Book) -> BookInput {
        let mut input = BookInput::from_book(book);
        if let Some(title) = self.title {
            input.title = title;
        }
        if let Some(author) = self.author {
            input.author = author;
        }
        if let Some(year) = self.year {
            input.year = year;
        }
        if self.genre.is_some() {
            input.genre = self.genre;
        }
        if self.isbn.is_some() {
            input.isbn = self.isbn;
        }
        if let Some(status) = self.status {
            input.status = status;
        }
        input
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api.base_url = url;
    }
    if cli.offline {
        config.api.offline = true;
    }

    let _guard = init_tracing(&config.logging);
    tracing::debug!("Livros v{}", env!("CARGO_PKG_VERSION"));

    let services = Services::new(&config)?;

    match run(cli.command, &config, &services.catalog).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::from(e.kind() as u8))
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("livros_catalog={0},livros={0}", logging.level).into()
    });

    let (writer, guard) = match &logging.file {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "livros.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        registry.with(fmt::layer().with_writer(writer)).init();
    }
    guard
}

async fn run(command: Command, config: &AppConfig, catalog: &CatalogService) -> AppResult<()> {
    let mut state = catalog.init().await;

    match command {
        Command::List { filter, sort, page } => {
            if let Some(sort) = sort.requested() {
                catalog.set_sort(&mut state, sort);
            }
            state.set_filter(filter.into());
            state.set_page(page);
            print!("{}", view::render(&state.current_page()));
        }
        Command::Add(args) => {
            let outcome = catalog.create(&mut state, args.into()).await?;
            report(&outcome, "Created");
            print!("{}", view::render(&state.current_page()));
        }
        Command::Edit { id, fields } => {
            let id = BookId::from(id);
            let Some(current) = state.cache.get(&id).cloned() else {
                tracing::debug!("No book {} in the catalog", id);
                return Ok(());
            };
            let outcome = catalog.edit(&mut state, &id, fields.apply(&current)).await?;
            report(&outcome, "Saved");
        }
        Command::Delete { id, yes } => {
            let id = BookId::from(id);
            let outcome = if yes {
                catalog.delete(&mut state, &id, &|_: &str| true).await?
            } else {
                catalog.delete(&mut state, &id, &ask).await?
            };
            match outcome {
                Outcome::Applied(()) | Outcome::Reloaded => {
                    println!("Deleted.");
                    print!("{}", view::render(&state.current_page()));
                }
                Outcome::Declined => println!("Cancelled."),
                Outcome::Stale => {}
            }
        }
        Command::Loan { id, yes } => {
            let id = BookId::from(id);
            let Some(book) = state.cache.get(&id) else {
                tracing::debug!("No book {} in the catalog", id);
                return Ok(());
            };
            let prompt = LoanPrompt::for_book(book).to_string();
            if !yes && !ask(&prompt) {
                println!("Cancelled.");
                return Ok(());
            }
            let outcome = catalog.toggle_loan(&mut state, &id).await?;
            if let Outcome::Applied(book) = &outcome {
                println!("\"{}\" is now {}.", book.title, book.status.label());
            } else {
                report(&outcome, "Done");
            }
        }
        Command::Export { filter, out } => {
            state.set_filter(filter.into());
            let dir = out.unwrap_or_else(|| config.export.dir.clone());
            let files = export::write_all(&dir, &state.filtered())?;
            println!("Wrote {} and {}", files.json.display(), files.csv.display());
        }
        Command::Filters => {
            println!("{}", query::filter_options(state.cache.iter()));
        }
    }

    Ok(())
}

fn report(outcome: &Outcome<Book>, verb: &str) {
    match outcome {
        Outcome::Applied(book) => println!("{} [{}] {}", verb, book.id, book.title),
        Outcome::Reloaded => println!("{}; catalog reloaded.", verb),
        Outcome::Declined => println!("Cancelled."),
        Outcome::Stale => {}
    }
}

/// Interactive yes/no gate on stdin
fn ask(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim")
}
