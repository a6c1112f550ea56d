//! shelfkeep - command-line front end for the library lending tracker.

mod output;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use shelfkeep_lending::{LendingConfig, LendingService};
use shelfkeep_storage::{Database, DatabaseConfig};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Track accounts, the book catalogue and loans.
#[derive(Parser)]
#[command(name = "shelfkeep", version, about = "Library lending tracker")]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "SHELFKEEP_DB", default_value = "shelfkeep.db")]
    database: String,

    /// Upper bound on pooled database connections.
    #[arg(long, global = true, env = "SHELFKEEP_DB_CONNECTIONS", default_value_t = 4)]
    db_connections: u32,

    /// Milliseconds to wait on a locked database before giving up.
    #[arg(long, global = true, env = "SHELFKEEP_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Days between borrow and due date.
    #[arg(long, global = true, env = "SHELFKEEP_LOAN_DAYS", default_value_t = 14)]
    loan_days: i64,

    /// Refuse loans once a user holds their role's maximum.
    #[arg(
        long,
        global = true,
        env = "SHELFKEEP_ENFORCE_LIMIT",
        default_value_t = true,
        action = ArgAction::Set
    )]
    enforce_limit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and optionally seed a head librarian.
    Init {
        #[arg(long, requires_all = ["admin_email", "admin_password"])]
        admin_name: Option<String>,

        #[arg(long)]
        admin_email: Option<String>,

        #[arg(long, env = "SHELFKEEP_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,
    },

    /// Register a new account.
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "SHELFKEEP_PASSWORD", hide_env_values = true)]
        password: String,

        /// student, faculty, librarian or "head librarian".
        #[arg(long, default_value = "student")]
        role: String,
    },

    /// Check credentials and show the account with its loans.
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SHELFKEEP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List accounts.
    Users,

    /// List the catalogue.
    Books {
        /// Case-insensitive match on title, author or ISBN.
        #[arg(long)]
        search: Option<String>,
    },

    /// Catalogue a new title.
    AddBook {
        isbn: String,
        title: String,
        author: String,

        #[arg(long, default_value_t = 1)]
        copies: u32,
    },

    /// Change title, author and total copies.
    UpdateBook {
        isbn: String,
        title: String,
        author: String,

        #[arg(long)]
        copies: u32,
    },

    /// Remove a title with no open loans.
    DeleteBook { isbn: String },

    /// Lend a copy to a user.
    Borrow { user_id: String, isbn: String },

    /// Close a loan by transaction id.
    Return { transaction_id: i64 },

    /// List loans, newest first.
    Loans {
        #[arg(long)]
        user: Option<String>,
    },

    /// Mark past-due loans overdue.
    Sweep,

    /// Show library counters (runs the overdue sweep first).
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Charge a student a fine, in cents.
    Fine { user_id: String, cents: i64 },

    /// Record a fine payment, in cents.
    PayFine { user_id: String, cents: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfkeep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!(database = %cli.database, "Opening library");

    let db_config = DatabaseConfig::new(&cli.database)
        .max_connections(cli.db_connections)
        .busy_timeout(Duration::from_millis(cli.busy_timeout_ms));
    let db = Database::new(db_config)
        .await
        .with_context(|| format!("failed to open database {}", cli.database))?;

    let config = LendingConfig::new()
        .loan_period_days(cli.loan_days)
        .enforce_borrow_limit(cli.enforce_limit);
    let mut library = LendingService::new(db.clone(), config)?;

    run(&mut library, cli.command).await?;

    db.close().await;
    Ok(())
}

async fn run(library: &mut LendingService, command: Commands) -> Result<()> {
    match command {
        Commands::Init {
            admin_name,
            admin_email,
            admin_password,
        } => {
            if let (Some(email), Some(password)) = (admin_email, admin_password) {
                let name = admin_name.unwrap_or_else(|| "Administrator".to_string());
                match library.ensure_admin(&name, &email, &password).await? {
                    Some(admin) => println!("Created head librarian {}", admin.id),
                    None => println!("Users already exist, no admin created"),
                }
            }
            library.database().health_check().await?;
            println!("Database ready");
        }

        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            let user = library.register(&name, &email, &password, &role).await?;
            println!("Registered {} ({})", user.id, user.user_type());
        }

        Commands::Login { email, password } => {
            let user = library.authenticate(&email, &password).await?;
            println!("{}", output::user_line(&user));
            println!("Borrow limit: {}", user.max_books_allowed());
            for view in library.current_user_transactions().await? {
                println!("{}", output::loan_line(&view));
            }
        }

        Commands::Users => {
            for user in library.list_users().await? {
                println!("{}", output::user_line(&user));
            }
        }

        Commands::Books { search } => {
            let books = match search {
                Some(term) => library.search_books(&term).await?,
                None => library.list_books().await?,
            };
            for book in &books {
                println!("{}", output::book_line(book));
            }
        }

        Commands::AddBook {
            isbn,
            title,
            author,
            copies,
        } => {
            let book = library.add_book(&isbn, &title, &author, copies).await?;
            println!("Added {}", output::book_line(&book));
        }

        Commands::UpdateBook {
            isbn,
            title,
            author,
            copies,
        } => {
            let book = library.update_book(&isbn, &title, &author, copies).await?;
            println!("Updated {}", output::book_line(&book));
        }

        Commands::DeleteBook { isbn } => {
            library.delete_book(&isbn).await?;
            println!("Deleted {isbn}");
        }

        Commands::Borrow { user_id, isbn } => {
            let loan = library.borrow_book(&user_id, &isbn).await?;
            println!(
                "Transaction #{}: {} borrowed {}, due {}",
                loan.id,
                loan.user_id,
                loan.book_isbn,
                loan.due_date.format("%Y-%m-%d")
            );
        }

        Commands::Return { transaction_id } => {
            let loan = library.return_book(transaction_id).await?;
            println!("Transaction #{} completed", loan.id);
        }

        Commands::Loans { user } => {
            let loans = match user {
                Some(user_id) => library.user_transactions(&user_id).await?,
                None => library.list_transactions().await?,
            };
            for view in &loans {
                println!("{}", output::loan_line(view));
            }
        }

        Commands::Sweep => {
            let changed = library.sweep_overdue().await?;
            println!("{changed} loan(s) marked overdue");
        }

        Commands::Stats { json } => {
            let stats = library.refresh_statistics().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", output::statistics_block(&stats));
            }
        }

        Commands::Fine { user_id, cents } => {
            let user = library.record_fine(&user_id, cents).await?;
            println!(
                "{} now owes {}",
                user.id,
                output::cents(user.fines_cents())
            );
        }

        Commands::PayFine { user_id, cents } => {
            let user = library.pay_fine(&user_id, cents).await?;
            println!(
                "{} now owes {}",
                user.id,
                output::cents(user.fines_cents())
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shelfkeep",
            "borrow",
            "STU100",
            "ISBN-1",
            "--database",
            "test.db",
            "--enforce-limit",
            "false",
        ])
        .unwrap();

        assert_eq!(cli.database, "test.db");
        assert_eq!(cli.db_connections, 4);
        assert!(!cli.enforce_limit);
        assert!(matches!(cli.command, Commands::Borrow { .. }));
    }

    #[test]
    fn test_pool_flags() {
        let cli = Cli::try_parse_from([
            "shelfkeep",
            "--db-connections",
            "1",
            "--busy-timeout-ms",
            "250",
            "sweep",
        ])
        .unwrap();

        assert_eq!(cli.db_connections, 1);
        assert_eq!(cli.busy_timeout_ms, 250);
    }

    #[test]
    fn test_update_book_requires_copies() {
        assert!(
            Cli::try_parse_from(["shelfkeep", "update-book", "ISBN-1", "Dune", "Frank Herbert"])
                .is_err()
        );
    }
}
