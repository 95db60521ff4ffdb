use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use courseboard_auth::UserRole;
use courseboard_config::DatabaseConfig;
use courseboard_core::errors::unique_violation;
use courseboard_core::hash_password;
use courseboard_db::{init_db_pool, run_migrations};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "courseboard-cli")]
#[command(about = "Courseboard CLI - Administrative tools for Courseboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a new account
    CreateUser {
        /// Login name
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Account role: admin, teacher or student
        #[arg(short = 'r', long, default_value = "admin")]
        role: UserRole,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let config = DatabaseConfig::from_env()?;
    let pool = init_db_pool(&config)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Migrate => handle_migrate(&pool).await,
        Commands::CreateUser {
            username,
            email,
            role,
            password,
        } => handle_create_user(&pool, username, email, role, password).await,
    }
}

async fn handle_migrate(pool: &PgPool) -> anyhow::Result<()> {
    run_migrations(pool)
        .await
        .context("Failed to run migrations")?;
    println!("✅ Migrations applied");
    Ok(())
}

async fn handle_create_user(
    pool: &PgPool,
    username: Option<String>,
    email: Option<String>,
    role: UserRole,
    password: Option<String>,
) -> anyhow::Result<()> {
    let username = match username {
        Some(username) => username,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    let email: String = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email address")
            .interact_text()
            .context("Failed to read email")?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .context("Failed to read password")?,
    };

    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let id = insert_user(pool, &username, &email, role, &password).await?;

    println!("\n✅ User created successfully!");
    println!("   ID: {}", id);
    println!("   Username: {}", username);
    println!("   Role: {}", role);
    Ok(())
}

async fn insert_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    role: UserRole,
    password: &str,
) -> anyhow::Result<Uuid> {
    let hashed = hash_password(password).map_err(|e| e.error)?;

    let result = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (username, email, password, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(username)
    .bind(email)
    .bind(&hashed)
    .bind(role)
    .fetch_one(pool)
    .await;

    match result {
        Ok(id) => Ok(id),
        Err(e) => match unique_violation(&e) {
            Some("users_username_key") => bail!("username '{}' is already taken", username),
            Some("users_email_key") => bail!("email '{}' is already registered", email),
            _ => Err(e).context("Failed to insert user"),
        },
    }
}
