use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use foodgram_backend::actions::ingredients::upsert_ingredient;
use foodgram_backend::MAX_LENGTH_INGREDIENT;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Loads an ingredient catalog from a delimited text file. Rows that already
/// exist by name have their measurement unit refreshed.
#[derive(Parser, Debug)]
struct Args {
    /// File with a header line naming the `name` and `measurement_unit` columns.
    file: PathBuf,

    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("failed to connect to the database")?;

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut lines = content.lines().enumerate();

    let (_, header) = lines.next().context("file is empty")?;
    let columns: Vec<&str> = header.split(args.delimiter).map(str::trim).collect();
    let name_column = columns
        .iter()
        .position(|column| *column == "name")
        .context("header has no `name` column")?;
    let unit_column = columns
        .iter()
        .position(|column| *column == "measurement_unit")
        .context("header has no `measurement_unit` column")?;

    let mut count = 0usize;
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(args.delimiter).map(str::trim).collect();
        if fields.len() != columns.len() {
            bail!(
                "line {}: expected {} columns, found {}",
                index + 1,
                columns.len(),
                fields.len()
            );
        }

        let name = fields[name_column];
        let unit = fields[unit_column];
        if name.is_empty() || unit.is_empty() {
            bail!("line {}: name and measurement_unit must not be empty", index + 1);
        }
        if name.chars().count() > MAX_LENGTH_INGREDIENT {
            bail!("line {}: name exceeds {MAX_LENGTH_INGREDIENT} characters", index + 1);
        }

        upsert_ingredient(name, unit, &pool)
            .await
            .with_context(|| format!("line {}: failed to store {name}", index + 1))?;
        count += 1;
    }

    info!("imported {count} ingredients");

    Ok(())
}
