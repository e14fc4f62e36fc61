use std::env;
use std::fs;

use dotenvy::dotenv;
use serde::Deserialize;
use sqlx::sqlite::SqlitePoolOptions;

fn is_dry_run() -> bool {
    !env::args().any(|a| a == "--apply")
}

/// Processed review-report record, one element per submission.
#[derive(Debug, Deserialize)]
struct RawReview {
    id: String,
    course_id: String,
    term: String,
    instructor: Option<String>,
    quality: Option<f64>,
    learned: Option<f64>,
    review: Option<String>,
    hours: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://courseboard.db".to_string());

    let files: Vec<String> = env::args()
        .skip(1)
        .filter(|a| a != "--apply")
        .collect();
    if files.is_empty() {
        eprintln!("usage: import_reviews [--apply] <reviews.json>...");
        std::process::exit(2);
    }

    let dry_run = is_dry_run();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    let mut imported = 0;
    let mut skipped = 0;

    for file in &files {
        let body = fs::read_to_string(file)?;
        let records: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        println!("Processing {file}: {} records", records.len());

        for value in records {
            let record: RawReview = match serde_json::from_value(value) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("  Skipping malformed record: {e}");
                    skipped += 1;
                    continue;
                }
            };

            if dry_run {
                imported += 1;
                continue;
            }

            sqlx::query(
                "INSERT OR REPLACE INTO reviews (id, course_id, term, instructor, quality, learned, review, hours)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(&record.course_id)
            .bind(&record.term)
            .bind(&record.instructor)
            .bind(record.quality)
            .bind(record.learned)
            .bind(&record.review)
            .bind(record.hours)
            .execute(&pool)
            .await?;
            imported += 1;
        }
    }

    if dry_run {
        println!("Dry run: {imported} records would be imported ({skipped} skipped). Re-run with --apply.");
    } else {
        println!("Imported {imported} records ({skipped} skipped).");
    }

    Ok(())
}
