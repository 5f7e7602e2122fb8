use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod db;
mod error;
mod grading;
mod models;
mod report;
mod standing;
mod transcript;

use config::Settings;
use grading::Scale;
use models::{GradeRow, GradeStatus, ScoreRecord};

#[derive(Parser)]
#[command(name = "gradehub")]
#[command(about = "Grade conversion, GPA and standing reports for GradeHub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one score to its letter grade and grade point
    Convert {
        #[arg(allow_negative_numbers = true)]
        score: f64,
        #[arg(long, default_value = "percentage")]
        scale: Scale,
        #[arg(long)]
        json: bool,
    },
    /// Look up the letter for a point-scale value
    Letter {
        #[arg(allow_negative_numbers = true)]
        point: f64,
    },
    /// Compute GPA and statistics from a transcript CSV
    Gpa {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "point")]
        scale: Scale,
        #[arg(long)]
        json: bool,
    },
    /// Load demo students and grades
    Seed,
    /// Bulk upload encoded grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a registrar decision on a grade
    Verify {
        #[arg(long)]
        grade_id: Uuid,
        #[arg(long)]
        status: GradeStatus,
        #[arg(long)]
        by: String,
    },
    /// Rank students by weighted GPA
    Standing {
        #[arg(long)]
        semester: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        include_pending: bool,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown grade report
    Report {
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        include_pending: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Generate per-course class statistics
    ClassReport {
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        include_pending: bool,
        #[arg(long, default_value = "class-report.md")]
        out: PathBuf,
    },
}

fn init_logger() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let database_url = settings.require_database_url()?;
    tracing::info!(max_connections = settings.max_connections, "connecting to Postgres");
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_logger();

    match cli.command {
        Commands::Convert { score, scale, json } => {
            let conversion = match scale {
                Scale::Percentage => grading::convert_percentage_to_grade(score),
                Scale::Point => grading::convert_point_scale_to_grade(score),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&conversion)?);
            } else {
                println!(
                    "{} ({}) -> {} | grade point {:.2} | numeric {} | {} | {}",
                    score,
                    scale,
                    conversion.letter_grade,
                    conversion.grade_point,
                    conversion.numeric_grade,
                    conversion.description,
                    conversion.remarks
                );
            }
        }
        Commands::Letter { point } => {
            println!("{}", grading::letter_grade_from_point(point));
        }
        Commands::Gpa { csv, scale, json } => {
            let entries = transcript::read_transcript(&csv, scale)?;
            let records: Vec<ScoreRecord> = entries.iter().map(|e| e.record).collect();
            let statistics = grading::summarize(&records)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&statistics)?);
                return Ok(());
            }

            for entry in entries.iter() {
                let conversion = grading::convert(&entry.record);
                println!(
                    "- {} ({} units): {} -> {} ({:.2}, {})",
                    entry.course_code,
                    entry.record.credits,
                    entry.record.raw_score,
                    conversion.letter_grade,
                    conversion.grade_point,
                    conversion.remarks
                );
            }
            println!(
                "Weighted GPA {:.2} over {} units; {} of {} courses passed ({:.1}%), {} units earned.",
                statistics.weighted_gpa,
                statistics.total_credits,
                statistics.passed_courses,
                statistics.total_courses,
                statistics.pass_percentage,
                statistics.earned_credits
            );
        }
        Commands::Seed => {
            let pool = connect(&settings).await?;
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} new grades).");
        }
        Commands::Import { csv } => {
            let pool = connect(&settings).await?;
            let summary = db::import_csv(&pool, &csv).await?;
            println!(
                "Inserted {} grades from {} ({} already present).",
                summary.inserted,
                csv.display(),
                summary.duplicates
            );
            for refused in summary.errors.iter() {
                println!(
                    "- row {} [{}] {}: {}",
                    refused.row, refused.student_number, refused.field, refused.message
                );
            }
        }
        Commands::Verify {
            grade_id,
            status,
            by,
        } => {
            let pool = connect(&settings).await?;
            if db::update_status(&pool, grade_id, status, &by).await? {
                tracing::info!(%grade_id, %status, verified_by = %by, "grade status updated");
                println!("Grade {grade_id} marked {status}.");
            } else {
                anyhow::bail!("no grade found with id {grade_id}");
            }
        }
        Commands::Standing {
            semester,
            limit,
            include_pending,
            json,
        } => {
            let pool = connect(&settings).await?;
            let filter = db::GradeFilter {
                semester: semester.as_deref(),
                ..Default::default()
            };
            let rows: Vec<GradeRow> = db::fetch_grades(&pool, &filter).await?;
            let standings = standing::rank_students(&rows, include_pending);

            if json {
                let top: Vec<_> = standings.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&top)?);
                return Ok(());
            }

            if standings.is_empty() {
                println!("No counted grades found for this selection.");
                return Ok(());
            }

            println!("Students by weighted GPA:");
            for standing in standings.iter().take(limit) {
                println!(
                    "- {} ({}, {}) GPA {:.2} across {} courses, {} units earned",
                    standing.student_name,
                    standing.student_number,
                    standing.program,
                    standing.statistics.weighted_gpa,
                    standing.statistics.total_courses,
                    standing.statistics.earned_credits
                );
            }
        }
        Commands::Report {
            student,
            semester,
            course,
            include_pending,
            out,
        } => {
            let pool = connect(&settings).await?;
            let filter = db::GradeFilter {
                student: student.as_deref(),
                semester: semester.as_deref(),
                course: course.as_deref(),
            };
            let rows = db::fetch_grades(&pool, &filter).await?;
            let report = report::build_report(
                student.as_deref(),
                semester.as_deref(),
                &rows,
                include_pending,
            )?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::ClassReport {
            course,
            semester,
            include_pending,
            out,
        } => {
            let pool = connect(&settings).await?;
            let filter = db::GradeFilter {
                student: None,
                semester: semester.as_deref(),
                course: course.as_deref(),
            };
            let rows = db::fetch_grades(&pool, &filter).await?;
            let report = report::build_class_report(
                course.as_deref(),
                semester.as_deref(),
                &rows,
                include_pending,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Class report written to {}.", out.display());
        }
    }

    Ok(())
}
