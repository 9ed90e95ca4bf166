use coach_ledger::config;
use coach_ledger::db;
use coach_ledger::engine::{Engine, local_today};
use coach_ledger::errors::Result;
use coach_ledger::insights::Period;
use coach_ledger::models::DueItem;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Resolve configuration
    let app_config = config::load_app_configuration()?;
    info!("Using database at '{}'.", app_config.database_path);

    // 4. Initialize database
    let db_pool = db::init_db(&app_config.database_path)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Print today's due list and the current-month picture
    let app = Engine::new(db_pool);
    let today = local_today();

    let active_students = app.active_student_count().await?;
    println!("Active students: {active_students}");

    let due = app.list_due_today(today).await?;
    println!("Due on {} ({} item(s)):", today, due.len());
    for item in &due {
        let time = item
            .due_time()
            .map_or_else(|| "--:--".to_string(), |t| t.format("%H:%M").to_string());
        let kind = match item {
            DueItem::Slot(_) => "slot",
            DueItem::Pending(_) => "rescheduled",
        };
        println!(
            "  {} [{}] student {} - {} min, ${:.2} ({})",
            time,
            item.category().info().name,
            item.student_id(),
            item.duration_minutes(),
            item.price(),
            kind,
        );
    }

    let total = app.compute_earnings().await?;
    let growth = app.monthly_growth(today).await?;
    let trend = app.monthly_trend(6, today).await?;
    println!("\nTotal earnings: ${total:.2} (month-over-month {growth:+.0}%)");
    for month in &trend {
        println!(
            "  {} {}: ${:.2} over {} session(s)",
            month.month, month.label, month.total_earnings, month.total_sessions
        );
    }

    for stat in app
        .compute_category_breakdown(Period::Month, today)
        .await?
    {
        println!(
            "  {:>9}: ${:.2} ({:.0}%), {} completed / {} missed",
            stat.category.info().name,
            stat.total_earnings,
            stat.percentage,
            stat.total_sessions,
            stat.missed_sessions
        );
    }

    Ok(())
}
