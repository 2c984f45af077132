//! Monthly bookkeeping walk-through: record work, settle bills, export a report

use bigdecimal::BigDecimal;
use cashbook_core::{
    init_tracing, patterns, Client, KindFilter, Ledger, MemoryStorage, PeriodMode, Project,
    ProjectStatus, ReportFilter, ScheduledTransaction, TransactionKind,
};
use chrono::{Datelike, Utc};

const OWNER: &str = "demo-account";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut ledger = Ledger::new(MemoryStorage::new(), OWNER);
    let today = Utc::now().date_naive();
    let first = today.with_day(1).unwrap_or(today);

    // 1. Clients and projects
    let client = ledger
        .create_client(Client::new(OWNER, "Café Lúmen").with_email("contato@lumen.example"))
        .await?;
    let website = Project::new(OWNER, client.id.clone(), "Website Redesign", BigDecimal::from(2400));
    ledger.save_project(website.clone()).await?;
    ledger
        .save_project(Project::new(OWNER, client.id.clone(), "Menu Photography", BigDecimal::from(650)))
        .await?;

    // Completing a project posts its income automatically
    ledger
        .set_project_status(&website.id, ProjectStatus::Completed)
        .await?;

    // 2. Day-to-day expenses
    ledger
        .record_transaction(patterns::expense(OWNER, "Software subscriptions", BigDecimal::from(89), "software", first)?)
        .await?;
    ledger
        .record_transaction(patterns::expense(OWNER, "Coworking desk", BigDecimal::from(320), "office", first)?)
        .await?;

    // 3. Scheduled bills; pay the first one
    let mut bills = Vec::new();
    for bill in patterns::monthly_bill(OWNER, "Rent", BigDecimal::from(900), "rent", first, 3) {
        bills.push(ledger.schedule(bill).await?);
    }
    ledger
        .schedule(ScheduledTransaction::new(
            OWNER,
            "Quarterly tax",
            BigDecimal::from(410),
            TransactionKind::Expense,
            "tax",
            today + chrono::Duration::days(3),
        ))
        .await?;
    if let Some(rent) = bills.first() {
        ledger.mark_paid(&rent.id).await?;
    }

    // 4. Dashboard and alerts
    let dashboard = ledger.dashboard(5).await?;
    println!("This month");
    println!("  income   {}", dashboard.month_totals.income);
    println!("  expenses {}", dashboard.month_totals.expenses);
    println!("  balance  {}", dashboard.month_totals.balance);
    println!("  pending scheduled: {}", dashboard.pending_scheduled);
    for item in &dashboard.alerts.upcoming {
        println!("  due soon: {} on {}", item.description, item.scheduled_on());
    }

    // 5. Export
    let filter = ReportFilter::default()
        .with_period(PeriodMode::Month)
        .with_kind(KindFilter::All);
    let dir = std::env::temp_dir();
    for path in ledger.export_to(&filter, &dir).await? {
        println!("wrote {}", path.display());
    }

    Ok(())
}
