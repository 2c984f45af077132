//! Integration tests for cashbook-core

use bigdecimal::BigDecimal;
use cashbook_core::{
    patterns, ApplyOutcome, ChangeSource, Client, EngineConfig, FixedClock, KindFilter, Ledger,
    LedgerError, LedgerStorage, MemoryStorage, PeriodMode, Project, ProjectStatus,
    ReconciliationOutcome, ReportFilter, ScheduledStatus, ScheduledTransaction, Transaction,
    TransactionKind, TransactionOrigin, Workbook,
};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

const OWNER: &str = "account-1";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 25, 14, 0, 0).unwrap()))
}

fn ledger_with(storage: MemoryStorage, clock: Arc<FixedClock>) -> Ledger<MemoryStorage> {
    Ledger::with_config(storage, OWNER, clock, EngineConfig::default())
}

#[tokio::test]
async fn test_complete_bookkeeping_workflow() {
    let storage = MemoryStorage::new();
    let mut ledger = ledger_with(storage.clone(), clock());

    let client = ledger
        .create_client(Client::new(OWNER, "Studio Aurora").with_email("hi@aurora.example"))
        .await
        .unwrap();

    // A project worth 1500 is completed
    let project = Project::new(OWNER, client.id.clone(), "Brand Identity", BigDecimal::from(1500));
    ledger.save_project(project.clone()).await.unwrap();
    ledger
        .set_project_status(&project.id, ProjectStatus::Completed)
        .await
        .unwrap();

    // Rent is scheduled then paid
    let rent = ledger
        .schedule(ScheduledTransaction::new(
            OWNER,
            "Rent",
            BigDecimal::from(500),
            TransactionKind::Expense,
            "aluguel",
            date(2024, 3, 20),
        ))
        .await
        .unwrap();
    assert_eq!(ledger.alerts().await.unwrap().overdue.len(), 1);
    ledger.mark_paid(&rent.id).await.unwrap();
    assert!(ledger.alerts().await.unwrap().is_empty());

    // A manual expense
    let coffee = patterns::expense(OWNER, "Coffee beans", BigDecimal::from(40), "food", date(2024, 3, 2)).unwrap();
    ledger.record_transaction(coffee).await.unwrap();

    let transactions = ledger.list_transactions(None, None).await.unwrap();
    assert_eq!(transactions.len(), 3);

    let project_income = transactions
        .iter()
        .find(|t| t.origin == Some(TransactionOrigin::project_completed(&project.id)))
        .unwrap();
    assert_eq!(project_income.amount, BigDecimal::from(1500));
    assert_eq!(project_income.category.as_str(), "PROJECTS");
    assert_eq!(project_income.date, date(2024, 3, 25));

    let rent_paid = transactions
        .iter()
        .find(|t| t.origin == Some(TransactionOrigin::scheduled_paid(&rent.id)))
        .unwrap();
    assert_eq!(rent_paid.category.as_str(), "ALUGUEL");
    assert_eq!(rent_paid.kind, TransactionKind::Expense);

    let dashboard = ledger.dashboard(5).await.unwrap();
    assert_eq!(dashboard.month_totals.income, BigDecimal::from(1500));
    assert_eq!(dashboard.month_totals.expenses, BigDecimal::from(540));
    assert_eq!(dashboard.month_totals.balance, BigDecimal::from(960));
    assert_eq!(dashboard.monthly[2].balance, BigDecimal::from(960));
    assert_eq!(dashboard.pending_scheduled, 0);

    let stored_rent = storage.get_scheduled(OWNER, &rent.id).await.unwrap().unwrap();
    assert_eq!(stored_rent.status, ScheduledStatus::Paid);
}

#[tokio::test]
async fn test_cancelling_completed_project_reverses_income() {
    let mut ledger = ledger_with(MemoryStorage::new(), clock());
    let client = ledger.create_client(Client::new(OWNER, "Acme")).await.unwrap();
    let project = Project::new(OWNER, client.id.clone(), "Logo Redesign", BigDecimal::from(800))
        .with_status(ProjectStatus::Completed);
    ledger.save_project(project.clone()).await.unwrap();
    assert_eq!(ledger.list_transactions(None, None).await.unwrap().len(), 1);

    let outcome = ledger
        .set_project_status(&project.id, ProjectStatus::Cancelled)
        .await
        .unwrap();
    assert!(matches!(outcome, ReconciliationOutcome::Reversed(Some(_))));
    assert!(ledger.list_transactions(None, None).await.unwrap().is_empty());
    assert_eq!(
        ledger.get_project_required(&project.id).await.unwrap().status,
        ProjectStatus::Cancelled
    );
}

#[tokio::test]
async fn test_partial_reconciliation_is_reported_and_recoverable() {
    let storage = MemoryStorage::new();
    let mut ledger = ledger_with(storage.clone(), clock());
    let rent = ledger
        .schedule(ScheduledTransaction::new(
            OWNER,
            "Rent",
            BigDecimal::from(500),
            TransactionKind::Expense,
            "rent",
            date(2024, 4, 1),
        ))
        .await
        .unwrap();

    storage.set_fail_transaction_writes(true);
    let err = ledger.mark_paid(&rent.id).await.unwrap_err();
    assert!(err.is_partial());
    assert!(err.user_message().contains("was saved"));
    assert!(ledger.list_transactions(None, None).await.unwrap().is_empty());

    // the status write went through
    let stored = storage.get_scheduled(OWNER, &rent.id).await.unwrap().unwrap();
    assert!(stored.is_paid());

    storage.set_fail_transaction_writes(false);
    let replayed = ledger.retry_pending().await.unwrap();
    assert!(matches!(replayed.as_slice(), [ApplyOutcome::Applied(_)]));

    // paying again is idempotent
    ledger.mark_paid(&rent.id).await.unwrap();
    assert_eq!(ledger.list_transactions(None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_project_requires_known_client() {
    let mut ledger = ledger_with(MemoryStorage::new(), clock());
    let orphan = Project::new(OWNER, "no-such-client", "Site", BigDecimal::from(100));
    assert!(matches!(
        ledger.save_project(orphan).await,
        Err(LedgerError::ClientNotFound(_))
    ));
}

#[tokio::test]
async fn test_export_month_of_income() {
    let mut ledger = ledger_with(MemoryStorage::new(), clock());
    for (day, kind, amount, category) in [
        (5, TransactionKind::Income, 1000, "PROJETO"),
        (20, TransactionKind::Expense, 400, "ALUGUEL"),
        (22, TransactionKind::Income, 250, "consulting"),
    ] {
        ledger
            .record_transaction(Transaction::new(OWNER, "entry", BigDecimal::from(amount), kind, category, date(2024, 3, day)))
            .await
            .unwrap();
    }
    ledger
        .record_transaction(Transaction::new(OWNER, "old", BigDecimal::from(75), TransactionKind::Income, "misc", date(2024, 2, 1)))
        .await
        .unwrap();

    let filter = ReportFilter::default()
        .with_period(PeriodMode::Month)
        .with_kind(KindFilter::Income)
        .including(true, false, false);
    let bundle = ledger.export(&filter).await.unwrap();

    assert_eq!(bundle.summary.totals.count, 2);
    assert_eq!(bundle.summary.totals.income, BigDecimal::from(1250));
    assert_eq!(bundle.printable.totals, bundle.workbook.totals);
    assert_eq!(bundle.summary.period_label, "01/03/2024 to 31/03/2024");
    assert_eq!(
        bundle.workbook.sheet_names(),
        vec!["Summary", "Transactions", "Category Analysis"]
    );

    let dir = tempfile::tempdir().unwrap();
    let paths = ledger.export_to(&filter, dir.path()).await.unwrap();
    assert_eq!(paths.len(), 2);
    let workbook: Workbook =
        serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
    assert_eq!(workbook, bundle.workbook);
}

#[tokio::test]
async fn test_export_custom_range_with_open_end() {
    let mut ledger = ledger_with(MemoryStorage::new(), clock());
    for day in [1, 10, 20] {
        ledger
            .record_transaction(Transaction::new(OWNER, "entry", BigDecimal::from(10), TransactionKind::Expense, "x", date(2024, 1, day)))
            .await
            .unwrap();
    }

    let filter = ReportFilter::default()
        .with_period(PeriodMode::Custom)
        .with_custom_range(Some("2024-01-10"), Some("not-a-date"));
    let bundle = ledger.export(&filter).await.unwrap();
    assert_eq!(bundle.summary.totals.count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_session_follows_ledger_writes() {
    let mut ledger = ledger_with(MemoryStorage::new(), clock());
    let session = ledger.spawn_session();
    let mut rx = session.subscribe();
    while rx.borrow().generation < 1 {
        rx.changed().await.unwrap();
    }
    assert_eq!(session.snapshot().stats.pending_scheduled, 0);

    let mut changes = ledger.notifier().subscribe();
    ledger
        .schedule(ScheduledTransaction::new(OWNER, "Tax", BigDecimal::from(90), TransactionKind::Expense, "tax", date(2024, 4, 10)))
        .await
        .unwrap();
    assert_eq!(changes.recv().await.unwrap().source, ChangeSource::Scheduled);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.stats.pending_scheduled, 1);

    session.shutdown().await;
}

#[test]
fn test_config_overrides() {
    let config = EngineConfig::from_json_str(
        r#"{ "session": { "poll_interval_ms": 1000 }, "reconciliation": { "project_category": "projetos" } }"#,
    )
    .unwrap();
    assert_eq!(config.session.poll_interval(), Duration::from_millis(1000));
    assert_eq!(config.session.debounce(), Duration::from_millis(100));
    assert_eq!(config.reconciliation.project_category().as_str(), "PROJETOS");
}
