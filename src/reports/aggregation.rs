//! Pure rollups over a transaction collection.
//!
//! Callers pre-filter by account and period; nothing here reads the store.

use bigdecimal::BigDecimal;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reports::filter::days_in_month;
use crate::types::*;

/// Short month labels, January first
pub const MONTH_LABELS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Income/expense sums for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// Short label, e.g. `"mar"`
    pub month: String,
    /// 1-based month number
    pub month_number: u32,
    pub income: BigDecimal,
    pub expenses: BigDecimal,
    /// `income - expenses`
    pub balance: BigDecimal,
}

/// Income/expense sums for one day of a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub day: u32,
    pub income: BigDecimal,
    pub expenses: BigDecimal,
    pub balance: BigDecimal,
}

/// Per-category accumulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: Category,
    pub income: BigDecimal,
    pub expenses: BigDecimal,
    /// `income - expenses`
    pub net: BigDecimal,
    pub count: usize,
    /// `(income + expenses) / count`
    pub average: BigDecimal,
}

/// Totals over an arbitrary transaction collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: BigDecimal,
    pub expenses: BigDecimal,
    pub balance: BigDecimal,
    pub count: usize,
}

impl Default for PeriodTotals {
    fn default() -> Self {
        Self {
            income: BigDecimal::from(0),
            expenses: BigDecimal::from(0),
            balance: BigDecimal::from(0),
            count: 0,
        }
    }
}

#[derive(Default)]
struct Sums {
    income: BigDecimal,
    expenses: BigDecimal,
}

impl Sums {
    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            TransactionKind::Income => self.income += &transaction.amount,
            TransactionKind::Expense => self.expenses += &transaction.amount,
        }
    }

    fn balance(&self) -> BigDecimal {
        &self.income - &self.expenses
    }
}

/// Twelve zero-filled monthly buckets for `year`, January through December
pub fn monthly_rollup(transactions: &[Transaction], year: i32) -> Vec<MonthlyBucket> {
    let mut sums: Vec<Sums> = (0..12).map(|_| Sums::default()).collect();

    for transaction in transactions.iter().filter(|t| t.date.year() == year) {
        sums[transaction.date.month0() as usize].add(transaction);
    }

    sums.into_iter()
        .zip(MONTH_LABELS)
        .enumerate()
        .map(|(index, (sums, label))| MonthlyBucket {
            month: label.to_string(),
            month_number: index as u32 + 1,
            balance: sums.balance(),
            income: sums.income,
            expenses: sums.expenses,
        })
        .collect()
}

/// One zero-filled bucket per calendar day of `year`/`month`
pub fn daily_rollup(
    transactions: &[Transaction],
    year: i32,
    month: u32,
) -> LedgerResult<Vec<DailyBucket>> {
    let days = days_in_month(year, month).ok_or_else(|| {
        LedgerError::Validation(format!("Invalid month {}-{}", year, month))
    })?;
    let mut sums: Vec<Sums> = (0..days).map(|_| Sums::default()).collect();

    for transaction in transactions
        .iter()
        .filter(|t| t.date.year() == year && t.date.month() == month)
    {
        sums[transaction.date.day0() as usize].add(transaction);
    }

    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(index, sums)| DailyBucket {
            day: index as u32 + 1,
            balance: sums.balance(),
            income: sums.income,
            expenses: sums.expenses,
        })
        .collect())
}

/// Group by category in first-encountered order
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryStats> {
    let mut order: Vec<Category> = Vec::new();
    let mut groups: HashMap<Category, (Sums, usize)> = HashMap::new();

    for transaction in transactions {
        let entry = groups.entry(transaction.category.clone()).or_insert_with(|| {
            order.push(transaction.category.clone());
            (Sums::default(), 0)
        });
        entry.0.add(transaction);
        entry.1 += 1;
    }

    order
        .into_iter()
        .filter_map(|category| {
            let (sums, count) = groups.remove(&category)?;
            // count >= 1 for every category that made it into `order`
            let average = (&sums.income + &sums.expenses) / BigDecimal::from(count as u64);
            Some(CategoryStats {
                net: sums.balance(),
                income: sums.income,
                expenses: sums.expenses,
                count,
                average,
                category,
            })
        })
        .collect()
}

/// The `limit` categories with the highest net amount. Ties keep their
/// first-encountered order.
pub fn top_categories(breakdown: &[CategoryStats], limit: usize) -> Vec<CategoryStats> {
    let mut ranked = breakdown.to_vec();
    ranked.sort_by(|a, b| b.net.cmp(&a.net));
    ranked.truncate(limit);
    ranked
}

/// Total income, expenses, balance and count
pub fn period_totals(transactions: &[Transaction]) -> PeriodTotals {
    let mut sums = Sums::default();
    for transaction in transactions {
        sums.add(transaction);
    }
    PeriodTotals {
        balance: sums.balance(),
        income: sums.income,
        expenses: sums.expenses,
        count: transactions.len(),
    }
}

/// Portfolio counts over a project collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Sum of every project's value, cancelled ones included
    pub total_value: BigDecimal,
}

pub fn project_stats(projects: &[Project]) -> ProjectStats {
    let count = |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();
    ProjectStats {
        total: projects.len(),
        in_progress: count(ProjectStatus::InProgress),
        completed: count(ProjectStatus::Completed),
        total_value: projects.iter().map(|p| &p.value).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(date: (i32, u32, u32), kind: TransactionKind, amount: i64, category: &str) -> Transaction {
        Transaction::new(
            "owner",
            format!("{} {}", category, amount),
            BigDecimal::from(amount),
            kind,
            category,
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        )
    }

    fn march_fixture() -> Vec<Transaction> {
        vec![
            txn((2024, 3, 5), TransactionKind::Income, 1000, "PROJETO"),
            txn((2024, 3, 20), TransactionKind::Expense, 400, "ALUGUEL"),
        ]
    }

    #[test]
    fn test_monthly_rollup_end_to_end() {
        let rollup = monthly_rollup(&march_fixture(), 2024);

        assert_eq!(rollup.len(), 12);
        let march = &rollup[2];
        assert_eq!(march.month, "mar");
        assert_eq!(march.income, BigDecimal::from(1000));
        assert_eq!(march.expenses, BigDecimal::from(400));
        assert_eq!(march.balance, BigDecimal::from(600));

        for bucket in rollup.iter().filter(|b| b.month_number != 3) {
            assert_eq!(bucket.income, BigDecimal::from(0));
            assert_eq!(bucket.expenses, BigDecimal::from(0));
            assert_eq!(bucket.balance, BigDecimal::from(0));
        }
    }

    #[test]
    fn test_monthly_rollup_zero_fills_empty_input() {
        let rollup = monthly_rollup(&[], 2023);
        assert_eq!(rollup.len(), 12);
        assert_eq!(rollup[0].month, "jan");
        assert_eq!(rollup[11].month, "dec");
    }

    #[test]
    fn test_monthly_rollup_ignores_other_years() {
        let txns = vec![txn((2023, 3, 5), TransactionKind::Income, 10, "X")];
        assert!(monthly_rollup(&txns, 2024)
            .iter()
            .all(|b| b.income == BigDecimal::from(0)));
    }

    #[test]
    fn test_daily_rollup_shape_and_balance() {
        let rollup = daily_rollup(&march_fixture(), 2024, 3).unwrap();
        assert_eq!(rollup.len(), 31);
        assert_eq!(rollup[4].income, BigDecimal::from(1000));
        assert_eq!(rollup[19].balance, BigDecimal::from(-400));
        for bucket in &rollup {
            assert_eq!(bucket.balance, &bucket.income - &bucket.expenses);
        }

        assert_eq!(daily_rollup(&[], 2024, 2).unwrap().len(), 29);
        assert_eq!(daily_rollup(&[], 2023, 2).unwrap().len(), 28);
        assert!(daily_rollup(&[], 2024, 0).is_err());
    }

    #[test]
    fn test_category_breakdown() {
        let txns = vec![
            txn((2024, 1, 1), TransactionKind::Income, 300, "design"),
            txn((2024, 1, 2), TransactionKind::Expense, 100, "DESIGN"),
            txn((2024, 1, 3), TransactionKind::Expense, 50, "food"),
        ];
        let breakdown = category_breakdown(&txns);

        assert_eq!(breakdown.len(), 2);
        let design = &breakdown[0];
        assert_eq!(design.category.as_str(), "DESIGN");
        assert_eq!(design.count, 2);
        assert_eq!(design.net, BigDecimal::from(200));
        assert_eq!(design.average, BigDecimal::from(200));
        assert_eq!(breakdown[1].net, BigDecimal::from(-50));
    }

    #[test]
    fn test_top_categories_sorted_by_net_with_stable_ties() {
        let txns = vec![
            txn((2024, 1, 1), TransactionKind::Income, 100, "A"),
            txn((2024, 1, 1), TransactionKind::Income, 500, "B"),
            txn((2024, 1, 1), TransactionKind::Income, 100, "C"),
            txn((2024, 1, 1), TransactionKind::Expense, 20, "D"),
        ];
        let top = top_categories(&category_breakdown(&txns), 3);
        let names: Vec<&str> = top.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_period_totals() {
        let totals = period_totals(&march_fixture());
        assert_eq!(totals.income, BigDecimal::from(1000));
        assert_eq!(totals.expenses, BigDecimal::from(400));
        assert_eq!(totals.balance, BigDecimal::from(600));
        assert_eq!(totals.count, 2);
        assert_eq!(period_totals(&[]), PeriodTotals::default());
    }

    #[test]
    fn test_project_stats() {
        let project = |value: i64, status: ProjectStatus| {
            Project::new("owner", "c-1", "Work", BigDecimal::from(value)).with_status(status)
        };
        let stats = project_stats(&[
            project(1000, ProjectStatus::InProgress),
            project(500, ProjectStatus::Completed),
            project(250, ProjectStatus::Cancelled),
            project(300, ProjectStatus::InProgress),
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.in_progress, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.total_value, BigDecimal::from(2050));

        let empty = project_stats(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.total_value, BigDecimal::from(0));
    }
}
