//! Case-insensitive text search over stored records.
//!
//! Like the rollups, these work on slices the caller already scoped to one
//! account.

use std::collections::HashMap;

use crate::types::*;

/// A lowercased search term. The empty term matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(term: impl AsRef<str>) -> Self {
        Self(term.as_ref().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `text` contains the term, ignoring case
    pub fn matches(&self, text: &str) -> bool {
        self.is_empty() || text.to_lowercase().contains(&self.0)
    }

    fn matches_any<'a>(&self, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
        self.is_empty() || fields.into_iter().flatten().any(|field| self.matches(field))
    }
}

impl From<&str> for SearchQuery {
    fn from(term: &str) -> Self {
        Self::new(term)
    }
}

/// Clients whose name, email or phone contain the term
pub fn search_clients(clients: &[Client], query: &SearchQuery) -> Vec<Client> {
    clients
        .iter()
        .filter(|c| {
            query.matches_any([
                Some(c.name.as_str()),
                c.email.as_deref(),
                c.phone.as_deref(),
            ])
        })
        .cloned()
        .collect()
}

/// Projects whose title, client name or status label contain the term.
/// A project pointing at a missing client is matched on its other fields.
pub fn search_projects(projects: &[Project], clients: &[Client], query: &SearchQuery) -> Vec<Project> {
    let client_names: HashMap<&str, &str> = clients
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    projects
        .iter()
        .filter(|p| {
            query.matches_any([
                Some(p.title.as_str()),
                client_names.get(p.client_id.as_str()).copied(),
                Some(p.status.label()),
            ])
        })
        .cloned()
        .collect()
}

/// Scheduled items whose description, category or kind label contain the term
pub fn search_scheduled(items: &[ScheduledTransaction], query: &SearchQuery) -> Vec<ScheduledTransaction> {
    items
        .iter()
        .filter(|s| {
            query.matches_any([
                Some(s.description.as_str()),
                Some(s.category.as_str()),
                Some(s.kind.label()),
            ])
        })
        .cloned()
        .collect()
}

/// Transactions whose description or category contain the term
pub fn search_transactions(transactions: &[Transaction], query: &SearchQuery) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| query.matches_any([Some(t.description.as_str()), Some(t.category.as_str())]))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_client_search_checks_name_email_and_phone() {
        let clients = vec![
            Client::new("owner", "Studio Aurora").with_email("HI@aurora.example"),
            Client::new("owner", "Acme").with_phone("+55 11 9999"),
            Client::new("owner", "Globex"),
        ];

        let by_email = search_clients(&clients, &"hi@AURORA".into());
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].name, "Studio Aurora");

        let by_phone = search_clients(&clients, &"9999".into());
        assert_eq!(by_phone[0].name, "Acme");

        assert_eq!(search_clients(&clients, &SearchQuery::default()).len(), 3);
        assert!(search_clients(&clients, &"initech".into()).is_empty());
    }

    #[test]
    fn test_project_search_includes_client_name_and_status() {
        let acme = Client::new("owner", "Acme");
        let site = Project::new("owner", acme.id.clone(), "Website", BigDecimal::from(100));
        let logo = Project::new("owner", "gone", "Logo", BigDecimal::from(50))
            .with_status(ProjectStatus::Completed);
        let projects = vec![site, logo];
        let clients = vec![acme];

        let by_client = search_projects(&projects, &clients, &"acme".into());
        assert_eq!(by_client.len(), 1);
        assert_eq!(by_client[0].title, "Website");

        let by_status = search_projects(&projects, &clients, &"complet".into());
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].title, "Logo");

        assert_eq!(search_projects(&projects, &clients, &"in progress".into()).len(), 1);
    }

    #[test]
    fn test_scheduled_and_transaction_search() {
        let rent = ScheduledTransaction::new(
            "owner",
            "Office rent",
            BigDecimal::from(500),
            TransactionKind::Expense,
            "aluguel",
            date(2024, 4, 1),
        );
        let invoice = ScheduledTransaction::new(
            "owner",
            "Invoice 42",
            BigDecimal::from(900),
            TransactionKind::Income,
            "sales",
            date(2024, 4, 5),
        );
        let items = vec![rent, invoice];
        assert_eq!(search_scheduled(&items, &"ALUGUEL".into())[0].description, "Office rent");
        assert_eq!(search_scheduled(&items, &"income".into())[0].description, "Invoice 42");

        let txns = vec![Transaction::new(
            "owner",
            "Coffee beans",
            BigDecimal::from(40),
            TransactionKind::Expense,
            "food",
            date(2024, 3, 2),
        )];
        assert_eq!(search_transactions(&txns, &"COFFEE".into()).len(), 1);
        assert_eq!(search_transactions(&txns, &"food".into()).len(), 1);
        assert!(search_transactions(&txns, &"tea".into()).is_empty());
    }
}
