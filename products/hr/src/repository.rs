//! The persistence collaborator: a keyed collection of roster records.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Employee, EmployeePatch};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("employee {0} not found")]
    NotFound(String),
    #[error("employee {0} already exists")]
    Duplicate(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage for employee records. Implementations only store; they do not
/// validate reporting lines.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// All records, in insertion order.
    async fn list(&self) -> RepositoryResult<Vec<Employee>>;

    /// Apply `patch` to record `id` and return the stored result.
    async fn update(&self, id: &str, patch: &EmployeePatch) -> RepositoryResult<Employee>;

    /// Store a record whose id has already been assigned.
    async fn create(&self, employee: Employee) -> RepositoryResult<Employee>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;
}

/// Process-local repository backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: Mutex<Vec<Employee>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Employee>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn records(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Vec<Employee>>> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Backend("in-memory store poisoned".into()))
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryRepository {
    async fn list(&self) -> RepositoryResult<Vec<Employee>> {
        Ok(self.records()?.clone())
    }

    async fn update(&self, id: &str, patch: &EmployeePatch) -> RepositoryResult<Employee> {
        let mut records = self.records()?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        record.apply(patch);
        Ok(record.clone())
    }

    async fn create(&self, employee: Employee) -> RepositoryResult<Employee> {
        let mut records = self.records()?;
        if records.iter().any(|record| record.id == employee.id) {
            return Err(RepositoryError::Duplicate(employee.id));
        }
        records.push(employee.clone());
        Ok(employee)
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crud_round_trip_keeps_insertion_order() {
        let repo = InMemoryRepository::new();
        repo.create(Employee::new("b", "B", "Employee", "General", None))
            .await
            .unwrap();
        repo.create(Employee::new("a", "A", "Employee", "General", None))
            .await
            .unwrap();

        let updated = repo
            .update("a", &EmployeePatch::manager(Some("b".into())))
            .await
            .unwrap();
        assert_eq!(updated.manager_id.as_deref(), Some("b"));

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        repo.delete("b").await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_and_duplicate_records_are_reported() {
        let repo = InMemoryRepository::with_records(vec![Employee::new(
            "a", "A", "Employee", "General", None,
        )]);
        assert_eq!(
            repo.create(Employee::new("a", "A2", "Employee", "General", None))
                .await,
            Err(RepositoryError::Duplicate("a".into()))
        );
        assert_eq!(
            repo.update("zz", &EmployeePatch::default()).await,
            Err(RepositoryError::NotFound("zz".into()))
        );
        assert_eq!(
            repo.delete("zz").await,
            Err(RepositoryError::NotFound("zz".into()))
        );
    }
}
