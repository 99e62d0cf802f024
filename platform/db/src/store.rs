use async_trait::async_trait;
use entity::employees;
use products_hr::{Employee, EmployeePatch, EmployeeRepository, RepositoryError, RepositoryResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, QueryOrder, QuerySelect,
};
use tracing::instrument;

use crate::DbPool;

/// [`EmployeeRepository`] over the `employees` table.
///
/// Records are listed in insertion order, tracked by the `position` column.
#[derive(Clone, Debug)]
pub struct EmployeeStore {
    pool: DbPool,
}

impl EmployeeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn next_position(&self) -> RepositoryResult<i64> {
        let max = employees::Entity::find()
            .select_only()
            .column_as(employees::Column::Position.max(), "max_position")
            .into_tuple::<Option<i64>>()
            .one(&self.pool)
            .await
            .map_err(backend)?
            .flatten();
        Ok(max.map_or(0, |position| position + 1))
    }
}

fn backend(err: DbErr) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

fn into_employee(model: employees::Model) -> Employee {
    Employee {
        id: model.id,
        name: model.name,
        designation: model.designation,
        team: model.team,
        manager_id: model.manager_id,
        avatar: model.avatar,
    }
}

#[async_trait]
impl EmployeeRepository for EmployeeStore {
    #[instrument(name = "db.employees.list", skip(self), err)]
    async fn list(&self) -> RepositoryResult<Vec<Employee>> {
        let records = employees::Entity::find()
            .order_by_asc(employees::Column::Position)
            .order_by_asc(employees::Column::Id)
            .all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(records.into_iter().map(into_employee).collect())
    }

    #[instrument(name = "db.employees.update", skip(self, patch), err)]
    async fn update(&self, id: &str, patch: &EmployeePatch) -> RepositoryResult<Employee> {
        let existing = employees::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        if patch.is_empty() {
            return Ok(into_employee(existing));
        }

        let mut active: employees::ActiveModel = existing.into();
        if let Some(name) = &patch.name {
            active.name = Set(name.clone());
        }
        if let Some(designation) = &patch.designation {
            active.designation = Set(designation.clone());
        }
        if let Some(team) = &patch.team {
            active.team = Set(team.clone());
        }
        if let Some(manager_id) = &patch.manager_id {
            active.manager_id = Set(manager_id.clone());
        }
        if let Some(avatar) = &patch.avatar {
            active.avatar = Set(avatar.clone());
        }
        let updated = active.update(&self.pool).await.map_err(backend)?;
        Ok(into_employee(updated))
    }

    #[instrument(
        name = "db.employees.create",
        skip(self, employee),
        fields(id = %employee.id),
        err
    )]
    async fn create(&self, employee: Employee) -> RepositoryResult<Employee> {
        let exists = employees::Entity::find_by_id(employee.id.clone())
            .one(&self.pool)
            .await
            .map_err(backend)?
            .is_some();
        if exists {
            return Err(RepositoryError::Duplicate(employee.id));
        }

        let position = self.next_position().await?;
        let record = employees::ActiveModel {
            id: Set(employee.id.clone()),
            name: Set(employee.name.clone()),
            designation: Set(employee.designation.clone()),
            team: Set(employee.team.clone()),
            manager_id: Set(employee.manager_id.clone()),
            avatar: Set(employee.avatar.clone()),
            position: Set(position),
        };
        employees::Entity::insert(record)
            .exec_without_returning(&self.pool)
            .await
            .map_err(backend)?;
        Ok(employee)
    }

    #[instrument(name = "db.employees.delete", skip(self), err)]
    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        let result = employees::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
