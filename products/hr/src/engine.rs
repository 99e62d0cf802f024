//! The hierarchy mutation engine.
//!
//! [`OrgChart`] owns the roster state and the repository. Every structural
//! edit is validated against the current roster before the repository is
//! called, and the state is only updated from what the repository returns.
//! The state lock is never held across a repository call, so two edits issued
//! back to back run independently and the later write wins.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::ancestry::is_ancestor;
use crate::directory::{Action, Directory};
use crate::error::{HrError, HrResult, Rejection};
use crate::model::{Employee, EmployeePatch, generate_employee_id};
use crate::repository::EmployeeRepository;

const DEFAULT_DESIGNATION: &str = "Employee";
const DEFAULT_TEAM: &str = "General";
const MANAGER_DESIGNATION: &str = "Manager";
const MANAGER_TEAM: &str = "Management";

/// What a bulk edit does relative to the selected node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Children,
    Siblings,
    Parent,
    Remove,
}

impl EditMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Children => "children",
            EditMode::Siblings => "siblings",
            EditMode::Parent => "parent",
            EditMode::Remove => "remove",
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "children" => Ok(EditMode::Children),
            "siblings" => Ok(EditMode::Siblings),
            "parent" => Ok(EditMode::Parent),
            "remove" => Ok(EditMode::Remove),
            other => Err(format!("unknown edit mode: {other}")),
        }
    }
}

/// A step of a bulk edit that the repository refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkFailure {
    /// The entered name, or the employee id for reassignment and removal.
    pub subject: String,
    pub error: HrError,
}

/// Outcome of a bulk edit. Steps run in order and are not rolled back, so
/// `created` lists everything that was committed even when `failures` is not
/// empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkEditReport {
    pub mode: EditMode,
    pub created: Vec<Employee>,
    pub reassigned: Option<Employee>,
    pub removed: Option<String>,
    pub failures: Vec<BulkFailure>,
}

impl BulkEditReport {
    fn new(mode: EditMode) -> Self {
        Self {
            mode,
            created: Vec::new(),
            reassigned: None,
            removed: None,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct OrgChart {
    repository: Arc<dyn EmployeeRepository>,
    state: RwLock<Directory>,
}

impl OrgChart {
    pub fn new(repository: Arc<dyn EmployeeRepository>) -> Self {
        Self {
            repository,
            state: RwLock::new(Directory::new()),
        }
    }

    /// Create the chart and load the roster. A failed load is kept in the
    /// directory's error state rather than returned.
    pub async fn open(repository: Arc<dyn EmployeeRepository>) -> Self {
        let chart = Self::new(repository);
        let _ = chart.load().await;
        chart
    }

    pub async fn snapshot(&self) -> Directory {
        self.state.read().await.clone()
    }

    pub async fn view<T>(&self, read: impl FnOnce(&Directory) -> T) -> T {
        read(&*self.state.read().await)
    }

    pub async fn dispatch(&self, action: Action) {
        self.state.write().await.apply(action);
    }

    /// Replace the roster with the repository's current contents.
    #[instrument(name = "orgchart.load", skip_all)]
    pub async fn load(&self) -> HrResult<()> {
        self.dispatch(Action::SetLoading(true)).await;
        let result = self.repository.list().await;
        let mut state = self.state.write().await;
        let outcome = match result {
            Ok(employees) => {
                info!(count = employees.len(), "roster loaded");
                state.apply(Action::SetEmployees(employees));
                state.apply(Action::SetError(None));
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to load roster");
                state.apply(Action::SetError(Some(err.to_string())));
                Err(err.into())
            }
        };
        state.apply(Action::SetLoading(false));
        outcome
    }

    #[instrument(name = "orgchart.select", skip(self))]
    pub async fn select(&self, node_id: Option<&str>) -> HrResult<()> {
        let mut state = self.state.write().await;
        if let Some(id) = node_id {
            if !state.contains(id) {
                return Err(Rejection::UnknownEmployee(id.to_string()).into());
            }
        }
        state.apply(Action::Select(node_id.map(str::to_string)));
        Ok(())
    }

    /// Move `node_id` under `new_manager_id`, or make it a root with `None`.
    ///
    /// Rejected without touching storage when either record is unknown, when
    /// the node would manage itself, or when the new manager reports to the
    /// node somewhere below it.
    #[instrument(name = "orgchart.update_manager", skip(self))]
    pub async fn update_manager(
        &self,
        node_id: &str,
        new_manager_id: Option<&str>,
    ) -> HrResult<Employee> {
        {
            let state = self.state.read().await;
            check_reassignment(&state, node_id, new_manager_id)?;
        }
        let patch = EmployeePatch::manager(new_manager_id.map(str::to_string));
        self.commit_update(node_id, &patch).await
    }

    /// Edit a record's details. A manager change in the patch is validated
    /// exactly like [`OrgChart::update_manager`]; designation and team of a
    /// record without a manager are locked.
    #[instrument(name = "orgchart.update_details", skip(self, patch))]
    pub async fn update_details(&self, id: &str, patch: EmployeePatch) -> HrResult<Employee> {
        let current = {
            let state = self.state.read().await;
            let current = state
                .employee(id)
                .cloned()
                .ok_or_else(|| Rejection::UnknownEmployee(id.to_string()))?;
            if current.is_root_record() {
                if matches!(&patch.designation, Some(d) if d != &current.designation) {
                    return Err(locked(id, "designation"));
                }
                if matches!(&patch.team, Some(t) if t != &current.team) {
                    return Err(locked(id, "team"));
                }
            }
            if patch.changes_manager_of(&current) {
                let next = patch.manager_id.clone().flatten();
                check_reassignment(&state, id, next.as_deref())?;
            }
            current
        };
        if patch.is_empty() {
            return Ok(current);
        }
        self.commit_update(id, &patch).await
    }

    /// Add one record. An empty id is replaced by a generated one; a manager
    /// reference that does not resolve is kept and the record shows as a root.
    #[instrument(name = "orgchart.create_employee", skip_all, fields(id = %employee.id))]
    pub async fn create_employee(&self, mut employee: Employee) -> HrResult<Employee> {
        if employee.id.trim().is_empty() {
            employee.id = generate_employee_id();
        }
        if self.view(|state| state.contains(&employee.id)).await {
            return Err(Rejection::DuplicateId(employee.id).into());
        }
        self.commit_create(employee).await
    }

    /// Delete one record. Its reports are left pointing at the removed id and
    /// therefore surface as roots.
    #[instrument(name = "orgchart.remove_node", skip(self))]
    pub async fn remove_node(&self, node_id: &str) -> HrResult<()> {
        if !self.view(|state| state.contains(node_id)).await {
            return Err(Rejection::UnknownEmployee(node_id.to_string()).into());
        }
        if let Err(err) = self.repository.delete(node_id).await {
            error!(error = %err, node_id, "failed to delete employee");
            return Err(err.into());
        }
        self.dispatch(Action::RemoveEmployee(node_id.to_string())).await;
        info!(node_id, "employee removed");
        Ok(())
    }

    /// [`OrgChart::bulk_edit`] against the directory's current selection.
    pub async fn bulk_edit_selected(
        &self,
        mode: EditMode,
        names: &[String],
    ) -> HrResult<BulkEditReport> {
        let selected = self.view(|state| state.selected().map(str::to_string)).await;
        self.bulk_edit(selected.as_deref(), mode, names).await
    }

    /// Create or remove records relative to `selected`.
    ///
    /// * `children`: one report of the selected node per name.
    /// * `siblings`: one record per name under the selected node's manager.
    /// * `parent`: one "Manager" per name under the selected node's former
    ///   manager; the selected node is moved under each in turn and ends up
    ///   under the last.
    /// * `remove`: deletes the selected node; `names` is ignored.
    ///
    /// Rejections abort before any write. Repository failures do not abort:
    /// they are logged and recorded in the report while remaining names are
    /// still attempted.
    #[instrument(name = "orgchart.bulk_edit", skip(self, names), fields(names = names.len()))]
    pub async fn bulk_edit(
        &self,
        selected: Option<&str>,
        mode: EditMode,
        names: &[String],
    ) -> HrResult<BulkEditReport> {
        let selected_id = selected.ok_or(Rejection::NoSelection)?;
        let anchor = self
            .view(|state| state.employee(selected_id).cloned())
            .await
            .ok_or_else(|| Rejection::UnknownEmployee(selected_id.to_string()))?;

        let mut report = BulkEditReport::new(mode);
        let (manager_id, designation, team) = match mode {
            EditMode::Children => (Some(anchor.id.clone()), DEFAULT_DESIGNATION, DEFAULT_TEAM),
            EditMode::Siblings => (anchor.manager_id.clone(), DEFAULT_DESIGNATION, DEFAULT_TEAM),
            EditMode::Parent => (anchor.manager_id.clone(), MANAGER_DESIGNATION, MANAGER_TEAM),
            EditMode::Remove => {
                match self.remove_node(&anchor.id).await {
                    Ok(()) => report.removed = Some(anchor.id),
                    Err(err @ HrError::Repository(_)) => report.failures.push(BulkFailure {
                        subject: anchor.id,
                        error: err,
                    }),
                    Err(err) => return Err(err),
                }
                return Ok(report);
            }
        };

        for name in names {
            let draft = Employee::new(
                generate_employee_id(),
                name.as_str(),
                designation,
                team,
                manager_id.clone(),
            );
            let created = match self.commit_create(draft).await {
                Ok(created) => created,
                Err(err) => {
                    report.failures.push(BulkFailure {
                        subject: name.clone(),
                        error: err,
                    });
                    continue;
                }
            };
            let new_manager = created.id.clone();
            report.created.push(created);

            if mode == EditMode::Parent {
                match self.update_manager(&anchor.id, Some(&new_manager)).await {
                    Ok(moved) => report.reassigned = Some(moved),
                    Err(err) => report.failures.push(BulkFailure {
                        subject: anchor.id.clone(),
                        error: err,
                    }),
                }
            }
        }

        debug!(
            created = report.created.len(),
            failures = report.failures.len(),
            "bulk edit applied"
        );
        Ok(report)
    }

    async fn commit_update(&self, id: &str, patch: &EmployeePatch) -> HrResult<Employee> {
        match self.repository.update(id, patch).await {
            Ok(updated) => {
                self.dispatch(Action::UpdateEmployee(updated.clone())).await;
                Ok(updated)
            }
            Err(err) => {
                error!(error = %err, id, "failed to update employee");
                Err(err.into())
            }
        }
    }

    async fn commit_create(&self, employee: Employee) -> HrResult<Employee> {
        match self.repository.create(employee).await {
            Ok(created) => {
                self.dispatch(Action::AddEmployee(created.clone())).await;
                Ok(created)
            }
            Err(err) => {
                error!(error = %err, "failed to create employee");
                Err(err.into())
            }
        }
    }
}

fn check_reassignment(
    state: &Directory,
    node_id: &str,
    new_manager_id: Option<&str>,
) -> Result<(), Rejection> {
    if !state.contains(node_id) {
        return Err(Rejection::UnknownEmployee(node_id.to_string()));
    }
    let Some(manager_id) = new_manager_id else {
        return Ok(());
    };
    if manager_id == node_id {
        return Err(Rejection::SelfManager(node_id.to_string()));
    }
    if !state.contains(manager_id) {
        return Err(Rejection::UnknownManager(manager_id.to_string()));
    }
    if is_ancestor(state.employees(), node_id, manager_id) {
        return Err(Rejection::CycleDetected {
            node_id: node_id.to_string(),
            manager_id: manager_id.to_string(),
        });
    }
    Ok(())
}

fn locked(id: &str, field: &'static str) -> HrError {
    Rejection::LockedField {
        id: id.to_string(),
        field,
    }
    .into()
}
