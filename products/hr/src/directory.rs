//! Application state for the roster and the reducer that mutates it.

use std::collections::HashSet;

use crate::model::Employee;
use crate::tree::{TreeNode, active_team, build_team_tree};

/// Named state transitions. [`Directory::apply`] is the only way to change a
/// [`Directory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SetEmployees(Vec<Employee>),
    SetSearch(String),
    SetTeamFilter(Option<String>),
    UpdateEmployee(Employee),
    AddEmployee(Employee),
    RemoveEmployee(String),
    SetLoading(bool),
    SetError(Option<String>),
    Select(Option<String>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    employees: Vec<Employee>,
    search: String,
    team_filter: Option<String>,
    selected: Option<String>,
    loading: bool,
    error: Option<String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetEmployees(employees) => self.employees = employees,
            Action::SetSearch(value) => self.search = value,
            Action::SetTeamFilter(value) => self.team_filter = value,
            Action::UpdateEmployee(employee) => {
                if let Some(slot) = self.employees.iter_mut().find(|e| e.id == employee.id) {
                    *slot = employee;
                }
            }
            Action::AddEmployee(employee) => self.employees.push(employee),
            Action::RemoveEmployee(id) => {
                self.employees.retain(|e| e.id != id);
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.selected = None;
                }
            }
            Action::SetLoading(value) => self.loading = value,
            Action::SetError(value) => self.error = value,
            Action::Select(value) => self.selected = value,
        }
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.employee(id).is_some()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn team_filter(&self) -> Option<&str> {
        self.team_filter.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_employee(&self) -> Option<&Employee> {
        self.selected().and_then(|id| self.employee(id))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Employees matching both the search text and the team filter.
    ///
    /// Search is a case-insensitive substring match over name, designation and
    /// team run together.
    pub fn visible(&self) -> Vec<&Employee> {
        let needle = self.search.to_lowercase();
        let team = active_team(self.team_filter());
        self.employees
            .iter()
            .filter(|e| {
                let haystack = format!("{}{}{}", e.name, e.designation, e.team).to_lowercase();
                haystack.contains(&needle) && team.is_none_or(|team| e.team == team)
            })
            .collect()
    }

    /// Distinct team names in order of first appearance.
    pub fn teams(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.employees
            .iter()
            .map(|e| e.team.as_str())
            .filter(|team| seen.insert(*team))
            .collect()
    }

    /// The chart for the current team filter.
    pub fn tree(&self) -> Vec<TreeNode> {
        build_team_tree(&self.employees, self.team_filter())
    }
}
