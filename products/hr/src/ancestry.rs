//! Reporting-line queries over the flat roster.
//!
//! Every cycle check in the crate goes through [`is_ancestor`], whether it is
//! guarding a drag-and-drop reassignment or a bulk "add parent".

use std::collections::{HashMap, HashSet};

use crate::model::Employee;

/// True when `ancestor_id` appears on the management chain above `node_id`.
///
/// Walks `manager_id` upward from `node_id`. The walk stops at a root, at a
/// dangling reference, or when it revisits an id (a cycle already in storage).
/// A node is not its own ancestor.
pub fn is_ancestor(employees: &[Employee], ancestor_id: &str, node_id: &str) -> bool {
    chain_of_command(employees, node_id)
        .iter()
        .any(|id| id == ancestor_id)
}

/// True when making `new_manager_id` the manager of `node_id` would close a
/// loop: either the two are the same record or `node_id` already sits above
/// `new_manager_id`.
pub fn would_create_cycle(employees: &[Employee], node_id: &str, new_manager_id: &str) -> bool {
    node_id == new_manager_id || is_ancestor(employees, node_id, new_manager_id)
}

/// Manager ids above `node_id`, nearest first.
///
/// Only ids that resolve to a record are listed. On a stored cycle the chain
/// ends just before it would repeat.
pub fn chain_of_command(employees: &[Employee], node_id: &str) -> Vec<String> {
    let managers: HashMap<&str, Option<&str>> = employees
        .iter()
        .map(|employee| (employee.id.as_str(), employee.manager_id.as_deref()))
        .collect();

    let mut chain = Vec::new();
    let mut visited = HashSet::from([node_id]);
    let mut current = node_id;
    while let Some(Some(manager)) = managers.get(current) {
        let manager = *manager;
        if !managers.contains_key(manager) || !visited.insert(manager) {
            break;
        }
        chain.push(manager.to_string());
        current = manager;
    }
    chain
}
