//! Derivation of the org chart forest from the flat roster.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::model::Employee;

/// Team filter value that the sidebar dropdown uses for "no filter".
pub const ALL_TEAMS: &str = "All Teams";

/// An employee together with its direct reports, in roster order.
///
/// Nodes are a throwaway projection: they are rebuilt on every read and never
/// written back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub employee: Employee,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(employee: Employee) -> Self {
        Self {
            employee,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.employee.id
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        self.walk().count()
    }

    /// Levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.walk().map(|(level, _)| level).max().unwrap_or(1)
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.walk()
            .map(|(_, node)| node)
            .find(|node| node.employee.id == id)
    }

    /// Pre-order traversal with 1-based levels, driven by an explicit stack
    /// so chain length is not bounded by the call stack.
    fn walk(&self) -> impl Iterator<Item = (usize, &TreeNode)> {
        let mut pending = vec![(1, self)];
        std::iter::from_fn(move || {
            let (level, node) = pending.pop()?;
            pending.extend(node.children.iter().rev().map(|child| (level + 1, child)));
            Some((level, node))
        })
    }
}

// The derived drop would recurse once per level.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Build the forest described by the roster's manager references.
///
/// A record is a root when its `manager_id` is absent or does not resolve
/// inside `employees`. Siblings keep the relative order of the input. When an
/// id repeats, the first occurrence fixes the position and the last one
/// supplies the fields.
///
/// Stored manager cycles cannot be reached from any natural root. Such nodes
/// are still emitted exactly once: the first cycle member found above the
/// earliest unplaced record is promoted to a root.
pub fn build_tree(employees: &[Employee]) -> Vec<TreeNode> {
    let mut slot_of: HashMap<&str, usize> = HashMap::with_capacity(employees.len());
    let mut records: Vec<&Employee> = Vec::with_capacity(employees.len());
    for employee in employees {
        match slot_of.get(employee.id.as_str()) {
            Some(&slot) => records[slot] = employee,
            None => {
                slot_of.insert(employee.id.as_str(), records.len());
                records.push(employee);
            }
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut parent: Vec<Option<usize>> = vec![None; records.len()];
    let mut roots = Vec::new();
    for (slot, record) in records.iter().enumerate() {
        let manager = record
            .manager_id
            .as_deref()
            .and_then(|manager_id| slot_of.get(manager_id).copied());
        match manager {
            Some(manager) => {
                children[manager].push(slot);
                parent[slot] = Some(manager);
            }
            None => roots.push(slot),
        }
    }

    let mut placed = vec![false; records.len()];
    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .map(|root| assemble(root, &records, &children, &mut placed))
        .collect();

    for slot in 0..records.len() {
        if placed[slot] {
            continue;
        }
        let anchor = cycle_anchor(slot, &parent);
        warn!(
            employee_id = %records[anchor].id,
            "manager references form a cycle; promoting employee to root"
        );
        forest.push(assemble(anchor, &records, &children, &mut placed));
    }

    forest
}

/// [`build_tree`] over the members of one team.
///
/// Filtering happens before the build, so an employee whose manager sits in
/// another team becomes a root of the filtered chart. `None`, the empty string
/// and [`ALL_TEAMS`] disable the filter.
pub fn build_team_tree(employees: &[Employee], team_filter: Option<&str>) -> Vec<TreeNode> {
    match active_team(team_filter) {
        Some(team) => {
            let members: Vec<Employee> = employees
                .iter()
                .filter(|employee| employee.team == team)
                .cloned()
                .collect();
            build_tree(&members)
        }
        None => build_tree(employees),
    }
}

pub(crate) fn active_team(team_filter: Option<&str>) -> Option<&str> {
    team_filter.filter(|team| !team.is_empty() && *team != ALL_TEAMS)
}

// Depth-first without recursion: `current` is the node whose children are
// being visited, `ancestors` the open nodes above it. A node is attached to
// its parent once all of its own children are done.
fn assemble(
    root: usize,
    records: &[&Employee],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> TreeNode {
    placed[root] = true;
    let mut ancestors: Vec<(TreeNode, std::slice::Iter<'_, usize>)> = Vec::new();
    let mut current = (TreeNode::leaf(records[root].clone()), children[root].iter());
    loop {
        if let Some(&child) = current.1.next() {
            if placed[child] {
                continue;
            }
            placed[child] = true;
            let next = (TreeNode::leaf(records[child].clone()), children[child].iter());
            ancestors.push(std::mem::replace(&mut current, next));
            continue;
        }
        let (done, _) = current;
        match ancestors.pop() {
            Some(mut parent) => {
                parent.0.children.push(done);
                current = parent;
            }
            None => return done,
        }
    }
}

// Every unplaced slot has a resolvable manager, so walking upward must
// eventually revisit a slot; that slot lies on the cycle.
fn cycle_anchor(start: usize, parent: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut current = start;
    while seen.insert(current) {
        match parent[current] {
            Some(next) => current = next,
            None => return current,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp(id: &str, manager: Option<&str>) -> Employee {
        Employee::new(id, id, "Employee", "General", manager.map(str::to_string))
    }

    fn emp_in(id: &str, manager: Option<&str>, team: &str) -> Employee {
        Employee::new(id, id, "Employee", team, manager.map(str::to_string))
    }

    fn ids(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(TreeNode::id).collect()
    }

    fn count(nodes: &[TreeNode]) -> usize {
        nodes.iter().map(TreeNode::size).sum()
    }

    #[test]
    fn single_root_with_children_in_input_order() {
        let forest = build_tree(&[emp("A", None), emp("B", Some("A")), emp("C", Some("A"))]);
        assert_eq!(ids(&forest), vec!["A"]);
        assert_eq!(ids(&forest[0].children), vec!["B", "C"]);
    }

    #[test]
    fn dangling_manager_becomes_root() {
        let forest = build_tree(&[emp("A", Some("ghost"))]);
        assert_eq!(ids(&forest), vec!["A"]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn children_listed_before_their_manager_still_attach() {
        let forest = build_tree(&[
            emp("C", Some("B")),
            emp("B", Some("A")),
            emp("A", None),
            emp("D", Some("B")),
        ]);
        assert_eq!(ids(&forest), vec!["A"]);
        let b = forest[0].find("B").unwrap();
        assert_eq!(ids(&b.children), vec!["C", "D"]);
        assert_eq!(forest[0].depth(), 3);
    }

    #[test]
    fn several_roots_form_a_forest() {
        let forest = build_tree(&[
            emp("A", None),
            emp("X", Some("missing")),
            emp("B", Some("A")),
            emp("Y", None),
        ]);
        assert_eq!(ids(&forest), vec!["A", "X", "Y"]);
        assert_eq!(count(&forest), 4);
    }

    #[test]
    fn empty_roster_yields_empty_forest() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn every_employee_is_placed_exactly_once() {
        let roster = vec![
            emp("1", None),
            emp("2", Some("1")),
            emp("3", Some("1")),
            emp("4", Some("2")),
            emp("5", Some("9")),
            emp("6", Some("5")),
            emp("7", None),
            emp("8", Some("7")),
        ];
        let forest = build_tree(&roster);
        assert_eq!(count(&forest), roster.len());
        for employee in &roster {
            let hits = forest.iter().filter_map(|root| root.find(&employee.id)).count();
            assert_eq!(hits, 1, "{} placed {} times", employee.id, hits);
        }
        assert_eq!(ids(&forest), vec!["1", "5", "7"]);
    }

    #[test]
    fn stored_cycle_is_broken_without_losing_nodes() {
        let forest = build_tree(&[emp("C", Some("A")), emp("A", Some("B")), emp("B", Some("A"))]);
        assert_eq!(count(&forest), 3);
        assert_eq!(ids(&forest), vec!["A"]);
        assert_eq!(ids(&forest[0].children), vec!["C", "B"]);
    }

    #[test]
    fn self_managed_record_is_promoted_to_root() {
        let forest = build_tree(&[emp("A", Some("A")), emp("B", Some("A"))]);
        assert_eq!(ids(&forest), vec!["A"]);
        assert_eq!(ids(&forest[0].children), vec!["B"]);
    }

    #[test]
    fn duplicate_ids_keep_first_position_and_last_fields() {
        let mut renamed = emp("A", None);
        renamed.name = "Renamed".into();
        let forest = build_tree(&[emp("A", None), emp("B", None), renamed]);
        assert_eq!(ids(&forest), vec!["A", "B"]);
        assert_eq!(forest[0].employee.name, "Renamed");
    }

    #[test]
    fn team_filter_cuts_cross_team_edges() {
        let roster = vec![
            emp_in("ceo", None, "Executive"),
            emp_in("cto", Some("ceo"), "Technology"),
            emp_in("dev", Some("cto"), "Technology"),
            emp_in("cfo", Some("ceo"), "Finance"),
        ];
        let forest = build_team_tree(&roster, Some("Technology"));
        assert_eq!(ids(&forest), vec!["cto"]);
        assert_eq!(ids(&forest[0].children), vec!["dev"]);

        assert_eq!(count(&build_team_tree(&roster, Some(ALL_TEAMS))), 4);
        assert_eq!(count(&build_team_tree(&roster, Some(""))), 4);
        assert_eq!(count(&build_team_tree(&roster, None)), 4);
        assert!(build_team_tree(&roster, Some("Nobody")).is_empty());
    }

    #[test]
    fn tree_nodes_serialize_flat_with_children() {
        let forest = build_tree(&[emp("A", None), emp("B", Some("A"))]);
        let value = serde_json::to_value(&forest[0]).unwrap();
        assert_eq!(value["id"], "A");
        assert_eq!(value["children"][0]["managerId"], "A");
    }

    fn chain(levels: usize) -> Vec<Employee> {
        (0..levels)
            .map(|level| {
                let manager = level.checked_sub(1).map(|above| format!("e{above}"));
                Employee::new(format!("e{level}"), "E", "Employee", "General", manager)
            })
            .collect()
    }

    #[test]
    fn ten_thousand_level_chain_builds_and_drops() {
        let forest = build_tree(&chain(10_000));
        assert_eq!(ids(&forest), vec!["e0"]);
        assert_eq!(forest[0].size(), 10_000);
        assert_eq!(forest[0].depth(), 10_000);
        let bottom = forest[0].find("e9999").unwrap();
        assert!(bottom.children.is_empty());
        assert_eq!(bottom.employee.manager_id.as_deref(), Some("e9998"));
    }

    #[test]
    fn deep_chain_closed_into_a_cycle_is_recovered() {
        let mut roster = chain(10_000);
        roster[0].manager_id = Some("e9999".into());
        let forest = build_tree(&roster);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].size(), 10_000);
    }
}
