use async_graphql::{Enum, InputObject, SimpleObject};
use platform_api::ApiError;
use products_hr::{BulkEditReport, BulkFailure, EditMode, Employee, EmployeePatch, TreeNode};

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Employee")]
pub struct EmployeeObject {
    pub id: String,
    pub name: String,
    pub designation: String,
    pub team: String,
    pub manager_id: Option<String>,
    pub avatar: Option<String>,
}

impl From<Employee> for EmployeeObject {
    fn from(value: Employee) -> Self {
        Self {
            id: value.id,
            name: value.name,
            designation: value.designation,
            team: value.team,
            manager_id: value.manager_id,
            avatar: value.avatar,
        }
    }
}

/// One node of the chart with its direct reports.
#[derive(Clone, Debug, SimpleObject)]
pub struct OrgNode {
    pub id: String,
    pub name: String,
    pub designation: String,
    pub team: String,
    pub manager_id: Option<String>,
    pub avatar: Option<String>,
    pub children: Vec<OrgNode>,
}

impl OrgNode {
    fn open(mut node: TreeNode) -> (Self, std::vec::IntoIter<TreeNode>) {
        let reports = std::mem::take(&mut node.children);
        let employee = std::mem::take(&mut node.employee);
        let shell = Self {
            id: employee.id,
            name: employee.name,
            designation: employee.designation,
            team: employee.team,
            manager_id: employee.manager_id,
            avatar: employee.avatar,
            children: Vec::with_capacity(reports.len()),
        };
        (shell, reports.into_iter())
    }
}

// Converted without recursion so arbitrarily deep charts are safe.
impl From<TreeNode> for OrgNode {
    fn from(value: TreeNode) -> Self {
        let mut ancestors = Vec::new();
        let mut current = OrgNode::open(value);
        loop {
            if let Some(child) = current.1.next() {
                ancestors.push(std::mem::replace(&mut current, OrgNode::open(child)));
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
}

impl Drop for OrgNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum BulkMode {
    Children,
    Siblings,
    Parent,
    Remove,
}

impl From<BulkMode> for EditMode {
    fn from(value: BulkMode) -> Self {
        match value {
            BulkMode::Children => EditMode::Children,
            BulkMode::Siblings => EditMode::Siblings,
            BulkMode::Parent => EditMode::Parent,
            BulkMode::Remove => EditMode::Remove,
        }
    }
}

impl From<EditMode> for BulkMode {
    fn from(value: EditMode) -> Self {
        match value {
            EditMode::Children => BulkMode::Children,
            EditMode::Siblings => BulkMode::Siblings,
            EditMode::Parent => BulkMode::Parent,
            EditMode::Remove => BulkMode::Remove,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct BulkFailurePayload {
    /// The name or id the failed write was about.
    pub subject: String,
    pub code: String,
    pub message: String,
}

impl From<BulkFailure> for BulkFailurePayload {
    fn from(value: BulkFailure) -> Self {
        let err = ApiError::from(value.error);
        Self {
            subject: value.subject,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct BulkEditPayload {
    pub mode: BulkMode,
    pub created: Vec<EmployeeObject>,
    pub reassigned: Option<EmployeeObject>,
    pub removed: Option<String>,
    pub failures: Vec<BulkFailurePayload>,
    pub complete: bool,
}

impl From<BulkEditReport> for BulkEditPayload {
    fn from(value: BulkEditReport) -> Self {
        let complete = value.is_complete();
        Self {
            mode: value.mode.into(),
            created: value.created.into_iter().map(EmployeeObject::from).collect(),
            reassigned: value.reassigned.map(EmployeeObject::from),
            removed: value.removed,
            failures: value
                .failures
                .into_iter()
                .map(BulkFailurePayload::from)
                .collect(),
            complete,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewEmployeeInput {
    /// Left empty to have an id generated.
    pub id: Option<String>,
    pub name: String,
    pub designation: String,
    pub team: String,
    pub manager_id: Option<String>,
    pub avatar: Option<String>,
}

impl From<NewEmployeeInput> for Employee {
    fn from(value: NewEmployeeInput) -> Self {
        let mut employee = Employee::new(
            value.id.unwrap_or_default(),
            value.name,
            value.designation,
            value.team,
            value.manager_id,
        );
        employee.avatar = value.avatar;
        employee
    }
}

/// Detail edits. `clearManager` and `clearAvatar` null the field; an
/// omitted field is left untouched.
#[derive(Clone, Debug, Default, InputObject)]
pub struct EmployeeChangesInput {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub team: Option<String>,
    pub manager_id: Option<String>,
    #[graphql(default)]
    pub clear_manager: bool,
    pub avatar: Option<String>,
    #[graphql(default)]
    pub clear_avatar: bool,
}

impl From<EmployeeChangesInput> for EmployeePatch {
    fn from(value: EmployeeChangesInput) -> Self {
        let manager_id = if value.clear_manager {
            Some(None)
        } else {
            value.manager_id.map(Some)
        };
        let avatar = if value.clear_avatar {
            Some(None)
        } else {
            value.avatar.map(Some)
        };
        EmployeePatch {
            name: value.name,
            designation: value.designation,
            team: value.team,
            manager_id,
            avatar,
        }
    }
}
