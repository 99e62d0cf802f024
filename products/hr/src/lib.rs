//! HR vertical slice: the employee roster, the org chart derived from it and
//! the operations that edit reporting lines.
//!
//! The flat roster is authoritative. Charts are rebuilt from it on every read
//! by [`build_tree`]; structural edits go through [`OrgChart`], which rejects
//! anything that would break the forest before touching storage.

pub mod ancestry;
pub mod directory;
pub mod editor;
pub mod engine;
pub mod error;
pub mod model;
pub mod repository;
pub mod tree;

pub use ancestry::{chain_of_command, is_ancestor, would_create_cycle};
pub use directory::{Action, Directory};
pub use editor::BulkEditor;
pub use engine::{BulkEditReport, BulkFailure, EditMode, OrgChart};
pub use error::{HrError, HrResult, Rejection};
pub use model::{Employee, EmployeePatch, generate_employee_id, parse_names};
pub use repository::{EmployeeRepository, InMemoryRepository, RepositoryError, RepositoryResult};
pub use tree::{TreeNode, build_team_tree, build_tree};
