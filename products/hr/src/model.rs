use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_PREFIX: &str = "emp-";
const ID_SUFFIX_LEN: usize = 7;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A single roster record. `manager_id` of `None` marks a root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub designation: String,
    pub team: String,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Employee {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        designation: impl Into<String>,
        team: impl Into<String>,
        manager_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            designation: designation.into(),
            team: team.into(),
            manager_id,
            avatar: None,
        }
    }

    /// True when the record carries no manager reference at all.
    ///
    /// A record whose manager no longer exists is still drawn as a root by
    /// the tree builder, but it is not a root record.
    pub fn is_root_record(&self) -> bool {
        self.manager_id.is_none()
    }

    pub fn apply(&mut self, patch: &EmployeePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(designation) = &patch.designation {
            self.designation = designation.clone();
        }
        if let Some(team) = &patch.team {
            self.team = team.clone();
        }
        if let Some(manager_id) = &patch.manager_id {
            self.manager_id = manager_id.clone();
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = avatar.clone();
        }
    }
}

/// Partial update of an [`Employee`]. `None` leaves a field untouched; the
/// nullable fields use `Some(None)` to clear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub manager_id: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub avatar: Option<Option<String>>,
}

impl EmployeePatch {
    pub fn manager(manager_id: Option<String>) -> Self {
        Self {
            manager_id: Some(manager_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when applying the patch would change `employee`'s manager.
    pub fn changes_manager_of(&self, employee: &Employee) -> bool {
        matches!(&self.manager_id, Some(next) if next != &employee.manager_id)
    }
}

// Present-but-null must survive as `Some(None)`, which plain `Option<Option<_>>`
// deserialization collapses into `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fresh identifier for a new roster record, e.g. `emp-k3x9a0q`.
///
/// Drawn at random without consulting existing ids; collisions are treated as
/// negligible and surface as a duplicate-id rejection if they ever happen.
pub fn generate_employee_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

/// Split comma-separated, human-entered names.
pub fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
