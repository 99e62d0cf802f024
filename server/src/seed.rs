use anyhow::{Context, Result};
use products_hr::{Employee, EmployeeRepository};
use tracing::info;

const AVATAR_BASE: &str = "https://randomuser.me/api/portraits";

// (id, name, designation, team, manager, portrait)
const DEMO_ROSTER: &[(&str, &str, &str, &str, Option<&str>, &str)] = &[
    ("emp-1", "Mark Hill", "Chief Executive Officer", "Executive", None, "men/11"),
    ("emp-2", "Joe Linux", "Chief Technology Officer", "Technology", Some("emp-1"), "men/12"),
    ("emp-3", "Linda May", "Chief Business Officer", "Business", Some("emp-1"), "women/13"),
    ("emp-4", "John Green", "Chief Accounting Officer", "Finance", Some("emp-1"), "men/14"),
    (
        "emp-5",
        "Ron Blomquist",
        "Chief Information Security Officer",
        "Security",
        Some("emp-2"),
        "men/15",
    ),
    ("emp-6", "Michael Rubin", "Chief Innovation Officer", "Innovation", Some("emp-2"), "men/16"),
    (
        "emp-7",
        "Alice Lopez",
        "Chief Communications Officer",
        "Communications",
        Some("emp-3"),
        "women/17",
    ),
    ("emp-8", "Mary Johnson", "Chief Brand Officer", "Brand", Some("emp-3"), "women/18"),
    (
        "emp-9",
        "Kirk Douglas",
        "Chief Business Development Officer",
        "BizDev",
        Some("emp-3"),
        "men/19",
    ),
    ("emp-10", "Erica Reel", "Chief Customer Officer", "Customer", Some("emp-4"), "women/20"),
];

/// The ten-person executive roster used for demos.
pub fn demo_roster() -> Vec<Employee> {
    DEMO_ROSTER
        .iter()
        .map(|&(id, name, designation, team, manager, portrait)| {
            let mut employee =
                Employee::new(id, name, designation, team, manager.map(str::to_string));
            employee.avatar = Some(format!("{AVATAR_BASE}/{portrait}.jpg"));
            employee
        })
        .collect()
}

/// Insert the demo roster when storage holds no records. Returns how many
/// records were written.
pub async fn seed_if_empty(repository: &dyn EmployeeRepository) -> Result<usize> {
    let existing = repository
        .list()
        .await
        .context("failed to read roster before seeding")?;
    if !existing.is_empty() {
        info!(count = existing.len(), "roster already populated; skipping seed");
        return Ok(0);
    }

    let roster = demo_roster();
    let count = roster.len();
    for employee in roster {
        let id = employee.id.clone();
        repository
            .create(employee)
            .await
            .with_context(|| format!("failed to seed {id}"))?;
    }
    info!(count, "demo roster seeded");
    Ok(count)
}
