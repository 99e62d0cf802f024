mod types;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Object, Result, Schema, SimpleObject};
use platform_api::{hr_error, invalid_input};
use products_hr::{Action, OrgChart, build_team_tree, chain_of_command, parse_names};
use serde::Serialize;
use tracing::instrument;

pub use types::{
    BulkEditPayload, BulkMode, EmployeeChangesInput, EmployeeObject, NewEmployeeInput, OrgNode,
};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(chart: Arc<OrgChart>) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(chart)
        .finish()
}

fn chart<'a>(ctx: &'a Context<'_>) -> Result<&'a Arc<OrgChart>> {
    ctx.data::<Arc<OrgChart>>()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self, ctx: &Context<'_>) -> Result<HealthPayload> {
        let error = chart(ctx)?.view(|state| state.error().map(str::to_string)).await;
        Ok(HealthPayload {
            ok: error.is_none(),
            error,
        })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> Result<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Sidebar list: case-insensitive search over name, designation and team,
    /// narrowed by team.
    #[instrument(name = "graphql.employees", skip(self, ctx))]
    async fn employees(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
        team: Option<String>,
    ) -> Result<Vec<EmployeeObject>> {
        let mut view = chart(ctx)?.snapshot().await;
        view.apply(Action::SetSearch(search.unwrap_or_default()));
        view.apply(Action::SetTeamFilter(team));
        Ok(view
            .visible()
            .into_iter()
            .cloned()
            .map(EmployeeObject::from)
            .collect())
    }

    #[instrument(name = "graphql.employee", skip(self, ctx))]
    async fn employee(&self, ctx: &Context<'_>, id: String) -> Result<Option<EmployeeObject>> {
        let found = chart(ctx)?.view(|state| state.employee(&id).cloned()).await;
        Ok(found.map(EmployeeObject::from))
    }

    #[instrument(name = "graphql.teams", skip_all)]
    async fn teams(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        Ok(chart(ctx)?
            .view(|state| state.teams().into_iter().map(str::to_string).collect())
            .await)
    }

    #[instrument(name = "graphql.org_chart", skip(self, ctx))]
    async fn org_chart(&self, ctx: &Context<'_>, team: Option<String>) -> Result<Vec<OrgNode>> {
        let forest = chart(ctx)?
            .view(|state| build_team_tree(state.employees(), team.as_deref()))
            .await;
        Ok(forest.into_iter().map(OrgNode::from).collect())
    }

    #[instrument(name = "graphql.selection", skip_all)]
    async fn selection(&self, ctx: &Context<'_>) -> Result<Option<EmployeeObject>> {
        let selected = chart(ctx)?
            .view(|state| state.selected_employee().cloned())
            .await;
        Ok(selected.map(EmployeeObject::from))
    }

    /// Managers above `id`, nearest first.
    #[instrument(name = "graphql.chain_of_command", skip(self, ctx))]
    async fn chain_of_command(&self, ctx: &Context<'_>, id: String) -> Result<Vec<EmployeeObject>> {
        let managers = chart(ctx)?
            .view(|state| {
                chain_of_command(state.employees(), &id)
                    .iter()
                    .filter_map(|manager| state.employee(manager).cloned())
                    .collect::<Vec<_>>()
            })
            .await;
        Ok(managers.into_iter().map(EmployeeObject::from).collect())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    #[instrument(name = "graphql.select_node", skip(self, ctx))]
    async fn select_node(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
    ) -> Result<Option<EmployeeObject>> {
        let chart = chart(ctx)?;
        chart.select(id.as_deref()).await.map_err(hr_error)?;
        let selected = chart.view(|state| state.selected_employee().cloned()).await;
        Ok(selected.map(EmployeeObject::from))
    }

    /// Drop `nodeId` onto `managerId`; a null manager makes it a root.
    #[instrument(name = "graphql.update_manager", skip(self, ctx))]
    async fn update_manager(
        &self,
        ctx: &Context<'_>,
        node_id: String,
        manager_id: Option<String>,
    ) -> Result<EmployeeObject> {
        let updated = chart(ctx)?
            .update_manager(&node_id, manager_id.as_deref())
            .await
            .map_err(hr_error)?;
        Ok(updated.into())
    }

    /// Apply a bulk edit to `nodeId`, or to the current selection when it is
    /// omitted. `names` is the comma-separated panel input.
    #[instrument(name = "graphql.bulk_edit", skip(self, ctx, names))]
    async fn bulk_edit(
        &self,
        ctx: &Context<'_>,
        mode: BulkMode,
        #[graphql(default)] names: String,
        node_id: Option<String>,
    ) -> Result<BulkEditPayload> {
        let chart = chart(ctx)?;
        let names = parse_names(&names);
        let report = match node_id {
            Some(id) => chart.bulk_edit(Some(&id), mode.into(), &names).await,
            None => chart.bulk_edit_selected(mode.into(), &names).await,
        }
        .map_err(hr_error)?;
        Ok(report.into())
    }

    #[instrument(name = "graphql.remove_node", skip(self, ctx))]
    async fn remove_node(&self, ctx: &Context<'_>, id: String) -> Result<bool> {
        chart(ctx)?.remove_node(&id).await.map_err(hr_error)?;
        Ok(true)
    }

    #[instrument(name = "graphql.create_employee", skip_all)]
    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> Result<EmployeeObject> {
        if input.name.trim().is_empty() {
            return Err(invalid_input("name must not be blank"));
        }
        let created = chart(ctx)?
            .create_employee(input.into())
            .await
            .map_err(hr_error)?;
        Ok(created.into())
    }

    #[instrument(name = "graphql.update_employee", skip(self, ctx, changes))]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        id: String,
        changes: EmployeeChangesInput,
    ) -> Result<EmployeeObject> {
        let updated = chart(ctx)?
            .update_details(&id, changes.into())
            .await
            .map_err(hr_error)?;
        Ok(updated.into())
    }

    /// Re-read the roster from storage; returns the record count.
    #[instrument(name = "graphql.reload", skip_all)]
    async fn reload(&self, ctx: &Context<'_>) -> Result<usize> {
        let chart = chart(ctx)?;
        chart.load().await.map_err(hr_error)?;
        Ok(chart.view(|state| state.employees().len()).await)
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
    /// Last roster load failure, if any.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Value};
    use products_hr::{Employee, EmployeeRepository, InMemoryRepository};
    use serde_json::json;

    fn emp(id: &str, name: &str, team: &str, manager: Option<&str>) -> Employee {
        Employee::new(id, name, "Officer", team, manager.map(str::to_string))
    }

    async fn schema() -> SchemaType {
        let repo: Arc<dyn EmployeeRepository> = Arc::new(InMemoryRepository::with_records(vec![
            emp("emp-1", "Mark Hill", "Executive", None),
            emp("emp-2", "Joe Linux", "Technology", Some("emp-1")),
            emp("emp-3", "Linda May", "Business", Some("emp-1")),
            emp("emp-5", "Ron Blomquist", "Technology", Some("emp-2")),
        ]));
        build_schema(Arc::new(OrgChart::open(repo).await))
    }

    fn error_code(response: &async_graphql::Response) -> Option<Value> {
        response.errors[0]
            .extensions
            .as_ref()
            .and_then(|map| map.get("code"))
            .cloned()
    }

    #[tokio::test]
    async fn health_query_returns_ok() {
        let schema = schema().await;
        let response = schema.execute(Request::new("{ health { ok error } }")).await;
        assert!(response.errors.is_empty());
        let body = response.data.into_json().unwrap();
        assert_eq!(body, json!({"health": {"ok": true, "error": null}}));
    }

    #[tokio::test]
    async fn org_chart_nests_reports() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new("{ orgChart { id children { id children { id } } } }"))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body,
            json!({"orgChart": [{
                "id": "emp-1",
                "children": [
                    {"id": "emp-2", "children": [{"id": "emp-5"}]},
                    {"id": "emp-3", "children": []}
                ]
            }]})
        );
    }

    #[tokio::test]
    async fn team_filtered_chart_and_list() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"{ orgChart(team: "Technology") { id children { id } }
                     employees(search: "ron") { id }
                     teams }"#,
            ))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body["orgChart"],
            json!([{"id": "emp-2", "children": [{"id": "emp-5"}]}])
        );
        assert_eq!(body["employees"], json!([{"id": "emp-5"}]));
        assert_eq!(body["teams"], json!(["Executive", "Technology", "Business"]));
    }

    #[tokio::test]
    async fn cyclic_reassignment_is_rejected() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"mutation { updateManager(nodeId: "emp-1", managerId: "emp-5") { id } }"#,
            ))
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(error_code(&response), Some(Value::from("REJECTED")));
    }

    #[tokio::test]
    async fn bulk_edit_requires_a_selection() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"mutation { bulkEdit(mode: CHILDREN, names: "Tom") { complete } }"#,
            ))
            .await;
        assert_eq!(response.errors[0].message, "please select a node first");
        assert_eq!(error_code(&response), Some(Value::from("REJECTED")));
    }

    #[tokio::test]
    async fn selected_node_gets_new_children() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(r#"mutation { selectNode(id: "emp-3") { id } }"#))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let response = schema
            .execute(Request::new(
                r#"mutation { bulkEdit(mode: CHILDREN, names: "Tom, ,Jerry") {
                    complete created { name managerId designation team } } }"#,
            ))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["bulkEdit"]["complete"], json!(true));
        assert_eq!(
            body["bulkEdit"]["created"],
            json!([
                {"name": "Tom", "managerId": "emp-3", "designation": "Employee",
                 "team": "General"},
                {"name": "Jerry", "managerId": "emp-3", "designation": "Employee",
                 "team": "General"}
            ])
        );

        let response = schema
            .execute(Request::new(r#"{ orgChart { id children { id children { name } } } }"#))
            .await;
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body["orgChart"][0]["children"][1]["children"],
            json!([{"name": "Tom"}, {"name": "Jerry"}])
        );
    }

    #[tokio::test]
    async fn blank_names_are_invalid_input() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"mutation { createEmployee(input: {
                    name: "  ", designation: "Engineer", team: "Technology"
                }) { id } }"#,
            ))
            .await;
        assert_eq!(error_code(&response), Some(Value::from("INVALID_INPUT")));
        let response = schema.execute(Request::new("{ employees { id } }")).await;
        let body = response.data.into_json().unwrap();
        assert_eq!(body["employees"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unknown_manager_is_a_rejection() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"mutation { updateManager(nodeId: "emp-5", managerId: "ghost") { id } }"#,
            ))
            .await;
        assert_eq!(response.errors[0].message, "manager ghost not found");
        assert_eq!(error_code(&response), Some(Value::from("REJECTED")));
    }

    #[tokio::test]
    async fn very_deep_charts_resolve() {
        let roster = (0..10_000)
            .map(|level: usize| {
                let manager = level.checked_sub(1).map(|above| format!("e{above}"));
                Employee::new(format!("e{level}"), "E", "Officer", "Executive", manager)
            })
            .collect();
        let repo: Arc<dyn EmployeeRepository> = Arc::new(InMemoryRepository::with_records(roster));
        let schema = build_schema(Arc::new(OrgChart::open(repo).await));

        let response = schema
            .execute(Request::new(r#"{ orgChart { id children { id } } }"#))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["orgChart"], json!([{"id": "e0", "children": [{"id": "e1"}]}]));
    }

    #[tokio::test]
    async fn chain_of_command_lists_managers_upward() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(r#"{ chainOfCommand(id: "emp-5") { id } }"#))
            .await;
        let body = response.data.into_json().unwrap();
        assert_eq!(body["chainOfCommand"], json!([{"id": "emp-2"}, {"id": "emp-1"}]));
    }

    #[tokio::test]
    async fn unknown_employee_update_is_not_found() {
        let schema = schema().await;
        let response = schema
            .execute(Request::new(
                r#"mutation { updateEmployee(id: "ghost", changes: { name: "G" }) { id } }"#,
            ))
            .await;
        assert_eq!(error_code(&response), Some(Value::from("NOT_FOUND")));
    }
}
