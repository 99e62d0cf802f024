//! The floating bulk editor: a persistent panel that applies one
//! [`EditMode`] to the selected node.

use crate::engine::{BulkEditReport, EditMode, OrgChart};
use crate::error::{HrResult, Rejection};
use crate::model::parse_names;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkEditor {
    open: bool,
    mode: EditMode,
    input: String,
}

impl BulkEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        self.mode = mode;
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Apply the panel's mode to the chart's selection.
    ///
    /// The input is cleared once the edit has been applied, even if some
    /// writes failed; a rejection keeps it so the user can retry. The panel
    /// stays open either way.
    pub async fn submit(&mut self, chart: &OrgChart) -> HrResult<BulkEditReport> {
        if !self.open {
            return Err(Rejection::EditorClosed.into());
        }
        let names = parse_names(&self.input);
        let report = chart.bulk_edit_selected(self.mode, &names).await?;
        self.input.clear();
        Ok(report)
    }
}
