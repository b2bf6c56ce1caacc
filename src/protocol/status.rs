use serde::{Deserialize, Serialize};

use super::domain::{Evaluation, EvaluationId, Measure, MeasureStatus, Principal};

/// Direction of a status change; every state may move to every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    Unchanged,
    Advanced,
    Reverted,
}

impl MeasureStatus {
    /// Display priority: pending work first, completed work last.
    pub const fn priority(self) -> u8 {
        match self {
            MeasureStatus::NotApplied => 0,
            MeasureStatus::InProcess => 1,
            MeasureStatus::Applied => 2,
        }
    }

    pub fn transition_to(self, next: MeasureStatus) -> StatusChange {
        match next.priority().cmp(&self.priority()) {
            std::cmp::Ordering::Equal => StatusChange::Unchanged,
            std::cmp::Ordering::Greater => StatusChange::Advanced,
            std::cmp::Ordering::Less => StatusChange::Reverted,
        }
    }
}

/// Sorts by status priority, then by the order fixed at creation. Stable.
pub fn sort_for_display(measures: &mut [Measure]) {
    measures.sort_by_key(|measure| (measure.status.priority(), measure.original_order_index));
}

pub fn in_display_order(measures: &[Measure]) -> Vec<Measure> {
    let mut sorted = measures.to_vec();
    sort_for_display(&mut sorted);
    sorted
}

/// Why a measure edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditDenied {
    #[error("read-only users cannot modify evaluations")]
    ReadOnlyRole,
    #[error("{}", outside_window_message(.window))]
    OutsideEditWindow { window: usize },
}

fn outside_window_message(window: &usize) -> String {
    let count = match window {
        1 => return "only measures of the last activated alert key are editable".to_string(),
        2 => "two".to_string(),
        3 => "three".to_string(),
        4 => "four".to_string(),
        5 => "five".to_string(),
        other => other.to_string(),
    };
    format!("only measures of the last {count} activated alert keys are editable")
}

/// Authorization collaborator deciding whether a principal may edit measures.
pub trait EditAuthorizer: Send + Sync {
    /// How many of the most recent elevated evaluations the caller should supply.
    fn window(&self) -> usize;

    /// `recent_elevated` lists the newest Orange/Red evaluation ids first.
    fn authorize(
        &self,
        principal: &Principal,
        target: &Evaluation,
        recent_elevated: &[EvaluationId],
    ) -> Result<(), EditDenied>;
}

/// Measures stay editable only on the last `window` Orange/Red evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditWindowPolicy {
    window: usize,
}

pub const DEFAULT_EDIT_WINDOW: usize = 2;

impl EditWindowPolicy {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Default for EditWindowPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_WINDOW)
    }
}

impl EditAuthorizer for EditWindowPolicy {
    fn window(&self) -> usize {
        self.window
    }

    fn authorize(
        &self,
        principal: &Principal,
        target: &Evaluation,
        recent_elevated: &[EvaluationId],
    ) -> Result<(), EditDenied> {
        if !principal.role.can_edit() {
            return Err(EditDenied::ReadOnlyRole);
        }

        let editable = target.alert_level.is_elevated()
            && recent_elevated
                .iter()
                .take(self.window)
                .any(|id| *id == target.id);

        if editable {
            Ok(())
        } else {
            Err(EditDenied::OutsideEditWindow {
                window: self.window,
            })
        }
    }
}
