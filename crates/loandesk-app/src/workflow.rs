// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::{ApplicationStatus, LoanApplication, TabKind};

/// How long to wait after a successful delete before refetching the list.
pub const REFRESH_AFTER_DELETE: Duration = Duration::from_secs(1);

/// Decides which application status changes an operator may make.
pub trait TransitionPolicy: Send + Sync {
    fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool;

    fn allowed_targets(&self, from: ApplicationStatus) -> Vec<ApplicationStatus> {
        ApplicationStatus::ALL
            .into_iter()
            .filter(|to| self.allows(from, *to))
            .collect()
    }
}

/// Any status may be selected regardless of the current one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl TransitionPolicy for AllowAll {
    fn allows(&self, _from: ApplicationStatus, _to: ApplicationStatus) -> bool {
        true
    }
}

/// pending -> approved | rejected, approved -> disbursed. Re-selecting the
/// current status is always allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedWorkflow;

impl TransitionPolicy for GuidedWorkflow {
    fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        from == to
            || matches!(
                (from, to),
                (Pending, Approved) | (Pending, Rejected) | (Approved, Disbursed)
            )
    }
}

pub fn check_transition(
    policy: &dyn TransitionPolicy,
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<()> {
    if policy.allows(from, to) {
        return Ok(());
    }
    let allowed: Vec<&str> = policy
        .allowed_targets(from)
        .into_iter()
        .map(ApplicationStatus::as_str)
        .collect();
    bail!(
        "cannot move an application from {} to {} -- pick one of: {}",
        from.as_str(),
        to.as_str(),
        allowed.join(", ")
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    pub remarks: String,
}

impl StatusUpdate {
    pub fn by_admin(status: ApplicationStatus) -> Self {
        Self {
            status,
            remarks: format!("Status updated to {} by admin", status.as_str()),
        }
    }
}

/// Reflects an update the server has already accepted.
pub fn apply_status_update(application: &mut LoanApplication, update: &StatusUpdate) {
    application.status = update.status;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub tab: TabKind,
    pub id: String,
    pub label: String,
}

impl DeleteTarget {
    fn noun(&self) -> &'static str {
        match self.tab {
            TabKind::Customers => "Customer",
            TabKind::LoanTypes => "Loan type",
            TabKind::Applications => "Application",
            TabKind::Dashboard => "Record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeleteFlow {
    #[default]
    Idle,
    ConfirmPending {
        target: DeleteTarget,
    },
    Deleting {
        target: DeleteTarget,
    },
    Success {
        target: DeleteTarget,
        message: String,
    },
    Failure {
        target: DeleteTarget,
        message: String,
    },
}

impl DeleteFlow {
    /// Opens the confirmation for `target`. Refused while another delete is
    /// in flight.
    pub fn request(&mut self, target: DeleteTarget) -> Result<()> {
        if let Self::Deleting { target: busy } = self {
            bail!(
                "{} {} is still being deleted -- wait for it to finish",
                busy.noun().to_lowercase(),
                busy.label
            );
        }
        *self = Self::ConfirmPending { target };
        Ok(())
    }

    pub fn cancel(&mut self) {
        if matches!(self, Self::ConfirmPending { .. }) {
            *self = Self::Idle;
        }
    }

    /// Moves the pending confirmation into flight and hands back the target
    /// to delete.
    pub fn confirm(&mut self) -> Result<DeleteTarget> {
        let Self::ConfirmPending { target } = self else {
            bail!("nothing is waiting for delete confirmation");
        };
        let target = target.clone();
        *self = Self::Deleting {
            target: target.clone(),
        };
        Ok(target)
    }

    /// Records the outcome for the in-flight delete of `id`. Outcomes for any
    /// other id are ignored.
    pub fn finish(&mut self, id: &str, result: Result<()>) -> bool {
        let Self::Deleting { target } = self else {
            return false;
        };
        if target.id != id {
            return false;
        }
        let target = target.clone();
        *self = match result {
            Ok(()) => Self::Success {
                message: format!("{} deleted successfully!", target.noun()),
                target,
            },
            Err(error) => Self::Failure {
                message: format!("{error:#}"),
                target,
            },
        };
        true
    }

    pub fn acknowledge(&mut self) {
        if matches!(self, Self::Success { .. } | Self::Failure { .. }) {
            *self = Self::Idle;
        }
    }

    pub fn deleting_id(&self) -> Option<&str> {
        match self {
            Self::Deleting { target } => Some(&target.id),
            _ => None,
        }
    }

    pub fn pending_target(&self) -> Option<&DeleteTarget> {
        match self {
            Self::ConfirmPending { target } => Some(target),
            _ => None,
        }
    }
}
