use sqlx::PgPool;
use uuid::Uuid;

use crate::config::CompanySettings;
use crate::database::models::{LeaveBalance, LeaveRequest, LeaveRequestInput, LeaveStatus};
use crate::database::repositories::{LeaveRepository, leave::current_year};
use crate::database::transaction::with_transaction;
use crate::error::{AppError, LeaveError};
use crate::services::auth::Claims;

#[derive(Clone)]
pub struct LeaveService {
    pool: PgPool,
    leave: LeaveRepository,
    settings: CompanySettings,
}

impl LeaveService {
    pub fn new(pool: PgPool, leave: LeaveRepository, settings: CompanySettings) -> Self {
        Self {
            pool,
            leave,
            settings,
        }
    }

    pub async fn create(
        &self,
        employee_id: Uuid,
        input: LeaveRequestInput,
    ) -> Result<LeaveRequest, AppError> {
        if input.end_date < input.start_date {
            return Err(LeaveError::InvalidDates.into());
        }
        if self
            .leave
            .duplicate_exists(employee_id, input.start_date, input.end_date)
            .await?
        {
            return Err(LeaveError::DuplicateRequest.into());
        }

        let is_paid = input.leave_type.is_paid();
        let request = self.leave.create_request(employee_id, &input, is_paid).await?;
        Ok(request)
    }

    /// Approve a pending request. For balance-tracked paid leave the balance
    /// check, the decrement and the status change commit as one atomic unit;
    /// concurrent approvals serialize on the locked balance row.
    pub async fn approve(&self, id: Uuid, actor: &Claims) -> Result<LeaveRequest, AppError> {
        let leave = self.leave.clone();
        let settings = self.settings.clone();
        let actor_id = actor.sub;

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let request = leave
                    .find_by_id_for_update(tx, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

                if !request.status.can_transition_to(LeaveStatus::Approved) {
                    return Err(LeaveError::InvalidState.into());
                }

                if request.is_paid && request.leave_type.is_balance_tracked() {
                    let mut balance = leave
                        .balance_for_update(
                            tx,
                            request.employee_id,
                            current_year(),
                            settings.default_casual_leave,
                            settings.default_sick_leave,
                        )
                        .await?;
                    balance.deduct(request.leave_type, request.days())?;
                    leave.save_balance(tx, &balance).await?;
                }

                let approved = leave
                    .set_status(tx, id, LeaveStatus::Approved, actor_id)
                    .await?;
                Ok(approved)
            })
        })
        .await
    }

    pub async fn reject(&self, id: Uuid, actor: &Claims) -> Result<LeaveRequest, AppError> {
        let leave = self.leave.clone();
        let actor_id = actor.sub;

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let request = leave
                    .find_by_id_for_update(tx, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

                if !request.status.can_transition_to(LeaveStatus::Rejected) {
                    return Err(LeaveError::InvalidState.into());
                }

                let rejected = leave
                    .set_status(tx, id, LeaveStatus::Rejected, actor_id)
                    .await?;
                Ok(rejected)
            })
        })
        .await
    }

    /// Only the requesting employee may cancel, and only while pending.
    pub async fn cancel(&self, id: Uuid, actor: &Claims) -> Result<LeaveRequest, AppError> {
        let leave = self.leave.clone();
        let actor_id = actor.sub;
        let actor_employee = actor.employee_id;

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let request = leave
                    .find_by_id_for_update(tx, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

                if actor_employee != Some(request.employee_id) {
                    return Err(LeaveError::NotAllowed.into());
                }
                if !request.status.can_transition_to(LeaveStatus::Cancelled) {
                    return Err(LeaveError::InvalidState.into());
                }

                let cancelled = leave
                    .set_status(tx, id, LeaveStatus::Cancelled, actor_id)
                    .await?;
                Ok(cancelled)
            })
        })
        .await
    }

    /// Read-or-create the current-year balance with configured defaults.
    pub async fn balance(&self, employee_id: Uuid) -> Result<LeaveBalance, AppError> {
        let year = current_year();
        if let Some(balance) = self.leave.balance(employee_id, year).await? {
            return Ok(balance);
        }

        let leave = self.leave.clone();
        let settings = self.settings.clone();
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let balance = leave
                    .balance_for_update(
                        tx,
                        employee_id,
                        year,
                        settings.default_casual_leave,
                        settings.default_sick_leave,
                    )
                    .await?;
                Ok(balance)
            })
        })
        .await
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self.leave.list_for_employee(employee_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self.leave.list_all().await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<LeaveRequest>, AppError> {
        Ok(self.leave.find_by_id(id).await?)
    }
}
