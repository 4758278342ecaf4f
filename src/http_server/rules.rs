//! Handlers for rule-related endpoints in the HTTP server.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::{ApiError, ApiState};
use crate::{
    models::RuleConfig,
    subscription::{SubscriptionCommand, SubscriptionError},
};

/// Retrieves all rules.
pub async fn get_rules(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let rules = state.repo.get_rules().await?;
    Ok((StatusCode::OK, Json(json!({ "rules": rules }))))
}

/// Retrieves a single rule.
pub async fn get_rule(State(state): State<ApiState>, Path(rule_id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let rule =
        state.repo.get_rule(rule_id).await?.ok_or_else(|| ApiError::NotFound("Rule not found".to_string()))?;
    Ok((StatusCode::OK, Json(rule)))
}

/// Retrieves the notifications of a rule, newest first.
pub async fn get_rule_notifications(
    State(state): State<ApiState>,
    Path(rule_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.repo.get_rule(rule_id).await?.is_none() {
        return Err(ApiError::NotFound("Rule not found".to_string()));
    }
    let notifications = state.repo.get_notifications_for_rule(rule_id).await?;
    Ok((StatusCode::OK, Json(json!({ "notifications": notifications }))))
}

/// Validates and stores a rule, then asks the event loop to subscribe it if
/// it is active.
///
/// When the subscription queue refuses the request the rule is deleted again
/// and `503` is returned, so a stored active rule always has a pending or
/// live subscription.
pub async fn create_rule(
    State(state): State<ApiState>,
    payload: Result<Json<RuleConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let config = payload.validate()?;
    let rule = state.repo.create_rule(config).await?;

    if rule.active {
        if let Err(e) = state.subscriptions.request(SubscriptionCommand::Add(rule.clone())).await {
            tracing::warn!(rule_id = rule.id, error = %e, "Subscription request refused, rolling back rule.");
            if let Err(rollback) = state.repo.delete_rule(rule.id).await {
                tracing::error!(rule_id = rule.id, error = %rollback, "Failed to roll back rule.");
            }
            return Err(e.into());
        }
    }

    Ok((StatusCode::CREATED, Json(rule)))
}

/// Deletes a rule with its notifications and retracts its subscription.
pub async fn delete_rule(
    State(state): State<ApiState>,
    Path(rule_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.delete_rule(rule_id).await.map_err(|e| match ApiError::from(e) {
        ApiError::NotFound(_) => ApiError::NotFound("Rule not found".to_string()),
        other => other,
    })?;
    tracing::info!(rule_id, "Rule deleted.");

    match state.subscriptions.request(SubscriptionCommand::Remove(rule_id)).await {
        Ok(()) => {}
        Err(SubscriptionError::QueueClosed) => tracing::debug!(rule_id, "Event loop stopped, nothing to retract."),
        Err(e) => tracing::warn!(rule_id, error = %e, "Failed to request subscription removal."),
    }

    Ok(StatusCode::NO_CONTENT)
}
