// libs/report-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::ReportQuery;
use crate::router::ReportState;

#[axum::debug_handler]
pub async fn appointment_report(
    State(state): State<Arc<ReportState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = state
        .aggregator
        .generate(query.kind, query.from, query.to)
        .await?;

    Ok(Json(json!({
        "kind": query.kind,
        "rows": rows,
        "total": rows.len()
    })))
}

#[axum::debug_handler]
pub async fn income_by_category_report(
    State(state): State<Arc<ReportState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let rows = state
        .aggregator
        .income_by_category(query.kind, query.from, query.to)
        .await?;

    let total_income: f64 = rows.iter().map(|row| row.total_income).sum();

    Ok(Json(json!({
        "kind": query.kind,
        "rows": rows,
        "total_income": total_income
    })))
}
