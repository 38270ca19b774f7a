//! REST API endpoints for the DashboardGateway
//!
//! Every handler converts failures at its own boundary into one of the
//! rejection types below; no error crosses the external interface carrying
//! internal state.

use crate::auth::{AuthedUser, DashboardAuth};
use payment_ledger::{LedgerStore, NewOrder, PageRequest, StudentInfo};
use psp_client::{AggregatorClient, PspError};
use reconciliation::{ReconcileError, Reconciler, WebhookNotification};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Shared state injected into every route
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn LedgerStore>,
    pub psp: Arc<AggregatorClient>,
    pub reconciler: Arc<Reconciler>,
    pub auth: DashboardAuth,
}

/// Body of the create-payment endpoint
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub trustee_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_email: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub gateway_name: String,
}

impl CreatePaymentRequest {
    fn validate(&self) -> Result<(), String> {
        let required = [
            ("school_id", &self.school_id),
            ("trustee_id", &self.trustee_id),
            ("student_name", &self.student_name),
            ("student_id", &self.student_id),
            ("student_email", &self.student_email),
            ("amount", &self.amount),
            ("gateway_name", &self.gateway_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{name} is required"));
            }
        }
        if self.amount.trim().parse::<f64>().is_err() {
            return Err("amount must be numeric".to_string());
        }
        Ok(())
    }
}

// Rejection markers for the error taxonomy

#[derive(Debug)]
struct Unauthorized;
impl warp::reject::Reject for Unauthorized {}

#[derive(Debug)]
struct BadRequest(String);
impl warp::reject::Reject for BadRequest {}

#[derive(Debug)]
struct NotFoundError(String);
impl warp::reject::Reject for NotFoundError {}

#[derive(Debug)]
struct UpstreamError(String);
impl warp::reject::Reject for UpstreamError {}

#[derive(Debug)]
struct InternalError;
impl warp::reject::Reject for InternalError {}

fn psp_rejection(err: PspError) -> Rejection {
    match err {
        PspError::Validation(msg) => warp::reject::custom(BadRequest(msg)),
        other => {
            error!("Aggregator call failed: {}", other);
            warp::reject::custom(UpstreamError("Payment aggregator unavailable".to_string()))
        }
    }
}

/// Create a payment collection: sign and issue the aggregator request,
/// then persist the pending order with the returned reference
async fn create_payment(
    user: AuthedUser,
    body: CreatePaymentRequest,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    if let Err(msg) = body.validate() {
        return Err(warp::reject::custom(BadRequest(msg)));
    }

    let collect = ctx
        .psp
        .create_collect_request(&body.school_id, &body.amount)
        .await
        .map_err(psp_rejection)?;

    let order = ctx
        .store
        .create_order(NewOrder {
            collect_reference: collect.collect_request_id.clone(),
            school_id: body.school_id,
            trustee_id: body.trustee_id,
            gateway_name: body.gateway_name,
            student: StudentInfo {
                name: body.student_name,
                student_id: body.student_id,
                email: body.student_email,
            },
        })
        .await
        .map_err(|e| {
            error!("Failed to persist order: {}", e);
            warp::reject::custom(InternalError)
        })?;

    info!(
        "Order {} created for collect request {} by {}",
        order.id, collect.collect_request_id, user.email
    );

    Ok(warp::reply::json(&collect))
}

/// Proxy the aggregator's status-verification response verbatim
async fn verify_payment(
    _user: AuthedUser,
    params: HashMap<String, String>,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    let collect_request_id = params
        .get("collect_request_id")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| warp::reject::custom(BadRequest("collect_request_id is required".to_string())))?;
    let school_id = params
        .get("school_id")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| warp::reject::custom(BadRequest("school_id is required".to_string())))?;

    let status = ctx
        .psp
        .collect_request_status(collect_request_id, school_id)
        .await
        .map_err(psp_rejection)?;

    Ok(warp::reply::json(&status))
}

/// Global transaction ledger, paginated
async fn list_transactions(
    _user: AuthedUser,
    params: HashMap<String, String>,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    let page = PageRequest::from_params(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    );

    let ledger = ctx.store.ledger_page(None, &page).await.map_err(|e| {
        error!("Ledger query failed: {}", e);
        warp::reject::custom(InternalError)
    })?;

    Ok(warp::reply::json(&ledger))
}

/// Per-school transaction ledger, paginated
async fn list_school_transactions(
    school_id: String,
    _user: AuthedUser,
    params: HashMap<String, String>,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    let page = PageRequest::from_params(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    );

    let ledger = ctx.store.ledger_page(Some(&school_id), &page).await.map_err(|e| {
        error!("Ledger query failed: {}", e);
        warp::reject::custom(InternalError)
    })?;

    Ok(warp::reply::json(&ledger))
}

/// Latest settlement for one order, addressed by its internal id.
/// Distinguishes "no such order" from "order exists but not yet settled".
async fn transaction_status(
    custom_order_id: String,
    _user: AuthedUser,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    let id = Uuid::parse_str(&custom_order_id)
        .map_err(|_| warp::reject::custom(NotFoundError("Order not found".to_string())))?;

    let order = ctx
        .store
        .order_by_id(id)
        .await
        .map_err(|e| {
            error!("Order lookup failed: {}", e);
            warp::reject::custom(InternalError)
        })?
        .ok_or_else(|| warp::reject::custom(NotFoundError("Order not found".to_string())))?;

    let settlements =
        ctx.store.settlements_by_reference(&order.collect_reference).await.map_err(|e| {
            error!("Settlement lookup failed: {}", e);
            warp::reject::custom(InternalError)
        })?;

    match settlements.into_iter().next() {
        Some(latest) => Ok(warp::reply::json(&latest)),
        None => Err(warp::reject::custom(NotFoundError(
            "Order has no settlement yet".to_string(),
        ))),
    }
}

/// Webhook receiver; unauthenticated by design, it trusts the network path
async fn receive_webhook(
    body: WebhookNotification,
    ctx: AppContext,
) -> Result<impl Reply, Rejection> {
    match ctx.reconciler.apply(body).await {
        Ok(_) => Ok(warp::reply::json(&serde_json::json!({ "message": "Webhook received" }))),
        Err(ReconcileError::UnknownOrder(reference)) => {
            info!("Webhook for unknown collect reference {}", reference);
            Err(warp::reject::custom(NotFoundError(
                "Payment order was not made".to_string(),
            )))
        }
        Err(ReconcileError::Ledger(e)) => {
            error!("Webhook processing failed: {}", e);
            Err(warp::reject::custom(InternalError))
        }
    }
}

fn with_ctx(
    ctx: AppContext,
) -> impl Filter<Extract = (AppContext,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn with_auth(
    auth: DashboardAuth,
) -> impl Filter<Extract = (AuthedUser,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth = auth.clone();
        async move {
            auth.verify_header(header.as_deref())
                .map_err(|_| warp::reject::custom(Unauthorized))
        }
    })
}

/// Map rejections onto the error taxonomy: validation 400, auth 401,
/// missing records 404, aggregator failures 502, everything else 500
async fn handle_rejection(err: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (code, message) = if let Some(NotFoundError(msg)) = err.find() {
        (StatusCode::NOT_FOUND, msg.clone())
    } else if err.find::<Unauthorized>().is_some() {
        (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
    } else if let Some(BadRequest(msg)) = err.find() {
        (StatusCode::BAD_REQUEST, msg.clone())
    } else if let Some(UpstreamError(msg)) = err.find() {
        (StatusCode::BAD_GATEWAY, msg.clone())
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid request".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "message": message })),
        code,
    ))
}

/// Create the REST routes
pub fn create_routes(
    ctx: AppContext,
) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
    let auth = ctx.auth.clone();

    let create_payment_route = warp::path!("api" / "transactions" / "create-payment")
        .and(warp::post())
        .and(with_auth(auth.clone()))
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(create_payment);

    let verify_route = warp::path!("api" / "transactions" / "verify")
        .and(warp::get())
        .and(with_auth(auth.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx(ctx.clone()))
        .and_then(verify_payment);

    let school_route = warp::path!("api" / "transactions" / "school" / String)
        .and(warp::get())
        .and(with_auth(auth.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx(ctx.clone()))
        .and_then(list_school_transactions);

    let status_route = warp::path!("api" / "transactions" / "transaction-status" / String)
        .and(warp::get())
        .and(with_auth(auth.clone()))
        .and(with_ctx(ctx.clone()))
        .and_then(transaction_status);

    let list_route = warp::path!("api" / "transactions")
        .and(warp::get())
        .and(with_auth(auth))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx(ctx.clone()))
        .and_then(list_transactions);

    let webhook_route = warp::path!("webhook")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_ctx(ctx))
        .and_then(receive_webhook);

    let health_route = warp::path!("health").and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    });

    create_payment_route
        .or(verify_route)
        .or(school_route)
        .or(status_route)
        .or(list_route)
        .or(webhook_route)
        .or(health_route)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_headers(vec!["content-type", "authorization"])
                .allow_methods(vec!["GET", "POST", "OPTIONS"]),
        )
        .recover(handle_rejection)
}
