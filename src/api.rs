// src/api.rs
use crate::auth::with_auth;
use crate::error::handle_rejection;
use crate::models::{HoldingCreate, HoldingUpdate};
use crate::service::HoldingService;
use crate::upload::read_csv_upload;
use log::{error, info};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::{Filter, Rejection, Reply};

pub fn routes(
    service: Arc<HoldingService>,
    jwt_secret: Arc<String>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
    let create = warp::path!("holdings")
        .and(warp::post())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(create_holding_handler);

    let list = warp::path!("holdings")
        .and(warp::get())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and_then(list_holdings_handler);

    let get = warp::path!("holdings" / String)
        .and(warp::get())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and_then(get_holding_handler);

    let update = warp::path!("holdings" / String)
        .and(warp::put())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(update_holding_handler);

    let delete = warp::path!("holdings" / String)
        .and(warp::delete())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and_then(delete_holding_handler);

    let preview = warp::path!("holdings" / "import" / "preview")
        .and(warp::post())
        .and(with_auth(jwt_secret.clone()))
        .and(with_service(service.clone()))
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and_then(preview_import_handler);

    let import = warp::path!("holdings" / "import")
        .and(warp::post())
        .and(with_auth(jwt_secret))
        .and(with_service(service))
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and_then(import_handler);

    preview
        .or(import)
        .or(create)
        .or(list)
        .or(get)
        .or(update)
        .or(delete)
        .recover(handle_rejection)
}

fn with_service(
    service: Arc<HoldingService>,
) -> impl Filter<Extract = (Arc<HoldingService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn create_holding_handler(
    user_id: String,
    service: Arc<HoldingService>,
    data: HoldingCreate,
) -> Result<impl Reply, Rejection> {
    let holding = service
        .create(&user_id, data)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&holding),
        StatusCode::CREATED,
    ))
}

async fn list_holdings_handler(
    user_id: String,
    service: Arc<HoldingService>,
) -> Result<impl Reply, Rejection> {
    let holdings = service
        .list(&user_id)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&holdings))
}

async fn get_holding_handler(
    id: String,
    user_id: String,
    service: Arc<HoldingService>,
) -> Result<impl Reply, Rejection> {
    let holding = service
        .get(&user_id, &id)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&holding))
}

async fn update_holding_handler(
    id: String,
    user_id: String,
    service: Arc<HoldingService>,
    data: HoldingUpdate,
) -> Result<impl Reply, Rejection> {
    let holding = service
        .update(&user_id, &id, data)
        .await
        .map_err(warp::reject::custom)?;
    info!("Holding {} updated.", holding.id);
    Ok(warp::reply::json(&holding))
}

async fn delete_holding_handler(
    id: String,
    user_id: String,
    service: Arc<HoldingService>,
) -> Result<impl Reply, Rejection> {
    service
        .delete(&user_id, &id)
        .await
        .map_err(warp::reject::custom)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_import_handler(
    user_id: String,
    service: Arc<HoldingService>,
    form: FormData,
) -> Result<impl Reply, Rejection> {
    let content = read_csv_upload(form)
        .await
        .map_err(warp::reject::custom)?;
    let preview = service
        .preview_import(&user_id, &content)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&preview))
}

async fn import_handler(
    user_id: String,
    service: Arc<HoldingService>,
    form: FormData,
) -> Result<impl Reply, Rejection> {
    let content = read_csv_upload(form)
        .await
        .map_err(warp::reject::custom)?;
    match service.apply_import(&user_id, &content).await {
        Ok(result) => Ok(warp::reply::json(&result)),
        Err(e) => {
            error!("Import for user {} rejected: {}", user_id, e);
            Err(warp::reject::custom(e))
        }
    }
}
