//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling: one spawned task per
//! accepted connection, handlers suspend only on MongoDB I/O.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::actions::ValidateCtx;
use crate::config::{Args, Enums};
use crate::db::MongoClient;
use crate::routes;
use crate::types::{MusterError, Result};

type FullBody = Full<Bytes>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub enums: Enums,
    pub mongo: MongoClient,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, enums: Enums, mongo: MongoClient) -> Self {
        Self {
            args,
            enums,
            mongo,
            started_at: Instant::now(),
        }
    }

    /// Validation context handed to the REST actions
    pub fn validate_ctx(&self) -> ValidateCtx<'_> {
        ValidateCtx {
            db: &self.mongo,
            enums: &self.enums,
        }
    }
}

/// Bind the configured address and start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve connections from an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!(
        "Muster listening on {} as node {}",
        listener.local_addr()?,
        state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("{} {}", method, path);

    // CORS preflight
    if method == Method::OPTIONS {
        return Ok(preflight_response());
    }

    let response = match (method.clone(), path.as_str()) {
        // Package metadata
        (Method::GET, "/") => routes::package_info(),

        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state)).await
        }

        _ => {
            let prefix = format!("/v{}", state.args.api_version);
            match path.strip_prefix(&prefix) {
                Some(rest) => dispatch_versioned(req, state, rest).await,
                None => routes::error_response(&MusterError::NotFound),
            }
        }
    };

    Ok(response)
}

/// Dispatch a request under the versioned prefix
async fn dispatch_versioned(
    req: Request<Incoming>,
    state: Arc<AppState>,
    rest: &str,
) -> Response<FullBody> {
    if rest == "/schema" && req.method() == Method::GET {
        return routes::handle_schema_request(state);
    }

    if let Some(subpath) = strip_collection(rest, "/parties") {
        let subpath = subpath.to_string();
        return routes::handle_parties_request(req, state, &subpath).await;
    }

    if let Some(subpath) = strip_collection(rest, "/roles") {
        let subpath = subpath.to_string();
        return routes::handle_roles_request(req, state, &subpath).await;
    }

    if let Some(subpath) = strip_collection(rest, "/permissions") {
        let subpath = subpath.to_string();
        return routes::handle_permissions_request(req, state, &subpath).await;
    }

    routes::error_response(&MusterError::NotFound)
}

/// Strip a collection segment, requiring a path boundary after it
fn strip_collection<'a>(rest: &'a str, name: &str) -> Option<&'a str> {
    let subpath = rest.strip_prefix(name)?;
    (subpath.is_empty() || subpath.starts_with('/')).then_some(subpath)
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, PUT, DELETE, OPTIONS",
        )
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
