//! Model-serving HTTP API.
//!
//! Serves single-row predictions for every `<name>.json` model found
//! under `MODELS_DIR` (default `./models`). Models load lazily into an
//! owned, mutex-guarded registry handed to the handlers as axum state;
//! there is no ambient global.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use histboost::{kernels, DataMatrix, GBDT, MISSING_VALUE};

// ============================================================================
// Model registry
// ============================================================================

struct ModelRegistry {
    models_dir: PathBuf,
    models: Mutex<HashMap<String, Arc<GBDT>>>,
}

impl ModelRegistry {
    fn new(models_dir: PathBuf) -> Self {
        Self {
            models_dir,
            models: Mutex::new(HashMap::new()),
        }
    }

    fn model_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(format!("{name}.json"))
    }

    /// Fetch a model by name, loading and caching it on first use.
    fn get(&self, name: &str) -> Result<Arc<GBDT>, ApiError> {
        let mut models = self.models.lock().expect("registry lock poisoned");
        if let Some(model) = models.get(name) {
            return Ok(model.clone());
        }

        let path = self.model_path(name);
        if !path.exists() {
            return Err(ApiError::NotFound(format!("model not found: {name}")));
        }
        let model = GBDT::load_model(path.to_str().unwrap_or_default())
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let model = Arc::new(model);
        models.insert(name.to_string(), model.clone());
        Ok(model)
    }

    /// Stems of every `.json` file in the models directory.
    fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.models_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "simd": kernels::simd_label(),
    }))
}

async fn list_models(State(registry): State<Arc<ModelRegistry>>) -> Json<Value> {
    Json(json!({ "models": registry.list() }))
}

async fn model_info(
    State(registry): State<Arc<ModelRegistry>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let model = registry.get(&name)?;
    let config = model.config();
    Ok(Json(json!({
        "name": name,
        "task": config.task,
        "n_rounds": config.n_rounds,
        "learning_rate": config.learning_rate,
        "max_depth": config.max_depth,
        "n_bins": config.n_bins,
        "metric": config.metric,
        "n_trees": model.trees().len(),
    })))
}

async fn predict(
    State(registry): State<Arc<ModelRegistry>>,
    Path(name): Path<String>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();

    let request: Value = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed JSON body: {e}")))?;

    let features = extract_features(&request)?;
    let model = registry.get(&name)?;

    let data = DataMatrix::from_parts(features.clone(), Vec::new(), 1, features.len())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let predictions = model
        .predict(&data)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "prediction": predictions[0],
        "model": name,
        "time_us": start.elapsed().as_micros() as u64,
    })))
}

/// Pull a single feature row out of `{features: [...]}` or
/// `{csv: "<header>\n<row>"}`.
fn extract_features(request: &Value) -> Result<Vec<f32>, ApiError> {
    if let Some(features) = request.get("features") {
        let values = features
            .as_array()
            .ok_or_else(|| ApiError::BadRequest("'features' must be an array".to_string()))?;
        return values
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    ApiError::BadRequest("'features' must contain only numbers".to_string())
                })
            })
            .collect();
    }

    if let Some(csv) = request.get("csv") {
        let csv = csv
            .as_str()
            .ok_or_else(|| ApiError::BadRequest("'csv' must be a string".to_string()))?;
        let mut lines = csv.lines();
        let header = lines
            .next()
            .ok_or_else(|| ApiError::BadRequest("csv needs a header line".to_string()))?;
        let row = lines
            .next()
            .ok_or_else(|| ApiError::BadRequest("csv needs a data row".to_string()))?;

        let n_cols = header.split(',').count();
        let features: Vec<f32> = row
            .split(',')
            .map(|cell| {
                if cell.is_empty() || cell == "NA" || cell == "N/A" || cell == "?" {
                    Ok(MISSING_VALUE)
                } else {
                    cell.trim().parse::<f32>().map_err(|e| {
                        ApiError::BadRequest(format!("cannot parse {cell:?} as a number: {e}"))
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        if features.len() != n_cols {
            return Err(ApiError::BadRequest(format!(
                "csv row has {} cells, header has {n_cols}",
                features.len()
            )));
        }
        return Ok(features);
    }

    Err(ApiError::BadRequest(
        "body must contain 'features' or 'csv'".to_string(),
    ))
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() {
    let models_dir = std::env::var("MODELS_DIR").unwrap_or_else(|_| "./models".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let registry = Arc::new(ModelRegistry::new(PathBuf::from(&models_dir)));

    let app = Router::new()
        .route("/api/version", get(version))
        .route("/api/models", get(list_models))
        .route("/api/models/:name", get(model_info))
        .route("/api/predict/:name", post(predict))
        .with_state(registry);

    let addr = format!("0.0.0.0:{port}");
    println!("histboost-server listening on http://{addr} (models: {models_dir})");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("Error: failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("Error: server failed: {err}");
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
