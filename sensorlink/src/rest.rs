use crate::array::{ArrayCodec, Registry};
use crate::error::AppError;
use crate::links::CustomLinks;
use crate::model::url::self_link_for;
use crate::model::{EntityType, Id, LongIdManager, Observation, StringIdManager};
use crate::settings::{AppConfig, IdType};
use crate::{debug, error, info, warn};
use axum::extract::{FromRequest, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;

// Create our own JSON extractor by wrapping `axum::Json`. This makes it easy to override the
// rejection and provide our own which formats errors to match our application.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::JsonRejection(rej) => rej.body_text(),
            other                        => other.to_string(),
        };
        if status.is_server_error() {
            error!("{} {}", status.as_u16(), message);
        } else {
            warn!("{} {}", status.as_u16(), message);
        }
        (status, AppJson(ErrorResponse { message, code: status.as_u16() })).into_response()
    }
}

/// Where decoded observations go. Storage engines live behind this trait.
pub trait ObservationSink: Send + Sync {
    /// Stores the whole batch or nothing, assigning ids where absent. Ids come back in input order.
    fn insert_all(&self, observations: Vec<Observation>) -> Result<Vec<Id>, AppError>;
    fn get(&self, id: &Id) -> Result<Option<Observation>, AppError>;

    fn insert(&self, observation: Observation) -> Result<Id, AppError> {
        self.insert_all(vec![observation])?
            .pop()
            .ok_or_else(|| AppError::Internal("sink returned no id".to_string()))
    }
}

/// Volatile sink handing out sequential long ids.
#[derive(Default)]
pub struct MemorySink {
    inner: Mutex<MemoryRows>,
}

#[derive(Default)]
struct MemoryRows {
    next_id: i64,
    rows: BTreeMap<Id, Observation>,
}

impl MemorySink {
    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.inner.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }
}

impl ObservationSink for MemorySink {
    fn insert_all(&self, observations: Vec<Observation>) -> Result<Vec<Id>, AppError> {
        let mut guard = self.inner.lock()?;
        let mut taken: HashSet<Id> = HashSet::new();
        for id in observations.iter().filter_map(|o| o.id.as_ref()) {
            if guard.rows.contains_key(id) || !taken.insert(id.clone()) {
                return Err(AppError::BadRequest(format!("Observation {} already exists", id)));
            }
        }

        let mut next_id = guard.next_id;
        let mut staged = Vec::with_capacity(observations.len());
        for mut observation in observations {
            let id = match observation.id.clone() {
                Some(id) => id,
                None => loop {
                    next_id += 1;
                    let candidate = Id::Long(next_id);
                    if !guard.rows.contains_key(&candidate) && taken.insert(candidate.clone()) {
                        break candidate;
                    }
                },
            };
            observation.id = Some(id.clone());
            staged.push((id, observation));
        }

        guard.next_id = next_id;
        let ids = staged.iter().map(|(id, _)| id.clone()).collect();
        guard.rows.extend(staged);
        Ok(ids)
    }

    fn get(&self, id: &Id) -> Result<Option<Observation>, AppError> {
        Ok(self.inner.lock()?.rows.get(id).cloned())
    }
}

#[derive(Clone)]
pub struct RequestState {
    pub registry: Arc<Registry>,
    pub links: Arc<CustomLinks>,
    pub service_root: Arc<str>,
    pub sink: Arc<dyn ObservationSink>,
}

impl RequestState {
    pub fn new(registry: Arc<Registry>, links: CustomLinks, service_root: &str, sink: Arc<dyn ObservationSink>) -> Self {
        RequestState { registry, links: Arc::new(links), service_root: Arc::from(service_root.trim_end_matches('/')), sink }
    }

    pub fn from_config(config: &AppConfig, sink: Arc<dyn ObservationSink>) -> Self {
        let registry = match config.service.id_type {
            IdType::Long => Registry::new(Arc::new(LongIdManager)),
            IdType::String => Registry::new(Arc::new(StringIdManager)),
        };
        RequestState::new(Arc::new(registry), CustomLinks::from_settings(&config.experimental), &config.service.root_url, sink)
    }
}

async fn create_observations(
    State(state): State<RequestState>,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, AppJson<Vec<String>>), AppError> {
    let groups = ArrayCodec::new(&state.registry).decode_json(&body)?;
    let mut observations: Vec<Observation> = groups.into_iter().flat_map(|g| g.observations).collect();
    for observation in observations.iter_mut() {
        state.links.clean_entity(observation);
    }
    let created: Vec<String> = state
        .sink
        .insert_all(observations)?
        .iter()
        .map(|id| self_link_for(&state.service_root, EntityType::Observation, id))
        .collect();
    info!("Created {} observations", created.len());
    Ok((StatusCode::CREATED, AppJson(created)))
}

async fn get_observation(
    State(state): State<RequestState>,
    Path(raw_id): Path<String>,
) -> Result<AppJson<Value>, AppError> {
    let id = state.registry.id_manager().parse_id(&raw_id)?;
    let mut observation = state
        .sink
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Observation {}", id)))?;
    state.links.expand_entity(&mut observation, &state.service_root);
    let mut body = serde_json::to_value(&observation)?;
    if let Value::Object(map) = &mut body {
        map.insert("@iot.selfLink".to_string(), Value::String(self_link_for(&state.service_root, EntityType::Observation, &id)));
    }
    debug!("Serving observation {}", id);
    Ok(AppJson(body))
}

pub fn build_router(state: RequestState) -> Router<()> {
    Router::new()
        .route("/CreateObservations", post(create_observations))
        .route("/Observations/{id}", get(get_observation))
        .with_state(state)
}

pub async fn serve(state: RequestState, socket_addr: SocketAddr, shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
    let router: Router<()> = build_router(state);
    let tcp = TcpListener::bind(socket_addr).await?;
    info!("Listening on {}", socket_addr);

    let mut shutdown = shutdown.clone();
    axum::serve(tcp, router)
        .with_graceful_shutdown(async move {
            if shutdown.changed().await.is_ok() {
                info!("Shutting down server...");
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::LinkPattern;
    use serde_json::json;

    const ROOT: &str = "http://localhost:8080/v1.1";

    fn test_state(custom_links: bool) -> (RequestState, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let state = RequestState::new(
            Arc::new(Registry::new(Arc::new(LongIdManager))),
            CustomLinks::new(LinkPattern::default(), custom_links, 2),
            ROOT,
            sink.clone(),
        );
        (state, sink)
    }

    #[tokio::test]
    async fn create_observations_returns_self_links() {
        let (state, sink) = test_state(false);
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        let response = server
            .post("/CreateObservations")
            .json(&json!([{
                "Datastream": {"@iot.id": 1},
                "components": ["phenomenonTime", "result"],
                "dataArray@iot.count": 2,
                "dataArray": [["2010-12-23T10:20:00.000Z", 48], ["2010-12-23T10:21:00.000Z", 49]]
            }]))
            .await;
        response.assert_status(StatusCode::CREATED);
        let links: Vec<String> = response.json();
        assert_eq!(links, vec![format!("{}/Observations(1)", ROOT), format!("{}/Observations(2)", ROOT)]);
        assert_eq!(sink.len().unwrap(), 2);
        let stored = sink.get(&Id::Long(2)).unwrap().unwrap();
        assert_eq!(stored.result, Some(json!(49)));
        assert_eq!(stored.datastream.map(|r| r.id), Some(Id::Long(1)));
    }

    #[tokio::test]
    async fn bad_rows_are_rejected_without_storing() {
        let (state, sink) = test_state(false);
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        let response = server
            .post("/CreateObservations")
            .json(&json!([{
                "Datastream": {"@iot.id": 1},
                "components": ["id", "result"],
                "dataArray": [[1, 2], [3]]
            }]))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], json!(400));
        assert!(sink.is_empty().unwrap());
    }

    #[tokio::test]
    async fn custom_links_are_cleaned_on_write_and_expanded_on_read() {
        let (state, sink) = test_state(true);
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        server
            .post("/CreateObservations")
            .json(&json!([{
                "Datastream": {"@iot.id": 1},
                "components": ["id", "result", "parameters"],
                "dataArray": [[10, 1, {"room.Thing@iot.id": 4, "room.Thing@iot.navigationLink": "stale"}]]
            }]))
            .await
            .assert_status(StatusCode::CREATED);

        let stored = sink.get(&Id::Long(10)).unwrap().unwrap();
        assert_eq!(stored.parameters.map(Value::Object), Some(json!({"room.Thing@iot.id": 4})));

        let response = server.get("/Observations/10").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["@iot.selfLink"], json!(format!("{}/Observations(10)", ROOT)));
        assert_eq!(body["parameters"]["room.Thing@iot.navigationLink"], json!(format!("{}/Things(4)", ROOT)));
    }

    #[tokio::test]
    async fn missing_observation_is_not_found() {
        let (state, _) = test_state(false);
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        server.get("/Observations/99").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn batch_with_repeated_id_stores_nothing() {
        let (state, sink) = test_state(false);
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        let response = server
            .post("/CreateObservations")
            .json(&json!([{
                "Datastream": {"@iot.id": 1},
                "components": ["id", "result"],
                "dataArray": [[5, 1], [5, 2]]
            }]))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(sink.is_empty().unwrap());
    }

    #[tokio::test]
    async fn batch_clashing_with_stored_id_stores_nothing() {
        let (state, sink) = test_state(false);
        sink.insert(Observation { id: Some(Id::Long(7)), ..Default::default() }).unwrap();
        let server = axum_test::TestServer::new(build_router(state)).unwrap();
        server
            .post("/CreateObservations")
            .json(&json!([
                {"Datastream": {"@iot.id": 1}, "components": ["id", "result"], "dataArray": [[6, 1]]},
                {"Datastream": {"@iot.id": 2}, "components": ["id", "result"], "dataArray": [[7, 2]]}
            ]))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(sink.len().unwrap(), 1);
        assert!(sink.get(&Id::Long(6)).unwrap().is_none());
    }

    #[test]
    fn generated_ids_skip_explicit_ones() {
        let sink = MemorySink::default();
        let ids = sink
            .insert_all(vec![Observation { id: Some(Id::Long(1)), ..Default::default() }, Observation::default(), Observation::default()])
            .unwrap();
        assert_eq!(ids, vec![Id::Long(1), Id::Long(2), Id::Long(3)]);
        assert_eq!(sink.insert(Observation::default()).unwrap(), Id::Long(4));
    }

    #[test]
    fn memory_sink_rejects_duplicate_ids() {
        let sink = MemorySink::default();
        let obs = Observation { id: Some(Id::Long(5)), ..Default::default() };
        assert_eq!(sink.insert(obs.clone()).unwrap(), Id::Long(5));
        assert!(matches!(sink.insert(obs), Err(AppError::BadRequest(_))));
    }
}
