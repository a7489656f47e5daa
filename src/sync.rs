use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{ApiError, CatalogApi, Failure, Resource};
use crate::models::{
    Actor, BatchDeleteReply, CastReply, CreatedReply, Entity, MessageReply, Movie, MovieDetails,
};
use crate::notify::{Level, Notifier, DEFAULT_LIFETIME, SERVER_ERROR_LIFETIME};
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation<E: Entity> {
    List,
    Create(E::Payload),
    Update(i64, E::Payload),
    Delete(i64),
    BatchDelete(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply<E: Entity> {
    Listed(Vec<E>),
    Created { id: i64, message: String },
    Updated { message: String },
    Deleted { message: String },
    BatchDeleted {
        deleted_ids: Option<Vec<i64>>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response<E: Entity> {
    pub op: Operation<E>,
    pub result: Result<Reply<E>, ApiError>,
}

impl<E: Entity> Response<E> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Clone)]
pub struct SyncClient {
    api: Arc<dyn CatalogApi>,
}

impl SyncClient {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    // Exactly one request. Local state is only touched by `reconcile`.
    pub async fn execute<E: Entity>(&self, op: Operation<E>) -> Response<E> {
        let result = self.run(&op).await;
        if let Err(e) = &result {
            debug!(resource = %E::RESOURCE, "Catalog request failed: {}", e);
        }
        Response { op, result }
    }

    async fn run<E: Entity>(&self, op: &Operation<E>) -> Result<Reply<E>, ApiError> {
        let resource = E::RESOURCE;
        match op {
            Operation::List => {
                let value = self.api.list(resource).await?;
                Ok(Reply::Listed(decode(value)?))
            }
            Operation::Create(payload) => {
                let value = self.api.create(resource, encode(payload)?).await?;
                let reply: CreatedReply = decode(value)?;
                Ok(Reply::Created {
                    id: reply.id,
                    message: reply.message,
                })
            }
            Operation::Update(id, payload) => {
                let value = self.api.update(resource, *id, encode(payload)?).await?;
                let reply: MessageReply = decode(value)?;
                Ok(Reply::Updated {
                    message: reply.message,
                })
            }
            Operation::Delete(id) => {
                let value = self.api.delete(resource, *id).await?;
                let reply: MessageReply = decode(value)?;
                Ok(Reply::Deleted {
                    message: reply.message,
                })
            }
            Operation::BatchDelete(ids) => {
                let value = self.api.batch_delete(resource, ids).await?;
                let reply: BatchDeleteReply = decode(value)?;
                Ok(Reply::BatchDeleted {
                    deleted_ids: reply.deleted_ids,
                    message: reply.message,
                })
            }
        }
    }

    pub async fn get_details(&self, movie_id: i64) -> Result<Movie, ApiError> {
        decode(self.api.get(Resource::Movies, movie_id).await?)
    }

    pub async fn get_cast(&self, movie_id: i64) -> Result<Vec<Actor>, ApiError> {
        let reply: CastReply = decode(self.api.cast(movie_id).await?)?;
        Ok(reply.actors)
    }

    pub async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, ApiError> {
        let (mut movie, cast) =
            tokio::try_join!(self.get_details(movie_id), self.get_cast(movie_id))?;
        if movie.actor_ids.is_empty() {
            movie.actor_ids = cast.iter().map(|a| a.id).collect();
        }
        Ok(MovieDetails { movie, cast })
    }
}

/// Applies a successful response to the store and reports the outcome.
/// Failed responses leave the store and its selection untouched.
pub fn reconcile<E: Entity>(
    store: &mut EntityStore<E>,
    notifier: &mut Notifier,
    response: Response<E>,
) -> bool {
    let reply = match response.result {
        Ok(reply) => reply,
        Err(err) => {
            notify_failure(notifier, &err);
            return false;
        }
    };

    let label = E::RESOURCE.singular();
    match (response.op, reply) {
        (Operation::List, Reply::Listed(items)) => {
            info!("Loaded {} {} record(s)", items.len(), label);
            store.replace_all(items);
        }
        (Operation::Create(payload), Reply::Created { id, message }) => {
            store.append(E::from_payload(id, payload));
            notifier.success(format!("Success: {message}"));
        }
        (Operation::Update(id, payload), Reply::Updated { message }) => {
            if !store.replace(id, E::from_payload(id, payload)) {
                debug!("Updated {} {} is no longer listed", label, id);
            }
            notifier.success(format!("Success: {message}"));
        }
        (Operation::Delete(id), Reply::Deleted { message }) => {
            store.remove(id);
            notifier.success(format!("Success: {message}"));
        }
        (Operation::BatchDelete(requested), Reply::BatchDeleted { deleted_ids, message }) => {
            let deleted = deleted_ids.unwrap_or(requested);
            let removed = store.remove_many(&deleted);
            store.clear_selection();
            info!("Removed {} {} record(s) after batch delete", removed, label);
            notifier.success(format!("Success: {message}"));
        }
        (op, reply) => {
            debug!("Reply {:?} does not match operation {:?}", reply, op);
            return false;
        }
    }
    true
}

pub fn notify_failure(notifier: &mut Notifier, err: &ApiError) {
    let (level, message, lifetime) = failure_message(err);
    notifier.push(level, message, lifetime);
}

pub fn failure_message(err: &ApiError) -> (Level, String, std::time::Duration) {
    let detail = err.detail().unwrap_or("Unexpected error");
    match (err.failure(), err) {
        (Failure::Conflict, _) => (Level::Warning, format!("Conflict: {detail}"), DEFAULT_LIFETIME),
        (Failure::BadRequest, _) => (
            Level::Error,
            format!("Invalid data: {detail}"),
            DEFAULT_LIFETIME,
        ),
        (Failure::NotFound, _) => (Level::Error, format!("Not found: {detail}"), DEFAULT_LIFETIME),
        (Failure::Connectivity, _) => (
            Level::Error,
            "Connection failed: Is your backend running?".to_string(),
            DEFAULT_LIFETIME,
        ),
        (Failure::Server, ApiError::Status { status, .. }) if *status != 500 => (
            Level::Error,
            format!("Error {status}: {detail}"),
            DEFAULT_LIFETIME,
        ),
        (Failure::Server, _) => (
            Level::Error,
            "An unexpected server-side error occurred.".to_string(),
            SERVER_ERROR_LIFETIME,
        ),
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActorPayload, MoviePayload};
    use std::collections::BTreeSet;

    fn movie(id: i64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: 1999,
            director: "Lana Wachowski".to_string(),
            description: None,
            actor_ids: BTreeSet::new(),
        }
    }

    fn payload(title: &str) -> MoviePayload {
        MoviePayload {
            title: title.to_string(),
            year: 1999,
            director: "Lana Wachowski".to_string(),
            description: None,
            actor_ids: BTreeSet::new(),
        }
    }

    fn status(code: u16, detail: &str) -> ApiError {
        ApiError::Status {
            status: code,
            detail: Some(detail.to_string()),
        }
    }

    #[test]
    fn create_success_appends_with_server_id() {
        let mut store = EntityStore::new();
        let mut notifier = Notifier::new();
        let applied = reconcile(
            &mut store,
            &mut notifier,
            Response::<Movie> {
                op: Operation::Create(payload("The Matrix")),
                result: Ok(Reply::Created {
                    id: 7,
                    message: "Success".to_string(),
                }),
            },
        );
        assert!(applied);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7).map(|m| m.title.as_str()), Some("The Matrix"));
        let latest = notifier.latest().expect("notification");
        assert_eq!(latest.message, "Success: Success");
        assert_eq!(latest.level, Level::Success);
    }

    #[test]
    fn conflict_on_update_leaves_entity_unchanged() {
        let mut store = EntityStore::new();
        store.replace_all(vec![movie(5, "Original")]);
        let mut notifier = Notifier::new();
        let applied = reconcile(
            &mut store,
            &mut notifier,
            Response::<Movie> {
                op: Operation::Update(5, payload("Changed")),
                result: Err(status(409, "Movie already exists! Update not allowed!")),
            },
        );
        assert!(!applied);
        assert_eq!(store.get(5), Some(&movie(5, "Original")));
        let latest = notifier.latest().expect("notification");
        assert_eq!(latest.level, Level::Warning);
        assert!(latest.message.contains("Movie already exists! Update not allowed!"));
    }

    #[test]
    fn batch_delete_uses_server_ids_and_clears_selection() {
        let mut store = EntityStore::new();
        store.replace_all(vec![movie(1, "One"), movie(2, "Two"), movie(3, "Three")]);
        for id in [1, 2, 3] {
            store.toggle_selection(id);
        }
        let mut notifier = Notifier::new();
        reconcile(
            &mut store,
            &mut notifier,
            Response::<Movie> {
                op: Operation::BatchDelete(vec![1, 2, 3]),
                result: Ok(Reply::BatchDeleted {
                    deleted_ids: Some(vec![1, 2]),
                    message: "Deleted".to_string(),
                }),
            },
        );
        assert_eq!(store.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn batch_delete_falls_back_to_requested_ids() {
        let mut store = EntityStore::new();
        store.replace_all(vec![
            Actor::from_payload(1, ActorPayload { name: "A".into(), surname: "B".into() }),
            Actor::from_payload(2, ActorPayload { name: "C".into(), surname: "D".into() }),
        ]);
        let mut notifier = Notifier::new();
        reconcile(
            &mut store,
            &mut notifier,
            Response::<Actor> {
                op: Operation::BatchDelete(vec![2]),
                result: Ok(Reply::BatchDeleted {
                    deleted_ids: None,
                    message: "Partially".to_string(),
                }),
            },
        );
        assert_eq!(store.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn failed_batch_delete_keeps_selection() {
        let mut store = EntityStore::new();
        store.replace_all(vec![movie(1, "One")]);
        store.toggle_selection(1);
        let mut notifier = Notifier::new();
        reconcile(
            &mut store,
            &mut notifier,
            Response::<Movie> {
                op: Operation::BatchDelete(vec![1]),
                result: Err(status(500, "boom")),
            },
        );
        assert!(store.is_selected(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failure_messages_by_class() {
        let (level, msg, _) = failure_message(&status(400, "Fields title/director/year are required!"));
        assert_eq!(level, Level::Error);
        assert_eq!(msg, "Invalid data: Fields title/director/year are required!");

        let (_, msg, _) = failure_message(&status(404, "Movie not found!"));
        assert_eq!(msg, "Not found: Movie not found!");

        let (_, msg, lifetime) = failure_message(&status(500, "db locked"));
        assert_eq!(msg, "An unexpected server-side error occurred.");
        assert_eq!(lifetime, SERVER_ERROR_LIFETIME);

        let (_, msg, _) = failure_message(&ApiError::Status {
            status: 503,
            detail: None,
        });
        assert_eq!(msg, "Error 503: Unexpected error");

        let (_, msg, _) = failure_message(&ApiError::Transport("refused".to_string()));
        assert_eq!(msg, "Connection failed: Is your backend running?");
    }
}
