use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::catalog::Resource;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub director: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actor_ids: BTreeSet<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MoviePayload {
    pub title: String,
    pub year: i32,
    pub director: String,
    pub description: Option<String>,
    pub actor_ids: BTreeSet<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ActorPayload {
    pub name: String,
    pub surname: String,
}

/// A catalog record that lives in an [`EntityStore`](crate::store::EntityStore)
/// and can be rebuilt from the payload that created it.
pub trait Entity: Debug + Clone + PartialEq + Send + Sync + for<'de> Deserialize<'de> + 'static {
    type Payload: Serialize + Debug + Clone + PartialEq + Send + Sync + 'static;

    const RESOURCE: Resource;

    fn id(&self) -> i64;
    fn from_payload(id: i64, payload: Self::Payload) -> Self;
    fn search_text(&self) -> String;
}

impl Entity for Movie {
    type Payload = MoviePayload;

    const RESOURCE: Resource = Resource::Movies;

    fn id(&self) -> i64 {
        self.id
    }

    fn from_payload(id: i64, payload: MoviePayload) -> Self {
        Movie {
            id,
            title: payload.title,
            year: payload.year,
            director: payload.director,
            description: payload.description,
            actor_ids: payload.actor_ids,
        }
    }

    fn search_text(&self) -> String {
        self.title.clone()
    }
}

impl Entity for Actor {
    type Payload = ActorPayload;

    const RESOURCE: Resource = Resource::Actors;

    fn id(&self) -> i64 {
        self.id
    }

    fn from_payload(id: i64, payload: ActorPayload) -> Self {
        Actor {
            id,
            name: payload.name,
            surname: payload.surname,
        }
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreatedReply {
    pub id: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessageReply {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchDeleteReply {
    #[serde(default)]
    pub deleted_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CastReply {
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub actors: Vec<Actor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub movie: Movie,
    pub cast: Vec<Actor>,
}
