use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{ApiError, CatalogApi, Resource};
use crate::form::{ActorDraft, FormRejection, FormState, MovieDraft};
use crate::models::{Actor, Entity, Movie, MovieDetails};
use crate::notify::Notifier;
use crate::router::{ListKind, RouterError, Screen, ViewRouter};
use crate::store::{actors_by_surname, EntityStore};
use crate::sync::{notify_failure, reconcile, Operation, Response, SyncClient};
use crate::validate::{FieldName, ValidationContext};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no form is open")]
    NoOpenForm,
    #[error("the open form has no {0}")]
    WrongForm(&'static str),
    #[error("unknown {resource} {id}")]
    UnknownEntity { resource: Resource, id: i64 },
    #[error("Nothing selected to delete!")]
    NothingSelected,
    #[error(transparent)]
    Rejected(#[from] FormRejection),
    #[error(transparent)]
    Router(#[from] RouterError),
}

#[derive(Debug)]
pub enum Completion {
    Movies {
        origin: Option<u64>,
        response: Response<Movie>,
    },
    Actors {
        origin: Option<u64>,
        response: Response<Actor>,
    },
    Details {
        movie_id: i64,
        result: Result<MovieDetails, ApiError>,
    },
    // Current cast of a movie about to be edited. List rows carry no actor ids.
    EditCast {
        movie_id: i64,
        result: Result<Vec<Actor>, ApiError>,
    },
}

// Dropping a Pending does not cancel the request.
#[derive(Debug)]
pub struct Pending {
    handle: JoinHandle<Completion>,
}

impl Pending {
    pub async fn wait(self) -> Result<Completion> {
        self.handle.await.context("catalog request task failed")
    }
}

trait Routed: Entity {
    fn completion(origin: Option<u64>, response: Response<Self>) -> Completion;
}

impl Routed for Movie {
    fn completion(origin: Option<u64>, response: Response<Self>) -> Completion {
        Completion::Movies { origin, response }
    }
}

impl Routed for Actor {
    fn completion(origin: Option<u64>, response: Response<Self>) -> Completion {
        Completion::Actors { origin, response }
    }
}

#[derive(Debug)]
enum FormKind {
    Movie(FormState<MovieDraft>),
    Actor(FormState<ActorDraft>),
}

enum Submitted {
    Movie(Operation<Movie>),
    Actor(Operation<Actor>),
}

#[derive(Debug)]
struct OpenForm {
    token: u64,
    kind: FormKind,
}

/// Client-side state of one catalog session. All mutation happens through `&mut self`,
/// so completions are applied one at a time in the order they are handed in.
pub struct Session {
    sync: SyncClient,
    router: ViewRouter,
    movies: EntityStore<Movie>,
    actors: EntityStore<Actor>,
    notifier: Notifier,
    form: Option<OpenForm>,
    next_form_token: u64,
    details: Option<MovieDetails>,
    search: String,
    validation: Option<ValidationContext>,
}

impl Session {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            sync: SyncClient::new(api),
            router: ViewRouter::new(),
            movies: EntityStore::new(),
            actors: EntityStore::new(),
            notifier: Notifier::new(),
            form: None,
            next_form_token: 0,
            details: None,
            search: String::new(),
            validation: None,
        }
    }

    pub fn with_validation_context(mut self, ctx: ValidationContext) -> Self {
        self.validation = Some(ctx);
        self
    }

    pub fn screen(&self) -> Screen {
        self.router.screen()
    }

    pub fn movies(&self) -> &EntityStore<Movie> {
        &self.movies
    }

    pub fn actors(&self) -> &EntityStore<Actor> {
        &self.actors
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn details(&self) -> Option<&MovieDetails> {
        self.details.as_ref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn movie_form(&self) -> Option<&FormState<MovieDraft>> {
        match self.form.as_ref().map(|f| &f.kind) {
            Some(FormKind::Movie(form)) => Some(form),
            _ => None,
        }
    }

    pub fn actor_form(&self) -> Option<&FormState<ActorDraft>> {
        match self.form.as_ref().map(|f| &f.kind) {
            Some(FormKind::Actor(form)) => Some(form),
            _ => None,
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn visible_movies(&self) -> Vec<&Movie> {
        self.movies.filter(&self.search)
    }

    pub fn visible_actors(&self) -> Vec<&Actor> {
        actors_by_surname(self.actors.filter(&self.search))
    }

    pub fn load_movies(&self) -> Pending {
        self.spawn::<Movie>(None, Operation::List)
    }

    pub fn load_actors(&self) -> Pending {
        self.spawn::<Actor>(None, Operation::List)
    }

    pub fn switch_list(&mut self, kind: ListKind) -> Result<Screen, SessionError> {
        let from = self.router.screen();
        let screen = self.router.switch_list(kind)?;
        if from != screen {
            self.leave_list(from);
        }
        Ok(screen)
    }

    pub fn open_add_form(&mut self) -> Result<Screen, SessionError> {
        let kind = match self.router.screen().list_kind() {
            ListKind::Movies => FormKind::Movie(FormState::create()),
            ListKind::Actors => FormKind::Actor(FormState::create()),
        };
        self.enter_form(None, kind)
    }

    /// Actor forms open at once and return `None`. A movie form opens only once its
    /// cast has been fetched, when the returned request is applied.
    pub fn open_edit_form(&mut self, id: i64) -> Result<Option<Pending>, SessionError> {
        let from = self.router.screen();
        match from.list_kind() {
            ListKind::Movies => {
                if !self.movies.contains(id) {
                    return Err(SessionError::UnknownEntity {
                        resource: Resource::Movies,
                        id,
                    });
                }
                if from != Screen::MoviesList {
                    return Err(RouterError::InvalidTransition {
                        from,
                        action: "open a form",
                    }
                    .into());
                }
                let sync = self.sync.clone();
                let handle = tokio::spawn(async move {
                    let result = sync.get_cast(id).await;
                    Completion::EditCast {
                        movie_id: id,
                        result,
                    }
                });
                Ok(Some(Pending { handle }))
            }
            ListKind::Actors => {
                let actor = self.actors.get(id).ok_or(SessionError::UnknownEntity {
                    resource: Resource::Actors,
                    id,
                })?;
                let kind = FormKind::Actor(FormState::edit(actor));
                self.enter_form(Some(id), kind)?;
                Ok(None)
            }
        }
    }

    pub fn change_field(
        &mut self,
        field: FieldName,
        value: impl Into<String>,
    ) -> Result<bool, SessionError> {
        let ctx = self.validation.unwrap_or_else(ValidationContext::now);
        let form = self.form.as_mut().ok_or(SessionError::NoOpenForm)?;
        Ok(match &mut form.kind {
            FormKind::Movie(state) => state.on_field_change(field, value, &ctx),
            FormKind::Actor(state) => state.on_field_change(field, value, &ctx),
        })
    }

    pub fn toggle_actor(&mut self, actor_id: i64) -> Result<(), SessionError> {
        if !self.actors.contains(actor_id) {
            return Err(SessionError::UnknownEntity {
                resource: Resource::Actors,
                id: actor_id,
            });
        }
        let form = self.form.as_mut().ok_or(SessionError::NoOpenForm)?;
        match &mut form.kind {
            FormKind::Movie(state) => {
                state.toggle_actor(actor_id);
                Ok(())
            }
            FormKind::Actor(_) => Err(SessionError::WrongForm("cast")),
        }
    }

    // A request the form already issued keeps running and is applied silently.
    pub fn cancel_form(&mut self) -> Result<Screen, SessionError> {
        let screen = self.router.close_form()?;
        self.form = None;
        Ok(screen)
    }

    pub fn submit_form(&mut self) -> Result<Pending, SessionError> {
        let open = self.form.as_mut().ok_or(SessionError::NoOpenForm)?;
        let token = open.token;
        let ctx = self.validation.unwrap_or_else(ValidationContext::now);
        let submitted = match &mut open.kind {
            FormKind::Movie(state) => state.submit(&ctx).map(Submitted::Movie),
            FormKind::Actor(state) => state.submit(&ctx).map(Submitted::Actor),
        };
        match submitted {
            Ok(Submitted::Movie(op)) => Ok(self.spawn(Some(token), op)),
            Ok(Submitted::Actor(op)) => Ok(self.spawn(Some(token), op)),
            Err(rejection) => {
                match rejection {
                    FormRejection::Pending => self.notifier.warning(rejection.to_string()),
                    _ => self.notifier.error(rejection.to_string()),
                };
                Err(SessionError::Rejected(rejection))
            }
        }
    }

    pub fn toggle_selection(&mut self, id: i64) -> bool {
        match self.router.screen() {
            Screen::MoviesList => self.movies.toggle_selection(id),
            Screen::ActorsList => self.actors.toggle_selection(id),
            _ => false,
        }
    }

    pub fn delete(&mut self, id: i64) -> Result<Pending, SessionError> {
        match self.router.screen() {
            Screen::MoviesList => Ok(self.spawn::<Movie>(None, Operation::Delete(id))),
            Screen::ActorsList => Ok(self.spawn::<Actor>(None, Operation::Delete(id))),
            from => Err(RouterError::InvalidTransition {
                from,
                action: "delete",
            }
            .into()),
        }
    }

    // The selection stays until the batch request succeeds.
    pub fn delete_selected(&mut self) -> Result<Pending, SessionError> {
        let screen = self.router.screen();
        let ids: Vec<i64> = match screen {
            Screen::MoviesList => self.movies.selection().iter().copied().collect(),
            Screen::ActorsList => self.actors.selection().iter().copied().collect(),
            from => {
                return Err(RouterError::InvalidTransition {
                    from,
                    action: "delete the selection",
                }
                .into())
            }
        };
        if ids.is_empty() {
            self.notifier.error(SessionError::NothingSelected.to_string());
            return Err(SessionError::NothingSelected);
        }
        info!("Deleting {} selected record(s)", ids.len());
        Ok(match screen {
            Screen::MoviesList => self.spawn::<Movie>(None, Operation::BatchDelete(ids)),
            _ => self.spawn::<Actor>(None, Operation::BatchDelete(ids)),
        })
    }

    pub fn show_details(&mut self, movie_id: i64) -> Result<Pending, SessionError> {
        let from = self.router.screen();
        self.router.show_details(movie_id)?;
        self.leave_list(from);
        self.details = None;
        let sync = self.sync.clone();
        let handle = tokio::spawn(async move {
            let result = sync.movie_details(movie_id).await;
            Completion::Details { movie_id, result }
        });
        Ok(Pending { handle })
    }

    pub fn back(&mut self) -> Result<Screen, SessionError> {
        let screen = self.router.back()?;
        self.details = None;
        Ok(screen)
    }

    pub fn apply(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Movies { origin, response } => {
                let ok = reconcile(&mut self.movies, &mut self.notifier, response);
                self.settle(origin, ok);
                ok
            }
            Completion::Actors { origin, response } => {
                let ok = reconcile(&mut self.actors, &mut self.notifier, response);
                self.settle(origin, ok);
                ok
            }
            Completion::Details { movie_id, result } => self.apply_details(movie_id, result),
            Completion::EditCast { movie_id, result } => self.apply_edit_cast(movie_id, result),
        }
    }

    pub async fn run(&mut self, pending: Pending) -> Result<bool> {
        let completion = pending.wait().await?;
        Ok(self.apply(completion))
    }

    fn apply_details(&mut self, movie_id: i64, result: Result<MovieDetails, ApiError>) -> bool {
        if self.router.screen() != (Screen::MovieDetails { movie_id }) {
            debug!(movie_id, "Discarding details for a screen that is no longer shown");
            return result.is_ok();
        }
        match result {
            Ok(details) => {
                self.details = Some(details);
                true
            }
            Err(ApiError::Transport(e)) => {
                warn!("Details request failed: {}", e);
                self.notifier
                    .error("Connection failed: Could not reach the server.");
                false
            }
            Err(e) => {
                warn!("Details request failed: {}", e);
                self.notifier.error("Failed to load movie detail from server.");
                false
            }
        }
    }

    fn apply_edit_cast(&mut self, movie_id: i64, result: Result<Vec<Actor>, ApiError>) -> bool {
        let cast = match result {
            Ok(cast) => cast,
            Err(e) => {
                warn!(movie_id, "Cast request for edit form failed: {}", e);
                notify_failure(&mut self.notifier, &e);
                return false;
            }
        };
        if self.router.screen() != Screen::MoviesList {
            debug!(movie_id, "Not opening edit form, the movies list is no longer shown");
            return true;
        }
        let Some(movie) = self.movies.get(movie_id) else {
            debug!(movie_id, "Movie left the list before its edit form opened");
            return false;
        };
        let mut movie = movie.clone();
        movie.actor_ids = cast.iter().map(|a| a.id).collect();
        let kind = FormKind::Movie(FormState::edit(&movie));
        if let Err(e) = self.enter_form(Some(movie_id), kind) {
            warn!("Could not open edit form: {}", e);
            return false;
        }
        true
    }

    // Only the form that issued a request is settled, and only if it is still open.
    fn settle(&mut self, origin: Option<u64>, success: bool) {
        let Some(token) = origin else {
            return;
        };
        let Some(open) = self.form.as_mut().filter(|f| f.token == token) else {
            debug!(token, "Form closed before its request completed");
            return;
        };
        match &mut open.kind {
            FormKind::Movie(state) => state.settle(success),
            FormKind::Actor(state) => state.settle(success),
        }
        if success {
            self.form = None;
            if let Err(e) = self.router.close_form() {
                warn!("Could not leave form after submit: {}", e);
            }
        }
    }

    fn enter_form(&mut self, editing: Option<i64>, kind: FormKind) -> Result<Screen, SessionError> {
        let from = self.router.screen();
        let screen = self.router.open_form(editing)?;
        self.install_form(kind);
        self.leave_list(from);
        Ok(screen)
    }

    fn install_form(&mut self, kind: FormKind) {
        self.next_form_token += 1;
        self.form = Some(OpenForm {
            token: self.next_form_token,
            kind,
        });
    }

    fn leave_list(&mut self, from: Screen) {
        match from {
            Screen::MoviesList => self.movies.clear_selection(),
            Screen::ActorsList => self.actors.clear_selection(),
            _ => {}
        }
    }

    fn spawn<E: Routed>(&self, origin: Option<u64>, op: Operation<E>) -> Pending {
        let sync = self.sync.clone();
        let handle = tokio::spawn(async move {
            let response = sync.execute(op).await;
            E::completion(origin, response)
        });
        Pending { handle }
    }
}
