use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

use crate::models::{Actor, ActorPayload, Entity, Movie, MoviePayload};
use crate::sync::Operation;
use crate::validate::{parse_year, validate, FieldName, ValidationContext, ValidationResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormRejection {
    #[error("A submission is already in progress")]
    Pending,
    #[error("Please fix the errors before submitting!")]
    HasErrors,
    #[error("All required fields must be filled!")]
    MissingRequired(Vec<FieldName>),
}

// Only fields with a current error have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: BTreeMap<FieldName, String>,
}

impl FieldErrors {
    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn apply(&mut self, field: FieldName, result: ValidationResult) {
        match result {
            ValidationResult::Valid => {
                self.entries.remove(&field);
            }
            ValidationResult::Invalid(message) => {
                self.entries.insert(field, message);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

pub trait Draft: Default + Clone {
    type Entity: Entity;

    const FIELDS: &'static [FieldName];
    const REQUIRED: &'static [FieldName];

    fn from_entity(entity: &Self::Entity) -> Self;
    fn get(&self, field: FieldName) -> Option<&str>;
    fn set(&mut self, field: FieldName, value: String) -> bool;
    fn to_payload(&self) -> Result<<Self::Entity as Entity>::Payload, FieldName>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieDraft {
    pub title: String,
    pub year: String,
    pub director: String,
    pub description: String,
    pub actor_ids: BTreeSet<i64>,
}

impl Draft for MovieDraft {
    type Entity = Movie;

    const FIELDS: &'static [FieldName] = &[
        FieldName::Title,
        FieldName::Year,
        FieldName::Director,
        FieldName::Description,
    ];
    const REQUIRED: &'static [FieldName] = &[FieldName::Title, FieldName::Year, FieldName::Director];

    fn from_entity(movie: &Movie) -> Self {
        MovieDraft {
            title: movie.title.clone(),
            year: movie.year.to_string(),
            director: movie.director.clone(),
            description: movie.description.clone().unwrap_or_default(),
            actor_ids: movie.actor_ids.clone(),
        }
    }

    fn get(&self, field: FieldName) -> Option<&str> {
        match field {
            FieldName::Title => Some(&self.title),
            FieldName::Year => Some(&self.year),
            FieldName::Director => Some(&self.director),
            FieldName::Description => Some(&self.description),
            FieldName::Name | FieldName::Surname => None,
        }
    }

    fn set(&mut self, field: FieldName, value: String) -> bool {
        let slot = match field {
            FieldName::Title => &mut self.title,
            FieldName::Year => &mut self.year,
            FieldName::Director => &mut self.director,
            FieldName::Description => &mut self.description,
            FieldName::Name | FieldName::Surname => return false,
        };
        *slot = value;
        true
    }

    fn to_payload(&self) -> Result<MoviePayload, FieldName> {
        let year = parse_year(&self.year).ok_or(FieldName::Year)?;
        let description = if self.description.trim().is_empty() {
            None
        } else {
            Some(self.description.clone())
        };
        Ok(MoviePayload {
            title: self.title.clone(),
            year,
            director: self.director.clone(),
            description,
            actor_ids: self.actor_ids.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorDraft {
    pub name: String,
    pub surname: String,
}

impl Draft for ActorDraft {
    type Entity = Actor;

    const FIELDS: &'static [FieldName] = &[FieldName::Name, FieldName::Surname];
    const REQUIRED: &'static [FieldName] = &[FieldName::Name, FieldName::Surname];

    fn from_entity(actor: &Actor) -> Self {
        ActorDraft {
            name: actor.name.clone(),
            surname: actor.surname.clone(),
        }
    }

    fn get(&self, field: FieldName) -> Option<&str> {
        match field {
            FieldName::Name => Some(&self.name),
            FieldName::Surname => Some(&self.surname),
            _ => None,
        }
    }

    fn set(&mut self, field: FieldName, value: String) -> bool {
        match field {
            FieldName::Name => self.name = value,
            FieldName::Surname => self.surname = value,
            _ => return false,
        }
        true
    }

    fn to_payload(&self) -> Result<ActorPayload, FieldName> {
        Ok(ActorPayload {
            name: self.name.clone(),
            surname: self.surname.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

#[derive(Debug, Clone)]
pub struct FormState<D: Draft> {
    draft: D,
    errors: FieldErrors,
    mode: FormMode,
    pending: bool,
}

impl<D: Draft> FormState<D> {
    pub fn create() -> Self {
        Self {
            draft: D::default(),
            errors: FieldErrors::default(),
            mode: FormMode::Create,
            pending: false,
        }
    }

    pub fn edit(entity: &D::Entity) -> Self {
        Self {
            draft: D::from_entity(entity),
            errors: FieldErrors::default(),
            mode: FormMode::Edit(entity.id()),
            pending: false,
        }
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn on_field_change(
        &mut self,
        field: FieldName,
        value: impl Into<String>,
        ctx: &ValidationContext,
    ) -> bool {
        let value = value.into();
        let result = validate(field, &value, ctx);
        if !self.draft.set(field, value) {
            debug!(field = %field, "Ignoring change for field outside this form");
            return false;
        }
        self.errors.apply(field, result);
        true
    }

    /// Runs the submit gate. On success the form is marked pending until [`settle`](Self::settle).
    pub fn submit(
        &mut self,
        ctx: &ValidationContext,
    ) -> Result<Operation<D::Entity>, FormRejection> {
        if self.pending {
            return Err(FormRejection::Pending);
        }
        if !self.errors.is_empty() {
            return Err(FormRejection::HasErrors);
        }

        let missing: Vec<FieldName> = D::REQUIRED
            .iter()
            .copied()
            .filter(|f| self.draft.get(*f).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            self.errors.clear();
            for field in &missing {
                self.errors.apply(
                    *field,
                    ValidationResult::Invalid(field.required_message().to_string()),
                );
            }
            return Err(FormRejection::MissingRequired(missing));
        }

        let payload = match self.draft.to_payload() {
            Ok(p) => p,
            Err(field) => {
                let raw = self.draft.get(field).unwrap_or_default().to_string();
                let result = match validate(field, &raw, ctx) {
                    ValidationResult::Valid => {
                        ValidationResult::Invalid(format!("Invalid value for {field}"))
                    }
                    invalid => invalid,
                };
                self.errors.apply(field, result);
                return Err(FormRejection::HasErrors);
            }
        };

        self.pending = true;
        Ok(match self.mode {
            FormMode::Create => Operation::Create(payload),
            FormMode::Edit(id) => Operation::Update(id, payload),
        })
    }

    pub fn settle(&mut self, success: bool) {
        self.pending = false;
        if success {
            self.draft = D::default();
            self.errors.clear();
        }
    }
}

impl FormState<MovieDraft> {
    pub fn toggle_actor(&mut self, actor_id: i64) {
        if !self.draft.actor_ids.remove(&actor_id) {
            self.draft.actor_ids.insert(actor_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext::with_year(2026)
    }

    fn movie() -> Movie {
        Movie {
            id: 5,
            title: "Alien".to_string(),
            year: 1979,
            director: "Ridley Scott".to_string(),
            description: Some("In space".to_string()),
            actor_ids: BTreeSet::from([1, 2]),
        }
    }

    #[test]
    fn change_updates_only_that_field_error() {
        let mut form = FormState::<MovieDraft>::create();
        form.on_field_change(FieldName::Title, "ab", &ctx());
        form.on_field_change(FieldName::Year, "1700", &ctx());
        assert_eq!(form.errors().len(), 2);

        form.on_field_change(FieldName::Title, "abc", &ctx());
        assert_eq!(form.errors().get(FieldName::Title), None);
        assert_eq!(
            form.errors().get(FieldName::Year),
            Some("Year must be between 1895 and 2026")
        );
    }

    #[test]
    fn submit_with_errors_is_rejected_without_operation() {
        let mut form = FormState::<MovieDraft>::create();
        form.on_field_change(FieldName::Title, "Jaws", &ctx());
        form.on_field_change(FieldName::Year, "1975", &ctx());
        form.on_field_change(FieldName::Director, "Sp", &ctx());
        assert_eq!(form.submit(&ctx()), Err(FormRejection::HasErrors));
        assert!(!form.is_pending());
    }

    #[test]
    fn untouched_required_fields_are_flagged() {
        let mut form = FormState::<MovieDraft>::create();
        form.on_field_change(FieldName::Title, "Jaws", &ctx());
        let err = form.submit(&ctx()).unwrap_err();
        assert_eq!(
            err,
            FormRejection::MissingRequired(vec![FieldName::Year, FieldName::Director])
        );
        assert_eq!(err.to_string(), "All required fields must be filled!");
        assert_eq!(form.errors().get(FieldName::Year), Some("Year is required!"));
        assert_eq!(form.errors().get(FieldName::Director), Some("Director is required!"));
        assert_eq!(form.errors().get(FieldName::Title), None);
    }

    #[test]
    fn create_submit_builds_payload_and_blocks_double_submit() {
        let mut form = FormState::<MovieDraft>::create();
        form.on_field_change(FieldName::Title, "Jaws", &ctx());
        form.on_field_change(FieldName::Year, "1975", &ctx());
        form.on_field_change(FieldName::Director, "Steven Spielberg", &ctx());
        form.toggle_actor(4);

        match form.submit(&ctx()) {
            Ok(Operation::Create(payload)) => {
                assert_eq!(payload.year, 1975);
                assert_eq!(payload.description, None);
                assert_eq!(payload.actor_ids, BTreeSet::from([4]));
            }
            other => panic!("unexpected submit result: {other:?}"),
        }
        assert_eq!(form.submit(&ctx()), Err(FormRejection::Pending));

        form.settle(true);
        assert_eq!(form.draft(), &MovieDraft::default());
        assert!(!form.is_pending());
    }

    #[test]
    fn edit_mode_prepopulates_and_updates_same_id() {
        let mut form = FormState::<MovieDraft>::edit(&movie());
        assert_eq!(form.draft().year, "1979");
        assert_eq!(form.draft().actor_ids, BTreeSet::from([1, 2]));
        form.toggle_actor(2);

        match form.submit(&ctx()) {
            Ok(Operation::Update(id, payload)) => {
                assert_eq!(id, 5);
                assert_eq!(payload.actor_ids, BTreeSet::from([1]));
                assert_eq!(payload.description.as_deref(), Some("In space"));
            }
            other => panic!("unexpected submit result: {other:?}"),
        }
    }

    #[test]
    fn unconvertible_year_reports_with_callers_year_bound() {
        let mut form = FormState::<MovieDraft>::edit(&movie());
        form.draft.year = "19x9".to_string();
        let pinned = ValidationContext::with_year(2031);
        assert_eq!(form.submit(&pinned), Err(FormRejection::HasErrors));
        assert_eq!(
            form.errors().get(FieldName::Year),
            Some("Year must be between 1895 and 2031")
        );
        assert!(!form.is_pending());
    }

    #[test]
    fn failed_submission_keeps_draft() {
        let mut form = FormState::<ActorDraft>::create();
        form.on_field_change(FieldName::Name, "Will", &ctx());
        form.on_field_change(FieldName::Surname, "Smith", &ctx());
        assert!(form.submit(&ctx()).is_ok());
        form.settle(false);
        assert_eq!(form.draft().surname, "Smith");
        assert!(form.submit(&ctx()).is_ok());
    }

    #[test]
    fn actor_form_ignores_movie_fields() {
        let mut form = FormState::<ActorDraft>::create();
        assert!(!form.on_field_change(FieldName::Title, "x", &ctx()));
        assert!(form.errors().is_empty());
        form.on_field_change(FieldName::Surname, " ", &ctx());
        assert_eq!(form.errors().get(FieldName::Surname), Some("Surname is required!"));
    }
}
