use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Movies,
    Actors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    MoviesList,
    MovieForm { editing: Option<i64> },
    MovieDetails { movie_id: i64 },
    ActorsList,
    ActorForm { editing: Option<i64> },
}

impl Screen {
    pub fn list_kind(&self) -> ListKind {
        match self {
            Screen::MoviesList | Screen::MovieForm { .. } | Screen::MovieDetails { .. } => {
                ListKind::Movies
            }
            Screen::ActorsList | Screen::ActorForm { .. } => ListKind::Actors,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Screen::MoviesList | Screen::ActorsList)
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Screen::MovieForm { .. } | Screen::ActorForm { .. })
    }

    fn list(kind: ListKind) -> Self {
        match kind {
            ListKind::Movies => Screen::MoviesList,
            ListKind::Actors => Screen::ActorsList,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("cannot {action} from {from:?}")]
    InvalidTransition { from: Screen, action: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRouter {
    screen: Screen,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self {
            screen: Screen::MoviesList,
        }
    }
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    // list -> form
    pub fn open_form(&mut self, editing: Option<i64>) -> Result<Screen, RouterError> {
        let next = match self.screen {
            Screen::MoviesList => Screen::MovieForm { editing },
            Screen::ActorsList => Screen::ActorForm { editing },
            from => return Err(invalid(from, "open a form")),
        };
        Ok(self.go(next))
    }

    // form -> list
    pub fn close_form(&mut self) -> Result<Screen, RouterError> {
        if !self.screen.is_form() {
            return Err(invalid(self.screen, "close a form"));
        }
        Ok(self.go(Screen::list(self.screen.list_kind())))
    }

    pub fn show_details(&mut self, movie_id: i64) -> Result<Screen, RouterError> {
        match self.screen {
            Screen::MoviesList => Ok(self.go(Screen::MovieDetails { movie_id })),
            from => Err(invalid(from, "show details")),
        }
    }

    // details -> movies list
    pub fn back(&mut self) -> Result<Screen, RouterError> {
        match self.screen {
            Screen::MovieDetails { .. } => Ok(self.go(Screen::MoviesList)),
            from => Err(invalid(from, "go back")),
        }
    }

    pub fn switch_list(&mut self, kind: ListKind) -> Result<Screen, RouterError> {
        if !self.screen.is_list() {
            return Err(invalid(self.screen, "switch lists"));
        }
        Ok(self.go(Screen::list(kind)))
    }

    fn go(&mut self, next: Screen) -> Screen {
        self.screen = next;
        next
    }
}

fn invalid(from: Screen, action: &'static str) -> RouterError {
    RouterError::InvalidTransition { from, action }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_movies_list() {
        assert_eq!(ViewRouter::new().screen(), Screen::MoviesList);
    }

    #[test]
    fn form_round_trip_returns_to_matching_list() {
        let mut router = ViewRouter::new();
        router.switch_list(ListKind::Actors).unwrap();
        assert_eq!(
            router.open_form(Some(4)).unwrap(),
            Screen::ActorForm { editing: Some(4) }
        );
        assert_eq!(router.close_form().unwrap(), Screen::ActorsList);
    }

    #[test]
    fn details_only_from_movies_list() {
        let mut router = ViewRouter::new();
        router.show_details(9).unwrap();
        assert_eq!(router.screen(), Screen::MovieDetails { movie_id: 9 });
        assert!(router.open_form(None).is_err());
        assert_eq!(router.back().unwrap(), Screen::MoviesList);

        router.switch_list(ListKind::Actors).unwrap();
        assert!(router.show_details(1).is_err());
    }

    #[test]
    fn invalid_transition_keeps_state() {
        let mut router = ViewRouter::new();
        router.open_form(None).unwrap();
        let err = router.switch_list(ListKind::Actors).unwrap_err();
        assert_eq!(
            err,
            RouterError::InvalidTransition {
                from: Screen::MovieForm { editing: None },
                action: "switch lists",
            }
        );
        assert!(router.back().is_err());
        assert_eq!(router.screen(), Screen::MovieForm { editing: None });
    }
}
