use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::app::{Session, SessionError};
use crate::form::{Draft, FieldErrors, FormMode, FormState};
use crate::notify::Level;
use crate::router::{ListKind, Screen};
use crate::validate::FieldName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Movies,
    Actors,
    Add,
    Edit(i64),
    Set(FieldName, String),
    Cast(i64),
    Submit,
    Cancel,
    Show(i64),
    Back,
    Select(i64),
    Delete(i64),
    DeleteSelected,
    Search(String),
    Dismiss(u64),
    Reload,
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a valid id")]
    BadId(String),
    #[error("unknown field '{0}'")]
    BadField(String),
}

const HELP: &str = "\
movies | actors          switch list
add | edit <id>          open a form
set <field> <value>      change a form field
cast <actor_id>          toggle an actor in the movie form
submit | cancel          finish the form
show <id> | back         movie details
select <id>              toggle batch selection
delete <id>              delete one record
delete-selected          delete the selection
search [term]            filter lists (empty clears)
dismiss <n>              dismiss a notification
reload | help | quit";

pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "movies" => Command::Movies,
        "actors" => Command::Actors,
        "add" => Command::Add,
        "edit" => Command::Edit(parse_id(rest, "edit")?),
        "set" => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((f, v)) => (f, v.trim_start()),
                None if !rest.is_empty() => (rest, ""),
                None => return Err(CommandError::MissingArgument("set")),
            };
            let field =
                FieldName::parse(field).ok_or_else(|| CommandError::BadField(field.to_string()))?;
            Command::Set(field, value.to_string())
        }
        "cast" => Command::Cast(parse_id(rest, "cast")?),
        "submit" => Command::Submit,
        "cancel" => Command::Cancel,
        "show" => Command::Show(parse_id(rest, "show")?),
        "back" => Command::Back,
        "select" => Command::Select(parse_id(rest, "select")?),
        "delete" => Command::Delete(parse_id(rest, "delete")?),
        "delete-selected" => Command::DeleteSelected,
        "search" => Command::Search(rest.to_string()),
        "dismiss" => {
            let n = parse_id(rest, "dismiss")?;
            Command::Dismiss(u64::try_from(n).map_err(|_| CommandError::BadId(rest.to_string()))?)
        }
        "reload" => Command::Reload,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_id(input: &str, command: &'static str) -> Result<i64, CommandError> {
    if input.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    input
        .parse()
        .map_err(|_| CommandError::BadId(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Say(String),
    Quit,
}

pub async fn execute(session: &mut Session, command: Command) -> Result<Outcome> {
    let request = match command {
        Command::Quit => return Ok(Outcome::Quit),
        Command::Help => return Ok(Outcome::Say(HELP.to_string())),
        Command::Movies => return Ok(outcome(session.switch_list(ListKind::Movies))),
        Command::Actors => return Ok(outcome(session.switch_list(ListKind::Actors))),
        Command::Add => return Ok(outcome(session.open_add_form())),
        Command::Cast(id) => return Ok(outcome(session.toggle_actor(id))),
        Command::Cancel => return Ok(outcome(session.cancel_form())),
        Command::Back => return Ok(outcome(session.back())),
        Command::Set(field, value) => {
            return Ok(match session.change_field(field, value) {
                Ok(true) => Outcome::Continue,
                Ok(false) => Outcome::Say(format!("This form has no '{field}' field")),
                Err(e) => Outcome::Say(e.to_string()),
            })
        }
        Command::Select(id) => {
            return Ok(if session.toggle_selection(id) {
                Outcome::Continue
            } else {
                Outcome::Say(format!("Nothing to select with id {id} here"))
            })
        }
        Command::Search(term) => {
            session.set_search(term);
            return Ok(Outcome::Continue);
        }
        Command::Dismiss(n) => {
            return Ok(if session.notifier_mut().dismiss(n) {
                Outcome::Continue
            } else {
                Outcome::Say(format!("No notification #{n}"))
            })
        }
        Command::Reload => {
            let movies = session.load_movies();
            let actors = session.load_actors();
            session.run(movies).await?;
            session.run(actors).await?;
            return Ok(Outcome::Continue);
        }
        Command::Edit(id) => match session.open_edit_form(id) {
            Ok(Some(pending)) => Ok(pending),
            Ok(None) => return Ok(Outcome::Continue),
            Err(e) => Err(e),
        },
        Command::Submit => session.submit_form(),
        Command::Show(id) => session.show_details(id),
        Command::Delete(id) => session.delete(id),
        Command::DeleteSelected => session.delete_selected(),
    };
    match request {
        Ok(pending) => {
            session.run(pending).await?;
            Ok(Outcome::Continue)
        }
        // Already on screen as a notification.
        Err(SessionError::Rejected(_) | SessionError::NothingSelected) => Ok(Outcome::Continue),
        Err(e) => Ok(Outcome::Say(e.to_string())),
    }
}

fn outcome<T, E: std::fmt::Display>(result: Result<T, E>) -> Outcome {
    match result {
        Ok(_) => Outcome::Continue,
        Err(e) => Outcome::Say(e.to_string()),
    }
}

pub fn render(session: &mut Session) -> String {
    session.notifier_mut().expire(Instant::now());
    let mut out = String::new();
    match session.screen() {
        Screen::MoviesList => {
            let _ = writeln!(out, "== Movies ==");
            let movies = session.visible_movies();
            if movies.is_empty() {
                let _ = writeln!(out, "No movies yet. Maybe add something?");
            }
            for m in movies {
                let mark = if session.movies().is_selected(m.id) { "x" } else { " " };
                let _ = writeln!(
                    out,
                    "[{mark}] #{} {} ({}) directed by {}",
                    m.id, m.title, m.year, m.director
                );
            }
        }
        Screen::ActorsList => {
            let _ = writeln!(out, "== Actors ==");
            for a in session.visible_actors() {
                let mark = if session.actors().is_selected(a.id) { "x" } else { " " };
                let _ = writeln!(out, "[{mark}] #{} {} {}", a.id, a.name, a.surname);
            }
        }
        Screen::MovieDetails { movie_id } => match session.details() {
            Some(d) => {
                let _ = writeln!(out, "== {} ({}) ==", d.movie.title, d.movie.year);
                let _ = writeln!(out, "Director: {}", d.movie.director);
                let _ = writeln!(out, "{}", d.movie.description.as_deref().unwrap_or(""));
                if d.cast.is_empty() {
                    let _ = writeln!(out, "No actors assigned to this movie yet.");
                }
                for a in &d.cast {
                    let _ = writeln!(out, "  - {} {}", a.name, a.surname);
                }
            }
            None => {
                let _ = writeln!(out, "Movie #{movie_id} could not be loaded.");
            }
        },
        Screen::MovieForm { .. } => {
            if let Some(form) = session.movie_form() {
                render_form(&mut out, "movie", form);
                let cast: Vec<String> =
                    form.draft().actor_ids.iter().map(|id| id.to_string()).collect();
                let _ = writeln!(out, "  cast: [{}]", cast.join(", "));
            }
        }
        Screen::ActorForm { .. } => {
            if let Some(form) = session.actor_form() {
                render_form(&mut out, "actor", form);
            }
        }
    }
    for n in session.notifier().active() {
        let tag = match n.level {
            Level::Success => "ok",
            Level::Warning => "warn",
            Level::Error => "error",
        };
        let _ = writeln!(out, "({}) [{tag}] {}", n.id, n.message);
    }
    out
}

fn render_form<D: Draft>(out: &mut String, label: &str, form: &FormState<D>) {
    let title = match form.mode() {
        FormMode::Create => format!("Add {label}"),
        FormMode::Edit(id) => format!("Edit {label} #{id}"),
    };
    let _ = writeln!(out, "== {title} ==");
    for field in D::FIELDS {
        let star = if D::REQUIRED.contains(field) { "*" } else { "" };
        let value = form.draft().get(*field).unwrap_or_default();
        let _ = writeln!(out, "  {field}{star}: {value}{}", error_suffix(form.errors(), *field));
    }
    if form.is_pending() {
        let _ = writeln!(out, "  (saving...)");
    }
}

fn error_suffix(errors: &FieldErrors, field: FieldName) -> String {
    errors
        .get(field)
        .map(|e| format!("  <- {e}"))
        .unwrap_or_default()
}

pub async fn run(mut session: Session) -> Result<()> {
    let movies = session.load_movies();
    let actors = session.load_actors();
    session.run(movies).await?;
    session.run(actors).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let screen = render(&mut session);
        stdout.write_all(screen.as_bytes()).await?;
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received (Ctrl+C)");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(command)) => match execute(&mut session, command).await? {
                Outcome::Continue => {}
                Outcome::Say(text) => println!("{text}"),
                Outcome::Quit => break,
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Rejected command: {}", e);
                println!("{e}");
            }
        }
    }
    info!("Session ended");
    Ok(())
}
