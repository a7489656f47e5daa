use chrono::{Datelike, Local};
use std::fmt;

pub const FIRST_FILM_YEAR: i32 = 1895;
const MIN_TEXT_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    Title,
    Year,
    Director,
    Description,
    Name,
    Surname,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Title => "title",
            FieldName::Year => "year",
            FieldName::Director => "director",
            FieldName::Description => "description",
            FieldName::Name => "name",
            FieldName::Surname => "surname",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "title" => Some(FieldName::Title),
            "year" => Some(FieldName::Year),
            "director" => Some(FieldName::Director),
            "description" => Some(FieldName::Description),
            "name" => Some(FieldName::Name),
            "surname" => Some(FieldName::Surname),
            _ => None,
        }
    }

    pub fn required_message(&self) -> &'static str {
        match self {
            FieldName::Title => "Title is required!",
            FieldName::Year => "Year is required!",
            FieldName::Director => "Director is required!",
            FieldName::Description => "Description is required!",
            FieldName::Name => "Name is required!",
            FieldName::Surname => "Surname is required!",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub current_year: i32,
}

impl ValidationContext {
    pub fn now() -> Self {
        Self {
            current_year: Local::now().year(),
        }
    }

    pub fn with_year(current_year: i32) -> Self {
        Self { current_year }
    }
}

pub fn validate(field: FieldName, raw: &str, ctx: &ValidationContext) -> ValidationResult {
    match field {
        FieldName::Title => validate_title(raw),
        FieldName::Year => validate_year(raw, ctx.current_year),
        FieldName::Director => validate_director(raw),
        FieldName::Name | FieldName::Surname => {
            if raw.trim().is_empty() {
                ValidationResult::Invalid(field.required_message().to_string())
            } else {
                ValidationResult::Valid
            }
        }
        FieldName::Description => ValidationResult::Valid,
    }
}

fn validate_title(raw: &str) -> ValidationResult {
    if raw.trim().is_empty() {
        return ValidationResult::Invalid("Title is required!".to_string());
    }
    if raw.chars().count() < MIN_TEXT_LEN {
        return ValidationResult::Invalid("Title too short (min. 3 characters)!".to_string());
    }
    ValidationResult::Valid
}

fn validate_director(raw: &str) -> ValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ValidationResult::Invalid("Director is required!".to_string());
    }
    if trimmed.chars().count() < MIN_TEXT_LEN {
        return ValidationResult::Invalid(
            "Director's name too short (min. 3 characters)!".to_string(),
        );
    }
    ValidationResult::Valid
}

fn validate_year(raw: &str, current_year: i32) -> ValidationResult {
    if raw.is_empty() {
        return ValidationResult::Invalid("Year is required!".to_string());
    }
    match parse_year(raw) {
        Some(year) if (FIRST_FILM_YEAR..=current_year).contains(&year) => ValidationResult::Valid,
        _ => ValidationResult::Invalid(format!(
            "Year must be between {FIRST_FILM_YEAR} and {current_year}"
        )),
    }
}

// Unparseable input is reported as out of range.
pub fn parse_year(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext::with_year(2026)
    }

    fn message(result: ValidationResult) -> String {
        match result {
            ValidationResult::Invalid(msg) => msg,
            ValidationResult::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn title_rules() {
        assert_eq!(message(validate(FieldName::Title, "   ", &ctx())), "Title is required!");
        assert_eq!(
            message(validate(FieldName::Title, "Up", &ctx())),
            "Title too short (min. 3 characters)!"
        );
        assert!(validate(FieldName::Title, "Her", &ctx()).is_valid());
        assert!(validate(FieldName::Title, "Amélie", &ctx()).is_valid());
    }

    #[test]
    fn year_bounds_are_inclusive() {
        assert!(validate(FieldName::Year, "1895", &ctx()).is_valid());
        assert!(validate(FieldName::Year, "2026", &ctx()).is_valid());
        let expected = "Year must be between 1895 and 2026";
        assert_eq!(message(validate(FieldName::Year, "1894", &ctx())), expected);
        assert_eq!(message(validate(FieldName::Year, "2027", &ctx())), expected);
        assert_eq!(message(validate(FieldName::Year, "abc", &ctx())), expected);
        assert_eq!(message(validate(FieldName::Year, "", &ctx())), "Year is required!");
    }

    #[test]
    fn year_message_follows_context() {
        let result = validate(FieldName::Year, "2031", &ValidationContext::with_year(2030));
        assert_eq!(message(result), "Year must be between 1895 and 2030");
    }

    #[test]
    fn director_length_uses_trimmed_value() {
        assert_eq!(
            message(validate(FieldName::Director, "  Al  ", &ctx())),
            "Director's name too short (min. 3 characters)!"
        );
        assert_eq!(message(validate(FieldName::Director, "", &ctx())), "Director is required!");
        assert!(validate(FieldName::Director, " Lee Ang ", &ctx()).is_valid());
    }

    #[test]
    fn actor_fields_and_description() {
        assert_eq!(message(validate(FieldName::Name, " ", &ctx())), "Name is required!");
        assert_eq!(message(validate(FieldName::Surname, "", &ctx())), "Surname is required!");
        assert!(validate(FieldName::Name, "Jo", &ctx()).is_valid());
        assert!(validate(FieldName::Description, "", &ctx()).is_valid());
    }

    #[test]
    fn short_titles_are_always_invalid() {
        for title in ["a", "ab", "Zo", "  "] {
            assert!(!validate(FieldName::Title, title, &ctx()).is_valid(), "{title:?}");
        }
        for title in ["abc", "Jaws", "The Thing"] {
            assert!(validate(FieldName::Title, title, &ctx()).is_valid(), "{title:?}");
        }
    }
}
