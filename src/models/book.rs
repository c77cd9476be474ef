//! Book record model and the input it is edited through.
//!
//! The JSON shape follows the lending backend: Portuguese keys (`titulo`,
//! `autor`, `ano`, ...), integer identifiers, and status codes `disponivel` /
//! `emprestado`.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Oldest publication year accepted by the catalog
pub const MIN_YEAR: i32 = 1900;

/// Current calendar year, upper bound for publication years
pub fn current_year() -> i32 {
    Local::now().year()
}

/// Book identifier. The backend emits integers; the fallback backend
/// produces time-derived strings. Both are held as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BookId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for BookId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => BookId::from(n),
            RawId::Text(s) => BookId(s),
        })
    }
}

/// Loan status of a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    #[default]
    #[serde(rename = "disponivel", alias = "available")]
    Available,
    #[serde(rename = "emprestado", alias = "on_loan")]
    OnLoan,
}

impl LoanStatus {
    /// Wire code, also used in the CSV export
    pub fn as_code(&self) -> &'static str {
        match self {
            LoanStatus::Available => "disponivel",
            LoanStatus::OnLoan => "emprestado",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Available => "available",
            LoanStatus::OnLoan => "on loan",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disponivel" | "available" => Ok(LoanStatus::Available),
            "emprestado" | "on_loan" | "on-loan" => Ok(LoanStatus::OnLoan),
            other => Err(AppError::Validation(format!("Unknown status: {}", other))),
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "autor")]
    pub author: String,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "genero", default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(rename = "data_emprestimo", default, with = "loan_date")]
    pub loan_date: Option<DateTime<Utc>>,
}

impl Book {
    /// Build a record from a request payload, as a backend would
    pub fn from_payload(id: BookId, payload: BookPayload) -> Self {
        Self {
            id,
            title: payload.title,
            author: payload.author,
            year: payload.year,
            genre: payload.genre,
            isbn: payload.isbn,
            status: payload.status,
            loan_date: payload.loan_date,
        }
    }

    pub fn is_on_loan(&self) -> bool {
        self.status == LoanStatus::OnLoan
    }

    /// Mark as on loan since `at`
    pub fn lend(&mut self, at: DateTime<Utc>) {
        self.status = LoanStatus::OnLoan;
        self.loan_date = Some(at);
    }

    /// Mark as returned
    pub fn give_back(&mut self) {
        self.status = LoanStatus::Available;
        self.loan_date = None;
    }

    pub fn genre_str(&self) -> &str {
        self.genre.as_deref().unwrap_or("")
    }

    pub fn isbn_str(&self) -> &str {
        self.isbn.as_deref().unwrap_or("")
    }
}

/// Create/update request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookPayload {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "autor")]
    pub author: String,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "genero")]
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub status: LoanStatus,
    #[serde(rename = "data_emprestimo", with = "loan_date")]
    pub loan_date: Option<DateTime<Utc>>,
}

/// Form input for creating or editing a book
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BookInput {
    #[validate(length(min = 3, max = 90, message = "Title must be between 3 and 90 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 90, message = "Author must be between 1 and 90 characters"))]
    pub author: String,
    pub year: i32,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub status: LoanStatus,
}

impl BookInput {
    /// Prefill from an existing record (edit form)
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            genre: book.genre.clone(),
            isbn: book.isbn.clone(),
            status: book.status,
        }
    }

    /// Trim text fields; empty optional fields become absent
    pub fn normalized(self) -> Self {
        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            year: self.year,
            genre: non_empty(self.genre),
            isbn: non_empty(self.isbn),
            status: self.status,
        }
    }

    /// Field rules; the year must lie in `MIN_YEAR..=current_year`
    pub fn check(&self, current_year: i32) -> AppResult<()> {
        self.validate()?;
        if !(MIN_YEAR..=current_year).contains(&self.year) {
            return Err(AppError::Validation("Invalid year".to_string()));
        }
        Ok(())
    }

    /// Request body, with the loan date following the status
    pub fn into_payload(self, previous: Option<&Book>, now: DateTime<Utc>) -> BookPayload {
        let loan_date = match self.status {
            LoanStatus::Available => None,
            LoanStatus::OnLoan => previous
                .filter(|b| b.is_on_loan())
                .and_then(|b| b.loan_date)
                .or(Some(now)),
        };
        BookPayload {
            title: self.title,
            author: self.author,
            year: self.year,
            genre: self.genre,
            isbn: self.isbn,
            status: self.status,
            loan_date,
        }
    }
}

/// Loan dates travel as RFC 3339; the backend also emits naive UTC timestamps.
mod loan_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(D::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn input(title: &str, year: i32) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            year,
            genre: None,
            isbn: None,
            status: LoanStatus::Available,
        }
    }

    #[test]
    fn test_decode_backend_record() {
        let book: Book = serde_json::from_value(json!({
            "id": 7,
            "titulo": "Dom Casmurro",
            "autor": "Machado de Assis",
            "ano": 1899,
            "genero": "Romance",
            "isbn": null,
            "status": "emprestado",
            "data_emprestimo": "2024-03-01T10:15:30.123456"
        }))
        .unwrap();

        assert_eq!(book.id.as_str(), "7");
        assert_eq!(book.status, LoanStatus::OnLoan);
        assert_eq!(book.isbn, None);
        assert_eq!(
            book.loan_date.unwrap().date_naive(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_decode_minimal_record() {
        let book: Book = serde_json::from_value(json!({
            "id": "1712345678901",
            "titulo": "Dune",
            "autor": "Frank Herbert",
            "ano": 1965
        }))
        .unwrap();

        assert_eq!(book.status, LoanStatus::Available);
        assert_eq!(book.loan_date, None);
        assert_eq!(book.genre_str(), "");
    }

    #[test]
    fn test_status_aliases() {
        let s: LoanStatus = serde_json::from_value(json!("on_loan")).unwrap();
        assert_eq!(s, LoanStatus::OnLoan);
        assert_eq!("available".parse::<LoanStatus>().unwrap(), LoanStatus::Available);
        assert!("lost".parse::<LoanStatus>().is_err());
        assert_eq!(serde_json::to_value(LoanStatus::OnLoan).unwrap(), json!("emprestado"));
    }

    #[test]
    fn test_title_length_bounds() {
        let year = current_year();
        assert!(input("abc", 2000).check(year).is_ok());
        assert!(input(&"x".repeat(90), 2000).check(year).is_ok());
        assert!(input("ab", 2000).check(year).is_err());
        assert!(input(&"x".repeat(91), 2000).check(year).is_err());
    }

    #[test]
    fn test_title_length_counts_characters() {
        // 90 two-byte characters
        assert!(input(&"é".repeat(90), 2000).check(2024).is_ok());
    }

    #[test]
    fn test_year_bounds() {
        let year = current_year();
        assert!(input("Dune", 1899).check(year).is_err());
        assert!(input("Dune", 1900).check(year).is_ok());
        assert!(input("Dune", year).check(year).is_ok());
        assert!(input("Dune", year + 1).check(year).is_err());
    }

    #[test]
    fn test_normalized_trims_and_drops_empty() {
        let raw = BookInput {
            title: "  Dune ".to_string(),
            author: " Frank Herbert".to_string(),
            year: 1965,
            genre: Some("  ".to_string()),
            isbn: Some(" 978 ".to_string()),
            status: LoanStatus::Available,
        };
        let n = raw.normalized();
        assert_eq!(n.title, "Dune");
        assert_eq!(n.author, "Frank Herbert");
        assert_eq!(n.genre, None);
        assert_eq!(n.isbn.as_deref(), Some("978"));
    }

    #[test]
    fn test_payload_loan_date_follows_status() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();

        let mut lent = input("Dune", 1965);
        lent.status = LoanStatus::OnLoan;
        assert_eq!(lent.clone().into_payload(None, now).loan_date, Some(now));

        let mut previous = Book::from_payload(BookId::from("1"), input("Dune", 1965).into_payload(None, now));
        previous.lend(earlier);
        assert_eq!(lent.into_payload(Some(&previous), now).loan_date, Some(earlier));

        let returned = input("Dune", 1965).into_payload(Some(&previous), now);
        assert_eq!(returned.loan_date, None);
    }

    #[test]
    fn test_payload_wire_keys() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let value = serde_json::to_value(input("Dune", 1965).into_payload(None, now)).unwrap();
        assert_eq!(value["titulo"], "Dune");
        assert_eq!(value["ano"], 1965);
        assert_eq!(value["status"], "disponivel");
        assert!(value["data_emprestimo"].is_null());
        assert!(value.get("id").is_none());
    }
}
