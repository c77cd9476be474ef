//! REST client for the `/livros` collection resource

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookId, BookPayload},
};

use super::{BooksRepository, LoanAction};

#[derive(Clone)]
pub struct HttpBooksRepository {
    client: Client,
    books_url: String,
}

impl HttpBooksRepository {
    /// `books_url` is the collection endpoint, e.g. `http://localhost:8000/livros`
    pub fn new(books_url: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("livros-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            books_url: books_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn item_url(&self, id: &BookId) -> String {
        format!("{}/{}", self.books_url, id)
    }
}

#[async_trait]
impl BooksRepository for HttpBooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        tracing::debug!("GET {}", self.books_url);
        let response = check(self.client.get(&self.books_url).send().await?).await?;
        Ok(response.json::<Vec<Book>>().await?)
    }

    async fn create(&self, payload: &BookPayload) -> AppResult<Option<Book>> {
        tracing::debug!("POST {}", self.books_url);
        let response = self.client.post(&self.books_url).json(payload).send().await?;
        echoed_record(check(response).await?).await
    }

    async fn update(&self, id: &BookId, payload: &BookPayload) -> AppResult<Option<Book>> {
        let url = self.item_url(id);
        tracing::debug!("PUT {}", url);
        let response = self.client.put(&url).json(payload).send().await?;
        echoed_record(check(response).await?).await
    }

    async fn delete(&self, id: &BookId) -> AppResult<()> {
        let url = self.item_url(id);
        tracing::debug!("DELETE {}", url);
        check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn set_loan(&self, id: &BookId, action: LoanAction) -> AppResult<Option<Book>> {
        let url = format!("{}/{}", self.item_url(id), action.path_segment());
        tracing::debug!("POST {}", url);
        let response = self.client.post(&url).send().await?;
        echoed_record(check(response).await?).await
    }
}

/// Turn a non-2xx response into an `AppError::Api`
async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    tracing::warn!("Backend answered {}: {}", status, message);

    Err(AppError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Best human-readable message carried by an error body.
///
/// Looks at `detail` (a string, or a list of `{"msg": ...}` entries), then
/// `message`, then `error`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(entries)) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

/// The record echoed in a success body, if there is one
async fn echoed_record(response: Response) -> AppResult<Option<Book>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Book>(&body) {
        Ok(book) => Ok(Some(book)),
        Err(e) => {
            tracing::debug!("Response body is not a book record: {}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_detail_string() {
        let body = r#"{"detail": "Livro já está emprestado."}"#;
        assert_eq!(error_message(body).as_deref(), Some("Livro já está emprestado."));
    }

    #[test]
    fn test_error_message_detail_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "titulo"], "msg": "too short", "type": "value_error"},
            {"loc": ["body", "ano"], "msg": "too old", "type": "value_error"}
        ]}"#;
        assert_eq!(error_message(body).as_deref(), Some("too short; too old"));
    }

    #[test]
    fn test_error_message_fallback_keys() {
        assert_eq!(error_message(r#"{"message": "nope"}"#).as_deref(), Some("nope"));
        assert_eq!(error_message(r#"{"error": "bad"}"#).as_deref(), Some("bad"));
        assert_eq!(error_message(r#"{"detail": "", "error": "bad"}"#).as_deref(), Some("bad"));
    }

    #[test]
    fn test_error_message_absent() {
        assert_eq!(error_message(""), None);
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"ok": false}"#), None);
    }

    #[test]
    fn test_item_url() {
        let repo = HttpBooksRepository::new("http://localhost:8000/livros/").unwrap();
        assert_eq!(repo.item_url(&BookId::from("42")), "http://localhost:8000/livros/42");
    }
}
