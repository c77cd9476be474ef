//! API integration tests against an in-process stub of the `/livros` backend

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use livros_catalog::{
    models::{BookId, BookInput, LoanStatus},
    repository::{http::HttpBooksRepository, BooksRepository, LoanAction},
    services::catalog::{CatalogService, Outcome},
    AppError,
};

#[derive(Default)]
struct Backend {
    books: Vec<Value>,
    next_id: i64,
    /// Answer mutations with the record (true) or with `{"ok": true}`
    echo: bool,
}

type Shared = Arc<Mutex<Backend>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn refuse(status: StatusCode, detail: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail })))
}

fn not_found() -> (StatusCode, Json<Value>) {
    refuse(StatusCode::NOT_FOUND, "Livro não encontrado.")
}

fn answer(backend: &Backend, record: Value) -> Json<Value> {
    if backend.echo {
        Json(record)
    } else {
        Json(json!({ "ok": true }))
    }
}

async fn list(State(shared): State<Shared>) -> Json<Value> {
    Json(Value::Array(shared.lock().unwrap().books.clone()))
}

async fn create(State(shared): State<Shared>, Json(mut body): Json<Value>) -> Reply {
    let mut backend = shared.lock().unwrap();
    if backend.books.iter().any(|b| b["titulo"] == body["titulo"]) {
        return Err(refuse(StatusCode::BAD_REQUEST, "Já existe um livro com esse título."));
    }
    backend.next_id += 1;
    body["id"] = json!(backend.next_id);
    backend.books.push(body.clone());
    Ok(answer(&backend, body))
}

async fn update(
    State(shared): State<Shared>,
    Path(id): Path<i64>,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut backend = shared.lock().unwrap();
    let slot = backend
        .books
        .iter_mut()
        .find(|b| b["id"] == json!(id))
        .ok_or_else(not_found)?;
    body["id"] = json!(id);
    *slot = body.clone();
    Ok(answer(&backend, body))
}

async fn remove(State(shared): State<Shared>, Path(id): Path<i64>) -> Reply {
    let mut backend = shared.lock().unwrap();
    let before = backend.books.len();
    backend.books.retain(|b| b["id"] != json!(id));
    if backend.books.len() == before {
        return Err(not_found());
    }
    Ok(Json(json!({ "ok": true })))
}

fn transition(shared: &Shared, id: i64, to: &str, loan_date: Value, refusal: &str) -> Reply {
    let mut backend = shared.lock().unwrap();
    let book = backend
        .books
        .iter_mut()
        .find(|b| b["id"] == json!(id))
        .ok_or_else(not_found)?;
    if book["status"] == json!(to) {
        return Err(refuse(StatusCode::BAD_REQUEST, refusal));
    }
    book["status"] = json!(to);
    book["data_emprestimo"] = loan_date;
    let record = book.clone();
    Ok(answer(&backend, record))
}

async fn lend(State(shared): State<Shared>, Path(id): Path<i64>) -> Reply {
    transition(
        &shared,
        id,
        "emprestado",
        json!("2024-05-01T10:00:00.000000"),
        "Livro já está emprestado.",
    )
}

async fn give_back(State(shared): State<Shared>, Path(id): Path<i64>) -> Reply {
    transition(&shared, id, "disponivel", Value::Null, "Livro já está disponível.")
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serve the stub on an ephemeral port; returns the collection URL
async fn spawn(backend: Backend) -> (String, Shared) {
    let shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/livros", get(list).post(create))
        .route("/livros/:id", put(update).delete(remove))
        .route("/livros/:id/emprestar", post(lend))
        .route("/livros/:id/devolver", post(give_back))
        .route("/broken/livros", get(broken))
        .with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/livros", addr), shared)
}

fn seeded(echo: bool) -> Backend {
    Backend {
        books: vec![json!({
            "id": 1,
            "titulo": "Capitães da Areia",
            "autor": "Jorge Amado",
            "ano": 1937,
            "genero": "Aventura",
            "isbn": "9788520932305",
            "status": "disponivel",
            "data_emprestimo": null
        })],
        next_id: 1,
        echo,
    }
}

fn input(title: &str) -> BookInput {
    BookInput {
        title: title.to_string(),
        author: "Clarice Lispector".to_string(),
        year: 1977,
        genre: Some("Romance".to_string()),
        isbn: None,
        status: LoanStatus::Available,
    }
}

fn service(url: &str) -> CatalogService {
    CatalogService::new(Arc::new(HttpBooksRepository::new(url).unwrap()), None)
}

#[tokio::test]
async fn test_book_lifecycle() {
    let (url, shared) = spawn(seeded(true)).await;
    let catalog = service(&url);

    let mut state = catalog.init().await;
    assert_eq!(state.cache.len(), 1);

    let created = match catalog.create(&mut state, input("A Hora da Estrela")).await.unwrap() {
        Outcome::Applied(book) => book,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(created.id, BookId::from("2"));
    assert_eq!(state.cache.len(), 2);
    assert_eq!(shared.lock().unwrap().books.len(), 2);

    let mut edit = input("A Hora da Estrela");
    edit.year = 1978;
    let outcome = catalog.edit(&mut state, &created.id, edit).await.unwrap();
    assert!(matches!(outcome, Outcome::Applied(ref b) if b.year == 1978));

    catalog.toggle_loan(&mut state, &created.id).await.unwrap();
    let lent = state.cache.get(&created.id).unwrap();
    assert_eq!(lent.status, LoanStatus::OnLoan);
    assert!(lent.loan_date.is_some());

    catalog.toggle_loan(&mut state, &created.id).await.unwrap();
    let back = state.cache.get(&created.id).unwrap();
    assert_eq!(back.status, LoanStatus::Available);
    assert_eq!(back.loan_date, None);

    let outcome = catalog
        .delete(&mut state, &created.id, &|_: &str| true)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied(()));
    assert!(!state.cache.contains(&created.id));
    assert_eq!(shared.lock().unwrap().books.len(), 1);
}

#[tokio::test]
async fn test_backend_refusal_message_reaches_caller() {
    let (url, shared) = spawn(seeded(true)).await;
    let catalog = service(&url);
    let mut state = catalog.init().await;

    // someone else created the same title after our fetch
    shared.lock().unwrap().books.push(json!({
        "id": 50,
        "titulo": "A Hora da Estrela",
        "autor": "Clarice Lispector",
        "ano": 1977,
        "status": "disponivel"
    }));

    let before = state.clone();
    let err = catalog
        .create(&mut state, input("A Hora da Estrela"))
        .await
        .unwrap_err();
    match &err {
        AppError::Api { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "Já existe um livro com esse título.");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_reload_when_backend_does_not_echo() {
    let (url, _shared) = spawn(seeded(false)).await;
    let catalog = service(&url);
    let mut state = catalog.init().await;

    let outcome = catalog.create(&mut state, input("A Hora da Estrela")).await.unwrap();
    assert_eq!(outcome, Outcome::Reloaded);
    assert_eq!(state.cache.len(), 2);
    assert!(state.cache.has_title("a hora da estrela"));
}

#[tokio::test]
async fn test_second_loan_is_refused() {
    let (url, _shared) = spawn(seeded(true)).await;
    let repo = HttpBooksRepository::new(url).unwrap();
    let id = BookId::from("1");

    let lent = repo.set_loan(&id, LoanAction::Lend).await.unwrap().unwrap();
    assert_eq!(lent.status, LoanStatus::OnLoan);

    let err = repo.set_loan(&id, LoanAction::Lend).await.unwrap_err();
    assert_eq!(err.user_message(), "Livro já está emprestado.");
}

#[tokio::test]
async fn test_error_without_body_uses_reason_phrase() {
    let (url, _shared) = spawn(Backend::default()).await;
    let broken = url.replace("/livros", "/broken/livros");
    let repo = HttpBooksRepository::new(broken).unwrap();

    match repo.list().await {
        Err(AppError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_starts_empty() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let catalog = service(&format!("http://{}/livros", addr));
    let state = catalog.init().await;
    assert!(state.cache.is_empty());
}
