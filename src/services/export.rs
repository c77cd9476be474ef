//! JSON and CSV export of the filtered catalog

use std::fs;
use std::path::{Path, PathBuf};

use crate::{error::AppResult, models::Book};

pub const JSON_FILE: &str = "livros.json";
pub const CSV_FILE: &str = "livros.csv";

const CSV_HEADER: [&str; 6] = ["titulo", "autor", "ano", "genero", "isbn", "status"];

/// Pretty-printed JSON array of full records
pub fn to_json(books: &[Book]) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(books)?)
}

/// CSV with header `titulo,autor,ano,genero,isbn,status`
pub fn to_csv(books: &[Book]) -> AppResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for book in books {
        let year = book.year.to_string();
        writer.write_record([
            book.title.as_str(),
            book.author.as_str(),
            year.as_str(),
            book.genre_str(),
            book.isbn_str(),
            book.status.as_code(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Paths of the two documents written by [`write_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Write `livros.json` and `livros.csv` into `dir`
pub fn write_all(dir: &Path, books: &[Book]) -> AppResult<ExportedFiles> {
    fs::create_dir_all(dir)?;
    let files = ExportedFiles {
        json: dir.join(JSON_FILE),
        csv: dir.join(CSV_FILE),
    };
    fs::write(&files.json, to_json(books)?)?;
    fs::write(&files.csv, to_csv(books)?)?;
    tracing::info!(
        "Exported {} books to {} and {}",
        books.len(),
        files.json.display(),
        files.csv.display()
    );
    Ok(files)
}
