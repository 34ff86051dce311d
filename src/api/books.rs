//! Catalog and lending endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    AppState,
};

use super::AuthenticatedUser;

/// List every book in the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books, ordered by ISBN", body = Vec<Book>),
        (status = 503, description = "Catalog store unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books))
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/book/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(&isbn).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/book",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not a librarian"),
        (status = 409, description = "Book already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.create_book(user.uid(), request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book identified by the ISBN in the path
#[utoipa::path(
    patch,
    path = "/book/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 403, description = "Caller is not a librarian"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::error::ErrorResponse),
        (status = 422, description = "Total units below checked-out units", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(isbn): Path<String>,
    Json(patch): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.update_book(user.uid(), &isbn, patch).await?;
    Ok(Json(book))
}

/// Update a book identified by the `isbn` field of the body
#[utoipa::path(
    patch,
    path = "/book",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Missing ISBN", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a librarian"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book_from_body(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(patch): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    let isbn = patch
        .isbn
        .clone()
        .ok_or_else(|| AppError::Validation("isbn is required".to_string()))?;
    let book = state.services.catalog.update_book(user.uid(), &isbn, patch).await?;
    Ok(Json(book))
}

/// Remove a book from the catalog
#[utoipa::path(
    delete,
    path = "/book/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "Caller is not a librarian"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(user.uid(), &isbn).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check out one unit for the caller
#[utoipa::path(
    post,
    path = "/checkout/{isbn}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13")
    ),
    responses(
        (status = 200, description = "Book after checkout", body = Book),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No units available or concurrent modification", body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.checkout(&isbn, user.uid()).await?;
    Ok(Json(book))
}

/// Return one unit held by the caller
#[utoipa::path(
    post,
    path = "/return/{isbn}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13")
    ),
    responses(
        (status = 200, description = "Book after return", body = Book),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Nothing to return or concurrent modification", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.return_book(&isbn, user.uid()).await?;
    Ok(Json(book))
}

/// Books the caller currently has checked out
#[utoipa::path(
    get,
    path = "/me/books",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books with units held by the caller", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.books_borrowed_by(user.uid()).await?;
    Ok(Json(books))
}
