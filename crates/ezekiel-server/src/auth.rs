//! Bearer extraction from an inbound HTTP/WS/SSE request, handed to the
//! `AuthCollaborator` trait object to resolve a principal. Checks the
//! `Authorization: Bearer` header first, then falls back to a named cookie.

use actix_web::HttpRequest;
use actix_web::http::header::AUTHORIZATION;
use ezekiel_core::AuthCollaborator;

const BEARER_PREFIX: &str = "Bearer ";

fn extract_bearer(req: &HttpRequest, cookie_name: &str) -> Option<Vec<u8>> {
    if let Some(header_val) = req.headers().get(AUTHORIZATION)
        && let Ok(s) = header_val.to_str()
    {
        let trimmed = s.trim();
        if let Some(token) = trimmed.strip_prefix(BEARER_PREFIX) {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.as_bytes().to_vec());
            }
        }
    }

    if let Some(cookie) = req.cookie(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.as_bytes().to_vec());
        }
    }

    None
}

/// Resolve the authenticated principal for `req`, or `None` if no bearer
/// was supplied or it did not resolve to an identity.
pub fn authenticate(req: &HttpRequest, auth: &dyn AuthCollaborator) -> Option<String> {
    let bearer = extract_bearer(req, auth.cookie_name())?;
    auth.id_from_token(&bearer)
}
