/// Authorization header parsing
use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

fn authorization_with_prefix<'a>(headers: &'a HeaderMap, prefix: &str) -> Result<&'a str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let credential = value
        .strip_prefix(prefix)
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if credential.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(credential)
}

/// Token from `Authorization: Bearer <token>`
pub fn get_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    authorization_with_prefix(headers, BEARER_PREFIX)
}

/// Key from `Authorization: ApiKey <key>`
pub fn get_api_key(headers: &HeaderMap) -> Result<&str, AuthError> {
    authorization_with_prefix(headers, API_KEY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(get_bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(get_bearer_token(&HeaderMap::new()), Err(AuthError::MissingToken));
        assert_eq!(get_api_key(&HeaderMap::new()), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_wrong_prefix() {
        assert_eq!(get_bearer_token(&headers("Basic dXNlcjpwdw==")), Err(AuthError::MissingToken));
        assert_eq!(get_bearer_token(&headers("ApiKey abc")), Err(AuthError::MissingToken));
        assert_eq!(get_api_key(&headers("Bearer abc")), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_empty_credential() {
        assert_eq!(get_bearer_token(&headers("Bearer ")), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_api_key() {
        assert_eq!(
            get_api_key(&headers("ApiKey f271c81ff7084ee5b99a5091b42d486e")),
            Ok("f271c81ff7084ee5b99a5091b42d486e")
        );
    }
}
