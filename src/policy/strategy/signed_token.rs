//! Signed-token strategy: the token in the parameter must be signed for the
//! protected value of this request (its path, or a named header).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::policy::context::CheckContext;
use crate::policy::error::AuthorizationError;
use crate::policy::request::CheckRequest;
use crate::policy::token::TokenValidator;

/// Path-segment escaping: unreserved characters and `$&+,:;=@` stay literal.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Which part of the request the signature protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectedValue {
    Path,
    Header(String),
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    validator: TokenValidator,
    protected: ProtectedValue,
    early_encode: bool,
    lower_encode: bool,
}

impl SignedToken {
    pub fn new(validator: TokenValidator, protected: ProtectedValue, early_encode: bool, lower_encode: bool) -> Self {
        Self {
            validator,
            protected,
            early_encode,
            lower_encode,
        }
    }

    pub fn check(&self, token: &str, request: &CheckRequest, ctx: &CheckContext) -> Result<bool, AuthorizationError> {
        let protected = self.protected_value(request)?;
        self.validator.validate(token, &protected, ctx.now_unix)?;
        Ok(true)
    }

    /// The protected value as it was fed to the signer.
    pub fn protected_value(&self, request: &CheckRequest) -> Result<String, AuthorizationError> {
        let (raw, source) = match &self.protected {
            ProtectedValue::Path => (Some(request.path_only()), "path".to_string()),
            ProtectedValue::Header(name) => (request.header(name), format!("header '{name}'")),
        };

        let raw = match raw {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthorizationError::MissingProtectedValue(source)),
        };

        if !self.early_encode {
            return Ok(raw.to_string());
        }

        let encoded = utf8_percent_encode(raw, PATH_SEGMENT).to_string();
        if self.lower_encode {
            Ok(lowercase_escapes(&encoded))
        } else {
            Ok(encoded)
        }
    }
}

/// Lowercase the hex digits of every `%XX` escape, leaving other text alone.
fn lowercase_escapes(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push(b'%');
            out.push(bytes[i + 1].to_ascii_lowercase());
            out.push(bytes[i + 2].to_ascii_lowercase());
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::token::HmacAlgorithm;

    const EXP: i64 = 9_999_999_999;

    fn validator() -> TokenValidator {
        TokenValidator::new(HmacAlgorithm::Sha256, b"secret".to_vec(), vec!["exp".to_string()])
    }

    #[test]
    fn test_path_protected_value() {
        let strategy = SignedToken::new(validator(), ProtectedValue::Path, false, false);
        let token = validator()
            .issue(&[("exp", EXP.to_string().as_str())], "/media/a b.mp4")
            .unwrap();
        let req = CheckRequest::new("GET", "cdn", "/media/a b.mp4?quality=hd");

        assert_eq!(strategy.protected_value(&req), Ok("/media/a b.mp4".to_string()));
        assert_eq!(strategy.check(&token, &req, &CheckContext::at(100)), Ok(true));
    }

    #[test]
    fn test_early_encode_keeps_uppercase_escapes() {
        let strategy = SignedToken::new(validator(), ProtectedValue::Path, true, false);
        let req = CheckRequest::new("GET", "cdn", "/media/a b:é.mp4");
        assert_eq!(
            strategy.protected_value(&req),
            Ok("%2Fmedia%2Fa%20b:%C3%A9.mp4".to_string())
        );
    }

    #[test]
    fn test_lower_encode_normalizes_escapes() {
        let strategy = SignedToken::new(validator(), ProtectedValue::Path, true, true);
        let req = CheckRequest::new("GET", "cdn", "/media/a b:é.mp4");
        assert_eq!(
            strategy.protected_value(&req),
            Ok("%2fmedia%2fa%20b:%c3%a9.mp4".to_string())
        );

        let token = validator()
            .issue(&[("exp", EXP.to_string().as_str())], "%2fmedia%2fa%20b:%c3%a9.mp4")
            .unwrap();
        assert_eq!(strategy.check(&token, &req, &CheckContext::at(100)), Ok(true));
    }

    #[test]
    fn test_header_protected_value() {
        let strategy = SignedToken::new(
            validator(),
            ProtectedValue::Header("x-original-uri".to_string()),
            false,
            false,
        );
        let req = CheckRequest::new("GET", "cdn", "/auth");
        assert_eq!(
            strategy.protected_value(&req),
            Err(AuthorizationError::MissingProtectedValue("header 'x-original-uri'".to_string()))
        );

        let req = req.with_header("x-original-uri", "/media/x.mp4");
        let token = validator()
            .issue(&[("exp", EXP.to_string().as_str())], "/media/x.mp4")
            .unwrap();
        assert_eq!(strategy.check(&token, &req, &CheckContext::at(100)), Ok(true));
    }

    #[test]
    fn test_lowercase_escapes_ignores_incomplete_triplets() {
        assert_eq!(lowercase_escapes("%AB%C"), "%ab%C");
        assert_eq!(lowercase_escapes("100%ZZ"), "100%ZZ");
    }
}
