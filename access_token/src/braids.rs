use aliri_braid::braid;
use std::fmt;

/// Secrets print as a placeholder unless the alternate flag is set.
///
/// With `{:#?}` at most `$prefix` characters are shown (or the requested
/// width), followed by an ellipsis. With `{:#}` the full value is shown.
macro_rules! redacted {
    ($ty:ty, $label:literal, $prefix:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if !f.alternate() {
                    return f.write_str(concat!("***", $label, "***"));
                }
                let limit = f.width().unwrap_or($prefix);
                write!(f, "\"{}\"", Prefix(&self.0, limit))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str(&self.0)
                } else {
                    f.write_str(concat!("***", $label, "***"))
                }
            }
        }
    };
}

/// Shows a value cut down to `limit` characters, the last being an ellipsis
struct Prefix<'a>(&'a str, usize);

impl fmt::Display for Prefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Prefix(value, limit) = *self;
        if limit <= 1 {
            return f.write_str("…");
        }
        let mut boundaries = value.char_indices().map(|(idx, _)| idx);
        match (boundaries.nth(limit - 1), boundaries.next()) {
            (Some(cut), Some(_)) => {
                f.write_str(&value[..cut])?;
                f.write_str("…")
            }
            _ => f.write_str(value),
        }
    }
}

/// A client ID
#[braid(serde)]
pub struct ClientId;

/// A client secret
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

redacted!(ClientSecretRef, "CLIENT SECRET", 5);

/// A bearer access token
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

redacted!(AccessTokenRef, "ACCESS TOKEN", 15);

/// A refresh token, exchanged at the token endpoint for a new access token
#[braid(serde, debug = "owned", display = "owned")]
pub struct RefreshToken;

redacted!(RefreshTokenRef, "REFRESH TOKEN", 5);
