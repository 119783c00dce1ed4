//! Data models for the QR provisioning service.
//!
//! Field names serialize in camelCase to match the public JSON contract.

mod category;
mod content;
mod location;
mod qr;

pub use category::*;
pub use content::*;
pub use location::*;
pub use qr::*;

use serde::{Deserialize, Deserializer};

/// Accepts either a JSON boolean or the strings "true"/"false".
///
/// Multipart forms deliver every field as text.
pub(crate) fn deserialize_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    Ok(
        match Option::<BoolOrString>::deserialize(deserializer)? {
            None => None,
            Some(BoolOrString::Bool(b)) => Some(b),
            Some(BoolOrString::String(s)) => Some(s.trim().eq_ignore_ascii_case("true")),
        },
    )
}

/// Case-fold a user-supplied name the way every unique name is stored.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}
