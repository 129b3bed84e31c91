//! String-backed identifier newtypes.
//!
//! Every id in this system arrives from a caller or an external collaborator
//! (a candidate's user id, a portal job id, a bullet id, a confirmation id)
//! rather than being generated here, so the newtype wraps a plain `String`
//! instead of a nanoid generator.

/// Define a newtype id wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, `Borrow<str>`, and `Deref` so the id
/// can be used as a map key or compared directly against string literals.
///
/// ```ignore
/// crate::define_id! {
///     pub struct UserId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Identifies the candidate on whose behalf a Run executes.
    pub struct UserId;
}

crate::define_id! {
    /// Identifies a job posting, stable across Ranker, Tracker, and portal calls.
    pub struct JobId;
}

crate::define_id! {
    /// Identifies a bullet or proof item inside a Profile's evidence map.
    pub struct EvidenceId;
}

crate::define_id! {
    /// Opaque confirmation id returned by the portal for a submitted application.
    pub struct ConfirmationId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
