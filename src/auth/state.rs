//! Authentication state trait and macro.

use crate::jwt::TokenKeys;

/// Trait for state types that can verify access tokens.
pub trait HasAuthBackend {
    fn tokens(&self) -> &TokenKeys;
}

/// Implement `HasAuthBackend` for a state struct with a `sessions: Sessions`
/// field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub sessions: Sessions,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn tokens(&self) -> &$crate::jwt::TokenKeys {
                self.sessions.keys()
            }
        }
    };
}
