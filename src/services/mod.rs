pub mod auth_service;
pub mod auth_service_impl;
pub mod token_service;

pub use auth_service::{AuthError, AuthService, CurrentUser, IssuedToken, RegisteredUser};
pub use auth_service_impl::SeaOrmAuthService;
pub use token_service::{TokenError, TokenService};
