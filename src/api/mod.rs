pub mod routes;

// Re-export route handlers for convenience
pub use routes::actions;
pub use routes::allocation;
pub use routes::app;
pub use routes::approval;
pub use routes::auth;
pub use routes::cases;
pub use routes::closure;
pub use routes::comments;
pub use routes::dashboard;
pub use routes::documents;
pub use routes::investigation;
pub use routes::legal;
pub use routes::regulatory;
pub use routes::review;
pub use routes::risk;
pub use routes::state;
pub use routes::users;
