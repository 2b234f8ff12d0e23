pub mod app;
pub mod error;
pub mod logging;
pub mod routes;
pub mod startup;
pub mod state;

#[cfg(test)]
mod test_support;

pub use app::build_router;
pub use state::AppState;
