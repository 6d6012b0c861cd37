mod package;
mod routes;

pub use package::package;
pub use routes::routes;
