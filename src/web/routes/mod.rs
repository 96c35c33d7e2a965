pub mod admin_routes;
pub mod photo_routes;
pub mod tag_routes;
