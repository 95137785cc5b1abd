pub mod note_repository;
pub mod photo_repository;
pub mod secret_repository;
pub mod settings_repository;
pub mod weight_repository;
pub mod workout_log_repository;
