pub mod ai_service;
pub mod cache_service;
pub mod coach_service;
pub mod export_service;
pub mod library_service;
pub mod prompt_templates;
pub mod schedule_service;
pub mod settings_service;
pub mod tracker_service;
