//! Storage layer abstraction trait definition

mod dispatch_queue;
mod glossary_repository;
mod key_repository;
mod project_repository;
mod reference_repository;

pub use dispatch_queue::DispatchQueue;
pub use glossary_repository::GlossaryRepository;
pub use key_repository::KeyRepository;
pub use project_repository::ProjectRepository;
pub use reference_repository::ReferenceRepository;
