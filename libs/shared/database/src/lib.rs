pub mod memory;
pub mod repository;
pub mod supabase;

pub use memory::InMemoryRepository;
pub use repository::{ClinicRepository, RepositoryError, RepositoryResult};
pub use supabase::{SupabaseClient, SupabaseRepository};
