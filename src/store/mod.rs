//! Data store modules for Supabase integration

pub mod scores;
pub mod supabase;

pub use scores::ScoreStore;
pub use supabase::SupabaseClient;
