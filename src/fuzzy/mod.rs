pub mod distance;
pub mod symspell;

pub use symspell::SuggestionIndex;
