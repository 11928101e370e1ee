pub mod rewrite_globals;

pub use self::rewrite_globals::rewrite_global_variables;
