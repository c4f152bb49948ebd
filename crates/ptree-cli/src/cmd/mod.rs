pub mod analyze;
pub mod ask;
pub mod backend;
pub mod completions;
pub mod create;
pub mod delete;
pub mod export;
pub mod import;
pub mod move_cmd;
pub mod session;
pub mod show;
pub mod status;
pub mod tree;
pub mod tree_file;
pub mod update;
