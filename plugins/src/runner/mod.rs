pub mod shell;

pub use shell::ShellExecEngine;
