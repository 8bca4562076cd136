//! C language handler

use super::LanguageHandler;
use crate::models::Language;

/// Get handler for C
pub fn handler(compiler: &str) -> LanguageHandler {
    LanguageHandler {
        language: Language::C,
        compiler: compiler.to_string(),
        flags: &["-O2", "-std=c11", "-pipe"],
        link_flags: &["-lm"],
        source_file: format!("main.{}", Language::C.source_extension()),
        executable_name: "main",
    }
}
