//! C++ language handler

use super::LanguageHandler;
use crate::models::Language;

/// Get handler for C++
pub fn handler(compiler: &str) -> LanguageHandler {
    LanguageHandler {
        language: Language::Cpp,
        compiler: compiler.to_string(),
        flags: &["-O2", "-std=c++17", "-pipe"],
        link_flags: &[],
        source_file: format!("main.{}", Language::Cpp.source_extension()),
        executable_name: "main",
    }
}
