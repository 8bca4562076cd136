//! Language-specific toolchain handlers

pub mod c;
pub mod cpp;

use std::ffi::OsString;
use std::path::Path;

use crate::config::CompilerConfig;
use crate::models::Language;

/// Everything needed to turn one source file into one executable
#[derive(Debug, Clone)]
pub struct LanguageHandler {
    language: Language,
    compiler: String,
    flags: &'static [&'static str],
    link_flags: &'static [&'static str],
    source_file: String,
    executable_name: &'static str,
}

impl LanguageHandler {
    /// Get handler for a specific language
    pub fn for_language(language: Language, config: &CompilerConfig) -> Self {
        match language {
            Language::C => c::handler(&config.c_compiler),
            Language::Cpp => cpp::handler(&config.cpp_compiler),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Get the compiler program name or path
    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Get the source file name
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Get the executable file name
    pub fn executable(&self) -> &str {
        self.executable_name
    }

    /// Arguments for `<compiler> <args>`: flags, source, output, then link flags
    pub fn compile_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push(source.as_os_str().to_owned());
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        args.extend(self.link_flags.iter().map(OsString::from));
        args
    }
}
