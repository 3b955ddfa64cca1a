use std::path::Path;

/// Knobs for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name given to the produced IR module.
    pub module_name: String,
    /// File name used when rendering diagnostics.
    pub file_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: "main".to_string(),
            file_name: "<stdin>".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn for_file(path: &Path) -> Self {
        let module_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("main")
            .to_string();

        CompileOptions {
            module_name,
            file_name: path.display().to_string(),
        }
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }
}
