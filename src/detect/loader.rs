use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::config::ModelSettings;
use crate::detect::backend::SegmenterBackend;

/// Resolve a model identifier (e.g. `daytime`) to `<dir>/<id>.<ext>`.
///
/// Identifiers are bare names: path separators and parent references are
/// rejected so an identifier cannot point outside the models directory.
pub fn resolve_model_path(settings: &ModelSettings, model_id: &str) -> Result<PathBuf> {
    let model_id = model_id.trim();
    if model_id.is_empty() {
        return Err(anyhow!("model identifier must not be empty"));
    }
    if model_id.contains(&['/', '\\'][..]) || model_id == "." || model_id == ".." {
        return Err(anyhow!(
            "model identifier '{}' must be a bare name, not a path",
            model_id
        ));
    }
    Ok(settings
        .dir
        .join(format!("{}.{}", model_id, settings.extension)))
}

/// Load the model named by `model_id` and bind it to a compute device.
///
/// A missing file fails before the runtime is touched; corrupt weights fail
/// inside the runtime with its message attached.
pub fn load_model(settings: &ModelSettings, model_id: &str) -> Result<Box<dyn SegmenterBackend>> {
    let path = resolve_model_path(settings, model_id)?;
    if !path.is_file() {
        return Err(anyhow!("model file not found: {}", path.display()));
    }

    #[cfg(feature = "backend-tract")]
    {
        let backend = crate::detect::backends::TractBackend::new(&path, settings.input_size)?;
        log::info!(
            "loaded model '{}' from {} ({} backend on {}, input {}x{})",
            model_id,
            path.display(),
            backend.name(),
            backend.device(),
            settings.input_size,
            settings.input_size
        );
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow!(
            "cannot load {}: model inference requires the backend-tract feature",
            path.display()
        ))
    }
}

/// Identifiers of the model files present in the models directory, sorted.
pub fn list_models(settings: &ModelSettings) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(&settings.dir).map_err(|e| {
        anyhow!(
            "failed to read models directory {}: {}",
            settings.dir.display(),
            e
        )
    })?;

    let mut models = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&settings.extension));
        if !matches_ext || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            models.push(stem.to_string());
        }
    }
    models.sort();
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn settings(dir: &Path) -> ModelSettings {
        ModelSettings {
            dir: dir.to_path_buf(),
            extension: "onnx".to_string(),
            input_size: 640,
        }
    }

    #[test]
    fn resolves_bare_identifiers() -> Result<()> {
        let s = settings(Path::new("public/models"));
        assert_eq!(
            resolve_model_path(&s, "daytime")?,
            PathBuf::from("public/models/daytime.onnx")
        );
        assert!(resolve_model_path(&s, "../secrets").is_err());
        assert!(resolve_model_path(&s, "").is_err());
        Ok(())
    }

    #[test]
    fn missing_model_names_the_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let err = match load_model(&settings(dir.path()), "nighttime") {
            Ok(_) => panic!("missing model must not load"),
            Err(e) => e,
        };
        let message = err.to_string();
        assert!(message.contains("model file not found"), "{message}");
        assert!(message.contains("nighttime.onnx"), "{message}");
        Ok(())
    }

    #[test]
    fn lists_models_with_matching_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("nighttime.onnx"), b"")?;
        std::fs::write(dir.path().join("daytime.onnx"), b"")?;
        std::fs::write(dir.path().join("notes.txt"), b"")?;
        assert_eq!(list_models(&settings(dir.path()))?, vec!["daytime", "nighttime"]);
        Ok(())
    }
}
