use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::input::KeyCode;

/// Viewer settings, optionally loaded from a JSON file via `--settings`.
///
/// The defaults reproduce the viewer's built-in behaviour: WASD movement at
/// 5 units/s, quarter-degree-per-pixel mouse look, a 45 degree field of view
/// and a near-black clear colour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub clear_color: [f32; 3],
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub fov: f32,
    pub shader: Option<PathBuf>,
    pub bindings: BindingNames,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.01, 0.01, 0.01],
            camera_speed: 5.0,
            mouse_sensitivity: 0.25,
            fov: 45.0,
            shader: None,
            bindings: BindingNames::default(),
        }
    }
}

/// Key bindings by name, as written in the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingNames {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub wireframe: String,
    pub exit: String,
}

impl Default for BindingNames {
    fn default() -> Self {
        Self {
            forward: "W".to_string(),
            backward: "S".to_string(),
            left: "A".to_string(),
            right: "D".to_string(),
            wireframe: "H".to_string(),
            exit: "Escape".to_string(),
        }
    }
}

/// Bindings resolved to key codes, checked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub wireframe: KeyCode,
    pub exit: KeyCode,
}

impl Default for Bindings {
    fn default() -> Self {
        BindingNames::default()
            .resolve()
            .expect("default bindings are valid")
    }
}

impl BindingNames {
    pub fn resolve(&self) -> Result<Bindings> {
        let key = |name: &str, action: &str| {
            KeyCode::from_name(name)
                .ok_or_else(|| anyhow!("unknown key {name:?} bound to {action}"))
        };
        Ok(Bindings {
            forward: key(&self.forward, "forward")?,
            backward: key(&self.backward, "backward")?,
            left: key(&self.left, "left")?,
            right: key(&self.right, "right")?,
            wireframe: key(&self.wireframe, "wireframe")?,
            exit: key(&self.exit, "exit")?,
        })
    }
}

impl ViewerConfig {
    /// Reads and parses a settings file, rejecting unknown fields.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read settings {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;
    use std::io::Write;

    #[test]
    fn defaults_match_builtin_behaviour() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera_speed, 5.0);
        assert_eq!(config.mouse_sensitivity, 0.25);
        let bindings = config.bindings.resolve().unwrap();
        assert_eq!(bindings.forward, KeyCode::Character('W'));
        assert_eq!(bindings.exit, KeyCode::Named(NamedKey::Escape));
    }

    #[test]
    fn loads_partial_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"camera_speed": 12.5, "bindings": {{"wireframe": "F1"}}}}"#
        )
        .unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.camera_speed, 12.5);
        assert_eq!(config.mouse_sensitivity, 0.25);
        let bindings = config.bindings.resolve().unwrap();
        assert_eq!(bindings.wireframe, KeyCode::Function(1));
        assert_eq!(bindings.forward, KeyCode::Character('W'));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"camera_sped": 1.0}}"#).unwrap();
        assert!(ViewerConfig::load(file.path()).is_err());
    }

    #[test]
    fn unresolvable_binding_is_an_error() {
        let names = BindingNames {
            forward: "NoSuchKey".to_string(),
            ..BindingNames::default()
        };
        assert!(names.resolve().is_err());
    }
}
