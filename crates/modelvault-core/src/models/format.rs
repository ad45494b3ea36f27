use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Serialized model formats recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Keras,
    Pickle,
    Onnx,
    Pytorch,
    Joblib,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 5] = [
        ModelFormat::Keras,
        ModelFormat::Pickle,
        ModelFormat::Onnx,
        ModelFormat::Pytorch,
        ModelFormat::Joblib,
    ];

    /// File extensions conventionally used for this format (lowercase, no dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ModelFormat::Keras => &["h5", "hdf5", "keras"],
            ModelFormat::Pickle => &["pkl", "pickle"],
            ModelFormat::Onnx => &["onnx"],
            ModelFormat::Pytorch => &["pt", "pth"],
            ModelFormat::Joblib => &["joblib"],
        }
    }

    /// Canonical extension used when building storage keys.
    pub fn default_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Format conventionally associated with a file extension.
    pub fn from_extension(ext: &str) -> Option<ModelFormat> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    /// Every extension the pipeline accepts without a warning.
    pub fn known_extensions() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .flat_map(|format| format.extensions().iter().copied())
            .collect()
    }
}

impl Display for ModelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ModelFormat::Keras => write!(f, "keras"),
            ModelFormat::Pickle => write!(f, "pickle"),
            ModelFormat::Onnx => write!(f, "onnx"),
            ModelFormat::Pytorch => write!(f, "pytorch"),
            ModelFormat::Joblib => write!(f, "joblib"),
        }
    }
}

impl FromStr for ModelFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keras" => Ok(ModelFormat::Keras),
            "pickle" => Ok(ModelFormat::Pickle),
            "onnx" => Ok(ModelFormat::Onnx),
            "pytorch" => Ok(ModelFormat::Pytorch),
            "joblib" => Ok(ModelFormat::Joblib),
            _ => Err(anyhow::anyhow!("Invalid model format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ModelFormat::from_extension("h5"), Some(ModelFormat::Keras));
        assert_eq!(ModelFormat::from_extension(".PKL"), Some(ModelFormat::Pickle));
        assert_eq!(ModelFormat::from_extension("pth"), Some(ModelFormat::Pytorch));
        assert_eq!(ModelFormat::from_extension("exe"), None);
        assert_eq!(ModelFormat::from_extension(""), None);
    }

    #[test]
    fn test_display_parse() {
        for format in ModelFormat::ALL {
            assert_eq!(format.to_string().parse::<ModelFormat>().unwrap(), format);
        }
        assert!("tensorflow".parse::<ModelFormat>().is_err());
    }
}
