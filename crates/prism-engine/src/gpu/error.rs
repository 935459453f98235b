use std::fmt;

use super::uniforms::UniformType;

/// Programmable pipeline stage a shader source targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Fragment => "Fragment",
            ShaderStage::Compute => "Compute",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader compilation error\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("Shader program link error:\n{0}")]
    Link(String),

    #[error("Uniform '{0}' not found")]
    UniformNotFound(String),

    #[error("Uniform '{name}' is declared as {expected:?}, got {actual:?}")]
    UniformType {
        name: String,
        expected: UniformType,
        actual: UniformType,
    },

    #[error("Unsupported shader stage: {0}")]
    UnsupportedStage(ShaderStage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            message: "bad token".into(),
        };
        assert_eq!(e.to_string(), "Fragment shader compilation error\nbad token");

        let e = ShaderError::UniformNotFound("u_model".into());
        assert_eq!(e.to_string(), "Uniform 'u_model' not found");

        let e = ShaderError::UnsupportedStage(ShaderStage::Compute);
        assert_eq!(e.to_string(), "Unsupported shader stage: Compute");
    }
}
