//! Object directory records and the built-in class-name table

use serde::Serialize;

/// Well-known class ids used by the targeted parsers.
pub mod class_ids {
    pub const GAME_OBJECT: i32 = 1;
    pub const MONO_BEHAVIOUR: i32 = 114;
    pub const MONO_SCRIPT: i32 = 115;
}

/// One entry of the object directory.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ObjectInfo {
    /// Stable identifier of the object within its file
    pub path_id: i64,
    /// Offset of the object payload, relative to the data region
    pub byte_start: i64,
    pub byte_size: u32,
    pub type_id: i32,
    /// Resolved through the type table from format 16 on
    pub class_id: i32,
}

/// Name of a built-in component class, `ClassID(n)` when unknown.
pub fn class_name(id: i32) -> String {
    let known = match id {
        1 => "GameObject",
        2 => "Component",
        4 => "Transform",
        20 => "Camera",
        21 => "Material",
        23 => "Renderer",
        28 => "Texture2D",
        33 => "MeshFilter",
        43 => "Mesh",
        48 => "Shader",
        64 => "MeshRenderer",
        65 => "GUITexture",
        81 => "AudioSource",
        92 => "GUIText",
        104 => "RenderTexture",
        108 => "Light",
        111 => "Animation",
        114 => "MonoBehaviour",
        115 => "MonoScript",
        124 => "Flare",
        128 => "Font",
        137 => "PolygonCollider2D",
        198 => "ParticleSystem",
        199 => "ParticleSystemRenderer",
        213 => "Sprite",
        222 => "Canvas",
        223 => "CanvasRenderer",
        224 => "RectTransform",
        225 => "CanvasGroup",
        _ => return format!("ClassID({id})"),
    };
    known.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_class_names() {
        assert_eq!(class_name(4), "Transform");
        assert_eq!(class_name(224), "RectTransform");
        assert_eq!(class_name(class_ids::MONO_BEHAVIOUR), "MonoBehaviour");
    }

    #[test]
    fn test_unknown_class_renders_id() {
        assert_eq!(class_name(9001), "ClassID(9001)");
        assert_eq!(class_name(-5), "ClassID(-5)");
    }
}
