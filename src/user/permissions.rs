use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Create and delete board content.
    EditBoard,
    UploadImages,
}

const GABBAI_PERMISSIONS: &[Permission] = &[Permission::EditBoard, Permission::UploadImages];
const VIEWER_PERMISSIONS: &[Permission] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Gabbai,
    Viewer,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Gabbai => GABBAI_PERMISSIONS,
            UserRole::Viewer => VIEWER_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Gabbai => "Gabbai",
            UserRole::Viewer => "Viewer",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gabbai" => Some(UserRole::Gabbai),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }
}
