use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use adminpanel_core::AdminId;

use crate::roles::Role;

/// Signed-in administrator's profile as returned by `GET /admin/profile`.
///
/// Only `id` and `role` are interpreted here; every other field is carried
/// through untouched so the cache can hand back exactly what it stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: AdminId,

    #[serde(default)]
    pub role: Role,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(id: AdminId, role: Role) -> Self {
        Self {
            id,
            role,
            extra: Map::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
