//! Semantic roles for vehicle materials.
//!
//! glTF material names are matched against an ordered rule list once, when the
//! model finishes loading, so nothing downstream ever looks at raw names.

use bevy::render::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialRole {
    Headlight,
    Taillight,
    Body,
}

impl Default for MaterialRole {
    fn default() -> Self {
        MaterialRole::Body
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Treatment {
    pub base_color: Color,
    pub emissive: Color,
}

impl MaterialRole {
    pub fn treatment(self) -> Treatment {
        match self {
            MaterialRole::Taillight => Treatment {
                base_color: Color::rgb(1.0, 0.0, 0.0),
                emissive: Color::rgb(1.0, 0.0, 0.0),
            },
            MaterialRole::Headlight => Treatment {
                base_color: Color::WHITE,
                emissive: Color::WHITE,
            },
            MaterialRole::Body => Treatment {
                base_color: Color::rgb(0.8, 0.8, 0.8),
                emissive: Color::BLACK,
            },
        }
    }
}

/// Tint applied to every material of the loaded map.
pub fn map_tint() -> Color {
    Color::rgb(0.667, 0.667, 0.667)
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RoleRule {
    pub pattern: String,
    pub role: MaterialRole,
}

impl RoleRule {
    pub fn new(pattern: &str, role: MaterialRole) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            role,
        }
    }
}

/// Ordered rule list; the first matching pattern wins.
#[derive(Debug, Clone, Default)]
pub struct MaterialRoles {
    rules: Vec<RoleRule>,
}

impl MaterialRoles {
    pub fn new(rules: &[RoleRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| RoleRule::new(&rule.pattern, rule.role))
                .collect(),
        }
    }

    pub fn classify(&self, material_name: Option<&str>) -> MaterialRole {
        let name = match material_name {
            Some(name) => name.to_lowercase(),
            None => return MaterialRole::Body,
        };

        self.rules
            .iter()
            .find(|rule| !rule.pattern.is_empty() && name.contains(&rule.pattern))
            .map(|rule| rule.role)
            .unwrap_or_default()
    }

    /// Pairs every material with its role. `names` maps glTF material names to
    /// the same handles; a material missing from it is unnamed and gets `Body`.
    pub fn assign<'a, H, I>(&self, materials: &'a [H], names: I) -> Vec<(&'a H, MaterialRole)>
    where
        H: PartialEq + 'a,
        I: IntoIterator<Item = (&'a String, &'a H)>,
    {
        let names: Vec<(&String, &H)> = names.into_iter().collect();

        materials
            .iter()
            .map(|material| {
                let name = names
                    .iter()
                    .find(|(_, named)| *named == material)
                    .map(|(name, _)| name.as_str());
                (material, self.classify(name))
            })
            .collect()
    }
}
