//! Database models for the profile schema subsystem
//!
//! Field definitions and options are administrator-owned metadata; stored
//! values belong to the owning profile or studio. All enums persist as
//! lowercase TEXT columns with CHECK constraints (see db::init).

use serde::{Deserialize, Serialize};

/// Logical type of an administrator-defined field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single-line free text
    ShortText,
    /// Multi-line free text (bios, descriptions)
    LongText,
    /// Decimal number, stored in canonical string form
    Number,
    /// Exactly one option token from the field's option set
    SingleChoice,
    /// Zero or more option tokens, stored as a JSON array
    MultiChoice,
    /// true/false
    Boolean,
    /// ISO 8601 calendar date (YYYY-MM-DD)
    Date,
    Email,
    Url,
    Phone,
}

impl FieldType {
    /// Database string form (matches the CHECK constraint on fields.field_type)
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortText => "short_text",
            FieldType::LongText => "long_text",
            FieldType::Number => "number",
            FieldType::SingleChoice => "single_choice",
            FieldType::MultiChoice => "multi_choice",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Phone => "phone",
        }
    }

    /// Parse from database string form
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "short_text" => Some(FieldType::ShortText),
            "long_text" => Some(FieldType::LongText),
            "number" => Some(FieldType::Number),
            "single_choice" => Some(FieldType::SingleChoice),
            "multi_choice" => Some(FieldType::MultiChoice),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "email" => Some(FieldType::Email),
            "url" => Some(FieldType::Url),
            "phone" => Some(FieldType::Phone),
            _ => None,
        }
    }

    /// Whether values of this type come from the field's option set
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::SingleChoice | FieldType::MultiChoice)
    }
}

/// Which tenant type a field applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    Talent,
    Studio,
    Both,
}

impl Applicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Applicability::Talent => "talent",
            Applicability::Studio => "studio",
            Applicability::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "talent" => Some(Applicability::Talent),
            "studio" => Some(Applicability::Studio),
            "both" => Some(Applicability::Both),
            _ => None,
        }
    }

    /// Whether a field with this applicability appears in the given
    /// tenant type's schema
    pub fn matches(&self, tenant: TenantType) -> bool {
        match self {
            Applicability::Both => true,
            Applicability::Talent => tenant == TenantType::Talent,
            Applicability::Studio => tenant == TenantType::Studio,
        }
    }

    /// Whether two applicability scopes can collide on a field name.
    /// `both` shares a namespace with everything.
    pub fn overlaps(&self, other: Applicability) -> bool {
        *self == Applicability::Both || other == Applicability::Both || *self == other
    }
}

/// Category of account requesting a schema (talent vs. studio)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Talent,
    Studio,
}

impl TenantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantType::Talent => "talent",
            TenantType::Studio => "studio",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "talent" => Some(TenantType::Talent),
            "studio" => Some(TenantType::Studio),
            _ => None,
        }
    }
}

/// Kind of entity that owns stored values, selecting the value table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Profile,
    Studio,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Studio => "studio",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(EntityKind::Profile),
            "studio" => Some(EntityKind::Studio),
            _ => None,
        }
    }

    /// Table holding this kind's stored values
    pub fn values_table(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile_field_values",
            EntityKind::Studio => "studio_field_values",
        }
    }

    /// Table holding the owner rows themselves
    pub fn owner_table(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profiles",
            EntityKind::Studio => "studios",
        }
    }

    /// FK column in the values table pointing at the owner
    pub fn owner_column(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile_id",
            EntityKind::Studio => "studio_id",
        }
    }

    /// Tenant type whose schema governs this entity kind
    pub fn tenant_type(&self) -> TenantType {
        match self {
            EntityKind::Profile => TenantType::Talent,
            EntityKind::Studio => TenantType::Studio,
        }
    }
}

/// Optional per-field validation rules, stored as a JSON blob on the field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Minimum string length (text kinds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum string length (text kinds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Minimum numeric value (number kind)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value (number kind)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regex the raw submitted string must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }
}

/// An administrator-defined field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub guid: String,
    /// Internal identifier, unique within its applicability scope
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub field_type: FieldType,
    pub applicability: Applicability,
    pub required: bool,
    pub visible: bool,
    /// System fields are seeded at init; name/type/applicability are frozen
    pub is_system: bool,
    pub default_value: Option<String>,
    pub placeholder: Option<String>,
    pub sort_order: i64,
    /// Raw JSON blob as stored; parse with [`Field::rules`]
    pub validation_rules: Option<String>,
}

impl Field {
    /// Parse the validation rule blob, treating absence as no rules
    pub fn rules(&self) -> crate::Result<ValidationRules> {
        match &self.validation_rules {
            None => Ok(ValidationRules::default()),
            Some(blob) => serde_json::from_str(blob).map_err(|e| {
                crate::Error::Internal(format!(
                    "Corrupt validation_rules for field '{}': {}",
                    self.name, e
                ))
            }),
        }
    }
}

/// One selectable choice belonging to an enumerated field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub guid: String,
    pub field_id: String,
    /// Stable token stored in values (distinct from the display label)
    pub value: String,
    pub label: String,
    pub color: Option<String>,
    pub sort_order: i64,
    pub is_default: bool,
}

/// Key-value settings row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_roundtrip() {
        for ft in [
            FieldType::ShortText,
            FieldType::LongText,
            FieldType::Number,
            FieldType::SingleChoice,
            FieldType::MultiChoice,
            FieldType::Boolean,
            FieldType::Date,
            FieldType::Email,
            FieldType::Url,
            FieldType::Phone,
        ] {
            assert_eq!(FieldType::from_str(ft.as_str()), Some(ft));
        }
        assert_eq!(FieldType::from_str("checkbox"), None);
    }

    #[test]
    fn test_applicability_matches_tenant() {
        assert!(Applicability::Both.matches(TenantType::Talent));
        assert!(Applicability::Both.matches(TenantType::Studio));
        assert!(Applicability::Talent.matches(TenantType::Talent));
        assert!(!Applicability::Talent.matches(TenantType::Studio));
        assert!(!Applicability::Studio.matches(TenantType::Talent));
    }

    #[test]
    fn test_applicability_scope_overlap() {
        assert!(Applicability::Talent.overlaps(Applicability::Talent));
        assert!(Applicability::Talent.overlaps(Applicability::Both));
        assert!(Applicability::Both.overlaps(Applicability::Studio));
        assert!(!Applicability::Talent.overlaps(Applicability::Studio));
    }

    #[test]
    fn test_validation_rules_parse() {
        let field = Field {
            guid: "g".into(),
            name: "height_cm".into(),
            label: "Height (cm)".into(),
            description: None,
            field_type: FieldType::Number,
            applicability: Applicability::Talent,
            required: false,
            visible: true,
            is_system: false,
            default_value: None,
            placeholder: None,
            sort_order: 0,
            validation_rules: Some(r#"{"min": 50, "max": 250}"#.into()),
        };
        let rules = field.rules().unwrap();
        assert_eq!(rules.min, Some(50.0));
        assert_eq!(rules.max, Some(250.0));
        assert_eq!(rules.pattern, None);
    }

    #[test]
    fn test_missing_rules_blob_is_empty() {
        let field = Field {
            guid: "g".into(),
            name: "bio".into(),
            label: "Bio".into(),
            description: None,
            field_type: FieldType::LongText,
            applicability: Applicability::Both,
            required: false,
            visible: true,
            is_system: true,
            default_value: None,
            placeholder: None,
            sort_order: 0,
            validation_rules: None,
        };
        assert!(field.rules().unwrap().is_empty());
    }
}
