//! Validation engine with per-category severities.
//!
//! The encoder consults a [`Validator`] at each checkpoint. Every violation is
//! recorded with its category, the configured severity and the entity it
//! concerns; nothing aborts until [`Validator::finish`], so a single export
//! reports every issue at once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::{HeaderProperty, REQUIRED_PROPERTIES};
use crate::util::{Error, Result};

// ============================================================================
// Categories and severities
// ============================================================================

/// What kind of irregularity a violation describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Required header property missing or duplicated.
    Property,
    /// Declared blocktype contradicts the vertex data.
    Blocktype,
    /// Normals missing, non-unit, or without a normal stream.
    Loop,
    /// UV channels inconsistent or beyond the format's limit.
    Uv,
    /// Colour channels inconsistent or beyond the format's limit.
    Colour,
    /// Weight slots beyond capacity, or weights the scheme discards.
    Weight,
    /// Unweighted vertices in skinned parts, or weights not summing to one.
    WeightCount,
    /// Dangling bone, material, box or vertex index. Always an error.
    Reference,
}

impl Category {
    /// Categories whose severity is configurable, in option order.
    pub const CONFIGURABLE: [Category; 7] = [
        Category::Property,
        Category::Blocktype,
        Category::Loop,
        Category::Uv,
        Category::Colour,
        Category::Weight,
        Category::WeightCount,
    ];

    /// Option key of the category.
    pub fn key(self) -> &'static str {
        match self {
            Category::Property => "propertyLevel",
            Category::Blocktype => "blocktypeLevel",
            Category::Loop => "loopLevel",
            Category::Uv => "uvLevel",
            Category::Colour => "colourLevel",
            Category::Weight => "weightLevel",
            Category::WeightCount => "weightCountLevel",
            Category::Reference => "reference",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::CONFIGURABLE.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a violation of a category is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Recorded, not surfaced.
    Ignore,
    /// Surfaced in the report; processing continues.
    Warning,
    /// Aborts the export once all issues are collected.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ignore => "ignored",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Severity per configurable category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLevels {
    #[serde(rename = "propertyLevel")]
    pub property: Severity,
    #[serde(rename = "blocktypeLevel")]
    pub blocktype: Severity,
    #[serde(rename = "loopLevel")]
    pub loops: Severity,
    #[serde(rename = "uvLevel")]
    pub uv: Severity,
    #[serde(rename = "colourLevel")]
    pub colour: Severity,
    #[serde(rename = "weightLevel")]
    pub weight: Severity,
    #[serde(rename = "weightCountLevel")]
    pub weight_count: Severity,
}

impl Default for ErrorLevels {
    fn default() -> Self {
        Self {
            property: Severity::Warning,
            blocktype: Severity::Error,
            loops: Severity::Ignore,
            uv: Severity::Error,
            colour: Severity::Ignore,
            weight: Severity::Warning,
            weight_count: Severity::Warning,
        }
    }
}

impl ErrorLevels {
    /// Every configurable category at the same severity.
    pub fn uniform(severity: Severity) -> Self {
        Self {
            property: severity,
            blocktype: severity,
            loops: severity,
            uv: severity,
            colour: severity,
            weight: severity,
            weight_count: severity,
        }
    }

    /// Severity of a category; [`Category::Reference`] is always an error.
    pub fn get(&self, category: Category) -> Severity {
        match category {
            Category::Property => self.property,
            Category::Blocktype => self.blocktype,
            Category::Loop => self.loops,
            Category::Uv => self.uv,
            Category::Colour => self.colour,
            Category::Weight => self.weight,
            Category::WeightCount => self.weight_count,
            Category::Reference => Severity::Error,
        }
    }

    /// Set a category's severity. Setting [`Category::Reference`] has no effect.
    pub fn set(&mut self, category: Category, severity: Severity) {
        match category {
            Category::Property => self.property = severity,
            Category::Blocktype => self.blocktype = severity,
            Category::Loop => self.loops = severity,
            Category::Uv => self.uv = severity,
            Category::Colour => self.colour = severity,
            Category::Weight => self.weight = severity,
            Category::WeightCount => self.weight_count = severity,
            Category::Reference => {}
        }
    }

    pub fn with(mut self, category: Category, severity: Severity) -> Self {
        self.set(category, severity);
        self
    }
}

// ============================================================================
// Violations
// ============================================================================

/// The model entity a violation refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Property { key: String },
    MeshPart { part: usize },
    Vertex { part: usize, vertex: usize },
    BoundingBox { index: usize },
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Property { key } => write!(f, "header property '{}'", key),
            Entity::MeshPart { part } => write!(f, "mesh part {}", part),
            Entity::Vertex { part, vertex } => write!(f, "mesh part {} vertex {}", part, vertex),
            Entity::BoundingBox { index } => write!(f, "bounding box {}", index),
        }
    }
}

/// One recorded irregularity.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub category: Category,
    pub severity: Severity,
    pub entity: Entity,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.entity, self.message)
    }
}

/// Everything a validation pass recorded, in checkpoint order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.with_severity(Severity::Warning)
    }

    pub fn ignored(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.with_severity(Severity::Ignore)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.category == category)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn has_reference_errors(&self) -> bool {
        self.errors().any(|v| v.category == Category::Reference)
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Violation accumulator for one export call.
#[derive(Debug, Default)]
pub struct Validator {
    levels: ErrorLevels,
    report: ValidationReport,
}

impl Validator {
    pub fn new(levels: ErrorLevels) -> Self {
        Self {
            levels,
            report: ValidationReport::default(),
        }
    }

    pub fn levels(&self) -> &ErrorLevels {
        &self.levels
    }

    /// Record a violation and return the severity it was recorded with.
    pub fn record(&mut self, category: Category, entity: Entity, message: impl Into<String>) -> Severity {
        let severity = self.levels.get(category);
        let violation = Violation {
            category,
            severity,
            entity,
            message: message.into(),
        };
        match severity {
            Severity::Ignore => tracing::trace!(%violation, "ignored"),
            _ => tracing::debug!(%violation, %severity, "validation"),
        }
        self.report.violations.push(violation);
        severity
    }

    /// Record a dangling reference.
    pub fn reference(&mut self, entity: Entity, message: impl Into<String>) {
        self.record(Category::Reference, entity, message);
    }

    pub fn has_errors(&self) -> bool {
        self.report.has_errors()
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Close the pass: the report on success, [`Error::Validation`] if any
    /// error-severity violation was recorded.
    pub fn finish(self) -> Result<ValidationReport> {
        if self.report.has_errors() {
            Err(Error::Validation(self.report))
        } else {
            Ok(self.report)
        }
    }
}

// ============================================================================
// Header checkpoint
// ============================================================================

/// Check the required header properties are present exactly once and numeric.
pub fn check_header_properties(v: &mut Validator, header: Option<&[HeaderProperty]>) {
    let props = header.unwrap_or(&[]);
    for key in REQUIRED_PROPERTIES {
        let mut matches = props.iter().filter(|p| p.key == key);
        match (matches.next(), matches.count()) {
            (None, _) => {
                v.record(
                    Category::Property,
                    Entity::Property { key: key.to_string() },
                    "missing, default used",
                );
            }
            (Some(first), extra) => {
                if extra > 0 {
                    v.record(
                        Category::Property,
                        Entity::Property { key: key.to_string() },
                        format!("defined {} times, first value used", extra + 1),
                    );
                }
                if first.value.as_f64().is_none() {
                    v.record(
                        Category::Property,
                        Entity::Property { key: key.to_string() },
                        "not a number, default used",
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{HeaderValue, PROP_LIGHT_GROUP, PROP_LOW_DISTANCE, PROP_MEMORY, PROP_MIDDLE_DISTANCE};

    #[test]
    fn test_default_levels() {
        let levels = ErrorLevels::default();
        assert_eq!(levels.get(Category::Property), Severity::Warning);
        assert_eq!(levels.get(Category::Blocktype), Severity::Error);
        assert_eq!(levels.get(Category::Loop), Severity::Ignore);
        assert_eq!(levels.get(Category::Uv), Severity::Error);
        assert_eq!(levels.get(Category::Colour), Severity::Ignore);
        assert_eq!(levels.get(Category::Weight), Severity::Warning);
        assert_eq!(levels.get(Category::WeightCount), Severity::Warning);
    }

    #[test]
    fn test_reference_always_error() {
        let mut levels = ErrorLevels::uniform(Severity::Ignore);
        levels.set(Category::Reference, Severity::Ignore);
        assert_eq!(levels.get(Category::Reference), Severity::Error);
    }

    #[test]
    fn test_levels_from_keys() {
        let levels: ErrorLevels =
            serde_json::from_str(r#"{"weightLevel": "Error", "uvLevel": "Ignore"}"#).unwrap();
        assert_eq!(levels.weight, Severity::Error);
        assert_eq!(levels.uv, Severity::Ignore);
        // Unspecified keys keep their defaults
        assert_eq!(levels.blocktype, Severity::Error);

        for category in Category::CONFIGURABLE {
            assert_eq!(Category::from_key(category.key()), Some(category));
        }
    }

    #[test]
    fn test_accumulates_before_failing() {
        let levels = ErrorLevels::default().with(Category::Weight, Severity::Error);
        let mut v = Validator::new(levels);
        v.record(Category::Weight, Entity::Vertex { part: 0, vertex: 2 }, "too many");
        v.record(Category::Loop, Entity::Vertex { part: 0, vertex: 3 }, "missing normal");
        v.record(Category::Property, Entity::Property { key: "memory".into() }, "missing");

        let err = v.finish().unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.ignored().count(), 1);
        assert!(err.to_string().contains("weightLevel"));
        assert!(err.to_string().contains("vertex 2"));
    }

    #[test]
    fn test_warnings_do_not_abort() {
        let mut v = Validator::new(ErrorLevels::default());
        v.record(Category::WeightCount, Entity::MeshPart { part: 1 }, "unweighted");
        let report = v.finish().unwrap();
        assert!(report.has_warnings());
        assert!(!report.has_errors());
    }

    #[test]
    fn test_reference_kind() {
        let mut v = Validator::new(ErrorLevels::uniform(Severity::Ignore));
        v.reference(Entity::Vertex { part: 0, vertex: 0 }, "bone 9 does not exist");
        let err = v.finish().unwrap_err();
        assert_eq!(err.kind(), crate::util::ErrorKind::Reference);
    }

    #[test]
    fn test_header_properties() {
        let mut v = Validator::new(ErrorLevels::default());
        check_header_properties(&mut v, None);
        assert_eq!(v.report().in_category(Category::Property).count(), 4);

        let header = vec![
            HeaderProperty::new(PROP_MIDDLE_DISTANCE, HeaderValue::Float(100.0)),
            HeaderProperty::new(PROP_LOW_DISTANCE, HeaderValue::Float(200.0)),
            HeaderProperty::new(PROP_LOW_DISTANCE, HeaderValue::Float(300.0)),
            HeaderProperty::new(PROP_LIGHT_GROUP, HeaderValue::Int(0)),
            HeaderProperty::new(PROP_MEMORY, HeaderValue::Vector(vec![1.0])),
        ];
        let mut v = Validator::new(ErrorLevels::default());
        check_header_properties(&mut v, Some(&header));
        let messages: Vec<_> = v.report().violations().iter().map(|x| x.to_string()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("lowDistance"));
        assert!(messages[1].contains("memory"));
    }
}
