//! Plugin factories and the process-wide plugin registry
//!
//! A factory advertises one operator's name, version and attribute schema,
//! and constructs instances two ways: from declared attributes (build path)
//! or from a serialized blob (load path). The registry keys factories by
//! name + version so a host can look operators up while building a graph or
//! reloading a persisted one.

use std::collections::HashMap;

use crate::debug_print;
use crate::dims::RawAxis;
use crate::error::PluginError;
use crate::plugin::{
    HARDMAX_PLUGIN_NAME, HARDMAX_PLUGIN_VERSION, HardmaxPlugin, OperatorPlugin,
    SERIALIZED_STATE_LEN,
};

/// Scalar attribute value supplied by the host at build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Int32(i32),
    Float32(f32),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Int32(_) => AttributeKind::Int32,
            AttributeValue::Float32(_) => AttributeKind::Float32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Int32,
    Float32,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Int32 => "int32",
            AttributeKind::Float32 => "float32",
        }
    }
}

/// Named attribute as it arrives from the host's operator description.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn int32(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Int32(value),
        }
    }
}

/// One entry of a factory's attribute schema: what the host may (and must)
/// supply on the build path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub count: usize,
}

/// Construction surface for one operator type.
pub trait PluginFactory {
    fn type_name(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn attribute_schema(&self) -> &'static [AttributeDescriptor];

    /// Validate `attributes` against the schema and construct a fresh
    /// instance. `name` is the placement name the host assigned; it does not
    /// affect construction.
    fn build(
        &self,
        name: &str,
        attributes: &[Attribute],
    ) -> Result<Box<dyn OperatorPlugin>, PluginError>;

    /// Reconstruct an instance from a blob produced by
    /// [`OperatorPlugin::serialized_state`]. The blob is trusted apart from
    /// its length; attribute validation does not re-run.
    fn deserialize(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<Box<dyn OperatorPlugin>, PluginError>;

    fn namespace(&self) -> &str;
    fn set_namespace(&mut self, namespace: &str);
}

const HARDMAX_SCHEMA: &[AttributeDescriptor] = &[AttributeDescriptor {
    name: "axis",
    kind: AttributeKind::Int32,
    count: 1,
}];

/// Factory for the `Hardmax` operator, version `1`.
#[derive(Default)]
pub struct HardmaxFactory {
    namespace: String,
}

impl PluginFactory for HardmaxFactory {
    fn type_name(&self) -> &'static str {
        HARDMAX_PLUGIN_NAME
    }

    fn version(&self) -> &'static str {
        HARDMAX_PLUGIN_VERSION
    }

    fn attribute_schema(&self) -> &'static [AttributeDescriptor] {
        HARDMAX_SCHEMA
    }

    fn build(
        &self,
        name: &str,
        attributes: &[Attribute],
    ) -> Result<Box<dyn OperatorPlugin>, PluginError> {
        let mut axis = None;
        for attribute in attributes {
            if attribute.name != "axis" {
                return Err(PluginError::UnexpectedAttribute {
                    name: attribute.name.clone(),
                });
            }
            if axis.is_some() {
                return Err(PluginError::AttributeCount {
                    name: attribute.name.clone(),
                    expected: 1,
                    actual: attributes.len(),
                });
            }
            match attribute.value {
                AttributeValue::Int32(value) => axis = Some(value),
                _ => {
                    return Err(PluginError::AttributeType {
                        name: attribute.name.clone(),
                        expected: AttributeKind::Int32.as_str(),
                    });
                }
            }
        }
        let Some(axis) = axis else {
            return Err(PluginError::MissingAttribute {
                name: "axis".to_string(),
            });
        };

        debug_print!("hardmax: building plugin `{name}` with raw axis {axis}");
        let mut plugin = HardmaxPlugin::new(RawAxis(axis));
        plugin.set_namespace(&self.namespace);
        Ok(Box::new(plugin))
    }

    fn deserialize(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<Box<dyn OperatorPlugin>, PluginError> {
        if bytes.len() != SERIALIZED_STATE_LEN {
            return Err(PluginError::CorruptState {
                expected: SERIALIZED_STATE_LEN,
                actual: bytes.len(),
            });
        }
        let mut raw = [0u8; SERIALIZED_STATE_LEN];
        raw.copy_from_slice(bytes);
        let axis = i32::from_le_bytes(raw);

        debug_print!("hardmax: deserializing plugin `{name}` with axis {axis}");
        let mut plugin = HardmaxPlugin::new(RawAxis(axis));
        plugin.set_namespace(&self.namespace);
        Ok(Box::new(plugin))
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }
}

/// Process-wide factory registry keyed by plugin type name + version.
///
/// Built explicitly at load time (no ambient globals) and torn down with the
/// process; factories live as long as the registry.
pub struct PluginRegistry {
    factories: HashMap<(String, String), Box<dyn PluginFactory + Send + Sync>>,
}

impl PluginRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(Box::new(HardmaxFactory::default()));
        registry
    }

    pub fn register(&mut self, factory: Box<dyn PluginFactory + Send + Sync>) {
        debug_print!(
            "registry: registering plugin `{}` version `{}`",
            factory.type_name(),
            factory.version()
        );
        let key = (
            factory.type_name().to_string(),
            factory.version().to_string(),
        );
        self.factories.insert(key, factory);
    }

    pub fn available_plugins(&self) -> Vec<String> {
        let mut keys: Vec<_> = self
            .factories
            .keys()
            .map(|(name, version)| format!("{name}:{version}"))
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn lookup(
        &self,
        type_name: &str,
        version: &str,
    ) -> Result<&(dyn PluginFactory + Send + Sync), PluginError> {
        self.factories
            .get(&(type_name.to_string(), version.to_string()))
            .map(|factory| factory.as_ref())
            .ok_or_else(|| PluginError::UnknownPlugin {
                requested: type_name.to_string(),
                version: version.to_string(),
                available: self.available_plugins(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Attribute, AttributeKind, AttributeValue, HardmaxFactory, PluginFactory, PluginRegistry,
    };
    use crate::dims::{RawAxis, SymbolicDim};
    use crate::error::PluginError;
    use crate::format::TensorDesc;
    use crate::plugin::OperatorPlugin;

    #[test]
    fn advertises_schema_and_identity() {
        let factory = HardmaxFactory::default();
        assert_eq!(factory.type_name(), "Hardmax");
        assert_eq!(factory.version(), "1");
        let schema = factory.attribute_schema();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "axis");
        assert_eq!(schema[0].kind, AttributeKind::Int32);
        assert_eq!(schema[0].count, 1);
    }

    #[test]
    fn builds_from_axis_attribute() {
        let factory = HardmaxFactory::default();
        let plugin = factory
            .build("hardmax_0", &[Attribute::int32("axis", -1)])
            .unwrap();
        assert_eq!(plugin.type_name(), "Hardmax");
    }

    #[test]
    fn build_rejects_malformed_attributes() {
        let factory = HardmaxFactory::default();

        assert!(matches!(
            factory.build("p", &[]).map(|_| ()).unwrap_err(),
            PluginError::MissingAttribute { .. }
        ));
        assert!(matches!(
            factory
                .build("p", &[Attribute::int32("axes", 1)])
                .map(|_| ())
                .unwrap_err(),
            PluginError::UnexpectedAttribute { .. }
        ));
        assert!(matches!(
            factory
                .build(
                    "p",
                    &[Attribute {
                        name: "axis".to_string(),
                        value: AttributeValue::Float32(1.0),
                    }]
                )
                .map(|_| ())
                .unwrap_err(),
            PluginError::AttributeType { .. }
        ));
        assert!(matches!(
            factory
                .build(
                    "p",
                    &[Attribute::int32("axis", 1), Attribute::int32("axis", 2)]
                )
                .map(|_| ())
                .unwrap_err(),
            PluginError::AttributeCount { .. }
        ));
    }

    #[test]
    fn serialize_round_trip_preserves_axis() {
        let factory = HardmaxFactory::default();
        let mut plugin = factory
            .build("hardmax_0", &[Attribute::int32("axis", -1)])
            .unwrap();

        let shape = vec![SymbolicDim::Known(2), SymbolicDim::Known(3)];
        plugin.output_dimensions(0, &[shape]).unwrap();
        let desc = TensorDesc::linear_f32(vec![2, 3]);
        plugin
            .configure(std::slice::from_ref(&desc), std::slice::from_ref(&desc))
            .unwrap();

        let blob = plugin.serialized_state().unwrap();
        let restored = factory.deserialize("hardmax_0", &blob).unwrap();

        // The restored instance starts a fresh lifecycle with the normalized
        // axis baked in.
        let mut restored = restored;
        restored
            .output_dimensions(0, &[vec![SymbolicDim::Known(2), SymbolicDim::Known(3)]])
            .unwrap();
        restored
            .configure(std::slice::from_ref(&desc), std::slice::from_ref(&desc))
            .unwrap();
        assert_eq!(restored.serialized_state().unwrap(), blob);
        assert_eq!(blob, 1i32.to_le_bytes().to_vec());
    }

    #[test]
    fn deserialize_rejects_wrong_blob_length() {
        let factory = HardmaxFactory::default();
        for bytes in [&[][..], &[1u8, 0, 0][..], &[1u8, 0, 0, 0, 0][..]] {
            let err = factory.deserialize("p", bytes).map(|_| ()).unwrap_err();
            assert!(matches!(
                err,
                PluginError::CorruptState { expected: 4, .. }
            ));
        }
    }

    #[test]
    fn factory_namespace_propagates_to_instances() {
        let mut factory = HardmaxFactory::default();
        factory.set_namespace("custom_ops");
        assert_eq!(factory.namespace(), "custom_ops");
        let plugin = factory
            .build("p", &[Attribute::int32("axis", 0)])
            .unwrap();
        assert_eq!(plugin.namespace(), "custom_ops");
        let restored = factory
            .deserialize("p", &RawAxis(0).0.to_le_bytes())
            .unwrap();
        assert_eq!(restored.namespace(), "custom_ops");
    }

    #[test]
    fn registry_resolves_hardmax_by_name_and_version() {
        let registry = PluginRegistry::with_defaults();
        let factory = registry.lookup("Hardmax", "1").unwrap();
        assert_eq!(factory.type_name(), "Hardmax");
        assert_eq!(registry.available_plugins(), vec!["Hardmax:1".to_string()]);
    }

    #[test]
    fn registry_reports_unknown_plugins() {
        let registry = PluginRegistry::with_defaults();
        let err = registry.lookup("Softmax", "1").map(|_| ()).unwrap_err();
        assert!(matches!(
            err,
            PluginError::UnknownPlugin { requested, version, available }
                if requested == "Softmax" && version == "1"
                    && available == vec!["Hardmax:1".to_string()]
        ));
    }
}
